//! JSON-описания входных данных: дерево модулей и таблица констант.

use ndarray::{ArrayD, IxDyn};
use serde::Deserialize;
use serde_json::Value as Json;
use thiserror::Error;

use crate::error::ImportError;
use crate::module::{AttributeType, ModuleId, ModuleTree};
use crate::value::{ConstantPool, IValue};

#[derive(Error, Debug)]
pub enum DescriptorError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("'{0}' is not a rectangular numeric array")]
    InvalidTensor(String),

    #[error("Constant table must be a JSON array")]
    NotAnArray,

    #[error(transparent)]
    Import(#[from] ImportError),
}

/// Описание модуля и его поддерева.
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleDescriptor {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<TensorDescriptor>,
    #[serde(default)]
    pub buffers: Vec<TensorDescriptor>,
    #[serde(default)]
    pub attributes: Vec<AttributeDescriptor>,
    #[serde(default)]
    pub submodules: Vec<ModuleDescriptor>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TensorDescriptor {
    pub name: String,
    /// Число или вложенный прямоугольный массив чисел.
    pub data: Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttributeDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: AttributeType,
    #[serde(default)]
    pub value: Json,
}

impl ModuleDescriptor {
    pub fn from_json(text: &str) -> Result<Self, DescriptorError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Построить дерево; возвращает его и корневой модуль.
    pub fn build(&self) -> Result<(ModuleTree, ModuleId), DescriptorError> {
        let (mut tree, root) = ModuleTree::with_root(self.name.clone());
        self.populate(&mut tree, root)?;
        Ok((tree, root))
    }

    fn populate(&self, tree: &mut ModuleTree, module: ModuleId) -> Result<(), DescriptorError> {
        for param in &self.parameters {
            tree.add_parameter(module, param.name.clone(), param.to_array()?)?;
        }
        for buffer in &self.buffers {
            tree.add_buffer(module, buffer.name.clone(), buffer.to_array()?)?;
        }
        for attr in &self.attributes {
            tree.add_attribute(module, attr.name.clone(), attr.ty, json_to_ivalue(&attr.value))?;
        }
        for sub in &self.submodules {
            let child = tree.add_submodule(module, sub.name.clone())?;
            sub.populate(tree, child)?;
        }
        Ok(())
    }
}

impl TensorDescriptor {
    fn to_array(&self) -> Result<ArrayD<f64>, DescriptorError> {
        json_to_tensor(&self.data).ok_or_else(|| DescriptorError::InvalidTensor(self.name.clone()))
    }
}

/// Таблица констант из JSON-массива.
pub fn constant_pool_from_json(text: &str) -> Result<ConstantPool, DescriptorError> {
    match serde_json::from_str::<Json>(text)? {
        Json::Array(items) => Ok(items.iter().map(json_to_ivalue).collect::<Vec<_>>().into()),
        _ => Err(DescriptorError::NotAnArray),
    }
}

/// Числовые массивы становятся тензорами, остальные массивы становятся списками.
pub fn json_to_ivalue(json: &Json) -> IValue {
    match json {
        Json::Null => IValue::None,
        Json::Bool(b) => IValue::Bool(*b),
        Json::Number(n) => match n.as_i64() {
            Some(i) => IValue::Int(i),
            None => IValue::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Json::String(s) => IValue::Str(s.clone()),
        Json::Array(items) => match json_to_tensor(json) {
            Some(tensor) if !items.is_empty() => IValue::Tensor(tensor),
            _ => IValue::List(items.iter().map(json_to_ivalue).collect()),
        },
        Json::Object(_) => IValue::Str(json.to_string()),
    }
}

fn json_to_tensor(json: &Json) -> Option<ArrayD<f64>> {
    let mut shape = Vec::new();
    let mut leaf_depth = None;
    let mut data = Vec::new();
    if !collect_tensor(json, 0, &mut shape, &mut leaf_depth, &mut data) {
        return None;
    }
    if leaf_depth.is_some_and(|depth| depth != shape.len()) {
        return None;
    }
    ArrayD::from_shape_vec(IxDyn(&shape), data).ok()
}

fn collect_tensor(
    json: &Json,
    depth: usize,
    shape: &mut Vec<usize>,
    leaf_depth: &mut Option<usize>,
    data: &mut Vec<f64>,
) -> bool {
    match json {
        Json::Number(n) => {
            let Some(x) = n.as_f64() else { return false };
            if *leaf_depth.get_or_insert(depth) != depth {
                return false;
            }
            data.push(x);
            true
        }
        Json::Array(items) => {
            if leaf_depth.is_some_and(|d| depth >= d) {
                return false;
            }
            if shape.len() == depth {
                shape.push(items.len());
            } else if shape[depth] != items.len() {
                return false;
            }
            items
                .iter()
                .all(|item| collect_tensor(item, depth + 1, shape, leaf_depth, data))
        }
        _ => false,
    }
}
