//! Дерево модулей.
//!
//! Модули и слоты лежат в арене [`ModuleTree`] и адресуются стабильными
//! дескрипторами [`ModuleId`] и [`SlotId`]. Подмодуль принадлежит ровно одному
//! родителю; символьные значения хранят только дескрипторы.

use std::collections::HashMap;
use std::fmt;

use ndarray::ArrayD;
use serde::{Deserialize, Serialize};

use crate::compiler::graph::Graph;
use crate::error::{ImportError, ImportResult};
use crate::value::IValue;

/// Дескриптор модуля в арене.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleId(usize);

/// Дескриптор слота (параметр, буфер или атрибут).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotId(usize);

/// Объявленный тип атрибута.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    Int,
    Float,
    Bool,
    Str,
    Tensor,
    List,
    Optional,
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AttributeType::Int => "int",
            AttributeType::Float => "float",
            AttributeType::Bool => "bool",
            AttributeType::Str => "str",
            AttributeType::Tensor => "Tensor",
            AttributeType::List => "list",
            AttributeType::Optional => "Optional",
        };
        write!(f, "{}", name)
    }
}

/// Вид слота.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotKind {
    /// Числовой массив; флаг отличает буфер от параметра.
    Tensor { is_buffer: bool },
    /// Атрибут с объявленным типом.
    Attribute(AttributeType),
}

/// Слот модуля.
#[derive(Debug, Clone)]
pub struct Slot {
    pub name: String,
    pub owner: ModuleId,
    pub kind: SlotKind,
    pub value: IValue,
}

/// Номинальный тип, заведённый блоком класса.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassType {
    pub name: String,
}

/// Сигнатура метода (без self).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Signature {
    pub name: String,
    pub params: Vec<String>,
}

/// Обращение метода к слоту модуля, зарегистрированное при компиляции.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberInput {
    pub slot: SlotId,
    pub kind: SlotKind,
    /// Тип атрибута; для параметров и буферов `None`.
    pub ty: Option<AttributeType>,
}

/// Скомпилированный метод.
#[derive(Debug, Clone, Serialize)]
pub struct Method {
    pub signature: Signature,
    pub graph: Graph,
    pub member_inputs: Vec<MemberInput>,
}

impl Method {
    pub fn name(&self) -> &str {
        &self.signature.name
    }
}

/// Узел дерева модулей.
#[derive(Debug, Clone)]
pub struct Module {
    pub name: String,
    pub parent: Option<ModuleId>,
    pub class_type: Option<ClassType>,
    submodules: HashMap<String, ModuleId>,
    /// Параметры и буферы
    tensors: HashMap<String, SlotId>,
    attributes: HashMap<String, SlotId>,
    /// Методы в порядке установки
    methods: Vec<Method>,
}

impl Module {
    fn new(name: String, parent: Option<ModuleId>) -> Self {
        Self {
            name,
            parent,
            class_type: None,
            submodules: HashMap::new(),
            tensors: HashMap::new(),
            attributes: HashMap::new(),
            methods: Vec::new(),
        }
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn find_method(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|m| m.name() == name)
    }
}

/// Арена модулей и слотов.
///
/// Дескрипторы действительны только в дереве, которое их выдало. Методы
/// доступа по дескриптору паникуют на чужом дескрипторе; точки входа импорта
/// проверяют его через [`ModuleTree::check`].
#[derive(Debug, Clone, Default)]
pub struct ModuleTree {
    modules: Vec<Module>,
    slots: Vec<Slot>,
}

impl ModuleTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Создать дерево с одним корнем.
    pub fn with_root(name: impl Into<String>) -> (Self, ModuleId) {
        let mut tree = Self::new();
        let root = tree.new_root(name);
        (tree, root)
    }

    /// Добавить модуль без родителя.
    pub fn new_root(&mut self, name: impl Into<String>) -> ModuleId {
        let id = ModuleId(self.modules.len());
        self.modules.push(Module::new(name.into(), None));
        id
    }

    /// Добавить подмодуль.
    pub fn add_submodule(&mut self, parent: ModuleId, name: impl Into<String>) -> ImportResult<ModuleId> {
        let name = name.into();
        if self.modules[parent.0].submodules.contains_key(&name) {
            return Err(self.duplicate(parent, "submodule", name));
        }
        let id = ModuleId(self.modules.len());
        self.modules.push(Module::new(name.clone(), Some(parent)));
        self.modules[parent.0].submodules.insert(name, id);
        Ok(id)
    }

    /// Объявить параметр.
    pub fn add_parameter(&mut self, module: ModuleId, name: impl Into<String>, data: ArrayD<f64>) -> ImportResult<SlotId> {
        self.add_tensor(module, name.into(), data, false)
    }

    /// Объявить буфер.
    pub fn add_buffer(&mut self, module: ModuleId, name: impl Into<String>, data: ArrayD<f64>) -> ImportResult<SlotId> {
        self.add_tensor(module, name.into(), data, true)
    }

    /// Объявить атрибут с типом.
    pub fn add_attribute(
        &mut self,
        module: ModuleId,
        name: impl Into<String>,
        ty: AttributeType,
        value: IValue,
    ) -> ImportResult<SlotId> {
        let name = name.into();
        if self.modules[module.0].attributes.contains_key(&name) {
            return Err(self.duplicate(module, "attribute", name));
        }
        let slot = self.push_slot(module, name.clone(), SlotKind::Attribute(ty), value);
        self.modules[module.0].attributes.insert(name, slot);
        Ok(slot)
    }

    fn add_tensor(&mut self, module: ModuleId, name: String, data: ArrayD<f64>, is_buffer: bool) -> ImportResult<SlotId> {
        if self.modules[module.0].tensors.contains_key(&name) {
            return Err(self.duplicate(module, "parameter or buffer", name));
        }
        let slot = self.push_slot(
            module,
            name.clone(),
            SlotKind::Tensor { is_buffer },
            IValue::Tensor(data),
        );
        self.modules[module.0].tensors.insert(name, slot);
        Ok(slot)
    }

    fn push_slot(&mut self, owner: ModuleId, name: String, kind: SlotKind, value: IValue) -> SlotId {
        let id = SlotId(self.slots.len());
        self.slots.push(Slot {
            name,
            owner,
            kind,
            value,
        });
        id
    }

    fn duplicate(&self, module: ModuleId, category: &'static str, name: String) -> ImportError {
        ImportError::DuplicateMember {
            module: self.path(module),
            category,
            name,
        }
    }

    /// Убедиться, что дескриптор выдан этим деревом.
    pub fn check(&self, id: ModuleId) -> ImportResult<()> {
        if id.0 < self.modules.len() {
            Ok(())
        } else {
            Err(ImportError::ForeignModule { module: id })
        }
    }

    pub fn module(&self, id: ModuleId) -> &Module {
        &self.modules[id.0]
    }

    pub fn slot(&self, id: SlotId) -> &Slot {
        &self.slots[id.0]
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn find_module(&self, module: ModuleId, name: &str) -> Option<ModuleId> {
        self.module(module).submodules.get(name).copied()
    }

    pub fn find_parameter(&self, module: ModuleId, name: &str) -> Option<SlotId> {
        self.find_tensor(module, name, false)
    }

    pub fn find_buffer(&self, module: ModuleId, name: &str) -> Option<SlotId> {
        self.find_tensor(module, name, true)
    }

    fn find_tensor(&self, module: ModuleId, name: &str, buffer: bool) -> Option<SlotId> {
        let slot = *self.module(module).tensors.get(name)?;
        match self.slot(slot).kind {
            SlotKind::Tensor { is_buffer } if is_buffer == buffer => Some(slot),
            _ => None,
        }
    }

    pub fn find_attribute(&self, module: ModuleId, name: &str) -> Option<(SlotId, AttributeType)> {
        let slot = *self.module(module).attributes.get(name)?;
        match self.slot(slot).kind {
            SlotKind::Attribute(ty) => Some((slot, ty)),
            SlotKind::Tensor { .. } => None,
        }
    }

    pub fn find_method(&self, module: ModuleId, name: &str) -> Option<&Method> {
        self.module(module).find_method(name)
    }

    /// Полное имя модуля от корня: `model.encoder.layer0`.
    pub fn path(&self, id: ModuleId) -> String {
        let mut names = Vec::new();
        let mut current = Some(id);
        while let Some(m) = current {
            let module = self.module(m);
            names.push(module.name.as_str());
            current = module.parent;
        }
        names.reverse();
        names.join(".")
    }

    pub(crate) fn set_class_type(&mut self, module: ModuleId, class_type: ClassType) {
        self.modules[module.0].class_type = Some(class_type);
    }

    pub(crate) fn install_methods(&mut self, module: ModuleId, methods: Vec<Method>) {
        self.modules[module.0].methods.extend(methods);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::IxDyn;

    fn zeros(n: usize) -> ArrayD<f64> {
        ArrayD::zeros(IxDyn(&[n]))
    }

    #[test]
    fn test_tree_paths() {
        let (mut tree, root) = ModuleTree::with_root("model");
        let encoder = tree.add_submodule(root, "encoder").unwrap();
        let layer = tree.add_submodule(encoder, "layer0").unwrap();

        assert_eq!(tree.path(layer), "model.encoder.layer0");
        assert_eq!(tree.find_module(root, "encoder"), Some(encoder));
        assert_eq!(tree.module(layer).parent, Some(encoder));
    }

    #[test]
    fn test_parameter_and_buffer_flag() {
        let (mut tree, root) = ModuleTree::with_root("m");
        let weight = tree.add_parameter(root, "weight", zeros(3)).unwrap();
        let mean = tree.add_buffer(root, "running_mean", zeros(3)).unwrap();

        assert_eq!(tree.find_parameter(root, "weight"), Some(weight));
        assert_eq!(tree.find_buffer(root, "weight"), None);
        assert_eq!(tree.find_buffer(root, "running_mean"), Some(mean));
        assert_eq!(tree.find_parameter(root, "running_mean"), None);
        assert_eq!(tree.slot(mean).kind, SlotKind::Tensor { is_buffer: true });
    }

    #[test]
    fn test_attribute_keeps_type() {
        let (mut tree, root) = ModuleTree::with_root("m");
        let slot = tree
            .add_attribute(root, "training", AttributeType::Bool, IValue::Bool(true))
            .unwrap();
        assert_eq!(
            tree.find_attribute(root, "training"),
            Some((slot, AttributeType::Bool))
        );
    }

    #[test]
    fn test_duplicate_member() {
        let (mut tree, root) = ModuleTree::with_root("m");
        tree.add_parameter(root, "w", zeros(1)).unwrap();
        let err = tree.add_buffer(root, "w", zeros(1)).unwrap_err();
        assert!(matches!(err, ImportError::DuplicateMember { .. }));

        // Одинаковые имена в разных категориях допустимы
        assert!(tree.add_submodule(root, "w").is_ok());
    }
}
