//! Непрозрачные значения времени выполнения и таблица констант.

use std::fmt;
use std::sync::Arc;

use ndarray::ArrayD;
use serde::{Deserialize, Serialize};

/// Значение, которое импорт передаёт дальше не интерпретируя.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IValue {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Числовой массив (параметры, буферы, тензорные константы)
    Tensor(ArrayD<f64>),
    List(Vec<IValue>),
}

impl IValue {
    /// Короткое имя вида значения.
    pub fn type_name(&self) -> &'static str {
        match self {
            IValue::None => "None",
            IValue::Bool(_) => "bool",
            IValue::Int(_) => "int",
            IValue::Float(_) => "float",
            IValue::Str(_) => "str",
            IValue::Tensor(_) => "Tensor",
            IValue::List(_) => "list",
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            IValue::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl fmt::Display for IValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IValue::None => write!(f, "None"),
            IValue::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            IValue::Int(n) => write!(f, "{}", n),
            IValue::Float(x) => write!(f, "{}", x),
            IValue::Str(s) => write!(f, "{:?}", s),
            IValue::Tensor(t) => write!(f, "<tensor {:?}>", t.shape()),
            IValue::List(items) => {
                let items: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", items.join(", "))
            }
        }
    }
}

/// Упорядоченная таблица констант, на которую ссылается исходник через
/// `CONSTANTS.c<N>`. Неизменяема; клон разделяет одно хранилище.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantPool {
    values: Arc<[IValue]>,
}

impl ConstantPool {
    pub fn new(values: Vec<IValue>) -> Self {
        Self {
            values: values.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&IValue> {
        self.values.get(index)
    }
}

impl Default for ConstantPool {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl From<Vec<IValue>> for ConstantPool {
    fn from(values: Vec<IValue>) -> Self {
        Self::new(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_shares_storage() {
        let pool = ConstantPool::new(vec![IValue::Float(3.14), IValue::Int(2)]);
        let copy = pool.clone();
        assert_eq!(copy.len(), 2);
        assert_eq!(copy.get(1), Some(&IValue::Int(2)));
        assert!(Arc::ptr_eq(&pool.values, &copy.values));
    }

    #[test]
    fn test_pool_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ConstantPool>();
    }

    #[test]
    fn test_display() {
        let value = IValue::List(vec![IValue::Bool(true), IValue::None, IValue::Int(3)]);
        assert_eq!(value.to_string(), "[True, None, 3]");
    }
}
