//! # scriptmod
//!
//! Импорт сериализованных методов модулей: исходник с заголовком версии и
//! определениями компилируется в графы и устанавливается в дерево модулей.
//!
//! ## Основные модули
//!
//! - [`parser`] - лексер, S-expression ридер, заголовок версии
//! - [`ast`] - определения методов и классов
//! - [`module`] - арена модулей и их слотов
//! - [`value`] - значения и таблица констант
//! - [`environment`] - фиксированное окружение имён
//! - [`sugared`] - символьные значения и разрешение атрибутов
//! - [`compiler`] - компиляция тел методов в графы
//! - [`import`] - импорт пакета методов или библиотеки классов
//! - [`descriptor`] - JSON-описания модулей и констант
//!
//! ## Пример
//!
//! ```rust,ignore
//! use scriptmod::{import_methods, ConstantPool, IValue, ModuleTree};
//!
//! let (mut tree, root) = ModuleTree::with_root("net");
//! let pool = ConstantPool::new(vec![IValue::Float(3.14)]);
//! let src = "op_version_set = 4\n(def f (self) (return CONSTANTS.c0))";
//! let names = import_methods(&mut tree, root, src, &pool).unwrap();
//! assert_eq!(names, vec!["f"]);
//! ```

pub mod ast;
pub mod compiler;
pub mod descriptor;
pub mod environment;
pub mod error;
pub mod import;
pub mod module;
pub mod parser;
pub mod sugared;
pub mod value;

pub use environment::Environment;
pub use error::{format_error, ImportError, ImportResult};
pub use import::{import_libs, import_methods, ClassLibrary, SourceImporter};
pub use module::{ModuleId, ModuleTree};
pub use sugared::SugaredValue;
pub use value::{ConstantPool, IValue};
