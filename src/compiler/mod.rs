//! Компиляция тел методов в графы.
//!
//! - [`graph`] - граф операций метода
//! - [`method`] - состояние компиляции одного метода
//! - [`define`] - установка пакета методов в модуль

pub mod define;
pub mod graph;
pub mod method;

pub use define::{define_methods_in_module, SelfBinding};
pub use graph::{Graph, Node, NodeId, NodeKind};
pub use method::{BatchSignatures, MethodContext};
