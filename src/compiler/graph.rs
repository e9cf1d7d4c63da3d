//! Промежуточное представление тела метода.

use std::fmt;

use serde::Serialize;

use crate::module::{ModuleId, SlotId};
use crate::parser::token::Span;
use crate::value::IValue;

/// Идентификатор узла внутри графа метода.
pub type NodeId = usize;

/// Вид узла.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum NodeKind {
    /// Входной параметр метода
    Param { index: usize, name: String },
    /// Вставленная константа
    Constant(IValue),
    /// Зарегистрированный слот модуля (параметр, буфер, атрибут)
    MemberInput { slot: SlotId },
    /// Вызов встроенного оператора `namespace::name`
    Operator { qualified: String, version: u64 },
    /// Вызов метода модуля
    MethodCall { module: ModuleId, method: String },
    /// Асинхронный запуск вложенного вызова
    Fork,
    /// Аннотация типа; текст типа не интерпретируется
    Annotate { ty: String },
    If,
    Return,
}

/// Узел графа.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub inputs: Vec<NodeId>,
    /// Позиция в исходном коде.
    pub span: Span,
}

/// Граф метода: узлы в порядке вставки.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Graph {
    pub nodes: Vec<Node>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Добавить узел и вернуть его ID.
    pub fn add(&mut self, kind: NodeKind, inputs: Vec<NodeId>, span: Span) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node {
            id,
            kind,
            inputs,
            span,
        });
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Узлы заданного вида.
    pub fn find_all<'g>(&'g self, pred: impl Fn(&NodeKind) -> bool + 'g) -> impl Iterator<Item = &'g Node> + 'g {
        self.nodes.iter().filter(move |n| pred(&n.kind))
    }

    /// Значение, которое возвращает метод (вход последнего `Return`).
    pub fn returned(&self) -> Option<&Node> {
        let ret = self
            .nodes
            .iter()
            .rev()
            .find(|n| n.kind == NodeKind::Return)?;
        ret.inputs.first().and_then(|&id| self.node(id))
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Param { index, name } => write!(f, "param[{}] {}", index, name),
            NodeKind::Constant(value) => write!(f, "constant {}", value),
            NodeKind::MemberInput { slot } => write!(f, "member {:?}", slot),
            NodeKind::Operator { qualified, version } => write!(f, "{} (v{})", qualified, version),
            NodeKind::MethodCall { module, method } => write!(f, "call {:?}.{}", module, method),
            NodeKind::Fork => write!(f, "fork"),
            NodeKind::Annotate { ty } => write!(f, "annotate {}", ty),
            NodeKind::If => write!(f, "if"),
            NodeKind::Return => write!(f, "return"),
        }
    }
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in &self.nodes {
            let inputs: Vec<String> = node.inputs.iter().map(|i| format!("%{}", i)).collect();
            writeln!(f, "  %{} = {}({})", node.id, node.kind, inputs.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_returned_value() {
        let mut graph = Graph::new();
        let c = graph.add(NodeKind::Constant(IValue::Int(1)), vec![], Span::new(0, 1));
        graph.add(NodeKind::Return, vec![c], Span::new(0, 5));

        let node = graph.returned().unwrap();
        assert_eq!(node.kind, NodeKind::Constant(IValue::Int(1)));
    }

    #[test]
    fn test_display() {
        let mut graph = Graph::new();
        let x = graph.add(
            NodeKind::Param {
                index: 0,
                name: "x".to_string(),
            },
            vec![],
            Span::default(),
        );
        graph.add(
            NodeKind::Operator {
                qualified: "aten::relu".to_string(),
                version: 3,
            },
            vec![x],
            Span::default(),
        );
        let text = graph.to_string();
        assert!(text.contains("%0 = param[0] x()"));
        assert!(text.contains("%1 = aten::relu (v3)(%0)"));
    }
}
