//! Контекст компилируемого метода.

use std::collections::HashMap;

use crate::compiler::graph::{Graph, NodeId, NodeKind};
use crate::module::{AttributeType, MemberInput, ModuleId, ModuleTree, Signature, SlotId};
use crate::parser::token::Span;
use crate::sugared::SugaredValue;
use crate::value::IValue;

/// Сигнатуры текущего пакета определений, ещё не установленные в модули.
#[derive(Debug, Clone, Default)]
pub struct BatchSignatures {
    by_module: HashMap<ModuleId, Vec<Signature>>,
}

impl BatchSignatures {
    pub fn insert(&mut self, module: ModuleId, signature: Signature) {
        self.by_module.entry(module).or_default().push(signature);
    }

    pub fn get(&self, module: ModuleId, name: &str) -> Option<&Signature> {
        self.by_module.get(&module)?.iter().find(|s| s.name == name)
    }
}

/// Состояние компиляции одного метода: граф, локальные имена и
/// зарегистрированные слоты модуля.
pub struct MethodContext<'a> {
    tree: &'a ModuleTree,
    batch: &'a BatchSignatures,
    graph: Graph,
    locals: HashMap<String, SugaredValue>,
    member_inputs: Vec<MemberInput>,
    /// Узел графа для каждого уже зарегистрированного слота
    registered: HashMap<SlotId, NodeId>,
}

impl<'a> MethodContext<'a> {
    pub fn new(tree: &'a ModuleTree, batch: &'a BatchSignatures) -> Self {
        Self {
            tree,
            batch,
            graph: Graph::new(),
            locals: HashMap::new(),
            member_inputs: Vec::new(),
            registered: HashMap::new(),
        }
    }

    pub fn tree(&self) -> &'a ModuleTree {
        self.tree
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    pub fn member_inputs(&self) -> &[MemberInput] {
        &self.member_inputs
    }

    /// Сигнатура метода: установленного или объявленного в текущем пакете.
    pub fn signature(&self, module: ModuleId, name: &str) -> Option<&'a Signature> {
        self.tree
            .find_method(module, name)
            .map(|m| &m.signature)
            .or_else(|| self.batch.get(module, name))
    }

    /// Параметр или буфер. Повторные обращения к тому же слоту возвращают
    /// тот же узел.
    pub fn get_or_add_parameter(&mut self, slot: SlotId, span: Span) -> NodeId {
        self.register(slot, None, span)
    }

    /// Атрибут; тип записывается вместе с регистрацией.
    pub fn get_or_add_attribute(&mut self, ty: AttributeType, slot: SlotId, span: Span) -> NodeId {
        self.register(slot, Some(ty), span)
    }

    fn register(&mut self, slot: SlotId, ty: Option<AttributeType>, span: Span) -> NodeId {
        if let Some(&node) = self.registered.get(&slot) {
            return node;
        }
        let node = self.graph.add(NodeKind::MemberInput { slot }, vec![], span);
        self.member_inputs.push(MemberInput {
            slot,
            kind: self.tree.slot(slot).kind,
            ty,
        });
        self.registered.insert(slot, node);
        node
    }

    pub fn insert_constant(&mut self, value: IValue, span: Span) -> NodeId {
        self.graph.add(NodeKind::Constant(value), vec![], span)
    }

    pub fn define_local(&mut self, name: impl Into<String>, value: SugaredValue) {
        self.locals.insert(name.into(), value);
    }

    pub fn lookup_local(&self, name: &str) -> Option<SugaredValue> {
        self.locals.get(name).cloned()
    }

    /// Завершить компиляцию: граф и список слотов.
    pub fn finish(self) -> (Graph, Vec<MemberInput>) {
        (self.graph, self.member_inputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::SlotKind;

    #[test]
    fn test_attribute_registration_records_type() {
        let (mut tree, root) = ModuleTree::with_root("m");
        let slot = tree
            .add_attribute(root, "scale", AttributeType::Float, IValue::Float(0.5))
            .unwrap();
        let batch = BatchSignatures::default();
        let mut ctx = MethodContext::new(&tree, &batch);

        let a = ctx.get_or_add_attribute(AttributeType::Float, slot, Span::new(0, 1));
        let b = ctx.get_or_add_attribute(AttributeType::Float, slot, Span::new(2, 3));
        assert_eq!(a, b);

        let (graph, inputs) = ctx.finish();
        assert_eq!(graph.len(), 1);
        assert_eq!(
            inputs,
            vec![MemberInput {
                slot,
                kind: SlotKind::Attribute(AttributeType::Float),
                ty: Some(AttributeType::Float),
            }]
        );
    }

    #[test]
    fn test_signature_from_batch() {
        let (tree, root) = ModuleTree::with_root("m");
        let mut batch = BatchSignatures::default();
        batch.insert(
            root,
            Signature {
                name: "later".to_string(),
                params: vec!["x".to_string()],
            },
        );
        let ctx = MethodContext::new(&tree, &batch);
        assert_eq!(ctx.signature(root, "later").unwrap().params.len(), 1);
        assert!(ctx.signature(root, "missing").is_none());
    }
}
