//! Символьные значения: смысл свободного идентификатора во время компиляции.
//!
//! Набор вариантов закрыт. Доступ к атрибуту (`value.field`) и
//! материализация в значение графа реализованы сопоставлением с образцом.

use log::trace;

use crate::compiler::graph::NodeId;
use crate::compiler::method::MethodContext;
use crate::error::{ImportError, ImportResult};
use crate::module::ModuleId;
use crate::parser::token::Span;
use crate::value::{ConstantPool, IValue};

/// Префикс поля в `CONSTANTS.c<N>`.
pub const CONSTANT_PREFIX: char = 'c';

/// Доступ к модулю: `self`, `self.encoder`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleAccessor {
    pub module: ModuleId,
}

/// Пространство встроенных операторов для данной версии.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltinNamespace {
    pub name: String,
    pub version: u64,
}

/// Встроенный оператор `namespace::name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltinOperator {
    pub namespace: String,
    pub name: String,
    pub version: u64,
}

impl BuiltinOperator {
    pub fn qualified(&self) -> String {
        format!("{}::{}", self.namespace, self.name)
    }
}

/// Непосредственное значение. `span` есть у констант из таблицы: это место
/// обращения, а не место определения таблицы.
#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    pub value: IValue,
    pub span: Option<Span>,
}

/// Метод конкретного модуля; тело может быть ещё не скомпилировано.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundMethod {
    pub module: ModuleId,
    pub name: String,
}

/// Особые формы, которые передаются компилятору без интерпретации.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialForm {
    Fork,
    Annotate,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SugaredValue {
    Module(ModuleAccessor),
    Namespace(BuiltinNamespace),
    /// `ops`: любое поле создаёт пространство с этим именем
    OpsRoot { version: u64 },
    ConstantTable(ConstantPool),
    Constant(Literal),
    Method(BoundMethod),
    Operator(BuiltinOperator),
    SpecialForm(SpecialForm),
    /// Уже материализованное значение графа
    Simple(NodeId),
}

impl SugaredValue {
    /// Короткое имя варианта для диагностики.
    pub fn kind(&self) -> &'static str {
        match self {
            SugaredValue::Module(_) => "module",
            SugaredValue::Namespace(_) => "builtin namespace",
            SugaredValue::OpsRoot { .. } => "ops",
            SugaredValue::ConstantTable(_) => "CONSTANTS",
            SugaredValue::Constant(_) => "constant",
            SugaredValue::Method(_) => "method",
            SugaredValue::Operator(_) => "builtin operator",
            SugaredValue::SpecialForm(SpecialForm::Fork) => "fork",
            SugaredValue::SpecialForm(SpecialForm::Annotate) => "annotate",
            SugaredValue::Simple(_) => "value",
        }
    }

    /// Разрешить `self.field`.
    pub fn resolve_attribute(
        &self,
        field: &str,
        ctx: &mut MethodContext<'_>,
        span: Span,
    ) -> ImportResult<SugaredValue> {
        match self {
            SugaredValue::Module(accessor) => accessor.resolve_attribute(field, ctx, span),
            SugaredValue::Namespace(ns) => Ok(SugaredValue::Operator(BuiltinOperator {
                namespace: ns.name.clone(),
                name: field.to_string(),
                version: ns.version,
            })),
            SugaredValue::OpsRoot { version } => Ok(SugaredValue::Namespace(BuiltinNamespace {
                name: field.to_string(),
                version: *version,
            })),
            SugaredValue::ConstantTable(pool) => resolve_constant(pool, field, span),
            other => Err(ImportError::unknown_attribute(span, field, other.kind())),
        }
    }

    /// Материализовать как значение графа.
    pub fn as_value(&self, ctx: &mut MethodContext<'_>, span: Span) -> ImportResult<NodeId> {
        match self {
            SugaredValue::Constant(literal) => {
                Ok(ctx.insert_constant(literal.value.clone(), literal.span.unwrap_or(span)))
            }
            SugaredValue::Simple(node) => Ok(*node),
            other => Err(ImportError::NotAValue {
                span,
                kind: other.kind().to_string(),
            }),
        }
    }
}

impl ModuleAccessor {
    /// Порядок строгий, побеждает первое совпадение: подмодуль, параметр,
    /// буфер, атрибут, метод.
    pub fn resolve_attribute(
        &self,
        field: &str,
        ctx: &mut MethodContext<'_>,
        span: Span,
    ) -> ImportResult<SugaredValue> {
        let tree = ctx.tree();

        let resolved = if let Some(sub) = tree.find_module(self.module, field) {
            SugaredValue::Module(ModuleAccessor { module: sub })
        } else if let Some(slot) = tree.find_parameter(self.module, field) {
            SugaredValue::Simple(ctx.get_or_add_parameter(slot, span))
        } else if let Some(slot) = tree.find_buffer(self.module, field) {
            SugaredValue::Simple(ctx.get_or_add_parameter(slot, span))
        } else if let Some((slot, ty)) = tree.find_attribute(self.module, field) {
            SugaredValue::Simple(ctx.get_or_add_attribute(ty, slot, span))
        } else if ctx.signature(self.module, field).is_some() {
            SugaredValue::Method(BoundMethod {
                module: self.module,
                name: field.to_string(),
            })
        } else {
            return Err(ImportError::unknown_attribute(
                span,
                field,
                format!("module '{}'", tree.path(self.module)),
            ));
        };

        trace!("{}.{} -> {}", tree.path(self.module), field, resolved.kind());
        Ok(resolved)
    }
}

/// `CONSTANTS.c<N>`: буква-префикс и одна или больше десятичных цифр.
fn resolve_constant(pool: &ConstantPool, field: &str, span: Span) -> ImportResult<SugaredValue> {
    let digits = field
        .strip_prefix(CONSTANT_PREFIX)
        .filter(|d| !d.is_empty() && d.bytes().all(|b| b.is_ascii_digit()))
        .ok_or_else(|| ImportError::MalformedConstantReference {
            span,
            field: field.to_string(),
        })?;

    let index = digits.parse::<usize>().ok();
    let value = index
        .and_then(|i| pool.get(i))
        .ok_or_else(|| ImportError::ConstantIndexOutOfRange {
            span,
            index: index.map(|i| i.to_string()).unwrap_or_else(|| digits.to_string()),
            len: pool.len(),
        })?;

    Ok(SugaredValue::Constant(Literal {
        value: value.clone(),
        span: Some(span),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::graph::NodeKind;
    use crate::compiler::method::BatchSignatures;
    use crate::module::{AttributeType, ModuleTree, Signature};
    use ndarray::{ArrayD, IxDyn};

    fn pool() -> ConstantPool {
        ConstantPool::new(vec![IValue::Float(3.14), IValue::Int(7)])
    }

    fn table() -> SugaredValue {
        SugaredValue::ConstantTable(pool())
    }

    #[test]
    fn test_constant_in_range() {
        let (tree, _) = ModuleTree::with_root("m");
        let batch = BatchSignatures::default();
        let mut ctx = MethodContext::new(&tree, &batch);
        let span = Span::new(20, 32);

        match table().resolve_attribute("c1", &mut ctx, span).unwrap() {
            SugaredValue::Constant(literal) => {
                assert_eq!(literal.value, IValue::Int(7));
                assert_eq!(literal.span, Some(span));
            }
            other => panic!("Expected constant, got {:?}", other),
        }
        assert!(matches!(
            table().resolve_attribute("c007", &mut ctx, span),
            Err(ImportError::ConstantIndexOutOfRange { ref index, .. }) if index == "7"
        ));
        assert!(matches!(
            table().resolve_attribute("c00", &mut ctx, span).unwrap(),
            SugaredValue::Constant(Literal { value: IValue::Float(_), .. })
        ));
    }

    #[test]
    fn test_constant_out_of_range() {
        let (tree, _) = ModuleTree::with_root("m");
        let batch = BatchSignatures::default();
        let mut ctx = MethodContext::new(&tree, &batch);

        match table().resolve_attribute("c2", &mut ctx, Span::default()).unwrap_err() {
            ImportError::ConstantIndexOutOfRange { index, len, .. } => {
                assert_eq!(index, "2");
                assert_eq!(len, 2);
            }
            other => panic!("Expected out of range, got {:?}", other),
        }
        assert!(matches!(
            table().resolve_attribute("c99999999999999999999999", &mut ctx, Span::default()),
            Err(ImportError::ConstantIndexOutOfRange { .. })
        ));
    }

    #[test]
    fn test_malformed_constant() {
        let (tree, _) = ModuleTree::with_root("m");
        let batch = BatchSignatures::default();
        let mut ctx = MethodContext::new(&tree, &batch);

        for field in ["c", "x0", "c1a", "c-1", "c+1", "C0", "0"] {
            match table().resolve_attribute(field, &mut ctx, Span::default()) {
                Err(ImportError::MalformedConstantReference { field: f, .. }) => assert_eq!(f, field),
                other => panic!("Expected malformed for {}, got {:?}", field, other),
            }
        }
    }

    #[test]
    fn test_submodule_wins_over_method() {
        let (mut tree, root) = ModuleTree::with_root("m");
        let sub = tree.add_submodule(root, "helper").unwrap();
        let mut batch = BatchSignatures::default();
        batch.insert(
            root,
            Signature {
                name: "helper".to_string(),
                params: vec![],
            },
        );
        let mut ctx = MethodContext::new(&tree, &batch);
        let accessor = ModuleAccessor { module: root };

        let value = accessor
            .resolve_attribute("helper", &mut ctx, Span::default())
            .unwrap();
        assert_eq!(value, SugaredValue::Module(ModuleAccessor { module: sub }));
    }

    #[test]
    fn test_parameter_before_attribute_and_method() {
        let (mut tree, root) = ModuleTree::with_root("m");
        tree.add_parameter(root, "w", ArrayD::zeros(IxDyn(&[2]))).unwrap();
        tree.add_attribute(root, "w", AttributeType::Int, IValue::Int(1))
            .unwrap();
        let batch = BatchSignatures::default();
        let mut ctx = MethodContext::new(&tree, &batch);

        let value = ModuleAccessor { module: root }
            .resolve_attribute("w", &mut ctx, Span::default())
            .unwrap();
        assert!(matches!(value, SugaredValue::Simple(_)));
        assert_eq!(ctx.member_inputs().len(), 1);
        assert_eq!(ctx.member_inputs()[0].ty, None);
    }

    #[test]
    fn test_slot_registered_once() {
        let (mut tree, root) = ModuleTree::with_root("m");
        tree.add_buffer(root, "mean", ArrayD::zeros(IxDyn(&[2]))).unwrap();
        let batch = BatchSignatures::default();
        let mut ctx = MethodContext::new(&tree, &batch);
        let accessor = ModuleAccessor { module: root };

        let first = accessor.resolve_attribute("mean", &mut ctx, Span::new(1, 2)).unwrap();
        let second = accessor.resolve_attribute("mean", &mut ctx, Span::new(5, 6)).unwrap();
        let third = accessor.resolve_attribute("mean", &mut ctx, Span::new(9, 10)).unwrap();

        assert_eq!(first, second);
        assert_eq!(second, third);
        assert_eq!(ctx.member_inputs().len(), 1);
        assert_eq!(
            ctx.graph()
                .find_all(|k| matches!(k, NodeKind::MemberInput { .. }))
                .count(),
            1
        );
    }

    #[test]
    fn test_unknown_attribute_on_module() {
        let (tree, root) = ModuleTree::with_root("net");
        let batch = BatchSignatures::default();
        let mut ctx = MethodContext::new(&tree, &batch);
        let span = Span::new(3, 9);

        let accessor = ModuleAccessor { module: root };
        match accessor.resolve_attribute("nothing", &mut ctx, span) {
            Err(ImportError::UnknownAttribute { field, span: s, owner }) => {
                assert_eq!(field, "nothing");
                assert_eq!(s, span);
                assert!(owner.contains("net"));
            }
            other => panic!("Expected unknown attribute, got {:?}", other),
        }
    }

    #[test]
    fn test_ops_root_is_lazy() {
        let (tree, _) = ModuleTree::with_root("m");
        let batch = BatchSignatures::default();
        let mut ctx = MethodContext::new(&tree, &batch);
        let ops = SugaredValue::OpsRoot { version: 2 };

        let ns = ops.resolve_attribute("quantized", &mut ctx, Span::default()).unwrap();
        assert_eq!(
            ns,
            SugaredValue::Namespace(BuiltinNamespace {
                name: "quantized".to_string(),
                version: 2
            })
        );
        match ns.resolve_attribute("linear", &mut ctx, Span::default()).unwrap() {
            SugaredValue::Operator(op) => assert_eq!(op.qualified(), "quantized::linear"),
            other => panic!("Expected operator, got {:?}", other),
        }
    }

    #[test]
    fn test_only_constants_and_values_materialize() {
        let (tree, root) = ModuleTree::with_root("m");
        let batch = BatchSignatures::default();
        let mut ctx = MethodContext::new(&tree, &batch);

        let literal = SugaredValue::Constant(Literal {
            value: IValue::Float(f64::INFINITY),
            span: None,
        });
        let node = literal.as_value(&mut ctx, Span::new(4, 7)).unwrap();
        assert_eq!(ctx.graph().node(node).unwrap().span, Span::new(4, 7));

        let module = SugaredValue::Module(ModuleAccessor { module: root });
        assert!(matches!(
            module.as_value(&mut ctx, Span::default()),
            Err(ImportError::NotAValue { .. })
        ));
        assert!(matches!(
            table().as_value(&mut ctx, Span::default()),
            Err(ImportError::NotAValue { .. })
        ));
    }
}
