//! Определение пакета методов в модуле.
//!
//! Два прохода: сначала регистрируются все сигнатуры пакета, затем
//! компилируются тела. Поэтому метод может вызвать метод, объявленный ниже,
//! и методы могут взаимно рекурсивно вызывать друг друга. Методы попадают в
//! модуль только после того, как скомпилированы все тела.

use log::debug;

use crate::ast::{Def, Expr, Ident, Path, Stmt};
use crate::compiler::graph::{NodeId, NodeKind};
use crate::compiler::method::{BatchSignatures, MethodContext};
use crate::environment::Resolver;
use crate::error::{ImportError, ImportResult};
use crate::module::{ClassType, Method, ModuleId, ModuleTree, Signature};
use crate::parser::error::ParseError;
use crate::parser::token::Span;
use crate::sugared::{ModuleAccessor, SpecialForm, SugaredValue};
use crate::value::IValue;

/// Чем является `self` для методов пакета.
#[derive(Debug, Clone, PartialEq)]
pub struct SelfBinding {
    pub module: ModuleId,
    /// Номинальный тип для модулей, созданных блоком класса.
    pub class_type: Option<ClassType>,
}

impl SelfBinding {
    pub fn module(module: ModuleId) -> Self {
        Self {
            module,
            class_type: None,
        }
    }

    pub fn class(module: ModuleId, class_type: ClassType) -> Self {
        Self {
            module,
            class_type: Some(class_type),
        }
    }

    fn value(&self) -> SugaredValue {
        SugaredValue::Module(ModuleAccessor {
            module: self.module,
        })
    }
}

/// Скомпилировать пакет определений и установить методы в модуль.
///
/// `resolvers[i]` используется для свободных имён в `defs[i]`.
/// Возвращает имена установленных методов в порядке исходника.
pub fn define_methods_in_module(
    tree: &mut ModuleTree,
    defs: &[Def],
    resolvers: &[Resolver<'_>],
    self_binding: &SelfBinding,
) -> ImportResult<Vec<String>> {
    debug_assert_eq!(defs.len(), resolvers.len());
    let module = self_binding.module;
    tree.check(module)?;

    // Проход 1: сигнатуры
    let mut batch = BatchSignatures::default();
    for def in defs {
        let name = &def.name.name;
        let exists = tree.find_method(module, name).is_some() || batch.get(module, name).is_some();
        if exists {
            return Err(ImportError::DuplicateMethod {
                span: def.name.span,
                name: name.clone(),
            });
        }
        batch.insert(module, signature_of(def));
    }

    // Проход 2: тела
    let mut methods = Vec::with_capacity(defs.len());
    for (def, resolver) in defs.iter().zip(resolvers) {
        let compiler = MethodCompiler::new(tree, &batch, resolver, self_binding);
        methods.push(compiler.compile(def)?);
        debug!("compiled {}.{}", tree.path(module), def.name.name);
    }

    let names = methods.iter().map(|m| m.name().to_string()).collect();
    if let Some(class_type) = &self_binding.class_type {
        tree.set_class_type(module, class_type.clone());
    }
    tree.install_methods(module, methods);
    Ok(names)
}

fn signature_of(def: &Def) -> Signature {
    Signature {
        name: def.name.name.clone(),
        params: def.params.iter().map(|p| p.name.clone()).collect(),
    }
}

/// Компилятор тела одного метода.
struct MethodCompiler<'a, 'r> {
    ctx: MethodContext<'a>,
    resolver: &'a Resolver<'r>,
    self_binding: &'a SelfBinding,
}

impl<'a, 'r> MethodCompiler<'a, 'r> {
    fn new(
        tree: &'a ModuleTree,
        batch: &'a BatchSignatures,
        resolver: &'a Resolver<'r>,
        self_binding: &'a SelfBinding,
    ) -> Self {
        Self {
            ctx: MethodContext::new(tree, batch),
            resolver,
            self_binding,
        }
    }

    fn compile(mut self, def: &Def) -> ImportResult<Method> {
        self.ctx
            .define_local(def.self_param.name.clone(), self.self_binding.value());

        for (index, param) in def.params.iter().enumerate() {
            let node = self.ctx.graph_mut().add(
                NodeKind::Param {
                    index,
                    name: param.name.clone(),
                },
                vec![],
                param.span,
            );
            self.ctx
                .define_local(param.name.clone(), SugaredValue::Simple(node));
        }

        for stmt in &def.body {
            self.compile_stmt(stmt)?;
        }

        let (graph, member_inputs) = self.ctx.finish();
        Ok(Method {
            signature: signature_of(def),
            graph,
            member_inputs,
        })
    }

    fn compile_stmt(&mut self, stmt: &Stmt) -> ImportResult<()> {
        match stmt {
            Stmt::Let { name, value, .. } => {
                let node = self.compile_expr(value)?;
                self.ctx
                    .define_local(name.name.clone(), SugaredValue::Simple(node));
            }
            Stmt::Return { value, span } => {
                let node = match value {
                    Some(expr) => self.compile_expr(expr)?,
                    None => self.ctx.insert_constant(IValue::None, *span),
                };
                self.ctx.graph_mut().add(NodeKind::Return, vec![node], *span);
            }
            Stmt::Expr(expr) => {
                self.compile_expr(expr)?;
            }
        }
        Ok(())
    }

    fn compile_expr(&mut self, expr: &Expr) -> ImportResult<NodeId> {
        stacker::maybe_grow(64 * 1024, 2 * 1024 * 1024, || match expr {
            Expr::Int(n, span) => Ok(self.ctx.insert_constant(IValue::Int(*n), *span)),
            Expr::Float(f, span) => Ok(self.ctx.insert_constant(IValue::Float(*f), *span)),
            Expr::Str(s, span) => Ok(self.ctx.insert_constant(IValue::Str(s.clone()), *span)),
            Expr::Bool(b, span) => Ok(self.ctx.insert_constant(IValue::Bool(*b), *span)),
            Expr::None(span) => Ok(self.ctx.insert_constant(IValue::None, *span)),
            Expr::Path(path) => {
                let value = self.resolve_path(path)?;
                value.as_value(&mut self.ctx, path.span)
            }
            Expr::If {
                cond,
                then_branch,
                else_branch,
                span,
            } => {
                let inputs = vec![
                    self.compile_expr(cond)?,
                    self.compile_expr(then_branch)?,
                    self.compile_expr(else_branch)?,
                ];
                Ok(self.ctx.graph_mut().add(NodeKind::If, inputs, *span))
            }
            Expr::Call { callee, args, span } => self.compile_call(callee, args, *span),
        })
    }

    /// Локальные имена, затем резолвер, затем ошибка.
    fn lookup(&self, ident: &Ident) -> ImportResult<SugaredValue> {
        if let Some(value) = self.ctx.lookup_local(&ident.name) {
            return Ok(value);
        }
        (self.resolver)(&ident.name, &self.ctx, ident.span).ok_or_else(|| {
            ImportError::UnknownIdentifier {
                span: ident.span,
                name: ident.name.clone(),
            }
        })
    }

    fn resolve_path(&mut self, path: &Path) -> ImportResult<SugaredValue> {
        let mut value = self.lookup(path.head())?;
        for segment in path.tail() {
            value = value.resolve_attribute(&segment.name, &mut self.ctx, segment.span)?;
        }
        Ok(value)
    }

    fn compile_args(&mut self, args: &[Expr]) -> ImportResult<Vec<NodeId>> {
        args.iter().map(|a| self.compile_expr(a)).collect()
    }

    fn compile_call(&mut self, callee: &Path, args: &[Expr], span: Span) -> ImportResult<NodeId> {
        match self.resolve_path(callee)? {
            SugaredValue::Operator(op) => {
                let inputs = self.compile_args(args)?;
                Ok(self.ctx.graph_mut().add(
                    NodeKind::Operator {
                        qualified: op.qualified(),
                        version: op.version,
                    },
                    inputs,
                    span,
                ))
            }
            SugaredValue::Method(bound) => {
                let expected = self
                    .ctx
                    .signature(bound.module, &bound.name)
                    .map(|s| s.params.len())
                    .unwrap_or_default();
                if expected != args.len() {
                    return Err(ImportError::ArityMismatch {
                        span,
                        name: bound.name,
                        expected,
                        got: args.len(),
                    });
                }
                let inputs = self.compile_args(args)?;
                Ok(self.ctx.graph_mut().add(
                    NodeKind::MethodCall {
                        module: bound.module,
                        method: bound.name,
                    },
                    inputs,
                    span,
                ))
            }
            SugaredValue::SpecialForm(SpecialForm::Fork) => {
                let (target, rest) = match args.split_first() {
                    Some((Expr::Path(target), rest)) => (target, rest),
                    _ => {
                        return Err(ParseError::invalid_form(span, "fork expects a callable and its arguments").into())
                    }
                };
                let call = self.compile_call(target, rest, span)?;
                Ok(self.ctx.graph_mut().add(NodeKind::Fork, vec![call], span))
            }
            SugaredValue::SpecialForm(SpecialForm::Annotate) => match args {
                [Expr::Path(ty), value] => {
                    let input = self.compile_expr(value)?;
                    Ok(self.ctx.graph_mut().add(
                        NodeKind::Annotate { ty: ty.dotted() },
                        vec![input],
                        span,
                    ))
                }
                _ => Err(ParseError::invalid_form(span, "annotate expects a type name and a value").into()),
            },
            other => Err(ImportError::NotCallable {
                span: callee.span,
                kind: other.kind().to_string(),
            }),
        }
    }
}
