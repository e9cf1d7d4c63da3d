//! Построитель дерева определений из S-Expression.

use super::error::ParseError;
use super::parser::{Atom, SExpr};
use super::token::{Span, Spanned};
use crate::ast::{ClassDef, Def, Expr, Ident, Path, Stmt};

/// Построитель определений.
#[derive(Debug, Default)]
pub struct DefBuilder;

impl DefBuilder {
    pub fn new() -> Self {
        Self
    }

    /// `(def name (self params...) body...)`
    pub fn build_def(&self, expr: &SExpr) -> Result<Def, ParseError> {
        let (elements, span) = expect_form(expr, "def")?;
        if elements.len() < 3 {
            return Err(ParseError::wrong_arity(
                span,
                "def",
                "name, parameter list and body",
                elements.len() - 1,
            ));
        }

        let name = self.build_name(&elements[1], "method name")?;
        let params = elements[2].as_list().ok_or_else(|| {
            ParseError::invalid_form(elements[2].span(), "expected parameter list")
        })?;
        let mut params = params
            .iter()
            .map(|p| self.build_name(p, "parameter name"))
            .collect::<Result<Vec<_>, _>>()?;
        if params.is_empty() {
            return Err(ParseError::invalid_form(
                elements[2].span(),
                format!("method '{}' must take self as its first parameter", name.name),
            ));
        }
        let self_param = params.remove(0);

        let body = elements[3..]
            .iter()
            .map(|s| self.build_stmt(s))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Def {
            name,
            self_param,
            params,
            body,
            span,
        })
    }

    /// `(class Name (def ...) ...)`
    pub fn build_class(&self, expr: &SExpr) -> Result<ClassDef, ParseError> {
        let (elements, span) = expect_form(expr, "class")?;
        if elements.len() < 2 {
            return Err(ParseError::wrong_arity(span, "class", "a name", 0));
        }

        let name = self.build_name(&elements[1], "class name")?;
        let defs = elements[2..]
            .iter()
            .map(|d| self.build_def(d))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ClassDef { name, defs, span })
    }

    /// Простое (не составное) имя.
    fn build_name(&self, expr: &SExpr, what: &str) -> Result<Ident, ParseError> {
        match expr.as_ident() {
            Some(name) if !name.contains('.') => Ok(Ident::new(name, expr.span())),
            _ => Err(ParseError::invalid_form(
                expr.span(),
                format!("expected {}", what),
            )),
        }
    }

    fn build_stmt(&self, expr: &SExpr) -> Result<Stmt, ParseError> {
        let span = expr.span();
        match expr.form_name() {
            Some("let") => {
                let elements = list_elements(expr);
                if elements.len() != 3 {
                    return Err(ParseError::wrong_arity(span, "let", "2", elements.len() - 1));
                }
                Ok(Stmt::Let {
                    name: self.build_name(&elements[1], "variable name")?,
                    value: self.build_expr(&elements[2])?,
                    span,
                })
            }
            Some("return") => {
                let elements = list_elements(expr);
                let value = match elements.len() {
                    1 => None,
                    2 => Some(self.build_expr(&elements[1])?),
                    n => return Err(ParseError::wrong_arity(span, "return", "0 or 1", n - 1)),
                };
                Ok(Stmt::Return { value, span })
            }
            _ => Ok(Stmt::Expr(self.build_expr(expr)?)),
        }
    }

    fn build_expr(&self, expr: &SExpr) -> Result<Expr, ParseError> {
        stacker::maybe_grow(64 * 1024, 2 * 1024 * 1024, || match expr {
            SExpr::Atom(atom) => Ok(self.build_atom(atom)),
            SExpr::List(list) => self.build_list(list),
        })
    }

    fn build_atom(&self, atom: &Spanned<Atom>) -> Expr {
        let span = atom.span;
        match &atom.value {
            Atom::Int(n) => Expr::Int(*n, span),
            Atom::Float(f) => Expr::Float(*f, span),
            Atom::String(s) => Expr::Str(s.clone(), span),
            Atom::Ident(s) => match s.as_str() {
                "True" => Expr::Bool(true, span),
                "False" => Expr::Bool(false, span),
                "None" => Expr::None(span),
                _ => Expr::Path(Path::from_dotted(s, span)),
            },
        }
    }

    fn build_list(&self, list: &Spanned<Vec<SExpr>>) -> Result<Expr, ParseError> {
        let elements = &list.value;
        let span = list.span;

        let first = elements
            .first()
            .ok_or_else(|| ParseError::invalid_form(span, "empty expression"))?;
        let head = first.as_ident().ok_or_else(|| {
            ParseError::invalid_form(first.span(), "expected a callee name")
        })?;

        match head {
            "if" => {
                if elements.len() != 4 {
                    return Err(ParseError::wrong_arity(span, "if", "3", elements.len() - 1));
                }
                Ok(Expr::If {
                    cond: Box::new(self.build_expr(&elements[1])?),
                    then_branch: Box::new(self.build_expr(&elements[2])?),
                    else_branch: Box::new(self.build_expr(&elements[3])?),
                    span,
                })
            }
            "let" | "return" | "def" | "class" => Err(ParseError::invalid_form(
                span,
                format!("'{}' is not allowed in expression position", head),
            )),
            _ => {
                let args = elements[1..]
                    .iter()
                    .map(|a| self.build_expr(a))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Expr::Call {
                    callee: Path::from_dotted(head, first.span()),
                    args,
                    span,
                })
            }
        }
    }
}

/// Проверить, что выражение является формой `(name ...)`, и вернуть её элементы.
fn expect_form<'e>(expr: &'e SExpr, name: &str) -> Result<(&'e [SExpr], Span), ParseError> {
    match expr.form_name() {
        Some(found) if found == name => Ok((list_elements(expr), expr.span())),
        Some(found) => Err(ParseError::unknown_form(
            expr.span(),
            found,
            format!("({} ...)", name),
        )),
        None => Err(ParseError::unknown_form(
            expr.span(),
            describe(expr),
            format!("({} ...)", name),
        )),
    }
}

fn list_elements(expr: &SExpr) -> &[SExpr] {
    expr.as_list().unwrap_or(&[])
}

fn describe(expr: &SExpr) -> String {
    match expr {
        SExpr::Atom(Spanned { value, .. }) => match value {
            Atom::Int(n) => n.to_string(),
            Atom::Float(f) => f.to_string(),
            Atom::String(s) => format!("\"{}\"", s),
            Atom::Ident(s) => s.clone(),
        },
        SExpr::List(_) => "list".to_string(),
    }
}
