//! Дерево определений: методы, классы, инструкции и выражения.

use crate::parser::token::Span;

/// Имя с позицией.
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

/// Составное имя `a.b.c`; у каждого сегмента своя позиция.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub segments: Vec<Ident>,
    pub span: Span,
}

impl Path {
    /// Разбить текст составного идентификатора на сегменты.
    pub fn from_dotted(text: &str, span: Span) -> Self {
        let mut offset = span.start;
        let segments = text
            .split('.')
            .map(|segment| {
                let ident = Ident::new(segment, Span::new(offset, offset + segment.len()));
                offset += segment.len() + 1;
                ident
            })
            .collect();
        Self { segments, span }
    }

    /// Первый сегмент.
    pub fn head(&self) -> &Ident {
        &self.segments[0]
    }

    /// Сегменты после первого.
    pub fn tail(&self) -> &[Ident] {
        &self.segments[1..]
    }

    /// Исходный текст пути.
    pub fn dotted(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// Выражение тела метода.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Int(i64, Span),
    Float(f64, Span),
    Str(String, Span),
    Bool(bool, Span),
    None(Span),
    Path(Path),
    /// (if cond then else)
    If {
        cond: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
        span: Span,
    },
    /// (callee arg ...)
    Call {
        callee: Path,
        args: Vec<Expr>,
        span: Span,
    },
}

/// Инструкция тела метода.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Let {
        name: Ident,
        value: Expr,
        span: Span,
    },
    Return {
        value: Option<Expr>,
        span: Span,
    },
    Expr(Expr),
}

/// Определение метода: `(def name (self p ...) body ...)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Def {
    pub name: Ident,
    /// Имя, под которым в теле доступен сам модуль.
    pub self_param: Ident,
    pub params: Vec<Ident>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// Блок класса: `(class Name (def ...) ...)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDef {
    pub name: Ident,
    pub defs: Vec<Def>,
    pub span: Span,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_segments_keep_spans() {
        let path = Path::from_dotted("self.sub.weight", Span::new(10, 25));
        let names: Vec<_> = path.segments.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["self", "sub", "weight"]);
        assert_eq!(path.segments[1].span, Span::new(15, 18));
        assert_eq!(path.segments[2].span, Span::new(19, 25));
        assert_eq!(path.dotted(), "self.sub.weight");
    }
}
