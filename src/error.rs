//! Ошибки импорта.
//!
//! Каждая ошибка несёт позицию идентификатора или литерала, который её вызвал.

use crate::module::ModuleId;
use crate::parser::error::ParseError;
use crate::parser::token::Span;
use thiserror::Error;

/// Основной тип `Result` для библиотеки.
pub type ImportResult<T> = Result<T, ImportError>;

/// Перечисление всех возможных ошибок импорта.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ImportError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Malformed version header at position {}: {message}", span.start)]
    HeaderFormat { span: Span, message: String },

    #[error("Expected an integral version but found {text} at position {}", span.start)]
    HeaderVersionNotIntegral { span: Span, text: String },

    #[error("Invalid constant specifier '{field}' at position {}", span.start)]
    MalformedConstantReference { span: Span, field: String },

    #[error("Constant index {index} is out of bounds at position {} (constant table has {len} entries)", span.start)]
    ConstantIndexOutOfRange {
        span: Span,
        index: String,
        len: usize,
    },

    #[error("Unknown attribute '{field}' on {owner} at position {}", span.start)]
    UnknownAttribute {
        span: Span,
        field: String,
        owner: String,
    },

    #[error("Unknown identifier '{name}' at position {}", span.start)]
    UnknownIdentifier { span: Span, name: String },

    #[error("Method '{name}' is already defined (position {})", span.start)]
    DuplicateMethod { span: Span, name: String },

    #[error("Class '{name}' is already defined (position {})", span.start)]
    DuplicateClass { span: Span, name: String },

    #[error("Module '{module}' already has a {category} named '{name}'")]
    DuplicateMember {
        module: String,
        category: &'static str,
        name: String,
    },

    #[error("Module {module:?} does not belong to this module tree")]
    ForeignModule { module: ModuleId },

    #[error("A {kind} cannot be used as a value (position {})", span.start)]
    NotAValue { span: Span, kind: String },

    #[error("A {kind} is not callable (position {})", span.start)]
    NotCallable { span: Span, kind: String },

    #[error("Method '{name}' expects {expected} arguments but got {got} (position {})", span.start)]
    ArityMismatch {
        span: Span,
        name: String,
        expected: usize,
        got: usize,
    },
}

impl ImportError {
    /// Создать ошибку формата заголовка.
    pub fn header_format(span: Span, message: impl Into<String>) -> Self {
        Self::HeaderFormat {
            span,
            message: message.into(),
        }
    }

    /// Создать ошибку "неизвестный атрибут".
    pub fn unknown_attribute(span: Span, field: impl Into<String>, owner: impl Into<String>) -> Self {
        Self::UnknownAttribute {
            span,
            field: field.into(),
            owner: owner.into(),
        }
    }

    /// Получить позицию ошибки. У ошибок построения дерева модулей позиции нет.
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::Parse(e) => Some(e.span()),
            Self::HeaderFormat { span, .. }
            | Self::HeaderVersionNotIntegral { span, .. }
            | Self::MalformedConstantReference { span, .. }
            | Self::ConstantIndexOutOfRange { span, .. }
            | Self::UnknownAttribute { span, .. }
            | Self::UnknownIdentifier { span, .. }
            | Self::DuplicateMethod { span, .. }
            | Self::DuplicateClass { span, .. }
            | Self::NotAValue { span, .. }
            | Self::NotCallable { span, .. }
            | Self::ArityMismatch { span, .. } => Some(*span),
            Self::DuplicateMember { .. } | Self::ForeignModule { .. } => None,
        }
    }
}

/// Форматировать ошибку с контекстом: строка, колонка и указатель.
pub fn format_error(source: &str, err: &ImportError) -> String {
    let Some(span) = err.span() else {
        return err.to_string();
    };

    let (line, col) = span.line_col(source);
    let line_text = source.lines().nth(line - 1).unwrap_or("");
    format!(
        "{}\n  --> {}:{}\n   | {}\n   | {}^",
        err,
        line,
        col,
        line_text,
        " ".repeat(col.saturating_sub(1))
    )
}
