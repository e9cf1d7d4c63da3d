//! Токены и позиции исходного текста.

use serde::{Deserialize, Serialize};

/// Позиция в исходном коде.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    /// Начальная позиция (байт).
    pub start: usize,
    /// Конечная позиция (байт).
    pub end: usize,
}

impl Span {
    /// Создать новый Span.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Объединить два Span.
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Строка и колонка начала (обе с единицы).
    pub fn line_col(&self, source: &str) -> (usize, usize) {
        let offset = self.start.min(source.len());
        let before = &source[..offset];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
        (line, offset - line_start + 1)
    }
}

/// Значение с позицией.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub value: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(value: T, span: Span) -> Self {
        Self { value, span }
    }
}

/// Типы токенов.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Открывающая скобка `(`
    LParen,
    /// Закрывающая скобка `)`
    RParen,
    /// Присваивание `=` (только в заголовке)
    Assign,
    /// Перевод строки (значим только в заголовке)
    Newline,

    /// Целое число
    Int(i64),
    /// Число с плавающей точкой
    Float(f64),
    /// Строковый литерал
    String(String),

    /// Идентификатор, возможно составной: `self.sub.weight`
    Ident(String),

    /// Конец файла
    Eof,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Assign => write!(f, "="),
            Token::Newline => write!(f, "newline"),
            Token::Int(n) => write!(f, "{}", n),
            Token::Float(n) => write!(f, "{}", n),
            Token::String(s) => write!(f, "\"{}\"", s),
            Token::Ident(s) => write!(f, "{}", s),
            Token::Eof => write!(f, "EOF"),
        }
    }
}
