//! Лексер исходного текста модуля.
//!
//! Переводы строк возвращаются отдельным токеном: заголовок версии
//! заканчивается переводом строки, а дальше они игнорируются.

use logos::Logos;

use super::error::ParseError;
use super::token::{Span, Spanned, Token};

/// Внутренние токены для logos.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r]+")]
#[logos(skip r";[^\n]*")] // Комментарии ; до конца строки
enum LogosToken {
    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("=")]
    Assign,

    #[token("\n")]
    Newline,

    // Float: `4.`, `3.14`, `1e3`, `2.5E-1`
    #[regex(r"-?[0-9]+\.[0-9]*([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    #[regex(r"-?[0-9]+[eE][+-]?[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),

    #[regex(r"-?[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| {
        let s = lex.slice();
        Some(unescape_string(&s[1..s.len()-1]))
    })]
    String(String),

    // Составной идентификатор: self.sub.weight, CONSTANTS.c0
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*(\.[a-zA-Z_][a-zA-Z0-9_]*)*", |lex| lex.slice().to_string())]
    Ident(String),
}

/// Обработка escape-последовательностей в строке.
fn unescape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('t') => result.push('\t'),
                Some('r') => result.push('\r'),
                Some('\\') => result.push('\\'),
                Some('"') => result.push('"'),
                Some('0') => result.push('\0'),
                Some(other) => {
                    result.push('\\');
                    result.push(other);
                }
                None => result.push('\\'),
            }
        } else {
            result.push(c);
        }
    }

    result
}

/// Лексер.
pub struct Lexer<'a> {
    logos: logos::Lexer<'a, LogosToken>,
    source: &'a str,
    peeked: Option<Spanned<Token>>,
}

impl<'a> Lexer<'a> {
    /// Создать новый лексер.
    pub fn new(source: &'a str) -> Self {
        Self {
            logos: LogosToken::lexer(source),
            source,
            peeked: None,
        }
    }

    /// Следующий токен, включая переводы строк.
    pub fn next_raw(&mut self) -> Result<Spanned<Token>, ParseError> {
        if let Some(token) = self.peeked.take() {
            return Ok(token);
        }
        self.read_token()
    }

    /// Следующий значимый токен (переводы строк пропускаются).
    pub fn next_token(&mut self) -> Result<Spanned<Token>, ParseError> {
        loop {
            let token = self.next_raw()?;
            if token.value != Token::Newline {
                return Ok(token);
            }
        }
    }

    /// Посмотреть на следующий значимый токен без его потребления.
    pub fn peek_token(&mut self) -> Result<&Spanned<Token>, ParseError> {
        loop {
            match &self.peeked {
                Some(token) if token.value != Token::Newline => break,
                _ => self.peeked = Some(self.read_token()?),
            }
        }
        let end = self.source.len();
        self.peeked
            .as_ref()
            .ok_or_else(|| ParseError::unexpected_eof(Span::new(end, end), "expected token"))
    }

    /// Текст исходника под span.
    pub fn slice(&self, span: Span) -> &'a str {
        self.source.get(span.start..span.end).unwrap_or("")
    }

    fn read_token(&mut self) -> Result<Spanned<Token>, ParseError> {
        match self.logos.next() {
            Some(Ok(logos_token)) => {
                let span = Span::new(self.logos.span().start, self.logos.span().end);
                Ok(Spanned::new(convert_token(logos_token), span))
            }
            Some(Err(())) => {
                let span = Span::new(self.logos.span().start, self.logos.span().end);
                Err(ParseError::LexerError { span })
            }
            None => {
                let pos = self.source.len();
                Ok(Spanned::new(Token::Eof, Span::new(pos, pos)))
            }
        }
    }
}

fn convert_token(logos_token: LogosToken) -> Token {
    match logos_token {
        LogosToken::LParen => Token::LParen,
        LogosToken::RParen => Token::RParen,
        LogosToken::Assign => Token::Assign,
        LogosToken::Newline => Token::Newline,
        LogosToken::Float(f) => Token::Float(f),
        LogosToken::Int(n) => Token::Int(n),
        LogosToken::String(s) => Token::String(s),
        LogosToken::Ident(s) => Token::Ident(s),
    }
}
