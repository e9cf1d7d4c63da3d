//! Чтение S-выражений после заголовка.

use super::error::ParseError;
use super::lexer::Lexer;
use super::token::{Span, Spanned, Token};

/// S-Expression: атом или список.
#[derive(Debug, Clone, PartialEq)]
pub enum SExpr {
    /// Атом: число, строка или идентификатор.
    Atom(Spanned<Atom>),
    /// Список: (expr expr ...)
    List(Spanned<Vec<SExpr>>),
}

/// Атомарное значение.
#[derive(Debug, Clone, PartialEq)]
pub enum Atom {
    Int(i64),
    Float(f64),
    String(String),
    /// Идентификатор, возможно составной.
    Ident(String),
}

impl SExpr {
    /// Получить Span выражения.
    pub fn span(&self) -> Span {
        match self {
            SExpr::Atom(spanned) => spanned.span,
            SExpr::List(spanned) => spanned.span,
        }
    }

    /// Получить идентификатор из атома.
    pub fn as_ident(&self) -> Option<&str> {
        match self {
            SExpr::Atom(Spanned {
                value: Atom::Ident(s),
                ..
            }) => Some(s),
            _ => None,
        }
    }

    /// Получить список.
    pub fn as_list(&self) -> Option<&[SExpr]> {
        match self {
            SExpr::List(Spanned { value, .. }) => Some(value),
            _ => None,
        }
    }

    /// Имя формы: первый элемент списка, если это идентификатор.
    pub fn form_name(&self) -> Option<&str> {
        self.as_list()
            .and_then(|list| list.first())
            .and_then(|first| first.as_ident())
    }
}

/// Парсер S-Expression.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
}

impl<'a> Parser<'a> {
    /// Создать новый парсер.
    pub fn new(source: &'a str) -> Self {
        Self {
            lexer: Lexer::new(source),
        }
    }

    /// Доступ к лексеру (для заголовка версии).
    pub fn lexer_mut(&mut self) -> &mut Lexer<'a> {
        &mut self.lexer
    }

    /// Достигнут ли конец ввода.
    pub fn at_eof(&mut self) -> Result<bool, ParseError> {
        Ok(matches!(self.lexer.peek_token()?.value, Token::Eof))
    }

    /// Распарсить все оставшиеся S-выражения.
    pub fn parse_all(&mut self) -> Result<Vec<SExpr>, ParseError> {
        let mut exprs = Vec::new();
        while !self.at_eof()? {
            exprs.push(self.parse_sexpr()?);
        }
        Ok(exprs)
    }

    /// Распарсить одно S-выражение.
    pub fn parse_sexpr(&mut self) -> Result<SExpr, ParseError> {
        // Глубокая вложенность не должна переполнять стек
        stacker::maybe_grow(64 * 1024, 2 * 1024 * 1024, || {
            let token = self.lexer.next_token()?;

            match token.value {
                Token::LParen => self.parse_list(token.span),
                Token::Int(n) => Ok(SExpr::Atom(Spanned::new(Atom::Int(n), token.span))),
                Token::Float(f) => Ok(SExpr::Atom(Spanned::new(Atom::Float(f), token.span))),
                Token::String(s) => Ok(SExpr::Atom(Spanned::new(Atom::String(s), token.span))),
                Token::Ident(s) => Ok(SExpr::Atom(Spanned::new(Atom::Ident(s), token.span))),
                Token::Eof => Err(ParseError::unexpected_eof(token.span, "expected expression")),
                other => Err(ParseError::unexpected_token(token.span, "expression", &other)),
            }
        })
    }

    /// Распарсить список (после открывающей скобки).
    fn parse_list(&mut self, start_span: Span) -> Result<SExpr, ParseError> {
        let mut elements = Vec::new();

        loop {
            let token = self.lexer.peek_token()?;

            match &token.value {
                Token::RParen => {
                    let end_token = self.lexer.next_token()?;
                    let span = start_span.merge(end_token.span);
                    return Ok(SExpr::List(Spanned::new(elements, span)));
                }
                Token::Eof => {
                    return Err(ParseError::UnclosedParen { span: start_span });
                }
                _ => {
                    elements.push(self.parse_sexpr()?);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_atom() {
        let mut parser = Parser::new("42");
        let expr = parser.parse_sexpr().unwrap();
        assert!(matches!(
            expr,
            SExpr::Atom(Spanned {
                value: Atom::Int(42),
                ..
            })
        ));
    }

    #[test]
    fn test_parse_nested_across_lines() {
        let mut parser = Parser::new("(def f (self x)\n  (return (torch.add x 1)))");
        let expr = parser.parse_sexpr().unwrap();
        assert_eq!(expr.form_name(), Some("def"));
        let list = expr.as_list().unwrap();
        assert_eq!(list.len(), 4);
        assert!(list[2].as_list().is_some());
        assert!(parser.at_eof().unwrap());
    }

    #[test]
    fn test_parse_unclosed() {
        let mut parser = Parser::new("(def f (self)");
        assert!(matches!(
            parser.parse_sexpr(),
            Err(ParseError::UnclosedParen { .. })
        ));
    }

    #[test]
    fn test_parse_stray_assign() {
        let mut parser = Parser::new("=");
        assert!(matches!(
            parser.parse_sexpr(),
            Err(ParseError::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn test_parse_all() {
        let mut parser = Parser::new("(a) (b)\n(c)");
        assert_eq!(parser.parse_all().unwrap().len(), 3);
    }
}
