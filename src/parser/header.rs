//! Заголовок версии: первая строка исходника `op_version_set = <N>`.

use super::error::ParseError;
use super::lexer::Lexer;
use super::token::{Span, Spanned, Token};
use crate::error::{ImportError, ImportResult};

/// Имя, которому присваивается версия.
pub const VERSION_FIELD: &str = "op_version_set";

/// Прочитать заголовок и вернуть версию набора операторов.
///
/// Лексер должен стоять в начале исходника; после успешного разбора он
/// стоит сразу за переводом строки.
pub fn parse_version_header(lexer: &mut Lexer<'_>) -> ImportResult<u64> {
    let name = next_header_token(lexer)?;
    match &name.value {
        Token::Ident(ident) if ident == VERSION_FIELD => {}
        other => {
            return Err(ImportError::header_format(
                name.span,
                format!("expected an assignment to {}, found {}", VERSION_FIELD, other),
            ))
        }
    }

    let assign = next_header_token(lexer)?;
    if assign.value != Token::Assign {
        return Err(ImportError::header_format(
            assign.span,
            format!("expected '=', found {}", assign.value),
        ));
    }

    let version = match lexer.next_raw() {
        Ok(Spanned {
            value: Token::Int(_),
            span,
        }) => parse_version(lexer.slice(span), span)?,
        // Целое, не поместившееся в i64
        Err(ParseError::LexerError { span }) if is_integer_literal(lexer.slice(span)) => {
            parse_version(lexer.slice(span), span)?
        }
        Ok(Spanned {
            value: Token::Float(_),
            span,
        }) => {
            return Err(ImportError::HeaderVersionNotIntegral {
                span,
                text: lexer.slice(span).to_string(),
            })
        }
        Ok(other) => {
            return Err(ImportError::header_format(
                other.span,
                format!("expected a version number, found {}", other.value),
            ))
        }
        Err(e) => return Err(unreadable(lexer, e)),
    };

    let end = next_header_token(lexer)?;
    if end.value != Token::Newline {
        return Err(ImportError::header_format(
            end.span,
            format!("expected a line break after the version, found {}", end.value),
        ));
    }

    Ok(version)
}

fn next_header_token(lexer: &mut Lexer<'_>) -> ImportResult<Spanned<Token>> {
    lexer.next_raw().map_err(|e| unreadable(lexer, e))
}

fn unreadable(lexer: &Lexer<'_>, err: ParseError) -> ImportError {
    let span = err.span();
    ImportError::header_format(span, format!("unreadable token '{}'", lexer.slice(span)))
}

fn is_integer_literal(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Версия читается из текста литерала: диапазон `u64` шире, чем у `Token::Int`.
fn parse_version(text: &str, span: Span) -> ImportResult<u64> {
    if text.starts_with('-') {
        return Err(ImportError::header_format(
            span,
            format!("expected a non-negative version, found {}", text),
        ));
    }
    text.parse::<u64>().map_err(|_| {
        ImportError::header_format(span, format!("version {} does not fit in 64 bits", text))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> ImportResult<u64> {
        parse_version_header(&mut Lexer::new(src))
    }

    #[test]
    fn test_valid_header() {
        assert_eq!(parse("op_version_set = 0\n").unwrap(), 0);
        assert_eq!(parse("op_version_set = 4\n(def f (self))").unwrap(), 4);
        assert_eq!(parse("op_version_set=17\n").unwrap(), 17);
    }

    #[test]
    fn test_header_leaves_lexer_after_newline() {
        let mut lexer = Lexer::new("op_version_set = 2\n(");
        parse_version_header(&mut lexer).unwrap();
        assert_eq!(lexer.next_raw().unwrap().value, Token::LParen);
    }

    #[test]
    fn test_wrong_name() {
        match parse("version = 1\n").unwrap_err() {
            ImportError::HeaderFormat { span, message } => {
                assert_eq!(span, Span::new(0, 7));
                assert!(message.contains("version"));
            }
            other => panic!("Expected HeaderFormat, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_number() {
        assert!(matches!(
            parse("op_version_set = \n"),
            Err(ImportError::HeaderFormat { .. })
        ));
        assert!(matches!(
            parse("op_version_set 3\n"),
            Err(ImportError::HeaderFormat { .. })
        ));
    }

    #[test]
    fn test_float_version() {
        match parse("op_version_set = 4.5\n").unwrap_err() {
            ImportError::HeaderVersionNotIntegral { text, .. } => assert_eq!(text, "4.5"),
            other => panic!("Expected HeaderVersionNotIntegral, got {:?}", other),
        }
    }

    #[test]
    fn test_exponent_and_trailing_dot_are_not_integral() {
        for (src, literal) in [("op_version_set = 4.\n", "4."), ("op_version_set = 1e3\n", "1e3")] {
            match parse(src).unwrap_err() {
                ImportError::HeaderVersionNotIntegral { text, .. } => assert_eq!(text, literal),
                other => panic!("Expected HeaderVersionNotIntegral, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_version_uses_full_u64_range() {
        assert_eq!(
            parse("op_version_set = 9223372036854775808\n").unwrap(),
            9_223_372_036_854_775_808
        );
        assert_eq!(
            parse(&format!("op_version_set = {}\n", u64::MAX)).unwrap(),
            u64::MAX
        );
        assert!(matches!(
            parse("op_version_set = 18446744073709551616\n"),
            Err(ImportError::HeaderFormat { .. })
        ));
        assert!(matches!(
            parse("op_version_set = -99999999999999999999\n"),
            Err(ImportError::HeaderFormat { .. })
        ));
    }

    #[test]
    fn test_negative_version() {
        assert!(matches!(
            parse("op_version_set = -1\n"),
            Err(ImportError::HeaderFormat { .. })
        ));
    }

    #[test]
    fn test_missing_line_break() {
        assert!(matches!(
            parse("op_version_set = 1"),
            Err(ImportError::HeaderFormat { .. })
        ));
        assert!(matches!(
            parse("op_version_set = 1 (def f (self))\n"),
            Err(ImportError::HeaderFormat { .. })
        ));
    }

    #[test]
    fn test_header_must_be_first_line() {
        assert!(matches!(
            parse("\nop_version_set = 1\n"),
            Err(ImportError::HeaderFormat { .. })
        ));
        assert!(matches!(
            parse("@ = 1\n"),
            Err(ImportError::HeaderFormat { .. })
        ));
    }
}
