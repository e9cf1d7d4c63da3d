//! Парсер исходника сериализованных методов.
//!
//! Исходник начинается с заголовка версии, после которого идут определения
//! в виде S-выражений.
//!
//! # Синтаксис
//!
//! ```lisp
//! op_version_set = 4
//!
//! ; Метод: имя, параметры (первый это self), тело
//! (def forward (self x)
//!   (let y (torch.add x self.weight))
//!   (return (self.helper y)))
//!
//! ; Блок класса (режим библиотеки)
//! (class Linear
//!   (def forward (self x) (return (torch.mm x self.weight))))
//!
//! ; Выражения
//! 42 3.14 "s" True False None     ; литералы
//! CONSTANTS.c0                    ; элемент таблицы констант
//! (if cond then else)             ; условие
//! (fork self.helper x)            ; асинхронный вызов
//! (annotate List x)               ; аннотация типа
//! ```
//!
//! Перевод строки значим только в заголовке.

pub mod builder;
pub mod error;
pub mod header;
pub mod lexer;
pub mod parser;
pub mod token;

pub use builder::DefBuilder;
pub use error::ParseError;
pub use header::parse_version_header;
pub use lexer::Lexer;
pub use parser::{Atom, Parser, SExpr};
pub use token::{Span, Spanned, Token};
