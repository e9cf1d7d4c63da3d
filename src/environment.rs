//! Лексическое окружение импорта и цепочка разрешения имён.
//!
//! Окружение строится один раз на импорт, после разбора заголовка, и дальше
//! не меняется. Состояние модулей оно не читает.

use std::collections::HashMap;
use std::rc::Rc;

use crate::compiler::method::MethodContext;
use crate::parser::token::Span;
use crate::sugared::{BuiltinNamespace, Literal, SpecialForm, SugaredValue};
use crate::value::{ConstantPool, IValue};

/// Корень встроенных операторов и пространство, в которое он ведёт.
pub const BUILTIN_ROOT: &str = "torch";
pub const BUILTIN_NAMESPACE: &str = "aten";
pub const OPS_ROOT: &str = "ops";
pub const CONSTANTS_ROOT: &str = "CONSTANTS";

/// Функция разрешения свободного идентификатора. `None`, если имя не найдено.
pub type Resolver<'r> = Rc<dyn Fn(&str, &MethodContext<'_>, Span) -> Option<SugaredValue> + 'r>;

/// Неизменяемое отображение известных имён в символьные значения.
#[derive(Debug, Clone)]
pub struct Environment {
    version: u64,
    entries: HashMap<&'static str, SugaredValue>,
}

impl Environment {
    pub fn new(version: u64, constants: ConstantPool) -> Self {
        let literal = |value| {
            SugaredValue::Constant(Literal {
                value: IValue::Float(value),
                span: None,
            })
        };

        let entries = HashMap::from([
            (
                BUILTIN_ROOT,
                SugaredValue::Namespace(BuiltinNamespace {
                    name: BUILTIN_NAMESPACE.to_string(),
                    version,
                }),
            ),
            (OPS_ROOT, SugaredValue::OpsRoot { version }),
            (CONSTANTS_ROOT, SugaredValue::ConstantTable(constants)),
            ("fork", SugaredValue::SpecialForm(SpecialForm::Fork)),
            ("annotate", SugaredValue::SpecialForm(SpecialForm::Annotate)),
            ("inf", literal(f64::INFINITY)),
            ("nan", literal(f64::NAN)),
        ]);

        Self { version, entries }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn resolve(&self, name: &str) -> Option<SugaredValue> {
        self.entries.get(name).cloned()
    }

    /// Резолвер поверх окружения для компилятора методов.
    pub fn resolver(&self) -> Resolver<'_> {
        resolver_from(move |name, _ctx, _span| self.resolve(name))
    }
}

/// Упаковать функцию разрешения в [`Resolver`].
pub fn resolver_from<'r, F>(resolve: F) -> Resolver<'r>
where
    F: Fn(&str, &MethodContext<'_>, Span) -> Option<SugaredValue> + 'r,
{
    Rc::new(resolve)
}
