//! Импорт исходника: заголовок, окружение и пакет определений.
//!
//! Два режима:
//! - [`import_methods`] - плоский список `def`, устанавливаемый в уже
//!   существующий модуль;
//! - [`import_libs`] - последовательность блоков `class`, каждый из которых
//!   создаёт новый модуль со своим номинальным типом.
//!
//! Ошибка в любом месте прерывает весь импорт; частичный результат не
//! устанавливается и не возвращается.

use log::debug;

use crate::ast::{ClassDef, Def};
use crate::compiler::define::{define_methods_in_module, SelfBinding};
use crate::environment::{Environment, Resolver};
use crate::error::{ImportError, ImportResult};
use crate::module::{ClassType, ModuleId, ModuleTree};
use crate::parser::header::parse_version_header;
use crate::parser::{DefBuilder, Parser};
use crate::value::ConstantPool;

/// Состояние разбора одного исходника.
pub struct SourceImporter<'s> {
    parser: Parser<'s>,
    builder: DefBuilder,
    env: Environment,
}

impl<'s> SourceImporter<'s> {
    /// Разобрать заголовок и построить окружение для его версии.
    pub fn new(src: &'s str, constants: &ConstantPool) -> ImportResult<Self> {
        let mut parser = Parser::new(src);
        let version = parse_version_header(parser.lexer_mut())?;
        debug!(
            "op_version_set = {}, {} constants",
            version,
            constants.len()
        );

        Ok(Self {
            parser,
            builder: DefBuilder::new(),
            env: Environment::new(version, constants.clone()),
        })
    }

    pub fn version(&self) -> u64 {
        self.env.version()
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// Следующее определение метода или `None` в конце ввода.
    pub fn next_def(&mut self) -> ImportResult<Option<Def>> {
        if self.parser.at_eof()? {
            return Ok(None);
        }
        let expr = self.parser.parse_sexpr()?;
        Ok(Some(self.builder.build_def(&expr)?))
    }

    /// Следующий блок класса или `None` в конце ввода.
    pub fn next_class(&mut self) -> ImportResult<Option<ClassDef>> {
        if self.parser.at_eof()? {
            return Ok(None);
        }
        let expr = self.parser.parse_sexpr()?;
        Ok(Some(self.builder.build_class(&expr)?))
    }

    fn resolvers(&self, count: usize) -> Vec<Resolver<'_>> {
        (0..count).map(|_| self.env.resolver()).collect()
    }
}

/// Режим A: добавить методы из `src` в модуль `target`.
///
/// Все методы пакета видят друг друга независимо от порядка объявления.
/// Возвращает имена добавленных методов.
pub fn import_methods(
    tree: &mut ModuleTree,
    target: ModuleId,
    src: &str,
    constants: &ConstantPool,
) -> ImportResult<Vec<String>> {
    tree.check(target)?;
    let mut importer = SourceImporter::new(src, constants)?;

    let mut defs = Vec::new();
    while let Some(def) = importer.next_def()? {
        defs.push(def);
    }
    debug!("importing {} methods into {}", defs.len(), tree.path(target));

    let resolvers = importer.resolvers(defs.len());
    define_methods_in_module(tree, &defs, &resolvers, &SelfBinding::module(target))
}

/// Модули, созданные блоками классов, в порядке исходника.
#[derive(Debug, Clone, Default)]
pub struct ClassLibrary {
    tree: ModuleTree,
    classes: Vec<(String, ModuleId)>,
}

impl ClassLibrary {
    pub fn tree(&self) -> &ModuleTree {
        &self.tree
    }

    pub fn into_tree(self) -> ModuleTree {
        self.tree
    }

    /// Модуль класса по имени.
    pub fn get(&self, name: &str) -> Option<ModuleId> {
        self.classes
            .iter()
            .find(|(class, _)| class == name)
            .map(|(_, id)| *id)
    }

    pub fn classes(&self) -> impl Iterator<Item = (&str, ModuleId)> {
        self.classes.iter().map(|(name, id)| (name.as_str(), *id))
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Режим B: каждый блок `class` создаёт новый пустой модуль и тип с именем
/// блока. Методы блока видят через `self` только свой модуль.
pub fn import_libs(src: &str, constants: &ConstantPool) -> ImportResult<ClassLibrary> {
    let mut importer = SourceImporter::new(src, constants)?;
    let mut library = ClassLibrary::default();

    while let Some(class_def) = importer.next_class()? {
        let name = class_def.name.name.clone();
        if library.get(&name).is_some() {
            return Err(ImportError::DuplicateClass {
                span: class_def.name.span,
                name,
            });
        }

        let module = library.tree.new_root(name.clone());
        let binding = SelfBinding::class(module, ClassType { name: name.clone() });
        let resolvers = importer.resolvers(class_def.defs.len());
        define_methods_in_module(&mut library.tree, &class_def.defs, &resolvers, &binding)?;

        debug!("class {} with {} methods", name, class_def.defs.len());
        library.classes.push((name, module));
    }

    Ok(library)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::graph::NodeKind;
    use crate::parser::error::ParseError;
    use crate::value::IValue;

    #[test]
    fn test_importer_reads_version() {
        let importer = SourceImporter::new("op_version_set = 9\n", &ConstantPool::default()).unwrap();
        assert_eq!(importer.version(), 9);
        assert!(importer.environment().resolve("torch").is_some());
    }

    #[test]
    fn test_import_methods_empty_batch() {
        let (mut tree, root) = ModuleTree::with_root("m");
        let names = import_methods(&mut tree, root, "op_version_set = 1\n", &ConstantPool::default()).unwrap();
        assert!(names.is_empty());
    }

    #[test]
    fn test_import_methods_rejects_class() {
        let (mut tree, root) = ModuleTree::with_root("m");
        let err = import_methods(
            &mut tree,
            root,
            "op_version_set = 1\n(class Foo)",
            &ConstantPool::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ImportError::Parse(ParseError::UnknownForm { .. })));
    }

    #[test]
    fn test_target_from_another_tree() {
        let (mut other, other_root) = ModuleTree::with_root("b");
        let foreign = other.add_submodule(other_root, "child").unwrap();

        let (mut tree, root) = ModuleTree::with_root("m");
        let err = import_methods(
            &mut tree,
            foreign,
            "op_version_set = 1\n(def f (self) (return 1))",
            &ConstantPool::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ImportError::ForeignModule { module } if module == foreign));
        assert_eq!(err.span(), None);
        assert!(tree.module(root).methods().is_empty());
    }

    #[test]
    fn test_operator_carries_version() {
        let (mut tree, root) = ModuleTree::with_root("m");
        import_methods(
            &mut tree,
            root,
            "op_version_set = 6\n(def f (self x) (return (ops.quantized.add x x)))",
            &ConstantPool::default(),
        )
        .unwrap();

        let f = tree.find_method(root, "f").unwrap();
        assert_eq!(
            f.graph.returned().unwrap().kind,
            NodeKind::Operator {
                qualified: "quantized::add".to_string(),
                version: 6
            }
        );
    }

    #[test]
    fn test_import_libs_returns_classes_in_order() {
        let library = import_libs(
            "op_version_set = 2\n(class B (def f (self) (return 1)))\n(class A)",
            &ConstantPool::default(),
        )
        .unwrap();

        let names: Vec<_> = library.classes().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["B", "A"]);
        let b = library.get("B").unwrap();
        assert_eq!(library.tree().module(b).class_type.as_ref().unwrap().name, "B");
        assert_eq!(library.tree().module(b).methods().len(), 1);
    }

    #[test]
    fn test_duplicate_class() {
        let err = import_libs(
            "op_version_set = 2\n(class A)\n(class A)",
            &ConstantPool::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ImportError::DuplicateClass { ref name, .. } if name == "A"));
    }

    #[test]
    fn test_header_error_aborts_import() {
        let (mut tree, root) = ModuleTree::with_root("m");
        let err = import_methods(
            &mut tree,
            root,
            "op_version = 1\n(def f (self) (return 1))",
            &ConstantPool::new(vec![IValue::Int(1)]),
        )
        .unwrap_err();
        assert!(matches!(err, ImportError::HeaderFormat { .. }));
        assert!(tree.module(root).methods().is_empty());
    }
}
