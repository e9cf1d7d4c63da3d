//! scriptmod CLI - импорт исходника методов и вывод скомпилированных графов.
//!
//! ```bash
//! # Методы в модуль, описанный JSON-файлом
//! scriptmod model.src --module net.json --constants consts.json
//!
//! # Библиотека классов
//! scriptmod lib.src --mode classes --json
//! ```
//!
//! Уровень логирования задаётся через `RUST_LOG`.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use log::info;
use serde::Serialize;

use scriptmod::descriptor::{constant_pool_from_json, ModuleDescriptor};
use scriptmod::module::{Method, ModuleId, ModuleTree};
use scriptmod::{format_error, import_libs, import_methods, ConstantPool};

#[derive(Parser)]
#[command(name = "scriptmod")]
#[command(version)]
#[command(about = "Import serialized module methods and print their graphs", long_about = None)]
struct Cli {
    /// Source file with the version header and definitions
    source: PathBuf,

    /// JSON array with the constant table
    #[arg(short, long)]
    constants: Option<PathBuf>,

    /// JSON description of the target module (methods mode only)
    #[arg(short, long)]
    module: Option<PathBuf>,

    /// What the source contains
    #[arg(long, value_enum, default_value_t = Mode::Methods)]
    mode: Mode,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Flat list of `def` blocks added to one module
    Methods,
    /// Sequence of `class` blocks, each a new module
    Classes,
}

#[derive(Serialize)]
struct ModuleReport<'a> {
    module: String,
    class: Option<&'a str>,
    methods: &'a [Method],
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {}", message);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let source = read(&cli.source)?;
    let constants = match &cli.constants {
        Some(path) => constant_pool_from_json(&read(path)?).map_err(|e| e.to_string())?,
        None => ConstantPool::default(),
    };
    info!("{} constants loaded", constants.len());

    let (tree, modules) = match cli.mode {
        Mode::Methods => {
            let (mut tree, root) = match &cli.module {
                Some(path) => ModuleDescriptor::from_json(&read(path)?)
                    .and_then(|desc| desc.build())
                    .map_err(|e| e.to_string())?,
                None => ModuleTree::with_root("module"),
            };
            import_methods(&mut tree, root, &source, &constants)
                .map_err(|e| format_error(&source, &e))?;
            (tree, vec![root])
        }
        Mode::Classes => {
            if cli.module.is_some() {
                return Err("--module is only used in methods mode".to_string());
            }
            let library = import_libs(&source, &constants).map_err(|e| format_error(&source, &e))?;
            let modules = library.classes().map(|(_, id)| id).collect();
            (library.into_tree(), modules)
        }
    };

    if cli.json {
        let reports: Vec<_> = modules.iter().map(|&id| report(&tree, id)).collect();
        let text = serde_json::to_string_pretty(&reports).map_err(|e| e.to_string())?;
        println!("{}", text);
    } else {
        for id in modules {
            print_module(&tree, id);
        }
    }
    Ok(())
}

fn read(path: &Path) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| format!("{}: {}", path.display(), e))
}

fn report(tree: &ModuleTree, id: ModuleId) -> ModuleReport<'_> {
    let module = tree.module(id);
    ModuleReport {
        module: tree.path(id),
        class: module.class_type.as_ref().map(|c| c.name.as_str()),
        methods: module.methods(),
    }
}

fn print_module(tree: &ModuleTree, id: ModuleId) {
    let module = tree.module(id);
    match &module.class_type {
        Some(class) => println!("class {}:", class.name),
        None => println!("module {}:", tree.path(id)),
    }

    for method in module.methods() {
        println!(
            "  def {}(self{}):",
            method.name(),
            method
                .signature
                .params
                .iter()
                .map(|p| format!(", {}", p))
                .collect::<String>()
        );
        for input in &method.member_inputs {
            let slot = tree.slot(input.slot);
            println!("    member {} : {:?}", slot.name, slot.kind);
        }
        print!("{}", method.graph);
    }
}
