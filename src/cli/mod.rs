//! The bnfgen command-line interface.
//!
//! Orchestrates the pipeline: read the grammar file, parse, validate,
//! generate, write. Any failure prints a diagnostic to stderr and exits
//! with code 1; produced file paths go to stdout.

pub mod args;
pub mod output;

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;

use crate::cli::args::{BnfgenArgs, OutputFormat};
use crate::codegen::{self, GeneratorOptions};
use crate::errors::{print_error, BnfError};
use crate::syntax;
use crate::validation;

/// The main entry point for the CLI.
pub fn run() {
    let args = BnfgenArgs::parse();
    if let Err(error) = execute(args) {
        print_error(error);
        process::exit(1);
    }
}

fn execute(args: BnfgenArgs) -> Result<(), BnfError> {
    let format = if args.executable {
        OutputFormat::Executable
    } else {
        args.format
    };
    let stem = args
        .input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("grammar")
        .to_string();

    // An unknown language should fail before any real work happens.
    let backend = codegen::create_backend(&args.language)?;

    if args.verbose {
        output::step(&format!("bnfgen v{}", env!("CARGO_PKG_VERSION")));
        output::detail(&format!("input: {}", args.input.display()));
        output::detail(&format!("language: {}", args.language));
    }

    if args.verbose {
        output::step("[1/3] Parsing grammar...");
    }
    let source = fs::read_to_string(&args.input)
        .map_err(|e| BnfError::io(args.input.display().to_string(), &e))?;
    let grammar = syntax::parse_grammar(&source)?;
    if args.verbose {
        output::detail(&format!("parsed {} rules", grammar.rules.len()));
        output::detail(&format!("start symbol: {}", grammar.start_symbol));
    }

    if args.verbose {
        output::step("[2/3] Validating grammar...");
    }
    let report = validation::validate(&grammar);
    if !report.is_valid() {
        return Err(BnfError::Validation {
            errors: report.errors,
            warnings: report.warnings,
        });
    }
    if args.verbose {
        for warning in &report.warnings {
            output::warning(warning);
        }
        output::detail("grammar is valid");
    }

    if args.verbose {
        output::step("[3/3] Generating parser code...");
    }
    let parser_name = args
        .name
        .clone()
        .unwrap_or_else(|| codegen::derive_parser_name(&stem));
    let options = GeneratorOptions {
        target_language: args.language.clone(),
        parser_name,
        namespace: args.namespace.clone().unwrap_or_default(),
        debug_mode: args.debug,
        generate_executable: format.wants_executable(),
        grammar_origin: args
            .input
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("grammar")
            .to_string(),
        ..GeneratorOptions::default()
    };
    let generated = backend.generate(&grammar, &options)?;
    if args.verbose {
        for warning in &generated.warnings {
            output::warning(warning);
        }
    }

    let (parser_path, companion_dir) = match &args.output {
        Some(output_file) => (
            output_file.clone(),
            output_file
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        ),
        None => {
            let dir = args
                .output_dir
                .clone()
                .unwrap_or_else(|| default_output_dir(&stem, format, args.debug));
            (dir.join(&generated.parser_filename), dir)
        }
    };

    write_output(&parser_path, &generated.parser_code)?;
    output::result_path(&parser_path);

    if let (Some(main_code), Some(main_filename)) =
        (&generated.main_code, &generated.main_filename)
    {
        let main_path = companion_dir.join(main_filename);
        write_output(&main_path, main_code)?;
        output::result_path(&main_path);
    }

    if args.verbose {
        for message in &generated.messages {
            output::detail(message);
        }
        output::success("Done.");
    }
    Ok(())
}

fn default_output_dir(stem: &str, format: OutputFormat, debug: bool) -> PathBuf {
    let mut dir = PathBuf::from("generated").join(stem);
    dir.push(format.dir_name());
    if format == OutputFormat::Executable {
        dir.push(if debug { "debug" } else { "release" });
    }
    dir
}

fn write_output(path: &Path, content: &str) -> Result<(), BnfError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| BnfError::io(parent.display().to_string(), &e))?;
        }
    }
    fs::write(path, content).map_err(|e| BnfError::io(path.display().to_string(), &e))
}
