//! Command-line arguments for the `bnfgen` binary.
//!
//! Everything is flag-driven (no subcommands): one grammar file in, one
//! parser out, with knobs for target language, naming, and output
//! layout. The whole observable flag surface is this one clap-derive
//! struct.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Flags accepted by `bnfgen`.
#[derive(Debug, Parser)]
#[command(
    name = "bnfgen",
    version,
    about = "Generate standalone recursive-descent parsers from BNF/EBNF grammars."
)]
pub struct BnfgenArgs {
    /// Input BNF/EBNF grammar file.
    #[arg(short = 'i', long = "input", required = true)]
    pub input: PathBuf,

    /// Output parser file (default: derived from the grammar name).
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output directory (default: generated/<grammar>/<format>/).
    #[arg(long = "output-dir")]
    pub output_dir: Option<PathBuf>,

    /// Target language.
    #[arg(short = 'l', long = "language", default_value = "cpp")]
    pub language: String,

    /// Parser class name (default: derived from the grammar file stem).
    #[arg(short = 'n', long = "name")]
    pub name: Option<String>,

    /// Namespace/package name for the generated code.
    #[arg(long = "namespace")]
    pub namespace: Option<String>,

    /// What to produce.
    #[arg(short = 'f', long = "format", value_enum, default_value = "source-only")]
    pub format: OutputFormat,

    /// Shorthand for `--format executable`.
    #[arg(short = 'e', long = "executable")]
    pub executable: bool,

    /// Generate debug tracing code.
    #[arg(short = 'd', long = "debug")]
    pub debug: bool,

    /// Verbose progress output.
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Output flavours; they pick the directory layout and whether an entry
/// point is emitted alongside the parser source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    SourceOnly,
    LibraryStatic,
    LibraryShared,
    Executable,
    All,
}

impl OutputFormat {
    /// Directory segment for the default output layout.
    pub fn dir_name(self) -> &'static str {
        match self {
            OutputFormat::SourceOnly => "source-only",
            OutputFormat::LibraryStatic => "library-static",
            OutputFormat::LibraryShared => "library-shared",
            OutputFormat::Executable => "exec",
            OutputFormat::All => "all",
        }
    }

    pub fn wants_executable(self) -> bool {
        matches!(self, OutputFormat::Executable | OutputFormat::All)
    }
}
