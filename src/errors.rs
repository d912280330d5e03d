//! Unified, `miette`-based diagnostics for every failure mode in the
//! pipeline: grammar lexing/parsing, validation, tokenisation, code
//! generation, and the I/O done at the CLI boundary.
//!
//! There is one error type, [`BnfError`]. Each stage constructs the
//! variant for its failure class and propagates it with `?`; nothing is
//! retried or recovered. Variants that point at grammar source carry an
//! [`ErrorContext`] with the offending line and column.

use miette::Diagnostic;
use thiserror::Error;

/// Location attachment for errors that point into grammar text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    /// 1-based line of the offending token.
    pub line: usize,
    /// 1-based column of the offending token.
    pub column: usize,
}

impl ErrorContext {
    pub fn at(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Every failure the engine can produce.
#[derive(Debug, Error, Diagnostic)]
pub enum BnfError {
    #[error("I/O error on {path}: {message}")]
    #[diagnostic(code(bnfgen::io))]
    Io { path: String, message: String },

    #[error("Lex error at line {}, column {}: {message}", ctx.line, ctx.column)]
    #[diagnostic(code(bnfgen::syntax::lex))]
    Lex { message: String, ctx: ErrorContext },

    #[error("Parse error at line {}, column {}: {message}", ctx.line, ctx.column)]
    #[diagnostic(code(bnfgen::syntax::parse))]
    Parse { message: String, ctx: ErrorContext },

    #[error(
        "Parse error at line {}, column {}: character ranges must be single characters",
        ctx.line,
        ctx.column
    )]
    #[diagnostic(
        code(bnfgen::syntax::char_range),
        help("both range operands must be one-codepoint terminals, e.g. 'a'..'z'")
    )]
    CharRangeMustBeSingleChars { ctx: ErrorContext },

    #[error("Grammar validation failed:\n{}", render_report(.errors, .warnings))]
    #[diagnostic(code(bnfgen::validation))]
    Validation {
        errors: Vec<String>,
        warnings: Vec<String>,
    },

    #[error("Invalid Unicode codepoint U+{0:04X}")]
    #[diagnostic(
        code(bnfgen::utf8::codepoint),
        help("codepoints must be scalar values: at most U+10FFFF and outside U+D800..U+DFFF")
    )]
    InvalidCodepoint(u32),

    #[error("Unsupported target language: {0}")]
    #[diagnostic(code(bnfgen::codegen::language))]
    UnsupportedLanguage(String),

    #[error("Unexpected character '{character}' at line {line}, column {column}")]
    #[diagnostic(code(bnfgen::tokenize))]
    Tokenize {
        character: char,
        line: usize,
        column: usize,
    },

    #[error("Code generation failed: {0}")]
    #[diagnostic(code(bnfgen::codegen::emit))]
    Emission(String),
}

impl BnfError {
    pub fn io(path: impl Into<String>, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }

    pub fn lex(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self::Lex {
            message: message.into(),
            ctx: ErrorContext::at(line, column),
        }
    }

    pub fn parse(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self::Parse {
            message: message.into(),
            ctx: ErrorContext::at(line, column),
        }
    }
}

fn render_report(errors: &[String], warnings: &[String]) -> String {
    let mut out = String::new();
    for e in errors {
        out.push_str("  Error: ");
        out.push_str(e);
        out.push('\n');
    }
    for w in warnings {
        out.push_str("  Warning: ");
        out.push_str(w);
        out.push('\n');
    }
    out
}

/// Prints an error with full miette diagnostics to stderr.
///
/// Use this for user-facing error display in the CLI.
pub fn print_error(error: BnfError) {
    let report = miette::Report::new(error);
    eprintln!("{report:?}");
}
