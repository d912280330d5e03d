//! Code generation: turning a grammar into standalone parser source.
//!
//! A [`Backend`] walks the grammar AST and produces recursive-descent
//! parser code in its target language. Backends are selected by name
//! through [`create_backend`]; `cpp` is the reference target.

pub mod cpp;

use crate::ast::Grammar;
use crate::errors::BnfError;

/// Settings for a single generation run.
#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    pub target_language: String,
    /// Class name of the generated parser.
    pub parser_name: String,
    /// Namespace/package wrapped around the generated code; empty for none.
    pub namespace: String,
    /// Emit tracing output in the generated parser.
    pub debug_mode: bool,
    /// Also emit a companion file with an entry point.
    pub generate_executable: bool,
    /// One indentation level in emitted source.
    pub indent_style: String,
    /// Where the grammar came from, for the generated header comment.
    pub grammar_origin: String,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            target_language: "cpp".to_string(),
            parser_name: "GeneratedParser".to_string(),
            namespace: String::new(),
            debug_mode: false,
            generate_executable: false,
            indent_style: "    ".to_string(),
            grammar_origin: String::new(),
        }
    }
}

/// The output of one generation run.
#[derive(Debug, Default)]
pub struct GeneratedCode {
    pub parser_code: String,
    pub parser_filename: String,
    /// Entry-point companion file, when requested.
    pub main_code: Option<String>,
    pub main_filename: Option<String>,
    pub messages: Vec<String>,
    pub warnings: Vec<String>,
}

/// A code generator for one target language.
pub trait Backend {
    fn generate(
        &self,
        grammar: &Grammar,
        options: &GeneratorOptions,
    ) -> Result<GeneratedCode, BnfError>;

    fn target_language(&self) -> &'static str;

    /// File extension including the dot, e.g. `.cpp`.
    fn file_extension(&self) -> &'static str;
}

/// Creates the backend for `language` (case-insensitive).
pub fn create_backend(language: &str) -> Result<Box<dyn Backend>, BnfError> {
    match language.to_ascii_lowercase().as_str() {
        "cpp" | "c++" | "cxx" => Ok(Box::new(cpp::CppBackend)),
        other => Err(BnfError::UnsupportedLanguage(other.to_string())),
    }
}

pub fn supported_languages() -> Vec<&'static str> {
    vec!["cpp"]
}

pub fn is_language_supported(language: &str) -> bool {
    create_backend(language).is_ok()
}

/// Derives a parser class name from a grammar file stem:
/// `json` → `JsonParser`, `my-lang` → `MyLangParser`.
pub fn derive_parser_name(stem: &str) -> String {
    let mut name = String::new();
    let mut upper_next = true;
    for c in stem.chars() {
        if c.is_ascii_alphanumeric() {
            if upper_next {
                name.extend(c.to_uppercase());
                upper_next = false;
            } else {
                name.push(c);
            }
        } else {
            upper_next = true;
        }
    }
    if name.is_empty() {
        name.push_str("Generated");
    }
    name.push_str("Parser");
    name
}

/// Sanitises a name into a target-language identifier: every
/// non-alphanumeric byte becomes `_`, a leading digit gets a `_` prefix.
pub(crate) fn make_identifier(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// Escapes a string for inclusion in emitted source between quotes.
pub(crate) fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}
