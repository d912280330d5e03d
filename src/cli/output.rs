//! User-facing output for the CLI.
//!
//! Progress and warnings are diagnostics and go to stderr, colorized
//! when the stream supports it; produced file paths go to stdout so they
//! can be captured by scripts.

use std::path::Path;

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Prints a verbose pipeline step heading, e.g. `[1/3] Parsing grammar...`.
pub fn step(message: &str) {
    let mut stderr = StandardStream::stderr(ColorChoice::Auto);
    let _ = stderr.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true));
    eprintln!("{message}");
    let _ = stderr.reset();
}

/// Prints a verbose detail line under a step.
pub fn detail(message: &str) {
    eprintln!("  {message}");
}

/// Prints a non-fatal warning.
pub fn warning(message: &str) {
    let mut stderr = StandardStream::stderr(ColorChoice::Auto);
    let _ = stderr.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)));
    eprintln!("  Warning: {message}");
    let _ = stderr.reset();
}

/// Prints a success note.
pub fn success(message: &str) {
    let mut stderr = StandardStream::stderr(ColorChoice::Auto);
    let _ = stderr.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true));
    eprintln!("{message}");
    let _ = stderr.reset();
}

/// Reports a produced file on stdout.
pub fn result_path(path: &Path) {
    println!("{}", path.display());
}
