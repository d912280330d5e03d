// tests/cli_tests.rs
//
// End-to-end runs of the bnfgen binary: exit codes, stdout path
// reporting, and the default output layout.

use std::fs;
use std::path::PathBuf;
use std::process::Command;

fn bnfgen() -> Command {
    Command::new(env!("CARGO_BIN_EXE_bnfgen"))
}

fn scratch_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("bnfgen-test-{tag}-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn generates_parser_and_reports_path() {
    let dir = scratch_dir("generate");
    let grammar_path = dir.join("calc.bnf");
    fs::write(&grammar_path, "expr ::= NUMBER { '+' NUMBER }\nNUMBER ::= ('0'..'9')+\n")
        .unwrap();
    let out_dir = dir.join("out");

    let output = bnfgen()
        .arg("-i")
        .arg(&grammar_path)
        .arg("--output-dir")
        .arg(&out_dir)
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let reported = PathBuf::from(stdout.trim());
    assert_eq!(reported, out_dir.join("CalcParser.cpp"));
    let code = fs::read_to_string(&reported).unwrap();
    assert!(code.contains("class CalcParser"));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn executable_format_writes_main_companion() {
    let dir = scratch_dir("exec");
    let grammar_path = dir.join("tiny.bnf");
    fs::write(&grammar_path, "r ::= 'x'\n").unwrap();
    let out_dir = dir.join("out");

    let output = bnfgen()
        .arg("-i")
        .arg(&grammar_path)
        .arg("-e")
        .arg("--output-dir")
        .arg(&out_dir)
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let paths: Vec<&str> = stdout.lines().collect();
    assert_eq!(paths.len(), 2);
    assert!(paths[0].ends_with("TinyParser.cpp"));
    assert!(paths[1].ends_with("TinyParser_main.cpp"));
    assert!(out_dir.join("TinyParser_main.cpp").exists());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn missing_grammar_file_exits_nonzero() {
    let output = bnfgen()
        .arg("-i")
        .arg("/nonexistent/grammar.bnf")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(!output.stderr.is_empty());
}

#[test]
fn invalid_grammar_exits_nonzero_with_diagnostic() {
    let dir = scratch_dir("invalid");
    let grammar_path = dir.join("bad.bnf");
    fs::write(&grammar_path, "start ::= undefined_rule\n").unwrap();

    let output = bnfgen().arg("-i").arg(&grammar_path).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("undefined_rule"));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn unsupported_language_exits_nonzero() {
    let dir = scratch_dir("lang");
    let grammar_path = dir.join("g.bnf");
    fs::write(&grammar_path, "r ::= 'x'\n").unwrap();

    let output = bnfgen()
        .arg("-i")
        .arg(&grammar_path)
        .arg("-l")
        .arg("cobol")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn explicit_output_file_wins_over_layout() {
    let dir = scratch_dir("output");
    let grammar_path = dir.join("g.bnf");
    fs::write(&grammar_path, "r ::= 'x'\n").unwrap();
    let target = dir.join("custom").join("my_parser.cpp");

    let output = bnfgen()
        .arg("-i")
        .arg(&grammar_path)
        .arg("-o")
        .arg(&target)
        .output()
        .unwrap();

    assert!(output.status.success());
    assert!(target.exists());

    let _ = fs::remove_dir_all(&dir);
}
