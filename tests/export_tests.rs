// tests/export_tests.rs

use bnfgen::export::{rule_to_regex, to_bnf, to_ebnf};
use bnfgen::syntax::parse_grammar;

#[test]
fn ebnf_export_renders_rules() {
    let grammar = parse_grammar("expr ::= term { '+' term }\nterm ::= '0'..'9'").unwrap();
    let out = to_ebnf(&grammar);
    assert!(out.starts_with("# EBNF Grammar Export"));
    assert!(out.contains("expr = term {\"+\" term} ;"));
    assert!(out.contains("term = '0'..'9' ;"));
}

#[test]
fn bnf_export_uses_angle_bracket_heads() {
    let grammar = parse_grammar("expr ::= term\nterm ::= 'x'").unwrap();
    let out = to_bnf(&grammar);
    assert!(out.starts_with("# BNF Grammar Export"));
    assert!(out.contains("<expr> ::= term"));
    assert!(out.contains("<term> ::= \"x\""));
}

#[test]
fn rule_regex_export() {
    let grammar = parse_grammar("NUMBER ::= ('0'..'9')+").unwrap();
    assert_eq!(
        rule_to_regex(&grammar, "NUMBER").as_deref(),
        Some("(([0-9]))+")
    );
    assert_eq!(rule_to_regex(&grammar, "missing"), None);
}

#[test]
fn regex_export_escapes_metacharacters() {
    let grammar = parse_grammar("dot ::= '.' '+'").unwrap();
    assert_eq!(rule_to_regex(&grammar, "dot").as_deref(), Some("\\.\\+"));
}
