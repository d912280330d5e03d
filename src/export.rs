//! Grammar export to other notations.
//!
//! `to_bnf` currently renders the same syntax as `to_ebnf` with classic
//! angle-bracket left-hand sides; desugaring the EBNF operators into
//! auxiliary rules is future work.

use std::fmt::Write;

use crate::ast::{format_codepoint, Grammar, Node};

/// Renders the grammar in standard EBNF notation.
pub fn to_ebnf(grammar: &Grammar) -> String {
    let mut out = String::from("# EBNF Grammar Export\n\n");
    for rule in &grammar.rules {
        let _ = writeln!(out, "{} = {} ;", rule.name, ebnf_syntax(&rule.body));
    }
    out
}

/// Renders the grammar in classic BNF notation.
pub fn to_bnf(grammar: &Grammar) -> String {
    let mut out = String::from("# BNF Grammar Export\n\n");
    for rule in &grammar.rules {
        let _ = writeln!(out, "<{}> ::= {}", rule.name, ebnf_syntax(&rule.body));
    }
    out
}

/// Converts one rule's body into a regular expression, or `None` for an
/// unknown rule. References to other rules are not expanded here; use
/// the tokeniser for inlined matching.
pub fn rule_to_regex(grammar: &Grammar, rule_name: &str) -> Option<String> {
    grammar.find_rule(rule_name).map(|r| regex_syntax(&r.body))
}

fn ebnf_syntax(node: &Node) -> String {
    match node {
        Node::Terminal(value) => format!("\"{}\"", escape_quotes(value)),
        Node::NonTerminal { name, args } => {
            if args.is_empty() {
                name.clone()
            } else {
                format!("{name}[{}]", args.join(", "))
            }
        }
        Node::CharRange { start, end } => {
            format!("{}..{}", format_codepoint(*start), format_codepoint(*end))
        }
        Node::Alternative(children) => children
            .iter()
            .map(ebnf_syntax)
            .collect::<Vec<_>>()
            .join(" | "),
        Node::Sequence(children) => children
            .iter()
            .map(ebnf_syntax)
            .collect::<Vec<_>>()
            .join(" "),
        Node::Optional(child) => format!("[{}]", ebnf_syntax(child)),
        Node::ZeroOrMore(child) => format!("{{{}}}", ebnf_syntax(child)),
        Node::OneOrMore(child) => format!("{}+", ebnf_syntax(child)),
        Node::Group(child) => format!("({})", ebnf_syntax(child)),
        // Not expressible in plain EBNF.
        Node::ContextAction { .. } => String::new(),
    }
}

fn regex_syntax(node: &Node) -> String {
    match node {
        Node::Terminal(value) => escape_regex(value),
        Node::CharRange { start, end } => {
            let s = char::from_u32(*start).unwrap_or('\u{FFFD}');
            let e = char::from_u32(*end).unwrap_or('\u{FFFD}');
            format!("[{s}-{e}]")
        }
        Node::Alternative(children) => {
            let inner: Vec<String> = children.iter().map(regex_syntax).collect();
            format!("({})", inner.join("|"))
        }
        Node::Sequence(children) => children.iter().map(regex_syntax).collect(),
        Node::Optional(child) => format!("({})?", regex_syntax(child)),
        Node::ZeroOrMore(child) => format!("({})*", regex_syntax(child)),
        Node::OneOrMore(child) => format!("({})+", regex_syntax(child)),
        Node::Group(child) => format!("({})", regex_syntax(child)),
        Node::NonTerminal { .. } | Node::ContextAction { .. } => String::new(),
    }
}

fn escape_quotes(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn escape_regex(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(
            c,
            '.' | '^' | '$' | '*' | '+' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '|' | '\\'
        ) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
