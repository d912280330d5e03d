//! Grammar-driven tokeniser: interprets a context-free grammar directly
//! to split arbitrary input into tokens.
//!
//! Each candidate rule's body is compiled to a regular expression once
//! and cached by pattern string. Rules whose bodies bottom out in
//! terminals and character ranges ("lexical" rules) are tried first and
//! exclusively; the remaining rules only get a chance when no lexical
//! rule matches. Within a phase the longest match wins, ties going to
//! the earliest rule in source order.
//!
//! Recursive rules cannot be fully expressed as regexes. Non-terminal
//! references are inlined a bounded number of levels deep and contribute
//! the empty pattern beyond that, so a recursive rule degrades to
//! matching the fragments of it that are regular. A structural depth
//! guard keeps pattern compilation from recursing unboundedly on any
//! grammar.

use std::collections::HashMap;

use regex::Regex;

use crate::ast::{Grammar, Node};
use crate::errors::BnfError;
use crate::utf8;

/// Non-terminal references deeper than this contribute the empty pattern.
const MAX_INLINE_DEPTH: usize = 2;

/// Hard bound on pattern-compiler recursion, over all node kinds.
const MAX_PATTERN_DEPTH: usize = 100;

/// Rule name used for the end-of-input sentinel token.
pub const EOF_TOKEN: &str = "EOF";

/// One token of tokenised input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Name of the rule that matched.
    pub kind: String,
    /// The matched text.
    pub value: String,
    pub line: usize,
    pub column: usize,
    /// Byte offset of the match start.
    pub byte_offset: usize,
}

pub struct Tokenizer<'g> {
    grammar: &'g Grammar,
    skip_whitespace: bool,
    skip_comments: bool,
    last_error: Option<String>,
    /// Lexical candidate rule names, then the rest; both in source order.
    lexical_rules: Vec<String>,
    other_rules: Vec<String>,
    /// Per-rule compiled pattern; `None` when the rule has no usable one.
    rule_patterns: HashMap<String, Option<String>>,
    /// Compiled regexes keyed by (anchored) pattern string.
    regex_cache: HashMap<String, Option<Regex>>,
}

impl<'g> Tokenizer<'g> {
    /// Builds a tokeniser over a context-free grammar.
    ///
    /// Parameterised grammars are rejected: tokenisation has no binding
    /// for rule arguments.
    pub fn new(grammar: &'g Grammar) -> Result<Self, BnfError> {
        if let Some(rule) = grammar.parameterised_rules().first() {
            return Err(BnfError::Validation {
                errors: vec![format!(
                    "Cannot tokenize with a context-sensitive grammar: rule '{}' takes parameters",
                    rule.name
                )],
                warnings: Vec::new(),
            });
        }

        let mut lexical_rules = Vec::new();
        let mut other_rules = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for rule in &grammar.rules {
            if !seen.insert(rule.name.as_str()) {
                continue;
            }
            if is_lexical_rule(grammar, &rule.name) {
                lexical_rules.push(rule.name.clone());
            } else {
                other_rules.push(rule.name.clone());
            }
        }

        Ok(Self {
            grammar,
            skip_whitespace: true,
            skip_comments: true,
            last_error: None,
            lexical_rules,
            other_rules,
            rule_patterns: HashMap::new(),
            regex_cache: HashMap::new(),
        })
    }

    pub fn set_skip_whitespace(&mut self, skip: bool) {
        self.skip_whitespace = skip;
    }

    pub fn set_skip_comments(&mut self, skip: bool) {
        self.skip_comments = skip;
    }

    /// The error recorded by the last [`Tokenizer::tokenize`] call that
    /// stopped early, if any.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Tokenises `input`, always ending with an `EOF` sentinel.
    ///
    /// On an unrecognised character the walk stops, the error is
    /// recorded for [`Tokenizer::last_error`], and the tokens found so
    /// far (plus the sentinel) are returned.
    pub fn tokenize(&mut self, input: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut pos = 0usize;
        let mut line = 1usize;
        let mut column = 1usize;
        self.last_error = None;

        while pos < input.len() {
            if self.skip_whitespace || self.skip_comments {
                self.skip_whitespace_and_comments(input, &mut pos, &mut line, &mut column);
                if pos >= input.len() {
                    break;
                }
            }

            let start_column = column;
            let start_line = line;

            match self.best_match(input, pos) {
                Some((rule_name, length)) => {
                    let value = &input[pos..pos + length];
                    tokens.push(Token {
                        kind: rule_name,
                        value: value.to_string(),
                        line: start_line,
                        column: start_column,
                        byte_offset: pos,
                    });
                    for byte in input[pos..pos + length].bytes() {
                        if byte == b'\n' {
                            line += 1;
                            column = 1;
                        } else {
                            column += 1;
                        }
                    }
                    pos += length;
                }
                None => {
                    let (ch, _) = utf8::extract_char(input, pos);
                    self.last_error = Some(format!(
                        "Unexpected character '{ch}' at line {line}, column {column}"
                    ));
                    break;
                }
            }
        }

        tokens.push(Token {
            kind: EOF_TOKEN.to_string(),
            value: String::new(),
            line,
            column,
            byte_offset: pos,
        });
        tokens
    }

    /// Longest match at `pos`; lexical rules form an exclusive first
    /// phase.
    fn best_match(&mut self, input: &str, pos: usize) -> Option<(String, usize)> {
        let phases = [self.lexical_rules.clone(), self.other_rules.clone()];
        for names in phases {
            let mut best: Option<(String, usize)> = None;
            for name in names {
                if let Some(length) = self.try_match_rule(&name, input, pos) {
                    if best.as_ref().map_or(true, |(_, b)| length > *b) {
                        best = Some((name, length));
                    }
                }
            }
            if best.is_some() {
                return best;
            }
        }
        None
    }

    /// Length of the match for `rule` at `pos`, if any. Zero-length
    /// matches never produce tokens.
    fn try_match_rule(&mut self, rule: &str, input: &str, pos: usize) -> Option<usize> {
        let pattern = self.rule_pattern(rule)?;
        let regex = self.compiled(&pattern)?;
        let m = regex.find(&input[pos..])?;
        if m.start() != 0 || m.end() == 0 {
            return None;
        }
        Some(m.end())
    }

    fn rule_pattern(&mut self, rule: &str) -> Option<String> {
        if let Some(cached) = self.rule_patterns.get(rule) {
            return cached.clone();
        }
        let pattern = self
            .grammar
            .find_rule(rule)
            .map(|r| node_pattern(self.grammar, &r.body, 0, 0))
            .filter(|p| !p.is_empty());
        self.rule_patterns.insert(rule.to_string(), pattern.clone());
        pattern
    }

    fn compiled(&mut self, pattern: &str) -> Option<&Regex> {
        let anchored = format!("\\A(?:{pattern})");
        self.regex_cache
            .entry(anchored.clone())
            .or_insert_with(|| Regex::new(&anchored).ok())
            .as_ref()
    }

    fn skip_whitespace_and_comments(
        &self,
        input: &str,
        pos: &mut usize,
        line: &mut usize,
        column: &mut usize,
    ) {
        let bytes = input.as_bytes();
        while *pos < bytes.len() {
            let c = bytes[*pos];
            if self.skip_whitespace && matches!(c, b' ' | b'\t' | b'\n' | b'\r') {
                if c == b'\n' {
                    *line += 1;
                    *column = 1;
                } else {
                    *column += 1;
                }
                *pos += 1;
                continue;
            }
            if self.skip_comments && c == b'#' {
                while *pos < bytes.len() && bytes[*pos] != b'\n' {
                    *pos += 1;
                    *column += 1;
                }
                continue;
            }
            break;
        }
    }
}

/// Whether a rule's body bottoms out in terminals and ranges, following
/// references transitively. Cyclic rules are not lexical.
fn is_lexical_rule(grammar: &Grammar, name: &str) -> bool {
    let mut visiting = std::collections::HashSet::new();
    is_lexical_by_name(grammar, name, &mut visiting)
}

fn is_lexical_by_name<'g>(
    grammar: &'g Grammar,
    name: &'g str,
    visiting: &mut std::collections::HashSet<&'g str>,
) -> bool {
    if !visiting.insert(name) {
        return false;
    }
    let lexical = match grammar.find_rule(name) {
        Some(rule) => is_lexical_node(grammar, &rule.body, visiting),
        None => false,
    };
    visiting.remove(name);
    lexical
}

fn is_lexical_node<'g>(
    grammar: &'g Grammar,
    node: &'g Node,
    visiting: &mut std::collections::HashSet<&'g str>,
) -> bool {
    match node {
        Node::Terminal(_) | Node::CharRange { .. } => true,
        Node::Alternative(children) | Node::Sequence(children) => children
            .iter()
            .all(|c| is_lexical_node(grammar, c, visiting)),
        Node::Group(child)
        | Node::Optional(child)
        | Node::ZeroOrMore(child)
        | Node::OneOrMore(child) => is_lexical_node(grammar, child, visiting),
        Node::NonTerminal { name, .. } => is_lexical_by_name(grammar, name, visiting),
        Node::ContextAction { .. } => false,
    }
}

/// Compiles a node to a regex fragment.
///
/// `inline_depth` counts non-terminal inlinings on this path; `guard`
/// counts every recursion step and hard-stops runaway expansion.
fn node_pattern(grammar: &Grammar, node: &Node, inline_depth: usize, guard: usize) -> String {
    if guard > MAX_PATTERN_DEPTH {
        return String::new();
    }
    match node {
        Node::Terminal(value) => escape_regex(value),
        Node::CharRange { start, end } => format!(
            "[{}-{}]",
            escape_class(*start),
            escape_class(*end)
        ),
        Node::Alternative(children) => {
            let inner: Vec<String> = children
                .iter()
                .map(|c| node_pattern(grammar, c, inline_depth, guard + 1))
                .collect();
            format!("({})", inner.join("|"))
        }
        Node::Sequence(children) => {
            let inner: String = children
                .iter()
                .map(|c| node_pattern(grammar, c, inline_depth, guard + 1))
                .collect();
            format!("({inner})")
        }
        Node::Group(child) => {
            format!("({})", node_pattern(grammar, child, inline_depth, guard + 1))
        }
        Node::Optional(child) => {
            format!("({})?", node_pattern(grammar, child, inline_depth, guard + 1))
        }
        Node::ZeroOrMore(child) => {
            format!("({})*", node_pattern(grammar, child, inline_depth, guard + 1))
        }
        Node::OneOrMore(child) => {
            format!("({})+", node_pattern(grammar, child, inline_depth, guard + 1))
        }
        Node::ContextAction { .. } => String::new(),
        Node::NonTerminal { name, .. } => {
            if inline_depth >= MAX_INLINE_DEPTH {
                return String::new();
            }
            match grammar.find_rule(name) {
                Some(rule) => node_pattern(grammar, &rule.body, inline_depth + 1, guard + 1),
                None => String::new(),
            }
        }
    }
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

fn escape_class(cp: u32) -> String {
    let c = char::from_u32(cp).unwrap_or('\u{FFFD}');
    if matches!(c, '\\' | ']' | '[' | '^' | '-') {
        format!("\\{c}")
    } else {
        c.to_string()
    }
}

// Token stream utilities.

/// Joins token values with spaces, skipping the EOF sentinel.
pub fn tokens_to_string(tokens: &[Token]) -> String {
    let mut out = String::new();
    for token in tokens {
        if token.kind == EOF_TOKEN {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&token.value);
    }
    out
}

/// Tokens whose rule name equals `kind`.
pub fn find_tokens_by_type<'a>(tokens: &'a [Token], kind: &str) -> Vec<&'a Token> {
    tokens.iter().filter(|t| t.kind == kind).collect()
}

/// Aggregate counts over a token stream, EOF excluded.
#[derive(Debug, Default)]
pub struct TokenStats {
    pub total_tokens: usize,
    pub unique_types: usize,
    pub type_counts: HashMap<String, usize>,
}

pub fn analyze_tokens(tokens: &[Token]) -> TokenStats {
    let mut stats = TokenStats::default();
    for token in tokens {
        if token.kind == EOF_TOKEN {
            continue;
        }
        stats.total_tokens += 1;
        *stats.type_counts.entry(token.kind.clone()).or_insert(0) += 1;
    }
    stats.unique_types = stats.type_counts.len();
    stats
}
