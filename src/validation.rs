//! Whole-grammar analysis: definedness, reachability, productivity.
//!
//! All issues are aggregated into one [`ValidationReport`] before
//! returning; errors make the grammar invalid, warnings do not.

use std::collections::HashSet;

use crate::ast::{Grammar, Node};

/// Aggregated validation outcome.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    fn warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

/// Runs every check against a fully assembled grammar.
pub fn validate(grammar: &Grammar) -> ValidationReport {
    let mut report = ValidationReport::new();

    if grammar.rules.is_empty() {
        report.error("Grammar is empty");
        return report;
    }

    let defined: HashSet<&str> = grammar.rules.iter().map(|r| r.name.as_str()).collect();

    // Duplicate definitions: the first wins on lookup, the rest are noise.
    let mut seen = HashSet::new();
    for rule in &grammar.rules {
        if !seen.insert(rule.name.as_str()) {
            report.warning(format!("Duplicate rule definition: {}", rule.name));
        }
    }

    // Every referenced non-terminal must be defined by some rule.
    for name in referenced_names(grammar) {
        if !defined.contains(name.as_str()) {
            report.error(format!("Undefined non-terminal: {name}"));
        }
    }

    // Rules not reachable from the start symbol are suspicious but legal.
    let reachable = reachable_from_start(grammar);
    for rule in &grammar.rules {
        if !reachable.contains(rule.name.as_str()) {
            report.warning(format!("Unreachable non-terminal: {}", rule.name));
        }
    }

    // Every rule must be able to derive a finite terminal string.
    let productive = productive_rules(grammar);
    for rule in &grammar.rules {
        if !productive.contains(rule.name.as_str()) {
            report.error(format!("Non-productive non-terminal: {}", rule.name));
        }
    }

    report
}

/// Non-terminal names referenced anywhere, deduplicated in first-use order.
fn referenced_names(grammar: &Grammar) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut names = Vec::new();
    for rule in &grammar.rules {
        rule.body.walk(&mut |node| {
            if let Node::NonTerminal { name, .. } = node {
                if seen.insert(name.clone()) {
                    names.push(name.clone());
                }
            }
        });
    }
    names
}

/// DFS through non-terminal references starting at the start symbol.
fn reachable_from_start(grammar: &Grammar) -> HashSet<&str> {
    let mut reachable: HashSet<&str> = HashSet::new();
    let mut stack: Vec<&str> = vec![grammar.start_symbol.as_str()];

    while let Some(current) = stack.pop() {
        if !reachable.insert(current) {
            continue;
        }
        // Duplicate definitions all participate in reachability.
        for rule in grammar.rules.iter().filter(|r| r.name == current) {
            rule.body.walk(&mut |node| {
                if let Node::NonTerminal { name, .. } = node {
                    if !reachable.contains(name.as_str()) {
                        stack.push(name.as_str());
                    }
                }
            });
        }
    }

    reachable
}

/// Iterative fixed point: a rule is productive iff its body is.
fn productive_rules(grammar: &Grammar) -> HashSet<&str> {
    let mut productive: HashSet<&str> = HashSet::new();

    let mut changed = true;
    while changed {
        changed = false;
        for rule in &grammar.rules {
            if !productive.contains(rule.name.as_str())
                && is_productive(&rule.body, &productive)
            {
                productive.insert(rule.name.as_str());
                changed = true;
            }
        }
    }

    productive
}

fn is_productive(node: &Node, productive: &HashSet<&str>) -> bool {
    match node {
        Node::Terminal(_) | Node::CharRange { .. } => true,
        // Matches nothing, consumes nothing.
        Node::ContextAction { .. } => true,
        // May match empty, so always productive.
        Node::Optional(_) | Node::ZeroOrMore(_) => true,
        Node::NonTerminal { name, .. } => productive.contains(name.as_str()),
        Node::Alternative(choices) => choices.iter().any(|c| is_productive(c, productive)),
        Node::Sequence(elements) => elements.iter().all(|e| is_productive(e, productive)),
        Node::Group(child) | Node::OneOrMore(child) => is_productive(child, productive),
    }
}
