//! The grammar AST shared by every later stage.
//!
//! A grammar is an ordered list of production rules; each rule owns its
//! body as a single-owner tree of [`Node`] values. Non-terminal
//! references are resolved by name against the grammar's rule list, never
//! by pointer, so the tree has no cycles and needs no reference counting.
//! Nodes are immutable once built.

use std::fmt;

/// Context-action kinds usable in rule bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Store,
    Lookup,
    Check,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Store => write!(f, "store"),
            ActionKind::Lookup => write!(f, "lookup"),
            ActionKind::Check => write!(f, "check"),
        }
    }
}

/// One node of a rule body.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal text, post-escape.
    Terminal(String),
    /// Reference to another rule, with positional argument values for
    /// parameterised rules (empty for plain references).
    NonTerminal { name: String, args: Vec<String> },
    /// Inclusive codepoint range, e.g. `'a'..'z'`.
    CharRange { start: u32, end: u32 },
    /// Ordered choice; the first matching child wins.
    Alternative(Vec<Node>),
    Sequence(Vec<Node>),
    Group(Box<Node>),
    /// Zero or one occurrences.
    Optional(Box<Node>),
    ZeroOrMore(Box<Node>),
    OneOrMore(Box<Node>),
    /// `{store(..)}` / `{lookup(..)}` / `{check(..)}`.
    ContextAction { kind: ActionKind, args: Vec<String> },
}

impl Node {
    pub fn reference(name: impl Into<String>) -> Node {
        Node::NonTerminal {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Pre-order walk over this subtree.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Node)) {
        f(self);
        match self {
            Node::Alternative(children) | Node::Sequence(children) => {
                for child in children {
                    child.walk(f);
                }
            }
            Node::Group(child)
            | Node::Optional(child)
            | Node::ZeroOrMore(child)
            | Node::OneOrMore(child) => child.walk(f),
            _ => {}
        }
    }

    /// Whether this subtree contains a context action.
    pub fn has_context_action(&self) -> bool {
        let mut found = false;
        self.walk(&mut |node| {
            if matches!(node, Node::ContextAction { .. }) {
                found = true;
            }
        });
        found
    }
}

fn escape_terminal(s: &str) -> String {
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

pub(crate) fn format_codepoint(cp: u32) -> String {
    if (0x20..=0x7E).contains(&cp) && cp != u32::from('\\') && cp != u32::from('\'') {
        // Printable ASCII, quoted directly.
        format!("'{}'", char::from_u32(cp).unwrap_or('\u{FFFD}'))
    } else if cp <= 0xFFFF {
        format!("'\\u{cp:04x}'")
    } else {
        format!("'\\U{cp:08x}'")
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Terminal(value) => write!(f, "\"{}\"", escape_terminal(value)),
            Node::NonTerminal { name, args } => {
                if args.is_empty() {
                    write!(f, "<{name}>")
                } else {
                    write!(f, "<{name}>[{}]", args.join(", "))
                }
            }
            Node::CharRange { start, end } => {
                write!(f, "{}..{}", format_codepoint(*start), format_codepoint(*end))
            }
            Node::Alternative(children) => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{child}")?;
                }
                Ok(())
            }
            Node::Sequence(children) => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{child}")?;
                }
                Ok(())
            }
            Node::Group(child) => write!(f, "({child})"),
            Node::Optional(child) => write!(f, "[{child}]"),
            Node::ZeroOrMore(child) => write!(f, "{{{child}}}"),
            Node::OneOrMore(child) => write!(f, "{child}+"),
            Node::ContextAction { kind, args } => {
                write!(f, "{{{kind}({})}}", args.join(", "))
            }
        }
    }
}

/// The type of a formal rule parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    /// Closed set of named values, in declaration order.
    Enum(Vec<String>),
    Integer,
    String,
    Boolean,
}

/// A formal parameter of a parameterised rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleParameter {
    pub name: String,
    pub ty: ParamType,
    pub default: Option<String>,
}

impl RuleParameter {
    pub fn new(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
        }
    }

    pub fn with_default(
        name: impl Into<String>,
        ty: ParamType,
        default: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            ty,
            default: Some(default.into()),
        }
    }
}

impl fmt::Display for RuleParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ty {
            ParamType::String => write!(f, "{}", self.name)?,
            ParamType::Integer => write!(f, "{}:int", self.name)?,
            ParamType::Boolean => write!(f, "{}:bool", self.name)?,
            ParamType::Enum(values) => {
                write!(f, "{}:enum{{{}}}", self.name, values.join(","))?;
            }
        }
        if let Some(default) = &self.default {
            // Enum and boolean defaults re-read as identifiers; anything
            // else must be quoted to survive a round trip.
            match &self.ty {
                ParamType::Enum(_) | ParamType::Boolean => write!(f, "={default}")?,
                ParamType::Integer | ParamType::String => {
                    let escaped = default.replace('\\', "\\\\").replace('\'', "\\'");
                    write!(f, "='{escaped}'")?;
                }
            }
        }
        Ok(())
    }
}

/// A production rule: left-hand name, formal parameters, owned body.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductionRule {
    pub name: String,
    pub params: Vec<RuleParameter>,
    pub body: Node,
}

impl ProductionRule {
    pub fn new(name: impl Into<String>, body: Node) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            body,
        }
    }

    pub fn with_params(
        name: impl Into<String>,
        params: Vec<RuleParameter>,
        body: Node,
    ) -> Self {
        Self {
            name: name.into(),
            params,
            body,
        }
    }

    pub fn has_params(&self) -> bool {
        !self.params.is_empty()
    }
}

impl fmt::Display for ProductionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.params.is_empty() {
            write!(f, "[")?;
            for (i, p) in self.params.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{p}")?;
            }
            write!(f, "]")?;
        }
        write!(f, " ::= {}", self.body)
    }
}

/// A complete grammar: ordered rules plus the start symbol.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grammar {
    pub rules: Vec<ProductionRule>,
    pub start_symbol: String,
}

/// Names preferred as start symbol, most preferred first.
const PREFERRED_START_NAMES: [&str; 5] = ["json", "program", "start", "grammar", "root"];

impl Grammar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a rule. The first rule added becomes the provisional start
    /// symbol until [`Grammar::determine_start_symbol`] runs.
    pub fn add_rule(&mut self, rule: ProductionRule) {
        if self.start_symbol.is_empty() {
            self.start_symbol = rule.name.clone();
        }
        self.rules.push(rule);
    }

    /// Linear lookup by rule name; the first definition wins.
    pub fn find_rule(&self, name: &str) -> Option<&ProductionRule> {
        self.rules.iter().find(|r| r.name == name)
    }

    /// Left-hand-side names, in declaration order.
    pub fn non_terminals(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name.as_str()).collect()
    }

    /// All terminal literals in source order; duplicates preserved.
    pub fn terminals(&self) -> Vec<&str> {
        let mut out = Vec::new();
        for rule in &self.rules {
            rule.body.walk(&mut |node| {
                if let Node::Terminal(value) = node {
                    out.push(value.as_str());
                }
            });
        }
        out
    }

    /// True iff any rule carries parameters or any body contains a
    /// context action.
    pub fn is_context_sensitive(&self) -> bool {
        self.rules
            .iter()
            .any(|r| r.has_params() || r.body.has_context_action())
    }

    /// Rules with a non-empty parameter list, in declaration order.
    pub fn parameterised_rules(&self) -> Vec<&ProductionRule> {
        self.rules.iter().filter(|r| r.has_params()).collect()
    }

    /// Infers the start symbol once all rules are present.
    ///
    /// Priority: a rule with a conventional entry-point name, then the
    /// first rule whose body references another rule, then the first
    /// rule. Idempotent.
    pub fn determine_start_symbol(&mut self) {
        for preferred in PREFERRED_START_NAMES {
            if self.rules.iter().any(|r| r.name == preferred) {
                self.start_symbol = preferred.to_string();
                return;
            }
        }
        for rule in &self.rules {
            let mut composite = false;
            rule.body.walk(&mut |node| {
                if matches!(node, Node::NonTerminal { .. }) {
                    composite = true;
                }
            });
            if composite {
                self.start_symbol = rule.name.clone();
                return;
            }
        }
        if let Some(first) = self.rules.first() {
            self.start_symbol = first.name.clone();
        }
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# Grammar (start: {})", self.start_symbol)?;
        for rule in &self.rules {
            writeln!(f, "{rule}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_range_formatting() {
        let ascii = Node::CharRange {
            start: u32::from('a'),
            end: u32::from('z'),
        };
        assert_eq!(ascii.to_string(), "'a'..'z'");

        let bmp = Node::CharRange {
            start: 0x0410,
            end: 0x044F,
        };
        assert_eq!(bmp.to_string(), "'\\u0410'..'\\u044f'");

        let supplementary = Node::CharRange {
            start: 0x1F600,
            end: 0x1F64F,
        };
        assert_eq!(supplementary.to_string(), "'\\U0001f600'..'\\U0001f64f'");
    }

    #[test]
    fn start_symbol_prefers_conventional_names() {
        let mut g = Grammar::new();
        g.add_rule(ProductionRule::new("helper", Node::Terminal("x".into())));
        g.add_rule(ProductionRule::new("program", Node::reference("helper")));
        g.determine_start_symbol();
        assert_eq!(g.start_symbol, "program");
        // Idempotent.
        g.determine_start_symbol();
        assert_eq!(g.start_symbol, "program");
    }

    #[test]
    fn start_symbol_falls_back_to_composite_rule() {
        let mut g = Grammar::new();
        g.add_rule(ProductionRule::new("lit", Node::Terminal("x".into())));
        g.add_rule(ProductionRule::new("pair", Node::reference("lit")));
        g.determine_start_symbol();
        assert_eq!(g.start_symbol, "pair");
    }

    #[test]
    fn context_sensitivity() {
        let mut g = Grammar::new();
        g.add_rule(ProductionRule::new("a", Node::Terminal("x".into())));
        assert!(!g.is_context_sensitive());

        g.add_rule(ProductionRule::with_params(
            "b",
            vec![RuleParameter::new("n", ParamType::Integer)],
            Node::Terminal("y".into()),
        ));
        assert!(g.is_context_sensitive());
    }
}
