//! Recursive-descent parser from grammar tokens to the AST.
//!
//! Right-hand sides follow the classic shape: an expression is an
//! alternative of sequences of factors; a factor is a primary with an
//! optional postfix repetition operator. Parsing aborts on the first
//! unrecoverable error; the offending token's position is carried on the
//! error.

use super::{BnfToken, TokenKind};
use crate::ast::{ActionKind, Grammar, Node, ParamType, ProductionRule, RuleParameter};
use crate::errors::{BnfError, ErrorContext};
use crate::utf8;

pub struct GrammarParser {
    tokens: Vec<BnfToken>,
    current: usize,
}

impl GrammarParser {
    pub fn new(tokens: Vec<BnfToken>) -> Self {
        Self { tokens, current: 0 }
    }

    /// Parses all rules, then infers the start symbol.
    pub fn parse_grammar(mut self) -> Result<Grammar, BnfError> {
        let mut grammar = Grammar::new();

        while !self.is_at_end() {
            if self.is_separator() {
                self.advance();
                continue;
            }
            grammar.add_rule(self.parse_rule()?);
        }

        grammar.determine_start_symbol();
        Ok(grammar)
    }

    fn parse_rule(&mut self) -> Result<ProductionRule, BnfError> {
        if !self.check(TokenKind::Identifier) {
            return Err(self.error_here("Expected rule name (identifier)"));
        }
        let name = self.advance().value;

        let params = if self.check(TokenKind::LBracket) {
            self.parse_rule_parameters()?
        } else {
            Vec::new()
        };

        if !self.match_token(TokenKind::Define) {
            return Err(self.error_here("Expected '::=' after rule name"));
        }

        let body = self.parse_expression()?;

        // Rule bodies end at the line break; `;` terminators are
        // accepted too so several rules may share a line.
        while self.check(TokenKind::Newline) || self.check(TokenKind::Semicolon) {
            self.advance();
        }

        Ok(ProductionRule::with_params(name, params, body))
    }

    fn parse_expression(&mut self) -> Result<Node, BnfError> {
        self.parse_alternative()
    }

    fn parse_alternative(&mut self) -> Result<Node, BnfError> {
        let first = self.parse_sequence()?;
        if !self.check(TokenKind::Alternative) {
            return Ok(first);
        }

        let mut choices = vec![first];
        while self.match_token(TokenKind::Alternative) {
            choices.push(self.parse_sequence()?);
        }
        Ok(Node::Alternative(choices))
    }

    fn parse_sequence(&mut self) -> Result<Node, BnfError> {
        let mut elements = vec![self.parse_factor()?];

        while !self.is_at_end() && !self.at_sequence_end() {
            elements.push(self.parse_factor()?);
        }

        if elements.len() == 1 {
            Ok(elements.pop().expect("one element"))
        } else {
            Ok(Node::Sequence(elements))
        }
    }

    fn at_sequence_end(&self) -> bool {
        matches!(
            self.peek().kind,
            TokenKind::Alternative
                | TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::RBrace
                | TokenKind::Newline
                | TokenKind::Semicolon
                | TokenKind::Comment
                | TokenKind::Eof
        )
    }

    fn parse_factor(&mut self) -> Result<Node, BnfError> {
        let primary = self.parse_primary()?;

        if self.match_token(TokenKind::Plus) {
            Ok(Node::OneOrMore(Box::new(primary)))
        } else if self.match_token(TokenKind::Star) {
            Ok(Node::ZeroOrMore(Box::new(primary)))
        } else if self.match_token(TokenKind::Question) {
            Ok(Node::Optional(Box::new(primary)))
        } else {
            Ok(primary)
        }
    }

    fn parse_primary(&mut self) -> Result<Node, BnfError> {
        if self.check(TokenKind::Identifier) {
            return self.parse_reference();
        }

        if self.check(TokenKind::LBrace) {
            // `{name(` two tokens ahead means a context action, anything
            // else is a repetition.
            if self.peek_at(1).kind == TokenKind::Identifier
                && self.peek_at(2).kind == TokenKind::LParen
            {
                return self.parse_context_action();
            }
            self.advance();
            let expr = self.parse_expression()?;
            if !self.match_token(TokenKind::RBrace) {
                return Err(self.error_here("Expected '}' after repetition expression"));
            }
            return Ok(Node::ZeroOrMore(Box::new(expr)));
        }

        if self.match_token(TokenKind::LParen) {
            let expr = self.parse_expression()?;
            if !self.match_token(TokenKind::RParen) {
                return Err(self.error_here("Expected ')' after grouped expression"));
            }
            return Ok(Node::Group(Box::new(expr)));
        }

        if self.match_token(TokenKind::LBracket) {
            let expr = self.parse_expression()?;
            if !self.match_token(TokenKind::RBracket) {
                return Err(self.error_here("Expected ']' after optional expression"));
            }
            return Ok(Node::Optional(Box::new(expr)));
        }

        if self.check(TokenKind::Terminal) {
            return self.parse_terminal_or_range();
        }

        Err(self.error_here("Expected identifier, terminal, or grouped expression"))
    }

    /// A non-terminal reference, possibly with call-site arguments.
    ///
    /// A following `[` opens an argument list only when its contents look
    /// like one (bare identifiers); otherwise it belongs to the enclosing
    /// sequence as an optional expression, as in `int ['.' digit+]`.
    fn parse_reference(&mut self) -> Result<Node, BnfError> {
        let name = self.advance().value;

        let args = if self.check(TokenKind::LBracket) && self.brackets_hold_arguments() {
            self.parse_argument_values()?
        } else {
            Vec::new()
        };

        Ok(Node::NonTerminal { name, args })
    }

    fn brackets_hold_arguments(&self) -> bool {
        match self.peek_at(1).kind {
            TokenKind::RBracket => true,
            TokenKind::Identifier => matches!(
                self.peek_at(2).kind,
                TokenKind::Comma | TokenKind::RBracket
            ),
            _ => false,
        }
    }

    fn parse_terminal_or_range(&mut self) -> Result<Node, BnfError> {
        let start = self.advance();

        if !self.match_token(TokenKind::DotDot) {
            return Ok(Node::Terminal(start.value));
        }

        if !self.check(TokenKind::Terminal) {
            return Err(self.error_here("Expected terminal after '..'"));
        }
        let end = self.advance();

        if utf8::length(&start.value) != 1 || utf8::length(&end.value) != 1 {
            return Err(BnfError::CharRangeMustBeSingleChars {
                ctx: ErrorContext::at(start.line, start.column),
            });
        }

        let start_cp = utf8::first_codepoint(&start.value);
        let end_cp = utf8::first_codepoint(&end.value);
        if start_cp > end_cp {
            return Err(BnfError::parse(
                "Character range start exceeds its end",
                start.line,
                start.column,
            ));
        }

        Ok(Node::CharRange {
            start: start_cp,
            end: end_cp,
        })
    }

    fn parse_context_action(&mut self) -> Result<Node, BnfError> {
        self.advance(); // `{`
        let action = self.advance();
        let kind = match action.value.as_str() {
            "store" => ActionKind::Store,
            "lookup" => ActionKind::Lookup,
            "check" => ActionKind::Check,
            other => {
                return Err(BnfError::parse(
                    format!("Unknown action type: {other}"),
                    action.line,
                    action.column,
                ))
            }
        };

        if !self.match_token(TokenKind::LParen) {
            return Err(self.error_here("Expected '(' after action name"));
        }

        let mut args = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                if !self.check(TokenKind::Identifier) {
                    return Err(self.error_here("Expected argument"));
                }
                args.push(self.advance().value);
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }

        if !self.match_token(TokenKind::RParen) {
            return Err(self.error_here("Expected ')' after arguments"));
        }
        if !self.match_token(TokenKind::RBrace) {
            return Err(self.error_here("Expected '}' to end context action"));
        }

        Ok(Node::ContextAction { kind, args })
    }

    fn parse_rule_parameters(&mut self) -> Result<Vec<RuleParameter>, BnfError> {
        self.advance(); // `[`
        let mut params = Vec::new();

        if !self.check(TokenKind::RBracket) {
            loop {
                params.push(self.parse_rule_parameter()?);
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }

        if !self.match_token(TokenKind::RBracket) {
            return Err(self.error_here("Expected ']' to end parameter list"));
        }
        Ok(params)
    }

    fn parse_rule_parameter(&mut self) -> Result<RuleParameter, BnfError> {
        if !self.check(TokenKind::Identifier) {
            return Err(self.error_here("Expected parameter name"));
        }
        let name = self.advance().value;

        let ty = if self.match_token(TokenKind::Colon) {
            if !self.check(TokenKind::Identifier) {
                return Err(self.error_here("Expected parameter type"));
            }
            let ty_token = self.advance();
            match ty_token.value.as_str() {
                "int" | "integer" => ParamType::Integer,
                "string" | "str" => ParamType::String,
                "bool" | "boolean" => ParamType::Boolean,
                "enum" => ParamType::Enum(self.parse_enum_values()?),
                other => {
                    return Err(BnfError::parse(
                        format!("Unknown parameter type: {other}"),
                        ty_token.line,
                        ty_token.column,
                    ))
                }
            }
        } else {
            // No annotation: string-typed.
            ParamType::String
        };

        if !self.match_token(TokenKind::Equals) {
            return Ok(RuleParameter::new(name, ty));
        }

        // Defaults are a bare identifier (enum values, true/false) or a
        // quoted literal.
        if !self.check(TokenKind::Identifier) && !self.check(TokenKind::Terminal) {
            return Err(self.error_here("Expected default value after '='"));
        }
        let default = self.advance().value;
        Ok(RuleParameter::with_default(name, ty, default))
    }

    fn parse_enum_values(&mut self) -> Result<Vec<String>, BnfError> {
        if !self.match_token(TokenKind::LBrace) {
            return Err(self.error_here("Expected '{' to start enum values"));
        }

        let mut values = Vec::new();
        if !self.check(TokenKind::RBrace) {
            loop {
                if !self.check(TokenKind::Identifier) {
                    return Err(self.error_here("Expected enum value"));
                }
                values.push(self.advance().value);
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }

        if !self.match_token(TokenKind::RBrace) {
            return Err(self.error_here("Expected '}' to end enum values"));
        }
        Ok(values)
    }

    fn parse_argument_values(&mut self) -> Result<Vec<String>, BnfError> {
        self.advance(); // `[`
        let mut values = Vec::new();

        if !self.check(TokenKind::RBracket) {
            loop {
                if !self.check(TokenKind::Identifier) {
                    return Err(self.error_here("Expected parameter value"));
                }
                values.push(self.advance().value);
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }

        if !self.match_token(TokenKind::RBracket) {
            return Err(self.error_here("Expected ']' to end parameter values"));
        }
        Ok(values)
    }

    // Cursor helpers.

    fn is_separator(&self) -> bool {
        matches!(
            self.peek().kind,
            TokenKind::Comment | TokenKind::Newline | TokenKind::Semicolon
        )
    }

    fn check(&self, kind: TokenKind) -> bool {
        !self.is_at_end() && self.peek().kind == kind
    }

    fn match_token(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            return true;
        }
        false
    }

    fn advance(&mut self) -> BnfToken {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.tokens[self.current - 1].clone()
    }

    fn peek(&self) -> &BnfToken {
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    fn peek_at(&self, offset: usize) -> &BnfToken {
        let idx = (self.current + offset).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.tokens.len() || self.peek().kind == TokenKind::Eof
    }

    fn error_here(&self, message: &str) -> BnfError {
        let token = self.peek();
        BnfError::parse(message, token.line, token.column)
    }
}
