//! Single-pass lexer for grammar source.
//!
//! Horizontal whitespace is skipped; newlines are emitted as tokens
//! because they terminate rule bodies. Comments run from `#` to end of
//! line. Terminal literals accept either quote style and decode the
//! escape set `\n \t \r \\ \" \'` plus `\uXXXX` / `\UXXXXXXXX`; an
//! unknown escape keeps the backslash and the following byte.

use super::{BnfToken, TokenKind};
use crate::errors::BnfError;
use crate::utf8;

pub struct Lexer<'a> {
    input: &'a [u8],
    source: &'a str,
    pos: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            input: source.as_bytes(),
            source,
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<BnfToken>, BnfError> {
        let mut tokens = Vec::new();

        while self.pos < self.input.len() {
            self.skip_horizontal_whitespace();
            if self.pos >= self.input.len() {
                break;
            }

            let c = self.peek(0);
            let (line, column) = (self.line, self.column);

            match c {
                b'#' => tokens.push(self.read_comment()),
                b'\n' => {
                    tokens.push(BnfToken::new(TokenKind::Newline, "\\n", line, column));
                    self.advance();
                }
                b'"' | b'\'' => tokens.push(self.read_string()?),
                b':' if self.peek(1) == b':' && self.peek(2) == b'=' => {
                    tokens.push(BnfToken::new(TokenKind::Define, "::=", line, column));
                    self.advance();
                    self.advance();
                    self.advance();
                }
                b'.' if self.peek(1) == b'.' => {
                    tokens.push(BnfToken::new(TokenKind::DotDot, "..", line, column));
                    self.advance();
                    self.advance();
                }
                b'|' => tokens.push(self.single(TokenKind::Alternative, "|")),
                b'(' => tokens.push(self.single(TokenKind::LParen, "(")),
                b')' => tokens.push(self.single(TokenKind::RParen, ")")),
                b'[' => tokens.push(self.single(TokenKind::LBracket, "[")),
                b']' => tokens.push(self.single(TokenKind::RBracket, "]")),
                b'{' => tokens.push(self.single(TokenKind::LBrace, "{")),
                b'}' => tokens.push(self.single(TokenKind::RBrace, "}")),
                b'+' => tokens.push(self.single(TokenKind::Plus, "+")),
                b'*' => tokens.push(self.single(TokenKind::Star, "*")),
                b'?' => tokens.push(self.single(TokenKind::Question, "?")),
                b',' => tokens.push(self.single(TokenKind::Comma, ",")),
                b';' => tokens.push(self.single(TokenKind::Semicolon, ";")),
                b':' => tokens.push(self.single(TokenKind::Colon, ":")),
                b'=' => tokens.push(self.single(TokenKind::Equals, "=")),
                _ => {
                    if c.is_ascii_alphabetic() || c == b'_' || c == b'<' {
                        tokens.push(self.read_identifier());
                    } else {
                        let (ch, len) = utf8::extract_char(self.source, self.pos);
                        tokens.push(BnfToken::new(TokenKind::Unknown, ch, line, column));
                        for _ in 0..len {
                            self.advance();
                        }
                    }
                }
            }
        }

        tokens.push(BnfToken::new(TokenKind::Eof, "", self.line, self.column));
        Ok(tokens)
    }

    fn peek(&self, offset: usize) -> u8 {
        *self.input.get(self.pos + offset).unwrap_or(&0)
    }

    fn advance(&mut self) -> u8 {
        if self.pos >= self.input.len() {
            return 0;
        }
        let c = self.input[self.pos];
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        c
    }

    fn skip_horizontal_whitespace(&mut self) {
        while matches!(self.peek(0), b' ' | b'\t' | b'\r') && self.pos < self.input.len() {
            self.advance();
        }
    }

    fn single(&mut self, kind: TokenKind, value: &str) -> BnfToken {
        let token = BnfToken::new(kind, value, self.line, self.column);
        self.advance();
        token
    }

    fn read_string(&mut self) -> Result<BnfToken, BnfError> {
        let (start_line, start_column) = (self.line, self.column);
        let quote = self.advance();
        let mut value = String::new();

        while self.pos < self.input.len() {
            let c = self.peek(0);
            if c == quote {
                self.advance();
                break;
            }
            if c == b'\\' {
                self.advance();
                let escaped = self.peek(0);
                if escaped == b'u' || escaped == b'U' {
                    self.advance();
                    let digits = if escaped == b'U' { 8 } else { 4 };
                    let mut code = 0u32;
                    for _ in 0..digits {
                        let hex = self.peek(0);
                        let digit = match hex {
                            b'0'..=b'9' => u32::from(hex - b'0'),
                            b'a'..=b'f' => u32::from(hex - b'a' + 10),
                            b'A'..=b'F' => u32::from(hex - b'A' + 10),
                            _ => {
                                return Err(BnfError::lex(
                                    "Invalid Unicode escape sequence",
                                    self.line,
                                    self.column,
                                ))
                            }
                        };
                        code = code * 16 + digit;
                        self.advance();
                    }
                    value.push_str(&utf8::encode_codepoint(code)?);
                } else {
                    self.advance();
                    match escaped {
                        b'n' => value.push('\n'),
                        b't' => value.push('\t'),
                        b'r' => value.push('\r'),
                        b'\\' => value.push('\\'),
                        b'"' => value.push('"'),
                        b'\'' => value.push('\''),
                        other => {
                            value.push('\\');
                            value.push(char::from(other));
                        }
                    }
                }
            } else {
                let (ch, len) = utf8::extract_char(self.source, self.pos);
                value.push_str(ch);
                for _ in 0..len {
                    self.advance();
                }
            }
        }

        Ok(BnfToken::new(
            TokenKind::Terminal,
            value,
            start_line,
            start_column,
        ))
    }

    fn read_identifier(&mut self) -> BnfToken {
        let (start_line, start_column) = (self.line, self.column);
        let mut value = String::new();

        // Angle-bracketed names permit spaces inside `< ... >`.
        let bracketed = self.peek(0) == b'<';
        if bracketed {
            self.advance();
        }

        while self.pos < self.input.len() {
            let c = self.peek(0);
            if bracketed {
                if c == b'>' {
                    self.advance();
                    break;
                }
                if c.is_ascii_alphanumeric() || c == b'_' || c == b'-' || c == b' ' {
                    value.push(char::from(self.advance()));
                } else {
                    break;
                }
            } else {
                if c.is_ascii_alphanumeric() || c == b'_' || c == b'-' {
                    value.push(char::from(self.advance()));
                } else {
                    break;
                }
            }
        }

        BnfToken::new(TokenKind::Identifier, value, start_line, start_column)
    }

    fn read_comment(&mut self) -> BnfToken {
        let (start_line, start_column) = (self.line, self.column);
        let mut value = String::new();

        self.advance(); // '#'
        while self.pos < self.input.len() && self.peek(0) != b'\n' {
            value.push(char::from(self.advance()));
        }

        BnfToken::new(TokenKind::Comment, value, start_line, start_column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn basic_rule_tokens() {
        assert_eq!(
            kinds("expr ::= term | factor"),
            vec![
                TokenKind::Identifier,
                TokenKind::Define,
                TokenKind::Identifier,
                TokenKind::Alternative,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn string_escapes() {
        let tokens = Lexer::new(r#""a\n\t\\\"" 'b\''"#).tokenize().unwrap();
        assert_eq!(tokens[0].value, "a\n\t\\\"");
        assert_eq!(tokens[1].value, "b'");
    }

    #[test]
    fn unicode_escapes() {
        let tokens = Lexer::new(r#""A\U0001F600""#).tokenize().unwrap();
        assert_eq!(tokens[0].value, "A😀");
    }

    #[test]
    fn unknown_escape_keeps_backslash() {
        let tokens = Lexer::new(r#""\q""#).tokenize().unwrap();
        assert_eq!(tokens[0].value, "\\q");
    }

    #[test]
    fn surrogate_escape_is_an_error() {
        assert!(Lexer::new(r#""\uD800""#).tokenize().is_err());
    }

    #[test]
    fn bracketed_identifier_permits_spaces() {
        let tokens = Lexer::new("<rule name> ::= 'x'").tokenize().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].value, "rule name");
    }

    #[test]
    fn newlines_are_tokens_and_positions_track() {
        let tokens = Lexer::new("a ::= 'x'\nb ::= 'y'").tokenize().unwrap();
        let newline = tokens.iter().find(|t| t.kind == TokenKind::Newline).unwrap();
        assert_eq!(newline.line, 1);
        let b = tokens.iter().find(|t| t.value == "b").unwrap();
        assert_eq!((b.line, b.column), (2, 1));
    }

    #[test]
    fn comments_run_to_end_of_line() {
        let tokens = Lexer::new("# heading\nx ::= 'a'").tokenize().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Comment);
        assert_eq!(tokens[0].value, " heading");
    }
}
