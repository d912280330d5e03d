//! Bundled grammars used by tests, demos, and as quick-start input.

use crate::ast::Grammar;
use crate::errors::BnfError;
use crate::syntax::load_grammar;

/// JSON (RFC 7159 shaped).
pub fn json() -> Result<Grammar, BnfError> {
    load_grammar(
        r#"
# JSON Grammar (RFC 7159 compliant)
json ::= value

value ::= object | array | string | number | boolean | null

object ::= '{' [member (',' member)*] '}'
member ::= string ':' value

array ::= '[' [value (',' value)*] ']'

string ::= '"' char* '"'
char ::= unescaped | escaped
unescaped ::= 'a'..'z' | 'A'..'Z' | '0'..'9' | ' ' | '!' | '#'..'[' | ']'..'~'
escaped ::= "\\" ('"' | "\\" | '/' | 'b' | 'f' | 'n' | 'r' | 't' | unicode)
unicode ::= 'u' hex hex hex hex
hex ::= '0'..'9' | 'a'..'f' | 'A'..'F'

number ::= ['-'] int ['.' digit+] [('e' | 'E') ['+' | '-'] digit+]
int ::= '0' | ('1'..'9' digit*)
digit ::= '0'..'9'

boolean ::= 'true' | 'false'
null ::= 'null'
"#,
    )
}

/// Infix arithmetic over integers.
pub fn arithmetic() -> Result<Grammar, BnfError> {
    load_grammar(
        r#"
expr   ::= term { ('+' | '-') term };
term   ::= factor { ('*' | '/') factor };
factor ::= NUMBER | '(' expr ')';
NUMBER ::= ('0'..'9')+;
"#,
    )
}

/// Bare identifiers.
pub fn identifier() -> Result<Grammar, BnfError> {
    load_grammar(
        r#"
# Identifier Grammar
identifier ::= letter (letter | digit | '_')*
letter ::= 'a'..'z' | 'A'..'Z'
digit ::= '0'..'9'
"#,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_grammars_are_valid() {
        assert!(json().is_ok());
        assert!(arithmetic().is_ok());
        assert!(identifier().is_ok());
    }

    #[test]
    fn json_starts_at_json() {
        assert_eq!(json().unwrap().start_symbol, "json");
    }

    #[test]
    fn arithmetic_starts_at_expr() {
        let g = arithmetic().unwrap();
        assert_eq!(g.start_symbol, "expr");
        assert_eq!(g.rules.len(), 4);
    }
}
