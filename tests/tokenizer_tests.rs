// tests/tokenizer_tests.rs

use bnfgen::syntax::parse_grammar;
use bnfgen::tokenizer::{analyze_tokens, find_tokens_by_type, tokens_to_string, Token, Tokenizer};

fn kinds_and_values(tokens: &[Token]) -> Vec<(&str, &str)> {
    tokens
        .iter()
        .map(|t| (t.kind.as_str(), t.value.as_str()))
        .collect()
}

#[test]
fn arithmetic_expression_tokenises() {
    let grammar = bnfgen::samples::arithmetic().unwrap();
    let mut tokenizer = Tokenizer::new(&grammar).unwrap();
    let tokens = tokenizer.tokenize("2 + 3 * 4");

    assert_eq!(
        kinds_and_values(&tokens),
        vec![
            ("NUMBER", "2"),
            ("expr", "+"),
            ("NUMBER", "3"),
            ("expr", "*"),
            ("NUMBER", "4"),
            ("EOF", ""),
        ]
    );
    assert!(tokenizer.last_error().is_none());
}

#[test]
fn empty_json_object_tokenises() {
    let grammar = bnfgen::samples::json().unwrap();
    let mut tokenizer = Tokenizer::new(&grammar).unwrap();
    let tokens = tokenizer.tokenize("{}");

    let values: Vec<&str> = tokens.iter().map(|t| t.value.as_str()).collect();
    let open = values.iter().position(|v| *v == "{");
    let close = values.iter().position(|v| *v == "}");
    assert!(open.is_some(), "no '{{' token in {values:?}");
    assert!(close.is_some(), "no '}}' token in {values:?}");
    assert!(open < close);
    assert_eq!(tokens.last().unwrap().kind, "EOF");
    assert!(tokenizer.last_error().is_none());
}

#[test]
fn multi_digit_numbers_take_longest_match() {
    let grammar = bnfgen::samples::arithmetic().unwrap();
    let mut tokenizer = Tokenizer::new(&grammar).unwrap();
    let tokens = tokenizer.tokenize("123 + 456");
    assert_eq!(tokens[0].value, "123");
    assert_eq!(tokens[2].value, "456");
}

#[test]
fn positions_track_lines_and_columns() {
    let grammar = bnfgen::samples::arithmetic().unwrap();
    let mut tokenizer = Tokenizer::new(&grammar).unwrap();
    let tokens = tokenizer.tokenize("1 +\n22");

    assert_eq!((tokens[0].line, tokens[0].column, tokens[0].byte_offset), (1, 1, 0));
    assert_eq!((tokens[1].line, tokens[1].column), (1, 3));
    assert_eq!((tokens[2].line, tokens[2].column, tokens[2].byte_offset), (2, 1, 4));
}

#[test]
fn unexpected_character_stops_and_records_error() {
    let grammar = bnfgen::samples::arithmetic().unwrap();
    let mut tokenizer = Tokenizer::new(&grammar).unwrap();
    let tokens = tokenizer.tokenize("1 @ 2");

    // One number, then the sentinel.
    assert_eq!(tokens[0].value, "1");
    assert_eq!(tokens.last().unwrap().kind, "EOF");
    let error = tokenizer.last_error().unwrap();
    assert!(error.contains("Unexpected character '@'"));
    assert!(error.contains("line 1, column 3"));
}

#[test]
fn token_values_cover_the_consumed_input() {
    let grammar = bnfgen::samples::arithmetic().unwrap();
    let mut tokenizer = Tokenizer::new(&grammar).unwrap();
    let input = "12 + 3 * 45 - 6";
    let tokens = tokenizer.tokenize(input);

    // Every token's value sits at its recorded offset, and the bytes
    // between consecutive tokens are whitespace the tokeniser skipped.
    let mut expected_next = 0usize;
    for token in tokens.iter().filter(|t| t.kind != "EOF") {
        assert!(input[expected_next..token.byte_offset]
            .bytes()
            .all(|b| b.is_ascii_whitespace()));
        assert_eq!(
            &input[token.byte_offset..token.byte_offset + token.value.len()],
            token.value
        );
        expected_next = token.byte_offset + token.value.len();
    }
    assert_eq!(expected_next, input.len());
}

#[test]
fn recursive_rules_terminate_and_match_their_regular_prefix() {
    let grammar = parse_grammar("a ::= 'x' a | 'x'").unwrap();
    let mut tokenizer = Tokenizer::new(&grammar).unwrap();
    let tokens = tokenizer.tokenize("xxx");
    assert_eq!(tokens[0].kind, "a");
    assert!(!tokens[0].value.is_empty());
    assert_eq!(tokens.last().unwrap().kind, "EOF");
}

#[test]
fn parameterised_grammars_are_rejected() {
    let grammar = parse_grammar("r[n:int] ::= 'x'").unwrap();
    assert!(Tokenizer::new(&grammar).is_err());
}

#[test]
fn whitespace_skipping_can_be_disabled() {
    let grammar = parse_grammar("word ::= ('a'..'z')+").unwrap();
    let mut tokenizer = Tokenizer::new(&grammar).unwrap();
    tokenizer.set_skip_whitespace(false);
    let tokens = tokenizer.tokenize("ab cd");

    // The space is no longer skipped, so tokenisation stops there.
    assert_eq!(tokens[0].value, "ab");
    assert_eq!(tokens.len(), 2); // word + EOF
    assert!(tokenizer.last_error().unwrap().contains("' '"));
}

#[test]
fn comments_are_skipped_in_input() {
    let grammar = bnfgen::samples::arithmetic().unwrap();
    let mut tokenizer = Tokenizer::new(&grammar).unwrap();
    let tokens = tokenizer.tokenize("1 # note\n+ 2");
    let values: Vec<&str> = tokens.iter().map(|t| t.value.as_str()).collect();
    assert_eq!(values, vec!["1", "+", "2", ""]);
}

#[test]
fn eof_sentinel_is_always_present() {
    let grammar = bnfgen::samples::arithmetic().unwrap();
    let mut tokenizer = Tokenizer::new(&grammar).unwrap();
    let tokens = tokenizer.tokenize("");
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].kind, "EOF");
    assert_eq!(tokens[0].byte_offset, 0);
}

#[test]
fn token_stream_utilities() {
    let grammar = bnfgen::samples::arithmetic().unwrap();
    let mut tokenizer = Tokenizer::new(&grammar).unwrap();
    let tokens = tokenizer.tokenize("2 + 3");

    assert_eq!(tokens_to_string(&tokens), "2 + 3");

    let numbers = find_tokens_by_type(&tokens, "NUMBER");
    assert_eq!(numbers.len(), 2);

    let stats = analyze_tokens(&tokens);
    assert_eq!(stats.total_tokens, 3);
    assert_eq!(stats.unique_types, 2);
    assert_eq!(stats.type_counts["NUMBER"], 2);
}
