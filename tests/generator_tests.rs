// tests/generator_tests.rs

use bnfgen::codegen::{create_backend, derive_parser_name, GeneratorOptions};
use bnfgen::syntax::load_grammar;
use bnfgen::BnfError;

fn generate(source: &str, options: &GeneratorOptions) -> bnfgen::codegen::GeneratedCode {
    let grammar = load_grammar(source).unwrap();
    let backend = create_backend(&options.target_language).unwrap();
    backend.generate(&grammar, options).unwrap()
}

#[test]
fn generation_is_deterministic() {
    let grammar = bnfgen::samples::json().unwrap();
    let backend = create_backend("cpp").unwrap();
    let options = GeneratorOptions {
        parser_name: "JsonParser".into(),
        generate_executable: true,
        ..GeneratorOptions::default()
    };

    let first = backend.generate(&grammar, &options).unwrap();
    let second = backend.generate(&grammar, &options).unwrap();
    assert_eq!(first.parser_code, second.parser_code);
    assert_eq!(first.main_code, second.main_code);
}

#[test]
fn generated_parser_has_ast_and_rule_functions() {
    let result = generate(
        "list ::= '[' element ']'\nelement ::= ('a'..'z')+",
        &GeneratorOptions::default(),
    );

    let code = &result.parser_code;
    assert!(code.contains("class ASTNode"));
    assert!(code.contains("virtual ~ASTNode() = default;"));
    assert!(code.contains("class ListNode : public ASTNode"));
    assert!(code.contains("class ElementNode : public ASTNode"));
    assert!(code.contains("std::shared_ptr<ASTNode> parse_list()"));
    assert!(code.contains("std::shared_ptr<ASTNode> parse_element()"));
    assert!(code.contains("class GeneratedParser"));
}

#[test]
fn parser_filename_follows_parser_name() {
    let result = generate(
        "r ::= 'x'",
        &GeneratorOptions {
            parser_name: "TinyParser".into(),
            ..GeneratorOptions::default()
        },
    );
    assert_eq!(result.parser_filename, "TinyParser.cpp");
}

#[test]
fn enum_parameters_become_enum_types_and_arguments() {
    let source = "agreement[N:enum{sing,plur}] ::= noun[N] verb[N]\n\
                  noun[N:enum{sing,plur}] ::= 'cat' | 'cats'\n\
                  verb[N:enum{sing,plur}] ::= 'runs' | 'run'";
    let result = generate(
        source,
        &GeneratorOptions {
            parser_name: "AgreementParser".into(),
            ..GeneratorOptions::default()
        },
    );

    let code = &result.parser_code;
    assert!(code.contains("enum class NEnum { sing, plur };"));
    assert!(code.contains("parse_agreement(NEnum N)"));
    assert!(code.contains("parse_noun(NEnum N)"));
    assert!(code.contains("parse_noun(N)"));
}

#[test]
fn defaulted_parameters_emit_cpp_default_arguments() {
    let source = "top ::= pick\npick[N:enum{sing,plur}=sing] ::= 'x'";
    let result = generate(source, &GeneratorOptions::default());
    let code = &result.parser_code;
    assert!(code.contains("parse_pick(NEnum N = NEnum::sing)"));
    // The argument-free call is legal because every parameter defaults.
    assert!(code.contains("parse_pick()"));
}

#[test]
fn default_before_required_parameter_fails_generation() {
    let grammar = load_grammar("r[a:int='1', b:int] ::= 'x'").unwrap();
    let backend = create_backend("cpp").unwrap();
    let err = backend
        .generate(&grammar, &GeneratorOptions::default())
        .unwrap_err();
    match err {
        BnfError::Emission(message) => assert!(message.contains("default")),
        other => panic!("expected an emission error, got {other:?}"),
    }
}

#[test]
fn enum_values_at_call_sites_are_qualified() {
    let source = "top ::= pick[sing]\npick[N:enum{sing,plur}] ::= 'x'";
    let result = generate(source, &GeneratorOptions::default());
    assert!(result.parser_code.contains("parse_pick(NEnum::sing)"));
}

#[test]
fn context_actions_emit_context_storage() {
    let source = "document ::= anchor reference\n\
                  anchor ::= '&' name content {store(name, content)}\n\
                  reference ::= '*' name {lookup(name)}\n\
                  name ::= ('a'..'z')+\n\
                  content ::= ('A'..'Z')+";
    let result = generate(
        source,
        &GeneratorOptions {
            parser_name: "ContextParser".into(),
            ..GeneratorOptions::default()
        },
    );

    let code = &result.parser_code;
    assert!(code.contains("#include <unordered_map>"));
    assert!(code.contains("std::unordered_map<std::string, std::string> context_storage_;"));
    assert!(code.contains("context_storage_[key_"));
    assert!(code.contains("context_storage_.find(key_"));
}

#[test]
fn check_action_emits_predicate_hook() {
    let source = "r ::= 'x' {check(balanced)}";
    let result = generate(source, &GeneratorOptions::default());
    assert!(result.parser_code.contains("check_predicate(\"balanced\")"));
    assert!(result.parser_code.contains("bool check_predicate(const std::string& condition)"));
}

#[test]
fn context_free_grammars_carry_no_context_storage() {
    let result = generate("r ::= 'x'", &GeneratorOptions::default());
    assert!(!result.parser_code.contains("context_storage_"));
    assert!(!result.parser_code.contains("unordered_map"));
}

#[test]
fn namespace_wraps_generated_code() {
    let result = generate(
        "r ::= 'x'",
        &GeneratorOptions {
            namespace: "calc".into(),
            ..GeneratorOptions::default()
        },
    );
    assert!(result.parser_code.contains("namespace calc {"));
    assert!(result.parser_code.contains("} // namespace calc"));
}

#[test]
fn executable_option_emits_main_file() {
    let result = generate(
        "r ::= 'x'",
        &GeneratorOptions {
            parser_name: "TinyParser".into(),
            generate_executable: true,
            ..GeneratorOptions::default()
        },
    );

    assert_eq!(result.main_filename.as_deref(), Some("TinyParser_main.cpp"));
    let main_code = result.main_code.unwrap();
    assert!(main_code.contains("int main(int argc, char** argv)"));
    assert!(main_code.contains("#include \"TinyParser.cpp\""));
    assert!(main_code.contains("parser.parse()"));
}

#[test]
fn debug_mode_emits_tracing() {
    let result = generate(
        "r ::= 'x'",
        &GeneratorOptions {
            debug_mode: true,
            ..GeneratorOptions::default()
        },
    );
    assert!(result.parser_code.contains("#include <iostream>"));
    assert!(result.parser_code.contains("std::cerr"));
}

#[test]
fn rule_names_are_sanitised() {
    let result = generate(
        "<top level> ::= <sub-rule>\n<sub-rule> ::= 'x'",
        &GeneratorOptions::default(),
    );
    assert!(result.parser_code.contains("parse_top_level()"));
    assert!(result.parser_code.contains("parse_sub_rule()"));
}

#[test]
fn arity_mismatch_fails_generation() {
    let grammar = load_grammar("a ::= b\nb[x:int] ::= 'y'").unwrap();
    let backend = create_backend("cpp").unwrap();
    let err = backend
        .generate(&grammar, &GeneratorOptions::default())
        .unwrap_err();
    match err {
        BnfError::Emission(message) => assert!(message.contains("arity")),
        other => panic!("expected an emission error, got {other:?}"),
    }
}

#[test]
fn unsupported_language_is_rejected() {
    assert!(matches!(
        create_backend("fortran"),
        Err(BnfError::UnsupportedLanguage(_))
    ));
}

#[test]
fn messages_report_scope_of_generation() {
    let result = generate("r ::= 'x'", &GeneratorOptions::default());
    assert!(!result.messages.is_empty());
    assert!(result.messages.iter().any(|m| m.contains("1 rules")));
}

#[test]
fn parser_names_derive_from_grammar_stems() {
    assert_eq!(derive_parser_name("json"), "JsonParser");
    assert_eq!(derive_parser_name("tiny_calc"), "TinyCalcParser");
}

#[test]
fn generated_backtracking_restores_cursor() {
    // An alternative must save and restore position around failed tries.
    let result = generate("r ::= 'ab' | 'ac'", &GeneratorOptions::default());
    let code = &result.parser_code;
    assert!(code.contains("alt_pos_"));
    assert!(code.contains("truncate_children(alt_mark_"));
    assert!(code.contains("if (!match_literal(\"ab\", 2))"));
}
