//! The C++ backend: emits a standalone recursive-descent parser.
//!
//! The generated file carries an `ASTNode` base class, one derived node
//! class per rule, enum types for enum-typed rule parameters, and a
//! parser class with one `parse_<rule>` member function per rule. Every
//! construct that can fail midway saves the cursor (and the node's child
//! count) on entry and restores both before running its failure action,
//! so failed attempts leave no trace. The failure action is threaded
//! through emission as a statement string: `return nullptr;` at rule
//! level, `break;` out of the retry loop inside an alternative, and so
//! on.

use std::collections::HashSet;
use std::fmt::Write;

use super::{escape_string, make_identifier, Backend, GeneratedCode, GeneratorOptions};
use crate::ast::{ActionKind, Grammar, Node, ParamType, ProductionRule, RuleParameter};
use crate::errors::BnfError;

pub struct CppBackend;

impl Backend for CppBackend {
    fn generate(
        &self,
        grammar: &Grammar,
        options: &GeneratorOptions,
    ) -> Result<GeneratedCode, BnfError> {
        Emitter::new(grammar, options).generate()
    }

    fn target_language(&self) -> &'static str {
        "cpp"
    }

    fn file_extension(&self) -> &'static str {
        ".cpp"
    }
}

struct Emitter<'a> {
    grammar: &'a Grammar,
    options: &'a GeneratorOptions,
    var_counter: usize,
}

impl<'a> Emitter<'a> {
    fn new(grammar: &'a Grammar, options: &'a GeneratorOptions) -> Self {
        Self {
            grammar,
            options,
            var_counter: 0,
        }
    }

    fn pad(&self, level: usize) -> String {
        self.options.indent_style.repeat(level)
    }

    fn fresh(&mut self) -> usize {
        self.var_counter += 1;
        self.var_counter
    }

    fn generate(mut self) -> Result<GeneratedCode, BnfError> {
        if self.grammar.rules.is_empty() {
            return Err(BnfError::Emission(
                "cannot generate a parser from an empty grammar".to_string(),
            ));
        }

        let context_sensitive = self.grammar.is_context_sensitive();
        let namespaced = !self.options.namespace.is_empty();

        let mut out = String::new();
        self.emit_header_comment(&mut out);
        self.emit_includes(&mut out, context_sensitive);

        if namespaced {
            let _ = writeln!(
                out,
                "namespace {} {{\n",
                make_identifier(&self.options.namespace)
            );
        }

        self.emit_ast_classes(&mut out);
        self.emit_enums(&mut out);
        self.emit_parser_class(&mut out, context_sensitive)?;

        if namespaced {
            let _ = writeln!(
                out,
                "}} // namespace {}",
                make_identifier(&self.options.namespace)
            );
        }

        let parser_filename = format!("{}{}", self.options.parser_name, ".cpp");
        let mut generated = GeneratedCode {
            parser_code: out,
            parser_filename: parser_filename.clone(),
            main_code: None,
            main_filename: None,
            messages: vec![
                format!(
                    "Generated parser '{}' with {} rules",
                    self.options.parser_name,
                    self.grammar.rules.len()
                ),
                format!("Start symbol: {}", self.grammar.start_symbol),
            ],
            warnings: Vec::new(),
        };

        if self.start_rule_is_parameterised() {
            generated.warnings.push(format!(
                "start rule '{}' is parameterised; no argument-free parse() entry emitted",
                self.grammar.start_symbol
            ));
        }

        if self.options.generate_executable {
            if self.start_rule_is_parameterised() {
                generated.warnings.push(
                    "executable entry point skipped: the start rule needs arguments".to_string(),
                );
            } else {
                generated.main_code = Some(self.emit_main(&parser_filename));
                generated.main_filename =
                    Some(format!("{}_main.cpp", self.options.parser_name));
            }
        }

        Ok(generated)
    }

    fn start_rule_is_parameterised(&self) -> bool {
        self.grammar
            .find_rule(&self.grammar.start_symbol)
            .is_some_and(|r| r.has_params())
    }

    fn emit_header_comment(&self, out: &mut String) {
        let origin = if self.options.grammar_origin.is_empty() {
            "grammar".to_string()
        } else {
            self.options.grammar_origin.clone()
        };
        let _ = writeln!(
            out,
            "// Generated by bnfgen v{} from {}.",
            env!("CARGO_PKG_VERSION"),
            origin
        );
        let _ = writeln!(
            out,
            "// Parser: {}. Do not edit; regenerate instead.\n",
            self.options.parser_name
        );
    }

    fn emit_includes(&self, out: &mut String, context_sensitive: bool) {
        out.push_str("#include <cstddef>\n");
        out.push_str("#include <cstdint>\n");
        if self.options.debug_mode {
            out.push_str("#include <iostream>\n");
        }
        out.push_str("#include <memory>\n");
        out.push_str("#include <string>\n");
        if context_sensitive {
            out.push_str("#include <unordered_map>\n");
        }
        out.push_str("#include <vector>\n\n");
    }

    fn node_class(&self, rule_name: &str) -> String {
        let ident = make_identifier(rule_name);
        let mut chars = ident.chars();
        let capitalised = match chars.next() {
            Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            None => String::from("Unnamed"),
        };
        format!("{capitalised}Node")
    }

    fn emit_ast_classes(&self, out: &mut String) {
        let p1 = self.pad(1);
        let p2 = self.pad(2);

        out.push_str("class ASTNode {\n");
        out.push_str("public:\n");
        let _ = writeln!(
            out,
            "{p1}explicit ASTNode(std::string type) : type_(std::move(type)) {{}}"
        );
        let _ = writeln!(out, "{p1}virtual ~ASTNode() = default;\n");
        let _ = writeln!(
            out,
            "{p1}const std::string& type() const {{ return type_; }}"
        );
        let _ = writeln!(
            out,
            "{p1}const std::string& text() const {{ return text_; }}"
        );
        let _ = writeln!(
            out,
            "{p1}void set_text(std::string text) {{ text_ = std::move(text); }}\n"
        );
        let _ = writeln!(
            out,
            "{p1}void add_child(std::shared_ptr<ASTNode> child) {{"
        );
        let _ = writeln!(out, "{p2}children_.push_back(std::move(child));");
        let _ = writeln!(out, "{p1}}}");
        let _ = writeln!(
            out,
            "{p1}std::size_t child_count() const {{ return children_.size(); }}"
        );
        let _ = writeln!(
            out,
            "{p1}const std::shared_ptr<ASTNode>& child(std::size_t index) const {{"
        );
        let _ = writeln!(out, "{p2}return children_[index];");
        let _ = writeln!(out, "{p1}}}");
        let _ = writeln!(
            out,
            "{p1}void truncate_children(std::size_t count) {{ children_.resize(count); }}\n"
        );
        out.push_str("private:\n");
        let _ = writeln!(out, "{p1}std::string type_;");
        let _ = writeln!(out, "{p1}std::string text_;");
        let _ = writeln!(out, "{p1}std::vector<std::shared_ptr<ASTNode>> children_;");
        out.push_str("};\n\n");

        let mut emitted = HashSet::new();
        for rule in &self.grammar.rules {
            let class = self.node_class(&rule.name);
            if !emitted.insert(class.clone()) {
                continue;
            }
            let _ = writeln!(out, "class {class} : public ASTNode {{");
            out.push_str("public:\n");
            let _ = writeln!(
                out,
                "{p1}{class}() : ASTNode(\"{}\") {{}}",
                escape_string(&rule.name)
            );
            out.push_str("};\n\n");
        }
    }

    fn enum_name(param: &RuleParameter) -> String {
        format!("{}Enum", make_identifier(&param.name))
    }

    fn emit_enums(&self, out: &mut String) {
        let mut emitted = HashSet::new();
        for rule in &self.grammar.rules {
            for param in &rule.params {
                if let ParamType::Enum(values) = &param.ty {
                    let name = Self::enum_name(param);
                    if !emitted.insert(name.clone()) {
                        continue;
                    }
                    let rendered: Vec<String> =
                        values.iter().map(|v| make_identifier(v)).collect();
                    let _ = writeln!(
                        out,
                        "enum class {name} {{ {} }};\n",
                        rendered.join(", ")
                    );
                }
            }
        }
    }

    fn param_type(param: &RuleParameter) -> String {
        match &param.ty {
            ParamType::Enum(_) => Self::enum_name(param),
            ParamType::Integer => "int".to_string(),
            ParamType::String => "const std::string&".to_string(),
            ParamType::Boolean => "bool".to_string(),
        }
    }

    fn default_value(param: &RuleParameter, value: &str) -> Result<String, BnfError> {
        match &param.ty {
            ParamType::Enum(values) => {
                if values.iter().any(|v| v == value) {
                    Ok(format!("{}::{}", Self::enum_name(param), make_identifier(value)))
                } else {
                    Err(BnfError::Emission(format!(
                        "unknown enum value '{}' as default for parameter '{}'",
                        value, param.name
                    )))
                }
            }
            ParamType::Integer => value.parse::<i64>().map(|v| v.to_string()).map_err(|_| {
                BnfError::Emission(format!(
                    "parameter '{}' default '{}' is not an integer",
                    param.name, value
                ))
            }),
            ParamType::Boolean => match value {
                "true" | "false" => Ok(value.to_string()),
                _ => Err(BnfError::Emission(format!(
                    "parameter '{}' default '{}' is not a boolean",
                    param.name, value
                ))),
            },
            ParamType::String => Ok(format!("\"{}\"", escape_string(value))),
        }
    }

    fn emit_parser_class(
        &mut self,
        out: &mut String,
        context_sensitive: bool,
    ) -> Result<(), BnfError> {
        let p1 = self.pad(1);
        let p2 = self.pad(2);
        let p3 = self.pad(3);
        let name = make_identifier(&self.options.parser_name);

        let _ = writeln!(out, "class {name} {{");
        out.push_str("public:\n");
        let _ = writeln!(
            out,
            "{p1}explicit {name}(std::string input) : input_(std::move(input)) {{}}\n"
        );

        // Argument-free entry point, when the start rule permits one.
        if !self.start_rule_is_parameterised() {
            let start_fn = make_identifier(&self.grammar.start_symbol);
            let _ = writeln!(out, "{p1}std::shared_ptr<ASTNode> parse() {{");
            let _ = writeln!(out, "{p2}auto root = parse_{start_fn}();");
            let _ = writeln!(out, "{p2}if (!root && last_error_.empty()) {{");
            let _ = writeln!(out, "{p3}last_error_ = \"input does not match grammar\";");
            let _ = writeln!(out, "{p2}}}");
            let _ = writeln!(out, "{p2}return root;");
            let _ = writeln!(out, "{p1}}}\n");
        }

        let _ = writeln!(
            out,
            "{p1}const std::string& last_error() const {{ return last_error_; }}"
        );
        let _ = writeln!(out, "{p1}std::size_t position() const {{ return pos_; }}");
        let _ = writeln!(out, "{p1}std::size_t line() const {{ return line_; }}");
        let _ = writeln!(
            out,
            "{p1}std::size_t column() const {{ return column_; }}\n"
        );

        // One function per rule; a repeated rule name keeps its first
        // definition, matching lookup order.
        let mut emitted = HashSet::new();
        for rule in &self.grammar.rules {
            let fname = make_identifier(&rule.name);
            if !emitted.insert(fname.clone()) {
                continue;
            }
            let function = self.emit_rule_function(rule)?;
            out.push_str(&function);
        }

        out.push_str("private:\n");
        self.emit_helpers(out, context_sensitive);
        let _ = writeln!(out, "{p1}std::string input_;");
        let _ = writeln!(out, "{p1}std::size_t pos_ = 0;");
        let _ = writeln!(out, "{p1}std::size_t line_ = 1;");
        let _ = writeln!(out, "{p1}std::size_t column_ = 1;");
        let _ = writeln!(out, "{p1}std::string last_error_;");
        if context_sensitive {
            let _ = writeln!(
                out,
                "{p1}std::unordered_map<std::string, std::string> context_storage_;"
            );
        }
        out.push_str("};\n\n");
        Ok(())
    }

    fn emit_rule_function(&mut self, rule: &ProductionRule) -> Result<String, BnfError> {
        let p1 = self.pad(1);
        let p2 = self.pad(2);
        let fname = make_identifier(&rule.name);
        let class = self.node_class(&rule.name);

        let mut params = Vec::new();
        let mut seen_default = false;
        for param in &rule.params {
            if param.default.is_some() {
                seen_default = true;
            } else if seen_default {
                return Err(BnfError::Emission(format!(
                    "parameter '{}' of rule '{}' lacks a default but follows a defaulted parameter",
                    param.name, rule.name
                )));
            }
            let mut rendered =
                format!("{} {}", Self::param_type(param), make_identifier(&param.name));
            if let Some(default) = &param.default {
                let _ = write!(rendered, " = {}", Self::default_value(param, default)?);
            }
            params.push(rendered);
        }

        let mut out = String::new();
        let _ = writeln!(
            out,
            "{p1}std::shared_ptr<ASTNode> parse_{fname}({}) {{",
            params.join(", ")
        );
        let _ = writeln!(out, "{p2}std::size_t start_pos = pos_;");
        let _ = writeln!(out, "{p2}std::size_t start_line = line_;");
        let _ = writeln!(out, "{p2}std::size_t start_column = column_;");
        let _ = writeln!(out, "{p2}auto node = std::make_shared<{class}>();");
        if self.options.debug_mode {
            let _ = writeln!(
                out,
                "{p2}std::cerr << \"[{}] enter {} at \" << pos_ << \"\\n\";",
                make_identifier(&self.options.parser_name),
                fname
            );
        }

        let mut fail = String::from(
            "pos_ = start_pos; line_ = start_line; column_ = start_column; return nullptr;",
        );
        if self.options.debug_mode {
            fail = format!(
                "std::cerr << \"[{}] fail {} at \" << pos_ << \"\\n\"; {fail}",
                make_identifier(&self.options.parser_name),
                fname
            );
        }

        self.emit_node(&mut out, 2, &rule.body, rule, &fail)?;

        let _ = writeln!(
            out,
            "{p2}node->set_text(input_.substr(start_pos, pos_ - start_pos));"
        );
        if self.options.debug_mode {
            let _ = writeln!(
                out,
                "{p2}std::cerr << \"[{}] match {} '\" << node->text() << \"'\\n\";",
                make_identifier(&self.options.parser_name),
                fname
            );
        }
        let _ = writeln!(out, "{p2}return node;");
        let _ = writeln!(out, "{p1}}}\n");
        Ok(out)
    }

    fn emit_node(
        &mut self,
        out: &mut String,
        level: usize,
        node: &Node,
        rule: &ProductionRule,
        on_fail: &str,
    ) -> Result<(), BnfError> {
        let p = self.pad(level);
        match node {
            Node::Terminal(value) => {
                let _ = writeln!(
                    out,
                    "{p}if (!match_literal(\"{}\", {})) {{ {on_fail} }}",
                    escape_string(value),
                    value.len()
                );
            }
            Node::CharRange { start, end } => {
                let _ = writeln!(
                    out,
                    "{p}if (!match_range(0x{start:X}u, 0x{end:X}u)) {{ {on_fail} }}"
                );
            }
            Node::NonTerminal { name, args } => {
                self.emit_reference(out, level, name, args, rule, on_fail)?;
            }
            Node::Alternative(choices) => {
                self.emit_alternative(out, level, choices, rule, on_fail)?;
            }
            Node::Sequence(elements) => {
                self.emit_sequence(out, level, elements, rule, on_fail)?;
            }
            Node::Group(child) => {
                self.emit_node(out, level, child, rule, on_fail)?;
            }
            Node::Optional(child) => {
                self.emit_optional(out, level, child, rule)?;
            }
            Node::ZeroOrMore(child) => {
                self.emit_zero_or_more(out, level, child, rule)?;
            }
            Node::OneOrMore(child) => {
                self.emit_node(out, level, child, rule, on_fail)?;
                self.emit_zero_or_more(out, level, child, rule)?;
            }
            Node::ContextAction { kind, args } => {
                self.emit_context_action(out, level, *kind, args, on_fail)?;
            }
        }
        Ok(())
    }

    fn emit_reference(
        &mut self,
        out: &mut String,
        level: usize,
        name: &str,
        args: &[String],
        rule: &ProductionRule,
        on_fail: &str,
    ) -> Result<(), BnfError> {
        let p = self.pad(level);
        let p1 = self.pad(level + 1);
        let callee = self.grammar.find_rule(name).ok_or_else(|| {
            BnfError::Emission(format!(
                "rule '{}' references unknown rule '{name}'",
                rule.name
            ))
        })?;

        let call_args = self.map_arguments(rule, callee, args)?;
        let n = self.fresh();

        let _ = writeln!(out, "{p}{{");
        let _ = writeln!(
            out,
            "{p1}auto child_{n} = parse_{}({});",
            make_identifier(name),
            call_args.join(", ")
        );
        let _ = writeln!(out, "{p1}if (!child_{n}) {{ {on_fail} }}");
        let _ = writeln!(out, "{p1}node->add_child(child_{n});");
        let _ = writeln!(out, "{p}}}");
        Ok(())
    }

    /// Maps call-site argument names to C++ expressions, checking arity
    /// against the callee's declaration.
    fn map_arguments(
        &self,
        caller: &ProductionRule,
        callee: &ProductionRule,
        args: &[String],
    ) -> Result<Vec<String>, BnfError> {
        if args.is_empty() && !callee.params.is_empty() {
            if callee.params.iter().all(|p| p.default.is_some()) {
                return Ok(Vec::new());
            }
            return Err(BnfError::Emission(format!(
                "parameter arity mismatch in call to '{}': expected {}, got 0",
                callee.name,
                callee.params.len()
            )));
        }
        if args.len() != callee.params.len() {
            return Err(BnfError::Emission(format!(
                "parameter arity mismatch in call to '{}': expected {}, got {}",
                callee.name,
                callee.params.len(),
                args.len()
            )));
        }

        let mut rendered = Vec::new();
        for (arg, param) in args.iter().zip(&callee.params) {
            // A caller's formal parameter of the same name passes through.
            if caller.params.iter().any(|p| &p.name == arg) {
                rendered.push(make_identifier(arg));
                continue;
            }
            let expr = match &param.ty {
                ParamType::Enum(values) => {
                    if !values.iter().any(|v| v == arg) {
                        return Err(BnfError::Emission(format!(
                            "unknown enum value '{arg}' for parameter '{}' of rule '{}'",
                            param.name, callee.name
                        )));
                    }
                    format!("{}::{}", Self::enum_name(param), make_identifier(arg))
                }
                ParamType::Integer => arg.parse::<i64>().map(|v| v.to_string()).map_err(|_| {
                    BnfError::Emission(format!(
                        "argument '{arg}' for integer parameter '{}' of rule '{}' is not an integer",
                        param.name, callee.name
                    ))
                })?,
                ParamType::Boolean => match arg.as_str() {
                    "true" | "false" => arg.clone(),
                    _ => {
                        return Err(BnfError::Emission(format!(
                            "argument '{arg}' for boolean parameter '{}' of rule '{}' is not a boolean",
                            param.name, callee.name
                        )))
                    }
                },
                ParamType::String => format!("\"{}\"", escape_string(arg)),
            };
            rendered.push(expr);
        }
        Ok(rendered)
    }

    fn emit_alternative(
        &mut self,
        out: &mut String,
        level: usize,
        choices: &[Node],
        rule: &ProductionRule,
        on_fail: &str,
    ) -> Result<(), BnfError> {
        let p = self.pad(level);
        let p1 = self.pad(level + 1);
        let n = self.fresh();

        let _ = writeln!(out, "{p}{{");
        let _ = writeln!(out, "{p1}std::size_t alt_pos_{n} = pos_;");
        let _ = writeln!(out, "{p1}std::size_t alt_line_{n} = line_;");
        let _ = writeln!(out, "{p1}std::size_t alt_column_{n} = column_;");
        let _ = writeln!(out, "{p1}std::size_t alt_mark_{n} = node->child_count();");
        let _ = writeln!(out, "{p1}bool alt_ok_{n} = false;");

        let restore = format!(
            "pos_ = alt_pos_{n}; line_ = alt_line_{n}; column_ = alt_column_{n}; \
             node->truncate_children(alt_mark_{n}); break;"
        );

        for (i, choice) in choices.iter().enumerate() {
            if i == 0 {
                let _ = writeln!(out, "{p1}do {{");
            } else {
                let _ = writeln!(out, "{p1}if (!alt_ok_{n}) do {{");
            }
            self.emit_node(out, level + 2, choice, rule, &restore)?;
            let _ = writeln!(out, "{}alt_ok_{n} = true;", self.pad(level + 2));
            let _ = writeln!(out, "{p1}}} while (false);");
        }

        let _ = writeln!(out, "{p1}if (!alt_ok_{n}) {{ {on_fail} }}");
        let _ = writeln!(out, "{p}}}");
        Ok(())
    }

    fn emit_sequence(
        &mut self,
        out: &mut String,
        level: usize,
        elements: &[Node],
        rule: &ProductionRule,
        on_fail: &str,
    ) -> Result<(), BnfError> {
        let p = self.pad(level);
        let p1 = self.pad(level + 1);
        let n = self.fresh();

        let _ = writeln!(out, "{p}{{");
        let _ = writeln!(out, "{p1}std::size_t seq_pos_{n} = pos_;");
        let _ = writeln!(out, "{p1}std::size_t seq_line_{n} = line_;");
        let _ = writeln!(out, "{p1}std::size_t seq_column_{n} = column_;");
        let _ = writeln!(out, "{p1}std::size_t seq_mark_{n} = node->child_count();");

        let unwind = format!(
            "pos_ = seq_pos_{n}; line_ = seq_line_{n}; column_ = seq_column_{n}; \
             node->truncate_children(seq_mark_{n}); {on_fail}"
        );

        for element in elements {
            self.emit_node(out, level + 1, element, rule, &unwind)?;
        }

        let _ = writeln!(out, "{p}}}");
        Ok(())
    }

    fn emit_optional(
        &mut self,
        out: &mut String,
        level: usize,
        child: &Node,
        rule: &ProductionRule,
    ) -> Result<(), BnfError> {
        let p = self.pad(level);
        let p1 = self.pad(level + 1);
        let p2 = self.pad(level + 2);
        let n = self.fresh();

        let _ = writeln!(out, "{p}{{");
        let _ = writeln!(out, "{p1}std::size_t opt_pos_{n} = pos_;");
        let _ = writeln!(out, "{p1}std::size_t opt_line_{n} = line_;");
        let _ = writeln!(out, "{p1}std::size_t opt_column_{n} = column_;");
        let _ = writeln!(out, "{p1}std::size_t opt_mark_{n} = node->child_count();");
        let _ = writeln!(out, "{p1}bool opt_ok_{n} = true;");
        let _ = writeln!(out, "{p1}do {{");
        self.emit_node(out, level + 2, child, rule, &format!("opt_ok_{n} = false; break;"))?;
        let _ = writeln!(out, "{p1}}} while (false);");
        let _ = writeln!(out, "{p1}if (!opt_ok_{n}) {{");
        let _ = writeln!(
            out,
            "{p2}pos_ = opt_pos_{n}; line_ = opt_line_{n}; column_ = opt_column_{n};"
        );
        let _ = writeln!(out, "{p2}node->truncate_children(opt_mark_{n});");
        let _ = writeln!(out, "{p1}}}");
        let _ = writeln!(out, "{p}}}");
        Ok(())
    }

    fn emit_zero_or_more(
        &mut self,
        out: &mut String,
        level: usize,
        child: &Node,
        rule: &ProductionRule,
    ) -> Result<(), BnfError> {
        let p = self.pad(level);
        let p1 = self.pad(level + 1);
        let p2 = self.pad(level + 2);
        let n = self.fresh();

        let _ = writeln!(out, "{p}while (true) {{");
        let _ = writeln!(out, "{p1}std::size_t rep_pos_{n} = pos_;");
        let _ = writeln!(out, "{p1}std::size_t rep_line_{n} = line_;");
        let _ = writeln!(out, "{p1}std::size_t rep_column_{n} = column_;");
        let _ = writeln!(out, "{p1}std::size_t rep_mark_{n} = node->child_count();");
        let _ = writeln!(out, "{p1}bool rep_ok_{n} = true;");
        let _ = writeln!(out, "{p1}do {{");
        self.emit_node(out, level + 2, child, rule, &format!("rep_ok_{n} = false; break;"))?;
        let _ = writeln!(out, "{p1}}} while (false);");
        let _ = writeln!(out, "{p1}if (!rep_ok_{n}) {{");
        let _ = writeln!(
            out,
            "{p2}pos_ = rep_pos_{n}; line_ = rep_line_{n}; column_ = rep_column_{n};"
        );
        let _ = writeln!(out, "{p2}node->truncate_children(rep_mark_{n});");
        let _ = writeln!(out, "{p2}break;");
        let _ = writeln!(out, "{p1}}}");
        // An empty match would repeat forever.
        let _ = writeln!(out, "{p1}if (pos_ == rep_pos_{n}) {{ break; }}");
        let _ = writeln!(out, "{p}}}");
        Ok(())
    }

    fn emit_context_action(
        &mut self,
        out: &mut String,
        level: usize,
        kind: ActionKind,
        args: &[String],
        on_fail: &str,
    ) -> Result<(), BnfError> {
        let p = self.pad(level);
        let p1 = self.pad(level + 1);
        let p2 = self.pad(level + 2);
        let n = self.fresh();

        match kind {
            ActionKind::Store => {
                let [key_rule, value_rule] = match args {
                    [k, v] => [k, v],
                    _ => {
                        return Err(BnfError::Emission(format!(
                            "store action takes two arguments, got {}",
                            args.len()
                        )))
                    }
                };
                let _ = writeln!(out, "{p}{{");
                let _ = writeln!(out, "{p1}std::string key_{n};");
                let _ = writeln!(out, "{p1}std::string value_{n};");
                let _ = writeln!(
                    out,
                    "{p1}for (std::size_t i = node->child_count(); i > 0; --i) {{"
                );
                let _ = writeln!(out, "{p2}const auto& child = node->child(i - 1);");
                let _ = writeln!(
                    out,
                    "{p2}if (key_{n}.empty() && child->type() == \"{}\") {{ key_{n} = child->text(); }}",
                    escape_string(key_rule)
                );
                let _ = writeln!(
                    out,
                    "{p2}if (value_{n}.empty() && child->type() == \"{}\") {{ value_{n} = child->text(); }}",
                    escape_string(value_rule)
                );
                let _ = writeln!(out, "{p1}}}");
                let _ = writeln!(out, "{p1}context_storage_[key_{n}] = value_{n};");
                let _ = writeln!(out, "{p}}}");
            }
            ActionKind::Lookup => {
                let key_rule = match args {
                    [k] => k,
                    _ => {
                        return Err(BnfError::Emission(format!(
                            "lookup action takes one argument, got {}",
                            args.len()
                        )))
                    }
                };
                let _ = writeln!(out, "{p}{{");
                let _ = writeln!(out, "{p1}std::string key_{n};");
                let _ = writeln!(
                    out,
                    "{p1}for (std::size_t i = node->child_count(); i > 0; --i) {{"
                );
                let _ = writeln!(out, "{p2}const auto& child = node->child(i - 1);");
                let _ = writeln!(
                    out,
                    "{p2}if (child->type() == \"{}\") {{ key_{n} = child->text(); break; }}",
                    escape_string(key_rule)
                );
                let _ = writeln!(out, "{p1}}}");
                let _ = writeln!(
                    out,
                    "{p1}auto entry_{n} = context_storage_.find(key_{n});"
                );
                let _ = writeln!(
                    out,
                    "{p1}if (entry_{n} == context_storage_.end()) {{ {on_fail} }}"
                );
                let _ = writeln!(
                    out,
                    "{p1}if (input_.compare(pos_, entry_{n}->second.size(), entry_{n}->second) != 0) {{ {on_fail} }}"
                );
                let _ = writeln!(out, "{p1}advance_bytes(entry_{n}->second.size());");
                let _ = writeln!(out, "{p}}}");
            }
            ActionKind::Check => {
                let condition = args.join(", ");
                // Extension point: semantics are left to the embedder.
                let _ = writeln!(
                    out,
                    "{p}if (!check_predicate(\"{}\")) {{ {on_fail} }}",
                    escape_string(&condition)
                );
            }
        }
        Ok(())
    }

    fn emit_helpers(&self, out: &mut String, context_sensitive: bool) {
        let p1 = self.pad(1);
        let p2 = self.pad(2);
        let p3 = self.pad(3);

        let _ = writeln!(
            out,
            "{p1}bool match_literal(const char* literal, std::size_t length) {{"
        );
        let _ = writeln!(
            out,
            "{p2}if (input_.compare(pos_, length, literal, length) != 0) {{"
        );
        let _ = writeln!(out, "{p3}return false;");
        let _ = writeln!(out, "{p2}}}");
        let _ = writeln!(out, "{p2}advance_bytes(length);");
        let _ = writeln!(out, "{p2}return true;");
        let _ = writeln!(out, "{p1}}}\n");

        let _ = writeln!(
            out,
            "{p1}bool match_range(std::uint32_t low, std::uint32_t high) {{"
        );
        let _ = writeln!(out, "{p2}std::uint32_t cp = 0;");
        let _ = writeln!(out, "{p2}std::size_t length = decode_codepoint(pos_, cp);");
        let _ = writeln!(
            out,
            "{p2}if (length == 0 || cp < low || cp > high) {{ return false; }}"
        );
        let _ = writeln!(out, "{p2}advance_bytes(length);");
        let _ = writeln!(out, "{p2}return true;");
        let _ = writeln!(out, "{p1}}}\n");

        let _ = writeln!(
            out,
            "{p1}std::size_t decode_codepoint(std::size_t pos, std::uint32_t& out) const {{"
        );
        let _ = writeln!(out, "{p2}if (pos >= input_.size()) {{ return 0; }}");
        let _ = writeln!(
            out,
            "{p2}unsigned char first = static_cast<unsigned char>(input_[pos]);"
        );
        let _ = writeln!(out, "{p2}std::size_t length = 1;");
        let _ = writeln!(out, "{p2}std::uint32_t cp = first;");
        let _ = writeln!(out, "{p2}if ((first & 0x80u) == 0u) {{");
        let _ = writeln!(out, "{p3}length = 1; cp = first;");
        let _ = writeln!(out, "{p2}}} else if ((first & 0xE0u) == 0xC0u) {{");
        let _ = writeln!(out, "{p3}length = 2; cp = first & 0x1Fu;");
        let _ = writeln!(out, "{p2}}} else if ((first & 0xF0u) == 0xE0u) {{");
        let _ = writeln!(out, "{p3}length = 3; cp = first & 0x0Fu;");
        let _ = writeln!(out, "{p2}}} else if ((first & 0xF8u) == 0xF0u) {{");
        let _ = writeln!(out, "{p3}length = 4; cp = first & 0x07u;");
        let _ = writeln!(out, "{p2}}} else {{");
        let _ = writeln!(out, "{p3}out = first;");
        let _ = writeln!(out, "{p3}return 1;");
        let _ = writeln!(out, "{p2}}}");
        let _ = writeln!(out, "{p2}if (pos + length > input_.size()) {{ return 0; }}");
        let _ = writeln!(out, "{p2}for (std::size_t i = 1; i < length; ++i) {{");
        let _ = writeln!(
            out,
            "{p3}unsigned char byte = static_cast<unsigned char>(input_[pos + i]);"
        );
        let _ = writeln!(out, "{p3}if ((byte & 0xC0u) != 0x80u) {{");
        let _ = writeln!(out, "{}out = first;", self.pad(4));
        let _ = writeln!(out, "{}return 1;", self.pad(4));
        let _ = writeln!(out, "{p3}}}");
        let _ = writeln!(out, "{p3}cp = (cp << 6) | (byte & 0x3Fu);");
        let _ = writeln!(out, "{p2}}}");
        let _ = writeln!(out, "{p2}out = cp;");
        let _ = writeln!(out, "{p2}return length;");
        let _ = writeln!(out, "{p1}}}\n");

        let _ = writeln!(out, "{p1}void advance_bytes(std::size_t count) {{");
        let _ = writeln!(
            out,
            "{p2}for (std::size_t i = 0; i < count && pos_ < input_.size(); ++i) {{"
        );
        let _ = writeln!(out, "{p3}if (input_[pos_] == '\\n') {{");
        let _ = writeln!(out, "{}++line_;", self.pad(4));
        let _ = writeln!(out, "{}column_ = 1;", self.pad(4));
        let _ = writeln!(out, "{p3}}} else {{");
        let _ = writeln!(out, "{}++column_;", self.pad(4));
        let _ = writeln!(out, "{p3}}}");
        let _ = writeln!(out, "{p3}++pos_;");
        let _ = writeln!(out, "{p2}}}");
        let _ = writeln!(out, "{p1}}}\n");

        if context_sensitive {
            let _ = writeln!(
                out,
                "{p1}// Extension point for {{check(...)}} actions; accepts by default."
            );
            let _ = writeln!(
                out,
                "{p1}bool check_predicate(const std::string& condition) {{"
            );
            let _ = writeln!(out, "{p2}(void)condition;");
            let _ = writeln!(out, "{p2}return true;");
            let _ = writeln!(out, "{p1}}}\n");
        }
    }

    fn emit_main(&self, parser_filename: &str) -> String {
        let p1 = self.pad(1);
        let p2 = self.pad(2);
        let name = make_identifier(&self.options.parser_name);
        let qualified = if self.options.namespace.is_empty() {
            name.clone()
        } else {
            format!("{}::{}", make_identifier(&self.options.namespace), name)
        };

        let mut out = String::new();
        let _ = writeln!(
            out,
            "// Generated by bnfgen v{}. Entry point for {}.\n",
            env!("CARGO_PKG_VERSION"),
            name
        );
        out.push_str("#include <fstream>\n");
        out.push_str("#include <iostream>\n");
        out.push_str("#include <iterator>\n");
        out.push_str("#include <string>\n\n");
        let _ = writeln!(out, "#include \"{parser_filename}\"\n");
        out.push_str("int main(int argc, char** argv) {\n");
        let _ = writeln!(out, "{p1}if (argc < 2) {{");
        let _ = writeln!(
            out,
            "{p2}std::cerr << \"usage: \" << argv[0] << \" <input-file>\\n\";"
        );
        let _ = writeln!(out, "{p2}return 1;");
        let _ = writeln!(out, "{p1}}}");
        let _ = writeln!(out, "{p1}std::ifstream file(argv[1]);");
        let _ = writeln!(out, "{p1}if (!file) {{");
        let _ = writeln!(
            out,
            "{p2}std::cerr << \"cannot open \" << argv[1] << \"\\n\";"
        );
        let _ = writeln!(out, "{p2}return 1;");
        let _ = writeln!(out, "{p1}}}");
        let _ = writeln!(
            out,
            "{p1}std::string content((std::istreambuf_iterator<char>(file)),"
        );
        let _ = writeln!(
            out,
            "{p1}                    std::istreambuf_iterator<char>());"
        );
        let _ = writeln!(out, "{p1}{qualified} parser(std::move(content));");
        let _ = writeln!(out, "{p1}auto root = parser.parse();");
        let _ = writeln!(out, "{p1}if (root) {{");
        let _ = writeln!(
            out,
            "{p2}std::cout << \"parse succeeded: \" << root->type() << \"\\n\";"
        );
        let _ = writeln!(out, "{p2}return 0;");
        let _ = writeln!(out, "{p1}}}");
        let _ = writeln!(
            out,
            "{p1}std::cerr << \"parse failed: \" << parser.last_error() << \"\\n\";"
        );
        let _ = writeln!(out, "{p1}return 1;");
        out.push_str("}\n");
        out
    }
}
