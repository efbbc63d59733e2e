//! Tests for the template string parser.

use stencil::parser::{Part, TemplateArg, parse_template};
use stencil::{ParseError, validate_argument};

// =============================================================================
// Literals and escapes
// =============================================================================

#[test]
fn parses_literal_only_template() {
    let template = parse_template("hello world").unwrap();
    assert_eq!(template.parts, vec![Part::Literal("hello world".to_string())]);
}

#[test]
fn empty_template_has_no_parts() {
    let template = parse_template("").unwrap();
    assert!(template.parts.is_empty());
}

#[test]
fn dollar_escape_becomes_literal() {
    let template = parse_template("Hello $${name}").unwrap();
    assert_eq!(template.parts, vec![Part::Literal("Hello ${name}".to_string())]);
}

#[test]
fn percent_escape_becomes_literal() {
    let template = parse_template("%%{if x}").unwrap();
    assert_eq!(template.parts, vec![Part::Literal("%{if x}".to_string())]);
}

#[test]
fn adjacent_literals_merge_into_one_part() {
    let template = parse_template("a$${b}c").unwrap();
    assert_eq!(template.parts, vec![Part::Literal("a${b}c".to_string())]);
}

#[test]
fn lone_sigils_are_literal_text() {
    let template = parse_template("100% of $5").unwrap();
    assert_eq!(template.parts, vec![Part::Literal("100% of $5".to_string())]);
}

#[test]
fn double_dollar_without_brace_is_untouched() {
    let template = parse_template("$$name").unwrap();
    assert_eq!(template.parts, vec![Part::Literal("$$name".to_string())]);
}

// =============================================================================
// Interpolations
// =============================================================================

#[test]
fn parses_interpolation_between_literals() {
    let template = parse_template("x${ name }y").unwrap();
    assert_eq!(template.parts.len(), 3);
    assert_eq!(template.parts[0], Part::Literal("x".to_string()));
    assert!(matches!(template.parts[1], Part::Interpolation(_)));
    assert_eq!(template.parts[2], Part::Literal("y".to_string()));
}

#[test]
fn parses_traversal_with_steps() {
    let template = parse_template("${a.b[0]}").unwrap();
    assert_eq!(template.parts.len(), 1);
    assert!(matches!(template.parts[0], Part::Interpolation(_)));
}

#[test]
fn parses_function_call_interpolation() {
    let template = parse_template(r#"${startswith(s, "he")}"#).unwrap();
    assert_eq!(template.parts.len(), 1);
}

#[test]
fn parses_operator_ladder() {
    parse_template("${a || b && c == 1 + 2 * 3}").unwrap();
    parse_template("${!(a < 3)}").unwrap();
    parse_template("${-n}").unwrap();
}

// =============================================================================
// Directives
// =============================================================================

#[test]
fn parses_if_block() {
    let template = parse_template("%{if x}yes%{endif}").unwrap();
    assert_eq!(template.parts.len(), 1);
    let Part::If { then_body, else_body, .. } = &template.parts[0] else {
        panic!("expected an if part, got: {:?}", template.parts[0]);
    };
    assert_eq!(then_body.parts, vec![Part::Literal("yes".to_string())]);
    assert!(else_body.is_none());
}

#[test]
fn parses_if_else_block() {
    let template = parse_template("%{if x}yes%{else}no%{endif}").unwrap();
    let Part::If { else_body, .. } = &template.parts[0] else {
        panic!("expected an if part");
    };
    let else_body = else_body.as_ref().expect("expected an else body");
    assert_eq!(else_body.parts, vec![Part::Literal("no".to_string())]);
}

#[test]
fn parses_for_block_with_one_name() {
    let template = parse_template("%{for s in items}${s}%{endfor}").unwrap();
    let Part::For { key_var, value_var, .. } = &template.parts[0] else {
        panic!("expected a for part");
    };
    assert!(key_var.is_none());
    assert_eq!(value_var, "s");
}

#[test]
fn parses_for_block_with_two_names() {
    let template = parse_template("%{for k, v in m}${k}${v}%{endfor}").unwrap();
    let Part::For { key_var, value_var, .. } = &template.parts[0] else {
        panic!("expected a for part");
    };
    assert_eq!(key_var.as_deref(), Some("k"));
    assert_eq!(value_var, "v");
}

#[test]
fn parses_nested_blocks() {
    let template =
        parse_template("%{for x in xs}%{if x}${x}%{endif}%{endfor}").unwrap();
    let Part::For { body, .. } = &template.parts[0] else {
        panic!("expected a for part");
    };
    assert!(matches!(body.parts[0], Part::If { .. }));
}

// =============================================================================
// Strip markers
// =============================================================================

#[test]
fn strip_markers_trim_adjacent_literals() {
    let template = parse_template("a ${~ x ~} b").unwrap();
    assert_eq!(template.parts.len(), 3);
    assert_eq!(template.parts[0], Part::Literal("a".to_string()));
    assert_eq!(template.parts[2], Part::Literal("b".to_string()));
}

#[test]
fn strip_markers_inside_blocks_trim_the_body() {
    let template = parse_template("  %{~ if x ~}  hi  %{~ endif ~}  ").unwrap();
    assert_eq!(template.parts.len(), 1);
    let Part::If { then_body, .. } = &template.parts[0] else {
        panic!("expected an if part");
    };
    assert_eq!(then_body.parts, vec![Part::Literal("hi".to_string())]);
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn unterminated_interpolation_is_an_error() {
    let err = parse_template("${").unwrap_err();
    assert!(matches!(err, ParseError::Syntax { .. }), "got: {err:?}");
}

#[test]
fn unterminated_block_is_an_error() {
    let err = parse_template("%{if x}no end").unwrap_err();
    let msg = err.to_string();
    assert!(msg.starts_with("syntax error at"), "got: {msg}");
}

#[test]
fn stray_closer_names_the_directive() {
    let err = parse_template("text %{endif}").unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("endif"), "got: {msg}");
    assert!(msg.contains("%{if}"), "got: {msg}");
}

#[test]
fn unknown_directive_is_an_error() {
    let err = parse_template("%{garbage x}").unwrap_err();
    assert!(matches!(err, ParseError::Syntax { .. }));
}

#[test]
fn error_positions_account_for_newlines() {
    let err = parse_template("line one\n${").unwrap_err();
    let ParseError::Syntax { line, .. } = err else {
        panic!("expected a syntax error");
    };
    assert_eq!(line, 2);
}

// =============================================================================
// Reference collection
// =============================================================================

#[test]
fn root_references_skip_loop_locals() {
    let template =
        parse_template("${a} %{for x in items}${x}${b}%{endfor}").unwrap();
    let names: Vec<String> =
        template.root_references().into_iter().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["a", "items", "b"]);
}

#[test]
fn root_references_include_directive_conditions() {
    let template = parse_template("%{if flag}${x}%{endif}").unwrap();
    let names: Vec<String> =
        template.root_references().into_iter().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["flag", "x"]);
}

// =============================================================================
// Argument classification
// =============================================================================

#[test]
fn quoted_literal_classifies_as_template() {
    let arg = TemplateArg::parse(r#""hello""#).unwrap();
    assert!(matches!(arg, TemplateArg::Template(_)));
    assert!(validate_argument(&arg).is_ok());
}

#[test]
fn bare_reference_classifies_as_reference() {
    let arg = TemplateArg::parse("greeting").unwrap();
    assert!(matches!(arg, TemplateArg::Reference(_)));
    assert!(validate_argument(&arg).is_ok());

    let arg = TemplateArg::parse("config.motd").unwrap();
    assert!(matches!(arg, TemplateArg::Reference(_)));
}

#[test]
fn interpolation_only_string_classifies_as_wrap() {
    let arg = TemplateArg::parse(r#""${greeting}""#).unwrap();
    assert!(matches!(arg, TemplateArg::Wrap(_)));
    assert!(validate_argument(&arg).is_err());
}

#[test]
fn mixed_template_string_keeps_its_parts() {
    let arg = TemplateArg::parse(r#""Hello ${name}""#).unwrap();
    let TemplateArg::Template(parts) = arg else {
        panic!("expected a template shape");
    };
    assert_eq!(parts.len(), 2);
}

#[test]
fn other_expression_classifies_as_other() {
    let arg = TemplateArg::parse(r#"startswith("a", "b")"#).unwrap();
    assert!(matches!(arg, TemplateArg::Other(_)));
    assert!(validate_argument(&arg).is_err());
}

#[test]
fn concatenation_of_strings_is_not_a_literal() {
    let arg = TemplateArg::parse(r#""a" + "b""#).unwrap();
    assert!(matches!(arg, TemplateArg::Other(_)), "got: {arg:?}");
}

#[test]
fn unterminated_argument_string_is_an_error() {
    assert!(TemplateArg::parse(r#""oops"#).is_err());
}

#[test]
fn bad_escape_in_argument_string_is_an_error() {
    assert!(TemplateArg::parse(r#""a\qb""#).is_err());
}
