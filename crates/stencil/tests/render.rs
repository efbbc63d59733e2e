//! End-to-end tests for the constrained template render function.

use stencil::{
    EvalError, Kind, Marked, RenderError, Renderer, Scope, TemplateClosure, Value,
    default_functions, vars,
};

fn renderer() -> Renderer {
    Renderer::new(default_functions)
}

/// Render a template string value through a bare-reference argument.
fn render_str(template: &str, vars: Marked) -> Result<Marked, RenderError> {
    render_marked(Marked::new(template), vars)
}

fn render_marked(template: Marked, vars: Marked) -> Result<Marked, RenderError> {
    let mut scope = Scope::new();
    scope.insert("tmpl", template);
    let closure = TemplateClosure::parse("tmpl", scope).unwrap();
    renderer().render(&closure, &vars)
}

// =============================================================================
// Basic rendering
// =============================================================================

#[test]
fn renders_interpolation_from_vars() {
    let result = render_str("Hello ${name}", vars! { "name" => "Alex" }).unwrap();
    assert_eq!(result.value.as_str(), Some("Hello Alex"));
}

#[test]
fn escaped_sequence_renders_literally() {
    // No substitution and no unbound-variable error despite empty vars.
    let result = render_str("Hello $${name}", vars! {}).unwrap();
    assert_eq!(result.value.as_str(), Some("Hello ${name}"));
}

#[test]
fn renders_number_and_bool_interpolations() {
    let result =
        render_str("n=${n} b=${b}", vars! { "n" => 3, "b" => true }).unwrap();
    assert_eq!(result.value.as_str(), Some("n=3 b=true"));
}

#[test]
fn renders_literal_argument_directly() {
    let closure = TemplateClosure::parse(r#""just text""#, Scope::new()).unwrap();
    let result = renderer().render(&closure, &vars! {}).unwrap();
    assert_eq!(result.value.as_str(), Some("just text"));
}

#[test]
fn escaped_literal_argument_becomes_live_template() {
    // The argument-level escape produces one literal part, whose text
    // then parses as a real interpolation inside the renderer.
    let closure = TemplateClosure::parse(r#""Hello $${name}""#, Scope::new()).unwrap();
    let result = renderer().render(&closure, &vars! { "name" => "Alex" }).unwrap();
    assert_eq!(result.value.as_str(), Some("Hello Alex"));
}

#[test]
fn renders_functions_inside_template() {
    let result =
        render_str(r#"${replace(s, "o", "0")}"#, vars! { "s" => "foo" }).unwrap();
    assert_eq!(result.value.as_str(), Some("f00"));
}

// =============================================================================
// Argument shape validation
// =============================================================================

#[test]
fn template_with_live_interpolation_is_rejected() {
    let closure = TemplateClosure::parse(r#""Hello ${name}""#, Scope::new()).unwrap();
    let err = renderer().render(&closure, &vars! { "name" => "x" }).unwrap_err();
    assert!(matches!(err, RenderError::TemplateInTemplate), "got: {err:?}");
    assert!(err.to_string().contains("$${"));
    assert_eq!(err.argument(), 0);
}

#[test]
fn interpolation_only_argument_gets_the_legacy_diagnostic() {
    let closure = TemplateClosure::parse(r#""${greeting}""#, Scope::new()).unwrap();
    let err = renderer().render(&closure, &vars! {}).unwrap_err();
    assert!(matches!(err, RenderError::LegacyWrap), "got: {err:?}");
    assert!(err.to_string().contains("write the inner expression alone"));
}

#[test]
fn arbitrary_expression_argument_is_rejected() {
    let closure =
        TemplateClosure::parse(r#"startswith("a", "b")"#, Scope::new()).unwrap();
    let err = renderer().render(&closure, &vars! {}).unwrap_err();
    assert!(matches!(err, RenderError::BadArgumentShape), "got: {err:?}");
    assert!(err.to_string().contains("simple reference"));
}

#[test]
fn unresolvable_reference_argument_is_reported() {
    let closure = TemplateClosure::parse("nope", Scope::new()).unwrap();
    let err = renderer().render(&closure, &vars! {}).unwrap_err();
    assert!(matches!(err, RenderError::ArgumentResolve(_)), "got: {err:?}");
    assert!(err.to_string().contains("invalid template expression"));
}

// =============================================================================
// Vars validation
// =============================================================================

#[test]
fn non_map_vars_fail_with_a_type_error() {
    let err = render_str("anything", Marked::new("not a map")).unwrap_err();
    assert!(matches!(err, RenderError::VarsType { .. }), "got: {err:?}");
    assert!(err.to_string().contains("must be a map"));
    assert_eq!(err.argument(), 1);
}

#[test]
fn object_vars_are_accepted() {
    let mut entries = std::collections::BTreeMap::new();
    entries.insert("name".to_string(), Marked::new("Alex"));
    let vars = Marked::new(Value::Object(entries));
    let result = render_str("Hello ${name}", vars).unwrap();
    assert_eq!(result.value.as_str(), Some("Hello Alex"));
}

#[test]
fn invalid_variable_name_is_rejected_before_parsing() {
    // The template body is malformed too; the vars map is reported first.
    let err = render_str("${", vars! { "1bad" => "x" }).unwrap_err();
    assert!(matches!(err, RenderError::VarName { .. }), "got: {err:?}");
    assert!(err.to_string().contains("1bad"));
    assert_eq!(err.argument(), 1);
}

#[test]
fn unbound_reference_names_the_variable_and_location() {
    let err = render_str("${missing}", vars! { "other" => "x" }).unwrap_err();
    let RenderError::UnboundVariable { ref name, line, column, .. } = err else {
        panic!("expected UnboundVariable, got: {err:?}");
    };
    assert_eq!(name, "missing");
    assert_eq!((line, column), (1, 3));
    assert_eq!(err.argument(), 1);
}

#[test]
fn unbound_reference_suggests_near_misses() {
    let err =
        render_str("${nmae}", vars! { "name" => "Alex", "age" => 3 }).unwrap_err();
    assert!(err.to_string().contains("did you mean: name?"), "got: {err}");
}

#[test]
fn loop_locals_do_not_need_vars_entries() {
    let items = Value::List(vec![Marked::new("a"), Marked::new("b")]);
    let result = render_str(
        "%{for s in items}${s},%{endfor}",
        vars! { "items" => Marked::new(items) },
    )
    .unwrap();
    assert_eq!(result.value.as_str(), Some("a,b,"));
}

// =============================================================================
// Recursion guard
// =============================================================================

#[test]
fn direct_self_call_is_refused() {
    let err = render_str("${template(t, v)}", vars! { "t" => "x", "v" => "y" })
        .unwrap_err();
    assert!(matches!(err, RenderError::Recursion { .. }), "got: {err:?}");
    assert!(
        err.to_string()
            .contains("cannot recursively call template from inside another template function")
    );
    assert_eq!(err.argument(), 0);
}

#[test]
fn file_sibling_is_stubbed_too() {
    let err = render_str("${templatefile(t, v)}", vars! { "t" => "x", "v" => "y" })
        .unwrap_err();
    let RenderError::Recursion { ref function } = err else {
        panic!("expected Recursion, got: {err:?}");
    };
    assert_eq!(function, "templatefile");
}

#[test]
fn stub_checks_arity_before_failing() {
    let err = render_str("${template(t)}", vars! { "t" => "x" }).unwrap_err();
    assert!(
        matches!(err, RenderError::Evaluation(EvalError::ArityMismatch { .. })),
        "got: {err:?}"
    );
}

#[test]
fn other_functions_still_work_under_the_restriction() {
    let result =
        render_str(r#"${startswith(s, "he")}"#, vars! { "s" => "hello" }).unwrap();
    assert_eq!(result.value.as_str(), Some("true"));
}

// =============================================================================
// Unknown values
// =============================================================================

#[test]
fn unknown_template_argument_defers() {
    // Vars are deliberately invalid: an unknown template short-circuits
    // before any binder or parser validation.
    let result =
        render_marked(Marked::new(Value::unknown(Kind::String)), Marked::new(5)).unwrap();
    let Value::Unknown(ref unknown) = result.value else {
        panic!("expected an unknown result, got: {:?}", result.value);
    };
    assert_eq!(unknown.kind, Kind::String);
}

#[test]
fn unknown_vars_defer() {
    let result = render_str("static", Marked::new(Value::unknown(Kind::Map))).unwrap();
    assert!(result.is_unknown());
}

#[test]
fn unknown_variable_makes_the_result_unknown() {
    let result = render_str(
        "Hello ${name}",
        vars! { "name" => Marked::new(Value::unknown(Kind::String)) },
    )
    .unwrap();
    let Value::Unknown(ref unknown) = result.value else {
        panic!("expected an unknown result, got: {:?}", result.value);
    };
    assert_eq!(unknown.kind, Kind::String);
    // The literal text before the unknown fragment is a known prefix.
    assert_eq!(unknown.string_prefix.as_deref(), Some("Hello "));
}

// =============================================================================
// Template type checks
// =============================================================================

#[test]
fn non_string_template_is_rejected() {
    let err = render_marked(Marked::new(5), vars! {}).unwrap_err();
    assert!(matches!(err, RenderError::TemplateType { got: Kind::Number }), "got: {err:?}");
    assert!(err.to_string().contains("a string is required"));
    assert_eq!(err.argument(), 0);
}

#[test]
fn null_template_is_rejected() {
    let err = render_marked(Marked::new(Value::Null), vars! {}).unwrap_err();
    assert!(matches!(err, RenderError::TemplateType { got: Kind::Null }), "got: {err:?}");
}

#[test]
fn malformed_template_body_is_a_parse_error() {
    let err = render_str("%{if x}", vars! { "x" => true }).unwrap_err();
    assert!(matches!(err, RenderError::Parse(_)), "got: {err:?}");
    assert!(err.to_string().starts_with("invalid template:"));
}

// =============================================================================
// Mark propagation
// =============================================================================

#[test]
fn template_marks_survive_rendering() {
    let template = Marked::new("Hello ${name}").mark("sensitive");
    let result = render_marked(template, vars! { "name" => "Alex" }).unwrap();
    assert_eq!(result.value.as_str(), Some("Hello Alex"));
    assert!(result.has_mark("sensitive"));
}

#[test]
fn marks_on_individual_vars_survive_rendering() {
    let vars = vars! { "name" => Marked::new("Alex").mark("pii") };
    let result = render_str("Hello ${name}", vars).unwrap();
    assert!(result.has_mark("pii"));
}

#[test]
fn marks_on_the_whole_vars_map_survive_rendering() {
    let vars = vars! { "name" => "Alex" }.mark("sensitive");
    let result = render_str("Hello ${name}", vars).unwrap();
    assert!(result.has_mark("sensitive"));
}

#[test]
fn marks_survive_function_application() {
    let vars = vars! { "s" => Marked::new("hello").mark("sensitive") };
    let result = render_str(r#"${replace(s, "l", "L")}"#, vars).unwrap();
    assert_eq!(result.value.as_str(), Some("heLLo"));
    assert!(result.has_mark("sensitive"));
}

#[test]
fn marks_survive_an_unknown_result() {
    let template = Marked::new("Hello ${name}").mark("sensitive");
    let result = render_marked(
        template,
        vars! { "name" => Marked::new(Value::unknown(Kind::String)) },
    )
    .unwrap();
    assert!(result.is_unknown());
    assert!(result.has_mark("sensitive"));
}

// =============================================================================
// Evaluation failures
// =============================================================================

#[test]
fn evaluation_errors_surface_the_nested_diagnostic() {
    let err = render_str("${unknown_fn()}", vars! {}).unwrap_err();
    let RenderError::Evaluation(ref inner) = err else {
        panic!("expected Evaluation, got: {err:?}");
    };
    assert!(matches!(inner, EvalError::UndefinedFunction { .. }));
    let msg = err.to_string();
    assert!(msg.starts_with("failed to render template:"), "got: {msg}");
    assert!(msg.contains("unknown_fn"), "got: {msg}");
}

#[test]
fn undefined_function_suggests_near_misses() {
    let err = render_str(r#"${startwith(s, "h")}"#, vars! { "s" => "x" }).unwrap_err();
    assert!(err.to_string().contains("did you mean: startswith?"), "got: {err}");
}
