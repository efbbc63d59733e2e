//! The constrained template render function.
//!
//! Rendering happens in a fixed order: validate the argument's shape,
//! resolve it to a value, defer if that value is unknown, require
//! exactly a string, bind and check the vars map, parse the template,
//! check its references, build the restricted function environment, and
//! only then evaluate. Marks stripped from the template string are
//! reattached to the result.

use crate::interpreter::error::{EvalError, RenderError};
use crate::interpreter::evaluator::{EvalContext, eval_template, eval_traversal};
use crate::interpreter::functions::FunctionRegistry;
use crate::interpreter::scope::Scope;
use crate::parser::{Part, TemplateArg, parse_template};
use crate::types::{Kind, Marked, Value};

/// An unevaluated template argument together with the scope its own
/// references resolve in.
///
/// The scope here is the *caller's* scope (where `greeting` in
/// `template(greeting, {...})` lives), not the vars the template body
/// will see.
#[derive(Debug, Clone)]
pub struct TemplateClosure {
    pub arg: TemplateArg,
    pub scope: Scope,
}

impl TemplateClosure {
    pub fn new(arg: TemplateArg, scope: Scope) -> Self {
        Self { arg, scope }
    }

    /// Parse argument source text and capture a scope in one step.
    pub fn parse(source: &str, scope: Scope) -> Result<Self, RenderError> {
        Ok(Self { arg: TemplateArg::parse(source)?, scope })
    }
}

/// Check the shape of a template argument before any evaluation.
///
/// Only two shapes are accepted: a bare reference to a named value, and
/// a quoted string with no unescaped template sequences. A template
/// built dynamically out of template syntax is refused; indirection
/// through a named value is the escape hatch for legitimate dynamic
/// composition.
pub fn validate_argument(arg: &TemplateArg) -> Result<(), RenderError> {
    match arg {
        TemplateArg::Reference(_) => Ok(()),
        TemplateArg::Template(parts) if is_single_literal(parts) => Ok(()),
        TemplateArg::Template(_) => Err(RenderError::TemplateInTemplate),
        TemplateArg::Wrap(_) => Err(RenderError::LegacyWrap),
        TemplateArg::Other(_) => Err(RenderError::BadArgumentShape),
    }
}

fn is_single_literal(parts: &[Part]) -> bool {
    match parts {
        [] => true,
        [Part::Literal(_)] => true,
        _ => false,
    }
}

/// Renders templates against a function environment obtained lazily
/// from a provider.
///
/// The provider indirection exists because the full function environment
/// usually wants to include the template function itself, which would
/// otherwise be a definition cycle. The provider is invoked once per
/// render call; nothing is cached between calls.
pub struct Renderer {
    provider: Box<dyn Fn() -> FunctionRegistry + Send + Sync>,
}

impl Renderer {
    /// Create a renderer around a function-environment provider.
    pub fn new(provider: impl Fn() -> FunctionRegistry + Send + Sync + 'static) -> Self {
        Self { provider: Box::new(provider) }
    }

    /// Render a template argument against a vars value.
    pub fn render(&self, template: &TemplateClosure, vars: &Marked) -> Result<Marked, RenderError> {
        validate_argument(&template.arg)?;
        let resolved = resolve_argument(template)?;
        self.render_value(&resolved, vars)
    }

    /// Render an already-resolved template value against a vars value.
    ///
    /// This is the pipeline behind [`Renderer::render`] minus the
    /// argument-shape validation, for callers that obtain the template
    /// text some other validated way (e.g. a file-based sibling).
    pub fn render_value(&self, template: &Marked, vars: &Marked) -> Result<Marked, RenderError> {
        if template.is_unknown() {
            // Correctness cannot be judged yet; defer instead of
            // validating a value we do not have.
            return Ok(Marked::new(Value::unknown(Kind::String)));
        }
        let (value, template_marks) = template.clone().unmark();
        let Value::String(text) = value else {
            return Err(RenderError::TemplateType { got: value.kind() });
        };
        if vars.is_unknown() {
            return Ok(Marked::new(Value::unknown(Kind::String)));
        }
        let scope = Scope::bind(vars)?;
        let parsed = parse_template(&text)?;
        scope.check_references(&parsed, &text)?;
        let restricted = (self.provider)().restricted();
        let ctx = EvalContext::new(scope, &restricted);
        let rendered = eval_template(&parsed, &ctx).map_err(|err| match err {
            EvalError::RecursiveCall { name } => RenderError::Recursion { function: name },
            other => RenderError::Evaluation(other),
        })?;
        Ok(rendered.remark(template_marks))
    }
}

/// Resolve a shape-validated argument to its value.
fn resolve_argument(closure: &TemplateClosure) -> Result<Marked, RenderError> {
    match &closure.arg {
        TemplateArg::Reference(traversal) => {
            // References resolve against the closure scope alone; no
            // function environment is in play at this point.
            let funcs = FunctionRegistry::new();
            let ctx = EvalContext::new(closure.scope.clone(), &funcs);
            eval_traversal(traversal, &ctx).map_err(RenderError::ArgumentResolve)
        }
        TemplateArg::Template(parts) => match parts.as_slice() {
            [] => Ok(Marked::new("")),
            [Part::Literal(text)] => Ok(Marked::new(text.as_str())),
            _ => Err(RenderError::TemplateInTemplate),
        },
        TemplateArg::Wrap(_) => Err(RenderError::LegacyWrap),
        TemplateArg::Other(_) => Err(RenderError::BadArgumentShape),
    }
}
