//! Error types for template rendering and evaluation.

use thiserror::Error;

use crate::parser::ParseError;
use crate::types::Kind;

/// An error that occurred while evaluating an expression inside a
/// template body.
#[derive(Debug, Error)]
pub enum EvalError {
    /// Call to a function that is not in the environment.
    #[error("call to unknown function \"{name}\"{}", did_you_mean(suggestions))]
    UndefinedFunction { name: String, suggestions: Vec<String> },

    /// Wrong number of arguments in a function call.
    #[error("function \"{function}\" expects {expected} argument(s), got {got}")]
    ArityMismatch { function: String, expected: usize, got: usize },

    /// An argument with an unacceptable type.
    #[error("invalid value for \"{param}\" argument to \"{function}\": {expected} required, got {got}")]
    ArgumentType { function: String, param: String, expected: Kind, got: Kind },

    /// Reference to a name that is not in scope.
    #[error("reference to undefined name \"{name}\"{}", did_you_mean(suggestions))]
    UnboundName { name: String, suggestions: Vec<String> },

    /// Attribute or key lookup that found nothing.
    #[error("this value has no attribute named {name:?}")]
    NoSuchAttribute { name: String },

    /// List index outside the list.
    #[error("index {index} out of bounds for list of length {len}")]
    IndexOutOfBounds { index: i64, len: usize },

    /// An operation applied to values of the wrong type.
    #[error("{message}")]
    TypeMismatch { message: String },

    /// A template function called back into itself.
    #[error("cannot recursively call {name} from inside another template function")]
    RecursiveCall { name: String },

    /// The template function invoked with an already-evaluated argument.
    #[error("function \"{name}\" must be given its template argument in unevaluated form")]
    DirectTemplateCall { name: String },

    /// An invalid pattern in the regex mode of `replace`.
    #[error("invalid regex pattern in replace: {message}")]
    BadRegex { message: String },
}

/// An error returned by the template render function.
///
/// Every variant concerns one specific call argument; see
/// [`RenderError::argument`].
#[derive(Debug, Error)]
pub enum RenderError {
    /// The template argument contains live template syntax.
    #[error(
        "invalid template expression: use $${{ and %%{{ to escape template sequences so that \
         they can be parsed by the template function, rather than by the host parser"
    )]
    TemplateInTemplate,

    /// The template argument is an interpolation-only string, the shape
    /// an earlier language generation required.
    #[error(
        "invalid template expression: either use $${{ to escape this template sequence for \
         processing by the template function, or write the inner expression alone to use its \
         value as the template to render"
    )]
    LegacyWrap,

    /// The template argument is some other unsupported expression shape.
    #[error(
        "invalid template expression: must be either a literal string or a simple reference \
         to a single string from elsewhere"
    )]
    BadArgumentShape,

    /// The template argument is an acceptable shape but failed to
    /// resolve to a value.
    #[error("invalid template expression: {0}")]
    ArgumentResolve(#[source] EvalError),

    /// The template argument resolved to something other than a string.
    #[error("invalid template expression: a string is required, not {got}")]
    TemplateType { got: Kind },

    /// The vars argument is not a map or object.
    #[error("invalid vars value: must be a map")]
    VarsType { got: Kind },

    /// A vars key that is not usable as a template variable name.
    #[error(
        "invalid template variable name {name:?}: must start with a letter, followed by zero \
         or more letters, digits, and underscores"
    )]
    VarName { name: String },

    /// The template references a name the vars map does not contain.
    #[error("vars map does not contain key {name:?}, referenced at {line}:{column}{}", did_you_mean(suggestions))]
    UnboundVariable { name: String, line: usize, column: usize, suggestions: Vec<String> },

    /// The template body is not valid template syntax.
    #[error("invalid template: {0}")]
    Parse(#[from] ParseError),

    /// The template body called back into the template function.
    #[error("cannot recursively call {function} from inside another template function")]
    Recursion { function: String },

    /// The template body failed to evaluate.
    #[error("failed to render template: {0}")]
    Evaluation(#[source] EvalError),
}

impl RenderError {
    /// The index of the call argument this error concerns:
    /// 0 is the template argument, 1 is the vars argument.
    pub fn argument(&self) -> usize {
        match self {
            RenderError::TemplateInTemplate
            | RenderError::LegacyWrap
            | RenderError::BadArgumentShape
            | RenderError::ArgumentResolve(_)
            | RenderError::TemplateType { .. }
            | RenderError::Parse(_)
            | RenderError::Recursion { .. }
            | RenderError::Evaluation(_) => 0,
            RenderError::VarsType { .. }
            | RenderError::VarName { .. }
            | RenderError::UnboundVariable { .. } => 1,
        }
    }
}

/// Compute "did you mean" suggestions for a near-miss name.
///
/// Returns up to 3 candidates within a small edit distance of `key`,
/// closest first. Shorter keys get a tighter distance cap so that
/// unrelated short names are not suggested.
pub fn compute_suggestions(key: &str, available: &[String]) -> Vec<String> {
    let max_distance = if key.chars().count() <= 3 { 1 } else { 2 };
    let mut scored: Vec<(usize, String)> = available
        .iter()
        .filter_map(|candidate| {
            let distance = strsim::levenshtein(key, candidate);
            (distance > 0 && distance <= max_distance).then(|| (distance, candidate.clone()))
        })
        .collect();
    scored.sort();
    scored.truncate(3);
    scored.into_iter().map(|(_, name)| name).collect()
}

fn did_you_mean(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(", did you mean: {}?", suggestions.join(", "))
    }
}
