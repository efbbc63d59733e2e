//! Function declarations, the function registry, and the builtin
//! function set available to templates.
//!
//! The registry a template body evaluates against is never the full
//! environment: it is a per-call copy with the template functions
//! themselves replaced by stubs, so a template cannot directly call back
//! into its own renderer.

use std::collections::BTreeMap;
use std::sync::Arc;

use bon::Builder;

use crate::interpreter::error::EvalError;
use crate::types::{Kind, Marked, Marks, Value};

/// The implementation of a function, called with already-checked
/// arguments.
pub type FunctionImpl = Arc<dyn Fn(&[Marked]) -> Result<Marked, EvalError> + Send + Sync>;

/// A declared function parameter.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: &'static str,
    /// Required argument kind, or `None` to accept any kind.
    pub kind: Option<Kind>,
}

impl Param {
    /// A parameter requiring a specific kind.
    pub const fn new(name: &'static str, kind: Kind) -> Self {
        Self { name, kind: Some(kind) }
    }

    /// A parameter accepting any kind.
    pub const fn dynamic(name: &'static str) -> Self {
        Self { name, kind: None }
    }
}

/// A callable function: a parameter list, a return kind, and an
/// implementation.
#[derive(Clone, Builder)]
pub struct Function {
    /// Declared positional parameters, checked before the
    /// implementation runs.
    #[builder(default)]
    pub params: Vec<Param>,

    /// The kind of value the function returns; unknown results are
    /// refined to this kind.
    pub returns: Kind,

    /// When false, any unknown argument short-circuits the call to an
    /// unknown result of the return kind without running the
    /// implementation.
    #[builder(default)]
    pub handles_unknown: bool,

    /// The implementation.
    pub func: FunctionImpl,
}

impl Function {
    /// Call this function: check arity and argument kinds, short-circuit
    /// unknown arguments unless the function opts in, then run the
    /// implementation.
    pub fn call(&self, name: &str, args: &[Marked]) -> Result<Marked, EvalError> {
        if args.len() != self.params.len() {
            return Err(EvalError::ArityMismatch {
                function: name.to_string(),
                expected: self.params.len(),
                got: args.len(),
            });
        }
        for (param, arg) in self.params.iter().zip(args) {
            if arg.is_unknown() {
                continue;
            }
            if let Some(kind) = param.kind
                && arg.kind() != kind
            {
                return Err(EvalError::ArgumentType {
                    function: name.to_string(),
                    param: param.name.to_string(),
                    expected: kind,
                    got: arg.kind(),
                });
            }
        }
        if !self.handles_unknown && args.iter().any(Marked::is_unknown) {
            return Ok(Marked::with_marks(Value::unknown(self.returns), merged_marks(args)));
        }
        (self.func)(args)
    }
}

/// A mapping from function names to functions.
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    funcs: BTreeMap<String, Function>,
}

/// The functions a rendered template must never call back into.
const TEMPLATE_FUNCS: [&str; 2] = ["template", "templatefile"];

impl FunctionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function under a name.
    pub fn insert(&mut self, name: impl Into<String>, function: Function) {
        self.funcs.insert(name.into(), function);
    }

    /// Get a function by name.
    pub fn get(&self, name: &str) -> Option<&Function> {
        self.funcs.get(name)
    }

    /// Whether a name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.funcs.contains_key(name)
    }

    /// All registered names, in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.funcs.keys().cloned().collect()
    }

    /// Build the restricted environment a template body evaluates
    /// against: every entry is copied, except that the template
    /// functions are replaced by stubs which keep the original
    /// parameter list but always fail when invoked.
    pub fn restricted(&self) -> FunctionRegistry {
        let mut funcs = BTreeMap::new();
        for (name, function) in &self.funcs {
            let entry = if TEMPLATE_FUNCS.contains(&name.as_str()) {
                recursion_stub(name, function)
            } else {
                function.clone()
            };
            funcs.insert(name.clone(), entry);
        }
        FunctionRegistry { funcs }
    }
}

/// A stub preserving `original`'s signature whose invocation always
/// fails with a recursive-call error.
fn recursion_stub(name: &str, original: &Function) -> Function {
    let name = name.to_string();
    Function::builder()
        .params(original.params.clone())
        .returns(original.returns)
        .handles_unknown(true)
        .func(Arc::new(move |_args: &[Marked]| {
            Err(EvalError::RecursiveCall { name: name.clone() })
        }))
        .build()
}

/// The default function environment: the string predicates plus the
/// template function entries themselves.
pub fn default_functions() -> FunctionRegistry {
    let mut funcs = FunctionRegistry::new();
    funcs.insert("startswith", startswith_fn());
    funcs.insert("endswith", endswith_fn());
    funcs.insert("strcontains", strcontains_fn());
    funcs.insert("replace", replace_fn());
    funcs.insert("template", template_fn());
    funcs.insert("templatefile", templatefile_fn());
    funcs
}

fn merged_marks(args: &[Marked]) -> Marks {
    let mut marks = Marks::new();
    for arg in args {
        marks.extend(arg.marks.iter().cloned());
    }
    marks
}

fn string_arg<'a>(args: &'a [Marked], index: usize, function: &str) -> Result<&'a str, EvalError> {
    args[index].value.as_str().ok_or_else(|| EvalError::ArgumentType {
        function: function.to_string(),
        param: "str".to_string(),
        expected: Kind::String,
        got: args[index].kind(),
    })
}

/// `startswith(str, prefix)`, deciding early from a known string prefix
/// of a partially-known first argument where possible.
fn startswith_fn() -> Function {
    Function::builder()
        .params(vec![Param::new("str", Kind::String), Param::new("prefix", Kind::String)])
        .returns(Kind::Bool)
        .handles_unknown(true)
        .func(Arc::new(|args: &[Marked]| {
            let marks = merged_marks(args);
            let Some(prefix) = args[1].value.as_str() else {
                return Ok(Marked::with_marks(Value::unknown(Kind::Bool), marks));
            };
            match &args[0].value {
                Value::String(s) => Ok(Marked::with_marks(s.starts_with(prefix), marks)),
                Value::Unknown(unknown) => {
                    if prefix.is_empty() {
                        // The empty string is a prefix of any string.
                        return Ok(Marked::with_marks(true, marks));
                    }
                    if let Some(known) = &unknown.string_prefix {
                        if known.starts_with(prefix) {
                            return Ok(Marked::with_marks(true, marks));
                        }
                        if known.len() >= prefix.len() {
                            // The tested prefix fits inside the known
                            // prefix and did not match, so no completion
                            // of the value can match either.
                            return Ok(Marked::with_marks(false, marks));
                        }
                    }
                    Ok(Marked::with_marks(Value::unknown(Kind::Bool), marks))
                }
                other => Err(EvalError::ArgumentType {
                    function: "startswith".to_string(),
                    param: "str".to_string(),
                    expected: Kind::String,
                    got: other.kind(),
                }),
            }
        }))
        .build()
}

fn endswith_fn() -> Function {
    Function::builder()
        .params(vec![Param::new("str", Kind::String), Param::new("suffix", Kind::String)])
        .returns(Kind::Bool)
        .func(Arc::new(|args: &[Marked]| {
            let s = string_arg(args, 0, "endswith")?;
            let suffix = string_arg(args, 1, "endswith")?;
            Ok(Marked::with_marks(s.ends_with(suffix), merged_marks(args)))
        }))
        .build()
}

fn strcontains_fn() -> Function {
    Function::builder()
        .params(vec![Param::new("str", Kind::String), Param::new("substr", Kind::String)])
        .returns(Kind::Bool)
        .func(Arc::new(|args: &[Marked]| {
            let s = string_arg(args, 0, "strcontains")?;
            let substr = string_arg(args, 1, "strcontains")?;
            Ok(Marked::with_marks(s.contains(substr), merged_marks(args)))
        }))
        .build()
}

/// `replace(str, substr, replacement)`. A substr surrounded by forward
/// slashes switches to regex search and replace.
fn replace_fn() -> Function {
    Function::builder()
        .params(vec![
            Param::new("str", Kind::String),
            Param::new("substr", Kind::String),
            Param::new("replace", Kind::String),
        ])
        .returns(Kind::String)
        .func(Arc::new(|args: &[Marked]| {
            let s = string_arg(args, 0, "replace")?;
            let substr = string_arg(args, 1, "replace")?;
            let replacement = string_arg(args, 2, "replace")?;
            let marks = merged_marks(args);
            if substr.len() > 1 && substr.starts_with('/') && substr.ends_with('/') {
                let pattern = &substr[1..substr.len() - 1];
                let re = regex::Regex::new(pattern)
                    .map_err(|e| EvalError::BadRegex { message: e.to_string() })?;
                return Ok(Marked::with_marks(
                    re.replace_all(s, replacement).into_owned(),
                    marks,
                ));
            }
            Ok(Marked::with_marks(s.replace(substr, replacement), marks))
        }))
        .build()
}

/// The registry entry for the template render function itself. The real
/// entry point takes its template argument unevaluated; this value-level
/// signature exists so the restricted environment has something to stub.
fn template_fn() -> Function {
    Function::builder()
        .params(vec![Param::new("template", Kind::String), Param::dynamic("vars")])
        .returns(Kind::String)
        .func(Arc::new(|_args: &[Marked]| {
            Err(EvalError::DirectTemplateCall { name: "template".to_string() })
        }))
        .build()
}

/// The registry entry for the render-a-file sibling, present for the
/// same reason as [`template_fn`]. This crate performs no file access.
fn templatefile_fn() -> Function {
    Function::builder()
        .params(vec![Param::new("path", Kind::String), Param::dynamic("vars")])
        .returns(Kind::String)
        .func(Arc::new(|_args: &[Marked]| {
            Err(EvalError::DirectTemplateCall { name: "templatefile".to_string() })
        }))
        .build()
}
