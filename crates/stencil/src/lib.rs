pub mod interpreter;
pub mod parser;
pub mod types;

pub use interpreter::{
    EvalError, Function, FunctionRegistry, Param, RenderError, Renderer, Scope, TemplateClosure,
    compute_suggestions, default_functions, validate_argument,
};
pub use parser::{ParseError, TemplateArg, parse_template};
pub use types::{Kind, Mark, Marked, Marks, Unknown, Value};

/// Creates a map-kind [`Marked`] value from key-value pairs, for use as
/// the vars argument of a render call.
///
/// Values are converted via `Into<Marked>`, so strings, numbers, bools,
/// and already-wrapped values can be mixed freely.
///
/// # Example
///
/// ```
/// use stencil::vars;
///
/// let vars = vars! { "name" => "Alex", "count" => 3 };
/// assert_eq!(vars.value.as_entries().map(|e| e.len()), Some(2));
/// ```
#[macro_export]
macro_rules! vars {
    {} => {
        $crate::Marked::new($crate::Value::Map(::std::collections::BTreeMap::new()))
    };
    { $($key:expr => $value:expr),+ $(,)? } => {
        {
            let mut map = ::std::collections::BTreeMap::<
                ::std::string::String,
                $crate::Marked,
            >::new();
            $(
                map.insert($key.to_string(), ::std::convert::Into::<$crate::Marked>::into($value));
            )+
            $crate::Marked::new($crate::Value::Map(map))
        }
    };
}
