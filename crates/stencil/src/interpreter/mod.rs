//! Template rendering engine.
//!
//! This module provides the render pipeline that takes a validated
//! template argument and a vars value and produces a string result,
//! plus the function environment templates evaluate against.

mod error;
mod evaluator;
mod functions;
mod render;
mod scope;

pub use error::{EvalError, RenderError, compute_suggestions};
pub use functions::{Function, FunctionImpl, FunctionRegistry, Param, default_functions};
pub use render::{Renderer, TemplateClosure, validate_argument};
pub use scope::{Scope, is_identifier};
