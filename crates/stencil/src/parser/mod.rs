//! Template and expression parser.
//!
//! Templates mix literal text with `${...}` interpolations and `%{...}`
//! directives. The parser produces an AST with byte spans so later
//! passes can report source locations without re-parsing.

pub mod ast;
pub mod error;
mod argument;
mod expr;
mod template;

pub use argument::TemplateArg;
pub use ast::{BinaryOp, Expr, Part, Span, Step, Template, Traversal, UnaryOp};
pub use error::ParseError;
pub use template::parse_template;

pub(crate) use expr::parse_expr;

/// Parser input carrying byte-offset information for spans.
pub(crate) type Input<'i> = winnow::stream::LocatingSlice<&'i str>;
