//! AST types for templates and the expressions embedded in them.
//!
//! These types are public so external tooling (linters, highlighters) can
//! work with parsed templates directly.

use crate::types::Value;

/// A half-open byte range into the source the node was parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl From<std::ops::Range<usize>> for Span {
    fn from(r: std::ops::Range<usize>) -> Self {
        Span { start: r.start, end: r.end }
    }
}

/// A parsed template: a sequence of literal and dynamic parts.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub parts: Vec<Part>,
}

/// One part of a template.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    /// Literal text, with escape sequences already decoded.
    Literal(String),

    /// A `${...}` interpolation.
    Interpolation(Expr),

    /// A `%{if ...} ... %{else} ... %{endif}` conditional.
    If {
        cond: Expr,
        then_body: Template,
        else_body: Option<Template>,
    },

    /// A `%{for ...} ... %{endfor}` repetition.
    ///
    /// With one loop name only `value_var` is set: it binds list elements,
    /// or keys when iterating a map or object. With two names, `key_var`
    /// binds the index or key and `value_var` the element or entry value.
    For {
        key_var: Option<String>,
        value_var: String,
        collection: Expr,
        body: Template,
    },
}

/// An expression inside an interpolation or directive.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal string, number, bool, or null.
    Literal(Value),

    /// A variable reference with optional attribute/index steps.
    Traversal(Traversal),

    /// A call to a named function.
    Call {
        name: String,
        name_span: Span,
        args: Vec<Expr>,
    },

    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },

    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

/// A variable reference: a root identifier plus traversal steps.
#[derive(Debug, Clone, PartialEq)]
pub struct Traversal {
    pub root: String,
    /// Span of the root identifier, for unbound-reference reporting.
    pub root_span: Span,
    pub steps: Vec<Step>,
}

/// One traversal step.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// `.name` attribute access on a map or object.
    Attr(String),

    /// `[expr]` index access on a list, map, or object.
    Index(Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl Template {
    /// Collect the root identifiers this template references, with the
    /// span of each reference, in source order.
    ///
    /// Names bound by an enclosing `%{for}` are local to its body and are
    /// not reported.
    pub fn root_references(&self) -> Vec<(String, Span)> {
        let mut out = Vec::new();
        let mut bound = Vec::new();
        collect_template(self, &mut bound, &mut out);
        out
    }
}

fn collect_template(template: &Template, bound: &mut Vec<String>, out: &mut Vec<(String, Span)>) {
    for part in &template.parts {
        match part {
            Part::Literal(_) => {}
            Part::Interpolation(expr) => collect_expr(expr, bound, out),
            Part::If { cond, then_body, else_body } => {
                collect_expr(cond, bound, out);
                collect_template(then_body, bound, out);
                if let Some(body) = else_body {
                    collect_template(body, bound, out);
                }
            }
            Part::For { key_var, value_var, collection, body } => {
                collect_expr(collection, bound, out);
                let depth = bound.len();
                if let Some(key) = key_var {
                    bound.push(key.clone());
                }
                bound.push(value_var.clone());
                collect_template(body, bound, out);
                bound.truncate(depth);
            }
        }
    }
}

fn collect_expr(expr: &Expr, bound: &mut Vec<String>, out: &mut Vec<(String, Span)>) {
    match expr {
        Expr::Literal(_) => {}
        Expr::Traversal(traversal) => {
            if !bound.iter().any(|name| name == &traversal.root) {
                out.push((traversal.root.clone(), traversal.root_span));
            }
            for step in &traversal.steps {
                if let Step::Index(index) = step {
                    collect_expr(index, bound, out);
                }
            }
        }
        Expr::Call { args, .. } => {
            for arg in args {
                collect_expr(arg, bound, out);
            }
        }
        Expr::Unary { operand, .. } => collect_expr(operand, bound, out),
        Expr::Binary { lhs, rhs, .. } => {
            collect_expr(lhs, bound, out);
            collect_expr(rhs, bound, out);
        }
    }
}
