//! Template and expression evaluation.
//!
//! Evaluation walks the parsed template, appending literal parts and
//! stringifying interpolation results. Unknown values poison the result:
//! the output becomes an unknown string that remembers the literal
//! prefix produced before the first unknown fragment. Marks on every
//! value touched are unioned into the result.

use crate::interpreter::error::{EvalError, compute_suggestions};
use crate::interpreter::functions::FunctionRegistry;
use crate::interpreter::scope::Scope;
use crate::parser::{BinaryOp, Expr, Part, Step, Template, Traversal, UnaryOp};
use crate::types::{Kind, Marked, Marks, Value};

/// Everything expression evaluation can see: the variable scope and the
/// (restricted) function environment.
pub(crate) struct EvalContext<'a> {
    scope: Scope,
    funcs: &'a FunctionRegistry,
}

impl<'a> EvalContext<'a> {
    pub fn new(scope: Scope, funcs: &'a FunctionRegistry) -> Self {
        Self { scope, funcs }
    }

    /// A copy of this context with extra bindings layered on top, for
    /// directive bodies that bind loop names.
    fn child(&self, bindings: Vec<(String, Marked)>) -> EvalContext<'a> {
        let mut scope = self.scope.clone();
        for (name, value) in bindings {
            scope.insert(name, value);
        }
        EvalContext { scope, funcs: self.funcs }
    }
}

/// Accumulates template output, marks, and unknown-ness.
///
/// Once a fragment is unknown the output string freezes; what was
/// appended so far becomes the known prefix of the unknown result.
struct Output {
    out: String,
    marks: Marks,
    unknown: bool,
}

impl Output {
    fn new() -> Self {
        Self { out: String::new(), marks: Marks::new(), unknown: false }
    }

    fn push_str(&mut self, s: &str) {
        if !self.unknown {
            self.out.push_str(s);
        }
    }

    fn set_unknown(&mut self) {
        self.unknown = true;
    }

    /// Append an interpolated value, or fail if its kind cannot appear
    /// in a string template.
    fn absorb(&mut self, value: Marked) -> Result<(), EvalError> {
        self.marks.extend(value.marks);
        match value.value {
            Value::String(s) => self.push_str(&s),
            Value::Number(n) => self.push_str(&Value::format_number(n)),
            Value::Bool(b) => self.push_str(if b { "true" } else { "false" }),
            Value::Unknown(unknown) => {
                if let Some(prefix) = &unknown.string_prefix {
                    self.push_str(prefix);
                }
                self.set_unknown();
            }
            Value::Null => {
                return Err(EvalError::TypeMismatch {
                    message: "cannot include a null value in a string template".to_string(),
                });
            }
            Value::List(_) | Value::Map(_) | Value::Object(_) => {
                return Err(EvalError::TypeMismatch {
                    message: format!(
                        "cannot include a {} value in a string template; only strings, \
                         numbers, and bools are allowed",
                        value.value.kind()
                    ),
                });
            }
        }
        Ok(())
    }

    fn finish(self) -> Marked {
        if self.unknown {
            Marked::with_marks(Value::unknown_string_prefixed(self.out), self.marks)
        } else {
            Marked::with_marks(Value::String(self.out), self.marks)
        }
    }
}

/// Evaluate a parsed template to its result value.
pub(crate) fn eval_template(
    template: &Template,
    ctx: &EvalContext<'_>,
) -> Result<Marked, EvalError> {
    let mut output = Output::new();
    eval_into(template, ctx, &mut output)?;
    Ok(output.finish())
}

fn eval_into(template: &Template, ctx: &EvalContext<'_>, output: &mut Output) -> Result<(), EvalError> {
    for part in &template.parts {
        match part {
            Part::Literal(text) => output.push_str(text),
            Part::Interpolation(expr) => {
                let value = eval_expr(expr, ctx)?;
                output.absorb(value)?;
            }
            Part::If { cond, then_body, else_body } => {
                let cond = eval_expr(cond, ctx)?;
                output.marks.extend(cond.marks);
                match cond.value {
                    Value::Bool(true) => eval_into(then_body, ctx, output)?,
                    Value::Bool(false) => {
                        if let Some(body) = else_body {
                            eval_into(body, ctx, output)?;
                        }
                    }
                    Value::Unknown(_) => output.set_unknown(),
                    other => {
                        return Err(EvalError::TypeMismatch {
                            message: format!(
                                "invalid %{{if}} condition: bool required, got {}",
                                other.kind()
                            ),
                        });
                    }
                }
            }
            Part::For { key_var, value_var, collection, body } => {
                let collection = eval_expr(collection, ctx)?;
                output.marks.extend(collection.marks);
                match collection.value {
                    Value::List(elems) => {
                        for (index, elem) in elems.iter().enumerate() {
                            let mut bindings = Vec::with_capacity(2);
                            if let Some(key) = key_var {
                                bindings.push((key.clone(), Marked::new(index as i64)));
                            }
                            bindings.push((value_var.clone(), elem.clone()));
                            let child = ctx.child(bindings);
                            eval_into(body, &child, output)?;
                        }
                    }
                    Value::Map(entries) | Value::Object(entries) => {
                        for (key, value) in &entries {
                            let mut bindings = Vec::with_capacity(2);
                            if let Some(key_name) = key_var {
                                bindings.push((key_name.clone(), Marked::new(key.as_str())));
                                bindings.push((value_var.clone(), value.clone()));
                            } else {
                                bindings.push((value_var.clone(), Marked::new(key.as_str())));
                            }
                            let child = ctx.child(bindings);
                            eval_into(body, &child, output)?;
                        }
                    }
                    Value::Unknown(_) => output.set_unknown(),
                    other => {
                        return Err(EvalError::TypeMismatch {
                            message: format!(
                                "cannot iterate over a {} value in %{{for}}",
                                other.kind()
                            ),
                        });
                    }
                }
            }
        }
    }
    Ok(())
}

/// Evaluate an expression to a value.
pub(crate) fn eval_expr(expr: &Expr, ctx: &EvalContext<'_>) -> Result<Marked, EvalError> {
    match expr {
        Expr::Literal(value) => Ok(Marked::new(value.clone())),
        Expr::Traversal(traversal) => eval_traversal(traversal, ctx),
        Expr::Call { name, args, .. } => {
            let Some(function) = ctx.funcs.get(name) else {
                let names = ctx.funcs.names();
                return Err(EvalError::UndefinedFunction {
                    name: name.clone(),
                    suggestions: compute_suggestions(name, &names),
                });
            };
            let values = args
                .iter()
                .map(|arg| eval_expr(arg, ctx))
                .collect::<Result<Vec<_>, _>>()?;
            function.call(name, &values)
        }
        Expr::Unary { op, operand } => {
            let (value, marks) = eval_expr(operand, ctx)?.unmark();
            let result = match (op, value) {
                (UnaryOp::Not, Value::Bool(b)) => Value::Bool(!b),
                (UnaryOp::Not, Value::Unknown(_)) => Value::unknown(Kind::Bool),
                (UnaryOp::Not, other) => {
                    return Err(EvalError::TypeMismatch {
                        message: format!("operator ! requires a bool operand, got {}", other.kind()),
                    });
                }
                (UnaryOp::Neg, Value::Number(n)) => Value::Number(-n),
                (UnaryOp::Neg, Value::Unknown(_)) => Value::unknown(Kind::Number),
                (UnaryOp::Neg, other) => {
                    return Err(EvalError::TypeMismatch {
                        message: format!(
                            "operator - requires a number operand, got {}",
                            other.kind()
                        ),
                    });
                }
            };
            Ok(Marked::with_marks(result, marks))
        }
        Expr::Binary { op, lhs, rhs } => {
            let lhs = eval_expr(lhs, ctx)?;
            let rhs = eval_expr(rhs, ctx)?;
            eval_binary(*op, lhs, rhs)
        }
    }
}

fn eval_binary(op: BinaryOp, lhs: Marked, rhs: Marked) -> Result<Marked, EvalError> {
    let (l, mut marks) = lhs.unmark();
    let (r, rhs_marks) = rhs.unmark();
    marks.extend(rhs_marks);
    let either_unknown = l.is_unknown() || r.is_unknown();
    let result = match op {
        BinaryOp::Or | BinaryOp::And => {
            if either_unknown {
                Value::unknown(Kind::Bool)
            } else {
                match (l, r) {
                    (Value::Bool(a), Value::Bool(b)) => {
                        Value::Bool(if op == BinaryOp::Or { a || b } else { a && b })
                    }
                    (l, r) => return Err(binary_type_error(op, &l, &r, "bool")),
                }
            }
        }
        BinaryOp::Eq | BinaryOp::Ne => {
            if either_unknown {
                Value::unknown(Kind::Bool)
            } else {
                Value::Bool((l == r) == (op == BinaryOp::Eq))
            }
        }
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            if either_unknown {
                Value::unknown(Kind::Bool)
            } else {
                match (&l, &r) {
                    (Value::Number(a), Value::Number(b)) => Value::Bool(compare(op, a, b)),
                    (Value::String(a), Value::String(b)) => Value::Bool(compare(op, a, b)),
                    _ => return Err(binary_type_error(op, &l, &r, "number or string")),
                }
            }
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
            if either_unknown {
                Value::unknown(Kind::Number)
            } else {
                match (&l, &r) {
                    (Value::Number(a), Value::Number(b)) => {
                        if matches!(op, BinaryOp::Div | BinaryOp::Rem) && *b == 0.0 {
                            return Err(EvalError::TypeMismatch {
                                message: "division by zero".to_string(),
                            });
                        }
                        Value::Number(match op {
                            BinaryOp::Add => a + b,
                            BinaryOp::Sub => a - b,
                            BinaryOp::Mul => a * b,
                            BinaryOp::Div => a / b,
                            _ => a % b,
                        })
                    }
                    _ => return Err(binary_type_error(op, &l, &r, "number")),
                }
            }
        }
    };
    Ok(Marked::with_marks(result, marks))
}

fn compare<T: PartialOrd>(op: BinaryOp, a: &T, b: &T) -> bool {
    match op {
        BinaryOp::Lt => a < b,
        BinaryOp::Le => a <= b,
        BinaryOp::Gt => a > b,
        _ => a >= b,
    }
}

fn binary_type_error(op: BinaryOp, l: &Value, r: &Value, required: &str) -> EvalError {
    EvalError::TypeMismatch {
        message: format!(
            "operator {} requires {required} operands, got {} and {}",
            op_symbol(op),
            l.kind(),
            r.kind()
        ),
    }
}

fn op_symbol(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Or => "||",
        BinaryOp::And => "&&",
        BinaryOp::Eq => "==",
        BinaryOp::Ne => "!=",
        BinaryOp::Lt => "<",
        BinaryOp::Le => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::Ge => ">=",
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Rem => "%",
    }
}

/// Resolve a variable reference, applying its traversal steps.
pub(crate) fn eval_traversal(
    traversal: &Traversal,
    ctx: &EvalContext<'_>,
) -> Result<Marked, EvalError> {
    let Some(root) = ctx.scope.get(&traversal.root) else {
        let names = ctx.scope.names();
        return Err(EvalError::UnboundName {
            name: traversal.root.clone(),
            suggestions: compute_suggestions(&traversal.root, &names),
        });
    };
    let mut current = root.clone();
    for step in &traversal.steps {
        current = apply_step(current, step, ctx)?;
    }
    Ok(current)
}

fn apply_step(current: Marked, step: &Step, ctx: &EvalContext<'_>) -> Result<Marked, EvalError> {
    let (value, marks) = current.unmark();
    match step {
        Step::Attr(name) => {
            let result = match &value {
                Value::Map(entries) | Value::Object(entries) => entries
                    .get(name)
                    .cloned()
                    .ok_or_else(|| EvalError::NoSuchAttribute { name: name.clone() })?,
                Value::Unknown(_) => Marked::new(Value::unknown(Kind::Unknown)),
                Value::Null => {
                    return Err(EvalError::TypeMismatch {
                        message: format!("attempt to get attribute {name:?} from a null value"),
                    });
                }
                other => {
                    return Err(EvalError::TypeMismatch {
                        message: format!(
                            "cannot access attribute {name:?} on a {} value",
                            other.kind()
                        ),
                    });
                }
            };
            Ok(result.remark(marks))
        }
        Step::Index(index_expr) => {
            let (index, index_marks) = eval_expr(index_expr, ctx)?.unmark();
            let mut marks = marks;
            marks.extend(index_marks);
            if index.is_unknown() || value.is_unknown() {
                return Ok(Marked::with_marks(Value::unknown(Kind::Unknown), marks));
            }
            let result = match (&value, &index) {
                (Value::List(elems), Value::Number(n)) => {
                    if n.fract() != 0.0 {
                        return Err(EvalError::TypeMismatch {
                            message: "list index must be a whole number".to_string(),
                        });
                    }
                    let raw = *n as i64;
                    if raw < 0 || raw as usize >= elems.len() {
                        return Err(EvalError::IndexOutOfBounds {
                            index: raw,
                            len: elems.len(),
                        });
                    }
                    elems[raw as usize].clone()
                }
                (Value::Map(entries) | Value::Object(entries), Value::String(key)) => entries
                    .get(key)
                    .cloned()
                    .ok_or_else(|| EvalError::NoSuchAttribute { name: key.clone() })?,
                (Value::List(_), other) => {
                    return Err(EvalError::TypeMismatch {
                        message: format!("list index must be a number, got {}", other.kind()),
                    });
                }
                (Value::Map(_) | Value::Object(_), other) => {
                    return Err(EvalError::TypeMismatch {
                        message: format!("map key must be a string, got {}", other.kind()),
                    });
                }
                (Value::Null, _) => {
                    return Err(EvalError::TypeMismatch {
                        message: "attempt to index a null value".to_string(),
                    });
                }
                (other, _) => {
                    return Err(EvalError::TypeMismatch {
                        message: format!("cannot index a {} value", other.kind()),
                    });
                }
            };
            Ok(result.remark(marks))
        }
    }
}
