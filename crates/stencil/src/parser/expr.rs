//! Expression parser using winnow.
//!
//! Parses the expressions that appear inside `${...}` interpolations and
//! `%{...}` directives: literals, traversals, function calls, and the
//! usual operator ladder (`||`, `&&`, equality, comparison, additive,
//! multiplicative, unary).

use winnow::combinator::{alt, delimited, opt, preceded, repeat, separated};
use winnow::prelude::*;
use winnow::stream::{Location, Stream};
use winnow::token::{none_of, one_of, take_while};

use super::Input;
use super::ast::{BinaryOp, Expr, Step, Traversal, UnaryOp};
use super::error::{ParseError, position};
use crate::types::Value;

/// Parse a standalone expression, requiring the whole input to be consumed.
pub(crate) fn parse_expr(source: &str) -> Result<Expr, ParseError> {
    let mut stream = Input::new(source);
    let result = delimited(ws, expr, ws).parse_next(&mut stream);
    let offset = stream.current_token_start();
    let (line, column) = position(source, offset);
    match result {
        Ok(parsed) => {
            if stream.eof_offset() == 0 {
                Ok(parsed)
            } else {
                Err(ParseError::Syntax {
                    line,
                    column,
                    message: format!(
                        "unexpected character: '{}'",
                        source[offset..].chars().next().unwrap_or('?')
                    ),
                })
            }
        }
        Err(e) => Err(ParseError::Syntax {
            line,
            column,
            message: format!("invalid expression: {e}"),
        }),
    }
}

/// Parse an expression at the lowest precedence level.
pub(crate) fn expr(input: &mut Input<'_>) -> ModalResult<Expr> {
    or_expr(input)
}

/// Parse optional whitespace.
pub(crate) fn ws(input: &mut Input<'_>) -> ModalResult<()> {
    take_while(0.., |c: char| c.is_ascii_whitespace())
        .void()
        .parse_next(input)
}

/// Parse an identifier: a letter followed by letters, digits, underscores.
pub(crate) fn identifier<'i>(input: &mut Input<'i>) -> ModalResult<&'i str> {
    (
        one_of(|c: char| c.is_alphabetic()),
        take_while(0.., |c: char| c.is_alphanumeric() || c == '_'),
    )
        .take()
        .parse_next(input)
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) }
}

fn or_expr(input: &mut Input<'_>) -> ModalResult<Expr> {
    let mut lhs = and_expr(input)?;
    let tail: Vec<Expr> = repeat(0.., preceded((ws, "||", ws), and_expr)).parse_next(input)?;
    for rhs in tail {
        lhs = binary(BinaryOp::Or, lhs, rhs);
    }
    Ok(lhs)
}

fn and_expr(input: &mut Input<'_>) -> ModalResult<Expr> {
    let mut lhs = eq_expr(input)?;
    let tail: Vec<Expr> = repeat(0.., preceded((ws, "&&", ws), eq_expr)).parse_next(input)?;
    for rhs in tail {
        lhs = binary(BinaryOp::And, lhs, rhs);
    }
    Ok(lhs)
}

fn eq_expr(input: &mut Input<'_>) -> ModalResult<Expr> {
    let mut lhs = cmp_expr(input)?;
    let tail: Vec<(BinaryOp, Expr)> = repeat(
        0..,
        (
            delimited(ws, alt(("==".value(BinaryOp::Eq), "!=".value(BinaryOp::Ne))), ws),
            cmp_expr,
        ),
    )
    .parse_next(input)?;
    for (op, rhs) in tail {
        lhs = binary(op, lhs, rhs);
    }
    Ok(lhs)
}

fn cmp_expr(input: &mut Input<'_>) -> ModalResult<Expr> {
    let mut lhs = add_expr(input)?;
    let tail: Vec<(BinaryOp, Expr)> = repeat(
        0..,
        (
            delimited(
                ws,
                alt((
                    "<=".value(BinaryOp::Le),
                    ">=".value(BinaryOp::Ge),
                    "<".value(BinaryOp::Lt),
                    ">".value(BinaryOp::Gt),
                )),
                ws,
            ),
            add_expr,
        ),
    )
    .parse_next(input)?;
    for (op, rhs) in tail {
        lhs = binary(op, lhs, rhs);
    }
    Ok(lhs)
}

fn add_expr(input: &mut Input<'_>) -> ModalResult<Expr> {
    let mut lhs = mul_expr(input)?;
    let tail: Vec<(BinaryOp, Expr)> = repeat(
        0..,
        (
            delimited(ws, alt(("+".value(BinaryOp::Add), "-".value(BinaryOp::Sub))), ws),
            mul_expr,
        ),
    )
    .parse_next(input)?;
    for (op, rhs) in tail {
        lhs = binary(op, lhs, rhs);
    }
    Ok(lhs)
}

fn mul_expr(input: &mut Input<'_>) -> ModalResult<Expr> {
    let mut lhs = unary_expr(input)?;
    let tail: Vec<(BinaryOp, Expr)> = repeat(
        0..,
        (
            delimited(
                ws,
                alt((
                    "*".value(BinaryOp::Mul),
                    "/".value(BinaryOp::Div),
                    "%".value(BinaryOp::Rem),
                )),
                ws,
            ),
            unary_expr,
        ),
    )
    .parse_next(input)?;
    for (op, rhs) in tail {
        lhs = binary(op, lhs, rhs);
    }
    Ok(lhs)
}

fn unary_expr(input: &mut Input<'_>) -> ModalResult<Expr> {
    alt((
        preceded(('!', ws), unary_expr).map(|operand| Expr::Unary {
            op: UnaryOp::Not,
            operand: Box::new(operand),
        }),
        preceded(('-', ws), unary_expr).map(|operand| Expr::Unary {
            op: UnaryOp::Neg,
            operand: Box::new(operand),
        }),
        primary,
    ))
    .parse_next(input)
}

fn primary(input: &mut Input<'_>) -> ModalResult<Expr> {
    alt((
        number,
        string_lit.map(|s| Expr::Literal(Value::String(s))),
        delimited(('(', ws), expr, (ws, ')')),
        name_like,
    ))
    .parse_next(input)
}

fn number(input: &mut Input<'_>) -> ModalResult<Expr> {
    (
        take_while(1.., |c: char| c.is_ascii_digit()),
        opt(('.', take_while(1.., |c: char| c.is_ascii_digit()))),
    )
        .take()
        .try_map(str::parse::<f64>)
        .map(|n| Expr::Literal(Value::Number(n)))
        .parse_next(input)
}

/// Parse a double-quoted string literal. Plain strings only: template
/// sequences are not recognized at the expression level.
pub(crate) fn string_lit(input: &mut Input<'_>) -> ModalResult<String> {
    delimited('"', repeat(0.., string_char), '"').parse_next(input)
}

fn string_char(input: &mut Input<'_>) -> ModalResult<char> {
    alt((preceded('\\', escape_char), none_of(['"', '\\']))).parse_next(input)
}

fn escape_char(input: &mut Input<'_>) -> ModalResult<char> {
    alt((
        '"'.value('"'),
        '\\'.value('\\'),
        'n'.value('\n'),
        't'.value('\t'),
        'r'.value('\r'),
    ))
    .parse_next(input)
}

/// Parse an identifier-led expression: a keyword literal, a function
/// call, or a traversal.
fn name_like(input: &mut Input<'_>) -> ModalResult<Expr> {
    let (name, span) = identifier.with_span().parse_next(input)?;
    match name {
        "true" => Ok(Expr::Literal(Value::Bool(true))),
        "false" => Ok(Expr::Literal(Value::Bool(false))),
        "null" => Ok(Expr::Literal(Value::Null)),
        _ => {
            if let Some(args) = opt(call_args).parse_next(input)? {
                Ok(Expr::Call { name: name.to_string(), name_span: span.into(), args })
            } else {
                let steps: Vec<Step> = repeat(0.., step).parse_next(input)?;
                Ok(Expr::Traversal(Traversal {
                    root: name.to_string(),
                    root_span: span.into(),
                    steps,
                }))
            }
        }
    }
}

fn call_args(input: &mut Input<'_>) -> ModalResult<Vec<Expr>> {
    let args: Vec<Expr> =
        delimited(('(', ws), separated(0.., expr, (ws, ',', ws)), (ws, ')')).parse_next(input)?;
    Ok(args)
}

fn step(input: &mut Input<'_>) -> ModalResult<Step> {
    alt((
        preceded('.', identifier).map(|name: &str| Step::Attr(name.to_string())),
        delimited(('[', ws), expr, (ws, ']')).map(|index| Step::Index(Box::new(index))),
    ))
    .parse_next(input)
}
