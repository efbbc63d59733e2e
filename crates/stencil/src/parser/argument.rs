//! Classification of the unevaluated template argument.
//!
//! The render function constrains how its template argument may be
//! written. Classification happens on the argument's syntactic form,
//! before any evaluation, so the validator can reject dynamically built
//! templates with a useful message instead of rendering something
//! confusing.

use super::ast::{Expr, Part, Traversal};
use super::error::{ParseError, position};
use super::{parse_expr, parse_template};

/// The syntactic shape of a template argument.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateArg {
    /// A bare reference to a named value: `greeting` or `config.motd`.
    Reference(Traversal),

    /// A quoted string, parsed with the template grammar. Acceptable
    /// only when it contains a single literal part (template sequences
    /// escaped with `$${` and `%%{`).
    Template(Vec<Part>),

    /// An interpolation-only string: `"${expr}"`. This shape was how an
    /// earlier language generation wrote references, so it gets its own
    /// diagnostic.
    Wrap(Box<Expr>),

    /// Any other expression.
    Other(Box<Expr>),
}

impl TemplateArg {
    /// Classify an argument from its source text.
    ///
    /// Fails only when the argument is not parseable at all; whether a
    /// parsed shape is acceptable is the validator's decision.
    pub fn parse(source: &str) -> Result<TemplateArg, ParseError> {
        let trimmed = source.trim();
        if let Some(rest) = trimmed.strip_prefix('"') {
            let Some(inner) = rest.strip_suffix('"') else {
                let (line, column) = position(source, source.len());
                return Err(ParseError::Syntax {
                    line,
                    column,
                    message: "unterminated string literal".to_string(),
                });
            };
            if !is_plain_quoted(inner) {
                // Not a single quoted string (e.g. a concatenation of
                // two strings); classify as a general expression.
                match parse_expr(trimmed)? {
                    Expr::Traversal(traversal) => return Ok(TemplateArg::Reference(traversal)),
                    other => return Ok(TemplateArg::Other(Box::new(other))),
                }
            }
            let unescaped = unescape(inner)?;
            let mut template = parse_template(&unescaped)?;
            if matches!(template.parts.as_slice(), [Part::Interpolation(_)]) {
                if let Some(Part::Interpolation(expr)) = template.parts.pop() {
                    return Ok(TemplateArg::Wrap(Box::new(expr)));
                }
            }
            Ok(TemplateArg::Template(template.parts))
        } else {
            match parse_expr(trimmed)? {
                Expr::Traversal(traversal) => Ok(TemplateArg::Reference(traversal)),
                other => Ok(TemplateArg::Other(Box::new(other))),
            }
        }
    }
}

/// Whether `inner` is the body of one quoted string: no unescaped
/// double quote anywhere inside it.
fn is_plain_quoted(inner: &str) -> bool {
    let mut escaped = false;
    for c in inner.chars() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => return false,
            _ => {}
        }
    }
    true
}

/// Decode the backslash escapes of a quoted argument. The template-level
/// escapes (`$${`, `%%{`) pass through untouched.
fn unescape(input: &str) -> Result<String, ParseError> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.char_indices();
    while let Some((offset, c)) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some((_, '"')) => out.push('"'),
            Some((_, '\\')) => out.push('\\'),
            Some((_, 'n')) => out.push('\n'),
            Some((_, 't')) => out.push('\t'),
            Some((_, 'r')) => out.push('\r'),
            Some((_, other)) => {
                let (line, column) = position(input, offset);
                return Err(ParseError::Syntax {
                    line,
                    column,
                    message: format!("invalid escape sequence '\\{other}'"),
                });
            }
            None => {
                let (line, column) = position(input, offset);
                return Err(ParseError::Syntax {
                    line,
                    column,
                    message: "trailing backslash in string literal".to_string(),
                });
            }
        }
    }
    Ok(out)
}
