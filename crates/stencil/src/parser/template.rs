//! Template string parser using winnow.
//!
//! Parses template strings into an AST. Handles:
//! - Literal text runs
//! - `${...}` interpolations
//! - `%{if}` / `%{else}` / `%{endif}` and `%{for}` / `%{endfor}` directives
//! - Escape sequences: `$${` and `%%{`
//! - Strip markers (`~`) that trim whitespace from adjacent literals

use winnow::combinator::{alt, cut_err, fail, not, opt, preceded, repeat, terminated};
use winnow::error::{ContextError, ErrMode, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::stream::{Location, Stream};
use winnow::token::{one_of, take_while};

use super::Input;
use super::ast::{Part, Template};
use super::error::{ParseError, position};
use super::expr::{expr, identifier, ws};

/// Parse a template string into an AST.
pub fn parse_template(input: &str) -> Result<Template, ParseError> {
    let mut stream = Input::new(input);
    let result = template_body(&mut stream);
    let offset = stream.current_token_start();
    let (line, column) = position(input, offset);
    match result {
        Ok(template) => {
            if stream.eof_offset() == 0 {
                Ok(template)
            } else {
                Err(ParseError::Syntax {
                    line,
                    column,
                    message: leftover_message(&input[offset..]),
                })
            }
        }
        Err(e) => Err(ParseError::Syntax {
            line,
            column,
            message: format!("parse error: {e}"),
        }),
    }
}

/// Describe trailing input that the template grammar could not consume.
///
/// A stray block closer is the common case and deserves a better message
/// than "unexpected character".
fn leftover_message(rest: &str) -> String {
    if let Some(body) = rest.strip_prefix("%{") {
        let body = body.trim_start_matches('~').trim_start();
        for (keyword, opener) in [("endif", "%{if}"), ("endfor", "%{for}"), ("else", "%{if}")] {
            if body.starts_with(keyword) {
                return format!("unexpected %{{{keyword}}} without a matching {opener}");
            }
        }
    }
    format!("unexpected character: '{}'", rest.chars().next().unwrap_or('?'))
}

/// A parsed part together with its strip markers.
#[derive(Debug, Clone)]
struct RawPart {
    part: Part,
    /// Trim trailing whitespace from the literal before this part.
    trim_before: bool,
    /// Trim leading whitespace from the literal after this part.
    trim_after: bool,
}

impl RawPart {
    fn plain(part: Part) -> Self {
        Self { part, trim_before: false, trim_after: false }
    }
}

/// Parse a run of parts up to end of input or an enclosing block closer.
fn template_body(input: &mut Input<'_>) -> ModalResult<Template> {
    let raw: Vec<RawPart> = repeat(0.., raw_part).parse_next(input)?;
    Ok(assemble(raw))
}

/// Apply strip markers against neighboring literals, then merge adjacent
/// literals into single parts.
fn assemble(raw: Vec<RawPart>) -> Template {
    let mut parts: Vec<Part> = Vec::with_capacity(raw.len());
    let mut trim_next = false;
    for item in raw {
        let mut part = item.part;
        if trim_next && let Part::Literal(text) = &mut part {
            *text = text.trim_start().to_string();
        }
        if item.trim_before {
            if let Some(Part::Literal(prev)) = parts.last_mut() {
                *prev = prev.trim_end().to_string();
            }
            if matches!(parts.last(), Some(Part::Literal(text)) if text.is_empty()) {
                parts.pop();
            }
        }
        trim_next = item.trim_after;
        if let Part::Literal(text) = &part {
            if text.is_empty() {
                continue;
            }
            if let Some(Part::Literal(prev)) = parts.last_mut() {
                prev.push_str(text);
                continue;
            }
        }
        parts.push(part);
    }
    Template { parts }
}

fn raw_part(input: &mut Input<'_>) -> ModalResult<RawPart> {
    alt((escape, interpolation, directive, literal_text, lone_sigil)).parse_next(input)
}

/// Parse escape sequences: `$${` -> `${`, `%%{` -> `%{`.
fn escape(input: &mut Input<'_>) -> ModalResult<RawPart> {
    alt((
        "$${".value(RawPart::plain(Part::Literal("${".to_string()))),
        "%%{".value(RawPart::plain(Part::Literal("%{".to_string()))),
    ))
    .parse_next(input)
}

/// Parse a run of characters that cannot open a template sequence.
fn literal_text(input: &mut Input<'_>) -> ModalResult<RawPart> {
    take_while(1.., |c: char| c != '$' && c != '%')
        .map(|s: &str| RawPart::plain(Part::Literal(s.to_string())))
        .parse_next(input)
}

/// Parse a `$` or `%` that does not open a sequence.
fn lone_sigil(input: &mut Input<'_>) -> ModalResult<RawPart> {
    terminated(one_of(['$', '%']), not('{'))
        .map(|c: char| RawPart::plain(Part::Literal(c.to_string())))
        .parse_next(input)
}

/// Parse an interpolation: `${ expr }`, with optional strip markers.
fn interpolation(input: &mut Input<'_>) -> ModalResult<RawPart> {
    let _ = "${".parse_next(input)?;
    let trim_before = opt('~').parse_next(input)?.is_some();
    ws(input)?;
    let inner = cut_err(expr)
        .context(StrContext::Label("interpolation"))
        .parse_next(input)?;
    let trim_after = close_directive(input)?;
    Ok(RawPart { part: Part::Interpolation(inner), trim_before, trim_after })
}

/// Parse a `%{...}` directive, dispatching on its keyword.
///
/// Block closers (`else`, `endif`, `endfor`) backtrack so that the body
/// repetition ends and the enclosing block parser can consume them.
fn directive(input: &mut Input<'_>) -> ModalResult<RawPart> {
    let checkpoint = input.checkpoint();
    let _ = "%{".parse_next(input)?;
    let trim_before = opt('~').parse_next(input)?.is_some();
    ws(input)?;
    let keyword = cut_err(identifier)
        .context(StrContext::Label("directive"))
        .parse_next(input)?;
    match keyword {
        "if" => if_block(input, trim_before),
        "for" => for_block(input, trim_before),
        "else" | "endif" | "endfor" => {
            input.reset(&checkpoint);
            Err(ErrMode::Backtrack(ContextError::new()))
        }
        _ => cut_err(fail)
            .context(StrContext::Label("directive"))
            .context(StrContext::Expected(StrContextValue::Description("if or for")))
            .parse_next(input),
    }
}

/// Parse the remainder of a directive: optional `~`, then `}`.
fn close_directive(input: &mut Input<'_>) -> ModalResult<bool> {
    ws(input)?;
    let trim = opt('~').parse_next(input)?.is_some();
    let _ = cut_err('}')
        .context(StrContext::Expected(StrContextValue::CharLiteral('}')))
        .parse_next(input)?;
    Ok(trim)
}

/// Parse the closer of a block: `%{ keyword }` where `keyword` is one of
/// `expected`. Returns the strip markers and the keyword seen.
fn block_terminator<'i>(
    input: &mut Input<'i>,
    expected: &'static [&'static str],
) -> ModalResult<(bool, &'i str, bool)> {
    let _ = cut_err("%{")
        .context(StrContext::Expected(StrContextValue::Description("closing directive")))
        .parse_next(input)?;
    let trim_before = opt('~').parse_next(input)?.is_some();
    ws(input)?;
    let keyword = cut_err(identifier).parse_next(input)?;
    if !expected.contains(&keyword) {
        return cut_err(fail)
            .context(StrContext::Expected(StrContextValue::Description(
                "a matching closing directive",
            )))
            .parse_next(input);
    }
    let trim_after = close_directive(input)?;
    Ok((trim_before, keyword, trim_after))
}

/// Parse an `%{if}` block; the keyword has already been consumed.
fn if_block(input: &mut Input<'_>, trim_before: bool) -> ModalResult<RawPart> {
    ws(input)?;
    let cond = cut_err(expr)
        .context(StrContext::Label("if condition"))
        .parse_next(input)?;
    let trim_then = close_directive(input)?;
    let mut then_body = template_body(input)?;
    if trim_then {
        trim_leading(&mut then_body);
    }
    let (trim_tok_before, keyword, trim_tok_after) =
        block_terminator(input, &["else", "endif"])?;
    if trim_tok_before {
        trim_trailing(&mut then_body);
    }
    let (else_body, trim_after) = if keyword == "else" {
        let mut body = template_body(input)?;
        if trim_tok_after {
            trim_leading(&mut body);
        }
        let (trim_end_before, _, trim_end_after) = block_terminator(input, &["endif"])?;
        if trim_end_before {
            trim_trailing(&mut body);
        }
        (Some(body), trim_end_after)
    } else {
        (None, trim_tok_after)
    };
    Ok(RawPart { part: Part::If { cond, then_body, else_body }, trim_before, trim_after })
}

/// Parse a `%{for}` block; the keyword has already been consumed.
fn for_block(input: &mut Input<'_>, trim_before: bool) -> ModalResult<RawPart> {
    ws(input)?;
    let first = cut_err(identifier)
        .context(StrContext::Label("for directive"))
        .parse_next(input)?;
    let second: Option<&str> = opt(preceded((ws, ',', ws), identifier)).parse_next(input)?;
    ws(input)?;
    let in_keyword = cut_err(identifier).parse_next(input)?;
    if in_keyword != "in" {
        return cut_err(fail)
            .context(StrContext::Expected(StrContextValue::Description("in")))
            .parse_next(input);
    }
    ws(input)?;
    let collection = cut_err(expr)
        .context(StrContext::Label("for collection"))
        .parse_next(input)?;
    let trim_body = close_directive(input)?;
    let mut body = template_body(input)?;
    if trim_body {
        trim_leading(&mut body);
    }
    let (trim_end_before, _, trim_after) = block_terminator(input, &["endfor"])?;
    if trim_end_before {
        trim_trailing(&mut body);
    }
    let (key_var, value_var) = match second {
        Some(value) => (Some(first.to_string()), value.to_string()),
        None => (None, first.to_string()),
    };
    Ok(RawPart {
        part: Part::For { key_var, value_var, collection, body },
        trim_before,
        trim_after,
    })
}

fn trim_leading(template: &mut Template) {
    if let Some(Part::Literal(text)) = template.parts.first_mut() {
        *text = text.trim_start().to_string();
    }
}

fn trim_trailing(template: &mut Template) {
    if let Some(Part::Literal(text)) = template.parts.last_mut() {
        *text = text.trim_end().to_string();
    }
}
