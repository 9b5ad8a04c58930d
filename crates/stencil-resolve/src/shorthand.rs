//! Template shorthand strings.
//!
//! ```text
//! {name}_v{version}          token references
//! {@base}/{name}             template in the same group
//! {@shots.base}/{name}       template in another group
//! {{literal braces}}         `{{` and `}}` are literal braces
//! ```

use crate::error::{ResolveError, Result};
use std::fmt;
use winnow::combinator::{alt, delimited, opt, separated};
use winnow::prelude::*;
use winnow::token::{any, take_while};

/// A reference to a template, optionally qualified by its group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TemplateRef {
    pub group: Option<String>,
    pub name: String,
}

impl fmt::Display for TemplateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.group {
            Some(group) => write!(f, "{}.{}", group, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// A template segment before references are resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawSegment {
    Literal(String),
    TokenRef(String),
    TemplateRef(TemplateRef),
}

impl RawSegment {
    pub fn literal(text: impl Into<String>) -> Self {
        RawSegment::Literal(text.into())
    }

    pub fn token(name: impl Into<String>) -> Self {
        RawSegment::TokenRef(name.into())
    }

    pub fn template(name: impl Into<String>) -> Self {
        RawSegment::TemplateRef(TemplateRef {
            group: None,
            name: name.into(),
        })
    }

    pub fn template_in(group: impl Into<String>, name: impl Into<String>) -> Self {
        RawSegment::TemplateRef(TemplateRef {
            group: Some(group.into()),
            name: name.into(),
        })
    }
}

/// Where a template's segments come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    Shorthand(String),
    Segments(Vec<RawSegment>),
}

impl TemplateSource {
    pub fn segments(&self) -> Result<Vec<RawSegment>> {
        match self {
            TemplateSource::Shorthand(text) => parse_shorthand(text),
            TemplateSource::Segments(segments) => Ok(segments.clone()),
        }
    }
}

impl From<&str> for TemplateSource {
    fn from(s: &str) -> Self {
        TemplateSource::Shorthand(s.to_string())
    }
}

impl From<String> for TemplateSource {
    fn from(s: String) -> Self {
        TemplateSource::Shorthand(s)
    }
}

impl From<Vec<RawSegment>> for TemplateSource {
    fn from(segments: Vec<RawSegment>) -> Self {
        TemplateSource::Segments(segments)
    }
}

/// Split a shorthand string into literal runs and references.
pub fn parse_shorthand(input: &str) -> Result<Vec<RawSegment>> {
    let mut rest = input;
    let mut segments = Vec::new();
    let mut text = String::new();

    while !rest.is_empty() {
        let offset = input.len() - rest.len();

        let mut attempt = rest;
        if let Ok(piece) = alt((literal_run, brace)).parse_next(&mut attempt) {
            text.push_str(piece);
            rest = attempt;
            continue;
        }

        let mut attempt = rest;
        let (symbol, path) = reference
            .parse_next(&mut attempt)
            .map_err(|_| shorthand_error(input, offset, "Malformed reference"))?;
        rest = attempt;

        if !text.is_empty() {
            segments.push(RawSegment::Literal(std::mem::take(&mut text)));
        }
        segments.push(reference_segment(input, offset, symbol, path)?);
    }

    if !text.is_empty() {
        segments.push(RawSegment::Literal(text));
    }
    Ok(segments)
}

fn reference_segment(
    input: &str,
    offset: usize,
    symbol: Option<char>,
    mut path: Vec<&str>,
) -> Result<RawSegment> {
    match (symbol, path.len()) {
        (None, 1) => Ok(RawSegment::token(path.remove(0))),
        (None, _) => Err(shorthand_error(
            input,
            offset,
            "Token references cannot name a group",
        )),
        (Some('@'), 1) => Ok(RawSegment::template(path.remove(0))),
        (Some('@'), _) => Ok(RawSegment::template_in(path[0], path[1])),
        (Some(other), _) => Err(shorthand_error(
            input,
            offset,
            &format!("Unknown token symbol: {}", other),
        )),
    }
}

fn shorthand_error(input: &str, offset: usize, message: &str) -> ResolveError {
    ResolveError::Shorthand {
        input: input.to_string(),
        offset,
        message: message.to_string(),
    }
}

fn literal_run<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    take_while(1.., |c: char| c != '{' && c != '}').parse_next(input)
}

fn brace<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    alt(("{{".value("{"), "}}".value("}"), "}".value("}"))).parse_next(input)
}

fn ident<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    take_while(1.., |c: char| c.is_alphanumeric() || c == '_' || c == '-').parse_next(input)
}

fn symbol(input: &mut &str) -> ModalResult<char> {
    any.verify(|c: &char| !(c.is_alphanumeric() || matches!(c, '_' | '-' | '{' | '}' | '.')))
        .parse_next(input)
}

fn reference<'a>(input: &mut &'a str) -> ModalResult<(Option<char>, Vec<&'a str>)> {
    delimited('{', (opt(symbol), separated(1..=2, ident, '.')), '}').parse_next(input)
}
