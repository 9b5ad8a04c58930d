//! Locating why a string does not match a template.
//!
//! The walk finds the longest run of leading segments that matches the start
//! of the input and reports the segment right after it, with the character
//! offset where matching stopped.

use crate::error::Error;
use crate::template::{flat_shorthand, record, FlatSegment, Template};
use crate::value::Fields;
use regex::{Captures, Regex};
use std::fmt;
use std::io::{self, Write};
use termcolor::{Color, ColorSpec, WriteColor};

const LABEL: &str = "Pattern: ";

/// Outcome of [`Template::diagnose`].
#[derive(Debug, Clone)]
pub enum DebugMatch {
    Matched { fields: Fields },
    Diverged(Diagnostic),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Failure {
    /// A literal segment differs from the input.
    Literal { expected: String },
    /// A token's pattern does not match at the cursor.
    Token { name: String, description: String },
    /// Matched text could not be converted to the token's type.
    Conversion { token: String, text: String },
    /// A repeated token captured two different values.
    Mismatch {
        token: String,
        first: String,
        second: String,
    },
    /// Every segment matched but input remains.
    ExcessInput,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Literal { expected } => write!(f, "String '{}' does not match", expected),
            Failure::Token { name, description } => {
                write!(f, "Token '{}' does not match: {}", name, description)
            }
            Failure::Conversion { token, text } => {
                write!(f, "Token '{}' cannot convert '{}'", token, text)
            }
            Failure::Mismatch {
                token,
                first,
                second,
            } => write!(
                f,
                "Mismatched values for token {{{}}}: {} != {}",
                token, first, second
            ),
            Failure::ExcessInput => write!(f, "Template matches string with remainder"),
        }
    }
}

/// Where and why matching stopped.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    template: String,
    pattern: String,
    input: String,
    offset: usize,
    segment: Option<usize>,
    failure: Failure,
    partial: Fields,
}

impl Diagnostic {
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Expanded shorthand pattern of the template.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Character offset into the input where matching stopped.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Index into [`Template::flattened`] of the failing segment.
    pub fn segment_index(&self) -> Option<usize> {
        self.segment
    }

    pub fn failure(&self) -> &Failure {
        &self.failure
    }

    /// Fields parsed before the failure.
    pub fn partial(&self) -> &Fields {
        &self.partial
    }

    fn caret_line(&self) -> String {
        format!("{}{}^", " ".repeat(LABEL.len()), " ".repeat(self.offset))
    }

    pub fn write_colored(&self, out: &mut dyn WriteColor) -> io::Result<()> {
        out.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
        writeln!(out, "{}", self.failure)?;
        out.set_color(ColorSpec::new().set_dimmed(true))?;
        write!(out, "{}", LABEL)?;
        out.reset()?;
        writeln!(out, "{}", self.pattern)?;
        writeln!(out, "{}{}", " ".repeat(LABEL.len()), self.input)?;
        out.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
        writeln!(out, "{}", self.caret_line())?;
        out.reset()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.failure)?;
        writeln!(f, "{}{}", LABEL, self.pattern)?;
        writeln!(f, "{}{}", " ".repeat(LABEL.len()), self.input)?;
        write!(f, "{}", self.caret_line())
    }
}

impl Template {
    /// Walk the flattened segments against `text` and report where they stop matching.
    pub fn diagnose(&self, text: &str) -> DebugMatch {
        let compiled = self.compiled();
        let total = compiled.fragments.len();

        // Matching the first k segments implies matching the first k - 1.
        let (mut lo, mut hi) = (0, total);
        while lo < hi {
            let mid = (lo + hi + 1) / 2;
            if self.leading_captures(mid, text).is_some() {
                lo = mid;
            } else {
                hi = mid - 1;
            }
        }

        let Some(caps) = self.leading_captures(lo, text) else {
            let failure = self
                .flattened()
                .first()
                .map_or(Failure::ExcessInput, leading_failure);
            return self.diverged(text, 0, Some(0), failure, Fields::new());
        };

        let mut partial = Fields::new();
        for slot in compiled.slots.iter().filter(|slot| slot.segment < lo) {
            let Some(m) = caps.name(&slot.group) else {
                continue;
            };
            let failure = match slot.token.value_from_capture(m.as_str()) {
                Ok(value) => match record(&mut partial, &slot.token, value) {
                    Ok(()) => continue,
                    Err(Error::InconsistentRepeatedToken {
                        token,
                        first,
                        second,
                    }) => Failure::Mismatch {
                        token,
                        first,
                        second,
                    },
                    Err(_) => continue,
                },
                Err(_) => Failure::Conversion {
                    token: slot.token.name().to_string(),
                    text: m.as_str().to_string(),
                },
            };
            return self.diverged(text, m.start(), Some(slot.segment), failure, partial);
        }

        let cursor = caps.get(0).map_or(0, |m| m.end());
        if lo < total {
            let (at, failure) = match &self.flattened()[lo] {
                FlatSegment::Literal(expected) => {
                    let rest = &text[cursor..];
                    let common: usize = rest
                        .chars()
                        .zip(expected.chars())
                        .take_while(|(a, b)| a == b)
                        .map(|(a, _)| a.len_utf8())
                        .sum();
                    (
                        cursor + common,
                        Failure::Literal {
                            expected: expected.clone(),
                        },
                    )
                }
                segment => (cursor, leading_failure(segment)),
            };
            return self.diverged(text, at, Some(lo), failure, partial);
        }

        match self.parse(text) {
            Ok(fields) => DebugMatch::Matched { fields },
            Err(_) => self.diverged(text, cursor, None, Failure::ExcessInput, partial),
        }
    }

    fn leading_captures<'t>(&self, count: usize, text: &'t str) -> Option<Captures<'t>> {
        let source = self.compiled().fragments[..count].concat();
        let regex = Regex::new(&format!("(?s)^(?:{})", source)).ok()?;
        regex.captures(text)
    }

    fn diverged(
        &self,
        text: &str,
        byte_offset: usize,
        segment: Option<usize>,
        failure: Failure,
        partial: Fields,
    ) -> DebugMatch {
        DebugMatch::Diverged(Diagnostic {
            template: self.name().to_string(),
            pattern: self.flattened().iter().map(flat_shorthand).collect(),
            input: text.to_string(),
            offset: text[..byte_offset].chars().count(),
            segment,
            failure,
            partial,
        })
    }
}

fn leading_failure(segment: &FlatSegment) -> Failure {
    match segment {
        FlatSegment::Literal(expected) => Failure::Literal {
            expected: expected.clone(),
        },
        FlatSegment::Token(token) => Failure::Token {
            name: token.name().to_string(),
            description: token.description().to_string(),
        },
    }
}
