//! Templates over filesystem paths.

use crate::error::{Error, Result};
use crate::template::{FlatSegment, FormatOptions, Segment, Template};
use crate::value::Fields;
use glob::{MatchOptions, Pattern};
use regex::Regex;
use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::Arc;
use walkdir::WalkDir;

const WILDCARD: &str = "*";

/// A template whose text is a `/`-separated path.
///
/// Backslashes in parsed input are treated as `/`, and formatted paths are
/// normalized.
#[derive(Debug, Clone)]
pub struct PathTemplate {
    template: Arc<Template>,
    bounded: Regex,
}

impl PathTemplate {
    pub fn new(name: impl Into<String>, segments: Vec<Segment>) -> Result<Self> {
        Self::from_template(Arc::new(Template::new(name, segments)?))
    }

    pub fn from_template(template: Arc<Template>) -> Result<Self> {
        let ends_at_separator = matches!(
            template.flattened().last(),
            Some(FlatSegment::Literal(text)) if text.ends_with('/') || text.ends_with('\\')
        );
        let boundary = if ends_at_separator { "" } else { "(?:/|$)" };
        let bounded = Regex::new(&format!("(?s)^(?:{}){}", template.regex(), boundary)).map_err(
            |source| Error::InvalidPattern {
                name: template.name().to_string(),
                source,
            },
        )?;
        Ok(Self { template, bounded })
    }

    pub fn template(&self) -> &Arc<Template> {
        &self.template
    }

    pub fn name(&self) -> &str {
        self.template.name()
    }

    pub fn pattern(&self) -> String {
        self.template.pattern()
    }

    pub fn format(&self, fields: &Fields) -> Result<String> {
        self.format_with(fields, &FormatOptions::default())
    }

    pub fn format_with(&self, fields: &Fields, options: &FormatOptions) -> Result<String> {
        Ok(normalize(&self.template.format_with(fields, options)?))
    }

    pub fn parse(&self, path: &str) -> Result<Fields> {
        self.template.parse(&agnostic(path))
    }

    pub fn extract(&self, path: &str) -> Result<(Fields, usize)> {
        self.template.extract(&agnostic(path))
    }

    pub fn parse_debug(&self, path: &str) -> Result<Fields> {
        self.template.parse_debug(&agnostic(path))
    }

    /// Extract fields from the leading part of `path`, returning them with the
    /// rest of the path.
    ///
    /// The template must end at a separator or at the end of `path`.
    pub fn extract_relative(&self, path: &str) -> Result<(Fields, String)> {
        let path = agnostic(path);
        let caps = self
            .bounded
            .captures(&path)
            .ok_or_else(|| self.template.parse_error(&path))?;
        let fields = self.template.fields_from(&caps)?;
        let end = caps.get(0).map_or(0, |m| m.end());
        let rest = path[end..].trim_start_matches('/');
        let relative = if rest.is_empty() {
            String::new()
        } else {
            normalize(rest)
        };
        Ok((fields, relative))
    }

    /// List existing paths that match the template with `fields` fixed and
    /// every token in `wildcards` left free.
    ///
    /// Candidates are re-parsed so that only paths the template accepts are
    /// returned, sorted by path.
    pub fn paths(&self, fields: &Fields, wildcards: &[&str]) -> Result<Vec<(PathBuf, Fields)>> {
        let options = wildcards
            .iter()
            .fold(FormatOptions::default(), |options, name| {
                options.unformatted(*name, WILDCARD)
            });
        let rendered = self.format_with(fields, &options)?;
        let pattern = Pattern::new(&rendered)?;
        let match_options = MatchOptions {
            case_sensitive: true,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };

        let components: Vec<&str> = rendered.split('/').collect();
        let split = components
            .iter()
            .position(|c| c.contains(|ch: char| matches!(ch, '*' | '?' | '[')))
            .unwrap_or(components.len());
        let depth = components.len() - split;
        let base = match components[..split].join("/") {
            base if !base.is_empty() => base,
            _ if rendered.starts_with('/') => "/".to_string(),
            _ => ".".to_string(),
        };
        tracing::debug!(template = %self.name(), pattern = %rendered, %base, depth, "listing paths");

        let mut found = Vec::new();
        for entry in WalkDir::new(&base)
            .min_depth(depth)
            .max_depth(depth)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let entry_path = entry.path();
            let relative = match entry_path.strip_prefix(".") {
                Ok(stripped) if base == "." => stripped,
                _ => entry_path,
            };
            let candidate = agnostic(&relative.to_string_lossy()).into_owned();
            if !pattern.matches_with(&candidate, match_options) {
                continue;
            }
            match self.template.parse(&candidate) {
                Ok(parsed) => found.push((relative.to_path_buf(), parsed)),
                Err(e) => tracing::trace!(path = %candidate, error = %e, "skipping path"),
            }
        }

        found.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(found)
    }

    /// The nested template this path starts with, if any.
    pub fn root_template(&self) -> Option<&Arc<Template>> {
        match self.template.segments().first() {
            Some(Segment::Template(template)) => Some(template),
            _ => None,
        }
    }
}

fn agnostic(path: &str) -> Cow<'_, str> {
    if path.contains('\\') {
        Cow::Owned(path.replace('\\', "/"))
    } else {
        Cow::Borrowed(path)
    }
}

/// Collapse repeated separators, drop `.` components and resolve `..` where possible.
pub(crate) fn normalize(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if absolute => {}
                _ => parts.push(".."),
            },
            part => parts.push(part),
        }
    }

    let joined = parts.join("/");
    if absolute {
        format!("/{}", joined)
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}
