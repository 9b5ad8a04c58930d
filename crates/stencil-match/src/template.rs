//! Templates: ordered segments compiled into one bidirectional matcher.

use crate::error::{Error, Result};
use crate::token::Token;
use crate::value::{Fields, Value};
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// One piece of a template.
#[derive(Debug, Clone)]
pub enum Segment {
    Literal(String),
    Token(Arc<Token>),
    Template(Arc<Template>),
}

impl From<&str> for Segment {
    fn from(s: &str) -> Self {
        Segment::Literal(s.to_string())
    }
}

impl From<String> for Segment {
    fn from(s: String) -> Self {
        Segment::Literal(s)
    }
}

impl From<Token> for Segment {
    fn from(token: Token) -> Self {
        Segment::Token(Arc::new(token))
    }
}

impl From<Arc<Token>> for Segment {
    fn from(token: Arc<Token>) -> Self {
        Segment::Token(token)
    }
}

impl From<Template> for Segment {
    fn from(template: Template) -> Self {
        Segment::Template(Arc::new(template))
    }
}

impl From<Arc<Template>> for Segment {
    fn from(template: Arc<Template>) -> Self {
        Segment::Template(template)
    }
}

/// A segment after nested templates have been expanded inline.
#[derive(Debug, Clone)]
pub enum FlatSegment {
    Literal(String),
    Token(Arc<Token>),
}

/// Options for [`Template::format_with`].
#[derive(Debug, Clone)]
pub struct FormatOptions {
    /// Text inserted verbatim for a token, bypassing rendering.
    pub unformatted: HashMap<String, String>,
    /// Fall back to a token's default value when its field is absent.
    pub use_defaults: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            unformatted: HashMap::new(),
            use_defaults: true,
        }
    }
}

impl FormatOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unformatted(mut self, token: impl Into<String>, text: impl Into<String>) -> Self {
        self.unformatted.insert(token.into(), text.into());
        self
    }

    pub fn use_defaults(mut self, use_defaults: bool) -> Self {
        self.use_defaults = use_defaults;
        self
    }
}

/// A capture group bound to the token occurrence it came from.
#[derive(Debug)]
pub(crate) struct Slot {
    pub(crate) group: String,
    pub(crate) token: Arc<Token>,
    pub(crate) segment: usize,
}

#[derive(Debug)]
pub(crate) struct Compiled {
    /// Expression for each flattened segment, in order.
    pub(crate) fragments: Vec<String>,
    pub(crate) prefix: Regex,
    pub(crate) full: Regex,
    pub(crate) slots: Vec<Slot>,
}

impl Compiled {
    fn new(name: &str, flat: &[FlatSegment]) -> Result<Self> {
        let mut fragments = Vec::with_capacity(flat.len());
        let mut slots = Vec::new();

        for (segment, piece) in flat.iter().enumerate() {
            match piece {
                FlatSegment::Literal(text) => fragments.push(regex::escape(text)),
                FlatSegment::Token(token) => {
                    // Repeated tokens get their own group; values are compared after matching.
                    let group = format!("s{}", slots.len());
                    fragments.push(format!("(?P<{}>{})", group, token.pattern()));
                    slots.push(Slot {
                        group,
                        token: Arc::clone(token),
                        segment,
                    });
                }
            }
        }

        let source = fragments.concat();
        let compile = |anchored: String| {
            Regex::new(&anchored).map_err(|source| Error::InvalidPattern {
                name: name.to_string(),
                source,
            })
        };
        let prefix = compile(format!("(?s)^(?:{})", source))?;
        let full = compile(format!("(?s)^(?:{})$", source))?;

        Ok(Self {
            fragments,
            prefix,
            full,
            slots,
        })
    }
}

/// An ordered sequence of segments that can format values into text and
/// parse text back into values.
///
/// # Example
///
/// ```
/// use stencil_match::{Template, Token, Value};
///
/// let template = Template::new("intro", vec!["My name is ".into(), Token::text("name").into()]).unwrap();
/// let fields = template.parse("My name is Matt").unwrap();
/// assert_eq!(fields["name"], Value::from("Matt"));
/// assert_eq!(template.format(&fields).unwrap(), "My name is Matt");
/// ```
#[derive(Debug)]
pub struct Template {
    name: String,
    segments: Vec<Segment>,
    flat: Vec<FlatSegment>,
    compiled: Compiled,
}

impl Template {
    pub fn new(name: impl Into<String>, segments: Vec<Segment>) -> Result<Self> {
        let name = name.into();
        let mut flat = Vec::new();
        flatten_into(&segments, &mut flat);
        let compiled = Compiled::new(&name, &flat)?;
        Ok(Self {
            name,
            segments,
            flat,
            compiled,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Segments as given, nested templates kept as references.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Segments with every nested template expanded inline.
    pub fn flattened(&self) -> &[FlatSegment] {
        &self.flat
    }

    /// Shorthand rendering of the local segments, e.g. `{name}_v{version}` or `{@base}/{name}`.
    pub fn pattern(&self) -> String {
        self.local_shorthand(false)
    }

    /// Like [`Template::pattern`], with each token's render rule, e.g. `{version:0=3d}`.
    pub fn pattern_with_rules(&self) -> String {
        self.local_shorthand(true)
    }

    fn local_shorthand(&self, rules: bool) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Literal(text) => escape_braces(text),
                Segment::Token(token) => {
                    let rule = token.render_rule().to_string();
                    if rules && !rule.is_empty() {
                        format!("{{{}:{}}}", token.name(), rule)
                    } else {
                        format!("{{{}}}", token.name())
                    }
                }
                Segment::Template(template) => format!("{{@{}}}", template.name()),
            })
            .collect()
    }

    /// Shorthand rendering with nested templates expanded.
    pub fn expanded_pattern(&self) -> String {
        self.flat.iter().map(flat_shorthand).collect()
    }

    /// The composite expression the template matches with, without anchors.
    pub fn regex(&self) -> String {
        self.compiled.fragments.concat()
    }

    /// Distinct tokens in order of first appearance, including nested ones.
    pub fn tokens(&self) -> Vec<&Arc<Token>> {
        let mut seen = Vec::new();
        for piece in &self.flat {
            if let FlatSegment::Token(token) = piece {
                if !seen.iter().any(|t: &&Arc<Token>| t.name() == token.name()) {
                    seen.push(token);
                }
            }
        }
        seen
    }

    /// Distinct tokens of this template's own segments, skipping nested templates.
    pub fn local_tokens(&self) -> Vec<&Arc<Token>> {
        let mut seen: Vec<&Arc<Token>> = Vec::new();
        for segment in &self.segments {
            if let Segment::Token(token) = segment {
                if !seen.iter().any(|t| t.name() == token.name()) {
                    seen.push(token);
                }
            }
        }
        seen
    }

    pub fn token_names(&self) -> Vec<&str> {
        self.tokens().into_iter().map(|t| t.name()).collect()
    }

    /// Templates referenced directly by this one.
    pub fn templates(&self) -> Vec<&Arc<Template>> {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Template(template) => Some(template),
                _ => None,
            })
            .collect()
    }

    /// Literal text, including that of nested templates.
    pub fn fixed_strings(&self) -> Vec<&str> {
        self.flat
            .iter()
            .filter_map(|piece| match piece {
                FlatSegment::Literal(text) => Some(text.as_str()),
                FlatSegment::Token(_) => None,
            })
            .collect()
    }

    /// Literal text of this template's own segments.
    pub fn local_fixed_strings(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Literal(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn format(&self, fields: &Fields) -> Result<String> {
        self.format_with(fields, &FormatOptions::default())
    }

    pub fn format_with(&self, fields: &Fields, options: &FormatOptions) -> Result<String> {
        let mut out = String::new();
        let mut rendered: HashMap<&str, String> = HashMap::new();

        for piece in &self.flat {
            let token = match piece {
                FlatSegment::Literal(text) => {
                    out.push_str(text);
                    continue;
                }
                FlatSegment::Token(token) => token,
            };

            let text = match options.unformatted.get(token.name()) {
                Some(raw) => raw.clone(),
                None => token.render(self.field(token, fields, options)?)?,
            };

            match rendered.get(token.name()) {
                Some(first) if *first != text => {
                    return Err(Error::InconsistentRepeatedToken {
                        token: token.name().to_string(),
                        first: first.clone(),
                        second: text,
                    });
                }
                Some(_) => {}
                None => {
                    rendered.insert(token.name(), text.clone());
                }
            }
            out.push_str(&text);
        }

        Ok(out)
    }

    fn field<'f>(
        &'f self,
        token: &'f Token,
        fields: &'f Fields,
        options: &FormatOptions,
    ) -> Result<&'f Value> {
        if let Some(value) = fields.get(token.name()) {
            return Ok(value);
        }
        match token.default_value() {
            Some(default) if options.use_defaults => Ok(default),
            _ => Err(Error::MissingField {
                template: self.name.clone(),
                token: token.name().to_string(),
            }),
        }
    }

    /// Match the whole of `text`.
    pub fn parse(&self, text: &str) -> Result<Fields> {
        let caps = self
            .compiled
            .full
            .captures(text)
            .ok_or_else(|| self.parse_error(text))?;
        self.fields_from(&caps)
    }

    /// Match a prefix of `text`, returning the fields and the number of bytes consumed.
    pub fn extract(&self, text: &str) -> Result<(Fields, usize)> {
        let caps = self
            .compiled
            .prefix
            .captures(text)
            .ok_or_else(|| self.parse_error(text))?;
        let consumed = caps.get(0).map_or(0, |m| m.end());
        Ok((self.fields_from(&caps)?, consumed))
    }

    /// Like [`Template::parse`], but a failure carries a [`crate::Diagnostic`]
    /// locating the first segment that does not match.
    pub fn parse_debug(&self, text: &str) -> Result<Fields> {
        match self.parse(text) {
            Ok(fields) => Ok(fields),
            Err(
                Error::Parse { .. } | Error::Conversion { .. } | Error::InconsistentRepeatedToken { .. },
            ) => match self.diagnose(text) {
                crate::debug::DebugMatch::Matched { fields } => Ok(fields),
                crate::debug::DebugMatch::Diverged(diagnostic) => {
                    Err(Error::Diagnostic(Box::new(diagnostic)))
                }
            },
            Err(e) => Err(e),
        }
    }

    pub(crate) fn compiled(&self) -> &Compiled {
        &self.compiled
    }

    pub(crate) fn fields_from(&self, caps: &Captures<'_>) -> Result<Fields> {
        let mut fields = Fields::new();
        for slot in &self.compiled.slots {
            let Some(m) = caps.name(&slot.group) else {
                continue;
            };
            let value = slot.token.value_from_capture(m.as_str())?;
            record(&mut fields, &slot.token, value)?;
        }
        Ok(fields)
    }

    pub(crate) fn parse_error(&self, text: &str) -> Error {
        Error::Parse {
            template: self.name.clone(),
            pattern: self.pattern(),
            input: text.to_string(),
        }
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.pattern())
    }
}

/// Insert a captured value, rejecting a different value for a repeated token.
pub(crate) fn record(fields: &mut Fields, token: &Token, value: Value) -> Result<()> {
    match fields.get(token.name()) {
        Some(first) if *first != value => Err(Error::InconsistentRepeatedToken {
            token: token.name().to_string(),
            first: first.to_string(),
            second: value.to_string(),
        }),
        Some(_) => Ok(()),
        None => {
            fields.insert(token.name().to_string(), value);
            Ok(())
        }
    }
}

pub(crate) fn flat_shorthand(piece: &FlatSegment) -> String {
    match piece {
        FlatSegment::Literal(text) => escape_braces(text),
        FlatSegment::Token(token) => format!("{{{}}}", token.name()),
    }
}

fn escape_braces(text: &str) -> String {
    text.replace('{', "{{").replace('}', "}}")
}

fn flatten_into(segments: &[Segment], out: &mut Vec<FlatSegment>) {
    for segment in segments {
        match segment {
            Segment::Literal(text) => out.push(FlatSegment::Literal(text.clone())),
            Segment::Token(token) => out.push(FlatSegment::Token(Arc::clone(token))),
            Segment::Template(template) => out.extend(template.flat.iter().cloned()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenSpec;
    use crate::value::ValueType;

    fn fields(pairs: &[(&str, Value)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn version() -> Token {
        Token::new("version", ValueType::Int, &TokenSpec::new().padmin(3)).unwrap()
    }

    fn report() -> Template {
        Template::new(
            "report",
            vec![Token::text("name").into(), "_v".into(), version().into()],
        )
        .unwrap()
    }

    #[test]
    fn test_format_and_parse() {
        let t = Template::new("intro", vec!["My name is ".into(), Token::text("name").into()])
            .unwrap();
        let f = fields(&[("name", Value::from("Matt"))]);
        assert_eq!(t.format(&f).unwrap(), "My name is Matt");
        assert_eq!(t.parse("My name is Matt").unwrap(), f);
    }

    #[test]
    fn test_padded_version() {
        let t = report();
        let f = t.parse("report_v001").unwrap();
        assert_eq!(f["name"], Value::from("report"));
        assert_eq!(f["version"], Value::Int(1));
        assert_eq!(t.format(&f).unwrap(), "report_v001");
    }

    #[test]
    fn test_pattern_rendering() {
        let t = report();
        assert_eq!(t.pattern(), "{name}_v{version}");
        assert_eq!(t.to_string(), "report:{name}_v{version}");

        let outer = Template::new(
            "outer",
            vec!["{".into(), Arc::new(t).into(), "}".into()],
        )
        .unwrap();
        assert_eq!(outer.pattern(), "{{{@report}}}");
        assert_eq!(outer.expanded_pattern(), "{{{name}_v{version}}}");
    }

    #[test]
    fn test_pattern_with_rules() {
        let t = report();
        assert_eq!(t.pattern_with_rules(), "{name:s}_v{version:0=3d}");

        let outer = Template::new(
            "outer",
            vec![Arc::new(t).into(), ".".into(), Token::float("scale").into()],
        )
        .unwrap();
        assert_eq!(outer.pattern_with_rules(), "{@report}.{scale}");
    }

    #[test]
    fn test_local_introspection() {
        let inner = Arc::new(report());
        let outer = Template::new(
            "outer",
            vec![
                Arc::clone(&inner).into(),
                "/".into(),
                Token::text("ext").into(),
                "/".into(),
                Token::text("ext").into(),
            ],
        )
        .unwrap();
        let local: Vec<&str> = outer.local_tokens().iter().map(|t| t.name()).collect();
        assert_eq!(local, vec!["ext"]);
        assert_eq!(outer.token_names(), vec!["name", "version", "ext"]);
        assert_eq!(outer.local_fixed_strings(), vec!["/", "/"]);
        assert_eq!(outer.fixed_strings(), vec!["_v", "/", "/"]);
    }

    #[test]
    fn test_format_missing_field() {
        let t = report();
        let f = fields(&[("name", Value::from("report"))]);
        assert!(matches!(
            t.format(&f),
            Err(Error::MissingField { ref token, .. }) if token == "version"
        ));
    }

    #[test]
    fn test_format_ignores_unused_fields() {
        let t = report();
        let f = fields(&[
            ("name", Value::from("report")),
            ("version", Value::Int(12)),
            ("other", Value::Int(3)),
        ]);
        assert_eq!(t.format(&f).unwrap(), "report_v012");
    }

    #[test]
    fn test_format_with_defaults() {
        let version = Token::new(
            "version",
            ValueType::Int,
            &TokenSpec::new().padmin(3).default_value(1),
        )
        .unwrap();
        let t = Template::new("t", vec!["v".into(), version.into()]).unwrap();
        assert_eq!(t.format(&Fields::new()).unwrap(), "v001");

        let options = FormatOptions::new().use_defaults(false);
        assert!(matches!(
            t.format_with(&Fields::new(), &options),
            Err(Error::MissingField { .. })
        ));
    }

    #[test]
    fn test_format_unformatted() {
        let t = report();
        let options = FormatOptions::new().unformatted("version", "*");
        let f = fields(&[("name", Value::from("report"))]);
        assert_eq!(t.format_with(&f, &options).unwrap(), "report_v*");
    }

    #[test]
    fn test_extract_prefix() {
        let t = report();
        let (f, consumed) = t.extract("report_v002.txt").unwrap();
        assert_eq!(f["version"], Value::Int(2));
        assert_eq!(consumed, "report_v002".len());
        assert!(t.parse("report_v002.txt").is_err());
    }

    #[test]
    fn test_parse_error_names_template() {
        let t = report();
        let err = t.parse("report-v001").unwrap_err();
        assert_eq!(
            err.to_string(),
            "String 'report-v001' doesn't match template 'report:{name}_v{version}'"
        );
    }

    #[test]
    fn test_nested_templates() {
        let base = Arc::new(report());
        let t = Template::new(
            "file",
            vec![Arc::clone(&base).into(), ".".into(), Token::text("ext").into()],
        )
        .unwrap();
        assert_eq!(t.token_names(), vec!["name", "version", "ext"]);
        assert_eq!(t.templates().len(), 1);
        assert_eq!(t.fixed_strings(), vec!["_v", "."]);

        let f = t.parse("report_v010.exr").unwrap();
        assert_eq!(f["version"], Value::Int(10));
        assert_eq!(f["ext"], Value::from("exr"));
    }

    #[test]
    fn test_repeated_token_parse() {
        let name = Arc::new(Token::text("name"));
        let t = Template::new(
            "twice",
            vec![
                Arc::clone(&name).into(),
                "/".into(),
                Arc::clone(&name).into(),
            ],
        )
        .unwrap();
        assert_eq!(t.token_names(), vec!["name"]);
        assert_eq!(t.parse("abc/abc").unwrap()["name"], Value::from("abc"));
        assert!(matches!(
            t.parse("abc/abd"),
            Err(Error::InconsistentRepeatedToken { .. })
        ));
    }

    #[test]
    fn test_repeated_token_compares_values() {
        let padded = Token::new("n", ValueType::Int, &TokenSpec::new().padmin(3)).unwrap();
        let t = Template::new(
            "t",
            vec![padded.into(), "-".into(), Token::int("n").into()],
        )
        .unwrap();
        assert_eq!(t.parse("007-7").unwrap()["n"], Value::Int(7));
        assert!(t.parse("007-8").is_err());
    }

    #[test]
    fn test_repeated_token_format_mismatch() {
        let padded = Token::new("n", ValueType::Int, &TokenSpec::new().padmin(3)).unwrap();
        let t = Template::new(
            "t",
            vec![padded.into(), "-".into(), Token::int("n").into()],
        )
        .unwrap();
        let f = fields(&[("n", Value::Int(7))]);
        assert!(matches!(
            t.format(&f),
            Err(Error::InconsistentRepeatedToken { ref first, ref second, .. })
                if first == "007" && second == "7"
        ));
    }

    #[test]
    fn test_regex_escapes_literals() {
        let t = Template::new("t", vec!["(".into(), Token::int("n").into(), ")".into()])
            .unwrap();
        assert_eq!(t.regex(), r"\((?P<s0>[0-9]+)\)");
        assert_eq!(t.parse("(42)").unwrap()["n"], Value::Int(42));
    }

    #[test]
    fn test_compilation_is_repeatable() {
        let a = report();
        let b = report();
        assert_eq!(a.regex(), b.regex());
        for input in ["report_v001", "x_v1234", "report_v01", "_v001"] {
            assert_eq!(a.parse(input).is_ok(), b.parse(input).is_ok());
        }
    }
}
