//! Tokens: named, typed placeholders with a matching pattern and a render rule.

use crate::error::{Error, Result};
use crate::render::{Align, RenderRule};
use crate::value::{Value, ValueType};
use regex::Regex;
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Letter case shorthand for text tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Case {
    Lower,
    LowerCamel,
    Upper,
    UpperCamel,
}

impl Case {
    pub fn name(self) -> &'static str {
        match self {
            Case::Lower => "lower",
            Case::LowerCamel => "lowerCamel",
            Case::Upper => "upper",
            Case::UpperCamel => "UpperCamel",
        }
    }

    /// Class for a fixed leading character, if any, and class for the rest.
    fn classes(self) -> (Option<&'static str>, &'static str) {
        match self {
            Case::Lower => (None, "a-z"),
            Case::Upper => (None, "A-Z"),
            Case::LowerCamel => (Some("a-z"), "a-zA-Z"),
            Case::UpperCamel => (Some("A-Z"), "a-zA-Z"),
        }
    }
}

impl FromStr for Case {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "lower" => Ok(Case::Lower),
            "lowerCamel" => Ok(Case::LowerCamel),
            "upper" => Ok(Case::Upper),
            "UpperCamel" => Ok(Case::UpperCamel),
            other => Err(format!("Unknown case: {}", other)),
        }
    }
}

/// Declarative token settings.
///
/// A token either states its `pattern` / `render_rule` explicitly or uses the
/// shorthand keys (`padmin`, `padmax`, `padchar`, `padalign`, `padstrict`,
/// `choices`, `case`), never both.
#[derive(Debug, Clone, Default)]
pub struct TokenSpec {
    pub pattern: Option<String>,
    pub render_rule: Option<String>,
    pub description: Option<String>,
    pub padmin: Option<usize>,
    pub padmax: Option<usize>,
    pub padchar: Option<char>,
    pub padalign: Option<Align>,
    pub padstrict: Option<bool>,
    pub choices: Vec<String>,
    pub case: Option<Case>,
    pub default: Option<Value>,
}

impl TokenSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn render_rule(mut self, rule: impl Into<String>) -> Self {
        self.render_rule = Some(rule.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn padmin(mut self, padmin: usize) -> Self {
        self.padmin = Some(padmin);
        self
    }

    pub fn padmax(mut self, padmax: usize) -> Self {
        self.padmax = Some(padmax);
        self
    }

    pub fn padchar(mut self, padchar: char) -> Self {
        self.padchar = Some(padchar);
        self
    }

    pub fn padalign(mut self, padalign: Align) -> Self {
        self.padalign = Some(padalign);
        self
    }

    pub fn padstrict(mut self, padstrict: bool) -> Self {
        self.padstrict = Some(padstrict);
        self
    }

    pub fn choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    pub fn case(mut self, case: Case) -> Self {
        self.case = Some(case);
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    fn uses_shorthand(&self) -> bool {
        self.padmin.is_some()
            || self.padmax.is_some()
            || self.padchar.is_some()
            || self.padalign.is_some()
            || self.padstrict.is_some()
            || !self.choices.is_empty()
            || self.case.is_some()
    }

    fn is_explicit(&self) -> bool {
        self.pattern.is_some() || self.render_rule.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct Token {
    name: String,
    value_type: ValueType,
    pattern: String,
    full: Regex,
    prefix: Regex,
    render_rule: RenderRule,
    unpad: bool,
    choices: Vec<String>,
    description: String,
    default: Option<Value>,
}

impl Token {
    pub fn new(name: impl Into<String>, value_type: ValueType, spec: &TokenSpec) -> Result<Self> {
        let name = name.into();
        let invalid = |reason: String| Error::InvalidTokenSpec {
            token: name.clone(),
            reason,
        };

        if spec.is_explicit() && spec.uses_shorthand() {
            return Err(Error::ConflictingTokenSpec {
                token: name,
                reason: "Cannot use construction keywords with explicit pattern or render rule"
                    .to_string(),
            });
        }
        if spec.case.is_some() && !matches!(value_type, ValueType::Text) {
            return Err(invalid("case only applies to text tokens".to_string()));
        }
        match (spec.padmin, spec.padmax) {
            (Some(min), Some(max)) if max < min => {
                return Err(invalid(format!(
                    "Padmax ({}) cannot be lower than padmin ({})",
                    max, min
                )));
            }
            (None, Some(0)) => return Err(invalid("Padmax must be at least 1".to_string())),
            _ => {}
        }

        let numeric = value_type.is_numeric();
        let (pattern, render_rule, unpad) = if !spec.choices.is_empty() {
            (choice_pattern(&spec.choices), RenderRule::default(), false)
        } else if spec.is_explicit() {
            let pattern = spec
                .pattern
                .clone()
                .unwrap_or_else(|| value_type.base_pattern().to_string());
            let rule = match &spec.render_rule {
                Some(rule) => rule.parse::<RenderRule>().map_err(&invalid)?,
                None => default_rule(&value_type),
            };
            (pattern, rule, false)
        } else {
            let padstrict = spec.padstrict.unwrap_or(!numeric);
            let fill = spec.padchar.unwrap_or(if numeric { '0' } else { 'X' });
            let align = spec.padalign.unwrap_or(if numeric {
                Align::SignAware
            } else {
                Align::Right
            });
            let width = spec.padmin.filter(|_| !padstrict);
            if width.is_some() {
                check_fill(&value_type, spec.case, fill, align).map_err(&invalid)?;
            }
            let pattern = shorthand_pattern(&value_type, spec, width.map(|_| fill)).map_err(&invalid)?;
            let rule = match (width, default_rule(&value_type).kind) {
                (Some(width), Some(kind)) => RenderRule::padded(fill, align, width).with_kind(kind),
                (Some(width), None) => RenderRule::padded(fill, align, width),
                (None, _) => default_rule(&value_type),
            };
            (pattern, rule, width.is_some())
        };

        let compile = |source: String| {
            Regex::new(&source).map_err(|source| Error::InvalidPattern {
                name: name.clone(),
                source,
            })
        };
        let full = compile(format!("^(?:{})$", pattern))?;
        let prefix = compile(format!("^(?:{})", pattern))?;

        let description = spec
            .description
            .clone()
            .unwrap_or_else(|| default_description(&value_type, spec));

        let token = Self {
            name,
            value_type,
            pattern,
            full,
            prefix,
            render_rule,
            unpad,
            choices: spec.choices.clone(),
            description,
            default: None,
        };

        match &spec.default {
            Some(default) => {
                token.render(default).map_err(|e| Error::InvalidTokenSpec {
                    token: token.name.clone(),
                    reason: format!("default value does not render: {}", e),
                })?;
                Ok(Self {
                    default: Some(default.clone()),
                    ..token
                })
            }
            None => Ok(token),
        }
    }

    /// A text token matching letters only.
    pub fn text(name: impl Into<String>) -> Self {
        Self::builtin(name, ValueType::Text)
    }

    /// An integer token matching digits only.
    pub fn int(name: impl Into<String>) -> Self {
        Self::builtin(name, ValueType::Int)
    }

    /// A float token matching unsigned decimals.
    pub fn float(name: impl Into<String>) -> Self {
        Self::builtin(name, ValueType::Float)
    }

    fn builtin(name: impl Into<String>, value_type: ValueType) -> Self {
        Self::new(name, value_type, &TokenSpec::default())
            .expect("built-in token patterns are valid")
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_type(&self) -> &ValueType {
        &self.value_type
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn render_rule(&self) -> &RenderRule {
        &self.render_rule
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Render a value to text, checking the result against the token's pattern.
    pub fn render(&self, value: &Value) -> Result<String> {
        let text = self
            .value_type
            .to_text(value, self.render_rule.precision)
            .ok_or_else(|| Error::TypeMismatch {
                token: self.name.clone(),
                expected: self.value_type.expected(),
                got: value.type_name(),
                value: value.to_string(),
            })?;

        if !self.choices.is_empty() && !self.choices.contains(&text) {
            return Err(self.violation(text));
        }

        let rendered = self.render_rule.pad(&text, self.value_type.is_numeric());
        if !self.full.is_match(&rendered) {
            return Err(self.violation(rendered));
        }
        Ok(rendered)
    }

    /// Parse a value from text that must match the token exactly.
    pub fn parse(&self, text: &str) -> Result<Value> {
        if !self.full.is_match(text) {
            return Err(self.conversion_error(text));
        }
        self.value_from_capture(text)
    }

    /// Match the token at byte offset `at`, returning the matched text and its value.
    pub fn match_prefix<'t>(&self, text: &'t str, at: usize) -> Result<Option<(&'t str, Value)>> {
        let Some(rest) = text.get(at..) else {
            return Ok(None);
        };
        let Some(m) = self.prefix.find(rest) else {
            return Ok(None);
        };
        let value = self.value_from_capture(m.as_str())?;
        Ok(Some((m.as_str(), value)))
    }

    /// Convert text already accepted by the pattern into the token's value.
    pub(crate) fn value_from_capture(&self, text: &str) -> Result<Value> {
        let text = if self.unpad {
            self.render_rule.unpad(text, self.value_type.is_numeric())
        } else {
            Cow::Borrowed(text)
        };
        self.value_type
            .from_text(&text)
            .ok_or_else(|| self.conversion_error(&text))
    }

    fn violation(&self, text: String) -> Error {
        Error::ConstraintViolation {
            token: self.name.clone(),
            text,
            description: self.description.clone(),
        }
    }

    fn conversion_error(&self, text: &str) -> Error {
        Error::Conversion {
            token: self.name.clone(),
            text: text.to_string(),
            expected: self.value_type.name().to_string(),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

fn default_rule(value_type: &ValueType) -> RenderRule {
    match value_type {
        ValueType::Text => RenderRule::default().with_kind('s'),
        ValueType::Int => RenderRule::default().with_kind('d'),
        ValueType::Float | ValueType::Custom(_) => RenderRule::default(),
    }
}

/// Longest choices first so a short choice never shadows a longer one.
fn choice_pattern(choices: &[String]) -> String {
    let mut sorted: Vec<&String> = choices.iter().collect();
    sorted.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));
    let alternation: Vec<String> = sorted.iter().map(|c| regex::escape(c)).collect();
    format!("(?:{})", alternation.join("|"))
}

fn quantifier(min: Option<usize>, max: Option<usize>) -> String {
    match (min, max) {
        (Some(min), Some(max)) => format!("{{{},{}}}", min, max),
        (Some(min), None) => format!("{{{},}}", min),
        (None, Some(max)) => format!("{{{},{}}}", max.min(1), max),
        (None, None) => "+".to_string(),
    }
}

fn shorthand_pattern(
    value_type: &ValueType,
    spec: &TokenSpec,
    fill: Option<char>,
) -> std::result::Result<String, String> {
    let bounded = spec.padmin.is_some() || spec.padmax.is_some();
    if !bounded && fill.is_none() && spec.case.is_none() {
        return Ok(value_type.base_pattern().to_string());
    }
    let Some(class) = value_type.char_class() else {
        return Err(format!(
            "padding is not supported for {} tokens",
            value_type.name()
        ));
    };

    let classes = spec.case.map(Case::classes);
    let body = classes.map_or(class, |(_, rest)| rest);
    let fill = fill
        .filter(|&c| !class_contains(body, c))
        .map(|c| regex::escape(&c.to_string()))
        .unwrap_or_default();
    match classes {
        Some((Some(lead), rest)) => {
            let min = spec.padmin.map(|n| n.saturating_sub(1));
            let max = spec.padmax.map(|n| n.saturating_sub(1));
            Ok(format!("[{}][{}{}]{}", lead, rest, fill, quantifier(min, max)))
        }
        Some((None, rest)) => Ok(format!(
            "[{}{}]{}",
            rest,
            fill,
            quantifier(spec.padmin, spec.padmax)
        )),
        None => Ok(format!(
            "[{}{}]{}",
            class,
            fill,
            quantifier(spec.padmin, spec.padmax)
        )),
    }
}

/// Padding must come off on parse without touching the value itself.
fn check_fill(
    value_type: &ValueType,
    case: Option<Case>,
    fill: char,
    align: Align,
) -> std::result::Result<(), String> {
    // Leading zeros never change a number.
    if value_type.is_numeric() && fill == '0' && matches!(align, Align::Right | Align::SignAware) {
        return Ok(());
    }

    let (lead, rest) = match case {
        Some(case) => case.classes(),
        None => (None, value_type.char_class().unwrap_or_default()),
    };
    if lead.into_iter().chain([rest]).any(|class| class_contains(class, fill)) {
        return Err(format!(
            "Padchar {:?} with padalign '{}' cannot be told apart from the value",
            fill,
            align.symbol()
        ));
    }
    if lead.is_some() && align != Align::Left {
        return Err(format!(
            "{} tokens can only be padded with padalign '<'",
            case.map_or("", Case::name)
        ));
    }
    Ok(())
}

/// Whether a bracket-less character class such as `a-zA-Z` contains `c`.
fn class_contains(class: &str, c: char) -> bool {
    let chars: Vec<char> = class.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if i + 2 < chars.len() && chars[i + 1] == '-' {
            if (chars[i]..=chars[i + 2]).contains(&c) {
                return true;
            }
            i += 3;
        } else {
            if chars[i] == c {
                return true;
            }
            i += 1;
        }
    }
    false
}

fn default_description(value_type: &ValueType, spec: &TokenSpec) -> String {
    if !spec.choices.is_empty() {
        return format!("Must be one of: {}", spec.choices.join(", "));
    }

    let size = match (spec.padmin, spec.padmax) {
        (Some(min), Some(max)) if min == max => Some(format!("a {}", min)),
        (Some(min), _) => Some(format!("a minimum {}", min)),
        (None, Some(max)) => Some(format!("a maximum {}", max)),
        (None, None) => None,
    };

    match value_type {
        ValueType::Int => match size {
            Some(size) => format!("Must be {}-digit integer", size),
            None => "Must be an integer".to_string(),
        },
        ValueType::Text => {
            let case = spec
                .case
                .map(|c| format!("{} case ", c.name()))
                .unwrap_or_default();
            match size {
                Some(size) => format!("Must be {}-character {}string", size, case),
                None => format!("Must be a {}string", case),
            }
        }
        ValueType::Float => "Must be a number".to_string(),
        ValueType::Custom(custom) => custom.description(),
    }
}
