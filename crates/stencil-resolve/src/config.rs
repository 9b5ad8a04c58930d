//! Configuration structure consumed by [`crate::TemplateResolver::from_config`].
//!
//! ```json
//! {
//!     "tokens": {
//!         "name": "str",
//!         "version": {"type": "int", "padmin": 3}
//!     },
//!     "templates": {
//!         "shots": {
//!             "base": "{name}_v{version}",
//!             "file": {"type": "path", "string": "/jobs/{@base}.{ext}"}
//!         }
//!     },
//!     "default_template_type": "template"
//! }
//! ```

use crate::error::Result;
use crate::shorthand::TemplateSource;
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use stencil_match::{Align, Case, TokenSpec, Value, ValueType};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResolverConfig {
    #[serde(default)]
    pub tokens: BTreeMap<String, TokenEntry>,

    /// Group name to template name to definition.
    #[serde(default)]
    pub templates: BTreeMap<String, BTreeMap<String, TemplateEntry>>,

    /// Kind used by templates that do not declare a `type`.
    #[serde(default)]
    pub default_template_type: Option<String>,
}

/// A token definition: a bare type name or a full spec.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TokenEntry {
    Alias(String),
    Spec(TokenConfig),
}

impl TokenEntry {
    pub fn into_config(self) -> TokenConfig {
        match self {
            TokenEntry::Alias(kind) => TokenConfig {
                kind,
                ..TokenConfig::default()
            },
            TokenEntry::Spec(config) => config,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenConfig {
    #[serde(rename = "type", default = "default_token_type")]
    pub kind: String,
    #[serde(default, alias = "regex")]
    pub pattern: Option<String>,
    #[serde(default, alias = "format_spec")]
    pub render_rule: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub padmin: Option<i64>,
    #[serde(default)]
    pub padmax: Option<i64>,
    #[serde(default)]
    pub padchar: Option<String>,
    #[serde(default)]
    pub padalign: Option<String>,
    #[serde(default)]
    pub padstrict: Option<bool>,
    /// Strings or numbers.
    #[serde(default)]
    pub choices: Vec<JsonValue>,
    #[serde(default)]
    pub case: Option<String>,
    #[serde(default)]
    pub default: Option<JsonValue>,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            kind: default_token_type(),
            pattern: None,
            render_rule: None,
            description: None,
            padmin: None,
            padmax: None,
            padchar: None,
            padalign: None,
            padstrict: None,
            choices: Vec::new(),
            case: None,
            default: None,
        }
    }
}

fn default_token_type() -> String {
    "str".to_string()
}

impl TokenConfig {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }

    /// Validate the raw values and turn them into a [`TokenSpec`].
    pub fn to_spec(&self, token: &str) -> Result<TokenSpec> {
        let invalid = |reason: String| stencil_match::Error::InvalidTokenSpec {
            token: token.to_string(),
            reason,
        };

        let mut spec = TokenSpec {
            pattern: self.pattern.clone(),
            render_rule: self.render_rule.clone(),
            description: self.description.clone(),
            padstrict: self.padstrict,
            ..TokenSpec::default()
        };

        spec.padmin = self
            .padmin
            .map(|n| {
                usize::try_from(n)
                    .map_err(|_| invalid(format!("Padmin cannot be negative: {}", n)))
            })
            .transpose()?;
        spec.padmax = self
            .padmax
            .map(|n| {
                usize::try_from(n)
                    .map_err(|_| invalid(format!("Padmax cannot be negative: {}", n)))
            })
            .transpose()?;

        if let Some(padchar) = &self.padchar {
            let mut chars = padchar.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => spec.padchar = Some(c),
                _ => {
                    return Err(invalid(format!(
                        "Padchar must be a single character: {:?}",
                        padchar
                    ))
                    .into())
                }
            }
        }

        if let Some(padalign) = &self.padalign {
            let mut chars = padalign.chars();
            spec.padalign = match (chars.next(), chars.next()) {
                (Some(c), None) => Align::from_symbol(c),
                _ => None,
            };
            if spec.padalign.is_none() {
                return Err(invalid(format!("Unknown padalign: {:?}", padalign)).into());
            }
        }

        if let Some(case) = &self.case {
            spec.case = Some(case.parse::<Case>().map_err(&invalid)?);
        }

        spec.choices = self
            .choices
            .iter()
            .map(|choice| match choice {
                JsonValue::String(s) => Ok(s.clone()),
                JsonValue::Number(n) => Ok(n.to_string()),
                other => Err(invalid(format!("Invalid choice: {}", other))),
            })
            .collect::<std::result::Result<Vec<String>, _>>()?;

        spec.default = self
            .default
            .as_ref()
            .map(|value| {
                json_to_value(value).ok_or_else(|| invalid(format!("Invalid default: {}", value)))
            })
            .transpose()?;

        Ok(spec)
    }
}

fn json_to_value(value: &JsonValue) -> Option<Value> {
    match value {
        JsonValue::String(s) => Some(Value::Text(s.clone())),
        JsonValue::Number(n) => n
            .as_i64()
            .map(Value::Int)
            .or_else(|| n.as_f64().map(Value::Float)),
        _ => None,
    }
}

/// The value type named by a token config, among the built-in ones.
pub(crate) fn builtin_value_type(kind: &str) -> Option<ValueType> {
    match kind {
        "str" => Some(ValueType::Text),
        "int" => Some(ValueType::Int),
        "float" => Some(ValueType::Float),
        _ => None,
    }
}

/// A template definition as written in the configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TemplateEntry {
    Shorthand(String),
    Detailed {
        #[serde(rename = "type", default)]
        kind: Option<String>,
        string: String,
        /// Remaining keys, handed to the template constructor.
        #[serde(flatten)]
        extra: Map<String, JsonValue>,
    },
}

impl TemplateEntry {
    pub fn into_definition(self) -> TemplateDefinition {
        match self {
            TemplateEntry::Shorthand(string) => TemplateDefinition::new(string),
            TemplateEntry::Detailed {
                kind,
                string,
                extra,
            } => TemplateDefinition {
                kind,
                source: TemplateSource::Shorthand(string),
                extra,
            },
        }
    }
}

/// Everything needed to build one template.
#[derive(Debug, Clone)]
pub struct TemplateDefinition {
    /// `None` uses the resolver's default kind.
    pub kind: Option<String>,
    pub source: TemplateSource,
    pub extra: Map<String, JsonValue>,
}

impl TemplateDefinition {
    pub fn new(source: impl Into<TemplateSource>) -> Self {
        Self {
            kind: None,
            source: source.into(),
            extra: Map::new(),
        }
    }

    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn extra(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}
