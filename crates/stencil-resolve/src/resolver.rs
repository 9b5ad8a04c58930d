//! Token and template registries with reference resolution.

use crate::config::{builtin_value_type, ResolverConfig, TemplateDefinition, TokenConfig};
use crate::error::{ResolveError, Result};
use crate::shorthand::{RawSegment, TemplateSource};
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use stencil_match::{
    CustomType, Fields, FormatOptions, PathTemplate, Segment, Template, Token, ValueType,
};

pub const STANDARD_KIND: &str = "template";
pub const PATH_KIND: &str = "path";

/// A template built by a caller-registered kind.
pub trait CustomTemplate: fmt::Debug + Send + Sync {
    fn kind(&self) -> &str;

    fn template(&self) -> &Arc<Template>;

    fn as_any(&self) -> &dyn Any;
}

/// A template held by the resolver.
#[derive(Debug, Clone)]
pub enum ResolvedTemplate {
    Standard(Arc<Template>),
    Path(Arc<PathTemplate>),
    Custom(Arc<dyn CustomTemplate>),
}

impl ResolvedTemplate {
    pub fn kind(&self) -> &str {
        match self {
            ResolvedTemplate::Standard(_) => STANDARD_KIND,
            ResolvedTemplate::Path(_) => PATH_KIND,
            ResolvedTemplate::Custom(custom) => custom.kind(),
        }
    }

    pub fn template(&self) -> &Arc<Template> {
        match self {
            ResolvedTemplate::Standard(template) => template,
            ResolvedTemplate::Path(path) => path.template(),
            ResolvedTemplate::Custom(custom) => custom.template(),
        }
    }

    pub fn as_path(&self) -> Option<&PathTemplate> {
        match self {
            ResolvedTemplate::Path(path) => Some(path),
            _ => None,
        }
    }

    pub fn as_custom(&self) -> Option<&Arc<dyn CustomTemplate>> {
        match self {
            ResolvedTemplate::Custom(custom) => Some(custom),
            _ => None,
        }
    }

    pub fn name(&self) -> &str {
        self.template().name()
    }

    pub fn pattern(&self) -> String {
        self.template().pattern()
    }

    pub fn format(&self, fields: &Fields) -> stencil_match::Result<String> {
        self.format_with(fields, &FormatOptions::default())
    }

    pub fn format_with(
        &self,
        fields: &Fields,
        options: &FormatOptions,
    ) -> stencil_match::Result<String> {
        match self {
            ResolvedTemplate::Path(path) => path.format_with(fields, options),
            other => other.template().format_with(fields, options),
        }
    }

    pub fn parse(&self, text: &str) -> stencil_match::Result<Fields> {
        match self {
            ResolvedTemplate::Path(path) => path.parse(text),
            other => other.template().parse(text),
        }
    }

    pub fn extract(&self, text: &str) -> stencil_match::Result<(Fields, usize)> {
        match self {
            ResolvedTemplate::Path(path) => path.extract(text),
            other => other.template().extract(text),
        }
    }

    pub fn parse_debug(&self, text: &str) -> stencil_match::Result<Fields> {
        match self {
            ResolvedTemplate::Path(path) => path.parse_debug(text),
            other => other.template().parse_debug(text),
        }
    }
}

/// What a template constructor receives.
#[derive(Debug)]
pub struct TemplateParts {
    pub kind: String,
    pub group: String,
    pub name: String,
    pub segments: Vec<Segment>,
    /// Extra configuration keys.
    pub extra: Map<String, JsonValue>,
}

type Constructor = dyn Fn(TemplateParts) -> Result<ResolvedTemplate> + Send + Sync;

type Key = (String, String);

enum Visit {
    Enter(Key),
    Exit(Key),
}

/// Registries of tokens and of templates keyed by `(group, name)`.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use stencil_match::Value;
/// use stencil_resolve::TemplateResolver;
///
/// let resolver = TemplateResolver::from_config(&json!({
///     "tokens": {"name": "str", "age": "int", "hobby": "str"},
///     "templates": {
///         "foo": {"intro": "{name} is {age} years old"},
///         "bar": {"extended_intro": "{@foo.intro}. He likes to {hobby}."}
///     }
/// }))
/// .unwrap();
///
/// let template = resolver.template("bar", "extended_intro").unwrap();
/// let fields = template.parse("Tim is 3 years old. He likes to swim.").unwrap();
/// assert_eq!(fields["age"], Value::Int(3));
/// ```
pub struct TemplateResolver {
    tokens: HashMap<String, Arc<Token>>,
    templates: HashMap<String, HashMap<String, ResolvedTemplate>>,
    token_types: HashMap<String, ValueType>,
    kinds: HashMap<String, Arc<Constructor>>,
    default_kind: String,
}

impl Default for TemplateResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TemplateResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateResolver")
            .field("tokens", &self.tokens.keys().collect::<Vec<_>>())
            .field("templates", &self.templates)
            .field("token_types", &self.token_types.keys().collect::<Vec<_>>())
            .field("kinds", &self.kinds.keys().collect::<Vec<_>>())
            .field("default_kind", &self.default_kind)
            .finish()
    }
}

impl TemplateResolver {
    pub fn new() -> Self {
        let token_types = ["str", "int", "float"]
            .into_iter()
            .filter_map(|kind| builtin_value_type(kind).map(|t| (kind.to_string(), t)))
            .collect();

        let mut resolver = Self {
            tokens: HashMap::new(),
            templates: HashMap::new(),
            token_types,
            kinds: HashMap::new(),
            default_kind: STANDARD_KIND.to_string(),
        };
        resolver.register_kind(STANDARD_KIND, |parts| {
            let template = Template::new(parts.name, parts.segments)?;
            Ok(ResolvedTemplate::Standard(Arc::new(template)))
        });
        resolver.register_kind(PATH_KIND, |parts| {
            let path = PathTemplate::new(parts.name, parts.segments)?;
            Ok(ResolvedTemplate::Path(Arc::new(path)))
        });
        resolver
    }

    /// Build a resolver from a configuration value. See [`crate::config`].
    pub fn from_config(config: &JsonValue) -> Result<Self> {
        let mut resolver = Self::new();
        resolver.load(config)?;
        Ok(resolver)
    }

    /// Add the tokens and templates of a configuration value to this resolver.
    pub fn load(&mut self, config: &JsonValue) -> Result<()> {
        let config = ResolverConfig::deserialize(config)?;
        self.load_config(config)
    }

    /// Add everything in `config`, or nothing if any entry fails.
    pub fn load_config(&mut self, config: ResolverConfig) -> Result<()> {
        let tokens = self.tokens.clone();
        let templates = self.templates.clone();
        let default_kind = self.default_kind.clone();

        let loaded = self.load_entries(config);
        if loaded.is_err() {
            self.tokens = tokens;
            self.templates = templates;
            self.default_kind = default_kind;
        }
        loaded
    }

    fn load_entries(&mut self, config: ResolverConfig) -> Result<()> {
        if let Some(kind) = config.default_template_type {
            self.default_kind = kind;
        }

        for (name, entry) in config.tokens {
            self.create_token(&name, &entry.into_config())?;
        }

        let mut pending: HashMap<Key, TemplateDefinition> = HashMap::new();
        let mut order = Vec::new();
        for (group, templates) in config.templates {
            for (name, entry) in templates {
                if self.has_template(&group, &name) {
                    return Err(ResolveError::DuplicateTemplate { group, name });
                }
                let key = (group.clone(), name);
                order.push(key.clone());
                pending.insert(key, entry.into_definition());
            }
        }

        for key in order {
            // Templates referenced earlier are already built.
            if !self.has_template(&key.0, &key.1) {
                self.resolve(key, &mut pending)?;
            }
        }
        Ok(())
    }

    pub fn register_token_type(&mut self, custom: Arc<dyn CustomType>) {
        let name = custom.name().to_string();
        self.token_types.insert(name, ValueType::Custom(custom));
    }

    /// Register a constructor for templates declaring `type: kind`.
    pub fn register_kind<F>(&mut self, kind: impl Into<String>, constructor: F)
    where
        F: Fn(TemplateParts) -> Result<ResolvedTemplate> + Send + Sync + 'static,
    {
        self.kinds.insert(kind.into(), Arc::new(constructor));
    }

    pub fn set_default_kind(&mut self, kind: impl Into<String>) {
        self.default_kind = kind.into();
    }

    pub fn default_kind(&self) -> &str {
        &self.default_kind
    }

    pub fn create_token(&mut self, name: &str, config: &TokenConfig) -> Result<Arc<Token>> {
        if self.tokens.contains_key(name) {
            return Err(ResolveError::DuplicateTokenName(name.to_string()));
        }
        let value_type = self
            .token_types
            .get(&config.kind)
            .cloned()
            .ok_or_else(|| ResolveError::UnknownTokenType {
                token: name.to_string(),
                kind: config.kind.clone(),
            })?;
        let spec = config.to_spec(name)?;
        self.add_token(Token::new(name, value_type, &spec)?)
    }

    /// Register an already built token.
    pub fn add_token(&mut self, token: Token) -> Result<Arc<Token>> {
        if self.tokens.contains_key(token.name()) {
            return Err(ResolveError::DuplicateTokenName(token.name().to_string()));
        }
        tracing::debug!(token = token.name(), pattern = token.pattern(), "registered token");
        let token = Arc::new(token);
        self.tokens
            .insert(token.name().to_string(), Arc::clone(&token));
        Ok(token)
    }

    /// Create a template of the default kind.
    pub fn create_template(
        &mut self,
        group: &str,
        name: &str,
        source: impl Into<TemplateSource>,
    ) -> Result<ResolvedTemplate> {
        self.create_template_with(group, name, TemplateDefinition::new(source))
    }

    /// Create a template from a full definition.
    ///
    /// Referenced templates must already be registered.
    pub fn create_template_with(
        &mut self,
        group: &str,
        name: &str,
        definition: TemplateDefinition,
    ) -> Result<ResolvedTemplate> {
        if self.has_template(group, name) {
            return Err(ResolveError::DuplicateTemplate {
                group: group.to_string(),
                name: name.to_string(),
            });
        }
        let key = (group.to_string(), name.to_string());
        let mut pending = HashMap::from([(key.clone(), definition)]);
        self.resolve(key, &mut pending)
    }

    pub fn template(&self, group: &str, name: &str) -> Result<&ResolvedTemplate> {
        self.templates
            .get(group)
            .and_then(|templates| templates.get(name))
            .ok_or_else(|| ResolveError::UnknownTemplate {
                group: group.to_string(),
                name: name.to_string(),
            })
    }

    pub fn token(&self, name: &str) -> Result<&Arc<Token>> {
        self.tokens
            .get(name)
            .ok_or_else(|| ResolveError::UnknownToken(name.to_string()))
    }

    pub fn has_template(&self, group: &str, name: &str) -> bool {
        self.templates
            .get(group)
            .is_some_and(|templates| templates.contains_key(name))
    }

    pub fn has_token(&self, name: &str) -> bool {
        self.tokens.contains_key(name)
    }

    pub fn tokens(&self) -> impl Iterator<Item = &Arc<Token>> {
        self.tokens.values()
    }

    /// All templates as `(group, name, template)`.
    pub fn templates(&self) -> impl Iterator<Item = (&str, &str, &ResolvedTemplate)> {
        self.templates.iter().flat_map(|(group, templates)| {
            templates
                .iter()
                .map(move |(name, template)| (group.as_str(), name.as_str(), template))
        })
    }

    /// Build `root` and every template it depends on from `pending`.
    ///
    /// Depth-first over an explicit stack; `path` holds the templates whose
    /// dependencies are still being built.
    fn resolve(
        &mut self,
        root: Key,
        pending: &mut HashMap<Key, TemplateDefinition>,
    ) -> Result<ResolvedTemplate> {
        let mut stack = vec![Visit::Enter(root.clone())];
        let mut path: Vec<Key> = Vec::new();
        let mut parsed: HashMap<Key, Vec<RawSegment>> = HashMap::new();

        while let Some(visit) = stack.pop() {
            match visit {
                Visit::Enter(key) => {
                    if self.has_template(&key.0, &key.1) {
                        continue;
                    }
                    if let Some(start) = path.iter().position(|k| *k == key) {
                        let chain = path[start..]
                            .iter()
                            .chain(std::iter::once(&key))
                            .map(|(group, name)| format!("{}.{}", group, name))
                            .collect::<Vec<_>>()
                            .join(" -> ");
                        return Err(ResolveError::CyclicTemplateReference { chain });
                    }
                    let definition = pending.get(&key).ok_or_else(|| {
                        ResolveError::UnknownTemplate {
                            group: key.0.clone(),
                            name: key.1.clone(),
                        }
                    })?;
                    let raw = definition.source.segments()?;

                    stack.push(Visit::Exit(key.clone()));
                    for segment in raw.iter().rev() {
                        if let RawSegment::TemplateRef(reference) = segment {
                            let group = reference.group.clone().unwrap_or_else(|| key.0.clone());
                            tracing::trace!(
                                from = %format!("{}.{}", key.0, key.1),
                                to = %format!("{}.{}", group, reference.name),
                                "following template reference"
                            );
                            stack.push(Visit::Enter((group, reference.name.clone())));
                        }
                    }
                    path.push(key.clone());
                    parsed.insert(key, raw);
                }
                Visit::Exit(key) => {
                    path.pop();
                    let raw = parsed.remove(&key).unwrap_or_default();
                    let definition = pending.remove(&key).ok_or_else(|| {
                        ResolveError::UnknownTemplate {
                            group: key.0.clone(),
                            name: key.1.clone(),
                        }
                    })?;
                    self.build(key, raw, definition)?;
                }
            }
        }

        self.template(&root.0, &root.1).cloned()
    }

    fn build(
        &mut self,
        (group, name): Key,
        raw: Vec<RawSegment>,
        definition: TemplateDefinition,
    ) -> Result<()> {
        let mut segments = Vec::with_capacity(raw.len());
        for segment in raw {
            segments.push(match segment {
                RawSegment::Literal(text) => Segment::Literal(text),
                RawSegment::TokenRef(token) => Segment::Token(Arc::clone(self.token(&token)?)),
                RawSegment::TemplateRef(reference) => {
                    let group = reference.group.as_deref().unwrap_or(&group);
                    let nested = self.template(group, &reference.name)?;
                    Segment::Template(Arc::clone(nested.template()))
                }
            });
        }

        let kind = definition
            .kind
            .unwrap_or_else(|| self.default_kind.clone());
        let constructor = self.kinds.get(&kind).cloned().ok_or_else(|| {
            ResolveError::UnknownTemplateKind {
                template: format!("{}.{}", group, name),
                kind: kind.clone(),
            }
        })?;

        let resolved = constructor(TemplateParts {
            kind,
            group: group.clone(),
            name: name.clone(),
            segments,
            extra: definition.extra,
        })?;
        tracing::debug!(
            group = %group,
            name = %name,
            kind = resolved.kind(),
            pattern = %resolved.pattern(),
            "registered template"
        );
        self.templates.entry(group).or_default().insert(name, resolved);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stencil_match::Value;

    fn resolver(config: JsonValue) -> TemplateResolver {
        TemplateResolver::from_config(&config).unwrap()
    }

    #[test]
    fn test_cross_group_reference() {
        let r = resolver(json!({
            "tokens": {"name": "str", "age": "int", "hobby": "str"},
            "templates": {
                "foo": {"intro": "{name} is {age} years old"},
                "bar": {"extended_intro": "{@foo.intro}. He likes to {hobby}."},
            }
        }));
        let t = r.template("bar", "extended_intro").unwrap();
        let fields = t.parse("Tim is 3 years old. He likes to swim.").unwrap();
        assert_eq!(fields["name"], Value::from("Tim"));
        assert_eq!(fields["age"], Value::Int(3));
        assert_eq!(fields["hobby"], Value::from("swim"));
        assert_eq!(t.pattern(), "{@intro}. He likes to {hobby}.");
    }

    #[test]
    fn test_forward_reference_in_same_group() {
        let r = resolver(json!({
            "tokens": {"name": "str", "ext": "str"},
            "templates": {
                "shots": {
                    "a_file": "{@z_base}.{ext}",
                    "z_base": "{name}",
                }
            }
        }));
        assert!(r.has_template("shots", "z_base"));
        let t = r.template("shots", "a_file").unwrap();
        assert_eq!(t.parse("plate.exr").unwrap()["ext"], Value::from("exr"));
    }

    #[test]
    fn test_cycle_is_reported() {
        let err = TemplateResolver::from_config(&json!({
            "tokens": {"name": "str"},
            "templates": {"g": {"A": "{@B}{name}", "B": "x{@A}"}}
        }))
        .unwrap_err();
        assert!(matches!(
            err,
            ResolveError::CyclicTemplateReference { ref chain } if chain == "g.A -> g.B -> g.A"
        ));
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let err = TemplateResolver::from_config(&json!({
            "templates": {"g": {"A": "a{@A}"}}
        }))
        .unwrap_err();
        assert!(matches!(
            err,
            ResolveError::CyclicTemplateReference { ref chain } if chain == "g.A -> g.A"
        ));
    }

    #[test]
    fn test_unknown_references() {
        let err = TemplateResolver::from_config(&json!({
            "templates": {"g": {"A": "{missing}"}}
        }))
        .unwrap_err();
        assert!(matches!(err, ResolveError::UnknownToken(ref name) if name == "missing"));

        let err = TemplateResolver::from_config(&json!({
            "templates": {"g": {"A": "{@other.B}"}}
        }))
        .unwrap_err();
        assert!(matches!(
            err,
            ResolveError::UnknownTemplate { ref group, ref name } if group == "other" && name == "B"
        ));
    }

    #[test]
    fn test_unknown_symbol() {
        let err = TemplateResolver::from_config(&json!({
            "tokens": {"name": "str"},
            "templates": {"g": {"A": "{!name}"}}
        }))
        .unwrap_err();
        assert!(err.to_string().contains("Unknown token symbol: !"));
    }

    #[test]
    fn test_duplicates() {
        let mut r = TemplateResolver::new();
        r.create_token("name", &TokenConfig::new("str")).unwrap();
        assert!(matches!(
            r.create_token("name", &TokenConfig::new("int")),
            Err(ResolveError::DuplicateTokenName(_))
        ));

        r.create_template("g", "a", "{name}").unwrap();
        assert!(matches!(
            r.create_template("g", "a", "{name}!"),
            Err(ResolveError::DuplicateTemplate { .. })
        ));
        assert!(matches!(
            r.load(&json!({"templates": {"g": {"a": "{name}?"}}})),
            Err(ResolveError::DuplicateTemplate { .. })
        ));
    }

    #[test]
    fn test_failed_load_leaves_resolver_unchanged() {
        let mut r = resolver(json!({
            "tokens": {"name": "str"},
            "templates": {"g": {"a": "{name}"}}
        }));
        let err = r
            .load(&json!({
                "tokens": {"ext": "str"},
                "templates": {"g": {"b": "{name}.{ext}", "c": "{missing}"}},
                "default_template_type": "path",
            }))
            .unwrap_err();
        assert!(matches!(err, ResolveError::UnknownToken(ref name) if name == "missing"));
        assert!(!r.has_token("ext"));
        assert!(!r.has_template("g", "b"));
        assert!(r.has_template("g", "a"));
        assert_eq!(r.default_kind(), STANDARD_KIND);

        r.load(&json!({
            "tokens": {"ext": "str"},
            "templates": {"g": {"b": "{name}.{ext}"}}
        }))
        .unwrap();
        assert!(r.has_template("g", "b"));
    }

    #[test]
    fn test_create_template_needs_registered_references() {
        let mut r = TemplateResolver::new();
        r.create_token("name", &TokenConfig::new("str")).unwrap();
        assert!(matches!(
            r.create_template("g", "b", "{@a}/x"),
            Err(ResolveError::UnknownTemplate { .. })
        ));
        r.create_template("g", "a", "{name}").unwrap();
        let b = r
            .create_template(
                "g",
                "b",
                vec![RawSegment::template("a"), RawSegment::literal("/x")],
            )
            .unwrap();
        assert_eq!(b.parse("abc/x").unwrap()["name"], Value::from("abc"));
    }

    #[test]
    fn test_token_specs_from_config() {
        let r = resolver(json!({
            "tokens": {
                "version": {"type": "int", "padmin": 3},
                "side": {"choices": ["left", "right"]},
                "shot": {"regex": "[a-z]+[0-9]+", "description": "Shot code"},
                "frame": {"type": "int", "format_spec": "04"},
            },
            "templates": {"g": {"file": "{shot}_{side}_v{version}.{frame}"}}
        }));
        assert_eq!(r.token("version").unwrap().pattern(), "[0-9]{3,}");
        assert_eq!(r.token("shot").unwrap().description(), "Shot code");

        let t = r.template("g", "file").unwrap();
        let fields = t.parse("sh010_left_v002.0101").unwrap();
        assert_eq!(fields["shot"], Value::from("sh010"));
        assert_eq!(fields["side"], Value::from("left"));
        assert_eq!(fields["version"], Value::Int(2));
        assert_eq!(fields["frame"], Value::Int(101));
        assert_eq!(t.format(&fields).unwrap(), "sh010_left_v002.0101");
    }

    #[test]
    fn test_invalid_token_config() {
        let err = TemplateResolver::from_config(&json!({
            "tokens": {"version": {"type": "int", "padmin": 3, "padmax": 2}}
        }))
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot build token 'version': Padmax (2) cannot be lower than padmin (3)"
        );

        let err = TemplateResolver::from_config(&json!({
            "tokens": {"version": {"type": "int", "regex": "[0-9]+", "padmin": 3}}
        }))
        .unwrap_err();
        assert!(matches!(
            err,
            ResolveError::Template(stencil_match::Error::ConflictingTokenSpec { .. })
        ));

        let err = TemplateResolver::from_config(&json!({"tokens": {"version": "uint"}}))
            .unwrap_err();
        assert!(matches!(err, ResolveError::UnknownTokenType { .. }));
    }

    #[test]
    fn test_path_kind() {
        let r = resolver(json!({
            "tokens": {"name": "str", "version": {"type": "int", "padmin": 3}},
            "templates": {
                "paths": {
                    "root": {"type": "path", "string": "/jobs/{name}"},
                    "file": {"type": "path", "string": "{@root}/v{version}/file.ext"},
                    "label": "{name}_v{version}",
                }
            }
        }));
        let file = r.template("paths", "file").unwrap();
        assert_eq!(file.kind(), PATH_KIND);
        assert!(file.as_path().is_some());
        assert_eq!(r.template("paths", "label").unwrap().kind(), STANDARD_KIND);

        let fields = file.parse(r"\jobs\abc\v002\file.ext").unwrap();
        assert_eq!(fields["version"], Value::Int(2));
        let (fields, rest) = r
            .template("paths", "root")
            .unwrap()
            .as_path()
            .unwrap()
            .extract_relative("/jobs/abc/v002/file.ext")
            .unwrap();
        assert_eq!(fields["name"], Value::from("abc"));
        assert_eq!(rest, "v002/file.ext");
    }

    #[test]
    fn test_default_template_type() {
        let r = resolver(json!({
            "tokens": {"name": "str"},
            "templates": {"g": {"a": "/x/{name}", "b": {"type": "template", "string": "{name}"}}},
            "default_template_type": "path",
        }));
        assert_eq!(r.template("g", "a").unwrap().kind(), PATH_KIND);
        assert_eq!(r.template("g", "b").unwrap().kind(), STANDARD_KIND);
    }

    #[test]
    fn test_unknown_template_kind() {
        let err = TemplateResolver::from_config(&json!({
            "templates": {"g": {"a": {"type": "sequence", "string": "x"}}}
        }))
        .unwrap_err();
        assert!(matches!(
            err,
            ResolveError::UnknownTemplateKind { ref kind, .. } if kind == "sequence"
        ));
    }

    #[derive(Debug)]
    struct Labelled {
        template: Arc<Template>,
        label: String,
    }

    impl CustomTemplate for Labelled {
        fn kind(&self) -> &str {
            "labelled"
        }

        fn template(&self) -> &Arc<Template> {
            &self.template
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_custom_kind() {
        let mut r = TemplateResolver::new();
        r.register_kind("labelled", |parts| {
            let label = parts
                .extra
                .get("label")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let template = Arc::new(Template::new(parts.name, parts.segments)?);
            Ok(ResolvedTemplate::Custom(Arc::new(Labelled { template, label })))
        });
        r.load(&json!({
            "tokens": {"name": "str"},
            "templates": {"g": {"a": {"type": "labelled", "string": "<{name}>", "label": "Name"}}}
        }))
        .unwrap();

        let t = r.template("g", "a").unwrap();
        assert_eq!(t.kind(), "labelled");
        let labelled = t
            .as_custom()
            .unwrap()
            .as_any()
            .downcast_ref::<Labelled>()
            .unwrap();
        assert_eq!(labelled.label, "Name");
        assert_eq!(t.parse("<abc>").unwrap()["name"], Value::from("abc"));
    }

    #[derive(Debug)]
    struct Hex;

    impl CustomType for Hex {
        fn name(&self) -> &str {
            "hex"
        }

        fn base_pattern(&self) -> &str {
            "[0-9a-f]+"
        }

        fn from_text(&self, text: &str) -> Option<Value> {
            i64::from_str_radix(text, 16).ok().map(Value::Int)
        }

        fn to_text(&self, value: &Value) -> Option<String> {
            value.as_int().map(|n| format!("{:x}", n))
        }
    }

    #[test]
    fn test_custom_token_type() {
        let mut r = TemplateResolver::new();
        r.register_token_type(Arc::new(Hex));
        r.load(&json!({
            "tokens": {"id": "hex"},
            "templates": {"g": {"a": "id-{id}"}}
        }))
        .unwrap();
        let t = r.template("g", "a").unwrap();
        assert_eq!(t.parse("id-ff").unwrap()["id"], Value::Int(255));

        let mut fields = Fields::new();
        fields.insert("id".to_string(), Value::Int(4096));
        assert_eq!(t.format(&fields).unwrap(), "id-1000");
    }

    #[test]
    fn test_iteration() {
        let r = resolver(json!({
            "tokens": {"name": "str"},
            "templates": {"a": {"x": "{name}"}, "b": {"y": "{@a.x}!"}}
        }));
        assert_eq!(r.tokens().count(), 1);
        let mut names: Vec<(&str, &str)> = r.templates().map(|(g, n, _)| (g, n)).collect();
        names.sort();
        assert_eq!(names, vec![("a", "x"), ("b", "y")]);
    }
}
