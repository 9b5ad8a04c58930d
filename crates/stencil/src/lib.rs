//! Define string templates once, then use them to format values into strings
//! and to parse strings back into values.
//!
//! The engine lives in [`stencil_match`]; named registries built from
//! configuration live in [`stencil_resolve`].

pub use stencil_match::{
    Align, Case, CustomType, DebugMatch, Diagnostic, Error, Failure, Fields, FlatSegment,
    FormatOptions, PathTemplate, RenderRule, Result, Segment, Template, Token, TokenSpec, Value,
    ValueType,
};
pub use stencil_resolve::{
    config, parse_shorthand, CustomTemplate, RawSegment, ResolveError, ResolvedTemplate,
    ResolverConfig, TemplateDefinition, TemplateParts, TemplateRef, TemplateResolver,
    TemplateSource, TokenConfig, PATH_KIND, STANDARD_KIND,
};
