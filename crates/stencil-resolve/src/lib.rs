//! Named tokens and grouped templates built from configuration.
//!
//! Templates are written in a shorthand where `{token}` references a token
//! and `{@template}` or `{@group.template}` references another template.
//! References may point forward; cycles are rejected.
//!
//! ```
//! use serde_json::json;
//! use stencil_resolve::TemplateResolver;
//!
//! let resolver = TemplateResolver::from_config(&json!({
//!     "tokens": {"shot": "str", "version": {"type": "int", "padmin": 3}},
//!     "templates": {
//!         "shots": {
//!             "file": {"type": "path", "string": "{@root}/v{version}.exr"},
//!             "root": "/jobs/{shot}"
//!         }
//!     },
//!     "default_template_type": "path"
//! }))
//! .unwrap();
//!
//! let file = resolver.template("shots", "file").unwrap();
//! let fields = file.parse("/jobs/abc/v012.exr").unwrap();
//! assert_eq!(file.format(&fields).unwrap(), "/jobs/abc/v012.exr");
//! ```

pub mod config;
mod error;
mod resolver;
mod shorthand;

pub use config::{ResolverConfig, TemplateDefinition, TemplateEntry, TokenConfig, TokenEntry};
pub use error::{ResolveError, Result};
pub use resolver::{
    CustomTemplate, ResolvedTemplate, TemplateParts, TemplateResolver, PATH_KIND, STANDARD_KIND,
};
pub use shorthand::{parse_shorthand, RawSegment, TemplateRef, TemplateSource};
