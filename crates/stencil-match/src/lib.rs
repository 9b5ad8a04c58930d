//! Bidirectional string templates.
//!
//! A [`Template`] is a sequence of literal text, typed [`Token`]s and nested
//! templates. The same template formats field values into a string and parses
//! a string back into field values.
//!
//! # Example
//!
//! ```
//! use stencil_match::{Fields, Template, Token, TokenSpec, Value, ValueType};
//!
//! let version = Token::new("version", ValueType::Int, &TokenSpec::new().padmin(3)).unwrap();
//! let template = Template::new(
//!     "report",
//!     vec![Token::text("name").into(), "_v".into(), version.into()],
//! )
//! .unwrap();
//!
//! let fields = template.parse("report_v001").unwrap();
//! assert_eq!(fields["name"], Value::from("report"));
//! assert_eq!(fields["version"], Value::Int(1));
//!
//! let mut fields = Fields::new();
//! fields.insert("name".to_string(), Value::from("report"));
//! fields.insert("version".to_string(), Value::Int(12));
//! assert_eq!(template.format(&fields).unwrap(), "report_v012");
//!
//! // Failures can be located precisely.
//! let year = Template::new("year", vec!["Year: ".into(), Token::int("year").into()]).unwrap();
//! let err = year.parse_debug("Year: Friday").unwrap_err();
//! assert!(err.to_string().starts_with("Token 'year' does not match"));
//! ```

mod debug;
mod error;
mod path;
mod render;
mod template;
mod token;
mod value;

pub use debug::{DebugMatch, Diagnostic, Failure};
pub use error::{Error, Result};
pub use path::PathTemplate;
pub use render::{Align, RenderRule};
pub use template::{FlatSegment, FormatOptions, Segment, Template};
pub use token::{Case, Token, TokenSpec};
pub use value::{CustomType, Fields, Value, ValueType};
