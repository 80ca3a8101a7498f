//! Expression and condition evaluation.
//!
//! Everything here is pure: evaluation reads an [`ExpressionContext`] snapshot and
//! never performs I/O or mutates state. Authoring errors (missing paths, malformed
//! tokens, unknown operators) degrade to `null` / `false` instead of failing.
//!
//! Submodules:
//! - `path`: dotted path parsing (`response.data.items[0].id`) and JSON walking.
//! - `template`: parse-once `{{path}}` templates and recursive JSON interpolation.
//! - `context`: the per-dispatch context snapshot.
//! - `condition`: structured `field <operator> value` predicates.

pub mod condition;
pub mod context;
pub mod path;
pub mod template;

pub use condition::evaluate_condition;
pub(crate) use condition::truthy;
pub use context::{EventInfo, ExpressionContext, ResponseInfo};
pub use path::{FieldPath, PathError, PathSegment};
pub use template::{Template, evaluate, interpolate_json, value_to_string};
