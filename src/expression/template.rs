use schemars::{JsonSchema, Schema, SchemaGenerator};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::borrow::Cow;
use std::fmt::{Display, Formatter};
use tracing::debug;

use super::context::ExpressionContext;
use super::path::FieldPath;

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    /// `None` when the placeholder body is not a valid path; it resolves to null.
    Placeholder(Option<FieldPath>),
}

/// A template string compiled once into literal and placeholder segments.
///
/// Supported token format: `{{ dotted.path }}` (whitespace around the path is ignored).
///
/// Evaluation rules:
/// - A template that is exactly one placeholder returns the resolved JSON value
///   unchanged (numbers stay numbers, objects stay objects).
/// - Mixed templates render each placeholder as text and return a string.
/// - Missing paths resolve to `null` (or an empty string inside mixed text).
/// - An unterminated `{{` or an empty `{{}}` is kept as literal text.
#[derive(Debug, Clone)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(source: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut idx = 0;

        while let Some(offset) = source[idx..].find("{{") {
            let start = idx + offset;
            literal.push_str(&source[idx..start]);

            let content_start = start + 2;
            let Some(end_offset) = source[content_start..].find("}}") else {
                // No matching end: the rest is plain text.
                literal.push_str(&source[start..]);
                idx = source.len();
                break;
            };
            let end = content_start + end_offset;
            let token = source[content_start..end].trim();

            if token.is_empty() {
                literal.push_str(&source[start..end + 2]);
            } else {
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                let path = match FieldPath::parse(token) {
                    Ok(path) => Some(path),
                    Err(err) => {
                        debug!(target: "pageflow::expression", %token, error = %err, "Invalid placeholder path");
                        None
                    }
                };
                segments.push(Segment::Placeholder(path));
            }
            idx = end + 2;
        }

        if idx < source.len() {
            literal.push_str(&source[idx..]);
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Self {
            source: source.to_string(),
            segments,
        }
    }

    /// The original template text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether the template contains at least one placeholder.
    pub fn is_dynamic(&self) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, Segment::Placeholder(_)))
    }

    /// Evaluate against a context, preserving type for single-placeholder templates.
    pub fn evaluate(&self, ctx: &ExpressionContext) -> Value {
        match self.segments.as_slice() {
            [] => Value::String(String::new()),
            [Segment::Placeholder(path)] => resolve(path.as_ref(), ctx),
            _ if !self.is_dynamic() => Value::String(self.source.clone()),
            _ => Value::String(self.render(ctx)),
        }
    }

    /// Evaluate and always produce text.
    pub fn render(&self, ctx: &ExpressionContext) -> String {
        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(path) => {
                    out.push_str(&value_to_string(&resolve(path.as_ref(), ctx)))
                }
            }
        }
        out
    }
}

fn resolve(path: Option<&FieldPath>, ctx: &ExpressionContext) -> Value {
    path.and_then(|p| ctx.resolve(p)).unwrap_or(Value::Null)
}

impl PartialEq for Template {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Display for Template {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

impl From<&str> for Template {
    fn from(source: &str) -> Self {
        Template::parse(source)
    }
}

impl From<String> for Template {
    fn from(source: String) -> Self {
        Template::parse(&source)
    }
}

impl Serialize for Template {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for Template {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Ok(Template::parse(&source))
    }
}

impl JsonSchema for Template {
    fn inline_schema() -> bool {
        true
    }

    fn schema_name() -> Cow<'static, str> {
        "Template".into()
    }

    fn json_schema(generator: &mut SchemaGenerator) -> Schema {
        String::json_schema(generator)
    }
}

/// Evaluate a template string against a context.
pub fn evaluate(template: &str, ctx: &ExpressionContext) -> Value {
    Template::parse(template).evaluate(ctx)
}

/// Evaluate every string leaf of a JSON structure as a template (recursively).
///
/// - Strings are evaluated with type preservation, so `"{{event.value}}"` may become a number.
/// - Arrays and objects are traversed recursively.
/// - Other types are returned unchanged.
pub fn interpolate_json(value: &Value, ctx: &ExpressionContext) -> Value {
    match value {
        Value::String(s) if s.contains("{{") => evaluate(s, ctx),
        Value::Array(arr) => Value::Array(arr.iter().map(|v| interpolate_json(v, ctx)).collect()),
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k.clone(), interpolate_json(v, ctx));
            }
            Value::Object(out)
        }
        _ => value.clone(),
    }
}

/// Convert a JSON value to a user-friendly string:
/// - Strings are returned as-is.
/// - `null` renders as an empty string.
/// - Numbers/bools are rendered via to_string().
/// - Arrays/objects are serialized as compact JSON.
pub fn value_to_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
