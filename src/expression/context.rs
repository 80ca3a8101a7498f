use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::path::{self, FieldPath};
use crate::config::TriggerKind;
use crate::state::{PageInfo, UserInfo};

/// The interaction that produced a dispatch.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EventInfo {
    #[serde(rename = "type")]
    pub kind: Option<TriggerKind>,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub target: Value,
}

/// Outcome of the most recent action, visible as `response.*`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseInfo {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResponseInfo {
    pub fn ok(data: Value, status: Option<u16>) -> Self {
        Self {
            success: true,
            data: Some(data),
            status,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            status: None,
            error: Some(error.into()),
        }
    }
}

/// Read-only snapshot that expressions and conditions are evaluated against.
///
/// Built fresh for every dispatch; actions extend a copy of it (for example with
/// `response`) rather than mutating shared state.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExpressionContext {
    #[serde(default)]
    pub event: EventInfo,
    #[serde(default)]
    pub form: Map<String, Value>,
    #[serde(default)]
    pub page: PageInfo,
    #[serde(default)]
    pub user: UserInfo,
    /// Component id -> current value.
    #[serde(default)]
    pub components: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseInfo>,
}

impl ExpressionContext {
    /// Copy of this context with `response` replaced.
    pub fn with_response(&self, response: ResponseInfo) -> Self {
        let mut next = self.clone();
        next.response = Some(response);
        next
    }

    /// Resolve a parsed path. Unknown roots and missing keys yield `None`.
    pub fn resolve(&self, path: &FieldPath) -> Option<Value> {
        let rest = path.rest();
        match path.root()? {
            "form" => path::walk_map(&self.form, rest),
            "components" => path::walk_map(&self.components, rest),
            "event" => {
                let root = json!({
                    "type": self.event.kind.map(|k| k.as_str()),
                    "value": self.event.value,
                    "target": self.event.target,
                });
                path::walk(&root, rest).cloned()
            }
            "page" => {
                let root = serde_json::to_value(&self.page).ok()?;
                path::walk(&root, rest).cloned()
            }
            "user" => {
                let root = serde_json::to_value(&self.user).ok()?;
                path::walk(&root, rest).cloned()
            }
            "response" => {
                let root = serde_json::to_value(self.response.as_ref()?).ok()?;
                path::walk(&root, rest).cloned()
            }
            _ => None,
        }
    }

    /// Resolve a dotted path string; malformed or missing paths yield `null`.
    pub fn lookup(&self, path: &str) -> Value {
        FieldPath::parse(path)
            .ok()
            .and_then(|p| self.resolve(&p))
            .unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_every_root() {
        let mut ctx = ExpressionContext::default();
        ctx.event.kind = Some(TriggerKind::OnClick);
        ctx.event.target = json!({"id": "btn"});
        ctx.form.insert("q".into(), json!("abc"));
        ctx.page.params.insert("id".into(), json!("17"));
        ctx.page.query.insert("tab".into(), json!("info"));
        ctx.user.email = Some("a@b.c".into());
        ctx.components.insert("table1".into(), json!([1, 2]));

        assert_eq!(ctx.lookup("event.type"), json!("onClick"));
        assert_eq!(ctx.lookup("event.target.id"), json!("btn"));
        assert_eq!(ctx.lookup("form.q"), json!("abc"));
        assert_eq!(ctx.lookup("page.params.id"), json!("17"));
        assert_eq!(ctx.lookup("page.query.tab"), json!("info"));
        assert_eq!(ctx.lookup("user.email"), json!("a@b.c"));
        assert_eq!(ctx.lookup("components.table1[1]"), json!(2));
        assert_eq!(ctx.lookup("response.data"), Value::Null);
        assert_eq!(ctx.lookup("other.thing"), Value::Null);
    }

    #[test]
    fn failed_response_exposes_error() {
        let ctx = ExpressionContext::default().with_response(ResponseInfo::failed("boom"));
        assert_eq!(ctx.lookup("response.success"), json!(false));
        assert_eq!(ctx.lookup("response.error"), json!("boom"));
    }
}
