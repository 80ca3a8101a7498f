use serde_json::Value;
use tracing::{debug, trace};

use super::context::ExpressionContext;
use super::template::{Template, interpolate_json, value_to_string};
use crate::config::{Condition, Operator};

/// Evaluate a structured predicate against a context.
///
/// Never fails: malformed paths resolve to `null` and unknown operators yield `false`.
pub fn evaluate_condition(condition: &Condition, ctx: &ExpressionContext) -> bool {
    let actual = if condition.field.contains("{{") {
        Template::parse(&condition.field).evaluate(ctx)
    } else {
        ctx.lookup(&condition.field)
    };
    let expected = condition
        .value
        .as_ref()
        .map(|v| interpolate_json(v, ctx))
        .unwrap_or(Value::Null);

    let outcome = compare(condition.operator, &actual, &expected);
    trace!(
        target: "pageflow::condition",
        field = %condition.field,
        operator = ?condition.operator,
        %actual, %expected, outcome,
        "Condition evaluated"
    );
    outcome
}

fn compare(operator: Operator, actual: &Value, expected: &Value) -> bool {
    match operator {
        Operator::Equals => loose_eq(actual, expected),
        Operator::NotEquals => !loose_eq(actual, expected),
        Operator::Contains => contains(actual, expected),
        Operator::NotContains => !contains(actual, expected),
        Operator::StartsWith => value_to_string(actual).starts_with(&value_to_string(expected)),
        Operator::EndsWith => value_to_string(actual).ends_with(&value_to_string(expected)),
        Operator::GreaterThan => ordered(actual, expected, |a, b| a > b),
        Operator::GreaterThanOrEqual => ordered(actual, expected, |a, b| a >= b),
        Operator::LessThan => ordered(actual, expected, |a, b| a < b),
        Operator::LessThanOrEqual => ordered(actual, expected, |a, b| a <= b),
        Operator::IsEmpty => is_empty(actual),
        Operator::IsNotEmpty => !is_empty(actual),
        Operator::IsTrue => truthy(actual),
        Operator::IsFalse => !truthy(actual),
        Operator::Unknown => {
            debug!(target: "pageflow::condition", "Unknown operator; evaluating to false");
            false
        }
    }
}

/// Equal JSON, equal numbers after coercion, or equal string renderings.
fn loose_eq(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
        return x == y;
    }
    match (a, b) {
        (Value::Null, _) | (_, Value::Null) => false,
        _ => value_to_string(a) == value_to_string(b),
    }
}

fn contains(haystack: &Value, needle: &Value) -> bool {
    match haystack {
        Value::Array(items) => items.iter().any(|item| loose_eq(item, needle)),
        Value::Object(map) => map.contains_key(&value_to_string(needle)),
        Value::Null => false,
        other => value_to_string(other).contains(&value_to_string(needle)),
    }
}

fn ordered(a: &Value, b: &Value, cmp: impl Fn(f64, f64) -> bool) -> bool {
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => cmp(x, y),
        _ => false,
    }
}

fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn is_empty(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

pub(crate) fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|x| x != 0.0),
        Value::String(s) => !s.is_empty() && s != "false",
        Value::Array(_) | Value::Object(_) => true,
    }
}
