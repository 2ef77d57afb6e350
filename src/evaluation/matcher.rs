//! Segment and condition matching.
//!
//! # Responsibilities
//! - Apply a condition's operator to one entity attribute
//! - Combine conditions with AND semantics (segment)
//! - Combine segments with OR semantics (rule)
//!
//! # Design Decisions
//! - A missing attribute makes the condition false, never an error
//! - Positive operators hold if any expected value matches; negated ones hold
//!   only if none does
//! - Numeric comparisons coerce numeric strings; anything else is a non-match

use std::collections::HashMap;

use serde_json::Value;

use crate::model::{Condition, Operator, Segment, SegmentRule};

/// Attributes describing the entity under evaluation.
pub type EntityAttributes = HashMap<String, Value>;

/// Returns true if the entity satisfies any segment referenced by the rule.
pub fn rule_matches(rule: &SegmentRule, attributes: &EntityAttributes) -> bool {
    rule.segments
        .iter()
        .any(|segment| segment_matches(segment, attributes))
}

/// Returns true if the entity satisfies every condition of the segment.
pub fn segment_matches(segment: &Segment, attributes: &EntityAttributes) -> bool {
    segment
        .conditions
        .iter()
        .all(|condition| condition_matches(condition, attributes))
}

/// Evaluates one condition against the entity attributes.
pub fn condition_matches(condition: &Condition, attributes: &EntityAttributes) -> bool {
    let actual = match attributes.get(&condition.attribute_name) {
        Some(value) => value,
        None => return false,
    };

    let op = condition.operator;
    if op.is_negated() {
        let positive = match op {
            Operator::NotContains => Operator::Contains,
            _ => Operator::Equals,
        };
        !condition
            .values
            .iter()
            .any(|expected| compare(positive, actual, expected))
    } else {
        condition
            .values
            .iter()
            .any(|expected| compare(op, actual, expected))
    }
}

fn compare(op: Operator, actual: &Value, expected: &Value) -> bool {
    match op {
        Operator::Equals | Operator::IsOneOf | Operator::NotEquals | Operator::IsNotOneOf => {
            values_equal(actual, expected)
        }
        Operator::Contains | Operator::NotContains => {
            text_pair(actual, expected).is_some_and(|(a, e)| a.contains(e.as_str()))
        }
        Operator::StartsWith => {
            text_pair(actual, expected).is_some_and(|(a, e)| a.starts_with(e.as_str()))
        }
        Operator::EndsWith => {
            text_pair(actual, expected).is_some_and(|(a, e)| a.ends_with(e.as_str()))
        }
        Operator::GreaterThan => numeric_pair(actual, expected).is_some_and(|(a, e)| a > e),
        Operator::GreaterThanEquals => numeric_pair(actual, expected).is_some_and(|(a, e)| a >= e),
        Operator::LessThan => numeric_pair(actual, expected).is_some_and(|(a, e)| a < e),
        Operator::LessThanEquals => numeric_pair(actual, expected).is_some_and(|(a, e)| a <= e),
    }
}

fn values_equal(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Number(_), _) | (_, Value::Number(_)) => {
            numeric_pair(actual, expected).is_some_and(|(a, e)| a == e)
        }
        _ => match (as_text(actual), as_text(expected)) {
            (Some(a), Some(e)) => a == e,
            _ => false,
        },
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn text_pair(actual: &Value, expected: &Value) -> Option<(String, String)> {
    Some((as_text(actual)?, as_text(expected)?))
}

fn numeric_pair(actual: &Value, expected: &Value) -> Option<(f64, f64)> {
    Some((as_number(actual)?, as_number(expected)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn condition(attribute: &str, operator: Operator, values: Vec<Value>) -> Condition {
        Condition {
            attribute_name: attribute.to_string(),
            operator,
            values,
        }
    }

    fn attrs(pairs: &[(&str, Value)]) -> EntityAttributes {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_missing_attribute_is_false() {
        let empty = EntityAttributes::new();
        for op in [Operator::Equals, Operator::NotEquals, Operator::NotContains, Operator::LessThan] {
            assert!(!condition_matches(&condition("email", op, vec![json!("x")]), &empty));
        }
    }

    #[test]
    fn test_string_operators() {
        let a = attrs(&[("email", json!("alice@example.com"))]);
        assert!(condition_matches(&condition("email", Operator::EndsWith, vec![json!("@example.com")]), &a));
        assert!(condition_matches(&condition("email", Operator::StartsWith, vec![json!("bob"), json!("alice")]), &a));
        assert!(condition_matches(&condition("email", Operator::Contains, vec![json!("example")]), &a));
        assert!(!condition_matches(&condition("email", Operator::NotContains, vec![json!("example")]), &a));
        assert!(condition_matches(&condition("email", Operator::NotEquals, vec![json!("bob@example.com")]), &a));
    }

    #[test]
    fn test_numeric_operators_coerce_strings() {
        let a = attrs(&[("age", json!("42")), ("plan", json!("gold"))]);
        assert!(condition_matches(&condition("age", Operator::GreaterThan, vec![json!(40)]), &a));
        assert!(condition_matches(&condition("age", Operator::LessThanEquals, vec![json!(42)]), &a));
        assert!(condition_matches(&condition("age", Operator::Equals, vec![json!(42.0)]), &a));
        assert!(!condition_matches(&condition("plan", Operator::GreaterThan, vec![json!(1)]), &a));
    }

    #[test]
    fn test_one_of_operators() {
        let a = attrs(&[("country", json!("IN")), ("beta", json!(true))]);
        assert!(condition_matches(&condition("country", Operator::IsOneOf, vec![json!("US"), json!("IN")]), &a));
        assert!(!condition_matches(&condition("country", Operator::IsNotOneOf, vec![json!("US"), json!("IN")]), &a));
        assert!(condition_matches(&condition("beta", Operator::Equals, vec![json!("true")]), &a));
    }

    #[test]
    fn test_segment_requires_all_conditions() {
        let segment = Segment {
            id: "s".into(),
            name: "s".into(),
            conditions: vec![
                condition("country", Operator::Equals, vec![json!("IN")]),
                condition("age", Operator::GreaterThanEquals, vec![json!(18)]),
            ],
        };
        assert!(segment_matches(&segment, &attrs(&[("country", json!("IN")), ("age", json!(30))])));
        assert!(!segment_matches(&segment, &attrs(&[("country", json!("IN"))])));
    }
}
