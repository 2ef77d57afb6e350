//! Segments and their attribute conditions.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Comparison applied between an entity attribute and a condition's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Operator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    GreaterThan,
    GreaterThanEquals,
    LessThan,
    LessThanEquals,
    IsOneOf,
    IsNotOneOf,
}

impl Operator {
    /// Negated operators hold only when no expected value matches.
    pub fn is_negated(&self) -> bool {
        matches!(
            self,
            Operator::NotEquals | Operator::NotContains | Operator::IsNotOneOf
        )
    }
}

/// A single attribute test inside a segment.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Condition {
    pub attribute_name: String,
    pub operator: Operator,
    #[serde(default)]
    pub values: Vec<Value>,
}

/// A named, reusable set of conditions, matched with AND semantics.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub id: String,
    pub name: String,
    pub conditions: Vec<Condition>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_wire_names() {
        let op: Operator = serde_json::from_str("\"startsWith\"").unwrap();
        assert_eq!(op, Operator::StartsWith);
        let op: Operator = serde_json::from_str("\"isNotOneOf\"").unwrap();
        assert!(op.is_negated());
        assert!(serde_json::from_str::<Operator>("\"matches\"").is_err());
    }
}
