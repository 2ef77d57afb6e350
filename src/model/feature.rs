//! Features, properties and their segment rules.

use std::sync::Arc;

use crate::model::segment::Segment;
use crate::model::value::{ConfigValue, DataType};

/// An ordered binding of segments to a value.
///
/// Segments are resolved at snapshot build time, so a rule carries everything
/// evaluation needs.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentRule {
    pub order: i64,
    /// Referenced segments, matched with OR semantics.
    pub segments: Vec<Arc<Segment>>,
    /// Percentage of matching entities that receive `value` (0-100).
    pub rollout_percentage: u32,
    pub value: ConfigValue,
}

/// A feature flag.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: String,
    pub name: String,
    pub data_type: DataType,
    pub enabled: bool,
    pub enabled_value: ConfigValue,
    pub disabled_value: ConfigValue,
    /// Sorted by ascending `order`.
    pub segment_rules: Vec<SegmentRule>,
}

/// A configuration property. Properties have no enabled state.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub id: String,
    pub name: String,
    pub data_type: DataType,
    pub value: ConfigValue,
    /// Sorted by ascending `order`.
    pub segment_rules: Vec<SegmentRule>,
}
