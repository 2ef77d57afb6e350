//! Snapshot documents and the validated, immutable snapshot built from them.
//!
//! # Data Flow
//! ```text
//! JSON (remote fetch or local file)
//!     → SnapshotDocument (serde, optional fields defaulted)
//!     → Snapshot::from_document (type checks, segment resolution, rule ordering)
//!     → Snapshot (immutable, shared via Arc)
//! ```

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SnapshotError;
use crate::model::feature::{Feature, Property, SegmentRule};
use crate::model::segment::{Condition, Segment};
use crate::model::value::{ConfigValue, DataType};

/// Rule value placeholder meaning "use the entity's base value".
pub const DEFAULT_VALUE_MARKER: &str = "$default";

/// Top-level document shared by the remote fetch and the local mirror file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SnapshotDocument {
    #[serde(default)]
    pub features: Vec<FeatureDocument>,
    #[serde(default)]
    pub properties: Vec<PropertyDocument>,
    #[serde(default)]
    pub segments: Vec<SegmentDocument>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FeatureDocument {
    pub feature_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: DataType,
    #[serde(default)]
    pub enabled: bool,
    pub enabled_value: Value,
    pub disabled_value: Value,
    #[serde(default)]
    pub segment_rules: Vec<SegmentRuleDocument>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PropertyDocument {
    pub property_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: DataType,
    pub value: Value,
    #[serde(default)]
    pub segment_rules: Vec<SegmentRuleDocument>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SegmentRuleDocument {
    pub order: i64,
    #[serde(default)]
    pub segments: Vec<String>,
    #[serde(default = "default_rollout")]
    pub rollout_percentage: u32,
    pub value: Value,
}

fn default_rollout() -> u32 {
    100
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SegmentDocument {
    pub segment_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub rules: Vec<Condition>,
}

/// One consistent set of features, properties and segments from a single fetch.
///
/// Never patched in place; a refresh builds a new `Snapshot` and swaps it in.
#[derive(Debug, Clone)]
pub struct Snapshot {
    features: HashMap<String, Arc<Feature>>,
    properties: HashMap<String, Arc<Property>>,
    segments: HashMap<String, Arc<Segment>>,
    document: SnapshotDocument,
    fetched_at: DateTime<Utc>,
}

impl Snapshot {
    /// A snapshot with no entities, used before anything has been loaded.
    pub fn empty() -> Self {
        Self {
            features: HashMap::new(),
            properties: HashMap::new(),
            segments: HashMap::new(),
            document: SnapshotDocument::default(),
            fetched_at: Utc::now(),
        }
    }

    /// Validates a document and builds the typed snapshot.
    ///
    /// All-or-nothing: the first inconsistency rejects the whole document.
    pub fn from_document(document: SnapshotDocument) -> Result<Self, SnapshotError> {
        let mut segments = HashMap::with_capacity(document.segments.len());
        for doc in &document.segments {
            if doc.segment_id.is_empty() {
                return Err(SnapshotError::EmptyId { entity: "segment" });
            }
            let segment = Segment {
                id: doc.segment_id.clone(),
                name: doc.name.clone(),
                conditions: doc.rules.clone(),
            };
            insert_unique(&mut segments, "segment", &doc.segment_id, Arc::new(segment))?;
        }

        let mut features = HashMap::with_capacity(document.features.len());
        for doc in &document.features {
            if doc.feature_id.is_empty() {
                return Err(SnapshotError::EmptyId { entity: "feature" });
            }
            let id = &doc.feature_id;
            let enabled_value = typed_value("feature", id, doc.data_type, &doc.enabled_value)?;
            let disabled_value = typed_value("feature", id, doc.data_type, &doc.disabled_value)?;
            let segment_rules = build_rules(
                "feature",
                id,
                doc.data_type,
                &enabled_value,
                &doc.segment_rules,
                &segments,
            )?;
            let feature = Feature {
                id: id.clone(),
                name: doc.name.clone(),
                data_type: doc.data_type,
                enabled: doc.enabled,
                enabled_value,
                disabled_value,
                segment_rules,
            };
            insert_unique(&mut features, "feature", id, Arc::new(feature))?;
        }

        let mut properties = HashMap::with_capacity(document.properties.len());
        for doc in &document.properties {
            if doc.property_id.is_empty() {
                return Err(SnapshotError::EmptyId { entity: "property" });
            }
            let id = &doc.property_id;
            let value = typed_value("property", id, doc.data_type, &doc.value)?;
            let segment_rules = build_rules(
                "property",
                id,
                doc.data_type,
                &value,
                &doc.segment_rules,
                &segments,
            )?;
            let property = Property {
                id: id.clone(),
                name: doc.name.clone(),
                data_type: doc.data_type,
                value,
                segment_rules,
            };
            insert_unique(&mut properties, "property", id, Arc::new(property))?;
        }

        Ok(Self {
            features,
            properties,
            segments,
            document,
            fetched_at: Utc::now(),
        })
    }

    pub fn feature(&self, id: &str) -> Option<&Arc<Feature>> {
        self.features.get(id)
    }

    pub fn features(&self) -> &HashMap<String, Arc<Feature>> {
        &self.features
    }

    pub fn property(&self, id: &str) -> Option<&Arc<Property>> {
        self.properties.get(id)
    }

    pub fn properties(&self) -> &HashMap<String, Arc<Property>> {
        &self.properties
    }

    pub fn segment(&self, id: &str) -> Option<&Arc<Segment>> {
        self.segments.get(id)
    }

    pub fn segments(&self) -> &HashMap<String, Arc<Segment>> {
        &self.segments
    }

    /// The document this snapshot was built from, for mirroring to disk.
    pub fn document(&self) -> &SnapshotDocument {
        &self.document
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty() && self.properties.is_empty() && self.segments.is_empty()
    }
}

fn insert_unique<T>(
    map: &mut HashMap<String, T>,
    entity: &'static str,
    id: &str,
    value: T,
) -> Result<(), SnapshotError> {
    match map.entry(id.to_string()) {
        Entry::Occupied(_) => Err(SnapshotError::DuplicateId {
            entity,
            id: id.to_string(),
        }),
        Entry::Vacant(slot) => {
            slot.insert(value);
            Ok(())
        }
    }
}

fn typed_value(
    entity: &'static str,
    id: &str,
    data_type: DataType,
    raw: &Value,
) -> Result<ConfigValue, SnapshotError> {
    ConfigValue::from_json(data_type, raw).ok_or_else(|| SnapshotError::TypeMismatch {
        entity,
        id: id.to_string(),
        expected: data_type.as_str(),
        value: raw.to_string(),
    })
}

fn build_rules(
    entity: &'static str,
    id: &str,
    data_type: DataType,
    base_value: &ConfigValue,
    docs: &[SegmentRuleDocument],
    segments: &HashMap<String, Arc<Segment>>,
) -> Result<Vec<SegmentRule>, SnapshotError> {
    let mut rules = Vec::with_capacity(docs.len());
    for doc in docs {
        if doc.rollout_percentage > 100 {
            return Err(SnapshotError::RolloutOutOfRange {
                entity,
                id: id.to_string(),
                value: doc.rollout_percentage,
            });
        }

        let value = match &doc.value {
            Value::String(s) if s == DEFAULT_VALUE_MARKER => base_value.clone(),
            raw => typed_value(entity, id, data_type, raw)?,
        };

        let resolved = doc
            .segments
            .iter()
            .filter_map(|segment_id| {
                let found = segments.get(segment_id).cloned();
                if found.is_none() {
                    tracing::warn!(
                        entity,
                        id,
                        segment_id = %segment_id,
                        "Rule references unknown segment; it will never match"
                    );
                }
                found
            })
            .collect();

        rules.push(SegmentRule {
            order: doc.order,
            segments: resolved,
            rollout_percentage: doc.rollout_percentage,
            value,
        });
    }

    // Stable: equal orders keep document position.
    rules.sort_by_key(|rule| rule.order);
    Ok(rules)
}
