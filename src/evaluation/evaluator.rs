//! Flag and property value resolution.

use crate::error::ValidationError;
use crate::evaluation::bucket::in_rollout;
use crate::evaluation::matcher::{rule_matches, EntityAttributes};
use crate::model::{ConfigValue, Feature, Property, SegmentRule};

/// Why a particular value was produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvaluationReason {
    /// The feature is disabled.
    Disabled,
    /// The rule with this order matched and the entity is inside its rollout.
    RuleMatch { order: i64 },
    /// The rule with this order matched but the entity is outside its rollout.
    RolloutExcluded { order: i64 },
    /// No rule matched.
    Default,
}

/// A resolved value together with the reason it was chosen.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub value: ConfigValue,
    pub reason: EvaluationReason,
}

/// Resolves a feature's value for an entity.
pub fn evaluate_feature(
    feature: &Feature,
    entity_id: &str,
    attributes: &EntityAttributes,
) -> Result<ConfigValue, ValidationError> {
    evaluate_feature_detailed(feature, entity_id, attributes).map(|e| e.value)
}

/// Resolves a feature's value and reports which path produced it.
///
/// The evaluation order is:
/// 1. Reject an empty entity id
/// 2. Disabled features yield `disabled_value` without consulting rules
/// 3. Rules in ascending order; the first matching rule decides
/// 4. Entities outside a matching rule's rollout get `enabled_value`
/// 5. No match yields `enabled_value`
pub fn evaluate_feature_detailed(
    feature: &Feature,
    entity_id: &str,
    attributes: &EntityAttributes,
) -> Result<Evaluation, ValidationError> {
    if entity_id.is_empty() {
        return Err(ValidationError::EmptyEntityId);
    }

    if !feature.enabled {
        return Ok(Evaluation {
            value: feature.disabled_value.clone(),
            reason: EvaluationReason::Disabled,
        });
    }

    Ok(resolve_rules(
        &feature.segment_rules,
        &feature.id,
        entity_id,
        attributes,
        &feature.enabled_value,
    ))
}

/// Resolves a property's value for an entity.
pub fn evaluate_property(
    property: &Property,
    entity_id: &str,
    attributes: &EntityAttributes,
) -> Result<ConfigValue, ValidationError> {
    evaluate_property_detailed(property, entity_id, attributes).map(|e| e.value)
}

/// Resolves a property's value; the property `value` plays the role of the
/// enabled value.
pub fn evaluate_property_detailed(
    property: &Property,
    entity_id: &str,
    attributes: &EntityAttributes,
) -> Result<Evaluation, ValidationError> {
    if entity_id.is_empty() {
        return Err(ValidationError::EmptyEntityId);
    }

    Ok(resolve_rules(
        &property.segment_rules,
        &property.id,
        entity_id,
        attributes,
        &property.value,
    ))
}

fn resolve_rules(
    rules: &[SegmentRule],
    rollout_key: &str,
    entity_id: &str,
    attributes: &EntityAttributes,
    base: &ConfigValue,
) -> Evaluation {
    let matched = rules.iter().find(|rule| rule_matches(rule, attributes));

    match matched {
        Some(rule) if in_rollout(entity_id, rollout_key, rule.rollout_percentage) => Evaluation {
            value: rule.value.clone(),
            reason: EvaluationReason::RuleMatch { order: rule.order },
        },
        // The rollout remainder resolves to the base value, not the next rule.
        Some(rule) => Evaluation {
            value: base.clone(),
            reason: EvaluationReason::RolloutExcluded { order: rule.order },
        },
        None => Evaluation {
            value: base.clone(),
            reason: EvaluationReason::Default,
        },
    }
}
