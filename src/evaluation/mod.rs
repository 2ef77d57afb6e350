//! Segment evaluation.
//!
//! # Data Flow
//! ```text
//! (feature, entity id, attributes)
//!     → evaluator.rs (enabled check, ordered rules)
//!     → matcher.rs (rule → segments OR → conditions AND)
//!     → bucket.rs (rollout percentage)
//!     → value
//! ```
//!
//! # Design Decisions
//! - Pure functions over immutable entities; safe from any number of readers
//! - No I/O and no reach-back into the cache

pub mod bucket;
pub mod evaluator;
pub mod matcher;

pub use bucket::{in_rollout, rollout_bucket};
pub use evaluator::{
    evaluate_feature, evaluate_feature_detailed, evaluate_property, evaluate_property_detailed,
    Evaluation, EvaluationReason,
};
pub use matcher::EntityAttributes;
