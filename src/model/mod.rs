//! Data model: features, properties, segments and snapshots.
//!
//! # Design Decisions
//! - Wire documents and the domain model are separate types; conversion
//!   validates everything up front so evaluation never meets a bad value
//! - Domain entities are immutable and shared through `Arc`
//! - Rules reference resolved segments, so a `Feature` is self-contained

pub mod feature;
pub mod segment;
pub mod snapshot;
pub mod value;

pub use feature::{Feature, Property, SegmentRule};
pub use segment::{Condition, Operator, Segment};
pub use snapshot::{Snapshot, SnapshotDocument};
pub use value::{ConfigValue, DataType};
