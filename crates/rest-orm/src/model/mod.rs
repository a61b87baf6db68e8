//! Model layer
//!
//! - `entity`: per-entity-type metadata trait
//! - `record`: attribute store with dirty tracking and loaded relations
//! - `casts`: per-field attribute casts
//! - `key`: canonical key comparison used when matching relations

pub mod casts;
pub mod entity;
pub mod key;
pub mod record;

pub use casts::{cast_value, CastKind, CastTable};
pub use entity::{Entity, EntityRef};
pub use key::{canonical_key, distinct_keys};
pub use record::{Record, RelationValue};
