//! Relationships
//!
//! Relations are declared per entity in a [`RelationRegistry`] and turned into
//! a [`Relation`] strategy object each time a descriptor resolves them.

pub mod belongs_to;
pub mod comes_with;
pub mod has_many;
pub mod registry;
pub mod traits;

pub use belongs_to::BelongsTo;
pub use comes_with::ComesWith;
pub use has_many::HasMany;
pub use registry::{RelationDefinition, RelationFactory, RelationKind, RelationRegistry};
pub use traits::Relation;

use crate::model::Entity;
use crate::query::Descriptor;

/// Build the strategy for a definition declared on `parent`
pub fn build_relation(
    definition: RelationDefinition,
    parent: &dyn Entity,
    descriptor: Descriptor,
) -> Box<dyn Relation> {
    match definition.kind {
        RelationKind::BelongsTo {
            foreign_key,
            other_key,
        } => Box::new(BelongsTo::new(descriptor, foreign_key, other_key)),
        RelationKind::HasMany {
            foreign_key,
            local_key,
        } => Box::new(HasMany::new(
            descriptor,
            foreign_key.unwrap_or_else(|| parent.foreign_key()),
            local_key.unwrap_or_else(|| parent.key_name().to_string()),
        )),
        RelationKind::ComesWith {
            accessor,
            request_name,
        } => Box::new(ComesWith::one(descriptor, accessor, request_name)),
        RelationKind::ComesWithMany {
            accessor,
            request_name,
        } => Box::new(ComesWith::many(descriptor, accessor, request_name)),
    }
}
