//! Relation contract
//!
//! A relation is built fresh each time it is resolved and used once:
//! `add_pre_constraints` (embedded kinds only), `add_eager_constraints`,
//! `init_relation`, `get_eager`, then `match_eager`.

use async_trait::async_trait;

use crate::error::RestResult;
use crate::model::{Record, RelationValue};
use crate::query::Descriptor;

#[async_trait]
pub trait Relation: Send + Sync {
    /// Descriptor scoped to the related entity
    fn descriptor(&self) -> &Descriptor;

    /// Whether the related data arrives inline in the parent payload
    fn is_embedded(&self) -> bool {
        false
    }

    /// Mutate the parent's primary request before it is sent
    fn add_pre_constraints(&self, _parent: &mut Descriptor) {}

    /// Constrain the related descriptor using the hydrated parents
    fn add_eager_constraints(&mut self, parents: &[Record]);

    /// Mark the relation as loaded with no value on every parent
    fn init_relation(&self, parents: &mut [Record], name: &str) {
        for parent in parents.iter_mut() {
            parent.set_relation(name, RelationValue::Null);
        }
    }

    /// Fetch the related records for every parent at once
    async fn get_eager(&self) -> RestResult<Vec<Record>>;

    /// Attach fetched records to their parents
    async fn match_eager(
        &self,
        parents: &mut [Record],
        results: Vec<Record>,
        name: &str,
    ) -> RestResult<()>;
}
