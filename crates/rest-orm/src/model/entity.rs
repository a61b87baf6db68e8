//! Entity metadata
//!
//! An [`Entity`] describes one remote resource type: its name, endpoint,
//! primary key, connection, casts and relations. Implementations are usually
//! unit structs.

use std::sync::Arc;

use convert_case::{Case, Casing};

use super::casts::CastTable;
use crate::query::Descriptor;
use crate::relationships::RelationRegistry;
use crate::template::default_endpoint;

/// Shared handle to an entity type
pub type EntityRef = Arc<dyn Entity>;

pub trait Entity: Send + Sync + 'static {
    /// Entity name, e.g. `User` or `UserPost`
    fn name(&self) -> &str;

    /// Endpoint template relative to the connection base url
    fn endpoint(&self) -> String {
        default_endpoint(self.name())
    }

    fn key_name(&self) -> &str {
        "id"
    }

    /// Connection name, `None` for the default connection
    fn connection(&self) -> Option<&str> {
        None
    }

    fn casts(&self) -> CastTable {
        CastTable::new()
    }

    fn relations(&self) -> RelationRegistry {
        RelationRegistry::new()
    }

    /// Relation paths eager-loaded on every query
    fn default_with(&self) -> Vec<String> {
        Vec::new()
    }

    /// Whether the API accepts a set of values for one filter parameter
    fn supports_filter_set(&self) -> bool {
        false
    }

    /// Query parameter used to filter on `field`
    fn filter_param(&self, field: &str) -> String {
        format!("filter[{}]", field)
    }

    /// Foreign key other entities use to point at this one
    fn foreign_key(&self) -> String {
        format!("{}_id", self.name().to_case(Case::Snake))
    }

    /// Ask the server to embed `request_name` in the primary response.
    ///
    /// Appends to the `with` list parameter by default.
    fn remote_load(&self, descriptor: &mut Descriptor, request_name: &str) {
        descriptor.append_param_list("with", request_name);
    }
}
