//! Descriptor - per-entity query state
//!
//! A descriptor accumulates filters, headers, eager-load paths and endpoint
//! parameters through fluent calls and is consumed by one terminal fetch.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::config::ConnectionConfig;
use crate::connection::Client;
use crate::error::RestResult;
use crate::manager::RestManager;
use crate::model::EntityRef;
use crate::template::{replace_template, value_to_path, TemplateParams};

/// Closure applied to a relation's descriptor when the relation is resolved
pub type Customizer = Arc<dyn Fn(&mut Descriptor) + Send + Sync>;

/// Query builder and eager-load orchestrator for one entity type
#[derive(Clone)]
pub struct Descriptor {
    pub(crate) manager: RestManager,
    pub(crate) entity: EntityRef,
    pub(crate) connection: String,
    pub(crate) config: Arc<ConnectionConfig>,
    pub(crate) path_params: Vec<Value>,
    pub(crate) filters: Map<String, Value>,
    pub(crate) params: Map<String, Value>,
    pub(crate) headers: BTreeMap<String, String>,
    pub(crate) eager_load: Vec<String>,
    pub(crate) customizers: BTreeMap<String, Customizer>,
    pub(crate) limit: Option<usize>,
    /// Send a primary key filter as one collection call instead of per-id fetches
    pub(crate) collection_only: bool,
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("entity", &self.entity.name())
            .field("connection", &self.connection)
            .field("path_params", &self.path_params)
            .field("filters", &self.filters)
            .field("params", &self.params)
            .field("headers", &self.headers)
            .field("eager_load", &self.eager_load)
            .field("limit", &self.limit)
            .field("collection_only", &self.collection_only)
            .finish()
    }
}

impl Descriptor {
    pub(crate) fn new(
        manager: RestManager,
        entity: EntityRef,
        connection: impl Into<String>,
        config: Arc<ConnectionConfig>,
    ) -> Self {
        Self {
            manager,
            entity,
            connection: connection.into(),
            config,
            path_params: Vec::new(),
            filters: Map::new(),
            params: Map::new(),
            headers: BTreeMap::new(),
            eager_load: Vec::new(),
            customizers: BTreeMap::new(),
            limit: None,
            collection_only: false,
        }
    }

    pub fn entity(&self) -> &EntityRef {
        &self.entity
    }

    pub fn connection(&self) -> &str {
        &self.connection
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn manager(&self) -> &RestManager {
        &self.manager
    }

    pub fn filters(&self) -> &Map<String, Value> {
        &self.filters
    }

    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    pub fn header_map(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn eager_loads(&self) -> &[String] {
        &self.eager_load
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn is_collection_only(&self) -> bool {
        self.collection_only
    }

    /// Fetch through the collection endpoint even when the only filter is the
    /// primary key
    pub fn collection_only(mut self) -> Self {
        self.collection_only = true;
        self
    }

    // Filters

    /// Equality filter; the last write for a key wins
    pub fn where_eq(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_where(key, value);
        self
    }

    pub fn where_map(mut self, filters: Map<String, Value>) -> Self {
        for (key, value) in filters {
            self.set_where(key, value);
        }
        self
    }

    /// Set filter: the key must match one of `values`
    pub fn where_in<I, V>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.set_where(key, Value::Array(values));
        self
    }

    pub fn set_where(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.filters.insert(key.into(), value.into());
    }

    // Headers

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers.extend(headers);
        self
    }

    // Endpoint parameters and limits

    /// Path parameters for a nested endpoint template, outermost parent first
    pub fn within<I, V>(mut self, parents: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.path_params = parents.into_iter().map(Into::into).collect();
        self
    }

    /// Keep at most `n` records of the result. Applied after the fetch.
    pub fn take(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Append `value` to a list-valued request parameter, skipping duplicates
    pub fn append_param_list(&mut self, key: &str, value: &str) {
        let entry = self
            .params
            .entry(key.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));

        if !entry.is_array() {
            let existing = entry.take();
            *entry = Value::Array(if existing.is_null() { Vec::new() } else { vec![existing] });
        }

        if let Value::Array(items) = entry {
            if !items.iter().any(|item| item.as_str() == Some(value)) {
                items.push(Value::String(value.to_string()));
            }
        }
    }

    /// Non-filter request parameter
    pub fn set_param(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.params.insert(key.into(), value.into());
    }

    // Endpoints

    /// Collection endpoint with path parameters substituted
    pub fn collection_endpoint(&self) -> String {
        let params = TemplateParams::from_values(&self.path_params);
        replace_template(&self.entity.endpoint(), &params)
    }

    /// Endpoint of one object, `None` when `id` can't be a path segment
    pub fn object_endpoint(&self, id: &Value) -> Option<String> {
        let segment = value_to_path(id)?;
        Some(format!(
            "{}/{}",
            self.collection_endpoint().trim_end_matches('/'),
            segment
        ))
    }

    /// Value substituted for `{endpoint}` in data accessor paths
    pub(crate) fn endpoint_name(&self) -> String {
        let collection = self.collection_endpoint();
        collection
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string()
    }

    /// Operation name used for logging, e.g. `User.index`
    pub(crate) fn request_name(&self, operation: &str) -> String {
        format!("{}.{}", self.entity.name(), operation)
    }

    /// Client for this descriptor's connection, carrying its headers
    pub fn client(&self) -> RestResult<Client> {
        Ok(self
            .manager
            .client(&self.connection)?
            .with_headers(self.headers.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RestConfig;
    use crate::model::Entity;
    use serde_json::json;

    struct OrderLine;

    impl Entity for OrderLine {
        fn name(&self) -> &str {
            "OrderLine"
        }
    }

    fn descriptor() -> Descriptor {
        let config = RestConfig::new("api").connection(
            "api",
            ConnectionConfig::new("https://shop.test/api"),
        );
        RestManager::new(config).query(Arc::new(OrderLine)).unwrap()
    }

    #[test]
    fn test_filters_last_write_wins() {
        let descriptor = descriptor()
            .where_eq("status", "open")
            .where_eq("status", "closed")
            .where_in("id", [1, 2]);

        assert_eq!(descriptor.filters()["status"], json!("closed"));
        assert_eq!(descriptor.filters()["id"], json!([1, 2]));
    }

    #[test]
    fn test_nested_endpoint() {
        let descriptor = descriptor().within([12]);
        assert_eq!(descriptor.collection_endpoint(), "order/12/lines");
        assert_eq!(
            descriptor.object_endpoint(&json!(3)).as_deref(),
            Some("order/12/lines/3")
        );
        assert_eq!(descriptor.endpoint_name(), "lines");
        assert_eq!(descriptor.object_endpoint(&Value::Null), None);
    }

    #[test]
    fn test_append_param_list_deduplicates() {
        let mut descriptor = descriptor();
        descriptor.append_param_list("with", "profile");
        descriptor.append_param_list("with", "tags");
        descriptor.append_param_list("with", "profile");

        assert_eq!(descriptor.params()["with"], json!(["profile", "tags"]));
    }

    #[test]
    fn test_take_is_recorded_not_sent() {
        let descriptor = descriptor().take(2);
        assert_eq!(descriptor.limit(), Some(2));
        assert!(descriptor.filters().is_empty());
        assert!(descriptor.params().is_empty());
    }
}
