//! Fetching
//!
//! `get()` runs the full pipeline: pre-relations, the primary fetch, hydration
//! and the post-load relation pass. The primary fetch picks its strategy from
//! the filters: a lone primary key filter becomes per-id object fetches,
//! anything else is one collection call. Descriptors marked `collection_only`
//! always make the collection call.

use futures::future::join_all;
use serde_json::{Map, Value};

use super::builder::Descriptor;
use crate::cache::{cache_key, CachedObject};
use crate::config::Operation;
use crate::connection::{CallOptions, HttpVerb};
use crate::error::{RestError, RestResult};
use crate::model::Record;

impl Descriptor {
    /// Run the query with eager loading
    pub async fn get(mut self) -> RestResult<Vec<Record>> {
        self.apply_pre_relations()?;

        let mut records = self.get_many().await?;
        if let Some(limit) = self.limit {
            records.truncate(limit);
        }

        if !records.is_empty() {
            self.eager_load_relations(&mut records).await?;
        }

        Ok(records)
    }

    pub async fn first(self) -> RestResult<Option<Record>> {
        Ok(self.take(1).get().await?.into_iter().next())
    }

    pub async fn first_or_fail(self) -> RestResult<Record> {
        let entity = self.entity.name().to_string();
        self.first()
            .await?
            .ok_or(RestError::NotFound { entity })
    }

    pub async fn find(self, id: impl Into<Value>) -> RestResult<Option<Record>> {
        let key_name = self.entity.key_name().to_string();
        self.where_eq(key_name, id).first().await
    }

    pub async fn find_or_fail(self, id: impl Into<Value>) -> RestResult<Record> {
        let entity = self.entity.name().to_string();
        self.find(id).await?.ok_or(RestError::NotFound { entity })
    }

    /// Ids to fetch one by one, when the only filter is on the primary key
    fn batch_ids(&self) -> Option<Vec<Value>> {
        if self.collection_only || self.filters.len() != 1 {
            return None;
        }

        match self.filters.get(self.entity.key_name())? {
            Value::Array(ids) => Some(ids.iter().filter(|id| !id.is_null()).cloned().collect()),
            Value::Null => None,
            id => Some(vec![id.clone()]),
        }
    }

    /// Primary fetch without eager loading
    pub async fn get_many(&self) -> RestResult<Vec<Record>> {
        match self.batch_ids() {
            Some(ids) if ids.is_empty() => Ok(Vec::new()),
            Some(mut ids) if ids.len() == 1 => {
                let id = ids.remove(0);
                Ok(self.get_one(id).await?.into_iter().collect())
            }
            Some(ids) => self.get_many_one(ids).await,
            None => self.get_collection().await,
        }
    }

    /// One concurrent object fetch per id; ids that resolve to nothing are dropped
    pub async fn get_many_one(&self, ids: Vec<Value>) -> RestResult<Vec<Record>> {
        let results = join_all(ids.into_iter().map(|id| self.get_one(id))).await;

        let mut records = Vec::new();
        for result in results {
            match result {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!("Dropping [{}] from batch: {}", self.entity.name(), err);
                }
            }
        }

        Ok(records)
    }

    async fn get_collection(&self) -> RestResult<Vec<Record>> {
        let endpoint = self.collection_endpoint();
        let mut query = self.params.clone();
        for (key, value) in &self.filters {
            query.insert(key.clone(), value.clone());
        }

        let client = self.client()?.with_query(query);
        let response = match client
            .call(HttpVerb::Get, &endpoint, CallOptions::new(), &self.request_name("index"))
            .await
        {
            Ok(response) => response,
            Err(err) if err.is_transport() => {
                tracing::warn!("Collection fetch of [{}] failed: {}", self.entity.name(), err);
                return Ok(Vec::new());
            }
            Err(err) => return Err(err),
        };

        if response.body.trim().is_empty() {
            return Ok(Vec::new());
        }

        let body = response.body_json()?;
        let path = self.config.data_variable(Operation::Index, &self.endpoint_name());
        let items = match data_get(&body, path.as_deref()) {
            Value::Array(items) => items,
            object @ Value::Object(_) => vec![object],
            _ => Vec::new(),
        };

        Ok(self.hydrate(items))
    }

    /// Fetch one object, going through the response cache when enabled
    pub async fn get_one(&self, id: impl Into<Value>) -> RestResult<Option<Record>> {
        let id = id.into();
        let Some(endpoint) = self.object_endpoint(&id) else {
            return Ok(None);
        };

        let collection = self.collection_endpoint();
        let client = self.client()?.with_query(self.params.clone());
        let settings = self.config.get_cache();
        let key = cache_key(client.base_url(), &endpoint, &collection);

        let cached = if *settings.get_enabled() {
            match self.manager.cache().get(&key).await {
                Ok(cached) => cached,
                Err(err) => {
                    tracing::warn!("Response cache read failed: {}", err);
                    None
                }
            }
        } else {
            None
        };

        let mut options = CallOptions::new();
        if let Some(cached) = &cached {
            if !*settings.get_check_304() {
                tracing::debug!("Cache hit for {}", endpoint);
                return Ok(Some(self.hydrate_one(cached.object.clone())));
            }
            if let Some(etag) = &cached.etag {
                options = options.header("If-None-Match", etag.clone());
            }
        }

        let response = match client
            .call(HttpVerb::Get, &endpoint, options, &self.request_name("show"))
            .await
        {
            Ok(response) => response,
            Err(err) if err.is_transport() => {
                tracing::warn!("Fetch of {} failed: {}", endpoint, err);
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        if response.status == 304 {
            return Ok(cached.map(|cached| {
                tracing::debug!("{} not modified, using cached object", endpoint);
                self.hydrate_one(cached.object)
            }));
        }

        if response.body.trim().is_empty() {
            return Ok(None);
        }

        let body = response.body_json()?;
        let path = self.config.data_variable(Operation::Show, &self.endpoint_name());
        let object = data_get(&body, path.as_deref());
        if !object.is_object() {
            return Ok(None);
        }

        if *settings.get_enabled() {
            if let Some(etag) = response.header("etag") {
                let entry = CachedObject {
                    etag: Some(etag.to_string()),
                    object: object.clone(),
                };
                match self.manager.cache().put(&key, entry, settings.ttl()).await {
                    Ok(()) => tracing::debug!("Cached {} with etag {}", endpoint, etag),
                    Err(err) => tracing::warn!("Response cache write failed: {}", err),
                }
            }
        }

        Ok(Some(self.hydrate_one(object)))
    }

    /// Build records from raw server objects; non-objects are skipped
    pub fn hydrate(&self, items: Vec<Value>) -> Vec<Record> {
        items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(Record::from_remote(
                    self.entity.as_ref(),
                    &self.connection,
                    map,
                )),
                _ => None,
            })
            .collect()
    }

    fn hydrate_one(&self, object: Value) -> Record {
        let map = match object {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Record::from_remote(self.entity.as_ref(), &self.connection, map)
    }

    /// Unsaved record for this entity on this connection
    pub fn new_record(&self, attributes: Map<String, Value>) -> Record {
        let mut record = Record::for_entity(self.entity.as_ref());
        record.set_connection(self.connection.clone());
        record.fill(attributes);
        record
    }
}

/// Follow a dotted path into a JSON document; `None` returns the whole document.
///
/// Numeric segments index into arrays. A missing segment yields `Null`.
pub fn data_get(value: &Value, path: Option<&str>) -> Value {
    let Some(path) = path.filter(|p| !p.is_empty()) else {
        return value.clone();
    };

    let mut current = value;
    for segment in path.split('.') {
        let next = match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        match next {
            Some(next) => current = next,
            None => return Value::Null,
        }
    }

    current.clone()
}
