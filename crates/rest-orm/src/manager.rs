//! Manager - entry point for queries
//!
//! Owns the configuration, one transport per connection, the response cache
//! and the request log. Cloning is cheap; clones share all of them.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

use crate::cache::{MemoryResponseCache, ResponseCache};
use crate::config::{ConnectionConfig, RestConfig};
use crate::connection::{Client, ReqwestTransport, RequestLog, Transport};
use crate::error::RestResult;
use crate::model::EntityRef;
use crate::query::Descriptor;

#[derive(Clone)]
pub struct RestManager {
    config: Arc<RestConfig>,
    transports: Arc<DashMap<String, Arc<dyn Transport>>>,
    cache: Arc<dyn ResponseCache>,
    log: Arc<RequestLog>,
}

impl fmt::Debug for RestManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestManager")
            .field("config", &self.config)
            .field("transports", &self.transports.len())
            .field("requests", &self.log.len())
            .finish()
    }
}

impl RestManager {
    pub fn new(config: RestConfig) -> Self {
        let cache = MemoryResponseCache::with_max_entries(config.cache_max_entries);
        let log = RequestLog::with_capacity(config.log_capacity);
        Self {
            config: Arc::new(config),
            transports: Arc::new(DashMap::new()),
            cache: Arc::new(cache),
            log: Arc::new(log),
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn ResponseCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_request_log(mut self, log: Arc<RequestLog>) -> Self {
        self.log = log;
        self
    }

    /// Use `transport` for every call on `connection`
    pub fn with_transport(self, connection: &str, transport: Arc<dyn Transport>) -> Self {
        self.transports.insert(connection.to_string(), transport);
        self
    }

    pub fn config(&self) -> &RestConfig {
        &self.config
    }

    pub fn connection_config(&self, connection: Option<&str>) -> RestResult<&ConnectionConfig> {
        self.config.get(connection)
    }

    pub fn cache(&self) -> &Arc<dyn ResponseCache> {
        &self.cache
    }

    pub fn request_log(&self) -> &Arc<RequestLog> {
        &self.log
    }

    /// Transport for `connection`, building a `reqwest` one on first use
    pub fn transport(&self, connection: &str) -> RestResult<Arc<dyn Transport>> {
        if let Some(transport) = self.transports.get(connection) {
            return Ok(transport.value().clone());
        }

        let config = self.config.get(Some(connection))?;
        let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new(config.timeout())?);
        tracing::debug!("Created HTTP transport for rest connection [{}]", connection);

        Ok(self
            .transports
            .entry(connection.to_string())
            .or_insert(transport)
            .value()
            .clone())
    }

    pub fn client(&self, connection: &str) -> RestResult<Client> {
        let config = self.config.get(Some(connection))?;
        Ok(Client::new(self.transport(connection)?, config, self.log.clone()))
    }

    /// Start a query for `entity` on its own connection
    pub fn query(&self, entity: EntityRef) -> RestResult<Descriptor> {
        let connection = entity.connection().map(str::to_string);
        self.query_on(entity, connection.as_deref())
    }

    /// Start a query for `entity` on a specific connection
    pub fn query_on(&self, entity: EntityRef, connection: Option<&str>) -> RestResult<Descriptor> {
        let name = self.config.resolve_name(connection).to_string();
        let config = Arc::new(self.config.get(Some(&name))?.clone());

        let defaults = entity.default_with();
        let mut descriptor = Descriptor::new(self.clone(), entity, name, config);
        descriptor.add_eager_loads(defaults);
        Ok(descriptor)
    }
}
