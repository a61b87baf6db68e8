//! Connection configuration
//!
//! Loaded from YAML or JSON, or built programmatically.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use service_builder::builder;

use crate::cache::DEFAULT_MAX_ENTRIES;
use crate::connection::{HttpVerb, DEFAULT_LOG_CAPACITY};
use crate::error::{RestError, RestResult};
use crate::template::{replace_template, TemplateParams};

/// Response cache settings for a connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[builder]
pub struct CacheSettings {
    #[builder(default, getter)]
    pub enabled: bool,

    /// Entry lifetime in minutes
    #[builder(default = "1", getter)]
    pub lifetime: u64,

    /// Revalidate cached entries with `If-None-Match`
    #[builder(default, getter)]
    pub check_304: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            lifetime: 1,
            check_304: false,
        }
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.get_lifetime() * 60)
    }
}

impl CacheSettingsBuilder {
    pub fn enabled_for(self, minutes: u64) -> Self {
        self.enabled(true).lifetime(minutes)
    }

    pub fn build_settings(self) -> RestResult<CacheSettings> {
        self.build_with_defaults()
            .map_err(|err| RestError::Configuration(format!("Invalid cache settings: {:?}", err)))
    }
}

/// The operations a data accessor path can be configured for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Index,
    Show,
    Store,
    Update,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Index => "index",
            Operation::Show => "show",
            Operation::Store => "store",
            Operation::Update => "update",
        }
    }
}

/// Dotted path into a response body where the payload lives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataVariables {
    Single(String),
    PerOperation(BTreeMap<String, String>),
}

impl DataVariables {
    /// The path for `operation`, falling back to `*`
    pub fn for_operation(&self, operation: Operation) -> Option<&str> {
        match self {
            DataVariables::Single(path) => Some(path.as_str()),
            DataVariables::PerOperation(map) => map
                .get(operation.as_str())
                .or_else(|| map.get("*"))
                .map(String::as_str),
        }
    }
}

/// One remote API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[builder]
pub struct ConnectionConfig {
    #[builder(getter)]
    pub base_url: String,

    /// Query parameters sent with every call
    #[serde(default)]
    #[builder(default, getter)]
    pub query: Map<String, Value>,

    #[serde(default)]
    #[builder(default, getter)]
    pub headers: BTreeMap<String, String>,

    #[serde(default)]
    #[builder(default)]
    pub variables: Option<DataVariables>,

    #[serde(default)]
    #[builder(default, getter)]
    pub cache: CacheSettings,

    #[serde(default = "default_update_verb")]
    #[builder(default = "HttpVerb::Put", getter)]
    pub update_verb: HttpVerb,

    #[serde(default)]
    #[builder(default)]
    pub timeout_secs: Option<u64>,
}

fn default_update_verb() -> HttpVerb {
    HttpVerb::Put
}

impl ConnectionConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            query: Map::new(),
            headers: BTreeMap::new(),
            variables: None,
            cache: CacheSettings::default(),
            update_verb: default_update_verb(),
            timeout_secs: None,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Accessor path for `operation`, with `{endpoint}` substituted
    pub fn data_variable(&self, operation: Operation, endpoint: &str) -> Option<String> {
        let path = self.variables.as_ref()?.for_operation(operation)?;
        let params = TemplateParams::new().with("endpoint", endpoint);
        let resolved = replace_template(path, &params);
        if resolved.is_empty() {
            None
        } else {
            Some(resolved)
        }
    }
}

// Convenience methods on the generated builder
impl ConnectionConfigBuilder {
    pub fn default_query<K, V>(self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.query(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    pub fn default_headers<K, V>(self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.headers(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    pub fn data_path(self, path: &str) -> Self {
        self.variables(Some(DataVariables::Single(path.to_string())))
    }

    pub fn data_paths(self, paths: BTreeMap<String, String>) -> Self {
        self.variables(Some(DataVariables::PerOperation(paths)))
    }

    pub fn cached(self, lifetime_minutes: u64, check_304: bool) -> Self {
        self.cache(CacheSettings {
            enabled: true,
            lifetime: lifetime_minutes,
            check_304,
        })
    }

    pub fn timeout_seconds(self, seconds: u64) -> Self {
        self.timeout_secs(Some(seconds))
    }

    pub fn build_config(self) -> RestResult<ConnectionConfig> {
        self.build_with_defaults()
            .map_err(|err| RestError::Configuration(format!("Invalid connection: {:?}", err)))
    }
}

/// Top-level configuration: every named connection plus the default name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestConfig {
    #[serde(default = "default_connection_name")]
    pub default: String,
    #[serde(default)]
    pub connections: BTreeMap<String, ConnectionConfig>,
    /// Entries kept by the request log (0 = unlimited)
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
    /// Entries kept by the default response cache (`None` = unlimited)
    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: Option<usize>,
}

fn default_connection_name() -> String {
    "default".to_string()
}

fn default_log_capacity() -> usize {
    DEFAULT_LOG_CAPACITY
}

fn default_cache_max_entries() -> Option<usize> {
    Some(DEFAULT_MAX_ENTRIES)
}

impl Default for RestConfig {
    fn default() -> Self {
        Self::new(default_connection_name())
    }
}

impl RestConfig {
    pub fn new(default: impl Into<String>) -> Self {
        Self {
            default: default.into(),
            connections: BTreeMap::new(),
            log_capacity: default_log_capacity(),
            cache_max_entries: default_cache_max_entries(),
        }
    }

    pub fn connection(mut self, name: impl Into<String>, config: ConnectionConfig) -> Self {
        self.connections.insert(name.into(), config);
        self
    }

    pub fn from_yaml_str(source: &str) -> RestResult<Self> {
        let config: RestConfig = serde_yaml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_value(value: Value) -> RestResult<Self> {
        let config: RestConfig =
            serde_json::from_value(value).map_err(|e| RestError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> RestResult<()> {
        if !self.connections.contains_key(&self.default) {
            return Err(RestError::Configuration(format!(
                "Default connection [{}] is not configured",
                self.default
            )));
        }

        for (name, connection) in &self.connections {
            url::Url::parse(connection.get_base_url()).map_err(|e| {
                RestError::Configuration(format!("Invalid base url for [{}]: {}", name, e))
            })?;
        }

        Ok(())
    }

    /// Look up a connection. `None` selects the default one.
    pub fn get(&self, name: Option<&str>) -> RestResult<&ConnectionConfig> {
        let name = name.unwrap_or(self.default.as_str());
        self.connections
            .get(name)
            .ok_or_else(|| RestError::MissingConfiguration {
                connection: name.to_string(),
            })
    }

    pub fn resolve_name<'a>(&'a self, name: Option<&'a str>) -> &'a str {
        name.unwrap_or(self.default.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const YAML: &str = r#"
default: api
connections:
  api:
    base_url: https://example.test/v1/
    query: { api_key: secret }
    headers: { Accept: application/json }
    variables: { index: data, show: "data.{endpoint:singular}", "*": data }
    cache: { enabled: true, lifetime: 5, check_304: true }
    update_verb: patch
    timeout_secs: 30
  legacy:
    base_url: http://legacy.test
"#;

    #[test]
    fn test_yaml_config() {
        let config = RestConfig::from_yaml_str(YAML).unwrap();
        let api = config.get(None).unwrap();

        assert_eq!(api.query["api_key"], json!("secret"));
        assert_eq!(api.update_verb, HttpVerb::Patch);
        assert_eq!(api.cache.ttl(), Duration::from_secs(300));
        assert!(api.cache.check_304);
        assert_eq!(api.timeout(), Some(Duration::from_secs(30)));

        let legacy = config.get(Some("legacy")).unwrap();
        assert_eq!(legacy.update_verb, HttpVerb::Put);
        assert!(!legacy.cache.enabled);
        assert_eq!(legacy.cache.lifetime, 1);
    }

    #[test]
    fn test_data_variable_per_operation_with_fallback() {
        let config = RestConfig::from_yaml_str(YAML).unwrap();
        let api = config.get(None).unwrap();

        assert_eq!(api.data_variable(Operation::Index, "users").as_deref(), Some("data"));
        assert_eq!(api.data_variable(Operation::Show, "users").as_deref(), Some("data.user"));
        assert_eq!(api.data_variable(Operation::Store, "users").as_deref(), Some("data"));

        let legacy = config.get(Some("legacy")).unwrap();
        assert_eq!(legacy.data_variable(Operation::Index, "users"), None);
    }

    #[test]
    fn test_missing_connection() {
        let config = RestConfig::from_yaml_str(YAML).unwrap();
        let err = config.get(Some("billing")).unwrap_err();
        assert!(matches!(err, RestError::MissingConfiguration { connection } if connection == "billing"));
    }

    #[test]
    fn test_validation() {
        let err = RestConfig::from_json_value(json!({
            "default": "api",
            "connections": {"other": {"base_url": "https://x.test"}}
        }))
        .unwrap_err();
        assert!(matches!(err, RestError::Configuration(_)));

        let err = RestConfig::from_json_value(json!({
            "default": "api",
            "connections": {"api": {"base_url": "not a url"}}
        }))
        .unwrap_err();
        assert!(matches!(err, RestError::Configuration(_)));
    }

    #[test]
    fn test_builder() {
        let connection = ConnectionConfigBuilder::new()
            .base_url("https://example.test".to_string())
            .data_path("data")
            .cached(10, false)
            .update_verb(HttpVerb::Patch)
            .default_headers([("Accept", "application/json")])
            .build_config()
            .expect("Failed to build connection");
        let config = RestConfig::new("api").connection("api", connection);

        assert!(config.validate().is_ok());
        let api = config.get(None).unwrap();
        assert!(api.cache.enabled);
        assert_eq!(*api.get_update_verb(), HttpVerb::Patch);
        assert_eq!(api.get_base_url(), "https://example.test");
        assert_eq!(api.headers["Accept"], "application/json");
        assert_eq!(api.timeout(), None);
        assert_eq!(api.data_variable(Operation::Update, "x").as_deref(), Some("data"));
    }

    #[test]
    fn test_builder_defaults_match_serde_defaults() {
        let built = ConnectionConfigBuilder::new()
            .base_url("https://example.test".to_string())
            .build_config()
            .expect("Failed to build connection");
        let parsed: ConnectionConfig =
            serde_json::from_value(json!({"base_url": "https://example.test"})).unwrap();

        assert_eq!(built, parsed);
        assert_eq!(built, ConnectionConfig::new("https://example.test"));
    }

    #[test]
    fn test_cache_settings_builder() {
        let settings = CacheSettingsBuilder::new()
            .enabled_for(15)
            .check_304(true)
            .build_settings()
            .expect("Failed to build cache settings");

        assert!(settings.enabled);
        assert!(settings.check_304);
        assert_eq!(settings.ttl(), Duration::from_secs(900));
        assert_eq!(CacheSettings::default().ttl(), Duration::from_secs(60));
    }

    #[test]
    fn test_store_limits() {
        let config = RestConfig::from_yaml_str(YAML).unwrap();
        assert_eq!(config.log_capacity, DEFAULT_LOG_CAPACITY);
        assert_eq!(config.cache_max_entries, Some(DEFAULT_MAX_ENTRIES));

        let config = RestConfig::from_json_value(json!({
            "default": "api",
            "log_capacity": 10,
            "cache_max_entries": null,
            "connections": {"api": {"base_url": "https://x.test"}}
        }))
        .unwrap();
        assert_eq!(config.log_capacity, 10);
        assert_eq!(config.cache_max_entries, None);
    }
}
