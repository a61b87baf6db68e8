//! Transport client
//!
//! Issues one HTTP verb against an endpoint of a configured connection.
//! Connection-level query parameters and headers are merged with the
//! client's own; the client's values win on conflict.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::log::RequestLog;
use super::transport::{HttpVerb, Transport, TransportRequest, TransportResponse};
use crate::config::ConnectionConfig;
use crate::error::{RestError, RestResult};

/// Per-call body, query and header overrides
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    pub body: Option<Value>,
    pub query: Map<String, Value>,
    pub headers: BTreeMap<String, String>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// HTTP client bound to one connection
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    base_url: String,
    default_query: Map<String, Value>,
    default_headers: BTreeMap<String, String>,
    query: Map<String, Value>,
    headers: BTreeMap<String, String>,
    log: Arc<RequestLog>,
}

impl Client {
    pub fn new(transport: Arc<dyn Transport>, config: &ConnectionConfig, log: Arc<RequestLog>) -> Self {
        Self {
            transport,
            base_url: config.get_base_url().clone(),
            default_query: config.get_query().clone(),
            default_headers: config.get_headers().clone(),
            query: Map::new(),
            headers: BTreeMap::new(),
            log,
        }
    }

    /// Instance-level query parameters
    pub fn with_query(mut self, query: Map<String, Value>) -> Self {
        self.query.extend(query);
        self
    }

    /// Instance-level headers
    pub fn with_headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn log(&self) -> &Arc<RequestLog> {
        &self.log
    }

    pub fn merged_query(&self) -> Map<String, Value> {
        let mut merged = self.default_query.clone();
        for (key, value) in &self.query {
            merged.insert(key.clone(), value.clone());
        }
        merged
    }

    /// Header names compare case-insensitively when merging
    pub fn merged_headers(&self) -> BTreeMap<String, String> {
        let mut merged = self.default_headers.clone();
        for (name, value) in &self.headers {
            merged.retain(|existing, _| !existing.eq_ignore_ascii_case(name));
            merged.insert(name.clone(), value.clone());
        }
        merged
    }

    pub fn url(&self, endpoint: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = endpoint.trim_start_matches('/');
        if path.is_empty() {
            base.to_string()
        } else {
            format!("{}/{}", base, path)
        }
    }

    /// Issue a call. Any status at or above 400 is returned as `RestError::Transport`.
    pub async fn call(
        &self,
        verb: HttpVerb,
        endpoint: &str,
        options: CallOptions,
        name: &str,
    ) -> RestResult<TransportResponse> {
        let mut query = self.merged_query();
        for (key, value) in options.query {
            query.insert(key, value);
        }

        let mut headers = self.merged_headers();
        for (header, value) in options.headers {
            headers.retain(|existing, _| !existing.eq_ignore_ascii_case(&header));
            headers.insert(header, value);
        }

        let request = TransportRequest {
            verb,
            url: self.url(endpoint),
            query: flatten_query(&query),
            headers: headers.into_iter().collect(),
            body: options.body,
        };

        let reference = self.log.start(
            name,
            verb.as_str(),
            &request.url,
            &request.query,
            &request.headers,
            request.body.as_ref(),
        );
        tracing::debug!("rest call #{} [{}] {} {}", reference, name, verb, request.url);

        match self.transport.send(request).await {
            Ok(response) => {
                let elapsed = self.log.finish(reference, i32::from(response.status));
                tracing::debug!(
                    "rest call #{} [{}] finished with {} in {}ms",
                    reference,
                    name,
                    response.status,
                    elapsed.unwrap_or_default()
                );

                if response.is_success() {
                    Ok(response)
                } else {
                    Err(RestError::Transport {
                        status: Some(response.status),
                        message: format!("{} {} returned {}", verb, endpoint, response.status),
                        body: Some(response.body),
                    })
                }
            }
            Err(err) => {
                self.log.finish(reference, -1);
                tracing::debug!("rest call #{} [{}] failed: {}", reference, name, err);

                Err(RestError::Transport {
                    status: None,
                    message: err.to_string(),
                    body: None,
                })
            }
        }
    }
}

/// Flatten a JSON map into query pairs.
///
/// Arrays become `key[]=v`, objects become `key[sub]=v`, nulls are dropped.
pub fn flatten_query(query: &Map<String, Value>) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (key, value) in query {
        flatten_value(key, value, &mut pairs);
    }
    pairs
}

fn flatten_value(key: &str, value: &Value, pairs: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::Bool(b) => pairs.push((key.to_string(), b.to_string())),
        Value::Number(n) => pairs.push((key.to_string(), n.to_string())),
        Value::String(s) => pairs.push((key.to_string(), s.clone())),
        Value::Array(items) => {
            let nested = format!("{}[]", key);
            for item in items {
                flatten_value(&nested, item, pairs);
            }
        }
        Value::Object(map) => {
            for (sub, item) in map {
                flatten_value(&format!("{}[{}]", key, sub), item, pairs);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectionConfigBuilder;
    use crate::testing::ScriptedTransport;
    use serde_json::json;

    fn config() -> ConnectionConfig {
        ConnectionConfigBuilder::new()
            .base_url("https://api.test/v1/".to_string())
            .default_query([("api_key", "secret"), ("lang", "en")])
            .default_headers([("Accept", "application/json")])
            .build_config()
            .expect("Failed to build connection")
    }

    #[test]
    fn test_flatten_query() {
        let query = json!({
            "ids": [1, 2],
            "filter": {"status": "open"},
            "active": true,
            "gone": null,
        });
        let pairs = flatten_query(query.as_object().unwrap());

        assert!(pairs.contains(&("ids[]".to_string(), "1".to_string())));
        assert!(pairs.contains(&("ids[]".to_string(), "2".to_string())));
        assert!(pairs.contains(&("filter[status]".to_string(), "open".to_string())));
        assert!(pairs.contains(&("active".to_string(), "true".to_string())));
        assert!(!pairs.iter().any(|(k, _)| k == "gone"));
    }

    #[test]
    fn test_instance_values_override_defaults() {
        let transport = Arc::new(ScriptedTransport::new());
        let mut instance = Map::new();
        instance.insert("lang".to_string(), json!("fr"));

        let client = Client::new(transport, &config(), Arc::new(RequestLog::new()))
            .with_query(instance)
            .header("accept", "text/plain");

        let query = client.merged_query();
        assert_eq!(query["lang"], json!("fr"));
        assert_eq!(query["api_key"], json!("secret"));

        let headers = client.merged_headers();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("accept").map(String::as_str), Some("text/plain"));
    }

    #[test]
    fn test_url_joining() {
        let client = Client::new(
            Arc::new(ScriptedTransport::new()),
            &config(),
            Arc::new(RequestLog::new()),
        );
        assert_eq!(client.url("/users/1"), "https://api.test/v1/users/1");
        assert_eq!(client.url("users"), "https://api.test/v1/users");
    }

    #[tokio::test]
    async fn test_error_status_fails_and_is_logged() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.route(HttpVerb::Get, "/v1/users/9", TransportResponse::new(404, "missing"));
        let log = Arc::new(RequestLog::new());

        let client = Client::new(transport.clone(), &config(), log.clone());
        let err = client
            .call(HttpVerb::Get, "users/9", CallOptions::new(), "users.show")
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(404));
        let entries = log.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, Some(404));
        assert_eq!(entries[0].name, "users.show");
        assert_eq!(log.pending_total(), 0);

        let sent = transport.requests();
        assert_eq!(sent[0].query_value("api_key"), Some("secret"));
    }

    #[tokio::test]
    async fn test_not_modified_is_a_success() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.route(HttpVerb::Get, "/v1/users/1", TransportResponse::new(304, ""));

        let client = Client::new(transport, &config(), Arc::new(RequestLog::new()));
        let response = client
            .call(HttpVerb::Get, "users/1", CallOptions::new(), "users.show")
            .await
            .unwrap();
        assert_eq!(response.status, 304);
    }
}
