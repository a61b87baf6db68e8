//! Test support
//!
//! [`ScriptedTransport`] answers requests from a route table and records every
//! request it receives, so engine behavior can be asserted without a network.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::connection::{HttpVerb, Transport, TransportError, TransportRequest, TransportResponse};

type Reply = Result<TransportResponse, TransportError>;

#[derive(Debug)]
struct Route {
    verb: HttpVerb,
    path: String,
    query: Vec<(String, String)>,
    replies: VecDeque<Reply>,
}

impl Route {
    fn matches(&self, verb: HttpVerb, path: &str, request: &TransportRequest) -> bool {
        self.verb == verb
            && self.path == path
            && self
                .query
                .iter()
                .all(|pair| request.query.iter().any(|sent| sent == pair))
    }

    // The last reply repeats forever
    fn next_reply(&mut self) -> Reply {
        if self.replies.len() > 1 {
            self.replies.pop_front().unwrap_or_else(not_found)
        } else {
            self.replies.front().cloned().unwrap_or_else(not_found)
        }
    }
}

fn not_found() -> Reply {
    Ok(TransportResponse::new(404, r#"{"message":"Not Found"}"#))
}

/// In-memory transport with canned responses
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<TransportRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `verb path` with `response`. Paths are matched against the url path.
    pub fn route(&self, verb: HttpVerb, path: &str, response: TransportResponse) -> &Self {
        self.push_route(verb, path, &[], vec![Ok(response)])
    }

    /// Like [`route`](Self::route) but only when every `query` pair was sent
    pub fn route_with_query(
        &self,
        verb: HttpVerb,
        path: &str,
        query: &[(&str, &str)],
        response: TransportResponse,
    ) -> &Self {
        self.push_route(verb, path, query, vec![Ok(response)])
    }

    /// Answer successive requests with successive responses
    pub fn route_sequence(&self, verb: HttpVerb, path: &str, responses: Vec<TransportResponse>) -> &Self {
        self.push_route(verb, path, &[], responses.into_iter().map(Ok).collect())
    }

    /// Fail `verb path` below the HTTP level
    pub fn fail(&self, verb: HttpVerb, path: &str, error: TransportError) -> &Self {
        self.push_route(verb, path, &[], vec![Err(error)])
    }

    fn push_route(&self, verb: HttpVerb, path: &str, query: &[(&str, &str)], replies: Vec<Reply>) -> &Self {
        self.routes.lock().push(Route {
            verb,
            path: path.to_string(),
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            replies: replies.into(),
        });
        self
    }

    /// Every request received so far
    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().clone()
    }

    /// Requests received for `verb path`
    pub fn requests_to(&self, verb: HttpVerb, path: &str) -> Vec<TransportRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|request| request.verb == verb && url_path(&request.url) == path)
            .cloned()
            .collect()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn reset_requests(&self) {
        self.requests.lock().clear();
    }
}

fn url_path(url: &str) -> String {
    url::Url::parse(url)
        .map(|parsed| parsed.path().to_string())
        .unwrap_or_else(|_| url.to_string())
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let path = url_path(&request.url);
        self.requests.lock().push(request.clone());

        let mut routes = self.routes.lock();
        // Most specific query match wins
        let route = routes
            .iter_mut()
            .filter(|route| route.matches(request.verb, &path, &request))
            .max_by_key(|route| route.query.len());

        match route {
            Some(route) => route.next_reply(),
            None => not_found(),
        }
    }
}
