//! Connection layer
//!
//! Transport abstraction, the default `reqwest` transport, the request log and
//! the client that ties them to a configured connection.

pub mod client;
pub mod http;
pub mod log;
pub mod transport;

pub use client::{flatten_query, CallOptions, Client};
pub use http::ReqwestTransport;
pub use log::{RequestLog, RequestLogEntry, DEFAULT_LOG_CAPACITY};
pub use transport::{HttpVerb, Transport, TransportError, TransportRequest, TransportResponse};
