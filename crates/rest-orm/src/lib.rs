//! # elif-rest-orm: Remote models for elif.rs
//!
//! Eloquent-style entities, relationships and eager loading over remote
//! HTTP/JSON APIs. A query like "users with posts.comments and profile" is
//! turned into a sequence of HTTP calls, batched and cached where possible,
//! and the responses are stitched into an in-memory record graph.
//!
//! ```no_run
//! use std::sync::Arc;
//! use elif_rest_orm::prelude::*;
//!
//! struct User;
//! struct Post;
//!
//! impl Entity for User {
//!     fn name(&self) -> &str { "User" }
//!
//!     fn relations(&self) -> RelationRegistry {
//!         RelationRegistry::new().has_many("posts", Arc::new(Post))
//!     }
//! }
//!
//! impl Entity for Post {
//!     fn name(&self) -> &str { "Post" }
//! }
//!
//! # async fn run() -> RestResult<()> {
//! let config = RestConfig::from_yaml_str(
//!     "default: api\nconnections:\n  api:\n    base_url: https://example.test/v1\n",
//! )?;
//! let manager = RestManager::new(config);
//!
//! let users = manager
//!     .query(Arc::new(User))?
//!     .where_eq("active", true)
//!     .with("posts")
//!     .get()
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod connection;
pub mod error;
pub mod manager;
pub mod model;
pub mod query;
pub mod relationships;
pub mod repository;
pub mod template;
pub mod testing;

pub use cache::{cache_key, CachedObject, CacheError, MemoryResponseCache, ResponseCache, DEFAULT_MAX_ENTRIES};
pub use config::{
    CacheSettings, CacheSettingsBuilder, ConnectionConfig, ConnectionConfigBuilder, DataVariables, Operation,
    RestConfig,
};
pub use connection::{
    CallOptions, Client, HttpVerb, ReqwestTransport, RequestLog, RequestLogEntry, Transport,
    TransportError, TransportRequest, TransportResponse,
};
pub use error::{RestError, RestResult};
pub use manager::RestManager;
pub use model::{CastKind, CastTable, Entity, EntityRef, Record, RelationValue};
pub use query::{Descriptor, EagerPaths};
pub use relationships::{Relation, RelationDefinition, RelationKind, RelationRegistry};
pub use repository::{RestNestedRepository, RestRepository};

pub mod prelude {
    pub use crate::config::{ConnectionConfig, ConnectionConfigBuilder, RestConfig};
    pub use crate::error::{RestError, RestResult};
    pub use crate::manager::RestManager;
    pub use crate::model::{CastKind, CastTable, Entity, EntityRef, Record, RelationValue};
    pub use crate::query::Descriptor;
    pub use crate::relationships::RelationRegistry;
    pub use crate::repository::{RestNestedRepository, RestRepository};
}
