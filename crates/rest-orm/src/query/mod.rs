//! Query module - the descriptor and its eager-loading pipeline
//!
//! - `builder`: descriptor state and fluent filters/headers/endpoint params
//! - `with`: eager-load paths and relation resolution
//! - `execution`: fetch strategies, caching and hydration
//! - `dml`: mutations and record persistence

pub mod builder;
pub mod dml;
pub mod execution;
pub mod with;

pub use builder::{Customizer, Descriptor};
pub use execution::data_get;
pub use with::EagerPaths;
