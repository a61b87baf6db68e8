#![allow(dead_code)]

use std::sync::Arc;

use elif_rest_orm::prelude::*;
use elif_rest_orm::testing::ScriptedTransport;
use elif_rest_orm::TransportResponse;
use serde_json::Value;

pub struct User;
pub struct Post;
pub struct Comment;
pub struct Profile;
pub struct Tag;
pub struct Team;
pub struct Member;
pub struct UserPost;
pub struct Squad;
pub struct Player;

impl Entity for User {
    fn name(&self) -> &str {
        "User"
    }

    fn casts(&self) -> CastTable {
        CastTable::new().cast("admin", CastKind::Boolean)
    }

    fn relations(&self) -> RelationRegistry {
        RelationRegistry::new()
            .has_many("posts", Arc::new(Post))
            .comes_with("profile", Arc::new(Profile))
    }
}

impl Entity for Post {
    fn name(&self) -> &str {
        "Post"
    }

    fn relations(&self) -> RelationRegistry {
        RelationRegistry::new()
            .belongs_to("user", Arc::new(User))
            .has_many("comments", Arc::new(Comment))
            .comes_with_many("tags", Arc::new(Tag))
    }
}

impl Entity for Comment {
    fn name(&self) -> &str {
        "Comment"
    }
}

impl Entity for Profile {
    fn name(&self) -> &str {
        "Profile"
    }
}

impl Entity for Tag {
    fn name(&self) -> &str {
        "Tag"
    }
}

impl Entity for Team {
    fn name(&self) -> &str {
        "Team"
    }

    fn supports_filter_set(&self) -> bool {
        true
    }
}

impl Entity for Member {
    fn name(&self) -> &str {
        "Member"
    }

    fn relations(&self) -> RelationRegistry {
        RelationRegistry::new().belongs_to("team", Arc::new(Team))
    }
}

/// Filters sets with the bare field name, as in `?id[]=7&id[]=8`
impl Entity for Squad {
    fn name(&self) -> &str {
        "Squad"
    }

    fn supports_filter_set(&self) -> bool {
        true
    }

    fn filter_param(&self, field: &str) -> String {
        field.to_string()
    }
}

impl Entity for Player {
    fn name(&self) -> &str {
        "Player"
    }

    fn relations(&self) -> RelationRegistry {
        RelationRegistry::new().belongs_to("squad", Arc::new(Squad))
    }
}

impl Entity for UserPost {
    fn name(&self) -> &str {
        "UserPost"
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("elif_rest_orm=debug")
        .try_init();
}

pub fn base_config() -> ConnectionConfigBuilder {
    ConnectionConfigBuilder::new()
        .base_url("https://api.test".to_string())
        .default_headers([("Accept", "application/json")])
}

pub fn setup_with(config: ConnectionConfigBuilder) -> (RestManager, Arc<ScriptedTransport>) {
    init_tracing();

    let config = config.build_config().expect("Failed to build connection");
    let transport = Arc::new(ScriptedTransport::new());
    let manager = RestManager::new(RestConfig::new("api").connection("api", config))
        .with_transport("api", transport.clone());

    (manager, transport)
}

pub fn setup() -> (RestManager, Arc<ScriptedTransport>) {
    setup_with(base_config())
}

pub fn ok(body: Value) -> TransportResponse {
    TransportResponse::json(200, &body)
}

/// Values sent for a query key, in order
pub fn query_values(request: &elif_rest_orm::TransportRequest, key: &str) -> Vec<String> {
    request
        .query
        .iter()
        .filter(|(name, _)| name == key)
        .map(|(_, value)| value.clone())
        .collect()
}
