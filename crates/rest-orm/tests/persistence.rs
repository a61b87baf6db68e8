mod common;

use std::sync::Arc;

use common::*;
use elif_rest_orm::prelude::*;
use elif_rest_orm::{HttpVerb, TransportResponse};
use serde_json::{json, Map, Value};

fn attributes(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

#[tokio::test]
async fn saving_a_new_record_posts_it() {
    let (manager, transport) = setup();
    transport.route(
        HttpVerb::Post,
        "/users",
        TransportResponse::json(201, &json!({"id": 42, "name": "Ada", "admin": "0"})),
    );

    let query = manager.query(Arc::new(User)).unwrap();
    let mut user = query.new_record(attributes(json!({"name": "Ada"})));
    assert!(!user.exists());

    assert!(query.save(&mut user).await.unwrap());

    assert!(user.exists());
    assert!(user.was_recently_created());
    assert!(!user.is_dirty());
    assert_eq!(user.key(), Some(&json!(42)));
    assert_eq!(user.get_bool("admin"), Some(false));

    let request = &transport.requests_to(HttpVerb::Post, "/users")[0];
    assert_eq!(request.body, Some(json!({"name": "Ada"})));
}

#[tokio::test]
async fn saving_an_existing_record_sends_only_dirty_attributes() {
    let (manager, transport) = setup_with(base_config().update_verb(HttpVerb::Patch));
    transport
        .route(HttpVerb::Get, "/users/1", ok(json!({"id": 1, "name": "Ada", "email": "a@x.test"})))
        .route(HttpVerb::Patch, "/users/1", ok(json!({"id": 1, "name": "Ada L.", "email": "a@x.test"})));

    let query = manager.query(Arc::new(User)).unwrap();
    let mut user = query.get_one(1).await.unwrap().unwrap();
    user.set_attribute("name", "Ada L.");
    assert!(user.is_dirty());

    query.save(&mut user).await.unwrap();

    assert!(!user.is_dirty());
    let request = &transport.requests_to(HttpVerb::Patch, "/users/1")[0];
    assert_eq!(request.body, Some(json!({"name": "Ada L."})));

    // Nothing dirty, nothing sent
    query.save(&mut user).await.unwrap();
    assert_eq!(transport.requests_to(HttpVerb::Patch, "/users/1").len(), 1);
}

#[tokio::test]
async fn unprocessable_entity_is_a_validation_error() {
    let (manager, transport) = setup();
    transport.route(
        HttpVerb::Post,
        "/users",
        TransportResponse::json(422, &json!({"email": ["is invalid"]})),
    );

    let err = manager
        .query(Arc::new(User))
        .unwrap()
        .store_one(attributes(json!({"email": "nope"})))
        .await
        .unwrap_err();

    match err {
        RestError::RemoteValidation { status, errors } => {
            assert_eq!(status, 422);
            assert_eq!(errors["email"], json!(["is invalid"]));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn write_failures_are_surfaced() {
    let (manager, transport) = setup();
    transport.route(HttpVerb::Put, "/users/1", TransportResponse::new(500, "boom"));

    let err = manager
        .query(Arc::new(User))
        .unwrap()
        .update_one(1, attributes(json!({"name": "x"})))
        .await
        .unwrap_err();

    assert!(err.is_transport());
    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn delete_reports_success_for_200_and_204_only() {
    let (manager, transport) = setup();
    transport
        .route(HttpVerb::Delete, "/users/1", TransportResponse::new(204, ""))
        .route(HttpVerb::Delete, "/users/2", TransportResponse::new(202, ""));

    let query = manager.query(Arc::new(User)).unwrap();
    assert!(query.delete_one(1).await.unwrap());
    assert!(!query.delete_one(2).await.unwrap());
    assert!(query.delete_one(3).await.unwrap_err().is_transport());
}

#[tokio::test]
async fn destroy_deletes_the_records_that_exist() {
    let (manager, transport) = setup();
    transport
        .route(HttpVerb::Get, "/users/1", ok(json!({"id": 1})))
        .route(HttpVerb::Delete, "/users/1", TransportResponse::new(200, ""));

    let query = manager.query(Arc::new(User)).unwrap();
    let count = query.destroy([1, 2]).await.unwrap();

    assert_eq!(count, 1);
    assert!(transport.requests_to(HttpVerb::Delete, "/users/2").is_empty());
}

#[tokio::test]
async fn deleting_an_unsaved_record_needs_a_key() {
    let (manager, _transport) = setup();
    let query = manager.query(Arc::new(User)).unwrap();
    let mut user = query.new_record(Map::new());

    let err = query.delete(&mut user).await.unwrap_err();
    assert!(matches!(err, RestError::MissingPrimaryKey));
}

#[tokio::test]
async fn head_returns_response_headers() {
    let (manager, transport) = setup();
    transport.route(
        HttpVerb::Head,
        "/users/1",
        TransportResponse::new(200, "").with_header("Last-Modified", "yesterday"),
    );

    let headers = manager
        .query(Arc::new(User))
        .unwrap()
        .head_one(1)
        .await
        .unwrap();

    assert_eq!(headers.get("last-modified").map(String::as_str), Some("yesterday"));
}

#[tokio::test]
async fn repository_crud() {
    let (manager, transport) = setup();
    transport
        .route(HttpVerb::Get, "/users", ok(json!([{"id": 1}, {"id": 2}])))
        .route(HttpVerb::Post, "/users", ok(json!({"id": 3, "name": "Linus"})))
        .route(HttpVerb::Get, "/users/3", ok(json!({"id": 3, "name": "Linus"})))
        .route(HttpVerb::Put, "/users/3", ok(json!({"id": 3, "name": "Linus T."})))
        .route(HttpVerb::Delete, "/users/3", TransportResponse::new(204, ""));

    let users = RestRepository::new(manager, Arc::new(User));

    assert_eq!(users.all().await.unwrap().len(), 2);

    let created = users.create(attributes(json!({"name": "Linus"}))).await.unwrap();
    assert_eq!(created.get_i64("id"), Some(3));

    let fetched = users.get(3).await.unwrap();
    assert_eq!(fetched.get_str("name"), Some("Linus"));

    let updated = users.update(3, attributes(json!({"name": "Linus T."}))).await.unwrap();
    assert_eq!(updated.get_str("name"), Some("Linus T."));
    assert!(!updated.is_dirty());

    assert!(users.delete(3).await.unwrap());
    assert!(users.get(99).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn nested_repository_is_scoped_to_parents() {
    let (manager, transport) = setup();
    transport
        .route(HttpVerb::Get, "/user/7/posts", ok(json!([{"id": 1}])))
        .route(HttpVerb::Get, "/user/7/posts/1", ok(json!({"id": 1, "title": "Hello"})))
        .route(HttpVerb::Post, "/user/7/posts", ok(json!({"id": 2, "title": "New"})))
        .route(HttpVerb::Delete, "/user/7/posts/2", TransportResponse::new(200, "{}"));

    let posts = RestNestedRepository::new(manager, Arc::new(UserPost));
    let parents = vec![json!(7)];

    assert_eq!(posts.all_for_parent(parents.clone()).await.unwrap().len(), 1);

    let post = posts.get_for_parent(parents.clone(), 1).await.unwrap();
    assert_eq!(post.get_str("title"), Some("Hello"));

    let created = posts
        .create_for_parent(parents.clone(), attributes(json!({"title": "New"})))
        .await
        .unwrap();
    assert_eq!(created.key(), Some(&json!(2)));

    assert!(posts.delete_for_parent(parents, 2).await.unwrap());
}
