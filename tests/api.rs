//! Black-box tests: the full router over the in-memory store.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use bass_api::store::Row;
use bass_api::{app, AppError, AppState, EntityDef, MemoryStore, Store};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const ADMIN: &str = "admin-token";

fn test_app() -> Router {
    let state = AppState::new(Arc::new(MemoryStore::new()), [ADMIN.to_string()]);
    app(state, 64 * 1024)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>, token: Option<&str>) -> (StatusCode, Value) {
    let mut req = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::HOST, "testserver");
    if let Some(token) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let req = match body {
        Some(b) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create_user(app: &Router, username: &str) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/users/",
        Some(json!({"username": username, "email": format!("{}@example.com", username)})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body
}

#[tokio::test]
async fn item_create_then_retrieve_returns_same_values() {
    let app = test_app();
    let (status, created) = send(
        &app,
        Method::POST,
        "/items/",
        Some(json!({"name": "lamp", "description": "brass desk lamp"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_i64().unwrap();

    let (status, fetched) = send(&app, Method::GET, &format!("/items/{}/", id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, json!({"id": id, "name": "lamp", "description": "brass desk lamp"}));
}

#[tokio::test]
async fn listing_items_returns_every_created_item() {
    let app = test_app();
    for n in 0..5 {
        let (status, _) = send(
            &app,
            Method::POST,
            "/items/",
            Some(json!({"name": format!("item {}", n), "description": "d"})),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let (status, list) = send(&app, Method::GET, "/items/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().map(Vec::len), Some(5));
}

#[tokio::test]
async fn deleted_item_is_not_found() {
    let app = test_app();
    let (_, created) = send(
        &app,
        Method::POST,
        "/items/",
        Some(json!({"name": "a", "description": "b"})),
        None,
    )
    .await;
    let uri = format!("/items/{}/", created["id"]);

    let (status, body) = send(&app, Method::DELETE, &uri, None, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, body) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], json!("not_found"));
}

#[tokio::test]
async fn item_put_and_patch() {
    let app = test_app();
    send(&app, Method::POST, "/items/", Some(json!({"name": "a", "description": "b"})), None).await;

    let (status, body) = send(&app, Method::PUT, "/items/1/", Some(json!({"name": "c"})), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["details"]["description"], json!(["This field is required."]));

    let (status, body) = send(
        &app,
        Method::PUT,
        "/items/1/",
        Some(json!({"name": "c", "description": "d"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"id": 1, "name": "c", "description": "d"}));

    let (status, body) = send(&app, Method::PATCH, "/items/1/", Some(json!({"description": "e"})), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"id": 1, "name": "c", "description": "e"}));
}

#[tokio::test]
async fn item_validation_reports_field_errors() {
    let app = test_app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/items/",
        Some(json!({"name": "x".repeat(101), "description": ["not", "text"]})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], json!("validation_error"));
    assert_eq!(
        body["error"]["details"],
        json!({
            "name": ["Ensure this field has no more than 100 characters."],
            "description": ["Not a valid string."]
        })
    );
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let app = test_app();
    let req = Request::builder()
        .method(Method::POST)
        .uri("/items/")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_or_non_numeric_ids_are_not_found() {
    let app = test_app();
    let (status, _) = send(&app, Method::GET, "/items/999/", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, Method::GET, "/items/abc/", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, Method::PUT, "/items/999/", Some(json!({"name": "a", "description": "b"})), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, Method::GET, "/widgets/", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn user_without_email_fails_validation() {
    let app = test_app();
    let (status, body) = send(&app, Method::POST, "/users/", Some(json!({"username": "ada"})), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["details"]["email"], json!(["This field is required."]));
}

#[tokio::test]
async fn user_create_ignores_id_and_is_active_overrides() {
    let app = test_app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/users/",
        Some(json!({
            "id": 500,
            "username": "ada",
            "email": "ada@example.com",
            "first_name": "Ada",
            "is_active": false
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        body,
        json!({
            "id": 1,
            "username": "ada",
            "email": "ada@example.com",
            "first_name": "Ada",
            "last_name": "",
            "is_active": true
        })
    );
}

#[tokio::test]
async fn duplicate_username_is_rejected() {
    let app = test_app();
    create_user(&app, "ada").await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/users/",
        Some(json!({"username": "ada", "email": "other@example.com"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"]["details"]["username"],
        json!(["A user with that username already exists."])
    );
}

#[tokio::test]
async fn anonymous_caller_can_read_and_register_but_not_mutate_users() {
    let app = test_app();
    let user = create_user(&app, "ada").await;
    let uri = format!("/users/{}/", user["id"]);

    let (status, list) = send(&app, Method::GET, "/users/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list, json!([user.clone()]));

    let (status, fetched) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, user);

    let update = json!({"username": "ada", "email": "new@example.com"});
    for method in [Method::PUT, Method::PATCH] {
        let (status, body) = send(&app, method, &uri, Some(update.clone()), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], json!("permission_denied"));
    }
    let (status, _) = send(&app, Method::DELETE, &uri, None, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, unchanged) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(unchanged, user);
}

#[tokio::test]
async fn permission_is_checked_before_lookup_and_validation() {
    let app = test_app();
    let (status, _) = send(&app, Method::PATCH, "/users/42/", Some(json!("junk")), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_can_update_and_delete_users() {
    let app = test_app();
    let user = create_user(&app, "ada").await;
    let uri = format!("/users/{}/", user["id"]);

    let (status, body) = send(
        &app,
        Method::PUT,
        &uri,
        Some(json!({"username": "ada_l", "email": "ada@lovelace.org", "is_active": false})),
        Some(ADMIN),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], json!("ada_l"));
    assert_eq!(body["email"], json!("ada@lovelace.org"));
    assert_eq!(body["is_active"], json!(true));

    let (status, body) = send(&app, Method::PATCH, &uri, Some(json!({"last_name": "Lovelace"})), Some(ADMIN)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["last_name"], json!("Lovelace"));
    assert_eq!(body["username"], json!("ada_l"));

    let (status, _) = send(&app, Method::DELETE, &uri, None, Some(ADMIN)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_bearer_token_is_unauthorized() {
    let app = test_app();
    let (status, body) = send(&app, Method::GET, "/users/", None, Some("wrong")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], json!("unauthorized"));
}

#[tokio::test]
async fn api_root_lists_resources() {
    let app = test_app();
    let (status, body) = send(&app, Method::GET, "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"items": "http://testserver/items/", "users": "http://testserver/users/"})
    );
}

#[tokio::test]
async fn service_routes_respond() {
    let app = test_app();
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));

    let (status, body) = send(&app, Method::GET, "/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok", "storage": "ok"}));

    let (status, body) = send(&app, Method::GET, "/version", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], json!("bass-api"));
}

/// Storage that is never reachable.
struct DownStore;

#[async_trait]
impl Store for DownStore {
    async fn list(&self, _: &EntityDef) -> Result<Vec<Row>, AppError> {
        Err(AppError::Storage("down".into()))
    }

    async fn fetch(&self, _: &EntityDef, _: i64) -> Result<Option<Row>, AppError> {
        Err(AppError::Storage("down".into()))
    }

    async fn insert(&self, _: &EntityDef, _: &Row) -> Result<Row, AppError> {
        Err(AppError::Storage("down".into()))
    }

    async fn update(&self, _: &EntityDef, _: i64, _: &Row) -> Result<Option<Row>, AppError> {
        Err(AppError::Storage("down".into()))
    }

    async fn delete(&self, _: &EntityDef, _: i64) -> Result<bool, AppError> {
        Err(AppError::Storage("down".into()))
    }

    async fn exists(&self, _: &EntityDef, _: &str, _: &Value, _: Option<i64>) -> Result<bool, AppError> {
        Err(AppError::Storage("down".into()))
    }

    async fn ping(&self) -> Result<(), AppError> {
        Err(AppError::Storage("down".into()))
    }
}

#[tokio::test]
async fn ready_reports_degraded_when_storage_is_down() {
    let app = app(AppState::new(Arc::new(DownStore), [ADMIN.to_string()]), 64 * 1024);
    let (status, body) = send(&app, Method::GET, "/ready", None, None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, json!({"status": "degraded", "storage": "unavailable"}));

    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));

    let (status, body) = send(&app, Method::GET, "/items/", None, None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], json!("storage_error"));
}

#[tokio::test]
async fn body_over_limit_is_payload_too_large() {
    let app = app(AppState::new(Arc::new(MemoryStore::new()), [ADMIN.to_string()]), 64);
    let (status, body) = send(
        &app,
        Method::POST,
        "/items/",
        Some(json!({"name": "lamp", "description": "x".repeat(500)})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"]["code"], json!("payload_too_large"));

    let (status, list) = send(&app, Method::GET, "/items/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn body_without_json_content_type_is_unsupported() {
    let app = test_app();
    let req = Request::builder()
        .method(Method::POST)
        .uri("/items/")
        .body(Body::from(r#"{"name": "a", "description": "b"}"#))
        .unwrap();
    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn api_root_uses_forwarded_https_scheme() {
    let app = test_app();
    let req = Request::builder()
        .uri("/")
        .header(header::HOST, "api.example.com")
        .header("x-forwarded-proto", "https")
        .body(Body::empty())
        .unwrap();
    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(
        body,
        json!({"items": "https://api.example.com/items/", "users": "https://api.example.com/users/"})
    );
}
