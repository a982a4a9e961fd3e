#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use qadash_api::auth::jwt::JwtConfig;
use qadash_api::auth::password::hash_password;
use qadash_api::config::{LogFormat, ServerConfig};
use qadash_api::middleware::metrics::init_metrics;
use qadash_api::router::build_app_router;
use qadash_api::state::AppState;
use qadash_core::roles::{ROLE_ADMIN, ROLE_USER};
use qadash_db::models::user::{CreateUser, User};
use qadash_db::repositories::UserRepo;

/// Password given to every user created by [`create_user`].
pub const TEST_PASSWORD: &str = "test_password_123!";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        db_max_connections: 5,
        log_format: LogFormat::Text,
        admin: None,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hs256".to_string(),
            access_token_expiry_mins: 30,
        },
    }
}

/// Apply the migration registry and build the production router on `pool`.
pub async fn build_test_app(pool: PgPool) -> Router {
    qadash_db::run_migrations(&pool)
        .await
        .expect("migrations should apply");

    let config = test_config();
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        metrics: init_metrics(),
    };
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Users and tokens
// ---------------------------------------------------------------------------

/// Insert a user with [`TEST_PASSWORD`].
pub async fn create_user(pool: &PgPool, username: &str, role: &str) -> User {
    let input = CreateUser {
        username: username.to_string(),
        password_hash: hash_password(TEST_PASSWORD).expect("hashing should succeed"),
        role: role.to_string(),
    };
    UserRepo::create(pool, &input)
        .await
        .expect("user creation should succeed")
}

/// Exchange credentials for an access token through `POST /api/v1/token`.
pub async fn login(app: &Router, username: &str, password: &str) -> String {
    let response = post_form(
        app.clone(),
        "/api/v1/token",
        &format!("username={username}&password={password}"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK, "login should succeed");
    let json = body_json(response).await;
    json["access_token"]
        .as_str()
        .expect("access_token should be a string")
        .to_string()
}

/// Create an `admin` user and return its access token.
pub async fn admin_token(pool: &PgPool, app: &Router) -> String {
    create_user(pool, "admin", ROLE_ADMIN).await;
    login(app, "admin", TEST_PASSWORD).await
}

/// Create a `user`-role user and return its access token.
pub async fn user_token(pool: &PgPool, app: &Router) -> String {
    create_user(pool, "tester", ROLE_USER).await;
    login(app, "tester", TEST_PASSWORD).await
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Send a request through the router.
pub async fn send(app: Router, request: Request<Body>) -> Response {
    app.oneshot(request).await.expect("router should not fail")
}

fn authed(method: Method, uri: &str, token: &str) -> axum::http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(AUTHORIZATION, format!("Bearer {token}"))
}

pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response {
    let request = authed(Method::GET, uri, token).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response {
    let request = authed(Method::DELETE, uri, token).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn post_form(app: Router, uri: &str, body: &str) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response {
    let request = authed(Method::POST, uri, token)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn put_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response {
    let request = authed(Method::PUT, uri, token)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn put_auth(app: Router, uri: &str, token: &str) -> Response {
    let request = authed(Method::PUT, uri, token).body(Body::empty()).unwrap();
    send(app, request).await
}

/// Upload `contents` as the multipart field `file`.
pub async fn post_multipart_auth(app: Router, uri: &str, token: &str, contents: &str) -> Response {
    let boundary = "qadash-test-boundary";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"export.csv\"\r\n\
         Content-Type: text/csv\r\n\r\n\
         {contents}\r\n\
         --{boundary}--\r\n"
    );
    let request = authed(Method::POST, uri, token)
        .header(CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
        .body(Body::from(body))
        .unwrap();
    send(app, request).await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

/// Collect a response body as UTF-8 text.
pub async fn body_text(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).expect("body should be UTF-8")
}
