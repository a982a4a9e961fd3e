//! HTTP-level tests for account management under `/users`.

mod common;

use axum::http::StatusCode;
use common::{
    admin_token, body_json, create_user, get_auth, login, post_form, post_json_auth,
    put_json_auth, user_token, TEST_PASSWORD,
};
use qadash_core::roles::ROLE_USER;
use serde_json::json;
use sqlx::PgPool;

const NEW_PASSWORD: &str = "another_password_456!";

// ---------------------------------------------------------------------------
// POST /users
// ---------------------------------------------------------------------------

/// An admin creates an account that can log in right away.
#[sqlx::test(migrations = false)]
async fn test_admin_creates_user(pool: PgPool) {
    let app = common::build_test_app(pool.clone()).await;
    let token = admin_token(&pool, &app).await;

    let response = post_json_auth(
        app.clone(),
        "/api/v1/users",
        &token,
        json!({ "username": "bob", "password": NEW_PASSWORD }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["username"], "bob");
    assert_eq!(json["role"], ROLE_USER);
    assert_eq!(json["is_active"], true);
    assert!(json.get("password_hash").is_none());

    login(&app, "bob", NEW_PASSWORD).await;
}

/// Creating needs a password, a known role and a strong enough password.
#[sqlx::test(migrations = false)]
async fn test_create_user_rejections(pool: PgPool) {
    let app = common::build_test_app(pool.clone()).await;
    let token = admin_token(&pool, &app).await;

    for body in [
        json!({ "username": "bob" }),
        json!({ "username": "bob", "password": NEW_PASSWORD, "role": "superuser" }),
        json!({ "username": "bob", "password": "short" }),
        json!({ "username": "", "password": NEW_PASSWORD }),
    ] {
        let response = post_json_auth(app.clone(), "/api/v1/users", &token, body.clone()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
    }
}

/// Only admins manage accounts.
#[sqlx::test(migrations = false)]
async fn test_create_user_requires_admin(pool: PgPool) {
    let app = common::build_test_app(pool.clone()).await;
    let token = user_token(&pool, &app).await;

    let response = post_json_auth(
        app,
        "/api/v1/users",
        &token,
        json!({ "username": "bob", "password": NEW_PASSWORD }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

/// Posting a known username updates it and revokes its open sessions.
#[sqlx::test(migrations = false)]
async fn test_update_user_revokes_sessions(pool: PgPool) {
    let app = common::build_test_app(pool.clone()).await;
    let admin = admin_token(&pool, &app).await;
    create_user(&pool, "alice", ROLE_USER).await;
    let alice = login(&app, "alice", TEST_PASSWORD).await;

    let response = post_json_auth(
        app.clone(),
        "/api/v1/users",
        &admin,
        json!({ "username": "alice", "role": "admin" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["role"], "admin");

    let response = get_auth(app.clone(), "/api/v1/settings/projects", &alice).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // The password is unchanged, and the new token carries the new role.
    let alice = login(&app, "alice", TEST_PASSWORD).await;
    let response = post_json_auth(
        app,
        "/api/v1/users",
        &alice,
        json!({ "username": "carol", "password": NEW_PASSWORD }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

/// A deactivated account can no longer log in.
#[sqlx::test(migrations = false)]
async fn test_deactivate_user(pool: PgPool) {
    let app = common::build_test_app(pool.clone()).await;
    let admin = admin_token(&pool, &app).await;
    create_user(&pool, "alice", ROLE_USER).await;

    let response = post_json_auth(
        app.clone(),
        "/api/v1/users",
        &admin,
        json!({ "username": "alice", "is_active": false }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["is_active"], false);

    let response = post_form(
        app,
        "/api/v1/token",
        &format!("username=alice&password={TEST_PASSWORD}"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ---------------------------------------------------------------------------
// PUT /users/me
// ---------------------------------------------------------------------------

/// Changing one's password revokes the current token; the new password
/// then logs in and the old one does not.
#[sqlx::test(migrations = false)]
async fn test_change_own_password(pool: PgPool) {
    let app = common::build_test_app(pool.clone()).await;
    let token = user_token(&pool, &app).await;

    let response = put_json_auth(
        app.clone(),
        "/api/v1/users/me",
        &token,
        json!({ "password": TEST_PASSWORD, "new_password": NEW_PASSWORD }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["username"], "tester");

    let response = get_auth(app.clone(), "/api/v1/settings/projects", &token).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = post_form(
        app.clone(),
        "/api/v1/token",
        &format!("username=tester&password={TEST_PASSWORD}"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    login(&app, "tester", NEW_PASSWORD).await;
}

/// A wrong current password is 401 and a weak new one is 400; neither
/// changes anything.
#[sqlx::test(migrations = false)]
async fn test_change_own_password_rejections(pool: PgPool) {
    let app = common::build_test_app(pool.clone()).await;
    let token = user_token(&pool, &app).await;

    let response = put_json_auth(
        app.clone(),
        "/api/v1/users/me",
        &token,
        json!({ "password": "not_my_password", "new_password": NEW_PASSWORD }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = put_json_auth(
        app.clone(),
        "/api/v1/users/me",
        &token,
        json!({ "password": TEST_PASSWORD, "new_password": "short" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = get_auth(app.clone(), "/api/v1/settings/projects", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    login(&app, "tester", TEST_PASSWORD).await;
}
