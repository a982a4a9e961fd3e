//! HTTP-level tests for projects, versions, tickets and the scenario
//! repository.

mod common;

use axum::http::StatusCode;
use common::{
    admin_token, body_json, get_auth, post_json_auth, post_multipart_auth, put_json_auth,
};
use serde_json::json;
use sqlx::PgPool;

const EXPORT: &str = "\
epic,feature_filename,feature_name,feature_tags,feature_description,scenario_id,scenario_name,scenario_tags,scenario_description,scenario_is_outline,scenario_steps
Payments,card.feature,Card,@smoke,Card payments,PAY-1,Pay by card,,,false,Given a card
Payments,card.feature,Card,@smoke,Card payments,PAY-2,Refund,,,true,Given a refund
Accounts,login.feature,Login,,,ACC-1,Login,,,false,Given a user";

async fn create_project(app: &axum::Router, token: &str, name: &str) {
    let response = post_json_auth(
        app.clone(),
        "/api/v1/settings/projects",
        token,
        json!({ "name": name }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

async fn create_version(app: &axum::Router, token: &str, project: &str, version: &str) {
    let response = post_json_auth(
        app.clone(),
        &format!("/api/v1/projects/{project}/versions"),
        token,
        json!({ "version": version }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

async fn set_version_status(
    app: &axum::Router,
    token: &str,
    project: &str,
    version: &str,
    statuses: &[&str],
) {
    for status in statuses {
        let response = put_json_auth(
            app.clone(),
            &format!("/api/v1/projects/{project}/versions/{version}"),
            token,
            json!({ "status": status }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK, "transition to {status}");
    }
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

/// A valid name is created once; the second attempt conflicts.
#[sqlx::test(migrations = false)]
async fn test_create_project_then_conflict(pool: PgPool) {
    let app = common::build_test_app(pool.clone()).await;
    let token = admin_token(&pool, &app).await;

    let response = post_json_auth(
        app.clone(),
        "/api/v1/settings/projects",
        &token,
        json!({ "name": "Shop" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["name"], "shop");

    let response = post_json_auth(
        app.clone(),
        "/api/v1/settings/projects",
        &token,
        json!({ "name": "SHOP" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = get_auth(app, "/api/v1/settings/projects", &token).await;
    assert_eq!(body_json(response).await, json!(["shop"]));
}

/// Forbidden characters and over-long names are rejected.
#[sqlx::test(migrations = false)]
async fn test_create_project_invalid_names(pool: PgPool) {
    let app = common::build_test_app(pool.clone()).await;
    let token = admin_token(&pool, &app).await;

    let too_long = "p".repeat(51);
    for name in ["a/b", "a\\b", "price$", "star*", too_long.as_str()] {
        let response = post_json_auth(
            app.clone(),
            "/api/v1/settings/projects",
            &token,
            json!({ "name": name }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "name {name:?}");
    }
}

/// Versions are partitioned into future, current and archived buckets.
#[sqlx::test(migrations = false)]
async fn test_project_buckets(pool: PgPool) {
    let app = common::build_test_app(pool.clone()).await;
    let token = admin_token(&pool, &app).await;
    create_project(&app, &token, "shop").await;
    for version in ["1.0", "2.0", "3.0"] {
        create_version(&app, &token, "shop", version).await;
    }
    set_version_status(
        &app,
        &token,
        "shop",
        "2.0",
        &["test plan writing", "test plan sent", "test plan accepted", "campaign started"],
    )
    .await;
    set_version_status(&app, &token, "shop", "1.0", &["cancelled", "archived"]).await;

    let response = get_auth(app.clone(), "/api/v1/projects", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!([{ "name": "shop", "current": 1, "future": 1, "archived": 1 }])
    );

    let response = get_auth(app.clone(), "/api/v1/projects/SHOP", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["name"], "shop");
    assert_eq!(json["future"][0]["version"], "3.0");
    assert_eq!(json["current"][0]["version"], "2.0");
    assert_eq!(json["archived"][0]["version"], "1.0");

    let response = get_auth(
        app.clone(),
        "/api/v1/projects/shop?sections=future",
        &token,
    )
    .await;
    let json = body_json(response).await;
    assert!(json.get("future").is_some());
    assert!(json.get("current").is_none());
    assert!(json.get("archived").is_none());

    let response = get_auth(app, "/api/v1/projects/shop?sections=past", &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

/// Unknown projects are 404 on every project-scoped route.
#[sqlx::test(migrations = false)]
async fn test_unknown_project_is_not_found(pool: PgPool) {
    let app = common::build_test_app(pool.clone()).await;
    let token = admin_token(&pool, &app).await;

    let response = get_auth(app.clone(), "/api/v1/projects/nope", &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");

    let response = post_json_auth(
        app,
        "/api/v1/projects/nope/versions",
        &token,
        json!({ "version": "1.0" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// Negative pagination reaches PostgreSQL and its message comes back.
#[sqlx::test(migrations = false)]
async fn test_negative_pagination_surfaces_store_error(pool: PgPool) {
    let app = common::build_test_app(pool.clone()).await;
    let token = admin_token(&pool, &app).await;

    let response = get_auth(app.clone(), "/api/v1/projects?skip=-1", &token).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["error"], "OFFSET must not be negative");

    let response = get_auth(app, "/api/v1/projects?limit=-1", &token).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["error"], "LIMIT must not be negative");
}

// ---------------------------------------------------------------------------
// Versions and tickets
// ---------------------------------------------------------------------------

/// Version labels are unique per project and transitions are enforced.
#[sqlx::test(migrations = false)]
async fn test_version_lifecycle(pool: PgPool) {
    let app = common::build_test_app(pool.clone()).await;
    let token = admin_token(&pool, &app).await;
    create_project(&app, &token, "shop").await;
    create_version(&app, &token, "shop", "1.0").await;

    let response = post_json_auth(
        app.clone(),
        "/api/v1/projects/shop/versions",
        &token,
        json!({ "version": "1.0" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = put_json_auth(
        app.clone(),
        "/api/v1/projects/shop/versions/1.0",
        &token,
        json!({ "status": "campaign ended" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = get_auth(app, "/api/v1/projects/shop/versions/1.0", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "recorded");
}

/// Tickets are created per version and follow their own lifecycle.
#[sqlx::test(migrations = false)]
async fn test_ticket_lifecycle(pool: PgPool) {
    let app = common::build_test_app(pool.clone()).await;
    let token = admin_token(&pool, &app).await;
    create_project(&app, &token, "shop").await;
    create_version(&app, &token, "shop", "1.0").await;
    let tickets = "/api/v1/projects/shop/versions/1.0/tickets";

    let body = json!({ "reference": "SHOP-1", "description": "Checkout" });
    let response = post_json_auth(app.clone(), tickets, &token, body.clone()).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let response = post_json_auth(app.clone(), tickets, &token, body).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = put_json_auth(
        app.clone(),
        &format!("{tickets}/SHOP-1"),
        &token,
        json!({ "status": "done" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = put_json_auth(
        app.clone(),
        &format!("{tickets}/SHOP-1"),
        &token,
        json!({ "status": "in_progress", "description": "Checkout flow" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "in_progress");
    assert_eq!(json["description"], "Checkout flow");

    let response = get_auth(app.clone(), tickets, &token).await;
    let json = body_json(response).await;
    assert_eq!(json[0]["reference"], "SHOP-1");
    assert_eq!(json[0]["campaign_occurrences"], json!([]));

    let response = get_auth(app, &format!("{tickets}/SHOP-404"), &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Scenario repository
// ---------------------------------------------------------------------------

/// A CSV export is imported and can be read back in every shape.
#[sqlx::test(migrations = false)]
async fn test_repository_import_and_reads(pool: PgPool) {
    let app = common::build_test_app(pool.clone()).await;
    let token = admin_token(&pool, &app).await;
    create_project(&app, &token, "shop").await;

    let response =
        post_multipart_auth(app.clone(), "/api/v1/projects/shop/repository", &token, EXPORT).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({ "epics": 2, "features": 2, "scenarios": 3 })
    );

    let response = get_auth(app.clone(), "/api/v1/projects/shop/epics", &token).await;
    assert_eq!(body_json(response).await, json!(["Accounts", "Payments"]));

    let response = get_auth(
        app.clone(),
        "/api/v1/projects/shop/epics/Payments/features",
        &token,
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json[0]["name"], "Card");
    assert_eq!(json[0]["filename"], "card.feature");

    let response = get_auth(
        app.clone(),
        "/api/v1/projects/shop/repository?epic=Payments&limit=1&offset=1",
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-total-count"], "2");
    let json = body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["scenario_id"], "PAY-2");

    let response = get_auth(
        app.clone(),
        "/api/v1/projects/shop/repository?elements=epics",
        &token,
    )
    .await;
    assert_eq!(body_json(response).await, json!(["Accounts", "Payments"]));

    let response = get_auth(
        app.clone(),
        "/api/v1/projects/shop/repository?offset=-1",
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await["error"],
        "OFFSET must not be negative"
    );

    let response = get_auth(
        app,
        "/api/v1/projects/shop/repository?elements=tags",
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

/// A malformed export is rejected and nothing is written.
#[sqlx::test(migrations = false)]
async fn test_repository_rejects_bad_csv(pool: PgPool) {
    let app = common::build_test_app(pool.clone()).await;
    let token = admin_token(&pool, &app).await;
    create_project(&app, &token, "shop").await;

    let response = post_multipart_auth(
        app.clone(),
        "/api/v1/projects/shop/repository",
        &token,
        "epic,feature_name\nPayments,Card",
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = get_auth(app, "/api/v1/projects/shop/epics", &token).await;
    assert_eq!(body_json(response).await, json!([]));
}
