//! HTTP-level tests for bug tracking under `/projects/{name}/bugs`.

mod common;

use axum::http::StatusCode;
use axum::Router;
use common::{admin_token, body_json, get_auth, post_json_auth, put_json_auth};
use serde_json::json;
use sqlx::PgPool;

const BUGS: &str = "/api/v1/projects/shop/bugs";

/// Project `shop` with versions `1.0` and `2.0`, campaign `1.0/1` and
/// scenario `LOG-1` attached under `SHOP-1`. Returns the scenario's
/// internal id.
async fn seed(app: &Router, token: &str) -> i64 {
    let response = post_json_auth(
        app.clone(),
        "/api/v1/settings/projects",
        token,
        json!({ "name": "shop" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    for version in ["1.0", "2.0"] {
        let response = post_json_auth(
            app.clone(),
            "/api/v1/projects/shop/versions",
            token,
            json!({ "version": version }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = post_json_auth(
        app.clone(),
        "/api/v1/projects/shop/versions/1.0/tickets",
        token,
        json!({ "reference": "SHOP-1", "description": "Checkout" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = post_json_auth(
        app.clone(),
        "/api/v1/projects/shop/campaigns",
        token,
        json!({ "version": "1.0" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = put_json_auth(
        app.clone(),
        "/api/v1/projects/shop/campaigns/1.0/1",
        token,
        json!({
            "ticket_reference": "SHOP-1",
            "scenarios": { "epic": "Accounts", "feature_name": "Login", "scenario_id": "LOG-1" }
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["scenarios"][0]["internal_id"].as_i64().unwrap()
}

async fn file_bug(app: &Router, token: &str, body: serde_json::Value) -> serde_json::Value {
    let response = post_json_auth(app.clone(), BUGS, token, body).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

// ---------------------------------------------------------------------------
// Filing
// ---------------------------------------------------------------------------

/// A filed bug starts `open`, carries its links and can be read back.
#[sqlx::test(migrations = false)]
async fn test_file_and_get_bug(pool: PgPool) {
    let app = common::build_test_app(pool.clone()).await;
    let token = admin_token(&pool, &app).await;
    let scenario = seed(&app, &token).await;

    let link = json!({ "occurrence": 1, "ticket_reference": "SHOP-1", "scenario_internal_id": scenario });
    let bug = file_bug(
        &app,
        &token,
        json!({
            "version": "1.0",
            "title": "Login button dead",
            "criticality": "blocking",
            "related_to": [link.clone()]
        }),
    )
    .await;
    assert_eq!(bug["status"], "open");
    assert_eq!(bug["version"], "1.0");
    assert_eq!(bug["url"], "");
    assert_eq!(bug["related_to"], json!([link]));

    let id = bug["internal_id"].as_i64().unwrap();
    let response = get_auth(app.clone(), &format!("{BUGS}/{id}"), &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["title"], "Login button dead");

    let response = get_auth(app, &format!("{BUGS}/{}", id + 1000), &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// Bad input maps onto 400, 404 and 409.
#[sqlx::test(migrations = false)]
async fn test_file_bug_errors(pool: PgPool) {
    let app = common::build_test_app(pool.clone()).await;
    let token = admin_token(&pool, &app).await;
    seed(&app, &token).await;
    file_bug(&app, &token, json!({ "version": "1.0", "title": "Crash", "criticality": "major" }))
        .await;

    let cases = [
        (
            json!({ "version": "1.0", "title": "Crash", "criticality": "minor" }),
            StatusCode::CONFLICT,
        ),
        (
            json!({ "version": "1.0", "title": "Other", "criticality": "critical" }),
            StatusCode::BAD_REQUEST,
        ),
        (
            json!({ "version": "9.9", "title": "Other", "criticality": "major" }),
            StatusCode::NOT_FOUND,
        ),
        (
            json!({
                "version": "1.0",
                "title": "Other",
                "criticality": "major",
                "related_to": [{ "occurrence": 7, "ticket_reference": "SHOP-1", "scenario_internal_id": 1 }]
            }),
            StatusCode::NOT_FOUND,
        ),
    ];
    for (body, expected) in cases {
        let response = post_json_auth(app.clone(), BUGS, &token, body.clone()).await;
        assert_eq!(response.status(), expected, "{body}");
    }

    let response = post_json_auth(
        app,
        "/api/v1/projects/nowhere/bugs",
        &token,
        json!({ "version": "1.0", "title": "Crash", "criticality": "major" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Updates
// ---------------------------------------------------------------------------

/// Status moves along the bug lifecycle only; links can be added and
/// removed.
#[sqlx::test(migrations = false)]
async fn test_update_bug(pool: PgPool) {
    let app = common::build_test_app(pool.clone()).await;
    let token = admin_token(&pool, &app).await;
    let scenario = seed(&app, &token).await;
    let bug = file_bug(
        &app,
        &token,
        json!({ "version": "1.0", "title": "Crash", "criticality": "major" }),
    )
    .await;
    let uri = format!("{BUGS}/{}", bug["internal_id"]);

    let response = put_json_auth(app.clone(), &uri, &token, json!({ "status": "closed" })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");

    let link = json!({ "occurrence": 1, "ticket_reference": "SHOP-1", "scenario_internal_id": scenario });
    let response = put_json_auth(
        app.clone(),
        &uri,
        &token,
        json!({ "status": "fix ready", "related_to": [link.clone()] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "fix ready");
    assert_eq!(json["related_to"], json!([link.clone()]));

    let response =
        put_json_auth(app.clone(), &uri, &token, json!({ "unlink_scenarios": [link] })).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["related_to"], json!([]));

    let response = put_json_auth(app, &format!("{BUGS}/999999"), &token, json!({})).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

/// Listings filter by version, status and criticality and report the
/// total in `X-Total-Count`.
#[sqlx::test(migrations = false)]
async fn test_list_bugs(pool: PgPool) {
    let app = common::build_test_app(pool.clone()).await;
    let token = admin_token(&pool, &app).await;
    seed(&app, &token).await;
    file_bug(&app, &token, json!({ "version": "1.0", "title": "A", "criticality": "major" })).await;
    file_bug(&app, &token, json!({ "version": "1.0", "title": "B", "criticality": "minor" })).await;
    let c = file_bug(
        &app,
        &token,
        json!({ "version": "2.0", "title": "C", "criticality": "major" }),
    )
    .await;
    let response = put_json_auth(
        app.clone(),
        &format!("{BUGS}/{}", c["internal_id"]),
        &token,
        json!({ "status": "closed not a defect" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get_auth(app.clone(), &format!("{BUGS}?limit=2"), &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-total-count"], "3");
    let titles: Vec<_> = body_json(response)
        .await
        .as_array()
        .unwrap()
        .iter()
        .map(|bug| bug["title"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(titles, ["A", "B"]);

    let response =
        get_auth(app.clone(), &format!("{BUGS}?status=open&criticality=major"), &token).await;
    assert_eq!(response.headers()["x-total-count"], "1");
    assert_eq!(body_json(response).await[0]["title"], "A");

    let response = get_auth(
        app.clone(),
        &format!("{BUGS}?status=fix%20ready,closed%20not%20a%20defect"),
        &token,
    )
    .await;
    assert_eq!(response.headers()["x-total-count"], "1");
    assert_eq!(body_json(response).await[0]["title"], "C");

    let response = get_auth(app.clone(), "/api/v1/projects/shop/versions/1.0/bugs", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-total-count"], "2");

    let response = get_auth(app, &format!("{BUGS}?status=reopened"), &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
