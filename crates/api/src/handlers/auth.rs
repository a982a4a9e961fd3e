//! Handlers for the `/token` resource (issue, revoke).

use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::response::{AppendHeaders, IntoResponse};
use axum::{Form, Json};
use chrono::{TimeZone, Utc};
use qadash_core::error::CoreError;
use qadash_db::models::session::CreateSession;
use qadash_db::repositories::{SessionRepo, UserRepo};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::jwt::{generate_access_token, hash_token_id};
use crate::auth::password::verify_password;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::{AuthUser, ACCESS_TOKEN_COOKIE};
use crate::state::AppState;

/// Message returned for any credential mismatch, so callers cannot learn
/// which usernames exist.
const BAD_CREDENTIALS: &str = "Unrecognized credentials";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Form body for `POST /token`.
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub username: String,
    pub password: String,
}

/// Successful token response.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/token
///
/// Exchange a username and password (form-encoded) for an access token.
/// The token is returned in the body and set as an `HttpOnly` cookie.
pub async fn issue_token(
    State(state): State<AppState>,
    Form(input): Form<TokenRequest>,
) -> AppResult<impl IntoResponse> {
    let user = UserRepo::find_by_username(&state.pool, &input.username)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Unauthorized(BAD_CREDENTIALS.into())))?;

    let password_valid = verify_password(&input.password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !password_valid {
        tracing::info!(username = %input.username, "Rejected token request");
        return Err(AppError::Core(CoreError::Unauthorized(BAD_CREDENTIALS.into())));
    }

    if !user.is_active {
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is deactivated".into(),
        )));
    }

    let issued = generate_access_token(user.id, &user.role, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    let expires_at = Utc
        .timestamp_opt(issued.claims.exp, 0)
        .single()
        .ok_or_else(|| AppError::InternalError("Token expiry out of range".into()))?;
    SessionRepo::create(
        &state.pool,
        &CreateSession {
            user_id: user.id,
            token_id_hash: hash_token_id(&issued.claims.jti),
            expires_at,
        },
    )
    .await?;

    tracing::info!(user_id = user.id, role = %user.role, "Access token issued");

    let expires_in = state.config.jwt.expires_in_secs();
    let cookie = format!(
        "{ACCESS_TOKEN_COOKIE}={}; HttpOnly; Path=/; Max-Age={expires_in}; SameSite=Lax",
        issued.token
    );

    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(TokenResponse {
            access_token: issued.token,
            token_type: "Bearer",
            expires_in,
        }),
    ))
}

/// DELETE /api/v1/token
///
/// Revoke the token used to authenticate this request. A token can only be
/// revoked once; afterwards it no longer authenticates.
pub async fn revoke_token(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<impl IntoResponse> {
    if !SessionRepo::revoke(&state.pool, auth_user.session_id).await? {
        return Err(AppError::Core(CoreError::Unauthorized(
            "Token has been revoked".into(),
        )));
    }

    tracing::info!(user_id = auth_user.user_id, "Access token revoked");

    let cookie = format!("{ACCESS_TOKEN_COOKIE}=; HttpOnly; Path=/; Max-Age=0; SameSite=Lax");
    Ok((AppendHeaders([(SET_COOKIE, cookie)]), Json(json!({}))))
}
