//! Handlers for the `/users` resource.
//!
//! Administrators create or update accounts; every user can change their
//! own password. Any change to credentials, role or activation revokes the
//! account's open sessions, so tokens never carry a stale role.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use qadash_core::error::CoreError;
use qadash_core::roles::{validate_role, ROLE_USER};
use qadash_db::models::user::{CreateUser, UpdateUser, UserResponse};
use qadash_db::repositories::{SessionRepo, UserRepo};
use serde::Deserialize;
use validator::Validate;

use crate::auth::password::{hash_password, validate_password_strength, verify_password};
use crate::error::{AppError, AppResult};
use crate::middleware::rbac::{RequireAdmin, RequireAuth};
use crate::state::AppState;

/// Minimum password length enforced on creation and password changes.
pub const MIN_PASSWORD_LENGTH: usize = 8;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Request body for `POST /users`.
///
/// Creates the account when `username` is unknown (a password is then
/// required), otherwise applies the given fields to the existing account.
#[derive(Debug, Deserialize, Validate)]
pub struct UpsertUserRequest {
    #[validate(length(min = 1, max = 64))]
    pub username: String,
    pub password: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

/// Request body for `PUT /users/me`.
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub password: String,
    pub new_password: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/users
///
/// 201 with the new account, or 200 with the updated one.
pub async fn upsert(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<UpsertUserRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    input.validate()?;
    if let Some(role) = input.role.as_deref() {
        validate_role(role)?;
    }
    let password_hash = input.password.as_deref().map(new_password_hash).transpose()?;

    let Some(existing) = UserRepo::find_by_username(&state.pool, &input.username).await? else {
        let password_hash = password_hash.ok_or_else(|| {
            AppError::Core(CoreError::Validation(
                "A password is required to create a user".into(),
            ))
        })?;
        let mut user = UserRepo::create(
            &state.pool,
            &CreateUser {
                username: input.username,
                password_hash,
                role: input.role.unwrap_or_else(|| ROLE_USER.to_string()),
            },
        )
        .await?;
        if input.is_active == Some(false) {
            user = UserRepo::update(
                &state.pool,
                user.id,
                &UpdateUser {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await?
            .ok_or_else(|| AppError::Core(CoreError::not_found("User", user.username.clone())))?;
        }

        tracing::info!(user_id = user.id, role = %user.role, created_by = admin.user_id, "User created");
        return Ok((StatusCode::CREATED, Json(user.into())));
    };

    let update = UpdateUser {
        password_hash,
        role: input.role,
        is_active: input.is_active,
    };
    let user = UserRepo::update(&state.pool, existing.id, &update)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("User", existing.username.clone())))?;

    let revoked = SessionRepo::revoke_all_for_user(&state.pool, user.id).await?;
    tracing::info!(
        user_id = user.id,
        role = %user.role,
        updated_by = admin.user_id,
        revoked_sessions = revoked,
        "User updated"
    );
    Ok((StatusCode::OK, Json(user.into())))
}

/// PUT /api/v1/users/me
///
/// Change the caller's password. The current password must match; every
/// session of the account, including the one used for this call, is
/// revoked afterwards.
pub async fn update_me(
    RequireAuth(auth): RequireAuth,
    State(state): State<AppState>,
    Json(input): Json<ChangePasswordRequest>,
) -> AppResult<Json<UserResponse>> {
    let user = UserRepo::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Unauthorized("Unknown user".into())))?;

    let password_valid = verify_password(&input.password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !password_valid {
        return Err(AppError::Core(CoreError::Unauthorized(
            "Unrecognized credentials".into(),
        )));
    }

    let update = UpdateUser {
        password_hash: Some(new_password_hash(&input.new_password)?),
        ..Default::default()
    };
    let user = UserRepo::update(&state.pool, user.id, &update)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("User", user.username.clone())))?;

    let revoked = SessionRepo::revoke_all_for_user(&state.pool, user.id).await?;
    tracing::info!(user_id = user.id, revoked_sessions = revoked, "Password changed");
    Ok(Json(user.into()))
}

fn new_password_hash(password: &str) -> AppResult<String> {
    validate_password_strength(password, MIN_PASSWORD_LENGTH)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;
    hash_password(password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))
}
