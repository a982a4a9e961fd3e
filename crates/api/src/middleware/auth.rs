//! Token-based authentication extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use qadash_core::error::CoreError;
use qadash_core::types::DbId;
use qadash_db::repositories::SessionRepo;

use crate::auth::jwt::{hash_token_id, validate_token};
use crate::error::AppError;
use crate::state::AppState;

/// Name of the cookie set by `POST /token`.
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Authenticated user extracted from an access token.
///
/// The token is read from `Authorization: Bearer <token>` first, then from
/// the `access_token` cookie. It must verify, and its session must still be
/// active (not revoked, not expired).
///
/// ```ignore
/// async fn my_handler(user: AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(user_id = user.user_id, role = %user.role, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The user's internal database id (from `claims.sub`).
    pub user_id: DbId,
    /// The user's role name (`"admin"` or `"user"`).
    pub role: String,
    /// The `user_sessions` row backing this token.
    pub session_id: DbId,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(parts)?;

        let claims = validate_token(&token, &state.config.jwt).map_err(|_| {
            AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()))
        })?;

        let session = SessionRepo::find_active(&state.pool, &hash_token_id(&claims.jti))
            .await?
            .filter(|session| session.user_id == claims.sub)
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized("Token has been revoked".into()))
            })?;

        Ok(AuthUser {
            user_id: claims.sub,
            role: claims.role,
            session_id: session.id,
        })
    }
}

/// Pull the raw token out of the `Authorization` header or the cookie.
fn extract_token(parts: &Parts) -> Result<String, AppError> {
    if let Some(header) = parts.headers.get(AUTHORIZATION) {
        let value = header.to_str().unwrap_or_default();
        return value
            .strip_prefix("Bearer ")
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Invalid Authorization format. Expected: Bearer <token>".into(),
                ))
            });
    }

    parts
        .headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|cookies| cookie_value(cookies, ACCESS_TOKEN_COOKIE))
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Missing Authorization header".into(),
            ))
        })
}

/// Find `name` in a `Cookie` header value (`a=1; b=2`).
fn cookie_value(header: &str, name: &str) -> Option<String> {
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        let value = value.trim().trim_matches('"');
        (key == name && !value.is_empty()).then(|| value.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(builder: axum::http::request::Builder) -> Parts {
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn bearer_header_wins_over_cookie() {
        let parts = parts(
            Request::builder()
                .header(AUTHORIZATION, "Bearer from-header")
                .header(COOKIE, "access_token=from-cookie"),
        );
        assert_eq!(extract_token(&parts).unwrap(), "from-header");
    }

    #[test]
    fn cookie_is_used_without_header() {
        let parts = parts(Request::builder().header(COOKIE, "theme=dark; access_token=abc.def"));
        assert_eq!(extract_token(&parts).unwrap(), "abc.def");
    }

    #[test]
    fn malformed_or_missing_token_is_rejected() {
        let parts_basic = parts(Request::builder().header(AUTHORIZATION, "Basic dXNlcg=="));
        assert!(extract_token(&parts_basic).is_err());

        let parts_empty = parts(Request::builder().header(AUTHORIZATION, "Bearer "));
        assert!(extract_token(&parts_empty).is_err());

        let parts_none = parts(Request::builder().header(COOKIE, "theme=dark"));
        assert!(extract_token(&parts_none).is_err());
    }

    #[test]
    fn cookie_value_parsing() {
        assert_eq!(cookie_value("a=1; b=2", "b").as_deref(), Some("2"));
        assert_eq!(cookie_value("a=\"quoted\"", "a").as_deref(), Some("quoted"));
        assert_eq!(cookie_value("ab=1", "a"), None);
        assert_eq!(cookie_value("a=", "a"), None);
    }
}
