//! Authentication extractor backed by signed session tokens.
//!
//! Usage: Add `AuthUser` as an extractor parameter to require authentication,
//! or `Option<AuthUser>` where anonymous callers are allowed. The token is
//! read from the `Authorization: Bearer` header first, then from the session
//! cookie.
//!
//! ```ignore
//! async fn my_handler(AuthUser { user }: AuthUser, ...) -> ... {
//!     // user.id, user.role are available here
//! }
//! ```

use std::convert::Infallible;

use axum::{
    Json, RequestPartsExt,
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use axum_extra::{
    TypedHeader,
    extract::CookieJar,
    headers::{Authorization, authorization::Bearer},
};

use crate::models::User;
use crate::session::SESSION_COOKIE;
use crate::state::AppState;

/// Authenticated user resolved from a valid session token.
pub struct AuthUser {
    pub user: User,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let bearer = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .ok()
            .map(|TypedHeader(Authorization(bearer))| bearer.token().to_string());

        let token = match bearer {
            Some(token) => token,
            None => CookieJar::from_headers(&parts.headers)
                .get(SESSION_COOKIE)
                .map(|cookie| cookie.value().to_string())
                .ok_or(AuthError::MissingToken)?,
        };

        let payload = state.session.verify(&token).ok_or(AuthError::InvalidToken)?;

        let user = state
            .stores
            .users
            .find_by_id(payload.sub)
            .await
            .map_err(|e| {
                tracing::error!("User lookup failed during auth: {:?}", e);
                AuthError::InvalidToken
            })?
            .ok_or(AuthError::InvalidToken)?;

        Ok(AuthUser { user })
    }
}

impl OptionalFromRequestParts<AppState> for AuthUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(
            <Self as FromRequestParts<AppState>>::from_request_parts(parts, state)
                .await
                .ok(),
        )
    }
}

pub enum AuthError {
    MissingToken,
    InvalidToken,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingToken => (StatusCode::UNAUTHORIZED, "Missing authorization token"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid or expired token"),
        };

        let body = serde_json::json!({ "error": message });

        (status, Json(body)).into_response()
    }
}
