//! Credential-based authentication with signed session tokens.
//!
//! Flow:
//! 1. User registers with email + password; the password is stored salted
//!    and hashed, never in plaintext
//! 2. Register and login both mint an HMAC-signed token carrying the user id
//! 3. The token is returned in the body (for `Authorization: Bearer` use)
//!    and set as an httpOnly cookie, so browser and CLI clients both work
//! 4. GET /auth/refresh re-mints a token for an authenticated caller
//! 5. Logout clears the cookie; tokens are stateless, so a copy held
//!    elsewhere stays valid until clients discard it
//!
//! Endpoints:
//! - POST /auth/register - Create an account and start a session
//! - POST /auth/login - Start a session with existing credentials
//! - POST /auth/logout - Clear the session cookie
//! - GET /auth/me - The current user, or null when anonymous
//! - GET /auth/refresh - Re-issue a token for the active session

use axum::{
    Json, Router, debug_handler,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use garde::Validate;

use crate::api::{AuthResponse, LoginPayload, MeResponse, OkResponse, RegisterPayload, UserInfo};
use crate::config::Config;
use crate::error::{AppError, AppJson};
use crate::middleware::auth::AuthUser;
use crate::models::Role;
use crate::session::SESSION_COOKIE;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(get_me))
        .route("/refresh", get(refresh))
}

/// Session cookie mirroring the bearer token. `secure` only in production so
/// local plain-HTTP development keeps working.
fn session_cookie(config: &Config, token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .secure(config.is_production())
        .build()
}

#[debug_handler]
async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    AppJson(payload): AppJson<RegisterPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let user = state
        .stores
        .users
        .create(&payload.email, &payload.password, Role::User)
        .await?
        .ok_or(AppError::Conflict("User already exists"))?;

    let token = state.session.mint(user.id)?;
    let jar = jar.add(session_cookie(&state.config, token.clone()));

    tracing::info!(user_id = %user.id, email = %user.email, "user registered");

    Ok((
        StatusCode::CREATED,
        jar,
        Json(AuthResponse {
            token,
            user: UserInfo::from(&user),
        }),
    ))
}

#[debug_handler]
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    AppJson(payload): AppJson<LoginPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let Some(user) = state
        .stores
        .users
        .authenticate(&payload.email, &payload.password)
        .await?
    else {
        tracing::warn!(email = %payload.email, "login failed: invalid credentials");
        return Err(AppError::Authentication("Invalid credentials"));
    };

    let token = state.session.mint(user.id)?;
    let jar = jar.add(session_cookie(&state.config, token.clone()));

    tracing::info!(user_id = %user.id, "user logged in");

    Ok((
        jar,
        Json(AuthResponse {
            token,
            user: UserInfo::from(&user),
        }),
    ))
}

/// Clearing the cookie is all a logout can do here: tokens are stateless,
/// so a bearer copy stays valid until the client discards it.
#[debug_handler]
async fn logout(jar: CookieJar) -> impl IntoResponse {
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/").build());

    (jar, Json(OkResponse { ok: true }))
}

#[debug_handler(state = AppState)]
async fn get_me(user: Option<AuthUser>) -> impl IntoResponse {
    Json(MeResponse {
        user: user.map(|auth| UserInfo::from(&auth.user)),
    })
}

#[debug_handler]
async fn refresh(
    user: Option<AuthUser>,
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let AuthUser { user } = user.ok_or(AppError::Authentication("No active session"))?;

    let token = state.session.mint(user.id)?;
    let jar = jar.add(session_cookie(&state.config, token.clone()));

    tracing::info!(user_id = %user.id, "session refreshed");

    Ok((
        jar,
        Json(AuthResponse {
            token,
            user: UserInfo::from(&user),
        }),
    ))
}
