//! Poll comments: listing, posting, and likes.
//!
//! Rules:
//! - Only users who voted on the poll may comment on it
//! - Comment text is trimmed, bounded, and run through the profanity filter
//! - Likes are idempotent per user; the `toggle` form flips the caller's
//!   current state
//! - Posting and liking are rate limited per client IP
//!
//! Endpoints:
//! - GET /polls/comments?pollId=... - One page of comments for a poll
//! - POST /polls/comments - Post a comment (voters only)
//! - POST /polls/comments/like - Like, unlike, or toggle a like

use axum::{
    Json, Router, debug_handler,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{Duration, Utc};
use garde::Validate;

use crate::api::{
    CommentListQuery, CommentView, CommentsResponse, CreateCommentPayload, CreateCommentResponse,
    LikeAction, LikePayload, LikeResponse,
};
use crate::error::{AppError, AppJson};
use crate::ip::client_ip;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;
use crate::stores::{CommentSort, LikeOutcome};

/// Comment posts allowed per client IP per window.
const COMMENT_RATE_LIMIT: u32 = 5;
/// Like mutations allowed per client IP per window.
const LIKE_RATE_LIMIT: u32 = 20;
const RATE_WINDOW_SECS: i64 = 60;

const DEFAULT_PAGE_SIZE: usize = 5;
const MAX_PAGE_SIZE: usize = 50;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/comments", get(list_comments).post(create_comment))
        .route("/comments/like", post(like_comment))
}

/// Display name shown on comments: the local part of the author's email.
fn display_name(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

#[debug_handler]
async fn list_comments(
    user: Option<AuthUser>,
    State(state): State<AppState>,
    Query(query): Query<CommentListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let poll_id = query
        .poll_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::Validation("pollId required".to_string()))?;

    if state.stores.polls.get(&poll_id).await?.is_none() {
        return Err(AppError::NotFound("Poll not found"));
    }

    let sort = query.sort.unwrap_or(CommentSort::Newest);
    let offset = query.offset.unwrap_or(0);
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    let page = state
        .stores
        .comments
        .list_paginated(&poll_id, sort, offset, limit)
        .await?;

    let viewer = user.map(|auth| auth.user.id);
    let mut comments = Vec::with_capacity(page.items.len());
    for comment in page.items {
        let liked_by_me = match viewer {
            Some(user_id) => {
                state
                    .stores
                    .comments
                    .has_user_liked(&comment.id, user_id)
                    .await?
            }
            None => false,
        };
        comments.push(CommentView {
            comment,
            liked_by_me,
        });
    }

    Ok(Json(CommentsResponse {
        total: page.total,
        comments,
    }))
}

#[debug_handler]
async fn create_comment(
    AuthUser { user }: AuthUser,
    State(state): State<AppState>,
    headers: HeaderMap,
    AppJson(payload): AppJson<CreateCommentPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    if state.stores.polls.get(&payload.poll_id).await?.is_none() {
        return Err(AppError::NotFound("Poll not found"));
    }

    if !state
        .stores
        .polls
        .has_user_voted(&payload.poll_id, user.id)
        .await?
    {
        return Err(AppError::Authorization("You must vote before commenting."));
    }

    let ip = client_ip(&headers);
    let now = Utc::now();
    let decision = state
        .stores
        .rate_limiter
        .check(
            &format!("comment:{ip}"),
            COMMENT_RATE_LIMIT,
            Duration::seconds(RATE_WINDOW_SECS),
            now,
        )
        .await?;
    if !decision.is_allowed() {
        return Err(AppError::RateLimited {
            message: "Rate limit exceeded. Try again soon.",
            retry_after_secs: decision.retry_after_secs(now),
        });
    }

    let comment = state
        .stores
        .comments
        .add(
            &payload.poll_id,
            user.id,
            display_name(&user.email),
            payload.text.trim(),
        )
        .await?;

    tracing::info!(
        poll_id = %payload.poll_id,
        user_id = %user.id,
        comment_id = %comment.id,
        "comment posted"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateCommentResponse {
            comment: CommentView {
                comment,
                liked_by_me: false,
            },
        }),
    ))
}

#[debug_handler]
async fn like_comment(
    AuthUser { user }: AuthUser,
    State(state): State<AppState>,
    headers: HeaderMap,
    AppJson(payload): AppJson<LikePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    if state
        .stores
        .comments
        .get(&payload.comment_id)
        .await?
        .is_none()
    {
        return Err(AppError::NotFound("Comment not found"));
    }

    let ip = client_ip(&headers);
    let now = Utc::now();
    let decision = state
        .stores
        .rate_limiter
        .check(
            &format!("like:{ip}"),
            LIKE_RATE_LIMIT,
            Duration::seconds(RATE_WINDOW_SECS),
            now,
        )
        .await?;
    if !decision.is_allowed() {
        return Err(AppError::RateLimited {
            message: "Rate limit exceeded. Try again soon.",
            retry_after_secs: decision.retry_after_secs(now),
        });
    }

    let outcome = match (payload.toggle, payload.action) {
        (false, Some(LikeAction::Like)) => {
            let likes = state
                .stores
                .comments
                .like(&payload.comment_id, user.id)
                .await?;
            LikeOutcome { liked: true, likes }
        }
        (false, Some(LikeAction::Unlike)) => {
            let likes = state
                .stores
                .comments
                .unlike(&payload.comment_id, user.id)
                .await?;
            LikeOutcome {
                liked: false,
                likes,
            }
        }
        // toggle, or no explicit action: flip the caller's current state
        _ => {
            state
                .stores
                .comments
                .toggle_like(&payload.comment_id, user.id)
                .await?
        }
    };

    tracing::info!(
        comment_id = %payload.comment_id,
        user_id = %user.id,
        liked = outcome.liked,
        "like updated"
    );

    Ok(Json(LikeResponse {
        comment_id: payload.comment_id,
        liked: outcome.liked,
        likes: outcome.likes,
    }))
}
