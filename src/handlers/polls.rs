//! Poll listing, creation, and voting.
//!
//! Voting rules:
//! - One ballot per user per poll; `revote: true` replaces the previous
//!   ballot instead of rejecting it with a conflict
//! - Single-choice polls accept exactly one option id
//! - Ballots are only accepted inside the poll's voting window
//! - Submissions are rate limited per client IP
//!
//! Endpoints:
//! - GET /polls - List all polls
//! - POST /polls - Create a poll (admin-gated when configured)
//! - POST /polls/vote - Submit or replace a ballot
//! - GET /polls/has-voted - The caller's ballot state for a poll
//! - GET /polls/participants - Distinct voter count for a poll

use std::collections::HashSet;

use axum::{
    Json, Router, debug_handler,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{Duration, Utc};
use garde::Validate;
use uuid::Uuid;

use crate::api::{
    CreatePollPayload, CreatePollResponse, HasVotedQuery, HasVotedResponse, ParticipantsQuery,
    ParticipantsResponse, PollsResponse, VotePayload, VoteResponse,
};
use crate::error::{AppError, AppJson};
use crate::ip::client_ip;
use crate::middleware::auth::AuthUser;
use crate::models::{Poll, PollOption, PollType, Role};
use crate::state::AppState;
use crate::stores::VoteOutcome;

/// Ballot submissions allowed per client IP per window.
const VOTE_RATE_LIMIT: u32 = 20;
const RATE_WINDOW_SECS: i64 = 60;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_polls).post(create_poll))
        .route("/vote", post(submit_vote))
        .route("/has-voted", get(has_voted))
        .route("/participants", get(participants))
}

#[debug_handler]
async fn list_polls(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let polls = state.stores.polls.list().await?;

    Ok(Json(PollsResponse { polls }))
}

#[debug_handler]
async fn create_poll(
    user: Option<AuthUser>,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreatePollPayload>,
) -> Result<impl IntoResponse, AppError> {
    if state.config.admin_only_poll_creation {
        let AuthUser { user } = user.ok_or(AppError::Authentication("Unauthorized"))?;
        if user.role != Role::Admin {
            return Err(AppError::Authorization("Forbidden: admins only"));
        }
    }

    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    if payload.end_date <= payload.start_date {
        return Err(AppError::Validation(
            "endDate must be after startDate".to_string(),
        ));
    }

    let options = payload
        .options
        .iter()
        .map(|text| PollOption {
            id: Uuid::new_v4().to_string(),
            text: text.clone(),
            votes: 0,
        })
        .collect();

    let categories = payload
        .categories
        .into_iter()
        .filter(|category| !category.trim().is_empty())
        .collect();

    let poll = Poll {
        id: Uuid::new_v4().to_string(),
        question: payload.question,
        options,
        poll_type: payload.poll_type,
        start_date: payload.start_date,
        end_date: payload.end_date,
        categories,
        created_at: Utc::now(),
    };

    state.stores.polls.add_poll(poll.clone()).await?;

    tracing::info!(poll_id = %poll.id, "poll created");

    Ok((
        StatusCode::CREATED,
        Json(CreatePollResponse { new_poll: poll }),
    ))
}

#[debug_handler]
async fn submit_vote(
    AuthUser { user }: AuthUser,
    State(state): State<AppState>,
    headers: HeaderMap,
    AppJson(payload): AppJson<VotePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let ip = client_ip(&headers);
    let now = Utc::now();
    let decision = state
        .stores
        .rate_limiter
        .check(
            &format!("vote:{ip}"),
            VOTE_RATE_LIMIT,
            Duration::seconds(RATE_WINDOW_SECS),
            now,
        )
        .await?;
    if !decision.is_allowed() {
        return Err(AppError::RateLimited {
            message: "Too many requests. Please wait a moment.",
            retry_after_secs: decision.retry_after_secs(now),
        });
    }

    let poll = state
        .stores
        .polls
        .get(&payload.poll_id)
        .await?
        .ok_or(AppError::NotFound("Poll not found"))?;

    if now < poll.start_date {
        return Err(AppError::Authorization(
            "Voting has not started for this poll.",
        ));
    }
    if now > poll.end_date {
        return Err(AppError::Authorization("Voting has ended for this poll."));
    }

    if payload.option_ids.is_empty() {
        return Err(AppError::Validation(
            "No options selected for voting.".to_string(),
        ));
    }
    if poll.poll_type == PollType::SingleChoice && payload.option_ids.len() != 1 {
        return Err(AppError::Validation(
            "Select exactly one option for single-choice polls.".to_string(),
        ));
    }

    let known: HashSet<&str> = poll.options.iter().map(|option| option.id.as_str()).collect();
    if payload
        .option_ids
        .iter()
        .any(|id| !known.contains(id.as_str()))
    {
        return Err(AppError::Validation(
            "One or more selected options not found".to_string(),
        ));
    }

    let outcome = state
        .stores
        .polls
        .submit_vote(&payload.poll_id, user.id, &payload.option_ids, payload.revote)
        .await?;

    let updated_poll = match outcome {
        VoteOutcome::Recorded(poll) => poll,
        VoteOutcome::AlreadyVoted => {
            return Err(AppError::Conflict("You have already voted on this poll."));
        }
        VoteOutcome::PollNotFound => return Err(AppError::NotFound("Poll not found")),
    };

    tracing::info!(
        poll_id = %payload.poll_id,
        user_id = %user.id,
        revote = payload.revote,
        "ballot recorded"
    );

    Ok(Json(VoteResponse { updated_poll }))
}

#[debug_handler]
async fn has_voted(
    user: Option<AuthUser>,
    State(state): State<AppState>,
    Query(query): Query<HasVotedQuery>,
) -> Result<impl IntoResponse, AppError> {
    let poll_id = query
        .poll_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::Validation("pollId required".to_string()))?;

    if state.stores.polls.get(&poll_id).await?.is_none() {
        return Err(AppError::NotFound("Poll not found"));
    }

    let Some(AuthUser { user }) = user else {
        return Ok(Json(HasVotedResponse {
            has_voted: false,
            option_ids: vec![],
        }));
    };

    let has_voted = state.stores.polls.has_user_voted(&poll_id, user.id).await?;
    let option_ids = state
        .stores
        .polls
        .get_user_vote_options(&poll_id, user.id)
        .await?
        .unwrap_or_default();

    Ok(Json(HasVotedResponse {
        has_voted,
        option_ids,
    }))
}

#[debug_handler]
async fn participants(
    State(state): State<AppState>,
    Query(query): Query<ParticipantsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let poll_id = query
        .poll_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::Validation("Missing pollId".to_string()))?;

    // Unknown polls read as zero participants rather than 404 so the count
    // can be polled for drafts the client has not persisted yet.
    let participants = state.stores.polls.get_participant_count(&poll_id).await?;

    Ok(Json(ParticipantsResponse { participants }))
}
