//! API request/response types shared by all handlers.

use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Comment, Poll, PollType, Role, User};
use crate::stores::CommentSort;

// ============================================================================
// Auth types
// ============================================================================

/// Register a new account.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RegisterPayload {
    #[garde(email)]
    pub email: String,
    #[garde(length(min = 1))]
    pub password: String,
}

/// Sign in with existing credentials.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct LoginPayload {
    #[garde(length(min = 1))]
    pub email: String,
    #[garde(length(min = 1))]
    pub password: String,
}

/// Public projection of a user. Never exposes the password hash or salt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            role: user.role,
            created_at: user.created_at,
        }
    }
}

/// Returned by register, login, and refresh: a session token plus the user.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserInfo,
}

/// Current session, if any. `user` is null for anonymous callers.
#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
    pub user: Option<UserInfo>,
}

/// Plain acknowledgement body.
#[derive(Debug, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

// ============================================================================
// Poll types
// ============================================================================

/// Create a poll. Option ids are assigned server-side.
#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePollPayload {
    #[garde(length(min = 1))]
    pub question: String,
    /// Option texts, at least two.
    #[garde(length(min = 2), inner(length(min = 1)))]
    pub options: Vec<String>,
    #[garde(skip)]
    pub start_date: DateTime<Utc>,
    /// Must lie after `start_date`; checked by the handler.
    #[garde(skip)]
    pub end_date: DateTime<Utc>,
    #[garde(skip)]
    #[serde(rename = "type")]
    pub poll_type: PollType,
    #[garde(skip)]
    #[serde(default)]
    pub categories: Vec<String>,
}

/// Returned after creating a poll.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePollResponse {
    pub new_poll: Poll,
}

/// All polls.
#[derive(Debug, Serialize, Deserialize)]
pub struct PollsResponse {
    pub polls: Vec<Poll>,
}

/// Submit or replace a ballot.
#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VotePayload {
    #[garde(skip)]
    pub poll_id: String,
    /// Cardinality rules depend on the poll type; checked by the handler.
    #[garde(skip)]
    pub option_ids: Vec<String>,
    /// Replace an existing ballot instead of rejecting with a conflict.
    #[garde(skip)]
    #[serde(default)]
    pub revote: bool,
}

/// Returned after a recorded ballot.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteResponse {
    pub updated_poll: Poll,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HasVotedQuery {
    pub poll_id: Option<String>,
}

/// The caller's ballot state. Anonymous callers always read as not voted.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HasVotedResponse {
    pub has_voted: bool,
    pub option_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantsQuery {
    pub poll_id: Option<String>,
}

/// Distinct-voter count for a poll.
#[derive(Debug, Serialize, Deserialize)]
pub struct ParticipantsResponse {
    pub participants: u32,
}

// ============================================================================
// Comment types
// ============================================================================

const MIN_COMMENT_LEN: usize = 3;
const MAX_COMMENT_LEN: usize = 500;

/// Server-side banned-substring list; swap for a real moderation service
/// when one exists.
const BANNED_WORDS: [&str; 6] = ["damn", "hell", "shit", "fuck", "bitch", "asshole"];

fn validate_comment_text(value: &str, _ctx: &()) -> garde::Result {
    let clean = value.trim();
    let len = clean.chars().count();
    if len < MIN_COMMENT_LEN {
        return Err(garde::Error::new(format!(
            "Comment is too short (min {MIN_COMMENT_LEN} chars)"
        )));
    }
    if len > MAX_COMMENT_LEN {
        return Err(garde::Error::new(format!(
            "Comment is too long (max {MAX_COMMENT_LEN} chars)"
        )));
    }

    let lower = clean.to_lowercase();
    if BANNED_WORDS.iter().any(|word| lower.contains(word)) {
        return Err(garde::Error::new(
            "Please keep the conversation civil (profanity filtered)",
        ));
    }

    Ok(())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentListQuery {
    pub poll_id: Option<String>,
    pub sort: Option<CommentSort>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

/// Post a comment. Text bounds and the profanity filter apply to the
/// trimmed text.
#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentPayload {
    #[garde(length(min = 1))]
    pub poll_id: String,
    #[garde(custom(validate_comment_text))]
    pub text: String,
}

/// A comment annotated with the caller's like state.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    pub liked_by_me: bool,
}

/// One page of comments. `total` counts the whole poll.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommentsResponse {
    pub total: u32,
    pub comments: Vec<CommentView>,
}

/// Returned after posting a comment.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateCommentResponse {
    pub comment: CommentView,
}

/// Explicit like direction, as an alternative to toggling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LikeAction {
    Like,
    Unlike,
}

/// Like, unlike, or toggle a like on a comment. With `toggle` set or no
/// `action` given, the current state is flipped.
#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LikePayload {
    #[garde(length(min = 1))]
    pub comment_id: String,
    #[garde(skip)]
    #[serde(default)]
    pub action: Option<LikeAction>,
    #[garde(skip)]
    #[serde(default)]
    pub toggle: bool,
}

/// Returned after a like mutation.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeResponse {
    pub comment_id: String,
    pub liked: bool,
    pub likes: u32,
}
