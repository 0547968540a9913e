use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account role. Poll creation can be restricted to admins via config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

/// A registered account. Deliberately not `Serialize`: `password_hash` and
/// `salt` must never leave the process. Responses use `api::UserInfo`.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub salt: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Whether a ballot carries one option or several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PollType {
    SingleChoice,
    MultiSelect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollOption {
    pub id: String,
    pub text: String,
    pub votes: u32,
}

/// A poll with its live vote counters. Options embed their counts, so a poll
/// snapshot is everything a client needs to render results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    pub id: String,
    pub question: String,
    pub options: Vec<PollOption>,
    /// Voting is open while `start_date <= now <= end_date`.
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(rename = "type")]
    pub poll_type: PollType,
    pub categories: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub poll_id: String,
    pub user_id: Uuid,
    /// Display name derived from the author's email local part.
    pub author: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub likes: u32,
}
