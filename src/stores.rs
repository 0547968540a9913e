//! In-memory data stores.
//!
//! This module contains traits and implementations for all process-local
//! state. Each store is abstracted behind a trait to enable mocking in
//! tests; the in-memory implementations guard their data with a plain
//! mutex and keep every multi-step mutation inside one critical section.
//!
//! ## Stores
//!
//! - **users** - Accounts with salted password hashes
//! - **polls** - Polls, option counters, and per-user ballots
//! - **comments** - Per-poll comments with like sets
//! - **rate_limiter** - Fixed-window request counters
//!
//! ## Usage in Handlers
//!
//! Stores are accessed via `state.stores`:
//!
//! ```ignore
//! async fn handler(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
//!     let poll = state.stores.polls.get(&poll_id).await?;
//!     let outcome = state.stores.polls.submit_vote(&poll_id, user.id, &ids, revote).await?;
//! }
//! ```

mod comments;
mod polls;
mod rate_limit;
mod users;

pub use comments::{CommentPage, CommentSort, CommentStore, LikeOutcome, MemoryCommentStore};
pub use polls::{MemoryPollStore, PollStore, VoteOutcome};
pub use rate_limit::{MemoryRateLimiter, RateLimitDecision, RateLimiter};
pub use users::{MemoryUserStore, UserStore};

#[cfg(test)]
pub use comments::MockCommentStore;
#[cfg(test)]
pub use polls::MockPollStore;
#[cfg(test)]
pub use rate_limit::MockRateLimiter;
#[cfg(test)]
pub use users::MockUserStore;

use std::sync::Arc;

/// Collection of all data stores.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub polls: Arc<dyn PollStore>,
    pub comments: Arc<dyn CommentStore>,
    pub rate_limiter: Arc<dyn RateLimiter>,
}
