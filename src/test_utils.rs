//! Shared test utilities for handler tests.
//!
//! Provides record factories and a `TestStateBuilder` for constructing
//! `AppState` instances. Stores default to the real in-memory
//! implementations; tests that need to force an outcome (an exhausted rate
//! limiter, a failing store) swap in a mock for just that slot.
//!
//! ## Usage
//!
//! ```ignore
//! use crate::test_utils::{TestStateBuilder, open_poll};
//!
//! let mut rate_limiter = MockRateLimiter::new();
//! rate_limiter.expect_check().returning(|_, _, _, now| {
//!     Ok(RateLimitDecision::Exceeded { reset_at: now })
//! });
//!
//! let state = TestStateBuilder::new()
//!     .with_rate_limiter(rate_limiter)
//!     .build();
//! ```

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::config::Config;
use crate::models::{Poll, PollOption, PollType, Role, User};
use crate::session::SessionSigner;
use crate::state::AppState;
use crate::stores::{
    CommentStore, MemoryCommentStore, MemoryPollStore, MemoryRateLimiter, MemoryUserStore,
    PollStore, RateLimiter, Stores, UserStore,
};

/// Creates a test configuration with dummy values.
pub fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 3000,
        env: "test".to_string(),
        session_secret: "test-secret".to_string(),
        admin_only_poll_creation: false,
    }
}

/// Creates a user record with throwaway credentials.
pub fn mock_user(email: &str) -> User {
    User {
        id: Uuid::new_v4(),
        email: email.to_string(),
        password_hash: "not-a-real-hash".to_string(),
        salt: "not-a-real-salt".to_string(),
        role: Role::User,
        created_at: Utc::now(),
    }
}

/// Creates a single-choice poll with options `opt-a` / `opt-b` whose voting
/// window is currently open.
pub fn open_poll(id: &str) -> Poll {
    poll_with_window(
        id,
        PollType::SingleChoice,
        Utc::now() - Duration::days(1),
        Utc::now() + Duration::days(1),
    )
}

/// Creates a poll with options `opt-a` / `opt-b` and the given type and
/// voting window.
pub fn poll_with_window(
    id: &str,
    poll_type: PollType,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
) -> Poll {
    Poll {
        id: id.to_string(),
        question: "Tabs or spaces?".to_string(),
        options: vec![
            PollOption {
                id: "opt-a".to_string(),
                text: "Tabs".to_string(),
                votes: 0,
            },
            PollOption {
                id: "opt-b".to_string(),
                text: "Spaces".to_string(),
                votes: 0,
            },
        ],
        poll_type,
        start_date,
        end_date,
        categories: vec![],
        created_at: Utc::now(),
    }
}

/// Builder for constructing test `AppState` instances.
///
/// Any store not explicitly set falls back to a fresh in-memory
/// implementation, so most tests exercise the real store behavior.
pub struct TestStateBuilder {
    config: Config,
    users: Option<Arc<dyn UserStore>>,
    polls: Option<Arc<dyn PollStore>>,
    comments: Option<Arc<dyn CommentStore>>,
    rate_limiter: Option<Arc<dyn RateLimiter>>,
}

impl TestStateBuilder {
    /// Creates a new builder with the test configuration and no overrides.
    pub fn new() -> Self {
        Self {
            config: test_config(),
            users: None,
            polls: None,
            comments: None,
            rate_limiter: None,
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    #[allow(dead_code)]
    pub fn with_users(mut self, store: impl UserStore + 'static) -> Self {
        self.users = Some(Arc::new(store));
        self
    }

    #[allow(dead_code)]
    pub fn with_polls(mut self, store: impl PollStore + 'static) -> Self {
        self.polls = Some(Arc::new(store));
        self
    }

    #[allow(dead_code)]
    pub fn with_comments(mut self, store: impl CommentStore + 'static) -> Self {
        self.comments = Some(Arc::new(store));
        self
    }

    pub fn with_rate_limiter(mut self, limiter: impl RateLimiter + 'static) -> Self {
        self.rate_limiter = Some(Arc::new(limiter));
        self
    }

    /// Builds the `AppState` using configured stores or in-memory defaults.
    pub fn build(self) -> AppState {
        let session = SessionSigner::new(&self.config.session_secret);

        let stores = Stores {
            users: self
                .users
                .unwrap_or_else(|| Arc::new(MemoryUserStore::new())),
            polls: self
                .polls
                .unwrap_or_else(|| Arc::new(MemoryPollStore::new())),
            comments: self
                .comments
                .unwrap_or_else(|| Arc::new(MemoryCommentStore::new())),
            rate_limiter: self
                .rate_limiter
                .unwrap_or_else(|| Arc::new(MemoryRateLimiter::new())),
        };

        AppState {
            config: self.config,
            session,
            stores,
        }
    }
}

impl Default for TestStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
