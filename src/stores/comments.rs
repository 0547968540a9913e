//! Poll comments with per-user likes.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Comment;

/// Comment ordering for paginated listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommentSort {
    Newest,
    MostLiked,
}

/// One page of comments plus the poll's total comment count.
#[derive(Debug, Clone, PartialEq)]
pub struct CommentPage {
    pub total: u32,
    pub items: Vec<Comment>,
}

/// Result of an atomic like toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeOutcome {
    /// Whether the user likes the comment after the toggle.
    pub liked: bool,
    /// Updated like counter.
    pub likes: u32,
}

/// Store for comments and their like sets.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommentStore: Send + Sync {
    /// Append a comment with a fresh id, the current time, and zero likes.
    async fn add(&self, poll_id: &str, user_id: Uuid, author: &str, text: &str)
    -> Result<Comment>;

    /// Fetch one comment.
    async fn get(&self, comment_id: &str) -> Result<Option<Comment>>;

    /// One page of a poll's comments. `total` counts the whole poll, not
    /// the page.
    async fn list_paginated(
        &self,
        poll_id: &str,
        sort: CommentSort,
        offset: usize,
        limit: usize,
    ) -> Result<CommentPage>;

    /// Record a like. Idempotent: liking twice leaves the counter alone.
    /// Errors if the comment does not exist.
    async fn like(&self, comment_id: &str, user_id: Uuid) -> Result<u32>;

    /// Remove a like. Idempotent; the counter clamps at zero. Errors if
    /// the comment does not exist.
    async fn unlike(&self, comment_id: &str, user_id: Uuid) -> Result<u32>;

    /// Flip the user's like based on current state, in one step. Errors if
    /// the comment does not exist.
    async fn toggle_like(&self, comment_id: &str, user_id: Uuid) -> Result<LikeOutcome>;

    /// Whether the user currently likes the comment.
    async fn has_user_liked(&self, comment_id: &str, user_id: Uuid) -> Result<bool>;
}

#[derive(Default)]
struct CommentData {
    comments: Vec<Comment>,
    // comment id -> users who like it
    likes: HashMap<String, HashSet<Uuid>>,
}

/// Sets or clears one user's like and returns the updated counter.
/// Seeded comments may carry a counter above their like-set size; the
/// set only ever adjusts the counter by its own membership changes.
fn set_like_state(
    comments: &mut [Comment],
    likes: &mut HashMap<String, HashSet<Uuid>>,
    comment_id: &str,
    user_id: Uuid,
    liked: bool,
) -> Result<u32> {
    let Some(comment) = comments.iter_mut().find(|c| c.id == comment_id) else {
        anyhow::bail!("comment {comment_id} does not exist");
    };
    let set = likes.entry(comment.id.clone()).or_default();

    if liked {
        if set.insert(user_id) {
            comment.likes += 1;
        }
    } else if set.remove(&user_id) {
        comment.likes = comment.likes.saturating_sub(1);
    }

    Ok(comment.likes)
}

/// In-memory implementation of CommentStore.
pub struct MemoryCommentStore {
    data: Mutex<CommentData>,
}

impl MemoryCommentStore {
    pub fn new() -> Self {
        Self {
            data: Mutex::new(CommentData::default()),
        }
    }

    /// Insert a pre-built comment, preserving its id, timestamp, and like
    /// counter. Only the demo seed uses this; request paths go through
    /// [`CommentStore::add`].
    pub fn seed_comment(&self, comment: Comment) -> Result<()> {
        self.lock()?.comments.push(comment);
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, CommentData>> {
        self.data
            .lock()
            .map_err(|_| anyhow::anyhow!("comment store lock poisoned"))
    }
}

impl Default for MemoryCommentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommentStore for MemoryCommentStore {
    async fn add(
        &self,
        poll_id: &str,
        user_id: Uuid,
        author: &str,
        text: &str,
    ) -> Result<Comment> {
        let comment = Comment {
            id: Uuid::new_v4().to_string(),
            poll_id: poll_id.to_string(),
            user_id,
            author: author.to_string(),
            text: text.to_string(),
            created_at: Utc::now(),
            likes: 0,
        };
        self.lock()?.comments.push(comment.clone());

        Ok(comment)
    }

    async fn get(&self, comment_id: &str) -> Result<Option<Comment>> {
        let data = self.lock()?;
        Ok(data.comments.iter().find(|c| c.id == comment_id).cloned())
    }

    async fn list_paginated(
        &self,
        poll_id: &str,
        sort: CommentSort,
        offset: usize,
        limit: usize,
    ) -> Result<CommentPage> {
        let data = self.lock()?;
        let mut items: Vec<Comment> = data
            .comments
            .iter()
            .filter(|c| c.poll_id == poll_id)
            .cloned()
            .collect();

        match sort {
            CommentSort::Newest => items.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            CommentSort::MostLiked => items.sort_by(|a, b| {
                b.likes
                    .cmp(&a.likes)
                    .then_with(|| b.created_at.cmp(&a.created_at))
            }),
        }

        let total = items.len() as u32;
        let items = items.into_iter().skip(offset).take(limit).collect();

        Ok(CommentPage { total, items })
    }

    async fn like(&self, comment_id: &str, user_id: Uuid) -> Result<u32> {
        let mut guard = self.lock()?;
        let CommentData { comments, likes } = &mut *guard;
        set_like_state(comments, likes, comment_id, user_id, true)
    }

    async fn unlike(&self, comment_id: &str, user_id: Uuid) -> Result<u32> {
        let mut guard = self.lock()?;
        let CommentData { comments, likes } = &mut *guard;
        set_like_state(comments, likes, comment_id, user_id, false)
    }

    async fn toggle_like(&self, comment_id: &str, user_id: Uuid) -> Result<LikeOutcome> {
        let mut guard = self.lock()?;
        let CommentData { comments, likes } = &mut *guard;

        let currently = likes
            .get(comment_id)
            .is_some_and(|set| set.contains(&user_id));
        let count = set_like_state(comments, likes, comment_id, user_id, !currently)?;

        Ok(LikeOutcome {
            liked: !currently,
            likes: count,
        })
    }

    async fn has_user_liked(&self, comment_id: &str, user_id: Uuid) -> Result<bool> {
        let data = self.lock()?;
        Ok(data
            .likes
            .get(comment_id)
            .is_some_and(|set| set.contains(&user_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn at(hours_ago: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() - Duration::hours(hours_ago)
    }

    fn comment(id: &str, poll_id: &str, likes: u32, hours_ago: i64) -> Comment {
        Comment {
            id: id.to_string(),
            poll_id: poll_id.to_string(),
            user_id: Uuid::new_v4(),
            author: "tester".to_string(),
            text: "some comment".to_string(),
            created_at: at(hours_ago),
            likes,
        }
    }

    fn seeded(comments: Vec<Comment>) -> MemoryCommentStore {
        let store = MemoryCommentStore::new();
        for c in comments {
            store.seed_comment(c).unwrap();
        }
        store
    }

    #[tokio::test]
    async fn add_starts_with_zero_likes() {
        let store = MemoryCommentStore::new();

        let comment = store
            .add("poll-1", Uuid::new_v4(), "alice", "first!")
            .await
            .unwrap();

        assert_eq!(comment.likes, 0);
        assert_eq!(comment.poll_id, "poll-1");
        assert!(store.get(&comment.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn like_is_idempotent() {
        let store = seeded(vec![comment("c1", "p1", 0, 1)]);
        let user = Uuid::new_v4();

        assert_eq!(store.like("c1", user).await.unwrap(), 1);
        assert_eq!(store.like("c1", user).await.unwrap(), 1);
        assert!(store.has_user_liked("c1", user).await.unwrap());
    }

    #[tokio::test]
    async fn unlike_is_idempotent_and_clamps_at_zero() {
        let store = seeded(vec![comment("c1", "p1", 0, 1)]);
        let user = Uuid::new_v4();

        assert_eq!(store.unlike("c1", user).await.unwrap(), 0);

        store.like("c1", user).await.unwrap();
        assert_eq!(store.unlike("c1", user).await.unwrap(), 0);
        assert_eq!(store.unlike("c1", user).await.unwrap(), 0);
        assert!(!store.has_user_liked("c1", user).await.unwrap());
    }

    #[tokio::test]
    async fn toggle_flips_like_state() {
        let store = seeded(vec![comment("c1", "p1", 0, 1)]);
        let user = Uuid::new_v4();

        let first = store.toggle_like("c1", user).await.unwrap();
        assert_eq!(
            first,
            LikeOutcome {
                liked: true,
                likes: 1
            }
        );

        let second = store.toggle_like("c1", user).await.unwrap();
        assert_eq!(
            second,
            LikeOutcome {
                liked: false,
                likes: 0
            }
        );
    }

    #[tokio::test]
    async fn like_on_missing_comment_errors() {
        let store = MemoryCommentStore::new();
        let user = Uuid::new_v4();

        assert!(store.like("ghost", user).await.is_err());
        assert!(store.unlike("ghost", user).await.is_err());
        assert!(store.toggle_like("ghost", user).await.is_err());
    }

    #[tokio::test]
    async fn seeded_counter_survives_foreign_unlike() {
        // Seed data ships counters without matching like-set entries; an
        // unlike from a user who never liked must not erode them.
        let store = seeded(vec![comment("c1", "p1", 3, 1)]);
        let user = Uuid::new_v4();

        assert_eq!(store.unlike("c1", user).await.unwrap(), 3);
        assert_eq!(store.like("c1", user).await.unwrap(), 4);
        assert_eq!(store.unlike("c1", user).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn newest_sort_orders_by_created_at_desc() {
        let store = seeded(vec![
            comment("old", "p1", 9, 10),
            comment("new", "p1", 0, 1),
            comment("mid", "p1", 5, 5),
        ]);

        let page = store
            .list_paginated("p1", CommentSort::Newest, 0, 10)
            .await
            .unwrap();

        let ids: Vec<&str> = page.items.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["new", "mid", "old"]);
    }

    #[tokio::test]
    async fn most_liked_sort_breaks_ties_by_recency() {
        let store = seeded(vec![
            comment("few", "p1", 1, 1),
            comment("tied_old", "p1", 4, 8),
            comment("tied_new", "p1", 4, 2),
        ]);

        let page = store
            .list_paginated("p1", CommentSort::MostLiked, 0, 10)
            .await
            .unwrap();

        let ids: Vec<&str> = page.items.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["tied_new", "tied_old", "few"]);
    }

    #[tokio::test]
    async fn pagination_slices_but_reports_full_total() {
        let store = seeded(
            (0..5)
                .map(|i| comment(&format!("c{i}"), "p1", 0, i))
                .collect(),
        );

        let page = store
            .list_paginated("p1", CommentSort::Newest, 2, 2)
            .await
            .unwrap();

        assert_eq!(page.total, 5);
        let ids: Vec<&str> = page.items.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["c2", "c3"]);

        let past_end = store
            .list_paginated("p1", CommentSort::Newest, 10, 2)
            .await
            .unwrap();
        assert_eq!(past_end.total, 5);
        assert!(past_end.items.is_empty());
    }

    #[tokio::test]
    async fn listing_filters_by_poll() {
        let store = seeded(vec![comment("c1", "p1", 0, 1), comment("c2", "p2", 0, 2)]);

        let page = store
            .list_paginated("p1", CommentSort::Newest, 0, 10)
            .await
            .unwrap();

        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].id, "c1");
    }
}
