//! Polls and recorded ballots.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::models::Poll;

/// Store for polls and per-user ballots.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PollStore: Send + Sync {
    /// Append a poll.
    async fn add_poll(&self, poll: Poll) -> Result<()>;

    /// All polls, in insertion order.
    async fn list(&self) -> Result<Vec<Poll>>;

    /// Snapshot of one poll.
    async fn get(&self, poll_id: &str) -> Result<Option<Poll>>;

    /// Whether the user has a recorded ballot on the poll.
    async fn has_user_voted(&self, poll_id: &str, user_id: Uuid) -> Result<bool>;

    /// The user's recorded option ids, if any.
    async fn get_user_vote_options(
        &self,
        poll_id: &str,
        user_id: Uuid,
    ) -> Result<Option<Vec<String>>>;

    /// Overwrite the user's recorded ballot without touching counters.
    async fn set_user_vote_options(
        &self,
        poll_id: &str,
        user_id: Uuid,
        option_ids: &[String],
    ) -> Result<()>;

    /// Add one vote to each listed option. Unknown poll or option ids are
    /// skipped.
    async fn increment_votes(&self, poll_id: &str, option_ids: &[String]) -> Result<()>;

    /// Remove one vote from each listed option, clamping counters at zero.
    /// Unknown poll or option ids are skipped.
    async fn decrement_votes(&self, poll_id: &str, option_ids: &[String]) -> Result<()>;

    /// Number of distinct users with a recorded ballot. Zero for unknown
    /// polls.
    async fn get_participant_count(&self, poll_id: &str) -> Result<u32>;

    /// Record a ballot in one step. On a revote the previous selections are
    /// decremented and the new ones incremented under a single lock, so no
    /// reader can observe the half-applied transition.
    async fn submit_vote(
        &self,
        poll_id: &str,
        user_id: Uuid,
        option_ids: &[String],
        revote: bool,
    ) -> Result<VoteOutcome>;
}

/// Result of an atomic ballot submission.
#[derive(Debug, Clone, PartialEq)]
pub enum VoteOutcome {
    /// Ballot recorded; carries the updated poll snapshot.
    Recorded(Poll),
    /// The user already voted and did not ask to revote.
    AlreadyVoted,
    /// The poll disappeared between the handler's lookup and the submit.
    PollNotFound,
}

fn apply_increment(poll: &mut Poll, option_ids: &[String]) {
    for id in option_ids {
        if let Some(option) = poll.options.iter_mut().find(|o| &o.id == id) {
            option.votes += 1;
        }
    }
}

fn apply_decrement(poll: &mut Poll, option_ids: &[String]) {
    for id in option_ids {
        if let Some(option) = poll.options.iter_mut().find(|o| &o.id == id) {
            option.votes = option.votes.saturating_sub(1);
        }
    }
}

#[derive(Default)]
struct PollData {
    polls: Vec<Poll>,
    // poll id -> user id -> chosen option ids
    votes: HashMap<String, HashMap<Uuid, Vec<String>>>,
}

/// In-memory implementation of PollStore.
pub struct MemoryPollStore {
    data: Mutex<PollData>,
}

impl MemoryPollStore {
    pub fn new() -> Self {
        Self {
            data: Mutex::new(PollData::default()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, PollData>> {
        self.data
            .lock()
            .map_err(|_| anyhow::anyhow!("poll store lock poisoned"))
    }
}

impl Default for MemoryPollStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PollStore for MemoryPollStore {
    async fn add_poll(&self, poll: Poll) -> Result<()> {
        self.lock()?.polls.push(poll);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Poll>> {
        Ok(self.lock()?.polls.clone())
    }

    async fn get(&self, poll_id: &str) -> Result<Option<Poll>> {
        let data = self.lock()?;
        Ok(data.polls.iter().find(|p| p.id == poll_id).cloned())
    }

    async fn has_user_voted(&self, poll_id: &str, user_id: Uuid) -> Result<bool> {
        let data = self.lock()?;
        Ok(data
            .votes
            .get(poll_id)
            .is_some_and(|ballots| ballots.contains_key(&user_id)))
    }

    async fn get_user_vote_options(
        &self,
        poll_id: &str,
        user_id: Uuid,
    ) -> Result<Option<Vec<String>>> {
        let data = self.lock()?;
        Ok(data
            .votes
            .get(poll_id)
            .and_then(|ballots| ballots.get(&user_id))
            .cloned())
    }

    async fn set_user_vote_options(
        &self,
        poll_id: &str,
        user_id: Uuid,
        option_ids: &[String],
    ) -> Result<()> {
        let mut data = self.lock()?;
        data.votes
            .entry(poll_id.to_string())
            .or_default()
            .insert(user_id, option_ids.to_vec());
        Ok(())
    }

    async fn increment_votes(&self, poll_id: &str, option_ids: &[String]) -> Result<()> {
        let mut data = self.lock()?;
        if let Some(poll) = data.polls.iter_mut().find(|p| p.id == poll_id) {
            apply_increment(poll, option_ids);
        }
        Ok(())
    }

    async fn decrement_votes(&self, poll_id: &str, option_ids: &[String]) -> Result<()> {
        let mut data = self.lock()?;
        if let Some(poll) = data.polls.iter_mut().find(|p| p.id == poll_id) {
            apply_decrement(poll, option_ids);
        }
        Ok(())
    }

    async fn get_participant_count(&self, poll_id: &str) -> Result<u32> {
        let data = self.lock()?;
        Ok(data
            .votes
            .get(poll_id)
            .map_or(0, |ballots| ballots.len() as u32))
    }

    async fn submit_vote(
        &self,
        poll_id: &str,
        user_id: Uuid,
        option_ids: &[String],
        revote: bool,
    ) -> Result<VoteOutcome> {
        let mut guard = self.lock()?;
        let PollData { polls, votes } = &mut *guard;

        let previous = votes
            .get(poll_id)
            .and_then(|ballots| ballots.get(&user_id))
            .cloned();
        if previous.is_some() && !revote {
            return Ok(VoteOutcome::AlreadyVoted);
        }

        let Some(poll) = polls.iter_mut().find(|p| p.id == poll_id) else {
            return Ok(VoteOutcome::PollNotFound);
        };

        if let Some(previous) = &previous {
            apply_decrement(poll, previous);
        }
        apply_increment(poll, option_ids);

        votes
            .entry(poll_id.to_string())
            .or_default()
            .insert(user_id, option_ids.to_vec());

        Ok(VoteOutcome::Recorded(poll.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PollOption, PollType};
    use chrono::{Duration, Utc};

    fn poll(id: &str, counts: &[(&str, u32)]) -> Poll {
        Poll {
            id: id.to_string(),
            question: "q?".to_string(),
            options: counts
                .iter()
                .map(|(opt_id, votes)| PollOption {
                    id: opt_id.to_string(),
                    text: opt_id.to_string(),
                    votes: *votes,
                })
                .collect(),
            start_date: Utc::now() - Duration::days(1),
            end_date: Utc::now() + Duration::days(1),
            poll_type: PollType::SingleChoice,
            categories: vec![],
            created_at: Utc::now(),
        }
    }

    fn total_votes(poll: &Poll) -> u32 {
        poll.options.iter().map(|o| o.votes).sum()
    }

    fn votes_of(poll: &Poll, option_id: &str) -> u32 {
        poll.options
            .iter()
            .find(|o| o.id == option_id)
            .map(|o| o.votes)
            .unwrap()
    }

    async fn store_with(polls: Vec<Poll>) -> MemoryPollStore {
        let store = MemoryPollStore::new();
        for p in polls {
            store.add_poll(p).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn add_then_get_and_list() {
        let store = store_with(vec![poll("p1", &[("a", 0)]), poll("p2", &[("b", 0)])]).await;

        assert_eq!(store.list().await.unwrap().len(), 2);
        assert_eq!(store.get("p1").await.unwrap().unwrap().id, "p1");
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn first_vote_records_ballot_and_counts() {
        let store = store_with(vec![poll("p1", &[("a", 5), ("b", 3)])]).await;
        let user = Uuid::new_v4();

        let outcome = store
            .submit_vote("p1", user, &["a".to_string()], false)
            .await
            .unwrap();

        let VoteOutcome::Recorded(updated) = outcome else {
            panic!("Expected Recorded, got {outcome:?}");
        };
        assert_eq!(votes_of(&updated, "a"), 6);
        assert_eq!(votes_of(&updated, "b"), 3);
        assert!(store.has_user_voted("p1", user).await.unwrap());
        assert_eq!(
            store.get_user_vote_options("p1", user).await.unwrap(),
            Some(vec!["a".to_string()])
        );
        assert_eq!(store.get_participant_count("p1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn second_vote_without_revote_is_a_conflict() {
        let store = store_with(vec![poll("p1", &[("a", 0), ("b", 0)])]).await;
        let user = Uuid::new_v4();

        store
            .submit_vote("p1", user, &["a".to_string()], false)
            .await
            .unwrap();
        let outcome = store
            .submit_vote("p1", user, &["b".to_string()], false)
            .await
            .unwrap();

        assert_eq!(outcome, VoteOutcome::AlreadyVoted);
        // Nothing moved.
        let current = store.get("p1").await.unwrap().unwrap();
        assert_eq!(votes_of(&current, "a"), 1);
        assert_eq!(votes_of(&current, "b"), 0);
    }

    #[tokio::test]
    async fn revote_moves_counts_and_conserves_the_sum() {
        let store = store_with(vec![poll("p1", &[("a", 10), ("b", 20)])]).await;
        let user = Uuid::new_v4();

        store
            .submit_vote("p1", user, &["a".to_string()], false)
            .await
            .unwrap();
        let outcome = store
            .submit_vote("p1", user, &["b".to_string()], true)
            .await
            .unwrap();

        let VoteOutcome::Recorded(updated) = outcome else {
            panic!("Expected Recorded, got {outcome:?}");
        };
        assert_eq!(votes_of(&updated, "a"), 10);
        assert_eq!(votes_of(&updated, "b"), 21);
        assert_eq!(total_votes(&updated), 31);
        assert_eq!(
            store.get_user_vote_options("p1", user).await.unwrap(),
            Some(vec!["b".to_string()])
        );
    }

    #[tokio::test]
    async fn revote_with_the_same_selection_changes_nothing() {
        let store = store_with(vec![poll("p1", &[("a", 10), ("b", 20)])]).await;
        let user = Uuid::new_v4();

        store
            .submit_vote("p1", user, &["a".to_string()], false)
            .await
            .unwrap();
        let before = store.get("p1").await.unwrap().unwrap();

        let outcome = store
            .submit_vote("p1", user, &["a".to_string()], true)
            .await
            .unwrap();

        let VoteOutcome::Recorded(after) = outcome else {
            panic!("Expected Recorded, got {outcome:?}");
        };
        assert_eq!(votes_of(&after, "a"), votes_of(&before, "a"));
        assert_eq!(total_votes(&after), total_votes(&before));
    }

    #[tokio::test]
    async fn multi_select_revote_conserves_totals() {
        let store = store_with(vec![poll("p1", &[("a", 1), ("b", 2), ("c", 3)])]).await;
        let user = Uuid::new_v4();
        let base = 6;

        store
            .submit_vote("p1", user, &["a".to_string(), "b".to_string()], false)
            .await
            .unwrap();
        let current = store.get("p1").await.unwrap().unwrap();
        assert_eq!(total_votes(&current), base + 2);

        store
            .submit_vote("p1", user, &["c".to_string()], true)
            .await
            .unwrap();
        let current = store.get("p1").await.unwrap().unwrap();
        assert_eq!(total_votes(&current), base + 1);
        assert_eq!(votes_of(&current, "a"), 1);
        assert_eq!(votes_of(&current, "b"), 2);
        assert_eq!(votes_of(&current, "c"), 4);
    }

    #[tokio::test]
    async fn submit_to_unknown_poll_reports_not_found() {
        let store = MemoryPollStore::new();

        let outcome = store
            .submit_vote("missing", Uuid::new_v4(), &["a".to_string()], false)
            .await
            .unwrap();

        assert_eq!(outcome, VoteOutcome::PollNotFound);
    }

    #[tokio::test]
    async fn decrement_clamps_at_zero() {
        let store = store_with(vec![poll("p1", &[("a", 0)])]).await;

        store
            .decrement_votes("p1", &["a".to_string()])
            .await
            .unwrap();

        let current = store.get("p1").await.unwrap().unwrap();
        assert_eq!(votes_of(&current, "a"), 0);
    }

    #[tokio::test]
    async fn unknown_option_ids_are_skipped() {
        let store = store_with(vec![poll("p1", &[("a", 5)])]).await;

        store
            .increment_votes("p1", &["ghost".to_string(), "a".to_string()])
            .await
            .unwrap();

        let current = store.get("p1").await.unwrap().unwrap();
        assert_eq!(votes_of(&current, "a"), 6);
        assert_eq!(total_votes(&current), 6);
    }

    #[tokio::test]
    async fn participant_count_tracks_distinct_voters() {
        let store = store_with(vec![poll("p1", &[("a", 0), ("b", 0)])]).await;
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        assert_eq!(store.get_participant_count("p1").await.unwrap(), 0);

        store
            .submit_vote("p1", alice, &["a".to_string()], false)
            .await
            .unwrap();
        store
            .submit_vote("p1", bob, &["b".to_string()], false)
            .await
            .unwrap();
        assert_eq!(store.get_participant_count("p1").await.unwrap(), 2);

        // A revote does not add a participant.
        store
            .submit_vote("p1", alice, &["b".to_string()], true)
            .await
            .unwrap();
        assert_eq!(store.get_participant_count("p1").await.unwrap(), 2);

        assert_eq!(store.get_participant_count("missing").await.unwrap(), 0);
    }
}
