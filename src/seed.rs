//! Demo dataset loaded at startup unless `--no-seed` is passed.
//!
//! Mirrors what a small deployment looks like mid-life: an admin account,
//! polls in every window state (open, closing soon, not yet open, closed),
//! and a few liked comments.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::models::{Comment, Poll, PollOption, PollType, Role};
use crate::stores::{MemoryCommentStore, MemoryPollStore, MemoryUserStore, PollStore, UserStore};

/// Credentials for the seeded admin account.
pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "admin123";

pub async fn seed_demo_data(
    users: &MemoryUserStore,
    polls: &MemoryPollStore,
    comments: &MemoryCommentStore,
) -> Result<()> {
    let admin = users
        .create(ADMIN_EMAIL, ADMIN_PASSWORD, Role::Admin)
        .await?
        .context("admin account already exists")?;

    let now = Utc::now();
    for poll in demo_polls(now) {
        polls.add_poll(poll).await?;
    }

    // Authors are display names only; the records belong to the admin user.
    let demo_comments = [
        ("poll-1", "alice", "I think TypeScript scales better long-term.", 2, 3),
        ("poll-1", "bob", "JS forever for flexibility!", 5, 1),
        ("poll-2", "sam", "React all the way!", 7, 4),
    ];
    for (poll_id, author, text, hours_ago, likes) in demo_comments {
        comments.seed_comment(Comment {
            id: Uuid::new_v4().to_string(),
            poll_id: poll_id.to_string(),
            user_id: admin.id,
            author: author.to_string(),
            text: text.to_string(),
            created_at: now - Duration::hours(hours_ago),
            likes,
        })?;
    }

    Ok(())
}

fn option(id: &str, text: &str, votes: u32) -> PollOption {
    PollOption {
        id: id.to_string(),
        text: text.to_string(),
        votes,
    }
}

fn demo_polls(now: DateTime<Utc>) -> Vec<Poll> {
    vec![
        Poll {
            id: "poll-1".to_string(),
            question: "What is your favorite programming language?".to_string(),
            options: vec![
                option("opt-1-1", "JavaScript", 15),
                option("opt-1-2", "Python", 10),
                option("opt-1-3", "TypeScript", 20),
                option("opt-1-4", "Java", 5),
            ],
            poll_type: PollType::SingleChoice,
            start_date: now - Duration::days(1),
            end_date: now + Duration::days(7),
            categories: vec!["Programming".to_string()],
            created_at: now - Duration::days(3),
        },
        Poll {
            id: "poll-2".to_string(),
            question: "Which framework do you prefer for web development?".to_string(),
            options: vec![
                option("opt-2-1", "React", 25),
                option("opt-2-2", "Angular", 8),
                option("opt-2-3", "Vue", 12),
                option("opt-2-4", "Svelte", 7),
            ],
            poll_type: PollType::SingleChoice,
            start_date: now - Duration::days(3),
            end_date: now + Duration::days(2),
            categories: vec!["Programming".to_string(), "Web".to_string()],
            created_at: now - Duration::days(6),
        },
        Poll {
            id: "poll-3".to_string(),
            question: "Favorite season? (Multi-select)".to_string(),
            options: vec![
                option("opt-3-1", "Spring", 5),
                option("opt-3-2", "Summer", 10),
                option("opt-3-3", "Autumn", 8),
                option("opt-3-4", "Winter", 3),
            ],
            poll_type: PollType::MultiSelect,
            start_date: now + Duration::days(1),
            end_date: now + Duration::days(8),
            categories: vec!["Lifestyle".to_string()],
            created_at: now - Duration::days(1),
        },
        Poll {
            id: "poll-4".to_string(),
            question: "Best pet? (Closed)".to_string(),
            options: vec![
                option("opt-4-1", "Dog", 10),
                option("opt-4-2", "Cat", 7),
                option("opt-4-3", "Fish", 2),
            ],
            poll_type: PollType::SingleChoice,
            start_date: now - Duration::days(10),
            end_date: now - Duration::days(5),
            categories: vec!["Lifestyle".to_string(), "Pets".to_string()],
            created_at: now - Duration::days(12),
        },
    ]
}
