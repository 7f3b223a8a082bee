use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque id of a signed-in user, as the backend sees the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal(pub String);

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubjectId(pub String);

impl From<&str> for SubjectId {
    fn from(s: &str) -> Self {
        SubjectId(s.to_string())
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub type QuestId = i64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub principal: Principal,
}

/// Per-subject progress. Owned by the backend, read-only on the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectProgress {
    pub subject_id: SubjectId,
    pub level: u32,
    pub total_xp: u64,
    pub credits: u64,
    pub quests_completed: u32,
}

impl SubjectProgress {
    pub fn new(subject_id: SubjectId) -> Self {
        Self {
            subject_id,
            level: 1,
            total_xp: 0,
            credits: 0,
            quests_completed: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub principal: Principal,
    pub display_name: String,
    pub subject_progress: Vec<SubjectProgress>,
    pub created_at: String,
}

impl Profile {
    pub fn subject(&self, id: &SubjectId) -> Option<&SubjectProgress> {
        self.subject_progress.iter().find(|p| &p.subject_id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestContent {
    pub question: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quest {
    pub id: QuestId,
    pub subject_id: SubjectId,
    pub difficulty: u32,
    pub content: QuestContent,
    pub xp_reward: u64,
    pub credit_reward: u64,
}

pub const MATH_SUBJECT: &str = "math";
pub const MAX_DISPLAY_NAME_LEN: usize = 32;
