//! Collaborator contracts: the identity provider and the quest service.
//!
//! Every call may fail and may suspend. No retries happen here.

use std::collections::HashMap;
use std::future::Future;

use thiserror::Error;

use crate::models::{Identity, Principal, Profile, Quest, QuestId, SubjectId};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("malformed stored data: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("backend store lock poisoned")]
    Poisoned,

    #[error("no profile exists yet")]
    NoProfile,

    #[error("a profile already exists")]
    ProfileExists,

    #[error("display name '{0}' is already taken")]
    NameTaken(String),

    #[error("invalid display name: {0}")]
    InvalidName(String),

    #[error("unknown quest {0}")]
    UnknownQuest(QuestId),

    #[error("quest {0} is already completed")]
    QuestAlreadyCompleted(QuestId),
}

pub trait IdentityProvider: Clone + Send + Sync + 'static {
    fn login(&self) -> impl Future<Output = Result<Identity, BackendError>> + Send;

    /// The identity of a session that survived a restart, if any.
    fn current_identity(&self) -> impl Future<Output = Result<Option<Identity>, BackendError>> + Send;

    fn is_authenticated(&self) -> impl Future<Output = Result<bool, BackendError>> + Send;

    fn logout(&self) -> impl Future<Output = Result<(), BackendError>> + Send;
}

/// Profile and quest calls, made on behalf of `caller`.
pub trait QuestService: Clone + Send + Sync + 'static {
    fn get_profile(
        &self,
        caller: &Principal,
    ) -> impl Future<Output = Result<Option<Profile>, BackendError>> + Send;

    fn create_profile(
        &self,
        caller: &Principal,
        display_name: &str,
    ) -> impl Future<Output = Result<Profile, BackendError>> + Send;

    fn change_display_name(
        &self,
        caller: &Principal,
        display_name: &str,
    ) -> impl Future<Output = Result<Profile, BackendError>> + Send;

    fn is_display_name_available(
        &self,
        display_name: &str,
    ) -> impl Future<Output = Result<bool, BackendError>> + Send;

    fn generate_quest(
        &self,
        caller: &Principal,
        difficulty: u32,
    ) -> impl Future<Output = Result<Quest, BackendError>> + Send;

    /// `true` when the answer is correct and the reward was granted.
    fn submit_answer(
        &self,
        caller: &Principal,
        quest_id: QuestId,
        answer: &str,
    ) -> impl Future<Output = Result<bool, BackendError>> + Send;

    fn get_subject_names(
        &self,
        ids: &[SubjectId],
    ) -> impl Future<Output = Result<HashMap<SubjectId, String>, BackendError>> + Send;
}
