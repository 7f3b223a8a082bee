//! SQLite-backed stand-in for the remote quest service and identity
//! provider. Rewards are granted with the same `ProgressionConfig` the
//! client previews them with.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Local;
use rusqlite::Connection;
use tracing::{debug, info};
use uuid::Uuid;

use crate::backend::{BackendError, IdentityProvider, QuestService};
use crate::db;
use crate::models::{
    Identity, MATH_SUBJECT, MAX_DISPLAY_NAME_LEN, Principal, Profile, Quest, QuestContent, QuestId,
    SubjectId, SubjectProgress,
};
use crate::progression::ProgressionConfig;
use crate::quests;

#[derive(Clone)]
pub struct LocalStore {
    conn: Arc<Mutex<Connection>>,
    progression: ProgressionConfig,
}

impl LocalStore {
    pub fn open(path: &Path, progression: ProgressionConfig) -> Result<Self, BackendError> {
        let conn = db::init_db(path)?;
        info!("opened store at {}", path.display());
        Ok(Self::from_connection(conn, progression))
    }

    pub fn open_in_memory(progression: ProgressionConfig) -> Result<Self, BackendError> {
        let conn = Connection::open_in_memory()?;
        db::init_schema(&conn)?;
        Ok(Self::from_connection(conn, progression))
    }

    fn from_connection(conn: Connection, progression: ProgressionConfig) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            progression,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, BackendError> {
        self.conn.lock().map_err(|_| BackendError::Poisoned)
    }

    fn now() -> String {
        Local::now().format("%Y-%m-%dT%H:%M:%S").to_string()
    }

    fn require_profile(conn: &Connection, caller: &Principal) -> Result<Profile, BackendError> {
        db::get_profile(conn, caller)?.ok_or(BackendError::NoProfile)
    }

    fn do_login(&self) -> Result<Identity, BackendError> {
        let conn = self.lock()?;
        let principal = match db::latest_identity(&conn)? {
            Some(p) => p,
            None => {
                let p = Principal(Uuid::new_v4().to_string());
                db::insert_identity(&conn, &p, &Self::now())?;
                info!(principal = %p, "created new identity");
                p
            }
        };
        db::set_signed_in(&conn, Some(&principal))?;
        Ok(Identity { principal })
    }

    fn do_create_profile(&self, caller: &Principal, display_name: &str) -> Result<Profile, BackendError> {
        let name = validate_display_name(display_name)?;
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        if db::get_profile(&tx, caller)?.is_some() {
            return Err(BackendError::ProfileExists);
        }
        if db::display_name_taken(&tx, &name, None)? {
            return Err(BackendError::NameTaken(name));
        }
        db::insert_profile(&tx, caller, &name, &Self::now())?;
        let profile = Self::require_profile(&tx, caller)?;
        tx.commit()?;
        info!(principal = %caller, name = %name, "profile created");
        Ok(profile)
    }

    fn do_change_display_name(
        &self,
        caller: &Principal,
        display_name: &str,
    ) -> Result<Profile, BackendError> {
        let name = validate_display_name(display_name)?;
        let conn = self.lock()?;
        Self::require_profile(&conn, caller)?;
        if db::display_name_taken(&conn, &name, Some(caller))? {
            return Err(BackendError::NameTaken(name));
        }
        db::update_display_name(&conn, caller, &name)?;
        Self::require_profile(&conn, caller)
    }

    fn do_name_available(&self, display_name: &str) -> Result<bool, BackendError> {
        let Ok(name) = validate_display_name(display_name) else {
            return Ok(false);
        };
        let conn = self.lock()?;
        Ok(!db::display_name_taken(&conn, &name, None)?)
    }

    fn do_generate_quest(&self, caller: &Principal, difficulty: u32) -> Result<Quest, BackendError> {
        let difficulty = difficulty.max(1);
        let problem = quests::generate(&mut rand::rng(), difficulty);
        let subject_id = SubjectId::from(MATH_SUBJECT);
        let content = QuestContent {
            question: problem.question,
        };
        let xp_reward = self.progression.quest_xp_reward(difficulty);
        let credit_reward = self.progression.quest_credit_reward(difficulty);

        let conn = self.lock()?;
        Self::require_profile(&conn, caller)?;
        let id = db::insert_quest(
            &conn,
            caller,
            &subject_id,
            difficulty,
            &serde_json::to_string(&content)?,
            problem.answer,
            xp_reward,
            credit_reward,
            &Self::now(),
        )?;
        debug!(quest = id, difficulty, "quest generated");

        Ok(Quest {
            id,
            subject_id,
            difficulty,
            content,
            xp_reward,
            credit_reward,
        })
    }

    fn do_submit_answer(
        &self,
        caller: &Principal,
        quest_id: QuestId,
        answer: &str,
    ) -> Result<bool, BackendError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let quest = db::get_quest(&tx, caller, quest_id)?.ok_or(BackendError::UnknownQuest(quest_id))?;
        if quest.completed {
            return Err(BackendError::QuestAlreadyCompleted(quest_id));
        }
        if !quests::is_correct(quest.answer, answer) {
            debug!(quest = quest_id, difficulty = quest.difficulty, content = %quest.content, "wrong answer");
            return Ok(false);
        }

        let profile = Self::require_profile(&tx, caller)?;
        let mut progress = profile
            .subject(&quest.subject_id)
            .cloned()
            .unwrap_or_else(|| SubjectProgress::new(quest.subject_id.clone()));
        db::insert_subject_progress(&tx, caller, &progress)?;

        let old_level = progress.level;
        progress.total_xp = progress.total_xp.saturating_add(quest.xp_reward);
        progress.credits = progress.credits.saturating_add(quest.credit_reward);
        progress.quests_completed = progress.quests_completed.saturating_add(1);
        progress.level = self.progression.level_for_total_xp(progress.total_xp);

        db::update_subject_progress(&tx, caller, &progress)?;
        db::mark_quest_completed(&tx, quest_id)?;
        tx.commit()?;

        info!(
            quest = quest_id,
            xp = quest.xp_reward,
            credits = quest.credit_reward,
            level = progress.level,
            "quest completed"
        );
        if progress.level > old_level {
            info!(subject = %progress.subject_id, level = progress.level, "level up");
        }
        Ok(true)
    }

    #[cfg(test)]
    fn decode_quest(id: QuestId, row: db::QuestRow) -> Result<Quest, BackendError> {
        Ok(Quest {
            id,
            subject_id: row.subject_id,
            difficulty: row.difficulty,
            content: serde_json::from_str(&row.content)?,
            xp_reward: row.xp_reward,
            credit_reward: row.credit_reward,
        })
    }

    /// Stored quest without its answer.
    #[cfg(test)]
    fn quest(&self, caller: &Principal, id: QuestId) -> Result<Option<Quest>, BackendError> {
        let conn = self.lock()?;
        db::get_quest(&conn, caller, id)?
            .map(|row| Self::decode_quest(id, row))
            .transpose()
    }
}

fn validate_display_name(raw: &str) -> Result<String, BackendError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(BackendError::InvalidName("name is empty".to_string()));
    }
    if name.chars().count() > MAX_DISPLAY_NAME_LEN {
        return Err(BackendError::InvalidName(format!(
            "longer than {} characters",
            MAX_DISPLAY_NAME_LEN
        )));
    }
    Ok(name.to_string())
}

impl IdentityProvider for LocalStore {
    async fn login(&self) -> Result<Identity, BackendError> {
        self.do_login()
    }

    async fn current_identity(&self) -> Result<Option<Identity>, BackendError> {
        let conn = self.lock()?;
        Ok(db::signed_in_principal(&conn)?.map(|principal| Identity { principal }))
    }

    async fn is_authenticated(&self) -> Result<bool, BackendError> {
        let conn = self.lock()?;
        Ok(db::signed_in_principal(&conn)?.is_some())
    }

    async fn logout(&self) -> Result<(), BackendError> {
        let conn = self.lock()?;
        db::set_signed_in(&conn, None)?;
        info!("signed out");
        Ok(())
    }
}

impl QuestService for LocalStore {
    async fn get_profile(&self, caller: &Principal) -> Result<Option<Profile>, BackendError> {
        let conn = self.lock()?;
        Ok(db::get_profile(&conn, caller)?)
    }

    async fn create_profile(&self, caller: &Principal, display_name: &str) -> Result<Profile, BackendError> {
        self.do_create_profile(caller, display_name)
    }

    async fn change_display_name(
        &self,
        caller: &Principal,
        display_name: &str,
    ) -> Result<Profile, BackendError> {
        self.do_change_display_name(caller, display_name)
    }

    async fn is_display_name_available(&self, display_name: &str) -> Result<bool, BackendError> {
        self.do_name_available(display_name)
    }

    async fn generate_quest(&self, caller: &Principal, difficulty: u32) -> Result<Quest, BackendError> {
        self.do_generate_quest(caller, difficulty)
    }

    async fn submit_answer(
        &self,
        caller: &Principal,
        quest_id: QuestId,
        answer: &str,
    ) -> Result<bool, BackendError> {
        self.do_submit_answer(caller, quest_id, answer)
    }

    async fn get_subject_names(
        &self,
        ids: &[SubjectId],
    ) -> Result<HashMap<SubjectId, String>, BackendError> {
        let conn = self.lock()?;
        Ok(db::subject_names(&conn, ids)?)
    }
}
