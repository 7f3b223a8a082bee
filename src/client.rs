//! Client-side state machine for everything outside the quest itself:
//! sign-in, profile setup, display names, and derived progress views.
//!
//! User actions and backend responses go in; `Effect`s for the runtime
//! come out. Nothing here touches the network, the store or the screen.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::error::ClientError;
use crate::models::{Identity, Principal, Profile, Quest, QuestId, SubjectId};
use crate::progression::{ProgressionConfig, SubjectView};
use crate::session::{Command, QuestSession};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// startup check for a surviving session
    Checking,
    SignedOut,
    SigningIn,
    SignedIn(Identity),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameAvailability {
    Unknown,
    Checking,
    Available,
    Taken,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    QuestComplete { xp: u64, credits: u64 },
    LevelUp { subject: String, level: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    RestoreSession,
    Login,
    Logout,
    FetchProfile { caller: Principal, after_reward: bool },
    CreateProfile { caller: Principal, display_name: String },
    ChangeDisplayName { caller: Principal, display_name: String },
    CheckNameAvailability { name: String },
    GenerateQuest { caller: Principal, ticket: u64, difficulty: u32 },
    SubmitAnswer { caller: Principal, quest_id: QuestId, answer: String },
    FetchSubjectNames { ids: Vec<SubjectId> },
    Notify(Notice),
}

#[derive(Debug, Clone)]
pub enum Event {
    SessionRestored(Result<Option<Identity>, ClientError>),
    LoggedIn(Result<Identity, ClientError>),
    LoggedOut(Result<(), ClientError>),
    ProfileLoaded {
        result: Result<Option<Profile>, ClientError>,
        after_reward: bool,
    },
    ProfileSaved(Result<Profile, ClientError>),
    NameChecked {
        name: String,
        result: Result<bool, ClientError>,
    },
    QuestGenerated {
        ticket: u64,
        result: Result<Quest, ClientError>,
    },
    AnswerChecked {
        quest_id: QuestId,
        result: Result<bool, ClientError>,
    },
    SubjectNamesLoaded(Result<HashMap<SubjectId, String>, ClientError>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelUp {
    pub subject: String,
    pub level: u32,
}

pub struct Client {
    progression: ProgressionConfig,
    max_difficulty: u32,
    auth: AuthState,
    profile: Option<Profile>,
    profile_loading: bool,
    session: QuestSession,
    difficulty: u32,
    name_draft: String,
    name_availability: NameAvailability,
    editing_name: bool,
    saving_name: bool,
    subject_names: HashMap<SubjectId, String>,
    error: Option<ClientError>,
    level_up: Option<LevelUp>,
}

impl Client {
    pub fn new(progression: ProgressionConfig, default_difficulty: u32, max_difficulty: u32) -> Self {
        let max_difficulty = max_difficulty.max(1);
        Self {
            progression,
            max_difficulty,
            auth: AuthState::Checking,
            profile: None,
            profile_loading: false,
            session: QuestSession::new(),
            difficulty: default_difficulty.clamp(1, max_difficulty),
            name_draft: String::new(),
            name_availability: NameAvailability::Unknown,
            editing_name: false,
            saving_name: false,
            subject_names: HashMap::new(),
            error: None,
            level_up: None,
        }
    }

    /// first effects after boot
    pub fn start(&mut self) -> Vec<Effect> {
        self.auth = AuthState::Checking;
        vec![Effect::RestoreSession]
    }

    fn caller(&self) -> Option<Principal> {
        match &self.auth {
            AuthState::SignedIn(identity) => Some(identity.principal.clone()),
            _ => None,
        }
    }

    // -- user actions --

    pub fn login(&mut self) -> Vec<Effect> {
        if self.auth != AuthState::SignedOut {
            return Vec::new();
        }
        self.auth = AuthState::SigningIn;
        self.error = None;
        vec![Effect::Login]
    }

    pub fn logout(&mut self) -> Vec<Effect> {
        if !matches!(self.auth, AuthState::SignedIn(_)) {
            return Vec::new();
        }
        self.sign_out_locally();
        vec![Effect::Logout]
    }

    fn sign_out_locally(&mut self) {
        self.auth = AuthState::SignedOut;
        self.profile = None;
        self.profile_loading = false;
        self.session = std::mem::take(&mut self.session).reset();
        self.name_draft.clear();
        self.name_availability = NameAvailability::Unknown;
        self.editing_name = false;
        self.saving_name = false;
        self.level_up = None;
    }

    pub fn edit_name(&mut self, text: String) -> Vec<Effect> {
        self.name_draft = text;
        let name = self.name_draft.trim().to_string();
        if name.is_empty() {
            self.name_availability = NameAvailability::Unknown;
            return Vec::new();
        }
        self.name_availability = NameAvailability::Checking;
        vec![Effect::CheckNameAvailability { name }]
    }

    pub fn create_profile(&mut self) -> Vec<Effect> {
        let Some(caller) = self.caller() else {
            return Vec::new();
        };
        if self.profile.is_some() || self.saving_name {
            return Vec::new();
        }
        let display_name = self.name_draft.trim().to_string();
        if display_name.is_empty() {
            self.error = Some(ClientError::InvalidInput("Please enter a display name".to_string()));
            return Vec::new();
        }
        self.saving_name = true;
        vec![Effect::CreateProfile { caller, display_name }]
    }

    pub fn start_name_edit(&mut self) {
        if self.profile.is_some() {
            self.editing_name = true;
            self.name_draft.clear();
            self.name_availability = NameAvailability::Unknown;
        }
    }

    pub fn cancel_name_edit(&mut self) {
        self.editing_name = false;
        self.name_draft.clear();
        self.name_availability = NameAvailability::Unknown;
    }

    pub fn change_display_name(&mut self) -> Vec<Effect> {
        let Some(caller) = self.caller() else {
            return Vec::new();
        };
        let display_name = self.name_draft.trim().to_string();
        if !self.editing_name || self.saving_name || display_name.is_empty() {
            return Vec::new();
        }
        self.saving_name = true;
        vec![Effect::ChangeDisplayName { caller, display_name }]
    }

    pub fn set_difficulty(&mut self, difficulty: u32) {
        self.difficulty = difficulty.clamp(1, self.max_difficulty);
    }

    pub fn generate_quest(&mut self) -> Vec<Effect> {
        if self.caller().is_none() || self.profile.is_none() {
            return Vec::new();
        }
        let t = std::mem::take(&mut self.session).generate(self.difficulty);
        self.session = t.session;
        self.command_effects(t.command)
    }

    pub fn edit_answer(&mut self, text: String) {
        self.session = std::mem::take(&mut self.session).set_answer(text);
    }

    pub fn submit_answer(&mut self) -> Vec<Effect> {
        let t = std::mem::take(&mut self.session).submit();
        self.session = t.session;
        self.command_effects(t.command)
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    pub fn dismiss_level_up(&mut self) {
        self.level_up = None;
    }

    fn command_effects(&self, command: Option<Command>) -> Vec<Effect> {
        let (Some(command), Some(caller)) = (command, self.caller()) else {
            return Vec::new();
        };
        let effect = match command {
            Command::GenerateQuest { ticket, difficulty } => Effect::GenerateQuest {
                caller,
                ticket,
                difficulty,
            },
            Command::SubmitAnswer { quest_id, answer } => Effect::SubmitAnswer {
                caller,
                quest_id,
                answer,
            },
            Command::RefreshProfile => Effect::FetchProfile {
                caller,
                after_reward: true,
            },
        };
        vec![effect]
    }

    // -- backend responses --

    pub fn handle(&mut self, event: Event) -> Vec<Effect> {
        debug!(?event, "client event");
        match event {
            Event::SessionRestored(Ok(Some(identity))) | Event::LoggedIn(Ok(identity)) => {
                self.signed_in(identity)
            }
            Event::SessionRestored(Ok(None)) => {
                self.auth = AuthState::SignedOut;
                Vec::new()
            }
            Event::SessionRestored(Err(e)) | Event::LoggedIn(Err(e)) => {
                warn!("sign-in failed: {}", e);
                self.sign_out_locally();
                self.error = Some(as_auth_error(e));
                Vec::new()
            }
            Event::LoggedOut(result) => {
                if let Err(e) = result {
                    self.error = Some(as_auth_error(e));
                }
                Vec::new()
            }
            Event::ProfileLoaded {
                result,
                after_reward,
            } => self.profile_loaded(result, after_reward),
            Event::ProfileSaved(result) => self.profile_saved(result),
            Event::NameChecked { name, result } => {
                self.name_checked(&name, result);
                Vec::new()
            }
            Event::QuestGenerated { ticket, result } => {
                let t = std::mem::take(&mut self.session).quest_generated(ticket, result);
                self.session = t.session;
                debug!(state = ?self.session.state(), "quest session");
                if let (Some(quest), Some((xp, credits))) = (self.session.quest(), self.reward_mismatch()) {
                    warn!(
                        quest = quest.id,
                        granted_xp = quest.xp_reward,
                        granted_credits = quest.credit_reward,
                        expected_xp = xp,
                        expected_credits = credits,
                        "quest rewards differ from local progression"
                    );
                }
                self.command_effects(t.command)
            }
            Event::AnswerChecked { quest_id, result } => self.answer_checked(quest_id, result),
            Event::SubjectNamesLoaded(result) => {
                match result {
                    Ok(names) => self.subject_names.extend(names),
                    Err(e) => self.error = Some(e),
                }
                Vec::new()
            }
        }
    }

    fn signed_in(&mut self, identity: Identity) -> Vec<Effect> {
        info!(principal = %identity.principal, "signed in");
        let caller = identity.principal.clone();
        self.auth = AuthState::SignedIn(identity);
        self.profile_loading = true;
        vec![Effect::FetchProfile {
            caller,
            after_reward: false,
        }]
    }

    fn profile_loaded(
        &mut self,
        result: Result<Option<Profile>, ClientError>,
        after_reward: bool,
    ) -> Vec<Effect> {
        if self.caller().is_none() {
            return Vec::new();
        }
        self.profile_loading = false;
        match result {
            Ok(Some(profile)) => {
                let mut effects = Vec::new();
                if after_reward {
                    effects.extend(self.level_up_notices(&profile));
                }
                effects.extend(self.accept_profile(profile));
                effects
            }
            Ok(None) => {
                self.profile = None;
                Vec::new()
            }
            Err(e) => {
                self.error = Some(e);
                Vec::new()
            }
        }
    }

    fn profile_saved(&mut self, result: Result<Profile, ClientError>) -> Vec<Effect> {
        if self.caller().is_none() {
            return Vec::new();
        }
        self.saving_name = false;
        match result {
            Ok(profile) => {
                info!(name = %profile.display_name, "profile saved");
                self.editing_name = false;
                self.name_draft.clear();
                self.name_availability = NameAvailability::Unknown;
                self.error = None;
                self.accept_profile(profile)
            }
            Err(e) => {
                self.error = Some(e);
                Vec::new()
            }
        }
    }

    /// store profile, report inconsistencies, look up unseen subject names
    fn accept_profile(&mut self, profile: Profile) -> Vec<Effect> {
        // only the newest snapshot is judged
        if matches!(self.error, Some(ClientError::InconsistentProfile { .. })) {
            self.error = None;
        }
        for progress in &profile.subject_progress {
            if let Err(e) = self.progression.check_consistency(progress) {
                warn!("{}", e);
                self.error = Some(e);
            }
        }
        let unseen: Vec<SubjectId> = profile
            .subject_progress
            .iter()
            .map(|p| p.subject_id.clone())
            .filter(|id| !self.subject_names.contains_key(id))
            .collect();
        self.profile = Some(profile);
        if unseen.is_empty() {
            Vec::new()
        } else {
            vec![Effect::FetchSubjectNames { ids: unseen }]
        }
    }

    fn level_up_notices(&mut self, fresh: &Profile) -> Vec<Effect> {
        let mut effects = Vec::new();
        if let Some(quest) = self.session.quest() {
            effects.push(Effect::Notify(Notice::QuestComplete {
                xp: quest.xp_reward,
                credits: quest.credit_reward,
            }));
        }
        let Some(old) = &self.profile else {
            return effects;
        };
        for progress in &fresh.subject_progress {
            let old_level = old.subject(&progress.subject_id).map(|p| p.level).unwrap_or(1);
            if progress.level > old_level {
                let subject = self.subject_name(&progress.subject_id);
                info!(subject = %subject, level = progress.level, "level up");
                self.level_up = Some(LevelUp {
                    subject: subject.clone(),
                    level: progress.level,
                });
                effects.push(Effect::Notify(Notice::LevelUp {
                    subject,
                    level: progress.level,
                }));
            }
        }
        effects
    }

    fn name_checked(&mut self, name: &str, result: Result<bool, ClientError>) {
        if name != self.name_draft.trim() {
            return;
        }
        self.name_availability = match result {
            Ok(true) => NameAvailability::Available,
            Ok(false) => NameAvailability::Taken,
            Err(e) => {
                // never blocks input
                warn!("name availability check failed: {}", e);
                NameAvailability::Unknown
            }
        };
    }

    fn answer_checked(&mut self, quest_id: QuestId, result: Result<bool, ClientError>) -> Vec<Effect> {
        let t = std::mem::take(&mut self.session).answer_checked(quest_id, result);
        self.session = t.session;
        debug!(state = ?self.session.state(), "quest session");
        self.command_effects(t.command)
    }

    // -- read-only views --

    pub fn auth(&self) -> &AuthState {
        &self.auth
    }

    pub fn is_signed_in(&self) -> bool {
        matches!(self.auth, AuthState::SignedIn(_))
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    pub fn profile_loading(&self) -> bool {
        self.profile_loading
    }

    pub fn session(&self) -> &QuestSession {
        &self.session
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn max_difficulty(&self) -> u32 {
        self.max_difficulty
    }

    pub fn name_draft(&self) -> &str {
        &self.name_draft
    }

    pub fn name_availability(&self) -> NameAvailability {
        self.name_availability
    }

    pub fn is_editing_name(&self) -> bool {
        self.editing_name
    }

    pub fn error(&self) -> Option<&ClientError> {
        self.error.as_ref()
    }

    pub fn level_up(&self) -> Option<&LevelUp> {
        self.level_up.as_ref()
    }

    pub fn progression(&self) -> &ProgressionConfig {
        &self.progression
    }

    /// display name for a subject, falls back to its id
    pub fn subject_name(&self, id: &SubjectId) -> String {
        self.subject_names
            .get(id)
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }

    pub fn subject_views(&self) -> Vec<(String, SubjectView)> {
        let Some(profile) = &self.profile else {
            return Vec::new();
        };
        profile
            .subject_progress
            .iter()
            .map(|p| (self.subject_name(&p.subject_id), self.progression.subject_view(p)))
            .collect()
    }

    /// XP and credits the current quest would grant
    pub fn reward_preview(&self) -> Option<(u64, u64)> {
        let quest = self.session.quest()?;
        Some((
            self.progression.quest_xp_reward(quest.difficulty),
            self.progression.quest_credit_reward(quest.difficulty),
        ))
    }

    /// Locally computed rewards, when the live quest grants something else.
    pub fn reward_mismatch(&self) -> Option<(u64, u64)> {
        let quest = self.session.quest()?;
        let preview = self.reward_preview()?;
        (preview != (quest.xp_reward, quest.credit_reward)).then_some(preview)
    }
}

fn as_auth_error(e: ClientError) -> ClientError {
    match e {
        ClientError::Auth(_) => e,
        other => ClientError::Auth(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{QuestContent, SubjectProgress};

    fn me() -> Principal {
        Principal("me".to_string())
    }

    fn profile(level: u32, total_xp: u64) -> Profile {
        Profile {
            principal: me(),
            display_name: "Ada".to_string(),
            subject_progress: vec![SubjectProgress {
                subject_id: SubjectId::from("math"),
                level,
                total_xp,
                credits: 0,
                quests_completed: 0,
            }],
            created_at: "2026-02-19T10:00:00".to_string(),
        }
    }

    fn quest(id: QuestId, difficulty: u32) -> Quest {
        Quest {
            id,
            subject_id: SubjectId::from("math"),
            difficulty,
            content: QuestContent {
                question: "What is 2 + 2?".to_string(),
            },
            xp_reward: 10,
            credit_reward: 5,
        }
    }

    fn client() -> Client {
        Client::new(ProgressionConfig::default(), 1, 10)
    }

    /// signed in with a loaded profile
    fn ready(p: Profile) -> Client {
        let mut c = client();
        c.start();
        c.handle(Event::SessionRestored(Ok(Some(Identity { principal: me() }))));
        c.handle(Event::ProfileLoaded {
            result: Ok(Some(p)),
            after_reward: false,
        });
        c.handle(Event::SubjectNamesLoaded(Ok(HashMap::from([(
            SubjectId::from("math"),
            "Mathematics".to_string(),
        )]))));
        c
    }

    #[test]
    fn test_restore_signed_in_fetches_profile() {
        let mut c = client();
        assert_eq!(c.start(), vec![Effect::RestoreSession]);
        let effects = c.handle(Event::SessionRestored(Ok(Some(Identity { principal: me() }))));
        assert_eq!(
            effects,
            vec![Effect::FetchProfile { caller: me(), after_reward: false }]
        );
        assert!(c.is_signed_in());
        assert!(c.profile_loading());
    }

    #[test]
    fn test_login_failure_is_auth_error() {
        let mut c = client();
        c.start();
        c.handle(Event::SessionRestored(Ok(None)));
        assert_eq!(c.login(), vec![Effect::Login]);
        assert_eq!(c.auth(), &AuthState::SigningIn);
        // a second click while signing in does nothing
        assert!(c.login().is_empty());

        c.handle(Event::LoggedIn(Err(ClientError::BackendUnavailable("offline".to_string()))));
        assert_eq!(c.auth(), &AuthState::SignedOut);
        assert!(matches!(c.error(), Some(ClientError::Auth(_))));
    }

    #[test]
    fn test_missing_profile_shows_creation() {
        let mut c = client();
        c.start();
        c.handle(Event::LoggedIn(Ok(Identity { principal: me() })));
        c.handle(Event::ProfileLoaded { result: Ok(None), after_reward: false });
        assert!(c.profile().is_none());
        assert!(!c.profile_loading());
        assert!(c.generate_quest().is_empty());
    }

    #[test]
    fn test_create_profile_requires_name() {
        let mut c = client();
        c.start();
        c.handle(Event::LoggedIn(Ok(Identity { principal: me() })));
        c.handle(Event::ProfileLoaded { result: Ok(None), after_reward: false });

        assert!(c.create_profile().is_empty());
        assert!(matches!(c.error(), Some(ClientError::InvalidInput(_))));

        c.edit_name(" Ada ".to_string());
        assert_eq!(
            c.create_profile(),
            vec![Effect::CreateProfile { caller: me(), display_name: "Ada".to_string() }]
        );
        let effects = c.handle(Event::ProfileSaved(Ok(profile(1, 0))));
        assert_eq!(
            effects,
            vec![Effect::FetchSubjectNames { ids: vec![SubjectId::from("math")] }]
        );
        assert!(c.profile().is_some());
        assert_eq!(c.name_draft(), "");
    }

    #[test]
    fn test_name_availability_feedback() {
        let mut c = client();
        let effects = c.edit_name("Ada".to_string());
        assert_eq!(effects, vec![Effect::CheckNameAvailability { name: "Ada".to_string() }]);
        assert_eq!(c.name_availability(), NameAvailability::Checking);

        c.handle(Event::NameChecked { name: "Ada".to_string(), result: Ok(false) });
        assert_eq!(c.name_availability(), NameAvailability::Taken);

        c.edit_name("Adal".to_string());
        // stale answer for the previous draft
        c.handle(Event::NameChecked { name: "Ada".to_string(), result: Ok(true) });
        assert_eq!(c.name_availability(), NameAvailability::Checking);
        c.handle(Event::NameChecked { name: "Adal".to_string(), result: Ok(true) });
        assert_eq!(c.name_availability(), NameAvailability::Available);

        assert!(c.edit_name("  ".to_string()).is_empty());
        assert_eq!(c.name_availability(), NameAvailability::Unknown);
    }

    #[test]
    fn test_name_check_failure_degrades_silently() {
        let mut c = client();
        c.edit_name("Ada".to_string());
        c.handle(Event::NameChecked {
            name: "Ada".to_string(),
            result: Err(ClientError::BackendUnavailable("offline".to_string())),
        });
        assert_eq!(c.name_availability(), NameAvailability::Unknown);
        assert!(c.error().is_none());
    }

    #[test]
    fn test_change_display_name() {
        let mut c = ready(profile(1, 0));
        assert!(c.change_display_name().is_empty());

        c.start_name_edit();
        assert!(c.is_editing_name());
        c.edit_name("Lovelace".to_string());
        assert_eq!(
            c.change_display_name(),
            vec![Effect::ChangeDisplayName { caller: me(), display_name: "Lovelace".to_string() }]
        );
        // saving in progress
        assert!(c.change_display_name().is_empty());

        let mut renamed = profile(1, 0);
        renamed.display_name = "Lovelace".to_string();
        assert!(c.handle(Event::ProfileSaved(Ok(renamed))).is_empty());
        assert!(!c.is_editing_name());
        assert_eq!(c.profile().unwrap().display_name, "Lovelace");
    }

    #[test]
    fn test_cancel_name_edit() {
        let mut c = ready(profile(1, 0));
        c.start_name_edit();
        c.edit_name("Other".to_string());
        c.cancel_name_edit();
        assert!(!c.is_editing_name());
        assert_eq!(c.name_draft(), "");
        assert!(c.change_display_name().is_empty());
    }

    #[test]
    fn test_reward_mismatch_against_granted_rewards() {
        let mut c = ready(profile(1, 0));
        assert_eq!(c.reward_mismatch(), None);

        c.generate_quest();
        c.handle(Event::QuestGenerated { ticket: 1, result: Ok(quest(1, 1)) });
        assert_eq!(c.reward_mismatch(), None);

        c.generate_quest();
        let mut generous = quest(2, 1);
        generous.xp_reward = 99;
        c.handle(Event::QuestGenerated { ticket: 2, result: Ok(generous) });
        assert_eq!(c.reward_mismatch(), Some((10, 5)));
    }

    #[test]
    fn test_quest_flow_refreshes_profile_once() {
        let mut c = ready(profile(1, 95));
        c.set_difficulty(2);
        let effects = c.generate_quest();
        assert_eq!(
            effects,
            vec![Effect::GenerateQuest { caller: me(), ticket: 1, difficulty: 2 }]
        );
        c.handle(Event::QuestGenerated { ticket: 1, result: Ok(quest(4, 2)) });
        assert_eq!(c.reward_preview(), Some((11, 5)));

        c.edit_answer("3".to_string());
        let effects = c.submit_answer();
        assert_eq!(
            effects,
            vec![Effect::SubmitAnswer { caller: me(), quest_id: 4, answer: "3".to_string() }]
        );
        assert!(c.submit_answer().is_empty());

        let effects = c.handle(Event::AnswerChecked { quest_id: 4, result: Ok(false) });
        assert!(effects.is_empty());

        c.edit_answer("4".to_string());
        c.submit_answer();
        let effects = c.handle(Event::AnswerChecked { quest_id: 4, result: Ok(true) });
        assert_eq!(
            effects,
            vec![Effect::FetchProfile { caller: me(), after_reward: true }]
        );
        assert_eq!(c.session().attempt_count(), 2);
    }

    #[test]
    fn test_level_up_after_reward() {
        let mut c = ready(profile(1, 95));
        c.generate_quest();
        c.handle(Event::QuestGenerated { ticket: 1, result: Ok(quest(1, 1)) });
        c.edit_answer("4".to_string());
        c.submit_answer();
        c.handle(Event::AnswerChecked { quest_id: 1, result: Ok(true) });

        let effects = c.handle(Event::ProfileLoaded {
            result: Ok(Some(profile(2, 105))),
            after_reward: true,
        });
        assert_eq!(
            effects,
            vec![
                Effect::Notify(Notice::QuestComplete { xp: 10, credits: 5 }),
                Effect::Notify(Notice::LevelUp { subject: "Mathematics".to_string(), level: 2 }),
            ]
        );
        assert_eq!(
            c.level_up(),
            Some(&LevelUp { subject: "Mathematics".to_string(), level: 2 })
        );
        let views = c.subject_views();
        assert_eq!(views[0].0, "Mathematics");
        assert_eq!(views[0].1.current_level_xp, 5);
        c.dismiss_level_up();
        assert!(c.level_up().is_none());
    }

    #[test]
    fn test_inconsistent_profile_reported() {
        let c = ready(profile(3, 150));
        assert!(matches!(c.error(), Some(ClientError::InconsistentProfile { level: 3, .. })));
        let views = c.subject_views();
        assert_eq!(views[0].1.current_level_xp, -70);
        assert_eq!(views[0].1.progress, 0.0);
    }

    #[test]
    fn test_consistent_refresh_clears_inconsistency() {
        let mut c = ready(profile(3, 150));
        assert!(c.error().is_some());
        c.handle(Event::ProfileLoaded {
            result: Ok(Some(profile(3, 250))),
            after_reward: false,
        });
        assert!(c.error().is_none());
    }

    #[test]
    fn test_profile_saved_after_logout_is_dropped() {
        let mut c = client();
        c.start();
        c.handle(Event::LoggedIn(Ok(Identity { principal: me() })));
        c.handle(Event::ProfileLoaded { result: Ok(None), after_reward: false });
        c.edit_name("Ada".to_string());
        assert_eq!(c.create_profile().len(), 1);
        c.logout();

        assert!(c.handle(Event::ProfileSaved(Ok(profile(1, 0)))).is_empty());
        assert_eq!(c.auth(), &AuthState::SignedOut);
        assert!(c.profile().is_none());
    }

    #[test]
    fn test_logout_clears_everything() {
        let mut c = ready(profile(1, 0));
        c.generate_quest();
        assert_eq!(c.logout(), vec![Effect::Logout]);
        assert_eq!(c.auth(), &AuthState::SignedOut);
        assert!(c.profile().is_none());
        assert!(c.session().quest().is_none());
        assert!(!c.session().is_generating());

        // late responses after logout are dropped
        assert!(c
            .handle(Event::ProfileLoaded { result: Ok(Some(profile(1, 0))), after_reward: false })
            .is_empty());
        assert!(c.profile().is_none());
    }

    #[test]
    fn test_difficulty_clamped() {
        let mut c = client();
        c.set_difficulty(0);
        assert_eq!(c.difficulty(), 1);
        c.set_difficulty(50);
        assert_eq!(c.difficulty(), 10);
    }

    #[test]
    fn test_subject_name_fallback() {
        let c = client();
        assert_eq!(c.subject_name(&SubjectId::from("chemistry")), "chemistry");
    }
}
