use crate::error::ClientError;
use crate::models::{Quest, QuestId};

/// quest session state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    /// quest requested, response pending
    Generating { ticket: u64, difficulty: u32 },
    QuestActive,
    Submitting,
    Completed,
}

/// Backend work a transition asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    GenerateQuest { ticket: u64, difficulty: u32 },
    SubmitAnswer { quest_id: QuestId, answer: String },
    RefreshProfile,
}

/// One live quest and the transient UI state around it.
///
/// Every transition takes the session by value and hands back the next
/// one, plus at most one command for the caller to run.
#[derive(Debug, Clone, Default)]
pub struct QuestSession {
    state: SessionState,
    quest: Option<Quest>,
    attempt_count: u32,
    answer_text: String,
    feedback: String,
    is_answered_correctly: bool,
    error: Option<ClientError>,
    last_ticket: u64,
}

#[derive(Debug, Clone)]
pub struct Transition {
    pub session: QuestSession,
    pub command: Option<Command>,
}

impl Transition {
    fn stay(session: QuestSession) -> Self {
        Self {
            session,
            command: None,
        }
    }

    fn with(session: QuestSession, command: Command) -> Self {
        Self {
            session,
            command: Some(command),
        }
    }
}

impl QuestSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the current quest and request a new one. Allowed from any state.
    pub fn generate(self, difficulty: u32) -> Transition {
        let ticket = self.last_ticket + 1;
        let difficulty = difficulty.max(1);
        let session = QuestSession {
            state: SessionState::Generating { ticket, difficulty },
            last_ticket: ticket,
            ..QuestSession::default()
        };
        Transition::with(session, Command::GenerateQuest { ticket, difficulty })
    }

    /// Responses for superseded requests are ignored.
    pub fn quest_generated(mut self, ticket: u64, result: Result<Quest, ClientError>) -> Transition {
        if !matches!(self.state, SessionState::Generating { ticket: t, .. } if t == ticket) {
            return Transition::stay(self);
        }
        match result {
            Ok(quest) => {
                self.state = SessionState::QuestActive;
                self.quest = Some(quest);
                self.attempt_count = 0;
                self.answer_text.clear();
                self.feedback.clear();
                self.is_answered_correctly = false;
                self.error = None;
            }
            Err(e) => {
                self.state = SessionState::Idle;
                self.quest = None;
                self.error = Some(e);
            }
        }
        Transition::stay(self)
    }

    /// edit answer while input is enabled
    pub fn set_answer(mut self, text: String) -> Self {
        if self.input_enabled() {
            self.answer_text = text;
        }
        self
    }

    /// Start a submission. No-op while one is in flight or after completion.
    pub fn submit(mut self) -> Transition {
        if self.state != SessionState::QuestActive {
            return Transition::stay(self);
        }
        let Some(quest_id) = self.quest.as_ref().map(|q| q.id) else {
            return Transition::stay(self);
        };
        if self.answer_text.trim().is_empty() {
            self.error = Some(ClientError::InvalidInput("Please enter an answer".to_string()));
            return Transition::stay(self);
        }

        // counted whatever the outcome
        self.attempt_count += 1;
        self.state = SessionState::Submitting;
        self.error = None;
        let answer = self.answer_text.clone();
        Transition::with(self, Command::SubmitAnswer { quest_id, answer })
    }

    /// Apply the backend's verdict for `quest_id`.
    pub fn answer_checked(mut self, quest_id: QuestId, result: Result<bool, ClientError>) -> Transition {
        if self.state != SessionState::Submitting || self.quest_id() != Some(quest_id) {
            return Transition::stay(self);
        }
        match result {
            Ok(true) => {
                self.state = SessionState::Completed;
                self.is_answered_correctly = true;
                self.feedback = match &self.quest {
                    Some(q) => format!("Correct! +{} XP, +{} credits", q.xp_reward, q.credit_reward),
                    None => "Correct!".to_string(),
                };
                Transition::with(self, Command::RefreshProfile)
            }
            Ok(false) => {
                self.state = SessionState::QuestActive;
                self.feedback = format!(
                    "Attempt {}: wrong answer, try again!",
                    self.attempt_count
                );
                Transition::stay(self)
            }
            Err(e) => {
                // attempt stays counted
                self.state = SessionState::QuestActive;
                self.feedback.clear();
                self.error = Some(e);
                Transition::stay(self)
            }
        }
    }

    /// back to idle, e.g. on logout
    pub fn reset(self) -> Self {
        QuestSession {
            last_ticket: self.last_ticket,
            ..QuestSession::default()
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn quest(&self) -> Option<&Quest> {
        self.quest.as_ref()
    }

    pub fn quest_id(&self) -> Option<QuestId> {
        self.quest.as_ref().map(|q| q.id)
    }

    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    pub fn answer_text(&self) -> &str {
        &self.answer_text
    }

    pub fn feedback(&self) -> &str {
        &self.feedback
    }

    pub fn error(&self) -> Option<&ClientError> {
        self.error.as_ref()
    }

    pub fn is_answered_correctly(&self) -> bool {
        self.is_answered_correctly
    }

    /// is generating?
    pub fn is_generating(&self) -> bool {
        matches!(self.state, SessionState::Generating { .. })
    }

    /// is submitting?
    pub fn is_submitting(&self) -> bool {
        self.state == SessionState::Submitting
    }

    /// is completed?
    pub fn is_completed(&self) -> bool {
        self.state == SessionState::Completed
    }

    /// answer box and submit button usable
    pub fn input_enabled(&self) -> bool {
        self.state == SessionState::QuestActive
    }
}
