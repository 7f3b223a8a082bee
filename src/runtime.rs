use tracing::debug;

use crate::backend::{BackendError, IdentityProvider, QuestService};
use crate::client::{Effect, Event, Notice};
use crate::error::ClientError;
use crate::models::Identity;
use crate::notifications;

/// Run one effect against the collaborators.
///
/// Returns the event to feed back into the client, or `None` for
/// fire-and-forget effects such as notifications.
pub async fn perform<I, B>(identity: &I, backend: &B, effect: Effect) -> Option<Event>
where
    I: IdentityProvider,
    B: QuestService,
{
    debug!(?effect, "performing effect");
    let event = match effect {
        Effect::RestoreSession => Event::SessionRestored(restore(identity).await),
        Effect::Login => Event::LoggedIn(
            identity
                .login()
                .await
                .map_err(|e| ClientError::Auth(e.to_string())),
        ),
        Effect::Logout => Event::LoggedOut(
            identity
                .logout()
                .await
                .map_err(|e| ClientError::Auth(e.to_string())),
        ),
        Effect::FetchProfile {
            caller,
            after_reward,
        } => Event::ProfileLoaded {
            result: backend.get_profile(&caller).await.map_err(ClientError::from),
            after_reward,
        },
        Effect::CreateProfile {
            caller,
            display_name,
        } => Event::ProfileSaved(
            backend
                .create_profile(&caller, &display_name)
                .await
                .map_err(ClientError::from),
        ),
        Effect::ChangeDisplayName {
            caller,
            display_name,
        } => Event::ProfileSaved(
            backend
                .change_display_name(&caller, &display_name)
                .await
                .map_err(ClientError::from),
        ),
        Effect::CheckNameAvailability { name } => {
            let result = backend
                .is_display_name_available(&name)
                .await
                .map_err(ClientError::from);
            Event::NameChecked { name, result }
        }
        Effect::GenerateQuest {
            caller,
            ticket,
            difficulty,
        } => Event::QuestGenerated {
            ticket,
            result: backend
                .generate_quest(&caller, difficulty)
                .await
                .map_err(ClientError::from),
        },
        Effect::SubmitAnswer {
            caller,
            quest_id,
            answer,
        } => Event::AnswerChecked {
            quest_id,
            result: backend
                .submit_answer(&caller, quest_id, &answer)
                .await
                .map_err(ClientError::from),
        },
        Effect::FetchSubjectNames { ids } => Event::SubjectNamesLoaded(
            backend
                .get_subject_names(&ids)
                .await
                .map_err(ClientError::from),
        ),
        Effect::Notify(notice) => {
            match notice {
                Notice::QuestComplete { xp, credits } => {
                    notifications::notify_quest_complete(xp, credits)
                }
                Notice::LevelUp { subject, level } => notifications::notify_level_up(&subject, level),
            }
            return None;
        }
    };
    Some(event)
}

async fn restore<I: IdentityProvider>(identity: &I) -> Result<Option<Identity>, ClientError> {
    let auth = |e: BackendError| ClientError::Auth(e.to_string());
    if !identity.is_authenticated().await.map_err(auth)? {
        return Ok(None);
    }
    identity.current_identity().await.map_err(auth)
}
