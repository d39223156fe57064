use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::bus::{Event, EventBus};
use crate::chat::{ReactionKind, Reactor};
use crate::error::{ChatError, Result};
use crate::repository::ChatRepository;

/// What a `set_reaction` call did to the user's reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum ReactionChange {
    Added { kind: ReactionKind },
    Removed { kind: ReactionKind },
    Switched { from: ReactionKind, to: ReactionKind },
}

pub struct ReactionManager {
    repo: Arc<dyn ChatRepository>,
    bus: Arc<EventBus>,
}

impl ReactionManager {
    pub fn new(repo: Arc<dyn ChatRepository>, bus: Arc<EventBus>) -> Self {
        Self { repo, bus }
    }

    /// Toggle `kind` for the user: add it, remove it if already set, or
    /// move the user's existing reaction over to it.
    ///
    /// Reactions are stored one per user, so concurrent calls from the same
    /// user can race on which kind wins but never leave two entries.
    pub async fn set_reaction(
        &self,
        message_id: &str,
        user_id: &str,
        user_name: &str,
        kind: ReactionKind,
    ) -> Result<ReactionChange> {
        let message = self.repo.get_message(message_id).await?;
        if message.is_system {
            return Err(ChatError::invalid("system messages cannot be reacted to"));
        }
        let chat = self.repo.get_chat(&message.chat_id).await?;
        chat.ensure_member(user_id)?;

        let reactor = Reactor {
            user_id: user_id.to_string(),
            user_name: user_name.to_string(),
        };

        let change = match self.repo.reaction_of(message_id, user_id).await? {
            None => {
                self.repo.put_reaction(message_id, reactor, kind).await?;
                ReactionChange::Added { kind }
            }
            Some(existing) if existing == kind => {
                self.repo.remove_reaction(message_id, user_id).await?;
                ReactionChange::Removed { kind }
            }
            Some(existing) => {
                self.repo.put_reaction(message_id, reactor, kind).await?;
                ReactionChange::Switched {
                    from: existing,
                    to: kind,
                }
            }
        };

        info!(message_id, user_id, ?change, "Reaction updated");
        self.bus.publish(Event::MessagesUpdated {
            chat_id: message.chat_id,
        });

        Ok(change)
    }
}
