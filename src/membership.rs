use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::info;

use crate::bus::{Event, EventBus};
use crate::chat::{Chat, ChatPatch, ChatPhoto, MessageDraft, NewChat, Theme};
use crate::directory::ParticipantDirectory;
use crate::entity::SYSTEM_SENDER;
use crate::error::{ChatError, Result};
use crate::repository::ChatRepository;
use crate::upload::{ObjectUploader, UploadFile};

/// Group membership and chat appearance.
///
/// Each mutation checks its precondition, applies the field update, then
/// appends a system message which also becomes the chat's last message.
pub struct MembershipManager {
    repo: Arc<dyn ChatRepository>,
    directory: Arc<ParticipantDirectory>,
    bus: Arc<EventBus>,
    uploader: Arc<dyn ObjectUploader>,
}

impl MembershipManager {
    pub fn new(
        repo: Arc<dyn ChatRepository>,
        directory: Arc<ParticipantDirectory>,
        bus: Arc<EventBus>,
        uploader: Arc<dyn ObjectUploader>,
    ) -> Self {
        Self {
            repo,
            directory,
            bus,
            uploader,
        }
    }

    async fn load(&self, chat_id: &str, acting_user: &str) -> Result<Chat> {
        let chat = self.repo.get_chat(chat_id).await?;
        chat.ensure_member(acting_user)?;
        Ok(chat)
    }

    /// Append a system message and tell everyone who can see the chat,
    /// plus `also` (someone who just left).
    async fn announce(&self, chat_id: &str, text: String, also: Option<&str>) -> Result<Chat> {
        let notice = self
            .repo
            .append_message(MessageDraft::system(chat_id, text))
            .await?;
        let chat = self.repo.get_chat(chat_id).await?;

        info!(chat_id, message_id = %notice.id, text = %notice.text, "System message appended");

        let mut audience: Vec<String> = chat.participant_ids.iter().cloned().collect();
        if let Some(user_id) = also {
            audience.push(user_id.to_string());
        }
        self.bus.publish(Event::MessagesUpdated {
            chat_id: chat_id.to_string(),
        });
        self.bus.publish(Event::ChatUpdated {
            chat_id: chat_id.to_string(),
            audience,
        });

        Ok(chat)
    }

    pub async fn create_group(
        &self,
        creator_id: &str,
        member_ids: &[String],
        name: &str,
    ) -> Result<Chat> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ChatError::invalid("group name must not be empty"));
        }
        let members: BTreeSet<String> = member_ids
            .iter()
            .filter(|id| id.as_str() != creator_id)
            .cloned()
            .collect();
        if members.is_empty() {
            return Err(ChatError::invalid("a group needs at least one other member"));
        }
        if creator_id == SYSTEM_SENDER || members.contains(SYSTEM_SENDER) {
            return Err(ChatError::invalid("the system sender id is reserved"));
        }

        let chat = self
            .repo
            .create_chat(NewChat::group(name, creator_id, members))
            .await?;

        let creator = self.directory.display_name(creator_id).await?;
        info!(chat_id = %chat.id, creator_id, members = chat.participant_ids.len(), "Group created");

        self.announce(
            &chat.id,
            format!("{} created the group \"{}\"", creator, name),
            None,
        )
        .await
    }

    pub async fn rename_group(&self, chat_id: &str, new_name: &str, acting_user: &str) -> Result<Chat> {
        let name = new_name.trim();
        if name.is_empty() {
            return Err(ChatError::invalid("group name must not be empty"));
        }
        let chat = self.load(chat_id, acting_user).await?;
        chat.ensure_group()?;

        self.repo
            .update_chat(
                chat_id,
                ChatPatch {
                    name: Some(name.to_string()),
                    ..Default::default()
                },
            )
            .await?;

        let actor = self.directory.display_name(acting_user).await?;
        self.announce(
            chat_id,
            format!("{} renamed the group to \"{}\"", actor, name),
            None,
        )
        .await
    }

    /// Add the ids that are not members yet. Returns the ids actually added;
    /// an empty result means nothing changed and nothing was announced.
    pub async fn add_members(
        &self,
        chat_id: &str,
        new_user_ids: &[String],
        acting_user: &str,
    ) -> Result<Vec<String>> {
        if new_user_ids.is_empty() {
            return Err(ChatError::invalid("member list must not be empty"));
        }
        if new_user_ids.iter().any(|id| id == SYSTEM_SENDER) {
            return Err(ChatError::invalid("the system sender id is reserved"));
        }
        let chat = self.load(chat_id, acting_user).await?;
        chat.ensure_group()?;

        let mut candidates: Vec<String> = Vec::new();
        for user_id in new_user_ids {
            if !chat.is_member(user_id) && !candidates.contains(user_id) {
                candidates.push(user_id.clone());
            }
        }
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        // Someone else may have added the same people in the meantime.
        let added = self.repo.add_participants(chat_id, &candidates).await?;
        if added.is_empty() {
            return Ok(added);
        }

        let actor = self.directory.display_name(acting_user).await?;
        let mut names = Vec::with_capacity(added.len());
        for user_id in &added {
            names.push(self.directory.display_name(user_id).await?);
        }

        info!(chat_id, acting_user, added = ?added, "Members added");
        self.announce(
            chat_id,
            format!("{} added {} to the group", actor, names.join(", ")),
            None,
        )
        .await?;

        Ok(added)
    }

    /// Remove the acting user from a group. The chat stays for everyone else,
    /// even when nobody is left.
    pub async fn leave_group(&self, chat_id: &str, acting_user: &str) -> Result<()> {
        let chat = self.load(chat_id, acting_user).await?;
        chat.ensure_group()?;

        if !self.repo.remove_participant(chat_id, acting_user).await? {
            return Err(ChatError::unauthorized(format!(
                "{} is not a participant of chat {}",
                acting_user, chat_id
            )));
        }

        let actor = self.directory.display_name(acting_user).await?;
        info!(chat_id, acting_user, "Member left group");
        self.announce(chat_id, format!("{} left the group", actor), Some(acting_user))
            .await?;

        Ok(())
    }

    /// Hard-delete a direct chat together with its messages.
    pub async fn delete_chat(&self, chat_id: &str, acting_user: &str) -> Result<()> {
        let chat = self.load(chat_id, acting_user).await?;
        if chat.is_group() {
            return Err(ChatError::invalid(
                "group chats cannot be deleted, leave them instead",
            ));
        }

        self.repo.delete_chat(chat_id).await?;

        info!(chat_id, acting_user, "Chat deleted");
        self.bus.publish(Event::ChatDeleted {
            chat_id: chat_id.to_string(),
            audience: chat.participant_ids.into_iter().collect(),
        });

        Ok(())
    }

    pub async fn set_theme(&self, chat_id: &str, theme: Theme, acting_user: &str) -> Result<Chat> {
        self.load(chat_id, acting_user).await?;

        self.repo
            .update_chat(
                chat_id,
                ChatPatch {
                    theme: Some(theme),
                    ..Default::default()
                },
            )
            .await?;

        let actor = self.directory.display_name(acting_user).await?;
        self.announce(
            chat_id,
            format!("{} changed the theme to {}", actor, theme),
            None,
        )
        .await
    }

    pub async fn set_emoji(&self, chat_id: &str, emoji: &str, acting_user: &str) -> Result<Chat> {
        let emoji = emoji.trim();
        if emoji.is_empty() {
            return Err(ChatError::invalid("emoji must not be empty"));
        }
        self.load(chat_id, acting_user).await?;

        self.repo
            .update_chat(
                chat_id,
                ChatPatch {
                    emoji: Some(emoji.to_string()),
                    ..Default::default()
                },
            )
            .await?;

        let actor = self.directory.display_name(acting_user).await?;
        self.announce(
            chat_id,
            format!("{} set the emoji to {}", actor, emoji),
            None,
        )
        .await
    }

    pub async fn set_photo(&self, chat_id: &str, file: UploadFile, acting_user: &str) -> Result<Chat> {
        if file.bytes.is_empty() {
            return Err(ChatError::invalid("photo must not be empty"));
        }
        let chat = self.load(chat_id, acting_user).await?;
        chat.ensure_group()?;

        let object = self.uploader.upload(file).await?;
        self.repo
            .update_chat(
                chat_id,
                ChatPatch {
                    photo: Some(ChatPhoto {
                        url: object.url,
                        public_id: object.public_id,
                    }),
                    ..Default::default()
                },
            )
            .await?;

        let actor = self.directory.display_name(acting_user).await?;
        self.announce(chat_id, format!("{} changed the group photo", actor), None)
            .await
    }
}
