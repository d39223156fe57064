use std::sync::Arc;

use tracing::{info, warn};

use crate::bus::{Event, EventBus};
use crate::chat::{LastMessageSummary, Message, MessageDraft, MessageFlag};
use crate::directory::ParticipantDirectory;
use crate::entity::SYSTEM_SENDER;
use crate::error::{ChatError, Result};
use crate::repository::ChatRepository;

/// Send, edit, delete, pin and flag messages, keeping each chat's
/// last-message summary in step.
pub struct MessageLifecycleManager {
    repo: Arc<dyn ChatRepository>,
    directory: Arc<ParticipantDirectory>,
    bus: Arc<EventBus>,
}

fn non_empty(text: &str) -> Result<&str> {
    let text = text.trim();
    if text.is_empty() {
        Err(ChatError::invalid("message text must not be empty"))
    } else {
        Ok(text)
    }
}

impl MessageLifecycleManager {
    pub fn new(
        repo: Arc<dyn ChatRepository>,
        directory: Arc<ParticipantDirectory>,
        bus: Arc<EventBus>,
    ) -> Self {
        Self {
            repo,
            directory,
            bus,
        }
    }

    pub async fn send(&self, chat_id: &str, sender_id: &str, text: &str) -> Result<Message> {
        let text = non_empty(text)?;
        if sender_id == SYSTEM_SENDER {
            return Err(ChatError::invalid("the system sender id is reserved"));
        }

        let chat = self.repo.get_chat(chat_id).await?;
        chat.ensure_member(sender_id)?;

        let sender = self.directory.snapshot_for(sender_id).await?;
        let message = self
            .repo
            .append_message(MessageDraft::user(chat_id, sender_id, sender, text))
            .await?;

        info!(chat_id, message_id = %message.id, sender_id, "Message sent");

        self.bus.publish(Event::MessagesUpdated {
            chat_id: chat_id.to_string(),
        });
        self.bus.publish(Event::chat_updated(&chat));
        self.bus.publish(Event::notification(&chat, &message));

        Ok(message)
    }

    pub async fn edit(&self, message_id: &str, new_text: &str, acting_user: &str) -> Result<Message> {
        let text = non_empty(new_text)?;

        let message = self.repo.get_message(message_id).await?;
        if message.is_system {
            return Err(ChatError::invalid("system messages cannot be edited"));
        }
        if message.sender_id != acting_user {
            return Err(ChatError::unauthorized(format!(
                "{} did not send message {}",
                acting_user, message_id
            )));
        }

        self.repo.edit_message(message_id, text).await?;

        // Only retitles while this message is still the newest; a send that
        // lands in between keeps its own summary.
        let retitled = self
            .repo
            .retitle_last_message(&message.chat_id, message_id, text)
            .await?;
        let chat = self.repo.get_chat(&message.chat_id).await?;
        if retitled {
            self.bus.publish(Event::chat_updated(&chat));
        }

        info!(chat_id = %chat.id, message_id, "Message edited");
        self.bus.publish(Event::MessagesUpdated {
            chat_id: chat.id.clone(),
        });

        self.repo.get_message(message_id).await
    }

    /// Remove a message, announce the removal, and re-derive the chat summary.
    pub async fn delete(&self, message_id: &str, acting_user: &str) -> Result<()> {
        let message = self.repo.get_message(message_id).await?;
        if message.is_system {
            return Err(ChatError::invalid("system messages cannot be deleted"));
        }
        let chat = self.repo.get_chat(&message.chat_id).await?;
        chat.ensure_member(acting_user)?;

        self.repo.delete_message(message_id).await?;

        let actor = self.directory.display_name(acting_user).await?;
        let notice = self
            .repo
            .append_message(MessageDraft::deletion_notice(
                &chat.id,
                format!("{} deleted a message", actor),
            ))
            .await;
        if let Err(err) = notice {
            // The deletion itself went through; the notice is best effort.
            warn!(chat_id = %chat.id, error = %err, "Failed to append deletion notice");
        }

        self.refresh_last_message(&chat.id).await?;

        info!(chat_id = %chat.id, message_id, acting_user, "Message deleted");
        self.bus.publish(Event::MessagesUpdated {
            chat_id: chat.id.clone(),
        });
        self.bus.publish(Event::chat_updated(&chat));

        Ok(())
    }

    /// Point the chat's summary at its newest remaining message (deletion
    /// notices aside), or at the "No messages" sentinel. Always re-reads the
    /// store.
    pub async fn refresh_last_message(&self, chat_id: &str) -> Result<LastMessageSummary> {
        self.repo.recompute_last_message(chat_id).await?;
        Ok(self.repo.get_chat(chat_id).await?.last_message)
    }

    pub async fn toggle_pin(&self, message_id: &str) -> Result<bool> {
        let message = self.repo.get_message(message_id).await?;
        if message.is_system {
            return Err(ChatError::invalid("system messages cannot be pinned"));
        }
        self.toggle(message, MessageFlag::Pinned).await
    }

    pub async fn toggle_unread(&self, message_id: &str) -> Result<bool> {
        let message = self.repo.get_message(message_id).await?;
        self.toggle(message, MessageFlag::Unread).await
    }

    async fn toggle(&self, message: Message, flag: MessageFlag) -> Result<bool> {
        let value = self.repo.toggle_flag(&message.id, flag).await?;

        info!(message_id = %message.id, ?flag, value, "Message flag toggled");
        self.bus.publish(Event::MessagesUpdated {
            chat_id: message.chat_id,
        });

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::{Chat, ChatPatch, MessageQuery, NewChat, ReactionKind, Reactor, NO_MESSAGES};
    use crate::entity::Role;
    use crate::testing::{deps, TestDeps};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Commits a newer message right after the edit's own write, before the
    /// summary is touched.
    struct SendDuringEdit {
        inner: Arc<dyn ChatRepository>,
        newer: Mutex<Option<MessageDraft>>,
    }

    #[async_trait]
    impl ChatRepository for SendDuringEdit {
        async fn create_chat(&self, new: NewChat) -> Result<Chat> {
            self.inner.create_chat(new).await
        }

        async fn get_chat(&self, chat_id: &str) -> Result<Chat> {
            self.inner.get_chat(chat_id).await
        }

        async fn find_direct_chat(&self, a: &str, b: &str) -> Result<Option<Chat>> {
            self.inner.find_direct_chat(a, b).await
        }

        async fn list_chats_for_participant(&self, user_id: &str) -> Result<Vec<Chat>> {
            self.inner.list_chats_for_participant(user_id).await
        }

        async fn update_chat(&self, chat_id: &str, patch: ChatPatch) -> Result<()> {
            self.inner.update_chat(chat_id, patch).await
        }

        async fn add_participants(&self, chat_id: &str, user_ids: &[String]) -> Result<Vec<String>> {
            self.inner.add_participants(chat_id, user_ids).await
        }

        async fn remove_participant(&self, chat_id: &str, user_id: &str) -> Result<bool> {
            self.inner.remove_participant(chat_id, user_id).await
        }

        async fn delete_chat(&self, chat_id: &str) -> Result<()> {
            self.inner.delete_chat(chat_id).await
        }

        async fn append_message(&self, draft: MessageDraft) -> Result<Message> {
            self.inner.append_message(draft).await
        }

        async fn recompute_last_message(&self, chat_id: &str) -> Result<()> {
            self.inner.recompute_last_message(chat_id).await
        }

        async fn retitle_last_message(
            &self,
            chat_id: &str,
            message_id: &str,
            text: &str,
        ) -> Result<bool> {
            self.inner
                .retitle_last_message(chat_id, message_id, text)
                .await
        }

        async fn get_message(&self, message_id: &str) -> Result<Message> {
            self.inner.get_message(message_id).await
        }

        async fn list_messages(&self, chat_id: &str, query: MessageQuery) -> Result<Vec<Message>> {
            self.inner.list_messages(chat_id, query).await
        }

        async fn edit_message(&self, message_id: &str, text: &str) -> Result<()> {
            self.inner.edit_message(message_id, text).await?;
            let newer = self.newer.lock().unwrap().take();
            if let Some(draft) = newer {
                self.inner.append_message(draft).await?;
            }
            Ok(())
        }

        async fn toggle_flag(&self, message_id: &str, flag: MessageFlag) -> Result<bool> {
            self.inner.toggle_flag(message_id, flag).await
        }

        async fn delete_message(&self, message_id: &str) -> Result<()> {
            self.inner.delete_message(message_id).await
        }

        async fn reaction_of(&self, message_id: &str, user_id: &str) -> Result<Option<ReactionKind>> {
            self.inner.reaction_of(message_id, user_id).await
        }

        async fn put_reaction(
            &self,
            message_id: &str,
            reactor: Reactor,
            kind: ReactionKind,
        ) -> Result<()> {
            self.inner.put_reaction(message_id, reactor, kind).await
        }

        async fn remove_reaction(&self, message_id: &str, user_id: &str) -> Result<()> {
            self.inner.remove_reaction(message_id, user_id).await
        }
    }

    async fn setup() -> (TestDeps, MessageLifecycleManager, Chat) {
        let deps = deps().await;
        let messages = MessageLifecycleManager::new(
            deps.repo.clone(),
            deps.directory.clone(),
            deps.bus.clone(),
        );
        let chat = deps
            .repo
            .create_chat(NewChat::direct("u1", "u2"))
            .await
            .unwrap();
        (deps, messages, chat)
    }

    #[tokio::test]
    async fn send_updates_the_summary() {
        let (deps, messages, chat) = setup().await;

        let message = messages.send(&chat.id, "u1", "hello").await.unwrap();
        assert_eq!(message.sender.name, "Ada");
        assert_eq!(message.sender.role, Some(Role::Adviser));
        assert!(!message.is_pinned && !message.is_unread && message.reactions.is_empty());

        let chat = deps.repo.get_chat(&chat.id).await.unwrap();
        assert_eq!(chat.last_message.text, "hello");
        assert_eq!(chat.last_message.sent_by.as_deref(), Some("u1"));
    }

    #[tokio::test]
    async fn send_rejects_blank_text_before_writing() {
        let (deps, messages, chat) = setup().await;

        let err = messages.send(&chat.id, "u1", "   \n").await.unwrap_err();
        assert!(matches!(err, ChatError::InvalidArgument(_)));
        assert!(deps
            .repo
            .list_messages(&chat.id, MessageQuery::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn send_requires_membership() {
        let (_deps, messages, chat) = setup().await;
        let err = messages.send(&chat.id, "u3", "hi").await.unwrap_err();
        assert!(matches!(err, ChatError::Unauthorized(_)));
        let err = messages.send("missing", "u1", "hi").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn send_announces_a_notification_for_the_other_side() {
        let (deps, messages, chat) = setup().await;
        let mut rx = deps.bus.subscribe();

        let message = messages.send(&chat.id, "u1", "ping").await.unwrap();

        let mut recipients = None;
        while let Ok(event) = rx.try_recv() {
            if let Event::NotificationWarranted {
                recipients: r,
                message_id,
                ..
            } = event
            {
                assert_eq!(message_id, message.id);
                recipients = Some(r);
            }
        }
        assert_eq!(recipients, Some(vec!["u2".to_string()]));
    }

    #[tokio::test]
    async fn send_snapshots_unknown_senders_as_placeholder() {
        let (deps, messages, _chat) = setup().await;
        let chat = deps
            .repo
            .create_chat(NewChat::direct("u1", "stranger"))
            .await
            .unwrap();
        let message = messages.send(&chat.id, "stranger", "hey").await.unwrap();
        assert_eq!(message.sender.name, "Unknown user");
    }

    #[tokio::test]
    async fn only_the_sender_may_edit() {
        let (_deps, messages, chat) = setup().await;
        let message = messages.send(&chat.id, "u1", "helo").await.unwrap();

        let err = messages.edit(&message.id, "hello", "u2").await.unwrap_err();
        assert!(matches!(err, ChatError::Unauthorized(_)));

        let err = messages.edit(&message.id, "  ", "u1").await.unwrap_err();
        assert!(matches!(err, ChatError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn editing_the_last_message_refreshes_the_summary() {
        let (deps, messages, chat) = setup().await;
        let first = messages.send(&chat.id, "u1", "frist").await.unwrap();
        let last = messages.send(&chat.id, "u2", "helo").await.unwrap();

        let edited = messages.edit(&last.id, "hello", "u2").await.unwrap();
        assert!(edited.is_edited);
        assert!(edited.edited_at.is_some());
        assert_eq!(edited.text, "hello");
        let summary = deps.repo.get_chat(&chat.id).await.unwrap().last_message;
        assert_eq!(summary.text, "hello");
        assert!(summary.points_at(&last.id));

        messages.edit(&first.id, "first", "u1").await.unwrap();
        let summary = deps.repo.get_chat(&chat.id).await.unwrap().last_message;
        assert_eq!(summary.text, "hello");
    }

    #[tokio::test]
    async fn edit_keeps_a_send_that_lands_in_between() {
        let (deps, messages, chat) = setup().await;
        let first = messages.send(&chat.id, "u1", "helo").await.unwrap();

        let sender = deps.directory.snapshot_for("u2").await.unwrap();
        let repo: Arc<dyn ChatRepository> = Arc::new(SendDuringEdit {
            inner: deps.repo.clone(),
            newer: Mutex::new(Some(MessageDraft::user(&chat.id, "u2", sender, "newer"))),
        });
        let racing = MessageLifecycleManager::new(repo, deps.directory.clone(), deps.bus.clone());

        let edited = racing.edit(&first.id, "hello", "u1").await.unwrap();
        assert_eq!(edited.text, "hello");

        let summary = deps.repo.get_chat(&chat.id).await.unwrap().last_message;
        assert_eq!(summary.text, "newer");
        assert_eq!(summary.sent_by.as_deref(), Some("u2"));
        assert!(!summary.points_at(&first.id));
    }

    #[tokio::test]
    async fn deleting_an_older_message_keeps_a_newer_notice_as_summary() {
        let (deps, messages, chat) = setup().await;
        let a = messages.send(&chat.id, "u1", "a").await.unwrap();
        messages.send(&chat.id, "u2", "b").await.unwrap();
        let notice = deps
            .repo
            .append_message(MessageDraft::system(&chat.id, "Ben changed the theme to ocean"))
            .await
            .unwrap();

        messages.delete(&a.id, "u1").await.unwrap();

        let summary = deps.repo.get_chat(&chat.id).await.unwrap().last_message;
        assert!(summary.points_at(&notice.id));
        assert_eq!(summary.text, "Ben changed the theme to ocean");

        let texts: Vec<_> = deps
            .repo
            .list_messages(&chat.id, MessageQuery::default())
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(
            texts,
            vec!["b", "Ben changed the theme to ocean", "Ada deleted a message"]
        );
    }

    #[tokio::test]
    async fn deleting_the_only_message_leaves_the_sentinel() {
        let (deps, messages, chat) = setup().await;
        let message = messages.send(&chat.id, "u1", "oops").await.unwrap();

        messages.delete(&message.id, "u1").await.unwrap();

        let remaining = deps
            .repo
            .list_messages(&chat.id, MessageQuery::default())
            .await
            .unwrap();
        assert_eq!(remaining.len(), 1);
        assert!(remaining[0].is_system);
        assert_eq!(remaining[0].text, "Ada deleted a message");

        let chat = deps.repo.get_chat(&chat.id).await.unwrap();
        assert!(chat.last_message.is_none());
        assert_eq!(chat.last_message.text, NO_MESSAGES);
    }

    #[tokio::test]
    async fn deleting_the_newest_message_falls_back_to_the_previous_one() {
        let (deps, messages, chat) = setup().await;
        let older = messages.send(&chat.id, "u1", "older").await.unwrap();
        let newer = messages.send(&chat.id, "u2", "newer").await.unwrap();

        messages.delete(&newer.id, "u2").await.unwrap();

        let summary = deps.repo.get_chat(&chat.id).await.unwrap().last_message;
        assert!(summary.points_at(&older.id));
        assert_eq!(summary.text, "older");
    }

    #[tokio::test]
    async fn concurrent_deletes_of_the_two_newest_settle_on_the_survivor() {
        let (deps, messages, chat) = setup().await;
        let messages = Arc::new(messages);
        let survivor = messages.send(&chat.id, "u1", "keep").await.unwrap();
        let a = messages.send(&chat.id, "u1", "a").await.unwrap();
        let b = messages.send(&chat.id, "u2", "b").await.unwrap();

        let (ra, rb) = tokio::join!(messages.delete(&a.id, "u1"), messages.delete(&b.id, "u2"));
        ra.unwrap();
        rb.unwrap();

        let summary = deps.repo.get_chat(&chat.id).await.unwrap().last_message;
        assert!(summary.points_at(&survivor.id));
    }

    #[tokio::test]
    async fn deleted_messages_disappear_from_listings() {
        let (deps, messages, chat) = setup().await;
        let message = messages.send(&chat.id, "u1", "bye").await.unwrap();
        messages.delete(&message.id, "u2").await.unwrap();

        assert!(deps.repo.get_message(&message.id).await.unwrap_err().is_not_found());
        let err = messages.delete(&message.id, "u2").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn pin_and_unread_toggle_without_touching_the_summary() {
        let (deps, messages, chat) = setup().await;
        let first = messages.send(&chat.id, "u1", "first").await.unwrap();
        messages.send(&chat.id, "u1", "second").await.unwrap();

        assert!(messages.toggle_pin(&first.id).await.unwrap());
        assert!(messages.toggle_unread(&first.id).await.unwrap());
        assert!(!messages.toggle_unread(&first.id).await.unwrap());

        let first = deps.repo.get_message(&first.id).await.unwrap();
        assert!(first.is_pinned);
        assert!(!first.is_unread);

        let chat = deps.repo.get_chat(&chat.id).await.unwrap();
        assert_eq!(chat.last_message.text, "second");
    }

    #[tokio::test]
    async fn system_messages_are_exempt_from_edit_and_pin() {
        let (deps, messages, chat) = setup().await;
        let notice = deps
            .repo
            .append_message(MessageDraft::system(&chat.id, "Ada changed the theme"))
            .await
            .unwrap();

        let err = messages.edit(&notice.id, "hacked", SYSTEM_SENDER).await.unwrap_err();
        assert!(matches!(err, ChatError::InvalidArgument(_)));
        let err = messages.toggle_pin(&notice.id).await.unwrap_err();
        assert!(matches!(err, ChatError::InvalidArgument(_)));
        let err = messages.send(&chat.id, SYSTEM_SENDER, "spoof").await.unwrap_err();
        assert!(matches!(err, ChatError::InvalidArgument(_)));
    }
}
