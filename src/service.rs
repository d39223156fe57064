//! The public chat API, composed from the managers.

use std::sync::Arc;

use tracing::{info, warn};

use crate::bus::{Event, EventBus};
use crate::chat::{Chat, Message, MessageQuery, NewChat, ReactionKind, Theme};
use crate::directory::ParticipantDirectory;
use crate::entity::{Member, SYSTEM_SENDER};
use crate::error::{ChatError, Result};
use crate::membership::MembershipManager;
use crate::messages::MessageLifecycleManager;
use crate::reactions::{ReactionChange, ReactionManager};
use crate::repository::ChatRepository;
use crate::subscription::{ChatSubscription, Subscription};
use crate::upload::{ObjectUploader, UploadFile};

pub struct ChatService {
    repo: Arc<dyn ChatRepository>,
    directory: Arc<ParticipantDirectory>,
    bus: Arc<EventBus>,
    messages: MessageLifecycleManager,
    reactions: ReactionManager,
    membership: MembershipManager,
    subscriptions: ChatSubscription,
    message_limit: u32,
}

impl ChatService {
    pub fn new(
        repo: Arc<dyn ChatRepository>,
        directory: Arc<ParticipantDirectory>,
        bus: Arc<EventBus>,
        uploader: Arc<dyn ObjectUploader>,
        message_limit: u32,
    ) -> Self {
        Self {
            messages: MessageLifecycleManager::new(repo.clone(), directory.clone(), bus.clone()),
            reactions: ReactionManager::new(repo.clone(), bus.clone()),
            membership: MembershipManager::new(
                repo.clone(),
                directory.clone(),
                bus.clone(),
                uploader,
            ),
            subscriptions: ChatSubscription::new(
                repo.clone(),
                directory.clone(),
                bus.clone(),
                message_limit,
            ),
            repo,
            directory,
            bus,
            message_limit,
        }
    }

    pub fn subscriptions(&self) -> &ChatSubscription {
        &self.subscriptions
    }

    pub fn message_limit(&self) -> u32 {
        self.message_limit
    }

    // --- Chats ---

    /// The user's chats, most recently active first.
    pub async fn list_chats(&self, user_id: &str) -> Result<Vec<Chat>> {
        let mut chats = self.repo.list_chats_for_participant(user_id).await?;
        for chat in &mut chats {
            self.directory.label_for_viewer(user_id, chat).await?;
        }
        Ok(chats)
    }

    pub async fn get_chat(&self, chat_id: &str, viewer_id: &str) -> Result<Chat> {
        let mut chat = self.repo.get_chat(chat_id).await?;
        chat.ensure_member(viewer_id)?;
        self.directory.label_for_viewer(viewer_id, &mut chat).await?;
        Ok(chat)
    }

    pub async fn members(&self, chat_id: &str) -> Result<Vec<Member>> {
        let chat = self.repo.get_chat(chat_id).await?;
        self.directory.members(&chat.participant_ids).await
    }

    /// Return the one direct chat between the two users, creating it on
    /// first use.
    pub async fn get_or_create_direct_chat(&self, user_id: &str, other_user_id: &str) -> Result<Chat> {
        if user_id == other_user_id {
            return Err(ChatError::invalid("cannot start a direct chat with yourself"));
        }
        if user_id == SYSTEM_SENDER || other_user_id == SYSTEM_SENDER {
            return Err(ChatError::invalid("the system sender id is reserved"));
        }

        let mut chat = match self.repo.find_direct_chat(user_id, other_user_id).await? {
            Some(chat) => chat,
            None => match self.repo.create_chat(NewChat::direct(user_id, other_user_id)).await {
                Ok(chat) => {
                    info!(chat_id = %chat.id, user_id, other_user_id, "Direct chat created");
                    self.bus.publish(Event::chat_updated(&chat));
                    chat
                }
                Err(ChatError::Conflict(_)) => {
                    warn!(user_id, other_user_id, "Direct chat created concurrently, reusing it");
                    self.repo
                        .find_direct_chat(user_id, other_user_id)
                        .await?
                        .ok_or_else(|| {
                            ChatError::not_found(format!(
                                "direct chat between {} and {}",
                                user_id, other_user_id
                            ))
                        })?
                }
                Err(err) => return Err(err),
            },
        };

        self.directory.label_for_viewer(user_id, &mut chat).await?;
        Ok(chat)
    }

    pub async fn create_group_chat(
        &self,
        creator_id: &str,
        member_ids: &[String],
        name: &str,
    ) -> Result<Chat> {
        self.membership.create_group(creator_id, member_ids, name).await
    }

    pub async fn add_members(
        &self,
        chat_id: &str,
        member_ids: &[String],
        acting_user_id: &str,
    ) -> Result<Vec<String>> {
        self.membership
            .add_members(chat_id, member_ids, acting_user_id)
            .await
    }

    pub async fn leave_group(&self, chat_id: &str, acting_user_id: &str) -> Result<()> {
        self.membership.leave_group(chat_id, acting_user_id).await
    }

    pub async fn rename_group(&self, chat_id: &str, new_name: &str, acting_user_id: &str) -> Result<Chat> {
        self.membership
            .rename_group(chat_id, new_name, acting_user_id)
            .await
    }

    pub async fn set_theme(&self, chat_id: &str, theme: Theme, acting_user_id: &str) -> Result<Chat> {
        let mut chat = self.membership.set_theme(chat_id, theme, acting_user_id).await?;
        self.directory.label_for_viewer(acting_user_id, &mut chat).await?;
        Ok(chat)
    }

    pub async fn set_emoji(&self, chat_id: &str, emoji: &str, acting_user_id: &str) -> Result<Chat> {
        let mut chat = self.membership.set_emoji(chat_id, emoji, acting_user_id).await?;
        self.directory.label_for_viewer(acting_user_id, &mut chat).await?;
        Ok(chat)
    }

    pub async fn set_photo(&self, chat_id: &str, file: UploadFile, acting_user_id: &str) -> Result<Chat> {
        self.membership.set_photo(chat_id, file, acting_user_id).await
    }

    pub async fn delete_chat(&self, chat_id: &str, acting_user_id: &str) -> Result<()> {
        self.membership.delete_chat(chat_id, acting_user_id).await
    }

    // --- Messages ---

    pub async fn list_messages(
        &self,
        chat_id: &str,
        viewer_id: &str,
        query: MessageQuery,
    ) -> Result<Vec<Message>> {
        let chat = self.repo.get_chat(chat_id).await?;
        chat.ensure_member(viewer_id)?;
        if query.limit == 0 {
            return Err(ChatError::invalid("limit must be positive"));
        }
        self.repo.list_messages(chat_id, query).await
    }

    pub async fn send_message(&self, chat_id: &str, sender_id: &str, text: &str) -> Result<Message> {
        self.messages.send(chat_id, sender_id, text).await
    }

    pub async fn edit_message(&self, message_id: &str, new_text: &str, acting_user_id: &str) -> Result<Message> {
        self.messages.edit(message_id, new_text, acting_user_id).await
    }

    pub async fn delete_message(&self, message_id: &str, acting_user_id: &str) -> Result<()> {
        self.messages.delete(message_id, acting_user_id).await
    }

    pub async fn toggle_pin(&self, message_id: &str) -> Result<bool> {
        self.messages.toggle_pin(message_id).await
    }

    pub async fn toggle_unread(&self, message_id: &str) -> Result<bool> {
        self.messages.toggle_unread(message_id).await
    }

    /// React as `user_id`; the reactor's name comes from the directory.
    pub async fn set_reaction(
        &self,
        message_id: &str,
        user_id: &str,
        kind: ReactionKind,
    ) -> Result<ReactionChange> {
        let user_name = self.directory.display_name(user_id).await?;
        self.reactions
            .set_reaction(message_id, user_id, &user_name, kind)
            .await
    }

    // --- Subscriptions ---

    pub fn subscribe_chats<F>(&self, user_id: &str, on_update: F) -> Subscription
    where
        F: Fn(Vec<Chat>) + Send + 'static,
    {
        self.subscriptions.subscribe_chats(user_id, on_update)
    }

    pub fn subscribe_messages<F>(&self, chat_id: &str, on_update: F) -> Subscription
    where
        F: Fn(Vec<Message>) + Send + 'static,
    {
        self.subscriptions.subscribe_messages(chat_id, on_update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::{ChatKind, Order, NO_MESSAGES};
    use crate::testing::{deps, FakeUploader};

    async fn service() -> ChatService {
        let deps = deps().await;
        ChatService::new(
            deps.repo,
            deps.directory,
            deps.bus,
            Arc::new(FakeUploader::default()),
            100,
        )
    }

    fn ids(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[tokio::test]
    async fn group_message_round_trip() {
        let service = service().await;
        let chat = service
            .create_group_chat("u1", &ids(&["u2", "u3"]), "Team")
            .await
            .unwrap();
        assert_eq!(chat.participant_ids.len(), 3);

        service.send_message(&chat.id, "u1", "hi").await.unwrap();

        let query = MessageQuery {
            include_system: false,
            ..MessageQuery::default()
        };
        let messages = service.list_messages(&chat.id, "u2", query).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "hi");
        assert_eq!(messages[0].sender_id, "u1");

        let chat = service.get_chat(&chat.id, "u3").await.unwrap();
        assert_eq!(chat.last_message.text, "hi");
        assert_eq!(chat.last_message.sent_by.as_deref(), Some("u1"));
    }

    #[tokio::test]
    async fn direct_chat_is_idempotent_and_named_per_viewer() {
        let service = service().await;
        let first = service.get_or_create_direct_chat("u1", "u2").await.unwrap();
        let second = service.get_or_create_direct_chat("u2", "u1").await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.kind, ChatKind::Direct);
        assert_eq!(first.name, "Ben");
        assert_eq!(second.name, "Ada");

        let listed = service.list_chats("u2").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Ada");
    }

    #[tokio::test]
    async fn concurrent_direct_chat_requests_share_one_chat() {
        let service = Arc::new(service().await);
        let mut handles = Vec::new();
        for i in 0..8 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                let (a, b) = if i % 2 == 0 { ("u1", "u3") } else { ("u3", "u1") };
                service.get_or_create_direct_chat(a, b).await.unwrap().id
            }));
        }

        let mut chat_ids = Vec::new();
        for handle in handles {
            chat_ids.push(handle.await.unwrap());
        }
        chat_ids.dedup();
        assert_eq!(chat_ids.len(), 1);
        assert_eq!(service.list_chats("u1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn direct_chat_with_yourself_is_rejected() {
        let service = service().await;
        let err = service.get_or_create_direct_chat("u1", "u1").await.unwrap_err();
        assert!(matches!(err, ChatError::InvalidArgument(_)));
        let err = service.get_or_create_direct_chat("u1", "system").await.unwrap_err();
        assert!(matches!(err, ChatError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn send_then_delete_sole_message_resets_summary() {
        let service = service().await;
        let chat = service.get_or_create_direct_chat("u1", "u2").await.unwrap();

        let message = service.send_message(&chat.id, "u1", "hello").await.unwrap();
        let summary = service.get_chat(&chat.id, "u1").await.unwrap().last_message;
        assert_eq!(summary.text, "hello");
        assert_eq!(summary.sent_by.as_deref(), Some("u1"));

        service.delete_message(&message.id, "u1").await.unwrap();
        let chat = service.get_chat(&chat.id, "u1").await.unwrap();
        assert!(chat.last_message.is_none());
        assert_eq!(chat.last_message.text, NO_MESSAGES);

        let all = service
            .list_messages(&chat.id, "u1", MessageQuery::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].is_system);
        assert_eq!(all[0].text, "Ada deleted a message");
    }

    #[tokio::test]
    async fn deleting_an_old_message_keeps_a_later_rename_as_summary() {
        let service = service().await;
        let chat = service
            .create_group_chat("u1", &ids(&["u2"]), "Team")
            .await
            .unwrap();
        let a = service.send_message(&chat.id, "u1", "a").await.unwrap();
        service.send_message(&chat.id, "u2", "b").await.unwrap();
        service.rename_group(&chat.id, "Crew", "u2").await.unwrap();

        service.delete_message(&a.id, "u1").await.unwrap();

        let chat = service.get_chat(&chat.id, "u1").await.unwrap();
        assert_eq!(chat.last_message.text, "Ben renamed the group to \"Crew\"");
        assert_eq!(chat.last_message.sent_by.as_deref(), Some("system"));
    }

    #[tokio::test]
    async fn only_the_sender_may_edit() {
        let service = service().await;
        let chat = service.get_or_create_direct_chat("u1", "u2").await.unwrap();
        let message = service.send_message(&chat.id, "u1", "draft").await.unwrap();

        let err = service.edit_message(&message.id, "hijack", "u2").await.unwrap_err();
        assert!(matches!(err, ChatError::Unauthorized(_)));

        let edited = service.edit_message(&message.id, "final", "u1").await.unwrap();
        assert!(edited.is_edited);
        assert_eq!(edited.text, "final");
    }

    #[tokio::test]
    async fn reactions_use_the_directory_name() {
        let service = service().await;
        let chat = service.get_or_create_direct_chat("u1", "u2").await.unwrap();
        let message = service.send_message(&chat.id, "u1", "hi").await.unwrap();

        let change = service
            .set_reaction(&message.id, "u2", ReactionKind::Heart)
            .await
            .unwrap();
        assert_eq!(change, ReactionChange::Added { kind: ReactionKind::Heart });

        let messages = service
            .list_messages(&chat.id, "u1", MessageQuery::default())
            .await
            .unwrap();
        let reactors = messages[0].reactions.reactors(ReactionKind::Heart);
        assert_eq!(reactors.len(), 1);
        assert_eq!(reactors[0].user_name, "Ben");
    }

    #[tokio::test]
    async fn outsiders_cannot_read_a_chat() {
        let service = service().await;
        let chat = service.get_or_create_direct_chat("u1", "u2").await.unwrap();

        let err = service.get_chat(&chat.id, "u4").await.unwrap_err();
        assert!(matches!(err, ChatError::Unauthorized(_)));
        let err = service
            .list_messages(&chat.id, "u4", MessageQuery::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn list_messages_pages_backwards() {
        let service = service().await;
        let chat = service.get_or_create_direct_chat("u1", "u2").await.unwrap();
        for text in ["a", "b", "c", "d"] {
            service.send_message(&chat.id, "u2", text).await.unwrap();
        }

        let newest = service
            .list_messages(
                &chat.id,
                "u1",
                MessageQuery {
                    limit: 2,
                    order: Order::Desc,
                    ..MessageQuery::default()
                },
            )
            .await
            .unwrap();
        let texts: Vec<_> = newest.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["d", "c"]);

        let older = service
            .list_messages(
                &chat.id,
                "u1",
                MessageQuery {
                    limit: 2,
                    before: Some(newest[1].cursor()),
                    ..MessageQuery::default()
                },
            )
            .await
            .unwrap();
        let texts: Vec<_> = older.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b"]);

        let err = service
            .list_messages(&chat.id, "u1", MessageQuery::with_limit(0))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn members_resolve_profiles() {
        let service = service().await;
        let chat = service
            .create_group_chat("u1", &ids(&["u4", "ghost"]), "Mixed")
            .await
            .unwrap();

        let members = service.members(&chat.id).await.unwrap();
        let names: Vec<_> = members.iter().map(|m| m.display_name().to_string()).collect();
        assert_eq!(names, vec!["Unknown user", "Ada", "Dev"]);
    }

    #[tokio::test]
    async fn photo_upload_goes_through_the_uploader() {
        let deps = deps().await;
        let uploader = Arc::new(FakeUploader::default());
        let service = ChatService::new(
            deps.repo,
            deps.directory,
            deps.bus,
            uploader.clone(),
            100,
        );
        let chat = service
            .create_group_chat("u1", &ids(&["u2"]), "Pics")
            .await
            .unwrap();

        let file = UploadFile {
            bytes: vec![1, 2, 3],
            content_type: "image/png".into(),
            file_name: "team.png".into(),
        };
        let chat = service.set_photo(&chat.id, file, "u2").await.unwrap();

        let photo = chat.photo.unwrap();
        assert_eq!(photo.url, "https://cdn.test/team.png");
        assert_eq!(uploader.uploads.lock().unwrap().len(), 1);
        assert_eq!(chat.last_message.text, "Ben changed the group photo");
    }
}
