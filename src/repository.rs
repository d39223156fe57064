use async_trait::async_trait;

use crate::chat::{
    Chat, ChatPatch, Message, MessageDraft, MessageFlag, MessageQuery, NewChat,
    ReactionKind, Reactor,
};
use crate::error::Result;

/// Persistence for chats and the messages they own.
///
/// Every write is a field-level merge: two callers updating different
/// fields of the same chat or message never overwrite each other.
#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// Fails with `Conflict` if a direct chat for the same pair already exists.
    async fn create_chat(&self, new: NewChat) -> Result<Chat>;

    async fn get_chat(&self, chat_id: &str) -> Result<Chat>;

    async fn find_direct_chat(&self, a: &str, b: &str) -> Result<Option<Chat>>;

    /// Chats the user participates in, most recently updated first.
    async fn list_chats_for_participant(&self, user_id: &str) -> Result<Vec<Chat>>;

    async fn update_chat(&self, chat_id: &str, patch: ChatPatch) -> Result<()>;

    /// Returns the ids that were not already participants.
    async fn add_participants(&self, chat_id: &str, user_ids: &[String]) -> Result<Vec<String>>;

    /// Returns whether the user was a participant.
    async fn remove_participant(&self, chat_id: &str, user_id: &str) -> Result<bool>;

    async fn delete_chat(&self, chat_id: &str) -> Result<()>;

    /// Writes the message and, unless the draft is kept out of the summary,
    /// points the chat's summary at it in the same transaction.
    async fn append_message(&self, draft: MessageDraft) -> Result<Message>;

    /// Re-derive the chat's summary from its newest remaining message that
    /// may appear in the summary, or the "No messages" sentinel, in a single
    /// statement.
    async fn recompute_last_message(&self, chat_id: &str) -> Result<()>;

    /// Replace the summary text only while the summary still points at
    /// `message_id`. Returns whether it did.
    async fn retitle_last_message(&self, chat_id: &str, message_id: &str, text: &str)
        -> Result<bool>;

    async fn get_message(&self, message_id: &str) -> Result<Message>;

    async fn list_messages(&self, chat_id: &str, query: MessageQuery) -> Result<Vec<Message>>;

    /// Replaces the text and stamps `edited_at` with the store clock.
    async fn edit_message(&self, message_id: &str, text: &str) -> Result<()>;

    /// Flips the flag and returns its new value.
    async fn toggle_flag(&self, message_id: &str, flag: MessageFlag) -> Result<bool>;

    async fn delete_message(&self, message_id: &str) -> Result<()>;

    async fn reaction_of(&self, message_id: &str, user_id: &str) -> Result<Option<ReactionKind>>;

    /// Sets the user's reaction, replacing any reaction they already had.
    async fn put_reaction(&self, message_id: &str, reactor: Reactor, kind: ReactionKind)
        -> Result<()>;

    async fn remove_reaction(&self, message_id: &str, user_id: &str) -> Result<()>;
}
