use crate::chat::{Chat, Message};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Event {
    /// A chat's fields or membership changed. `audience` also lists users
    /// who just left, so their chat lists refresh.
    ChatUpdated {
        chat_id: String,
        audience: Vec<String>,
    },

    /// A chat was removed for everyone in `audience`
    ChatDeleted {
        chat_id: String,
        audience: Vec<String>,
    },

    /// Messages of a chat were added, changed or removed
    MessagesUpdated { chat_id: String },

    /// A user-authored message arrived that recipients should be notified about
    NotificationWarranted {
        chat_id: String,
        message_id: String,
        sender_id: String,
        recipients: Vec<String>,
        preview: String,
    },
}

impl Event {
    pub fn chat_updated(chat: &Chat) -> Self {
        Self::ChatUpdated {
            chat_id: chat.id.clone(),
            audience: chat.participant_ids.iter().cloned().collect(),
        }
    }

    pub fn notification(chat: &Chat, message: &Message) -> Self {
        Self::NotificationWarranted {
            chat_id: chat.id.clone(),
            message_id: message.id.clone(),
            sender_id: message.sender_id.clone(),
            recipients: chat
                .participant_ids
                .iter()
                .filter(|id| **id != message.sender_id)
                .cloned()
                .collect(),
            preview: message.text.clone(),
        }
    }

    /// Whether this event can change `user_id`'s chat list.
    pub fn touches_user(&self, user_id: &str) -> bool {
        match self {
            Self::ChatUpdated { audience, .. } | Self::ChatDeleted { audience, .. } => {
                audience.iter().any(|id| id == user_id)
            }
            _ => false,
        }
    }

    /// Whether this event can change the message list of `chat_id`.
    pub fn touches_messages_of(&self, chat_id: &str) -> bool {
        match self {
            Self::MessagesUpdated { chat_id: id } | Self::ChatDeleted { chat_id: id, .. } => {
                id == chat_id
            }
            _ => false,
        }
    }
}

pub const DEFAULT_CAPACITY: usize = 256;

pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: Event) {
        // We ignore the error if there are no receivers
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
