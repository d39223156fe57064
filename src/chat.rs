use crate::entity::{SenderSnapshot, SYSTEM_SENDER};
use crate::error::ChatError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_EMOJI: &str = "❤️";
pub const NO_MESSAGES: &str = "No messages";
pub const DEFAULT_MESSAGE_LIMIT: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatKind {
    Direct,
    Group,
}

impl ChatKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Group => "group",
        }
    }
}

impl FromStr for ChatKind {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direct" => Ok(Self::Direct),
            "group" => Ok(Self::Group),
            other => Err(ChatError::invalid(format!("unknown chat kind: {}", other))),
        }
    }
}

/// Closed colour palette a chat can be themed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    Classic,
    Ocean,
    Sunset,
    Forest,
    Berry,
    Midnight,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Classic => "classic",
            Self::Ocean => "ocean",
            Self::Sunset => "sunset",
            Self::Forest => "forest",
            Self::Berry => "berry",
            Self::Midnight => "midnight",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "classic" => Ok(Self::Classic),
            "ocean" => Ok(Self::Ocean),
            "sunset" => Ok(Self::Sunset),
            "forest" => Ok(Self::Forest),
            "berry" => Ok(Self::Berry),
            "midnight" => Ok(Self::Midnight),
            other => Err(ChatError::invalid(format!("unknown theme: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPhoto {
    pub url: String,
    pub public_id: String,
}

/// Denormalized preview of the newest message, used by chat lists.
///
/// `message_id == None` is the "No messages" sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastMessageSummary {
    pub message_id: Option<String>,
    pub text: String,
    pub sent_at: Option<DateTime<Utc>>,
    pub sent_by: Option<String>,
}

impl LastMessageSummary {
    pub fn none() -> Self {
        Self {
            message_id: None,
            text: NO_MESSAGES.to_string(),
            sent_at: None,
            sent_by: None,
        }
    }

    pub fn of(message: &Message) -> Self {
        Self {
            message_id: Some(message.id.clone()),
            text: message.text.clone(),
            sent_at: Some(message.created_at),
            sent_by: Some(message.sender_id.clone()),
        }
    }

    pub fn is_none(&self) -> bool {
        self.message_id.is_none()
    }

    pub fn points_at(&self, message_id: &str) -> bool {
        self.message_id.as_deref() == Some(message_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: String,
    pub kind: ChatKind,
    /// Empty for direct chats; the service derives it per viewer.
    pub name: String,
    pub participant_ids: BTreeSet<String>,
    pub photo: Option<ChatPhoto>,
    pub theme: Option<Theme>,
    pub emoji: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_message: LastMessageSummary,
}

impl Chat {
    pub fn is_member(&self, user_id: &str) -> bool {
        self.participant_ids.contains(user_id)
    }

    pub fn is_group(&self) -> bool {
        self.kind == ChatKind::Group
    }

    /// The other side of a direct chat.
    pub fn counterpart(&self, user_id: &str) -> Option<&str> {
        if self.kind != ChatKind::Direct {
            return None;
        }
        self.participant_ids
            .iter()
            .map(String::as_str)
            .find(|id| *id != user_id)
    }

    pub fn ensure_member(&self, user_id: &str) -> Result<(), ChatError> {
        if self.is_member(user_id) {
            Ok(())
        } else {
            Err(ChatError::unauthorized(format!(
                "{} is not a participant of chat {}",
                user_id, self.id
            )))
        }
    }

    pub fn ensure_group(&self) -> Result<(), ChatError> {
        if self.is_group() {
            Ok(())
        } else {
            Err(ChatError::invalid(format!(
                "chat {} is not a group chat",
                self.id
            )))
        }
    }
}

/// Uniqueness key for a direct chat: the unordered participant pair.
pub fn direct_key(a: &str, b: &str) -> String {
    if a <= b {
        format!("{}|{}", a, b)
    } else {
        format!("{}|{}", b, a)
    }
}

#[derive(Debug, Clone)]
pub struct NewChat {
    pub kind: ChatKind,
    pub name: String,
    pub participant_ids: BTreeSet<String>,
    pub created_by: String,
}

impl NewChat {
    pub fn direct(a: &str, b: &str) -> Self {
        Self {
            kind: ChatKind::Direct,
            name: String::new(),
            participant_ids: [a.to_string(), b.to_string()].into_iter().collect(),
            created_by: a.to_string(),
        }
    }

    pub fn group(
        name: impl Into<String>,
        creator: &str,
        members: impl IntoIterator<Item = String>,
    ) -> Self {
        let mut participant_ids: BTreeSet<String> = members.into_iter().collect();
        participant_ids.insert(creator.to_string());
        Self {
            kind: ChatKind::Group,
            name: name.into(),
            participant_ids,
            created_by: creator.to_string(),
        }
    }

    pub fn direct_key(&self) -> Option<String> {
        if self.kind != ChatKind::Direct {
            return None;
        }
        let mut ids = self.participant_ids.iter();
        match (ids.next(), ids.next()) {
            (Some(a), Some(b)) => Some(direct_key(a, b)),
            _ => None,
        }
    }
}

/// Field-level update of a chat. Absent fields are left untouched. The
/// last-message summary is only ever written by the repository itself.
#[derive(Debug, Clone, Default)]
pub struct ChatPatch {
    pub name: Option<String>,
    pub photo: Option<ChatPhoto>,
    pub theme: Option<Theme>,
    pub emoji: Option<String>,
}

impl ChatPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.photo.is_none()
            && self.theme.is_none()
            && self.emoji.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionKind {
    Heart,
    Laugh,
    Sad,
    Angry,
}

impl ReactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Heart => "heart",
            Self::Laugh => "laugh",
            Self::Sad => "sad",
            Self::Angry => "angry",
        }
    }
}

impl FromStr for ReactionKind {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "heart" => Ok(Self::Heart),
            "laugh" => Ok(Self::Laugh),
            "sad" => Ok(Self::Sad),
            "angry" => Ok(Self::Angry),
            other => Err(ChatError::invalid(format!("unknown reaction: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reactor {
    pub user_id: String,
    pub user_name: String,
}

/// Reactions on a message, keyed by user so each user holds at most one.
///
/// Serialized grouped by kind, which is how clients render them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    into = "BTreeMap<ReactionKind, Vec<Reactor>>",
    from = "BTreeMap<ReactionKind, Vec<Reactor>>"
)]
pub struct Reactions {
    by_user: BTreeMap<String, (ReactionKind, String)>,
}

impl Reactions {
    pub fn insert(&mut self, reactor: Reactor, kind: ReactionKind) {
        self.by_user.insert(reactor.user_id, (kind, reactor.user_name));
    }

    pub fn kind_of(&self, user_id: &str) -> Option<ReactionKind> {
        self.by_user.get(user_id).map(|(kind, _)| *kind)
    }

    pub fn reactors(&self, kind: ReactionKind) -> Vec<Reactor> {
        self.by_user
            .iter()
            .filter(|(_, (k, _))| *k == kind)
            .map(|(user_id, (_, user_name))| Reactor {
                user_id: user_id.clone(),
                user_name: user_name.clone(),
            })
            .collect()
    }

    pub fn count(&self, kind: ReactionKind) -> usize {
        self.by_user.values().filter(|(k, _)| *k == kind).count()
    }

    pub fn is_empty(&self) -> bool {
        self.by_user.is_empty()
    }

    pub fn len(&self) -> usize {
        self.by_user.len()
    }
}

impl From<Reactions> for BTreeMap<ReactionKind, Vec<Reactor>> {
    fn from(reactions: Reactions) -> Self {
        let mut grouped: BTreeMap<ReactionKind, Vec<Reactor>> = BTreeMap::new();
        for (user_id, (kind, user_name)) in reactions.by_user {
            grouped
                .entry(kind)
                .or_default()
                .push(Reactor { user_id, user_name });
        }
        grouped
    }
}

impl From<BTreeMap<ReactionKind, Vec<Reactor>>> for Reactions {
    fn from(grouped: BTreeMap<ReactionKind, Vec<Reactor>>) -> Self {
        let mut reactions = Reactions::default();
        for (kind, reactors) in grouped {
            for reactor in reactors {
                reactions.insert(reactor, kind);
            }
        }
        reactions
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    /// Store-assigned position within the chat; doubles as a paging cursor.
    pub seq: i64,
    pub chat_id: String,
    pub text: String,
    pub sender_id: String,
    pub sender: SenderSnapshot,
    pub created_at: DateTime<Utc>,
    pub is_edited: bool,
    pub edited_at: Option<DateTime<Utc>>,
    pub is_system: bool,
    #[serde(default)]
    pub reactions: Reactions,
    pub is_pinned: bool,
    pub is_unread: bool,
}

impl Message {
    pub fn cursor(&self) -> MessageCursor {
        MessageCursor(self.seq)
    }
}

/// A message that has not been written yet.
#[derive(Debug, Clone)]
pub struct MessageDraft {
    pub chat_id: String,
    pub text: String,
    pub sender_id: String,
    pub sender: SenderSnapshot,
    pub is_system: bool,
    /// Whether the chat's last-message summary may point at this message.
    pub in_summary: bool,
}

impl MessageDraft {
    pub fn user(chat_id: &str, sender_id: &str, sender: SenderSnapshot, text: &str) -> Self {
        Self {
            chat_id: chat_id.to_string(),
            text: text.to_string(),
            sender_id: sender_id.to_string(),
            sender,
            is_system: false,
            in_summary: true,
        }
    }

    pub fn system(chat_id: &str, text: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.to_string(),
            text: text.into(),
            sender_id: SYSTEM_SENDER.to_string(),
            sender: SenderSnapshot::system(),
            is_system: true,
            in_summary: true,
        }
    }

    /// "X deleted a message". Never becomes the chat's summary, so removing
    /// the last message can still fall back to what came before it.
    pub fn deletion_notice(chat_id: &str, text: impl Into<String>) -> Self {
        Self {
            in_summary: false,
            ..Self::system(chat_id, text)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageFlag {
    Pinned,
    Unread,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Order {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageCursor(pub i64);

/// Selects the newest `limit` messages (older than `before` when set),
/// returned in `order`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageQuery {
    pub limit: u32,
    pub order: Order,
    pub before: Option<MessageCursor>,
    pub include_system: bool,
}

impl Default for MessageQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_MESSAGE_LIMIT,
            order: Order::Asc,
            before: None,
            include_system: true,
        }
    }
}

impl MessageQuery {
    pub fn with_limit(limit: u32) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }
}
