use crate::{
    chat::{
        Chat, ChatPatch, ChatPhoto, LastMessageSummary, Message, MessageDraft, MessageFlag,
        MessageQuery, NewChat, Order, ReactionKind, Reactions, Reactor,
        DEFAULT_EMOJI, NO_MESSAGES,
    },
    entity::{Account, AccountOrigin, Role, SenderSnapshot},
    error::{ChatError, Result},
    repository::ChatRepository,
};
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    ConnectOptions, QueryBuilder, Row, Sqlite, SqlitePool,
};
use std::{
    collections::BTreeSet,
    path::Path,
    str::FromStr,
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc,
    },
};
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct Store {
    pool: SqlitePool,
    /// Last timestamp handed out, in microseconds. Keeps store time strictly increasing.
    clock: Arc<AtomicI64>,
}

impl Store {
    /// Create a new Store instance.
    /// This will automatically create the database file if it doesn't exist.
    pub async fn new(db_path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let db_path = db_path.as_ref();

        // Ensure the parent directory exists
        if let Some(parent) = db_path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).context("Failed to create database directory")?;
            }
        }

        let db_url = format!("sqlite://{}", db_path.to_string_lossy());

        let options = SqliteConnectOptions::from_str(&db_url)?
            .create_if_missing(true)
            .log_statements(tracing::log::LevelFilter::Trace);

        let pool = SqlitePool::connect_with(options)
            .await
            .context("Failed to connect to SQLite database")?;

        Ok(Self::from_pool(pool))
    }

    /// A private in-memory database on a single pinned connection.
    pub async fn in_memory() -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .context("Failed to open in-memory SQLite database")?;

        let store = Self::from_pool(pool);
        store.init().await?;
        Ok(store)
    }

    fn from_pool(pool: SqlitePool) -> Self {
        Self {
            pool,
            clock: Arc::new(AtomicI64::new(0)),
        }
    }

    /// Initialize the database schema.
    pub async fn init(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS accounts (
                id TEXT NOT NULL,
                origin TEXT NOT NULL,
                display_name TEXT NOT NULL,
                photo TEXT,
                PRIMARY KEY (origin, id)
            );

            CREATE TABLE IF NOT EXISTS chats (
                id TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                name TEXT NOT NULL,
                direct_key TEXT UNIQUE,
                photo_url TEXT,
                photo_public_id TEXT,
                theme TEXT,
                emoji TEXT NOT NULL,
                created_by TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                last_message_id TEXT,
                last_text TEXT NOT NULL,
                last_sent_at INTEGER,
                last_sent_by TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_chats_updated ON chats(updated_at DESC);

            CREATE TABLE IF NOT EXISTS chat_participants (
                chat_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                joined_at INTEGER NOT NULL,
                PRIMARY KEY (chat_id, user_id)
            );
            CREATE INDEX IF NOT EXISTS idx_participants_user ON chat_participants(user_id);

            CREATE TABLE IF NOT EXISTS messages (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                chat_id TEXT NOT NULL,
                text TEXT NOT NULL,
                sender_id TEXT NOT NULL,
                sender_name TEXT NOT NULL,
                sender_photo TEXT,
                sender_role TEXT,
                created_at INTEGER NOT NULL,
                is_edited INTEGER NOT NULL DEFAULT 0,
                edited_at INTEGER,
                is_system INTEGER NOT NULL DEFAULT 0,
                in_summary INTEGER NOT NULL DEFAULT 1,
                is_pinned INTEGER NOT NULL DEFAULT 0,
                is_unread INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_messages_chat_seq ON messages(chat_id, seq DESC);

            CREATE TABLE IF NOT EXISTS message_reactions (
                message_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                user_name TEXT NOT NULL,
                kind TEXT NOT NULL,
                PRIMARY KEY (message_id, user_id)
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to initialize database schema")?;

        Ok(())
    }

    /// Server-assigned timestamp; never repeats and never goes backwards.
    fn now(&self) -> DateTime<Utc> {
        let wall = Utc::now().timestamp_micros();
        let mut last = self.clock.load(Ordering::Acquire);
        loop {
            let next = wall.max(last + 1);
            match self
                .clock
                .compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return from_micros(next),
                Err(actual) => last = actual,
            }
        }
    }

    /// Save or update an account in the directory mirror.
    pub async fn upsert_account(&self, origin: AccountOrigin, account: &Account) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO accounts (id, origin, display_name, photo)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(origin, id) DO UPDATE SET
                display_name = excluded.display_name,
                photo = excluded.photo
            "#,
        )
        .bind(&account.id)
        .bind(origin.as_str())
        .bind(&account.display_name)
        .bind(&account.photo)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn find_account(&self, origin: AccountOrigin, id: &str) -> Result<Option<Account>> {
        let row = sqlx::query(
            "SELECT id, display_name, photo FROM accounts WHERE origin = ? AND id = ?",
        )
        .bind(origin.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| -> Result<Account> {
            Ok(Account {
                id: row.try_get("id")?,
                display_name: row.try_get("display_name")?,
                photo: row.try_get("photo")?,
            })
        })
        .transpose()
    }

    async fn participants(&self, chat_id: &str) -> Result<BTreeSet<String>> {
        let rows = sqlx::query("SELECT user_id FROM chat_participants WHERE chat_id = ?")
            .bind(chat_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("user_id").map_err(ChatError::from))
            .collect()
    }

    async fn reactions(&self, message_id: &str) -> Result<Reactions> {
        let rows = sqlx::query(
            "SELECT user_id, user_name, kind FROM message_reactions WHERE message_id = ?",
        )
        .bind(message_id)
        .fetch_all(&self.pool)
        .await?;

        let mut reactions = Reactions::default();
        for row in rows {
            let kind: String = row.try_get("kind")?;
            reactions.insert(
                Reactor {
                    user_id: row.try_get("user_id")?,
                    user_name: row.try_get("user_name")?,
                },
                kind.parse()?,
            );
        }
        Ok(reactions)
    }

    async fn hydrate_message(&self, row: &SqliteRow) -> Result<Message> {
        let mut message = message_from_row(row)?;
        message.reactions = self.reactions(&message.id).await?;
        Ok(message)
    }
}

fn from_micros(micros: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(micros).unwrap_or_default()
}

fn chat_from_row(row: &SqliteRow, participant_ids: BTreeSet<String>) -> Result<Chat> {
    let kind: String = row.try_get("kind")?;
    let theme: Option<String> = row.try_get("theme")?;
    let photo_url: Option<String> = row.try_get("photo_url")?;
    let photo_public_id: Option<String> = row.try_get("photo_public_id")?;
    let last_message_id: Option<String> = row.try_get("last_message_id")?;

    let last_message = match last_message_id {
        Some(message_id) => LastMessageSummary {
            message_id: Some(message_id),
            text: row.try_get("last_text")?,
            sent_at: row
                .try_get::<Option<i64>, _>("last_sent_at")?
                .map(from_micros),
            sent_by: row.try_get("last_sent_by")?,
        },
        None => LastMessageSummary::none(),
    };

    Ok(Chat {
        id: row.try_get("id")?,
        kind: kind.parse()?,
        name: row.try_get("name")?,
        participant_ids,
        photo: match (photo_url, photo_public_id) {
            (Some(url), Some(public_id)) => Some(ChatPhoto { url, public_id }),
            _ => None,
        },
        theme: theme.map(|t| t.parse()).transpose()?,
        emoji: row.try_get("emoji")?,
        created_by: row.try_get("created_by")?,
        created_at: from_micros(row.try_get("created_at")?),
        updated_at: from_micros(row.try_get("updated_at")?),
        last_message,
    })
}

fn message_from_row(row: &SqliteRow) -> Result<Message> {
    let sender_role: Option<String> = row.try_get("sender_role")?;

    Ok(Message {
        id: row.try_get("id")?,
        seq: row.try_get("seq")?,
        chat_id: row.try_get("chat_id")?,
        text: row.try_get("text")?,
        sender_id: row.try_get("sender_id")?,
        sender: SenderSnapshot {
            name: row.try_get("sender_name")?,
            photo: row.try_get("sender_photo")?,
            role: sender_role.map(|r| r.parse::<Role>()).transpose()?,
        },
        created_at: from_micros(row.try_get("created_at")?),
        is_edited: row.try_get("is_edited")?,
        edited_at: row
            .try_get::<Option<i64>, _>("edited_at")?
            .map(from_micros),
        is_system: row.try_get("is_system")?,
        reactions: Reactions::default(),
        is_pinned: row.try_get("is_pinned")?,
        is_unread: row.try_get("is_unread")?,
    })
}

#[async_trait]
impl ChatRepository for Store {
    async fn create_chat(&self, new: NewChat) -> Result<Chat> {
        let id = Uuid::new_v4().to_string();
        let now = self.now();
        let summary = LastMessageSummary::none();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO chats (id, kind, name, direct_key, emoji, created_by, created_at, updated_at, last_text)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(new.kind.as_str())
        .bind(&new.name)
        .bind(new.direct_key())
        .bind(DEFAULT_EMOJI)
        .bind(&new.created_by)
        .bind(now.timestamp_micros())
        .bind(now.timestamp_micros())
        .bind(&summary.text)
        .execute(&mut *tx)
        .await?;

        for user_id in &new.participant_ids {
            sqlx::query(
                "INSERT INTO chat_participants (chat_id, user_id, joined_at) VALUES (?, ?, ?)",
            )
            .bind(&id)
            .bind(user_id)
            .bind(now.timestamp_micros())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(Chat {
            id,
            kind: new.kind,
            name: new.name,
            participant_ids: new.participant_ids,
            photo: None,
            theme: None,
            emoji: DEFAULT_EMOJI.to_string(),
            created_by: new.created_by,
            created_at: now,
            updated_at: now,
            last_message: summary,
        })
    }

    async fn get_chat(&self, chat_id: &str) -> Result<Chat> {
        let row = sqlx::query("SELECT * FROM chats WHERE id = ?")
            .bind(chat_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ChatError::not_found(format!("chat {}", chat_id)))?;

        let participants = self.participants(chat_id).await?;
        chat_from_row(&row, participants)
    }

    async fn find_direct_chat(&self, a: &str, b: &str) -> Result<Option<Chat>> {
        let row = sqlx::query("SELECT * FROM chats WHERE direct_key = ?")
            .bind(crate::chat::direct_key(a, b))
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let id: String = row.try_get("id")?;
                let participants = self.participants(&id).await?;
                chat_from_row(&row, participants).map(Some)
            }
            None => Ok(None),
        }
    }

    async fn list_chats_for_participant(&self, user_id: &str) -> Result<Vec<Chat>> {
        let rows = sqlx::query(
            r#"
            SELECT c.*
            FROM chats c
            JOIN chat_participants p ON p.chat_id = c.id
            WHERE p.user_id = ?
            ORDER BY c.updated_at DESC, c.rowid DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut chats = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.try_get("id")?;
            let participants = self.participants(&id).await?;
            chats.push(chat_from_row(&row, participants)?);
        }

        Ok(chats)
    }

    async fn update_chat(&self, chat_id: &str, patch: ChatPatch) -> Result<()> {
        if patch.is_empty() {
            return Ok(());
        }

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE chats SET ");
        {
            let mut set = qb.separated(", ");
            if let Some(name) = patch.name {
                set.push("name = ").push_bind_unseparated(name);
            }
            if let Some(photo) = patch.photo {
                set.push("photo_url = ").push_bind_unseparated(photo.url);
                set.push("photo_public_id = ")
                    .push_bind_unseparated(photo.public_id);
            }
            if let Some(theme) = patch.theme {
                set.push("theme = ").push_bind_unseparated(theme.as_str());
            }
            if let Some(emoji) = patch.emoji {
                set.push("emoji = ").push_bind_unseparated(emoji);
            }
        }
        qb.push(" WHERE id = ").push_bind(chat_id);

        let result = qb.build().execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(ChatError::not_found(format!("chat {}", chat_id)));
        }

        Ok(())
    }

    async fn add_participants(&self, chat_id: &str, user_ids: &[String]) -> Result<Vec<String>> {
        let now = self.now();
        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query("SELECT 1 FROM chats WHERE id = ?")
            .bind(chat_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(ChatError::not_found(format!("chat {}", chat_id)));
        }

        let mut added = Vec::new();
        for user_id in user_ids {
            let result = sqlx::query(
                "INSERT OR IGNORE INTO chat_participants (chat_id, user_id, joined_at) VALUES (?, ?, ?)",
            )
            .bind(chat_id)
            .bind(user_id)
            .bind(now.timestamp_micros())
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() > 0 {
                added.push(user_id.clone());
            }
        }

        tx.commit().await?;
        Ok(added)
    }

    async fn remove_participant(&self, chat_id: &str, user_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM chat_participants WHERE chat_id = ? AND user_id = ?")
            .bind(chat_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_chat(&self, chat_id: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "DELETE FROM message_reactions WHERE message_id IN (SELECT id FROM messages WHERE chat_id = ?)",
        )
        .bind(chat_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM messages WHERE chat_id = ?")
            .bind(chat_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM chat_participants WHERE chat_id = ?")
            .bind(chat_id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM chats WHERE id = ?")
            .bind(chat_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ChatError::not_found(format!("chat {}", chat_id)));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn append_message(&self, draft: MessageDraft) -> Result<Message> {
        let id = Uuid::new_v4().to_string();
        let now = self.now();

        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO messages (id, chat_id, text, sender_id, sender_name, sender_photo, sender_role, created_at, is_system, in_summary)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&draft.chat_id)
        .bind(&draft.text)
        .bind(&draft.sender_id)
        .bind(&draft.sender.name)
        .bind(&draft.sender.photo)
        .bind(draft.sender.role.map(|r| r.as_str()))
        .bind(now.timestamp_micros())
        .bind(draft.is_system)
        .bind(draft.in_summary)
        .execute(&mut *tx)
        .await?;

        let touched = if draft.in_summary {
            sqlx::query(
                r#"
                UPDATE chats
                SET updated_at = ?, last_message_id = ?, last_text = ?, last_sent_at = ?, last_sent_by = ?
                WHERE id = ?
                "#,
            )
            .bind(now.timestamp_micros())
            .bind(&id)
            .bind(&draft.text)
            .bind(now.timestamp_micros())
            .bind(&draft.sender_id)
            .bind(&draft.chat_id)
            .execute(&mut *tx)
            .await?
        } else {
            sqlx::query("UPDATE chats SET updated_at = ? WHERE id = ?")
                .bind(now.timestamp_micros())
                .bind(&draft.chat_id)
                .execute(&mut *tx)
                .await?
        };

        // Dropping the transaction rolls the insert back.
        if touched.rows_affected() == 0 {
            return Err(ChatError::not_found(format!("chat {}", draft.chat_id)));
        }

        tx.commit().await?;

        Ok(Message {
            id,
            seq: inserted.last_insert_rowid(),
            chat_id: draft.chat_id,
            text: draft.text,
            sender_id: draft.sender_id,
            sender: draft.sender,
            created_at: now,
            is_edited: false,
            edited_at: None,
            is_system: draft.is_system,
            reactions: Reactions::default(),
            is_pinned: false,
            is_unread: false,
        })
    }

    async fn recompute_last_message(&self, chat_id: &str) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE chats SET
                last_message_id = (
                    SELECT m.id FROM messages m
                    WHERE m.chat_id = chats.id AND m.in_summary = 1
                    ORDER BY m.seq DESC LIMIT 1
                ),
                last_text = COALESCE((
                    SELECT m.text FROM messages m
                    WHERE m.chat_id = chats.id AND m.in_summary = 1
                    ORDER BY m.seq DESC LIMIT 1
                ), ?),
                last_sent_at = (
                    SELECT m.created_at FROM messages m
                    WHERE m.chat_id = chats.id AND m.in_summary = 1
                    ORDER BY m.seq DESC LIMIT 1
                ),
                last_sent_by = (
                    SELECT m.sender_id FROM messages m
                    WHERE m.chat_id = chats.id AND m.in_summary = 1
                    ORDER BY m.seq DESC LIMIT 1
                )
            WHERE id = ?
            "#,
        )
        .bind(NO_MESSAGES)
        .bind(chat_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ChatError::not_found(format!("chat {}", chat_id)));
        }

        Ok(())
    }

    async fn retitle_last_message(
        &self,
        chat_id: &str,
        message_id: &str,
        text: &str,
    ) -> Result<bool> {
        let result =
            sqlx::query("UPDATE chats SET last_text = ? WHERE id = ? AND last_message_id = ?")
                .bind(text)
                .bind(chat_id)
                .bind(message_id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_message(&self, message_id: &str) -> Result<Message> {
        let row = sqlx::query("SELECT * FROM messages WHERE id = ?")
            .bind(message_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ChatError::not_found(format!("message {}", message_id)))?;

        self.hydrate_message(&row).await
    }

    /// Retrieve the newest messages of a chat, returned in the requested order.
    async fn list_messages(&self, chat_id: &str, query: MessageQuery) -> Result<Vec<Message>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM messages WHERE chat_id = ");
        qb.push_bind(chat_id);
        if !query.include_system {
            qb.push(" AND is_system = 0");
        }
        if let Some(before) = query.before {
            qb.push(" AND seq < ").push_bind(before.0);
        }
        qb.push(" ORDER BY seq DESC LIMIT ")
            .push_bind(i64::from(query.limit));

        let rows = qb.build().fetch_all(&self.pool).await?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in &rows {
            messages.push(self.hydrate_message(row).await?);
        }

        if query.order == Order::Asc {
            messages.reverse();
        }

        Ok(messages)
    }

    async fn edit_message(&self, message_id: &str, text: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE messages SET text = ?, is_edited = 1, edited_at = ? WHERE id = ?",
        )
        .bind(text)
        .bind(self.now().timestamp_micros())
        .bind(message_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ChatError::not_found(format!("message {}", message_id)));
        }

        Ok(())
    }

    async fn toggle_flag(&self, message_id: &str, flag: MessageFlag) -> Result<bool> {
        let sql = match flag {
            MessageFlag::Pinned => {
                "UPDATE messages SET is_pinned = NOT is_pinned WHERE id = ? RETURNING is_pinned AS flag"
            }
            MessageFlag::Unread => {
                "UPDATE messages SET is_unread = NOT is_unread WHERE id = ? RETURNING is_unread AS flag"
            }
        };

        let row = sqlx::query(sql)
            .bind(message_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ChatError::not_found(format!("message {}", message_id)))?;

        Ok(row.try_get("flag")?)
    }

    async fn delete_message(&self, message_id: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM message_reactions WHERE message_id = ?")
            .bind(message_id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM messages WHERE id = ?")
            .bind(message_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ChatError::not_found(format!("message {}", message_id)));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn reaction_of(&self, message_id: &str, user_id: &str) -> Result<Option<ReactionKind>> {
        let kind: Option<String> = sqlx::query_scalar(
            "SELECT kind FROM message_reactions WHERE message_id = ? AND user_id = ?",
        )
        .bind(message_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        kind.map(|k| k.parse()).transpose()
    }

    async fn put_reaction(
        &self,
        message_id: &str,
        reactor: Reactor,
        kind: ReactionKind,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO message_reactions (message_id, user_id, user_name, kind)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(message_id, user_id) DO UPDATE SET
                user_name = excluded.user_name,
                kind = excluded.kind
            "#,
        )
        .bind(message_id)
        .bind(&reactor.user_id)
        .bind(&reactor.user_name)
        .bind(kind.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove_reaction(&self, message_id: &str, user_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM message_reactions WHERE message_id = ? AND user_id = ?")
            .bind(message_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
