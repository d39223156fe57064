//! Live, full-snapshot views over a user's chat list and a chat's messages.

use std::sync::{Arc, Mutex};

use futures::{pin_mut, Stream, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::bus::{Event, EventBus};
use crate::chat::{Chat, Message, MessageQuery};
use crate::directory::ParticipantDirectory;
use crate::error::Result;
use crate::repository::ChatRepository;

pub struct ChatSubscription {
    repo: Arc<dyn ChatRepository>,
    directory: Arc<ParticipantDirectory>,
    bus: Arc<EventBus>,
    message_limit: u32,
}

/// Handle for a registered callback. Dropping it also unsubscribes.
pub struct Subscription {
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Subscription {
    fn spawn<S, T, F>(stream: S, on_update: F) -> Self
    where
        S: Stream<Item = Result<T>> + Send + 'static,
        T: Send + 'static,
        F: Fn(T) + Send + 'static,
    {
        let task = tokio::spawn(async move {
            pin_mut!(stream);
            while let Some(snapshot) = stream.next().await {
                match snapshot {
                    Ok(snapshot) => on_update(snapshot),
                    Err(err) => warn!(error = %err, "Failed to refresh subscription snapshot"),
                }
            }
        });

        Self {
            task: Mutex::new(Some(task)),
        }
    }

    /// Stop delivering updates. Safe to call any number of times.
    pub fn unsubscribe(&self) {
        let task = match self.task.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(task) = task {
            task.abort();
        }
    }

    pub fn is_active(&self) -> bool {
        match self.task.lock() {
            Ok(guard) => guard.as_ref().is_some_and(|task| !task.is_finished()),
            Err(_) => false,
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl ChatSubscription {
    pub fn new(
        repo: Arc<dyn ChatRepository>,
        directory: Arc<ParticipantDirectory>,
        bus: Arc<EventBus>,
        message_limit: u32,
    ) -> Self {
        Self {
            repo,
            directory,
            bus,
            message_limit,
        }
    }

    /// The user's chats, newest activity first: once now, then again after
    /// every change that can affect the list.
    pub fn chat_stream(
        &self,
        user_id: &str,
    ) -> impl Stream<Item = Result<Vec<Chat>>> + Send + 'static {
        // Subscribe before the first snapshot so no change slips between them.
        let mut rx = self.bus.subscribe();
        let repo = self.repo.clone();
        let directory = self.directory.clone();
        let user_id = user_id.to_string();

        async_stream::stream! {
            yield chat_snapshot(repo.as_ref(), &directory, &user_id).await;

            loop {
                match rx.recv().await {
                    Ok(event) if event.touches_user(&user_id) => {}
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(user_id = %user_id, skipped, "Chat subscriber lagged, re-reading");
                    }
                    Err(RecvError::Closed) => break,
                }
                yield chat_snapshot(repo.as_ref(), &directory, &user_id).await;
            }
        }
    }

    /// The newest messages of a chat in ascending order, capped at the
    /// configured limit. Ends after the chat is deleted.
    pub fn message_stream(
        &self,
        chat_id: &str,
    ) -> impl Stream<Item = Result<Vec<Message>>> + Send + 'static {
        let mut rx = self.bus.subscribe();
        let repo = self.repo.clone();
        let chat_id = chat_id.to_string();
        let query = MessageQuery::with_limit(self.message_limit);

        async_stream::stream! {
            yield repo.list_messages(&chat_id, query).await;

            loop {
                let mut finished = false;
                match rx.recv().await {
                    Ok(event) if event.touches_messages_of(&chat_id) => {
                        finished = matches!(event, Event::ChatDeleted { .. });
                    }
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(chat_id = %chat_id, skipped, "Message subscriber lagged, re-reading");
                    }
                    Err(RecvError::Closed) => break,
                }
                yield repo.list_messages(&chat_id, query).await;
                if finished {
                    break;
                }
            }
        }
    }

    pub fn subscribe_chats<F>(&self, user_id: &str, on_update: F) -> Subscription
    where
        F: Fn(Vec<Chat>) + Send + 'static,
    {
        Subscription::spawn(self.chat_stream(user_id), on_update)
    }

    pub fn subscribe_messages<F>(&self, chat_id: &str, on_update: F) -> Subscription
    where
        F: Fn(Vec<Message>) + Send + 'static,
    {
        Subscription::spawn(self.message_stream(chat_id), on_update)
    }
}

async fn chat_snapshot(
    repo: &dyn ChatRepository,
    directory: &ParticipantDirectory,
    user_id: &str,
) -> Result<Vec<Chat>> {
    let mut chats = repo.list_chats_for_participant(user_id).await?;
    for chat in &mut chats {
        directory.label_for_viewer(user_id, chat).await?;
    }
    Ok(chats)
}
