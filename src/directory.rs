//! Read-only lookup of chat participants across the external account stores.

use async_trait::async_trait;
use std::sync::Arc;

use crate::chat::Chat;
use crate::entity::{Account, AccountOrigin, Member, SenderSnapshot, UserProfile};
use crate::error::{ChatError, Result};
use crate::store::Store;

/// One external account store (staff, learners, interns, ...).
#[async_trait]
pub trait AccountStore: Send + Sync {
    fn origin(&self) -> AccountOrigin;

    async fn find(&self, user_id: &str) -> Result<Option<Account>>;
}

/// Account store backed by the `accounts` mirror table.
pub struct StoreAccounts {
    store: Store,
    origin: AccountOrigin,
}

impl StoreAccounts {
    pub fn new(store: Store, origin: AccountOrigin) -> Self {
        Self { store, origin }
    }
}

#[async_trait]
impl AccountStore for StoreAccounts {
    fn origin(&self) -> AccountOrigin {
        self.origin
    }

    async fn find(&self, user_id: &str) -> Result<Option<Account>> {
        self.store.find_account(self.origin, user_id).await
    }
}

pub struct ParticipantDirectory {
    stores: Vec<Arc<dyn AccountStore>>,
}

impl ParticipantDirectory {
    /// Stores are probed in the given order; the first hit wins.
    pub fn new(stores: Vec<Arc<dyn AccountStore>>) -> Self {
        Self { stores }
    }

    /// Staff, then learners, then interns, all read from the store's mirror.
    pub fn from_store(store: &Store) -> Self {
        Self::new(
            AccountOrigin::ALL
                .into_iter()
                .map(|origin| {
                    Arc::new(StoreAccounts::new(store.clone(), origin)) as Arc<dyn AccountStore>
                })
                .collect(),
        )
    }

    pub async fn resolve(&self, user_id: &str) -> Result<UserProfile> {
        for store in &self.stores {
            if let Some(account) = store.find(user_id).await? {
                return Ok(UserProfile::from_account(account, store.origin()));
            }
        }
        Err(ChatError::not_found(format!("user {}", user_id)))
    }

    /// Like `resolve`, but an unknown id is `None` instead of an error.
    pub async fn lookup(&self, user_id: &str) -> Result<Option<UserProfile>> {
        match self.resolve(user_id).await {
            Ok(profile) => Ok(Some(profile)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub async fn snapshot_for(&self, user_id: &str) -> Result<SenderSnapshot> {
        Ok(self
            .lookup(user_id)
            .await?
            .map(|profile| SenderSnapshot::from(&profile))
            .unwrap_or_else(SenderSnapshot::unknown))
    }

    pub async fn display_name(&self, user_id: &str) -> Result<String> {
        Ok(self.snapshot_for(user_id).await?.name)
    }

    /// Direct chats have no stored name; show the viewer the other side's.
    pub async fn label_for_viewer(&self, viewer: &str, chat: &mut Chat) -> Result<()> {
        if let Some(other) = chat.counterpart(viewer).map(str::to_string) {
            chat.name = self.display_name(&other).await?;
        }
        Ok(())
    }

    pub async fn members<'a>(
        &self,
        user_ids: impl IntoIterator<Item = &'a String>,
    ) -> Result<Vec<Member>> {
        let mut members = Vec::new();
        for user_id in user_ids {
            members.push(Member {
                user_id: user_id.clone(),
                profile: self.lookup(user_id).await?,
            });
        }
        Ok(members)
    }
}
