//! Shared fixtures for unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::bus::EventBus;
use crate::directory::ParticipantDirectory;
use crate::entity::{Account, AccountOrigin};
use crate::error::Result;
use crate::repository::ChatRepository;
use crate::store::Store;
use crate::upload::{ObjectUploader, UploadFile, UploadedObject};

pub struct TestDeps {
    pub repo: Arc<dyn ChatRepository>,
    pub directory: Arc<ParticipantDirectory>,
    pub bus: Arc<EventBus>,
}

/// In-memory store seeded with u1 (staff), u2..u3 (learners) and u4 (intern).
pub async fn deps() -> TestDeps {
    let store = Store::in_memory().await.unwrap();
    let accounts = [
        ("u1", "Ada", AccountOrigin::Staff),
        ("u2", "Ben", AccountOrigin::Learner),
        ("u3", "Cleo", AccountOrigin::Learner),
        ("u4", "Dev", AccountOrigin::Intern),
    ];
    for (id, name, origin) in accounts {
        store
            .upsert_account(
                origin,
                &Account {
                    id: id.to_string(),
                    display_name: name.to_string(),
                    photo: None,
                },
            )
            .await
            .unwrap();
    }

    TestDeps {
        repo: Arc::new(store.clone()),
        directory: Arc::new(ParticipantDirectory::from_store(&store)),
        bus: Arc::new(EventBus::new()),
    }
}

/// Records uploads and hands back a deterministic URL.
#[derive(Default)]
pub struct FakeUploader {
    pub uploads: Mutex<Vec<String>>,
}

#[async_trait]
impl ObjectUploader for FakeUploader {
    async fn upload(&self, file: UploadFile) -> Result<UploadedObject> {
        self.uploads.lock().unwrap().push(file.file_name.clone());
        Ok(UploadedObject {
            url: format!("https://cdn.test/{}", file.file_name),
            public_id: format!("photos/{}", file.file_name),
        })
    }
}
