//! Object storage for group photos. The engine never looks at file bytes.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::info;

use crate::error::{ChatError, Result};

#[derive(Debug, Clone)]
pub struct UploadFile {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadedObject {
    pub url: String,
    pub public_id: String,
}

#[async_trait]
pub trait ObjectUploader: Send + Sync {
    async fn upload(&self, file: UploadFile) -> Result<UploadedObject>;
}

/// Posts the raw bytes to an upload endpoint that answers `{url, public_id}`.
pub struct HttpUploader {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl HttpUploader {
    pub fn new(endpoint: impl Into<String>, token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            token,
        })
    }
}

#[async_trait]
impl ObjectUploader for HttpUploader {
    async fn upload(&self, file: UploadFile) -> Result<UploadedObject> {
        info!(file_name = %file.file_name, size = file.bytes.len(), "Uploading object");

        let mut request = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, file.content_type)
            .header("X-File-Name", file.file_name)
            .body(file.bytes);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let object = request
            .send()
            .await?
            .error_for_status()?
            .json::<UploadedObject>()
            .await?;

        Ok(object)
    }
}

/// Used when no upload endpoint is configured.
pub struct DisabledUploader;

#[async_trait]
impl ObjectUploader for DisabledUploader {
    async fn upload(&self, _file: UploadFile) -> Result<UploadedObject> {
        Err(ChatError::Unavailable(
            "no upload endpoint configured".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_uploader_reports_unavailable() {
        let err = DisabledUploader
            .upload(UploadFile {
                bytes: vec![1, 2, 3],
                content_type: "image/png".into(),
                file_name: "team.png".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Unavailable(_)));
    }
}
