//! A recording in-memory backend for exercising the upload strategies.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Mutex;

use crate::domain::{AssetDescriptor, UploadFile};
use crate::ports::{CredentialRequest, PortError, PortResult, UploadBackend, UploadCredential};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Credential(CredentialRequest),
    Storage { upload_url: String, content_type: String, len: usize },
    Proxied { file_name: String, folder: String },
}

pub struct FakeBackend {
    pub calls: Mutex<Vec<Call>>,
    pub credential: Mutex<PortResult<UploadCredential>>,
    pub storage: Mutex<PortResult<()>>,
    pub proxied: Mutex<PortResult<AssetDescriptor>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            credential: Mutex::new(Ok(UploadCredential {
                upload_url: "https://store/x".to_string(),
                url: "https://cdn/x".to_string(),
                file_id: "abc".to_string(),
            })),
            storage: Mutex::new(Ok(())),
            proxied: Mutex::new(Ok(AssetDescriptor::new("https://cdn/p", "p1", "small.pdf"))),
        }
    }

    pub fn failing_credential(self, err: PortError) -> Self {
        *self.credential.lock().unwrap() = Err(err);
        self
    }

    pub fn failing_storage(self, err: PortError) -> Self {
        *self.storage.lock().unwrap() = Err(err);
        self
    }

    pub fn failing_proxied(self, err: PortError) -> Self {
        *self.proxied.lock().unwrap() = Err(err);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl UploadBackend for FakeBackend {
    async fn request_credential(
        &self,
        request: &CredentialRequest,
    ) -> PortResult<UploadCredential> {
        self.calls.lock().unwrap().push(Call::Credential(request.clone()));
        self.credential.lock().unwrap().clone()
    }

    async fn write_to_storage(
        &self,
        upload_url: &str,
        content_type: &str,
        body: Bytes,
    ) -> PortResult<()> {
        self.calls.lock().unwrap().push(Call::Storage {
            upload_url: upload_url.to_string(),
            content_type: content_type.to_string(),
            len: body.len(),
        });
        self.storage.lock().unwrap().clone()
    }

    async fn upload_through_backend(
        &self,
        file: &UploadFile,
        folder: &str,
    ) -> PortResult<AssetDescriptor> {
        self.calls.lock().unwrap().push(Call::Proxied {
            file_name: file.name().to_string(),
            folder: folder.to_string(),
        });
        self.proxied.lock().unwrap().clone()
    }
}
