//! services/ingest/src/adapters/http_backend.rs
//!
//! This module contains the adapter for the backend's upload API and the
//! object-storage write that follows a presigned credential. It implements the
//! `UploadBackend` port from the `core` crate.

use async_trait::async_trait;
use bytes::Bytes;
use content_ingest_core::{
    domain::{AssetDescriptor, UploadFile},
    ports::{CredentialRequest, PortError, PortResult, UploadBackend, UploadCredential},
};
use reqwest::{header::CONTENT_TYPE, multipart, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::protocol::ApiEnvelope;
use crate::config::Config;

//=========================================================================================
// Shared Backend Client
//=========================================================================================

/// One HTTP client plus the backend's base URL and credentials. Cloning is
/// cheap; every adapter built from the same config shares the connection pool.
#[derive(Clone, Debug)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl BackendClient {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        auth_token: Option<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth_token,
        }
    }

    /// Builds the client from the loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder().use_rustls_tls();
        if let Some(timeout) = config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        Ok(Self::new(builder.build()?, config.backend_url.clone(), config.auth_token.clone()))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// A request to a backend path, with the bearer token attached when configured.
    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, format!("{}{}", self.base_url, path));
        match &self.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Sends a backend request and unwraps the `{success, data}` envelope.
    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> PortResult<T> {
        let response = request.send().await.map_err(unreachable)?;
        let response = check_status(response).await?;
        let envelope: ApiEnvelope<T> = response
            .json()
            .await
            .map_err(|e| PortError::Malformed(e.to_string()))?;
        envelope.into_data()
    }
}

fn unreachable(e: reqwest::Error) -> PortError {
    PortError::Unreachable(e.to_string())
}

/// Maps a non-success status onto the port taxonomy.
async fn check_status(response: Response) -> PortResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    warn!(%status, %url, "Backend request failed: {}", body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(PortError::Unauthorized),
        StatusCode::NOT_FOUND => Err(PortError::NotFound(url)),
        _ => Err(PortError::Rejected(format!("HTTP {}", status))),
    }
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `UploadBackend` port over HTTP.
#[derive(Clone, Debug)]
pub struct HttpUploadBackend {
    client: BackendClient,
}

impl HttpUploadBackend {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }
}

/// The multipart `file` field, falling back to a generic type when the
/// declared content type is not a valid MIME string.
fn file_part(file: &UploadFile) -> PortResult<multipart::Part> {
    let part = || multipart::Part::bytes(file.body().to_vec()).file_name(file.name().to_string());
    part()
        .mime_str(file.content_type())
        .or_else(|_| part().mime_str("application/octet-stream"))
        .map_err(|e| PortError::Malformed(e.to_string()))
}

//=========================================================================================
// `UploadBackend` Trait Implementation
//=========================================================================================

#[async_trait]
impl UploadBackend for HttpUploadBackend {
    async fn request_credential(
        &self,
        request: &CredentialRequest,
    ) -> PortResult<UploadCredential> {
        debug!(file = %request.filename, folder = %request.folder, "Requesting presigned upload.");
        let builder = self
            .client
            .request(Method::POST, "/upload/presigned-upload")
            .json(request);
        self.client.send_json(builder).await
    }

    /// The presigned URL carries its own authorization, so no bearer token is sent.
    async fn write_to_storage(
        &self,
        upload_url: &str,
        content_type: &str,
        body: Bytes,
    ) -> PortResult<()> {
        let response = self
            .client
            .http
            .put(upload_url)
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await
            .map_err(unreachable)?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "Storage write refused.");
            return Err(PortError::Rejected(format!("storage responded with HTTP {}", status)));
        }
        Ok(())
    }

    async fn upload_through_backend(
        &self,
        file: &UploadFile,
        folder: &str,
    ) -> PortResult<AssetDescriptor> {
        let form = multipart::Form::new()
            .part("file", file_part(file)?)
            .text("folder", folder.to_string());
        let builder = self.client.request(Method::POST, "/upload").multipart(form);
        self.client.send_json(builder).await
    }
}
