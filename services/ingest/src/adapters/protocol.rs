//! services/ingest/src/adapters/protocol.rs
//!
//! Defines the JSON envelope the backend API wraps every answer in.

use content_ingest_core::ports::{PortError, PortResult};
use serde::Deserialize;

//=========================================================================================
// Messages Received FROM the Backend
//=========================================================================================

/// `{ "success": bool, "data": T, "message": "..." }`
///
/// A missing `success` counts as `false`.
#[derive(Deserialize, Debug)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

impl<T> ApiEnvelope<T> {
    /// Unwraps the payload. `success: false` is a refusal; a successful
    /// answer without `data` is malformed.
    pub fn into_data(self) -> PortResult<T> {
        if !self.success {
            return Err(PortError::Rejected(
                self.message.unwrap_or_else(|| "backend reported success: false".to_string()),
            ));
        }
        self.data
            .ok_or_else(|| PortError::Malformed("response has no data".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use content_ingest_core::ports::UploadCredential;

    #[test]
    fn successful_envelope_yields_its_data() {
        let envelope: ApiEnvelope<UploadCredential> = serde_json::from_str(concat!(
            r#"{"success":true,"#,
            r#""data":{"uploadUrl":"https://s/x","url":"https://cdn/x","fileId":"abc"}}"#,
        ))
        .unwrap();
        let credential = envelope.into_data().unwrap();
        assert_eq!(credential.file_id, "abc");
        assert_eq!(credential.upload_url, "https://s/x");
    }

    #[test]
    fn refusal_carries_the_backend_message() {
        let envelope: ApiEnvelope<UploadCredential> =
            serde_json::from_str(r#"{"success":false,"message":"quota exceeded"}"#).unwrap();
        assert_eq!(envelope.into_data(), Err(PortError::Rejected("quota exceeded".into())));
    }

    #[test]
    fn missing_success_or_data_is_not_accepted() {
        let no_flag: ApiEnvelope<UploadCredential> = serde_json::from_str(
            r#"{"data":{"uploadUrl":"u","url":"v","fileId":"w"}}"#,
        )
        .unwrap();
        assert!(matches!(no_flag.into_data(), Err(PortError::Rejected(_))));

        let no_data: ApiEnvelope<UploadCredential> =
            serde_json::from_str(r#"{"success":true}"#).unwrap();
        assert!(matches!(no_data.into_data(), Err(PortError::Malformed(_))));
    }
}
