//! HTTP client for the remote "new replay" endpoint.

use async_trait::async_trait;
use tracing::debug;

use streamvault_core::{
    AckResponse, AcknowledgeClient, AcknowledgeRequest, AckTransportError, RemoteConfig,
};

/// Posts the acknowledgment form and returns the remote's raw status.
///
/// No status interpretation happens here; the pipeline owns the retry-code
/// semantics. Only a transport-level failure (connect, TLS, timeout) maps to
/// an error.
pub struct HttpAcknowledgeClient {
    client: reqwest::Client,
    config: RemoteConfig,
}

impl HttpAcknowledgeClient {
    pub fn new(config: RemoteConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

/// Form fields for one acknowledgment.
fn ack_form(request: &AcknowledgeRequest, secret: &str) -> Vec<(&'static str, String)> {
    vec![
        ("file_name", request.file_name.clone()),
        ("channel_id", request.source.as_str().to_string()),
        ("sha256", request.content_hash.as_str().to_string()),
        ("secret", secret.to_string()),
    ]
}

#[async_trait]
impl AcknowledgeClient for HttpAcknowledgeClient {
    async fn acknowledge(
        &self,
        request: &AcknowledgeRequest,
    ) -> Result<AckResponse, AckTransportError> {
        let response = self
            .client
            .post(&self.config.acknowledge_url)
            .form(&ack_form(request, &self.config.shared_secret))
            .send()
            .await
            .map_err(|e| AckTransportError(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response.text().await.ok().filter(|b| !b.is_empty());

        debug!(
            file = %request.file_name,
            status = status,
            "acknowledge response received"
        );
        Ok(AckResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamvault_core::{ContentDigest, SourceIdentity};

    #[test]
    fn form_carries_identity_name_and_hash() {
        let request = AcknowledgeRequest {
            file_name: "chan_odysee_1.flv".to_string(),
            source: SourceIdentity::new("chan"),
            content_hash: ContentDigest::from_bytes(b"replay"),
        };

        let form = ack_form(&request, "s3cret");
        let get = |key: &str| {
            form.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.as_str())
                .unwrap()
        };

        assert_eq!(get("file_name"), "chan_odysee_1.flv");
        assert_eq!(get("channel_id"), "chan");
        assert_eq!(get("sha256"), ContentDigest::from_bytes(b"replay").as_str());
        assert_eq!(get("secret"), "s3cret");
    }
}
