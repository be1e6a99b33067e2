//! Host wiki content API client.
//!
//! Two operations against the host platform: reading a macro body out of a
//! page version's history, and uploading a named binary attachment through
//! the host's JSON-RPC service. Both are made on behalf of an acting user,
//! forwarded in a dedicated header so the host authorizes as that user.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::config::HostApiConfig;

/// Failures reading a macro body from the host.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("macro body request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("host returned {status} for macro body request")]
    Status { status: StatusCode },
}

/// Failures writing an attachment to the host. A logical rejection inside a
/// 2xx response body is not an error here — it is an [`UploadOutcome`].
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("attachment upload request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("host returned {status} for attachment upload")]
    Status { status: StatusCode },

    #[error("malformed attachment upload response: {0}")]
    MalformedResponse(#[from] serde_json::Error),
}

/// Proposed name and type for a rendered diagram attachment.
///
/// Serialized field names follow the host upload RPC convention.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentDescriptor {
    pub file_name: String,
    pub page_id: String,
    pub content_type: String,
}

/// Outcome of an upload whose transport call succeeded.
///
/// The host reports logical failure inside a successful response body (an
/// `error` member), so the body decides the outcome — never the transport
/// status alone.
#[derive(Debug)]
pub enum UploadOutcome {
    /// Host confirmed the attachment; the payload is its confirmation
    /// document describing the attached file.
    Accepted(Value),
    /// Host processed the call but refused the attachment.
    Rejected { reason: String },
}

/// A trait for the two host content operations the add-on needs. The
/// concrete implementation is [`RestHostClient`]; the seam lets the
/// persistence flow run against a scripted host in tests.
#[async_trait]
pub trait HostContent: Send + Sync {
    /// Read the raw macro body addressed by page, version, and macro hash.
    /// The returned body is not guaranteed to be valid JSON; callers parse
    /// it defensively.
    async fn fetch_macro_body(
        &self,
        page_id: &str,
        page_version: u32,
        macro_hash: &str,
        acting_user: &str,
    ) -> Result<String, FetchError>;

    /// Upload a base64-encoded image as a named page attachment.
    async fn upload_attachment(
        &self,
        page_id: &str,
        descriptor: &AttachmentDescriptor,
        base64_payload: String,
        acting_user: &str,
    ) -> Result<UploadOutcome, UploadError>;
}

/// Makes sure a url has a trailing slash.
///
/// This fixes a weird idiosyncracy in rusts 'join' method on urls, where joining URLs like
/// '/hello', 'world' gives you '/world', but '/hello/', 'world' gives you '/hello/world'.
/// Basically, call this before calling .join
fn ensure_slash(url: &Url) -> Url {
    if url.path().ends_with('/') {
        url.clone()
    } else {
        let mut new_url = url.clone();
        let mut path = new_url.path().to_string();
        path.push('/');
        new_url.set_path(&path);
        new_url
    }
}

/// Reqwest-backed implementation of [`HostContent`].
pub struct RestHostClient {
    client: Client,
    base_url: Url,
    auth_header_name: String,
    auth_header_prefix: String,
    api_token: Option<String>,
    acting_user_header: String,
}

impl RestHostClient {
    pub fn new(config: &HostApiConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            base_url: config.base_url.clone(),
            auth_header_name: config.auth_header_name.clone(),
            auth_header_prefix: config.auth_header_prefix.clone(),
            api_token: config.api_token.clone(),
            acting_user_header: config.acting_user_header.clone(),
        }
    }

    /// Attach service credentials and the acting-user identity to a request.
    fn authorize(&self, mut request: reqwest::RequestBuilder, acting_user: &str) -> reqwest::RequestBuilder {
        if let Some(token) = &self.api_token {
            request = request.header(&self.auth_header_name, format!("{}{}", self.auth_header_prefix, token));
        }
        request.header(&self.acting_user_header, acting_user)
    }
}

#[async_trait]
impl HostContent for RestHostClient {
    async fn fetch_macro_body(
        &self,
        page_id: &str,
        page_version: u32,
        macro_hash: &str,
        acting_user: &str,
    ) -> Result<String, FetchError> {
        let url = ensure_slash(&self.base_url)
            .join(&format!(
                "rest/api/content/{page_id}/history/{page_version}/macro/hash/{macro_hash}"
            ))
            .expect("macro body path segments are valid");

        debug!("Fetching macro body from {}", url);

        let response = self.authorize(self.client.get(url), acting_user).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status {
                status: response.status(),
            });
        }

        Ok(response.text().await?)
    }

    async fn upload_attachment(
        &self,
        page_id: &str,
        descriptor: &AttachmentDescriptor,
        base64_payload: String,
        acting_user: &str,
    ) -> Result<UploadOutcome, UploadError> {
        let url = ensure_slash(&self.base_url)
            .join("rpc/json-rpc/confluenceservice-v2/addAttachment")
            .expect("upload path is valid");

        // Positional JSON-RPC parameters: page, descriptor, payload.
        let params = serde_json::json!([page_id, descriptor, base64_payload]);

        let response = self
            .authorize(self.client.post(url), acting_user)
            .json(&params)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(UploadError::Status {
                status: response.status(),
            });
        }

        let body: Value = serde_json::from_str(&response.text().await?)?;
        match body.get("error") {
            Some(error) => {
                let reason = error
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| error.to_string());
                Ok(UploadOutcome::Rejected { reason })
            }
            None => Ok(UploadOutcome::Accepted(body)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(uri: &str) -> RestHostClient {
        RestHostClient::new(&HostApiConfig {
            base_url: Url::parse(uri).unwrap(),
            auth_header_name: "Authorization".to_string(),
            auth_header_prefix: "Bearer ".to_string(),
            api_token: Some("s3cr3t".to_string()),
            acting_user_header: "AP-CTX-USER-ID".to_string(),
            timeout: Duration::from_secs(5),
        })
    }

    fn descriptor() -> AttachmentDescriptor {
        AttachmentDescriptor {
            file_name: "a740d22f1ce7aacdca309949577899a1.png".to_string(),
            page_id: "123".to_string(),
            content_type: "image/png".to_string(),
        }
    }

    #[tokio::test]
    async fn test_fetch_macro_body_addresses_history_and_forwards_identity() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/api/content/123/history/4/macro/hash/abc"))
            .and(header("AP-CTX-USER-ID", "u1"))
            .and(header("Authorization", "Bearer s3cr3t"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"message":"a->b: hi"}"#))
            .expect(1)
            .mount(&mock_server)
            .await;

        let raw = client_for(&mock_server.uri())
            .fetch_macro_body("123", 4, "abc", "u1")
            .await
            .unwrap();
        assert_eq!(raw, r#"{"message":"a->b: hi"}"#);
    }

    #[tokio::test]
    async fn test_fetch_macro_body_surfaces_non_success_status() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let err = client_for(&mock_server.uri())
            .fetch_macro_body("123", 4, "missing", "u1")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status { status } if status == StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn test_upload_sends_positional_params_and_accepts_confirmation() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rpc/json-rpc/confluenceservice-v2/addAttachment"))
            .and(header("AP-CTX-USER-ID", "u1"))
            .and(body_partial_json(serde_json::json!([
                "123",
                {
                    "fileName": "a740d22f1ce7aacdca309949577899a1.png",
                    "pageId": "123",
                    "contentType": "image/png"
                },
                "aW1hZ2U="
            ])))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"fileName":"a740d22f1ce7aacdca309949577899a1.png","contentType":"image/png"}"#),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let outcome = client_for(&mock_server.uri())
            .upload_attachment("123", &descriptor(), "aW1hZ2U=".to_string(), "u1")
            .await
            .unwrap();
        match outcome {
            UploadOutcome::Accepted(confirmation) => {
                assert_eq!(
                    confirmation.get("fileName").and_then(Value::as_str),
                    Some("a740d22f1ce7aacdca309949577899a1.png")
                );
            }
            UploadOutcome::Rejected { reason } => panic!("expected acceptance, got rejection: {reason}"),
        }
    }

    #[tokio::test]
    async fn test_error_bearing_success_body_is_a_rejection() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"error":{"message":"no attachment permission","code":403}}"#),
            )
            .mount(&mock_server)
            .await;

        let outcome = client_for(&mock_server.uri())
            .upload_attachment("123", &descriptor(), "aW1hZ2U=".to_string(), "u1")
            .await
            .unwrap();
        assert!(matches!(outcome, UploadOutcome::Rejected { ref reason } if reason.contains("no attachment permission")));
    }

    #[tokio::test]
    async fn test_upload_transport_failure_is_an_error() {
        // Point to a port that's not listening
        let err = client_for("http://127.0.0.1:1")
            .upload_attachment("123", &descriptor(), "aW1hZ2U=".to_string(), "u1")
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Http(_)));
    }

    #[tokio::test]
    async fn test_upload_non_success_status_is_an_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let err = client_for(&mock_server.uri())
            .upload_attachment("123", &descriptor(), "aW1hZ2U=".to_string(), "u1")
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Status { status } if status == StatusCode::INTERNAL_SERVER_ERROR));
    }
}
