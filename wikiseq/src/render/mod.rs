//! Remote diagram rendering.
//!
//! The render service speaks a two-step protocol: a form POST with the
//! diagram source returns a small JSON envelope naming a relative image URI
//! (or a list of input errors), and a second GET against that URI returns
//! the binary image. Callers see the pair as one logical render call.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::config::RendererConfig;

/// A rendered diagram image, owned by whichever path consumes it next.
#[derive(Debug, Clone)]
pub struct RenderedArtifact {
    pub bytes: Bytes,
    pub content_type: String,
}

/// Failures from the render service. None of these are retried.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("diagram source is empty")]
    EmptySource,

    #[error("render service request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service accepted the call but rejected the diagram source.
    #[error("render service rejected the diagram: {0}")]
    Rejected(String),

    #[error("malformed render service response: {0}")]
    MalformedResponse(String),
}

/// A trait for turning diagram source text into a rendered image.
/// In practice this goes over http to the public render service via
/// `reqwest`; see [`WsdClient`]. The seam exists so the persistence flow can
/// be exercised without a network.
#[async_trait]
pub trait RenderDiagram: Send + Sync {
    async fn render(&self, source: &str) -> Result<RenderedArtifact, RenderError>;
}

/// Envelope returned by the first render call.
///
/// `errors` is populated when the service could not draw the source;
/// `img` is a URI relative to the service root when it could.
#[derive(Debug, Deserialize)]
struct RenderEnvelope {
    #[serde(default)]
    img: Option<String>,
    #[serde(default)]
    errors: Vec<String>,
}

/// The concrete implementation of [`RenderDiagram`].
///
/// Style and output format are fixed per instance by [`RendererConfig`]
/// policy; only the source text varies per call.
pub struct WsdClient {
    client: Client,
    base_url: Url,
    style: String,
    format: String,
}

impl WsdClient {
    pub fn new(config: &RendererConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            base_url: config.url.clone(),
            style: config.style.clone(),
            format: config.format.clone(),
        }
    }
}

#[async_trait]
impl RenderDiagram for WsdClient {
    async fn render(&self, source: &str) -> Result<RenderedArtifact, RenderError> {
        if source.trim().is_empty() {
            return Err(RenderError::EmptySource);
        }

        let form = [
            ("apiVersion", "1"),
            ("style", self.style.as_str()),
            ("format", self.format.as_str()),
            ("message", source),
        ];

        let response = self
            .client
            .post(self.base_url.clone())
            .form(&form)
            .send()
            .await?
            .error_for_status()?;

        let body_text = response.text().await?;
        let envelope: RenderEnvelope = serde_json::from_str(&body_text).map_err(|e| {
            debug!("Render envelope body was: {}", body_text);
            RenderError::MalformedResponse(format!("error decoding render envelope: {e}"))
        })?;

        if !envelope.errors.is_empty() {
            return Err(RenderError::Rejected(envelope.errors.join("; ")));
        }

        let img = envelope.img.ok_or_else(|| {
            RenderError::MalformedResponse("render envelope carried neither an image URI nor errors".to_string())
        })?;

        let image_url = self
            .base_url
            .join(&img)
            .map_err(|e| RenderError::MalformedResponse(format!("invalid image URI {img:?}: {e}")))?;

        debug!("Fetching rendered image from {}", image_url);

        let image = self.client.get(image_url).send().await?.error_for_status()?;
        let content_type = image
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("image/png")
            .to_string();
        let bytes = image.bytes().await?;

        Ok(RenderedArtifact { bytes, content_type })
    }
}
