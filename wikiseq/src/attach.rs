//! Diagram persistence: fetch → parse → render → upload, with preview fallback.
//!
//! ```text
//! attach(request)
//!   ├─ host.fetch_macro_body()     // fetch failure → error response
//!   ├─ parse MacroBody             // malformed body → error response
//!   ├─ renderer.render()           // render failure → error response
//!   └─ host.upload_attachment()
//!        ├─ Accepted               → DiagramView::Attached
//!        └─ Rejected / upload error → DiagramView::Preview
//! ```
//!
//! The first three stages are terminal on failure: with no rendered image
//! there is nothing to show. An upload failure is different — a correctly
//! rendered image already exists, and the host may refuse the write for
//! reasons unrelated to the diagram (permissions, a page that has no
//! attachment target yet, an outage). Those requests fall back to an inline
//! preview served by the add-on's own render endpoint, with the original
//! source url-encoded in the query string; the upload error never reaches
//! the end user.

use std::sync::Arc;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64_STANDARD};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::api::models::diagram::{DiagramRequest, DiagramView, MacroBody};
use crate::config::Config;
use crate::errors::Error;
use crate::fingerprint;
use crate::host::{AttachmentDescriptor, HostContent, UploadOutcome};
use crate::render::RenderDiagram;

/// Sequences one diagram-render attempt from macro lookup to a renderable
/// view. Stateless: both remote clients are shared process-wide.
pub struct DiagramPersistence {
    renderer: Arc<dyn RenderDiagram>,
    host: Arc<dyn HostContent>,
    preview_endpoint: Url,
    log_diagram_bodies: bool,
}

impl DiagramPersistence {
    pub fn new(renderer: Arc<dyn RenderDiagram>, host: Arc<dyn HostContent>, config: &Config) -> anyhow::Result<Self> {
        let mut preview_endpoint = config.public_base_url.clone();
        preview_endpoint
            .path_segments_mut()
            .map_err(|_| anyhow::anyhow!("public_base_url cannot carry a path"))?
            .pop_if_empty()
            .push("preview.png");

        Ok(Self {
            renderer,
            host,
            preview_endpoint,
            log_diagram_bodies: config.log_diagram_bodies,
        })
    }

    /// Run one persistence attempt to completion.
    ///
    /// Returns exactly one outcome: the attached-image view, the preview
    /// fallback view, or (via `Err`) a terminal error for the caller to
    /// render.
    #[instrument(skip_all, fields(page_id = %request.page_id, macro_hash = %request.macro_hash))]
    pub async fn attach(&self, request: &DiagramRequest) -> Result<DiagramView, Error> {
        let raw = self
            .host
            .fetch_macro_body(
                &request.page_id,
                request.page_version,
                &request.macro_hash,
                &request.acting_user_id,
            )
            .await
            .map_err(|source| Error::Fetch {
                page_id: request.page_id.clone(),
                source,
            })?;

        if self.log_diagram_bodies {
            debug!("Fetched macro body: {}", raw);
        }

        let body: MacroBody = serde_json::from_str(&raw).map_err(|source| Error::Parse {
            page_id: request.page_id.clone(),
            source,
        })?;

        let artifact = self.renderer.render(&body.message).await?;

        let descriptor = AttachmentDescriptor {
            file_name: fingerprint::file_name(&body.message),
            page_id: request.page_id.clone(),
            content_type: artifact.content_type.clone(),
        };
        let payload = BASE64_STANDARD.encode(&artifact.bytes);

        match self
            .host
            .upload_attachment(&request.page_id, &descriptor, payload, &request.acting_user_id)
            .await
        {
            Ok(UploadOutcome::Accepted(confirmation)) => {
                debug!(file_name = %descriptor.file_name, "Attachment confirmed by host: {}", confirmation);
                Ok(DiagramView::Attached {
                    file_name: descriptor.file_name,
                })
            }
            Ok(UploadOutcome::Rejected { reason }) => {
                warn!("Host rejected attachment upload, rendering preview instead: {}", reason);
                Ok(self.preview(&body.message))
            }
            Err(e) => {
                warn!("Attachment upload failed, rendering preview instead: {}", e);
                Ok(self.preview(&body.message))
            }
        }
    }

    fn preview(&self, source: &str) -> DiagramView {
        let mut img_url = self.preview_endpoint.clone();
        img_url.query_pairs_mut().append_pair("body", source);
        DiagramView::Preview { img_url }
    }
}
