//! Handler for the authenticated diagram-macro route.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::Html,
};

use crate::AppState;
use crate::api::models::diagram::{DiagramParams, DiagramRequest};
use crate::errors::{Error, Result};

/// Render the macro addressed by page, version, and macro hash: persist the
/// diagram as a page attachment when the host allows it, otherwise fall
/// back to an inline preview. The host forwards the acting user's identity
/// in a header so reads and writes are authorized as that user.
#[tracing::instrument(skip_all, fields(page_id = %params.page_id))]
pub async fn render_diagram(
    State(state): State<AppState>,
    Query(params): Query<DiagramParams>,
    headers: HeaderMap,
) -> Result<Html<String>> {
    if params.page_version == 0 {
        return Err(Error::BadRequest {
            message: "pageVersion must be a positive integer".to_string(),
        });
    }

    let acting_user_header = state.config.host_api.acting_user_header.as_str();
    let acting_user = headers
        .get(acting_user_header)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    if acting_user.is_empty() {
        return Err(Error::BadRequest {
            message: format!("missing acting user header {acting_user_header}"),
        });
    }

    let request = DiagramRequest {
        page_id: params.page_id,
        page_version: params.page_version,
        macro_hash: params.macro_hash,
        acting_user_id: acting_user,
    };

    let view = state.persistence.attach(&request).await?;
    Ok(Html(view.into_xhtml()))
}
