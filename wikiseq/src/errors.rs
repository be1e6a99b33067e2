use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error as ThisError;

use crate::host::FetchError;
use crate::render::RenderError;

/// Terminal failures for a single diagram request.
///
/// Upload failures are deliberately absent: a failed attachment write is
/// recovered locally by falling back to an inline preview, so it never
/// becomes a response error. See [`crate::attach`].
#[derive(ThisError, Debug)]
pub enum Error {
    /// Host read unreachable, unauthorized, or refused
    #[error("failed to fetch macro body for page {page_id}")]
    Fetch {
        page_id: String,
        #[source]
        source: FetchError,
    },

    /// The stored macro body was not a valid diagram-source document
    #[error("malformed macro body payload for page {page_id}")]
    Parse {
        page_id: String,
        #[source]
        source: serde_json::Error,
    },

    /// Rendering service unreachable or rejected the input
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Invalid request data
    #[error("{message}")]
    BadRequest { message: String },
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Fetch { .. } => StatusCode::BAD_GATEWAY,
            Error::Parse { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Render(render_err) => match render_err {
                RenderError::EmptySource => StatusCode::BAD_REQUEST,
                RenderError::Http(_) | RenderError::Rejected(_) | RenderError::MalformedResponse(_) => StatusCode::BAD_GATEWAY,
            },
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Fetch { .. } => "Could not retrieve the diagram source from the wiki".to_string(),
            Error::Parse { .. } => "The stored diagram body could not be read".to_string(),
            Error::Render(RenderError::EmptySource) => "Diagram source is empty".to_string(),
            Error::Render(RenderError::Rejected(reason)) => format!("The diagram could not be rendered: {reason}"),
            Error::Render(_) => "The diagram could not be rendered".to_string(),
            Error::BadRequest { message } => message.clone(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Fetch { .. } | Error::Parse { .. } => {
                tracing::error!("Diagram request failed: {:?}", self);
            }
            Error::Render(RenderError::Rejected(_)) | Error::Render(RenderError::EmptySource) => {
                tracing::info!("Render rejected diagram input: {}", self);
            }
            Error::Render(_) => {
                tracing::error!("Render service failure: {:?}", self);
            }
            Error::BadRequest { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        (self.status_code(), self.user_message()).into_response()
    }
}

/// Type alias for request handling results
pub type Result<T> = std::result::Result<T, Error>;
