//! Request and view models for the diagram routes.

use serde::Deserialize;
use url::Url;

/// Identifies exactly one diagram-render attempt.
///
/// Built per inbound request from the macro query parameters plus the
/// acting user forwarded by the host; never persisted.
#[derive(Debug, Clone)]
pub struct DiagramRequest {
    pub page_id: String,
    pub page_version: u32,
    pub macro_hash: String,
    pub acting_user_id: String,
}

/// Query parameters of the `/diagram` route. Names follow the host's macro
/// callback convention.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramParams {
    pub page_id: String,
    pub page_version: u32,
    pub macro_hash: String,
}

/// A macro body resolved from host-stored page history.
///
/// Only the source text travels in the document; rendering style and output
/// format are add-on policy (see [`crate::config::RendererConfig`]).
#[derive(Debug, Deserialize)]
pub struct MacroBody {
    /// Diagram source text
    #[serde(alias = "body")]
    pub message: String,
}

/// What the `/diagram` route renders back to the host.
#[derive(Debug)]
pub enum DiagramView {
    /// The image is now a durable page attachment; embed it by name.
    Attached { file_name: String },
    /// Durable attachment failed; embed an inline preview served by the
    /// add-on itself.
    Preview { img_url: Url },
}

impl DiagramView {
    /// Host-native XHTML fragment embedding the image.
    pub fn into_xhtml(self) -> String {
        match self {
            DiagramView::Attached { file_name } => format!(
                r#"<ac:image><ri:attachment ri:filename="{}" /></ac:image>"#,
                escape_attribute(&file_name)
            ),
            DiagramView::Preview { img_url } => format!(
                r#"<ac:image><ri:url ri:value="{}" /></ac:image>"#,
                escape_attribute(img_url.as_str())
            ),
        }
    }
}

/// Minimal XML attribute escaping for the embed fragments.
fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_macro_body_accepts_message_or_body_field() {
        let from_message: MacroBody = serde_json::from_str(r#"{"message":"a->b: hi"}"#).unwrap();
        assert_eq!(from_message.message, "a->b: hi");

        let from_body: MacroBody = serde_json::from_str(r#"{"body":"a->b: hi"}"#).unwrap();
        assert_eq!(from_body.message, "a->b: hi");

        assert!(serde_json::from_str::<MacroBody>(r#"{"other":1}"#).is_err());
    }

    #[test]
    fn test_attached_view_embeds_attachment_by_name() {
        let view = DiagramView::Attached {
            file_name: "a740d22f1ce7aacdca309949577899a1.png".to_string(),
        };
        assert_eq!(
            view.into_xhtml(),
            r#"<ac:image><ri:attachment ri:filename="a740d22f1ce7aacdca309949577899a1.png" /></ac:image>"#
        );
    }

    #[test]
    fn test_preview_view_escapes_url_for_attribute_position() {
        let view = DiagramView::Preview {
            img_url: Url::parse("http://addon.test/preview.png?body=a-%3Eb&x=1").unwrap(),
        };
        let xhtml = view.into_xhtml();
        assert!(xhtml.contains("ri:url"));
        assert!(xhtml.contains("&amp;x=1"));
    }
}
