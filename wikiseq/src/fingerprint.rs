//! Content-addressed attachment names.
//!
//! The attachment file name is derived from the diagram source alone, so
//! re-rendering identical source for the same page always proposes the same
//! name. Distinct sources only collide if md5 collides.

/// Fixed extension for rendered diagram attachments.
const ATTACHMENT_EXTENSION: &str = ".png";

/// Derive the attachment file name for a diagram source.
///
/// Pure function of the exact source bytes: md5 hex digest plus the fixed
/// image extension. Any input is valid, including the empty string.
pub fn file_name(source: &str) -> String {
    format!("{:x}{ATTACHMENT_EXTENSION}", md5::compute(source.as_bytes()))
}
