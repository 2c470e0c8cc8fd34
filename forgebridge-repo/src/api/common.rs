//! Helpers shared by both forge adapters: truncation, encoding, paging, the
//! default-branch fallback guard and the directory ordering.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use forgebridge_core::{ErrorContext, ForgeError, ForgeResult};
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;

/// Issue bodies, merge request descriptions
pub const DESCRIPTION_LIMIT: usize = 500;
pub const DESCRIPTION_MARKER: &str = "...";

/// Decoded file content
pub const CONTENT_LIMIT: usize = 8000;

pub const DEFAULT_PER_PAGE: i64 = 30;
pub const MAX_PER_PAGE: i64 = 100;

/// The only branch name that triggers a retry against the repository's default branch
pub const FALLBACK_TRIGGER_BRANCH: &str = "main";

/// Assumed default branch when the metadata response does not declare one
pub const ASSUMED_DEFAULT_BRANCH: &str = "master";

/// Cut `text` to `limit` characters and append `...` when it was longer.
pub fn truncate_description(text: &str) -> String {
    match text.char_indices().nth(DESCRIPTION_LIMIT) {
        Some((cut, _)) => format!("{}{}", &text[..cut], DESCRIPTION_MARKER),
        None => text.to_string(),
    }
}

pub fn truncate_optional_description(text: Option<String>) -> Option<String> {
    text.map(|t| truncate_description(&t))
}

/// Cut file content to [`CONTENT_LIMIT`] characters, noting the full length.
pub fn truncate_content(text: String) -> String {
    match text.char_indices().nth(CONTENT_LIMIT) {
        Some((cut, _)) => {
            let total = text.chars().count();
            format!("{}{}", &text[..cut], content_marker(total))
        }
        None => text,
    }
}

pub fn content_marker(total: usize) -> String {
    format!(
        "\n\n... (file truncated, showing first {} characters of {} total)",
        CONTENT_LIMIT, total
    )
}

/// Page size clamped to `[1, MAX_PER_PAGE]`
pub fn clamp_per_page(per_page: Option<i64>) -> u32 {
    per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE) as u32
}

/// Percent-encode a value as a single path segment (`/` included)
pub fn encode_segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Percent-encode each segment of a slash separated path, keeping the slashes
pub fn encode_path(path: &str) -> String {
    path.trim_matches('/')
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Decode a forge base64 payload into text. Whitespace (forges wrap at 60/76 columns) is
/// ignored. Fails when the payload is not base64 or the bytes are not UTF-8.
pub fn decode_base64_text(content: &str, component: &str) -> ForgeResult<String> {
    let cleaned: String = content.chars().filter(|c| !c.is_whitespace()).collect();

    let bytes = BASE64.decode(cleaned).map_err(|e| ForgeError::Decode {
        message: format!("Failed to decode base64 content: {}", e),
        source: Some(Box::new(e)),
        context: ErrorContext::new(component).with_operation("decode_base64_text"),
    })?;

    String::from_utf8(bytes).map_err(|e| ForgeError::Decode {
        message: format!("Content is not valid UTF-8: {}", e),
        source: Some(Box::new(e)),
        context: ErrorContext::new(component).with_operation("decode_base64_text"),
    })
}

/// Whether a not-found on `requested_branch` may be retried against the default branch
pub fn fallback_applies(requested_branch: &str) -> bool {
    requested_branch == FALLBACK_TRIGGER_BRANCH
}

/// The branch to retry on, given the default branch declared by the repository metadata.
/// `None` when the default branch is the one that already failed.
pub fn fallback_branch(declared_default: Option<&str>) -> Option<String> {
    let default = declared_default.unwrap_or(ASSUMED_DEFAULT_BRANCH);
    (default != FALLBACK_TRIGGER_BRANCH).then(|| default.to_string())
}

/// The branch to retry on, read from repository metadata. An absent `default_branch`
/// means [`ASSUMED_DEFAULT_BRANCH`]; an explicit null (an empty repository) means no retry.
pub fn fallback_from_metadata(metadata: &Value) -> Option<String> {
    match metadata.get("default_branch") {
        None => fallback_branch(None),
        Some(Value::String(declared)) => fallback_branch(Some(declared)),
        Some(_) => None,
    }
}

/// Rendered form of an empty path
pub fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "/"
    } else {
        path
    }
}

/// A directory listing entry that can be ordered for display
pub trait DirectoryItem {
    fn name(&self) -> &str;
    fn path(&self) -> &str;
    fn is_directory(&self) -> bool;
}

/// Directories first, then case-insensitive name, then exact name and path so that only
/// identical entries compare equal.
pub fn compare_entries<T: DirectoryItem>(a: &T, b: &T) -> Ordering {
    b.is_directory()
        .cmp(&a.is_directory())
        .then_with(|| a.name().to_lowercase().cmp(&b.name().to_lowercase()))
        .then_with(|| a.name().cmp(b.name()))
        .then_with(|| a.path().cmp(b.path()))
}

pub fn sort_entries<T: DirectoryItem>(entries: &mut [T]) {
    entries.sort_by(compare_entries);
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    error: String,
}

/// Serialize an envelope as indented JSON text
pub fn render<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| {
        render_error_object(format!("Failed to serialize response: {}", e))
    })
}

/// `{"error": "..."}`
pub fn render_error_object(message: String) -> String {
    serde_json::to_string_pretty(&ErrorEnvelope { error: message })
        .unwrap_or_else(|_| String::from("{\"error\": \"unrenderable error\"}"))
}

/// Error envelope of a listing tool: `{"error": "<action> failed: <detail>"}`.
/// An owner that resolves to nothing is reported by itself.
pub fn listing_error(action: &str, error: &ForgeError) -> String {
    error.log();
    match error {
        ForgeError::Resolution { .. } => render_error_object(error.to_string()),
        _ => render_error_object(format!("{} failed: {}", action, error)),
    }
}

/// Plain-text error of a single-object tool: `Error <action>: <detail>`
pub fn plain_error(action: &str, error: &ForgeError) -> String {
    error.log();
    format!("Error {}: {}", action, error)
}
