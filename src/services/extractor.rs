use tracing::debug;

use crate::models::upstream::GenerationResponse;

/// Locate the generated image reference in a raw upstream response body.
///
/// Only the first choice is read. Its content is scanned bottom-up for a
/// markdown image line (`![alt](url)`), so when the model narrates several
/// steps the final image wins.
pub fn extract_image_reference(raw: &str) -> Result<String, ExtractError> {
    let response: GenerationResponse = serde_json::from_str(raw)?;

    let choice = response.choices.first().ok_or_else(|| {
        debug!("No choices in upstream response");
        ExtractError::NoImageInResponse
    })?;

    let content = choice
        .message
        .as_ref()
        .and_then(|m| m.content.as_deref())
        .ok_or_else(|| {
            debug!("No message content in first choice");
            ExtractError::NoImageInResponse
        })?;

    content
        .lines()
        .rev()
        .find_map(markdown_image_url)
        .map(str::to_string)
        .ok_or(ExtractError::NoImageInResponse)
}

/// URL of a `![alt](url)` line, if `line` is one and the URL is non-empty.
fn markdown_image_url(line: &str) -> Option<&str> {
    let line = line.trim_start();
    if !line.starts_with("![") {
        return None;
    }
    let (_, rest) = line.split_once("](")?;
    let (url, _) = rest.split_once(')')?;
    let url = url.trim();
    (!url.is_empty()).then_some(url)
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("no image in upstream response")]
    NoImageInResponse,

    #[error("upstream response is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}
