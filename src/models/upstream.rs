use base64::Engine;
use serde::{Deserialize, Serialize};

/// Chat-completions style request sent to the generation API.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: Vec<ContentPart>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

impl GenerationRequest {
    /// Build a single user message carrying the prompt and the image as a
    /// base64 JPEG data URI.
    pub fn new(model: &str, prompt: &str, image_bytes: &[u8], max_tokens: u32) -> Self {
        let encoded = base64::engine::general_purpose::STANDARD.encode(image_bytes);
        Self {
            model: model.to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: vec![
                    ContentPart::Text {
                        text: prompt.to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: format!("data:image/jpeg;base64,{encoded}"),
                        },
                    },
                ],
            }],
            max_tokens,
        }
    }

    /// Prompt text of the first message, for logging.
    pub fn prompt(&self) -> &str {
        self.messages
            .first()
            .and_then(|m| {
                m.content.iter().find_map(|part| match part {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::ImageUrl { .. } => None,
                })
            })
            .unwrap_or_default()
    }

    /// Total length of the inline image URIs, for logging.
    pub fn image_payload_len(&self) -> usize {
        self.messages
            .iter()
            .flat_map(|m| m.content.iter())
            .map(|part| match part {
                ContentPart::ImageUrl { image_url } => image_url.url.len(),
                ContentPart::Text { .. } => 0,
            })
            .sum()
    }
}

/// The subset of the upstream response the extractor reads.
///
/// Every level is optional so a sparse payload still deserializes and the
/// extractor can report what is missing.
#[derive(Debug, Default, Deserialize)]
pub struct GenerationResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}
