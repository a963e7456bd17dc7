//! # AI gateway
//!
//! Turns instruction text plus study material into exactly one `generateContent`
//! request and the response into either text or a decoded structured value.
//!
//! Part order is fixed: image (if any), labeled study text (if any), instructions
//! last. Nothing is cached and no conversation history is kept between calls; every
//! call re-supplies the material it needs.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::GatewayError;
use crate::gemini::{GenerateContentRequest, GenerateContentResponse, GenerationConfig, Part, Transport};
use crate::models::StudyContent;
use crate::prompt::STUDY_TEXT_LABEL;

static CODE_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^```(\w*)?\s*\n?(.*?)\n?\s*```$").expect("valid code fence regex")
});

/// Assembles request parts in the fixed order.
pub fn build_content(instructions: &str, material: Option<&StudyContent>) -> Vec<Part> {
    let mut parts = Vec::with_capacity(3);
    if let Some(material) = material {
        if let Some(image) = material.image.as_ref().filter(|_| material.has_image()) {
            parts.push(Part::image(image));
        }
        if material.has_text() {
            parts.push(Part::text(format!("{STUDY_TEXT_LABEL}\n{}", material.text)));
        }
    }
    parts.push(Part::text(instructions));
    parts
}

/// Removes a surrounding Markdown code fence, if any.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    match CODE_FENCE.captures(trimmed).and_then(|c| c.get(2)) {
        Some(inner) => inner.as_str().trim(),
        None => trimmed,
    }
}

/// Decodes JSON, possibly fenced. `None` when the text is not a valid `T`.
pub fn parse_json_from_text<T: DeserializeOwned>(text: &str) -> Option<T> {
    match serde_json::from_str(strip_code_fence(text)) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!("Failed to decode structured response: {}", err);
            None
        }
    }
}

/// Maps a response to its text, or to the reason there is none.
fn extract_text(response: GenerateContentResponse) -> Result<String, GatewayError> {
    if let Some(text) = response.text().filter(|t| !t.trim().is_empty()) {
        return Ok(text);
    }

    match response.finish_reason() {
        Some("MAX_TOKENS") => Err(GatewayError::Truncated),
        Some("SAFETY") => Err(GatewayError::SafetyFiltered),
        Some("RECITATION") => Err(GatewayError::RecitationFiltered),
        Some(reason) if reason != "STOP" && reason != "FINISH_REASON_UNSPECIFIED" => {
            Err(GatewayError::Blocked(reason.to_string()))
        }
        _ if response.block_reason().is_some() => Err(GatewayError::SafetyFiltered),
        _ => Err(GatewayError::Empty),
    }
}

/// Stateless request/response wrapper around a [`Transport`].
pub struct Gateway<T: Transport> {
    transport: T,
}

impl<T: Transport> Gateway<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Free-text generation.
    pub async fn text(&self, parts: Vec<Part>) -> Result<String, GatewayError> {
        let request = GenerateContentRequest::new(parts, None);
        let response = self.transport.generate(&request).await?;
        let text = extract_text(response)?;
        debug!("Text response: {} chars", text.chars().count());
        Ok(text)
    }

    /// Schema-constrained generation.
    ///
    /// # Returns
    /// - `Ok(Some(value))`: the response decoded as `D`.
    /// - `Ok(None)`: the service answered but the payload did not decode.
    /// - `Err(_)`: transport failure or no usable text.
    pub async fn structured<D: DeserializeOwned>(
        &self,
        parts: Vec<Part>,
        schema: Value,
    ) -> Result<Option<D>, GatewayError> {
        let request = GenerateContentRequest::new(parts, Some(GenerationConfig::json(schema)));
        let response = self.transport.generate(&request).await?;
        let text = extract_text(response)?;
        Ok(parse_json_from_text(&text))
    }
}
