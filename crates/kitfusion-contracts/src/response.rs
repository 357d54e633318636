use serde_json::Value;

use crate::errors::GenerationFailure;
use crate::media::{ImagePayload, RESULT_IMAGE_MIME};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponsePart {
    Image(ImagePayload),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Candidate {
    pub parts: Vec<ResponsePart>,
}

/// Candidates in service order, each with its parts in service order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GenerationResponse {
    pub candidates: Vec<Candidate>,
}

impl GenerationResponse {
    pub fn from_candidates(candidates: Vec<Vec<ResponsePart>>) -> Self {
        Self {
            candidates: candidates
                .into_iter()
                .map(|parts| Candidate { parts })
                .collect(),
        }
    }

    /// Reads a `generateContent` payload. Missing or malformed sections read
    /// as empty rather than failing; the extraction step decides what that
    /// means.
    pub fn from_value(payload: &Value) -> Self {
        let candidates = payload
            .get("candidates")
            .and_then(Value::as_array)
            .map(|rows| rows.iter().map(candidate_from_value).collect())
            .unwrap_or_default();
        Self { candidates }
    }

    pub fn part_count(&self) -> usize {
        self.candidates
            .iter()
            .map(|candidate| candidate.parts.len())
            .sum()
    }

    fn parts(&self) -> impl Iterator<Item = &ResponsePart> {
        self.candidates
            .iter()
            .flat_map(|candidate| candidate.parts.iter())
    }
}

fn candidate_from_value(candidate: &Value) -> Candidate {
    let mut parts = Vec::new();
    let rows = candidate
        .get("content")
        .and_then(Value::as_object)
        .and_then(|content| content.get("parts"))
        .and_then(Value::as_array);
    for part in rows.into_iter().flatten() {
        let inline = part
            .get("inlineData")
            .or_else(|| part.get("inline_data"))
            .and_then(Value::as_object);
        if let Some(inline) = inline {
            let data = inline
                .get("data")
                .and_then(Value::as_str)
                .unwrap_or_default();
            if !data.is_empty() {
                let mime = inline
                    .get("mimeType")
                    .or_else(|| inline.get("mime_type"))
                    .and_then(Value::as_str)
                    .unwrap_or(RESULT_IMAGE_MIME);
                parts.push(ResponsePart::Image(ImagePayload::new(data, mime)));
            }
        }
        if let Some(text) = part.get("text").and_then(Value::as_str) {
            if !text.is_empty() {
                parts.push(ResponsePart::Text(text.to_string()));
            }
        }
    }
    Candidate { parts }
}

/// First image across all candidates wins, re-tagged as PNG. Without any
/// image the collected text becomes the refusal reason.
pub fn extract_result(response: &GenerationResponse) -> Result<ImagePayload, GenerationFailure> {
    let mut fragments: Vec<&str> = Vec::new();
    for part in response.parts() {
        match part {
            ResponsePart::Image(image) => return Ok(image.retagged(RESULT_IMAGE_MIME)),
            ResponsePart::Text(text) => fragments.push(text),
        }
    }
    Err(GenerationFailure::refusal(join_text_fragments(&fragments)))
}

/// Joins fragments with a single space unless a boundary already carries
/// whitespace.
pub fn join_text_fragments(fragments: &[&str]) -> String {
    let mut out = String::new();
    for fragment in fragments {
        if fragment.is_empty() {
            continue;
        }
        let boundary_has_space = out.is_empty()
            || out.ends_with(char::is_whitespace)
            || fragment.starts_with(char::is_whitespace);
        if !boundary_has_space {
            out.push(' ');
        }
        out.push_str(fragment);
    }
    out.trim().to_string()
}
