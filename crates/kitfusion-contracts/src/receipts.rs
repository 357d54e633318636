use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

use crate::errors::GenerationFailure;
use crate::media::ImagePayload;

pub const RECEIPT_SCHEMA_VERSION: u64 = 1;

/// What was asked for, without the image bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionRequestRecord {
    pub instruction: String,
    pub shot: String,
    pub scene: String,
    pub person_mime: String,
    pub garment_mime: String,
    pub client: String,
    pub model: Option<String>,
}

pub fn build_receipt(
    request: &FusionRequestRecord,
    provider_request: &Map<String, Value>,
    provider_response: &Map<String, Value>,
    outcome: &Result<ImagePayload, GenerationFailure>,
    latency_s: f64,
    receipt_path: &Path,
) -> Value {
    let mut root = Map::new();
    root.insert(
        "schema_version".to_string(),
        Value::Number(RECEIPT_SCHEMA_VERSION.into()),
    );
    root.insert(
        "request".to_string(),
        sanitize_payload(&serde_json::to_value(request).unwrap_or(Value::Null)),
    );
    root.insert(
        "instruction_sha256".to_string(),
        Value::String(instruction_digest(&request.instruction)),
    );
    root.insert(
        "provider_request".to_string(),
        sanitize_payload(&Value::Object(provider_request.clone())),
    );
    root.insert(
        "provider_response".to_string(),
        sanitize_payload(&Value::Object(provider_response.clone())),
    );
    let outcome_value = match outcome {
        Ok(image) => json!({
            "status": "succeeded",
            "mime": image.mime(),
            "bytes": image.approx_bytes(),
        }),
        Err(failure) => json!({
            "status": "failed",
            "kind": failure.kind(),
            "message": failure.message(),
        }),
    };
    root.insert("outcome".to_string(), outcome_value);
    root.insert("latency_s".to_string(), json!(latency_s));
    root.insert(
        "receipt_path".to_string(),
        Value::String(receipt_path.to_string_lossy().to_string()),
    );
    Value::Object(root)
}

pub fn write_receipt(path: &Path, payload: &Value) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(payload)?)?;
    Ok(())
}

pub fn instruction_digest(instruction: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(instruction.as_bytes());
    hex::encode(hasher.finalize())
}

fn sanitize_payload(value: &Value) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::Bool(_) | Value::Number(_) | Value::String(_) => value.clone(),
        Value::Array(rows) => Value::Array(rows.iter().map(sanitize_payload).collect()),
        Value::Object(map) => {
            let mut out = Map::new();
            for (key, row) in map {
                let lowered = key.to_ascii_lowercase();
                if matches!(
                    lowered.as_str(),
                    "b64_json" | "image" | "image_bytes" | "data"
                ) {
                    out.insert(key.clone(), Value::String("<omitted>".to_string()));
                    continue;
                }
                out.insert(key.clone(), sanitize_payload(row));
            }
            Value::Object(out)
        }
    }
}
