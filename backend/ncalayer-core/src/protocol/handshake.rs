use crate::error::NcaLayerError;

use serde_json::Value;

/// Extract `result.version` from the agent's first frame.
///
/// A missing, empty or non-string version makes the connection unusable.
pub fn decode_handshake(text: &str) -> Result<String, NcaLayerError> {
    let frame: Value = serde_json::from_str(text)
        .map_err(|e| NcaLayerError::handshake(format!("initial frame is not valid JSON: {e}")))?;

    match frame.pointer("/result/version") {
        Some(Value::String(version)) if !version.is_empty() => Ok(version.clone()),
        Some(Value::String(_)) => Err(NcaLayerError::handshake(
            "initial frame has an empty result.version",
        )),
        Some(other) => Err(NcaLayerError::handshake(format!(
            "initial frame has a non-string result.version: {other}"
        ))),
        None => Err(NcaLayerError::handshake(
            "initial frame has no result.version",
        )),
    }
}
