use crate::error::NcaLayerError;

use serde::Deserialize;
use serde_json::{Map, Value};

const FLAT_SUCCESS_CODE: &str = "200";

/// `{ status, code, message, details, body: { result } }`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WrappedFrame {
    pub status: bool,
    #[serde(default)]
    pub code: Option<Value>,
    #[serde(default)]
    pub message: Option<Value>,
    #[serde(default)]
    pub details: Option<Value>,
    #[serde(default)]
    pub body: Option<Map<String, Value>>,
}

/// `{ code, message, responseObject }`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FlatFrame {
    pub code: Value,
    #[serde(default)]
    pub message: Option<Value>,
    #[serde(default, rename = "responseObject")]
    pub response_object: Option<Value>,
}

/// The two response shapes, told apart by which discriminating key is present.
#[derive(Debug, Clone, PartialEq)]
pub enum WireResponse {
    Wrapped(WrappedFrame),
    Flat(FlatFrame),
}

impl WireResponse {
    pub fn parse(text: &str) -> Result<Self, NcaLayerError> {
        let frame: Value = serde_json::from_str(text)?;
        let Value::Object(ref fields) = frame else {
            return Err(NcaLayerError::decode(format!(
                "response frame is not a JSON object: {text}"
            )));
        };

        if fields.contains_key("status") {
            Ok(WireResponse::Wrapped(serde_json::from_value(frame)?))
        } else if fields.contains_key("code") {
            Ok(WireResponse::Flat(serde_json::from_value(frame)?))
        } else {
            Err(NcaLayerError::decode(
                "response frame has neither 'status' nor 'code'",
            ))
        }
    }

    /// Fold either shape into the result the caller sees.
    pub fn into_result(self) -> Result<Value, NcaLayerError> {
        match self {
            WireResponse::Wrapped(frame) => {
                if !frame.status {
                    return Err(NcaLayerError::peer(
                        render(frame.code.as_ref(), "unknown"),
                        render(frame.message.as_ref(), ""),
                        details(frame.details),
                    ));
                }

                // Success without a result means the user closed the dialog.
                match frame.body.and_then(|mut body| body.remove("result")) {
                    Some(result) => Ok(result),
                    None => Err(NcaLayerError::cancelled()),
                }
            }
            WireResponse::Flat(frame) => match frame.code {
                Value::String(ref code) if code == FLAT_SUCCESS_CODE => {
                    Ok(frame.response_object.unwrap_or(Value::Null))
                }
                code => Err(NcaLayerError::peer(
                    render(Some(&code), "unknown"),
                    render(frame.message.as_ref(), ""),
                    None,
                )),
            },
        }
    }
}

/// Decode one inbound frame into the caller's result.
pub fn decode_response(text: &str) -> Result<Value, NcaLayerError> {
    WireResponse::parse(text)?.into_result()
}

fn render(value: Option<&Value>, fallback: &str) -> String {
    match value {
        None | Some(Value::Null) => fallback.to_string(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

fn details(value: Option<Value>) -> Option<String> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text),
        Some(other) => Some(other.to_string()),
    }
}
