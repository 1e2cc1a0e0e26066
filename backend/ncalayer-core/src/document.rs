//! Documents to sign and the single-or-batch shape shared by inputs and results.

use crate::error::NcaLayerError;

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A payload handed to the signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Document {
    /// Text that is already base64.
    Base64(String),
    /// Raw bytes, encoded only when the chosen transport needs text.
    Binary(Vec<u8>),
}

impl Document {
    /// Read a whole file into a [`Document::Binary`].
    pub async fn read_file(path: impl AsRef<Path>) -> Result<Self, NcaLayerError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            NcaLayerError::validation(format!("Failed to read {}: {e}", path.display()))
        })?;
        Ok(Document::Binary(bytes))
    }

    pub fn is_base64(&self) -> bool {
        matches!(self, Document::Base64(_))
    }

    /// Body bytes as sent to the HTTP API, without any re-encoding.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Document::Base64(text) => text.as_bytes(),
            Document::Binary(bytes) => bytes,
        }
    }
}

impl From<String> for Document {
    fn from(text: String) -> Self {
        Document::Base64(text)
    }
}

impl From<&str> for Document {
    fn from(text: &str) -> Self {
        Document::Base64(text.to_string())
    }
}

impl From<Vec<u8>> for Document {
    fn from(bytes: Vec<u8>) -> Self {
        Document::Binary(bytes)
    }
}

/// Either a single value or an ordered batch.
///
/// Serialises untagged: a scalar for `One`, a JSON array for `Many`. The
/// distinction matters on the way back too, since a single input must yield
/// an unwrapped single result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn is_many(&self) -> bool {
        matches!(self, OneOrMany::Many(_))
    }

    pub fn len(&self) -> usize {
        match self {
            OneOrMany::One(_) => 1,
            OneOrMany::Many(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn first(&self) -> Option<&T> {
        match self {
            OneOrMany::One(item) => Some(item),
            OneOrMany::Many(items) => items.first(),
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        match self {
            OneOrMany::One(item) => std::slice::from_ref(item).iter(),
            OneOrMany::Many(items) => items.iter(),
        }
    }

    /// Element-wise, order-preserving map that keeps the shape.
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> OneOrMany<U> {
        match self {
            OneOrMany::One(item) => OneOrMany::One(f(item)),
            OneOrMany::Many(items) => OneOrMany::Many(items.into_iter().map(f).collect()),
        }
    }

    /// Rebuild a collection with this value's shape from positional results.
    ///
    /// `items` must hold exactly one element when `self` is `One`.
    pub fn reshape<U>(&self, mut items: Vec<U>) -> Result<OneOrMany<U>, NcaLayerError> {
        match self {
            OneOrMany::One(_) if items.len() == 1 => Ok(OneOrMany::One(items.remove(0))),
            OneOrMany::One(_) => Err(NcaLayerError::decode(format!(
                "expected exactly one result, got {}",
                items.len()
            ))),
            OneOrMany::Many(inputs) if inputs.len() == items.len() => Ok(OneOrMany::Many(items)),
            OneOrMany::Many(inputs) => Err(NcaLayerError::decode(format!(
                "expected {} results, got {}",
                inputs.len(),
                items.len()
            ))),
        }
    }

    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}

pub type SignInput = OneOrMany<Document>;

/// Signature(s) in base64, positionally aligned with the input.
pub type Signed = OneOrMany<String>;

impl Signed {
    /// Interpret the opaque `result` of a `sign` call against the input's shape.
    pub fn from_result<T>(input: &OneOrMany<T>, result: Value) -> Result<Signed, NcaLayerError> {
        let signatures = match result {
            Value::String(signature) => vec![signature],
            Value::Array(values) => values
                .into_iter()
                .map(|value| match value {
                    Value::String(signature) => Ok(signature),
                    other => Err(NcaLayerError::decode(format!(
                        "expected a signature string, got {other}"
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()?,
            other => {
                return Err(NcaLayerError::decode(format!(
                    "expected a signature string or array, got {other}"
                )));
            }
        };
        input.reshape(signatures)
    }
}
