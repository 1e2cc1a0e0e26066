//! Base64 conversions between caller payloads and text-only transports.

use crate::document::{Document, OneOrMany, SignInput};
use crate::error::NcaLayerError;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

pub fn bytes_to_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn base64_to_bytes(text: &str) -> Result<Vec<u8>, NcaLayerError> {
    STANDARD
        .decode(text)
        .map_err(|e| NcaLayerError::decode(format!("invalid base64: {e}")))
}

/// Base64 text passes through untouched; bytes are encoded whole.
pub fn normalize_document(document: Document) -> String {
    match document {
        Document::Base64(text) => text,
        Document::Binary(bytes) => bytes_to_base64(&bytes),
    }
}

/// Normalise every document of a batch, keeping order and shape.
pub fn normalize_data_to_sign(data: SignInput) -> OneOrMany<String> {
    data.map(normalize_document)
}
