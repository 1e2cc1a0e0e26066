use ncalayer_core::NcaLayerError;
use ncalayer_core::error::ConfigError;

use common::ErrorLocation;

use serde::Serialize;
use thiserror::Error;

/// Errors reported by the `ncasign` command line.
///
/// Serialisable so `--json` can print them as structured output; the location
/// points at the call site that produced them.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum NcaSignError {
    /// Error from this App
    #[error("Ncasign Error: {message} {location}")]
    Ncasign {
        message: String,
        location: ErrorLocation,
    },

    /// Configuration could not be loaded, validated or saved
    #[error("Config Error: {message} {location}")]
    Config {
        message: String,
        location: ErrorLocation,
    },

    /// Error from ncalayer-core operations (connect, sign, etc.)
    #[error("Signing Error: {message} {location}")]
    Signing {
        category: String,
        message: String,
        status_code: Option<u16>,
        location: ErrorLocation,
    },

    /// The user dismissed the signing dialog
    #[error("Cancelled Error: signing cancelled by user {location}")]
    Cancelled { location: ErrorLocation },

    /// Result could not be written
    #[error("Output Error: {message} {location}")]
    Output {
        message: String,
        location: ErrorLocation,
    },
}

impl NcaSignError {
    pub fn is_cancelled_by_user(&self) -> bool {
        matches!(self, NcaSignError::Cancelled { .. })
    }
}

impl From<NcaLayerError> for NcaSignError {
    #[track_caller]
    fn from(error: NcaLayerError) -> Self {
        if error.is_cancelled_by_user() {
            return NcaSignError::Cancelled {
                location: ErrorLocation::caller(),
            };
        }

        NcaSignError::Signing {
            category: error.error_category().to_string(),
            message: error.to_string(),
            status_code: error.status_code(),
            location: ErrorLocation::caller(),
        }
    }
}

impl From<ConfigError> for NcaSignError {
    #[track_caller]
    fn from(error: ConfigError) -> Self {
        NcaSignError::Config {
            message: error.to_string(),
            location: ErrorLocation::caller(),
        }
    }
}
