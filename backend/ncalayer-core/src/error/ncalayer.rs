//! The single error type surfaced by [`NcaLayerClient`](crate::NcaLayerClient).
//!
//! Key design decisions:
//! - Cancellation is its own variant; [`NcaLayerError::is_cancelled_by_user`] is the
//!   only thing callers need to branch on for a quieter UX
//! - Peer-reported failures keep the peer's code/message/details as separate fields
//! - Sidecar failures keep the HTTP status as a number when one exists
//! - All errors include ErrorLocation for debugging

use common::{ErrorLocation, HttpStatusCode};

use thiserror::Error as ThisError;

/// Shown whenever the agent cannot be reached or the socket fails.
pub const INSTALL_AGENT_REMEDIATION: &str = "Failed to communicate with NCALayer. If NCALayer is \
    not installed on this computer, install it from the NUC RK portal (https://ncl.pki.gov.kz/). \
    If NCALayer is installed but signing still fails, contact technical support.";

const SIDECAR_NAME: &str = "KAZTOKEN mobile/desktop";

#[derive(Debug, ThisError)]
pub enum NcaLayerError {
    #[error("Already Connected Error: {message} {location}")]
    AlreadyConnected {
        message: String,
        location: ErrorLocation,
    },

    #[error("Not Connected Error: {message} {location}")]
    NotConnected {
        message: String,
        location: ErrorLocation,
    },

    #[error("Request In Flight Error: {message} {location}")]
    RequestInFlight {
        message: String,
        location: ErrorLocation,
    },

    #[error("Handshake Error: {message} {location}")]
    Handshake {
        message: String,
        location: ErrorLocation,
    },

    #[error("Connection Closed Error: {message} {location}")]
    ConnectionClosed {
        message: String,
        location: ErrorLocation,
    },

    #[error("Transport Error: {message} ({cause}) {location}")]
    Transport {
        message: String,
        cause: String,
        location: ErrorLocation,
    },

    #[error("Peer Error: {} {location}", format_peer(.code, .message, .details.as_deref()))]
    Peer {
        code: String,
        message: String,
        details: Option<String>,
        location: ErrorLocation,
    },

    #[error("Cancelled Error: operation cancelled by user {location}")]
    Cancelled { location: ErrorLocation },

    #[error("Capability Error: {message} {location}")]
    Capability {
        message: String,
        location: ErrorLocation,
    },

    #[error("Sidecar Error: {message} {location}")]
    Sidecar {
        message: String,
        status_code: Option<HttpStatusCode>,
        location: ErrorLocation,
    },

    #[error("Decode Error: {message} {location}")]
    Decode {
        message: String,
        location: ErrorLocation,
    },

    #[error("Validation Error: {message} {location}")]
    Validation {
        message: String,
        location: ErrorLocation,
    },
}

fn format_peer(code: &str, message: &str, details: Option<&str>) -> String {
    match details {
        Some(details) => format!("{code}: {message} ({details})"),
        None => format!("{code}: {message}"),
    }
}

impl NcaLayerError {
    #[track_caller]
    pub fn already_connected() -> Self {
        NcaLayerError::AlreadyConnected {
            message: "connection has already been established; create a new client to reconnect"
                .to_string(),
            location: ErrorLocation::caller(),
        }
    }

    #[track_caller]
    pub fn not_connected() -> Self {
        NcaLayerError::NotConnected {
            message: "connection to NCALayer is not established".to_string(),
            location: ErrorLocation::caller(),
        }
    }

    #[track_caller]
    pub fn request_in_flight() -> Self {
        NcaLayerError::RequestInFlight {
            message: "another request is still awaiting its response".to_string(),
            location: ErrorLocation::caller(),
        }
    }

    #[track_caller]
    pub fn handshake(message: impl Into<String>) -> Self {
        NcaLayerError::Handshake {
            message: message.into(),
            location: ErrorLocation::caller(),
        }
    }

    #[track_caller]
    pub fn connection_closed() -> Self {
        NcaLayerError::ConnectionClosed {
            message: "NCALayer closed the connection".to_string(),
            location: ErrorLocation::caller(),
        }
    }

    #[track_caller]
    pub fn transport(cause: impl Into<String>) -> Self {
        NcaLayerError::Transport {
            message: INSTALL_AGENT_REMEDIATION.to_string(),
            cause: cause.into(),
            location: ErrorLocation::caller(),
        }
    }

    #[track_caller]
    pub fn peer(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Option<String>,
    ) -> Self {
        NcaLayerError::Peer {
            code: code.into(),
            message: message.into(),
            details,
            location: ErrorLocation::caller(),
        }
    }

    #[track_caller]
    pub fn cancelled() -> Self {
        NcaLayerError::Cancelled {
            location: ErrorLocation::caller(),
        }
    }

    /// Multi-document signing requested on a connection that cannot do it.
    ///
    /// The wording points users of plain NCALayer at the enhanced agent.
    #[track_caller]
    pub fn multisign_unavailable(enhanced_agent: bool) -> Self {
        let message = if enhanced_agent {
            "multi-document signing is unavailable".to_string()
        } else {
            format!(
                "multi-document signing is available when using {SIDECAR_NAME} instead of NCALayer"
            )
        };
        NcaLayerError::Capability {
            message,
            location: ErrorLocation::caller(),
        }
    }

    #[track_caller]
    pub fn sidecar_status(status_code: HttpStatusCode, status_text: &str) -> Self {
        NcaLayerError::Sidecar {
            message: format!("{SIDECAR_NAME} returned error '{status_code}: {status_text}'"),
            status_code: Some(status_code),
            location: ErrorLocation::caller(),
        }
    }

    #[track_caller]
    pub fn sidecar_communication(cause: impl std::fmt::Display) -> Self {
        NcaLayerError::Sidecar {
            message: format!("failed to communicate with {SIDECAR_NAME}: {cause}"),
            status_code: None,
            location: ErrorLocation::caller(),
        }
    }

    #[track_caller]
    pub fn decode(message: impl Into<String>) -> Self {
        NcaLayerError::Decode {
            message: message.into(),
            location: ErrorLocation::caller(),
        }
    }

    #[track_caller]
    pub fn validation(message: impl Into<String>) -> Self {
        NcaLayerError::Validation {
            message: message.into(),
            location: ErrorLocation::caller(),
        }
    }

    /// The "cancelled by user" flag callers branch on.
    pub fn is_cancelled_by_user(&self) -> bool {
        matches!(self, NcaLayerError::Cancelled { .. })
    }

    /// Get error category for logging.
    pub fn error_category(&self) -> &'static str {
        match self {
            NcaLayerError::AlreadyConnected { .. } => "already_connected",
            NcaLayerError::NotConnected { .. } => "not_connected",
            NcaLayerError::RequestInFlight { .. } => "request_in_flight",
            NcaLayerError::Handshake { .. } => "handshake",
            NcaLayerError::ConnectionClosed { .. } => "connection_closed",
            NcaLayerError::Transport { .. } => "transport",
            NcaLayerError::Peer { .. } => "peer",
            NcaLayerError::Cancelled { .. } => "cancelled",
            NcaLayerError::Capability { .. } => "capability",
            NcaLayerError::Sidecar { .. } => "sidecar",
            NcaLayerError::Decode { .. } => "decode",
            NcaLayerError::Validation { .. } => "validation",
        }
    }

    /// Get HTTP status code if the sidecar answered with one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            NcaLayerError::Sidecar {
                status_code: Some(status_code),
                ..
            } => Some(status_code.0),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for NcaLayerError {
    #[track_caller]
    fn from(error: serde_json::Error) -> Self {
        NcaLayerError::Decode {
            message: error.to_string(),
            location: ErrorLocation::caller(),
        }
    }
}
