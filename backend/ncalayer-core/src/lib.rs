pub mod client;
pub mod config;
pub mod document;
pub mod error;
pub mod normalize;
pub mod params;
pub mod protocol;
pub mod sidecar;

#[cfg(test)]
mod tests;

pub use client::{CapabilitySnapshot, NcaLayerClient, Observer, ProbeOutcome};
pub use config::ClientConfig;
pub use document::{Document, OneOrMany, SignInput, Signed};
pub use error::NcaLayerError;
pub use params::{SignFormat, SignerParams, SigningParams, Storages};

pub const LOOPBACK_HOST: &str = "127.0.0.1";
pub const NCALAYER_PORT: u16 = 13579;
pub const KMD_HTTP_API_PORT: u16 = 24680;

pub const DEFAULT_NCALAYER_URL: &str =
    const_format::concatcp!("wss://", LOOPBACK_HOST, ":", NCALAYER_PORT);
pub const DEFAULT_KMD_HTTP_API_URL: &str =
    const_format::concatcp!("https://", LOOPBACK_HOST, ":", KMD_HTTP_API_PORT, "/");

pub const DEFAULT_LOCALE: &str = "ru";

/// Module answering the enhanced-agent probe (KAZTOKEN mobile/desktop).
pub const EXTENSIONS_MODULE: &str = "kz.digiflow.mobile.extensions";
/// Module exposing the basic signing methods of every NCALayer-compatible agent.
pub const BASICS_MODULE: &str = "kz.gov.pki.knca.basics";
