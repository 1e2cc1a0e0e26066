//! Leaf types shared by the NCALayer client crates.
//!
//! Nothing in here knows about WebSockets or signing; these are the small
//! value types that error enums across the workspace embed.

pub mod error;
pub mod http_status;

pub use error::error_location::ErrorLocation;
pub use http_status::HttpStatusCode;

#[cfg(test)]
mod tests;
