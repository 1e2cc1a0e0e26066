//! JSON frames exchanged with the signing agent.
//!
//! Outbound frames are [`Request`]s. Inbound frames come in two shapes that are
//! folded into one `Result<Value, NcaLayerError>` by [`decode_response`] right
//! where they arrive, so nothing above this module knows about both.
//!
//! The first frame of a connection is unsolicited and carries the agent
//! version; see [`decode_handshake`].

mod handshake;
mod request;
mod response;

pub use handshake::decode_handshake;
pub use request::{Request, SignArgs};
pub use response::{WireResponse, decode_response};
