//! Capability flags learned while connecting.
//!
//! Flags only ever go from false to true within a session; there is no way
//! to clear one.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub(crate) struct Capabilities {
    enhanced_agent: AtomicBool,
    kmd_http_api: AtomicBool,
    multisign: AtomicBool,
}

/// Point-in-time copy of the capability flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CapabilitySnapshot {
    /// The peer answered the KAZTOKEN extension probe.
    pub enhanced_agent: bool,
    /// The KAZTOKEN HTTP API answered the reachability probe.
    pub kmd_http_api: bool,
    pub multisign: bool,
}

impl Capabilities {
    pub(crate) fn mark_enhanced_agent(&self) {
        self.enhanced_agent.store(true, Ordering::SeqCst);
        self.multisign.store(true, Ordering::SeqCst);
    }

    pub(crate) fn mark_kmd_http_api(&self) {
        self.kmd_http_api.store(true, Ordering::SeqCst);
        self.multisign.store(true, Ordering::SeqCst);
    }

    pub(crate) fn snapshot(&self) -> CapabilitySnapshot {
        CapabilitySnapshot {
            enhanced_agent: self.enhanced_agent.load(Ordering::SeqCst),
            kmd_http_api: self.kmd_http_api.load(Ordering::SeqCst),
            multisign: self.multisign.load(Ordering::SeqCst),
        }
    }
}
