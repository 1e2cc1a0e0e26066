use crate::commands::connect;
use crate::error::NcaSignError;

use ncalayer_core::{CapabilitySnapshot, ClientConfig, ProbeOutcome};

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InfoReport {
    pub ncalayer_url: String,
    pub version: String,
    pub agent: &'static str,
    pub capabilities: CapabilitySnapshot,
}

/// Connect once and describe what the agent supports.
pub async fn gather(config: ClientConfig) -> Result<InfoReport, NcaSignError> {
    let ncalayer_url = config.ncalayer_url.clone();
    let (client, version) = connect(config).await?;
    let capabilities = client.settled_capabilities().await;

    Ok(InfoReport {
        ncalayer_url,
        version,
        agent: agent_name(client.probe_outcome().as_ref()),
        capabilities,
    })
}

pub fn agent_name(outcome: Option<&ProbeOutcome>) -> &'static str {
    match outcome {
        Some(ProbeOutcome::Supported) => "KAZTOKEN mobile/desktop",
        Some(ProbeOutcome::Unsupported { .. }) => "NCALayer",
        Some(ProbeOutcome::TransportLost { .. }) | None => "unknown (connection lost)",
    }
}

impl fmt::Display for InfoReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Agent:        {} {}", self.agent, self.version)?;
        writeln!(f, "URL:          {}", self.ncalayer_url)?;
        write!(
            f,
            "Capabilities: enhanced_agent={} kmd_http_api={} multisign={}",
            self.capabilities.enhanced_agent,
            self.capabilities.kmd_http_api,
            self.capabilities.multisign
        )
    }
}
