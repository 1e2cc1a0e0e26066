mod agent;
mod client;
mod sidecar;
