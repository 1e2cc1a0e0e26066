pub mod config;
pub mod ncalayer;

pub use config::ConfigError;
pub use ncalayer::NcaLayerError;
