//! Command line of `ncasign`.

use ncalayer_core::{ClientConfig, Storages};

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "ncasign")]
#[command(version, about = "Sign documents with NCALayer or KAZTOKEN mobile/desktop")]
pub struct Cli {
    /// WebSocket address of the signing agent
    #[arg(long, global = true, env = "NCALAYER_URL")]
    pub ncalayer_url: Option<String>,

    /// Base URL of the KAZTOKEN HTTP API (must end with '/')
    #[arg(long, global = true, env = "NCALAYER_KMD_HTTP_API_URL")]
    pub kmd_http_api_url: Option<String>,

    /// Never probe or use the KAZTOKEN HTTP API
    #[arg(long, global = true)]
    pub no_kmd_http_api: bool,

    /// Locale of the signing dialog (defaults to the config's)
    #[arg(long, global = true)]
    pub locale: Option<String>,

    /// Directory holding ncalayer.json
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,

    /// Print results and errors as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase console log verbosity
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only print results and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Produce CMS signatures; several files need KAZTOKEN mobile/desktop
    Cms {
        /// Files to sign, signed in the order given
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Embed the file content in the signature
        #[arg(long)]
        attached: bool,

        /// Key storage to offer (repeatable); all storages when omitted
        #[arg(long = "storage")]
        storages: Vec<String>,

        /// Write `<file>.cms` into this directory instead of printing base64
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
    },

    /// Sign an XML document
    Xml {
        file: PathBuf,

        /// Key storage to offer (repeatable); all storages when omitted
        #[arg(long = "storage")]
        storages: Vec<String>,

        /// Write the signed XML here instead of printing it
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Connect and report the agent version and capabilities
    Info,

    /// Show or persist the effective configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Save the effective configuration to the config directory
    Save,
}

impl Cli {
    /// Flags and environment take precedence over the config file.
    pub fn apply_overrides(&self, mut config: ClientConfig) -> ClientConfig {
        if let Some(url) = &self.ncalayer_url {
            config.ncalayer_url = url.clone();
        }
        if let Some(url) = &self.kmd_http_api_url {
            config.kmd_http_api_url = url.clone();
        }
        if self.no_kmd_http_api {
            config.allow_kmd_http_api = false;
        }
        if let Some(locale) = &self.locale {
            config.default_locale = locale.clone();
        }
        config
    }
}

pub fn storages(names: &[String]) -> Storages {
    if names.is_empty() {
        Storages::all()
    } else {
        Storages::Only(names.to_vec())
    }
}
