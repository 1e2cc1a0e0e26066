//! Where `ncasign` keeps its config and log files.
//!
//! # Platform Behavior
//! - **Linux**: `$XDG_CONFIG_HOME/ncasign`, logs in `$XDG_DATA_HOME/ncasign`
//! - **macOS**: `~/Library/Application Support/ncasign` for both
//! - **Windows**: `%APPDATA%\ncasign`, logs in `%LOCALAPPDATA%\ncasign`

use crate::error::NcaSignError;

use common::ErrorLocation;

use std::path::{Path, PathBuf};

use log::{debug, info, warn};

const APP_DIR_NAME: &str = "ncasign";

/// Resolve the config directory; an explicit `--config-dir` wins.
pub fn config_dir(explicit: Option<&Path>) -> Result<PathBuf, NcaSignError> {
    if let Some(dir) = explicit {
        info!("Using config directory override: {}", dir.display());
        return Ok(dir.to_path_buf());
    }

    let dir = dirs::config_dir()
        .map(|base| base.join(APP_DIR_NAME))
        .ok_or_else(|| NcaSignError::Ncasign {
            message: "Could not determine the user config directory".to_string(),
            location: ErrorLocation::caller(),
        })?;

    debug!("Platform config dir: {}", dir.display());
    Ok(dir)
}

/// Resolve and create the log directory, falling back to the temp dir.
pub fn log_dir() -> Result<PathBuf, NcaSignError> {
    let dir = match dirs::data_local_dir() {
        Some(base) => base.join(APP_DIR_NAME),
        None => {
            warn!("No platform data dir; logging to the temp dir");
            std::env::temp_dir().join(APP_DIR_NAME)
        }
    };

    std::fs::create_dir_all(&dir).map_err(|e| NcaSignError::Ncasign {
        message: format!("Failed to create log directory {}: {e}", dir.display()),
        location: ErrorLocation::caller(),
    })?;

    Ok(dir)
}

/// Load `.env` from the working directory, then from next to the executable.
pub fn load_dotenv() -> Option<PathBuf> {
    if let Ok(path) = dotenvy::dotenv() {
        return Some(path);
    }

    let exe_dir = std::env::current_exe().ok()?.parent()?.to_path_buf();
    let env_path = exe_dir.join(".env");
    if !env_path.exists() {
        return None;
    }

    match dotenvy::from_path(&env_path) {
        Ok(()) => Some(env_path),
        Err(e) => {
            // Logger is not up yet at this point.
            eprintln!("Failed to parse .env at {}: {e}", env_path.display());
            None
        }
    }
}
