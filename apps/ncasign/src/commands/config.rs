use crate::cli::ConfigAction;
use crate::commands::emit;
use crate::error::NcaSignError;

use ncalayer_core::ClientConfig;

use std::path::Path;

pub fn run(
    action: &ConfigAction,
    config: ClientConfig,
    config_dir: &Path,
    json: bool,
) -> Result<(), NcaSignError> {
    match action {
        ConfigAction::Show => {
            config.validate()?;
            // The config itself is JSON; plain output is the same document.
            emit(true, &config, String::new)
        }
        ConfigAction::Save => {
            config.save(config_dir)?;
            let path = config_dir.join("ncalayer.json");
            emit(json, &path, || format!("Saved {}", path.display()))
        }
    }
}
