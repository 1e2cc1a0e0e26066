pub mod config;
pub mod info;
pub mod sign;

use crate::cli::{Cli, Command, storages};
use crate::error::NcaSignError;

use ncalayer_core::{ClientConfig, NcaLayerClient};

use std::path::Path;

use log::{debug, info};
use serde::Serialize;

/// Run the parsed command against `config`.
pub async fn run(cli: &Cli, config: ClientConfig, config_dir: &Path) -> Result<(), NcaSignError> {
    match &cli.command {
        Command::Cms {
            files,
            attached,
            storages: names,
            out_dir,
        } => {
            let (client, _) = connect(config).await?;
            let signed = sign::cms(&client, files, &storages(names), *attached).await?;

            match out_dir {
                Some(dir) => {
                    let written = sign::write_cms(dir, &signed).await?;
                    emit(cli.json, &written, || {
                        written
                            .iter()
                            .map(|path| path.display().to_string())
                            .collect::<Vec<_>>()
                            .join("\n")
                    })
                }
                None => emit(cli.json, &signed, || {
                    signed
                        .iter()
                        .map(|file| file.signature.clone())
                        .collect::<Vec<_>>()
                        .join("\n")
                }),
            }
        }
        Command::Xml {
            file,
            storages: names,
            output,
        } => {
            let (client, _) = connect(config).await?;
            let signed = sign::xml(&client, file, &storages(names)).await?;

            match output {
                Some(path) => {
                    sign::write_xml(path, &signed.signature).await?;
                    emit(cli.json, path, || path.display().to_string())
                }
                None => emit(cli.json, &signed, || signed.signature.clone()),
            }
        }
        Command::Info => {
            let report = info::gather(config).await?;
            emit(cli.json, &report, || report.to_string())
        }
        Command::Config { action } => config::run(action, config, config_dir, cli.json),
    }
}

/// Build a client with raw traffic echoed at debug level and connect it.
///
/// Returns the connected client and the agent's version.
pub async fn connect(config: ClientConfig) -> Result<(NcaLayerClient, String), NcaSignError> {
    let client = NcaLayerClient::new(config)?
        .with_request_observer(|json| debug!("-> {json}"))
        .with_response_observer(|text| debug!("<- {text}"));

    let version = client.connect().await?;
    info!("NCALayer {version} ready");
    Ok((client, version))
}

/// Print `value` as JSON, or the plain rendering when `json` is off.
pub fn emit<T: Serialize + ?Sized>(
    json: bool,
    value: &T,
    plain: impl FnOnce() -> String,
) -> Result<(), NcaSignError> {
    if !json {
        println!("{}", plain());
        return Ok(());
    }

    let text = serde_json::to_string_pretty(value).map_err(|e| NcaSignError::Output {
        message: format!("Failed to serialize output: {e}"),
        location: common::ErrorLocation::caller(),
    })?;
    println!("{text}");
    Ok(())
}
