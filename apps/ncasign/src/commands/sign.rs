//! `cms` and `xml` subcommands.

use crate::error::NcaSignError;

use ncalayer_core::normalize::base64_to_bytes;
use ncalayer_core::{Document, NcaLayerClient, OneOrMany, SignerParams, SigningParams, Storages};

use common::ErrorLocation;

use std::path::{Path, PathBuf};

use log::info;
use serde::Serialize;

/// One input file and its base64 signature (or signed XML).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedFile {
    pub path: PathBuf,
    pub signature: String,
}

/// Sign every file as CMS in one operation.
///
/// One file goes out as a single document; several go out as a batch, which
/// the connected agent may refuse.
pub async fn cms(
    client: &NcaLayerClient,
    files: &[PathBuf],
    storages: &Storages,
    attached: bool,
) -> Result<Vec<SignedFile>, NcaSignError> {
    let mut documents = Vec::with_capacity(files.len());
    for path in files {
        documents.push(Document::read_file(path).await?);
    }

    let data = if documents.len() == 1 {
        OneOrMany::One(documents.remove(0))
    } else {
        OneOrMany::Many(documents)
    };

    let signing_params = SigningParams {
        encapsulate: Some(attached),
        ..SigningParams::cms_default()
    };

    let signed = client
        .sign_cms(storages, data, &signing_params, &SignerParams::any(), None)
        .await?;

    info!("Signed {} file(s)", signed.len());
    Ok(pair(files, signed.into_vec()))
}

/// Sign one XML file.
pub async fn xml(
    client: &NcaLayerClient,
    file: &Path,
    storages: &Storages,
) -> Result<SignedFile, NcaSignError> {
    let text = tokio::fs::read_to_string(file)
        .await
        .map_err(|e| NcaSignError::Ncasign {
            message: format!("Failed to read {}: {e}", file.display()),
            location: ErrorLocation::caller(),
        })?;

    let signed = client
        .sign_xml(
            storages,
            OneOrMany::One(text),
            &SigningParams::default(),
            &SignerParams::any(),
            None,
        )
        .await?;

    let signature = signed
        .into_vec()
        .into_iter()
        .next()
        .ok_or_else(|| NcaSignError::Ncasign {
            message: "Agent returned no signed XML".to_string(),
            location: ErrorLocation::caller(),
        })?;

    Ok(SignedFile {
        path: file.to_path_buf(),
        signature,
    })
}

pub fn pair(files: &[PathBuf], signatures: Vec<String>) -> Vec<SignedFile> {
    files
        .iter()
        .cloned()
        .zip(signatures)
        .map(|(path, signature)| SignedFile { path, signature })
        .collect()
}

/// `<out_dir>/<input file name>.cms`.
pub fn cms_output_path(out_dir: &Path, input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    out_dir.join(format!("{name}.cms"))
}

/// Write each signature as DER next to the others in `out_dir`.
pub async fn write_cms(out_dir: &Path, signed: &[SignedFile]) -> Result<Vec<PathBuf>, NcaSignError> {
    tokio::fs::create_dir_all(out_dir)
        .await
        .map_err(|e| output_error(out_dir, e))?;

    let mut written = Vec::with_capacity(signed.len());
    for file in signed {
        let der = base64_to_bytes(&file.signature)?;
        let path = cms_output_path(out_dir, &file.path);
        tokio::fs::write(&path, der)
            .await
            .map_err(|e| output_error(&path, e))?;
        info!("Wrote {}", path.display());
        written.push(path);
    }

    Ok(written)
}

pub async fn write_xml(path: &Path, signed_xml: &str) -> Result<(), NcaSignError> {
    tokio::fs::write(path, signed_xml)
        .await
        .map_err(|e| output_error(path, e))?;
    info!("Wrote {}", path.display());
    Ok(())
}

#[track_caller]
fn output_error(path: &Path, e: std::io::Error) -> NcaSignError {
    NcaSignError::Output {
        message: format!("Failed to write {}: {e}", path.display()),
        location: ErrorLocation::caller(),
    }
}
