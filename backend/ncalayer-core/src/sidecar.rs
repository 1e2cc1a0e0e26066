//! KAZTOKEN mobile/desktop HTTP API.
//!
//! A signing operation is two-step: POST a manifest to the base URL to get an
//! operation id, then POST every document, one after the other, to
//! `<base URL><operation id>`. Each answer is that document's signature.

use crate::document::{SignInput, Signed};
use crate::error::NcaLayerError;
use crate::normalize::bytes_to_base64;

use common::HttpStatusCode;

use std::time::Duration;

use log::{debug, info};
use reqwest::{Client, Response};
use serde::Serialize;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationManifest {
    pub number_of_documents: usize,
    pub base64: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encapsulate_content: Option<bool>,
}

#[derive(Clone)]
pub struct KmdHttpApi {
    base_url: Url,
    client: Client,
}

impl KmdHttpApi {
    pub fn new(base_url_str: &str) -> Result<Self, NcaLayerError> {
        let base_url = Url::parse(base_url_str).map_err(|e| {
            NcaLayerError::validation(format!("Invalid KAZTOKEN API URL '{base_url_str}': {e}"))
        })?;
        // No overall timeout: each document waits for the user at the token.
        let client = Client::builder()
            .build()
            .map_err(|e| NcaLayerError::sidecar_communication(e))?;

        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Plain GET against the base URL; any 2xx means the API is there.
    pub async fn probe(&self, timeout: Duration) -> bool {
        match self
            .client
            .get(self.base_url.clone())
            .timeout(timeout)
            .send()
            .await
        {
            Ok(response) => {
                let status = HttpStatusCode(response.status().as_u16());
                debug!("KAZTOKEN API probe answered {status}");
                status.is_success()
            }
            Err(e) => {
                debug!("KAZTOKEN API not reachable: {e}");
                false
            }
        }
    }

    /// Sign every document through one operation, in input order.
    ///
    /// Cancellation and HTTP status errors come back as they are; any other
    /// failure is reported as a communication error with the cause appended.
    pub async fn sign_documents(
        &self,
        documents: &SignInput,
        encapsulate: Option<bool>,
    ) -> Result<Signed, NcaLayerError> {
        let base64 = documents.first().is_some_and(|document| document.is_base64());
        let manifest = OperationManifest {
            number_of_documents: documents.len(),
            base64,
            encapsulate_content: encapsulate,
        };

        let operation_id = self.create_operation(&manifest).await?;
        info!(
            "KAZTOKEN operation {operation_id} created for {} document(s)",
            manifest.number_of_documents
        );

        let operation_url = self.operation_url(&operation_id)?;

        // Sequential on purpose: order of signatures is order of requests.
        let mut signatures = Vec::with_capacity(documents.len());
        for (index, document) in documents.iter().enumerate() {
            let response = self
                .client
                .post(operation_url.clone())
                .body(document.as_bytes().to_vec())
                .send()
                .await
                .map_err(|e| NcaLayerError::sidecar_communication(e))?;

            let response = check_status(response, HttpStatusCode::UNAUTHORIZED)?;

            let signature = if base64 {
                response
                    .text()
                    .await
                    .map_err(|e| NcaLayerError::sidecar_communication(e))?
            } else {
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| NcaLayerError::sidecar_communication(e))?;
                bytes_to_base64(&bytes)
            };

            debug!("KAZTOKEN signed document {} of {}", index + 1, documents.len());
            signatures.push(signature);
        }

        documents
            .reshape(signatures)
            .map_err(|e| NcaLayerError::sidecar_communication(e))
    }

    /// `<base URL><operation id>`. The id is opaque and appended as-is, never resolved
    /// as a relative reference.
    pub fn operation_url(&self, operation_id: &str) -> Result<Url, NcaLayerError> {
        Url::parse(&format!("{}{operation_id}", self.base_url))
            .map_err(|e| NcaLayerError::sidecar_communication(e))
    }

    async fn create_operation(&self, manifest: &OperationManifest) -> Result<String, NcaLayerError> {
        let response = self
            .client
            .post(self.base_url.clone())
            .json(manifest)
            .send()
            .await
            .map_err(|e| NcaLayerError::sidecar_communication(e))?;

        let response = check_status(response, HttpStatusCode::CONFLICT)?;

        response
            .text()
            .await
            .map_err(|e| NcaLayerError::sidecar_communication(e))
    }
}

/// Map a non-2xx answer to an error; `cancelled_status` means the user backed out.
#[track_caller]
fn check_status(
    response: Response,
    cancelled_status: HttpStatusCode,
) -> Result<Response, NcaLayerError> {
    let status = HttpStatusCode(response.status().as_u16());

    if status.is_success() {
        return Ok(response);
    }

    if status == cancelled_status {
        info!("KAZTOKEN operation cancelled by user (HTTP {status})");
        return Err(NcaLayerError::cancelled());
    }

    Err(NcaLayerError::sidecar_status(
        status,
        response.status().canonical_reason().unwrap_or(""),
    ))
}
