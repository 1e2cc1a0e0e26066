use crate::document::OneOrMany;
use crate::params::{SignFormat, SignerParams, SigningParams, Storages};
use crate::{BASICS_MODULE, EXTENSIONS_MODULE};

use serde::Serialize;
use serde_json::Value;

/// One outbound command: `{ module, method, args? }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Request {
    pub module: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Value>,
}

/// Arguments of `kz.gov.pki.knca.basics.sign`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignArgs<'a> {
    pub allowed_storages: &'a Storages,
    pub format: SignFormat,
    pub data: &'a OneOrMany<String>,
    pub signing_params: &'a SigningParams,
    pub signer_params: &'a SignerParams,
    pub locale: &'a str,
}

impl Request {
    pub fn new(module: impl Into<String>, method: impl Into<String>, args: Option<Value>) -> Self {
        Self {
            module: module.into(),
            method: method.into(),
            args,
        }
    }

    /// Probe answered only by the enhanced agent.
    pub fn extension_version() -> Self {
        Self::new(EXTENSIONS_MODULE, "getVersion", None)
    }

    pub fn basics_sign(args: &SignArgs<'_>) -> Result<Self, serde_json::Error> {
        Ok(Self::new(
            BASICS_MODULE,
            "sign",
            Some(serde_json::to_value(args)?),
        ))
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
