//! Argument types of the `kz.gov.pki.knca.basics` `sign` method.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key storages the user may pick from. `All` serialises as `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<Vec<String>>", into = "Option<Vec<String>>")]
pub enum Storages {
    #[default]
    All,
    Only(Vec<String>),
}

impl Storages {
    pub fn all() -> Self {
        Storages::All
    }
}

impl From<Option<Vec<String>>> for Storages {
    fn from(value: Option<Vec<String>>) -> Self {
        match value {
            Some(storages) => Storages::Only(storages),
            None => Storages::All,
        }
    }
}

impl From<Storages> for Option<Vec<String>> {
    fn from(value: Storages) -> Self {
        match value {
            Storages::All => None,
            Storages::Only(storages) => Some(storages),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignFormat {
    Cms,
    Xml,
}

/// Signing options. Unset options are left out so the agent applies its defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningParams {
    /// Embed the signed content in the CMS.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encapsulate: Option<bool>,

    /// The payload is base64 that the agent should decode before signing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decode: Option<bool>,

    /// The payload is already a digest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digested: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tsa_profile: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SigningParams {
    /// Empty parameter object: every option left to the agent.
    pub fn cms_default() -> Self {
        Self::default()
    }
}

/// Constraints on which certificate may sign.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignerParams {
    #[serde(default)]
    pub ext_key_usage_oids: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iin: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bin: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SignerParams {
    /// Any certificate is acceptable.
    pub fn any() -> Self {
        Self::default()
    }
}
