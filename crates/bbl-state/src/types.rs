//! The persisted environment descriptor.
//!
//! Field names serialize in camelCase so state files stay readable next to the
//! terraform and bosh artifacts kept in the same directory. Every field carries
//! a serde default: a file written by an older release (or one with zero-valued
//! sections) loads back into exactly the value that was written.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Current state format version. Incremented on incompatible schema changes.
pub const STATE_VERSION: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct State {
    pub version: u32,
    pub iaas: String,
    pub no_director: bool,
    #[serde(rename = "envID")]
    pub env_id: String,
    pub aws: Aws,
    pub gcp: Gcp,
    pub azure: Azure,
    pub key_pair: KeyPair,
    pub bosh: Bosh,
    pub tf_state: String,
}

impl Default for State {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            iaas: String::new(),
            no_director: false,
            env_id: String::new(),
            aws: Aws::default(),
            gcp: Gcp::default(),
            azure: Azure::default(),
            key_pair: KeyPair::default(),
            bosh: Bosh::default(),
            tf_state: String::new(),
        }
    }
}

impl State {
    /// True when nothing beyond the version marker has been recorded.
    pub fn is_empty(&self) -> bool {
        let mut unversioned = self.clone();
        unversioned.version = STATE_VERSION;
        unversioned == State::default()
    }

    /// A copy of this state with only the key pair replaced.
    #[must_use]
    pub fn with_key_pair(&self, key_pair: KeyPair) -> State {
        State {
            key_pair,
            ..self.clone()
        }
    }

    pub fn has_director(&self) -> bool {
        !self.no_director && !self.bosh.is_empty()
    }
}

/// SSH credential identity used for the jumpbox and director VMs.
///
/// Replaced wholesale on rotation, never field by field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KeyPair {
    pub name: String,
    pub private_key: String,
    pub public_key: String,
}

impl KeyPair {
    pub fn new(
        name: impl Into<String>,
        private_key: impl Into<String>,
        public_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            private_key: private_key.into(),
            public_key: public_key.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.private_key.is_empty() && self.public_key.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        !self.name.is_empty() && !self.private_key.is_empty() && !self.public_key.is_empty()
    }
}

/// Director identity, populated only by the BOSH manager.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Bosh {
    pub director_name: String,
    pub director_username: String,
    pub director_password: String,
    pub director_address: String,
    #[serde(rename = "directorSSLCA")]
    pub director_ssl_ca: String,
    #[serde(rename = "directorSSLCertificate")]
    pub director_ssl_certificate: String,
    #[serde(rename = "directorSSLPrivateKey")]
    pub director_ssl_private_key: String,
    /// Opaque `bosh create-env` state document.
    pub state: serde_json::Value,
    pub variables: String,
    pub manifest: String,
}

impl Bosh {
    pub fn is_empty(&self) -> bool {
        *self == Bosh::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Aws {
    #[serde(rename = "accessKeyID")]
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Gcp {
    pub service_account_key: String,
    #[serde(rename = "projectID")]
    pub project_id: String,
    pub zone: String,
    pub region: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Azure {
    #[serde(rename = "subscriptionID")]
    pub subscription_id: String,
    #[serde(rename = "tenantID")]
    pub tenant_id: String,
    #[serde(rename = "clientID")]
    pub client_id: String,
    pub client_secret: String,
    pub location: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Iaas {
    Aws,
    Gcp,
    Azure,
}

impl fmt::Display for Iaas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Iaas::Aws => write!(f, "aws"),
            Iaas::Gcp => write!(f, "gcp"),
            Iaas::Azure => write!(f, "azure"),
        }
    }
}

impl FromStr for Iaas {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "aws" => Ok(Iaas::Aws),
            "gcp" => Ok(Iaas::Gcp),
            "azure" => Ok(Iaas::Azure),
            other => Err(format!(
                "unknown iaas '{other}' (expected: aws, gcp, azure)"
            )),
        }
    }
}
