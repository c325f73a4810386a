//! Manager backends for bbl.
//!
//! A command drives three collaborators: the `KeyPairManager` that owns the
//! environment's SSH key pair, the `TerraformManager` that provisions IaaS
//! resources, and the `BoshManager` that deploys the director. Each comes in
//! a CLI flavour shelling out to the real tool and a deterministic mock
//! flavour used by tests and by `managers = "mock"`.

pub mod backend;
pub mod bosh;
pub mod config;
mod exec;
pub mod keypair;
pub mod mock;
pub mod outputs;
pub mod prereq;
pub mod terraform;

pub use backend::{select_managers, Managers};
pub use bosh::{BoshCli, BoshManager};
pub use config::ManagerConfig;
pub use keypair::{KeyPairManager, SshKeygenKeyPairManager};
pub use mock::{MockBoshManager, MockKeyPairManager, MockTerraformManager};
pub use outputs::TerraformOutputs;
pub use prereq::{check_prereqs, format_missing, MissingPrereq};
pub use terraform::{TerraformCli, TerraformManager};

use bbl_state::State;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("manager I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("manager serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("managers '{0}' are not available (expected: cli, mock)")]
    Unavailable(String),
    #[error("{tool} failed: {message}")]
    ExecFailed { tool: String, message: String },
    /// A tool failed part-way; `state` records whatever it already created
    /// and must be persisted before the error is surfaced.
    #[error("{message}")]
    PartialFailure { state: Box<State>, message: String },
    #[error("terraform output '{0}' is missing")]
    MissingOutput(String),
    #[error("{0}")]
    InvalidOutput(String),
    #[error("manager configuration error: {0}")]
    Config(String),
    #[error("{0}")]
    Failed(String),
}

impl ManagerError {
    /// The partially-applied state carried by a failure, if any.
    pub fn partial_state(&self) -> Option<&State> {
        match self {
            Self::PartialFailure { state, .. } => Some(&**state),
            _ => None,
        }
    }
}
