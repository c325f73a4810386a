use crate::StateError;
use std::fs;
use std::path::{Path, PathBuf};

pub const STATE_FILE: &str = "bbl-state.json";

/// Directory layout of a bbl state directory.
///
/// One directory describes one environment: the state file, the advisory
/// lock, optional configuration, and the working directories handed to the
/// terraform and bosh binaries.
#[derive(Debug, Clone)]
pub struct StateLayout {
    root: PathBuf,
}

impl StateLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[inline]
    pub fn state_file(&self) -> PathBuf {
        self.root.join(STATE_FILE)
    }

    #[inline]
    pub fn lock_file(&self) -> PathBuf {
        self.root.join(".bbl.lock")
    }

    #[inline]
    pub fn config_file(&self) -> PathBuf {
        self.root.join("bbl.toml")
    }

    /// Working directory for terraform: tfvars, plugin cache, and the
    /// transient tfstate file reconstructed from [`State::tf_state`](crate::State).
    #[inline]
    pub fn terraform_dir(&self) -> PathBuf {
        self.root.join("terraform")
    }

    /// Working directory for `bosh create-env` state and vars-store files.
    #[inline]
    pub fn bosh_dir(&self) -> PathBuf {
        self.root.join("bosh")
    }

    pub fn initialize(&self) -> Result<(), StateError> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }
}
