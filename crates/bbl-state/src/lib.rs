//! Environment state for bbl.
//!
//! This crate owns the single durable record describing one managed
//! environment: the `State` model, the `StateStore` contract with its atomic
//! file-backed and in-memory implementations, the `StateLayout` of a state
//! directory, and the `StateValidator` checks every command runs before it
//! mutates anything.

pub mod identity;
pub mod layout;
pub mod memory;
pub mod store;
pub mod types;
pub mod validator;

pub use identity::{generate_env_id, validate_env_id};
pub use layout::{StateLayout, STATE_FILE};
pub use memory::MemoryStateStore;
pub use store::{FileStateStore, StateStore};
pub use types::{Aws, Azure, Bosh, Gcp, Iaas, KeyPair, State, STATE_VERSION};
pub use validator::{StateConsistencyValidator, StateValidator, ValidationError};

use std::path::Path;
use thiserror::Error;

/// Fsync a directory so that a preceding `rename()` or `unlink()` is durable.
///
/// POSIX only guarantees the directory entry change survives a crash once
/// the directory itself has been synced.
pub(crate) fn fsync_dir(dir: &Path) -> Result<(), std::io::Error> {
    let f = std::fs::File::open(dir)?;
    f.sync_all()
}

#[derive(Debug, Error)]
pub enum StateError {
    #[error("state I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("state serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("state file '{path}' failed its integrity check: expected {expected}, got {actual}")]
    IntegrityFailure {
        path: String,
        expected: String,
        actual: String,
    },
    #[error("state file version {found} is newer than this bbl supports ({expected})")]
    VersionMismatch { expected: u32, found: u32 },
    #[error("{0}")]
    WriteFailed(String),
}
