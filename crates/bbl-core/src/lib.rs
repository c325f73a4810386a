//! Command orchestration engine for bbl.
//!
//! A `Command` validates its preconditions against the loaded state, then
//! drives the key pair, terraform, and BOSH managers in order, persisting the
//! state through a `StateStore` after every mutating step. A failure at any
//! point leaves the last persisted state as a safe point to re-run from.
//! This crate also provides the state-dir lock and Ctrl-C deferral the CLI
//! wraps commands in.

pub mod commands;
pub mod concurrency;

pub use commands::{requested_help, Command, Confirm, Destroy, FixedAnswer, Rotate, Up};
pub use concurrency::{install_signal_handler, interrupt_requested, StateLock};

use bbl_managers::ManagerError;
use bbl_state::{StateError, ValidationError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Manager(#[from] ManagerError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error("{0}")]
    Usage(String),
    /// `--help` was requested; carries the rendered help text.
    #[error("{0}")]
    Help(String),
    #[error("aborted by user")]
    Aborted,
    #[error("state directory {0} is locked by another bbl process")]
    Locked(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
