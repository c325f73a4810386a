//! Lifecycle commands.
//!
//! Every command follows one skeleton: `check_fast_fails` runs the injected
//! validator and the command's own argument checks without side effects,
//! then `execute` performs an ordered list of manager call, state
//! transform, and `set` steps. No mutating manager call ever sees a state
//! that has not been persisted, except the first call of a sequence, which
//! uses the state loaded at entry.

mod destroy;
mod rotate;
mod up;

pub use destroy::Destroy;
pub use rotate::Rotate;
pub use up::Up;

use crate::CoreError;
use bbl_managers::ManagerError;
use bbl_state::{State, StateStore};
use clap::error::ErrorKind;
use clap::Parser;

pub trait Command {
    /// Cheap, read-only precondition checks. Never calls a mutating manager
    /// operation and never persists.
    fn check_fast_fails(&self, args: &[String], state: &State) -> Result<(), CoreError>;

    /// The mutating sequence. Safe to call again after a failure with the
    /// state that was last persisted.
    fn execute(&self, args: &[String], state: State) -> Result<(), CoreError>;

    fn usage(&self) -> &'static str;
}

/// Asks the operator to confirm a destructive operation.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> std::io::Result<bool>;
}

/// Answers every prompt the same way without asking.
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

impl Confirm for FixedAnswer {
    fn confirm(&self, _prompt: &str) -> std::io::Result<bool> {
        Ok(self.0)
    }
}

/// Parse a command's own flags; `args` never includes the command name.
pub(crate) fn parse_args<A: Parser>(name: &str, args: &[String]) -> Result<A, CoreError> {
    A::try_parse_from(std::iter::once(name).chain(args.iter().map(String::as_str))).map_err(|e| {
        match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                CoreError::Help(e.render().to_string())
            }
            _ => CoreError::Usage(e.render().to_string().trim_end().to_owned()),
        }
    })
}

/// The rendered help text when `args` ask a lifecycle command for `--help`.
/// Lets the CLI answer before it checks prerequisites or locks the state dir.
pub fn requested_help(name: &str, args: &[String]) -> Option<String> {
    let parsed = match name {
        "up" => parse_args::<up::UpArgs>(name, args).map(drop),
        "destroy" => parse_args::<destroy::DestroyArgs>(name, args).map(drop),
        "rotate" => parse_args::<rotate::RotateArgs>(name, args).map(drop),
        _ => return None,
    };
    match parsed {
        Err(CoreError::Help(text)) => Some(text),
        _ => None,
    }
}

/// Surface a manager failure, first persisting whatever partial state it
/// reports so a re-run starts from what was actually provisioned.
pub(crate) fn persist_partial(store: &dyn StateStore, err: ManagerError) -> CoreError {
    if let Some(partial) = err.partial_state() {
        if let Err(set_err) = store.set(partial) {
            tracing::warn!("could not record partial state: {set_err}");
            return set_err.into();
        }
    }
    err.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bbl_state::MemoryStateStore;

    #[derive(Parser, Debug)]
    struct Flags {
        #[arg(long)]
        force: bool,
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn parse_known_flags() {
        let flags: Flags = parse_args("test", &args(&["--force"])).unwrap();
        assert!(flags.force);
    }

    #[test]
    fn unknown_flag_is_usage_error() {
        let err = parse_args::<Flags>("test", &args(&["--nope"])).unwrap_err();
        assert!(matches!(err, CoreError::Usage(ref m) if m.contains("--nope")), "{err}");
    }

    #[test]
    fn help_is_not_an_error_message() {
        let err = parse_args::<Flags>("test", &args(&["--help"])).unwrap_err();
        assert!(matches!(err, CoreError::Help(ref m) if m.contains("--force")), "{err}");
    }

    #[test]
    fn partial_state_is_persisted_before_error() {
        let store = MemoryStateStore::new();
        let partial = State {
            tf_state: "partial".to_owned(),
            ..State::default()
        };
        let err = persist_partial(
            &store,
            ManagerError::PartialFailure {
                state: Box::new(partial.clone()),
                message: "apply failed".to_owned(),
            },
        );
        assert_eq!(err.to_string(), "apply failed");
        assert_eq!(store.set_calls(), vec![partial]);
    }

    #[test]
    fn plain_failures_persist_nothing() {
        let store = MemoryStateStore::new();
        let err = persist_partial(&store, ManagerError::Failed("boom".to_owned()));
        assert_eq!(err.to_string(), "boom");
        assert_eq!(store.set_call_count(), 0);
    }

    #[test]
    fn lifecycle_help_is_answered_without_a_command() {
        let help = requested_help("up", &args(&["--help"])).unwrap();
        assert!(help.contains("--iaas"), "{help}");
        assert!(requested_help("destroy", &args(&["--skip-if-missing", "-h"]))
            .unwrap()
            .contains("--skip-if-missing"));
        assert!(requested_help("rotate", &args(&["--help"])).is_some());
        assert!(requested_help("up", &args(&["--iaas", "gcp"])).is_none());
        assert!(requested_help("destroy", &args(&["--bogus"])).is_none());
        assert!(requested_help("env-id", &args(&["--help"])).is_none());
    }

    #[test]
    fn fixed_answer() {
        assert!(FixedAnswer(true).confirm("sure?").unwrap());
        assert!(!FixedAnswer(false).confirm("sure?").unwrap());
    }
}
