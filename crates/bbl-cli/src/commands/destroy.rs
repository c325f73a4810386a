use super::{progress, run_lifecycle, Failure, Session};
use bbl_core::{Confirm, Destroy};
use bbl_state::StateConsistencyValidator;
use indicatif::ProgressBar;
use std::io::{stdin, IsTerminal};

/// Asks on the terminal; refuses outright when there is none to ask on.
struct TerminalConfirm<'a> {
    pb: Option<&'a ProgressBar>,
}

impl TerminalConfirm<'_> {
    fn ask(prompt: &str) -> std::io::Result<bool> {
        dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .map_err(|e| std::io::Error::other(format!("prompt failed: {e}")))
    }
}

impl Confirm for TerminalConfirm<'_> {
    fn confirm(&self, prompt: &str) -> std::io::Result<bool> {
        if !stdin().is_terminal() {
            return Err(std::io::Error::other(
                "refusing to destroy without confirmation on a non-interactive terminal (pass --no-confirm)",
            ));
        }
        match self.pb {
            Some(pb) => pb.suspend(|| Self::ask(prompt)),
            None => Self::ask(prompt),
        }
    }
}

pub fn run(session: &Session, args: &[String], json: bool) -> Result<u8, Failure> {
    let validator = StateConsistencyValidator::existing();
    let managers = &session.managers;
    let pb = progress(json);
    let confirm = TerminalConfirm { pb: pb.as_ref() };
    let destroy = Destroy::new(
        &validator,
        managers.terraform.as_ref(),
        managers.bosh.as_ref(),
        &session.store,
        &confirm,
    );
    run_lifecycle("destroy", &destroy, &session.store, args, pb.as_ref())
}
