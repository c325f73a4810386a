use super::{parse_args, persist_partial, Command, Confirm};
use crate::CoreError;
use bbl_managers::{BoshManager, TerraformManager};
use bbl_state::{State, StateStore, StateValidator, ValidationError};
use clap::Parser;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "destroy", about = "Tear down an environment")]
pub(crate) struct DestroyArgs {
    /// Do not ask for confirmation.
    #[arg(long)]
    no_confirm: bool,
    /// Succeed without doing anything when there is no environment.
    #[arg(long)]
    skip_if_missing: bool,
}

/// Delete the director, then the infrastructure, then the state itself.
pub struct Destroy<'a> {
    validator: &'a dyn StateValidator,
    terraform: &'a dyn TerraformManager,
    bosh: &'a dyn BoshManager,
    store: &'a dyn StateStore,
    confirm: &'a dyn Confirm,
}

impl<'a> Destroy<'a> {
    pub fn new(
        validator: &'a dyn StateValidator,
        terraform: &'a dyn TerraformManager,
        bosh: &'a dyn BoshManager,
        store: &'a dyn StateStore,
        confirm: &'a dyn Confirm,
    ) -> Self {
        Self {
            validator,
            terraform,
            bosh,
            store,
            confirm,
        }
    }
}

impl Command for Destroy<'_> {
    fn check_fast_fails(&self, args: &[String], state: &State) -> Result<(), CoreError> {
        match self.validator.validate(args, state) {
            Err(ValidationError::NoState) if state.is_empty() => {
                // Only --skip-if-missing turns a missing environment into a no-op.
                match parse_args::<DestroyArgs>("destroy", args) {
                    Ok(flags) if flags.skip_if_missing => Ok(()),
                    Err(CoreError::Help(text)) => Err(CoreError::Help(text)),
                    _ => Err(ValidationError::NoState.into()),
                }
            }
            validated => {
                validated?;
                parse_args::<DestroyArgs>("destroy", args)?;
                Ok(())
            }
        }
    }

    fn execute(&self, args: &[String], state: State) -> Result<(), CoreError> {
        let flags = parse_args::<DestroyArgs>("destroy", args)?;
        if state.is_empty() {
            if flags.skip_if_missing {
                info!("no environment recorded, nothing to destroy");
                return Ok(());
            }
            return Err(ValidationError::NoState.into());
        }

        if !flags.no_confirm {
            let prompt = format!(
                "Are you sure you want to delete infrastructure for {}? This operation cannot be undone!",
                state.env_id
            );
            if !self.confirm.confirm(&prompt)? {
                return Err(CoreError::Aborted);
            }
        }

        let mut state = state;
        if state.has_director() {
            info!("step: deleting director");
            let outputs = self.terraform.get_outputs(&state)?;
            state = self.bosh.delete_director(&state, &outputs)?;
            self.store.set(&state)?;
        }

        info!("step: destroying infrastructure");
        let state = self
            .terraform
            .destroy(&state)
            .map_err(|e| persist_partial(self.store, e))?;
        self.store.set(&state)?;

        info!("step: removing state for {}", state.env_id);
        self.store.set(&State::default())?;
        Ok(())
    }

    fn usage(&self) -> &'static str {
        "Tears down the director and infrastructure of an environment"
    }
}
