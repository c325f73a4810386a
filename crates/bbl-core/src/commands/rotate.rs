use super::{parse_args, persist_partial, Command};
use crate::CoreError;
use bbl_managers::{BoshManager, KeyPairManager, TerraformManager};
use bbl_state::{State, StateStore, StateValidator};
use clap::Parser;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "rotate", about = "Rotate the environment's SSH key pair")]
pub(crate) struct RotateArgs {}

/// Replace the key pair and redeploy the director so it trusts the new one.
///
/// The rotated key pair is persisted before anything else happens, so a
/// failed run always re-rotates from whatever the store holds.
pub struct Rotate<'a> {
    validator: &'a dyn StateValidator,
    key_pair: &'a dyn KeyPairManager,
    terraform: &'a dyn TerraformManager,
    bosh: &'a dyn BoshManager,
    store: &'a dyn StateStore,
}

impl<'a> Rotate<'a> {
    pub fn new(
        validator: &'a dyn StateValidator,
        key_pair: &'a dyn KeyPairManager,
        terraform: &'a dyn TerraformManager,
        bosh: &'a dyn BoshManager,
        store: &'a dyn StateStore,
    ) -> Self {
        Self {
            validator,
            key_pair,
            terraform,
            bosh,
            store,
        }
    }
}

impl Command for Rotate<'_> {
    fn check_fast_fails(&self, args: &[String], state: &State) -> Result<(), CoreError> {
        self.validator.validate(args, state)?;
        parse_args::<RotateArgs>("rotate", args)?;
        Ok(())
    }

    fn execute(&self, args: &[String], state: State) -> Result<(), CoreError> {
        parse_args::<RotateArgs>("rotate", args)?;

        info!("step: rotating key pair");
        let key_pair = self.key_pair.rotate(&state)?;
        let state = state.with_key_pair(key_pair);
        self.store.set(&state)?;

        info!("step: reading terraform outputs");
        let outputs = self.terraform.get_outputs(&state)?;
        if state.no_director {
            debug!("no director managed for {}, rotation complete", state.env_id);
            return Ok(());
        }

        info!("step: updating director with the rotated key pair");
        let state = self
            .bosh
            .create_director(&state, &outputs)
            .map_err(|e| persist_partial(self.store, e))?;
        self.store.set(&state)?;
        Ok(())
    }

    fn usage(&self) -> &'static str {
        "Rotates the SSH key pair and redeploys the director with it"
    }
}
