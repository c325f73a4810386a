use crate::exec::{run_tool, write_secret};
use crate::outputs::TerraformOutputs;
use crate::ManagerError;
use bbl_state::{Bosh, State};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const CREATE_ENV_STATE: &str = "state.json";
const VARS_STORE: &str = "creds.yml";
const PRIVATE_KEY: &str = "director.key";

/// Deploys the BOSH director described by a state and terraform outputs.
pub trait BoshManager: Send + Sync {
    /// Idempotent create-or-update. The returned state is authoritative and
    /// is persisted verbatim by the caller. A failure after the director VM
    /// may exist is [`ManagerError::PartialFailure`].
    fn create_director(
        &self,
        state: &State,
        outputs: &TerraformOutputs,
    ) -> Result<State, ManagerError>;

    /// Delete the director; the returned state has no director recorded.
    fn delete_director(
        &self,
        state: &State,
        outputs: &TerraformOutputs,
    ) -> Result<State, ManagerError>;
}

pub(crate) fn director_name(state: &State) -> String {
    if state.bosh.director_name.is_empty() {
        format!("bosh-{}", state.env_id)
    } else {
        state.bosh.director_name.clone()
    }
}

/// Drives `bosh create-env` / `bosh delete-env` against a director manifest.
///
/// Every string terraform output is passed to the manifest as a variable.
pub struct BoshCli {
    bin: String,
    manifest: PathBuf,
    work_dir: PathBuf,
}

impl BoshCli {
    pub fn new(bin: impl Into<String>, manifest: PathBuf, work_dir: PathBuf) -> Self {
        Self {
            bin: bin.into(),
            manifest,
            work_dir,
        }
    }

    /// Recreate the create-env working files from the recorded director.
    fn prepare(&self, state: &State) -> Result<(), ManagerError> {
        if !self.manifest.is_file() {
            return Err(ManagerError::Config(format!(
                "director manifest {} does not exist",
                self.manifest.display()
            )));
        }
        fs::create_dir_all(&self.work_dir)?;

        let create_env_state = self.work_dir.join(CREATE_ENV_STATE);
        if state.bosh.state.is_null() {
            let _ = fs::remove_file(&create_env_state);
        } else {
            write_secret(
                &create_env_state,
                &serde_json::to_string_pretty(&state.bosh.state)?,
            )?;
        }
        write_secret(&self.work_dir.join(VARS_STORE), &state.bosh.variables)?;
        write_secret(&self.work_dir.join(PRIVATE_KEY), &state.key_pair.private_key)?;
        Ok(())
    }

    fn cleanup(&self) {
        for name in [CREATE_ENV_STATE, VARS_STORE, PRIVATE_KEY] {
            let _ = fs::remove_file(self.work_dir.join(name));
        }
    }

    fn env_args(&self, subcommand: &str, state: &State, outputs: &TerraformOutputs) -> Vec<String> {
        let path = |name: &str| self.work_dir.join(name).to_string_lossy().into_owned();
        let mut args = vec![
            subcommand.to_owned(),
            self.manifest.to_string_lossy().into_owned(),
            "--state".to_owned(),
            path(CREATE_ENV_STATE),
            "--vars-store".to_owned(),
            path(VARS_STORE),
            "--var-file".to_owned(),
            format!("private_key={}", path(PRIVATE_KEY)),
            "-v".to_owned(),
            format!("director_name={}", director_name(state)),
        ];
        for (key, value) in outputs.strings() {
            args.push("-v".to_owned());
            args.push(format!("{key}={value}"));
        }
        args
    }

    fn bosh(&self, args: &[String]) -> Result<String, ManagerError> {
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        run_tool(&self.bin, &refs, Some(&self.work_dir), &[])
    }

    fn interpolate(&self, vars_store: &Path, path: &str) -> Result<String, ManagerError> {
        let vars_store = vars_store.to_string_lossy().into_owned();
        let out = self.bosh(&[
            "interpolate".to_owned(),
            vars_store,
            "--path".to_owned(),
            path.to_owned(),
        ])?;
        Ok(out.trim_end().to_owned())
    }

    fn read_director(
        &self,
        state: &State,
        outputs: &TerraformOutputs,
    ) -> Result<Bosh, ManagerError> {
        let vars_store = self.work_dir.join(VARS_STORE);
        let address_ip = outputs
            .get_str("director_external_ip")
            .or_else(|_| outputs.get_str("director_internal_ip"))?;

        let create_env_state = fs::read_to_string(self.work_dir.join(CREATE_ENV_STATE))?;
        Ok(Bosh {
            director_name: director_name(state),
            director_username: "admin".to_owned(),
            director_password: self.interpolate(&vars_store, "/admin_password")?,
            director_address: format!("https://{address_ip}:25555"),
            director_ssl_ca: self.interpolate(&vars_store, "/director_ssl/ca")?,
            director_ssl_certificate: self.interpolate(&vars_store, "/director_ssl/certificate")?,
            director_ssl_private_key: self.interpolate(&vars_store, "/director_ssl/private_key")?,
            state: serde_json::from_str(&create_env_state)?,
            variables: fs::read_to_string(&vars_store)?,
            manifest: fs::read_to_string(&self.manifest)?,
        })
    }
}

impl BoshCli {
    /// Wrap a failed create-env so the VM state and credentials it may have
    /// written survive; otherwise the next run would deploy a second VM.
    fn partial_failure(&self, state: &State, err: ManagerError) -> ManagerError {
        let mut bosh = state.bosh.clone();
        if let Some(written) = fs::read_to_string(self.work_dir.join(CREATE_ENV_STATE))
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
        {
            bosh.state = written;
        }
        if let Ok(variables) = fs::read_to_string(self.work_dir.join(VARS_STORE)) {
            if !variables.is_empty() {
                bosh.variables = variables;
            }
        }
        if bosh == state.bosh {
            return err;
        }
        warn!("bosh create-env did not complete, keeping its partial state");
        ManagerError::PartialFailure {
            state: Box::new(State {
                bosh,
                ..state.clone()
            }),
            message: err.to_string(),
        }
    }
}

impl BoshManager for BoshCli {
    fn create_director(
        &self,
        state: &State,
        outputs: &TerraformOutputs,
    ) -> Result<State, ManagerError> {
        debug!("bosh create-env in {}", self.work_dir.display());
        self.prepare(state)?;
        let result = self
            .bosh(&self.env_args("create-env", state, outputs))
            .and_then(|_| self.read_director(state, outputs))
            .map_err(|e| self.partial_failure(state, e));
        self.cleanup();

        let bosh = result?;
        debug!("director {} at {}", bosh.director_name, bosh.director_address);
        Ok(State {
            bosh,
            ..state.clone()
        })
    }

    fn delete_director(
        &self,
        state: &State,
        outputs: &TerraformOutputs,
    ) -> Result<State, ManagerError> {
        if state.bosh.is_empty() {
            return Ok(state.clone());
        }
        debug!("bosh delete-env in {}", self.work_dir.display());
        self.prepare(state)?;
        let result = self.bosh(&self.env_args("delete-env", state, outputs));
        self.cleanup();
        result?;

        Ok(State {
            bosh: Bosh::default(),
            ..state.clone()
        })
    }
}
