use crate::exec::run_tool;
use crate::outputs::TerraformOutputs;
use crate::ManagerError;
use bbl_state::{Iaas, State};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const TFSTATE: &str = "terraform.tfstate";
const TFVARS: &str = "terraform.tfvars.json";

/// Provisions the IaaS resources an environment needs.
pub trait TerraformManager: Send + Sync {
    /// Create or converge infrastructure; returns the state with the new
    /// terraform state recorded.
    ///
    /// A failure that may have left resources behind is reported as
    /// [`ManagerError::PartialFailure`] carrying the partial state.
    /// A run that succeeds without leaving a readable state file is an error.
    fn apply(&self, state: &State) -> Result<State, ManagerError>;

    /// Tear down everything recorded in the terraform state.
    fn destroy(&self, state: &State) -> Result<State, ManagerError>;

    /// Read-only view of what is currently provisioned.
    fn get_outputs(&self, state: &State) -> Result<TerraformOutputs, ManagerError>;
}

/// Drives the `terraform` binary over a template directory.
///
/// The terraform state lives in [`State::tf_state`]; the working directory
/// only holds a transient copy while a command runs.
pub struct TerraformCli {
    bin: String,
    template_dir: PathBuf,
    work_dir: PathBuf,
}

impl TerraformCli {
    pub fn new(bin: impl Into<String>, template_dir: PathBuf, work_dir: PathBuf) -> Self {
        Self {
            bin: bin.into(),
            template_dir,
            work_dir,
        }
    }

    fn tfstate_path(&self) -> PathBuf {
        self.work_dir.join(TFSTATE)
    }

    fn prepare(&self, state: &State) -> Result<(), ManagerError> {
        fs::create_dir_all(&self.work_dir)?;
        copy_templates(&self.template_dir, &self.work_dir)?;

        let vars = serde_json::to_string_pretty(&input_variables(state)?)?;
        crate::exec::write_secret(&self.work_dir.join(TFVARS), &vars)?;

        if state.tf_state.is_empty() {
            let _ = fs::remove_file(self.tfstate_path());
        } else {
            crate::exec::write_secret(&self.tfstate_path(), &state.tf_state)?;
        }
        Ok(())
    }

    fn read_tfstate(&self) -> Result<String, ManagerError> {
        let path = self.tfstate_path();
        match fs::read_to_string(&path) {
            Ok(content) if !content.trim().is_empty() => Ok(content),
            Ok(_) => Err(self.lost_tfstate(&path, "file is empty")),
            Err(e) => Err(self.lost_tfstate(&path, &e.to_string())),
        }
    }

    fn lost_tfstate(&self, path: &Path, reason: &str) -> ManagerError {
        ManagerError::ExecFailed {
            tool: self.bin.clone(),
            message: format!("could not read {}: {reason}", path.display()),
        }
    }

    fn terraform(&self, args: &[&str]) -> Result<String, ManagerError> {
        run_tool(
            &self.bin,
            args,
            Some(&self.work_dir),
            &[("TF_IN_AUTOMATION", "1")],
        )
    }

    fn cleanup(&self) {
        for name in [TFVARS, TFSTATE, "terraform.tfstate.backup"] {
            let _ = fs::remove_file(self.work_dir.join(name));
        }
    }

    /// Run a mutating terraform subcommand and capture the resulting state,
    /// including on failure.
    fn converge(&self, state: &State, subcommand: &str) -> Result<State, ManagerError> {
        self.prepare(state)?;
        let result = self
            .terraform(&["init", "-input=false", "-no-color"])
            .and_then(|_| {
                self.terraform(&[
                    subcommand,
                    "-auto-approve",
                    "-input=false",
                    "-no-color",
                    &format!("-state={TFSTATE}"),
                ])
            });
        let tf_state = self.read_tfstate();
        self.cleanup();

        match result {
            Ok(_) => Ok(State {
                tf_state: tf_state?,
                ..state.clone()
            }),
            Err(e) => {
                warn!("terraform {subcommand} failed, keeping partial terraform state");
                // Without a readable state file the recorded one is the best
                // account of what exists.
                let tf_state = tf_state.unwrap_or_else(|_| state.tf_state.clone());
                Err(ManagerError::PartialFailure {
                    state: Box::new(State {
                        tf_state,
                        ..state.clone()
                    }),
                    message: e.to_string(),
                })
            }
        }
    }
}

impl TerraformManager for TerraformCli {
    fn apply(&self, state: &State) -> Result<State, ManagerError> {
        debug!("terraform apply in {}", self.work_dir.display());
        self.converge(state, "apply")
    }

    fn destroy(&self, state: &State) -> Result<State, ManagerError> {
        if state.tf_state.is_empty() {
            debug!("no terraform state recorded, nothing to destroy");
            return Ok(state.clone());
        }
        debug!("terraform destroy in {}", self.work_dir.display());
        let mut destroyed = self.converge(state, "destroy")?;
        destroyed.tf_state.clear();
        Ok(destroyed)
    }

    fn get_outputs(&self, state: &State) -> Result<TerraformOutputs, ManagerError> {
        if state.tf_state.is_empty() {
            return Ok(TerraformOutputs::new());
        }
        self.prepare(state)?;
        let result = self.terraform(&["output", "-json", &format!("-state={TFSTATE}")]);
        self.cleanup();
        TerraformOutputs::from_terraform_json(&result?)
    }
}

fn copy_templates(from: &Path, to: &Path) -> Result<(), ManagerError> {
    if !from.is_dir() {
        return Err(ManagerError::Config(format!(
            "terraform template directory {} does not exist",
            from.display()
        )));
    }
    for entry in fs::read_dir(from)? {
        let path = entry?.path();
        if path.extension().is_some_and(|e| e == "tf") {
            if let Some(name) = path.file_name() {
                fs::copy(&path, to.join(name))?;
            }
        }
    }
    Ok(())
}

/// Template variables: the environment identity, the SSH public key, and
/// the credentials of the recorded IaaS.
fn input_variables(state: &State) -> Result<serde_json::Value, ManagerError> {
    let iaas: Iaas = state.iaas.parse().map_err(ManagerError::Config)?;
    let mut vars = json!({
        "env_id": state.env_id,
        "ssh_public_key": state.key_pair.public_key,
        "no_director": state.no_director,
    });
    let extra = match iaas {
        Iaas::Aws => json!({
            "access_key": state.aws.access_key_id,
            "secret_key": state.aws.secret_access_key,
            "region": state.aws.region,
        }),
        Iaas::Gcp => json!({
            "credentials": state.gcp.service_account_key,
            "project_id": state.gcp.project_id,
            "zone": state.gcp.zone,
            "region": state.gcp.region,
        }),
        Iaas::Azure => json!({
            "subscription_id": state.azure.subscription_id,
            "tenant_id": state.azure.tenant_id,
            "client_id": state.azure.client_id,
            "client_secret": state.azure.client_secret,
            "location": state.azure.location,
        }),
    };
    if let (Some(vars), Some(extra)) = (vars.as_object_mut(), extra.as_object()) {
        vars.extend(extra.clone());
    }
    Ok(vars)
}
