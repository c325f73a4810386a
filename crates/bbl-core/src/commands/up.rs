use super::{parse_args, persist_partial, Command};
use crate::CoreError;
use bbl_managers::{BoshManager, KeyPairManager, TerraformManager};
use bbl_state::{
    generate_env_id, validate_env_id, Iaas, State, StateStore, StateValidator, ValidationError,
};
use clap::Parser;
use std::path::Path;
use tracing::{debug, info};

#[derive(Parser, Debug, Default)]
#[command(name = "up", about = "Create or converge an environment")]
pub(crate) struct UpArgs {
    /// IaaS to deploy on (aws, gcp, azure); required for a new environment.
    #[arg(long, env = "BBL_IAAS")]
    iaas: Option<String>,
    /// Environment name; generated when omitted.
    #[arg(long)]
    name: Option<String>,
    /// Provision infrastructure only, without a BOSH director.
    #[arg(long)]
    no_director: bool,

    #[arg(long, env = "BBL_AWS_ACCESS_KEY_ID", hide_env_values = true)]
    aws_access_key_id: Option<String>,
    #[arg(long, env = "BBL_AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    aws_secret_access_key: Option<String>,
    #[arg(long, env = "BBL_AWS_REGION")]
    aws_region: Option<String>,

    /// Service account key JSON, or a path to a file containing it.
    #[arg(long, env = "BBL_GCP_SERVICE_ACCOUNT_KEY", hide_env_values = true)]
    gcp_service_account_key: Option<String>,
    #[arg(long, env = "BBL_GCP_PROJECT_ID")]
    gcp_project_id: Option<String>,
    #[arg(long, env = "BBL_GCP_ZONE")]
    gcp_zone: Option<String>,
    #[arg(long, env = "BBL_GCP_REGION")]
    gcp_region: Option<String>,

    #[arg(long, env = "BBL_AZURE_SUBSCRIPTION_ID")]
    azure_subscription_id: Option<String>,
    #[arg(long, env = "BBL_AZURE_TENANT_ID")]
    azure_tenant_id: Option<String>,
    #[arg(long, env = "BBL_AZURE_CLIENT_ID")]
    azure_client_id: Option<String>,
    #[arg(long, env = "BBL_AZURE_CLIENT_SECRET", hide_env_values = true)]
    azure_client_secret: Option<String>,
    #[arg(long, env = "BBL_AZURE_LOCATION")]
    azure_location: Option<String>,
}

fn overwrite(field: &mut String, flag: Option<&String>) {
    if let Some(value) = flag {
        field.clone_from(value);
    }
}

fn read_key(value: &str) -> Result<String, CoreError> {
    let path = Path::new(value);
    if !value.trim_start().starts_with('{') && path.is_file() {
        return Ok(std::fs::read_to_string(path)?);
    }
    Ok(value.to_owned())
}

impl UpArgs {
    /// The state with every given flag applied. The env id is only set from
    /// `--name`; generating one is left to `execute`.
    fn apply_to(&self, mut state: State) -> Result<State, CoreError> {
        if let Some(iaas) = &self.iaas {
            state.iaas.clone_from(iaas);
        }
        if let Some(name) = &self.name {
            state.env_id.clone_from(name);
        }
        state.no_director |= self.no_director;

        overwrite(&mut state.aws.access_key_id, self.aws_access_key_id.as_ref());
        overwrite(&mut state.aws.secret_access_key, self.aws_secret_access_key.as_ref());
        overwrite(&mut state.aws.region, self.aws_region.as_ref());

        if let Some(key) = &self.gcp_service_account_key {
            state.gcp.service_account_key = read_key(key)?;
        }
        overwrite(&mut state.gcp.project_id, self.gcp_project_id.as_ref());
        overwrite(&mut state.gcp.zone, self.gcp_zone.as_ref());
        overwrite(&mut state.gcp.region, self.gcp_region.as_ref());

        overwrite(&mut state.azure.subscription_id, self.azure_subscription_id.as_ref());
        overwrite(&mut state.azure.tenant_id, self.azure_tenant_id.as_ref());
        overwrite(&mut state.azure.client_id, self.azure_client_id.as_ref());
        overwrite(&mut state.azure.client_secret, self.azure_client_secret.as_ref());
        overwrite(&mut state.azure.location, self.azure_location.as_ref());
        Ok(state)
    }
}

/// Create an environment, or converge an existing one to its recorded shape.
///
/// Steps: record the requested configuration, sync the key pair, apply
/// terraform, then deploy the director unless the environment is
/// infrastructure-only. Each step's result is persisted before the next.
pub struct Up<'a> {
    validator: &'a dyn StateValidator,
    key_pair: &'a dyn KeyPairManager,
    terraform: &'a dyn TerraformManager,
    bosh: &'a dyn BoshManager,
    store: &'a dyn StateStore,
}

impl<'a> Up<'a> {
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

impl Command for Up<'_> {
    fn check_fast_fails(&self, args: &[String], state: &State) -> Result<(), CoreError> {
        self.validator.validate(args, state)?;
        let flags = parse_args::<UpArgs>("up", args)?;

        match &flags.iaas {
            None if state.iaas.is_empty() => return Err(ValidationError::IaasRequired.into()),
            None => {}
            Some(requested) => {
                let _: Iaas = requested.parse().map_err(ValidationError::UnknownIaas)?;
                if !state.iaas.is_empty() && state.iaas != *requested {
                    return Err(ValidationError::IaasMismatch {
                        recorded: state.iaas.clone(),
                        requested: requested.clone(),
                    }
                    .into());
                }
            }
        }

        if let Some(name) = &flags.name {
            validate_env_id(name)?;
            if !state.env_id.is_empty() && state.env_id != *name {
                return Err(ValidationError::EnvIdMismatch {
                    recorded: state.env_id.clone(),
                    requested: name.clone(),
                }
                .into());
            }
        }

        if flags.no_director && !state.bosh.is_empty() {
            return Err(ValidationError::DirectorExists.into());
        }

        // The recorded state passed; the configuration about to be recorded
        // must pass too.
        let requested = flags.apply_to(state.clone())?;
        self.validator.validate(args, &requested)?;
        Ok(())
    }

    fn execute(&self, args: &[String], state: State) -> Result<(), CoreError> {
        let flags = parse_args::<UpArgs>("up", args)?;

        let mut state = flags.apply_to(state)?;
        if state.env_id.is_empty() {
            state.env_id = generate_env_id(chrono::Utc::now());
            debug!("generated environment name {}", state.env_id);
        }
        info!("step: recording {} environment {}", state.iaas, state.env_id);
        self.store.set(&state)?;

        info!("step: syncing key pair");
        let key_pair = self.key_pair.sync(&state)?;
        let state = state.with_key_pair(key_pair);
        self.store.set(&state)?;

        info!("step: applying terraform");
        let state = self
            .terraform
            .apply(&state)
            .map_err(|e| persist_partial(self.store, e))?;
        self.store.set(&state)?;

        info!("step: reading terraform outputs");
        let outputs = self.terraform.get_outputs(&state)?;
        if state.no_director {
            debug!("{} is infrastructure-only, skipping the director", state.env_id);
            return Ok(());
        }

        info!("step: deploying director");
        let state = self
            .bosh
            .create_director(&state, &outputs)
            .map_err(|e| persist_partial(self.store, e))?;
        self.store.set(&state)?;
        Ok(())
    }

    fn usage(&self) -> &'static str {
        "Deploys infrastructure and a BOSH director, or converges an existing environment"
    }
}
