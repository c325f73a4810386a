//! Read-only consistency checks run before any command mutates anything.

use crate::types::{Iaas, State};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error(
        "bbl-state.json not found, ensure you're running this command in the proper state directory or create a new environment with bbl up"
    )]
    NoState,
    #[error("{0}")]
    UnknownIaas(String),
    #[error("bbl-state.json records an environment without an iaas, re-create it with bbl up --iaas")]
    MissingIaas,
    #[error("--iaas is required when creating a new environment")]
    IaasRequired,
    #[error("{iaas} environment is missing required field '{field}'")]
    MissingField { iaas: Iaas, field: &'static str },
    #[error("key pair '{0}' is incomplete: name, private key and public key must all be set")]
    PartialKeyPair(String),
    #[error("state records a director although the environment was created with --no-director")]
    DirectorOnNoDirectorEnv,
    #[error("the environment already exists on {recorded}, cannot switch it to {requested}")]
    IaasMismatch { recorded: String, requested: String },
    #[error("the environment is named '{recorded}', cannot rename it to '{requested}'")]
    EnvIdMismatch { recorded: String, requested: String },
    #[error("director already exists, you must re-create your environment to use --no-director")]
    DirectorExists,
    #[error("{0}")]
    Rejected(String),
}

/// Precondition check for a command, run before any manager is invoked.
pub trait StateValidator {
    fn validate(&self, args: &[String], state: &State) -> Result<(), ValidationError>;
}

impl<T: StateValidator + ?Sized> StateValidator for &T {
    fn validate(&self, args: &[String], state: &State) -> Result<(), ValidationError> {
        (**self).validate(args, state)
    }
}

/// Default validator: structural consistency of whatever is recorded.
///
/// The arguments are not inspected; argument checks belong to each command.
#[derive(Debug, Clone, Copy, Default)]
pub struct StateConsistencyValidator {
    require_existing: bool,
}

impl StateConsistencyValidator {
    /// For commands that operate on an environment that must already exist.
    pub fn existing() -> Self {
        Self {
            require_existing: true,
        }
    }

    /// For commands that may create the environment.
    pub fn optional() -> Self {
        Self {
            require_existing: false,
        }
    }
}

impl StateValidator for StateConsistencyValidator {
    fn validate(&self, _args: &[String], state: &State) -> Result<(), ValidationError> {
        if state.is_empty() {
            return if self.require_existing {
                Err(ValidationError::NoState)
            } else {
                Ok(())
            };
        }

        if !state.iaas.is_empty() {
            let iaas: Iaas = state.iaas.parse().map_err(ValidationError::UnknownIaas)?;
            check_credentials(iaas, state)?;
        } else if self.require_existing {
            return Err(ValidationError::MissingIaas);
        }

        if !state.key_pair.is_empty() && !state.key_pair.is_complete() {
            return Err(ValidationError::PartialKeyPair(state.key_pair.name.clone()));
        }

        if state.no_director && !state.bosh.is_empty() {
            return Err(ValidationError::DirectorOnNoDirectorEnv);
        }

        Ok(())
    }
}

fn check_credentials(iaas: Iaas, state: &State) -> Result<(), ValidationError> {
    let required: Vec<(&'static str, &str)> = match iaas {
        Iaas::Aws => vec![
            ("accessKeyID", state.aws.access_key_id.as_str()),
            ("secretAccessKey", state.aws.secret_access_key.as_str()),
            ("region", state.aws.region.as_str()),
        ],
        Iaas::Gcp => vec![
            ("serviceAccountKey", state.gcp.service_account_key.as_str()),
            ("projectID", state.gcp.project_id.as_str()),
            ("zone", state.gcp.zone.as_str()),
            ("region", state.gcp.region.as_str()),
        ],
        Iaas::Azure => vec![
            ("subscriptionID", state.azure.subscription_id.as_str()),
            ("tenantID", state.azure.tenant_id.as_str()),
            ("clientID", state.azure.client_id.as_str()),
            ("clientSecret", state.azure.client_secret.as_str()),
        ],
    };
    match required.iter().find(|(_, value)| value.is_empty()) {
        Some(&(field, _)) => Err(ValidationError::MissingField { iaas, field }),
        None => Ok(()),
    }
}
