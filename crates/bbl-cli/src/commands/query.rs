//! Read-only lookups into the recorded state. None of these take the lock.

use super::{json_pretty, Failure, EXIT_FAILURE, EXIT_SUCCESS};
use bbl_state::{FileStateStore, State, StateLayout, StateStore, ValidationError};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    EnvId,
    SshKey,
    DirectorAddress,
    DirectorUsername,
    DirectorPassword,
    DirectorCaCert,
}

impl Field {
    fn key(self) -> &'static str {
        match self {
            Field::EnvId => "env_id",
            Field::SshKey => "ssh_key",
            Field::DirectorAddress => "director_address",
            Field::DirectorUsername => "director_username",
            Field::DirectorPassword => "director_password",
            Field::DirectorCaCert => "director_ca_cert",
        }
    }

    fn read(self, state: &State) -> &str {
        match self {
            Field::EnvId => &state.env_id,
            Field::SshKey => &state.key_pair.private_key,
            Field::DirectorAddress => &state.bosh.director_address,
            Field::DirectorUsername => &state.bosh.director_username,
            Field::DirectorPassword => &state.bosh.director_password,
            Field::DirectorCaCert => &state.bosh.director_ssl_ca,
        }
    }

    fn is_director_field(self) -> bool {
        !matches!(self, Field::EnvId | Field::SshKey)
    }
}

fn load(state_dir: &Path) -> Result<State, Failure> {
    let state = FileStateStore::new(StateLayout::new(state_dir)).load()?;
    if state.is_empty() {
        return Err(Failure::new(
            super::EXIT_VALIDATION_ERROR,
            ValidationError::NoState.to_string(),
        ));
    }
    Ok(state)
}

fn lookup(state: &State, field: Field) -> Result<&str, Failure> {
    if field.is_director_field() && state.no_director {
        return Err(Failure::new(
            EXIT_FAILURE,
            "environment was created with --no-director, there is no director to query",
        ));
    }
    match field.read(state) {
        "" => Err(Failure::new(
            EXIT_FAILURE,
            format!(
                "could not retrieve {}, please make sure you are targeting the proper state dir",
                field.key().replace('_', " ")
            ),
        )),
        value => Ok(value),
    }
}

pub fn run(state_dir: &Path, field: Field, json: bool) -> Result<u8, Failure> {
    let state = load(state_dir)?;
    let value = lookup(&state, field)?;
    if json {
        let mut payload = serde_json::Map::new();
        payload.insert(field.key().to_owned(), value.into());
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("{}", value.trim_end());
    }
    Ok(EXIT_SUCCESS)
}

/// The whole state as JSON, secrets included.
pub fn run_state(state_dir: &Path) -> Result<u8, Failure> {
    let state = load(state_dir)?;
    println!("{}", json_pretty(&state)?);
    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bbl_state::{Bosh, KeyPair};

    fn state() -> State {
        State {
            iaas: "aws".to_owned(),
            env_id: "bbl-env-erie".to_owned(),
            key_pair: KeyPair::new("k", "PRIVATE KEY", "PUBLIC KEY"),
            bosh: Bosh {
                director_address: "https://10.0.0.6:25555".to_owned(),
                director_username: "admin".to_owned(),
                ..Bosh::default()
            },
            ..State::default()
        }
    }

    #[test]
    fn lookup_recorded_values() {
        let s = state();
        assert_eq!(lookup(&s, Field::EnvId).unwrap(), "bbl-env-erie");
        assert_eq!(lookup(&s, Field::SshKey).unwrap(), "PRIVATE KEY");
        assert_eq!(
            lookup(&s, Field::DirectorAddress).unwrap(),
            "https://10.0.0.6:25555"
        );
    }

    #[test]
    fn lookup_missing_value_fails() {
        let err = lookup(&state(), Field::DirectorPassword).unwrap_err();
        assert!(err.message.contains("director password"), "{err}");
    }

    #[test]
    fn director_queries_fail_without_a_director() {
        let s = State {
            no_director: true,
            bosh: Bosh::default(),
            ..state()
        };
        assert!(lookup(&s, Field::DirectorUsername)
            .unwrap_err()
            .message
            .contains("--no-director"));
        assert!(lookup(&s, Field::EnvId).is_ok());
    }

    #[test]
    fn empty_state_dir_has_no_state() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(dir.path()).unwrap_err();
        assert!(err.message.contains("bbl-state.json not found"));
    }
}
