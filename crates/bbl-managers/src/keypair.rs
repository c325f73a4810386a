use crate::exec::run_tool;
use crate::ManagerError;
use bbl_state::{KeyPair, State};
use std::fs;
use tracing::debug;

/// Produces the SSH key pair for an environment.
///
/// Implementations never modify the state they are given; the caller decides
/// what to persist.
pub trait KeyPairManager: Send + Sync {
    /// Return the recorded key pair if it is complete, otherwise create one.
    fn sync(&self, state: &State) -> Result<KeyPair, ManagerError>;

    /// Produce a fresh key pair to replace the recorded one.
    fn rotate(&self, state: &State) -> Result<KeyPair, ManagerError>;
}

pub(crate) fn key_pair_name(state: &State) -> String {
    if state.env_id.is_empty() {
        "keypair-bbl".to_owned()
    } else {
        format!("keypair-{}", state.env_id)
    }
}

/// Generates key pairs with the system `ssh-keygen`.
pub struct SshKeygenKeyPairManager {
    bin: String,
}

impl SshKeygenKeyPairManager {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }

    fn generate(&self, name: &str) -> Result<KeyPair, ManagerError> {
        let dir = tempfile::tempdir()?;
        let key_path = dir.path().join("id_rsa");
        let key_path_str = key_path.to_string_lossy();

        run_tool(
            &self.bin,
            &[
                "-q", "-t", "rsa", "-b", "4096", "-N", "", "-C", name, "-f", &key_path_str,
            ],
            None,
            &[],
        )?;

        let private_key = fs::read_to_string(&key_path)?;
        let public_key = fs::read_to_string(key_path.with_extension("pub"))?;
        Ok(KeyPair::new(name, private_key, public_key.trim_end()))
    }
}

impl Default for SshKeygenKeyPairManager {
    fn default() -> Self {
        Self::new("ssh-keygen")
    }
}

impl KeyPairManager for SshKeygenKeyPairManager {
    fn sync(&self, state: &State) -> Result<KeyPair, ManagerError> {
        if state.key_pair.is_complete() {
            return Ok(state.key_pair.clone());
        }
        debug!("generating key pair with {}", self.bin);
        self.generate(&key_pair_name(state))
    }

    fn rotate(&self, state: &State) -> Result<KeyPair, ManagerError> {
        debug!("rotating key pair with {}", self.bin);
        self.generate(&key_pair_name(state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_derives_from_env_id() {
        let state = State {
            env_id: "bbl-env-erie".to_owned(),
            ..State::default()
        };
        assert_eq!(key_pair_name(&state), "keypair-bbl-env-erie");
        assert_eq!(key_pair_name(&State::default()), "keypair-bbl");
    }

    #[test]
    fn sync_returns_complete_key_pair_untouched() {
        let manager = SshKeygenKeyPairManager::new("bbl-no-such-ssh-keygen");
        let state = State::default().with_key_pair(KeyPair::new("k", "priv", "pub"));
        assert_eq!(manager.sync(&state).unwrap(), state.key_pair);
    }

    #[test]
    fn missing_ssh_keygen_is_reported() {
        let manager = SshKeygenKeyPairManager::new("bbl-no-such-ssh-keygen");
        let err = manager.rotate(&State::default()).unwrap_err();
        assert!(matches!(err, ManagerError::ExecFailed { .. }));
    }
}
