use crate::bosh::{BoshCli, BoshManager};
use crate::config::ManagerConfig;
use crate::keypair::{KeyPairManager, SshKeygenKeyPairManager};
use crate::mock::{MockBoshManager, MockKeyPairManager, MockTerraformManager};
use crate::terraform::{TerraformCli, TerraformManager};
use crate::ManagerError;
use bbl_state::StateLayout;

/// The three collaborators a command drives.
pub struct Managers {
    pub key_pair: Box<dyn KeyPairManager>,
    pub terraform: Box<dyn TerraformManager>,
    pub bosh: Box<dyn BoshManager>,
}

pub fn select_managers(
    config: &ManagerConfig,
    layout: &StateLayout,
) -> Result<Managers, ManagerError> {
    match config.managers.as_str() {
        "cli" => Ok(Managers {
            key_pair: Box::new(SshKeygenKeyPairManager::new(&config.ssh_keygen_bin)),
            terraform: Box::new(TerraformCli::new(
                &config.terraform_bin,
                config.template_dir(layout),
                layout.terraform_dir(),
            )),
            bosh: Box::new(BoshCli::new(
                &config.bosh_bin,
                config.manifest(layout),
                layout.bosh_dir(),
            )),
        }),
        "mock" => Ok(Managers {
            key_pair: Box::new(MockKeyPairManager::new()),
            terraform: Box::new(MockTerraformManager::new()),
            bosh: Box::new(MockBoshManager::new()),
        }),
        other => Err(ManagerError::Unavailable(other.to_owned())),
    }
}
