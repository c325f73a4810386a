use crate::ManagerError;
use bbl_state::StateLayout;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

/// Manager settings read from `<state-dir>/bbl.toml`.
///
/// Every key is optional; a missing file means all defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ManagerConfig {
    /// `cli` drives the real tools, `mock` uses the in-process managers.
    pub managers: String,
    pub terraform_bin: String,
    pub bosh_bin: String,
    pub ssh_keygen_bin: String,
    pub terraform_template_dir: Option<PathBuf>,
    pub director_manifest: Option<PathBuf>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            managers: "cli".to_owned(),
            terraform_bin: "terraform".to_owned(),
            bosh_bin: "bosh".to_owned(),
            ssh_keygen_bin: "ssh-keygen".to_owned(),
            terraform_template_dir: None,
            director_manifest: None,
        }
    }
}

impl ManagerConfig {
    pub fn load(layout: &StateLayout) -> Result<Self, ManagerError> {
        let path = layout.config_file();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path)?;
        toml::from_str(&content)
            .map_err(|e| ManagerError::Config(format!("{}: {e}", path.display())))
    }

    /// Relative paths resolve against the state directory.
    pub fn template_dir(&self, layout: &StateLayout) -> PathBuf {
        match &self.terraform_template_dir {
            Some(dir) => layout.root().join(dir),
            None => layout.root().join("templates").join("terraform"),
        }
    }

    pub fn manifest(&self, layout: &StateLayout) -> PathBuf {
        match &self.director_manifest {
            Some(path) => layout.root().join(path),
            None => layout
                .root()
                .join("templates")
                .join("bosh")
                .join("director.yml"),
        }
    }
}
