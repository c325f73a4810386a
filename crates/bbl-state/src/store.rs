use crate::layout::StateLayout;
use crate::types::{State, STATE_VERSION};
use crate::{fsync_dir, StateError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use tempfile::NamedTempFile;
use tracing::debug;

/// Durable home of the environment [`State`].
///
/// `set` fully overwrites the durable record and is atomic from the caller's
/// perspective: when it fails, the previously stored state is still intact.
pub trait StateStore {
    fn load(&self) -> Result<State, StateError>;

    fn set(&self, state: &State) -> Result<(), StateError>;
}

impl<T: StateStore + ?Sized> StateStore for &T {
    fn load(&self) -> Result<State, StateError> {
        (**self).load()
    }

    fn set(&self, state: &State) -> Result<(), StateError> {
        (**self).set(state)
    }
}

/// On-disk envelope: the state fields plus a checksum over them.
#[derive(Serialize, Deserialize)]
struct StateFile {
    #[serde(flatten)]
    state: State,
    /// blake3 of the pretty-printed state. `None` for hand-written files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    checksum: Option<String>,
}

fn compute_checksum(state: &State) -> Result<String, StateError> {
    let json = serde_json::to_string_pretty(state)?;
    Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
}

/// [`StateStore`] backed by `bbl-state.json` in a state directory.
pub struct FileStateStore {
    layout: StateLayout,
}

impl FileStateStore {
    pub fn new(layout: StateLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &StateLayout {
        &self.layout
    }

    pub fn exists(&self) -> bool {
        self.layout.state_file().exists()
    }

    fn remove(&self) -> Result<(), StateError> {
        let path = self.layout.state_file();
        if path.exists() {
            fs::remove_file(&path)?;
            fsync_dir(self.layout.root())?;
            debug!("removed {}", path.display());
        }
        Ok(())
    }
}

impl StateStore for FileStateStore {
    fn load(&self) -> Result<State, StateError> {
        let path = self.layout.state_file();
        if !path.exists() {
            return Ok(State::default());
        }
        let content = fs::read_to_string(&path)?;
        let file: StateFile = serde_json::from_str(&content)?;

        if file.state.version > STATE_VERSION {
            return Err(StateError::VersionMismatch {
                expected: STATE_VERSION,
                found: file.state.version,
            });
        }

        if let Some(ref expected) = file.checksum {
            let actual = compute_checksum(&file.state)?;
            if actual != *expected {
                return Err(StateError::IntegrityFailure {
                    path: path.display().to_string(),
                    expected: expected.clone(),
                    actual,
                });
            }
        }

        Ok(file.state)
    }

    /// Writing an empty state deletes the state file.
    fn set(&self, state: &State) -> Result<(), StateError> {
        if state.is_empty() {
            return self.remove();
        }

        self.layout.initialize()?;
        let file = StateFile {
            state: state.clone(),
            checksum: Some(compute_checksum(state)?),
        };
        let content = serde_json::to_string_pretty(&file)?;

        let dir = self.layout.root();
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.layout.state_file())
            .map_err(|e| StateError::Io(e.error))?;
        fsync_dir(dir)?;

        debug!(
            "wrote {} ({} bytes)",
            self.layout.state_file().display(),
            content.len()
        );
        Ok(())
    }
}
