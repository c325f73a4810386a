//! Interrupted runs against the file-backed store: whatever was persisted
//! last is what the next run starts from, and re-running completes the job.

use bbl_core::{Command, Destroy, FixedAnswer, Rotate, Up};
use bbl_managers::{MockBoshManager, MockKeyPairManager, MockTerraformManager};
use bbl_state::{
    FileStateStore, State, StateConsistencyValidator, StateError, StateLayout, StateStore,
};
use std::cell::Cell;

/// File store that dies on the `n`-th write, before touching the disk.
struct CrashingStore {
    inner: FileStateStore,
    crash_at: usize,
    writes: Cell<usize>,
}

impl CrashingStore {
    fn new(layout: StateLayout, crash_at: usize) -> Self {
        Self {
            inner: FileStateStore::new(layout),
            crash_at,
            writes: Cell::new(0),
        }
    }
}

impl StateStore for CrashingStore {
    fn load(&self) -> Result<State, StateError> {
        self.inner.load()
    }

    fn set(&self, state: &State) -> Result<(), StateError> {
        let n = self.writes.get();
        self.writes.set(n + 1);
        if n == self.crash_at {
            return Err(StateError::WriteFailed("simulated crash".to_owned()));
        }
        self.inner.set(state)
    }
}

fn gcp_flags() -> Vec<String> {
    [
        "--iaas",
        "gcp",
        "--gcp-service-account-key",
        "{}",
        "--gcp-project-id",
        "project",
        "--gcp-zone",
        "us-east1-b",
        "--gcp-region",
        "us-east1",
    ]
    .iter()
    .map(|s| (*s).to_owned())
    .collect()
}

#[test]
fn up_interrupted_at_each_checkpoint_can_be_rerun() {
    for crash_at in 0..4 {
        let dir = tempfile::tempdir().unwrap();
        let layout = StateLayout::new(dir.path());
        let validator = StateConsistencyValidator::optional();
        let (kp, tf, bosh) = (
            MockKeyPairManager::new(),
            MockTerraformManager::new(),
            MockBoshManager::new(),
        );

        let crashing = CrashingStore::new(layout.clone(), crash_at);
        let up = Up::new(&validator, &kp, &tf, &bosh, &crashing);
        let err = up.execute(&gcp_flags(), crashing.load().unwrap()).unwrap_err();
        assert_eq!(err.to_string(), "simulated crash");

        let store = FileStateStore::new(layout);
        let resumed = store.load().unwrap();
        let up = Up::new(&validator, &kp, &tf, &bosh, &store);
        up.check_fast_fails(&gcp_flags(), &resumed).unwrap();
        up.execute(&gcp_flags(), resumed).unwrap();

        let finished = store.load().unwrap();
        assert!(finished.key_pair.is_complete(), "crash_at={crash_at}");
        assert!(!finished.tf_state.is_empty(), "crash_at={crash_at}");
        assert!(!finished.bosh.is_empty(), "crash_at={crash_at}");
    }
}

#[test]
fn env_id_survives_an_interrupted_up() {
    let dir = tempfile::tempdir().unwrap();
    let layout = StateLayout::new(dir.path());
    let validator = StateConsistencyValidator::optional();
    let (kp, tf, bosh) = (
        MockKeyPairManager::new(),
        MockTerraformManager::new(),
        MockBoshManager::new(),
    );

    let crashing = CrashingStore::new(layout.clone(), 2);
    Up::new(&validator, &kp, &tf, &bosh, &crashing)
        .execute(&gcp_flags(), State::default())
        .unwrap_err();
    let recorded = FileStateStore::new(layout.clone()).load().unwrap();
    assert!(recorded.env_id.starts_with("bbl-env-"));

    let store = FileStateStore::new(layout);
    Up::new(&validator, &kp, &tf, &bosh, &store)
        .execute(&[], recorded.clone())
        .unwrap();
    assert_eq!(store.load().unwrap().env_id, recorded.env_id);
}

#[test]
fn rotate_crash_after_redeploy_leaves_rotated_key_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let layout = StateLayout::new(dir.path());
    let store = FileStateStore::new(layout.clone());
    let (kp, tf, bosh) = (
        MockKeyPairManager::new(),
        MockTerraformManager::new(),
        MockBoshManager::new(),
    );

    let optional = StateConsistencyValidator::optional();
    Up::new(&optional, &kp, &tf, &bosh, &store)
        .execute(&gcp_flags(), State::default())
        .unwrap();
    let deployed = store.load().unwrap();

    let existing = StateConsistencyValidator::existing();
    let crashing = CrashingStore::new(layout, 1);
    let rotate = Rotate::new(&existing, &kp, &tf, &bosh, &crashing);
    rotate.check_fast_fails(&[], &deployed).unwrap();
    rotate.execute(&[], deployed.clone()).unwrap_err();

    let on_disk = store.load().unwrap();
    assert_ne!(on_disk.key_pair, deployed.key_pair);
    assert_eq!(on_disk.bosh, deployed.bosh);

    // Re-running from disk converges the director onto the new key.
    Rotate::new(&existing, &kp, &tf, &bosh, &store)
        .execute(&[], on_disk.clone())
        .unwrap();
    let rotated_again = store.load().unwrap();
    assert_eq!(bosh.create_director_calls().len(), 3);
    assert_ne!(rotated_again.key_pair, on_disk.key_pair);
}

#[test]
fn destroy_removes_the_state_file() {
    let dir = tempfile::tempdir().unwrap();
    let layout = StateLayout::new(dir.path());
    let store = FileStateStore::new(layout);
    let (kp, tf, bosh) = (
        MockKeyPairManager::new(),
        MockTerraformManager::new(),
        MockBoshManager::new(),
    );

    let optional = StateConsistencyValidator::optional();
    Up::new(&optional, &kp, &tf, &bosh, &store)
        .execute(&gcp_flags(), State::default())
        .unwrap();
    assert!(store.exists());

    let existing = StateConsistencyValidator::existing();
    let yes = FixedAnswer(true);
    let destroy = Destroy::new(&existing, &tf, &bosh, &store, &yes);
    let state = store.load().unwrap();
    destroy.check_fast_fails(&[], &state).unwrap();
    destroy.execute(&[], state).unwrap();

    assert!(!store.exists());
    assert_eq!(store.load().unwrap(), State::default());
}
