use bbl_core::{Command, CoreError, Rotate};
use bbl_managers::{
    ManagerError, MockBoshManager, MockKeyPairManager, MockTerraformManager, TerraformOutputs,
};
use bbl_state::{
    Bosh, Gcp, KeyPair, MemoryStateStore, State, StateConsistencyValidator, StateStore,
    StateValidator, ValidationError,
};

struct RejectingValidator;

impl StateValidator for RejectingValidator {
    fn validate(&self, _args: &[String], _state: &State) -> Result<(), ValidationError> {
        Err(ValidationError::Rejected("failed to validate".to_owned()))
    }
}

struct Fixture {
    validator: StateConsistencyValidator,
    key_pair: MockKeyPairManager,
    terraform: MockTerraformManager,
    bosh: MockBoshManager,
    store: MemoryStateStore,
}

impl Fixture {
    fn new() -> Self {
        Self {
            validator: StateConsistencyValidator::existing(),
            key_pair: MockKeyPairManager::new(),
            terraform: MockTerraformManager::new(),
            bosh: MockBoshManager::new(),
            store: MemoryStateStore::new(),
        }
    }

    fn rotate(&self) -> Rotate<'_> {
        Rotate::new(
            &self.validator,
            &self.key_pair,
            &self.terraform,
            &self.bosh,
            &self.store,
        )
    }

    fn no_manager_called(&self) -> bool {
        self.key_pair.rotate_calls().is_empty()
            && self.key_pair.sync_calls().is_empty()
            && self.terraform.get_outputs_calls().is_empty()
            && self.terraform.apply_calls().is_empty()
            && self.bosh.create_director_calls().is_empty()
    }
}

fn key_pair_a() -> KeyPair {
    KeyPair::new("keypair-a", "private-a", "public-a")
}

fn key_pair_b() -> KeyPair {
    KeyPair::new("keypair-b", "private-b", "public-b")
}

fn director(name: &str) -> Bosh {
    Bosh {
        director_name: name.to_owned(),
        director_address: "https://10.0.0.6:25555".to_owned(),
        ..Bosh::default()
    }
}

fn gcp_state() -> State {
    State {
        iaas: "gcp".to_owned(),
        env_id: "bbl-env-erie".to_owned(),
        gcp: Gcp {
            service_account_key: "{}".to_owned(),
            project_id: "project".to_owned(),
            zone: "us-east1-b".to_owned(),
            region: "us-east1".to_owned(),
        },
        key_pair: key_pair_a(),
        tf_state: "{\"version\": 4}".to_owned(),
        ..State::default()
    }
}

#[test]
fn validator_error_stops_before_any_manager_or_set() {
    let f = Fixture::new();
    let rotate = Rotate::new(
        &RejectingValidator,
        &f.key_pair,
        &f.terraform,
        &f.bosh,
        &f.store,
    );

    let err = rotate.check_fast_fails(&[], &gcp_state()).unwrap_err();
    assert_eq!(err.to_string(), "failed to validate");
    assert!(f.no_manager_called());
    assert_eq!(f.store.set_call_count(), 0);
}

#[test]
fn missing_state_fails_fast() {
    let f = Fixture::new();
    let err = f.rotate().check_fast_fails(&[], &State::default()).unwrap_err();
    assert!(matches!(err, CoreError::Validation(ValidationError::NoState)));
    assert!(f.no_manager_called());
    assert_eq!(f.store.set_call_count(), 0);
}

#[test]
fn rotated_key_pair_is_persisted_with_everything_else_unchanged() {
    let f = Fixture::new();
    f.key_pair.returns_on_rotate(key_pair_b());
    let before = State {
        bosh: director("d1"),
        ..gcp_state()
    };

    f.rotate().execute(&[], before.clone()).unwrap();

    let calls = f.store.set_calls();
    let first = &calls[0];
    assert_eq!(first.key_pair, key_pair_b());
    assert_eq!(
        State {
            key_pair: key_pair_a(),
            ..first.clone()
        },
        before
    );
    assert_eq!(f.key_pair.rotate_calls(), vec![before]);
}

#[test]
fn infrastructure_only_environment_never_touches_the_director() {
    let f = Fixture::new();
    let state = State {
        no_director: true,
        ..gcp_state()
    };

    f.rotate().execute(&[], state).unwrap();

    assert!(f.bosh.create_director_calls().is_empty());
    assert_eq!(f.store.set_call_count(), 1);
    assert_eq!(f.terraform.get_outputs_calls().len(), 1);
}

#[test]
fn full_sequence_sets_twice_ending_with_director_state() {
    let f = Fixture::new();
    let redeployed = State {
        key_pair: key_pair_b(),
        bosh: director("d1"),
        ..gcp_state()
    };
    f.key_pair.returns_on_rotate(key_pair_b());
    f.bosh.returns_on_create(redeployed.clone());

    f.rotate().execute(&[], gcp_state()).unwrap();

    let calls = f.store.set_calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1], redeployed);
    assert_eq!(f.store.current(), redeployed);
}

#[test]
fn director_is_redeployed_from_the_persisted_state() {
    let f = Fixture::new();
    f.rotate().execute(&[], gcp_state()).unwrap();

    let persisted = f.store.set_calls()[0].clone();
    assert_eq!(f.terraform.get_outputs_calls(), vec![persisted.clone()]);
    assert_eq!(f.bosh.create_director_calls()[0].0, persisted);
}

#[test]
fn rotate_failure_stops_everything() {
    let f = Fixture::new();
    f.key_pair.fail_rotate("failed to rotate");

    let err = f.rotate().execute(&[], gcp_state()).unwrap_err();

    assert_eq!(err.to_string(), "failed to rotate");
    assert!(matches!(err, CoreError::Manager(ManagerError::Failed(_))));
    assert_eq!(f.store.set_call_count(), 0);
    assert!(f.terraform.get_outputs_calls().is_empty());
    assert!(f.bosh.create_director_calls().is_empty());
}

#[test]
fn first_set_failure_is_returned_unmodified() {
    let f = Fixture::new();
    f.store.fail_set_call(0, "failed to set state");

    let err = f.rotate().execute(&[], gcp_state()).unwrap_err();

    assert_eq!(err.to_string(), "failed to set state");
    assert!(f.terraform.get_outputs_calls().is_empty());
    assert!(f.bosh.create_director_calls().is_empty());
}

#[test]
fn outputs_failure_keeps_only_the_rotated_key_pair() {
    let f = Fixture::new();
    f.key_pair.returns_on_rotate(key_pair_b());
    f.terraform.fail_get_outputs("failed to get outputs");

    let err = f.rotate().execute(&[], gcp_state()).unwrap_err();

    assert_eq!(err.to_string(), "failed to get outputs");
    assert_eq!(f.store.set_call_count(), 1);
    assert_eq!(f.store.current().key_pair, key_pair_b());
    assert!(f.bosh.create_director_calls().is_empty());
}

#[test]
fn director_failure_leaves_rotated_key_and_old_director() {
    let f = Fixture::new();
    f.key_pair.returns_on_rotate(key_pair_b());
    f.bosh.fail_create_director("failed to create director");
    let before = State {
        bosh: director("d1"),
        ..gcp_state()
    };

    let err = f.rotate().execute(&[], before).unwrap_err();

    assert_eq!(err.to_string(), "failed to create director");
    assert_eq!(f.store.set_call_count(), 1);
    let persisted = f.store.current();
    assert_eq!(persisted.key_pair, key_pair_b());
    assert_eq!(persisted.bosh, director("d1"));
}

#[test]
fn half_finished_redeploy_records_the_new_vm_state() {
    let f = Fixture::new();
    f.key_pair.returns_on_rotate(key_pair_b());
    let before = State {
        bosh: director("d1"),
        ..gcp_state()
    };
    let redeployed_vm = Bosh {
        state: serde_json::json!({"current_vm_cid": "vm-2"}),
        ..director("d1")
    };
    f.bosh.fail_create_director_with_state(
        State {
            bosh: redeployed_vm.clone(),
            ..before.with_key_pair(key_pair_b())
        },
        "bosh failed: interpolate broke",
    );

    let err = f.rotate().execute(&[], before).unwrap_err();

    assert_eq!(err.to_string(), "bosh failed: interpolate broke");
    assert_eq!(f.store.set_call_count(), 2);
    let persisted = f.store.current();
    assert_eq!(persisted.key_pair, key_pair_b());
    assert_eq!(persisted.bosh, redeployed_vm);
}

#[test]
fn second_set_failure_after_redeploy_is_surfaced_as_is() {
    let f = Fixture::new();
    f.key_pair.returns_on_rotate(key_pair_b());
    f.store.fail_set_call(1, "failed to set state");

    let err = f.rotate().execute(&[], gcp_state()).unwrap_err();

    assert_eq!(err.to_string(), "failed to set state");
    assert_eq!(f.bosh.create_director_calls().len(), 1);
    assert_eq!(f.store.set_call_count(), 2);
    // The director was redeployed; the store still holds the first checkpoint.
    assert_eq!(f.store.current(), gcp_state().with_key_pair(key_pair_b()));
}

#[test]
fn retry_after_failed_set_behaves_like_a_first_run() {
    let failed = Fixture::new();
    failed.key_pair.returns_on_rotate(key_pair_b());
    failed.store.fail_set_call(0, "failed to set state");
    let original = gcp_state();

    failed.rotate().execute(&[], original.clone()).unwrap_err();
    assert_eq!(failed.store.current(), State::default());
    // Nothing durable changed, so the retry starts from the original state.
    failed.rotate().execute(&[], original.clone()).unwrap();

    let fresh = Fixture::new();
    fresh.key_pair.returns_on_rotate(key_pair_b());
    fresh.rotate().execute(&[], original.clone()).unwrap();

    assert_eq!(failed.key_pair.rotate_calls(), vec![original.clone(), original]);
    assert_eq!(&failed.store.set_calls()[1..], &fresh.store.set_calls()[..]);
    assert_eq!(failed.store.current(), fresh.store.current());
}

#[test]
fn happy_path_with_director() {
    let f = Fixture::new();
    let outputs = TerraformOutputs::new()
        .with("director_internal_ip", "10.0.0.6")
        .with("network", "bbl-env-erie-network");
    let returned = State {
        key_pair: key_pair_b(),
        bosh: director("d1"),
        ..gcp_state()
    };
    f.key_pair.returns_on_rotate(key_pair_b());
    f.terraform.returns_outputs(outputs.clone());
    f.bosh.returns_on_create(returned.clone());

    f.rotate().execute(&[], gcp_state()).unwrap();

    assert_eq!(
        f.store.set_calls(),
        vec![
            State {
                key_pair: key_pair_b(),
                bosh: Bosh::default(),
                ..gcp_state()
            },
            returned,
        ]
    );
    assert_eq!(f.bosh.create_director_calls()[0].1, outputs);
}

#[test]
fn infrastructure_only_scenario() {
    let f = Fixture::new();
    f.key_pair.returns_on_rotate(key_pair_b());
    let state = State {
        no_director: true,
        ..gcp_state()
    };

    f.rotate().execute(&[], state.clone()).unwrap();

    assert_eq!(
        f.store.set_calls(),
        vec![State {
            key_pair: key_pair_b(),
            ..state
        }]
    );
    assert!(f.bosh.create_director_calls().is_empty());
}

#[test]
fn load_returns_what_rotate_persisted() {
    let f = Fixture::new();
    f.rotate().execute(&[], gcp_state()).unwrap();
    assert_eq!(f.store.load().unwrap(), f.store.current());
}
