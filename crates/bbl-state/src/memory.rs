use crate::store::StateStore;
use crate::types::State;
use crate::StateError;
use std::collections::HashMap;
use std::sync::Mutex;

/// In-process [`StateStore`] that records every `set` it receives.
///
/// Individual `set` calls can be scripted to fail by their zero-based index,
/// which is how orchestration tests reproduce a crash between two checkpoints.
#[derive(Default)]
pub struct MemoryStateStore {
    current: Mutex<State>,
    received: Mutex<Vec<State>>,
    failures: Mutex<HashMap<usize, String>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: State) -> Self {
        Self {
            current: Mutex::new(state),
            ..Self::default()
        }
    }

    /// Make the `index`-th call to `set` fail with `message`.
    pub fn fail_set_call(&self, index: usize, message: &str) {
        lock(&self.failures).insert(index, message.to_owned());
    }

    /// Every state passed to `set`, including the ones that were rejected.
    pub fn set_calls(&self) -> Vec<State> {
        lock(&self.received).clone()
    }

    pub fn set_call_count(&self) -> usize {
        lock(&self.received).len()
    }

    /// The last successfully stored state.
    pub fn current(&self) -> State {
        lock(&self.current).clone()
    }
}

// A poisoned lock only means another test thread panicked mid-call; the
// recorded data is still the best information available.
fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> Result<State, StateError> {
        Ok(self.current())
    }

    fn set(&self, state: &State) -> Result<(), StateError> {
        let index = {
            let mut received = lock(&self.received);
            received.push(state.clone());
            received.len() - 1
        };
        if let Some(message) = lock(&self.failures).get(&index) {
            return Err(StateError::WriteFailed(message.clone()));
        }
        *lock(&self.current) = state.clone();
        Ok(())
    }
}
