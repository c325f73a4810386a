pub mod destroy;
pub mod query;
pub mod rotate;
pub mod up;

use bbl_core::{interrupt_requested, Command, CoreError, StateLock};
use bbl_managers::{select_managers, ManagerConfig, ManagerError, Managers};
use bbl_state::{FileStateStore, State, StateError, StateLayout, StateStore};
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_VALIDATION_ERROR: u8 = 2;
pub const EXIT_STATE_ERROR: u8 = 3;

/// A failed command: what to print and which exit code to use.
#[derive(Debug)]
pub struct Failure {
    pub code: u8,
    pub message: String,
}

impl Failure {
    pub fn new(code: u8, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl From<CoreError> for Failure {
    fn from(e: CoreError) -> Self {
        let code = match &e {
            CoreError::Validation(_) | CoreError::Usage(_) => EXIT_VALIDATION_ERROR,
            CoreError::State(_) | CoreError::Locked(_) => EXIT_STATE_ERROR,
            _ => EXIT_FAILURE,
        };
        Self::new(code, e.to_string())
    }
}

impl From<StateError> for Failure {
    fn from(e: StateError) -> Self {
        Self::new(EXIT_STATE_ERROR, e.to_string())
    }
}

impl From<ManagerError> for Failure {
    fn from(e: ManagerError) -> Self {
        Self::new(EXIT_FAILURE, e.to_string())
    }
}

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, Failure> {
    serde_json::to_string_pretty(value)
        .map_err(|e| Failure::new(EXIT_FAILURE, format!("JSON serialization failed: {e}")))
}

/// Style `pb` as a spinner showing `msg` and start it ticking.
pub fn spinner(pb: &ProgressBar, msg: &str) {
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        pb.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
    }
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
}

/// The progress bar for a lifecycle command; none in JSON mode.
pub fn progress(json: bool) -> Option<ProgressBar> {
    (!json).then(ProgressBar::new_spinner)
}

fn finish(pb: &ProgressBar, msg: String) {
    if let Ok(style) = ProgressStyle::with_template("{msg}") {
        pb.set_style(style);
    }
    pb.finish_with_message(msg);
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    finish(pb, format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    finish(pb, format!("✗ {msg}"));
}

pub fn highlight(text: &str) -> String {
    console::Style::new().cyan().bold().apply_to(text).to_string()
}

/// Manager settings: `bbl.toml` in the state dir, then `BBL_MANAGERS`.
pub fn load_config(layout: &StateLayout) -> Result<ManagerConfig, Failure> {
    let mut config = ManagerConfig::load(layout)?;
    if let Ok(managers) = std::env::var("BBL_MANAGERS") {
        if !managers.is_empty() {
            debug!("managers overridden by BBL_MANAGERS={managers}");
            config.managers = managers;
        }
    }
    Ok(config)
}

/// Everything a mutating command runs against. Holding a session holds
/// the state-dir lock.
pub struct Session {
    pub store: FileStateStore,
    pub managers: Managers,
    _lock: StateLock,
}

impl Session {
    pub fn open(state_dir: &Path, config: &ManagerConfig) -> Result<Self, Failure> {
        let layout = StateLayout::new(state_dir);
        let lock = StateLock::acquire_or_fail(&layout.lock_file())?;
        let managers = select_managers(config, &layout)?;
        debug!(
            "locked {} with {} managers",
            layout.root().display(),
            config.managers
        );
        Ok(Self {
            store: FileStateStore::new(layout),
            managers,
            _lock: lock,
        })
    }
}

/// Load, check, then execute. `--help` among the command's own arguments
/// prints its help instead. The spinner only starts once the checks pass.
pub fn run_lifecycle(
    name: &str,
    command: &dyn Command,
    store: &dyn StateStore,
    args: &[String],
    pb: Option<&ProgressBar>,
) -> Result<u8, Failure> {
    let state = store.load()?;
    match command.check_fast_fails(args, &state) {
        Ok(()) => {}
        Err(CoreError::Help(text)) => {
            print!("{text}");
            return Ok(EXIT_SUCCESS);
        }
        Err(e) => return Err(e.into()),
    }
    if interrupt_requested() {
        return Err(CoreError::Aborted.into());
    }

    if let Some(pb) = pb {
        spinner(pb, &format!("bbl {name}: {}", command.usage()));
    }
    let result = command.execute(args, state);
    match (&result, pb) {
        (Ok(()), Some(pb)) => spin_ok(pb, &format!("bbl {name} complete")),
        (Err(_), Some(pb)) => spin_fail(pb, &format!("bbl {name} failed")),
        _ => {}
    }
    result?;

    let state = store.load()?;
    let json = pb.is_none();
    print_outcome(name, &state, json)?;
    Ok(EXIT_SUCCESS)
}

fn print_outcome(name: &str, state: &State, json: bool) -> Result<(), Failure> {
    if json {
        let payload = serde_json::json!({
            "command": name,
            "status": "ok",
            "env_id": state.env_id,
            "iaas": state.iaas,
            "director": state.has_director(),
        });
        println!("{}", json_pretty(&payload)?);
    } else if state.is_empty() {
        println!("environment removed");
    } else if state.has_director() {
        println!(
            "{} on {}: director at {}",
            highlight(&state.env_id),
            state.iaas,
            state.bosh.director_address
        );
    } else {
        println!("{} on {} (no director)", highlight(&state.env_id), state.iaas);
    }
    Ok(())
}
