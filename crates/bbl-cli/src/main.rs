mod commands;

use bbl_core::{install_signal_handler, requested_help};
use bbl_managers::{check_prereqs, format_missing};
use bbl_state::StateLayout;
use clap::{Parser, Subcommand};
use commands::query::Field;
use commands::{load_config, Failure, Session, EXIT_FAILURE, EXIT_SUCCESS};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "bbl",
    version,
    about = "Bootstrap and manage BOSH director environments"
)]
struct Cli {
    /// Directory holding bbl-state.json for the environment.
    #[arg(long, env = "BBL_STATE_DIR", default_value = ".", global = true)]
    state_dir: PathBuf,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create an environment, or converge an existing one (`bbl up --help` for flags).
    #[command(disable_help_flag = true)]
    Up {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Delete the director, the infrastructure, and the state.
    #[command(disable_help_flag = true)]
    Destroy {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Rotate the SSH key pair and redeploy the director with it.
    #[command(disable_help_flag = true)]
    Rotate {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Print the environment name.
    EnvId,
    /// Print the SSH private key.
    SshKey,
    /// Print the director URL.
    DirectorAddress,
    /// Print the director admin username.
    DirectorUsername,
    /// Print the director admin password.
    DirectorPassword,
    /// Print the director CA certificate.
    DirectorCaCert,
    /// Print the full recorded state as JSON.
    State,
}

type Lifecycle = fn(&Session, &[String], bool) -> Result<u8, Failure>;

fn run(cli: Cli) -> Result<u8, Failure> {
    let json = cli.json;
    let state_dir = cli.state_dir;

    let (name, lifecycle, args): (&str, Lifecycle, Vec<String>) = match cli.command {
        Commands::Up { args } => ("up", commands::up::run, args),
        Commands::Destroy { args } => ("destroy", commands::destroy::run, args),
        Commands::Rotate { args } => ("rotate", commands::rotate::run, args),
        Commands::EnvId => return commands::query::run(&state_dir, Field::EnvId, json),
        Commands::SshKey => return commands::query::run(&state_dir, Field::SshKey, json),
        Commands::DirectorAddress => {
            return commands::query::run(&state_dir, Field::DirectorAddress, json)
        }
        Commands::DirectorUsername => {
            return commands::query::run(&state_dir, Field::DirectorUsername, json)
        }
        Commands::DirectorPassword => {
            return commands::query::run(&state_dir, Field::DirectorPassword, json)
        }
        Commands::DirectorCaCert => {
            return commands::query::run(&state_dir, Field::DirectorCaCert, json)
        }
        Commands::State => return commands::query::run_state(&state_dir),
    };

    if let Some(help) = requested_help(name, &args) {
        print!("{help}");
        return Ok(EXIT_SUCCESS);
    }

    let config = load_config(&StateLayout::new(&state_dir))?;
    if std::env::var("BBL_SKIP_PREREQS").as_deref() != Ok("1") {
        let missing = check_prereqs(&config);
        if !missing.is_empty() {
            return Err(Failure::new(EXIT_FAILURE, format_missing(&missing)));
        }
    }

    let session = Session::open(&state_dir, &config)?;
    lifecycle(&session, &args, json)
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("BBL_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    install_signal_handler();

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(failure) => {
            eprintln!("error: {failure}");
            ExitCode::from(failure.code)
        }
    }
}
