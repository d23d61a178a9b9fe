//! `fusebox` command line tool.
//!
//! Breaker state lives in a JSON snapshot file, so a breaker survives across
//! invocations. Typical use is guarding a flaky cron job:
//!
//! ```text
//! fusebox --config fusebox.toml exec backup -- rsync -a /data remote:/data
//! ```
//!
//! Exit codes for `exec`: the child's own code, 75 when the breaker rejects
//! the call, 124 when the call times out.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tokio::process::Command;

use fusebox::config::{load_config, FuseboxConfig};
use fusebox::observability::logging::init_logging;
use fusebox::{Breakers, CircuitError, CircuitStatus, Fuse, FuseStore, MemoryStore};

const EXIT_OK: u8 = 0;
const EXIT_FAILURE: u8 = 1;
const EXIT_REJECTED: u8 = 75;
const EXIT_TIMEOUT: u8 = 124;
const EXIT_NOT_RUN: u8 = 127;

#[derive(Parser)]
#[command(name = "fusebox")]
#[command(about = "Circuit breaker with persistent state", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// State file; overrides `store.path` from the configuration.
    #[arg(short, long)]
    state: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show breaker records and their observed status
    Status {
        /// Only this breaker
        name: Option<String>,
    },
    /// Trip a breaker by hand
    Open { name: String },
    /// Reset a breaker by hand
    Close { name: String },
    /// Write every configured breaker into the state file
    Apply,
    /// Run a command under a breaker
    Exec {
        name: String,

        /// Call timeout for this breaker, in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Command and arguments
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },
}

#[derive(Serialize)]
struct StatusReport {
    #[serde(flatten)]
    fuse: Fuse,
    status: CircuitStatus,
}

#[derive(Debug, Error)]
enum CommandError {
    #[error("no command given")]
    Empty,

    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("command exited with {0}")]
    Exit(std::process::ExitStatus),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => FuseboxConfig::default(),
    };

    init_logging(&config.observability);

    match run(cli, config).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!(error = %e, "fusebox failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: FuseboxConfig) -> Result<u8, Box<dyn std::error::Error>> {
    let state_path = cli.state.unwrap_or_else(|| PathBuf::from(&config.store.path));
    let store = MemoryStore::load_from_file(&state_path)?;
    let breakers = Breakers::new(Arc::new(store.clone())).with_defaults(config.defaults.settings());

    let code = match cli.command {
        Commands::Status { name } => {
            let names = match name {
                Some(name) => vec![name],
                None => store.names()?,
            };
            let now = SystemTime::now();
            let mut reports = Vec::with_capacity(names.len());
            for name in names {
                let fuse = store.get(&name)?.ok_or_else(|| format!("no breaker named '{}'", name))?;
                let status = CircuitStatus::of(&fuse, now);
                reports.push(StatusReport { fuse, status });
            }
            println!("{}", serde_json::to_string_pretty(&reports)?);
            return Ok(EXIT_OK);
        }
        Commands::Open { name } => {
            breakers.circuit(&name)?.open()?;
            EXIT_OK
        }
        Commands::Close { name } => {
            breakers.circuit(&name)?.close()?;
            EXIT_OK
        }
        Commands::Apply => {
            let applied = breakers.apply_config(&config)?;
            tracing::info!(count = applied, path = %state_path.display(), "Configuration applied");
            EXIT_OK
        }
        Commands::Exec { name, timeout_ms, command } => {
            let mut update = config.breaker(&name).map(|b| b.update()).unwrap_or_default();
            if let Some(ms) = timeout_ms {
                update = update.call_timeout(Duration::from_millis(ms));
            }
            let circuit = breakers.circuit_with(&name, &update)?;
            let result = circuit.run(|| run_command(&command)).await;
            exit_code_for(result)
        }
    };

    store.save_to_file()?;
    Ok(code)
}

async fn run_command(argv: &[String]) -> Result<(), CommandError> {
    let Some((program, args)) = argv.split_first() else {
        return Err(CommandError::Empty);
    };
    let status = Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .status()
        .await
        .map_err(|source| CommandError::Spawn {
            program: program.clone(),
            source,
        })?;

    if status.success() {
        Ok(())
    } else {
        Err(CommandError::Exit(status))
    }
}

/// Map the outcome of `exec` to the process exit code.
fn exit_code_for(result: Result<(), CircuitError<CommandError>>) -> u8 {
    match result {
        Ok(()) => EXIT_OK,
        Err(e) => {
            eprintln!("{}", e);
            match e {
                CircuitError::Open { .. } => EXIT_REJECTED,
                CircuitError::Timeout { .. } => EXIT_TIMEOUT,
                CircuitError::Inner(CommandError::Exit(status)) => {
                    // Signals and out-of-range codes still report failure.
                    let code = status.code().and_then(|c| u8::try_from(c).ok()).unwrap_or(EXIT_FAILURE);
                    code.max(EXIT_FAILURE)
                }
                CircuitError::Inner(CommandError::Spawn { .. } | CommandError::Empty) => EXIT_NOT_RUN,
                CircuitError::Store(_) => EXIT_FAILURE,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fusebox::StoreError;

    fn exec(state: &std::path::Path, name: &str, argv: &[&str]) -> Cli {
        let mut args = vec!["fusebox", "--state", state.to_str().unwrap(), "exec", name, "--"];
        args.extend_from_slice(argv);
        Cli::try_parse_from(args).unwrap()
    }

    fn temp_state(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("fusebox_cli_{}_{}.json", tag, std::process::id()))
    }

    #[test]
    fn test_exit_codes_for_breaker_errors() {
        assert_eq!(exit_code_for(Ok(())), 0);
        assert_eq!(exit_code_for(Err(CircuitError::Open { name: "job".into() })), 75);
        assert_eq!(
            exit_code_for(Err(CircuitError::Timeout {
                name: "job".into(),
                timeout: Duration::from_millis(10),
            })),
            124
        );
        assert_eq!(exit_code_for(Err(CircuitError::Inner(CommandError::Empty))), 127);
        assert_eq!(
            exit_code_for(Err(CircuitError::Inner(CommandError::Spawn {
                program: "missing".into(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            }))),
            127
        );
        assert_eq!(
            exit_code_for(Err(CircuitError::Store(StoreError::NotFound("job".into())))),
            1
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_code_follows_child_status() {
        use std::os::unix::process::ExitStatusExt;

        let exited = |code: i32| CircuitError::Inner(CommandError::Exit(std::process::ExitStatus::from_raw(code << 8)));
        assert_eq!(exit_code_for(Err(exited(3))), 3);
        assert_eq!(exit_code_for(Err(exited(255))), 255);

        // Killed by SIGKILL: no exit code.
        let killed = CircuitError::Inner(CommandError::Exit(std::process::ExitStatus::from_raw(9)));
        assert_eq!(exit_code_for(Err(killed)), 1);
    }

    #[tokio::test]
    async fn test_missing_program_is_not_run() {
        let err = run_command(&["fusebox-no-such-program".to_string()]).await.unwrap_err();
        assert!(matches!(err, CommandError::Spawn { ref program, .. } if program == "fusebox-no-such-program"));
        assert!(matches!(run_command(&[]).await, Err(CommandError::Empty)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exec_state_spans_invocations() {
        let state = temp_state("exec");
        std::fs::remove_file(&state).unwrap_or_default();
        let mut config = FuseboxConfig::default();
        config.defaults.failure_threshold = 2;

        let failing = ["sh", "-c", "exit 3"];
        assert_eq!(run(exec(&state, "job", &failing), config.clone()).await.unwrap(), 3);
        let fuse = MemoryStore::load_from_file(&state).unwrap().get("job").unwrap().unwrap();
        assert_eq!(fuse.failure_count, 1);
        assert!(fuse.is_closed());

        // The second failure, in a fresh invocation, trips the breaker.
        assert_eq!(run(exec(&state, "job", &failing), config.clone()).await.unwrap(), 3);
        let fuse = MemoryStore::load_from_file(&state).unwrap().get("job").unwrap().unwrap();
        assert_eq!(fuse.failure_count, 2);
        assert!(fuse.is_open());

        // Rejected without running the command.
        let marker = temp_state("marker");
        let touch = ["touch", marker.to_str().unwrap()];
        assert_eq!(run(exec(&state, "job", &touch), config.clone()).await.unwrap(), 75);
        assert!(!marker.exists());

        std::fs::remove_file(&state).unwrap_or_default();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exec_timeout_exit_code() {
        let state = temp_state("timeout");
        std::fs::remove_file(&state).unwrap_or_default();
        let cli = Cli::try_parse_from([
            "fusebox",
            "--state",
            state.to_str().unwrap(),
            "exec",
            "slow",
            "--timeout-ms",
            "50",
            "--",
            "sleep",
            "5",
        ])
        .unwrap();

        assert_eq!(run(cli, FuseboxConfig::default()).await.unwrap(), 124);
        let fuse = MemoryStore::load_from_file(&state).unwrap().get("slow").unwrap().unwrap();
        assert_eq!(fuse.failure_count, 1);
        assert_eq!(fuse.call_timeout, Duration::from_millis(50));

        std::fs::remove_file(&state).unwrap_or_default();
    }
}
