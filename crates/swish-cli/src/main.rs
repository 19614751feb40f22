//! swish CLI entry point.
//!
//! Usage:
//!   swish -c <command>          # Execute one command line and exit
//!   swish script.swish          # Run each line of a script
//!   swish --config <path> ...   # Use an explicit config file

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use swish_kernel::{Shell, ShellConfig};

fn main() -> ExitCode {
    // Initialize tracing (respects RUST_LOG env var). Stdout belongs to the
    // pipeline, so logs go to stderr.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("swish: {e:?}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let mut args: Vec<String> = env::args().skip(1).collect();

    let config_path = take_config_arg(&mut args)?;

    match args.first().map(|s| s.as_str()) {
        None | Some("--help" | "-h") => {
            print_help();
            Ok(if args.is_empty() {
                ExitCode::from(2)
            } else {
                ExitCode::SUCCESS
            })
        }

        Some("--version" | "-V") => {
            println!("swish {}", env!("CARGO_PKG_VERSION"));
            Ok(ExitCode::SUCCESS)
        }

        Some("-c") => {
            let cmd = args.get(1).context("-c requires a command argument")?;
            let shell = build_shell(config_path)?;
            Ok(run_command(&shell, cmd))
        }

        Some(path) if !path.starts_with('-') => {
            let shell = build_shell(config_path)?;
            run_script(&shell, path)
        }

        Some(unknown) => {
            eprintln!("Unknown option: {unknown}");
            eprintln!("Run 'swish --help' for usage.");
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Remove `--config <path>` / `--config=<path>` from the argument list.
fn take_config_arg(args: &mut Vec<String>) -> Result<Option<PathBuf>> {
    let Some(pos) = args
        .iter()
        .position(|a| a == "--config" || a.starts_with("--config="))
    else {
        return Ok(None);
    };

    let arg = args.remove(pos);
    if let Some(path) = arg.strip_prefix("--config=") {
        return Ok(Some(PathBuf::from(path)));
    }

    anyhow::ensure!(pos < args.len(), "--config requires a path argument");
    Ok(Some(PathBuf::from(args.remove(pos))))
}

fn build_shell(config_path: Option<PathBuf>) -> Result<Shell> {
    let config = match config_path {
        Some(path) => ShellConfig::load_from(&path)?,
        None => ShellConfig::load().context("Failed to load configuration")?,
    };
    tracing::debug!(?config, "loaded configuration");
    Ok(Shell::new(config))
}

fn print_help() {
    println!(
        r#"swish v{}

Usage:
  swish -c <command>           Execute a command line and exit
  swish <script>               Run each line of a script file

Options:
  -c <command>                 Execute command string and exit
  --config <path>              Read configuration from <path>
  -h, --help                   Show this help
  -V, --version                Show version

Examples:
  swish -c 'echo hello | tr a-z A-Z'
  swish build.swish
"#,
        env!("CARGO_PKG_VERSION")
    );
}

/// Execute a command line. Exit status reflects only whether every segment
/// could be launched.
fn run_command(shell: &Shell, cmd: &str) -> ExitCode {
    match shell.execute(cmd) {
        Ok(status) => {
            tracing::debug!(
                segments = status.segments,
                failures = status.failures(),
                "command finished"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("swish: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Run a script file line by line.
///
/// Blank lines and `#` comments are skipped, as is a leading shebang.
/// Every line runs even if an earlier one failed.
fn run_script(shell: &Shell, path: &str) -> Result<ExitCode> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read script: {path}"))?;

    let mut failed = false;
    for (lineno, line) in source.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Err(e) = shell.execute(line) {
            eprintln!("swish: {path}:{}: {e}", lineno + 1);
            failed = true;
        }
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
