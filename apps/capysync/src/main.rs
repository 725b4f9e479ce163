//! capysync entry point.

mod app;
mod config;
mod prompt;

use std::io;
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use crate::app::RunStatus;
use crate::prompt::{PromptError, Prompter};

fn main() -> ExitCode {
    // Logs go to stderr; stdout carries prompts and report lines.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    match try_main() {
        Ok(status) => status.into(),
        Err(e) => {
            eprintln!("error: {e:#}");
            RunStatus::InvalidInput.into()
        }
    }
}

fn try_main() -> anyhow::Result<RunStatus> {
    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "starting capysync");

    let config = config::Config::load()?;
    let cwd = std::env::current_dir()?;

    let stdin = io::stdin();
    let mut prompter = Prompter::new(stdin.lock(), io::stdout());
    let read_password = |label: &str| rpassword::prompt_password(label);
    let request = match prompt::gather(&mut prompter, &config, &cwd, read_password) {
        Ok(request) => request,
        Err(PromptError::InvalidAction(_)) => {
            println!("Invalid Action");
            return Ok(RunStatus::InvalidInput);
        }
        Err(e) => {
            eprintln!("{e}");
            return Ok(RunStatus::InvalidInput);
        }
    };
    drop(prompter);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(app::run(&config, request))
}
