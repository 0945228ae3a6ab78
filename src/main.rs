mod cli;
mod commands;
mod config;
mod topology;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use config::ConfigError;
use std::io;
use std::process::ExitCode;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Progress is reported through the log, so info is the baseline
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Warn
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(&e),
    }
}

fn run(cli: Cli) -> Result<()> {
    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
    };
    let stacks = || commands::prepare(&cli.global, commands::aws_backend);

    match cli.command {
        Command::Apply { dry_run } => commands::apply::run(&ctx, &stacks()?, dry_run),
        Command::Status { json } => commands::status::run(&ctx, &stacks()?, json),
        Command::Diff => commands::diff::run(&stacks()?),
        Command::Setup => commands::lifecycle::setup(&ctx, &stacks()?),
        Command::Teardown { yes } => commands::lifecycle::teardown(&ctx, &stacks()?, yes),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "cassandra-deploy", &mut io::stdout());
            Ok(())
        }
    }
}

/// Print an error and pick the exit code for it.
fn report(err: &anyhow::Error) -> ExitCode {
    if err.is::<ConfigError>() {
        ui::error(&format!("configuration error: {err:#}"));
        return ExitCode::from(2);
    }

    if let Some(remote) = err.downcast_ref::<stackkit::Error>() {
        ui::error(&format!("remote operation failed: {err:#}"));
        ui::dim(&format!(
            "{}: {}",
            remote.category().description(),
            remote.category().advice()
        ));
        return ExitCode::FAILURE;
    }

    ui::error(&format!("{err:#}"));
    ExitCode::FAILURE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_errors_exit_with_two() {
        let err = anyhow::Error::new(ConfigError::MissingAllowIp);
        assert_eq!(report(&err), ExitCode::from(2));
    }

    #[test]
    fn test_remote_errors_exit_with_one() {
        let err = anyhow::Error::new(stackkit::Error::AwsCliNotFound).context("wrapped");
        assert_eq!(report(&err), ExitCode::FAILURE);

        let err = anyhow::anyhow!("something else");
        assert_eq!(report(&err), ExitCode::FAILURE);
    }
}
