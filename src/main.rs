//! Binary entry point for the armada CLI.

use std::io::{self, Write};
use std::process;

use clap::Parser;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use armada::{
    LogReporter, ProvisionOrchestrator, ProvisionRequest, RackspaceClient, RackspaceClientError,
    RackspaceConfig, RunError, TrackError, logging,
};

mod cli;
use cli::Cli;

const EXIT_OK: i32 = 0;
const EXIT_LOGGING: i32 = 1;
const EXIT_AUTH: i32 = 2;
const EXIT_CREDENTIALS: i32 = 3;
const EXIT_LOOKUP: i32 = 4;
const EXIT_BUILD_FAILED: i32 = 5;
const EXIT_INTERRUPTED: i32 = 130;

#[derive(Debug, Error)]
enum CliError {
    #[error("credentials error: {0}")]
    Credentials(String),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("{0}")]
    Lookup(String),
}

impl CliError {
    const fn exit_code(&self) -> i32 {
        match self {
            Self::Credentials(_) => EXIT_CREDENTIALS,
            Self::Auth(_) => EXIT_AUTH,
            Self::Lookup(_) => EXIT_LOOKUP,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logging comes up before anything else so every later failure lands in
    // the log file as well as on the console.
    let guard = match logging::init(&cli.logpath, cli.verbose) {
        Ok(guard) => guard,
        Err(err) => {
            write_error(io::stderr(), &err);
            process::exit(EXIT_LOGGING);
        }
    };

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            error!("{err}");
            err.exit_code()
        }
    };

    // The guard flushes the non-blocking file writer; process::exit skips
    // destructors, so drop it explicitly first.
    drop(guard);
    process::exit(exit_code);
}

async fn run(cli: Cli) -> Result<i32, CliError> {
    let config = RackspaceConfig::load_without_cli_args()
        .map_err(|err| CliError::Credentials(err.to_string()))?
        .with_region(&cli.region);

    let shutdown = CancellationToken::new();
    let signal_cancel = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; finishing the current pass");
            signal_cancel.cancel();
        }
    });

    let client = RackspaceClient::authenticate(&config)
        .await
        .map_err(|err| match err {
            RackspaceClientError::Config(message) => CliError::Credentials(message),
            other => CliError::Auth(other.to_string()),
        })?;

    let request = ProvisionRequest::builder()
        .name_prefix(cli.prefix)
        .image(cli.image)
        .ram_mb(cli.size)
        .metadata(cli.meta)
        .count(usize::from(cli.count))
        .build()
        .map_err(|err| CliError::Lookup(err.to_string()))?;

    let orchestrator = ProvisionOrchestrator::new(client, LogReporter);
    match orchestrator.execute(&request, &shutdown).await {
        Ok(outcome) => {
            if shutdown.is_cancelled() {
                warn!("Build requests interrupted; partial results reported above");
                return Ok(EXIT_INTERRUPTED);
            }
            if outcome.ok() {
                warn!("Build requests completed");
                Ok(EXIT_OK)
            } else {
                warn!("'Build requests completed' - with errors (see above for details)");
                Ok(EXIT_BUILD_FAILED)
            }
        }
        Err(RunError::Track(TrackError::DeadlineExceeded {
            waited_secs,
            pending,
            ..
        })) => {
            warn!(
                "'Build requests completed' - with errors: {pending} instance(s) still building after {waited_secs}s"
            );
            Ok(EXIT_BUILD_FAILED)
        }
        Err(err) => Err(CliError::Lookup(err.to_string())),
    }
}

fn write_error(mut target: impl Write, err: &impl std::fmt::Display) {
    writeln!(target, "{err}").ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_map_each_failure_class() {
        assert_eq!(
            CliError::Credentials(String::from("missing")).exit_code(),
            EXIT_CREDENTIALS
        );
        assert_eq!(
            CliError::Auth(String::from("rejected")).exit_code(),
            EXIT_AUTH
        );
        assert_eq!(
            CliError::Lookup(String::from("image")).exit_code(),
            EXIT_LOOKUP
        );
    }

    #[test]
    fn write_error_renders_the_display_form() {
        let mut buf = Vec::new();
        let err = CliError::Auth(String::from("bad key"));
        write_error(&mut buf, &err);
        let rendered = String::from_utf8(buf).unwrap_or_else(|decode| panic!("utf8: {decode}"));
        assert!(
            rendered.contains("authentication failed: bad key"),
            "rendered: {rendered}"
        );
    }
}
