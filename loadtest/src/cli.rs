//! Command line interface of the `loadtest` binary.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, bail};
use argh::FromArgs;

use crate::config::Config;
use crate::{loadtest, metrics, observability};

/// Load test for the employees manager API.
#[derive(Debug, FromArgs)]
struct Args {
    /// path to the YAML configuration file
    #[argh(option, short = 'c')]
    pub config: Option<PathBuf>,

    #[argh(subcommand)]
    pub command: Command,
}

#[derive(Debug, FromArgs)]
#[argh(subcommand)]
enum Command {
    Run(RunCommand),
    Version(VersionCommand),
}

/// run the load test and print its statistics
///
/// Every virtual user logs in with the credentials in `LOCUST_USERNAME` and `LOCUST_PASSWORD`.
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "run")]
struct RunCommand {
    /// base URL of the target API, overrides the configuration
    #[argh(option)]
    host: Option<String>,

    /// number of virtual users, overrides the configuration
    #[argh(option, short = 'u')]
    users: Option<usize>,

    /// duration of the test such as `90s` or `10m`, overrides the configuration
    #[argh(option, short = 'd', from_str_fn(parse_duration))]
    duration: Option<Duration>,
}

/// print the load test version
#[derive(Default, Debug, FromArgs)]
#[argh(subcommand, name = "version")]
struct VersionCommand {}

fn parse_duration(value: &str) -> Result<Duration, String> {
    humantime::parse_duration(value).map_err(|err| err.to_string())
}

/// Bootstrap the runtime and execute the CLI command.
pub fn execute() -> Result<()> {
    let args: Args = argh::from_env();

    let run = match args.command {
        Command::Version(VersionCommand {}) => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Command::Run(run) => run,
    };

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(host) = run.host {
        config.host = host;
    }
    if let Some(users) = run.users {
        config.users = users;
    }
    if let Some(duration) = run.duration {
        config.duration = duration;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("loadtest-rt")
        .enable_all()
        .build()?;
    let _runtime_guard = runtime.enter();

    observability::initialize_tracing();
    tracing::debug!(?config);

    let metrics = runtime.block_on(loadtest::run(&config))?;
    metrics::print_report(&metrics, config.duration);

    if metrics.users_spawned > 0 && metrics.users_failed == metrics.users_spawned {
        bail!("no virtual user could log in");
    }
    Ok(())
}
