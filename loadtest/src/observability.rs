//! Logging setup.

use std::env;
use std::io::{self, Write};
use std::sync::OnceLock;

use indicatif::MultiProgress;
use tracing::Level;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, prelude::*};

static PROGRESS: OnceLock<MultiProgress> = OnceLock::new();

/// The progress bars drawn on stderr during a run.
///
/// Log lines are written while these bars are hidden, so both can share the terminal.
pub fn progress() -> &'static MultiProgress {
    PROGRESS.get_or_init(MultiProgress::new)
}

/// Writes to stderr with all [`progress`] bars cleared for the duration of each write.
#[derive(Debug)]
struct SuspendingStderr;

impl Write for SuspendingStderr {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        progress().suspend(|| io::stderr().write(buf))
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        progress().suspend(|| io::stderr().write_all(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}

/// Installs the global `tracing` subscriber, logging to stderr.
pub fn initialize_tracing() {
    let (level, env_filter) = parse_rust_log();
    let format = tracing_subscriber::fmt::layer()
        .with_writer(|| SuspendingStderr)
        .with_target(true);

    tracing_subscriber::registry()
        .with(format.with_filter(LevelFilter::from(level)))
        .with(env_filter)
        .init();
}

/// Reads `RUST_LOG` either as a plain level or as a full filter directive.
pub fn parse_rust_log() -> (Level, EnvFilter) {
    // A plain level applies our default per-crate levels. Anything else is taken literally.
    let level = match env::var(EnvFilter::DEFAULT_ENV) {
        Ok(value) => match value.parse::<Level>() {
            Ok(level) => level,
            Err(_) => return (Level::TRACE, EnvFilter::new(value)),
        },
        Err(_) => Level::INFO,
    };

    // This is the maximum verbosity that will be logged, we filter this down to `level`.
    let env_filter = EnvFilter::new(
        "INFO,\
        hyper=WARN,\
        reqwest=INFO,\
        loadtest=TRACE,\
        ",
    );

    (level, env_filter)
}

#[cfg(test)]
mod tests {
    use indicatif::ProgressBar;

    use super::*;

    #[test]
    fn log_writes_pass_through_a_running_spinner() {
        let bar = progress().add(ProgressBar::new_spinner().with_message("running"));
        bar.tick();

        let mut writer = SuspendingStderr;
        let line = b"log line written below the spinner\n";
        assert_eq!(writer.write(line).unwrap(), line.len());
        writer.write_all(line).unwrap();
        writer.flush().unwrap();

        // the spinner keeps running after the write
        assert!(!bar.is_finished());
        bar.finish_and_clear();
        progress().remove(&bar);
    }

    #[test]
    fn progress_is_shared() {
        assert!(std::ptr::eq(progress(), progress()));
    }
}
