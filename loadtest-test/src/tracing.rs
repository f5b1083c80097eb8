use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Filter used when `RUST_LOG` is not set: everything from the load test, only errors otherwise.
const DEFAULT_FILTER: &str = "error,loadtest=trace,loadtest_test=trace";

/// Initialize the logger for testing.
///
/// Logs go to the output captured by the Rust test runner, so they only show for failing tests.
/// `RUST_LOG` replaces the default filter, for example `RUST_LOG=loadtest=debug,reqwest=trace`.
/// Calling this more than once is fine.
///
/// # Example
///
/// ```
/// loadtest_test::tracing::init();
/// ```
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let format = tracing_subscriber::fmt::layer()
        .compact()
        .with_target(true)
        .with_test_writer();

    tracing_subscriber::registry()
        .with(format)
        .with(filter)
        .try_init()
        .ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_keeps_load_test_logs() {
        let filter = EnvFilter::new(DEFAULT_FILTER);
        assert_eq!(
            filter.max_level_hint(),
            Some(tracing_subscriber::filter::LevelFilter::TRACE)
        );
    }

    #[test]
    fn init_is_idempotent() {
        init();
        init();
    }
}
