//! Load test binary for the employees manager API.
//!
//! Starts a number of virtual users that log in and then repeatedly pick a weighted random task,
//! such as browsing the home page or creating a company, pausing between two tasks. See the
//! [`loadtest`] library for the tasks and the configuration.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

fn main() -> anyhow::Result<()> {
    loadtest::cli::execute()
}
