//! Load test for the employees manager API.
//!
//! Each virtual user logs in once, then repeatedly executes a weighted random [`Task`], pausing for
//! a random [`WaitTime`] between two tasks. Tasks are short sequences of requests against the
//! API, such as opening the admin panel and creating a user. Every entity a virtual user creates
//! is namespaced with the random identifier of its [`Session`] and a per-user counter, so that
//! virtual users never collide.
//!
//! The default selection weights are:
//!
//! | task | weight |
//! |---|---|
//! | browse home | 10 |
//! | create user | 3 |
//! | create company | 1 |
//! | add users to company | 3 |
//! | create project | 2 |
//!
//! Failed requests are recorded in the [`Metrics`] and never stop a virtual user. Only a failed
//! login does.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod http;
pub mod loadtest;
pub mod metrics;
pub mod observability;
pub mod random;
pub mod session;
mod tasks;
pub mod workload;

pub use crate::error::{Error, Result};
pub use crate::loadtest::run;
pub use crate::metrics::Metrics;
pub use crate::session::Session;
pub use crate::workload::{Task, WaitTime};
