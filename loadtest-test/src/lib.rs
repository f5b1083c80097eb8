//! Test utilities for the load test.
//!
//! This crate provides an in-process mock of the target API and a test logger. See the modules for
//! all available utilities.

pub mod server;
pub mod tracing;
