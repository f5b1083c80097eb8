//! Request and task statistics collected during a load test, and their console report.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use sketches_ddsketch::DDSketch;
use yansi::Paint;

use crate::workload::Task;

/// Identifies a group of requests in the statistics.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct RequestKey {
    /// The request name, usually the path.
    pub name: String,
    /// The HTTP method.
    pub method: String,
}

impl RequestKey {
    /// Creates a key for the given method and name.
    pub fn new(method: &reqwest::Method, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method: method.as_str().to_owned(),
        }
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.name)
    }
}

/// Statistics of all requests recorded under one [`RequestKey`].
#[derive(Default)]
pub struct RequestMetrics {
    /// Latency of successful requests, in seconds.
    pub timing: DDSketch,
    /// Number of failed requests.
    pub failures: u64,
    /// Failed requests by reason, such as `"404 Not Found"`.
    pub failure_reasons: BTreeMap<String, u64>,
}

impl fmt::Debug for RequestMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // `DDSketch` does not implement `Debug`.
        f.debug_struct("RequestMetrics")
            .field("successes", &self.successes())
            .field("failures", &self.failures)
            .field("failure_reasons", &self.failure_reasons)
            .finish_non_exhaustive()
    }
}

impl RequestMetrics {
    /// Number of successful requests.
    pub fn successes(&self) -> u64 {
        self.timing.count() as u64
    }

    /// Number of requests, successful or not.
    pub fn total(&self) -> u64 {
        self.successes() + self.failures
    }

    fn merge(&mut self, other: &RequestMetrics) {
        // Sketches created with the default config always merge.
        self.timing.merge(&other.timing).ok();
        self.failures += other.failures;
        for (reason, count) in &other.failure_reasons {
            *self.failure_reasons.entry(reason.clone()).or_default() += count;
        }
    }
}

/// How often a task ran, and how often it was aborted by an error.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TaskMetrics {
    /// Number of executions.
    pub runs: u64,
    /// Number of executions that ended with an error.
    pub errors: u64,
}

/// All statistics of a load test run.
#[derive(Debug, Default)]
pub struct Metrics {
    /// Request statistics, grouped by method and name.
    pub requests: BTreeMap<RequestKey, RequestMetrics>,
    /// Task statistics.
    pub tasks: BTreeMap<Task, TaskMetrics>,
    /// Virtual users that were spawned.
    pub users_spawned: u64,
    /// Virtual users that stopped because they could not log in.
    pub users_failed: u64,
}

impl Metrics {
    /// Statistics for a single request group, if any request was recorded for it.
    pub fn request(&self, method: &reqwest::Method, name: &str) -> Option<&RequestMetrics> {
        self.requests.get(&RequestKey::new(method, name))
    }

    /// Sum of all request groups.
    pub fn totals(&self) -> RequestMetrics {
        let mut totals = RequestMetrics::default();
        for metrics in self.requests.values() {
            totals.merge(metrics);
        }
        totals
    }
}

/// A handle to [`Metrics`] shared by all virtual users of a run.
#[derive(Clone, Debug, Default)]
pub struct Recorder(Arc<Mutex<Metrics>>);

impl Recorder {
    fn with<R>(&self, f: impl FnOnce(&mut Metrics) -> R) -> R {
        let mut metrics = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut metrics)
    }

    /// Records a successful request.
    pub fn success(&self, key: RequestKey, elapsed: Duration) {
        self.with(|metrics| {
            let entry = metrics.requests.entry(key).or_default();
            entry.timing.add(elapsed.as_secs_f64());
        })
    }

    /// Records a failed request along with the reason of the failure.
    pub fn failure(&self, key: RequestKey, reason: String) {
        self.with(|metrics| {
            let entry = metrics.requests.entry(key).or_default();
            entry.failures += 1;
            *entry.failure_reasons.entry(reason).or_default() += 1;
        })
    }

    /// Records the execution of a task.
    pub fn task(&self, task: Task, failed: bool) {
        self.with(|metrics| {
            let entry = metrics.tasks.entry(task).or_default();
            entry.runs += 1;
            if failed {
                entry.errors += 1;
            }
        })
    }

    /// Records a virtual user being spawned.
    pub fn user_spawned(&self) {
        self.with(|metrics| metrics.users_spawned += 1)
    }

    /// Records a virtual user stopping because it could not log in.
    pub fn user_failed(&self) {
        self.with(|metrics| metrics.users_failed += 1)
    }

    /// Takes the collected metrics out of this recorder, leaving it empty.
    pub fn take(&self) -> Metrics {
        self.with(std::mem::take)
    }
}

/// Prints the statistics of a run that lasted `duration` to stdout.
pub fn print_report(metrics: &Metrics, duration: Duration) {
    println!();
    println!(
        "{} ({} spawned, {} failed to log in)",
        "## Users".bold(),
        metrics.users_spawned.bold(),
        metrics.users_failed.bold()
    );

    println!();
    println!("{}", "## Tasks".bold());
    for (task, task_metrics) in &metrics.tasks {
        print!("  {}: {} runs", task.name().blue(), task_metrics.runs.bold());
        if task_metrics.errors > 0 {
            print!(
                ", {}",
                format!("{} ERRORS", task_metrics.errors).bold().red()
            );
        }
        println!();
    }

    println!();
    println!("{}", "## Requests".bold());
    for (key, request_metrics) in &metrics.requests {
        print_request(&key.to_string(), request_metrics, duration);
    }

    println!();
    println!("{}", "## TOTALS".bold());
    print_request("ALL", &metrics.totals(), duration);
}

fn print_request(label: &str, metrics: &RequestMetrics, duration: Duration) {
    print!("{} ({} ops", label.bold().green(), metrics.total().bold());
    if metrics.failures > 0 {
        print!(
            ", {}",
            format!("{} FAILURES", metrics.failures).bold().red()
        );
    }
    println!(")");

    print_ops(metrics.total(), duration);
    if metrics.timing.count() > 0 {
        print_percentiles(&metrics.timing, Duration::from_secs_f64);
    } else {
        println!();
    }

    for (reason, count) in &metrics.failure_reasons {
        println!("  {} {reason}", format!("{count}x").red());
    }
}

fn print_percentiles<T: fmt::Debug>(sketch: &DDSketch, map: impl Fn(f64) -> T) {
    let quantile = |q| sketch.quantile(q).ok().flatten().unwrap_or_default();

    let avg = map(sketch.sum().unwrap_or_default() / sketch.count() as f64);
    let p50 = map(quantile(0.5));
    let p90 = map(quantile(0.9));
    let p99 = map(quantile(0.99));
    println!(
        "; avg: {:.2?}; p50: {p50:.2?}; p90: {p90:.2?}; p99: {p99:.2?}",
        avg.bold()
    );
}

fn print_ops(ops: u64, duration: Duration) {
    let ops_ps = ops as f64 / duration.as_secs_f64();
    print!("  {:.2} requests/s", ops_ps.bold());
}
