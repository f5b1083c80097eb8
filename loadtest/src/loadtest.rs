//! Run virtual users against the target API and collect their metrics.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use tokio::time::Instant;
use tracing::Instrument;

use crate::config::Config;
use crate::http::ApiClient;
use crate::metrics::Metrics;
use crate::observability;
use crate::session::Session;
use crate::workload::{TaskSet, WaitTime};

/// Everything a virtual user needs besides its own state.
#[derive(Debug)]
struct Plan {
    tasks: TaskSet,
    wait_time: WaitTime,
    seed: u64,
    deadline: Instant,
}

/// Runs the load test described by `config` and returns the collected metrics.
///
/// Virtual users are started at `spawn_rate` per second and run until `duration` has passed since
/// the start of the test. A virtual user that cannot log in stops without affecting the others.
pub async fn run(config: &Config) -> Result<Metrics> {
    config.validate()?;

    let client = ApiClient::new(&config.host, config.request_timeout)?;
    let plan = Arc::new(Plan {
        tasks: config.task_set()?,
        wait_time: config.wait_time()?,
        seed: config.seed.unwrap_or_else(rand::random),
        deadline: Instant::now() + config.duration,
    });
    tracing::info!(
        host = %config.host,
        users = config.users,
        duration = ?config.duration,
        seed = plan.seed,
        "starting load test"
    );

    let bar = observability::progress().add(
        ProgressBar::new_spinner()
            .with_style(ProgressStyle::with_template("{spinner} {msg} {elapsed}")?)
            .with_message("Running load test:"),
    );
    bar.enable_steady_tick(Duration::from_millis(100));

    let spawn_interval = config.spawn_interval()?;
    let mut users = Vec::with_capacity(config.users);
    for index in 0..config.users {
        if index > 0 {
            tokio::select! {
                _ = tokio::time::sleep(spawn_interval) => {}
                _ = tokio::time::sleep_until(plan.deadline) => break,
            }
        }

        let span = tracing::info_span!("user", index);
        let user = run_user(index as u64, client.clone(), Arc::clone(&plan));
        users.push(tokio::spawn(user.instrument(span)));
    }

    for result in futures::future::join_all(users).await {
        if let Err(err) = result {
            tracing::error!(error = &err as &dyn std::error::Error, "virtual user panicked");
        }
    }
    bar.finish_and_clear();
    observability::progress().remove(&bar);

    tracing::info!("load test finished");
    Ok(client.recorder().take())
}

async fn run_user(index: u64, client: ApiClient, plan: Arc<Plan>) {
    let recorder = client.recorder().clone();
    recorder.user_spawned();

    let mut session = tokio::select! {
        result = Session::start(client) => match result {
            Ok(session) => session,
            Err(err) => {
                tracing::error!(error = &err as &dyn std::error::Error, "failed to log in");
                recorder.user_failed();
                return;
            }
        },
        _ = tokio::time::sleep_until(plan.deadline) => return,
    };

    let mut rng = SmallRng::seed_from_u64(plan.seed.wrapping_add(index));
    loop {
        let task = plan.tasks.next(&mut rng);
        tracing::debug!(%task, "executing task");

        tokio::select! {
            result = session.execute(task, &mut rng) => {
                if let Err(err) = &result {
                    tracing::warn!(%task, error = err as &dyn std::error::Error, "task aborted");
                }
                recorder.task(task, result.is_err());
            }
            _ = tokio::time::sleep_until(plan.deadline) => break,
        }

        tokio::select! {
            _ = tokio::time::sleep(plan.wait_time.sample(&mut rng)) => {}
            _ = tokio::time::sleep_until(plan.deadline) => break,
        }
    }

    tracing::info!(counters = ?session.counters(), "virtual user stopped");
}
