use std::time::Duration;

use loadtest::config::{Config, PASSWORD_ENV, USERNAME_ENV, WaitTimeConfig};
use loadtest::workload::TaskWeights;
use loadtest::{Task, run};
use loadtest_test::server::TestServer;
use reqwest::Method;

fn config(server: &TestServer) -> Config {
    Config {
        host: server.url("/"),
        users: 3,
        spawn_rate: 100.0,
        duration: Duration::from_secs(1),
        wait_time: WaitTimeConfig {
            min: Duration::ZERO,
            max: Duration::from_millis(10),
        },
        request_timeout: Duration::from_secs(5),
        seed: Some(7),
        tasks: TaskWeights::default(),
    }
}

/// Runs `scenario` on a fresh runtime with login credentials in the environment.
///
/// The jail restores the environment afterwards and keeps scenarios from running concurrently.
fn with_credentials<F: Future<Output = ()>>(scenario: impl FnOnce() -> F) {
    loadtest_test::tracing::init();

    figment::Jail::expect_with(|jail| {
        jail.set_env(USERNAME_ENV, "admin");
        jail.set_env(PASSWORD_ENV, "secret");

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(scenario());

        Ok(())
    });
}

fn total_runs(metrics: &loadtest::Metrics) -> u64 {
    metrics.tasks.values().map(|task| task.runs).sum()
}

#[test]
fn runs_virtual_users() {
    with_credentials(|| async {
        let server = TestServer::builder().token("abc123").start().await;
        let metrics = run(&config(&server)).await.unwrap();

        assert_eq!(metrics.users_spawned, 3);
        assert_eq!(metrics.users_failed, 0);
        assert!(total_runs(&metrics) > 3);

        let logins = server.requests_to("POST", "/api/auth/login");
        assert_eq!(logins.len(), 3);
        let login = metrics.request(&Method::POST, "/api/auth/login").unwrap();
        assert_eq!(login.successes(), 3);

        for request in server.requests() {
            if request.path != "/api/auth/login" {
                assert_eq!(request.authorization.as_deref(), Some("Bearer abc123"));
            }
        }
    });
}

#[test]
fn disabled_tasks_never_run() {
    with_credentials(|| async {
        let server = TestServer::new().await;
        let mut only_company = config(&server);
        only_company.tasks = TaskWeights {
            browse_home: 0,
            create_user: 0,
            create_company: 1,
            add_users_to_company: 0,
            create_project: 0,
        };

        let metrics = run(&only_company).await.unwrap();
        assert!(metrics.tasks.keys().all(|task| *task == Task::CreateCompany));
        assert!(
            server
                .requests()
                .iter()
                .all(|request| request.path.starts_with("/api/company")
                    || request.path == "/api/corporate-group"
                    || request.path == "/api/auth/login")
        );
    });
}

#[test]
fn rejected_logins_stop_every_user() {
    with_credentials(|| async {
        let server = TestServer::builder().reject_login().start().await;
        let metrics = run(&config(&server)).await.unwrap();

        assert_eq!(metrics.users_spawned, 3);
        assert_eq!(metrics.users_failed, 3);
        assert!(metrics.tasks.is_empty());
        assert_eq!(server.requests().len(), 3);
    });
}

#[test]
fn users_pause_between_tasks() {
    with_credentials(|| async {
        let server = TestServer::new().await;
        let paced = Config {
            users: 1,
            wait_time: WaitTimeConfig {
                min: Duration::from_millis(300),
                max: Duration::from_millis(300),
            },
            tasks: TaskWeights {
                browse_home: 1,
                create_user: 0,
                create_company: 0,
                add_users_to_company: 0,
                create_project: 0,
            },
            ..config(&server)
        };

        let metrics = run(&paced).await.unwrap();

        // tasks start at 0ms, 300ms, 600ms and 900ms at the earliest within the 1s run
        let runs = total_runs(&metrics);
        assert!(runs >= 2, "only {runs} tasks ran");
        assert!(runs <= 4, "{runs} tasks ran despite the pause");
    });
}
