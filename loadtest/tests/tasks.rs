use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use loadtest::config::Credentials;
use loadtest::http::ApiClient;
use loadtest::random::RandomSource;
use loadtest::{Error, Session};
use loadtest_test::server::TestServer;
use reqwest::{Method, StatusCode};
use serde_json::json;

/// Hands out a fixed sequence of choices and checks that each is in range.
struct Scripted(VecDeque<usize>);

impl Scripted {
    fn new(choices: impl IntoIterator<Item = usize>) -> Self {
        Self(choices.into_iter().collect())
    }
}

impl RandomSource for Scripted {
    fn index(&mut self, len: usize) -> usize {
        let choice = self.0.pop_front().expect("no scripted choice left");
        assert!(choice < len, "scripted index {choice} out of 0..{len}");
        choice
    }

    fn up_to(&mut self, max: usize) -> usize {
        let choice = self.0.pop_front().expect("no scripted choice left");
        assert!(choice <= max, "scripted count {choice} out of 0..={max}");
        choice
    }
}

fn client(server: &TestServer) -> ApiClient {
    ApiClient::new(&server.url("/"), Duration::from_secs(5)).unwrap()
}

fn credentials() -> Credentials {
    Credentials {
        username: "admin".into(),
        password: "secret".to_owned().into(),
    }
}

async fn session(server: &TestServer) -> Session {
    let session = Session::bootstrap(client(server), &credentials())
        .await
        .unwrap();
    server.clear();
    session
}

fn paths(server: &TestServer) -> Vec<String> {
    server
        .requests()
        .into_iter()
        .map(|request| format!("{} {}", request.method, request.path))
        .collect()
}

#[tokio::test]
async fn bearer_token_is_attached_after_login() {
    loadtest_test::tracing::init();
    let server = TestServer::builder().token("abc123").start().await;

    let mut session = Session::bootstrap(client(&server), &credentials())
        .await
        .unwrap();
    session.browse_home().await.unwrap();

    let requests = server.requests();
    assert_eq!(requests.len(), 5);

    let login = &requests[0];
    assert_eq!(login.method, "POST");
    assert_eq!(login.path, "/api/auth/login");
    assert_eq!(login.authorization, None);
    assert_eq!(
        login.body,
        Some(json!({ "username": "admin", "password": "secret" }))
    );

    for request in &requests[1..] {
        assert_eq!(request.authorization.as_deref(), Some("Bearer abc123"));
    }
    assert_eq!(
        paths(&server)[1..],
        [
            "GET /api/auth/user",
            "GET /api/company",
            "GET /api/corporate-group",
            "GET /api/notification",
        ]
    );
}

#[tokio::test]
async fn failed_login_is_fatal() {
    let server = TestServer::builder().reject_login().start().await;
    let client = client(&server);

    let err = Session::bootstrap(client.clone(), &credentials())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Status { status, .. } if status == StatusCode::UNAUTHORIZED));

    // exactly one attempt, recorded as a failure
    assert_eq!(server.requests().len(), 1);
    let metrics = client.recorder().take();
    let login = metrics.request(&Method::POST, "/api/auth/login").unwrap();
    assert_eq!(login.failures, 1);
    assert_eq!(login.failure_reasons["401 Unauthorized"], 1);
}

#[tokio::test]
async fn virtual_user_ids_are_unique() {
    let server = TestServer::new().await;

    let mut ids = HashSet::new();
    for _ in 0..20 {
        let session = session(&server).await;
        assert!(ids.insert(session.user_id().to_owned()));
    }
}

#[tokio::test]
async fn create_user_names_are_distinct() {
    let server = TestServer::new().await;
    let mut session = session(&server).await;

    session.create_user().await.unwrap();
    assert_eq!(
        paths(&server),
        [
            "GET /api/admin/overview",
            "GET /api/admin/user",
            "POST /api/admin/user",
            "GET /api/admin/overview",
            "GET /api/admin/user",
        ]
    );

    session.create_user().await.unwrap();
    session.create_user().await.unwrap();
    assert_eq!(session.counters().users, 3);

    let created = server.requests_to("POST", "/api/admin/user");
    assert_eq!(created.len(), 3);

    let id = session.user_id();
    assert_eq!(
        created[0].body,
        Some(json!({
            "email": format!("{id}_user_0@ml.com"),
            "name": format!("{id}_name_0"),
            "surname": format!("{id}_surname_0"),
            "username": format!("{id}_username_0"),
            "password": "1234Abch#!",
        }))
    );

    let usernames: HashSet<_> = created
        .iter()
        .map(|request| request.body.as_ref().unwrap()["username"].clone())
        .collect();
    let emails: HashSet<_> = created
        .iter()
        .map(|request| request.body.as_ref().unwrap()["email"].clone())
        .collect();
    assert_eq!(usernames.len(), 3);
    assert_eq!(emails.len(), 3);
}

#[tokio::test]
async fn create_user_counts_failed_writes() {
    let server = TestServer::builder().fail("/api/admin/user").start().await;
    let mut session = session(&server).await;

    session.create_user().await.unwrap();
    session.create_user().await.unwrap();

    let id = session.user_id();
    let names: Vec<_> = server
        .requests_to("POST", "/api/admin/user")
        .into_iter()
        .map(|request| request.body.unwrap()["name"].clone())
        .collect();
    assert_eq!(
        names,
        [json!(format!("{id}_name_0")), json!(format!("{id}_name_1"))]
    );
    assert_eq!(session.counters().users, 2);
}

#[tokio::test]
async fn create_company_writes_once() {
    let server = TestServer::new().await;
    let mut session = session(&server).await;

    session.create_company().await.unwrap();

    assert_eq!(
        paths(&server),
        [
            "GET /api/company",
            "GET /api/corporate-group",
            "POST /api/company",
            "GET /api/company",
            "GET /api/corporate-group",
        ]
    );
    let created = server.requests_to("POST", "/api/company");
    assert_eq!(
        created[0].body,
        Some(json!({
            "jobTitle": "CEO",
            "name": format!("{}_company_0", session.user_id()),
        }))
    );
    assert_eq!(session.counters().companies, 1);
}

#[tokio::test]
async fn invite_uses_the_random_choices() {
    let server = TestServer::builder()
        .companies(["c0", "c1"])
        .projects(["p0", "p1", "p2"])
        .users_to_invite(["u0", "u1"])
        .start()
        .await;
    let mut session = session(&server).await;

    // company c1, two projects: p2 and p0, user u1
    let mut random = Scripted::new([1, 2, 2, 0, 1]);
    session.add_users_to_company(&mut random).await.unwrap();
    assert!(random.0.is_empty());

    assert_eq!(
        paths(&server),
        [
            "GET /api/company",
            "GET /api/company/c1/user",
            "GET /api/company/c1/project",
            "GET /api/company/c1/pending-user",
            "GET /api/company/c1/activity",
            "GET /api/company/c1/user-to-invite",
            "GET /api/company/c1/project",
            "POST /api/company/c1/invite-user",
            "GET /api/company/c1/pending-user",
        ]
    );
    let invites = server.requests_to("POST", "/api/company/c1/invite-user");
    assert_eq!(
        invites[0].body,
        Some(json!({
            "jobTitle": "title",
            "projectIds": ["p2", "p0"],
            "role": "User",
            "userId": "u1",
        }))
    );

    let metrics = session.api().recorder().take();
    let invite = metrics
        .request(&Method::POST, "/api/company/{id}/invite-user")
        .unwrap();
    assert_eq!(invite.successes(), 1);
}

#[tokio::test]
async fn invite_without_projects() {
    let server = TestServer::builder()
        .projects(Vec::<String>::new())
        .start()
        .await;
    let mut session = session(&server).await;

    let mut random = Scripted::new([0, 0, 0]);
    session.add_users_to_company(&mut random).await.unwrap();

    let invites = server.requests_to("POST", "/api/company/company-0/invite-user");
    assert_eq!(invites.len(), 1);
    assert_eq!(invites[0].body.as_ref().unwrap()["projectIds"], json!([]));
}

#[tokio::test]
async fn invite_skipped_without_users_to_invite() {
    let server = TestServer::builder()
        .users_to_invite(Vec::<String>::new())
        .start()
        .await;
    let mut session = session(&server).await;

    let mut random = Scripted::new([0]);
    session.add_users_to_company(&mut random).await.unwrap();

    assert!(
        server
            .requests()
            .iter()
            .all(|request| request.method == "GET")
    );
    assert_eq!(
        paths(&server).last().map(String::as_str),
        Some("GET /api/company/company-0/project")
    );
}

#[tokio::test]
async fn company_tasks_skip_without_companies() {
    let server = TestServer::builder()
        .companies(Vec::<String>::new())
        .start()
        .await;
    let mut session = session(&server).await;

    // any random choice would panic
    let mut random = Scripted::new([]);
    session.add_users_to_company(&mut random).await.unwrap();
    session.create_project(&mut random).await.unwrap();

    assert_eq!(paths(&server), ["GET /api/company", "GET /api/company"]);
    assert_eq!(session.counters().projects, 0);
}

#[tokio::test]
async fn create_project_posts_into_the_picked_company() {
    let server = TestServer::builder()
        .companies(["c0", "c1", "c2"])
        .start()
        .await;
    let mut session = session(&server).await;

    session
        .create_project(&mut Scripted::new([2]))
        .await
        .unwrap();
    assert_eq!(
        paths(&server),
        [
            "GET /api/company",
            "GET /api/company/c2/user",
            "GET /api/company/c2/project",
            "GET /api/company/c2/pending-user",
            "GET /api/company/c2/activity",
            "POST /api/company/c2/project",
        ]
    );

    session
        .create_project(&mut Scripted::new([0]))
        .await
        .unwrap();

    let id = session.user_id().to_owned();
    assert_eq!(
        server.requests_to("POST", "/api/company/c2/project")[0].body,
        Some(json!({
            "name": format!("{id}_project_name_0"),
            "code": format!("{id}_project_code_0"),
        }))
    );
    assert_eq!(
        server.requests_to("POST", "/api/company/c0/project")[0].body,
        Some(json!({
            "name": format!("{id}_project_name_1"),
            "code": format!("{id}_project_code_1"),
        }))
    );
    assert_eq!(session.counters().projects, 2);
}

#[tokio::test]
async fn failed_requests_do_not_stop_the_task() {
    let server = TestServer::builder()
        .fail("/api/corporate-group")
        .start()
        .await;
    let mut session = session(&server).await;

    session.browse_home().await.unwrap();

    assert_eq!(server.requests().len(), 4);
    let metrics = session.api().recorder().take();
    let groups = metrics.request(&Method::GET, "/api/corporate-group").unwrap();
    assert_eq!(groups.failures, 1);
    let notifications = metrics.request(&Method::GET, "/api/notification").unwrap();
    assert_eq!(notifications.successes(), 1);
}

#[tokio::test]
async fn failed_chained_read_aborts_the_task() {
    let server = TestServer::builder().fail("/api/company").start().await;
    let mut session = session(&server).await;

    let err = session
        .add_users_to_company(&mut Scripted::new([]))
        .await
        .unwrap_err();

    assert!(
        matches!(err, Error::Status { status, .. } if status == StatusCode::INTERNAL_SERVER_ERROR)
    );
    assert_eq!(paths(&server), ["GET /api/company"]);
}
