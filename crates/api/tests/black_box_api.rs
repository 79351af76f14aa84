use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::{json, Value};

use scheduler_api::app::{self, services::AppServices};

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod over the in-memory store, on an ephemeral port.
        let app = app::router(Arc::new(AppServices::in_memory("SESSION")));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// A client with its own cookie jar, i.e. its own browser session.
    fn client(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .expect("failed to build client")
    }

    async fn signup(&self, client: &reqwest::Client, name: &str, email: &str, password: &str) -> Value {
        let res = client
            .post(self.url("/signup"))
            .json(&json!({ "name": name, "email": email, "password": password }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        res.json().await.unwrap()
    }

    async fn login(&self, client: &reqwest::Client, email: &str, password: &str) -> reqwest::Response {
        client
            .post(self.url("/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .unwrap()
    }

    /// Sign up and log in; returns the client and the user id.
    async fn member(&self, name: &str, email: &str) -> (reqwest::Client, String) {
        let client = self.client();
        let user = self.signup(&client, name, email, "pw").await;
        let res = self.login(&client, email, "pw").await;
        assert_eq!(res.status(), StatusCode::OK);
        (client, user["id"].as_str().unwrap().to_string())
    }

    async fn create_schedule(&self, client: &reqwest::Client, title: &str) -> Value {
        let res = client
            .post(self.url("/schedules"))
            .json(&json!({ "title": title, "content": "body" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        res.json().await.unwrap()
    }

    async fn create_comment(&self, client: &reqwest::Client, schedule_id: &str, content: &str) -> Value {
        let res = client
            .post(self.url(&format!("/schedules/{schedule_id}/comments")))
            .json(&json!({ "content": content }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        res.json().await.unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn error_body(res: reqwest::Response, status: StatusCode, code: &str) -> Value {
    assert_eq!(res.status(), status);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], status.as_u16());
    assert_eq!(body["error_code"], code);
    assert!(body["timestamp"].is_string());
    body
}

#[tokio::test]
async fn allow_listed_routes_need_no_session() {
    let server = TestServer::spawn().await;
    let client = server.client();

    let res = client.get(server.url("/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client.post(server.url("/logout")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn protected_routes_reject_anonymous_requests() {
    let server = TestServer::spawn().await;
    let client = server.client();

    for path in ["/users", "/schedules", "/signup/extra"] {
        let res = client.get(server.url(path)).send().await.unwrap();
        let body = error_body(res, StatusCode::UNAUTHORIZED, "AUTH-001").await;
        assert_eq!(body["path"], path);
    }
}

#[tokio::test]
async fn signup_login_and_logout_flow() {
    let server = TestServer::spawn().await;
    let client = server.client();

    let user = server.signup(&client, "Ann", "Ann@Example.com", "pw").await;
    assert_eq!(user["email"], "ann@example.com");
    assert!(user.get("password").is_none());
    assert!(user.get("password_hash").is_none());

    let res = server.login(&client, "ann@example.com", "pw").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().get("set-cookie").is_some());

    let res = client.get(server.url("/users")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["items"].as_array().unwrap().len(), 1);

    let res = client.post(server.url("/logout")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client.get(server.url("/users")).send().await.unwrap();
    error_body(res, StatusCode::UNAUTHORIZED, "AUTH-001").await;
}

#[tokio::test]
async fn login_failures_are_unauthorized() {
    let server = TestServer::spawn().await;
    let client = server.client();
    server.signup(&client, "Ann", "ann@example.com", "pw").await;

    let res = server.login(&client, "ann@example.com", "wrong").await;
    error_body(res, StatusCode::UNAUTHORIZED, "AUTH-401").await;

    let res = server.login(&client, "ghost@example.com", "pw").await;
    error_body(res, StatusCode::UNAUTHORIZED, "AUTH-402").await;

    let res = client.get(server.url("/users")).send().await.unwrap();
    error_body(res, StatusCode::UNAUTHORIZED, "AUTH-001").await;
}

#[tokio::test]
async fn signup_validation_and_duplicates() {
    let server = TestServer::spawn().await;
    let client = server.client();

    let res = client
        .post(server.url("/signup"))
        .json(&json!({ "name": "", "email": "nope", "password": "pw" }))
        .send()
        .await
        .unwrap();
    let body = error_body(res, StatusCode::BAD_REQUEST, "VAL-001").await;
    assert!(body["errors"]["name"].is_string());
    assert!(body["errors"]["email"].is_string());

    let res = client
        .post(server.url("/signup"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    error_body(res, StatusCode::BAD_REQUEST, "VAL-001").await;

    server.signup(&client, "Ann", "ann@example.com", "pw").await;
    let res = client
        .post(server.url("/signup"))
        .json(&json!({ "name": "Other", "email": "ANN@example.com", "password": "x" }))
        .send()
        .await
        .unwrap();
    error_body(res, StatusCode::BAD_REQUEST, "USER-001").await;
}

#[tokio::test]
async fn only_the_owner_can_modify_a_schedule() {
    let server = TestServer::spawn().await;
    let (ann, _) = server.member("Ann", "ann@example.com").await;
    let (bob, _) = server.member("Bob", "bob@example.com").await;

    let schedule = server.create_schedule(&ann, "Standup").await;
    let id = schedule["id"].as_str().unwrap();

    let res = bob
        .patch(server.url(&format!("/schedules/{id}")))
        .json(&json!({ "title": "Hijacked" }))
        .send()
        .await
        .unwrap();
    error_body(res, StatusCode::FORBIDDEN, "AUTH-403").await;

    let res = bob
        .delete(server.url(&format!("/schedules/{id}")))
        .send()
        .await
        .unwrap();
    error_body(res, StatusCode::FORBIDDEN, "AUTH-403").await;

    let res = ann
        .patch(server.url(&format!("/schedules/{id}")))
        .json(&json!({ "title": "Retro" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated: Value = res.json().await.unwrap();
    assert_eq!(updated["title"], "Retro");
    assert_eq!(updated["content"], "body");

    let res = bob
        .get(server.url(&format!("/schedules/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn denied_mutations_leave_resources_unchanged() {
    let server = TestServer::spawn().await;
    let (ann, _) = server.member("Ann", "ann@example.com").await;
    let (bob, _) = server.member("Bob", "bob@example.com").await;

    let schedule = server.create_schedule(&ann, "Standup").await;
    let schedule_id = schedule["id"].as_str().unwrap();
    let comment = server.create_comment(&ann, schedule_id, "mine").await;
    let comment_id = comment["id"].as_str().unwrap();
    let schedule_url = server.url(&format!("/schedules/{schedule_id}"));
    let comment_url = server.url(&format!("/schedules/{schedule_id}/comments/{comment_id}"));

    let res = bob
        .patch(&schedule_url)
        .json(&json!({ "title": "Hijacked", "content": "gone" }))
        .send()
        .await
        .unwrap();
    error_body(res, StatusCode::FORBIDDEN, "AUTH-403").await;
    let res = bob.delete(&schedule_url).send().await.unwrap();
    error_body(res, StatusCode::FORBIDDEN, "AUTH-403").await;

    let res = bob
        .patch(&comment_url)
        .json(&json!({ "content": "edited" }))
        .send()
        .await
        .unwrap();
    error_body(res, StatusCode::FORBIDDEN, "AUTH-403").await;
    let res = bob.delete(&comment_url).send().await.unwrap();
    error_body(res, StatusCode::FORBIDDEN, "AUTH-403").await;

    let stored: Value = bob.get(&schedule_url).send().await.unwrap().json().await.unwrap();
    assert_eq!(stored, schedule);
    assert_eq!(stored["modified_at"], schedule["modified_at"]);

    let stored: Value = bob.get(&comment_url).send().await.unwrap().json().await.unwrap();
    assert_eq!(stored, comment);
    assert_eq!(stored["modified_at"], comment["modified_at"]);
}

#[tokio::test]
async fn bad_session_cookies_are_rejected_and_cleared() {
    let server = TestServer::spawn().await;
    let (ann, _) = server.member("Ann", "ann@example.com").await;

    // Capture a real session id, then end it.
    let raw = reqwest::Client::new();
    let res = server.login(&raw, "ann@example.com", "pw").await;
    let set_cookie = res.headers()["set-cookie"].to_str().unwrap().to_string();
    let session = set_cookie
        .split(';')
        .next()
        .and_then(|pair| pair.strip_prefix("SESSION="))
        .unwrap()
        .to_string();
    let res = raw
        .post(server.url("/logout"))
        .header("cookie", format!("SESSION={session}"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    for cookie in [
        "SESSION=garbage".to_string(),
        format!("SESSION={session}"),
        format!("SESSION={}", uuid_like()),
    ] {
        let res = raw
            .get(server.url("/schedules"))
            .header("cookie", &cookie)
            .send()
            .await
            .unwrap();
        let cleared = res
            .headers()
            .get("set-cookie")
            .map(|v| v.to_str().unwrap().to_string())
            .unwrap_or_default();
        assert!(cleared.starts_with("SESSION=;"), "{cookie}: {cleared}");
        assert!(cleared.contains("Max-Age=0"), "{cookie}: {cleared}");
        error_body(res, StatusCode::UNAUTHORIZED, "AUTH-001").await;
    }

    // No cookie at all: rejected, nothing to clear.
    let res = raw.get(server.url("/schedules")).send().await.unwrap();
    assert!(res.headers().get("set-cookie").is_none());
    error_body(res, StatusCode::UNAUTHORIZED, "AUTH-001").await;

    // Ann's own session is unaffected.
    let res = ann.get(server.url("/schedules")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn schedule_listing_is_paged() {
    let server = TestServer::spawn().await;
    let (ann, ann_id) = server.member("Ann", "ann@example.com").await;
    let (bob, _) = server.member("Bob", "bob@example.com").await;

    for i in 0..3 {
        server.create_schedule(&ann, &format!("ann-{i}")).await;
    }
    let bobs = server.create_schedule(&bob, "bob-0").await;
    server
        .create_comment(&ann, bobs["id"].as_str().unwrap(), "hi")
        .await;

    let res = ann
        .get(server.url("/schedules?page=0&size=2"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let page: Value = res.json().await.unwrap();
    assert_eq!(page["total_elements"], 4);
    assert_eq!(page["total_pages"], 2);
    assert_eq!(page["items"].as_array().unwrap().len(), 2);
    // Most recently modified first.
    assert_eq!(page["items"][0]["title"], "bob-0");
    assert_eq!(page["items"][0]["comment_count"], 1);
    assert_eq!(page["items"][0]["user_name"], "Bob");

    let res = ann
        .get(server.url(&format!("/schedules?user_id={ann_id}")))
        .send()
        .await
        .unwrap();
    let page: Value = res.json().await.unwrap();
    assert_eq!(page["total_elements"], 3);

    let res = ann
        .get(server.url("/schedules?size=0"))
        .send()
        .await
        .unwrap();
    error_body(res, StatusCode::BAD_REQUEST, "SCH-400").await;
}

#[tokio::test]
async fn comments_are_scoped_to_their_schedule() {
    let server = TestServer::spawn().await;
    let (ann, _) = server.member("Ann", "ann@example.com").await;
    let (bob, _) = server.member("Bob", "bob@example.com").await;

    let first = server.create_schedule(&ann, "first").await;
    let second = server.create_schedule(&ann, "second").await;
    let first_id = first["id"].as_str().unwrap();
    let second_id = second["id"].as_str().unwrap();

    let comment = server.create_comment(&bob, first_id, "nice").await;
    let comment_id = comment["id"].as_str().unwrap();

    let res = ann
        .get(server.url(&format!("/schedules/{second_id}/comments/{comment_id}")))
        .send()
        .await
        .unwrap();
    error_body(res, StatusCode::BAD_REQUEST, "CMT-400").await;

    let res = ann
        .patch(server.url(&format!("/schedules/{first_id}/comments/{comment_id}")))
        .json(&json!({ "content": "edited" }))
        .send()
        .await
        .unwrap();
    error_body(res, StatusCode::FORBIDDEN, "AUTH-403").await;

    let res = bob
        .patch(server.url(&format!("/schedules/{first_id}/comments/{comment_id}")))
        .json(&json!({ "content": "edited" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let missing = uuid_like();
    let res = ann
        .get(server.url(&format!("/schedules/{missing}/comments")))
        .send()
        .await
        .unwrap();
    error_body(res, StatusCode::NOT_FOUND, "SCH-404").await;

    let res = bob
        .delete(server.url(&format!("/schedules/{first_id}/comments/{comment_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = bob
        .get(server.url(&format!("/schedules/{first_id}/comments/{comment_id}")))
        .send()
        .await
        .unwrap();
    error_body(res, StatusCode::NOT_FOUND, "CMT-404").await;
}

#[tokio::test]
async fn deleting_a_schedule_removes_its_comments() {
    let server = TestServer::spawn().await;
    let (ann, _) = server.member("Ann", "ann@example.com").await;
    let (bob, _) = server.member("Bob", "bob@example.com").await;

    let schedule = server.create_schedule(&ann, "doomed").await;
    let id = schedule["id"].as_str().unwrap();
    let comment = server.create_comment(&bob, id, "bye").await;
    let comment_id = comment["id"].as_str().unwrap();

    let res = ann
        .delete(server.url(&format!("/schedules/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = bob
        .get(server.url(&format!("/schedules/{id}")))
        .send()
        .await
        .unwrap();
    error_body(res, StatusCode::NOT_FOUND, "SCH-404").await;

    let res = bob
        .get(server.url(&format!("/schedules/{id}/comments/{comment_id}")))
        .send()
        .await
        .unwrap();
    error_body(res, StatusCode::NOT_FOUND, "SCH-404").await;
}

#[tokio::test]
async fn self_service_account_changes() {
    let server = TestServer::spawn().await;
    let (ann, ann_id) = server.member("Ann", "ann@example.com").await;
    let (bob, bob_id) = server.member("Bob", "bob@example.com").await;

    let res = ann
        .patch(server.url(&format!("/users/{bob_id}")))
        .json(&json!({ "password": "pw", "name": "Mallory" }))
        .send()
        .await
        .unwrap();
    error_body(res, StatusCode::FORBIDDEN, "AUTH-403").await;

    let res = ann
        .patch(server.url(&format!("/users/{ann_id}")))
        .json(&json!({ "password": "wrong", "name": "Annie" }))
        .send()
        .await
        .unwrap();
    error_body(res, StatusCode::UNAUTHORIZED, "AUTH-401").await;

    let res = ann
        .patch(server.url(&format!("/users/{ann_id}")))
        .json(&json!({ "password": "pw", "new_password": "pw" }))
        .send()
        .await
        .unwrap();
    error_body(res, StatusCode::BAD_REQUEST, "AUTH-400").await;

    let res = ann
        .patch(server.url(&format!("/users/{ann_id}")))
        .json(&json!({ "password": "pw", "email": "bob@example.com" }))
        .send()
        .await
        .unwrap();
    error_body(res, StatusCode::BAD_REQUEST, "USER-001").await;

    let res = ann
        .patch(server.url(&format!("/users/{ann_id}")))
        .json(&json!({ "password": "pw", "name": "Annie", "new_password": "pw2" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let user: Value = res.json().await.unwrap();
    assert_eq!(user["name"], "Annie");

    let fresh = server.client();
    let res = server.login(&fresh, "ann@example.com", "pw").await;
    error_body(res, StatusCode::UNAUTHORIZED, "AUTH-401").await;
    let res = server.login(&fresh, "ann@example.com", "pw2").await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = bob
        .get(server.url(&format!("/users/{ann_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn deleting_an_account_cascades_and_ends_sessions() {
    let server = TestServer::spawn().await;
    let (ann, ann_id) = server.member("Ann", "ann@example.com").await;
    let (bob, _) = server.member("Bob", "bob@example.com").await;

    // A second browser logged into the same account.
    let ann_elsewhere = server.client();
    assert_eq!(
        server.login(&ann_elsewhere, "ann@example.com", "pw").await.status(),
        StatusCode::OK
    );

    let anns = server.create_schedule(&ann, "ann's").await;
    let bobs = server.create_schedule(&bob, "bob's").await;
    let anns_id = anns["id"].as_str().unwrap();
    let bobs_id = bobs["id"].as_str().unwrap();
    server.create_comment(&bob, anns_id, "on ann's").await;
    server.create_comment(&ann, bobs_id, "on bob's").await;

    let res = ann
        .delete(server.url(&format!("/users/{ann_id}")))
        .json(&json!({ "password": "wrong" }))
        .send()
        .await
        .unwrap();
    error_body(res, StatusCode::UNAUTHORIZED, "AUTH-401").await;

    let res = ann
        .delete(server.url(&format!("/users/{ann_id}")))
        .json(&json!({ "password": "pw" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    for client in [&ann, &ann_elsewhere] {
        let res = client.get(server.url("/schedules")).send().await.unwrap();
        error_body(res, StatusCode::UNAUTHORIZED, "AUTH-001").await;
    }

    let res = bob
        .get(server.url(&format!("/users/{ann_id}")))
        .send()
        .await
        .unwrap();
    error_body(res, StatusCode::NOT_FOUND, "USER-404").await;

    let res = bob
        .get(server.url(&format!("/schedules/{anns_id}")))
        .send()
        .await
        .unwrap();
    error_body(res, StatusCode::NOT_FOUND, "SCH-404").await;

    let res = bob
        .get(server.url(&format!("/schedules/{bobs_id}/comments")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert!(body["items"].as_array().unwrap().is_empty());
}

/// A well-formed id that was never issued.
fn uuid_like() -> String {
    "00000000-0000-7000-8000-000000000000".to_string()
}
