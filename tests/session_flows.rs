use anyhow::Result;
use rebate_client::{
    APP_USER_AGENT, App, AppConfig, AppError, AuthError, RouteDecision, SessionEvent,
    SessionStatus,
};
use secrecy::SecretString;
use serde_json::{Value, json};
use std::{net::TcpListener, time::Duration};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, header, header_regex, method, path},
};

const CSRF: &str = "/api/v1/auth/csrf/";
const LOGIN: &str = "/api/v1/auth/login/";
const REGISTER: &str = "/api/v1/auth/register/";
const LOGOUT: &str = "/api/v1/auth/logout/";
const PROFILE: &str = "/api/v1/profile/";
const REBATES: &str = "/api/v1/rebates/";

fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

fn config(server: &MockServer) -> AppConfig {
    AppConfig::default()
        .with_api_base_url(server.uri())
        .with_request_timeout(Duration::from_secs(5))
}

fn secret(value: &str) -> SecretString {
    SecretString::from(value.to_string())
}

fn alice() -> Value {
    json!({
        "id": 1,
        "username": "alice",
        "email": "a@x.com",
        "first_name": "Alice",
        "last_name": "",
        "is_active": true,
        "date_joined": "2024-05-01T09:30:00Z"
    })
}

async fn mount_csrf(server: &MockServer, token: &str) {
    Mock::given(method("GET"))
        .and(path(CSRF))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "csrfToken": token }))
                .append_header("set-cookie", format!("csrftoken={token}; Path=/")),
        )
        .mount(server)
        .await;
}

/// Profile answers with `user` only when the session cookie is replayed.
async fn mount_profile(server: &MockServer, session: &str, user: Value) {
    Mock::given(method("GET"))
        .and(path(PROFILE))
        .and(header_regex("cookie", &format!("sessionid={session}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(user))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(PROFILE))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"detail": "Not authenticated"})),
        )
        .mount(server)
        .await;
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(LOGIN))
        .and(header("x-csrftoken", "tok"))
        .and(body_json(json!({"username": "alice", "password": "correctpw"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"message": "Login successful", "user": alice()}))
                .append_header("set-cookie", "sessionid=s1; Path=/; HttpOnly"),
        )
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path(LOGIN))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": "Invalid credentials"})),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn fresh_visitor_is_anonymous() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    mount_profile(&server, "s1", alice()).await;

    let app = App::from_config(config(&server))?;
    assert_eq!(app.route("/dashboard"), RouteDecision::Loading);

    assert_eq!(app.bootstrap().await, SessionStatus::Anonymous);
    let state = app.state();
    assert!(state.principal().is_none());
    assert!(state.last_error().is_none());
    assert_eq!(
        app.route("/dashboard"),
        RouteDecision::Redirect("/login".to_string())
    );
    Ok(())
}

#[tokio::test]
async fn login_establishes_session() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    mount_csrf(&server, "tok").await;
    mount_login(&server).await;
    mount_profile(&server, "s1", alice()).await;

    let app = App::from_config(config(&server))?;
    let user = app
        .session()
        .login_with_credentials("alice", &secret("correctpw"))
        .await?;

    assert_eq!(user.username, "alice");
    assert_eq!(user.display_name(), "Alice");
    let state = app.state();
    assert_eq!(state.status(), SessionStatus::Authenticated);
    assert_eq!(
        state.principal().map(|user| user.username.as_str()),
        Some("alice")
    );
    assert_eq!(app.route("/rebates"), RouteDecision::Render);
    Ok(())
}

#[tokio::test]
async fn wrong_password_is_rejected() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    mount_csrf(&server, "tok").await;
    mount_login(&server).await;

    let app = App::from_config(config(&server))?;
    let result = app
        .session()
        .login_with_credentials("alice", &secret("wrong"))
        .await;

    let expected = AuthError::Rejected("Invalid credentials".to_string());
    assert_eq!(result.err(), Some(expected.clone()));
    let state = app.state();
    assert_eq!(state.status(), SessionStatus::Anonymous);
    assert_eq!(state.last_error(), Some(&expected));
    Ok(())
}

#[tokio::test]
async fn concurrent_unauthorized_responses_redirect_once() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    mount_csrf(&server, "tok").await;
    mount_login(&server).await;
    mount_profile(&server, "s1", alice()).await;
    Mock::given(method("GET"))
        .and(path(REBATES))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "expired"})))
        .expect(3)
        .mount(&server)
        .await;

    let app = App::from_config(config(&server))?;
    app.session()
        .login_with_credentials("alice", &secret("correctpw"))
        .await?;
    let mut events = app.events();

    let gateway = app.gateway();
    let (first, second, third) = tokio::join!(
        gateway.get_json::<Value>(REBATES),
        gateway.get_json::<Value>(REBATES),
        gateway.get_json::<Value>(REBATES),
    );

    for result in [first, second, third] {
        assert!(matches!(result, Err(AppError::Unauthorized { .. })));
    }
    assert_eq!(
        events.try_recv().ok(),
        Some(SessionEvent::LoginRequired {
            redirect_to: "/login".to_string()
        })
    );
    assert!(events.try_recv().is_err());
    assert_eq!(app.state().status(), SessionStatus::Anonymous);
    assert!(app.state().principal().is_none());
    Ok(())
}

#[tokio::test]
async fn registration_signs_in_without_login_call() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    let bob = json!({"id": 2, "username": "bob", "email": "b@x.com"});
    mount_csrf(&server, "tok").await;
    mount_profile(&server, "s2", bob.clone()).await;
    Mock::given(method("POST"))
        .and(path(REGISTER))
        .and(body_json(json!({
            "email": "b@x.com",
            "username": "bob",
            "password": "longenoughpw",
            "password_confirm": "longenoughpw"
        })))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({"message": "User registered successfully", "user": bob}))
                .append_header("set-cookie", "sessionid=s2; Path=/; HttpOnly"),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(LOGIN))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let app = App::from_config(config(&server))?;
    let user = app
        .session()
        .register("b@x.com", &secret("longenoughpw"), "bob")
        .await?;

    assert_eq!(user.username, "bob");
    assert_eq!(app.state().status(), SessionStatus::Authenticated);
    Ok(())
}

#[tokio::test]
async fn rejected_token_is_refetched_once() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CSRF))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"csrfToken": "tok"})))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(REBATES))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(json!({"detail": "CSRF Failed: CSRF token missing or incorrect."})),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(REBATES))
        .and(header("x-csrftoken", "tok"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 7})))
        .expect(1)
        .mount(&server)
        .await;

    let app = App::from_config(config(&server))?;
    let created: Value = app
        .gateway()
        .post_json(REBATES, &json!({"amount": "12.5"}))
        .await?;

    assert_eq!(created, json!({"id": 7}));
    Ok(())
}

#[tokio::test]
async fn hung_login_times_out() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    mount_csrf(&server, "tok").await;
    Mock::given(method("POST"))
        .and(path(LOGIN))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"user": alice()}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let app = App::from_config(config(&server).with_request_timeout(Duration::from_millis(200)))?;
    let result = app
        .session()
        .login_with_credentials("alice", &secret("correctpw"))
        .await;

    assert!(matches!(result, Err(AuthError::Network(_))));
    let state = app.state();
    assert_eq!(state.status(), SessionStatus::Anonymous);
    assert!(state.last_error().is_some());
    Ok(())
}

#[tokio::test]
async fn session_file_survives_restart_until_logout() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    mount_csrf(&server, "tok").await;
    mount_login(&server).await;
    mount_profile(&server, "s1", alice()).await;
    Mock::given(method("POST"))
        .and(path(LOGOUT))
        .and(header("user-agent", APP_USER_AGENT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Logged out"})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir()?;
    let config = AppConfig {
        session_file: Some(dir.path().join("session.json")),
        ..config(&server)
    };

    let first = App::from_config(config.clone())?;
    first
        .session()
        .login_with_credentials("alice", &secret("correctpw"))
        .await?;
    drop(first);

    let second = App::from_config(config.clone())?;
    assert_eq!(second.bootstrap().await, SessionStatus::Authenticated);
    second.session().logout().await;
    assert_eq!(second.state().status(), SessionStatus::Anonymous);
    drop(second);

    let third = App::from_config(config)?;
    assert_eq!(third.bootstrap().await, SessionStatus::Anonymous);
    Ok(())
}
