use std::sync::{Arc, Mutex};

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use trailhead::config::Config;
use trailhead::services::mailer::FailingMailer;
use trailhead::services::{Mail, MailError, Mailer};
use trailhead::state::AppState;

/// Captures outbound mail so tests can fish the reset token out of the body.
#[derive(Default)]
struct CapturingMailer {
    sent: Mutex<Vec<Mail>>,
}

#[async_trait::async_trait]
impl Mailer for CapturingMailer {
    async fn send(&self, mail: Mail) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(mail);
        Ok(())
    }
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.database.url = "sqlite::memory:".to_string();
    config.database.max_connections = 1;
    config.database.min_connections = 1;
    config.auth.jwt_secret = "integration-test-secret".to_string();
    config
}

async fn spawn_app_with_mailer(mailer: Arc<dyn Mailer>) -> Router {
    let state = AppState::with_mailer(test_config(), mailer)
        .await
        .expect("Failed to create app state");
    trailhead::api::router(state)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn signup(app: &Router, email: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/v1/users/signup",
        None,
        Some(json!({
            "name": "Resetter",
            "email": email,
            "password": password,
            "confirmPassword": password,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "signup failed: {body}");
    body["token"].as_str().unwrap().to_string()
}

/// Pulls the plaintext reset token out of a captured mail body.
fn extract_reset_token(mail: &Mail) -> String {
    let marker = "resetPassword/";
    let start = mail.body.find(marker).expect("no reset link in mail") + marker.len();
    mail.body[start..]
        .chars()
        .take_while(char::is_ascii_hexdigit)
        .collect()
}

#[tokio::test]
async fn full_password_reset_flow() {
    let mailer = Arc::new(CapturingMailer::default());
    let app = spawn_app_with_mailer(mailer.clone()).await;
    signup(&app, "resetter@example.com", "pass1234").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/users/forgotPassword",
        None,
        Some(json!({"email": "resetter@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["message"], "Token sent to email!");

    let token = {
        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "resetter@example.com");
        extract_reset_token(&sent[0])
    };
    assert_eq!(token.len(), 64);

    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/api/v1/users/resetPassword/{token}"),
        None,
        Some(json!({"password": "newpass99", "confirmPassword": "newpass99"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["token"].is_string());

    // Old password no longer works, the new one does
    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/users/login",
        None,
        Some(json!({"email": "resetter@example.com", "password": "pass1234"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/users/login",
        None,
        Some(json!({"email": "resetter@example.com", "password": "newpass99"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // The token is single-use
    let (status, _) = send(
        &app,
        "PATCH",
        &format!("/api/v1/users/resetPassword/{token}"),
        None,
        Some(json!({"password": "thirdpass1", "confirmPassword": "thirdpass1"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn failed_mail_delivery_rolls_the_token_back() {
    let app = spawn_app_with_mailer(Arc::new(FailingMailer)).await;
    signup(&app, "unlucky@example.com", "pass1234").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/users/forgotPassword",
        None,
        Some(json!({"email": "unlucky@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn forgot_password_for_unknown_email_is_not_found() {
    let app = spawn_app_with_mailer(Arc::new(CapturingMailer::default())).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/users/forgotPassword",
        None,
        Some(json!({"email": "nobody@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "fail");
}

#[tokio::test]
async fn reset_with_a_bogus_token_fails() {
    let app = spawn_app_with_mailer(Arc::new(CapturingMailer::default())).await;

    let (status, body) = send(
        &app,
        "PATCH",
        "/api/v1/users/resetPassword/not-a-real-token",
        None,
        Some(json!({"password": "newpass99", "confirmPassword": "newpass99"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("invalid"));
}

#[tokio::test]
async fn update_my_password_verifies_the_current_one() {
    let app = spawn_app_with_mailer(Arc::new(CapturingMailer::default())).await;
    let token = signup(&app, "changer@example.com", "pass1234").await;

    let (status, _) = send(
        &app,
        "PATCH",
        "/api/v1/users/updatePassword",
        Some(&token),
        Some(json!({
            "currentPassword": "wrong-pass",
            "password": "newpass99",
            "confirmPassword": "newpass99",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app,
        "PATCH",
        "/api/v1/users/updatePassword",
        Some(&token),
        Some(json!({
            "currentPassword": "pass1234",
            "password": "newpass99",
            "confirmPassword": "newpass99",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let new_token = body["token"].as_str().unwrap();

    let (status, _) = send(&app, "GET", "/api/v1/users/me", Some(new_token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/users/login",
        None,
        Some(json!({"email": "changer@example.com", "password": "newpass99"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn login_validates_presence_before_credentials() {
    let app = spawn_app_with_mailer(Arc::new(CapturingMailer::default())).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/users/login",
        None,
        Some(json!({"email": "someone@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Please provide email and password!");

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/users/login",
        None,
        Some(json!({"email": "someone@example.com", "password": "wrong123"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn tokens_arrive_as_cookies_too() {
    let app = spawn_app_with_mailer(Arc::new(CapturingMailer::default())).await;
    signup(&app, "cookie@example.com", "pass1234").await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/users/login")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    json!({"email": "cookie@example.com", "password": "pass1234"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .expect("no Set-Cookie header")
        .to_string();
    assert!(cookie.starts_with("jwt="));
    assert!(cookie.contains("HttpOnly"));

    let jwt_pair = cookie.split(';').next().unwrap().to_string();
    let (status, _) = {
        let request = Request::builder()
            .uri("/api/v1/users/me")
            .header("Cookie", jwt_pair)
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        (status, ())
    };
    assert_eq!(status, StatusCode::OK);
}
