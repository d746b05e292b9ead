#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode};
use axum::routing::post;
use axum::Router;
use chrono::Duration;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use studyroom_api::auth::jwt::{generate_access_token, JwtConfig};
use studyroom_api::config::ServerConfig;
use studyroom_api::router::build_app_router;
use studyroom_api::sink::InvoiceSink;
use studyroom_api::state::AppState;
use studyroom_core::billing::BillingPolicy;
use studyroom_core::cancellation::CancellationPolicy;
use studyroom_core::roles::{ROLE_ADMIN, ROLE_TUTOR};
use studyroom_core::types::DbId;
use studyroom_db::models::tutor::{CreateTutor, Tutor};
use studyroom_db::repositories::TutorRepo;

pub const TEST_JWT_SECRET: &str = "test-secret-not-for-production";

/// Test `ServerConfig` with development defaults and no invoice sink.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        jwt: JwtConfig {
            secret: TEST_JWT_SECRET.to_string(),
            access_token_expiry_mins: 15,
        },
        billing: BillingPolicy::default(),
        cancellation: CancellationPolicy::default(),
        invoice_sink_url: None,
    }
}

/// The production router over `pool`, built from [`test_config`].
pub fn build_test_app(pool: PgPool) -> Router {
    build_app_with_config(pool, test_config())
}

/// Like [`build_test_app`], but forwarding invoices to `sink_url`.
pub fn build_test_app_with_sink(pool: PgPool, sink_url: &str) -> Router {
    let mut config = test_config();
    config.invoice_sink_url = Some(sink_url.to_string());
    build_app_with_config(pool, config)
}

fn build_app_with_config(pool: PgPool, config: ServerConfig) -> Router {
    let sink = InvoiceSink::new(config.invoice_sink_url.clone()).unwrap();
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        sink: Arc::new(sink),
    };
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Invoice sink
// ---------------------------------------------------------------------------

/// A local invoicing endpoint on an ephemeral port.
pub struct TestSink {
    pub url: String,
    hits: Arc<AtomicUsize>,
}

impl TestSink {
    /// Number of invoices posted so far.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Serve `POST /invoices`, answering `status` with `{"reference":"INV-000n"}`
/// after `delay`.
pub async fn spawn_sink(status: StatusCode, delay: std::time::Duration) -> TestSink {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let app = Router::new().route(
        "/invoices",
        post(move || {
            let counter = counter.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                tokio::time::sleep(delay).await;
                (
                    status,
                    axum::Json(serde_json::json!({ "reference": format!("INV-{n:04}") })),
                )
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestSink {
        url: format!("http://{addr}/invoices"),
        hits,
    }
}

// ---------------------------------------------------------------------------
// Identities
// ---------------------------------------------------------------------------

pub fn token_for(user_id: DbId, email: &str, role: &str) -> String {
    generate_access_token(user_id, email, role, &test_config().jwt).unwrap()
}

/// Register an active tutor and mint a tutor-role token for it.
pub async fn seed_tutor(pool: &PgPool, name: &str) -> (Tutor, String) {
    let email = format!("{}@studyroom.test", name.to_lowercase().replace(' ', "."));
    let tutor = TutorRepo::create(
        pool,
        &CreateTutor {
            display_name: name.to_string(),
            email,
        },
    )
    .await
    .unwrap();
    let token = token_for(tutor.id, &tutor.email, ROLE_TUTOR);
    (tutor, token)
}

/// Register an admin profile and mint an admin-role token for it.
pub async fn seed_admin(pool: &PgPool) -> (Tutor, String) {
    let (admin, _) = seed_tutor(pool, "Office Admin").await;
    let token = token_for(admin.id, &admin.email, ROLE_ADMIN);
    (admin, token)
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A valid intake form body.
pub fn lead_body(student_name: &str, mode: &str) -> serde_json::Value {
    serde_json::json!({
        "parentName": "Pat Parent",
        "parentEmail": "Pat.Parent@Example.com",
        "parentPhone": "0400 000 000",
        "studentName": student_name,
        "yearLevel": "Year 9",
        "subjects": ["Maths", " maths ", "English"],
        "mode": mode,
        "suburb": "Newtown",
        "availability": ["mon-afternoon", "sat-morning"],
    })
}

/// Submit a lead through the public intake endpoint and return its id.
pub async fn create_lead(app: Router, student_name: &str) -> String {
    let response = post_json(app, "/api/v1/leads", lead_body(student_name, "online")).await;
    assert_eq!(response.status(), 201);
    let json = body_json(response).await;
    json["data"]["id"].as_str().unwrap().to_string()
}

/// Claim a fresh lead for the tutor behind `token`; returns the student id.
pub async fn claimed_student(app: Router, token: &str) -> String {
    let lead_id = create_lead(app.clone(), "Sam Student").await;
    let response = post_auth(app, &format!("/api/v1/leads/{lead_id}/claim"), token).await;
    assert_eq!(response.status(), 200);
    let json = body_json(response).await;
    json["studentId"].as_str().unwrap().to_string()
}

/// Book an ONLINE session starting `starts_in` from now; returns the session JSON.
pub async fn book_session(
    app: Router,
    token: &str,
    student_id: &str,
    starts_in: Duration,
    minutes: i32,
) -> serde_json::Value {
    let start_at = chrono::Utc::now() + starts_in;
    let body = serde_json::json!({
        "studentId": student_id,
        "startAt": start_at,
        "durationMinutes": minutes,
        "modality": "ONLINE",
    });
    let response = post_json_auth(app, "/api/v1/sessions", body, token).await;
    assert_eq!(response.status(), 201);
    body_json(response).await["data"].clone()
}

// ---------------------------------------------------------------------------
// HTTP helpers
// ---------------------------------------------------------------------------

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    body: Option<serde_json::Value>,
    token: Option<&str>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, Some(token)).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, Method::POST, uri, Some(body), None).await
}

pub async fn post_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::POST, uri, None, Some(token)).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    send(app, Method::POST, uri, Some(body), Some(token)).await
}

pub async fn put_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    send(app, Method::PUT, uri, Some(body), Some(token)).await
}
