//! HTTP-level tests for lead intake, claiming and admin assignment.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, create_lead, get_auth, post_auth, post_json, post_json_auth, put_json_auth,
    seed_admin, seed_tutor,
};
use sqlx::PgPool;
use studyroom_db::repositories::{ClientRepo, LeadRepo, StudentRepo};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Intake
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn intake_normalizes_the_form(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = post_json(app, "/api/v1/leads", common::lead_body("Sam", "in-home")).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    let lead = &json["data"];
    assert_eq!(lead["status"], "new");
    assert_eq!(lead["parentEmail"], "pat.parent@example.com");
    assert_eq!(lead["mode"], "in-home");
    assert_eq!(lead["subjects"], serde_json::json!(["Maths", "English"]));
    assert_eq!(lead["packagePlan"], "casual");
    assert!(lead["claimedTutorId"].is_null());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn intake_accepts_mode_aliases(pool: PgPool) {
    let app = common::build_test_app(pool);

    for raw in ["in_home", "Home"] {
        let response = post_json(app.clone(), "/api/v1/leads", common::lead_body("Sam", raw)).await;
        assert_eq!(response.status(), StatusCode::CREATED, "{raw}");
        let json = body_json(response).await;
        assert_eq!(json["data"]["mode"], "in-home");
    }
}

#[sqlx::test(migrations = "../db/migrations")]
async fn intake_rejects_bad_availability(pool: PgPool) {
    let app = common::build_test_app(pool);
    let mut body = common::lead_body("Sam", "online");
    body["availability"] = serde_json::json!(["someday-lunch"]);

    let response = post_json(app, "/api/v1/leads", body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["ok"], false);
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn intake_rejects_bad_email(pool: PgPool) {
    let app = common::build_test_app(pool);
    let mut body = common::lead_body("Sam", "online");
    body["parentEmail"] = serde_json::json!("not-an-email");

    let response = post_json(app, "/api/v1/leads", body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Claim
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn claim_materializes_client_and_student(pool: PgPool) {
    let (tutor, token) = seed_tutor(&pool, "Alice Tutor").await;
    let app = common::build_test_app(pool.clone());
    let lead_id = create_lead(app.clone(), "Sam Student").await;

    let response = post_auth(app.clone(), &format!("/api/v1/leads/{lead_id}/claim"), &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["ok"], true);
    assert_eq!(json["studentId"], lead_id.as_str());

    let id: Uuid = lead_id.parse().unwrap();
    let lead = LeadRepo::find_by_id(&pool, id).await.unwrap().unwrap();
    assert_eq!(lead.status.as_str(), "assigned");
    assert_eq!(lead.claimed_tutor_id, Some(tutor.id));
    assert_eq!(lead.claimed_tutor_email.as_deref(), Some(tutor.email.as_str()));
    assert_eq!(lead.client_id, Some(id));
    assert_eq!(lead.student_id, Some(id));

    let client = ClientRepo::find_by_id(&pool, id).await.unwrap().unwrap();
    assert_eq!(client.parent_email, "pat.parent@example.com");
    assert_eq!(client.assigned_tutor_id, Some(tutor.id));

    let student = StudentRepo::find_by_id(&pool, id).await.unwrap().unwrap();
    assert_eq!(student.client_id, id);
    assert!(student.is_assigned_to(tutor.id));

    // The claimer sees the student; confirming stamps the acceptance.
    let response = get_auth(app.clone(), &format!("/api/v1/students/{lead_id}"), &token).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response =
        post_auth(app, &format!("/api/v1/students/{lead_id}/confirm"), &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["data"]["tutorConfirmedAt"].is_string());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn concurrent_claims_have_exactly_one_winner(pool: PgPool) {
    let (alice, alice_token) = seed_tutor(&pool, "Alice Tutor").await;
    let (bob, bob_token) = seed_tutor(&pool, "Bob Tutor").await;
    let app = common::build_test_app(pool.clone());
    let lead_id = create_lead(app.clone(), "Sam Student").await;
    let uri = format!("/api/v1/leads/{lead_id}/claim");

    let (first, second) = futures::join!(
        post_auth(app.clone(), &uri, &alice_token),
        post_auth(app.clone(), &uri, &bob_token),
    );

    let mut statuses = vec![first.status(), second.status()];
    statuses.sort();
    assert_eq!(statuses, vec![StatusCode::OK, StatusCode::CONFLICT]);

    let (winner, loser) = if first.status() == StatusCode::OK {
        (body_json(first).await, body_json(second).await)
    } else {
        (body_json(second).await, body_json(first).await)
    };
    assert_eq!(winner["ok"], true);
    assert_eq!(winner["studentId"], lead_id.as_str());
    assert_eq!(loser["ok"], false);
    assert_eq!(loser["code"], "ALREADY_CLAIMED");
    assert_eq!(loser["error"], "This lead has already been claimed");

    let lead = LeadRepo::find_by_id(&pool, lead_id.parse().unwrap())
        .await
        .unwrap()
        .unwrap();
    let claimer = lead.claimed_tutor_id.unwrap();
    assert!(claimer == alice.id || claimer == bob.id);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn claim_of_a_contacted_lead_is_not_open(pool: PgPool) {
    let (_tutor, token) = seed_tutor(&pool, "Alice Tutor").await;
    let (_admin, admin_token) = seed_admin(&pool).await;
    let app = common::build_test_app(pool);
    let lead_id = create_lead(app.clone(), "Sam Student").await;

    let response = put_json_auth(
        app.clone(),
        &format!("/api/v1/admin/leads/{lead_id}/status"),
        serde_json::json!({ "status": "contacted" }),
        &admin_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = post_auth(app, &format!("/api/v1/leads/{lead_id}/claim"), &token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["code"], "NOT_OPEN");
    assert_eq!(json["error"], "This lead is not open anymore");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn claim_requires_a_token(pool: PgPool) {
    let app = common::build_test_app(pool);
    let lead_id = create_lead(app.clone(), "Sam Student").await;

    let response = post_json(
        app,
        &format!("/api/v1/leads/{lead_id}/claim"),
        serde_json::json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["code"], "UNAUTHENTICATED");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn claim_of_unknown_lead_is_404(pool: PgPool) {
    let (_tutor, token) = seed_tutor(&pool, "Alice Tutor").await;
    let app = common::build_test_app(pool);

    let uri = format!("/api/v1/leads/{}/claim", Uuid::new_v4());
    let response = post_auth(app, &uri, &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn tutors_only_list_open_leads(pool: PgPool) {
    let (_tutor, token) = seed_tutor(&pool, "Alice Tutor").await;
    let app = common::build_test_app(pool);
    let open = create_lead(app.clone(), "Open Student").await;
    let taken = create_lead(app.clone(), "Taken Student").await;

    let response = post_auth(app.clone(), &format!("/api/v1/leads/{taken}/claim"), &token).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get_auth(app, "/api/v1/leads?status=assigned", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let ids: Vec<&str> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![open.as_str()]);
}

// ---------------------------------------------------------------------------
// Admin assignment
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn admin_assigns_a_lead(pool: PgPool) {
    let (tutor, _token) = seed_tutor(&pool, "Alice Tutor").await;
    let (_admin, admin_token) = seed_admin(&pool).await;
    let app = common::build_test_app(pool);
    let lead_id = create_lead(app.clone(), "Sam Student").await;

    let response = post_json_auth(
        app.clone(),
        &format!("/api/v1/admin/leads/{lead_id}/assign"),
        serde_json::json!({ "tutorId": tutor.id }),
        &admin_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "assigned");
    assert_eq!(json["data"]["claimedTutorId"], tutor.id);

    // A second assignment is a claim conflict.
    let response = post_json_auth(
        app,
        &format!("/api/v1/admin/leads/{lead_id}/assign"),
        serde_json::json!({ "tutorId": tutor.id }),
        &admin_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "ALREADY_CLAIMED");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn tutors_cannot_assign(pool: PgPool) {
    let (tutor, token) = seed_tutor(&pool, "Alice Tutor").await;
    let app = common::build_test_app(pool);
    let lead_id = create_lead(app.clone(), "Sam Student").await;

    let response = post_json_auth(
        app,
        &format!("/api/v1/admin/leads/{lead_id}/assign"),
        serde_json::json!({ "tutorId": tutor.id }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["code"], "FORBIDDEN");
}
