//! Integration tests for recording check-ins and the verification gate.

mod common;

use assert_matches::assert_matches;
use axum::http::StatusCode;
use common::{body_json, meal, with, TestApp};
use serde_json::json;

const PHOTO: &str = "https://uploads.example.test/meal.jpg";

#[tokio::test]
async fn records_unverified_check_in() {
    let app = TestApp::new("2024-01-01").await;
    let enrollment = app.start().await;

    let response = app.check_in(enrollment, meal("2024-01-01", "Lunch")).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    assert_eq!(json["meal_type"], "lunch");
    assert_eq!(json["verified_with_token"], false);
    assert_eq!(json["enrollment_id"], enrollment.to_string());
}

#[tokio::test]
async fn duplicate_meal_type_is_rejected() {
    let app = TestApp::new("2024-01-01").await;
    let enrollment = app.start().await;

    let first = app.check_in(enrollment, meal("2024-01-01", "dinner")).await;
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = app.check_in(enrollment, meal("2024-01-01", "dinner")).await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    let json = body_json(second).await;
    assert_eq!(json["error"]["code"], "duplicate_meal_type");

    // Same meal on another date is fine
    let next_day = app.check_in(enrollment, meal("2024-01-02", "dinner")).await;
    assert_eq!(next_day.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn unknown_meal_type_is_rejected() {
    let app = TestApp::new("2024-01-01").await;
    let enrollment = app.start().await;

    let response = app.check_in(enrollment, meal("2024-01-01", "brunch")).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "invalid_meal_type");
}

#[tokio::test]
async fn out_of_range_fields_are_rejected() {
    let app = TestApp::new("2024-01-01").await;
    let enrollment = app.start().await;

    let response = app
        .check_in(
            enrollment,
            with(meal("2024-01-01", "lunch"), json!({ "energy_level": 9 })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "validation_error");
}

#[tokio::test]
async fn dates_outside_window_are_rejected() {
    let app = TestApp::new("2024-01-05").await;
    let enrollment = app.start().await;

    let before = app.check_in(enrollment, meal("2024-01-04", "lunch")).await;
    assert_eq!(before.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // Tomorrow is allowed for participants ahead of UTC, the day after is not
    let tomorrow = app.check_in(enrollment, meal("2024-01-06", "lunch")).await;
    assert_eq!(tomorrow.status(), StatusCode::CREATED);
    let later = app.check_in(enrollment, meal("2024-01-07", "lunch")).await;
    assert_eq!(later.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn validated_token_verifies_photo_check_in() {
    let app = TestApp::new("2024-01-01").await;
    let enrollment = app.start().await;
    let code = app.issue_code(enrollment).await;
    assert_eq!(app.validate_code(enrollment, &code).await["valid"], true);

    let response = app
        .check_in(
            enrollment,
            with(
                meal("2024-01-01", "lunch"),
                json!({ "photo_url": PHOTO, "verified_with_token": true }),
            ),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["verified_with_token"], true);

    // The token is now attached and cannot verify a second check-in
    let again = app
        .check_in(
            enrollment,
            with(
                meal("2024-01-01", "dinner"),
                json!({ "photo_url": PHOTO, "verified_with_token": true }),
            ),
        )
        .await;
    assert_eq!(again.status(), StatusCode::BAD_REQUEST);
    let json = body_json(again).await;
    assert_eq!(json["error"]["code"], "verification_required");
}

#[tokio::test]
async fn inline_code_verifies_and_consumes() {
    let app = TestApp::new("2024-01-01").await;
    let enrollment = app.start().await;
    let code = app.issue_code(enrollment).await;

    let response = app
        .check_in(
            enrollment,
            with(
                meal("2024-01-01", "breakfast"),
                json!({ "photo_url": PHOTO, "verification_code": code }),
            ),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["verified_with_token"], true);

    let reuse = app.validate_code(enrollment, &code).await;
    assert_eq!(reuse["valid"], false);
    assert_eq!(reuse["reason"], "no_active_token");
}

#[tokio::test]
async fn wrong_inline_code_stores_nothing() {
    let app = TestApp::new("2024-01-01").await;
    let enrollment = app.start().await;
    app.issue_code(enrollment).await;

    let response = app
        .check_in(
            enrollment,
            with(
                meal("2024-01-01", "breakfast"),
                json!({ "photo_url": PHOTO, "verification_code": "000000" }),
            ),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_matches!(json["error"]["message"].as_str(), Some(m) if m.contains("code_mismatch"));

    let list = body_json(app.get(&format!("/api/enrollments/{}/check-ins", enrollment)).await).await;
    assert_eq!(list.as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn pending_token_blocks_photo_until_abandoned() {
    let app = TestApp::new("2024-01-01").await;
    let enrollment = app.start().await;
    app.issue_code(enrollment).await;

    let photo = with(meal("2024-01-01", "lunch"), json!({ "photo_url": PHOTO }));
    let blocked = app.check_in(enrollment, photo.clone()).await;
    assert_eq!(blocked.status(), StatusCode::BAD_REQUEST);
    let json = body_json(blocked).await;
    assert_matches!(
        json["error"]["message"].as_str(),
        Some(m) if m.contains("verification_pending")
    );

    let skipped = app
        .check_in(enrollment, with(photo, json!({ "skip_verification": true })))
        .await;
    assert_eq!(skipped.status(), StatusCode::CREATED);
    assert_eq!(body_json(skipped).await["verified_with_token"], false);
}

#[tokio::test]
async fn verification_requires_photo() {
    let app = TestApp::new("2024-01-01").await;
    let enrollment = app.start().await;
    let code = app.issue_code(enrollment).await;

    let response = app
        .check_in(
            enrollment,
            with(meal("2024-01-01", "lunch"), json!({ "verification_code": code })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn completed_enrollment_rejects_check_ins() {
    let app = TestApp::new("2024-01-01").await;
    let enrollment = app.start().await;

    app.set_today("2024-01-21");
    let completed = app
        .post_json(&format!("/api/enrollments/{}/complete", enrollment), json!({}))
        .await;
    assert_eq!(completed.status(), StatusCode::OK);

    let response = app.check_in(enrollment, meal("2024-01-21", "lunch")).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "enrollment_not_active");
}

#[tokio::test]
async fn other_participants_enrollment_is_not_found() {
    let app = TestApp::new("2024-01-01").await;
    let enrollment = app.start().await;
    let intruder = app.other_user_token();

    let response = app
        .request(
            axum::http::Method::POST,
            &format!("/api/enrollments/{}/check-ins", enrollment),
            Some(&intruder),
            Some(meal("2024-01-01", "lunch")),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_is_chronological() {
    let app = TestApp::new("2024-01-02").await;
    let enrollment = app.start().await;

    app.check_in(enrollment, meal("2024-01-03", "lunch")).await;
    app.check_in(enrollment, meal("2024-01-02", "dinner")).await;

    let list = body_json(app.get(&format!("/api/enrollments/{}/check-ins", enrollment)).await).await;
    let dates: Vec<&str> = list
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|c| c["check_in_date"].as_str())
        .collect();
    assert_eq!(dates, vec!["2024-01-02", "2024-01-03"]);
}
