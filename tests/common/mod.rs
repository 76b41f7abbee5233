#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request, Response};
use axum::Router;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use oilcheck_api::auth::jwt::create_access_token;
use oilcheck_api::config::{Config, StorageBackend};
use oilcheck_api::db::MemoryStore;
use oilcheck_api::models::challenge::Challenge;
use oilcheck_api::services::clock::FixedClock;
use oilcheck_api::{build_router, AppState};

/// Config with in-memory storage and the production defaults for tokens.
pub fn test_config() -> Config {
    Config {
        storage_backend: StorageBackend::Memory,
        database_url: None,
        host: "127.0.0.1".to_string(),
        port: 0,
        frontend_url: "http://localhost:3000".to_string(),
        jwt_secret: "test-secret".to_string(),
        jwt_access_ttl_secs: 900,
        token_window_secs: 600,
        token_code_length: 6,
        token_issue_max: 5,
        token_issue_window_secs: 300,
        verification_bonus_points: 30,
    }
}

pub fn at(date: NaiveDate, hour: u32) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(hour, 0, 0).expect("valid hour"))
}

pub fn date(s: &str) -> NaiveDate {
    s.parse().expect("valid date")
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub clock: Arc<FixedClock>,
    pub store: MemoryStore,
    pub challenge_id: Uuid,
    pub user_id: Uuid,
    pub token: String,
}

impl TestApp {
    /// A 21-day challenge, one participant, and the clock at noon UTC on `today`.
    pub async fn new(today: &str) -> Self {
        let config = Arc::new(test_config());
        let clock = Arc::new(FixedClock::new(at(date(today), 12)));
        let store = MemoryStore::new();

        let challenge_id = Uuid::new_v4();
        store
            .insert_challenge(Challenge {
                id: challenge_id,
                title: "21-Day Low Oil Challenge".to_string(),
                description: None,
                duration_days: 21,
                reward_points: 500,
                challenge_type: "oil_reduction".to_string(),
                created_at: Utc::now(),
            })
            .await;

        let state = AppState::new(Arc::new(store.clone()), config.clone(), clock.clone());
        let router = build_router(state.clone());

        let user_id = Uuid::new_v4();
        let token = create_access_token(user_id, &config).expect("token");

        Self {
            router,
            state,
            clock,
            store,
            challenge_id,
            user_id,
            token,
        }
    }

    pub fn set_today(&self, day: &str) {
        self.clock.set(at(date(day), 12));
    }

    /// Access token for a different participant.
    pub fn other_user_token(&self) -> String {
        create_access_token(Uuid::new_v4(), &self.state.config).expect("token")
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.router
            .clone()
            .oneshot(builder.body(body).expect("request"))
            .await
            .expect("infallible")
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> Response<Body> {
        self.request(Method::POST, uri, Some(&self.token), Some(body))
            .await
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.request(Method::GET, uri, Some(&self.token), None).await
    }

    /// Starts the challenge today and returns the enrollment id.
    pub async fn start(&self) -> Uuid {
        let response = self
            .post_json(
                &format!("/api/challenges/{}/start", self.challenge_id),
                serde_json::json!({}),
            )
            .await;
        assert_eq!(response.status(), 200);
        let json = body_json(response).await;
        json["id"].as_str().expect("id").parse().expect("uuid")
    }

    pub async fn issue_code(&self, enrollment_id: Uuid) -> String {
        let response = self
            .post_json(
                &format!("/api/enrollments/{}/token", enrollment_id),
                serde_json::json!({}),
            )
            .await;
        assert_eq!(response.status(), 200);
        let json = body_json(response).await;
        json["code"].as_str().expect("code").to_string()
    }

    pub async fn validate_code(&self, enrollment_id: Uuid, code: &str) -> Value {
        let response = self
            .post_json(
                &format!("/api/enrollments/{}/token/validate", enrollment_id),
                serde_json::json!({ "code": code }),
            )
            .await;
        assert_eq!(response.status(), 200);
        body_json(response).await
    }

    pub async fn check_in(&self, enrollment_id: Uuid, body: Value) -> Response<Body> {
        self.post_json(&format!("/api/enrollments/{}/check-ins", enrollment_id), body)
            .await
    }
}

/// Minimal valid check-in payload; tests merge extra fields on top.
pub fn meal(day: &str, meal_type: &str) -> Value {
    serde_json::json!({
        "check_in_date": day,
        "meal_type": meal_type,
        "oil_type": "olive",
        "oil_quantity_ml": 10.0,
        "cooking_method": "steamed",
    })
}

pub fn with(mut base: Value, extra: Value) -> Value {
    if let (Some(base), Some(extra)) = (base.as_object_mut(), extra.as_object()) {
        for (k, v) in extra {
            base.insert(k.clone(), v.clone());
        }
    }
    base
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).expect("json body")
}
