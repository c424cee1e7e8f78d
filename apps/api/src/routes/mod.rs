pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};

use crate::auth::handlers as auth;
use crate::marketplace::handlers as marketplace;
use crate::matching::handlers as matching;
use crate::messaging::handlers as messaging;
use crate::notifications::handlers as notifications;
use crate::offers::handlers as offers;
use crate::realtime::ws;
use crate::state::AppState;
use crate::storage::MAX_CV_BYTES;
use crate::users::handlers as users;

/// Room for the multipart framing around a maximum-size CV.
const CV_BODY_LIMIT: usize = MAX_CV_BYTES + 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/ws", get(ws::handle_ws))
        // Accounts
        .route("/api/auth/register", post(auth::handle_register))
        .route("/api/auth/login", post(auth::handle_login))
        .route("/api/auth/refresh", post(auth::handle_refresh))
        .route("/api/auth/logout", post(auth::handle_logout))
        .route("/api/users", get(users::handle_list_users))
        .route(
            "/api/users/me",
            get(users::handle_get_me).put(users::handle_update_me),
        )
        .route(
            "/api/users/me/cv",
            post(users::handle_upload_cv).layer(DefaultBodyLimit::max(CV_BODY_LIMIT)),
        )
        .route("/api/users/me/stats", get(users::handle_user_stats))
        .route("/api/admin/stats", get(users::handle_admin_stats))
        // Offers & applications
        .route("/api/offers", get(offers::handle_list).post(offers::handle_create))
        .route("/api/offers/mine", get(offers::handle_list_mine))
        .route(
            "/api/offers/:id",
            get(offers::handle_get)
                .put(offers::handle_update)
                .delete(offers::handle_delete),
        )
        .route("/api/offers/:id/apply", post(offers::handle_apply))
        .route(
            "/api/offers/:id/applications",
            get(offers::handle_offer_applications),
        )
        .route(
            "/api/offers/applications/mine",
            get(offers::handle_my_applications),
        )
        .route(
            "/api/offers/applications/:id",
            put(offers::handle_update_application),
        )
        .route("/api/stats/offers", get(offers::handle_stats))
        // Marketplace
        .route(
            "/api/marketplace/talent/profile",
            get(marketplace::handle_get_own_profile).put(marketplace::handle_upsert_profile),
        )
        .route("/api/marketplace/talent/:id", get(marketplace::handle_get_profile))
        .route("/api/marketplace/talents/search", get(marketplace::handle_search))
        .route("/api/marketplace/requests", post(marketplace::handle_create_request))
        .route("/api/marketplace/requests/mine", get(marketplace::handle_my_requests))
        .route(
            "/api/marketplace/requests/:id/matches",
            get(marketplace::handle_request_matches),
        )
        .route(
            "/api/marketplace/matches/talent",
            get(marketplace::handle_talent_matches),
        )
        .route(
            "/api/marketplace/matches/:id/status",
            put(marketplace::handle_update_match_status),
        )
        .route("/api/marketplace/stats", get(marketplace::handle_stats))
        // Matching
        .route(
            "/api/matching/calculate/:profile_id/offers/:offer_id",
            get(matching::handle_calculate),
        )
        .route(
            "/api/matching/recommendations",
            get(matching::handle_recommendations),
        )
        .route(
            "/api/matching/offers/:id/candidates",
            get(matching::handle_offer_candidates),
        )
        .route("/api/matching/history", get(matching::handle_history))
        .route("/api/matching/stats", get(matching::handle_stats))
        // Notifications
        .route("/api/notifications", get(notifications::handle_list))
        .route("/api/notifications/stats", get(notifications::handle_stats))
        .route(
            "/api/notifications/read-all",
            put(notifications::handle_mark_all_read),
        )
        .route(
            "/api/notifications/:id",
            axum::routing::delete(notifications::handle_delete),
        )
        .route(
            "/api/notifications/:id/read",
            put(notifications::handle_mark_read),
        )
        // Messaging
        .route("/api/messages", post(messaging::handle_send))
        .route(
            "/api/messages/conversations",
            get(messaging::handle_conversations),
        )
        .route(
            "/api/messages/conversations/:peer_id",
            get(messaging::handle_thread),
        )
        .route("/api/messages/:id/read", put(messaging::handle_mark_read))
        .route("/api/messages/stats", get(messaging::handle_stats))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use aws_sdk_s3::config::{BehaviorVersion, Region};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::auth::tokens::{issue, TokenKind};
    use crate::config::Config;
    use crate::matching::scorer::WeightedMatchScorer;
    use crate::models::user::Role;
    use crate::realtime::hub::RealtimeHub;

    /// State whose pool never connects; routes under test must answer before
    /// touching the database.
    fn test_state() -> AppState {
        let config = Config::for_tests();
        let db = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .expect("lazy pool");
        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .build();
        AppState {
            db,
            s3: aws_sdk_s3::Client::from_conf(s3_config),
            config,
            scorer: Arc::new(WeightedMatchScorer::default()),
            hub: RealtimeHub::new(16, None),
        }
    }

    fn bearer(role: Role) -> String {
        let token = issue(
            &Config::for_tests().jwt_secret,
            Uuid::new_v4(),
            role,
            TokenKind::Access,
        )
        .unwrap();
        format!("Bearer {token}")
    }

    fn multipart_body(field: &str, file_name: &str, size: usize) -> Vec<u8> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: application/pdf\r\n\r\n"
        )
        .into_bytes();
        body.extend(std::iter::repeat(b'%').take(size));
        body.extend(format!("\r\n--{BOUNDARY}--\r\n").into_bytes());
        body
    }

    const BOUNDARY: &str = "cv-upload-boundary";

    async fn upload(body: Vec<u8>) -> axum::response::Response {
        build_router(test_state())
            .oneshot(
                Request::post("/api/users/me/cv")
                    .header(header::AUTHORIZATION, bearer(Role::Candidate))
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={BOUNDARY}"),
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = build_router(test_state())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_protected_route_requires_token() {
        let response = build_router(test_state())
            .oneshot(Request::get("/api/users/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"]["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_garbage_token_is_rejected() {
        let response = build_router(test_state())
            .oneshot(
                Request::get("/api/notifications")
                    .header(header::AUTHORIZATION, "Bearer nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_candidate_cannot_create_offer() {
        let response = build_router(test_state())
            .oneshot(
                Request::post("/api/offers")
                    .header(header::AUTHORIZATION, bearer(Role::Candidate))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"title":"Backend developer"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_recruiter_cannot_write_talent_profile() {
        let response = build_router(test_state())
            .oneshot(
                Request::put("/api/marketplace/talent/profile")
                    .header(header::AUTHORIZATION, bearer(Role::Recruiter))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"title":"Rust developer"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_search_validates_pagination() {
        let response = build_router(test_state())
            .oneshot(
                Request::get("/api/marketplace/talents/search?limit=0")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_logout_clears_cookies() {
        let response = build_router(test_state())
            .oneshot(
                Request::post("/api/auth/logout")
                    .header(header::COOKIE, "token=a; refresh_token=r")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cookies: Vec<_> = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert_eq!(cookies.len(), 2);
        assert!(cookies.iter().all(|c| c.contains("Max-Age=0") && c.contains("Path=/")));
        assert!(cookies.iter().any(|c| c.starts_with("token=")));
        assert!(cookies.iter().any(|c| c.starts_with("refresh_token=")));
    }

    #[tokio::test]
    async fn test_refresh_reads_cookie() {
        let response = build_router(test_state())
            .oneshot(
                Request::post("/api/auth/refresh")
                    .header(header::COOKIE, "refresh_token=not-a-jwt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_ne!(body["error"]["message"], "refresh token required");
    }

    #[tokio::test]
    async fn test_register_rejects_admin_role() {
        let response = build_router(test_state())
            .oneshot(
                Request::post("/api/auth/register")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        r#"{"email":"a@b.co","password":"longenough","first_name":"A","last_name":"B","role":"admin"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_cv_upload_accepts_bodies_above_default_limit() {
        // A 3 MiB part must be streamed past before the missing `cv` field is noticed.
        let response = upload(multipart_body("notes", "notes.pdf", 3 * 1024 * 1024)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await["error"]["message"],
            "missing `cv` file field"
        );
    }

    #[tokio::test]
    async fn test_cv_upload_rejects_oversized_body() {
        let response = upload(multipart_body("notes", "notes.pdf", 6 * 1024 * 1024)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_ne!(
            body_json(response).await["error"]["message"],
            "missing `cv` file field"
        );
    }

    #[tokio::test]
    async fn test_search_rejects_overflowing_page() {
        let response = build_router(test_state())
            .oneshot(
                Request::get("/api/marketplace/talents/search?page=9223372036854775807")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_admin_stats_forbidden_for_recruiter() {
        let response = build_router(test_state())
            .oneshot(
                Request::get("/api/admin/stats")
                    .header(header::AUTHORIZATION, bearer(Role::Recruiter))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(response).await["error"]["code"], "FORBIDDEN");
    }
}
