use axum::routing::{get, post};
use axum::Router;

use super::handlers;
use super::types::SharedState;

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(handlers::core::health))
        .route("/api/orgs/:code/overview", get(handlers::overview::overview))
        .route(
            "/api/orgs/:code/skills/:skill",
            get(handlers::skills::skill_report),
        )
        .route(
            "/api/orgs/:code/students/:user_id",
            get(handlers::students::student_report),
        )
        .route(
            "/api/orgs/:code/students/:user_id/conversations",
            get(handlers::conversations::conversations),
        )
        .route("/api/orgs/:code/streaks", get(handlers::streaks::streak_report))
        .route("/api/enrollments", post(handlers::enrollments::enroll))
        .route(
            "/api/enrollments/bulk",
            post(handlers::enrollments::enroll_bulk),
        )
        .route(
            "/api/webhooks/identity",
            post(handlers::webhook::identity_webhook),
        )
        .with_state(state)
}
