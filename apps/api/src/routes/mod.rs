pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::progression::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/catalogue", get(handlers::handle_catalogue))
        // Journey API
        .route("/api/v1/journeys", post(handlers::handle_create_journey))
        .route("/api/v1/journeys/:id", get(handlers::handle_get_journey))
        .route(
            "/api/v1/journeys/:id/evidence",
            post(handlers::handle_record_evidence),
        )
        .route(
            "/api/v1/journeys/:id/competencies",
            get(handlers::handle_list_competencies),
        )
        .route(
            "/api/v1/journeys/:id/competencies/:slug/history",
            get(handlers::handle_competency_history),
        )
        .route(
            "/api/v1/journeys/:id/readiness",
            get(handlers::handle_readiness),
        )
        .route(
            "/api/v1/journeys/:id/exit-eligibility",
            get(handlers::handle_exit_eligibility),
        )
        .route(
            "/api/v1/journeys/:id/graduate",
            post(handlers::handle_graduate),
        )
        // Workspace phase tracker
        .route(
            "/api/v1/journeys/:id/phase",
            get(handlers::handle_phase_status),
        )
        .route(
            "/api/v1/journeys/:id/phase/advance",
            post(handlers::handle_advance_phase),
        )
        .route(
            "/api/v1/journeys/:id/phase/guard",
            get(handlers::handle_phase_guard),
        )
        // Sprint board
        .route(
            "/api/v1/journeys/:id/sprint",
            get(handlers::handle_current_sprint).post(handlers::handle_start_sprint),
        )
        .route(
            "/api/v1/journeys/:id/sprint/day",
            post(handlers::handle_advance_sprint_day),
        )
        .route(
            "/api/v1/journeys/:id/sprint/tickets/:ticket_id/advance",
            post(handlers::handle_advance_ticket),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::progression::policy::fixtures::test_config;
    use crate::progression::service::ProgressionService;
    use crate::progression::store::MemoryProgressStore;

    fn app() -> Router {
        let policy = Arc::new(test_config());
        let progression =
            ProgressionService::new(policy.clone(), Arc::new(MemoryProgressStore::new()));
        build_router(AppState {
            policy,
            progression,
        })
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                req = req.header(header::CONTENT_TYPE, "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let response = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn create_journey(app: &Router) -> String {
        let (status, body) = send(
            app,
            Method::POST,
            "/api/v1/journeys",
            Some(json!({ "user_id": Uuid::new_v4(), "path_slug": "job_ready", "role": "developer" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(&app(), Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_record_evidence_returns_delta() {
        let app = app();
        let id = create_journey(&app).await;
        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/api/v1/journeys/{id}/evidence"),
            Some(json!({ "source": "interview", "competency_slug": "debugging", "score": 80.0 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["previous_band"], "explorer");
        assert_eq!(body["new_band"], "contributor");
        assert_eq!(body["band_changed"], true);
        assert_eq!(body["evidence_count"], 1);
    }

    #[tokio::test]
    async fn test_unknown_competency_is_bad_request() {
        let app = app();
        let id = create_journey(&app).await;
        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/api/v1/journeys/{id}/evidence"),
            Some(json!({ "source": "soft_skill", "competency_slug": "juggling", "evidence_type": "retro_insight" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_missing_journey_is_not_found() {
        let (status, body) = send(
            &app(),
            Method::GET,
            &format!("/api/v1/journeys/{}/readiness", Uuid::new_v4()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_phase_advance_and_guard() {
        let app = app();
        let id = create_journey(&app).await;

        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/api/v1/journeys/{id}/phase/advance"),
            Some(json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["to"], "planning");

        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/api/v1/journeys/{id}/phase/advance"),
            Some(json!({ "target": "review" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &app,
            Method::GET,
            &format!("/api/v1/journeys/{id}/phase/guard?required=execution"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "locked");
    }

    #[tokio::test]
    async fn test_fresh_journey_readiness_and_exit() {
        let app = app();
        let id = create_journey(&app).await;

        let (status, body) = send(&app, Method::GET, &format!("/api/v1/journeys/{id}/readiness"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["overall"], 0.0);

        let (status, body) = send(
            &app,
            Method::GET,
            &format!("/api/v1/journeys/{id}/exit-eligibility"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["recommendation"], "continue");
        assert_eq!(body["can_exit"], false);

        let (status, _) = send(&app, Method::POST, &format!("/api/v1/journeys/{id}/graduate"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_sprint_board_ticket_to_evidence() {
        let app = app();
        let id = create_journey(&app).await;
        let board = json!({
            "theme": "Checkout reliability",
            "goal": "Cut failed payments in half",
            "tickets": [{ "id": "PAY-1", "title": "Fix retry loop", "competency_slug": "debugging" }]
        });

        let (status, _) = send(&app, Method::POST, &format!("/api/v1/journeys/{id}/sprint"), Some(board.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        send(&app, Method::POST, &format!("/api/v1/journeys/{id}/phase/advance"), Some(json!({}))).await;
        let (status, _) = send(&app, Method::GET, &format!("/api/v1/journeys/{id}/sprint"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(&app, Method::POST, &format!("/api/v1/journeys/{id}/sprint"), Some(board)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["tickets"][0]["status"], "todo");

        let uri = format!("/api/v1/journeys/{id}/sprint/tickets/PAY-1/advance");
        send(&app, Method::POST, &uri, None).await;
        send(&app, Method::POST, &uri, None).await;
        let (status, body) = send(&app, Method::POST, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sprint"]["tickets"][0]["status"], "done");
        assert_eq!(body["delta"]["competency_slug"], "debugging");
        assert_eq!(body["delta"]["evidence_count"], 1);

        let (status, body) = send(&app, Method::POST, &format!("/api/v1/journeys/{id}/sprint/day"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["day"], 2);
    }

    #[tokio::test]
    async fn test_catalogue_lists_policy() {
        let (status, body) = send(&app(), Method::GET, "/api/v1/catalogue", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["competencies"].as_array().unwrap().len(), 3);
        assert_eq!(body["roles"][0], "developer");
    }
}
