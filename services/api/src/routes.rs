use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Extension, Json, Router};
use serde_json::json;

use crate::infra::AppState;
use loanflow::pipeline::bus::EventPublisher;
use loanflow::pipeline::domain::ApplicationId;
use loanflow::pipeline::events::ApplicationReceived;
use loanflow::pipeline::intake::{
    ApplicantChecks, IntakeError, IntakeService, LoanApplicationRequest, SnapshotStore, StoreError,
};
use loanflow::pipeline::StatusUpdateRequest;

/// Router exposing intake and the decision status callback.
pub(crate) fn application_router<S, P, C>(service: Arc<IntakeService<S, P, C>>) -> Router
where
    S: SnapshotStore + 'static,
    P: EventPublisher<ApplicationReceived> + 'static,
    C: ApplicantChecks + 'static,
{
    Router::new()
        .route("/api/v1/applications", post(submit_handler::<S, P, C>))
        .route(
            "/api/v1/applications/:application_id",
            get(status_handler::<S, P, C>),
        )
        .route(
            "/api/v1/applications/:application_id/status",
            put(update_status_handler::<S, P, C>),
        )
        .with_state(service)
}

pub(crate) fn with_operational_routes(router: Router) -> Router {
    router
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn submit_handler<S, P, C>(
    State(service): State<Arc<IntakeService<S, P, C>>>,
    Json(request): Json<LoanApplicationRequest>,
) -> Response
where
    S: SnapshotStore + 'static,
    P: EventPublisher<ApplicationReceived> + 'static,
    C: ApplicantChecks + 'static,
{
    match service.submit(request).await {
        Ok(record) => (StatusCode::ACCEPTED, Json(record.status_view())).into_response(),
        Err(IntakeError::Validation(message)) => {
            let payload = json!({ "error": message });
            (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
        }
        Err(IntakeError::Store(StoreError::Conflict)) => {
            let payload = json!({ "error": "application already exists" });
            (StatusCode::CONFLICT, Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({ "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}

pub(crate) async fn status_handler<S, P, C>(
    State(service): State<Arc<IntakeService<S, P, C>>>,
    Path(application_id): Path<String>,
) -> Response
where
    S: SnapshotStore + 'static,
    P: EventPublisher<ApplicationReceived> + 'static,
    C: ApplicantChecks + 'static,
{
    let id = ApplicationId(application_id);
    match service.get(&id) {
        Ok(record) => (StatusCode::OK, Json(record.status_view())).into_response(),
        Err(IntakeError::NotFound(_)) => {
            let payload = json!({
                "application_id": id.0,
                "error": "application not found",
            });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({ "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}

/// The decision engine's synchronous callback lands here.
pub(crate) async fn update_status_handler<S, P, C>(
    State(service): State<Arc<IntakeService<S, P, C>>>,
    Path(application_id): Path<String>,
    Json(request): Json<StatusUpdateRequest>,
) -> Response
where
    S: SnapshotStore + 'static,
    P: EventPublisher<ApplicationReceived> + 'static,
    C: ApplicantChecks + 'static,
{
    let id = ApplicationId(application_id);
    match service.apply_decision(&id, &request) {
        Ok(record) => (StatusCode::OK, Json(record.status_view())).into_response(),
        Err(IntakeError::NotFound(_)) => {
            let payload = json!({
                "application_id": id.0,
                "error": "application not found",
            });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({ "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::demo_pipeline;
    use axum::body::Body;
    use axum::http::Request;
    use tower::util::ServiceExt;

    fn demo_router() -> Router {
        let (intake, _store) = demo_pipeline().expect("demo pipeline builds");
        application_router(intake)
    }

    #[tokio::test]
    async fn submit_endpoint_accepts_a_valid_application() {
        let router = demo_router();
        let body = serde_json::json!({
            "cpf": "39053344705",
            "dateOfBirth": "1990-03-14",
            "amountRequested": "5000.00",
            "numberOfInstallments": 12,
            "monthlyIncome": "3000.00",
        });

        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/applications")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .expect("request builds"),
            )
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn submit_endpoint_rejects_blocked_applicants() {
        let router = demo_router();
        // Trailing 00 marks the CPF irregular in the stub sandbox.
        let body = serde_json::json!({
            "cpf": "39053344700",
            "dateOfBirth": "1990-03-14",
            "amountRequested": "5000.00",
            "numberOfInstallments": 12,
            "monthlyIncome": "3000.00",
        });

        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/applications")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .expect("request builds"),
            )
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn status_endpoint_returns_not_found_for_unknown_ids() {
        let router = demo_router();

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/api/v1/applications/missing")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
