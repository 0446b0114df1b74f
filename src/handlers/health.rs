// src/handlers/health.rs

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::config::AppState;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    #[schema(example = "OK")]
    pub status: &'static str,
    /// Turnos e agendamentos ainda em execução em segundo plano.
    pub pending_tasks: usize,
}

// GET /api/health
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Health",
    responses((status = 200, description = "Serviço no ar", body = HealthResponse))
)]
pub async fn health(State(app_state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        pending_tasks: app_state.tasks.pending(),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{body::Body, http::Request};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::{
        handlers::{router, test_support::test_state},
        testing::{FakeGateway, FakeStore},
    };

    #[tokio::test]
    async fn reports_ok_without_auth() {
        let state = test_state(Arc::new(FakeStore::default()), Arc::new(FakeGateway::default()));

        let response = router(state)
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.status().is_success());

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "OK");
        assert_eq!(body["pendingTasks"], 0);
    }
}
