// src/handlers/webhooks.rs

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde_json::Value;

use crate::{config::AppState, models::webhook::WebhookAck};

const SECRET_HEADER: &str = "x-webhook-secret";

async fn dispatch(state: &AppState, slug: &str, headers: &HeaderMap, body: &[u8]) -> Json<WebhookAck> {
    // Corpo ilegível também recebe 200: o gateway não deve reenviar
    let payload: Value = match serde_json::from_slice(body) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!("Webhook com JSON inválido para '{}': {}", slug, e);
            return Json(WebhookAck::error("invalid_json"));
        }
    };

    let secret = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
    Json(state.dispatcher.receive(slug, payload, secret).await)
}

#[utoipa::path(
    post,
    path = "/webhook/{slug}",
    tag = "Webhook",
    request_body(content = String, content_type = "application/json"),
    responses(
        (status = 200, description = "Evento aceito, ignorado ou recusado", body = WebhookAck)
    ),
    params(
        ("slug" = String, Path, description = "Slug da clínica"),
        ("x-webhook-secret" = Option<String>, Header, description = "Segredo compartilhado da clínica")
    )
)]
pub async fn receive_for_tenant(
    State(app_state): State<AppState>,
    Path(slug): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<WebhookAck> {
    dispatch(&app_state, &slug, &headers, &body).await
}

/// Rota antiga, sem slug: vai para a clínica padrão.
#[utoipa::path(
    post,
    path = "/webhook",
    tag = "Webhook",
    request_body(content = String, content_type = "application/json"),
    responses(
        (status = 200, description = "Evento aceito, ignorado ou recusado", body = WebhookAck)
    )
)]
pub async fn receive_default(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<WebhookAck> {
    let slug = app_state.settings.default_tenant_slug.clone();
    dispatch(&app_state, &slug, &headers, &body).await
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use serde_json::json;
    use tower::ServiceExt;

    use crate::{
        handlers::test_support::test_state,
        handlers::router,
        testing::{organization, FakeGateway, FakeStore},
    };

    async fn post(app: axum::Router, uri: &str, body: &str, secret: Option<&str>) -> (StatusCode, serde_json::Value) {
        let mut request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(secret) = secret {
            request = request.header("x-webhook-secret", secret);
        }

        let response = app
            .oneshot(request.body(Body::from(body.to_string())).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn hello() -> String {
        json!({
            "data": {
                "key": { "remoteJid": "5491100000000@s.whatsapp.net" },
                "messageType": "conversation",
                "message": { "conversation": "hola" }
            }
        })
        .to_string()
    }

    #[tokio::test]
    async fn default_route_uses_central_tenant() {
        let store = Arc::new(FakeStore::default());
        store.add_organization(organization("central", None));
        let gateway = Arc::new(FakeGateway::default());
        let state = test_state(store, gateway.clone());

        let (status, body) = post(router(state.clone()), "/webhook", &hello(), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok" }));

        state.tasks.shutdown(Duration::from_secs(1)).await;
        assert_eq!(gateway.sent().len(), 1);
    }

    #[tokio::test]
    async fn unknown_tenant_is_acknowledged_as_ignored() {
        let state = test_state(Arc::new(FakeStore::default()), Arc::new(FakeGateway::default()));

        let (status, body) = post(router(state), "/webhook/nadie", &hello(), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ignored", "reason": "org_not_found" }));
    }

    #[tokio::test]
    async fn secret_header_is_checked() {
        let store = Arc::new(FakeStore::default());
        let mut org = organization("norte", None);
        org.webhook_secret = Some("s3cr3t".into());
        store.add_organization(org);
        let state = test_state(store, Arc::new(FakeGateway::default()));

        let (_, body) = post(router(state.clone()), "/webhook/norte", &hello(), Some("errado")).await;
        assert_eq!(body["status"], "forbidden");

        let (_, body) = post(router(state), "/webhook/norte", &hello(), Some("s3cr3t")).await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn garbage_body_still_gets_200() {
        let state = test_state(Arc::new(FakeStore::default()), Arc::new(FakeGateway::default()));

        let (status, body) = post(router(state), "/webhook/central", "{no es json", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "error");
    }
}
