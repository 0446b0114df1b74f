// src/handlers.rs

pub mod admin;
pub mod health;
pub mod webhooks;

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{config::AppState, docs::ApiDoc, middleware::auth::admin_guard};

/// Monta o router completo da aplicação.
pub fn router(app_state: AppState) -> Router {
    // Rotas do gateway (públicas, protegidas pelo segredo da clínica)
    let webhook_routes = Router::new()
        .route("/webhook", post(webhooks::receive_default))
        .route("/webhook/{slug}", post(webhooks::receive_for_tenant));

    // Painel administrativo: só superadmin
    let admin_routes = Router::new()
        .route("/tenants/{slug}/plan", put(admin::update_plan))
        .route("/tenants/{slug}/active", put(admin::update_active))
        .route("/sessions/{phone}", delete(admin::reset_session))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            admin_guard,
        ));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", get(health::health))
        .merge(webhook_routes)
        .nest("/api/admin", admin_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
