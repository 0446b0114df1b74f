// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Health ---
        handlers::health::health,

        // --- Webhook ---
        handlers::webhooks::receive_default,
        handlers::webhooks::receive_for_tenant,

        // --- Admin ---
        handlers::admin::update_plan,
        handlers::admin::update_active,
        handlers::admin::reset_session,
    ),
    components(
        schemas(
            handlers::health::HealthResponse,

            // --- Webhook ---
            models::webhook::AckStatus,
            models::webhook::WebhookAck,

            // --- Tenancy ---
            models::tenancy::PlanTier,
            models::tenancy::UpdatePlanPayload,
            models::tenancy::UpdateActivePayload,
            models::tenancy::TenantStatusResponse,
        )
    ),
    tags(
        (name = "Health", description = "Estado do serviço"),
        (name = "Webhook", description = "Eventos de mensagens vindos do WhatsApp"),
        (name = "Admin", description = "Gestão de clínicas (superadmin)")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
