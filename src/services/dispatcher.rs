// src/services/dispatcher.rs

use serde_json::Value;
use subtle::ConstantTimeEq;

use crate::{
    common::tasks::TaskSupervisor,
    models::{tenancy::TenantConfig, webhook::WebhookAck},
    services::{dialogue::DialogueEngine, org_config::OrgConfigCache},
};

fn secret_matches(expected: &str, provided: Option<&str>) -> bool {
    match provided {
        Some(provided) => bool::from(expected.as_bytes().ct_eq(provided.as_bytes())),
        None => false,
    }
}

/// Porta de entrada do webhook.
///
/// Resolve a clínica, autentica e agenda o turno no supervisor. A resposta
/// ao gateway sai antes de qualquer processamento da mensagem.
#[derive(Clone)]
pub struct InboundDispatcher {
    configs: OrgConfigCache,
    engine: DialogueEngine,
    tasks: TaskSupervisor,
}

impl InboundDispatcher {
    pub fn new(configs: OrgConfigCache, engine: DialogueEngine, tasks: TaskSupervisor) -> Self {
        Self { configs, engine, tasks }
    }

    pub async fn receive(
        &self,
        slug: &str,
        payload: Value,
        secret_header: Option<&str>,
    ) -> WebhookAck {
        let tenant = match self.configs.resolve(slug).await {
            Ok(Some(tenant)) if tenant.is_active => tenant,
            Ok(_) => {
                tracing::info!("Clínica '{}' inexistente ou inativa, ignorando", slug);
                return WebhookAck::ignored("org_not_found");
            }
            Err(e) => {
                tracing::error!("❌ Falha ao resolver a clínica '{}': {}", slug, e);
                return WebhookAck::error("tenant_lookup_failed");
            }
        };

        if let Some(expected) = tenant.webhook_secret.as_deref() {
            if !secret_matches(expected, secret_header) {
                tracing::warn!("🔒 Segredo de webhook inválido para '{}'", slug);
                return WebhookAck::forbidden();
            }
        }

        self.hand_off(tenant, payload)
    }

    fn hand_off(&self, tenant: TenantConfig, payload: Value) -> WebhookAck {
        let engine = self.engine.clone();
        let scheduled = self.tasks.spawn("dialogue_turn", async move {
            engine.process_payload(&tenant, &payload).await;
        });

        if scheduled {
            tracing::debug!("Mensagem encaminhada para processamento");
            WebhookAck::ok()
        } else {
            WebhookAck::error("shutting_down")
        }
    }
}
