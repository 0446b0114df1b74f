// src/clients/messaging.rs

use async_trait::async_trait;
use serde_json::json;

use crate::{common::error::AppError, models::tenancy::GatewayCredentials};

/// Envio de mensagens pelo gateway de WhatsApp.
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    async fn send_text(
        &self,
        creds: &GatewayCredentials,
        phone: &str,
        text: &str,
    ) -> Result<(), AppError>;
}

/// Cliente da Evolution API. O `reqwest::Client` é criado uma vez no
/// AppState (com timeout total de 10s) e compartilhado.
#[derive(Clone)]
pub struct EvolutionClient {
    http: reqwest::Client,
}

impl EvolutionClient {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl MessagingGateway for EvolutionClient {
    async fn send_text(
        &self,
        creds: &GatewayCredentials,
        phone: &str,
        text: &str,
    ) -> Result<(), AppError> {
        let base = creds
            .api_url
            .as_deref()
            .map(|u| u.trim_end_matches('/'))
            .filter(|u| !u.is_empty())
            .ok_or(AppError::MissingConfig("EVOLUTION_API_URL"))?;
        let key = creds
            .api_key
            .as_deref()
            .ok_or(AppError::MissingConfig("EVOLUTION_API_KEY"))?;
        let instance = creds.instance.as_deref().unwrap_or("DogBot");

        let clean_phone: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

        let payload = json!({
            "number": clean_phone,
            "text": text,
            "options": { "delay": 0, "presence": "composing", "linkPreview": false }
        });

        let response = self
            .http
            .post(format!("{}/message/sendText/{}", base, instance))
            .header("apikey", key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::ProviderError {
                provider: "evolution",
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        Ok(())
    }
}
