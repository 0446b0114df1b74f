// src/clients/calendar.rs

use std::{path::Path, time::Duration};

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{sync::Mutex, time::Instant};

use crate::common::{clock::REFERENCE_TIMEZONE, error::AppError};

const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";
const CALENDAR_API: &str = "https://www.googleapis.com/calendar/v3/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    pub summary: String,
    pub description: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// Agenda externa da clínica.
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    async fn insert_event(&self, calendar_id: &str, event: &CalendarEvent)
        -> Result<(), AppError>;
}

// ---
// Conta de serviço do Google
// ---

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

#[derive(Debug, Serialize)]
struct GrantClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    value: String,
    valid_until: Instant,
}

pub struct GoogleCalendarClient {
    http: reqwest::Client,
    key: Option<ServiceAccountKey>,
    token: Mutex<Option<CachedToken>>,
}

impl GoogleCalendarClient {
    /// Lê o JSON da conta de serviço. Arquivo ausente ou inválido não
    /// impede a subida: o cliente fica sem credencial e cada inserção falha
    /// com `MissingConfig`, que a perna de calendário apenas loga.
    pub fn from_file(http: reqwest::Client, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let key = match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str::<ServiceAccountKey>(&raw) {
                Ok(key) => Some(key),
                Err(e) => {
                    tracing::warn!("Conta de serviço inválida em {}: {}", path.display(), e);
                    None
                }
            },
            Err(_) => {
                tracing::warn!(
                    "⚠️ Conta de serviço do Google não encontrada em {}. Calendário desativado.",
                    path.display()
                );
                None
            }
        };

        Self { http, key, token: Mutex::new(None) }
    }

    async fn access_token(&self, key: &ServiceAccountKey) -> Result<String, AppError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.valid_until > Instant::now() {
                return Ok(token.value.clone());
            }
        }

        let now = Utc::now().timestamp();
        let claims = GrantClaims {
            iss: &key.client_email,
            scope: CALENDAR_SCOPE,
            aud: &key.token_uri,
            iat: now,
            exp: now + 3600,
        };
        let assertion = encode(
            &Header::new(Algorithm::RS256),
            &claims,
            &EncodingKey::from_rsa_pem(key.private_key.as_bytes())?,
        )?;

        let response = self
            .http
            .post(&key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::ProviderError {
                provider: "google-oauth",
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let token: TokenResponse = response.json().await?;
        // Renova um minuto antes de vencer
        let lifetime = Duration::from_secs(token.expires_in.saturating_sub(60));
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            valid_until: Instant::now() + lifetime,
        });

        Ok(token.access_token)
    }
}

pub(crate) fn event_body(event: &CalendarEvent) -> serde_json::Value {
    json!({
        "summary": event.summary,
        "description": event.description,
        "start": {
            "dateTime": event.start.format("%Y-%m-%dT%H:%M:%S").to_string(),
            "timeZone": REFERENCE_TIMEZONE,
        },
        "end": {
            "dateTime": event.end.format("%Y-%m-%dT%H:%M:%S").to_string(),
            "timeZone": REFERENCE_TIMEZONE,
        },
    })
}

#[async_trait]
impl CalendarProvider for GoogleCalendarClient {
    async fn insert_event(
        &self,
        calendar_id: &str,
        event: &CalendarEvent,
    ) -> Result<(), AppError> {
        let key = self
            .key
            .as_ref()
            .ok_or(AppError::MissingConfig("GOOGLE_SERVICE_ACCOUNT_FILE"))?;
        let token = self.access_token(key).await?;

        let mut url = Url::parse(CALENDAR_API).map_err(anyhow::Error::from)?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("URL base do calendário inválida"))?
            .pop_if_empty()
            .extend(["calendars", calendar_id, "events"]);

        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&event_body(event))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::ProviderError {
                provider: "google-calendar",
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        tracing::info!("✅ Evento criado no calendário {}", calendar_id);
        Ok(())
    }
}
