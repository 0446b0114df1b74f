// src/models/tenancy.rs

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::common::error::AppError;

// ---
// 1. Organization (A "Clínica")
// ---
// Linha canônica da tabela `organizations`. Quem muda plano/ativo é o painel
// administrativo; o núcleo só lê um snapshot em cache (TenantConfig).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub is_active: bool,

    #[serde(skip_serializing)]
    pub evolution_api_url: Option<String>,
    #[serde(skip_serializing)]
    pub evolution_api_key: Option<String>,
    #[serde(skip_serializing)]
    pub evolution_instance: Option<String>,
    #[serde(skip_serializing)]
    pub openai_api_key: Option<String>,
    #[serde(skip_serializing)]
    pub webhook_secret: Option<String>,

    pub google_calendar_id: Option<String>,

    pub plan_type: Option<String>,

    pub created_at: DateTime<Utc>,
}

// ---
// 2. Planos
// ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Lite,
    Basic,
    Pro,
    Premium,
}

/// Funcionalidades controladas pelo plano.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    VoiceNotes,
    ImageAnalysis,
}

impl Feature {
    fn required_rank(self) -> u8 {
        match self {
            Feature::VoiceNotes | Feature::ImageAnalysis => 2,
        }
    }
}

impl PlanTier {
    // Pro e Premium são o mesmo nível
    pub fn rank(self) -> u8 {
        match self {
            PlanTier::Lite => 0,
            PlanTier::Basic => 1,
            PlanTier::Pro | PlanTier::Premium => 2,
        }
    }

    pub fn allows(self, feature: Feature) -> bool {
        self.rank() >= feature.required_rank()
    }

    /// Leitura tolerante da coluna `plan_type`: ausente vira Pro,
    /// texto desconhecido vira Lite (o menor privilégio).
    pub fn from_column(value: Option<&str>) -> Self {
        match value {
            None => PlanTier::Pro,
            Some(v) => v.parse().unwrap_or(PlanTier::Lite),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PlanTier::Lite => "lite",
            PlanTier::Basic => "basic",
            PlanTier::Pro => "pro",
            PlanTier::Premium => "premium",
        }
    }
}

impl FromStr for PlanTier {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lite" => Ok(PlanTier::Lite),
            "basic" => Ok(PlanTier::Basic),
            "pro" => Ok(PlanTier::Pro),
            "premium" => Ok(PlanTier::Premium),
            other => Err(AppError::UnknownPlan(other.to_string())),
        }
    }
}

impl fmt::Display for PlanTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---
// 3. Snapshot de configuração (o que vai para o cache)
// ---

/// Credenciais do gateway de WhatsApp (Evolution API).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayCredentials {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub instance: Option<String>,
}

/// Valores de ambiente usados quando a clínica não configurou os seus.
#[derive(Debug, Clone, Default)]
pub struct CredentialFallbacks {
    pub evolution_api_url: Option<String>,
    pub evolution_api_key: Option<String>,
    pub evolution_instance: Option<String>,
    pub openai_api_key: Option<String>,
}

/// Configuração imutável e tipada de uma clínica. Os fallbacks de ambiente
/// são resolvidos uma única vez, na carga.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantConfig {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub is_active: bool,
    pub plan: PlanTier,
    pub gateway: GatewayCredentials,
    pub openai_api_key: Option<String>,
    pub calendar_id: Option<String>,
    pub webhook_secret: Option<String>,
}

impl TenantConfig {
    pub fn resolve(org: Organization, fallbacks: &CredentialFallbacks) -> Self {
        fn pick(own: Option<String>, fallback: &Option<String>) -> Option<String> {
            own.filter(|v| !v.trim().is_empty())
                .or_else(|| fallback.clone())
        }

        Self {
            id: org.id,
            plan: PlanTier::from_column(org.plan_type.as_deref()),
            gateway: GatewayCredentials {
                api_url: pick(org.evolution_api_url, &fallbacks.evolution_api_url),
                api_key: pick(org.evolution_api_key, &fallbacks.evolution_api_key),
                instance: pick(org.evolution_instance, &fallbacks.evolution_instance),
            },
            openai_api_key: pick(org.openai_api_key, &fallbacks.openai_api_key),
            calendar_id: org.google_calendar_id.filter(|v| !v.trim().is_empty()),
            webhook_secret: org.webhook_secret.filter(|v| !v.is_empty()),
            name: org.name,
            slug: org.slug,
            is_active: org.is_active,
        }
    }
}

// ---
// 4. Payloads administrativos
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePlanPayload {
    #[validate(length(min = 3, message = "O plano é obrigatório."))]
    #[schema(example = "pro")]
    pub plan: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateActivePayload {
    #[schema(example = false)]
    pub active: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TenantStatusResponse {
    #[schema(example = "central")]
    pub slug: String,
    #[schema(example = "pro")]
    pub plan: PlanTier,
    pub is_active: bool,
}
