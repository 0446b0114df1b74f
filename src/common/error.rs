// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// O erro da aplicação. O pipeline de conversa quase nunca o propaga
// (falhas de provedor viram texto padrão), mas repositórios, clientes e
// rotas administrativas falam todos esta língua.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Token inválido")]
    InvalidToken,

    #[error("Acesso negado")]
    Forbidden,

    #[error("Clínica não encontrada: {0}")]
    TenantNotFound(String),

    #[error("Plano desconhecido: {0}")]
    UnknownPlan(String),

    #[error("Horário já ocupado para esta clínica")]
    SlotAlreadyBooked,

    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro de cache: {0}")]
    CacheError(#[from] redis::RedisError),

    #[error("Erro de HTTP: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Provedor {provider} respondeu {status}: {body}")]
    ProviderError {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("Configuração ausente: {0}")]
    MissingConfig(&'static str),

    #[error("Erro de JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "Token de autenticação inválido ou ausente.".to_string(),
            ),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                "Acesso restrito a superadministradores.".to_string(),
            ),
            AppError::TenantNotFound(slug) => (
                StatusCode::NOT_FOUND,
                format!("Clínica '{}' não encontrada.", slug),
            ),
            AppError::UnknownPlan(plan) => (
                StatusCode::BAD_REQUEST,
                format!("Plano '{}' não existe.", plan),
            ),
            AppError::SlotAlreadyBooked => (
                StatusCode::CONFLICT,
                "Este horário já está ocupado.".to_string(),
            ),

            // Todo o resto vira 500. O detalhe fica só no log.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Ocorreu um erro inesperado.".to_string(),
                )
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

/// Converte violação do índice único de agenda no erro de domínio.
pub(crate) fn map_booking_conflict(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            if db_err.constraint() == Some("idx_appointments_confirmed_slot") {
                return AppError::SlotAlreadyBooked;
            }
        }
    }
    e.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenant_not_found_maps_to_404() {
        let response = AppError::TenantNotFound("central".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn internal_errors_are_opaque_500() {
        let response = AppError::MissingConfig("OPENAI_API_KEY").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn invalid_token_maps_to_401() {
        assert_eq!(
            AppError::InvalidToken.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
