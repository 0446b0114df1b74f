// src/middleware/auth.rs

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::{common::error::AppError, config::AppState};

/// Claims do token administrativo. A emissão fica fora deste serviço.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminClaims {
    pub sub: String,
    pub exp: usize,
    #[serde(default)]
    pub superadmin: bool,
}

pub fn validate_admin_token(token: &str, secret: &str) -> Result<AdminClaims, AppError> {
    let validation = Validation::default();
    let token_data = decode::<AdminClaims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &validation,
    )
    .map_err(|_| AppError::InvalidToken)?;

    if !token_data.claims.superadmin {
        return Err(AppError::Forbidden);
    }

    Ok(token_data.claims)
}

// O middleware em si
pub async fn admin_guard(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let bearer = request
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or(AppError::InvalidToken)?;

    let claims = validate_admin_token(bearer.token(), &app_state.settings.admin_jwt_secret)?;
    tracing::debug!(admin = %claims.sub, "Acesso administrativo autorizado");

    // Insere as claims nos "extensions" da requisição
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

#[cfg(test)]
pub(crate) fn issue_test_token(secret: &str, superadmin: bool) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let claims = AdminClaims {
        sub: "admin@vet".into(),
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
        superadmin,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_ref())).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn superadmin_token_is_accepted() {
        let token = issue_test_token("segredo", true);
        let claims = validate_admin_token(&token, "segredo").unwrap();
        assert_eq!(claims.sub, "admin@vet");
    }

    #[test]
    fn regular_token_is_forbidden() {
        let token = issue_test_token("segredo", false);
        assert!(matches!(validate_admin_token(&token, "segredo"), Err(AppError::Forbidden)));
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let token = issue_test_token("segredo", true);
        assert!(matches!(validate_admin_token(&token, "outro"), Err(AppError::InvalidToken)));
    }
}
