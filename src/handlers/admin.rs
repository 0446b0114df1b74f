// src/handlers/admin.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AdminClaims,
    models::tenancy::{TenantStatusResponse, UpdateActivePayload, UpdatePlanPayload},
};

// PUT /api/admin/tenants/{slug}/plan
#[utoipa::path(
    put,
    path = "/api/admin/tenants/{slug}/plan",
    tag = "Admin",
    request_body = UpdatePlanPayload,
    responses(
        (status = 200, description = "Plano alterado", body = TenantStatusResponse),
        (status = 400, description = "Plano desconhecido ou payload inválido"),
        (status = 401, description = "Token ausente ou inválido"),
        (status = 403, description = "Token sem permissão de superadmin"),
        (status = 404, description = "Clínica não encontrada")
    ),
    params(("slug" = String, Path, description = "Slug da clínica")),
    security(("api_jwt" = []))
)]
pub async fn update_plan(
    State(app_state): State<AppState>,
    Extension(admin): Extension<AdminClaims>,
    Path(slug): Path<String>,
    Json(payload): Json<UpdatePlanPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    tracing::info!(admin = %admin.sub, "Alteração de plano solicitada para '{}'", slug);
    let status = app_state
        .admin_service
        .change_plan(&slug, payload.plan.trim())
        .await?;

    Ok((StatusCode::OK, Json(status)))
}

// PUT /api/admin/tenants/{slug}/active
#[utoipa::path(
    put,
    path = "/api/admin/tenants/{slug}/active",
    tag = "Admin",
    request_body = UpdateActivePayload,
    responses(
        (status = 200, description = "Situação alterada", body = TenantStatusResponse),
        (status = 401, description = "Token ausente ou inválido"),
        (status = 403, description = "Token sem permissão de superadmin"),
        (status = 404, description = "Clínica não encontrada")
    ),
    params(("slug" = String, Path, description = "Slug da clínica")),
    security(("api_jwt" = []))
)]
pub async fn update_active(
    State(app_state): State<AppState>,
    Extension(admin): Extension<AdminClaims>,
    Path(slug): Path<String>,
    Json(payload): Json<UpdateActivePayload>,
) -> Result<impl IntoResponse, AppError> {
    tracing::info!(admin = %admin.sub, "Ativação de '{}' -> {}", slug, payload.active);
    let status = app_state.admin_service.set_active(&slug, payload.active).await?;

    Ok((StatusCode::OK, Json(status)))
}

// DELETE /api/admin/sessions/{phone}
#[utoipa::path(
    delete,
    path = "/api/admin/sessions/{phone}",
    tag = "Admin",
    responses(
        (status = 204, description = "Sessão reiniciada"),
        (status = 401, description = "Token ausente ou inválido"),
        (status = 403, description = "Token sem permissão de superadmin")
    ),
    params(("phone" = String, Path, description = "Telefone do tutor")),
    security(("api_jwt" = []))
)]
pub async fn reset_session(
    State(app_state): State<AppState>,
    Path(phone): Path<String>,
) -> StatusCode {
    app_state.admin_service.reset_session(&phone).await;
    StatusCode::NO_CONTENT
}
