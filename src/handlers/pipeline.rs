// src/handlers/pipeline.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::{
        crm::Contact,
        pipeline::{Board, Direction, DropEvent, MoveOutcome, Stage},
    },
};

// =============================================================================
//  ÁREA 1: ETAPAS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StageNamePayload {
    #[validate(length(max = 80, message = "O nome deve ter no máximo 80 caracteres"))]
    #[schema(example = "Pós-venda")]
    pub name: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RepositionPayload {
    pub direction: Direction,
}

// GET /api/pipeline/stages
#[utoipa::path(
    get,
    path = "/api/pipeline/stages",
    tag = "Pipeline",
    responses(
        (status = 200, description = "Etapas na ordem do funil", body = Vec<Stage>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_stages(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
) -> Result<Json<Vec<Stage>>, ApiError> {
    let stages = app_state
        .stage_service
        .list_stages(&user.ctx())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(stages))
}

// POST /api/pipeline/stages
#[utoipa::path(
    post,
    path = "/api/pipeline/stages",
    tag = "Pipeline",
    request_body = StageNamePayload,
    responses(
        (status = 201, description = "Etapa criada no fim do funil", body = Stage),
        (status = 400, description = "Nome vazio")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_stage(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Json(payload): Json<StageNamePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let stage = app_state
        .stage_service
        .create_stage(&user.ctx(), &payload.name)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(stage)))
}

// PATCH /api/pipeline/stages/{id}
#[utoipa::path(
    patch,
    path = "/api/pipeline/stages/{id}",
    tag = "Pipeline",
    request_body = StageNamePayload,
    params(("id" = Uuid, Path, description = "ID da etapa")),
    responses(
        (status = 200, description = "Etapa renomeada", body = Stage),
        (status = 400, description = "Nome vazio"),
        (status = 404, description = "Etapa não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn rename_stage(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(stage_id): Path<Uuid>,
    Json(payload): Json<StageNamePayload>,
) -> Result<Json<Stage>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let stage = app_state
        .stage_service
        .rename_stage(&user.ctx(), stage_id, &payload.name)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(stage))
}

// POST /api/pipeline/stages/{id}/reposition
#[utoipa::path(
    post,
    path = "/api/pipeline/stages/{id}/reposition",
    tag = "Pipeline",
    request_body = RepositionPayload,
    params(("id" = Uuid, Path, description = "ID da etapa")),
    responses(
        (status = 200, description = "Funil na nova ordem", body = Vec<Stage>),
        (status = 404, description = "Etapa não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn reposition_stage(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(stage_id): Path<Uuid>,
    Json(payload): Json<RepositionPayload>,
) -> Result<Json<Vec<Stage>>, ApiError> {
    let stages = app_state
        .stage_service
        .reposition(&user.ctx(), stage_id, payload.direction)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(stages))
}

// DELETE /api/pipeline/stages/{id}
#[utoipa::path(
    delete,
    path = "/api/pipeline/stages/{id}",
    tag = "Pipeline",
    params(("id" = Uuid, Path, description = "ID da etapa")),
    responses(
        (status = 204, description = "Etapa excluída"),
        (status = 400, description = "Etapa padrão não pode ser excluída"),
        (status = 404, description = "Etapa não encontrada"),
        (status = 409, description = "Etapa ainda possui contatos")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_stage(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(stage_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    app_state
        .stage_service
        .delete_stage(&user.ctx(), stage_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
//  ÁREA 2: QUADRO E MOVIMENTAÇÃO
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignPayload {
    #[validate(length(min = 1, message = "Informe um trecho do nome"))]
    #[schema(example = "mar")]
    pub query: String,
    pub stage_id: Uuid,
    #[schema(example = 350000.00)]
    pub sale_value: Option<Decimal>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetStagePayload {
    pub stage_id: Uuid,
    // Só usado quando a etapa é a ganha e o imóvel não tem preço
    #[schema(example = 350000.00)]
    pub sale_value: Option<Decimal>,
}

// GET /api/pipeline/board
#[utoipa::path(
    get,
    path = "/api/pipeline/board",
    tag = "Pipeline",
    responses(
        (status = 200, description = "Colunas com seus contatos", body = Board)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_board(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
) -> Result<Json<Board>, ApiError> {
    let board = app_state
        .board_service
        .board(&user.ctx())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(board))
}

// POST /api/pipeline/drop
#[utoipa::path(
    post,
    path = "/api/pipeline/drop",
    tag = "Pipeline",
    request_body = DropEvent,
    responses(
        (status = 200, description = "Resultado da transição", body = MoveOutcome),
        (status = 204, description = "Soltou fora de uma coluna: nada mudou"),
        (status = 404, description = "Contato ou etapa não encontrados"),
        (status = 422, description = "Valor de venda inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn drop_contact(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Json(event): Json<DropEvent>,
) -> Result<Response, ApiError> {
    let outcome = app_state
        .board_service
        .handle_drop(&user.ctx(), &event)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(match outcome {
        Some(outcome) => Json(outcome).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

// POST /api/pipeline/assign
#[utoipa::path(
    post,
    path = "/api/pipeline/assign",
    tag = "Pipeline",
    request_body = AssignPayload,
    responses(
        (status = 200, description = "Primeiro contato encontrado, movido para a etapa", body = MoveOutcome),
        (status = 404, description = "Nenhum contato encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn assign_contact(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Json(payload): Json<AssignPayload>,
) -> Result<Json<MoveOutcome>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let outcome = app_state
        .board_service
        .search_and_assign(&user.ctx(), &payload.query, payload.stage_id, payload.sale_value)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(outcome))
}

// PUT /api/contacts/{id}/stage
#[utoipa::path(
    put,
    path = "/api/contacts/{id}/stage",
    tag = "Pipeline",
    request_body = SetStagePayload,
    params(("id" = Uuid, Path, description = "ID do contato")),
    responses(
        (status = 200, description = "Resultado da transição", body = MoveOutcome),
        (status = 404, description = "Contato ou etapa não encontrados"),
        (status = 422, description = "Valor de venda inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn set_contact_stage(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(contact_id): Path<Uuid>,
    Json(payload): Json<SetStagePayload>,
) -> Result<Json<MoveOutcome>, ApiError> {
    let outcome = app_state
        .board_service
        .move_contact(&user.ctx(), contact_id, payload.stage_id, payload.sale_value)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(outcome))
}

// DELETE /api/contacts/{id}/stage
#[utoipa::path(
    delete,
    path = "/api/contacts/{id}/stage",
    tag = "Pipeline",
    params(("id" = Uuid, Path, description = "ID do contato")),
    responses(
        (status = 200, description = "Contato fora do funil (dados de venda mantidos)", body = Contact),
        (status = 404, description = "Contato não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn remove_contact_stage(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(contact_id): Path<Uuid>,
) -> Result<Json<Contact>, ApiError> {
    let contact = app_state
        .board_service
        .remove_from_pipeline(&user.ctx(), contact_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(contact))
}
