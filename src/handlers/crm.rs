// src/handlers/crm.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::crm::{Contact, ContactDetail, ContactInput, Property, PropertyInput},
};

// =============================================================================
//  ÁREA 1: CONTATOS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContactPayload {
    #[validate(length(max = 120, message = "O nome deve ter no máximo 120 caracteres"))]
    #[schema(example = "Maria Souza")]
    pub name: String,
    #[schema(example = "(11) 99999-0000")]
    pub phone: Option<String>,
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: Option<String>,
    pub property_id: Option<Uuid>,
    pub visit_date: Option<DateTime<Utc>>,
}

impl From<ContactPayload> for ContactInput {
    fn from(payload: ContactPayload) -> Self {
        Self {
            name: payload.name,
            phone: payload.phone,
            email: payload.email,
            property_id: payload.property_id,
            visit_date: payload.visit_date,
        }
    }
}

// GET /api/contacts
#[utoipa::path(
    get,
    path = "/api/contacts",
    tag = "Contacts",
    responses(
        (status = 200, description = "Contatos com imóvel e etapa", body = Vec<ContactDetail>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_contacts(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
) -> Result<Json<Vec<ContactDetail>>, ApiError> {
    let contacts = app_state
        .crm_service
        .list_contacts(&user.ctx())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(contacts))
}

// POST /api/contacts
#[utoipa::path(
    post,
    path = "/api/contacts",
    tag = "Contacts",
    request_body = ContactPayload,
    responses(
        (status = 201, description = "Contato criado (fora do funil)", body = Contact),
        (status = 400, description = "Dados inválidos"),
        (status = 404, description = "Imóvel não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_contact(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Json(payload): Json<ContactPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let contact = app_state
        .crm_service
        .create_contact(&user.ctx(), payload.into())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(contact)))
}

// PUT /api/contacts/{id}
#[utoipa::path(
    put,
    path = "/api/contacts/{id}",
    tag = "Contacts",
    request_body = ContactPayload,
    params(("id" = Uuid, Path, description = "ID do contato")),
    responses(
        (status = 200, description = "Contato atualizado", body = Contact),
        (status = 404, description = "Contato ou imóvel não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_contact(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(contact_id): Path<Uuid>,
    Json(payload): Json<ContactPayload>,
) -> Result<Json<Contact>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let contact = app_state
        .crm_service
        .update_contact(&user.ctx(), contact_id, payload.into())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(contact))
}

// DELETE /api/contacts/{id}
#[utoipa::path(
    delete,
    path = "/api/contacts/{id}",
    tag = "Contacts",
    params(("id" = Uuid, Path, description = "ID do contato")),
    responses(
        (status = 204, description = "Contato excluído"),
        (status = 404, description = "Contato não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_contact(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(contact_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    app_state
        .crm_service
        .delete_contact(&user.ctx(), contact_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
//  ÁREA 2: IMÓVEIS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PropertyPayload {
    #[validate(length(max = 200, message = "A descrição deve ter no máximo 200 caracteres"))]
    #[schema(example = "Apartamento 3 quartos, Moema")]
    pub description: String,
    #[schema(example = 350000.00)]
    pub price: Decimal,
    #[schema(example = 6.0)]
    pub commission_pct: Decimal,
}

// GET /api/properties
#[utoipa::path(
    get,
    path = "/api/properties",
    tag = "Properties",
    responses(
        (status = 200, description = "Imóveis do corretor", body = Vec<Property>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_properties(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
) -> Result<Json<Vec<Property>>, ApiError> {
    let properties = app_state
        .crm_service
        .list_properties(&user.ctx())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(properties))
}

// POST /api/properties
#[utoipa::path(
    post,
    path = "/api/properties",
    tag = "Properties",
    request_body = PropertyPayload,
    responses(
        (status = 201, description = "Imóvel criado", body = Property),
        (status = 400, description = "Descrição vazia, preço negativo ou comissão fora de 0-100")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_property(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Json(payload): Json<PropertyPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let input = PropertyInput {
        description: payload.description,
        price: payload.price,
        commission_pct: payload.commission_pct,
    };

    let property = app_state
        .crm_service
        .create_property(&user.ctx(), input)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(property)))
}

// DELETE /api/properties/{id}
#[utoipa::path(
    delete,
    path = "/api/properties/{id}",
    tag = "Properties",
    params(("id" = Uuid, Path, description = "ID do imóvel")),
    responses(
        (status = 204, description = "Imóvel excluído; contatos ficam sem imóvel"),
        (status = 404, description = "Imóvel não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_property(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(property_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    app_state
        .crm_service
        .delete_property(&user.ctx(), property_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}
