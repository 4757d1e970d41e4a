// src/models/crm.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- IMÓVEL ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub id: Uuid,
    #[schema(ignore)]
    pub owner_id: Uuid,
    #[schema(example = "Apartamento 3 quartos, Moema")]
    pub description: String,
    #[schema(example = 350000.00)]
    pub price: Decimal,
    // Percentual de 0 a 100
    #[schema(example = 6.0)]
    pub commission_pct: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct PropertyInput {
    pub description: String,
    pub price: Decimal,
    pub commission_pct: Decimal,
}

// --- CONTATO (Lead) ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: Uuid,
    #[schema(ignore)]
    pub owner_id: Uuid,
    #[schema(example = "Maria Souza")]
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub property_id: Option<Uuid>,
    // None = ainda fora do funil
    pub stage_id: Option<Uuid>,
    pub visit_date: Option<DateTime<Utc>>,

    // Só são gravados ao entrar na etapa ganha, e nunca apagados depois.
    pub sale_date: Option<DateTime<Utc>>,
    pub sale_value: Option<Decimal>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Contato com o imóvel e a etapa já carregados (JOIN).
#[derive(Debug, Clone, PartialEq, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContactDetail {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub contact: Contact,
    pub property_description: Option<String>,
    pub property_price: Option<Decimal>,
    pub property_commission_pct: Option<Decimal>,
    pub stage_name: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ContactInput {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub property_id: Option<Uuid>,
    pub visit_date: Option<DateTime<Utc>>,
}
