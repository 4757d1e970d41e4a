// src/models/dashboard.rs

use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

// 1. Cards do topo + contagem por coluna
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_contacts: usize,
    pub contacts_in_pipeline: usize,
    pub sales_count: usize,
    // VGV: soma das vendas dos contatos que estão na etapa ganha
    pub vgv: Decimal,
    #[schema(example = "R$ 350.000,00")]
    pub vgv_formatted: String,
    pub total_commission: Decimal,
    pub stages: Vec<StageCount>,
}

// 2. Quantos contatos em cada etapa
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StageCount {
    pub stage_id: Uuid,
    pub name: String,
    pub count: usize,
}
