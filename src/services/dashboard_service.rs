// src/services/dashboard_service.rs

use std::collections::HashSet;
use std::sync::Arc;

use rust_decimal::Decimal;

use crate::{
    common::{error::AppError, format::format_brl},
    db::CrmStore,
    models::{
        auth::UserContext,
        crm::ContactDetail,
        dashboard::{DashboardSummary, StageCount},
        pipeline::Stage,
    },
};

#[derive(Clone)]
pub struct DashboardService {
    store: Arc<dyn CrmStore>,
}

impl DashboardService {
    pub fn new(store: Arc<dyn CrmStore>) -> Self {
        Self { store }
    }

    pub async fn get_summary(&self, ctx: &UserContext) -> Result<DashboardSummary, AppError> {
        let stages = self.store.list_stages(ctx.user_id).await?;
        let contacts = self.store.list_contacts(ctx.user_id).await?;
        Ok(summarize(&stages, &contacts))
    }
}

/// Os números do painel, calculados sobre as linhas já carregadas.
pub fn summarize(stages: &[Stage], contacts: &[ContactDetail]) -> DashboardSummary {
    let won: HashSet<_> = stages.iter().filter(|s| s.is_won()).map(|s| s.id).collect();

    let mut vgv = Decimal::ZERO;
    let mut total_commission = Decimal::ZERO;
    let mut sales_count = 0;

    // Vendas = contatos que estão hoje na etapa ganha
    for detail in contacts {
        let in_won = detail.contact.stage_id.is_some_and(|id| won.contains(&id));
        let Some(value) = detail.contact.sale_value.filter(|_| in_won) else {
            continue;
        };

        sales_count += 1;
        vgv += value;
        if let Some(pct) = detail.property_commission_pct {
            total_commission += value * pct / Decimal::ONE_HUNDRED;
        }
    }

    let stage_counts = stages
        .iter()
        .map(|stage| StageCount {
            stage_id: stage.id,
            name: stage.name.clone(),
            count: contacts
                .iter()
                .filter(|c| c.contact.stage_id == Some(stage.id))
                .count(),
        })
        .collect();

    DashboardSummary {
        total_contacts: contacts.len(),
        contacts_in_pipeline: contacts.iter().filter(|c| c.contact.stage_id.is_some()).count(),
        sales_count,
        vgv,
        vgv_formatted: format_brl(vgv),
        total_commission,
        stages: stage_counts,
    }
}
