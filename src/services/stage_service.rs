// src/services/stage_service.rs

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::CrmStore,
    models::{
        auth::UserContext,
        pipeline::{Direction, Stage},
    },
    services::require_text,
};

#[derive(Clone)]
pub struct StageService {
    store: Arc<dyn CrmStore>,
}

impl StageService {
    pub fn new(store: Arc<dyn CrmStore>) -> Self {
        Self { store }
    }

    pub async fn list_stages(&self, ctx: &UserContext) -> Result<Vec<Stage>, AppError> {
        self.store.list_stages(ctx.user_id).await
    }

    /// Nova etapa sempre entra no fim do funil.
    pub async fn create_stage(&self, ctx: &UserContext, name: &str) -> Result<Stage, AppError> {
        let name = require_text(name, "name")?;

        let stages = self.store.list_stages(ctx.user_id).await?;
        let next_position = stages.iter().map(|s| s.position).max().unwrap_or(0) + 1;

        let stage = self
            .store
            .insert_stage(ctx.user_id, name, next_position, false)
            .await?;

        tracing::info!("Etapa '{}' criada na posição {}", stage.name, stage.position);
        Ok(stage)
    }

    pub async fn rename_stage(
        &self,
        ctx: &UserContext,
        stage_id: Uuid,
        new_name: &str,
    ) -> Result<Stage, AppError> {
        let new_name = require_text(new_name, "name")?;

        self.store
            .rename_stage(ctx.user_id, stage_id, new_name)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("stage".into()))
    }

    /// Troca a etapa de lugar com a vizinha e devolve a nova ordem.
    /// Na primeira (subindo) ou na última (descendo) não faz nada.
    pub async fn reposition(
        &self,
        ctx: &UserContext,
        stage_id: Uuid,
        direction: Direction,
    ) -> Result<Vec<Stage>, AppError> {
        let stages = self.store.list_stages(ctx.user_id).await?;

        let index = stages
            .iter()
            .position(|s| s.id == stage_id)
            .ok_or_else(|| AppError::ResourceNotFound("stage".into()))?;

        let neighbor = match direction {
            Direction::Up => index.checked_sub(1),
            Direction::Down => Some(index + 1).filter(|&i| i < stages.len()),
        };

        let Some(neighbor) = neighbor else {
            return Ok(stages);
        };

        let updates = plan_swap(&stages, index, neighbor);
        self.store
            .update_stage_positions(ctx.user_id, &updates)
            .await?;

        self.store.list_stages(ctx.user_id).await
    }

    pub async fn delete_stage(&self, ctx: &UserContext, stage_id: Uuid) -> Result<(), AppError> {
        let stage = self
            .store
            .find_stage(ctx.user_id, stage_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("stage".into()))?;

        if stage.is_default {
            return Err(AppError::DefaultStageLocked);
        }

        // Quem chama precisa mover os contatos antes
        let in_stage = self
            .store
            .count_contacts_in_stage(ctx.user_id, stage_id)
            .await?;
        if in_stage > 0 {
            return Err(AppError::StageHasContacts);
        }

        if !self.store.delete_stage(ctx.user_id, stage_id).await? {
            return Err(AppError::ResourceNotFound("stage".into()));
        }

        tracing::info!("Etapa '{}' excluída", stage.name);
        Ok(())
    }
}

/// Posições a gravar para trocar `a` e `b` de lugar (`stages` já ordenado).
///
/// Com posições estritamente crescentes basta trocar os dois valores. Se houver
/// empate em qualquer ponto, a troca poderia cair no desempate por ordem de
/// criação, então a lista inteira é renumerada (1..n) já na nova ordem.
fn plan_swap(stages: &[Stage], a: usize, b: usize) -> Vec<(Uuid, i32)> {
    let strictly_ordered = stages.windows(2).all(|w| w[0].position < w[1].position);
    if strictly_ordered {
        return vec![
            (stages[a].id, stages[b].position),
            (stages[b].id, stages[a].position),
        ];
    }

    let mut order: Vec<&Stage> = stages.iter().collect();
    order.swap(a, b);
    order
        .iter()
        .enumerate()
        .map(|(i, stage)| (stage.id, i as i32 + 1))
        .collect()
}
