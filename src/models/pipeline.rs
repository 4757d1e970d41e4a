// src/models/pipeline.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::crm::{Contact, ContactDetail};

/// Etapas criadas para todo usuário novo, na ordem do funil.
pub const DEFAULT_STAGES: [&str; 5] = [
    "Novo Lead",
    "Em Contato",
    "Visita Agendada",
    "Proposta",
    "Venda Ganha",
];

// A etapa "ganha" é reconhecida pelo nome, não por uma coluna própria.
pub const WON_STAGE_NAMES: [&str; 2] = ["Venda Ganha", "Won"];

pub fn is_won_stage_name(name: &str) -> bool {
    let name = name.trim();
    WON_STAGE_NAMES.iter().any(|won| name.eq_ignore_ascii_case(won))
}

// --- ETAPA (Coluna do Kanban) ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440001")]
    pub id: Uuid,
    #[schema(ignore)] // Vem do token, não precisa aparecer na doc
    pub owner_id: Uuid,
    #[schema(example = "Visita Agendada")]
    pub name: String,
    #[schema(example = 3)]
    pub position: i32,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

impl Stage {
    pub fn is_won(&self) -> bool {
        is_won_stage_name(&self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

// --- TRANSIÇÕES ---

/// Venda aguardando o valor digitado pelo operador (segunda fase do arraste).
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PendingSale {
    pub contact_id: Uuid,
    pub stage_id: Uuid,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum MoveOutcome {
    /// Soltou na mesma coluna em que já estava: nada foi gravado.
    Unchanged(Contact),
    /// Etapa comum: só a referência mudou.
    Moved(Contact),
    /// Entrou na etapa ganha com data e valor de venda gravados.
    SaleRecorded(Contact),
    /// Etapa ganha sem preço de imóvel: nada foi gravado, falta o valor.
    SaleValueRequired(PendingSale),
}

#[cfg(test)]
impl MoveOutcome {
    pub fn contact(&self) -> Option<&Contact> {
        match self {
            MoveOutcome::Unchanged(contact)
            | MoveOutcome::Moved(contact)
            | MoveOutcome::SaleRecorded(contact) => Some(contact),
            MoveOutcome::SaleValueRequired(_) => None,
        }
    }
}

/// Um "soltar" do arrastar-e-soltar. Sem `stage_id` = soltou fora de uma coluna.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DropEvent {
    pub contact_id: Uuid,
    pub stage_id: Option<Uuid>,
    #[schema(example = 350000.00)]
    pub sale_value: Option<Decimal>,
}

// --- QUADRO ---

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BoardColumn {
    pub stage: Stage,
    pub contacts: Vec<ContactDetail>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub columns: Vec<BoardColumn>,
    // Contatos que ainda não entraram no funil
    pub unassigned: Vec<ContactDetail>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn won_stage_matches_by_name() {
        assert!(is_won_stage_name("Venda Ganha"));
        assert!(is_won_stage_name("  venda ganha "));
        assert!(is_won_stage_name("WON"));
        assert!(!is_won_stage_name("Venda Perdida"));
        assert!(!is_won_stage_name("Proposta"));
    }

    #[test]
    fn defaults_end_with_the_won_stage() {
        assert!(is_won_stage_name(DEFAULT_STAGES[DEFAULT_STAGES.len() - 1]));
        assert_eq!(
            DEFAULT_STAGES.iter().filter(|s| is_won_stage_name(s)).count(),
            1
        );
    }
}
