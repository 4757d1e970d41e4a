// src/services/board_service.rs

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::CrmStore,
    models::{
        auth::UserContext,
        crm::Contact,
        pipeline::{Board, BoardColumn, DropEvent, MoveOutcome, PendingSale},
    },
    services::{
        require_text,
        sale::{resolve_sale_value, SaleValue},
    },
};

/// O quadro Kanban: move contatos entre etapas e grava vendas.
#[derive(Clone)]
pub struct BoardService {
    store: Arc<dyn CrmStore>,
}

impl BoardService {
    pub fn new(store: Arc<dyn CrmStore>) -> Self {
        Self { store }
    }

    /// Colunas na ordem do funil, com os contatos de cada uma.
    pub async fn board(&self, ctx: &UserContext) -> Result<Board, AppError> {
        let stages = self.store.list_stages(ctx.user_id).await?;
        let mut contacts = self.store.list_contacts(ctx.user_id).await?;

        let mut columns = Vec::with_capacity(stages.len());
        for stage in stages {
            let (in_stage, rest): (Vec<_>, Vec<_>) = contacts
                .into_iter()
                .partition(|c| c.contact.stage_id == Some(stage.id));
            contacts = rest;
            columns.push(BoardColumn {
                stage,
                contacts: in_stage,
            });
        }

        // Sobra quem está fora do funil
        Ok(Board {
            columns,
            unassigned: contacts,
        })
    }

    /// Move o contato para `target_stage_id`.
    ///
    /// Na etapa ganha a venda é gravada junto com a etapa, numa única escrita.
    /// Sem preço de imóvel e sem `sale_value`, devolve `SaleValueRequired` e
    /// não grava nada; o cliente pergunta o valor e chama de novo.
    pub async fn move_contact(
        &self,
        ctx: &UserContext,
        contact_id: Uuid,
        target_stage_id: Uuid,
        sale_value: Option<Decimal>,
    ) -> Result<MoveOutcome, AppError> {
        let detail = self
            .store
            .find_contact(ctx.user_id, contact_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("contact".into()))?;

        let stage = self
            .store
            .find_stage(ctx.user_id, target_stage_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("stage".into()))?;

        if detail.contact.stage_id == Some(stage.id) {
            return Ok(MoveOutcome::Unchanged(detail.contact));
        }

        if !stage.is_won() {
            let contact = self
                .store
                .set_contact_stage(ctx.user_id, contact_id, Some(stage.id))
                .await?
                .ok_or_else(|| AppError::ResourceNotFound("contact".into()))?;

            tracing::info!("Contato {} movido para '{}'", contact.id, stage.name);
            return Ok(MoveOutcome::Moved(contact));
        }

        let Some(value) = resolve_sale_value(detail.property_price, sale_value)? else {
            tracing::debug!("Contato {} aguardando valor de venda", contact_id);
            return Ok(MoveOutcome::SaleValueRequired(PendingSale {
                contact_id,
                stage_id: stage.id,
            }));
        };

        let contact = self
            .store
            .record_sale(ctx.user_id, contact_id, stage.id, Utc::now(), value.amount())
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("contact".into()))?;

        match value {
            SaleValue::FromProperty(amount) => {
                tracing::info!("Venda de {} registrada pelo preço do imóvel: {}", contact.id, amount)
            }
            SaleValue::FromOperator(amount) => {
                tracing::info!("Venda de {} registrada com valor informado: {}", contact.id, amount)
            }
        }

        Ok(MoveOutcome::SaleRecorded(contact))
    }

    /// Tira o contato do funil. Data e valor de venda ficam como estavam.
    pub async fn remove_from_pipeline(
        &self,
        ctx: &UserContext,
        contact_id: Uuid,
    ) -> Result<Contact, AppError> {
        self.store
            .set_contact_stage(ctx.user_id, contact_id, None)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("contact".into()))
    }

    /// Fim de um arraste. Soltar fora de uma coluna cancela (`Ok(None)`).
    pub async fn handle_drop(
        &self,
        ctx: &UserContext,
        event: &DropEvent,
    ) -> Result<Option<MoveOutcome>, AppError> {
        let Some(stage_id) = event.stage_id else {
            tracing::debug!("Arraste do contato {} cancelado", event.contact_id);
            return Ok(None);
        };

        self.move_contact(ctx, event.contact_id, stage_id, event.sale_value)
            .await
            .map(Some)
    }

    /// Procura o primeiro contato cujo nome contém `query` (sem diferenciar
    /// maiúsculas) e o move para a etapa escolhida.
    pub async fn search_and_assign(
        &self,
        ctx: &UserContext,
        query: &str,
        stage_id: Uuid,
        sale_value: Option<Decimal>,
    ) -> Result<MoveOutcome, AppError> {
        let needle = require_text(query, "query")?.to_lowercase();

        let contacts = self.store.list_contacts(ctx.user_id).await?;
        let found = contacts
            .iter()
            .find(|c| c.contact.name.to_lowercase().contains(&needle))
            .ok_or_else(|| AppError::ResourceNotFound("contact".into()))?;

        self.move_contact(ctx, found.contact.id, stage_id, sale_value)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_store::MemoryStore;
    use crate::models::{
        crm::{ContactInput, PropertyInput},
        pipeline::{Stage, DEFAULT_STAGES},
    };

    struct Fixture {
        ctx: UserContext,
        store: Arc<MemoryStore>,
        board: BoardService,
        stages: Vec<Stage>,
    }

    impl Fixture {
        async fn new() -> Self {
            let ctx = UserContext {
                user_id: Uuid::new_v4(),
                email: "corretor@teste.com".into(),
            };
            let store = Arc::new(MemoryStore::new());
            let mut stages = Vec::new();
            for (i, name) in DEFAULT_STAGES.iter().enumerate() {
                stages.push(
                    store
                        .insert_stage(ctx.user_id, name, i as i32 + 1, true)
                        .await
                        .unwrap(),
                );
            }
            let board = BoardService::new(store.clone());
            Self {
                ctx,
                store,
                board,
                stages,
            }
        }

        fn won(&self) -> Uuid {
            self.stages.iter().find(|s| s.is_won()).unwrap().id
        }

        async fn contact(&self, name: &str, price: Option<Decimal>) -> Contact {
            let property_id = match price {
                Some(price) => Some(
                    self.store
                        .insert_property(
                            self.ctx.user_id,
                            &PropertyInput {
                                description: format!("Imóvel de {}", name),
                                price,
                                commission_pct: Decimal::new(5, 0),
                            },
                        )
                        .await
                        .unwrap()
                        .id,
                ),
                None => None,
            };
            self.store
                .insert_contact(
                    self.ctx.user_id,
                    &ContactInput {
                        name: name.into(),
                        property_id,
                        ..Default::default()
                    },
                )
                .await
                .unwrap()
        }

        async fn reload(&self, id: Uuid) -> Contact {
            self.store
                .find_contact(self.ctx.user_id, id)
                .await
                .unwrap()
                .unwrap()
                .contact
        }
    }

    #[tokio::test]
    async fn moving_to_a_regular_stage_never_stamps_a_sale() {
        let fx = Fixture::new().await;
        let lead = fx.contact("Carlos", Some(Decimal::new(200000, 0))).await;

        for stage in fx.stages.iter().filter(|s| !s.is_won()) {
            let outcome = fx
                .board
                .move_contact(&fx.ctx, lead.id, stage.id, Some(Decimal::TEN))
                .await
                .unwrap();
            assert!(matches!(outcome, MoveOutcome::Moved(_)));
            let saved = fx.reload(lead.id).await;
            assert_eq!(saved.stage_id, Some(stage.id));
            assert!(saved.sale_date.is_none());
            assert!(saved.sale_value.is_none());
        }
    }

    #[tokio::test]
    async fn maria_sale_uses_property_price_without_prompt() {
        let fx = Fixture::new().await;
        let price = Decimal::new(35000000, 2);
        let maria = fx.contact("Maria", Some(price)).await;

        let before = Utc::now();
        let outcome = fx
            .board
            .move_contact(&fx.ctx, maria.id, fx.won(), None)
            .await
            .unwrap();

        let saved = match outcome {
            MoveOutcome::SaleRecorded(contact) => contact,
            other => panic!("esperava venda registrada, veio {:?}", other),
        };
        assert_eq!(saved.sale_value, Some(price));
        assert_eq!(saved.stage_id, Some(fx.won()));
        assert!(saved.sale_date.unwrap() >= before);
    }

    #[tokio::test]
    async fn operator_value_is_ignored_when_property_has_price() {
        let fx = Fixture::new().await;
        let price = Decimal::new(500000, 0);
        let lead = fx.contact("Paula", Some(price)).await;

        fx.board
            .move_contact(&fx.ctx, lead.id, fx.won(), Some(Decimal::ONE))
            .await
            .unwrap();
        assert_eq!(fx.reload(lead.id).await.sale_value, Some(price));
    }

    #[tokio::test]
    async fn joao_with_zero_value_keeps_his_stage() {
        let fx = Fixture::new().await;
        let joao = fx.contact("João", None).await;
        fx.board
            .move_contact(&fx.ctx, joao.id, fx.stages[3].id, None)
            .await
            .unwrap();

        let err = fx
            .board
            .move_contact(&fx.ctx, joao.id, fx.won(), Some(Decimal::ZERO))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidSaleValue));

        let saved = fx.reload(joao.id).await;
        assert_eq!(saved.stage_id, Some(fx.stages[3].id));
        assert!(saved.sale_value.is_none());
        assert!(saved.sale_date.is_none());
    }

    #[tokio::test]
    async fn won_stage_without_price_waits_for_operator_value() {
        let fx = Fixture::new().await;
        let lead = fx.contact("Rita", Some(Decimal::ZERO)).await;

        let outcome = fx
            .board
            .move_contact(&fx.ctx, lead.id, fx.won(), None)
            .await
            .unwrap();
        let pending = match outcome {
            MoveOutcome::SaleValueRequired(pending) => pending,
            other => panic!("esperava pedido de valor, veio {:?}", other),
        };
        assert_eq!(pending.contact_id, lead.id);
        assert_eq!(pending.stage_id, fx.won());
        assert!(fx.reload(lead.id).await.stage_id.is_none());

        // Segunda fase: o operador respondeu o diálogo
        let value = Decimal::new(180000, 0);
        let outcome = fx
            .board
            .move_contact(&fx.ctx, pending.contact_id, pending.stage_id, Some(value))
            .await
            .unwrap();
        assert!(matches!(outcome, MoveOutcome::SaleRecorded(_)));
        assert_eq!(fx.reload(lead.id).await.sale_value, Some(value));
    }

    #[tokio::test]
    async fn leaving_won_stage_keeps_sale_and_reentering_overwrites_it() {
        let fx = Fixture::new().await;
        let lead = fx.contact("Bruno", None).await;

        fx.board
            .move_contact(&fx.ctx, lead.id, fx.won(), Some(Decimal::new(100, 0)))
            .await
            .unwrap();
        let first = fx.reload(lead.id).await;

        fx.board
            .move_contact(&fx.ctx, lead.id, fx.stages[0].id, None)
            .await
            .unwrap();
        let moved_out = fx.reload(lead.id).await;
        assert_eq!(moved_out.sale_value, first.sale_value);
        assert_eq!(moved_out.sale_date, first.sale_date);

        let removed = fx.board.remove_from_pipeline(&fx.ctx, lead.id).await.unwrap();
        assert!(removed.stage_id.is_none());
        assert_eq!(removed.sale_value, first.sale_value);

        fx.board
            .move_contact(&fx.ctx, lead.id, fx.won(), Some(Decimal::new(250, 0)))
            .await
            .unwrap();
        assert_eq!(
            fx.reload(lead.id).await.sale_value,
            Some(Decimal::new(250, 0))
        );
    }

    #[tokio::test]
    async fn dropping_on_current_column_is_unchanged() {
        let fx = Fixture::new().await;
        let lead = fx.contact("Lia", None).await;
        fx.board
            .move_contact(&fx.ctx, lead.id, fx.won(), Some(Decimal::new(90, 0)))
            .await
            .unwrap();
        let stamped = fx.reload(lead.id).await;

        let outcome = fx
            .board
            .move_contact(&fx.ctx, lead.id, fx.won(), Some(Decimal::new(1, 0)))
            .await
            .unwrap();
        assert!(matches!(outcome, MoveOutcome::Unchanged(_)));
        assert_eq!(fx.reload(lead.id).await, stamped);
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let fx = Fixture::new().await;
        let lead = fx.contact("Davi", None).await;

        let err = fx
            .board
            .move_contact(&fx.ctx, Uuid::new_v4(), fx.stages[0].id, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ResourceNotFound(_)));

        let err = fx
            .board
            .move_contact(&fx.ctx, lead.id, Uuid::new_v4(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ResourceNotFound(_)));

        let err = fx
            .board
            .remove_from_pipeline(&fx.ctx, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ResourceNotFound(_)));
    }

    #[tokio::test]
    async fn drop_outside_a_column_changes_nothing() {
        let fx = Fixture::new().await;
        let lead = fx.contact("Eva", None).await;

        let outcome = fx
            .board
            .handle_drop(
                &fx.ctx,
                &DropEvent {
                    contact_id: lead.id,
                    stage_id: None,
                    sale_value: None,
                },
            )
            .await
            .unwrap();
        assert!(outcome.is_none());
        assert_eq!(fx.reload(lead.id).await, lead);

        let outcome = fx
            .board
            .handle_drop(
                &fx.ctx,
                &DropEvent {
                    contact_id: lead.id,
                    stage_id: Some(fx.stages[1].id),
                    sale_value: None,
                },
            )
            .await
            .unwrap();
        assert!(matches!(outcome, Some(MoveOutcome::Moved(_))));
    }

    #[tokio::test]
    async fn search_assigns_first_case_insensitive_match() {
        let fx = Fixture::new().await;
        let first = fx.contact("Ana Paula Lima", None).await;
        let second = fx.contact("Paulo Santos", None).await;

        let outcome = fx
            .board
            .search_and_assign(&fx.ctx, "PAUL", fx.stages[2].id, None)
            .await
            .unwrap();
        assert_eq!(outcome.contact().unwrap().id, first.id);
        assert_eq!(fx.reload(first.id).await.stage_id, Some(fx.stages[2].id));
        assert!(fx.reload(second.id).await.stage_id.is_none());

        let err = fx
            .board
            .search_and_assign(&fx.ctx, "ninguém", fx.stages[2].id, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ResourceNotFound(_)));

        let err = fx
            .board
            .search_and_assign(&fx.ctx, "  ", fx.stages[2].id, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::RequiredField("query")));
    }

    #[tokio::test]
    async fn board_groups_contacts_by_column() {
        let fx = Fixture::new().await;
        let a = fx.contact("A", None).await;
        let b = fx.contact("B", None).await;
        fx.contact("C", None).await;

        fx.board
            .move_contact(&fx.ctx, a.id, fx.stages[0].id, None)
            .await
            .unwrap();
        fx.board
            .move_contact(&fx.ctx, b.id, fx.stages[2].id, None)
            .await
            .unwrap();

        let board = fx.board.board(&fx.ctx).await.unwrap();
        assert_eq!(board.columns.len(), DEFAULT_STAGES.len());
        assert_eq!(board.columns[0].contacts.len(), 1);
        assert_eq!(board.columns[0].contacts[0].contact.id, a.id);
        assert_eq!(board.columns[2].contacts[0].contact.id, b.id);
        assert_eq!(
            board.columns[2].contacts[0].stage_name.as_deref(),
            Some("Visita Agendada")
        );
        assert_eq!(board.unassigned.len(), 1);
        assert_eq!(board.unassigned[0].contact.name, "C");
    }
}
