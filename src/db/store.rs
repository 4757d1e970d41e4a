// src/db/store.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        crm::{Contact, ContactDetail, ContactInput, Property, PropertyInput},
        pipeline::Stage,
    },
};

/// Tudo o que os serviços precisam do banco, sempre escopado ao dono (`owner`).
///
/// `PgCrmStore` é a implementação real; os testes usam `MemoryStore`.
#[async_trait]
pub trait CrmStore: Send + Sync {
    // =========================================================================
    //  ETAPAS
    // =========================================================================

    /// Ordenadas por posição; empates pela ordem de criação.
    async fn list_stages(&self, owner: Uuid) -> Result<Vec<Stage>, AppError>;

    async fn find_stage(&self, owner: Uuid, stage_id: Uuid) -> Result<Option<Stage>, AppError>;

    async fn insert_stage(
        &self,
        owner: Uuid,
        name: &str,
        position: i32,
        is_default: bool,
    ) -> Result<Stage, AppError>;

    async fn rename_stage(
        &self,
        owner: Uuid,
        stage_id: Uuid,
        name: &str,
    ) -> Result<Option<Stage>, AppError>;

    /// Grava todas as posições ou nenhuma. Se alguma linha não for atualizada
    /// devolve `PartialPositionUpdate` e nada muda.
    async fn update_stage_positions(
        &self,
        owner: Uuid,
        positions: &[(Uuid, i32)],
    ) -> Result<(), AppError>;

    async fn count_contacts_in_stage(&self, owner: Uuid, stage_id: Uuid) -> Result<i64, AppError>;

    async fn delete_stage(&self, owner: Uuid, stage_id: Uuid) -> Result<bool, AppError>;

    // =========================================================================
    //  CONTATOS
    // =========================================================================

    /// Com imóvel e etapa carregados, na ordem de criação.
    async fn list_contacts(&self, owner: Uuid) -> Result<Vec<ContactDetail>, AppError>;

    async fn find_contact(
        &self,
        owner: Uuid,
        contact_id: Uuid,
    ) -> Result<Option<ContactDetail>, AppError>;

    async fn insert_contact(&self, owner: Uuid, input: &ContactInput) -> Result<Contact, AppError>;

    async fn update_contact(
        &self,
        owner: Uuid,
        contact_id: Uuid,
        input: &ContactInput,
    ) -> Result<Option<Contact>, AppError>;

    async fn set_contact_stage(
        &self,
        owner: Uuid,
        contact_id: Uuid,
        stage_id: Option<Uuid>,
    ) -> Result<Option<Contact>, AppError>;

    /// Etapa + data + valor numa única escrita.
    async fn record_sale(
        &self,
        owner: Uuid,
        contact_id: Uuid,
        stage_id: Uuid,
        sale_date: DateTime<Utc>,
        sale_value: Decimal,
    ) -> Result<Option<Contact>, AppError>;

    async fn delete_contact(&self, owner: Uuid, contact_id: Uuid) -> Result<bool, AppError>;

    // =========================================================================
    //  IMÓVEIS
    // =========================================================================

    async fn list_properties(&self, owner: Uuid) -> Result<Vec<Property>, AppError>;

    async fn find_property(
        &self,
        owner: Uuid,
        property_id: Uuid,
    ) -> Result<Option<Property>, AppError>;

    async fn insert_property(
        &self,
        owner: Uuid,
        input: &PropertyInput,
    ) -> Result<Property, AppError>;

    async fn delete_property(&self, owner: Uuid, property_id: Uuid) -> Result<bool, AppError>;
}
