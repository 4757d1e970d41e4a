// src/db/crm_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Executor, PgConnection, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::begin_rls, error::AppError},
    db::store::CrmStore,
    models::{
        crm::{Contact, ContactDetail, ContactInput, Property, PropertyInput},
        pipeline::{Stage, DEFAULT_STAGES},
    },
};

#[derive(Clone)]
pub struct PgCrmStore {
    pool: PgPool,
}

impl PgCrmStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  ETAPAS (Colunas do Funil)
    // =========================================================================

    /// As cinco etapas padrão de todo usuário novo (posições 1..=5).
    pub async fn insert_default_stages(
        &self,
        conn: &mut PgConnection,
        owner: Uuid,
    ) -> Result<Vec<Stage>, AppError> {
        let mut stages = Vec::with_capacity(DEFAULT_STAGES.len());
        for (index, name) in DEFAULT_STAGES.iter().enumerate() {
            let stage = self
                .insert_stage_with(&mut *conn, owner, name, index as i32 + 1, true)
                .await?;
            stages.push(stage);
        }
        Ok(stages)
    }

    pub async fn list_stages_with<'e, E>(&self, executor: E, owner: Uuid) -> Result<Vec<Stage>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let stages = sqlx::query_as::<_, Stage>(
            r#"
            SELECT id, owner_id, name, position, is_default, created_at
            FROM pipeline_stages
            WHERE owner_id = $1
            ORDER BY position ASC, created_at ASC, id ASC
            "#,
        )
            .bind(owner)
            .fetch_all(executor)
            .await?;

        Ok(stages)
    }

    pub async fn find_stage_with<'e, E>(
        &self,
        executor: E,
        owner: Uuid,
        stage_id: Uuid,
    ) -> Result<Option<Stage>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let stage = sqlx::query_as::<_, Stage>(
            r#"
            SELECT id, owner_id, name, position, is_default, created_at
            FROM pipeline_stages
            WHERE owner_id = $1 AND id = $2
            "#,
        )
            .bind(owner)
            .bind(stage_id)
            .fetch_optional(executor)
            .await?;

        Ok(stage)
    }

    pub async fn insert_stage_with<'e, E>(
        &self,
        executor: E,
        owner: Uuid,
        name: &str,
        position: i32,
        is_default: bool,
    ) -> Result<Stage, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let stage = sqlx::query_as::<_, Stage>(
            r#"
            INSERT INTO pipeline_stages (owner_id, name, position, is_default)
            VALUES ($1, $2, $3, $4)
            RETURNING id, owner_id, name, position, is_default, created_at
            "#,
        )
            .bind(owner)
            .bind(name)
            .bind(position)
            .bind(is_default)
            .fetch_one(executor)
            .await?;

        Ok(stage)
    }

    pub async fn rename_stage_with<'e, E>(
        &self,
        executor: E,
        owner: Uuid,
        stage_id: Uuid,
        name: &str,
    ) -> Result<Option<Stage>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let stage = sqlx::query_as::<_, Stage>(
            r#"
            UPDATE pipeline_stages SET name = $1
            WHERE owner_id = $2 AND id = $3
            RETURNING id, owner_id, name, position, is_default, created_at
            "#,
        )
            .bind(name)
            .bind(owner)
            .bind(stage_id)
            .fetch_optional(executor)
            .await?;

        Ok(stage)
    }

    /// Precisa rodar dentro de uma transação: o chamador desfaz tudo se der erro.
    pub async fn update_stage_positions_with(
        &self,
        conn: &mut PgConnection,
        owner: Uuid,
        positions: &[(Uuid, i32)],
    ) -> Result<(), AppError> {
        for &(stage_id, position) in positions {
            let result = sqlx::query(
                "UPDATE pipeline_stages SET position = $1 WHERE owner_id = $2 AND id = $3",
            )
                .bind(position)
                .bind(owner)
                .bind(stage_id)
                .execute(&mut *conn)
                .await?;

            if result.rows_affected() != 1 {
                return Err(AppError::PartialPositionUpdate(format!(
                    "etapa {} não foi atualizada",
                    stage_id
                )));
            }
        }

        Ok(())
    }

    pub async fn count_contacts_in_stage_with<'e, E>(
        &self,
        executor: E,
        owner: Uuid,
        stage_id: Uuid,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM contacts WHERE owner_id = $1 AND stage_id = $2",
        )
            .bind(owner)
            .bind(stage_id)
            .fetch_one(executor)
            .await?;

        Ok(count)
    }

    pub async fn delete_stage_with<'e, E>(
        &self,
        executor: E,
        owner: Uuid,
        stage_id: Uuid,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM pipeline_stages WHERE owner_id = $1 AND id = $2")
            .bind(owner)
            .bind(stage_id)
            .execute(executor)
            .await
            .map_err(|e| {
                // A FK (ON DELETE RESTRICT) segura o caso de alguém ter entrado na etapa no meio tempo
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.is_foreign_key_violation() {
                        return AppError::StageHasContacts;
                    }
                }
                e.into()
            })?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    //  CONTATOS (Leads)
    // =========================================================================

    pub async fn list_contacts_with<'e, E>(
        &self,
        executor: E,
        owner: Uuid,
    ) -> Result<Vec<ContactDetail>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let contacts = sqlx::query_as::<_, ContactDetail>(
            r#"
            SELECT
                c.id, c.owner_id, c.name, c.phone, c.email, c.property_id, c.stage_id,
                c.visit_date, c.sale_date, c.sale_value, c.created_at, c.updated_at,
                p.description AS property_description,
                p.price AS property_price,
                p.commission_pct AS property_commission_pct,
                s.name AS stage_name
            FROM contacts c
            LEFT JOIN properties p ON p.id = c.property_id
            LEFT JOIN pipeline_stages s ON s.id = c.stage_id
            WHERE c.owner_id = $1
            ORDER BY c.created_at ASC, c.id ASC
            "#,
        )
            .bind(owner)
            .fetch_all(executor)
            .await?;

        Ok(contacts)
    }

    pub async fn find_contact_with<'e, E>(
        &self,
        executor: E,
        owner: Uuid,
        contact_id: Uuid,
    ) -> Result<Option<ContactDetail>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let contact = sqlx::query_as::<_, ContactDetail>(
            r#"
            SELECT
                c.id, c.owner_id, c.name, c.phone, c.email, c.property_id, c.stage_id,
                c.visit_date, c.sale_date, c.sale_value, c.created_at, c.updated_at,
                p.description AS property_description,
                p.price AS property_price,
                p.commission_pct AS property_commission_pct,
                s.name AS stage_name
            FROM contacts c
            LEFT JOIN properties p ON p.id = c.property_id
            LEFT JOIN pipeline_stages s ON s.id = c.stage_id
            WHERE c.owner_id = $1 AND c.id = $2
            "#,
        )
            .bind(owner)
            .bind(contact_id)
            .fetch_optional(executor)
            .await?;

        Ok(contact)
    }

    pub async fn insert_contact_with<'e, E>(
        &self,
        executor: E,
        owner: Uuid,
        input: &ContactInput,
    ) -> Result<Contact, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let contact = sqlx::query_as::<_, Contact>(
            r#"
            INSERT INTO contacts (owner_id, name, phone, email, property_id, visit_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING
                id, owner_id, name, phone, email, property_id, stage_id,
                visit_date, sale_date, sale_value, created_at, updated_at
            "#,
        )
            .bind(owner)
            .bind(&input.name)
            .bind(input.phone.as_deref())
            .bind(input.email.as_deref())
            .bind(input.property_id)
            .bind(input.visit_date)
            .fetch_one(executor)
            .await?;

        Ok(contact)
    }

    pub async fn update_contact_with<'e, E>(
        &self,
        executor: E,
        owner: Uuid,
        contact_id: Uuid,
        input: &ContactInput,
    ) -> Result<Option<Contact>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let contact = sqlx::query_as::<_, Contact>(
            r#"
            UPDATE contacts
            SET name = $1, phone = $2, email = $3, property_id = $4, visit_date = $5,
                updated_at = NOW()
            WHERE owner_id = $6 AND id = $7
            RETURNING
                id, owner_id, name, phone, email, property_id, stage_id,
                visit_date, sale_date, sale_value, created_at, updated_at
            "#,
        )
            .bind(&input.name)
            .bind(input.phone.as_deref())
            .bind(input.email.as_deref())
            .bind(input.property_id)
            .bind(input.visit_date)
            .bind(owner)
            .bind(contact_id)
            .fetch_optional(executor)
            .await?;

        Ok(contact)
    }

    pub async fn set_contact_stage_with<'e, E>(
        &self,
        executor: E,
        owner: Uuid,
        contact_id: Uuid,
        stage_id: Option<Uuid>,
    ) -> Result<Option<Contact>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // sale_date/sale_value ficam como estão, mesmo saindo da etapa ganha
        let contact = sqlx::query_as::<_, Contact>(
            r#"
            UPDATE contacts SET stage_id = $1, updated_at = NOW()
            WHERE owner_id = $2 AND id = $3
            RETURNING
                id, owner_id, name, phone, email, property_id, stage_id,
                visit_date, sale_date, sale_value, created_at, updated_at
            "#,
        )
            .bind(stage_id)
            .bind(owner)
            .bind(contact_id)
            .fetch_optional(executor)
            .await?;

        Ok(contact)
    }

    pub async fn record_sale_with<'e, E>(
        &self,
        executor: E,
        owner: Uuid,
        contact_id: Uuid,
        stage_id: Uuid,
        sale_date: DateTime<Utc>,
        sale_value: Decimal,
    ) -> Result<Option<Contact>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let contact = sqlx::query_as::<_, Contact>(
            r#"
            UPDATE contacts
            SET stage_id = $1, sale_date = $2, sale_value = $3, updated_at = NOW()
            WHERE owner_id = $4 AND id = $5
            RETURNING
                id, owner_id, name, phone, email, property_id, stage_id,
                visit_date, sale_date, sale_value, created_at, updated_at
            "#,
        )
            .bind(stage_id)
            .bind(sale_date)
            .bind(sale_value)
            .bind(owner)
            .bind(contact_id)
            .fetch_optional(executor)
            .await?;

        Ok(contact)
    }

    pub async fn delete_contact_with<'e, E>(
        &self,
        executor: E,
        owner: Uuid,
        contact_id: Uuid,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM contacts WHERE owner_id = $1 AND id = $2")
            .bind(owner)
            .bind(contact_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    //  IMÓVEIS
    // =========================================================================

    pub async fn list_properties_with<'e, E>(
        &self,
        executor: E,
        owner: Uuid,
    ) -> Result<Vec<Property>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let properties = sqlx::query_as::<_, Property>(
            r#"
            SELECT id, owner_id, description, price, commission_pct, created_at
            FROM properties
            WHERE owner_id = $1
            ORDER BY created_at ASC
            "#,
        )
            .bind(owner)
            .fetch_all(executor)
            .await?;

        Ok(properties)
    }

    pub async fn find_property_with<'e, E>(
        &self,
        executor: E,
        owner: Uuid,
        property_id: Uuid,
    ) -> Result<Option<Property>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let property = sqlx::query_as::<_, Property>(
            r#"
            SELECT id, owner_id, description, price, commission_pct, created_at
            FROM properties
            WHERE owner_id = $1 AND id = $2
            "#,
        )
            .bind(owner)
            .bind(property_id)
            .fetch_optional(executor)
            .await?;

        Ok(property)
    }

    pub async fn insert_property_with<'e, E>(
        &self,
        executor: E,
        owner: Uuid,
        input: &PropertyInput,
    ) -> Result<Property, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let property = sqlx::query_as::<_, Property>(
            r#"
            INSERT INTO properties (owner_id, description, price, commission_pct)
            VALUES ($1, $2, $3, $4)
            RETURNING id, owner_id, description, price, commission_pct, created_at
            "#,
        )
            .bind(owner)
            .bind(&input.description)
            .bind(input.price)
            .bind(input.commission_pct)
            .fetch_one(executor)
            .await?;

        Ok(property)
    }

    pub async fn delete_property_with<'e, E>(
        &self,
        executor: E,
        owner: Uuid,
        property_id: Uuid,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // contacts.property_id tem ON DELETE SET NULL
        let result = sqlx::query("DELETE FROM properties WHERE owner_id = $1 AND id = $2")
            .bind(owner)
            .bind(property_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

// Cada chamada abre sua própria transação com a chave RLS do dono.
#[async_trait]
impl CrmStore for PgCrmStore {
    async fn list_stages(&self, owner: Uuid) -> Result<Vec<Stage>, AppError> {
        let mut tx = begin_rls(&self.pool, owner).await?;
        let stages = self.list_stages_with(&mut *tx, owner).await?;
        tx.commit().await?;
        Ok(stages)
    }

    async fn find_stage(&self, owner: Uuid, stage_id: Uuid) -> Result<Option<Stage>, AppError> {
        let mut tx = begin_rls(&self.pool, owner).await?;
        let stage = self.find_stage_with(&mut *tx, owner, stage_id).await?;
        tx.commit().await?;
        Ok(stage)
    }

    async fn insert_stage(
        &self,
        owner: Uuid,
        name: &str,
        position: i32,
        is_default: bool,
    ) -> Result<Stage, AppError> {
        let mut tx = begin_rls(&self.pool, owner).await?;
        let stage = self
            .insert_stage_with(&mut *tx, owner, name, position, is_default)
            .await?;
        tx.commit().await?;
        Ok(stage)
    }

    async fn rename_stage(
        &self,
        owner: Uuid,
        stage_id: Uuid,
        name: &str,
    ) -> Result<Option<Stage>, AppError> {
        let mut tx = begin_rls(&self.pool, owner).await?;
        let stage = self.rename_stage_with(&mut *tx, owner, stage_id, name).await?;
        tx.commit().await?;
        Ok(stage)
    }

    async fn update_stage_positions(
        &self,
        owner: Uuid,
        positions: &[(Uuid, i32)],
    ) -> Result<(), AppError> {
        let mut tx = begin_rls(&self.pool, owner).await?;
        // Se falhar, o drop do `tx` faz o rollback
        self.update_stage_positions_with(&mut *tx, owner, positions).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn count_contacts_in_stage(&self, owner: Uuid, stage_id: Uuid) -> Result<i64, AppError> {
        let mut tx = begin_rls(&self.pool, owner).await?;
        let count = self
            .count_contacts_in_stage_with(&mut *tx, owner, stage_id)
            .await?;
        tx.commit().await?;
        Ok(count)
    }

    async fn delete_stage(&self, owner: Uuid, stage_id: Uuid) -> Result<bool, AppError> {
        let mut tx = begin_rls(&self.pool, owner).await?;
        let deleted = self.delete_stage_with(&mut *tx, owner, stage_id).await?;
        tx.commit().await?;
        Ok(deleted)
    }

    async fn list_contacts(&self, owner: Uuid) -> Result<Vec<ContactDetail>, AppError> {
        let mut tx = begin_rls(&self.pool, owner).await?;
        let contacts = self.list_contacts_with(&mut *tx, owner).await?;
        tx.commit().await?;
        Ok(contacts)
    }

    async fn find_contact(
        &self,
        owner: Uuid,
        contact_id: Uuid,
    ) -> Result<Option<ContactDetail>, AppError> {
        let mut tx = begin_rls(&self.pool, owner).await?;
        let contact = self.find_contact_with(&mut *tx, owner, contact_id).await?;
        tx.commit().await?;
        Ok(contact)
    }

    async fn insert_contact(&self, owner: Uuid, input: &ContactInput) -> Result<Contact, AppError> {
        let mut tx = begin_rls(&self.pool, owner).await?;
        let contact = self.insert_contact_with(&mut *tx, owner, input).await?;
        tx.commit().await?;
        Ok(contact)
    }

    async fn update_contact(
        &self,
        owner: Uuid,
        contact_id: Uuid,
        input: &ContactInput,
    ) -> Result<Option<Contact>, AppError> {
        let mut tx = begin_rls(&self.pool, owner).await?;
        let contact = self
            .update_contact_with(&mut *tx, owner, contact_id, input)
            .await?;
        tx.commit().await?;
        Ok(contact)
    }

    async fn set_contact_stage(
        &self,
        owner: Uuid,
        contact_id: Uuid,
        stage_id: Option<Uuid>,
    ) -> Result<Option<Contact>, AppError> {
        let mut tx = begin_rls(&self.pool, owner).await?;
        let contact = self
            .set_contact_stage_with(&mut *tx, owner, contact_id, stage_id)
            .await?;
        tx.commit().await?;
        Ok(contact)
    }

    async fn record_sale(
        &self,
        owner: Uuid,
        contact_id: Uuid,
        stage_id: Uuid,
        sale_date: DateTime<Utc>,
        sale_value: Decimal,
    ) -> Result<Option<Contact>, AppError> {
        let mut tx = begin_rls(&self.pool, owner).await?;
        let contact = self
            .record_sale_with(&mut *tx, owner, contact_id, stage_id, sale_date, sale_value)
            .await?;
        tx.commit().await?;
        Ok(contact)
    }

    async fn delete_contact(&self, owner: Uuid, contact_id: Uuid) -> Result<bool, AppError> {
        let mut tx = begin_rls(&self.pool, owner).await?;
        let deleted = self.delete_contact_with(&mut *tx, owner, contact_id).await?;
        tx.commit().await?;
        Ok(deleted)
    }

    async fn list_properties(&self, owner: Uuid) -> Result<Vec<Property>, AppError> {
        let mut tx = begin_rls(&self.pool, owner).await?;
        let properties = self.list_properties_with(&mut *tx, owner).await?;
        tx.commit().await?;
        Ok(properties)
    }

    async fn find_property(
        &self,
        owner: Uuid,
        property_id: Uuid,
    ) -> Result<Option<Property>, AppError> {
        let mut tx = begin_rls(&self.pool, owner).await?;
        let property = self.find_property_with(&mut *tx, owner, property_id).await?;
        tx.commit().await?;
        Ok(property)
    }

    async fn insert_property(
        &self,
        owner: Uuid,
        input: &PropertyInput,
    ) -> Result<Property, AppError> {
        let mut tx = begin_rls(&self.pool, owner).await?;
        let property = self.insert_property_with(&mut *tx, owner, input).await?;
        tx.commit().await?;
        Ok(property)
    }

    async fn delete_property(&self, owner: Uuid, property_id: Uuid) -> Result<bool, AppError> {
        let mut tx = begin_rls(&self.pool, owner).await?;
        let deleted = self.delete_property_with(&mut *tx, owner, property_id).await?;
        tx.commit().await?;
        Ok(deleted)
    }
}
