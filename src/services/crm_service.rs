// src/services/crm_service.rs

use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::CrmStore,
    models::{
        auth::UserContext,
        crm::{Contact, ContactDetail, ContactInput, Property, PropertyInput},
    },
    services::{require_text, sale::to_money},
};

// Cadastro de contatos e imóveis (os formulários fora do quadro)
#[derive(Clone)]
pub struct CrmService {
    store: Arc<dyn CrmStore>,
}

impl CrmService {
    pub fn new(store: Arc<dyn CrmStore>) -> Self {
        Self { store }
    }

    // =========================================================================
    //  CONTATOS
    // =========================================================================

    pub async fn list_contacts(&self, ctx: &UserContext) -> Result<Vec<ContactDetail>, AppError> {
        self.store.list_contacts(ctx.user_id).await
    }

    /// Contato novo entra fora do funil; a etapa vem depois, pelo quadro.
    pub async fn create_contact(
        &self,
        ctx: &UserContext,
        input: ContactInput,
    ) -> Result<Contact, AppError> {
        let input = self.check_contact(ctx, input).await?;
        self.store.insert_contact(ctx.user_id, &input).await
    }

    pub async fn update_contact(
        &self,
        ctx: &UserContext,
        contact_id: Uuid,
        input: ContactInput,
    ) -> Result<Contact, AppError> {
        let input = self.check_contact(ctx, input).await?;
        self.store
            .update_contact(ctx.user_id, contact_id, &input)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("contact".into()))
    }

    pub async fn delete_contact(&self, ctx: &UserContext, contact_id: Uuid) -> Result<(), AppError> {
        if !self.store.delete_contact(ctx.user_id, contact_id).await? {
            return Err(AppError::ResourceNotFound("contact".into()));
        }
        Ok(())
    }

    // Nome obrigatório e imóvel (se houver) precisa ser do mesmo dono
    async fn check_contact(
        &self,
        ctx: &UserContext,
        mut input: ContactInput,
    ) -> Result<ContactInput, AppError> {
        input.name = require_text(&input.name, "name")?.to_string();
        input.phone = input.phone.filter(|p| !p.trim().is_empty());
        input.email = input.email.filter(|e| !e.trim().is_empty());

        if let Some(property_id) = input.property_id {
            self.store
                .find_property(ctx.user_id, property_id)
                .await?
                .ok_or_else(|| AppError::ResourceNotFound("property".into()))?;
        }

        Ok(input)
    }

    // =========================================================================
    //  IMÓVEIS
    // =========================================================================

    pub async fn list_properties(&self, ctx: &UserContext) -> Result<Vec<Property>, AppError> {
        self.store.list_properties(ctx.user_id).await
    }

    pub async fn create_property(
        &self,
        ctx: &UserContext,
        mut input: PropertyInput,
    ) -> Result<Property, AppError> {
        input.description = require_text(&input.description, "description")?.to_string();

        // Gravado em centavos; o que o banco arredondaria já sai arredondado daqui
        input.price = to_money(input.price)
            .filter(|p| *p >= Decimal::ZERO)
            .ok_or(AppError::OutOfRange("price"))?;
        input.commission_pct = input.commission_pct.round_dp(2);
        if input.commission_pct < Decimal::ZERO || input.commission_pct > Decimal::ONE_HUNDRED {
            return Err(AppError::OutOfRange("commissionPct"));
        }

        self.store.insert_property(ctx.user_id, &input).await
    }

    /// Contatos que apontavam para o imóvel ficam sem imóvel (o banco zera a referência).
    pub async fn delete_property(
        &self,
        ctx: &UserContext,
        property_id: Uuid,
    ) -> Result<(), AppError> {
        if !self.store.delete_property(ctx.user_id, property_id).await? {
            return Err(AppError::ResourceNotFound("property".into()));
        }
        tracing::info!("Imóvel {} excluído", property_id);
        Ok(())
    }
}
