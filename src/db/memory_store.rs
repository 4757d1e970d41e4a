// src/db/memory_store.rs
//
// Implementação em memória do `CrmStore`, usada pelos testes dos serviços.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::store::CrmStore,
    models::{
        crm::{Contact, ContactDetail, ContactInput, Property, PropertyInput},
        pipeline::Stage,
    },
};

#[derive(Default)]
struct Tables {
    // Vetores na ordem de inserção
    stages: Vec<Stage>,
    contacts: Vec<Contact>,
    properties: Vec<Property>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_position_updates: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Faz a próxima `update_stage_positions` falhar depois da primeira linha.
    pub fn fail_next_position_update(&self) {
        self.fail_position_updates.store(true, Ordering::SeqCst);
    }

    fn detail(tables: &Tables, contact: &Contact) -> ContactDetail {
        let property = contact
            .property_id
            .and_then(|id| tables.properties.iter().find(|p| p.id == id));
        let stage = contact
            .stage_id
            .and_then(|id| tables.stages.iter().find(|s| s.id == id));

        ContactDetail {
            contact: contact.clone(),
            property_description: property.map(|p| p.description.clone()),
            property_price: property.map(|p| p.price),
            property_commission_pct: property.map(|p| p.commission_pct),
            stage_name: stage.map(|s| s.name.clone()),
        }
    }
}

#[async_trait]
impl CrmStore for MemoryStore {
    async fn list_stages(&self, owner: Uuid) -> Result<Vec<Stage>, AppError> {
        let tables = self.tables.lock().await;
        let mut stages: Vec<Stage> = tables
            .stages
            .iter()
            .filter(|s| s.owner_id == owner)
            .cloned()
            .collect();
        // sort_by_key é estável: empates ficam na ordem de inserção
        stages.sort_by_key(|s| s.position);
        Ok(stages)
    }

    async fn find_stage(&self, owner: Uuid, stage_id: Uuid) -> Result<Option<Stage>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .stages
            .iter()
            .find(|s| s.owner_id == owner && s.id == stage_id)
            .cloned())
    }

    async fn insert_stage(
        &self,
        owner: Uuid,
        name: &str,
        position: i32,
        is_default: bool,
    ) -> Result<Stage, AppError> {
        let stage = Stage {
            id: Uuid::new_v4(),
            owner_id: owner,
            name: name.to_string(),
            position,
            is_default,
            created_at: Utc::now(),
        };
        self.tables.lock().await.stages.push(stage.clone());
        Ok(stage)
    }

    async fn rename_stage(
        &self,
        owner: Uuid,
        stage_id: Uuid,
        name: &str,
    ) -> Result<Option<Stage>, AppError> {
        let mut tables = self.tables.lock().await;
        Ok(tables
            .stages
            .iter_mut()
            .find(|s| s.owner_id == owner && s.id == stage_id)
            .map(|stage| {
                stage.name = name.to_string();
                stage.clone()
            }))
    }

    async fn update_stage_positions(
        &self,
        owner: Uuid,
        positions: &[(Uuid, i32)],
    ) -> Result<(), AppError> {
        let mut tables = self.tables.lock().await;

        // Trabalha numa cópia e só publica no fim, como um commit.
        let mut staged = tables.stages.clone();
        for (index, &(stage_id, position)) in positions.iter().enumerate() {
            if index > 0 && self.fail_position_updates.swap(false, Ordering::SeqCst) {
                return Err(AppError::PartialPositionUpdate(format!(
                    "etapa {} não foi atualizada",
                    stage_id
                )));
            }
            let stage = staged
                .iter_mut()
                .find(|s| s.owner_id == owner && s.id == stage_id)
                .ok_or_else(|| {
                    AppError::PartialPositionUpdate(format!(
                        "etapa {} não foi atualizada",
                        stage_id
                    ))
                })?;
            stage.position = position;
        }

        tables.stages = staged;
        Ok(())
    }

    async fn count_contacts_in_stage(&self, owner: Uuid, stage_id: Uuid) -> Result<i64, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .contacts
            .iter()
            .filter(|c| c.owner_id == owner && c.stage_id == Some(stage_id))
            .count() as i64)
    }

    async fn delete_stage(&self, owner: Uuid, stage_id: Uuid) -> Result<bool, AppError> {
        let mut tables = self.tables.lock().await;
        if tables.contacts.iter().any(|c| c.stage_id == Some(stage_id)) {
            return Err(AppError::StageHasContacts);
        }
        let before = tables.stages.len();
        tables
            .stages
            .retain(|s| !(s.owner_id == owner && s.id == stage_id));
        Ok(tables.stages.len() < before)
    }

    async fn list_contacts(&self, owner: Uuid) -> Result<Vec<ContactDetail>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .contacts
            .iter()
            .filter(|c| c.owner_id == owner)
            .map(|c| Self::detail(&tables, c))
            .collect())
    }

    async fn find_contact(
        &self,
        owner: Uuid,
        contact_id: Uuid,
    ) -> Result<Option<ContactDetail>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .contacts
            .iter()
            .find(|c| c.owner_id == owner && c.id == contact_id)
            .map(|c| Self::detail(&tables, c)))
    }

    async fn insert_contact(&self, owner: Uuid, input: &ContactInput) -> Result<Contact, AppError> {
        let now = Utc::now();
        let contact = Contact {
            id: Uuid::new_v4(),
            owner_id: owner,
            name: input.name.clone(),
            phone: input.phone.clone(),
            email: input.email.clone(),
            property_id: input.property_id,
            stage_id: None,
            visit_date: input.visit_date,
            sale_date: None,
            sale_value: None,
            created_at: now,
            updated_at: now,
        };
        self.tables.lock().await.contacts.push(contact.clone());
        Ok(contact)
    }

    async fn update_contact(
        &self,
        owner: Uuid,
        contact_id: Uuid,
        input: &ContactInput,
    ) -> Result<Option<Contact>, AppError> {
        let mut tables = self.tables.lock().await;
        Ok(tables
            .contacts
            .iter_mut()
            .find(|c| c.owner_id == owner && c.id == contact_id)
            .map(|contact| {
                contact.name = input.name.clone();
                contact.phone = input.phone.clone();
                contact.email = input.email.clone();
                contact.property_id = input.property_id;
                contact.visit_date = input.visit_date;
                contact.updated_at = Utc::now();
                contact.clone()
            }))
    }

    async fn set_contact_stage(
        &self,
        owner: Uuid,
        contact_id: Uuid,
        stage_id: Option<Uuid>,
    ) -> Result<Option<Contact>, AppError> {
        let mut tables = self.tables.lock().await;
        Ok(tables
            .contacts
            .iter_mut()
            .find(|c| c.owner_id == owner && c.id == contact_id)
            .map(|contact| {
                contact.stage_id = stage_id;
                contact.updated_at = Utc::now();
                contact.clone()
            }))
    }

    async fn record_sale(
        &self,
        owner: Uuid,
        contact_id: Uuid,
        stage_id: Uuid,
        sale_date: DateTime<Utc>,
        sale_value: Decimal,
    ) -> Result<Option<Contact>, AppError> {
        let mut tables = self.tables.lock().await;
        Ok(tables
            .contacts
            .iter_mut()
            .find(|c| c.owner_id == owner && c.id == contact_id)
            .map(|contact| {
                contact.stage_id = Some(stage_id);
                contact.sale_date = Some(sale_date);
                contact.sale_value = Some(sale_value);
                contact.updated_at = Utc::now();
                contact.clone()
            }))
    }

    async fn delete_contact(&self, owner: Uuid, contact_id: Uuid) -> Result<bool, AppError> {
        let mut tables = self.tables.lock().await;
        let before = tables.contacts.len();
        tables
            .contacts
            .retain(|c| !(c.owner_id == owner && c.id == contact_id));
        Ok(tables.contacts.len() < before)
    }

    async fn list_properties(&self, owner: Uuid) -> Result<Vec<Property>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .properties
            .iter()
            .filter(|p| p.owner_id == owner)
            .cloned()
            .collect())
    }

    async fn find_property(
        &self,
        owner: Uuid,
        property_id: Uuid,
    ) -> Result<Option<Property>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .properties
            .iter()
            .find(|p| p.owner_id == owner && p.id == property_id)
            .cloned())
    }

    async fn insert_property(
        &self,
        owner: Uuid,
        input: &PropertyInput,
    ) -> Result<Property, AppError> {
        let property = Property {
            id: Uuid::new_v4(),
            owner_id: owner,
            description: input.description.clone(),
            price: input.price,
            commission_pct: input.commission_pct,
            created_at: Utc::now(),
        };
        self.tables.lock().await.properties.push(property.clone());
        Ok(property)
    }

    async fn delete_property(&self, owner: Uuid, property_id: Uuid) -> Result<bool, AppError> {
        let mut tables = self.tables.lock().await;
        let before = tables.properties.len();
        tables
            .properties
            .retain(|p| !(p.owner_id == owner && p.id == property_id));
        let deleted = tables.properties.len() < before;
        if deleted {
            // Mesmo efeito do ON DELETE SET NULL
            for contact in tables.contacts.iter_mut() {
                if contact.property_id == Some(property_id) {
                    contact.property_id = None;
                }
            }
        }
        Ok(deleted)
    }
}
