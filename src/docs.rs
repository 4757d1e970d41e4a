// src/docs.rs

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::OpenApi;

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,

        // --- Users ---
        handlers::auth::get_me,

        // --- Pipeline ---
        handlers::pipeline::list_stages,
        handlers::pipeline::create_stage,
        handlers::pipeline::rename_stage,
        handlers::pipeline::reposition_stage,
        handlers::pipeline::delete_stage,
        handlers::pipeline::get_board,
        handlers::pipeline::drop_contact,
        handlers::pipeline::assign_contact,
        handlers::pipeline::set_contact_stage,
        handlers::pipeline::remove_contact_stage,

        // --- Contacts ---
        handlers::crm::list_contacts,
        handlers::crm::create_contact,
        handlers::crm::update_contact,
        handlers::crm::delete_contact,

        // --- Properties ---
        handlers::crm::list_properties,
        handlers::crm::create_property,
        handlers::crm::delete_property,

        // --- Dashboard ---
        handlers::dashboard::get_summary,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::User,
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::AuthResponse,

            // --- Pipeline ---
            models::pipeline::Stage,
            models::pipeline::Direction,
            models::pipeline::PendingSale,
            models::pipeline::MoveOutcome,
            models::pipeline::DropEvent,
            models::pipeline::BoardColumn,
            models::pipeline::Board,
            handlers::pipeline::StageNamePayload,
            handlers::pipeline::RepositionPayload,
            handlers::pipeline::AssignPayload,
            handlers::pipeline::SetStagePayload,

            // --- CRM ---
            models::crm::Property,
            models::crm::Contact,
            models::crm::ContactDetail,
            handlers::crm::ContactPayload,
            handlers::crm::PropertyPayload,

            // --- Dashboard ---
            models::dashboard::DashboardSummary,
            models::dashboard::StageCount,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação e Registro"),
        (name = "Users", description = "Dados do Usuário"),
        (name = "Pipeline", description = "Etapas do funil e quadro de contatos"),
        (name = "Contacts", description = "Cadastro de contatos"),
        (name = "Properties", description = "Cadastro de imóveis"),
        (name = "Dashboard", description = "Indicadores de vendas")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_fields_are_documented_as_numbers() {
        let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();
        let price = &doc["components"]["schemas"]["Property"]["properties"]["price"];

        assert_eq!(price["type"], "number");
        let example = price
            .get("example")
            .or_else(|| price["examples"].get(0))
            .unwrap();
        assert!(example.is_number());
    }
}
