// src/main.rs

use anyhow::Context;
use axum::{
    middleware as axum_middleware,
    routing::{get, patch, post, put},
    Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::AppState;
use crate::docs::ApiDoc;
use crate::middleware::auth::auth_guard;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG controla o nível; sem ela, "info"
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let app_state = AppState::new()
        .await
        .context("Falha ao inicializar o estado da aplicação.")?;

    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .context("Falha ao rodar as migrações do banco de dados.")?;

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    let app = build_router(app_state);

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Falha ao iniciar o listener TCP em {}", addr))?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("Erro no servidor Axum")?;
    Ok(())
}

fn build_router(app_state: AppState) -> Router {
    // Rotas públicas
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login));

    let user_routes = Router::new().route("/me", get(handlers::auth::get_me));

    let pipeline_routes = Router::new()
        .route(
            "/stages",
            get(handlers::pipeline::list_stages).post(handlers::pipeline::create_stage),
        )
        .route(
            "/stages/{id}",
            patch(handlers::pipeline::rename_stage).delete(handlers::pipeline::delete_stage),
        )
        .route(
            "/stages/{id}/reposition",
            post(handlers::pipeline::reposition_stage),
        )
        .route("/board", get(handlers::pipeline::get_board))
        .route("/drop", post(handlers::pipeline::drop_contact))
        .route("/assign", post(handlers::pipeline::assign_contact));

    let contact_routes = Router::new()
        .route(
            "/",
            get(handlers::crm::list_contacts).post(handlers::crm::create_contact),
        )
        .route(
            "/{id}",
            put(handlers::crm::update_contact).delete(handlers::crm::delete_contact),
        )
        .route(
            "/{id}/stage",
            put(handlers::pipeline::set_contact_stage)
                .delete(handlers::pipeline::remove_contact_stage),
        );

    let property_routes = Router::new()
        .route(
            "/",
            get(handlers::crm::list_properties).post(handlers::crm::create_property),
        )
        .route("/{id}", axum::routing::delete(handlers::crm::delete_property));

    let dashboard_routes =
        Router::new().route("/summary", get(handlers::dashboard::get_summary));

    // Tudo abaixo exige token
    let protected = Router::new()
        .nest("/api/users", user_routes)
        .nest("/api/pipeline", pipeline_routes)
        .nest("/api/contacts", contact_routes)
        .nest("/api/properties", property_routes)
        .nest("/api/dashboard", dashboard_routes)
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/auth", auth_routes)
        .merge(protected)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(app_state)
}
