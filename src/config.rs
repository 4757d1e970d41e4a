// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use axum::extract::FromRef;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    common::i18n::I18nStore,
    db::{CrmStore, PgCrmStore, UserRepository},
    services::{
        auth::AuthService, board_service::BoardService, crm_service::CrmService,
        dashboard_service::DashboardService, stage_service::StageService,
    },
};

const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_TOKEN_TTL_DAYS: i64 = 7;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub i18n_store: Arc<I18nStore>,
    pub auth_service: AuthService,
    pub stage_service: StageService,
    pub board_service: BoardService,
    pub crm_service: CrmService,
    pub dashboard_service: DashboardService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?;
        let max_connections = env_or("DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?;
        let token_ttl_days = env_or("JWT_TTL_DAYS", DEFAULT_TOKEN_TTL_DAYS)?;

        let db_pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        let i18n_store = Arc::new(I18nStore::load()?);

        // --- Monta o gráfico de dependências ---
        let pg_store = PgCrmStore::new(db_pool.clone());
        let store: Arc<dyn CrmStore> = Arc::new(pg_store.clone());

        let auth_service = AuthService::new(
            UserRepository::new(db_pool.clone()),
            pg_store,
            jwt_secret,
            token_ttl_days,
            db_pool.clone(),
        );

        Ok(Self {
            db_pool,
            i18n_store,
            auth_service,
            stage_service: StageService::new(store.clone()),
            board_service: BoardService::new(store.clone()),
            crm_service: CrmService::new(store.clone()),
            dashboard_service: DashboardService::new(store),
        })
    }
}

// Extratores que só precisam das traduções
impl FromRef<AppState> for Arc<I18nStore> {
    fn from_ref(state: &AppState) -> Self {
        state.i18n_store.clone()
    }
}

// Variável opcional: usa o padrão quando ausente, erro quando mal formatada
fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} inválida: {}", key, raw)),
        Err(_) => Ok(default),
    }
}
