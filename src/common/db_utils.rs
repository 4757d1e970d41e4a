// src/common/db_utils.rs

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::common::error::AppError;

// ---
// Helper RLS: A "Chave" para o Banco de Dados
// ---
/// Abre uma transação e define a variável RLS `app.user_id` (válida só dentro dela).
pub(crate) async fn begin_rls(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Transaction<'static, Postgres>, AppError> {
    // O operador '?' converte automaticamente sqlx::Error -> AppError::DatabaseError
    let mut tx = pool.begin().await?;

    set_rls_user(&mut tx, user_id).await?;

    Ok(tx)
}

/// Define o dono das linhas para uma transação já aberta (ex: no cadastro).
pub(crate) async fn set_rls_user(
    tx: &mut Transaction<'static, Postgres>,
    user_id: Uuid,
) -> Result<(), AppError> {
    sqlx::query("SELECT set_config('app.user_id', $1, true)")
        .bind(user_id.to_string())
        .execute(&mut **tx)
        .await?;

    Ok(())
}
