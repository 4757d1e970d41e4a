// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{db_utils::set_rls_user, error::AppError},
    db::{PgCrmStore, UserRepository},
    models::auth::{Claims, User},
};

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    crm_store: PgCrmStore,
    jwt_secret: String,
    token_ttl_days: i64,
    pool: PgPool,
}

impl AuthService {
    pub fn new(
        user_repo: UserRepository,
        crm_store: PgCrmStore,
        jwt_secret: String,
        token_ttl_days: i64,
        pool: PgPool,
    ) -> Self {
        Self {
            user_repo,
            crm_store,
            jwt_secret,
            token_ttl_days,
            pool,
        }
    }

    /// Cria o usuário já com as etapas padrão do funil, tudo na mesma transação.
    pub async fn register_user(&self, email: &str, password: &str) -> Result<String, AppError> {
        // 1. Hashing fora da transação, não toca no banco
        let password_clone = password.to_owned();
        let hashed_password = tokio::task::spawn_blocking(move || {
            hash(&password_clone, bcrypt::DEFAULT_COST)
        })
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;

        let mut tx = self.pool.begin().await?;

        // 2. Usuário
        let new_user = self
            .user_repo
            .create_user(&mut *tx, email, &hashed_password)
            .await?; // Se falhar, o drop do tx faz o rollback

        // 3. Etapas padrão, já sob a política RLS do novo dono
        set_rls_user(&mut tx, new_user.id).await?;
        let stages = self
            .crm_store
            .insert_default_stages(&mut *tx, new_user.id)
            .await?;

        tx.commit().await?;
        tracing::info!(
            "👤 Usuário {} criado com {} etapas padrão.",
            new_user.id,
            stages.len()
        );

        issue_token(&self.jwt_secret, new_user.id, self.token_ttl_days)
    }

    pub async fn login_user(&self, email: &str, password: &str) -> Result<String, AppError> {
        let user = self
            .user_repo
            .find_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password_clone = password.to_owned();
        let password_hash_clone = user.password_hash.clone();

        // Executa a verificação em um thread separado
        let is_password_valid = tokio::task::spawn_blocking(move || {
            verify(&password_clone, &password_hash_clone)
        })
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }

        issue_token(&self.jwt_secret, user.id, self.token_ttl_days)
    }

    pub async fn validate_token(&self, token: &str) -> Result<User, AppError> {
        let claims = decode_token(&self.jwt_secret, token)?;

        self.user_repo
            .find_by_id(claims.sub)
            .await?
            .ok_or(AppError::UserNotFound)
    }
}

fn issue_token(secret: &str, user_id: Uuid, ttl_days: i64) -> Result<String, AppError> {
    let now = Utc::now();
    let expires_at = now + chrono::Duration::days(ttl_days);

    let claims = Claims {
        sub: user_id,
        exp: expires_at.timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?)
}

fn decode_token(secret: &str, token: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )
        .map(|data| data.claims)
        .map_err(|_| AppError::InvalidToken)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_carries_the_user_id() {
        let user_id = Uuid::new_v4();
        let token = issue_token("segredo", user_id, 7).unwrap();
        let claims = decode_token("segredo", &token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn token_signed_with_another_secret_is_rejected() {
        let token = issue_token("segredo", Uuid::new_v4(), 7).unwrap();
        assert!(matches!(
            decode_token("outro", &token),
            Err(AppError::InvalidToken)
        ));
        assert!(matches!(
            decode_token("segredo", "nao.e.token"),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = issue_token("segredo", Uuid::new_v4(), -1).unwrap();
        assert!(matches!(
            decode_token("segredo", &token),
            Err(AppError::InvalidToken)
        ));
    }
}
