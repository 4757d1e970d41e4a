// src/common/error.rs

use std::collections::HashMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::common::i18n::I18nStore;
use crate::middleware::i18n::Locale;

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    // Campo obrigatório vazio ou só com espaços (ex: nome da etapa)
    #[error("Campo obrigatório: {0}")]
    RequiredField(&'static str),

    #[error("Valor fora do intervalo permitido: {0}")]
    OutOfRange(&'static str),

    #[error("Valor de venda inválido")]
    InvalidSaleValue,

    #[error("Etapas padrão não podem ser excluídas")]
    DefaultStageLocked,

    #[error("Recurso não encontrado: {0}")]
    ResourceNotFound(String),

    #[error("A etapa ainda possui contatos")]
    StageHasContacts,

    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Usuário não encontrado")]
    UserNotFound,

    // Uma das linhas de uma troca/renumeração de posições não foi gravada.
    // A transação é desfeita antes deste erro subir.
    #[error("Atualização parcial de posições: {0}")]
    PartialPositionUpdate(String),

    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // `anyhow::Error` é ótimo para capturar o contexto do erro.
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

/// Categoria de alto nível mostrada ao operador.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Auth,
    Transport,
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::ValidationError(_)
            | AppError::RequiredField(_)
            | AppError::OutOfRange(_)
            | AppError::InvalidSaleValue
            | AppError::DefaultStageLocked => ErrorKind::Validation,
            AppError::ResourceNotFound(_) | AppError::UserNotFound => ErrorKind::NotFound,
            AppError::StageHasContacts | AppError::EmailAlreadyExists => ErrorKind::Conflict,
            AppError::InvalidCredentials | AppError::InvalidToken => ErrorKind::Auth,
            AppError::PartialPositionUpdate(_)
            | AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => ErrorKind::Transport,
        }
    }

    /// Chave usada nos arquivos de tradução (`locales/*.json`).
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "validation_error",
            AppError::RequiredField(_) => "required_field",
            AppError::OutOfRange(_) => "out_of_range",
            AppError::InvalidSaleValue => "invalid_sale_value",
            AppError::DefaultStageLocked => "default_stage_locked",
            AppError::ResourceNotFound(_) => "resource_not_found",
            AppError::StageHasContacts => "stage_has_contacts",
            AppError::EmailAlreadyExists => "email_already_exists",
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::InvalidToken => "invalid_token",
            AppError::UserNotFound => "user_not_found",
            _ => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidSaleValue => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::InvalidCredentials | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            _ => match self.kind() {
                ErrorKind::Validation => StatusCode::BAD_REQUEST,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Conflict => StatusCode::CONFLICT,
                ErrorKind::Auth => StatusCode::UNAUTHORIZED,
                ErrorKind::Transport => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    // Argumento que entra no "{0}" da mensagem traduzida
    fn message_arg(&self) -> Option<&str> {
        match self {
            AppError::RequiredField(field) | AppError::OutOfRange(field) => Some(*field),
            AppError::ResourceNotFound(resource) => Some(resource.as_str()),
            _ => None,
        }
    }

    /// Converte o erro interno numa resposta traduzida para o idioma do operador.
    pub fn to_api_error(&self, locale: &Locale, i18n: &I18nStore) -> ApiError {
        if self.kind() == ErrorKind::Transport {
            tracing::error!("Erro Interno do Servidor: {} ({:?})", self, self);
        }

        let message = i18n.translate(&locale.0, self.code(), self.message_arg());

        let details = match self {
            // Retorna todos os detalhes da validação, campo a campo.
            AppError::ValidationError(errors) => {
                let mut details: HashMap<String, Vec<String>> = HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                Some(json!(details))
            }
            _ => None,
        };

        ApiError {
            status: self.status(),
            message,
            details,
        }
    }
}

// O erro já pronto para sair pela API
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.message, "details": details }),
            None => json!({ "error": self.message }),
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_matches_operator_categories() {
        assert_eq!(AppError::RequiredField("name").kind(), ErrorKind::Validation);
        assert_eq!(AppError::InvalidSaleValue.kind(), ErrorKind::Validation);
        assert_eq!(AppError::DefaultStageLocked.kind(), ErrorKind::Validation);
        assert_eq!(AppError::StageHasContacts.kind(), ErrorKind::Conflict);
        assert_eq!(
            AppError::ResourceNotFound("etapa".into()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            AppError::PartialPositionUpdate("x".into()).kind(),
            ErrorKind::Transport
        );
    }

    #[test]
    fn status_codes() {
        assert_eq!(AppError::StageHasContacts.status(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::InvalidSaleValue.status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(AppError::InvalidToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::RequiredField("name").status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn api_error_is_localized() {
        let store = I18nStore::load().unwrap();
        let api = AppError::StageHasContacts.to_api_error(&Locale("pt".into()), &store);
        assert_eq!(api.status, StatusCode::CONFLICT);
        assert!(api.message.contains("contatos"));

        let api = AppError::ResourceNotFound("contact".into())
            .to_api_error(&Locale("en".into()), &store);
        assert_eq!(api.message, "Contact not found.");
    }
}
