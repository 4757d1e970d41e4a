// src/services.rs

pub mod auth;
pub mod board_service;
pub mod crm_service;
pub mod dashboard_service;
pub mod sale;
pub mod stage_service;

use crate::common::error::AppError;

/// Texto obrigatório: devolve o valor sem espaços nas pontas, ou `RequiredField`.
pub(crate) fn require_text<'a>(value: &'a str, field: &'static str) -> Result<&'a str, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::RequiredField(field));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_text_trims_and_rejects_blank() {
        assert_eq!(require_text("  Pós-venda ", "name").unwrap(), "Pós-venda");
        assert!(matches!(
            require_text(" \t\n", "name"),
            Err(AppError::RequiredField("name"))
        ));
        assert!(matches!(require_text("", "query"), Err(AppError::RequiredField("query"))));
    }
}
