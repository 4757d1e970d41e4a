// src/services/sale.rs

use rust_decimal::{Decimal, RoundingStrategy};

use crate::common::error::AppError;

/// De onde veio o valor da venda.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaleValue {
    /// Preço do imóvel do contato, sem perguntar nada ao operador.
    FromProperty(Decimal),
    /// Digitado pelo operador no diálogo da etapa ganha.
    FromOperator(Decimal),
}

impl SaleValue {
    pub fn amount(&self) -> Decimal {
        match self {
            SaleValue::FromProperty(value) | SaleValue::FromOperator(value) => *value,
        }
    }
}

// Colunas de dinheiro são NUMERIC(14, 2)
pub const MONEY_SCALE: u32 = 2;

/// Maior valor que cabe em NUMERIC(14, 2): 999.999.999.999,99.
pub fn max_money() -> Decimal {
    Decimal::new(99_999_999_999_999, MONEY_SCALE)
}

/// Arredonda para centavos como o Postgres faz; `None` se não couber na coluna.
pub fn to_money(value: Decimal) -> Option<Decimal> {
    let rounded = value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    (rounded.abs() <= max_money()).then_some(rounded)
}

/// Decide o valor da venda ao entrar na etapa ganha.
///
/// - imóvel com preço > 0: usa o preço e ignora o valor do operador;
/// - sem preço e sem valor informado: `Ok(None)`, ainda falta perguntar;
/// - valor informado que, em centavos, fica <= 0 ou acima do limite da
///   coluna (inclui diálogo cancelado com 0): `InvalidSaleValue`.
pub fn resolve_sale_value(
    property_price: Option<Decimal>,
    operator_value: Option<Decimal>,
) -> Result<Option<SaleValue>, AppError> {
    if let Some(price) = property_price
        .and_then(to_money)
        .filter(|p| *p > Decimal::ZERO)
    {
        return Ok(Some(SaleValue::FromProperty(price)));
    }

    match operator_value {
        None => Ok(None),
        Some(value) => match to_money(value) {
            Some(cents) if cents > Decimal::ZERO => Ok(Some(SaleValue::FromOperator(cents))),
            _ => Err(AppError::InvalidSaleValue),
        },
    }
}
