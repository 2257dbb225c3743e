// src/common/validation.rs

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use validator::{ValidationError, ValidationErrors};

use crate::{
    common::error::{AppError, BusinessRule},
    middleware::i18n::Locale,
};

/// Maior valor que cabe em `NUMERIC(15, 2)`: 9.999.999.999.999,99.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(2_764_472_319, 232_830, 0, false, 2);

/// Maior preço unitário em `NUMERIC(15, 4)`: 99.999.999.999,9999.
pub const MAX_UNIT_PRICE: Decimal = Decimal::from_parts(2_764_472_319, 232_830, 0, false, 4);

fn too_large(max: Decimal) -> ValidationError {
    let mut err = ValidationError::new("range");
    err.add_param("max".into(), &max.to_string());
    err.message = Some(format!("O valor deve ser no máximo {max}.").into());
    err
}

pub fn validate_not_negative(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() && !val.is_zero() {
        let mut err = ValidationError::new("range");
        err.add_param("min".into(), &0.0);
        err.message = Some("O valor não pode ser negativo.".into());
        return Err(err);
    }
    if *val > MAX_AMOUNT {
        return Err(too_large(MAX_AMOUNT));
    }
    Ok(())
}

pub fn validate_positive(val: &Decimal) -> Result<(), ValidationError> {
    if *val <= Decimal::ZERO {
        let mut err = ValidationError::new("range");
        err.add_param("min".into(), &0.0);
        err.message = Some("O valor deve ser maior que zero.".into());
        return Err(err);
    }
    if *val > MAX_AMOUNT {
        return Err(too_large(MAX_AMOUNT));
    }
    Ok(())
}

/// Preço por kg: não negativo e dentro de `NUMERIC(15, 4)`.
pub fn validate_unit_price(val: &Decimal) -> Result<(), ValidationError> {
    validate_not_negative(val)?;
    if *val > MAX_UNIT_PRICE {
        return Err(too_large(MAX_UNIT_PRICE));
    }
    Ok(())
}

/// Valor calculado (`None` quando a conta estourou) que precisa caber nas colunas monetárias.
pub fn ensure_amount(value: Option<Decimal>) -> Result<Decimal, AppError> {
    match value {
        Some(amount) if amount.abs() <= MAX_AMOUNT => Ok(amount),
        _ => Err(BusinessRule::AmountOutOfRange.into()),
    }
}

/// Anos aceitos em datas de negócio e filtros de período.
pub const MIN_YEAR: i32 = 1900;
pub const MAX_YEAR: i32 = 9999;

pub fn is_business_date(date: &NaiveDate) -> bool {
    (MIN_YEAR..=MAX_YEAR).contains(&date.year())
}

pub fn validate_business_date(date: &NaiveDate) -> Result<(), ValidationError> {
    if !is_business_date(date) {
        let mut err = ValidationError::new("range");
        err.add_param("min".into(), &MIN_YEAR);
        err.add_param("max".into(), &MAX_YEAR);
        err.message = Some(format!("A data deve estar entre os anos {MIN_YEAR} e {MAX_YEAR}.").into());
        return Err(err);
    }
    Ok(())
}

/// Rendimento de carcaça em percentual (0 a 100].
pub fn validate_percentage(val: &Decimal) -> Result<(), ValidationError> {
    if *val <= Decimal::ZERO || *val > Decimal::ONE_HUNDRED {
        let mut err = ValidationError::new("range");
        err.message = Some("O percentual deve estar entre 0 e 100.".into());
        return Err(err);
    }
    Ok(())
}

/// Erro de validação de um único campo, no mesmo formato do `validator`.
pub fn field_error(field: &'static str, code: &'static str, message: &'static str) -> AppError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    let mut errors = ValidationErrors::new();
    errors.add(field, err);
    AppError::ValidationError(errors)
}

/// Atalho usado pelos handlers: valida e já traduz para `ApiError`.
pub fn validate_payload<T: validator::Validate>(
    payload: &T,
    locale: &Locale,
) -> Result<(), crate::common::error::ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(locale))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn negative_values_are_rejected() {
        assert!(validate_not_negative(&dec!(0)).is_ok());
        assert!(validate_not_negative(&dec!(10.5)).is_ok());
        assert!(validate_not_negative(&dec!(-0.01)).is_err());
    }

    #[test]
    fn amounts_beyond_the_column_precision_are_rejected() {
        assert!(validate_not_negative(&MAX_AMOUNT).is_ok());
        assert!(validate_not_negative(&dec!(10000000000000)).is_err());
        assert!(validate_positive(&dec!(70000000000000000000000000000)).is_err());
        assert!(validate_unit_price(&dec!(99999999999.9999)).is_ok());
        assert!(validate_unit_price(&dec!(100000000000)).is_err());
    }

    #[test]
    fn overflowed_or_oversized_results_are_business_errors() {
        assert_eq!(ensure_amount(Some(dec!(10.5))).unwrap(), dec!(10.5));
        assert!(matches!(
            ensure_amount(None),
            Err(AppError::BusinessRule(BusinessRule::AmountOutOfRange))
        ));
        assert!(matches!(
            ensure_amount(Some(dec!(10000000000000))),
            Err(AppError::BusinessRule(BusinessRule::AmountOutOfRange))
        ));
    }

    #[test]
    fn dates_outside_the_supported_years_are_rejected() {
        let date = |y| NaiveDate::from_ymd_opt(y, 1, 1).unwrap();
        assert!(validate_business_date(&date(2025)).is_ok());
        assert!(validate_business_date(&date(1900)).is_ok());
        assert!(validate_business_date(&date(1)).is_err());
        assert!(validate_business_date(&NaiveDate::MIN).is_err());
        assert!(validate_business_date(&NaiveDate::MAX).is_err());
    }

    #[test]
    fn zero_is_not_positive() {
        assert!(validate_positive(&dec!(0)).is_err());
        assert!(validate_positive(&dec!(0.001)).is_ok());
    }

    #[test]
    fn percentage_bounds() {
        assert!(validate_percentage(&dec!(52)).is_ok());
        assert!(validate_percentage(&dec!(100)).is_ok());
        assert!(validate_percentage(&dec!(0)).is_err());
        assert!(validate_percentage(&dec!(100.1)).is_err());
    }

    #[test]
    fn single_field_error_is_keyed_by_field() {
        let AppError::ValidationError(errors) = field_error("quantity", "range", "Quantidade inválida.") else {
            panic!("esperava erro de validação");
        };
        assert!(errors.field_errors().contains_key("quantity"));
    }
}
