// src/common/db_utils.rs

use chrono::{Datelike, NaiveDate};
use sqlx::PgConnection;

use crate::common::error::AppError;

/// Converte violações de constraint do Postgres nos erros de domínio.
///
/// `on_unique` e `on_foreign_key` recebem o nome da constraint violada
/// (ex: `partners_cpf_cnpj_key`, `cattle_purchases_vendor_id_fkey`).
pub(crate) fn map_constraint_error(
    err: sqlx::Error,
    on_unique: impl FnOnce(&str) -> AppError,
    on_foreign_key: impl FnOnce(&str) -> AppError,
) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        let constraint = db_err.constraint().unwrap_or_default();
        if db_err.is_unique_violation() {
            return on_unique(constraint);
        }
        if db_err.is_foreign_key_violation() {
            return on_foreign_key(constraint);
        }
    }
    err.into()
}

/// Próximo código sequencial no formato `PREFIX-YYMMNNN`.
///
/// `last` é o maior código já emitido no mês (se houver). A sequência tem no
/// mínimo 3 dígitos e cresce além disso (`LOT-25031000` depois de `LOT-2503999`).
pub(crate) fn next_sequential_code(prefix: &str, date: NaiveDate, last: Option<&str>) -> String {
    let period_prefix = code_period_prefix(prefix, date);
    let sequence = last
        .and_then(|code| code.strip_prefix(period_prefix.as_str()))
        .and_then(|tail| tail.parse::<u32>().ok())
        .map(|n| n + 1)
        .unwrap_or(1);

    format!("{period_prefix}{sequence:03}")
}

/// Prefixo usado para buscar o último código do mês (`LOT-2503`).
pub(crate) fn code_period_prefix(prefix: &str, date: NaiveDate) -> String {
    format!("{prefix}-{}{:02}", date.format("%y"), date.month())
}

/// Serializa a emissão de códigos do mesmo prefixo até o fim da transação.
pub(crate) async fn lock_code_sequence(conn: &mut PgConnection, period_prefix: &str) -> Result<(), AppError> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(period_prefix)
        .execute(conn)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn first_code_of_the_month_starts_at_one() {
        assert_eq!(next_sequential_code("LOT", date(2025, 3, 10), None), "LOT-2503001");
    }

    #[test]
    fn increments_the_last_code_of_the_month() {
        let next = next_sequential_code("LOT", date(2025, 3, 10), Some("LOT-2503041"));
        assert_eq!(next, "LOT-2503042");
    }

    #[test]
    fn codes_from_another_month_restart_the_sequence() {
        let next = next_sequential_code("VND", date(2025, 4, 1), Some("VND-2503099"));
        assert_eq!(next, "VND-2504001");
    }

    #[test]
    fn sequence_grows_past_three_digits() {
        let next = next_sequential_code("LOT", date(2025, 3, 10), Some("LOT-2503999"));
        assert_eq!(next, "LOT-25031000");
        let next = next_sequential_code("LOT", date(2025, 3, 10), Some("LOT-25031000"));
        assert_eq!(next, "LOT-25031001");
    }

    #[test]
    fn period_prefix_matches_generated_codes() {
        let d = date(2026, 11, 5);
        assert!(next_sequential_code("LOT", d, None).starts_with(&code_period_prefix("LOT", d)));
    }
}
