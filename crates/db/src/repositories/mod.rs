use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite};
use thiserror::Error;

use lendflow_core::domain::application::{LoanApplication, LoanApplicationId, ProductId};
use lendflow_core::domain::approver::{Approver, ApproverId, Role};
use lendflow_core::domain::credit_rule::CreditAssignmentRule;
use lendflow_core::StoreError;

pub mod application;
pub mod approver;
pub mod credit_rule;
pub mod log;
pub mod memory;
pub mod terms;

pub use application::SqlLoanApplicationRepository;
pub use approver::SqlApproverRepository;
pub use credit_rule::SqlCreditRuleRepository;
pub use memory::{InMemoryWorkflowStore, InMemoryWorkflowTx};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("{0} not found")]
    Missing(String),
}

impl From<RepositoryError> for StoreError {
    fn from(error: RepositoryError) -> Self {
        StoreError::new(error.to_string())
    }
}

#[async_trait]
pub trait ApproverRepository: Send + Sync {
    async fn find_approver(&self, id: &ApproverId) -> Result<Option<Approver>, RepositoryError>;
    /// Every approver holding `role`, whatever their status.
    async fn list_approvers_by_role(&self, role: &Role) -> Result<Vec<Approver>, RepositoryError>;
    async fn save_approver(&self, approver: Approver) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait LoanApplicationRepository: Send + Sync {
    /// Looks up an application regardless of its record status.
    async fn find_application(
        &self,
        id: &LoanApplicationId,
    ) -> Result<Option<LoanApplication>, RepositoryError>;
    async fn save_application(&self, application: LoanApplication) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait CreditRuleRepository: Send + Sync {
    async fn list_rules_for_product(
        &self,
        product_id: &ProductId,
    ) -> Result<Vec<CreditAssignmentRule>, RepositoryError>;
    async fn save_rule(&self, rule: CreditAssignmentRule) -> Result<(), RepositoryError>;
}

pub(crate) fn column<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T, RepositoryError>
where
    T: sqlx::Decode<'r, Sqlite> + sqlx::Type<Sqlite>,
{
    row.try_get(name).map_err(|e| RepositoryError::Decode(e.to_string()))
}

/// Fixed-width UTC timestamps, so stored values sort the same as text and as time.
pub(crate) fn encode_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn decode_timestamp(value: &str, name: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("{name}: invalid timestamp `{value}`: {e}")))
}

pub(crate) fn decode_decimal(value: &str, name: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(value)
        .map_err(|e| RepositoryError::Decode(format!("{name}: invalid decimal `{value}`: {e}")))
}

pub(crate) fn decode_enum<T>(
    value: &str,
    name: &str,
    parse: impl FnOnce(&str) -> Option<T>,
) -> Result<T, RepositoryError> {
    parse(value).ok_or_else(|| RepositoryError::Decode(format!("{name}: unknown value `{value}`")))
}

pub(crate) fn decode_months(value: i64, name: &str) -> Result<u32, RepositoryError> {
    u32::try_from(value)
        .map_err(|_| RepositoryError::Decode(format!("{name}: out of range month count {value}")))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::{decode_decimal, decode_timestamp, encode_timestamp, RepositoryError};

    #[test]
    fn timestamps_encode_with_fixed_width() {
        let early = Utc.with_ymd_and_hms(2026, 3, 1, 9, 5, 0).single().expect("valid time");
        let later = early + chrono::Duration::microseconds(1);

        let early_text = encode_timestamp(&early);
        let later_text = encode_timestamp(&later);

        assert_eq!(early_text, "2026-03-01T09:05:00.000000Z");
        assert_eq!(early_text.len(), later_text.len());
        assert!(early_text < later_text);
        assert_eq!(decode_timestamp(&later_text, "at").expect("decode"), later);
    }

    #[test]
    fn malformed_columns_surface_as_decode_errors() {
        assert_eq!(decode_decimal("1250.50", "amount").expect("decimal"), Decimal::new(125_050, 2));

        let error = decode_decimal("12,50", "amount").expect_err("comma is not a decimal point");
        assert!(matches!(error, RepositoryError::Decode(ref message) if message.contains("amount")));
        assert!(decode_timestamp("yesterday", "created_at").is_err());
    }
}
