use sqlx::sqlite::SqliteRow;
use sqlx::SqliteConnection;

use lendflow_core::domain::application::{InternalStatus, LoanApplicationId};
use lendflow_core::domain::approver::ApproverId;
use lendflow_core::domain::log::{LoanApplicationLog, LogAction, LogEntryId};

use super::{column, decode_enum, decode_timestamp, encode_timestamp, RepositoryError};

pub(crate) fn row_to_log(row: &SqliteRow) -> Result<LoanApplicationLog, RepositoryError> {
    let id: String = column(row, "id")?;
    let loan_application_id: String = column(row, "loan_application_id")?;
    let performed_by: String = column(row, "performed_by")?;
    let assigned_to: Option<String> = column(row, "assigned_to")?;
    let action: String = column(row, "action")?;
    let from_status: String = column(row, "from_status")?;
    let to_status: String = column(row, "to_status")?;
    let remarks: String = column(row, "remarks")?;
    let occurred_at: String = column(row, "occurred_at")?;

    Ok(LoanApplicationLog {
        id: LogEntryId(id),
        loan_application_id: LoanApplicationId(loan_application_id),
        performed_by: ApproverId(performed_by),
        assigned_to: assigned_to.map(ApproverId),
        action: decode_enum(&action, "action", LogAction::parse)?,
        from_status: decode_enum(&from_status, "from_status", InternalStatus::parse)?,
        to_status: decode_enum(&to_status, "to_status", InternalStatus::parse)?,
        remarks,
        occurred_at: decode_timestamp(&occurred_at, "occurred_at")?,
    })
}

/// Log rows are append-only; there is no update or delete counterpart.
pub(crate) async fn insert_log(
    conn: &mut SqliteConnection,
    entry: &LoanApplicationLog,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO loan_application_log (id, loan_application_id, performed_by, assigned_to,
                                           action, from_status, to_status, remarks, occurred_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&entry.id.0)
    .bind(&entry.loan_application_id.0)
    .bind(&entry.performed_by.0)
    .bind(entry.assigned_to.as_ref().map(|id| id.0.as_str()))
    .bind(entry.action.as_str())
    .bind(entry.from_status.as_str())
    .bind(entry.to_status.as_str())
    .bind(&entry.remarks)
    .bind(encode_timestamp(&entry.occurred_at))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub(crate) async fn fetch_logs(
    conn: &mut SqliteConnection,
    id: &LoanApplicationId,
) -> Result<Vec<LoanApplicationLog>, RepositoryError> {
    let rows = sqlx::query(
        "SELECT id, loan_application_id, performed_by, assigned_to, action, from_status,
                to_status, remarks, occurred_at
         FROM loan_application_log
         WHERE loan_application_id = ?
         ORDER BY occurred_at, seq",
    )
    .bind(&id.0)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(row_to_log).collect()
}
