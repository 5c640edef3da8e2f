use sqlx::sqlite::SqliteRow;
use sqlx::SqliteConnection;

use lendflow_core::domain::application::LoanApplicationId;
use lendflow_core::domain::approver::ApproverId;
use lendflow_core::domain::terms::{
    ApprovedLoanTerms, ChargesBreakdown, DisbursalSummary, EmiSchedule, InterestType, LoanTerms,
};

use super::{
    column, decode_decimal, decode_enum, decode_months, decode_timestamp, encode_timestamp,
    RepositoryError,
};

fn row_to_approved_terms(row: &SqliteRow) -> Result<ApprovedLoanTerms, RepositoryError> {
    let application_id: String = column(row, "loan_application_id")?;
    let approved_amount: String = column(row, "approved_amount")?;
    let interest_rate: String = column(row, "interest_rate")?;
    let tenure_months: i64 = column(row, "tenure_months")?;
    let interest_type: String = column(row, "interest_type")?;
    let processing_fee_percent: String = column(row, "processing_fee_percent")?;
    let insurance_amount: String = column(row, "insurance_amount")?;
    let stamp_duty: String = column(row, "stamp_duty")?;
    let other_charges: String = column(row, "other_charges")?;
    let approved_by: String = column(row, "approved_by")?;
    let approved_at: String = column(row, "approved_at")?;

    Ok(ApprovedLoanTerms {
        application_id: LoanApplicationId(application_id),
        terms: LoanTerms {
            approved_amount: decode_decimal(&approved_amount, "approved_amount")?,
            interest_rate: decode_decimal(&interest_rate, "interest_rate")?,
            tenure_months: decode_months(tenure_months, "tenure_months")?,
            interest_type: decode_enum(&interest_type, "interest_type", InterestType::parse)?,
            processing_fee_percent: decode_decimal(
                &processing_fee_percent,
                "processing_fee_percent",
            )?,
            insurance_amount: decode_decimal(&insurance_amount, "insurance_amount")?,
            stamp_duty: decode_decimal(&stamp_duty, "stamp_duty")?,
            other_charges: decode_decimal(&other_charges, "other_charges")?,
        },
        approved_by: ApproverId(approved_by),
        approved_at: decode_timestamp(&approved_at, "approved_at")?,
    })
}

pub(crate) async fn fetch_approved_terms(
    conn: &mut SqliteConnection,
    id: &LoanApplicationId,
) -> Result<Option<ApprovedLoanTerms>, RepositoryError> {
    let row = sqlx::query(
        "SELECT loan_application_id, approved_amount, interest_rate, tenure_months, interest_type,
                processing_fee_percent, insurance_amount, stamp_duty, other_charges, approved_by,
                approved_at
         FROM approved_loan_terms WHERE loan_application_id = ?",
    )
    .bind(&id.0)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(row_to_approved_terms).transpose()
}

pub(crate) async fn upsert_approved_terms(
    conn: &mut SqliteConnection,
    approved: &ApprovedLoanTerms,
) -> Result<(), RepositoryError> {
    let terms = &approved.terms;
    sqlx::query(
        "INSERT INTO approved_loan_terms (loan_application_id, approved_amount, interest_rate,
                                          tenure_months, interest_type, processing_fee_percent,
                                          insurance_amount, stamp_duty, other_charges,
                                          approved_by, approved_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(loan_application_id) DO UPDATE SET
             approved_amount = excluded.approved_amount,
             interest_rate = excluded.interest_rate,
             tenure_months = excluded.tenure_months,
             interest_type = excluded.interest_type,
             processing_fee_percent = excluded.processing_fee_percent,
             insurance_amount = excluded.insurance_amount,
             stamp_duty = excluded.stamp_duty,
             other_charges = excluded.other_charges,
             approved_by = excluded.approved_by,
             approved_at = excluded.approved_at",
    )
    .bind(&approved.application_id.0)
    .bind(terms.approved_amount.to_string())
    .bind(terms.interest_rate.to_string())
    .bind(i64::from(terms.tenure_months))
    .bind(terms.interest_type.as_str())
    .bind(terms.processing_fee_percent.to_string())
    .bind(terms.insurance_amount.to_string())
    .bind(terms.stamp_duty.to_string())
    .bind(terms.other_charges.to_string())
    .bind(&approved.approved_by.0)
    .bind(encode_timestamp(&approved.approved_at))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub(crate) async fn upsert_emi_schedule(
    conn: &mut SqliteConnection,
    schedule: &EmiSchedule,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO emi_schedule (loan_application_id, interest_type, emi_amount, principal_emi,
                                   interest_emi, total_interest, total_payable, computed_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(loan_application_id) DO UPDATE SET
             interest_type = excluded.interest_type,
             emi_amount = excluded.emi_amount,
             principal_emi = excluded.principal_emi,
             interest_emi = excluded.interest_emi,
             total_interest = excluded.total_interest,
             total_payable = excluded.total_payable,
             computed_at = excluded.computed_at",
    )
    .bind(&schedule.application_id.0)
    .bind(schedule.interest_type.as_str())
    .bind(schedule.emi_amount.to_string())
    .bind(schedule.principal_emi.map(|value| value.to_string()))
    .bind(schedule.interest_emi.map(|value| value.to_string()))
    .bind(schedule.total_interest.to_string())
    .bind(schedule.total_payable.to_string())
    .bind(encode_timestamp(&schedule.computed_at))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub(crate) async fn upsert_charges(
    conn: &mut SqliteConnection,
    charges: &ChargesBreakdown,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO loan_charges (loan_application_id, processing_fee, processing_fee_gst,
                                   insurance_amount, stamp_duty, other_charges, total_charges,
                                   computed_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(loan_application_id) DO UPDATE SET
             processing_fee = excluded.processing_fee,
             processing_fee_gst = excluded.processing_fee_gst,
             insurance_amount = excluded.insurance_amount,
             stamp_duty = excluded.stamp_duty,
             other_charges = excluded.other_charges,
             total_charges = excluded.total_charges,
             computed_at = excluded.computed_at",
    )
    .bind(&charges.application_id.0)
    .bind(charges.processing_fee.to_string())
    .bind(charges.processing_fee_gst.to_string())
    .bind(charges.insurance_amount.to_string())
    .bind(charges.stamp_duty.to_string())
    .bind(charges.other_charges.to_string())
    .bind(charges.total_charges.to_string())
    .bind(encode_timestamp(&charges.computed_at))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub(crate) async fn upsert_disbursal_summary(
    conn: &mut SqliteConnection,
    summary: &DisbursalSummary,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO disbursal_summary (loan_application_id, approved_amount, total_charges,
                                        net_disbursal_amount, computed_at)
         VALUES (?, ?, ?, ?, ?)
         ON CONFLICT(loan_application_id) DO UPDATE SET
             approved_amount = excluded.approved_amount,
             total_charges = excluded.total_charges,
             net_disbursal_amount = excluded.net_disbursal_amount,
             computed_at = excluded.computed_at",
    )
    .bind(&summary.application_id.0)
    .bind(summary.approved_amount.to_string())
    .bind(summary.total_charges.to_string())
    .bind(summary.net_disbursal_amount.to_string())
    .bind(encode_timestamp(&summary.computed_at))
    .execute(&mut *conn)
    .await?;

    Ok(())
}
