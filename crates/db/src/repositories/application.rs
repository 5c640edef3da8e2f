use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use lendflow_core::domain::application::{
    Assignment, CustomerId, CustomerStatus, InternalStatus, LoanApplication, LoanApplicationId,
    ProductId, RecordStatus, VkycStatus,
};
use lendflow_core::domain::approver::ApproverId;

use super::{
    column, decode_decimal, decode_enum, decode_months, decode_timestamp, encode_timestamp,
    LoanApplicationRepository, RepositoryError,
};
use crate::DbPool;

const APPLICATION_COLUMNS: &str = "id, product_id, customer_id, loan_amount, tenure_months, \
     crif_score, approver_id, customer_status, internal_status, credit_approved, vkyc_status, \
     record_status, created_at, updated_at";

pub struct SqlLoanApplicationRepository {
    pool: DbPool,
}

impl SqlLoanApplicationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

pub(crate) fn row_to_application(row: &SqliteRow) -> Result<LoanApplication, RepositoryError> {
    let id: String = column(row, "id")?;
    let product_id: String = column(row, "product_id")?;
    let customer_id: String = column(row, "customer_id")?;
    let loan_amount: String = column(row, "loan_amount")?;
    let tenure_months: i64 = column(row, "tenure_months")?;
    let crif_score: Option<i32> = column(row, "crif_score")?;
    let approver_id: Option<String> = column(row, "approver_id")?;
    let customer_status: String = column(row, "customer_status")?;
    let internal_status: String = column(row, "internal_status")?;
    let credit_approved: bool = column(row, "credit_approved")?;
    let vkyc_status: String = column(row, "vkyc_status")?;
    let record_status: String = column(row, "record_status")?;
    let created_at: String = column(row, "created_at")?;
    let updated_at: String = column(row, "updated_at")?;

    Ok(LoanApplication {
        id: LoanApplicationId(id),
        product_id: ProductId(product_id),
        customer_id: CustomerId(customer_id),
        loan_amount: decode_decimal(&loan_amount, "loan_amount")?,
        tenure_months: decode_months(tenure_months, "tenure_months")?,
        crif_score,
        approver_id: approver_id.map(ApproverId),
        customer_status: decode_enum(&customer_status, "customer_status", CustomerStatus::parse)?,
        internal_status: decode_enum(&internal_status, "internal_status", InternalStatus::parse)?,
        credit_approved,
        vkyc_status: decode_enum(&vkyc_status, "vkyc_status", VkycStatus::parse)?,
        record_status: decode_enum(&record_status, "record_status", RecordStatus::parse)?,
        created_at: decode_timestamp(&created_at, "created_at")?,
        updated_at: decode_timestamp(&updated_at, "updated_at")?,
    })
}

pub(crate) async fn fetch_application(
    conn: &mut SqliteConnection,
    id: &LoanApplicationId,
    record_status: Option<RecordStatus>,
) -> Result<Option<LoanApplication>, RepositoryError> {
    let row = match record_status {
        Some(status) => {
            sqlx::query(&format!(
                "SELECT {APPLICATION_COLUMNS} FROM loan_application WHERE id = ? AND record_status = ?"
            ))
            .bind(&id.0)
            .bind(status.as_str())
            .fetch_optional(&mut *conn)
            .await?
        }
        None => {
            sqlx::query(&format!("SELECT {APPLICATION_COLUMNS} FROM loan_application WHERE id = ?"))
                .bind(&id.0)
                .fetch_optional(&mut *conn)
                .await?
        }
    };

    row.as_ref().map(row_to_application).transpose()
}

pub(crate) async fn upsert_application(
    conn: &mut SqliteConnection,
    application: &LoanApplication,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO loan_application (id, product_id, customer_id, loan_amount, tenure_months,
                                       crif_score, approver_id, customer_status, internal_status,
                                       credit_approved, vkyc_status, record_status, created_at,
                                       updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
             product_id = excluded.product_id,
             customer_id = excluded.customer_id,
             loan_amount = excluded.loan_amount,
             tenure_months = excluded.tenure_months,
             crif_score = excluded.crif_score,
             approver_id = excluded.approver_id,
             customer_status = excluded.customer_status,
             internal_status = excluded.internal_status,
             credit_approved = excluded.credit_approved,
             vkyc_status = excluded.vkyc_status,
             record_status = excluded.record_status,
             updated_at = excluded.updated_at",
    )
    .bind(&application.id.0)
    .bind(&application.product_id.0)
    .bind(&application.customer_id.0)
    .bind(application.loan_amount.to_string())
    .bind(i64::from(application.tenure_months))
    .bind(application.crif_score)
    .bind(application.approver_id.as_ref().map(|id| id.0.as_str()))
    .bind(application.customer_status.as_str())
    .bind(application.internal_status.as_str())
    .bind(application.credit_approved)
    .bind(application.vkyc_status.as_str())
    .bind(application.record_status.as_str())
    .bind(encode_timestamp(&application.created_at))
    .bind(encode_timestamp(&application.updated_at))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub(crate) async fn write_assignment(
    conn: &mut SqliteConnection,
    id: &LoanApplicationId,
    assignment: &Assignment,
    updated_at: DateTime<Utc>,
) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        "UPDATE loan_application
         SET approver_id = ?, customer_status = ?, internal_status = ?, updated_at = ?
         WHERE id = ?",
    )
    .bind(assignment.approver_id.as_ref().map(|id| id.0.as_str()))
    .bind(assignment.customer_status.as_str())
    .bind(assignment.internal_status.as_str())
    .bind(encode_timestamp(&updated_at))
    .bind(&id.0)
    .execute(&mut *conn)
    .await?;

    expect_one_row(result.rows_affected(), id)
}

pub(crate) async fn write_credit_approved(
    conn: &mut SqliteConnection,
    id: &LoanApplicationId,
    updated_at: DateTime<Utc>,
) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        "UPDATE loan_application SET credit_approved = 1, updated_at = ? WHERE id = ?",
    )
    .bind(encode_timestamp(&updated_at))
    .bind(&id.0)
    .execute(&mut *conn)
    .await?;

    expect_one_row(result.rows_affected(), id)
}

pub(crate) async fn write_crif_score(
    conn: &mut SqliteConnection,
    id: &LoanApplicationId,
    score: i32,
    updated_at: DateTime<Utc>,
) -> Result<(), RepositoryError> {
    let result =
        sqlx::query("UPDATE loan_application SET crif_score = ?, updated_at = ? WHERE id = ?")
            .bind(score)
            .bind(encode_timestamp(&updated_at))
            .bind(&id.0)
            .execute(&mut *conn)
            .await?;

    expect_one_row(result.rows_affected(), id)
}

/// Counts active applications currently held by each of `approver_ids`.
pub(crate) async fn count_open_applications(
    conn: &mut SqliteConnection,
    approver_ids: &[ApproverId],
) -> Result<HashMap<ApproverId, u32>, RepositoryError> {
    if approver_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let mut builder = QueryBuilder::<Sqlite>::new(
        "SELECT approver_id, COUNT(*) AS open_count FROM loan_application
         WHERE record_status = 'ACTIVE' AND approver_id IN (",
    );
    let mut ids = builder.separated(", ");
    for id in approver_ids {
        ids.push_bind(id.0.clone());
    }
    ids.push_unseparated(") GROUP BY approver_id");

    let rows = builder.build().fetch_all(&mut *conn).await?;

    let mut counts = HashMap::with_capacity(rows.len());
    for row in &rows {
        let approver_id: String = column(row, "approver_id")?;
        let open_count: i64 = column(row, "open_count")?;
        let open_count = u32::try_from(open_count)
            .map_err(|_| RepositoryError::Decode(format!("open_count: out of range {open_count}")))?;
        counts.insert(ApproverId(approver_id), open_count);
    }
    Ok(counts)
}

fn expect_one_row(rows_affected: u64, id: &LoanApplicationId) -> Result<(), RepositoryError> {
    if rows_affected == 1 {
        Ok(())
    } else {
        Err(RepositoryError::Missing(format!("loan application `{id}`")))
    }
}

#[async_trait::async_trait]
impl LoanApplicationRepository for SqlLoanApplicationRepository {
    async fn find_application(
        &self,
        id: &LoanApplicationId,
    ) -> Result<Option<LoanApplication>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        fetch_application(&mut conn, id, None).await
    }

    async fn save_application(&self, application: LoanApplication) -> Result<(), RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        upsert_application(&mut conn, &application).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use lendflow_core::domain::application::{
        CustomerId, LoanApplication, LoanApplicationId, ProductId, RecordStatus,
    };
    use lendflow_core::domain::approver::{Approver, ApproverId, ApproverStatus, Role};

    use super::{count_open_applications, fetch_application, SqlLoanApplicationRepository};
    use crate::repositories::{ApproverRepository, LoanApplicationRepository, SqlApproverRepository};
    use crate::{connect_with_settings, migrations::run_pending};

    fn application(id: &str, approver: Option<&str>) -> LoanApplication {
        let mut application = LoanApplication::submitted(
            LoanApplicationId(id.to_owned()),
            ProductId("PL-STD".to_owned()),
            CustomerId(format!("cust-{id}")),
            Decimal::new(50_000_000, 2),
            36,
        );
        application.approver_id = approver.map(|id| ApproverId(id.to_owned()));
        application
    }

    #[tokio::test]
    async fn application_round_trips_decimal_and_optional_columns() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("migrations");
        let repo = SqlLoanApplicationRepository::new(pool);

        let mut saved = application("LA-1", None);
        saved.crif_score = Some(712);
        repo.save_application(saved.clone()).await.expect("save");

        let loaded = repo
            .find_application(&LoanApplicationId("LA-1".into()))
            .await
            .expect("find")
            .expect("LA-1 exists");
        assert_eq!(loaded.loan_amount, Decimal::new(50_000_000, 2));
        assert_eq!(loaded.tenure_months, 36);
        assert_eq!(loaded.crif_score, Some(712));
        assert_eq!(loaded.approver_id, None);
        assert_eq!(loaded.internal_status, saved.internal_status);
    }

    #[tokio::test]
    async fn open_counts_skip_deleted_applications() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("migrations");
        let approvers = SqlApproverRepository::new(pool.clone());
        let repo = SqlLoanApplicationRepository::new(pool.clone());

        for id in ["ops-a", "ops-b"] {
            approvers
                .save_approver(Approver {
                    id: ApproverId(id.to_owned()),
                    name: id.to_owned(),
                    role: Role::Ops,
                    status: ApproverStatus::Active,
                    created_at: Utc::now(),
                })
                .await
                .expect("save approver");
        }

        repo.save_application(application("LA-1", Some("ops-a"))).await.expect("save");
        repo.save_application(application("LA-2", Some("ops-a"))).await.expect("save");
        let mut deleted = application("LA-3", Some("ops-b"));
        deleted.record_status = RecordStatus::Deleted;
        repo.save_application(deleted).await.expect("save");

        let mut conn = pool.acquire().await.expect("acquire");
        let counts = count_open_applications(
            &mut conn,
            &[ApproverId("ops-a".into()), ApproverId("ops-b".into())],
        )
        .await
        .expect("counts");

        assert_eq!(counts.get(&ApproverId("ops-a".into())), Some(&2));
        assert_eq!(counts.get(&ApproverId("ops-b".into())), None);

        let hidden = fetch_application(
            &mut conn,
            &LoanApplicationId("LA-3".into()),
            Some(RecordStatus::Active),
        )
        .await
        .expect("fetch");
        assert!(hidden.is_none());
    }
}
