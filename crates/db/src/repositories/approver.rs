use sqlx::sqlite::SqliteRow;
use sqlx::SqliteConnection;

use lendflow_core::domain::approver::{Approver, ApproverId, ApproverStatus, Role};

use super::{column, decode_enum, decode_timestamp, encode_timestamp, ApproverRepository, RepositoryError};
use crate::DbPool;

const APPROVER_COLUMNS: &str = "id, name, role, status, created_at";

pub struct SqlApproverRepository {
    pool: DbPool,
}

impl SqlApproverRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

pub(crate) fn row_to_approver(row: &SqliteRow) -> Result<Approver, RepositoryError> {
    let id: String = column(row, "id")?;
    let name: String = column(row, "name")?;
    let role: String = column(row, "role")?;
    let status: String = column(row, "status")?;
    let created_at: String = column(row, "created_at")?;

    Ok(Approver {
        id: ApproverId(id),
        name,
        role: decode_enum(&role, "role", Role::parse)?,
        status: decode_enum(&status, "status", ApproverStatus::parse)?,
        created_at: decode_timestamp(&created_at, "created_at")?,
    })
}

pub(crate) async fn fetch_approver(
    conn: &mut SqliteConnection,
    id: &ApproverId,
) -> Result<Option<Approver>, RepositoryError> {
    let row = sqlx::query(&format!("SELECT {APPROVER_COLUMNS} FROM approver WHERE id = ?"))
        .bind(&id.0)
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(row_to_approver).transpose()
}

pub(crate) async fn fetch_approvers_by_role(
    conn: &mut SqliteConnection,
    role: &Role,
    status: Option<ApproverStatus>,
) -> Result<Vec<Approver>, RepositoryError> {
    let rows = match status {
        Some(status) => {
            sqlx::query(&format!(
                "SELECT {APPROVER_COLUMNS} FROM approver WHERE role = ? AND status = ? ORDER BY id"
            ))
            .bind(role.as_str())
            .bind(status.as_str())
            .fetch_all(&mut *conn)
            .await?
        }
        None => {
            sqlx::query(&format!("SELECT {APPROVER_COLUMNS} FROM approver WHERE role = ? ORDER BY id"))
                .bind(role.as_str())
                .fetch_all(&mut *conn)
                .await?
        }
    };

    rows.iter().map(row_to_approver).collect()
}

pub(crate) async fn upsert_approver(
    conn: &mut SqliteConnection,
    approver: &Approver,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO approver (id, name, role, status, created_at)
         VALUES (?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
             name = excluded.name,
             role = excluded.role,
             status = excluded.status",
    )
    .bind(&approver.id.0)
    .bind(&approver.name)
    .bind(approver.role.as_str())
    .bind(approver.status.as_str())
    .bind(encode_timestamp(&approver.created_at))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

#[async_trait::async_trait]
impl ApproverRepository for SqlApproverRepository {
    async fn find_approver(&self, id: &ApproverId) -> Result<Option<Approver>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        fetch_approver(&mut conn, id).await
    }

    async fn list_approvers_by_role(&self, role: &Role) -> Result<Vec<Approver>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        fetch_approvers_by_role(&mut conn, role, None).await
    }

    async fn save_approver(&self, approver: Approver) -> Result<(), RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        upsert_approver(&mut conn, &approver).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use lendflow_core::domain::approver::{Approver, ApproverId, ApproverStatus, Role};

    use super::SqlApproverRepository;
    use crate::repositories::ApproverRepository;
    use crate::{connect_with_settings, migrations::run_pending};

    fn approver(id: &str, role: Role, status: ApproverStatus) -> Approver {
        Approver {
            id: ApproverId(id.to_owned()),
            name: format!("Approver {id}"),
            role,
            status,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn approvers_round_trip_and_list_by_role() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("migrations");
        let repo = SqlApproverRepository::new(pool);

        repo.save_approver(approver("cr-2", Role::Credit("Credit_1".into()), ApproverStatus::Active))
            .await
            .expect("save cr-2");
        repo.save_approver(approver("cr-1", Role::Credit("Credit_1".into()), ApproverStatus::Suspended))
            .await
            .expect("save cr-1");
        repo.save_approver(approver("ops-1", Role::Ops, ApproverStatus::Active))
            .await
            .expect("save ops-1");

        let found = repo
            .find_approver(&ApproverId("cr-1".into()))
            .await
            .expect("find")
            .expect("cr-1 exists");
        assert_eq!(found.role, Role::Credit("Credit_1".into()));
        assert_eq!(found.status, ApproverStatus::Suspended);

        let credit = repo.list_approvers_by_role(&Role::Credit("Credit_1".into())).await.expect("list");
        let ids: Vec<&str> = credit.iter().map(|a| a.id.0.as_str()).collect();
        assert_eq!(ids, vec!["cr-1", "cr-2"]);

        assert!(repo.find_approver(&ApproverId("missing".into())).await.expect("find").is_none());
    }

    #[tokio::test]
    async fn saving_again_updates_status_in_place() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("migrations");
        let repo = SqlApproverRepository::new(pool);

        let mut ops = approver("ops-1", Role::Ops, ApproverStatus::Active);
        repo.save_approver(ops.clone()).await.expect("save");
        ops.status = ApproverStatus::Deleted;
        repo.save_approver(ops).await.expect("update");

        let listed = repo.list_approvers_by_role(&Role::Ops).await.expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].status, ApproverStatus::Deleted);
    }
}
