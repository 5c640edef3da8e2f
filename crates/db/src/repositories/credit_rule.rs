use sqlx::sqlite::SqliteRow;
use sqlx::SqliteConnection;

use lendflow_core::domain::application::ProductId;
use lendflow_core::domain::approver::Role;
use lendflow_core::domain::credit_rule::{CreditAssignmentRule, CreditRuleId};

use super::{column, decode_enum, CreditRuleRepository, RepositoryError};
use crate::DbPool;

pub struct SqlCreditRuleRepository {
    pool: DbPool,
}

impl SqlCreditRuleRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

pub(crate) fn row_to_rule(row: &SqliteRow) -> Result<CreditAssignmentRule, RepositoryError> {
    let id: String = column(row, "id")?;
    let product_id: String = column(row, "product_id")?;
    let min_score: i32 = column(row, "min_score")?;
    let max_score: i32 = column(row, "max_score")?;
    let role: String = column(row, "role")?;

    Ok(CreditAssignmentRule {
        id: CreditRuleId(id),
        product_id: ProductId(product_id),
        min_score,
        max_score,
        role: decode_enum(&role, "role", Role::parse)?,
    })
}

pub(crate) async fn fetch_rules_for_product(
    conn: &mut SqliteConnection,
    product_id: &ProductId,
) -> Result<Vec<CreditAssignmentRule>, RepositoryError> {
    let rows = sqlx::query(
        "SELECT id, product_id, min_score, max_score, role
         FROM credit_assignment_rule
         WHERE product_id = ?
         ORDER BY min_score, id",
    )
    .bind(&product_id.0)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(row_to_rule).collect()
}

pub(crate) async fn upsert_rule(
    conn: &mut SqliteConnection,
    rule: &CreditAssignmentRule,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO credit_assignment_rule (id, product_id, min_score, max_score, role)
         VALUES (?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
             product_id = excluded.product_id,
             min_score = excluded.min_score,
             max_score = excluded.max_score,
             role = excluded.role",
    )
    .bind(&rule.id.0)
    .bind(&rule.product_id.0)
    .bind(rule.min_score)
    .bind(rule.max_score)
    .bind(rule.role.as_str())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

#[async_trait::async_trait]
impl CreditRuleRepository for SqlCreditRuleRepository {
    async fn list_rules_for_product(
        &self,
        product_id: &ProductId,
    ) -> Result<Vec<CreditAssignmentRule>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        fetch_rules_for_product(&mut conn, product_id).await
    }

    async fn save_rule(&self, rule: CreditAssignmentRule) -> Result<(), RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        upsert_rule(&mut conn, &rule).await
    }
}

#[cfg(test)]
mod tests {
    use lendflow_core::domain::application::ProductId;
    use lendflow_core::domain::approver::Role;
    use lendflow_core::domain::credit_rule::{CreditAssignmentRule, CreditRuleId};

    use super::SqlCreditRuleRepository;
    use crate::repositories::CreditRuleRepository;
    use crate::{connect_with_settings, migrations::run_pending};

    fn rule(id: &str, product: &str, min: i32, max: i32, role: &str) -> CreditAssignmentRule {
        CreditAssignmentRule {
            id: CreditRuleId(id.to_owned()),
            product_id: ProductId(product.to_owned()),
            min_score: min,
            max_score: max,
            role: Role::Credit(role.to_owned()),
        }
    }

    #[tokio::test]
    async fn rules_list_per_product_in_band_order() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("migrations");
        let repo = SqlCreditRuleRepository::new(pool);

        repo.save_rule(rule("pl-high", "PL", 601, 750, "CreditSenior")).await.expect("save");
        repo.save_rule(rule("pl-low", "PL", 0, 600, "CreditJunior")).await.expect("save");
        repo.save_rule(rule("hl-all", "HL", 0, 900, "Credit_1")).await.expect("save");

        let rules = repo.list_rules_for_product(&ProductId("PL".into())).await.expect("list");
        let ids: Vec<&str> = rules.iter().map(|r| r.id.0.as_str()).collect();
        assert_eq!(ids, vec!["pl-low", "pl-high"]);
        assert_eq!(rules[1].role, Role::Credit("CreditSenior".into()));
    }

    #[tokio::test]
    async fn inverted_bands_are_refused_by_the_schema() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("migrations");
        let repo = SqlCreditRuleRepository::new(pool);

        let result = repo.save_rule(rule("bad", "PL", 700, 600, "Credit_1")).await;
        assert!(result.is_err());
    }
}
