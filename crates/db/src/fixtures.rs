use chrono::Utc;
use rust_decimal::Decimal;

use lendflow_core::domain::application::{
    CustomerId, CustomerStatus, InternalStatus, LoanApplication, LoanApplicationId, ProductId,
};
use lendflow_core::domain::approver::{Approver, ApproverId, ApproverStatus, Role};
use lendflow_core::domain::credit_rule::{CreditAssignmentRule, CreditRuleId};

use crate::repositories::{
    application::upsert_application, approver::upsert_approver, credit_rule::upsert_rule,
    ApproverRepository, CreditRuleRepository, LoanApplicationRepository, RepositoryError,
};
use crate::DbPool;

pub const DEMO_PRODUCT_ID: &str = "PL-STD";

const SEED_APPROVER_IDS: &[&str] =
    &["ops-1", "ops-2", "ops-3", "sops-1", "cj-1", "cs-1", "sc-1", "fin-1", "dis-1"];
const SEED_RULE_IDS: &[&str] = &["rule-pl-junior", "rule-pl-senior"];
const SEED_APPLICATION_IDS: &[&str] = &["LA-DEMO-001", "LA-DEMO-002", "LA-DEMO-003"];

/// Small staffed pipeline for local runs and tests: one approver per role
/// (three in Ops), two score bands for the demo product, and three
/// applications at different stages. Loading is idempotent and resets the
/// demo applications to their seeded stage.
pub struct DemoDataset;

impl DemoDataset {
    pub fn approvers() -> Vec<Approver> {
        let created_at = Utc::now();
        let approver = |id: &str, name: &str, role: Role| Approver {
            id: ApproverId(id.to_owned()),
            name: name.to_owned(),
            role,
            status: ApproverStatus::Active,
            created_at,
        };

        vec![
            approver("ops-1", "Asha Rao", Role::Ops),
            approver("ops-2", "Vikram Shah", Role::Ops),
            approver("ops-3", "Meera Iyer", Role::Ops),
            approver("sops-1", "Rahul Menon", Role::SeniorOps),
            approver("cj-1", "Kiran Das", Role::Credit("CreditJunior".to_owned())),
            approver("cs-1", "Nisha Kapoor", Role::Credit("CreditSenior".to_owned())),
            approver("sc-1", "Arjun Pillai", Role::SeniorCredit),
            approver("fin-1", "Divya Nair", Role::Finance),
            approver("dis-1", "Sanjay Gupta", Role::Disbursal),
        ]
    }

    pub fn credit_rules() -> Vec<CreditAssignmentRule> {
        let rule = |id: &str, min_score: i32, max_score: i32, role: &str| CreditAssignmentRule {
            id: CreditRuleId(id.to_owned()),
            product_id: ProductId(DEMO_PRODUCT_ID.to_owned()),
            min_score,
            max_score,
            role: Role::Credit(role.to_owned()),
        };

        vec![
            rule("rule-pl-junior", 0, 600, "CreditJunior"),
            rule("rule-pl-senior", 601, 750, "CreditSenior"),
        ]
    }

    pub fn applications() -> Vec<LoanApplication> {
        let application = |id: &str, customer: &str, amount: i64, tenure: u32| {
            LoanApplication::submitted(
                LoanApplicationId(id.to_owned()),
                ProductId(DEMO_PRODUCT_ID.to_owned()),
                CustomerId(customer.to_owned()),
                Decimal::new(amount, 0),
                tenure,
            )
        };

        let mut scored = application("LA-DEMO-001", "CUST-1001", 500_000, 36);
        scored.crif_score = Some(650);

        let unscored = application("LA-DEMO-002", "CUST-1002", 150_000, 12);

        let mut in_credit = application("LA-DEMO-003", "CUST-1003", 800_000, 48);
        in_credit.crif_score = Some(720);
        in_credit.approver_id = Some(ApproverId("cs-1".to_owned()));
        in_credit.customer_status = CustomerStatus::UnderReview;
        in_credit.internal_status = InternalStatus::CreditPending;

        vec![scored, unscored, in_credit]
    }

    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let approvers = Self::approvers();
        let rules = Self::credit_rules();
        let applications = Self::applications();

        let mut tx = pool.begin().await?;
        for approver in &approvers {
            upsert_approver(&mut tx, approver).await?;
        }
        for rule in &rules {
            upsert_rule(&mut tx, rule).await?;
        }
        for application in &applications {
            upsert_application(&mut tx, application).await?;
        }
        tx.commit().await?;

        tracing::info!(
            event_name = "db.fixtures.loaded",
            approvers = approvers.len(),
            credit_rules = rules.len(),
            applications = applications.len(),
            "demo dataset loaded"
        );

        Ok(SeedResult::from_parts(&approvers, &rules, &applications))
    }

    /// Seeds any repository backend, typically the in-memory store in tests.
    pub async fn seed<R>(repository: &R) -> Result<SeedResult, RepositoryError>
    where
        R: ApproverRepository + CreditRuleRepository + LoanApplicationRepository,
    {
        let approvers = Self::approvers();
        let rules = Self::credit_rules();
        let applications = Self::applications();

        for approver in &approvers {
            repository.save_approver(approver.clone()).await?;
        }
        for rule in &rules {
            repository.save_rule(rule.clone()).await?;
        }
        for application in &applications {
            repository.save_application(application.clone()).await?;
        }

        Ok(SeedResult::from_parts(&approvers, &rules, &applications))
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for approver in Self::approvers() {
            let present: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM approver WHERE id = ?1 AND role = ?2 AND status = 'ACTIVE')",
            )
            .bind(&approver.id.0)
            .bind(approver.role.as_str())
            .fetch_one(pool)
            .await?;
            checks.push((approver.id.0, present == 1));
        }

        for rule in Self::credit_rules() {
            let present: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM credit_assignment_rule
                 WHERE id = ?1 AND min_score = ?2 AND max_score = ?3 AND role = ?4)",
            )
            .bind(&rule.id.0)
            .bind(rule.min_score)
            .bind(rule.max_score)
            .bind(rule.role.as_str())
            .fetch_one(pool)
            .await?;
            checks.push((rule.id.0, present == 1));
        }

        for application in Self::applications() {
            let present: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM loan_application
                 WHERE id = ?1 AND product_id = ?2 AND record_status = 'ACTIVE')",
            )
            .bind(&application.id.0)
            .bind(&application.product_id.0)
            .fetch_one(pool)
            .await?;
            checks.push((application.id.0, present == 1));
        }

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }

    /// Removes the demo rows together with any workflow output recorded
    /// against the demo applications.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let applications = sql_array_from_ids(SEED_APPLICATION_IDS);
        let rules = sql_array_from_ids(SEED_RULE_IDS);
        let approvers = sql_array_from_ids(SEED_APPROVER_IDS);

        let mut tx = pool.begin().await?;
        for table in [
            "disbursal_summary",
            "loan_charges",
            "emi_schedule",
            "approved_loan_terms",
            "loan_application_log",
        ] {
            sqlx::query(&format!("DELETE FROM {table} WHERE loan_application_id IN {applications}"))
                .execute(&mut *tx)
                .await?;
        }
        sqlx::query(&format!("DELETE FROM loan_application WHERE id IN {applications}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM credit_assignment_rule WHERE id IN {rules}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM approver WHERE id IN {approvers}"))
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(())
    }
}

fn sql_array_from_ids(ids: &[&str]) -> String {
    let quoted: Vec<String> = ids.iter().map(|id| format!("'{id}'")).collect();
    format!("({})", quoted.join(", "))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeedResult {
    pub approvers: usize,
    pub credit_rules: usize,
    pub applications: Vec<String>,
}

impl SeedResult {
    fn from_parts(
        approvers: &[Approver],
        rules: &[CreditAssignmentRule],
        applications: &[LoanApplication],
    ) -> Self {
        Self {
            approvers: approvers.len(),
            credit_rules: rules.len(),
            applications: applications.iter().map(|app| app.id.0.clone()).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(String, bool)>,
}
