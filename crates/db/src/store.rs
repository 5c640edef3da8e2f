//! SQLite implementation of the workflow storage boundary. One
//! [`SqlWorkflowTx`] wraps one database transaction; dropping it without
//! `commit` rolls back.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Sqlite, Transaction};

use lendflow_core::domain::application::{
    Assignment, LoanApplication, LoanApplicationId, ProductId, RecordStatus,
};
use lendflow_core::domain::approver::{Approver, ApproverId, ApproverStatus, Role};
use lendflow_core::domain::credit_rule::CreditAssignmentRule;
use lendflow_core::domain::log::LoanApplicationLog;
use lendflow_core::domain::terms::{
    ApprovedLoanTerms, ChargesBreakdown, DisbursalSummary, EmiSchedule,
};
use lendflow_core::store::{StoreError, WorkflowStore, WorkflowTx};

use crate::repositories::{application, approver, credit_rule, log, terms, RepositoryError};
use crate::DbPool;

#[derive(Clone)]
pub struct SqlWorkflowStore {
    pool: DbPool,
}

impl SqlWorkflowStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

pub struct SqlWorkflowTx {
    tx: Transaction<'static, Sqlite>,
}

#[async_trait]
impl WorkflowStore for SqlWorkflowStore {
    type Tx = SqlWorkflowTx;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        let tx = self.pool.begin().await.map_err(RepositoryError::from)?;
        Ok(SqlWorkflowTx { tx })
    }
}

#[async_trait]
impl WorkflowTx for SqlWorkflowTx {
    async fn load_application(
        &mut self,
        id: &LoanApplicationId,
    ) -> Result<Option<LoanApplication>, StoreError> {
        Ok(application::fetch_application(&mut self.tx, id, Some(RecordStatus::Active)).await?)
    }

    async fn find_approver(&mut self, id: &ApproverId) -> Result<Option<Approver>, StoreError> {
        Ok(approver::fetch_approver(&mut self.tx, id).await?)
    }

    async fn list_active_approvers(&mut self, role: &Role) -> Result<Vec<Approver>, StoreError> {
        Ok(approver::fetch_approvers_by_role(&mut self.tx, role, Some(ApproverStatus::Active))
            .await?)
    }

    async fn open_application_counts(
        &mut self,
        approver_ids: &[ApproverId],
    ) -> Result<HashMap<ApproverId, u32>, StoreError> {
        Ok(application::count_open_applications(&mut self.tx, approver_ids).await?)
    }

    async fn list_credit_rules(
        &mut self,
        product_id: &ProductId,
    ) -> Result<Vec<CreditAssignmentRule>, StoreError> {
        Ok(credit_rule::fetch_rules_for_product(&mut self.tx, product_id).await?)
    }

    async fn update_assignment(
        &mut self,
        id: &LoanApplicationId,
        assignment: &Assignment,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        Ok(application::write_assignment(&mut self.tx, id, assignment, updated_at).await?)
    }

    async fn append_log(&mut self, entry: &LoanApplicationLog) -> Result<(), StoreError> {
        Ok(log::insert_log(&mut self.tx, entry).await?)
    }

    async fn list_logs(
        &mut self,
        id: &LoanApplicationId,
    ) -> Result<Vec<LoanApplicationLog>, StoreError> {
        Ok(log::fetch_logs(&mut self.tx, id).await?)
    }

    async fn upsert_approved_terms(&mut self, approved: &ApprovedLoanTerms) -> Result<(), StoreError> {
        Ok(terms::upsert_approved_terms(&mut self.tx, approved).await?)
    }

    async fn upsert_emi_schedule(&mut self, schedule: &EmiSchedule) -> Result<(), StoreError> {
        Ok(terms::upsert_emi_schedule(&mut self.tx, schedule).await?)
    }

    async fn upsert_charges(&mut self, charges: &ChargesBreakdown) -> Result<(), StoreError> {
        Ok(terms::upsert_charges(&mut self.tx, charges).await?)
    }

    async fn upsert_disbursal_summary(
        &mut self,
        summary: &DisbursalSummary,
    ) -> Result<(), StoreError> {
        Ok(terms::upsert_disbursal_summary(&mut self.tx, summary).await?)
    }

    async fn load_approved_terms(
        &mut self,
        id: &LoanApplicationId,
    ) -> Result<Option<ApprovedLoanTerms>, StoreError> {
        Ok(terms::fetch_approved_terms(&mut self.tx, id).await?)
    }

    async fn mark_credit_approved(
        &mut self,
        id: &LoanApplicationId,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        Ok(application::write_credit_approved(&mut self.tx, id, updated_at).await?)
    }

    async fn record_crif_score(
        &mut self,
        id: &LoanApplicationId,
        score: i32,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        Ok(application::write_crif_score(&mut self.tx, id, score, updated_at).await?)
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(RepositoryError::from)?;
        Ok(())
    }
}
