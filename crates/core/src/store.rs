//! Storage boundary of the workflow engine.
//!
//! A workflow operation opens one transaction with [`WorkflowStore::begin`],
//! threads the handle through every read and write, and finishes with
//! [`WorkflowTx::commit`]. Dropping an uncommitted handle rolls everything back.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::application::{Assignment, LoanApplication, LoanApplicationId, ProductId};
use crate::domain::approver::{Approver, ApproverId, Role};
use crate::domain::credit_rule::CreditAssignmentRule;
use crate::domain::log::LoanApplicationLog;
use crate::domain::terms::{ApprovedLoanTerms, ChargesBreakdown, DisbursalSummary, EmiSchedule};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct StoreError {
    message: String,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[async_trait]
pub trait WorkflowStore: Send + Sync {
    type Tx: WorkflowTx;

    async fn begin(&self) -> Result<Self::Tx, StoreError>;
}

#[async_trait]
pub trait WorkflowTx: Send {
    /// Active (not soft-deleted) application by id.
    async fn load_application(
        &mut self,
        id: &LoanApplicationId,
    ) -> Result<Option<LoanApplication>, StoreError>;

    async fn find_approver(&mut self, id: &ApproverId) -> Result<Option<Approver>, StoreError>;

    async fn list_active_approvers(&mut self, role: &Role) -> Result<Vec<Approver>, StoreError>;

    /// Open application count per approver. Approvers without open
    /// applications may be absent from the map.
    async fn open_application_counts(
        &mut self,
        approver_ids: &[ApproverId],
    ) -> Result<HashMap<ApproverId, u32>, StoreError>;

    async fn list_credit_rules(
        &mut self,
        product_id: &ProductId,
    ) -> Result<Vec<CreditAssignmentRule>, StoreError>;

    async fn update_assignment(
        &mut self,
        id: &LoanApplicationId,
        assignment: &Assignment,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn append_log(&mut self, entry: &LoanApplicationLog) -> Result<(), StoreError>;

    /// Log rows in occurrence order, ties broken by insertion order.
    async fn list_logs(
        &mut self,
        id: &LoanApplicationId,
    ) -> Result<Vec<LoanApplicationLog>, StoreError>;

    async fn upsert_approved_terms(&mut self, terms: &ApprovedLoanTerms) -> Result<(), StoreError>;

    async fn upsert_emi_schedule(&mut self, schedule: &EmiSchedule) -> Result<(), StoreError>;

    async fn upsert_charges(&mut self, charges: &ChargesBreakdown) -> Result<(), StoreError>;

    async fn upsert_disbursal_summary(
        &mut self,
        summary: &DisbursalSummary,
    ) -> Result<(), StoreError>;

    async fn load_approved_terms(
        &mut self,
        id: &LoanApplicationId,
    ) -> Result<Option<ApprovedLoanTerms>, StoreError>;

    async fn mark_credit_approved(
        &mut self,
        id: &LoanApplicationId,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn record_crif_score(
        &mut self,
        id: &LoanApplicationId,
        score: i32,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn commit(self) -> Result<(), StoreError>;
}
