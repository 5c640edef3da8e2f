use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use lendflow_core::domain::application::{
    Assignment, LoanApplication, LoanApplicationId, ProductId,
};
use lendflow_core::domain::approver::{Approver, ApproverId, Role};
use lendflow_core::domain::credit_rule::CreditAssignmentRule;
use lendflow_core::domain::log::LoanApplicationLog;
use lendflow_core::domain::terms::{
    ApprovedLoanTerms, ChargesBreakdown, DisbursalSummary, EmiSchedule,
};
use lendflow_core::store::{StoreError, WorkflowStore, WorkflowTx};

use super::{ApproverRepository, CreditRuleRepository, LoanApplicationRepository, RepositoryError};

#[derive(Clone, Debug, Default)]
struct WorkflowState {
    approvers: BTreeMap<String, Approver>,
    applications: BTreeMap<String, LoanApplication>,
    credit_rules: BTreeMap<String, CreditAssignmentRule>,
    logs: Vec<LoanApplicationLog>,
    approved_terms: HashMap<String, ApprovedLoanTerms>,
    emi_schedules: HashMap<String, EmiSchedule>,
    charges: HashMap<String, ChargesBreakdown>,
    disbursal_summaries: HashMap<String, DisbursalSummary>,
}

/// Process-local workflow store. Transactions are serialized: `begin` holds
/// the state lock until the transaction commits or is dropped, and writes go
/// to a working copy that only `commit` publishes.
#[derive(Clone, Default)]
pub struct InMemoryWorkflowStore {
    state: Arc<Mutex<WorkflowState>>,
}

pub struct InMemoryWorkflowTx {
    guard: OwnedMutexGuard<WorkflowState>,
    working: WorkflowState,
}

impl InMemoryWorkflowStore {
    pub async fn emi_schedule(&self, id: &LoanApplicationId) -> Option<EmiSchedule> {
        self.state.lock().await.emi_schedules.get(&id.0).cloned()
    }

    pub async fn charges(&self, id: &LoanApplicationId) -> Option<ChargesBreakdown> {
        self.state.lock().await.charges.get(&id.0).cloned()
    }

    pub async fn disbursal_summary(&self, id: &LoanApplicationId) -> Option<DisbursalSummary> {
        self.state.lock().await.disbursal_summaries.get(&id.0).cloned()
    }

    pub async fn log_count(&self) -> usize {
        self.state.lock().await.logs.len()
    }
}

#[async_trait]
impl WorkflowStore for InMemoryWorkflowStore {
    type Tx = InMemoryWorkflowTx;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(InMemoryWorkflowTx { guard, working })
    }
}

impl InMemoryWorkflowTx {
    fn application_mut(
        &mut self,
        id: &LoanApplicationId,
    ) -> Result<&mut LoanApplication, StoreError> {
        self.working
            .applications
            .get_mut(&id.0)
            .ok_or_else(|| RepositoryError::Missing(format!("loan application `{id}`")).into())
    }
}

#[async_trait]
impl WorkflowTx for InMemoryWorkflowTx {
    async fn load_application(
        &mut self,
        id: &LoanApplicationId,
    ) -> Result<Option<LoanApplication>, StoreError> {
        Ok(self.working.applications.get(&id.0).filter(|app| app.is_open()).cloned())
    }

    async fn find_approver(&mut self, id: &ApproverId) -> Result<Option<Approver>, StoreError> {
        Ok(self.working.approvers.get(&id.0).cloned())
    }

    async fn list_active_approvers(&mut self, role: &Role) -> Result<Vec<Approver>, StoreError> {
        Ok(self
            .working
            .approvers
            .values()
            .filter(|approver| &approver.role == role && approver.is_eligible())
            .cloned()
            .collect())
    }

    async fn open_application_counts(
        &mut self,
        approver_ids: &[ApproverId],
    ) -> Result<HashMap<ApproverId, u32>, StoreError> {
        let mut counts = HashMap::new();
        for application in self.working.applications.values().filter(|app| app.is_open()) {
            if let Some(approver_id) = &application.approver_id {
                if approver_ids.contains(approver_id) {
                    *counts.entry(approver_id.clone()).or_insert(0) += 1;
                }
            }
        }
        Ok(counts)
    }

    async fn list_credit_rules(
        &mut self,
        product_id: &ProductId,
    ) -> Result<Vec<CreditAssignmentRule>, StoreError> {
        let mut rules: Vec<CreditAssignmentRule> = self
            .working
            .credit_rules
            .values()
            .filter(|rule| &rule.product_id == product_id)
            .cloned()
            .collect();
        rules.sort_by(|a, b| a.min_score.cmp(&b.min_score).then_with(|| a.id.0.cmp(&b.id.0)));
        Ok(rules)
    }

    async fn update_assignment(
        &mut self,
        id: &LoanApplicationId,
        assignment: &Assignment,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let application = self.application_mut(id)?;
        application.approver_id = assignment.approver_id.clone();
        application.customer_status = assignment.customer_status;
        application.internal_status = assignment.internal_status;
        application.updated_at = updated_at;
        Ok(())
    }

    async fn append_log(&mut self, entry: &LoanApplicationLog) -> Result<(), StoreError> {
        self.working.logs.push(entry.clone());
        Ok(())
    }

    async fn list_logs(
        &mut self,
        id: &LoanApplicationId,
    ) -> Result<Vec<LoanApplicationLog>, StoreError> {
        let mut logs: Vec<LoanApplicationLog> = self
            .working
            .logs
            .iter()
            .filter(|entry| &entry.loan_application_id == id)
            .cloned()
            .collect();
        logs.sort_by_key(|entry| entry.occurred_at);
        Ok(logs)
    }

    async fn upsert_approved_terms(&mut self, terms: &ApprovedLoanTerms) -> Result<(), StoreError> {
        self.working.approved_terms.insert(terms.application_id.0.clone(), terms.clone());
        Ok(())
    }

    async fn upsert_emi_schedule(&mut self, schedule: &EmiSchedule) -> Result<(), StoreError> {
        self.working.emi_schedules.insert(schedule.application_id.0.clone(), schedule.clone());
        Ok(())
    }

    async fn upsert_charges(&mut self, charges: &ChargesBreakdown) -> Result<(), StoreError> {
        self.working.charges.insert(charges.application_id.0.clone(), charges.clone());
        Ok(())
    }

    async fn upsert_disbursal_summary(
        &mut self,
        summary: &DisbursalSummary,
    ) -> Result<(), StoreError> {
        self.working.disbursal_summaries.insert(summary.application_id.0.clone(), summary.clone());
        Ok(())
    }

    async fn load_approved_terms(
        &mut self,
        id: &LoanApplicationId,
    ) -> Result<Option<ApprovedLoanTerms>, StoreError> {
        Ok(self.working.approved_terms.get(&id.0).cloned())
    }

    async fn mark_credit_approved(
        &mut self,
        id: &LoanApplicationId,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let application = self.application_mut(id)?;
        application.credit_approved = true;
        application.updated_at = updated_at;
        Ok(())
    }

    async fn record_crif_score(
        &mut self,
        id: &LoanApplicationId,
        score: i32,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let application = self.application_mut(id)?;
        application.crif_score = Some(score);
        application.updated_at = updated_at;
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        let Self { mut guard, working } = self;
        *guard = working;
        Ok(())
    }
}

#[async_trait]
impl ApproverRepository for InMemoryWorkflowStore {
    async fn find_approver(&self, id: &ApproverId) -> Result<Option<Approver>, RepositoryError> {
        Ok(self.state.lock().await.approvers.get(&id.0).cloned())
    }

    async fn list_approvers_by_role(&self, role: &Role) -> Result<Vec<Approver>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state.approvers.values().filter(|approver| &approver.role == role).cloned().collect())
    }

    async fn save_approver(&self, approver: Approver) -> Result<(), RepositoryError> {
        self.state.lock().await.approvers.insert(approver.id.0.clone(), approver);
        Ok(())
    }
}

#[async_trait]
impl LoanApplicationRepository for InMemoryWorkflowStore {
    async fn find_application(
        &self,
        id: &LoanApplicationId,
    ) -> Result<Option<LoanApplication>, RepositoryError> {
        Ok(self.state.lock().await.applications.get(&id.0).cloned())
    }

    async fn save_application(&self, application: LoanApplication) -> Result<(), RepositoryError> {
        self.state.lock().await.applications.insert(application.id.0.clone(), application);
        Ok(())
    }
}

#[async_trait]
impl CreditRuleRepository for InMemoryWorkflowStore {
    async fn list_rules_for_product(
        &self,
        product_id: &ProductId,
    ) -> Result<Vec<CreditAssignmentRule>, RepositoryError> {
        let state = self.state.lock().await;
        let mut rules: Vec<CreditAssignmentRule> =
            state.credit_rules.values().filter(|rule| &rule.product_id == product_id).cloned().collect();
        rules.sort_by(|a, b| a.min_score.cmp(&b.min_score).then_with(|| a.id.0.cmp(&b.id.0)));
        Ok(rules)
    }

    async fn save_rule(&self, rule: CreditAssignmentRule) -> Result<(), RepositoryError> {
        self.state.lock().await.credit_rules.insert(rule.id.0.clone(), rule);
        Ok(())
    }
}
