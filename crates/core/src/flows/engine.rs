use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::approvals::ApproverSelector;
use crate::audit::{
    AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, TracingAuditSink,
};
use crate::calculator::{calculate_charges, calculate_emi, parse_terms, EmiInput, RawLoanTerms};
use crate::domain::application::{
    Assignment, CustomerStatus, InternalStatus, LoanApplication, LoanApplicationId,
};
use crate::domain::approver::{ApproverId, ApproverLoad, Role};
use crate::domain::log::{LoanApplicationLog, LogAction, LogEntryId};
use crate::domain::terms::{ApprovedLoanTerms, ChargesBreakdown, DisbursalSummary, EmiSchedule};
use crate::errors::WorkflowError;
use crate::flows::states::{
    Actor, FinalizationOutcome, TargetStage, TransitionKind, TransitionOutcome, TransitionRequest,
};
use crate::flows::table::{TransitionRule, TransitionTable, WorkflowPolicy};
use crate::store::{WorkflowStore, WorkflowTx};

pub const MAX_BUREAU_SCORE: i32 = 900;
const DEFAULT_APPROVAL_REMARKS: &str = "loan approved";

/// Drives loan applications through the approval chain. Every operation is
/// one store transaction bounded by the policy's timeout.
pub struct LoanWorkflow<S> {
    store: S,
    selector: ApproverSelector,
    table: TransitionTable,
    policy: WorkflowPolicy,
    audit: Arc<dyn AuditSink>,
}

impl<S> LoanWorkflow<S>
where
    S: WorkflowStore,
{
    pub fn new(store: S, policy: WorkflowPolicy) -> Self {
        Self {
            store,
            selector: ApproverSelector::new(),
            table: TransitionTable::new(&policy),
            policy,
            audit: Arc::new(TracingAuditSink),
        }
    }

    pub fn with_selector(mut self, selector: ApproverSelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn policy(&self) -> &WorkflowPolicy {
        &self.policy
    }

    pub async fn process_transition(
        &self,
        request: TransitionRequest,
    ) -> Result<TransitionOutcome, WorkflowError> {
        let context = AuditContext::new(
            Some(request.application_id.clone()),
            request.correlation_id.clone(),
            request.actor.approver_id.0.clone(),
        );
        let result = self.run_transition(&request).await;

        match &result {
            Ok(outcome) => {
                tracing::info!(
                    event_name = "workflow.transition.applied",
                    correlation_id = %request.correlation_id,
                    application_id = %request.application_id,
                    action = outcome.action.as_str(),
                    from_status = outcome.from_status.as_str(),
                    to_status = outcome.to_status.as_str(),
                    assigned_to = outcome.assigned_to.as_ref().map(|id| id.0.as_str()),
                    "transition applied"
                );
                self.audit.emit(
                    AuditEvent::new(
                        &context,
                        "workflow.transition.applied",
                        AuditCategory::Transition,
                        AuditOutcome::Success,
                    )
                    .with_metadata("transition", request.target.kind().as_str())
                    .with_metadata("from", outcome.from_status.as_str())
                    .with_metadata("to", outcome.to_status.as_str()),
                );
            }
            Err(error) => {
                tracing::warn!(
                    event_name = "workflow.transition.refused",
                    correlation_id = %request.correlation_id,
                    application_id = %request.application_id,
                    transition = request.target.kind().as_str(),
                    error_code = error.code(),
                    error = %error,
                    "transition refused"
                );
                self.audit.emit(
                    AuditEvent::new(
                        &context,
                        "workflow.transition.refused",
                        AuditCategory::Transition,
                        refusal_outcome(error),
                    )
                    .with_metadata("transition", request.target.kind().as_str())
                    .with_metadata("error", error.to_string()),
                );
            }
        }
        result
    }

    /// Fixes approved terms, derives EMI and charges, and flags the
    /// application as credit approved. Re-running overwrites the snapshot.
    pub async fn approve_loan(
        &self,
        application_id: &LoanApplicationId,
        actor: &Actor,
        raw_terms: &RawLoanTerms,
        remarks: Option<&str>,
        correlation_id: &str,
    ) -> Result<FinalizationOutcome, WorkflowError> {
        let context = AuditContext::new(
            Some(application_id.clone()),
            correlation_id,
            actor.approver_id.0.clone(),
        );
        let result = self.run_approval(application_id, actor, raw_terms, remarks).await;

        match &result {
            Ok(outcome) => {
                tracing::info!(
                    event_name = "workflow.finalization.applied",
                    correlation_id,
                    application_id = %application_id,
                    emi_amount = %outcome.emi.emi_amount,
                    net_disbursal_amount = %outcome.charges.net_disbursal_amount,
                    "loan finalized"
                );
                self.audit.emit(
                    AuditEvent::new(
                        &context,
                        "workflow.finalization.applied",
                        AuditCategory::Finalization,
                        AuditOutcome::Success,
                    )
                    .with_metadata("emi_amount", outcome.emi.emi_amount.to_string())
                    .with_metadata("total_charges", outcome.charges.total_charges.to_string()),
                );
            }
            Err(error) => {
                tracing::warn!(
                    event_name = "workflow.finalization.refused",
                    correlation_id,
                    application_id = %application_id,
                    error_code = error.code(),
                    error = %error,
                    "finalization refused"
                );
                self.audit.emit(
                    AuditEvent::new(
                        &context,
                        "workflow.finalization.refused",
                        AuditCategory::Finalization,
                        refusal_outcome(error),
                    )
                    .with_metadata("error", error.to_string()),
                );
            }
        }
        result
    }

    /// Attaches the credit bureau score the Credit transition relies on.
    pub async fn record_bureau_score(
        &self,
        application_id: &LoanApplicationId,
        score: i32,
        correlation_id: &str,
    ) -> Result<(), WorkflowError> {
        if !(0..=MAX_BUREAU_SCORE).contains(&score) {
            return Err(WorkflowError::validation(
                format!("bureau score {score} is outside 0..={MAX_BUREAU_SCORE}"),
                vec!["crif_score".to_owned()],
            ));
        }

        self.within_timeout(async {
            let mut tx = self.store.begin().await?;
            load_open_application(&mut tx, application_id).await?;
            tx.record_crif_score(application_id, score, Utc::now()).await?;
            tx.commit().await?;
            Ok(())
        })
        .await?;

        self.audit.emit(
            AuditEvent::new(
                &AuditContext::new(Some(application_id.clone()), correlation_id, "bureau"),
                "workflow.bureau_score.recorded",
                AuditCategory::Bureau,
                AuditOutcome::Success,
            )
            .with_metadata("score", score.to_string()),
        );
        tracing::info!(
            event_name = "workflow.bureau_score.recorded",
            correlation_id,
            application_id = %application_id,
            score,
            "bureau score recorded"
        );
        Ok(())
    }

    pub async fn history(
        &self,
        application_id: &LoanApplicationId,
    ) -> Result<Vec<LoanApplicationLog>, WorkflowError> {
        self.within_timeout(async {
            let mut tx = self.store.begin().await?;
            load_open_application(&mut tx, application_id).await?;
            let logs = tx.list_logs(application_id).await?;
            tx.commit().await?;
            Ok(logs)
        })
        .await
    }

    pub async fn application(
        &self,
        application_id: &LoanApplicationId,
    ) -> Result<LoanApplication, WorkflowError> {
        self.within_timeout(async {
            let mut tx = self.store.begin().await?;
            let application = load_open_application(&mut tx, application_id).await?;
            tx.commit().await?;
            Ok(application)
        })
        .await
    }

    pub async fn approved_terms(
        &self,
        application_id: &LoanApplicationId,
    ) -> Result<Option<ApprovedLoanTerms>, WorkflowError> {
        self.within_timeout(async {
            let mut tx = self.store.begin().await?;
            let terms = tx.load_approved_terms(application_id).await?;
            tx.commit().await?;
            Ok(terms)
        })
        .await
    }

    /// Current load of every active approver holding `role`.
    pub async fn workload(&self, role: &Role) -> Result<Vec<ApproverLoad>, WorkflowError> {
        self.within_timeout(async {
            let mut tx = self.store.begin().await?;
            let workload = self.selector.workload(&mut tx, role).await?;
            tx.commit().await?;
            Ok(workload)
        })
        .await
    }

    async fn run_transition(
        &self,
        request: &TransitionRequest,
    ) -> Result<TransitionOutcome, WorkflowError> {
        let rule = self.table.authorize(&request.actor.role, request.target.kind())?;
        if request.remarks.trim().is_empty() {
            return Err(WorkflowError::validation(
                "remarks are required for every transition",
                vec!["remarks".to_owned()],
            ));
        }
        if let TargetStage::CreditLevel(role) = &request.target {
            if !role.is_credit_level() {
                return Err(WorkflowError::validation(
                    format!("`{role}` is not a credit level"),
                    vec!["target_role".to_owned()],
                ));
            }
        }

        self.within_timeout(self.apply_transition(rule, request)).await
    }

    async fn apply_transition(
        &self,
        rule: &TransitionRule,
        request: &TransitionRequest,
    ) -> Result<TransitionOutcome, WorkflowError> {
        let mut tx = self.store.begin().await?;
        let application = load_open_application(&mut tx, &request.application_id).await?;
        verify_actor(&mut tx, &request.actor, rule.kind).await?;
        rule.check_stage(application.internal_status)?;

        let from_status = application.internal_status;
        let to_status = rule.to_status.unwrap_or(from_status);
        let current = application.approver_id.as_ref();
        let selector = &self.selector;

        let next = match &request.target {
            TargetStage::Ops => Some(selector.select_ops(&mut tx, current).await?),
            TargetStage::SeniorOps => Some(selector.select_senior_ops(&mut tx, current).await?),
            TargetStage::Credit => {
                let score = application.crif_score.ok_or_else(|| {
                    WorkflowError::Conflict(format!(
                        "application {} has no credit bureau score yet",
                        application.id
                    ))
                })?;
                Some(
                    selector
                        .select_credit_by_score(&mut tx, &application.product_id, score, current)
                        .await?,
                )
            }
            TargetStage::CreditLevel(role) => {
                Some(selector.select_credit_by_role(&mut tx, role, current).await?)
            }
            TargetStage::Finance => Some(selector.select_finance(&mut tx, current).await?),
            TargetStage::Disbursal => Some(selector.select_disbursal(&mut tx, current).await?),
            TargetStage::Reject => None,
        };

        let assigned_to = next.map(|approver| approver.id);
        let customer_status = match request.target {
            TargetStage::Reject => CustomerStatus::Rejected,
            _ => CustomerStatus::UnderReview,
        };
        let now = Utc::now();
        tx.update_assignment(
            &application.id,
            &Assignment {
                approver_id: assigned_to.clone(),
                customer_status,
                internal_status: to_status,
            },
            now,
        )
        .await?;

        let action = rule.action_for(&request.target);
        let entry = log_entry(
            &application.id,
            &request.actor,
            assigned_to.clone(),
            action,
            (from_status, to_status),
            request.remarks.clone(),
            now,
        );
        tx.append_log(&entry).await?;
        tx.commit().await?;

        Ok(TransitionOutcome {
            application_id: application.id,
            action,
            from_status,
            to_status,
            assigned_to,
            log_id: entry.id,
        })
    }

    async fn run_approval(
        &self,
        application_id: &LoanApplicationId,
        actor: &Actor,
        raw_terms: &RawLoanTerms,
        remarks: Option<&str>,
    ) -> Result<FinalizationOutcome, WorkflowError> {
        let rule = self.table.authorize(&actor.role, TransitionKind::Approve)?;
        let terms = parse_terms(raw_terms)?;
        let emi = calculate_emi(&EmiInput {
            principal: terms.approved_amount,
            annual_rate: terms.interest_rate,
            tenure_months: terms.tenure_months,
            interest_type: Some(terms.interest_type),
        })?;
        let charges = calculate_charges(&terms)?;
        let remarks = remarks
            .map(str::trim)
            .filter(|remarks| !remarks.is_empty())
            .unwrap_or(DEFAULT_APPROVAL_REMARKS)
            .to_owned();

        self.within_timeout(async {
            let mut tx = self.store.begin().await?;
            let application = load_open_application(&mut tx, application_id).await?;
            verify_actor(&mut tx, actor, rule.kind).await?;
            rule.check_stage(application.internal_status)?;

            let now = Utc::now();
            let approved = ApprovedLoanTerms {
                application_id: application.id.clone(),
                terms: terms.clone(),
                approved_by: actor.approver_id.clone(),
                approved_at: now,
            };
            tx.upsert_approved_terms(&approved).await?;
            tx.upsert_emi_schedule(&EmiSchedule {
                application_id: application.id.clone(),
                interest_type: emi.meta.interest_type,
                emi_amount: emi.emi_amount,
                principal_emi: emi.principal_emi,
                interest_emi: emi.interest_emi,
                total_interest: emi.total_interest,
                total_payable: emi.total_payable,
                computed_at: now,
            })
            .await?;
            tx.upsert_charges(&ChargesBreakdown {
                application_id: application.id.clone(),
                processing_fee: charges.processing_fee,
                processing_fee_gst: charges.processing_fee_gst,
                insurance_amount: charges.insurance_amount,
                stamp_duty: charges.stamp_duty,
                other_charges: charges.other_charges,
                total_charges: charges.total_charges,
                computed_at: now,
            })
            .await?;
            tx.upsert_disbursal_summary(&DisbursalSummary {
                application_id: application.id.clone(),
                approved_amount: terms.approved_amount,
                total_charges: charges.total_charges,
                net_disbursal_amount: charges.net_disbursal_amount,
                computed_at: now,
            })
            .await?;
            tx.mark_credit_approved(&application.id, now).await?;

            let status = application.internal_status;
            let entry = log_entry(
                &application.id,
                actor,
                None,
                LogAction::Approved,
                (status, status),
                remarks.clone(),
                now,
            );
            tx.append_log(&entry).await?;
            tx.commit().await?;

            Ok(FinalizationOutcome {
                application_id: application.id,
                terms: approved,
                emi: emi.clone(),
                charges: charges.clone(),
                log_id: entry.id,
            })
        })
        .await
    }

    /// Runs one unit of work under the transaction timeout. On expiry the
    /// work future is dropped, which drops its transaction and rolls back.
    async fn within_timeout<T, F>(&self, work: F) -> Result<T, WorkflowError>
    where
        F: Future<Output = Result<T, WorkflowError>>,
    {
        let limit = self.policy.transaction_timeout;
        match tokio::time::timeout(limit, work).await {
            Ok(result) => result,
            Err(_) => Err(WorkflowError::Timeout { timeout_secs: limit.as_secs() }),
        }
    }
}

async fn load_open_application<T>(
    tx: &mut T,
    id: &LoanApplicationId,
) -> Result<LoanApplication, WorkflowError>
where
    T: WorkflowTx + ?Sized,
{
    tx.load_application(id)
        .await?
        .filter(LoanApplication::is_open)
        .ok_or_else(|| WorkflowError::NotFound(format!("loan application `{id}` not found")))
}

/// The claimed role must be the one on record, and only active approvers
/// may act.
async fn verify_actor<T>(
    tx: &mut T,
    actor: &Actor,
    transition: TransitionKind,
) -> Result<(), WorkflowError>
where
    T: WorkflowTx + ?Sized,
{
    let approver = tx.find_approver(&actor.approver_id).await?.ok_or_else(|| {
        WorkflowError::NotFound(format!("approver `{}` not found", actor.approver_id))
    })?;
    if approver.role != actor.role || !approver.is_eligible() {
        return Err(WorkflowError::Forbidden { role: actor.role.clone(), transition });
    }
    Ok(())
}

fn log_entry(
    application_id: &LoanApplicationId,
    actor: &Actor,
    assigned_to: Option<ApproverId>,
    action: LogAction,
    (from_status, to_status): (InternalStatus, InternalStatus),
    remarks: String,
    occurred_at: DateTime<Utc>,
) -> LoanApplicationLog {
    LoanApplicationLog {
        id: LogEntryId::generate(),
        loan_application_id: application_id.clone(),
        performed_by: actor.approver_id.clone(),
        assigned_to,
        action,
        from_status,
        to_status,
        remarks,
        occurred_at,
    }
}

fn refusal_outcome(error: &WorkflowError) -> AuditOutcome {
    if error.is_retryable() {
        AuditOutcome::Failed
    } else {
        AuditOutcome::Rejected
    }
}
