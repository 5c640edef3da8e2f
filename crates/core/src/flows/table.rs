use std::collections::HashMap;
use std::time::Duration;

use crate::domain::application::InternalStatus;
use crate::domain::approver::{Role, RoleKind};
use crate::domain::log::LogAction;
use crate::errors::WorkflowError;
use crate::flows::states::{TargetStage, TransitionKind};

pub const DEFAULT_TRANSACTION_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkflowPolicy {
    /// Lets any credit sub-role reassign within credit, not only
    /// Senior_Credit and Finance.
    pub allow_credit_peer_reassignment: bool,
    pub transaction_timeout: Duration,
}

impl Default for WorkflowPolicy {
    fn default() -> Self {
        Self {
            allow_credit_peer_reassignment: true,
            transaction_timeout: DEFAULT_TRANSACTION_TIMEOUT,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Permitted {
    AnyRole,
    Roles(Vec<RoleKind>),
}

impl Permitted {
    fn allows(&self, role: &Role) -> bool {
        match self {
            Self::AnyRole => true,
            Self::Roles(kinds) => kinds.contains(&role.kind()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionRule {
    pub kind: TransitionKind,
    pub permitted: Permitted,
    pub allowed_from: Vec<InternalStatus>,
    /// `None` leaves the pipeline stage untouched.
    pub to_status: Option<InternalStatus>,
}

/// Who may move an application where, and from which stage.
#[derive(Clone, Debug)]
pub struct TransitionTable {
    rules: HashMap<TransitionKind, TransitionRule>,
}

impl Default for TransitionTable {
    fn default() -> Self {
        Self::new(&WorkflowPolicy::default())
    }
}

impl TransitionTable {
    pub fn new(policy: &WorkflowPolicy) -> Self {
        use InternalStatus::{
            CreditPending, DisbursePending, FinancePending, OpsPending, Rejected,
            SeniorOpsPending, Submitted,
        };

        let open_stages = vec![
            Submitted,
            OpsPending,
            SeniorOpsPending,
            CreditPending,
            FinancePending,
            DisbursePending,
        ];
        let mut credit_level_roles = vec![RoleKind::SeniorCredit, RoleKind::Finance];
        if policy.allow_credit_peer_reassignment {
            credit_level_roles.push(RoleKind::Credit);
        }

        let rules = [
            TransitionRule {
                kind: TransitionKind::Ops,
                permitted: Permitted::AnyRole,
                allowed_from: vec![Submitted, OpsPending],
                to_status: Some(OpsPending),
            },
            TransitionRule {
                kind: TransitionKind::SeniorOps,
                permitted: Permitted::Roles(vec![RoleKind::Ops]),
                allowed_from: vec![OpsPending],
                to_status: Some(SeniorOpsPending),
            },
            TransitionRule {
                kind: TransitionKind::Credit,
                permitted: Permitted::Roles(vec![RoleKind::SeniorOps]),
                allowed_from: vec![SeniorOpsPending],
                to_status: Some(CreditPending),
            },
            TransitionRule {
                kind: TransitionKind::CreditLevel,
                permitted: Permitted::Roles(credit_level_roles),
                allowed_from: vec![CreditPending, FinancePending],
                to_status: Some(CreditPending),
            },
            TransitionRule {
                kind: TransitionKind::Finance,
                permitted: Permitted::Roles(vec![RoleKind::SeniorCredit]),
                allowed_from: vec![CreditPending],
                to_status: Some(FinancePending),
            },
            TransitionRule {
                kind: TransitionKind::Disbursal,
                permitted: Permitted::Roles(vec![RoleKind::Finance]),
                allowed_from: vec![FinancePending],
                to_status: Some(DisbursePending),
            },
            TransitionRule {
                kind: TransitionKind::Reject,
                permitted: Permitted::AnyRole,
                allowed_from: open_stages.clone(),
                to_status: Some(Rejected),
            },
            TransitionRule {
                kind: TransitionKind::Approve,
                permitted: Permitted::Roles(vec![RoleKind::SeniorCredit]),
                allowed_from: open_stages,
                to_status: None,
            },
        ];

        Self { rules: rules.into_iter().map(|rule| (rule.kind, rule)).collect() }
    }

    pub fn rule(&self, kind: TransitionKind) -> Option<&TransitionRule> {
        self.rules.get(&kind)
    }

    /// Role check, done before anything touches storage.
    pub fn authorize(
        &self,
        role: &Role,
        kind: TransitionKind,
    ) -> Result<&TransitionRule, WorkflowError> {
        let forbidden = || WorkflowError::Forbidden { role: role.clone(), transition: kind };
        let rule = self.rules.get(&kind).ok_or_else(forbidden)?;
        if rule.permitted.allows(role) {
            Ok(rule)
        } else {
            Err(forbidden())
        }
    }
}

impl TransitionRule {
    pub fn check_stage(&self, current: InternalStatus) -> Result<(), WorkflowError> {
        if self.allowed_from.contains(&current) {
            Ok(())
        } else {
            Err(WorkflowError::Conflict(format!(
                "cannot {} while application is {}",
                self.kind,
                current.as_str()
            )))
        }
    }

    pub fn action_for(&self, target: &TargetStage) -> LogAction {
        match target {
            TargetStage::Ops => LogAction::AssignedToOps,
            TargetStage::SeniorOps => LogAction::AssignedToSeniorOps,
            TargetStage::Credit => LogAction::AssignedToCredit,
            TargetStage::CreditLevel(Role::SeniorCredit) => LogAction::EscalatedToSeniorCredit,
            TargetStage::CreditLevel(_) => LogAction::ReassignedToCreditLevel,
            TargetStage::Finance => LogAction::AssignedToFinance,
            TargetStage::Disbursal => LogAction::AssignedToDisbursal,
            TargetStage::Reject => LogAction::Rejected,
        }
    }
}
