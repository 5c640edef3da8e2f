use std::fmt;

use serde::{Deserialize, Serialize};

use crate::calculator::{Charges, EmiResult};
use crate::domain::application::{InternalStatus, LoanApplicationId};
use crate::domain::approver::{ApproverId, Role};
use crate::domain::log::{LogAction, LogEntryId};
use crate::domain::terms::ApprovedLoanTerms;

/// Row key of the transition table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    Ops,
    SeniorOps,
    Credit,
    CreditLevel,
    Finance,
    Disbursal,
    Reject,
    Approve,
}

impl TransitionKind {
    pub const ALL: [TransitionKind; 8] = [
        TransitionKind::Ops,
        TransitionKind::SeniorOps,
        TransitionKind::Credit,
        TransitionKind::CreditLevel,
        TransitionKind::Finance,
        TransitionKind::Disbursal,
        TransitionKind::Reject,
        TransitionKind::Approve,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ops => "assign_to_ops",
            Self::SeniorOps => "assign_to_senior_ops",
            Self::Credit => "assign_to_credit",
            Self::CreditLevel => "assign_to_credit_level",
            Self::Finance => "assign_to_finance",
            Self::Disbursal => "assign_to_disbursal",
            Self::Reject => "reject",
            Self::Approve => "approve_loan",
        }
    }
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the caller wants the application to go next.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", content = "role", rename_all = "snake_case")]
pub enum TargetStage {
    Ops,
    SeniorOps,
    Credit,
    /// Reassign within credit: a credit sub-role or Senior_Credit.
    CreditLevel(Role),
    Finance,
    Disbursal,
    Reject,
}

impl TargetStage {
    pub fn kind(&self) -> TransitionKind {
        match self {
            Self::Ops => TransitionKind::Ops,
            Self::SeniorOps => TransitionKind::SeniorOps,
            Self::Credit => TransitionKind::Credit,
            Self::CreditLevel(_) => TransitionKind::CreditLevel,
            Self::Finance => TransitionKind::Finance,
            Self::Disbursal => TransitionKind::Disbursal,
            Self::Reject => TransitionKind::Reject,
        }
    }

    /// Parses the operator-facing stage name. `credit_level` needs the target
    /// role alongside it.
    pub fn parse(stage: &str, role: Option<&str>) -> Option<Self> {
        match stage.trim().to_ascii_lowercase().as_str() {
            "ops" => Some(Self::Ops),
            "senior_ops" => Some(Self::SeniorOps),
            "credit" => Some(Self::Credit),
            "credit_level" => role.and_then(Role::parse).map(Self::CreditLevel),
            "finance" => Some(Self::Finance),
            "disbursal" => Some(Self::Disbursal),
            "reject" => Some(Self::Reject),
            _ => None,
        }
    }
}

/// The authenticated caller. The role comes from the auth layer and is
/// trusted as given.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub approver_id: ApproverId,
    pub role: Role,
}

impl Actor {
    pub fn new(approver_id: impl Into<String>, role: Role) -> Self {
        Self { approver_id: ApproverId(approver_id.into()), role }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRequest {
    pub application_id: LoanApplicationId,
    pub actor: Actor,
    pub target: TargetStage,
    pub remarks: String,
    pub correlation_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub application_id: LoanApplicationId,
    pub action: LogAction,
    pub from_status: InternalStatus,
    pub to_status: InternalStatus,
    pub assigned_to: Option<ApproverId>,
    pub log_id: LogEntryId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizationOutcome {
    pub application_id: LoanApplicationId,
    pub terms: ApprovedLoanTerms,
    pub emi: EmiResult,
    pub charges: Charges,
    pub log_id: LogEntryId,
}

#[cfg(test)]
mod tests {
    use super::{TargetStage, TransitionKind};
    use crate::domain::approver::Role;

    #[test]
    fn stage_names_parse_into_targets() {
        assert_eq!(TargetStage::parse("senior_ops", None), Some(TargetStage::SeniorOps));
        assert_eq!(
            TargetStage::parse("credit_level", Some("Senior_Credit")),
            Some(TargetStage::CreditLevel(Role::SeniorCredit))
        );
        assert_eq!(TargetStage::parse("credit_level", None), None);
        assert_eq!(TargetStage::parse("archive", None), None);
    }

    #[test]
    fn every_target_maps_to_its_table_row() {
        assert_eq!(
            TargetStage::CreditLevel(Role::Credit("Credit_2".into())).kind(),
            TransitionKind::CreditLevel
        );
        assert_eq!(TargetStage::Reject.kind().to_string(), "reject");
    }
}
