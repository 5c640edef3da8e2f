use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::application::{InternalStatus, LoanApplicationId};
use crate::domain::approver::ApproverId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogEntryId(pub String);

impl LogEntryId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogAction {
    AssignedToOps,
    AssignedToSeniorOps,
    AssignedToCredit,
    ReassignedToCreditLevel,
    EscalatedToSeniorCredit,
    AssignedToFinance,
    AssignedToDisbursal,
    Rejected,
    Approved,
}

impl LogAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AssignedToOps => "ASSIGNED_TO_OPS",
            Self::AssignedToSeniorOps => "ASSIGNED_TO_SENIOR_OPS",
            Self::AssignedToCredit => "ASSIGNED_TO_CREDIT",
            Self::ReassignedToCreditLevel => "REASSIGNED_TO_CREDIT_LEVEL",
            Self::EscalatedToSeniorCredit => "ESCALATED_TO_SENIOR_CREDIT",
            Self::AssignedToFinance => "ASSIGNED_TO_FINANCE",
            Self::AssignedToDisbursal => "ASSIGNED_TO_DISBURSAL",
            Self::Rejected => "REJECTED",
            Self::Approved => "APPROVED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ASSIGNED_TO_OPS" => Some(Self::AssignedToOps),
            "ASSIGNED_TO_SENIOR_OPS" => Some(Self::AssignedToSeniorOps),
            "ASSIGNED_TO_CREDIT" => Some(Self::AssignedToCredit),
            "REASSIGNED_TO_CREDIT_LEVEL" => Some(Self::ReassignedToCreditLevel),
            "ESCALATED_TO_SENIOR_CREDIT" => Some(Self::EscalatedToSeniorCredit),
            "ASSIGNED_TO_FINANCE" => Some(Self::AssignedToFinance),
            "ASSIGNED_TO_DISBURSAL" => Some(Self::AssignedToDisbursal),
            "REJECTED" => Some(Self::Rejected),
            "APPROVED" => Some(Self::Approved),
            _ => None,
        }
    }
}

/// One immutable row of an application's workflow history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanApplicationLog {
    pub id: LogEntryId,
    pub loan_application_id: LoanApplicationId,
    pub performed_by: ApproverId,
    pub assigned_to: Option<ApproverId>,
    pub action: LogAction,
    pub from_status: InternalStatus,
    pub to_status: InternalStatus,
    pub remarks: String,
    pub occurred_at: DateTime<Utc>,
}
