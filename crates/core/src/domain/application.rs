use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::approver::ApproverId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoanApplicationId(pub String);

impl fmt::Display for LoanApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductId(pub String);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomerId(pub String);

/// Pipeline stage; tracks which role family currently owns the application.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InternalStatus {
    Submitted,
    OpsPending,
    SeniorOpsPending,
    CreditPending,
    FinancePending,
    DisbursePending,
    Rejected,
}

impl InternalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "SUBMITTED",
            Self::OpsPending => "OPS_PENDING",
            Self::SeniorOpsPending => "SENIOR_OPS_PENDING",
            Self::CreditPending => "CREDIT_PENDING",
            Self::FinancePending => "FINANCE_PENDING",
            Self::DisbursePending => "DISBURSE_PENDING",
            Self::Rejected => "REJECTED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "SUBMITTED" => Some(Self::Submitted),
            "OPS_PENDING" => Some(Self::OpsPending),
            "SENIOR_OPS_PENDING" => Some(Self::SeniorOpsPending),
            "CREDIT_PENDING" => Some(Self::CreditPending),
            "FINANCE_PENDING" => Some(Self::FinancePending),
            "DISBURSE_PENDING" => Some(Self::DisbursePending),
            "REJECTED" => Some(Self::Rejected),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustomerStatus {
    Submitted,
    UnderReview,
    Approved,
    Rejected,
}

impl CustomerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "SUBMITTED",
            Self::UnderReview => "UNDER_REVIEW",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "SUBMITTED" => Some(Self::Submitted),
            "UNDER_REVIEW" => Some(Self::UnderReview),
            "APPROVED" => Some(Self::Approved),
            "REJECTED" => Some(Self::Rejected),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VkycStatus {
    Pending,
    Initiated,
    Completed,
    Failed,
}

impl VkycStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Initiated => "INITIATED",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Some(Self::Pending),
            "INITIATED" => Some(Self::Initiated),
            "COMPLETED" => Some(Self::Completed),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Soft-delete lifecycle. Only `Active` applications count towards approver load
/// or can be moved through the workflow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordStatus {
    Active,
    Deleted,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Deleted => "DELETED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ACTIVE" => Some(Self::Active),
            "DELETED" => Some(Self::Deleted),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoanApplication {
    pub id: LoanApplicationId,
    pub product_id: ProductId,
    pub customer_id: CustomerId,
    pub loan_amount: Decimal,
    pub tenure_months: u32,
    pub crif_score: Option<i32>,
    pub approver_id: Option<ApproverId>,
    pub customer_status: CustomerStatus,
    pub internal_status: InternalStatus,
    pub credit_approved: bool,
    pub vkyc_status: VkycStatus,
    pub record_status: RecordStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LoanApplication {
    /// A freshly submitted application, before any workflow assignment.
    pub fn submitted(
        id: LoanApplicationId,
        product_id: ProductId,
        customer_id: CustomerId,
        loan_amount: Decimal,
        tenure_months: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            product_id,
            customer_id,
            loan_amount,
            tenure_months,
            crif_score: None,
            approver_id: None,
            customer_status: CustomerStatus::Submitted,
            internal_status: InternalStatus::Submitted,
            credit_approved: false,
            vkyc_status: VkycStatus::Pending,
            record_status: RecordStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_open(&self) -> bool {
        self.record_status == RecordStatus::Active
    }
}

/// The fields a transition writes together: owner plus both status columns.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub approver_id: Option<ApproverId>,
    pub customer_status: CustomerStatus,
    pub internal_status: InternalStatus,
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{
        CustomerId, CustomerStatus, InternalStatus, LoanApplication, LoanApplicationId, ProductId,
        RecordStatus, VkycStatus,
    };

    #[test]
    fn statuses_round_trip_from_storage_encoding() {
        let internal = [
            InternalStatus::Submitted,
            InternalStatus::OpsPending,
            InternalStatus::SeniorOpsPending,
            InternalStatus::CreditPending,
            InternalStatus::FinancePending,
            InternalStatus::DisbursePending,
            InternalStatus::Rejected,
        ];
        for status in internal {
            assert_eq!(InternalStatus::parse(status.as_str()), Some(status));
        }

        for status in [
            CustomerStatus::Submitted,
            CustomerStatus::UnderReview,
            CustomerStatus::Approved,
            CustomerStatus::Rejected,
        ] {
            assert_eq!(CustomerStatus::parse(status.as_str()), Some(status));
        }

        for status in
            [VkycStatus::Pending, VkycStatus::Initiated, VkycStatus::Completed, VkycStatus::Failed]
        {
            assert_eq!(VkycStatus::parse(status.as_str()), Some(status));
        }

        assert_eq!(RecordStatus::parse("deleted"), Some(RecordStatus::Deleted));
    }

    #[test]
    fn submitted_application_starts_unassigned() {
        let application = LoanApplication::submitted(
            LoanApplicationId("LA-1".to_owned()),
            ProductId("PL-STD".to_owned()),
            CustomerId("C-1".to_owned()),
            Decimal::new(250_000, 0),
            24,
        );

        assert_eq!(application.internal_status, InternalStatus::Submitted);
        assert_eq!(application.customer_status, CustomerStatus::Submitted);
        assert!(application.approver_id.is_none());
        assert!(!application.credit_approved);
        assert!(application.is_open());
    }
}
