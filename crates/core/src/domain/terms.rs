use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::application::LoanApplicationId;
use crate::domain::approver::ApproverId;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InterestType {
    #[default]
    Flat,
    Reducing,
}

impl InterestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flat => "FLAT",
            Self::Reducing => "REDUCING",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "FLAT" => Some(Self::Flat),
            "REDUCING" => Some(Self::Reducing),
            _ => None,
        }
    }
}

/// Validated terms an approver fixes at finalization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanTerms {
    pub approved_amount: Decimal,
    pub interest_rate: Decimal,
    pub tenure_months: u32,
    pub interest_type: InterestType,
    pub processing_fee_percent: Decimal,
    pub insurance_amount: Decimal,
    pub stamp_duty: Decimal,
    pub other_charges: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovedLoanTerms {
    pub application_id: LoanApplicationId,
    pub terms: LoanTerms,
    pub approved_by: ApproverId,
    pub approved_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmiSchedule {
    pub application_id: LoanApplicationId,
    pub interest_type: InterestType,
    pub emi_amount: Decimal,
    pub principal_emi: Option<Decimal>,
    pub interest_emi: Option<Decimal>,
    pub total_interest: Decimal,
    pub total_payable: Decimal,
    pub computed_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargesBreakdown {
    pub application_id: LoanApplicationId,
    pub processing_fee: Decimal,
    pub processing_fee_gst: Decimal,
    pub insurance_amount: Decimal,
    pub stamp_duty: Decimal,
    pub other_charges: Decimal,
    pub total_charges: Decimal,
    pub computed_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisbursalSummary {
    pub application_id: LoanApplicationId,
    pub approved_amount: Decimal,
    pub total_charges: Decimal,
    pub net_disbursal_amount: Decimal,
    pub computed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::InterestType;

    #[test]
    fn interest_type_defaults_to_flat() {
        assert_eq!(InterestType::default(), InterestType::Flat);
    }

    #[test]
    fn interest_type_parse_is_case_insensitive() {
        assert_eq!(InterestType::parse("reducing"), Some(InterestType::Reducing));
        assert_eq!(InterestType::parse(" Flat "), Some(InterestType::Flat));
        assert_eq!(InterestType::parse("compound"), None);
    }
}
