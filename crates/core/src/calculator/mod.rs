//! EMI and charges arithmetic used when a loan is finalized.
//!
//! Everything here is pure: decimal inputs in, rounded decimal outputs out.
//! Money is rounded to two decimal places, half-up (midpoint away from zero).

pub mod charges;
pub mod terms;

use std::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::terms::InterestType;

pub use charges::{calculate_charges, Charges, PROCESSING_FEE_GST_PERCENT};
pub use terms::{parse_terms, RawLoanTerms};

pub const MONEY_SCALE: u32 = 2;
pub const ROUNDING_MODE: &str = "half_up_2dp";
/// Fifty years. Longer tenures are refused before any arithmetic runs.
pub const MAX_TENURE_MONTHS: u32 = 600;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into() }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.field, self.message)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CalculationError {
    #[error("invalid fields: {}", join_fields(.0))]
    InvalidFields(Vec<FieldError>),
    #[error("total charges {total_charges} exceed approved amount {approved_amount}")]
    ChargesExceedAmount { total_charges: Decimal, approved_amount: Decimal },
    #[error("arithmetic overflow while computing {0}")]
    Overflow(&'static str),
}

impl CalculationError {
    pub fn invalid_fields(&self) -> Vec<String> {
        match self {
            Self::InvalidFields(fields) => fields.iter().map(|field| field.field.clone()).collect(),
            Self::ChargesExceedAmount { .. } => vec!["charges".to_owned()],
            Self::Overflow(_) => Vec::new(),
        }
    }
}

fn join_fields(fields: &[FieldError]) -> String {
    fields.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmiInput {
    pub principal: Decimal,
    /// Annual rate in percent (12 means 12% p.a.).
    pub annual_rate: Decimal,
    pub tenure_months: u32,
    pub interest_type: Option<InterestType>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationStep {
    pub stage: String,
    pub detail: String,
    pub amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmiMeta {
    pub interest_type: InterestType,
    pub monthly_rate: Option<Decimal>,
    pub tenure_months: u32,
    pub rounding: String,
    pub steps: Vec<CalculationStep>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmiResult {
    pub emi_amount: Decimal,
    /// Only defined for flat interest; a reducing schedule's split changes
    /// every installment.
    pub principal_emi: Option<Decimal>,
    pub interest_emi: Option<Decimal>,
    pub total_interest: Decimal,
    pub total_payable: Decimal,
    pub meta: EmiMeta,
}

pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

pub fn calculate_emi(input: &EmiInput) -> Result<EmiResult, CalculationError> {
    validate_emi_input(input)?;

    match input.interest_type.unwrap_or_default() {
        InterestType::Flat => flat_emi(input),
        InterestType::Reducing => reducing_emi(input),
    }
}

fn validate_emi_input(input: &EmiInput) -> Result<(), CalculationError> {
    let mut errors = Vec::new();
    if input.principal <= Decimal::ZERO {
        errors.push(FieldError::new("principal", "must be greater than zero"));
    }
    if input.annual_rate < Decimal::ZERO {
        errors.push(FieldError::new("interest_rate", "must not be negative"));
    }
    if input.tenure_months == 0 {
        errors.push(FieldError::new("tenure_months", "must be at least one month"));
    } else if input.tenure_months > MAX_TENURE_MONTHS {
        errors.push(FieldError::new(
            "tenure_months",
            format!("must not exceed {MAX_TENURE_MONTHS} months"),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(CalculationError::InvalidFields(errors))
    }
}

fn flat_emi(input: &EmiInput) -> Result<EmiResult, CalculationError> {
    let tenure = Decimal::from(input.tenure_months);
    let total_interest = input
        .principal
        .checked_mul(input.annual_rate)
        .and_then(|value| value.checked_mul(tenure))
        .and_then(|value| value.checked_div(Decimal::from(1200)))
        .ok_or(CalculationError::Overflow("flat interest"))?;
    let total_payable = input
        .principal
        .checked_add(total_interest)
        .ok_or(CalculationError::Overflow("flat total payable"))?;

    let emi_amount = round_money(total_payable / tenure);
    let principal_emi = round_money(input.principal / tenure);
    let interest_emi = round_money(total_interest / tenure);
    let total_interest = round_money(total_interest);
    let total_payable = round_money(total_payable);

    Ok(EmiResult {
        emi_amount,
        principal_emi: Some(principal_emi),
        interest_emi: Some(interest_emi),
        total_interest,
        total_payable,
        meta: EmiMeta {
            interest_type: InterestType::Flat,
            monthly_rate: None,
            tenure_months: input.tenure_months,
            rounding: ROUNDING_MODE.to_owned(),
            steps: vec![
                step("total_interest", "principal * rate * tenure / 1200", total_interest),
                step("total_payable", "principal + total_interest", total_payable),
                step("emi", "total_payable / tenure", emi_amount),
            ],
        },
    })
}

fn reducing_emi(input: &EmiInput) -> Result<EmiResult, CalculationError> {
    let tenure = Decimal::from(input.tenure_months);
    let monthly_rate = input.annual_rate / Decimal::from(1200);

    let raw_emi = if monthly_rate.is_zero() {
        input.principal / tenure
    } else {
        let factor = compound_factor(monthly_rate, input.tenure_months)?;
        let numerator = input
            .principal
            .checked_mul(monthly_rate)
            .and_then(|value| value.checked_mul(factor))
            .ok_or(CalculationError::Overflow("reducing emi"))?;
        numerator
            .checked_div(factor - Decimal::ONE)
            .ok_or(CalculationError::Overflow("reducing emi"))?
    };

    let emi_amount = round_money(raw_emi);
    let total_payable = emi_amount
        .checked_mul(tenure)
        .map(round_money)
        .ok_or(CalculationError::Overflow("reducing total payable"))?;
    let total_interest = round_money(total_payable - input.principal);

    Ok(EmiResult {
        emi_amount,
        principal_emi: None,
        interest_emi: None,
        total_interest,
        total_payable,
        meta: EmiMeta {
            interest_type: InterestType::Reducing,
            monthly_rate: Some(monthly_rate),
            tenure_months: input.tenure_months,
            rounding: ROUNDING_MODE.to_owned(),
            steps: vec![
                step("emi", "P * r * (1 + r)^n / ((1 + r)^n - 1)", emi_amount),
                step("total_payable", "emi * tenure", total_payable),
                step("total_interest", "total_payable - principal", total_interest),
            ],
        },
    })
}

/// `(1 + rate)^months` by squaring, so the cost grows with the bit length of
/// the tenure rather than the tenure itself.
fn compound_factor(rate: Decimal, months: u32) -> Result<Decimal, CalculationError> {
    let overflow = || CalculationError::Overflow("compound factor");
    let mut base = Decimal::ONE + rate;
    let mut factor = Decimal::ONE;
    let mut remaining = months;
    while remaining > 0 {
        if remaining & 1 == 1 {
            factor = factor.checked_mul(base).ok_or_else(overflow)?;
        }
        remaining >>= 1;
        if remaining > 0 {
            base = base.checked_mul(base).ok_or_else(overflow)?;
        }
    }
    Ok(factor)
}

fn step(stage: &str, detail: &str, amount: Decimal) -> CalculationStep {
    CalculationStep { stage: stage.to_owned(), detail: detail.to_owned(), amount }
}
