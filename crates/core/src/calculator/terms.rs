use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{CalculationError, FieldError, MAX_TENURE_MONTHS};
use crate::domain::terms::{InterestType, LoanTerms};

/// Finalization terms as received from a caller. Numeric fields may arrive as
/// JSON numbers or numeric strings; every one of them is required.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawLoanTerms {
    pub approved_amount: Option<Value>,
    pub interest_rate: Option<Value>,
    pub tenure_months: Option<Value>,
    pub interest_type: Option<String>,
    pub processing_fee_percent: Option<Value>,
    pub insurance_amount: Option<Value>,
    pub stamp_duty: Option<Value>,
    pub other_charges: Option<Value>,
}

pub fn parse_terms(raw: &RawLoanTerms) -> Result<LoanTerms, CalculationError> {
    let mut errors = Vec::new();

    let approved_amount = decimal_field("approved_amount", &raw.approved_amount, &mut errors);
    let interest_rate = decimal_field("interest_rate", &raw.interest_rate, &mut errors);
    let tenure = decimal_field("tenure_months", &raw.tenure_months, &mut errors);
    let processing_fee_percent =
        decimal_field("processing_fee_percent", &raw.processing_fee_percent, &mut errors);
    let insurance_amount = decimal_field("insurance_amount", &raw.insurance_amount, &mut errors);
    let stamp_duty = decimal_field("stamp_duty", &raw.stamp_duty, &mut errors);
    let other_charges = decimal_field("other_charges", &raw.other_charges, &mut errors);

    let interest_type = match raw.interest_type.as_deref().map(str::trim) {
        None | Some("") => Some(InterestType::default()),
        Some(value) => {
            let parsed = InterestType::parse(value);
            if parsed.is_none() {
                errors.push(FieldError::new("interest_type", "must be FLAT or REDUCING"));
            }
            parsed
        }
    };

    if let Some(amount) = approved_amount {
        if amount <= Decimal::ZERO {
            errors.push(FieldError::new("approved_amount", "must be greater than zero"));
        }
    }
    if let Some(rate) = interest_rate {
        if rate < Decimal::ZERO {
            errors.push(FieldError::new("interest_rate", "must not be negative"));
        }
    }
    let tenure_months = tenure.and_then(|tenure| {
        let months = whole_months(tenure);
        if months.is_none() {
            errors.push(FieldError::new(
                "tenure_months",
                format!("must be a whole number of months between 1 and {MAX_TENURE_MONTHS}"),
            ));
        }
        months
    });
    if let Some(percent) = processing_fee_percent {
        if percent < Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
            errors.push(FieldError::new("processing_fee_percent", "must be between 0 and 100"));
        }
    }
    for (field, value) in [
        ("insurance_amount", insurance_amount),
        ("stamp_duty", stamp_duty),
        ("other_charges", other_charges),
    ] {
        if value.is_some_and(|value| value < Decimal::ZERO) {
            errors.push(FieldError::new(field, "must not be negative"));
        }
    }

    match (
        approved_amount,
        interest_rate,
        tenure_months,
        interest_type,
        processing_fee_percent,
        insurance_amount,
        stamp_duty,
        other_charges,
    ) {
        (
            Some(approved_amount),
            Some(interest_rate),
            Some(tenure_months),
            Some(interest_type),
            Some(processing_fee_percent),
            Some(insurance_amount),
            Some(stamp_duty),
            Some(other_charges),
        ) if errors.is_empty() => Ok(LoanTerms {
            approved_amount,
            interest_rate,
            tenure_months,
            interest_type,
            processing_fee_percent,
            insurance_amount,
            stamp_duty,
            other_charges,
        }),
        _ => Err(CalculationError::InvalidFields(errors)),
    }
}

fn decimal_field(
    field: &str,
    value: &Option<Value>,
    errors: &mut Vec<FieldError>,
) -> Option<Decimal> {
    let parsed = match value {
        None | Some(Value::Null) => {
            errors.push(FieldError::new(field, "is required"));
            return None;
        }
        Some(Value::Number(number)) => parse_decimal(&number.to_string()),
        Some(Value::String(text)) => parse_decimal(text),
        Some(_) => None,
    };

    if parsed.is_none() {
        errors.push(FieldError::new(field, "must be a finite number"));
    }
    parsed
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Decimal::from_str(text).or_else(|_| Decimal::from_scientific(text)).ok()
}

fn whole_months(value: Decimal) -> Option<u32> {
    if value.fract() != Decimal::ZERO || value < Decimal::ONE {
        return None;
    }
    value.trunc().to_u32().filter(|months| *months <= MAX_TENURE_MONTHS)
}
