use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{round_money, CalculationError, FieldError};
use crate::domain::terms::LoanTerms;

/// GST levied on the processing fee. Fixed by tax policy, not per product.
pub const PROCESSING_FEE_GST_PERCENT: Decimal = Decimal::from_parts(18, 0, 0, false, 0);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Charges {
    pub processing_fee: Decimal,
    pub processing_fee_gst: Decimal,
    pub insurance_amount: Decimal,
    pub stamp_duty: Decimal,
    pub other_charges: Decimal,
    pub total_charges: Decimal,
    pub net_disbursal_amount: Decimal,
}

pub fn calculate_charges(terms: &LoanTerms) -> Result<Charges, CalculationError> {
    let mut errors = Vec::new();
    for (field, value) in [
        ("processing_fee_percent", terms.processing_fee_percent),
        ("insurance_amount", terms.insurance_amount),
        ("stamp_duty", terms.stamp_duty),
        ("other_charges", terms.other_charges),
    ] {
        if value < Decimal::ZERO {
            errors.push(FieldError::new(field, "must not be negative"));
        }
    }
    if !errors.is_empty() {
        return Err(CalculationError::InvalidFields(errors));
    }

    let hundred = Decimal::ONE_HUNDRED;
    let processing_fee = terms
        .approved_amount
        .checked_mul(terms.processing_fee_percent)
        .map(|value| round_money(value / hundred))
        .ok_or(CalculationError::Overflow("processing fee"))?;
    let processing_fee_gst = round_money(processing_fee * PROCESSING_FEE_GST_PERCENT / hundred);
    let insurance_amount = round_money(terms.insurance_amount);
    let stamp_duty = round_money(terms.stamp_duty);
    let other_charges = round_money(terms.other_charges);

    let total_charges = [processing_fee, processing_fee_gst, insurance_amount, stamp_duty]
        .into_iter()
        .try_fold(other_charges, |total, amount| total.checked_add(amount))
        .ok_or(CalculationError::Overflow("total charges"))?;

    if total_charges > terms.approved_amount {
        return Err(CalculationError::ChargesExceedAmount {
            total_charges,
            approved_amount: terms.approved_amount,
        });
    }

    Ok(Charges {
        processing_fee,
        processing_fee_gst,
        insurance_amount,
        stamp_duty,
        other_charges,
        total_charges,
        net_disbursal_amount: round_money(terms.approved_amount - total_charges),
    })
}
