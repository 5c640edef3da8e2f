use lendflow_core::calculator::{calculate_emi, EmiInput};
use lendflow_core::domain::terms::InterestType;
use lendflow_core::WorkflowError;
use rust_decimal::Decimal;

use crate::commands::{to_data, CommandResult};

/// EMI preview without touching the database.
pub fn run(
    principal: Decimal,
    annual_rate: Decimal,
    tenure_months: u32,
    interest_type: Option<&str>,
) -> CommandResult {
    let interest_type = match interest_type.map(|value| (value, InterestType::parse(value))) {
        None => None,
        Some((_, Some(parsed))) => Some(parsed),
        Some((value, None)) => {
            return CommandResult::failure(
                "emi",
                "validation_error",
                format!("unknown interest type `{value}`; expected FLAT or REDUCING"),
                1,
            );
        }
    };

    let input = EmiInput { principal, annual_rate, tenure_months, interest_type };
    match calculate_emi(&input) {
        Ok(result) => CommandResult::success_with_data(
            "emi",
            format!(
                "{} EMI {} over {} months, total payable {}",
                result.meta.interest_type.as_str(),
                result.emi_amount,
                tenure_months,
                result.total_payable
            ),
            to_data(&result),
        ),
        Err(error) => CommandResult::rejected("emi", WorkflowError::from(error), "cli-emi"),
    }
}
