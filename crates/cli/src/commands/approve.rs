use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use lendflow_core::calculator::RawLoanTerms;
use lendflow_core::domain::approver::Role;
use lendflow_core::{Actor, LoanApplicationId};

use crate::commands::session::{correlation_id, Session};
use crate::commands::{to_data, CommandResult};

pub struct ApproveArgs {
    pub application_id: String,
    pub actor_id: String,
    pub actor_role: String,
    pub terms: Option<String>,
    pub terms_file: Option<PathBuf>,
    pub remarks: Option<String>,
    pub correlation_id: Option<String>,
}

pub fn run(args: ApproveArgs) -> CommandResult {
    let Some(actor_role) = Role::parse(&args.actor_role) else {
        return CommandResult::failure(
            "approve",
            "validation_error",
            format!("unknown actor role `{}`", args.actor_role),
            1,
        );
    };
    let raw_terms = match read_terms(args.terms.as_deref(), args.terms_file.as_deref()) {
        Ok(raw_terms) => raw_terms,
        Err(error) => {
            return CommandResult::failure("approve", "validation_error", format!("{error:#}"), 1);
        }
    };

    let session = match Session::open("approve") {
        Ok(session) => session,
        Err(failure) => return failure,
    };
    let correlation_id = correlation_id(args.correlation_id);
    let correlation = correlation_id.as_str();
    let id = LoanApplicationId(args.application_id);
    let actor = Actor::new(args.actor_id, actor_role);
    let remarks = args.remarks;

    let result = session.run_workflow("approve", correlation, |workflow| async move {
        workflow.approve_loan(&id, &actor, &raw_terms, remarks.as_deref(), correlation).await
    });

    match result {
        Ok(outcome) => CommandResult::success_with_data(
            "approve",
            format!(
                "{} approved: EMI {}, total charges {}, net disbursal {}",
                outcome.application_id,
                outcome.emi.emi_amount,
                outcome.charges.total_charges,
                outcome.charges.net_disbursal_amount
            ),
            to_data(&outcome),
        ),
        Err(failure) => failure,
    }
}

/// Terms come inline as JSON or from a JSON file; exactly one is required.
fn read_terms(inline: Option<&str>, file: Option<&Path>) -> anyhow::Result<RawLoanTerms> {
    let raw = match (inline, file) {
        (Some(inline), None) => inline.to_string(),
        (None, Some(path)) => fs::read_to_string(path)
            .with_context(|| format!("failed to read terms file `{}`", path.display()))?,
        (Some(_), Some(_)) => anyhow::bail!("pass either --terms or --terms-file, not both"),
        (None, None) => anyhow::bail!("loan terms are required (--terms or --terms-file)"),
    };

    serde_json::from_str(&raw).context("terms must be a JSON object of loan terms")
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serde_json::json;

    use super::read_terms;

    #[test]
    fn inline_terms_accept_numbers_and_numeric_strings() {
        let terms = read_terms(
            Some(r#"{"approved_amount": 100000, "interest_rate": "12", "interest_type": "FLAT"}"#),
            None,
        )
        .expect("parse inline terms");

        assert_eq!(terms.approved_amount, Some(json!(100000)));
        assert_eq!(terms.interest_rate, Some(json!("12")));
        assert_eq!(terms.interest_type.as_deref(), Some("FLAT"));
        assert_eq!(terms.tenure_months, None);
    }

    #[test]
    fn terms_file_is_read_from_disk() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{"tenure_months": 12, "stamp_duty": 100}}"#).expect("write terms");

        let terms = read_terms(None, Some(file.path())).expect("parse terms file");
        assert_eq!(terms.tenure_months, Some(json!(12)));
        assert_eq!(terms.stamp_duty, Some(json!(100)));
    }

    #[test]
    fn terms_source_must_be_unambiguous() {
        let missing = read_terms(None, None).expect_err("no source");
        assert!(missing.to_string().contains("required"));

        let malformed = read_terms(Some("not json"), None).expect_err("malformed");
        assert!(format!("{malformed:#}").contains("JSON object"));
    }
}
