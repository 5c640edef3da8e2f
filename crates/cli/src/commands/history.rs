use lendflow_core::domain::log::LoanApplicationLog;
use lendflow_core::domain::terms::ApprovedLoanTerms;
use lendflow_core::{LoanApplication, LoanApplicationId, WorkflowError};
use serde::Serialize;

use crate::commands::session::{correlation_id, Session};
use crate::commands::{to_data, CommandResult};

#[derive(Serialize)]
struct HistoryView<'a> {
    application: &'a LoanApplication,
    logs: &'a [LoanApplicationLog],
    approved_terms: &'a Option<ApprovedLoanTerms>,
}

/// Current state of an application together with its transition log and
/// any approved terms.
pub fn run(application_id: &str) -> CommandResult {
    let session = match Session::open("history") {
        Ok(session) => session,
        Err(failure) => return failure,
    };
    let correlation_id = correlation_id(None);
    let id = LoanApplicationId(application_id.to_string());

    let result = session.run_workflow("history", &correlation_id, |workflow| async move {
        let application = workflow.application(&id).await?;
        let logs = workflow.history(&id).await?;
        let terms = workflow.approved_terms(&id).await?;
        Ok::<_, WorkflowError>((application, logs, terms))
    });

    match result {
        Ok((application, logs, terms)) => CommandResult::success_with_data(
            "history",
            format!(
                "{application_id} is {} with {} logged transition(s)",
                application.internal_status.as_str(),
                logs.len()
            ),
            to_data(&HistoryView { application: &application, logs: &logs, approved_terms: &terms }),
        ),
        Err(failure) => failure,
    }
}
