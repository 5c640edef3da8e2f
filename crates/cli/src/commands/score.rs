use lendflow_core::LoanApplicationId;

use crate::commands::session::{correlation_id, Session};
use crate::commands::CommandResult;

pub fn run(application_id: &str, score: i32, correlation: Option<String>) -> CommandResult {
    let session = match Session::open("score") {
        Ok(session) => session,
        Err(failure) => return failure,
    };
    let correlation_id = correlation_id(correlation);
    let id = LoanApplicationId(application_id.to_string());
    let correlation = correlation_id.as_str();

    let result = session.run_workflow("score", correlation, |workflow| async move {
        workflow.record_bureau_score(&id, score, correlation).await
    });

    match result {
        Ok(()) => CommandResult::success(
            "score",
            format!("recorded bureau score {score} for {application_id}"),
        ),
        Err(failure) => failure,
    }
}
