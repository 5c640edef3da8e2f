use lendflow_core::domain::approver::Role;

use crate::commands::session::{correlation_id, Session};
use crate::commands::{to_data, CommandResult};

pub fn run(role: &str) -> CommandResult {
    let Some(role) = Role::parse(role) else {
        return CommandResult::failure(
            "workload",
            "validation_error",
            format!("unknown role `{role}`"),
            1,
        );
    };

    let session = match Session::open("workload") {
        Ok(session) => session,
        Err(failure) => return failure,
    };
    let correlation_id = correlation_id(None);
    let lookup = role.clone();

    let result = session.run_workflow("workload", &correlation_id, |workflow| async move {
        workflow.workload(&lookup).await
    });

    match result {
        Ok(loads) => {
            let summary = loads
                .iter()
                .map(|load| format!("{}={}", load.approver.id, load.open_applications))
                .collect::<Vec<_>>()
                .join(", ");
            CommandResult::success_with_data(
                "workload",
                format!("{} active {role} approver(s): {summary}", loads.len()),
                to_data(&loads),
            )
        }
        Err(failure) => failure,
    }
}
