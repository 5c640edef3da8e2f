use lendflow_core::domain::approver::Role;
use lendflow_core::{Actor, LoanApplicationId, TargetStage, TransitionRequest};

use crate::commands::session::{correlation_id, Session};
use crate::commands::{to_data, CommandResult};

pub struct TransitionArgs {
    pub application_id: String,
    pub stage: String,
    pub target_role: Option<String>,
    pub actor_id: String,
    pub actor_role: String,
    pub remarks: String,
    pub correlation_id: Option<String>,
}

pub fn run(args: TransitionArgs) -> CommandResult {
    let Some(actor_role) = Role::parse(&args.actor_role) else {
        return CommandResult::failure(
            "transition",
            "validation_error",
            format!("unknown actor role `{}`", args.actor_role),
            1,
        );
    };
    let Some(target) = TargetStage::parse(&args.stage, args.target_role.as_deref()) else {
        return CommandResult::failure(
            "transition",
            "validation_error",
            format!(
                "unknown stage `{}`; expected ops, senior_ops, credit, credit_level (with --target-role), finance, disbursal or reject",
                args.stage
            ),
            1,
        );
    };

    let session = match Session::open("transition") {
        Ok(session) => session,
        Err(failure) => return failure,
    };
    let correlation_id = correlation_id(args.correlation_id);
    let request = TransitionRequest {
        application_id: LoanApplicationId(args.application_id),
        actor: Actor::new(args.actor_id, actor_role),
        target,
        remarks: args.remarks,
        correlation_id: correlation_id.clone(),
    };

    let result = session.run_workflow("transition", &correlation_id, |workflow| async move {
        workflow.process_transition(request).await
    });

    match result {
        Ok(outcome) => {
            let assignee = outcome.assigned_to.as_ref().map_or("nobody", |id| id.0.as_str());
            CommandResult::success_with_data(
                "transition",
                format!(
                    "{} {} -> {} (assigned to {assignee})",
                    outcome.application_id,
                    outcome.from_status.as_str(),
                    outcome.to_status.as_str()
                ),
                to_data(&outcome),
            )
        }
        Err(failure) => failure,
    }
}
