pub mod approve;
pub mod config;
pub mod doctor;
pub mod emi;
pub mod history;
pub mod migrate;
pub mod score;
pub mod seed;
pub mod transition;
pub mod workload;

mod session;

use lendflow_core::WorkflowError;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::success_with_data(command, message, None)
    }

    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        data: Option<Value>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    /// A workflow refusal. Retryable failures (persistence, timeout) exit
    /// with 7, everything the caller must fix exits with 1.
    pub fn rejected(command: &str, error: WorkflowError, correlation_id: &str) -> Self {
        let exit_code = if error.is_retryable() { 7 } else { 1 };
        let fields = match &error {
            WorkflowError::Validation { fields, .. } => fields.clone(),
            _ => Vec::new(),
        };
        let interface = error.into_interface(correlation_id);
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(interface.code().to_string()),
            message: interface.to_string(),
            data: Some(serde_json::json!({
                "correlation_id": interface.correlation_id(),
                "user_message": interface.user_message(),
                "fields": fields,
            })),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Serializes a command's result body, falling back to `null` rather than
/// losing the status line.
fn to_data<T: Serialize>(value: &T) -> Option<Value> {
    Some(serde_json::to_value(value).unwrap_or(Value::Null))
}
