use std::env;
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use lendflow_cli::commands::approve::ApproveArgs;
use lendflow_cli::commands::transition::TransitionArgs;
use lendflow_cli::commands::{
    approve, config, doctor, history, migrate, score, seed, transition, workload,
};
use rust_decimal::Decimal;
use serde_json::Value;

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(&[("LENDFLOW_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_returns_config_failure_for_non_sqlite_url() {
    with_env(&[("LENDFLOW_DATABASE_URL", "postgres://localhost/lendflow")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn seed_loads_the_demo_dataset_idempotently() {
    let dir = tempfile::tempdir().expect("temp dir");
    let url = database_url(dir.path());

    with_env(&[("LENDFLOW_DATABASE_URL", url.as_str())], || {
        let first = seed::run();
        assert_eq!(first.exit_code, 0, "expected first seed invocation success");
        let first_payload = parse_payload(&first.output);
        assert_eq!(first_payload["command"], "seed");
        assert_eq!(first_payload["status"], "ok");

        let message = first_payload["message"].as_str().unwrap_or_default();
        assert!(message.contains("9 approvers, 2 credit rules"), "{message}");
        assert!(message.contains("LA-DEMO-001, LA-DEMO-002, LA-DEMO-003"), "{message}");

        let second = seed::run();
        assert_eq!(second.exit_code, 0, "expected second seed invocation success");
        assert_eq!(first_payload["message"], parse_payload(&second.output)["message"]);
    });
}

#[test]
fn doctor_reports_pending_migrations_until_migrate_runs() {
    let dir = tempfile::tempdir().expect("temp dir");
    let url = database_url(dir.path());

    with_env(&[("LENDFLOW_DATABASE_URL", url.as_str())], || {
        let before = parse_payload(&doctor::run(true));
        assert_eq!(before["overall_status"], "fail");
        assert_eq!(check_status(&before, "database_connectivity"), "pass");
        assert_eq!(check_status(&before, "schema_migrations"), "fail");

        assert_eq!(migrate::run().exit_code, 0);

        let after = parse_payload(&doctor::run(true));
        assert_eq!(after["overall_status"], "pass");
        assert_eq!(check_status(&after, "schema_migrations"), "pass");
    });
}

#[test]
fn doctor_skips_database_checks_when_config_is_invalid() {
    with_env(&[("LENDFLOW_WORKFLOW_TRANSACTION_TIMEOUT_SECS", "0")], || {
        let report = parse_payload(&doctor::run(true));
        assert_eq!(report["overall_status"], "fail");
        assert_eq!(check_status(&report, "config_validation"), "fail");
        assert_eq!(check_status(&report, "database_connectivity"), "skipped");
        assert_eq!(check_status(&report, "schema_migrations"), "skipped");
    });
}

#[test]
fn config_attributes_values_to_env_or_default() {
    with_env(
        &[("LENDFLOW_DATABASE_URL", "sqlite::memory:"), ("LENDFLOW_LOG_LEVEL", "debug")],
        || {
            let output = config::run();

            assert!(output.contains(
                "- database.url = sqlite::memory: (source: env (LENDFLOW_DATABASE_URL))"
            ));
            assert!(output.contains("- logging.level = debug (source: env (LENDFLOW_LOG_LEVEL))"));
            assert!(output
                .contains("- workflow.transaction_timeout_secs = 10 (source: default)"));
        },
    );
}

#[test]
fn workflow_commands_drive_an_application_to_approval() {
    let dir = tempfile::tempdir().expect("temp dir");
    let url = database_url(dir.path());

    with_env(&[("LENDFLOW_DATABASE_URL", url.as_str())], || {
        assert_eq!(seed::run().exit_code, 0, "seed the demo dataset");

        let moved = transition::run(TransitionArgs {
            application_id: "LA-DEMO-003".to_string(),
            stage: "finance".to_string(),
            target_role: None,
            actor_id: "sc-1".to_string(),
            actor_role: "Senior_Credit".to_string(),
            remarks: "credit checks complete".to_string(),
            correlation_id: Some("corr-finance".to_string()),
        });
        assert_eq!(moved.exit_code, 0, "{}", moved.output);
        let moved = parse_payload(&moved.output);
        assert_eq!(moved["data"]["assigned_to"], "fin-1");
        assert_eq!(moved["data"]["action"], "ASSIGNED_TO_FINANCE");

        let approved = approve::run(ApproveArgs {
            application_id: "LA-DEMO-003".to_string(),
            actor_id: "sc-1".to_string(),
            actor_role: "Senior_Credit".to_string(),
            terms: Some(
                r#"{"approved_amount": 100000, "interest_rate": 12, "tenure_months": 12,
                    "interest_type": "FLAT", "processing_fee_percent": "2",
                    "insurance_amount": 500, "stamp_duty": 100, "other_charges": 0}"#
                    .to_string(),
            ),
            terms_file: None,
            remarks: None,
            correlation_id: None,
        });
        assert_eq!(approved.exit_code, 0, "{}", approved.output);
        let approved = parse_payload(&approved.output);
        assert_eq!(approved["data"]["emi"]["emi_amount"], "9333.33");
        assert_eq!(
            decimal_at(&approved["data"]["charges"]["net_disbursal_amount"]),
            Some(Decimal::new(97_040, 0))
        );

        let shown = history::run("LA-DEMO-003");
        assert_eq!(shown.exit_code, 0, "{}", shown.output);
        let shown = parse_payload(&shown.output);
        assert_eq!(shown["data"]["application"]["credit_approved"], true);
        assert_eq!(shown["data"]["application"]["approver_id"], "fin-1");
        let logs = shown["data"]["logs"].as_array().cloned().unwrap_or_default();
        assert_eq!(logs.len(), 2, "finance assignment plus approval");
        assert_eq!(shown["data"]["approved_terms"]["approved_by"], "sc-1");
    });
}

#[test]
fn workflow_refusals_carry_interface_error_codes() {
    let dir = tempfile::tempdir().expect("temp dir");
    let url = database_url(dir.path());

    with_env(&[("LENDFLOW_DATABASE_URL", url.as_str())], || {
        assert_eq!(seed::run().exit_code, 0, "seed the demo dataset");

        let forbidden = transition::run(TransitionArgs {
            application_id: "LA-DEMO-001".to_string(),
            stage: "finance".to_string(),
            target_role: None,
            actor_id: "ops-1".to_string(),
            actor_role: "Ops".to_string(),
            remarks: "skip ahead".to_string(),
            correlation_id: Some("corr-forbidden".to_string()),
        });
        assert_eq!(forbidden.exit_code, 1);
        let forbidden = parse_payload(&forbidden.output);
        assert_eq!(forbidden["error_class"], "forbidden");
        assert_eq!(forbidden["data"]["correlation_id"], "corr-forbidden");

        let unknown = history::run("LA-MISSING");
        assert_eq!(unknown.exit_code, 1);
        assert_eq!(parse_payload(&unknown.output)["error_class"], "not_found");

        let out_of_range = score::run("LA-DEMO-002", 950, None);
        assert_eq!(out_of_range.exit_code, 1);
        assert_eq!(parse_payload(&out_of_range.output)["error_class"], "validation_error");

        let recorded = score::run("LA-DEMO-002", 700, None);
        assert_eq!(recorded.exit_code, 0, "{}", recorded.output);
    });
}

#[test]
fn workload_lists_active_approvers_of_a_role() {
    let dir = tempfile::tempdir().expect("temp dir");
    let url = database_url(dir.path());

    with_env(&[("LENDFLOW_DATABASE_URL", url.as_str())], || {
        assert_eq!(seed::run().exit_code, 0, "seed the demo dataset");

        let result = workload::run("Ops");
        assert_eq!(result.exit_code, 0, "{}", result.output);
        let payload = parse_payload(&result.output);
        let loads = payload["data"].as_array().cloned().unwrap_or_default();
        assert_eq!(loads.len(), 3);
        assert!(loads.iter().all(|load| load["open_applications"] == 0));

        let unknown = workload::run("Underwriter");
        assert_eq!(unknown.exit_code, 1);
        assert_eq!(parse_payload(&unknown.output)["error_class"], "validation_error");
    });
}

fn database_url(dir: &Path) -> String {
    format!("sqlite://{}?mode=rwc", dir.join("lendflow.db").display())
}

fn check_status(report: &Value, name: &str) -> String {
    report["checks"]
        .as_array()
        .and_then(|checks| checks.iter().find(|check| check["name"] == name))
        .and_then(|check| check["status"].as_str())
        .unwrap_or("missing")
        .to_string()
}

fn decimal_at(value: &Value) -> Option<Decimal> {
    value.as_str().and_then(|text| text.parse().ok())
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "LENDFLOW_DATABASE_URL",
        "LENDFLOW_DATABASE_MAX_CONNECTIONS",
        "LENDFLOW_DATABASE_TIMEOUT_SECS",
        "LENDFLOW_WORKFLOW_TRANSACTION_TIMEOUT_SECS",
        "LENDFLOW_WORKFLOW_ALLOW_CREDIT_PEER_REASSIGNMENT",
        "LENDFLOW_LOGGING_LEVEL",
        "LENDFLOW_LOGGING_FORMAT",
        "LENDFLOW_LOG_LEVEL",
        "LENDFLOW_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
