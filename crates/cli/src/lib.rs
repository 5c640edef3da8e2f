pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use lendflow_core::config::{AppConfig, LoadOptions, LogFormat, LoggingConfig};
use rust_decimal::Decimal;

use crate::commands::approve::ApproveArgs;
use crate::commands::transition::TransitionArgs;

#[derive(Debug, Parser)]
#[command(
    name = "lendflow",
    about = "Lendflow loan approval workflow CLI",
    long_about = "Operate the loan approval workflow: schema migrations, readiness checks, demo data, stage transitions, and loan finalization.",
    after_help = "Examples:\n  lendflow migrate\n  lendflow seed\n  lendflow transition LA-DEMO-001 --stage ops --actor ops-1 --actor-role Ops --remarks \"docs verified\"\n  lendflow emi --principal 100000 --rate 12 --tenure 12 --interest-type REDUCING"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load and verify the demo approvers, credit rules, and applications")]
    Seed,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config, DB connectivity, and migration state")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Preview an EMI without touching the database")]
    Emi {
        #[arg(long, help = "Loan principal")]
        principal: Decimal,
        #[arg(long, help = "Annual interest rate in percent")]
        rate: Decimal,
        #[arg(long, help = "Tenure in months")]
        tenure: u32,
        #[arg(long, help = "FLAT (default) or REDUCING")]
        interest_type: Option<String>,
    },
    #[command(about = "Record the credit bureau score of an application")]
    Score {
        application_id: String,
        #[arg(allow_negative_numbers = true)]
        score: i32,
        #[arg(long)]
        correlation_id: Option<String>,
    },
    #[command(about = "Move an application to its next stage")]
    Transition {
        application_id: String,
        #[arg(
            long,
            help = "ops, senior_ops, credit, credit_level, finance, disbursal, or reject"
        )]
        stage: String,
        #[arg(long, help = "Target role for credit_level reassignment")]
        target_role: Option<String>,
        #[arg(long = "actor", help = "Approver id of the caller")]
        actor_id: String,
        #[arg(long, help = "Role of the caller, e.g. Ops or CreditSenior")]
        actor_role: String,
        #[arg(long)]
        remarks: String,
        #[arg(long)]
        correlation_id: Option<String>,
    },
    #[command(about = "Finalize an application with approved terms, EMI, and charges")]
    Approve {
        application_id: String,
        #[arg(long = "actor", help = "Approver id of the caller")]
        actor_id: String,
        #[arg(long, help = "Role of the caller")]
        actor_role: String,
        #[arg(long, help = "Loan terms as a JSON object")]
        terms: Option<String>,
        #[arg(long, help = "Path to a JSON file holding the loan terms")]
        terms_file: Option<PathBuf>,
        #[arg(long)]
        remarks: Option<String>,
        #[arg(long)]
        correlation_id: Option<String>,
    },
    #[command(about = "Show an application's state, transition log, and approved terms")]
    History { application_id: String },
    #[command(about = "Show open-application load for every active approver of a role")]
    Workload { role: String },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let logging = AppConfig::load(LoadOptions::default())
        .map(|config| config.logging)
        .unwrap_or_else(|_| AppConfig::default().logging);
    init_logging(&logging);

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Emi { principal, rate, tenure, interest_type } => {
            commands::emi::run(principal, rate, tenure, interest_type.as_deref())
        }
        Command::Score { application_id, score, correlation_id } => {
            commands::score::run(&application_id, score, correlation_id)
        }
        Command::Transition {
            application_id,
            stage,
            target_role,
            actor_id,
            actor_role,
            remarks,
            correlation_id,
        } => commands::transition::run(TransitionArgs {
            application_id,
            stage,
            target_role,
            actor_id,
            actor_role,
            remarks,
            correlation_id,
        }),
        Command::Approve {
            application_id,
            actor_id,
            actor_role,
            terms,
            terms_file,
            remarks,
            correlation_id,
        } => commands::approve::run(ApproveArgs {
            application_id,
            actor_id,
            actor_role,
            terms,
            terms_file,
            remarks,
            correlation_id,
        }),
        Command::History { application_id } => commands::history::run(&application_id),
        Command::Workload { role } => commands::workload::run(&role),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Diagnostics go to stderr so stdout carries only the command payload.
fn init_logging(logging: &LoggingConfig) {
    use tracing::Level;

    let log_level = logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    match logging.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Command};

    #[test]
    fn transition_arguments_parse() {
        let cli = Cli::try_parse_from([
            "lendflow",
            "transition",
            "LA-1",
            "--stage",
            "credit_level",
            "--target-role",
            "Senior_Credit",
            "--actor",
            "cs-1",
            "--actor-role",
            "CreditSenior",
            "--remarks",
            "needs senior review",
        ])
        .expect("parse transition");

        match cli.command {
            Command::Transition { application_id, stage, target_role, actor_id, .. } => {
                assert_eq!(application_id, "LA-1");
                assert_eq!(stage, "credit_level");
                assert_eq!(target_role.as_deref(), Some("Senior_Credit"));
                assert_eq!(actor_id, "cs-1");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn score_accepts_negative_values_for_validation_downstream() {
        let cli = Cli::try_parse_from(["lendflow", "score", "LA-1", "-5"]).expect("parse score");
        assert!(matches!(cli.command, Command::Score { score: -5, .. }));
    }

    #[test]
    fn emi_requires_principal_rate_and_tenure() {
        assert!(Cli::try_parse_from(["lendflow", "emi", "--principal", "1000"]).is_err());
        assert!(Cli::try_parse_from([
            "lendflow",
            "emi",
            "--principal",
            "1000.50",
            "--rate",
            "10.5",
            "--tenure",
            "6"
        ])
        .is_ok());
    }
}
