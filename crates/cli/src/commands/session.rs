use std::future::Future;

use lendflow_core::config::{AppConfig, LoadOptions};
use lendflow_core::{LoanWorkflow, WorkflowError};
use lendflow_db::{connect_with_config, SqlWorkflowStore};
use tokio::runtime::Runtime;

use crate::commands::CommandResult;

/// Loaded configuration plus a current-thread runtime, the setup every
/// database-backed command starts from.
pub(crate) struct Session {
    pub(crate) config: AppConfig,
    runtime: Runtime,
}

impl Session {
    pub(crate) fn open(command: &str) -> Result<Self, CommandResult> {
        let config = AppConfig::load(LoadOptions::default()).map_err(|error| {
            CommandResult::failure(
                command,
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            )
        })?;

        let runtime =
            tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
                CommandResult::failure(
                    command,
                    "runtime_init",
                    format!("failed to initialize async runtime: {error}"),
                    3,
                )
            })?;

        Ok(Self { config, runtime })
    }

    pub(crate) fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Runs one workflow operation against the configured database. The
    /// schema is expected to be migrated already.
    pub(crate) fn run_workflow<T, F, Fut>(
        &self,
        command: &str,
        correlation_id: &str,
        operation: F,
    ) -> Result<T, CommandResult>
    where
        F: FnOnce(LoanWorkflow<SqlWorkflowStore>) -> Fut,
        Fut: Future<Output = Result<T, WorkflowError>>,
    {
        self.runtime.block_on(async {
            let pool = connect_with_config(&self.config.database).await.map_err(|error| {
                CommandResult::failure(command, "db_connectivity", error.to_string(), 4)
            })?;

            let workflow = LoanWorkflow::new(
                SqlWorkflowStore::new(pool.clone()),
                self.config.workflow.policy(),
            );
            let result = operation(workflow).await;
            pool.close().await;

            result.map_err(|error| CommandResult::rejected(command, error, correlation_id))
        })
    }
}

pub(crate) fn correlation_id(explicit: Option<String>) -> String {
    explicit.unwrap_or_else(|| format!("cli-{}", uuid::Uuid::new_v4()))
}
