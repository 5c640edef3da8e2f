use crate::commands::session::Session;
use crate::commands::CommandResult;
use lendflow_db::{connect_with_config, migrations};

pub fn run() -> CommandResult {
    let session = match Session::open("migrate") {
        Ok(session) => session,
        Err(failure) => return failure,
    };

    let result = session.block_on(async {
        let pool = connect_with_config(&session.config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;
        pool.close().await;
        Ok::<(), (&'static str, String, u8)>(())
    });

    match result {
        Ok(()) => CommandResult::success("migrate", "applied pending migrations"),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("migrate", error_class, message, exit_code)
        }
    }
}
