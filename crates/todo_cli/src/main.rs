//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `todo_core` linkage, configuration and database bootstrap.
//! - Print a deterministic summary of both collections.

use log::warn;
use std::process::ExitCode;
use todo_core::{CoreConfig, PriorityService, SqlitePriorityStore, SqliteTodoStore, TodoService};

fn main() -> ExitCode {
    let config = CoreConfig::from_env();

    if let Some(log_dir) = &config.log_dir {
        if let Err(err) = todo_core::init_logging(&config.log_level, log_dir) {
            eprintln!("todo_cli logging disabled: {err}");
        }
    }

    println!("todo_core ping={}", todo_core::ping());
    println!("todo_core version={}", todo_core::core_version());

    match summarize(&config) {
        Ok((priorities, todos)) => {
            println!("todo_core priorities={priorities} todos={todos}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            warn!("event=cli_summary module=cli status=error error={err}");
            eprintln!("todo_cli error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn summarize(config: &CoreConfig) -> Result<(i64, i64), Box<dyn std::error::Error>> {
    let conn = config.open_database()?;
    let priorities =
        PriorityService::with_retry_policy(SqlitePriorityStore::try_new(&conn)?, config.retry);
    let todos = TodoService::with_retry_policy(SqliteTodoStore::try_new(&conn)?, config.retry);
    Ok((priorities.count()?, todos.count()?))
}
