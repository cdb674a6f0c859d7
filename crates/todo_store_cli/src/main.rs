//! CLI smoke check for the to-do store.
//!
//! # Responsibility
//! - Open the store configured through `TODO_STORE_*` variables.
//! - Print deterministic `key=value` lines for quick local sanity checks.

use std::process::ExitCode;
use todo_store_core::{
    core_version, flush_logging, init_logging, ping, CrudRepository, PersistenceGateway,
    StoreConfig,
};

fn main() -> ExitCode {
    let code = match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("event=cli_run module=cli status=error error={err}");
            println!("error={err}");
            ExitCode::FAILURE
        }
    };
    // The logger handle lives in a static and is never dropped.
    flush_logging();
    code
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = StoreConfig::from_env()?;
    if let Some(log) = &config.log {
        init_logging(log)?;
    }

    println!("todo_store ping={}", ping());
    println!("todo_store version={}", core_version());

    let gateway = PersistenceGateway::open(&config)?;
    println!("schema_version={}", gateway.schema_version()?);
    println!("todos={}", gateway.todos().count()?);
    println!("users={}", gateway.users().count()?);
    Ok(())
}
