pub mod config;
pub mod custom;
pub mod hours;
pub mod schedule;
pub mod task;

use novacal_core::Config;

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Owner given on the command line, else the configured one.
pub fn resolve_owner(owner: Option<String>) -> String {
    let owner = owner.unwrap_or_else(|| Config::load_or_default().owner);
    tracing::debug!(owner = %owner, "resolved owner");
    owner
}

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> CommandResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
