mod config;
pub mod memory;
pub mod migrations;
mod repository;
pub mod schedule_db;

pub use config::{Config, SchedulerSection, SplittingSection};
pub use memory::MemoryRepository;
pub use repository::TaskRepository;
pub use schedule_db::ScheduleDb;

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the data directory, creating it if needed.
///
/// `NOVACAL_DATA_DIR` wins when set. Otherwise `~/.config/novacal[-dev]/`,
/// with `NOVACAL_ENV=dev` selecting the development directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("NOVACAL_DATA_DIR") {
        Some(custom) => PathBuf::from(custom),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("NOVACAL_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("novacal-dev")
            } else {
                base_dir.join("novacal")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
