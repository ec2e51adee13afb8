//! Custom task commands: create (runs the block splitter), list, get, delete.

use chrono::{DateTime, Utc};
use clap::Subcommand;
use novacal_core::schedule::CustomTask;
use novacal_core::storage::schedule_db::ScheduleDb;
use novacal_core::{BlockSplitter, Config};
use serde::Serialize;
use uuid::Uuid;

use super::{print_json, resolve_owner, CommandResult};

#[derive(Subcommand)]
pub enum CustomAction {
    /// Create a custom task and its child blocks
    Create {
        /// Custom task name
        name: String,
        /// Earliest start (RFC 3339)
        #[arg(long)]
        start: DateTime<Utc>,
        /// Deadline (RFC 3339)
        #[arg(long)]
        due: DateTime<Utc>,
        /// Total length in minutes
        #[arg(long)]
        total_minutes: i64,
        /// Block length in minutes (default: config)
        #[arg(long)]
        block_minutes: Option<i64>,
        /// Keep the task in one piece
        #[arg(long)]
        no_split: bool,
        /// Importance, higher is more urgent (default: config)
        #[arg(long)]
        importance: Option<u8>,
        /// Description copied to every block
        #[arg(long)]
        description: Option<String>,
        /// Links copied to every block
        #[arg(long)]
        links: Option<String>,
        /// Files copied to every block
        #[arg(long)]
        files: Option<String>,
    },
    /// List custom tasks
    List,
    /// Get a custom task with its child tasks
    Get {
        /// Custom task ID
        id: String,
    },
    /// Delete a custom task (child tasks are kept)
    Delete {
        /// Custom task ID
        id: String,
    },
}

#[derive(Serialize)]
struct CustomTaskView {
    custom_task: CustomTask,
    tasks: Vec<novacal_core::Task>,
}

pub fn run(action: CustomAction, owner: Option<String>) -> CommandResult {
    let owner = resolve_owner(owner);
    let db = ScheduleDb::open()?;

    match action {
        CustomAction::Create {
            name,
            start,
            due,
            total_minutes,
            block_minutes,
            no_split,
            importance,
            description,
            links,
            files,
        } => {
            let defaults = Config::load_or_default().splitting;
            let custom = CustomTask {
                id: Uuid::new_v4().to_string(),
                owner_id: owner,
                name,
                description: description.unwrap_or_default(),
                links: links.unwrap_or_default(),
                files: files.unwrap_or_default(),
                overall_start: start,
                overall_due: due,
                total_length_minutes: total_minutes,
                importance: importance.unwrap_or(defaults.default_importance),
                split_enabled: !no_split,
                block_duration_minutes: block_minutes
                    .unwrap_or_else(|| i64::from(defaults.default_block_minutes)),
                created_at: Utc::now(),
            };
            let created = BlockSplitter::new(&db).create_custom_task(custom)?;
            print_json(&created)?;
        }
        CustomAction::List => {
            print_json(&db.list_custom_tasks(&owner)?)?;
        }
        CustomAction::Get { id } => {
            let custom_task = db
                .get_custom_task(&id)?
                .filter(|ct| ct.owner_id == owner)
                .ok_or_else(|| format!("Custom task not found: {id}"))?;
            let tasks = db.list_child_tasks(&id)?;
            print_json(&CustomTaskView { custom_task, tasks })?;
        }
        CustomAction::Delete { id } => {
            let owned = db
                .get_custom_task(&id)?
                .is_some_and(|ct| ct.owner_id == owner);
            if !owned || !db.delete_custom_task(&id)? {
                return Err(format!("Custom task not found: {id}").into());
            }
            println!("Custom task deleted: {id}");
        }
    }
    Ok(())
}
