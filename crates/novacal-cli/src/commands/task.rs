//! Task management commands for CLI.

use chrono::{DateTime, Utc};
use clap::Subcommand;
use novacal_core::schedule::Task;
use novacal_core::storage::schedule_db::ScheduleDb;
use novacal_core::Config;

use super::{print_json, resolve_owner, CommandResult};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a new task
    Create {
        /// Task title
        title: String,
        /// Start time (RFC 3339)
        #[arg(long)]
        start: DateTime<Utc>,
        /// End time (RFC 3339)
        #[arg(long)]
        end: DateTime<Utc>,
        /// Deadline (RFC 3339); defaults to the end time
        #[arg(long)]
        due: Option<DateTime<Utc>>,
        /// Importance, higher is more urgent (default: config)
        #[arg(long)]
        importance: Option<u8>,
        /// Task description
        #[arg(long)]
        description: Option<String>,
        /// Related links
        #[arg(long)]
        links: Option<String>,
        /// Related files
        #[arg(long)]
        files: Option<String>,
    },
    /// List tasks
    List,
    /// Get task details
    Get {
        /// Task ID
        id: String,
    },
    /// Update a task
    Update {
        /// Task ID
        id: String,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New start time (RFC 3339)
        #[arg(long)]
        start: Option<DateTime<Utc>>,
        /// New end time (RFC 3339)
        #[arg(long)]
        end: Option<DateTime<Utc>>,
        /// New deadline (RFC 3339)
        #[arg(long)]
        due: Option<DateTime<Utc>>,
        /// New importance
        #[arg(long)]
        importance: Option<u8>,
        /// New description
        #[arg(long)]
        description: Option<String>,
        /// New links
        #[arg(long)]
        links: Option<String>,
        /// New files
        #[arg(long)]
        files: Option<String>,
    },
    /// Delete a task
    Delete {
        /// Task ID
        id: String,
    },
}

pub fn run(action: TaskAction, owner: Option<String>) -> CommandResult {
    let owner = resolve_owner(owner);
    let db = ScheduleDb::open()?;

    match action {
        TaskAction::Create {
            title,
            start,
            end,
            due,
            importance,
            description,
            links,
            files,
        } => {
            let importance =
                importance.unwrap_or_else(|| Config::load_or_default().splitting.default_importance);
            let mut task = Task::new(owner, title, start, end).with_importance(importance);
            task.due = due;
            task.description = description.unwrap_or_default();
            task.links = links.unwrap_or_default();
            task.files = files.unwrap_or_default();
            db.create_task(&task)?;
            print_json(&task)?;
        }
        TaskAction::List => {
            print_json(&db.list_tasks(&owner)?)?;
        }
        TaskAction::Get { id } => {
            let task = find_owned(&db, &owner, &id)?;
            print_json(&task)?;
        }
        TaskAction::Update {
            id,
            title,
            start,
            end,
            due,
            importance,
            description,
            links,
            files,
        } => {
            let mut task = find_owned(&db, &owner, &id)?;

            if let Some(t) = title { task.title = t; }
            if let Some(s) = start { task.start = s; }
            if let Some(e) = end { task.end = e; }
            if let Some(d) = due { task.due = Some(d); }
            if let Some(i) = importance { task.importance = i; }
            if let Some(d) = description { task.description = d; }
            if let Some(l) = links { task.links = l; }
            if let Some(f) = files { task.files = f; }

            db.update_task(&task)?;
            print_json(&task)?;
        }
        TaskAction::Delete { id } => {
            find_owned(&db, &owner, &id)?;
            db.delete_task(&id)?;
            println!("Task deleted: {id}");
        }
    }
    Ok(())
}

fn find_owned(db: &ScheduleDb, owner: &str, id: &str) -> Result<Task, Box<dyn std::error::Error>> {
    db.get_task(id)?
        .filter(|task| task.owner_id == owner)
        .ok_or_else(|| format!("Task not found: {id}").into())
}
