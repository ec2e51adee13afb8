//! # Novacal Core Library
//!
//! This library provides the scheduling engine behind Novacal: placing tasks
//! into free working time and splitting long tasks into blocks. All
//! operations are available via the standalone `novacal-cli` binary, which is
//! a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Timeline**: Half-open intervals and free-slot computation inside a day window
//! - **Scheduler**: Deadline-first, first-fit allocation across days, and
//!   conflict-avoiding block splitting of custom tasks
//! - **Storage**: Repository trait with SQLite and in-memory implementations,
//!   plus TOML-based configuration
//!
//! ## Key Components
//!
//! - [`AutoScheduler`]: Places a batch of tasks into free slots
//! - [`BlockSplitter`]: Creates a custom task and its child blocks
//! - [`TaskRepository`]: Storage contract both algorithms run against
//! - [`ScheduleDb`]: SQLite persistence
//! - [`Config`]: Application configuration management

pub mod error;
pub mod schedule;
pub mod scheduler;
pub mod storage;
pub mod timeline;

pub use error::{ConfigError, CoreError, DatabaseError, ErrorKind, SchedulingError, ValidationError};
pub use schedule::{CustomTask, Placement, Task, WorkingHours, WorkingWindow};
pub use scheduler::{
    AutoScheduler, BlockSplitter, CreatedCustomTask, OwnerLocks, ScheduleOutcome, SchedulerConfig,
    SplitOutcome,
};
pub use storage::{Config, MemoryRepository, ScheduleDb, TaskRepository};
pub use timeline::{free_slots, FreeSlotFinder, Interval};
