// tasklist - Single-user task list with sort/filter views and key-value persistence

pub mod config;
pub mod storage;
pub mod store;
pub mod task;
pub mod view;

// Re-export main types for convenience
pub use config::Config;
pub use storage::{FileStorage, KeyValueStore, MemoryStorage, TASKS_KEY};
pub use store::TaskStore;
pub use task::{Task, TaskState};
pub use view::{DisplayedTask, SortKey, StateFilter, displayed_tasks};
