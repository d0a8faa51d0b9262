//! Data models for the projects/tasks backend.
//!
//! - `Project`, `ProjectRequest`, `Progress`: projects and their completion summary
//! - `Task`, `TaskRequest`: tasks belonging to a project
//! - `TaskFilter`, `Page`: the filtered, sorted, paged task listing

pub mod project;
pub mod task;

use thiserror::Error;

pub use project::{Progress, Project, ProjectRequest};
pub use task::{Page, SortDirection, StatusFilter, Task, TaskFilter, TaskRequest, TaskSortColumn};

/// Client-side form validation failures, checked before anything is sent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Title is required")]
    TitleRequired,

    #[error("Due date must be YYYY-MM-DD, got '{0}'")]
    InvalidDueDate(String),

    #[error("Email and password are required")]
    MissingCredentials,
}
