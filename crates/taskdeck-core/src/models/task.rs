use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::ValidationError;

/// Default page size for the filtered task list.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "dueDate", default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub completed: bool,
    #[serde(rename = "projectId")]
    pub project_id: i64,
}

impl Task {
    /// Request that flips the completion flag, leaving everything else as-is.
    pub fn toggled(&self) -> TaskRequest {
        TaskRequest {
            title: self.title.clone(),
            description: self.description.clone(),
            due_date: self.due_date,
            completed: !self.completed,
            project_id: self.project_id,
        }
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.completed && self.due_date.is_some_and(|due| due < today)
    }
}

/// Body for `POST /tasks` and `PUT /tasks/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskRequest {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "dueDate", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    pub completed: bool,
    #[serde(rename = "projectId")]
    pub project_id: i64,
}

impl TaskRequest {
    /// Build a new, open task from form input. The due date must be
    /// `YYYY-MM-DD` or empty.
    pub fn from_form(
        project_id: i64,
        title: &str,
        description: &str,
        due_date: &str,
    ) -> Result<Self, ValidationError> {
        let due_date = match due_date.trim() {
            "" => None,
            s => Some(
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .map_err(|_| ValidationError::InvalidDueDate(s.to_string()))?,
            ),
        };
        let description = description.trim();

        let request = Self {
            title: title.trim().to_string(),
            description: (!description.is_empty()).then(|| description.to_string()),
            due_date,
            completed: false,
            project_id,
        };
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::TitleRequired);
        }
        Ok(())
    }
}

/// Completion filter for the task list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Open,
    Done,
}

impl StatusFilter {
    pub fn completed(&self) -> Option<bool> {
        match self {
            StatusFilter::All => None,
            StatusFilter::Open => Some(false),
            StatusFilter::Done => Some(true),
        }
    }

    pub fn next(&self) -> Self {
        match self {
            StatusFilter::All => StatusFilter::Open,
            StatusFilter::Open => StatusFilter::Done,
            StatusFilter::Done => StatusFilter::All,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StatusFilter::All => "All",
            StatusFilter::Open => "Open",
            StatusFilter::Done => "Done",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TaskSortColumn {
    #[default]
    Id,
    Title,
    DueDate,
    Completed,
}

impl TaskSortColumn {
    /// Field name understood by the backend's `sortBy` parameter
    pub fn field(&self) -> &'static str {
        match self {
            TaskSortColumn::Id => "id",
            TaskSortColumn::Title => "title",
            TaskSortColumn::DueDate => "dueDate",
            TaskSortColumn::Completed => "completed",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            TaskSortColumn::Id => TaskSortColumn::Title,
            TaskSortColumn::Title => TaskSortColumn::DueDate,
            TaskSortColumn::DueDate => TaskSortColumn::Completed,
            TaskSortColumn::Completed => TaskSortColumn::Id,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskSortColumn::Id => "Created",
            TaskSortColumn::Title => "Title",
            TaskSortColumn::DueDate => "Due date",
            TaskSortColumn::Completed => "Status",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    pub fn toggle(&self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

/// Query for `GET /tasks/filter`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFilter {
    pub project_id: i64,
    pub search: String,
    pub status: StatusFilter,
    pub sort_by: TaskSortColumn,
    pub direction: SortDirection,
    pub page: u32,
    pub size: u32,
}

impl TaskFilter {
    pub fn new(project_id: i64) -> Self {
        Self {
            project_id,
            search: String::new(),
            status: StatusFilter::default(),
            sort_by: TaskSortColumn::default(),
            direction: SortDirection::default(),
            page: 0,
            size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, size: u32) -> Self {
        self.size = size.max(1);
        self
    }

    /// Query-string pairs. Empty search and the `All` status are omitted so
    /// the backend applies no filter for them.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("projectId", self.project_id.to_string())];
        let search = self.search.trim();
        if !search.is_empty() {
            pairs.push(("search", search.to_string()));
        }
        if let Some(completed) = self.status.completed() {
            pairs.push(("completed", completed.to_string()));
        }
        pairs.push(("sortBy", self.sort_by.field().to_string()));
        pairs.push(("sortDirection", self.direction.as_str().to_string()));
        pairs.push(("page", self.page.to_string()));
        pairs.push(("size", self.size.to_string()));
        pairs
    }
}

/// One page of results from a paged endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub content: Vec<T>,
    #[serde(rename = "pageNumber", alias = "number", default)]
    pub page_number: u32,
    #[serde(rename = "pageSize", alias = "size", default)]
    pub page_size: u32,
    #[serde(rename = "totalElements", default)]
    pub total_elements: u64,
    #[serde(rename = "totalPages", default)]
    pub total_pages: u32,
    #[serde(alias = "isFirst", default = "default_true")]
    pub first: bool,
    #[serde(alias = "isLast", default = "default_true")]
    pub last: bool,
}

fn default_true() -> bool {
    true
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            content: Vec::new(),
            page_number: 0,
            page_size: DEFAULT_PAGE_SIZE,
            total_elements: 0,
            total_pages: 0,
            first: true,
            last: true,
        }
    }
}

impl<T> Page<T> {
    /// "Page 2 of 5"; an empty result still reads as page 1 of 1.
    pub fn label(&self) -> String {
        format!("Page {} of {}", self.page_number + 1, self.total_pages.max(1))
    }
}
