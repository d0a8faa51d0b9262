use serde::{Deserialize, Serialize};

use super::ValidationError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "userId", default)]
    pub user_id: Option<i64>,
}

impl Project {
    pub fn description_display(&self) -> &str {
        self.description
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or("No description")
    }
}

/// Body for `POST /projects` and `PUT /projects/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProjectRequest {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ProjectRequest {
    pub fn new(title: &str, description: &str) -> Self {
        let description = description.trim();
        Self {
            title: title.trim().to_string(),
            description: (!description.is_empty()).then(|| description.to_string()),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::TitleRequired);
        }
        Ok(())
    }
}

/// Completion summary from `GET /projects/{id}/progress`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    #[serde(rename = "totalTasks")]
    pub total_tasks: u32,
    #[serde(rename = "completedTasks")]
    pub completed_tasks: u32,
    #[serde(rename = "progressPercentage")]
    pub progress_percentage: f64,
}

impl Progress {
    /// Percentage rounded for display, clamped to 0..=100.
    pub fn percent(&self) -> u16 {
        self.progress_percentage.round().clamp(0.0, 100.0) as u16
    }

    /// Gauge ratio in 0.0..=1.0
    pub fn ratio(&self) -> f64 {
        if !self.progress_percentage.is_finite() {
            return 0.0;
        }
        (self.progress_percentage / 100.0).clamp(0.0, 1.0)
    }

    pub fn summary(&self) -> String {
        format!("{} / {} tasks completed", self.completed_tasks, self.total_tasks)
    }
}
