use serde::{Deserialize, Serialize};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

pub const DEFAULT_PROJECT: &str = "Inbox";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default = "default_project")]
    pub project: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Incoming task body for `POST /api/tasks`, `PUT /api/tasks/{id}` and
/// imports. Every field is optional so the repository can tell "absent"
/// apart from "present".
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TaskInput {
    pub id: Option<String>,
    pub title: Option<String>,
    pub done: Option<bool>,
    pub project: Option<String>,
    pub priority: Option<i32>,
    pub due: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NewProject {
    pub name: String,
}

/// Full application state as exported, imported and mirrored by the client.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub tasks: Vec<Task>,
    pub projects: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ImportPayload {
    #[serde(default)]
    pub tasks: Vec<TaskInput>,
    pub projects: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub total: usize,
    pub done: usize,
    pub pending: usize,
    pub rate: u32,
    pub rate_label: String,
}

impl Analytics {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let total = tasks.len();
        let done = tasks.iter().filter(|task| task.done).count();
        let rate = if total == 0 {
            0
        } else {
            // round half up, same as Math.round for non-negative values
            ((done * 200 + total) / (total * 2)) as u32
        };
        Self {
            total,
            done,
            pending: total - done,
            rate,
            rate_label: format!("{}%", rate),
        }
    }
}

fn default_project() -> String {
    DEFAULT_PROJECT.to_string()
}

pub fn now_iso() -> String {
    OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default()
}
