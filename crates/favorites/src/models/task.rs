//! Background task model (summarization/embedding jobs run by the server)

use log::debug;
use serde::{Deserialize, Deserializer, Serialize};

/// Lifecycle state of a background task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum TaskStatus {
    Pending,
    Running,
    Done,
    Failed,
}

impl TaskStatus {
    /// Parse a status string, accepting the spellings servers actually send
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" | "queued" => TaskStatus::Pending,
            "running" | "in_progress" | "processing" | "started" => TaskStatus::Running,
            "done" | "completed" | "complete" | "success" => TaskStatus::Done,
            "failed" | "error" => TaskStatus::Failed,
            other => {
                debug!("Unknown task status {:?}, treating as pending", other);
                TaskStatus::Pending
            }
        }
    }

    /// Whether the task has reached a terminal state
    pub fn is_finished(self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Done => "done",
            TaskStatus::Failed => "failed",
        }
    }
}

impl From<String> for TaskStatus {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

/// A server-tracked unit of asynchronous work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    #[serde(default, alias = "title")]
    pub name: String,
    pub status: TaskStatus,
    /// Completion percentage, 0..=100
    #[serde(default, deserialize_with = "deserialize_progress")]
    pub progress: u8,
}

impl Task {
    pub fn new(id: impl Into<String>, name: impl Into<String>, status: TaskStatus, progress: u8) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status,
            progress: progress.min(100),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawProgress {
    Number(f64),
    Text(String),
}

impl RawProgress {
    fn percent(self) -> u8 {
        let value = match self {
            RawProgress::Number(n) => n,
            RawProgress::Text(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        };
        if !value.is_finite() || value <= 0.0 {
            0
        } else if value >= 100.0 {
            100
        } else {
            value.floor() as u8
        }
    }
}

/// Progress arrives as a number or a numeric string ("0", "100")
fn deserialize_progress<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawProgress>::deserialize(deserializer)?;
    Ok(raw.map(RawProgress::percent).unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_aliases() {
        assert_eq!(TaskStatus::parse("completed"), TaskStatus::Done);
        assert_eq!(TaskStatus::parse("DONE"), TaskStatus::Done);
        assert_eq!(TaskStatus::parse("in_progress"), TaskStatus::Running);
        assert_eq!(TaskStatus::parse("failed"), TaskStatus::Failed);
        assert_eq!(TaskStatus::parse("pending"), TaskStatus::Pending);
        assert_eq!(TaskStatus::parse("something-new"), TaskStatus::Pending);
    }

    #[test]
    fn test_deserialize_string_progress() {
        let json = r#"[
            {"id": "a", "name": "Process favorite: https://a.example", "status": "pending", "progress": "0"},
            {"id": "b", "name": "Process favorite: https://b.example", "status": "completed", "progress": "100"},
            {"id": "c", "title": "Summarize", "status": "running", "progress": 42.7}
        ]"#;

        let tasks: Vec<Task> = serde_json::from_str(json).unwrap();
        assert_eq!(tasks[0].progress, 0);
        assert_eq!(tasks[1].status, TaskStatus::Done);
        assert_eq!(tasks[1].progress, 100);
        assert_eq!(tasks[2].name, "Summarize");
        assert_eq!(tasks[2].progress, 42);
    }

    #[test]
    fn test_progress_is_clamped() {
        let json = r#"[
            {"id": "a", "status": "running", "progress": 250},
            {"id": "b", "status": "running", "progress": "-5"},
            {"id": "c", "status": "running", "progress": "abc"},
            {"id": "d", "status": "running", "progress": null},
            {"id": "e", "status": "running"}
        ]"#;

        let tasks: Vec<Task> = serde_json::from_str(json).unwrap();
        let progress: Vec<u8> = tasks.iter().map(|t| t.progress).collect();
        assert_eq!(progress, vec![100, 0, 0, 0, 0]);
    }

    #[test]
    fn test_serialize_uses_canonical_status() {
        let task = Task::new("a", "Summarize", TaskStatus::Done, 100);
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["status"], "done");
        assert_eq!(json["progress"], 100);
    }
}
