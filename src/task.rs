// Task record and its state

use chrono::{Local, NaiveDate};
use eyre::{Result, eyre};
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

/// Format of the `deadline` field
pub const DEADLINE_FORMAT: &str = "%Y-%m-%d";

/// Shown in place of a missing state or deadline
pub const NOT_SET: &str = "Not set";

/// Shown in place of an empty summary
pub const NO_SUMMARY: &str = "No summary was provided for this task";

/// Progress of a task
///
/// Stored as its display string. Values loaded from storage that are missing
/// or not one of the known states are kept verbatim in `Unset` so that a
/// load/save cycle never rewrites foreign data.
///
/// `Unset` holds only strings that are not one of the known states. Build
/// states from strings with `TaskState::from(Some(raw))`, which maps known
/// names to their variants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub enum TaskState {
    Done,
    NotDone,
    DoingRightNow,
    /// Missing or unrecognized stored value
    Unset(String),
}

impl TaskState {
    /// The stored string for this state
    pub fn as_str(&self) -> &str {
        match self {
            TaskState::Done => "Done",
            TaskState::NotDone => "Not done",
            TaskState::DoingRightNow => "Doing right now",
            TaskState::Unset(raw) => raw,
        }
    }

    pub fn is_set(&self) -> bool {
        !matches!(self, TaskState::Unset(_))
    }
}

impl Default for TaskState {
    fn default() -> Self {
        TaskState::Unset(String::new())
    }
}

impl From<Option<String>> for TaskState {
    fn from(value: Option<String>) -> Self {
        match value.as_deref() {
            Some("Done") => TaskState::Done,
            Some("Not done") => TaskState::NotDone,
            Some("Doing right now") => TaskState::DoingRightNow,
            _ => TaskState::Unset(value.unwrap_or_default()),
        }
    }
}

impl From<TaskState> for String {
    fn from(state: TaskState) -> Self {
        match state {
            TaskState::Unset(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for TaskState {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "done" => Ok(TaskState::Done),
            "not done" | "notdone" | "not-done" => Ok(TaskState::NotDone),
            "doing right now" | "doing" => Ok(TaskState::DoingRightNow),
            other => Err(eyre!(
                "Unknown state: {} (expected 'Done', 'Not done' or 'Doing right now')",
                other
            )),
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_set() {
            write!(f, "{}", self.as_str())
        } else {
            write!(f, "{}", NOT_SET)
        }
    }
}

/// A single to-do record
///
/// Every field defaults to empty when absent from stored data.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Task {
    #[serde(deserialize_with = "null_as_empty")]
    pub title: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub summary: String,
    pub state: TaskState,
    /// `YYYY-MM-DD`, or empty
    #[serde(deserialize_with = "null_as_empty")]
    pub deadline: String,
}

/// Stored `null` reads as an empty string
fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl Task {
    pub fn new(
        title: impl Into<String>,
        summary: impl Into<String>,
        state: TaskState,
        deadline: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            summary: summary.into(),
            state,
            deadline: deadline.into(),
        }
    }

    /// Parsed deadline; `None` when empty or not a valid date
    pub fn deadline_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.deadline.trim(), DEADLINE_FORMAT).ok()
    }

    pub fn summary_label(&self) -> &str {
        if self.summary.is_empty() { NO_SUMMARY } else { &self.summary }
    }

    pub fn deadline_label(&self) -> &str {
        if self.deadline.is_empty() { NOT_SET } else { &self.deadline }
    }
}

/// Today's local date as a deadline string
pub fn today() -> String {
    Local::now().date_naive().format(DEADLINE_FORMAT).to_string()
}

/// Validate a user-supplied deadline; empty is allowed
pub fn parse_deadline(s: &str) -> Result<String> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(String::new());
    }
    let date = NaiveDate::parse_from_str(s, DEADLINE_FORMAT)
        .map_err(|e| eyre!("Invalid deadline: {} (expected YYYY-MM-DD): {}", s, e))?;
    Ok(date.format(DEADLINE_FORMAT).to_string())
}
