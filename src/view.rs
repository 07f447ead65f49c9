// Sorted and filtered projection of the task collection

use crate::task::{Task, TaskState};
use eyre::{Result, eyre};
use std::cmp::Ordering;
use std::str::FromStr;

/// Ordering applied to the displayed view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Insertion order
    #[default]
    Canonical,
    Done,     // 'Done' first
    Doing,    // 'Doing right now' first
    NotDone,  // 'Not done' first
    Deadline, // earliest first, undated last
}

impl SortKey {
    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::Canonical => "none",
            SortKey::Done => "done",
            SortKey::Doing => "doing",
            SortKey::NotDone => "notdone",
            SortKey::Deadline => "deadline",
        }
    }

    /// State moved to the front by a partition sort
    fn leading_state(self) -> Option<TaskState> {
        match self {
            SortKey::Done => Some(TaskState::Done),
            SortKey::Doing => Some(TaskState::DoingRightNow),
            SortKey::NotDone => Some(TaskState::NotDone),
            SortKey::Canonical | SortKey::Deadline => None,
        }
    }
}

impl FromStr for SortKey {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" => Ok(SortKey::Canonical),
            "done" => Ok(SortKey::Done),
            "doing" => Ok(SortKey::Doing),
            "notdone" => Ok(SortKey::NotDone),
            "deadline" => Ok(SortKey::Deadline),
            other => Err(eyre!(
                "Unknown sort key: {} (expected done, doing, notdone, deadline or none)",
                other
            )),
        }
    }
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which tasks the displayed view retains
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StateFilter {
    #[default]
    All,
    State(TaskState),
}

impl StateFilter {
    pub fn matches(&self, task: &Task) -> bool {
        match self {
            StateFilter::All => true,
            StateFilter::State(state) => &task.state == state,
        }
    }
}

impl FromStr for StateFilter {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "all" => Ok(StateFilter::All),
            other => Ok(StateFilter::State(other.parse()?)),
        }
    }
}

impl std::fmt::Display for StateFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StateFilter::All => write!(f, "all"),
            StateFilter::State(state) => write!(f, "{}", state),
        }
    }
}

/// A task as it appears in the view, with its canonical position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayedTask<'a> {
    pub task: &'a Task,
    pub original_index: usize,
}

/// Compute the displayed view: sort, then filter
///
/// All sorts are stable, so tasks that compare equal keep canonical order.
pub fn displayed_tasks<'a>(tasks: &'a [Task], sort: SortKey, filter: &StateFilter) -> Vec<DisplayedTask<'a>> {
    let mut view: Vec<DisplayedTask<'a>> = tasks
        .iter()
        .enumerate()
        .map(|(original_index, task)| DisplayedTask { task, original_index })
        .collect();

    if let Some(leading) = sort.leading_state() {
        view.sort_by_key(|d| d.task.state != leading);
    } else if sort == SortKey::Deadline {
        view.sort_by(|a, b| compare_deadlines(a.task, b.task));
    }

    view.retain(|d| filter.matches(d.task));
    view
}

fn compare_deadlines(a: &Task, b: &Task) -> Ordering {
    match (a.deadline_date(), b.deadline_date()) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
