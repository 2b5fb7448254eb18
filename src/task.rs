//! Entity model for the tracker.
//!
//! Three kinds of entity share one id space: plain tasks, epics that group
//! subtasks, and subtasks that point back at their epic by id. Equality and
//! hashing are by id only. The closed set of kinds is expressed as the
//! [`Item`] variant so callers that handle "any entity" (history, priority
//! order, snapshots) dispatch explicitly instead of through a class tree.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Identifier assigned by the store. Shared by all three entity kinds.
pub type TaskId = u64;

/// Text format used for instants on the wire and on disk.
pub const DATE_TIME_FORMAT: &str = "%d.%m.%Y %H:%M";

/// Parse an instant in `dd.MM.yyyy HH:mm` form.
pub fn parse_date_time(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), DATE_TIME_FORMAT).ok()
}

/// `start + minutes`, or `None` when the result is past the last
/// representable instant.
pub fn end_of(start: NaiveDateTime, minutes: u32) -> Option<NaiveDateTime> {
    start.checked_add_signed(Duration::minutes(i64::from(minutes)))
}

/// Format an instant in `dd.MM.yyyy HH:mm` form.
pub fn format_date_time(value: &NaiveDateTime) -> String {
    value.format(DATE_TIME_FORMAT).to_string()
}

/// Progress of a task, subtask, or (derived) epic.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    #[default]
    New,
    InProgress,
    Done,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::New => "NEW",
            Status::InProgress => "IN_PROGRESS",
            Status::Done => "DONE",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "NEW" => Ok(Status::New),
            "IN_PROGRESS" => Ok(Status::InProgress),
            "DONE" => Ok(Status::Done),
            other => Err(format!(
                "invalid status '{other}' (expected NEW|IN_PROGRESS|DONE)"
            )),
        }
    }
}

/// Which of the three collections an entity lives in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Task,
    Epic,
    Subtask,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Task => "task",
            TaskKind::Epic => "epic",
            TaskKind::Subtask => "subtask",
        }
    }

    /// Row tag used by the snapshot format.
    pub fn tag(&self) -> &'static str {
        match self {
            TaskKind::Task => "TASK",
            TaskKind::Epic => "EPIC",
            TaskKind::Subtask => "SUBTASK",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim() {
            "TASK" => Some(TaskKind::Task),
            "EPIC" => Some(TaskKind::Epic),
            "SUBTASK" => Some(TaskKind::Subtask),
            _ => None,
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anything that can occupy a slot in the priority index.
pub trait Scheduled {
    fn id(&self) -> TaskId;
    fn start_time(&self) -> Option<NaiveDateTime>;
    /// Duration in whole minutes.
    fn duration(&self) -> Option<u32>;

    /// A start and a duration are set and their end is representable.
    fn is_schedulable(&self) -> bool {
        self.end_time().is_some()
    }

    /// `start + duration`, when both are set and the sum does not overflow.
    fn end_time(&self) -> Option<NaiveDateTime> {
        end_of(self.start_time()?, self.duration()?)
    }
}

mod optional_date_time {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(value) => serializer.serialize_str(&super::format_date_time(value)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(raw) => super::parse_date_time(&raw).map(Some).ok_or_else(|| {
                serde::de::Error::custom(format!(
                    "invalid date-time '{raw}' (expected dd.MM.yyyy HH:mm)"
                ))
            }),
        }
    }
}

/// A plain, directly-managed task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub description: String,
    pub status: Status,
    #[serde(with = "optional_date_time", default)]
    pub start_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub duration: Option<u32>,
}

impl Task {
    pub fn new(name: impl Into<String>, description: impl Into<String>, status: Status) -> Self {
        Self {
            id: 0,
            name: name.into(),
            description: description.into(),
            status,
            start_time: None,
            duration: None,
        }
    }

    pub fn scheduled(mut self, start_time: NaiveDateTime, minutes: u32) -> Self {
        self.start_time = Some(start_time);
        self.duration = Some(minutes);
        self
    }

    pub fn with_id(mut self, id: TaskId) -> Self {
        self.id = id;
        self
    }
}

impl Scheduled for Task {
    fn id(&self) -> TaskId {
        self.id
    }

    fn start_time(&self) -> Option<NaiveDateTime> {
        self.start_time
    }

    fn duration(&self) -> Option<u32> {
        self.duration
    }
}

/// A task that belongs to an epic. The epic is referenced by id only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    pub id: TaskId,
    pub epic_id: TaskId,
    pub name: String,
    pub description: String,
    pub status: Status,
    #[serde(with = "optional_date_time", default)]
    pub start_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub duration: Option<u32>,
}

impl Subtask {
    pub fn new(
        epic_id: TaskId,
        name: impl Into<String>,
        description: impl Into<String>,
        status: Status,
    ) -> Self {
        Self {
            id: 0,
            epic_id,
            name: name.into(),
            description: description.into(),
            status,
            start_time: None,
            duration: None,
        }
    }

    pub fn scheduled(mut self, start_time: NaiveDateTime, minutes: u32) -> Self {
        self.start_time = Some(start_time);
        self.duration = Some(minutes);
        self
    }

    pub fn with_id(mut self, id: TaskId) -> Self {
        self.id = id;
        self
    }
}

impl Scheduled for Subtask {
    fn id(&self) -> TaskId {
        self.id
    }

    fn start_time(&self) -> Option<NaiveDateTime> {
        self.start_time
    }

    fn duration(&self) -> Option<u32> {
        self.duration
    }
}

/// Per-status tally over an epic's subtasks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub new: usize,
    pub in_progress: usize,
    pub done: usize,
}

impl StatusCounts {
    pub fn get(&self, status: Status) -> usize {
        match status {
            Status::New => self.new,
            Status::InProgress => self.in_progress,
            Status::Done => self.done,
        }
    }

    pub fn add(&mut self, status: Status) {
        *self.slot(status) += 1;
    }

    pub fn remove(&mut self, status: Status) {
        let slot = self.slot(status);
        *slot = slot.saturating_sub(1);
    }

    pub fn total(&self) -> usize {
        self.new + self.in_progress + self.done
    }

    fn slot(&mut self, status: Status) -> &mut usize {
        match status {
            Status::New => &mut self.new,
            Status::InProgress => &mut self.in_progress,
            Status::Done => &mut self.done,
        }
    }

    /// Epic status for `subtasks` linked subtasks.
    ///
    /// NEW when every subtask is NEW (an empty epic included), DONE when every
    /// subtask is DONE, otherwise IN_PROGRESS.
    pub fn derived_status(&self, subtasks: usize) -> Status {
        if self.new == subtasks {
            Status::New
        } else if self.done == subtasks {
            Status::Done
        } else {
            Status::InProgress
        }
    }
}

/// A group of subtasks. Status and schedule are derived by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Epic {
    pub id: TaskId,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub(crate) status: Status,
    #[serde(with = "optional_date_time", default)]
    pub(crate) start_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub(crate) duration: Option<u32>,
    #[serde(with = "optional_date_time", default)]
    pub(crate) end_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub(crate) subtask_ids: Vec<TaskId>,
    #[serde(default)]
    pub(crate) status_counts: StatusCounts,
}

impl Epic {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            description: description.into(),
            status: Status::New,
            start_time: None,
            duration: None,
            end_time: None,
            subtask_ids: Vec::new(),
            status_counts: StatusCounts::default(),
        }
    }

    pub fn with_id(mut self, id: TaskId) -> Self {
        self.id = id;
        self
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn start_time(&self) -> Option<NaiveDateTime> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<NaiveDateTime> {
        self.end_time
    }

    /// Sum of schedulable subtask durations, in minutes.
    pub fn duration(&self) -> Option<u32> {
        self.duration
    }

    /// Linked subtask ids in insertion order.
    pub fn subtask_ids(&self) -> &[TaskId] {
        &self.subtask_ids
    }

    /// Drop everything the store derives; keeps identity, name and description.
    pub(crate) fn reset_derived(&mut self) {
        self.status = Status::New;
        self.start_time = None;
        self.duration = None;
        self.end_time = None;
        self.subtask_ids.clear();
        self.status_counts = StatusCounts::default();
    }
}

macro_rules! identity_eq {
    ($($ty:ty),*) => {
        $(
            impl PartialEq for $ty {
                fn eq(&self, other: &Self) -> bool {
                    self.id == other.id
                }
            }

            impl Eq for $ty {}

            impl Hash for $ty {
                fn hash<H: Hasher>(&self, state: &mut H) {
                    self.id.hash(state);
                }
            }
        )*
    };
}

identity_eq!(Task, Epic, Subtask);

/// Any entity held by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Item {
    Task(Task),
    Epic(Epic),
    Subtask(Subtask),
}

impl Item {
    pub fn id(&self) -> TaskId {
        match self {
            Item::Task(task) => task.id,
            Item::Epic(epic) => epic.id,
            Item::Subtask(subtask) => subtask.id,
        }
    }

    pub fn kind(&self) -> TaskKind {
        match self {
            Item::Task(_) => TaskKind::Task,
            Item::Epic(_) => TaskKind::Epic,
            Item::Subtask(_) => TaskKind::Subtask,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Item::Task(task) => &task.name,
            Item::Epic(epic) => &epic.name,
            Item::Subtask(subtask) => &subtask.name,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Item::Task(task) => &task.description,
            Item::Epic(epic) => &epic.description,
            Item::Subtask(subtask) => &subtask.description,
        }
    }

    pub fn status(&self) -> Status {
        match self {
            Item::Task(task) => task.status,
            Item::Epic(epic) => epic.status,
            Item::Subtask(subtask) => subtask.status,
        }
    }

    pub fn start_time(&self) -> Option<NaiveDateTime> {
        match self {
            Item::Task(task) => task.start_time,
            Item::Epic(epic) => epic.start_time,
            Item::Subtask(subtask) => subtask.start_time,
        }
    }

    pub fn duration(&self) -> Option<u32> {
        match self {
            Item::Task(task) => task.duration,
            Item::Epic(epic) => epic.duration,
            Item::Subtask(subtask) => subtask.duration,
        }
    }

    pub fn end_time(&self) -> Option<NaiveDateTime> {
        match self {
            Item::Task(task) => Scheduled::end_time(task),
            Item::Epic(epic) => epic.end_time,
            Item::Subtask(subtask) => Scheduled::end_time(subtask),
        }
    }

    pub fn epic_id(&self) -> Option<TaskId> {
        match self {
            Item::Subtask(subtask) => Some(subtask.epic_id),
            _ => None,
        }
    }
}

impl From<Task> for Item {
    fn from(task: Task) -> Self {
        Item::Task(task)
    }
}

impl From<Epic> for Item {
    fn from(epic: Epic) -> Self {
        Item::Epic(epic)
    }
}

impl From<Subtask> for Item {
    fn from(subtask: Subtask) -> Self {
        Item::Subtask(subtask)
    }
}
