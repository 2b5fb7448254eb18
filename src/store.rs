//! In-memory task store.
//!
//! Owns the three id-keyed collections, the view history and the priority
//! index, and keeps them consistent:
//!
//! - every id comes from one per-store generator and is never reused
//! - a subtask always points at an existing epic, and that epic lists it
//! - epic status and schedule are recomputed whenever one of its subtasks
//!   is created, updated or removed
//! - no two schedulable tasks/subtasks overlap
//!
//! Business outcomes (unknown id, schedule conflict) are returned as
//! [`StoreError`] values. A rejected create or update leaves the store
//! exactly as it was.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use thiserror::Error;
use tracing::debug;

use crate::history::{History, Keyed, DEFAULT_HISTORY_LIMIT};
use crate::schedule::{Schedule, Slot};
use crate::task::{Epic, Item, Scheduled, Subtask, Task, TaskId, TaskKind};

/// Expected, recoverable outcomes of store operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: TaskKind, id: TaskId },

    #[error("schedule conflict: {start} - {end} overlaps {conflicting_kind} {conflicting}")]
    ScheduleConflict {
        start: NaiveDateTime,
        end: NaiveDateTime,
        conflicting: TaskId,
        conflicting_kind: TaskKind,
    },
}

impl StoreError {
    fn not_found(kind: TaskKind, id: TaskId) -> Self {
        StoreError::NotFound { kind, id }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Monotonic id source owned by one store.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    next: TaskId,
}

impl IdGenerator {
    /// The id the next allocation will return.
    pub fn peek(&self) -> TaskId {
        self.next
    }

    pub fn next_id(&mut self) -> TaskId {
        let id = self.next;
        self.next += 1;
        id
    }

    /// Make sure `id` is never handed out again.
    pub fn advance_past(&mut self, id: TaskId) {
        self.next = self.next.max(id.saturating_add(1));
    }
}

/// History entry: which collection to look in, and the id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemRef {
    pub kind: TaskKind,
    pub id: TaskId,
}

impl Keyed for ItemRef {
    type Key = TaskId;

    fn key(&self) -> TaskId {
        self.id
    }
}

#[derive(Debug, Clone)]
pub struct TaskStore {
    tasks: BTreeMap<TaskId, Task>,
    epics: BTreeMap<TaskId, Epic>,
    subtasks: BTreeMap<TaskId, Subtask>,
    ids: IdGenerator,
    history: History<ItemRef>,
    schedule: Schedule,
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskStore {
    pub fn new() -> Self {
        Self::with_history_limit(DEFAULT_HISTORY_LIMIT)
    }

    pub fn with_history_limit(limit: usize) -> Self {
        Self {
            tasks: BTreeMap::new(),
            epics: BTreeMap::new(),
            subtasks: BTreeMap::new(),
            ids: IdGenerator::default(),
            history: History::new(limit),
            schedule: Schedule::new(),
        }
    }

    /// The id the next successful create will receive.
    pub fn next_id(&self) -> TaskId {
        self.ids.peek()
    }

    // =========================================================================
    // Create
    // =========================================================================

    /// Store a new task under a fresh id. Any id set by the caller is ignored.
    pub fn create_task(&mut self, mut task: Task) -> StoreResult<TaskId> {
        task.id = self.ids.peek();
        self.reschedule(&task, TaskKind::Task)?;
        self.ids.advance_past(task.id);
        let id = task.id;
        self.tasks.insert(id, task);
        debug!(id, "task created");
        Ok(id)
    }

    /// Store a new, empty epic under a fresh id.
    pub fn create_epic(&mut self, mut epic: Epic) -> TaskId {
        epic.id = self.ids.next_id();
        epic.reset_derived();
        let id = epic.id;
        self.epics.insert(id, epic);
        debug!(id, "epic created");
        id
    }

    /// Store a new subtask and link it into its epic.
    pub fn create_subtask(&mut self, mut subtask: Subtask) -> StoreResult<TaskId> {
        self.require_epic(subtask.epic_id)?;
        subtask.id = self.ids.peek();
        self.reschedule(&subtask, TaskKind::Subtask)?;
        self.ids.advance_past(subtask.id);

        let (id, epic_id) = (subtask.id, subtask.epic_id);
        self.link(&subtask);
        self.subtasks.insert(id, subtask);
        self.refresh_epic(epic_id);
        debug!(id, epic_id, "subtask created");
        Ok(id)
    }

    /// Create any entity kind.
    pub fn create(&mut self, item: Item) -> StoreResult<TaskId> {
        match item {
            Item::Task(task) => self.create_task(task),
            Item::Epic(epic) => Ok(self.create_epic(epic)),
            Item::Subtask(subtask) => self.create_subtask(subtask),
        }
    }

    // =========================================================================
    // Update
    // =========================================================================

    /// Update any entity kind.
    pub fn update(&mut self, item: Item) -> StoreResult<()> {
        match item {
            Item::Task(task) => self.update_task(task),
            Item::Epic(epic) => self.update_epic(epic),
            Item::Subtask(subtask) => self.update_subtask(subtask),
        }
    }

    /// Replace a stored task wholesale.
    pub fn update_task(&mut self, task: Task) -> StoreResult<()> {
        if !self.tasks.contains_key(&task.id) {
            return Err(StoreError::not_found(TaskKind::Task, task.id));
        }
        self.reschedule(&task, TaskKind::Task)?;
        debug!(id = task.id, "task updated");
        self.tasks.insert(task.id, task);
        Ok(())
    }

    /// Replace an epic's name and description. Derived state and subtask
    /// links are owned by the store and kept.
    pub fn update_epic(&mut self, epic: Epic) -> StoreResult<()> {
        let stored = self
            .epics
            .get_mut(&epic.id)
            .ok_or_else(|| StoreError::not_found(TaskKind::Epic, epic.id))?;
        stored.name = epic.name;
        stored.description = epic.description;
        debug!(id = epic.id, "epic updated");
        Ok(())
    }

    /// Replace a stored subtask wholesale, relinking it if its epic changed.
    pub fn update_subtask(&mut self, subtask: Subtask) -> StoreResult<()> {
        let previous = self
            .subtasks
            .get(&subtask.id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(TaskKind::Subtask, subtask.id))?;
        self.require_epic(subtask.epic_id)?;
        self.reschedule(&subtask, TaskKind::Subtask)?;

        let (id, epic_id) = (subtask.id, subtask.epic_id);
        if previous.epic_id == epic_id {
            if let Some(epic) = self.epics.get_mut(&epic_id) {
                epic.status_counts.remove(previous.status);
                epic.status_counts.add(subtask.status);
            }
        } else {
            self.unlink(&previous);
            self.link(&subtask);
        }
        self.subtasks.insert(id, subtask);
        if previous.epic_id != epic_id {
            self.refresh_epic(previous.epic_id);
        }
        self.refresh_epic(epic_id);
        debug!(id, epic_id, "subtask updated");
        Ok(())
    }

    // =========================================================================
    // Read
    // =========================================================================

    /// Look up a task and record the view.
    pub fn get_task(&mut self, id: TaskId) -> Option<&Task> {
        let task = self.tasks.get(&id)?;
        self.history.record(Some(ItemRef {
            kind: TaskKind::Task,
            id,
        }));
        Some(task)
    }

    /// Look up an epic and record the view.
    pub fn get_epic(&mut self, id: TaskId) -> Option<&Epic> {
        let epic = self.epics.get(&id)?;
        self.history.record(Some(ItemRef {
            kind: TaskKind::Epic,
            id,
        }));
        Some(epic)
    }

    /// Look up a subtask and record the view.
    pub fn get_subtask(&mut self, id: TaskId) -> Option<&Subtask> {
        let subtask = self.subtasks.get(&id)?;
        self.history.record(Some(ItemRef {
            kind: TaskKind::Subtask,
            id,
        }));
        Some(subtask)
    }

    /// Look up any entity of `kind` and record the view.
    pub fn get(&mut self, kind: TaskKind, id: TaskId) -> StoreResult<Item> {
        let item = self
            .lookup(kind, id)
            .ok_or_else(|| StoreError::not_found(kind, id))?;
        self.history.record(Some(ItemRef { kind, id }));
        Ok(item)
    }

    /// Look up without touching history.
    pub fn lookup(&self, kind: TaskKind, id: TaskId) -> Option<Item> {
        match kind {
            TaskKind::Task => self.tasks.get(&id).cloned().map(Item::Task),
            TaskKind::Epic => self.epics.get(&id).cloned().map(Item::Epic),
            TaskKind::Subtask => self.subtasks.get(&id).cloned().map(Item::Subtask),
        }
    }

    /// Which collection holds `id`, if any.
    pub fn kind_of(&self, id: TaskId) -> Option<TaskKind> {
        if self.tasks.contains_key(&id) {
            Some(TaskKind::Task)
        } else if self.epics.contains_key(&id) {
            Some(TaskKind::Epic)
        } else if self.subtasks.contains_key(&id) {
            Some(TaskKind::Subtask)
        } else {
            None
        }
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> + '_ {
        self.tasks.values()
    }

    pub fn epics(&self) -> impl Iterator<Item = &Epic> + '_ {
        self.epics.values()
    }

    pub fn subtasks(&self) -> impl Iterator<Item = &Subtask> + '_ {
        self.subtasks.values()
    }

    /// All entities of `kind`, ordered by id. Does not touch history.
    pub fn list(&self, kind: TaskKind) -> Vec<Item> {
        match kind {
            TaskKind::Task => self.tasks.values().cloned().map(Item::Task).collect(),
            TaskKind::Epic => self.epics.values().cloned().map(Item::Epic).collect(),
            TaskKind::Subtask => self.subtasks.values().cloned().map(Item::Subtask).collect(),
        }
    }

    /// Subtasks of `epic_id` in the epic's stored order, or `None` if the
    /// epic does not exist.
    pub fn subtasks_of(&self, epic_id: TaskId) -> Option<Vec<Subtask>> {
        let epic = self.epics.get(&epic_id)?;
        Some(
            epic.subtask_ids
                .iter()
                .filter_map(|id| self.subtasks.get(id))
                .cloned()
                .collect(),
        )
    }

    /// Schedulable tasks and subtasks in start order.
    pub fn prioritized(&self) -> Vec<Item> {
        self.schedule
            .snapshot()
            .iter()
            .filter_map(|slot| self.lookup(slot.kind, slot.id))
            .collect()
    }

    /// Viewed entities, oldest first, in their current version.
    pub fn history(&self) -> Vec<Item> {
        self.history
            .iter()
            .filter_map(|entry| self.lookup(entry.kind, entry.id))
            .collect()
    }

    /// Viewed ids, oldest first.
    pub fn history_ids(&self) -> Vec<TaskId> {
        self.history.iter().map(|entry| entry.id).collect()
    }

    // =========================================================================
    // Remove
    // =========================================================================

    /// Remove one entity. Removing an epic removes its subtasks first.
    pub fn remove(&mut self, kind: TaskKind, id: TaskId) -> StoreResult<Item> {
        let removed = match kind {
            TaskKind::Task => {
                let task = self
                    .tasks
                    .remove(&id)
                    .ok_or_else(|| StoreError::not_found(kind, id))?;
                self.schedule.remove(id);
                Item::Task(task)
            }
            TaskKind::Subtask => {
                let subtask = self
                    .subtasks
                    .remove(&id)
                    .ok_or_else(|| StoreError::not_found(kind, id))?;
                self.schedule.remove(id);
                self.unlink(&subtask);
                self.refresh_epic(subtask.epic_id);
                Item::Subtask(subtask)
            }
            TaskKind::Epic => {
                let epic = self
                    .epics
                    .remove(&id)
                    .ok_or_else(|| StoreError::not_found(kind, id))?;
                for subtask_id in &epic.subtask_ids {
                    self.subtasks.remove(subtask_id);
                    self.schedule.remove(*subtask_id);
                    self.history.remove(*subtask_id);
                }
                Item::Epic(epic)
            }
        };
        self.history.remove(id);
        debug!(%kind, id, "removed");
        Ok(removed)
    }

    /// Remove every entity of `kind`. Clearing epics clears subtasks too.
    pub fn remove_all(&mut self, kind: TaskKind) {
        match kind {
            TaskKind::Task => {
                for id in self.tasks.keys() {
                    self.history.remove(*id);
                    self.schedule.remove(*id);
                }
                self.tasks.clear();
            }
            TaskKind::Subtask => {
                for id in self.subtasks.keys() {
                    self.history.remove(*id);
                    self.schedule.remove(*id);
                }
                self.subtasks.clear();
                let epic_ids: Vec<TaskId> = self.epics.keys().copied().collect();
                for epic_id in epic_ids {
                    if let Some(epic) = self.epics.get_mut(&epic_id) {
                        epic.subtask_ids.clear();
                        epic.status_counts = Default::default();
                    }
                    self.refresh_epic(epic_id);
                }
            }
            TaskKind::Epic => {
                self.remove_all(TaskKind::Subtask);
                for id in self.epics.keys() {
                    self.history.remove(*id);
                }
                self.epics.clear();
            }
        }
        debug!(%kind, "removed all");
    }

    // =========================================================================
    // Restore (snapshot loading)
    // =========================================================================

    /// Insert an entity under its existing id and keep the generator above it.
    ///
    /// Epics must be restored before their subtasks. The same overlap and
    /// epic checks as create apply, so only genuinely inconsistent data is
    /// rejected.
    pub fn restore(&mut self, item: Item) -> StoreResult<()> {
        match item {
            Item::Task(task) => {
                self.reschedule(&task, TaskKind::Task)?;
                self.ids.advance_past(task.id);
                self.tasks.insert(task.id, task);
            }
            Item::Epic(mut epic) => {
                epic.reset_derived();
                self.ids.advance_past(epic.id);
                self.epics.insert(epic.id, epic);
            }
            Item::Subtask(subtask) => {
                self.require_epic(subtask.epic_id)?;
                self.reschedule(&subtask, TaskKind::Subtask)?;
                self.ids.advance_past(subtask.id);
                let epic_id = subtask.epic_id;
                self.link(&subtask);
                self.subtasks.insert(subtask.id, subtask);
                self.refresh_epic(epic_id);
            }
        }
        Ok(())
    }

    /// Re-record views in order, as if each id had been fetched. Unknown
    /// ids are skipped.
    pub fn replay_history<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = TaskId>,
    {
        for id in ids {
            if let Some(kind) = self.kind_of(id) {
                self.history.record(Some(ItemRef { kind, id }));
            }
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn require_epic(&self, epic_id: TaskId) -> StoreResult<()> {
        if self.epics.contains_key(&epic_id) {
            Ok(())
        } else {
            debug!(epic_id, "epic reference does not resolve");
            Err(StoreError::not_found(TaskKind::Epic, epic_id))
        }
    }

    /// Put `entity` in the priority index (replacing its previous slot) or
    /// take it out if it is no longer schedulable. Unchanged on conflict.
    fn reschedule<S: Scheduled>(&mut self, entity: &S, kind: TaskKind) -> StoreResult<()> {
        match self.schedule.try_insert(entity, kind) {
            Ok(()) => {
                if !entity.is_schedulable() {
                    self.schedule.remove(entity.id());
                }
                Ok(())
            }
            Err(blocking) => {
                let (start, end) = match Slot::of(entity, kind) {
                    Some(slot) => (slot.start, slot.end),
                    None => (blocking.start, blocking.end),
                };
                debug!(id = entity.id(), conflicting = blocking.id, "schedule conflict");
                Err(StoreError::ScheduleConflict {
                    start,
                    end,
                    conflicting: blocking.id,
                    conflicting_kind: blocking.kind,
                })
            }
        }
    }

    fn link(&mut self, subtask: &Subtask) {
        if let Some(epic) = self.epics.get_mut(&subtask.epic_id) {
            epic.subtask_ids.push(subtask.id);
            epic.status_counts.add(subtask.status);
        }
    }

    fn unlink(&mut self, subtask: &Subtask) {
        if let Some(epic) = self.epics.get_mut(&subtask.epic_id) {
            epic.subtask_ids.retain(|id| *id != subtask.id);
            epic.status_counts.remove(subtask.status);
        }
    }

    /// Recompute status, start, end and duration of an epic from its
    /// subtasks. Schedule fields reset to absent when no subtask is
    /// schedulable.
    fn refresh_epic(&mut self, epic_id: TaskId) {
        let Some(epic) = self.epics.get_mut(&epic_id) else {
            return;
        };
        let subtasks = &self.subtasks;
        let scheduled: Vec<&Subtask> = epic
            .subtask_ids
            .iter()
            .filter_map(|id| subtasks.get(id))
            .filter(|subtask| subtask.is_schedulable())
            .collect();

        epic.status = epic.status_counts.derived_status(epic.subtask_ids.len());
        epic.start_time = scheduled.iter().filter_map(|s| s.start_time).min();
        epic.end_time = scheduled.iter().filter_map(|s| Scheduled::end_time(*s)).max();
        epic.duration = if scheduled.is_empty() {
            None
        } else {
            Some(
                scheduled
                    .iter()
                    .filter_map(|s| s.duration)
                    .fold(0u32, u32::saturating_add),
            )
        };
    }
}
