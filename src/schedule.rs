//! Priority index: schedulable entities ordered by start time.
//!
//! Intervals are half-open, `[start, end)`. Two intervals overlap when
//! `s1 < e2 && s2 < e1`, so touching endpoints are allowed. Entries are keyed
//! by `(start, end, id)`; with no two stored intervals overlapping, an entry
//! that ends at or before a candidate's start proves every earlier entry does
//! too, which lets conflict checks stop early.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDateTime;

use crate::task::{Scheduled, TaskId, TaskKind};

/// One occupied slot of the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub id: TaskId,
    pub kind: TaskKind,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Slot {
    /// Slot for `entity`, or `None` when it lacks a start or a duration.
    pub fn of<S: Scheduled>(entity: &S, kind: TaskKind) -> Option<Self> {
        Some(Self {
            id: entity.id(),
            kind,
            start: entity.start_time()?,
            end: entity.end_time()?,
        })
    }

    pub fn overlaps(&self, other: &Slot) -> bool {
        self.start < other.end && other.start < self.end
    }
}

type SlotKey = (NaiveDateTime, NaiveDateTime, TaskId);

#[derive(Debug, Clone, Default)]
pub struct Schedule {
    slots: BTreeMap<SlotKey, Slot>,
    keys: HashMap<TaskId, SlotKey>,
}

impl Schedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.keys.contains_key(&id)
    }

    /// First stored slot that overlaps `candidate`, ignoring the candidate's
    /// own id so an entity can be checked against its replacement.
    pub fn conflict(&self, candidate: &Slot) -> Option<Slot> {
        let upper = (candidate.end, NaiveDateTime::MIN, TaskId::MIN);
        for slot in self.slots.range(..upper).rev().map(|(_, slot)| slot) {
            if slot.id == candidate.id {
                continue;
            }
            if slot.overlaps(candidate) {
                return Some(*slot);
            }
            if slot.end <= candidate.start && slot.start < candidate.start {
                break;
            }
        }
        None
    }

    /// Insert `entity` unless it overlaps a stored slot.
    ///
    /// Entities that are not schedulable are accepted without being stored.
    /// On conflict the blocking slot is returned and nothing changes.
    pub fn try_insert<S: Scheduled>(&mut self, entity: &S, kind: TaskKind) -> Result<(), Slot> {
        let Some(slot) = Slot::of(entity, kind) else {
            return Ok(());
        };
        if let Some(blocking) = self.conflict(&slot) {
            return Err(blocking);
        }
        self.remove(slot.id);
        let key = (slot.start, slot.end, slot.id);
        self.keys.insert(slot.id, key);
        self.slots.insert(key, slot);
        Ok(())
    }

    /// Drop the slot held by `id`, if any.
    pub fn remove(&mut self, id: TaskId) -> Option<Slot> {
        let key = self.keys.remove(&id)?;
        self.slots.remove(&key)
    }

    /// Slots in start order. Detached from the index.
    pub fn snapshot(&self) -> Vec<Slot> {
        self.slots.values().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{Status, Task};

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2026, 4, 10)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn task(id: TaskId, hour: u32, minute: u32, minutes: u32) -> Task {
        Task::new(format!("task {id}"), "", Status::New)
            .with_id(id)
            .scheduled(at(hour, minute), minutes)
    }

    #[test]
    fn touching_intervals_are_allowed() {
        let mut schedule = Schedule::new();
        assert!(schedule.try_insert(&task(1, 10, 0, 60), TaskKind::Task).is_ok());
        assert!(schedule.try_insert(&task(2, 11, 0, 60), TaskKind::Task).is_ok());
        assert!(schedule.try_insert(&task(3, 9, 0, 60), TaskKind::Task).is_ok());
        assert_eq!(schedule.len(), 3);
    }

    #[test]
    fn overlapping_interval_is_rejected() {
        let mut schedule = Schedule::new();
        schedule.try_insert(&task(1, 10, 0, 60), TaskKind::Task).unwrap();
        let blocking = schedule
            .try_insert(&task(2, 10, 30, 60), TaskKind::Task)
            .unwrap_err();
        assert_eq!(blocking.id, 1);
        assert_eq!(schedule.len(), 1);
        assert!(!schedule.contains(2));
    }

    #[test]
    fn enclosing_and_enclosed_intervals_are_rejected() {
        let mut schedule = Schedule::new();
        schedule.try_insert(&task(1, 10, 0, 60), TaskKind::Task).unwrap();
        schedule.try_insert(&task(2, 12, 0, 60), TaskKind::Task).unwrap();
        assert!(schedule.try_insert(&task(3, 9, 0, 240), TaskKind::Task).is_err());
        assert!(schedule.try_insert(&task(4, 10, 15, 15), TaskKind::Task).is_err());
        assert!(schedule.try_insert(&task(5, 10, 0, 60), TaskKind::Task).is_err());
    }

    #[test]
    fn unschedulable_entity_is_accepted_but_not_stored() {
        let mut schedule = Schedule::new();
        let loose = Task::new("loose", "", Status::New).with_id(9);
        assert!(schedule.try_insert(&loose, TaskKind::Task).is_ok());
        assert!(schedule.is_empty());
    }

    #[test]
    fn zero_length_slots_at_boundaries() {
        let mut schedule = Schedule::new();
        schedule.try_insert(&task(1, 10, 0, 60), TaskKind::Task).unwrap();
        assert!(schedule.try_insert(&task(2, 10, 0, 0), TaskKind::Task).is_ok());
        assert!(schedule.try_insert(&task(3, 11, 0, 0), TaskKind::Task).is_ok());
        assert!(schedule.try_insert(&task(4, 10, 30, 0), TaskKind::Task).is_err());
        // The early stop must not skip the long slot sharing a start with a point.
        assert_eq!(
            schedule
                .try_insert(&task(5, 10, 40, 10), TaskKind::Task)
                .unwrap_err()
                .id,
            1
        );
    }

    #[test]
    fn conflict_ignores_own_slot() {
        let mut schedule = Schedule::new();
        schedule.try_insert(&task(1, 10, 0, 60), TaskKind::Task).unwrap();
        let moved = task(1, 10, 30, 60);
        assert!(schedule.try_insert(&moved, TaskKind::Task).is_ok());
        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule.snapshot()[0].start, at(10, 30));
    }

    #[test]
    fn snapshot_is_ordered_and_detached() {
        let mut schedule = Schedule::new();
        schedule.try_insert(&task(1, 14, 0, 30), TaskKind::Task).unwrap();
        schedule.try_insert(&task(2, 9, 0, 30), TaskKind::Subtask).unwrap();
        schedule.try_insert(&task(3, 11, 0, 30), TaskKind::Task).unwrap();

        let mut snapshot = schedule.snapshot();
        let ids: Vec<TaskId> = snapshot.iter().map(|slot| slot.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);

        snapshot.clear();
        assert_eq!(schedule.len(), 3);

        schedule.remove(3);
        let ids: Vec<TaskId> = schedule.snapshot().iter().map(|slot| slot.id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert!(schedule.remove(3).is_none());
    }
}
