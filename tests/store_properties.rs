mod support;

use chrono::NaiveDateTime;
use tracker::store::{StoreError, TaskStore};
use tracker::task::{Epic, Item, Status, Subtask, Task, TaskKind};

use support::at;

fn plain(store: &mut TaskStore, name: &str) -> u64 {
    store
        .create_task(Task::new(name, "", Status::New))
        .expect("create task")
}

#[test]
fn get_after_create_appends_one_history_entry() {
    let mut store = TaskStore::new();
    let id = plain(&mut store, "a");
    assert!(store.history().is_empty());

    let fetched = store.get(TaskKind::Task, id).expect("get");
    assert_eq!(fetched.id(), id);
    assert_eq!(fetched.name(), "a");
    assert_eq!(store.history_ids(), vec![id]);

    store.get(TaskKind::Task, id).expect("get again");
    assert_eq!(store.history_ids(), vec![id]);
}

#[test]
fn history_is_bounded_and_moves_revisited_to_tail() {
    let mut store = TaskStore::new();
    let ids: Vec<u64> = (0..11).map(|n| plain(&mut store, &format!("t{n}"))).collect();

    for id in &ids[..10] {
        store.get(TaskKind::Task, *id).expect("get");
    }
    assert_eq!(store.history_ids(), ids[..10].to_vec());

    store.get(TaskKind::Task, ids[10]).expect("get 11th");
    assert_eq!(store.history_ids().len(), 10);
    assert_eq!(store.history_ids().first(), Some(&ids[1]));
    assert_eq!(store.history_ids().last(), Some(&ids[10]));

    store.get(TaskKind::Task, ids[3]).expect("revisit");
    assert_eq!(store.history_ids().len(), 10);
    assert_eq!(store.history_ids().last(), Some(&ids[3]));
}

#[test]
fn history_limit_is_configurable() {
    let mut store = TaskStore::with_history_limit(2);
    let ids: Vec<u64> = (0..3).map(|n| plain(&mut store, &format!("t{n}"))).collect();
    for id in &ids {
        store.get(TaskKind::Task, *id).expect("get");
    }
    assert_eq!(store.history_ids(), vec![ids[1], ids[2]]);
}

#[test]
fn touching_intervals_coexist_overlapping_ones_do_not() {
    let mut store = TaskStore::new();
    store
        .create_task(Task::new("first", "", Status::New).scheduled(at(1, 10, 0), 60))
        .expect("first");
    store
        .create_task(Task::new("touching", "", Status::New).scheduled(at(1, 11, 0), 60))
        .expect("touching");

    let next = store.next_id();
    let err = store
        .create_task(Task::new("overlap", "", Status::New).scheduled(at(1, 10, 30), 60))
        .expect_err("overlap rejected");
    assert!(matches!(err, StoreError::ScheduleConflict { conflicting: 0, .. }));
    assert_eq!(store.list(TaskKind::Task).len(), 2);
    assert_eq!(store.prioritized().len(), 2);
    assert_eq!(store.next_id(), next);
}

#[test]
fn rejected_update_leaves_previous_version() {
    let mut store = TaskStore::new();
    let a = store
        .create_task(Task::new("a", "", Status::New).scheduled(at(1, 10, 0), 60))
        .expect("a");
    let b = store
        .create_task(Task::new("b", "", Status::New).scheduled(at(1, 12, 0), 60))
        .expect("b");

    let moved = Task::new("b", "", Status::Done)
        .scheduled(at(1, 10, 30), 30)
        .with_id(b);
    assert!(store.update_task(moved).is_err());

    let Some(Item::Task(stored)) = store.lookup(TaskKind::Task, b) else {
        panic!("task b missing");
    };
    assert_eq!(stored.status, Status::New);
    assert_eq!(stored.start_time, Some(at(1, 12, 0)));

    let order: Vec<u64> = store.prioritized().iter().map(Item::id).collect();
    assert_eq!(order, vec![a, b]);
}

#[test]
fn update_may_keep_its_own_slot() {
    let mut store = TaskStore::new();
    let id = store
        .create_task(Task::new("a", "", Status::New).scheduled(at(1, 10, 0), 60))
        .expect("a");
    let stretched = Task::new("a", "", Status::InProgress)
        .scheduled(at(1, 10, 30), 60)
        .with_id(id);
    store.update_task(stretched).expect("self-overlap is fine");
    assert_eq!(store.prioritized()[0].start_time(), Some(at(1, 10, 30)));
}

#[test]
fn subtask_with_unknown_epic_is_not_found() {
    let mut store = TaskStore::new();
    let epic = store.create_epic(Epic::new("e", ""));

    let err = store
        .create_subtask(Subtask::new(99, "orphan", "", Status::Done).scheduled(at(1, 9, 0), 10))
        .expect_err("unknown epic");
    assert!(matches!(err, StoreError::NotFound { kind: TaskKind::Epic, id: 99 }));
    assert!(store.list(TaskKind::Subtask).is_empty());
    assert!(store.prioritized().is_empty());

    let Some(Item::Epic(stored)) = store.lookup(TaskKind::Epic, epic) else {
        panic!("epic missing");
    };
    assert_eq!(stored.status(), Status::New);
    assert!(stored.start_time().is_none());
}

#[test]
fn epic_status_follows_subtasks() {
    let mut store = TaskStore::new();
    let epic = store.create_epic(Epic::new("e", ""));
    let s1 = store
        .create_subtask(Subtask::new(epic, "s1", "", Status::New))
        .expect("s1");
    let s2 = store
        .create_subtask(Subtask::new(epic, "s2", "", Status::New))
        .expect("s2");

    let status = |store: &TaskStore| store.lookup(TaskKind::Epic, epic).map(|item| item.status());
    assert_eq!(status(&store), Some(Status::New));

    store
        .update_subtask(Subtask::new(epic, "s2", "", Status::Done).with_id(s2))
        .expect("s2 done");
    assert_eq!(status(&store), Some(Status::InProgress));

    store
        .update_subtask(Subtask::new(epic, "s1", "", Status::Done).with_id(s1))
        .expect("s1 done");
    assert_eq!(status(&store), Some(Status::Done));

    store.remove(TaskKind::Subtask, s1).expect("rm s1");
    store.remove(TaskKind::Subtask, s2).expect("rm s2");
    assert_eq!(status(&store), Some(Status::New));
}

#[test]
fn epic_schedule_aggregates_schedulable_subtasks() {
    let mut store = TaskStore::new();
    let epic = store.create_epic(Epic::new("e", ""));
    store
        .create_subtask(Subtask::new(epic, "late", "", Status::New).scheduled(at(1, 10, 0), 60))
        .expect("late");
    store
        .create_subtask(Subtask::new(epic, "unscheduled", "", Status::New))
        .expect("unscheduled");
    let early = store
        .create_subtask(Subtask::new(epic, "early", "", Status::New).scheduled(at(1, 9, 0), 30))
        .expect("early");

    let view = store.lookup(TaskKind::Epic, epic).expect("epic");
    assert_eq!(view.start_time(), Some(at(1, 9, 0)));
    assert_eq!(view.end_time(), Some(at(1, 11, 0)));
    assert_eq!(view.duration(), Some(90));

    store.remove(TaskKind::Subtask, early).expect("rm early");
    let view = store.lookup(TaskKind::Epic, epic).expect("epic");
    assert_eq!(view.start_time(), Some(at(1, 10, 0)));
    assert_eq!(view.duration(), Some(60));
}

#[test]
fn epic_aggregates_reset_when_nothing_is_schedulable() {
    let mut store = TaskStore::new();
    let epic = store.create_epic(Epic::new("e", ""));
    let only = store
        .create_subtask(Subtask::new(epic, "s", "", Status::New).scheduled(at(1, 10, 0), 60))
        .expect("s");

    store
        .update_subtask(Subtask::new(epic, "s", "", Status::New).with_id(only))
        .expect("unschedule");
    let view = store.lookup(TaskKind::Epic, epic).expect("epic");
    assert!(view.start_time().is_none());
    assert!(view.end_time().is_none());
    assert!(view.duration().is_none());
    assert!(store.prioritized().is_empty());
}

#[test]
fn removing_an_epic_cascades() {
    let mut store = TaskStore::new();
    let epic = store.create_epic(Epic::new("e", ""));
    let sub = store
        .create_subtask(Subtask::new(epic, "s", "", Status::New).scheduled(at(1, 10, 0), 60))
        .expect("s");
    let keep = plain(&mut store, "keep");
    store.get(TaskKind::Subtask, sub).expect("view sub");
    store.get(TaskKind::Epic, epic).expect("view epic");
    store.get(TaskKind::Task, keep).expect("view task");

    store.remove(TaskKind::Epic, epic).expect("rm epic");
    assert!(store.list(TaskKind::Subtask).is_empty());
    assert!(store.prioritized().is_empty());
    assert_eq!(store.history_ids(), vec![keep]);
}

#[test]
fn moving_a_subtask_relinks_both_epics() {
    let mut store = TaskStore::new();
    let from = store.create_epic(Epic::new("from", ""));
    let to = store.create_epic(Epic::new("to", ""));
    let sub = store
        .create_subtask(Subtask::new(from, "s", "", Status::Done).scheduled(at(1, 10, 0), 15))
        .expect("s");

    store
        .update_subtask(
            Subtask::new(to, "s", "", Status::Done)
                .scheduled(at(1, 10, 0), 15)
                .with_id(sub),
        )
        .expect("move");

    assert_eq!(store.subtasks_of(from).map(|subs| subs.len()), Some(0));
    assert_eq!(store.subtasks_of(to).map(|subs| subs.len()), Some(1));
    let from_view = store.lookup(TaskKind::Epic, from).expect("from");
    assert_eq!(from_view.status(), Status::New);
    assert!(from_view.start_time().is_none());
    assert_eq!(store.lookup(TaskKind::Epic, to).map(|e| e.status()), Some(Status::Done));
}

#[test]
fn prioritized_stays_sorted_through_churn() {
    let mut store = TaskStore::new();
    let starts = [(14, 0), (9, 0), (11, 30), (8, 0), (16, 45), (10, 0)];
    let mut ids = Vec::new();
    for (hour, minute) in starts {
        let id = store
            .create_task(Task::new("t", "", Status::New).scheduled(at(2, hour, minute), 20))
            .expect("create");
        ids.push(id);
    }
    store.remove(TaskKind::Task, ids[1]).expect("rm");
    store
        .update_task(Task::new("t", "", Status::New).scheduled(at(2, 7, 0), 20).with_id(ids[4]))
        .expect("move earlier");

    let starts: Vec<_> = store
        .prioritized()
        .iter()
        .filter_map(Item::start_time)
        .collect();
    assert_eq!(starts.len(), 5);
    assert!(starts.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(starts[0], at(2, 7, 0));
}

#[test]
fn stores_do_not_share_ids() {
    let mut first = TaskStore::new();
    let mut second = TaskStore::new();
    plain(&mut first, "a");
    plain(&mut first, "b");
    assert_eq!(plain(&mut second, "c"), 0);
}

#[test]
fn unknown_ids_are_not_found() {
    let mut store = TaskStore::new();
    assert!(matches!(
        store.get(TaskKind::Epic, 4),
        Err(StoreError::NotFound { kind: TaskKind::Epic, id: 4 })
    ));
    assert!(store.remove(TaskKind::Task, 4).is_err());
    assert!(store.update_task(Task::new("x", "", Status::New).with_id(4)).is_err());
    assert!(store.history().is_empty());
}

#[test]
fn end_past_the_calendar_is_stored_unscheduled() {
    let mut store = TaskStore::new();
    let far = tracker::task::parse_date_time("01.01.+262000 00:00").expect("far start");
    let id = store
        .create_task(Task::new("far", "", Status::New).scheduled(far, u32::MAX))
        .expect("create");

    let item = store.get(TaskKind::Task, id).expect("get");
    assert_eq!(item.end_time(), None);
    assert!(store.prioritized().is_empty());
}

type EpicState = (
    Status,
    Vec<u64>,
    Option<NaiveDateTime>,
    Option<NaiveDateTime>,
    Option<u32>,
);

fn epic_state(store: &TaskStore, id: u64) -> EpicState {
    let Some(Item::Epic(epic)) = store.lookup(TaskKind::Epic, id) else {
        panic!("epic {id} missing");
    };
    (
        epic.status(),
        epic.subtask_ids().to_vec(),
        epic.start_time(),
        epic.end_time(),
        epic.duration(),
    )
}

#[test]
fn remove_all_subtasks_resets_epics() {
    let mut store = TaskStore::new();
    let epic = store.create_epic(Epic::new("e", ""));
    let done = store
        .create_subtask(Subtask::new(epic, "done", "", Status::Done).scheduled(at(1, 9, 0), 30))
        .expect("done");
    store
        .create_subtask(Subtask::new(epic, "open", "", Status::New))
        .expect("open");
    let task = store
        .create_task(Task::new("t", "", Status::New).scheduled(at(1, 12, 0), 30))
        .expect("task");
    store.get(TaskKind::Subtask, done).expect("view subtask");
    store.get(TaskKind::Epic, epic).expect("view epic");
    store.get(TaskKind::Task, task).expect("view task");

    store.remove_all(TaskKind::Subtask);

    assert!(store.list(TaskKind::Subtask).is_empty());
    assert_eq!(epic_state(&store, epic), (Status::New, vec![], None, None, None));
    assert_eq!(store.history_ids(), vec![epic, task]);
    let prioritized: Vec<u64> = store.prioritized().iter().map(Item::id).collect();
    assert_eq!(prioritized, vec![task]);
}

#[test]
fn remove_all_tasks_leaves_subtasks_alone() {
    let mut store = TaskStore::new();
    let first = store
        .create_task(Task::new("a", "", Status::New).scheduled(at(1, 8, 0), 30))
        .expect("a");
    let epic = store.create_epic(Epic::new("e", ""));
    let sub = store
        .create_subtask(Subtask::new(epic, "s", "", Status::New).scheduled(at(1, 10, 0), 30))
        .expect("s");
    let second = store
        .create_task(Task::new("b", "", Status::New).scheduled(at(1, 12, 0), 30))
        .expect("b");
    store.get(TaskKind::Task, first).expect("view a");
    store.get(TaskKind::Subtask, sub).expect("view s");
    store.get(TaskKind::Task, second).expect("view b");

    store.remove_all(TaskKind::Task);

    assert!(store.list(TaskKind::Task).is_empty());
    assert_eq!(store.history_ids(), vec![sub]);
    let prioritized: Vec<u64> = store.prioritized().iter().map(Item::id).collect();
    assert_eq!(prioritized, vec![sub]);

    store
        .create_task(Task::new("reuse", "", Status::New).scheduled(at(1, 8, 0), 30))
        .expect("freed slot can be taken again");
}

#[test]
fn remove_all_epics_takes_subtasks_along() {
    let mut store = TaskStore::new();
    let epic = store.create_epic(Epic::new("e", ""));
    let sub = store
        .create_subtask(Subtask::new(epic, "s", "", Status::Done).scheduled(at(1, 10, 0), 30))
        .expect("s");
    let task = plain(&mut store, "unscheduled");
    store.get(TaskKind::Subtask, sub).expect("view s");
    store.get(TaskKind::Epic, epic).expect("view e");
    store.get(TaskKind::Task, task).expect("view t");

    store.remove_all(TaskKind::Epic);

    assert!(store.list(TaskKind::Epic).is_empty());
    assert!(store.list(TaskKind::Subtask).is_empty());
    assert_eq!(store.history_ids(), vec![task]);
    assert!(store.prioritized().is_empty());
}

fn conflicted_epic() -> (TaskStore, u64, u64, u64) {
    let mut store = TaskStore::new();
    let epic = store.create_epic(Epic::new("e", ""));
    let open = store
        .create_subtask(Subtask::new(epic, "open", "", Status::New).scheduled(at(1, 10, 0), 60))
        .expect("open");
    let done = store
        .create_subtask(Subtask::new(epic, "done", "", Status::Done).scheduled(at(1, 12, 0), 60))
        .expect("done");
    store
        .create_task(Task::new("blocker", "", Status::New).scheduled(at(1, 14, 0), 60))
        .expect("blocker");
    (store, epic, open, done)
}

#[test]
fn rejected_subtask_update_keeps_epic_aggregates() {
    let (mut store, epic, open, done) = conflicted_epic();
    let before = epic_state(&store, epic);
    assert_eq!(
        before,
        (Status::InProgress, vec![open, done], Some(at(1, 10, 0)), Some(at(1, 13, 0)), Some(120))
    );

    let err = store
        .update_subtask(
            Subtask::new(epic, "done", "", Status::New)
                .scheduled(at(1, 14, 30), 15)
                .with_id(done),
        )
        .expect_err("overlaps the blocker");
    assert!(matches!(err, StoreError::ScheduleConflict { .. }));

    assert_eq!(epic_state(&store, epic), before);
    let Some(Item::Subtask(stored)) = store.lookup(TaskKind::Subtask, done) else {
        panic!("subtask missing");
    };
    assert_eq!(stored.status, Status::Done);
    assert_eq!(stored.start_time, Some(at(1, 12, 0)));
    assert_eq!(stored.duration, Some(60));
}

#[test]
fn rejected_subtask_move_keeps_both_epics() {
    let (mut store, epic, _, done) = conflicted_epic();
    let target = store.create_epic(Epic::new("target", ""));
    let before = epic_state(&store, epic);

    let err = store
        .update_subtask(
            Subtask::new(target, "done", "", Status::Done)
                .scheduled(at(1, 14, 30), 15)
                .with_id(done),
        )
        .expect_err("overlaps the blocker");
    assert!(matches!(err, StoreError::ScheduleConflict { .. }));
    assert_eq!(epic_state(&store, epic), before);
    assert_eq!(epic_state(&store, target), (Status::New, vec![], None, None, None));

    let err = store
        .update_subtask(Subtask::new(404, "done", "", Status::Done).with_id(done))
        .expect_err("unknown epic");
    assert!(matches!(err, StoreError::NotFound { kind: TaskKind::Epic, id: 404 }));
    assert_eq!(epic_state(&store, epic), before);
    assert_eq!(store.subtasks_of(target).map(|subs| subs.len()), Some(0));
}
