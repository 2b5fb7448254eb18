//! Snapshot persistence for the task store
//!
//! The whole store is written to one flat text file after every change:
//!
//! ```text
//! id,type,name,status,description,epic,start,duration
//! 0,TASK,Buy bread,NEW,Corner shop,,10.04.2028 18:00,30
//! 1,EPIC,Chores,IN_PROGRESS,House work,,12.04.2026 18:00,15
//! 2,SUBTASK,Dishes,DONE,Kitchen,1,12.04.2026 18:00,15
//!
//! 2,0
//! ```
//!
//! Rows list tasks by id, then every epic followed by its subtasks in the
//! epic's order. The line after the blank separator holds the viewed ids,
//! oldest first. Fields with `,`, `"` or a line break are quoted with `""`
//! escaping; absent values are empty.

use std::collections::HashSet;
use std::mem;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::lock::SnapshotLock;
use crate::store::TaskStore;
use crate::task::{
    end_of, format_date_time, parse_date_time, Epic, Item, Status, Subtask, Task, TaskId, TaskKind,
};

/// First line of every snapshot.
pub const HEADER: &str = "id,type,name,status,description,epic,start,duration";

const COLUMNS: usize = 8;

// =============================================================================
// Encoding
// =============================================================================

/// Render the full store as a snapshot.
pub fn encode(store: &TaskStore) -> String {
    let mut out = String::new();
    out.push_str(HEADER);
    out.push('\n');

    for task in store.tasks() {
        push_row(&mut out, &Item::Task(task.clone()));
    }
    for epic in store.epics() {
        push_row(&mut out, &Item::Epic(epic.clone()));
        for subtask in store.subtasks_of(epic.id).unwrap_or_default() {
            push_row(&mut out, &Item::Subtask(subtask));
        }
    }

    out.push('\n');
    let history: Vec<String> = store.history_ids().iter().map(|id| id.to_string()).collect();
    out.push_str(&history.join(","));
    out.push('\n');
    out
}

fn push_row(out: &mut String, item: &Item) {
    let fields = [
        item.id().to_string(),
        item.kind().tag().to_string(),
        item.name().to_string(),
        item.status().to_string(),
        item.description().to_string(),
        item.epic_id().map(|id| id.to_string()).unwrap_or_default(),
        item.start_time()
            .map(|start| format_date_time(&start))
            .unwrap_or_default(),
        item.duration().map(|m| m.to_string()).unwrap_or_default(),
    ];
    let quoted: Vec<String> = fields.iter().map(|field| quote(field)).collect();
    out.push_str(&quoted.join(","));
    out.push('\n');
}

fn quote(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

// =============================================================================
// Decoding
// =============================================================================

#[derive(Debug)]
struct Record {
    line: usize,
    fields: Vec<String>,
    blank: bool,
}

fn invalid(line: usize, message: impl Into<String>) -> Error {
    Error::InvalidSnapshot {
        line,
        message: message.into(),
    }
}

/// Split content into records. Quoted fields may span lines.
fn read_records(content: &str) -> Result<Vec<Record>> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut start_line = 1;
    let mut record_len = 0usize;
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(mem::take(&mut field)),
            '\r' if !in_quotes && chars.peek() == Some(&'\n') => continue,
            '\n' if !in_quotes => {
                fields.push(mem::take(&mut field));
                records.push(Record {
                    line: start_line,
                    fields: mem::take(&mut fields),
                    blank: record_len == 0,
                });
                line += 1;
                start_line = line;
                record_len = 0;
                continue;
            }
            '\n' => {
                field.push('\n');
                line += 1;
            }
            other => field.push(other),
        }
        record_len += 1;
    }

    if in_quotes {
        return Err(invalid(start_line, "unterminated quoted field"));
    }
    if record_len > 0 {
        fields.push(field);
        records.push(Record {
            line: start_line,
            fields,
            blank: false,
        });
    }
    Ok(records)
}

fn parse_optional<T, F>(raw: &str, line: usize, what: &str, parse: F) -> Result<Option<T>>
where
    F: FnOnce(&str) -> Option<T>,
{
    let raw = raw.trim();
    // Older snapshots wrote "null" for absent values.
    if raw.is_empty() || raw == "null" {
        return Ok(None);
    }
    parse(raw)
        .map(Some)
        .ok_or_else(|| invalid(line, format!("invalid {what} '{raw}'")))
}

fn parse_row(record: &Record) -> Result<Item> {
    let line = record.line;
    let fields = &record.fields;
    if fields.len() != COLUMNS {
        return Err(invalid(
            line,
            format!("expected {COLUMNS} fields, found {}", fields.len()),
        ));
    }

    let id: TaskId = fields[0]
        .trim()
        .parse()
        .map_err(|_| invalid(line, format!("invalid id '{}'", fields[0])))?;
    let kind = TaskKind::from_tag(&fields[1])
        .ok_or_else(|| invalid(line, format!("unknown type '{}'", fields[1])))?;
    let name = fields[2].clone();
    let description = fields[4].clone();
    let start = parse_optional(&fields[6], line, "start", parse_date_time)?;
    let duration = parse_optional(&fields[7], line, "duration", |raw| raw.parse::<u32>().ok())?;
    if start.is_some() != duration.is_some() && kind != TaskKind::Epic {
        return Err(invalid(line, "start and duration must be set together"));
    }
    if let (Some(start), Some(minutes)) = (start, duration) {
        if kind != TaskKind::Epic && end_of(start, minutes).is_none() {
            return Err(invalid(line, "end time is past the last representable instant"));
        }
    }

    let item = match kind {
        TaskKind::Epic => Item::Epic(Epic::new(name, description).with_id(id)),
        TaskKind::Task | TaskKind::Subtask => {
            let status: Status = fields[3]
                .parse()
                .map_err(|message: String| invalid(line, message))?;
            if kind == TaskKind::Task {
                Item::Task(Task {
                    id,
                    name,
                    description,
                    status,
                    start_time: start,
                    duration,
                })
            } else {
                let epic_id = parse_optional(&fields[5], line, "epic", |raw| raw.parse().ok())?
                    .ok_or_else(|| invalid(line, "subtask without epic"))?;
                Item::Subtask(Subtask {
                    id,
                    epic_id,
                    name,
                    description,
                    status,
                    start_time: start,
                    duration,
                })
            }
        }
    };
    Ok(item)
}

/// Rebuild a store from snapshot text.
///
/// Tasks and epics are restored before subtasks, ids keep their stored
/// values, and the history line is replayed last. Empty content yields an
/// empty store.
pub fn decode(content: &str, history_limit: usize) -> Result<TaskStore> {
    let mut store = TaskStore::with_history_limit(history_limit);
    let mut records = read_records(content)?.into_iter();

    match records.next() {
        None => return Ok(store),
        Some(header) if header.fields.first().map(|f| f.trim()) == Some("id") => {}
        Some(header) => return Err(invalid(header.line, "missing header")),
    }

    let mut rows: Vec<(usize, Item)> = Vec::new();
    let mut history: Option<Record> = None;
    let mut after_separator = false;
    for record in records {
        if record.blank {
            after_separator = true;
            continue;
        }
        if !after_separator {
            rows.push((record.line, parse_row(&record)?));
        } else if history.is_none() {
            history = Some(record);
        } else {
            return Err(invalid(record.line, "unexpected content after history"));
        }
    }

    let mut seen = HashSet::new();
    for (line, item) in &rows {
        if !seen.insert(item.id()) {
            return Err(invalid(*line, format!("duplicate id {}", item.id())));
        }
    }

    let (subtasks, others): (Vec<_>, Vec<_>) = rows
        .into_iter()
        .partition(|(_, item)| item.kind() == TaskKind::Subtask);
    for (line, item) in others.into_iter().chain(subtasks) {
        store
            .restore(item)
            .map_err(|err| invalid(line, err.to_string()))?;
    }

    if let Some(record) = history {
        let mut ids = Vec::with_capacity(record.fields.len());
        for raw in &record.fields {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            let id: TaskId = raw
                .parse()
                .map_err(|_| invalid(record.line, format!("invalid history id '{raw}'")))?;
            ids.push(id);
        }
        store.replay_history(ids);
    }

    Ok(store)
}

// =============================================================================
// File-backed store
// =============================================================================

/// A [`TaskStore`] that writes its snapshot after every change.
///
/// The in-memory change is applied first. If the write then fails, the
/// change stays applied and the failure is returned as
/// [`Error::Persistence`].
#[derive(Debug)]
pub struct FileStore {
    store: TaskStore,
    path: PathBuf,
    lock_timeout_ms: u64,
}

impl FileStore {
    /// Load `path`, or start empty if it does not exist.
    pub fn open(path: impl Into<PathBuf>, history_limit: usize, lock_timeout_ms: u64) -> Result<Self> {
        let path = path.into();
        let content = SnapshotLock::acquire(&path, lock_timeout_ms)?.read()?;
        let store = match content {
            Some(content) => decode(&content, history_limit)?,
            None => TaskStore::with_history_limit(history_limit),
        };
        info!(
            path = %path.display(),
            tasks = store.tasks().count(),
            epics = store.epics().count(),
            subtasks = store.subtasks().count(),
            "snapshot loaded"
        );
        Ok(Self {
            store,
            path,
            lock_timeout_ms,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::open(
            &config.storage.data_file,
            config.history.limit,
            config.storage.lock_timeout_ms,
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read-only access to the wrapped store.
    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    /// Write the current state to disk.
    pub fn save(&self) -> Result<()> {
        let snapshot = encode(&self.store);
        SnapshotLock::acquire(&self.path, self.lock_timeout_ms)
            .and_then(|lock| lock.replace(snapshot.as_bytes()))
            .map_err(|err| {
                warn!(path = %self.path.display(), error = %err, "snapshot write failed");
                Error::Persistence {
                    path: self.path.clone(),
                    source: Box::new(err),
                }
            })?;
        debug!(path = %self.path.display(), "snapshot written");
        Ok(())
    }

    fn saved<T>(&self, value: T) -> Result<T> {
        self.save()?;
        Ok(value)
    }

    pub fn create(&mut self, item: Item) -> Result<TaskId> {
        let id = self.store.create(item)?;
        self.saved(id)
    }

    pub fn update(&mut self, item: Item) -> Result<()> {
        self.store.update(item)?;
        self.saved(())
    }

    /// Fetch and record a view. The history change is persisted.
    pub fn get(&mut self, kind: TaskKind, id: TaskId) -> Result<Item> {
        let item = self.store.get(kind, id)?;
        self.saved(item)
    }

    pub fn list(&self, kind: TaskKind) -> Vec<Item> {
        self.store.list(kind)
    }

    pub fn remove(&mut self, kind: TaskKind, id: TaskId) -> Result<Item> {
        let item = self.store.remove(kind, id)?;
        self.saved(item)
    }

    pub fn remove_all(&mut self, kind: TaskKind) -> Result<()> {
        self.store.remove_all(kind);
        self.saved(())
    }

    /// Subtasks of an epic. Counts as a view of the epic.
    pub fn subtasks_of(&mut self, epic_id: TaskId) -> Result<Vec<Subtask>> {
        self.store.get(TaskKind::Epic, epic_id)?;
        let subtasks = self.store.subtasks_of(epic_id).unwrap_or_default();
        self.saved(subtasks)
    }

    pub fn history(&self) -> Vec<Item> {
        self.store.history()
    }

    pub fn prioritized(&self) -> Vec<Item> {
        self.store.prioritized()
    }
}
