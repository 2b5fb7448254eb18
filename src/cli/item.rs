//! tracker task/epic/subtask command implementations

use crate::config::Config;
use crate::error::{Error, Result};
use crate::output::{emit_success, OutputOptions, Report};
use crate::server::dto::ItemView;
use crate::storage::FileStore;
use crate::store::StoreError;
use crate::task::{
    end_of, format_date_time, parse_date_time, Epic, Item, Status, Subtask, Task, TaskId, TaskKind,
};

use super::ItemCommands;

/// Options for `<kind> add`
pub struct AddOptions {
    pub kind: TaskKind,
    pub name: String,
    pub description: String,
    pub status: Option<Status>,
    pub start: Option<String>,
    pub duration: Option<u32>,
    pub epic: Option<TaskId>,
}

/// Options for `<kind> update`
pub struct UpdateOptions {
    pub kind: TaskKind,
    pub id: TaskId,
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<Status>,
    pub start: Option<String>,
    pub duration: Option<u32>,
    pub epic: Option<TaskId>,
    pub clear_schedule: bool,
}

#[derive(serde::Serialize)]
struct ListOutput {
    total: usize,
    items: Vec<ItemView>,
}

#[derive(serde::Serialize)]
struct ClearOutput {
    kind: TaskKind,
    removed: usize,
}

pub fn run(kind: TaskKind, command: ItemCommands, config: Config, output: OutputOptions) -> Result<()> {
    let mut files = FileStore::from_config(&config)?;
    match command {
        ItemCommands::Add {
            name,
            description,
            status,
            start,
            duration,
            epic,
        } => run_add(
            &mut files,
            AddOptions {
                kind,
                name,
                description,
                status,
                start,
                duration,
                epic,
            },
            output,
        ),
        ItemCommands::Update {
            id,
            name,
            description,
            status,
            start,
            duration,
            epic,
            clear_schedule,
        } => run_update(
            &mut files,
            UpdateOptions {
                kind,
                id,
                name,
                description,
                status,
                start,
                duration,
                epic,
                clear_schedule,
            },
            output,
        ),
        ItemCommands::Show { id } => run_show(&mut files, kind, id, output),
        ItemCommands::List => run_list(&files, kind, output),
        ItemCommands::Rm { id } => run_rm(&mut files, kind, id, output),
        ItemCommands::Clear => run_clear(&mut files, kind, output),
        ItemCommands::Subtasks { id } => {
            if kind != TaskKind::Epic {
                return Err(Error::InvalidArgument(format!(
                    "'subtasks' only applies to epics, not {kind}s"
                )));
            }
            run_subtasks(&mut files, id, output)
        }
    }
}

fn parse_start(raw: &str) -> Result<chrono::NaiveDateTime> {
    parse_date_time(raw).ok_or_else(|| {
        Error::InvalidArgument(format!(
            "invalid --start '{raw}' (expected dd.MM.yyyy HH:mm)"
        ))
    })
}

fn reject_for_epic(kind: TaskKind, flags: &[(&str, bool)]) -> Result<()> {
    if kind != TaskKind::Epic {
        return Ok(());
    }
    for (flag, present) in flags {
        if *present {
            return Err(Error::InvalidArgument(format!(
                "--{flag} does not apply to epics; it is derived from subtasks"
            )));
        }
    }
    Ok(())
}

fn check_schedule(start: &Option<chrono::NaiveDateTime>, duration: &Option<u32>) -> Result<()> {
    match (start, duration) {
        (Some(start), Some(minutes)) if end_of(*start, *minutes).is_none() => Err(
            Error::InvalidArgument(format!(
                "--duration {minutes} from {} ends past the last representable instant",
                format_date_time(start)
            )),
        ),
        (Some(_), None) | (None, Some(_)) => Err(Error::InvalidArgument(
            "--start and --duration must be set together".to_string(),
        )),
        _ => Ok(()),
    }
}

pub(crate) fn describe(view: &ItemView) -> String {
    let mut line = format!("#{} [{}] {} ({})", view.id, view.kind, view.name, view.status);
    if let (Some(start), Some(end)) = (&view.start_time, &view.end_time) {
        line.push_str(&format!(" {start} - {end}"));
    }
    if let Some(epic) = view.epic_id {
        line.push_str(&format!(" epic #{epic}"));
    }
    line
}

fn item_report(title: String, view: &ItemView) -> Report {
    let description = Some(&view.description).filter(|text| !text.is_empty());
    let subtasks = view.subtask_ids.as_ref().map(|ids| {
        ids.iter()
            .map(TaskId::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    });
    Report::new(title)
        .field("Name", &view.name)
        .field_opt("Description", description)
        .field("Status", view.status)
        .field_opt("Start", view.start_time.as_ref())
        .field_opt("Duration", view.duration.map(|minutes| format!("{minutes} min")))
        .field_opt("End", view.end_time.as_ref())
        .field_opt("Epic", view.epic_id)
        .field_opt("Subtasks", subtasks)
}

fn list_report(title: String, items: &[ItemView]) -> Report {
    Report::new(title)
        .field("Total", items.len())
        .lines(items.iter().map(describe))
}

fn stored_view(files: &FileStore, kind: TaskKind, id: TaskId) -> Result<ItemView> {
    files
        .store()
        .lookup(kind, id)
        .map(ItemView::from)
        .ok_or(Error::Store(StoreError::NotFound { kind, id }))
}

pub fn run_add(files: &mut FileStore, options: AddOptions, output: OutputOptions) -> Result<()> {
    let kind = options.kind;
    let name = options.name.trim().to_string();
    if name.is_empty() {
        return Err(Error::InvalidArgument("name cannot be empty".to_string()));
    }
    reject_for_epic(
        kind,
        &[
            ("status", options.status.is_some()),
            ("start", options.start.is_some()),
            ("duration", options.duration.is_some()),
        ],
    )?;
    if kind != TaskKind::Subtask && options.epic.is_some() {
        return Err(Error::InvalidArgument(
            "--epic only applies to subtasks".to_string(),
        ));
    }

    let start = options.start.as_deref().map(parse_start).transpose()?;
    check_schedule(&start, &options.duration)?;
    let status = options.status.unwrap_or_default();

    let item = match kind {
        TaskKind::Task => Item::Task(Task {
            id: 0,
            name,
            description: options.description,
            status,
            start_time: start,
            duration: options.duration,
        }),
        TaskKind::Epic => Item::Epic(Epic::new(name, options.description)),
        TaskKind::Subtask => {
            let epic_id = options.epic.ok_or_else(|| {
                Error::InvalidArgument("subtasks need --epic <id>".to_string())
            })?;
            Item::Subtask(Subtask {
                id: 0,
                epic_id,
                name,
                description: options.description,
                status,
                start_time: start,
                duration: options.duration,
            })
        }
    };

    let id = files.create(item)?;
    let view = stored_view(files, kind, id)?;
    let report = item_report(format!("Created {kind} {id}"), &view)
        .hint(format!("tracker {kind} show {id}"));
    emit_success(output, &format!("{kind} add"), &view, &report)
}

pub fn run_update(files: &mut FileStore, options: UpdateOptions, output: OutputOptions) -> Result<()> {
    let kind = options.kind;
    let id = options.id;
    reject_for_epic(
        kind,
        &[
            ("status", options.status.is_some()),
            ("start", options.start.is_some()),
            ("duration", options.duration.is_some()),
            ("clear-schedule", options.clear_schedule),
        ],
    )?;
    if kind != TaskKind::Subtask && options.epic.is_some() {
        return Err(Error::InvalidArgument(
            "--epic only applies to subtasks".to_string(),
        ));
    }
    if let Some(name) = &options.name {
        if name.trim().is_empty() {
            return Err(Error::InvalidArgument("name cannot be empty".to_string()));
        }
    }
    let start = options.start.as_deref().map(parse_start).transpose()?;

    let mut item = files
        .store()
        .lookup(kind, id)
        .ok_or(Error::Store(StoreError::NotFound { kind, id }))?;

    match &mut item {
        Item::Task(Task {
            name,
            description,
            status,
            start_time,
            duration,
            ..
        })
        | Item::Subtask(Subtask {
            name,
            description,
            status,
            start_time,
            duration,
            ..
        }) => {
            if let Some(value) = options.name {
                *name = value.trim().to_string();
            }
            if let Some(value) = options.description {
                *description = value;
            }
            if let Some(value) = options.status {
                *status = value;
            }
            if options.clear_schedule {
                *start_time = None;
                *duration = None;
            }
            if start.is_some() {
                *start_time = start;
            }
            if options.duration.is_some() {
                *duration = options.duration;
            }
            check_schedule(start_time, duration)?;
        }
        Item::Epic(epic) => {
            if let Some(value) = options.name {
                epic.name = value.trim().to_string();
            }
            if let Some(value) = options.description {
                epic.description = value;
            }
        }
    }
    if let (Item::Subtask(subtask), Some(epic)) = (&mut item, options.epic) {
        subtask.epic_id = epic;
    }

    files.update(item)?;
    let view = stored_view(files, kind, id)?;
    let report = item_report(format!("Updated {kind} {id}"), &view);
    emit_success(output, &format!("{kind} update"), &view, &report)
}

pub fn run_show(files: &mut FileStore, kind: TaskKind, id: TaskId, output: OutputOptions) -> Result<()> {
    let view = ItemView::from(files.get(kind, id)?);
    let report = item_report(format!("{} {id}", capitalize(kind.as_str())), &view);
    emit_success(output, &format!("{kind} show"), &view, &report)
}

pub fn run_list(files: &FileStore, kind: TaskKind, output: OutputOptions) -> Result<()> {
    let items: Vec<ItemView> = files.list(kind).iter().map(ItemView::from).collect();
    let data = ListOutput {
        total: items.len(),
        items,
    };
    let report = list_report(format!("{}s", capitalize(kind.as_str())), &data.items);
    emit_success(output, &format!("{kind} list"), &data, &report)
}

pub fn run_rm(files: &mut FileStore, kind: TaskKind, id: TaskId, output: OutputOptions) -> Result<()> {
    let view = ItemView::from(files.remove(kind, id)?);
    let mut report = Report::new(format!("Removed {kind} {id}"));
    if let Some(subtasks) = view.subtask_ids.as_ref().filter(|ids| !ids.is_empty()) {
        report = report.warning(format!("also removed {} subtask(s)", subtasks.len()));
    }
    emit_success(output, &format!("{kind} rm"), &view, &report)
}

pub fn run_clear(files: &mut FileStore, kind: TaskKind, output: OutputOptions) -> Result<()> {
    let removed = files.list(kind).len();
    let cascaded = if kind == TaskKind::Epic {
        files.list(TaskKind::Subtask).len()
    } else {
        0
    };
    files.remove_all(kind)?;

    let data = ClearOutput { kind, removed };
    let mut report = Report::new(format!("Removed all {kind}s")).field("Removed", removed);
    if cascaded > 0 {
        report = report.warning(format!("also removed {cascaded} subtask(s)"));
    }
    emit_success(output, &format!("{kind} clear"), &data, &report)
}

pub fn run_subtasks(files: &mut FileStore, epic_id: TaskId, output: OutputOptions) -> Result<()> {
    let items: Vec<ItemView> = files
        .subtasks_of(epic_id)?
        .into_iter()
        .map(|subtask| ItemView::from(Item::Subtask(subtask)))
        .collect();
    let data = ListOutput {
        total: items.len(),
        items,
    };
    let report = list_report(format!("Subtasks of epic {epic_id}"), &data.items);
    emit_success(output, "epic subtasks", &data, &report)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
