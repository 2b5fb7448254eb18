//! What a command prints: the `tracker.v1` JSON envelope or a plain report.

use std::fmt;

use serde::Serialize;

use crate::error::{exit_codes, Error, Result};
use crate::store::StoreError;

pub const SCHEMA_VERSION: &str = "tracker.v1";

#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
}

/// Plain-text form of a command result.
///
/// Warnings and hints are shared with the JSON envelope (`warnings`,
/// `next_steps`); the title, fields and lines are text only.
#[derive(Debug, Clone, Default)]
pub struct Report {
    title: String,
    fields: Vec<(&'static str, String)>,
    lines: Vec<String>,
    warnings: Vec<String>,
    hints: Vec<String>,
}

impl Report {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn field(mut self, label: &'static str, value: impl fmt::Display) -> Self {
        self.fields.push((label, value.to_string()));
        self
    }

    /// Adds the field only when `value` is present.
    pub fn field_opt<V: fmt::Display>(self, label: &'static str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.field(label, value),
            None => self,
        }
    }

    pub fn line(mut self, line: impl Into<String>) -> Self {
        self.lines.push(line.into());
        self
    }

    pub fn lines(mut self, lines: impl IntoIterator<Item = String>) -> Self {
        self.lines.extend(lines);
        self
    }

    pub fn warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn hint(mut self, hint: impl Into<String>) -> Self {
        self.hints.push(hint.into());
        self
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)?;
        let width = self
            .fields
            .iter()
            .map(|(label, _)| label.len())
            .max()
            .unwrap_or(0);
        for (label, value) in &self.fields {
            write!(f, "\n  {label:<width$}  {value}")?;
        }
        for line in &self.lines {
            write!(f, "\n  {line}")?;
        }
        for warning in &self.warnings {
            write!(f, "\nwarning: {warning}")?;
        }
        for hint in &self.hints {
            write!(f, "\nhint: {hint}")?;
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    schema_version: &'static str,
    command: &'a str,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<Failure>,
    #[serde(skip_serializing_if = "no_entries")]
    warnings: &'a [String],
    #[serde(skip_serializing_if = "no_entries")]
    next_steps: &'a [String],
}

#[derive(Serialize)]
struct Failure {
    message: String,
    code: i32,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

fn no_entries(entries: &&[String]) -> bool {
    entries.is_empty()
}

fn print_json<T: Serialize>(envelope: &Envelope<'_, T>) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(envelope)?);
    Ok(())
}

/// Print `data` as an envelope under `--json`, otherwise print `report`
/// unless `--quiet`.
pub fn emit_success<T: Serialize>(
    options: OutputOptions,
    command: &str,
    data: &T,
    report: &Report,
) -> Result<()> {
    if options.json {
        return print_json(&Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: "success",
            data: Some(data),
            error: None,
            warnings: &report.warnings,
            next_steps: &report.hints,
        });
    }
    if !options.quiet {
        println!("{report}");
    }
    Ok(())
}

/// Report a failed command. Text goes to stderr, the envelope to stdout.
pub fn emit_error(command: &str, err: &Error, json: bool) -> Result<()> {
    let hints: Vec<String> = recovery_hint(err).into_iter().collect();
    if json {
        return print_json::<()>(&Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: "error",
            data: None,
            error: Some(Failure {
                message: err.to_string(),
                code: err.exit_code(),
                kind: failure_kind(err),
                details: err.details(),
            }),
            warnings: &[],
            next_steps: &hints,
        });
    }

    eprintln!("error: {err}");
    for hint in &hints {
        eprintln!("hint: {hint}");
    }
    Ok(())
}

/// Command name for error envelopes, read from argv before clap parses it.
pub fn command_from_args() -> String {
    command_name(std::env::args().skip(1))
}

fn command_name(args: impl Iterator<Item = String>) -> String {
    const VALUE_FLAGS: [&str; 2] = ["--config", "--data"];

    let mut words = Vec::new();
    let mut skip_value = false;
    for arg in args {
        if skip_value {
            skip_value = false;
            continue;
        }
        if arg.starts_with('-') {
            skip_value = VALUE_FLAGS.contains(&arg.as_str());
            continue;
        }
        words.push(arg);
        let nested = matches!(words[0].as_str(), "task" | "epic" | "subtask");
        if !nested || words.len() == 2 {
            break;
        }
    }

    if words.is_empty() {
        "tracker".to_string()
    } else {
        words.join(" ")
    }
}

fn failure_kind(err: &Error) -> &'static str {
    match err.exit_code() {
        exit_codes::USER_ERROR => "user_error",
        exit_codes::SCHEDULE_CONFLICT => "schedule_conflict",
        _ => "operation_failed",
    }
}

fn recovery_hint(err: &Error) -> Option<String> {
    let hint = match err {
        Error::Store(StoreError::NotFound { kind, .. }) => format!("tracker {kind} list"),
        Error::Store(StoreError::ScheduleConflict { .. }) => "tracker prioritized".to_string(),
        Error::InvalidConfig(_) => "fix .tracker.toml then retry".to_string(),
        Error::InvalidSnapshot { .. } => "fix or move the data file, then retry".to_string(),
        Error::LockFailed(_) => "retry once the other tracker process finishes".to_string(),
        _ => return None,
    };
    Some(hint)
}
