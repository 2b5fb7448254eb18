//! tracker - personal task tracker library
//!
//! The core is an in-memory [`store::TaskStore`] holding three kinds of
//! entity: plain tasks, epics, and subtasks owned by an epic. Epic status
//! and schedule are derived from their subtasks.
//!
//! # Module Organization
//!
//! - `task`: entity types, status and date handling
//! - `history`: bounded, de-duplicated view history
//! - `schedule`: start-ordered index that rejects overlapping slots
//! - `store`: the store itself, tying entities, history and schedule together
//! - `storage`: flat-file snapshot format and the auto-saving [`storage::FileStore`]
//! - `lock`: file locking and atomic writes
//! - `config`: configuration loading from `.tracker.toml`
//! - `server`: HTTP API over a shared `FileStore`
//! - `cli`: command-line interface using clap
//! - `output`: human and JSON output envelopes
//! - `error`: error types and exit codes

pub mod cli;
pub mod config;
pub mod error;
pub mod history;
pub mod lock;
pub mod output;
pub mod schedule;
pub mod server;
pub mod storage;
pub mod store;
pub mod task;

pub use error::{Error, Result};
