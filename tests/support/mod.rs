#![allow(dead_code)]

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use chrono::{NaiveDate, NaiveDateTime};
use tempfile::TempDir;

/// 2026-04-`day` at `hour:minute`.
pub fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 4, day)
        .and_then(|date| date.and_hms_opt(hour, minute, 0))
        .expect("valid date")
}

/// A scratch directory with its own data file.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("failed to create tempdir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn data_file(&self) -> PathBuf {
        self.dir.path().join("tasks.csv")
    }

    pub fn read_data(&self) -> String {
        std::fs::read_to_string(self.data_file()).expect("data file")
    }

    /// `tracker` running inside the workspace, with RUST_LOG cleared.
    pub fn tracker(&self) -> Command {
        let mut cmd = Command::cargo_bin("tracker").expect("binary");
        cmd.current_dir(self.path())
            .env_remove("RUST_LOG")
            .env_remove("TRACKER_CONFIG")
            .env("TRACKER_DATA", self.data_file());
        cmd
    }

    /// Run `tracker --json <args>` and parse the envelope.
    pub fn json(&self, args: &[&str]) -> serde_json::Value {
        let output = self
            .tracker()
            .arg("--json")
            .args(args)
            .output()
            .expect("run tracker");
        serde_json::from_slice(&output.stdout).expect("json envelope")
    }
}
