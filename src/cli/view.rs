//! tracker history / prioritized command implementations

use serde::Serialize;

use crate::config::Config;
use crate::error::Result;
use crate::output::{emit_success, OutputOptions, Report};
use crate::server::dto::ItemView;
use crate::storage::FileStore;
use crate::task::Item;

use super::item::describe;

/// Options shared by the read-only view commands
pub struct ViewOptions {
    pub config: Config,
    pub output: OutputOptions,
}

#[derive(Serialize)]
struct ViewOutput {
    total: usize,
    items: Vec<ItemView>,
}

pub fn run_history(options: ViewOptions) -> Result<()> {
    let files = FileStore::from_config(&options.config)?;
    emit_items(
        options.output,
        "history",
        "Recently viewed",
        files.history(),
        "nothing viewed yet",
    )
}

pub fn run_prioritized(options: ViewOptions) -> Result<()> {
    let files = FileStore::from_config(&options.config)?;
    emit_items(
        options.output,
        "prioritized",
        "Scheduled items",
        files.prioritized(),
        "nothing scheduled",
    )
}

fn emit_items(
    output: OutputOptions,
    command: &str,
    header: &str,
    items: Vec<Item>,
    empty: &str,
) -> Result<()> {
    let items: Vec<ItemView> = items.into_iter().map(ItemView::from).collect();
    let data = ViewOutput {
        total: items.len(),
        items,
    };

    let mut report = Report::new(header).field("Total", data.total);
    if data.items.is_empty() {
        report = report.line(empty);
    }
    let report = report.lines(data.items.iter().map(describe));
    emit_success(output, command, &data, &report)
}
