// spiderexpress/src/commands/list.rs
//
// USE CASE: Print the registered connectors and strategies.

use comfy_table::{presets::UTF8_FULL, Table};
use spiderexpress_core::infrastructure::registry::{builtin_connectors, builtin_strategies};

pub fn execute() -> anyhow::Result<()> {
    let connectors = builtin_connectors();
    let strategies = builtin_strategies();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["kind", "name"]);
    for name in connectors.names() {
        table.add_row(vec!["connector", name]);
    }
    for name in strategies.names() {
        table.add_row(vec!["strategy", name]);
    }

    println!("{table}");
    Ok(())
}
