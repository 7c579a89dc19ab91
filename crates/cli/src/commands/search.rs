use serde::Serialize;
use tilly_core::config::{AppConfig, LoadOptions};
use tilly_core::PickerEntry;
use tilly_picker::{CustomerDirectory, HttpCustomerDirectory};

use crate::commands::CommandResult;

#[derive(Debug, Serialize)]
struct SearchReport {
    command: &'static str,
    term: String,
    entries: Vec<PickerEntry>,
}

pub fn run(term: &str, json_output: bool) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("search", "config_validation", error.to_string(), 2)
        }
    };

    let directory = match HttpCustomerDirectory::new(&config.directory) {
        Ok(directory) => directory,
        Err(error) => {
            return CommandResult::failure("search", "directory_client", error.to_string(), 3)
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "search",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                4,
            );
        }
    };

    let customers = match runtime.block_on(directory.search(term)) {
        Ok(customers) => customers,
        Err(error) => {
            return CommandResult::failure("search", "directory_search", error.to_string(), 3)
        }
    };

    let entries: Vec<PickerEntry> = customers.iter().map(PickerEntry::from).collect();

    if json_output {
        let report = SearchReport { command: "search", term: term.to_string(), entries };
        let output = serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"command\":\"search\",\"error\":\"{}\"}}",
                error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
            )
        });
        return CommandResult { exit_code: 0, output };
    }

    let mut lines = vec![format!("{} customer(s) for term `{term}`:", entries.len())];
    for (index, entry) in entries.iter().enumerate() {
        lines.push(format!("{index}. {}", entry.label));
    }

    CommandResult { exit_code: 0, output: lines.join("\n") }
}
