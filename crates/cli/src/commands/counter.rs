use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use tokio::sync::mpsc;

use tilly_core::config::{AppConfig, LoadOptions};
use tilly_core::notices;
use tilly_core::PickerEntry;
use tilly_picker::{
    HttpCustomerDirectory, PickerHandle, PickerRuntime, PickerUpdate, SelectionField,
};

use crate::commands::CommandResult;

#[derive(Debug, Serialize)]
struct SubmissionPayload {
    selected_customer_id: String,
    submitted_at: String,
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("counter", "config_validation", error.to_string(), 2)
        }
    };

    init_logging(&config);

    let directory = match HttpCustomerDirectory::new(&config.directory) {
        Ok(directory) => directory,
        Err(error) => {
            return CommandResult::failure("counter", "directory_client", error.to_string(), 3)
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "counter",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                4,
            );
        }
    };

    let outcome = runtime.block_on(async {
        let selection = SelectionField::new();
        let (picker, handle, mut updates) =
            PickerRuntime::bind(config.picker.clone(), Arc::new(directory), selection.clone());
        tokio::spawn(picker.run());

        let stdin = io::stdin();
        let mut lines = stdin.lock().lines();
        let mut stdout = io::stdout();

        session(
            &mut lines,
            &mut stdout,
            &handle,
            &mut updates,
            &selection,
            config.picker.allow_clear,
            &config.picker.placeholder,
        )
        .await
    });

    match outcome {
        Ok(payload) => {
            let serialized = serde_json::to_string(&payload)
                .unwrap_or_else(|_| String::from("{\"selected_customer_id\":\"\"}"));
            CommandResult::success("counter", format!("submission {serialized}"))
        }
        Err(error) => CommandResult::failure("counter", "session_io", format!("{error:#}"), 4),
    }
}

fn init_logging(config: &AppConfig) {
    use tilly_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

/// Drives one counter session over line-based input.
///
/// Plain lines are forwarded to the picker as search terms. Lines starting
/// with `:` are session commands. Each forwarded command settles with exactly
/// one picker update before the next line is read, so the transcript order is
/// stable.
async fn session<I, W>(
    lines: &mut I,
    out: &mut W,
    handle: &PickerHandle,
    updates: &mut mpsc::UnboundedReceiver<PickerUpdate>,
    selection: &SelectionField,
    allow_clear: bool,
    placeholder: &str,
) -> Result<SubmissionPayload>
where
    I: Iterator<Item = io::Result<String>>,
    W: Write,
{
    writeln!(out, "counter session ready; {placeholder}")?;
    writeln!(out, "commands: :select N, :clear, :shop, :stock NAME, :submit")?;

    let mut rendered: Vec<PickerEntry> = Vec::new();

    for line in lines {
        let line = line.context("failed to read counter input")?;
        let line = line.trim();

        if line == ":submit" {
            break;
        }

        if line == ":shop" {
            writeln!(out, "{}", notices::SHOP_NOW_ACKNOWLEDGEMENT)?;
            continue;
        }

        if line == ":stock" {
            writeln!(out, "usage: :stock NAME")?;
            continue;
        }

        if let Some(medicine) = line.strip_prefix(":stock ") {
            writeln!(out, "{}", notices::stock_request_acknowledgement(medicine.trim()))?;
            continue;
        }

        if line == ":clear" {
            if !allow_clear {
                writeln!(out, "clearing is disabled for this picker")?;
                continue;
            }
            if selection.is_empty() {
                writeln!(out, "nothing is selected")?;
                continue;
            }
            handle.clear().await?;
            settle_one(out, updates, &mut rendered).await?;
            continue;
        }

        if line == ":select" {
            writeln!(out, "usage: :select N")?;
            continue;
        }

        if let Some(index) = line.strip_prefix(":select ") {
            let Ok(index) = index.trim().parse::<usize>() else {
                writeln!(out, "usage: :select N")?;
                continue;
            };
            let Some(entry) = rendered.get(index) else {
                writeln!(out, "no entry {index}; pick one of the listed numbers")?;
                continue;
            };
            handle.select(entry.id.clone()).await?;
            settle_one(out, updates, &mut rendered).await?;
            continue;
        }

        if line.starts_with(':') {
            writeln!(out, "unknown command `{line}`")?;
            continue;
        }

        handle.input(line).await?;
        settle_one(out, updates, &mut rendered).await?;
        // A failed search queues a notice right behind its empty render.
        if let Ok(update) = updates.try_recv() {
            apply_update(out, update, &mut rendered)?;
        }
    }

    Ok(SubmissionPayload {
        selected_customer_id: selection.value(),
        submitted_at: Utc::now().to_rfc3339(),
    })
}

async fn settle_one<W: Write>(
    out: &mut W,
    updates: &mut mpsc::UnboundedReceiver<PickerUpdate>,
    rendered: &mut Vec<PickerEntry>,
) -> Result<()> {
    let update = updates.recv().await.context("picker runtime stopped")?;
    apply_update(out, update, rendered)
}

fn apply_update<W: Write>(
    out: &mut W,
    update: PickerUpdate,
    rendered: &mut Vec<PickerEntry>,
) -> Result<()> {
    match update {
        PickerUpdate::EntriesRendered { term, entries } => {
            if entries.is_empty() {
                writeln!(out, "no customers match `{term}`")?;
            } else {
                writeln!(out, "customers matching `{term}`:")?;
                for (index, entry) in entries.iter().enumerate() {
                    writeln!(out, "  {index}. {}", entry.label)?;
                }
            }
            *rendered = entries;
        }
        PickerUpdate::SearchFailed { term, reason } => {
            writeln!(out, "search for `{term}` failed: {reason}")?;
        }
        PickerUpdate::SelectionChanged { selected } => match selected {
            Some(id) => writeln!(out, "selected customer `{id}`")?,
            None => {
                // The runtime forgets its rendered list on clear; this mirror must match
                // or a later :select would reference entries the picker no longer knows.
                rendered.clear();
                writeln!(out, "selection cleared")?;
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;

    use async_trait::async_trait;
    use tilly_core::config::PickerConfig;
    use tilly_core::{Customer, CustomerId};
    use tilly_picker::{CustomerDirectory, DirectoryError};
    use tokio::sync::Mutex;
    use tokio::time::Duration;

    struct ScriptedDirectory {
        replies: Mutex<VecDeque<Result<Vec<Customer>, DirectoryError>>>,
    }

    #[async_trait]
    impl CustomerDirectory for ScriptedDirectory {
        async fn search(&self, _term: &str) -> Result<Vec<Customer>, DirectoryError> {
            self.replies.lock().await.pop_front().unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn customer(id: &str, text: &str, points: u32) -> Customer {
        Customer {
            id: CustomerId::from(id),
            display_text: text.to_string(),
            loyalty_points: points,
        }
    }

    fn roster() -> Vec<Customer> {
        vec![
            customer("7", "Jane Doe (555-0142)", 120),
            customer("12", "Sam Patel (555-0000)", 0),
        ]
    }

    async fn run_session(
        script: Vec<Result<Vec<Customer>, DirectoryError>>,
        input: &str,
        allow_clear: bool,
    ) -> (String, SubmissionPayload) {
        let directory = Arc::new(ScriptedDirectory { replies: Mutex::new(script.into()) });
        let selection = SelectionField::new();
        let config = PickerConfig {
            placeholder: "Search customer by name or phone...".to_string(),
            allow_clear,
            request_delay_ms: 1,
        };
        let (picker, handle, mut updates) =
            PickerRuntime::bind(config, directory, selection.clone());
        tokio::spawn(picker.run());

        let mut lines = input.lines().map(|line| Ok::<String, io::Error>(line.to_string()));
        let mut out: Vec<u8> = Vec::new();

        let payload = tokio::time::timeout(
            Duration::from_secs(30),
            session(
                &mut lines,
                &mut out,
                &handle,
                &mut updates,
                &selection,
                allow_clear,
                "Search customer by name or phone...",
            ),
        )
        .await
        .expect("every forwarded command must settle with an update")
        .expect("session should settle");

        (String::from_utf8(out).expect("session transcript should be utf8"), payload)
    }

    #[tokio::test(start_paused = true)]
    async fn search_select_submit_carries_the_chosen_id() {
        let (transcript, payload) =
            run_session(vec![Ok(roster())], "jane\n:select 0\n:submit\n", true).await;

        assert!(transcript.contains("customers matching `jane`:"));
        assert!(transcript.contains("0. Jane Doe (555-0142) - Points: 120"));
        assert!(transcript.contains("selected customer `7`"));
        assert_eq!(payload.selected_customer_id, "7");
    }

    #[tokio::test(start_paused = true)]
    async fn clear_resets_the_submission_to_empty() {
        let (transcript, payload) =
            run_session(vec![Ok(roster())], "jane\n:select 1\n:clear\n:submit\n", true).await;

        assert!(transcript.contains("selected customer `12`"));
        assert!(transcript.contains("selection cleared"));
        assert_eq!(payload.selected_customer_id, "");
    }

    #[tokio::test(start_paused = true)]
    async fn clear_after_a_second_search_still_settles() {
        let script = vec![Ok(roster()), Ok(vec![customer("19", "Janet Ng (555-0190)", 40)])];
        let (transcript, payload) =
            run_session(script, "jane\n:select 0\njanet\n:clear\n:submit\n", true).await;

        assert!(transcript.contains("customers matching `janet`:"));
        assert!(transcript.contains("selection cleared"));
        assert_eq!(payload.selected_customer_id, "");
    }

    #[tokio::test(start_paused = true)]
    async fn select_after_clear_waits_for_a_fresh_search() {
        let (transcript, payload) = run_session(
            vec![Ok(roster())],
            "jane\n:select 0\n:clear\n:select 0\n:submit\n",
            true,
        )
        .await;

        assert!(transcript.contains("selection cleared"));
        assert!(transcript.contains("no entry 0; pick one of the listed numbers"));
        assert_eq!(payload.selected_customer_id, "");
    }

    #[tokio::test(start_paused = true)]
    async fn clear_is_refused_when_disabled() {
        let (transcript, payload) =
            run_session(vec![Ok(roster())], "jane\n:select 0\n:clear\n:submit\n", false).await;

        assert!(transcript.contains("clearing is disabled for this picker"));
        assert_eq!(payload.selected_customer_id, "7");
    }

    #[tokio::test(start_paused = true)]
    async fn shop_and_stock_print_their_notices() {
        let (transcript, payload) =
            run_session(Vec::new(), ":shop\n:stock Paracetamol\n:submit\n", true).await;

        assert!(transcript.contains("Shop Now button clicked!"));
        assert!(transcript.contains(
            "Stock request for Paracetamol has been noted. We'll notify when available."
        ));
        assert_eq!(payload.selected_customer_id, "");
    }

    #[tokio::test(start_paused = true)]
    async fn failed_search_reports_and_keeps_the_selection() {
        let script = vec![Ok(roster()), Err(DirectoryError::Status(500))];
        let (transcript, payload) =
            run_session(script, "jane\n:select 0\nzzz\n:submit\n", true).await;

        assert!(transcript.contains("no customers match `zzz`"));
        assert!(transcript.contains("search for `zzz` failed"));
        assert_eq!(payload.selected_customer_id, "7");
    }

    #[tokio::test(start_paused = true)]
    async fn out_of_range_select_is_guided_without_side_effects() {
        let (transcript, payload) =
            run_session(vec![Ok(roster())], "jane\n:select 9\n:submit\n", true).await;

        assert!(transcript.contains("no entry 9; pick one of the listed numbers"));
        assert_eq!(payload.selected_customer_id, "");
    }

    #[tokio::test(start_paused = true)]
    async fn second_clear_is_a_quiet_no_op() {
        let (transcript, payload) = run_session(
            vec![Ok(roster())],
            "jane\n:select 0\n:clear\n:clear\n:submit\n",
            true,
        )
        .await;

        assert!(transcript.contains("nothing is selected"));
        assert_eq!(payload.selected_customer_id, "");
        assert_eq!(transcript.matches("selection cleared").count(), 1);
    }
}
