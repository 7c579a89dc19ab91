use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use tilly_core::config::PickerConfig;
use tilly_core::{
    Customer, CustomerId, PickerAction, PickerEntry, PickerEvent, PickerMachine, TransitionOutcome,
};

use crate::directory::{CustomerDirectory, DirectoryError};
use crate::selection::SelectionField;

#[derive(Debug)]
enum PickerCommand {
    Input(String),
    Select(CustomerId),
    Clear,
}

/// Render stream the host consumes to refresh the dropdown and the field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PickerUpdate {
    EntriesRendered { term: String, entries: Vec<PickerEntry> },
    SearchFailed { term: String, reason: String },
    SelectionChanged { selected: Option<CustomerId> },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("picker runtime is no longer running")]
pub struct PickerClosed;

/// Command side of a bound picker. Clones address the same runtime.
#[derive(Clone, Debug)]
pub struct PickerHandle {
    commands: mpsc::Sender<PickerCommand>,
}

impl PickerHandle {
    pub async fn input(&self, term: impl Into<String>) -> Result<(), PickerClosed> {
        self.commands.send(PickerCommand::Input(term.into())).await.map_err(|_| PickerClosed)
    }

    pub async fn select(&self, id: CustomerId) -> Result<(), PickerClosed> {
        self.commands.send(PickerCommand::Select(id)).await.map_err(|_| PickerClosed)
    }

    pub async fn clear(&self) -> Result<(), PickerClosed> {
        self.commands.send(PickerCommand::Clear).await.map_err(|_| PickerClosed)
    }
}

struct SearchReply {
    seq: u64,
    term: String,
    correlation_id: String,
    result: Result<Vec<Customer>, DirectoryError>,
}

/// Event loop owning every piece of picker state.
///
/// Keystrokes re-arm one debounce deadline; when it elapses the pending term
/// is searched. Responses carry the sequence number of the query that caused
/// them, and any response older than the newest dispatched query (or older
/// than the last commit or clear) is discarded unrendered.
pub struct PickerRuntime {
    config: PickerConfig,
    directory: Arc<dyn CustomerDirectory>,
    selection: SelectionField,
    commands: mpsc::Receiver<PickerCommand>,
    replies: mpsc::Receiver<SearchReply>,
    replies_tx: mpsc::Sender<SearchReply>,
    updates: mpsc::UnboundedSender<PickerUpdate>,
    machine: PickerMachine,
    rendered: Vec<PickerEntry>,
    cache: HashMap<String, Vec<PickerEntry>>,
    pending_term: Option<String>,
    deadline: Option<Instant>,
    next_seq: u64,
    accept_floor: u64,
}

impl PickerRuntime {
    /// Binds a picker to a directory and a selection field.
    ///
    /// Nothing runs and nothing is queried until the host feeds keystrokes
    /// through the returned handle.
    pub fn bind(
        config: PickerConfig,
        directory: Arc<dyn CustomerDirectory>,
        selection: SelectionField,
    ) -> (Self, PickerHandle, mpsc::UnboundedReceiver<PickerUpdate>) {
        let (commands_tx, commands) = mpsc::channel(16);
        let (replies_tx, replies) = mpsc::channel(8);
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();

        let runtime = Self {
            config,
            directory,
            selection,
            commands,
            replies,
            replies_tx,
            updates: updates_tx,
            machine: PickerMachine::new(),
            rendered: Vec::new(),
            cache: HashMap::new(),
            pending_term: None,
            deadline: None,
            next_seq: 0,
            accept_floor: 0,
        };

        (runtime, PickerHandle { commands: commands_tx }, updates_rx)
    }

    pub async fn run(mut self) {
        info!(
            placeholder = %self.config.placeholder,
            allow_clear = self.config.allow_clear,
            request_delay_ms = self.config.request_delay_ms,
            "customer picker bound"
        );

        loop {
            let deadline = self.deadline.unwrap_or_else(Instant::now);

            tokio::select! {
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        break;
                    };
                    self.handle_command(command);
                }
                reply = self.replies.recv() => {
                    if let Some(reply) = reply {
                        self.handle_reply(reply);
                    }
                }
                _ = sleep_until(deadline), if self.deadline.is_some() => {
                    self.deadline = None;
                    self.issue_query();
                }
            }
        }

        info!("customer picker released");
    }

    fn handle_command(&mut self, command: PickerCommand) {
        match command {
            PickerCommand::Input(term) => self.schedule_query(term),
            PickerCommand::Select(id) => self.commit_selection(id),
            PickerCommand::Clear => self.clear_selection(),
        }
    }

    fn schedule_query(&mut self, term: String) {
        debug!(term = %term, "keystroke captured; debounce rearmed");
        self.pending_term = Some(term);
        self.deadline = Some(Instant::now() + Duration::from_millis(self.config.request_delay_ms));
    }

    fn issue_query(&mut self) {
        let Some(term) = self.pending_term.take() else {
            return;
        };

        let Some(outcome) = self.apply(PickerEvent::QueryIssued) else {
            return;
        };

        for action in outcome.actions {
            if action == PickerAction::DispatchSearch {
                self.dispatch_search(term.clone());
            }
        }
    }

    fn dispatch_search(&mut self, term: String) {
        let seq = self.next_seq;
        self.next_seq += 1;

        if let Some(entries) = self.cache.get(&term).cloned() {
            debug!(term = %term, seq, "serving results from session cache");
            // The cached render answers the newest query; nothing older may land.
            self.accept_floor = self.next_seq;
            self.finish_search(term, entries);
            return;
        }

        let correlation_id = Uuid::new_v4().to_string();
        info!(
            event_name = "picker.query_dispatched",
            term = %term,
            seq,
            correlation_id = %correlation_id,
            "dispatching directory search"
        );

        let directory = self.directory.clone();
        let replies = self.replies_tx.clone();
        tokio::spawn(async move {
            let result = directory.search(&term).await;
            let _ = replies.send(SearchReply { seq, term, correlation_id, result }).await;
        });
    }

    fn handle_reply(&mut self, reply: SearchReply) {
        if reply.seq < self.accept_floor || reply.seq + 1 != self.next_seq {
            debug!(
                event_name = "picker.stale_response_discarded",
                term = %reply.term,
                seq = reply.seq,
                correlation_id = %reply.correlation_id,
                "discarding superseded directory response"
            );
            return;
        }

        match reply.result {
            Ok(customers) => {
                let entries: Vec<PickerEntry> = customers.iter().map(PickerEntry::from).collect();
                self.cache.insert(reply.term.clone(), entries.clone());
                self.finish_search(reply.term, entries);
            }
            Err(error) => {
                warn!(
                    event_name = "picker.search_failed",
                    term = %reply.term,
                    correlation_id = %reply.correlation_id,
                    error = %error,
                    "directory search failed; rendering an empty list"
                );
                self.fail_search(reply.term, error);
            }
        }
    }

    fn finish_search(&mut self, term: String, entries: Vec<PickerEntry>) {
        let Some(outcome) = self.apply(PickerEvent::ResultsReceived) else {
            return;
        };

        for action in outcome.actions {
            if action == PickerAction::RenderEntries {
                self.render_entries(term.clone(), entries.clone());
            }
        }
    }

    fn fail_search(&mut self, term: String, error: DirectoryError) {
        let Some(outcome) = self.apply(PickerEvent::SearchFailed) else {
            return;
        };

        for action in outcome.actions {
            match action {
                PickerAction::RenderEntries => self.render_entries(term.clone(), Vec::new()),
                PickerAction::AnnounceSearchFailure => {
                    let update = PickerUpdate::SearchFailed {
                        term: term.clone(),
                        reason: error.to_string(),
                    };
                    let _ = self.updates.send(update);
                }
                _ => {}
            }
        }
    }

    fn render_entries(&mut self, term: String, entries: Vec<PickerEntry>) {
        info!(
            event_name = "picker.results_rendered",
            term = %term,
            entry_count = entries.len(),
            "rendering dropdown entries"
        );
        self.rendered = entries.clone();
        let _ = self.updates.send(PickerUpdate::EntriesRendered { term, entries });
    }

    fn commit_selection(&mut self, id: CustomerId) {
        let rendered = self.rendered.iter().any(|entry| entry.id == id);
        let already_selected = self.selection.selected_id().as_ref() == Some(&id);
        if !rendered && !already_selected {
            warn!(customer_id = %id, "selection ignored: not among rendered entries");
            return;
        }

        let Some(outcome) = self.apply(PickerEvent::EntrySelected) else {
            return;
        };

        // A committed choice supersedes any pending keystroke or in-flight search.
        self.accept_floor = self.next_seq;
        self.pending_term = None;
        self.deadline = None;

        for action in outcome.actions {
            if action == PickerAction::PublishSelection {
                self.selection.assign(&id);
                info!(
                    event_name = "picker.selection_published",
                    customer_id = %id,
                    "customer selected"
                );
                let update = PickerUpdate::SelectionChanged { selected: Some(id.clone()) };
                let _ = self.updates.send(update);
            }
        }
    }

    fn clear_selection(&mut self) {
        if !self.config.allow_clear {
            warn!("clear ignored: clearing is disabled for this picker");
            return;
        }
        if self.selection.is_empty() {
            debug!("clear ignored: nothing is selected");
            return;
        }

        let Some(outcome) = self.apply(PickerEvent::SelectionCleared) else {
            return;
        };

        self.accept_floor = self.next_seq;
        self.pending_term = None;
        self.deadline = None;
        self.rendered.clear();

        for action in outcome.actions {
            if action == PickerAction::ClearSelection {
                self.selection.reset();
                info!(event_name = "picker.selection_cleared", "selection cleared");
                let _ = self.updates.send(PickerUpdate::SelectionChanged { selected: None });
            }
        }
    }

    fn apply(&mut self, event: PickerEvent) -> Option<TransitionOutcome> {
        match self.machine.apply(event) {
            Ok(outcome) => {
                debug!(
                    event_name = "picker.transitioned",
                    from = ?outcome.from,
                    to = ?outcome.to,
                    event = ?outcome.event,
                    "picker state advanced"
                );
                Some(outcome)
            }
            Err(error) => {
                warn!(
                    event_name = "picker.transition_rejected",
                    error = %error,
                    "picker event rejected"
                );
                None
            }
        }
    }
}
