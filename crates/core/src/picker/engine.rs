use thiserror::Error;

use crate::picker::states::{PickerAction, PickerEvent, PickerState, TransitionOutcome};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("invalid transition from {state:?} using event {event:?}")]
    InvalidTransition { state: PickerState, event: PickerEvent },
}

pub fn transition(
    current: &PickerState,
    event: &PickerEvent,
) -> Result<TransitionOutcome, TransitionError> {
    use PickerAction::{
        AnnounceSearchFailure, ClearSelection, DispatchSearch, PublishSelection, RenderEntries,
    };
    use PickerEvent::{
        EntrySelected, QueryIssued, ResultsReceived, SearchFailed, SelectionCleared,
    };
    use PickerState::{Empty, ResultsShown, Searching, Selected};

    let (to, actions) = match (current, event) {
        (_, QueryIssued) => (Searching, vec![DispatchSearch]),
        (Searching, ResultsReceived) => (ResultsShown, vec![RenderEntries]),
        (Searching, SearchFailed) => {
            (ResultsShown, vec![RenderEntries, AnnounceSearchFailure])
        }
        (Searching, EntrySelected) | (ResultsShown, EntrySelected) | (Selected, EntrySelected) => {
            (Selected, vec![PublishSelection])
        }
        // A committed id survives a re-search; only an empty picker has nothing to clear.
        (Searching, SelectionCleared)
        | (ResultsShown, SelectionCleared)
        | (Selected, SelectionCleared) => (Empty, vec![ClearSelection]),
        _ => {
            return Err(TransitionError::InvalidTransition {
                state: current.clone(),
                event: event.clone(),
            });
        }
    };

    Ok(TransitionOutcome { from: current.clone(), to, event: event.clone(), actions })
}

/// Holds the picker's current state and applies events in place.
#[derive(Clone, Debug)]
pub struct PickerMachine {
    state: PickerState,
}

impl PickerMachine {
    pub fn new() -> Self {
        Self { state: PickerState::Empty }
    }

    pub fn state(&self) -> &PickerState {
        &self.state
    }

    pub fn apply(&mut self, event: PickerEvent) -> Result<TransitionOutcome, TransitionError> {
        let outcome = transition(&self.state, &event)?;
        self.state = outcome.to.clone();
        Ok(outcome)
    }
}

impl Default for PickerMachine {
    fn default() -> Self {
        Self::new()
    }
}
