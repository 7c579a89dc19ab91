use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PickerState {
    Empty,
    Searching,
    ResultsShown,
    Selected,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PickerEvent {
    QueryIssued,
    ResultsReceived,
    SearchFailed,
    EntrySelected,
    SelectionCleared,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PickerAction {
    DispatchSearch,
    RenderEntries,
    AnnounceSearchFailure,
    PublishSelection,
    ClearSelection,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: PickerState,
    pub to: PickerState,
    pub event: PickerEvent,
    pub actions: Vec<PickerAction>,
}
