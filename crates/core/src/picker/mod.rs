pub mod engine;
pub mod states;

pub use engine::{transition, PickerMachine, TransitionError};
pub use states::{PickerAction, PickerEvent, PickerState, TransitionOutcome};
