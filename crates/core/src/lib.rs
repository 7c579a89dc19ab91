pub mod config;
pub mod domain;
pub mod notices;
pub mod picker;

pub use domain::customer::{Customer, CustomerId, PickerEntry};
pub use picker::engine::{transition, PickerMachine, TransitionError};
pub use picker::states::{PickerAction, PickerEvent, PickerState, TransitionOutcome};
