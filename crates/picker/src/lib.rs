//! Customer Picker - debounced search-as-you-type selection runtime
//!
//! This crate wires the picker state machine from `tilly-core` to a remote
//! customer directory and to the selection field the host form submits:
//! - **Directory** (`directory`) - HTTP client for the customer search endpoint
//! - **Runtime** (`runtime`) - single-task event loop (debounce, dispatch, render)
//! - **Selection** (`selection`) - the hidden-field value shared with the host
//!
//! # Key Types
//!
//! - `PickerRuntime` - event loop that owns every piece of picker state
//! - `PickerHandle` - command side (keystrokes, selections, clears)
//! - `PickerUpdate` - render stream consumed by the host
//! - `CustomerDirectory` - pluggable trait over the search endpoint

pub mod directory;
pub mod runtime;
pub mod selection;

pub use directory::{CustomerDirectory, DirectoryError, HttpCustomerDirectory};
pub use runtime::{PickerClosed, PickerHandle, PickerRuntime, PickerUpdate};
pub use selection::SelectionField;
