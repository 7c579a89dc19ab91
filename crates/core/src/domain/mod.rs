pub mod customer;

pub use customer::{Customer, CustomerId, PickerEntry};
