use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier a customer record carries in the directory.
///
/// Directories key customers by numbers or strings; both are held in canonical
/// text form so the value can be copied into the selection field unchanged.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomerId(pub String);

impl CustomerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CustomerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub display_text: String,
    pub loyalty_points: u32,
}

/// One dropdown row, ready for the host to render verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickerEntry {
    pub id: CustomerId,
    pub label: String,
}

impl From<&Customer> for PickerEntry {
    fn from(customer: &Customer) -> Self {
        Self {
            id: customer.id.clone(),
            label: format!("{} - Points: {}", customer.display_text, customer.loyalty_points),
        }
    }
}
