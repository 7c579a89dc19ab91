use std::sync::{Arc, PoisonError, RwLock};

use tilly_core::CustomerId;

/// Value of the hidden form field the host submits.
///
/// Clones share one slot; the runtime writes it when a selection commits or
/// clears, and the host reads it at form-submission time. An empty string
/// means no customer is selected.
#[derive(Clone, Debug, Default)]
pub struct SelectionField {
    value: Arc<RwLock<String>>,
}

impl SelectionField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self) -> String {
        self.value.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn selected_id(&self) -> Option<CustomerId> {
        let value = self.value();
        if value.is_empty() {
            None
        } else {
            Some(CustomerId(value))
        }
    }

    pub fn is_empty(&self) -> bool {
        self.value.read().unwrap_or_else(PoisonError::into_inner).is_empty()
    }

    pub(crate) fn assign(&self, id: &CustomerId) {
        *self.value.write().unwrap_or_else(PoisonError::into_inner) = id.as_str().to_string();
    }

    pub(crate) fn reset(&self) {
        self.value.write().unwrap_or_else(PoisonError::into_inner).clear();
    }
}
