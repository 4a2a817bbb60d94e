//! Thread-safe per-index last-error record, the user-visible surface of the lifecycle controller.
//!
//! The controller never surfaces exceptions upward (§7): everything is logged and/or recorded
//! here instead. [`ErrorStore::record`] returns the previous message so callers can decide to log
//! at `ERROR` only when the message actually changed, and at `TRACE` otherwise — this is how the
//! controller avoids flooding logs with the same recurring transient failure every tick.
use std::collections::HashMap;
use std::sync::Mutex;

/// Per-index last-error record with change detection.
#[derive(Default)]
pub struct ErrorStore {
    errors: Mutex<HashMap<String, String>>,
}

impl ErrorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the latest error message for an index, returning the previous one (if any).
    pub fn record<S1, S2>(&self, index_name: S1, message: S2) -> Option<String>
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        let mut errors = self.errors.lock().expect("ErrorStore mutex poisoned");
        errors.insert(index_name.into(), message.into())
    }

    /// Clear the error recorded for an index, if any.
    pub fn clear(&self, index_name: &str) {
        let mut errors = self.errors.lock().expect("ErrorStore mutex poisoned");
        errors.remove(index_name);
    }

    /// The error currently recorded for an index, if any.
    pub fn get(&self, index_name: &str) -> Option<String> {
        let errors = self.errors.lock().expect("ErrorStore mutex poisoned");
        errors.get(index_name).cloned()
    }

    /// All indices with a currently recorded error.
    pub fn list(&self) -> HashMap<String, String> {
        let errors = self.errors.lock().expect("ErrorStore mutex poisoned");
        errors.clone()
    }

    /// Wipe every recorded error (used on mastership loss: the next master rediscovers errors).
    pub fn clear_all(&self) {
        let mut errors = self.errors.lock().expect("ErrorStore mutex poisoned");
        errors.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::ErrorStore;

    #[test]
    fn record_returns_previous_message() {
        let store = ErrorStore::new();
        assert_eq!(store.record("idx-1", "boom"), None);
        assert_eq!(
            store.record("idx-1", "boom again"),
            Some("boom".to_string())
        );
    }

    #[test]
    fn record_same_message_is_still_observable_as_unchanged() {
        let store = ErrorStore::new();
        store.record("idx-1", "boom");
        let previous = store.record("idx-1", "boom");
        assert_eq!(previous.as_deref(), Some("boom"));
    }

    #[test]
    fn clear_removes_entry() {
        let store = ErrorStore::new();
        store.record("idx-1", "boom");
        store.clear("idx-1");
        assert_eq!(store.get("idx-1"), None);
    }

    #[test]
    fn clear_all_wipes_store() {
        let store = ErrorStore::new();
        store.record("idx-1", "boom");
        store.record("idx-2", "bang");
        store.clear_all();
        assert!(store.list().is_empty());
    }
}
