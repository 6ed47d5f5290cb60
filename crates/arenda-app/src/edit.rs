// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::field::{Editable, FieldKey, FieldValue};

/// What happens to an active working copy when a fresh canonical record arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefetchPolicy {
    #[default]
    PreserveEdits,
    DiscardEdits,
}

/// Canonical record plus an optional working copy.
///
/// Edit mode is active exactly when a working copy exists. Mutations outside
/// their required mode are no-ops and report `false`.
#[derive(Debug, Clone)]
pub struct EditStore<T> {
    record: Option<T>,
    working: Option<T>,
    policy: RefetchPolicy,
}

impl<T> Default for EditStore<T> {
    fn default() -> Self {
        Self {
            record: None,
            working: None,
            policy: RefetchPolicy::default(),
        }
    }
}

impl<T: Editable> EditStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: RefetchPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> RefetchPolicy {
        self.policy
    }

    pub fn record(&self) -> Option<&T> {
        self.record.as_ref()
    }

    pub fn working(&self) -> Option<&T> {
        self.working.as_ref()
    }

    pub fn is_editing(&self) -> bool {
        self.working.is_some()
    }

    /// Working copy while editing, canonical record otherwise.
    pub fn view(&self) -> Option<&T> {
        self.working.as_ref().or(self.record.as_ref())
    }

    pub fn set_record(&mut self, record: T) {
        if self.working.is_some() {
            match self.policy {
                RefetchPolicy::PreserveEdits => {
                    debug!(
                        id = record.record_id(),
                        "canonical record refreshed during edit; keeping working copy"
                    );
                }
                RefetchPolicy::DiscardEdits => {
                    debug!(
                        id = record.record_id(),
                        "canonical record refreshed during edit; discarding working copy"
                    );
                    self.working = None;
                }
            }
        }
        self.record = Some(record);
    }

    /// Replaces the canonical record and never touches the working copy.
    pub fn replace_record(&mut self, record: T) {
        self.record = Some(record);
    }

    /// Forgets both copies; used once the record is known to be gone.
    pub fn clear(&mut self) {
        self.record = None;
        self.working = None;
    }

    pub fn start_editing(&mut self) -> bool {
        let Some(record) = &self.record else {
            return false;
        };
        self.working = Some(record.clone());
        true
    }

    pub fn cancel_editing(&mut self) {
        self.working = None;
    }

    pub fn update_field(&mut self, field: T::Field, value: FieldValue) -> bool {
        let Some(working) = self.working.as_mut() else {
            return false;
        };
        match working.set_field(field, value) {
            Ok(()) => true,
            Err(error) => {
                warn!(field = field.name(), %error, "ignored field update");
                false
            }
        }
    }

    pub fn has_changes(&self) -> bool {
        match (&self.working, &self.record) {
            (Some(working), Some(record)) => !working.same_content(record),
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    pub fn changed_fields(&self) -> Vec<T::Field> {
        match (&self.working, &self.record) {
            (Some(working), Some(record)) => working.changed_fields(record),
            _ => Vec::new(),
        }
    }

    /// Top-level keys of the working copy whose serialized value differs from
    /// the canonical record. Nested objects are sent whole.
    pub fn patch(&self) -> Map<String, Value> {
        let Some(working) = &self.working else {
            return Map::new();
        };
        let Ok(Value::Object(edited)) = serde_json::to_value(working) else {
            return Map::new();
        };
        let base = self
            .record
            .as_ref()
            .and_then(|record| serde_json::to_value(record).ok());
        let base = match base {
            Some(Value::Object(base)) => base,
            _ => return edited,
        };

        edited
            .into_iter()
            .filter(|(key, value)| base.get(key) != Some(value))
            .collect()
    }

    pub fn save_success(&mut self, server_record: T) {
        self.record = Some(server_record);
        self.working = None;
    }
}
