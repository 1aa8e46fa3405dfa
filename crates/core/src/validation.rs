use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Field name to message map shared by every form in the workspace.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors {
    entries: BTreeMap<String, String>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.entries.insert(field.into(), message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.entries.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.entries.contains_key(field)
    }

    pub fn is_valid(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Later entries win when both maps name the same field.
    pub fn merge(&mut self, other: FieldErrors) {
        self.entries.extend(other.entries);
    }

    pub fn fields(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn require_text(&mut self, field: &str, value: &str, message: &str) {
        if is_blank(value) {
            self.insert(field, message);
        }
    }

    pub fn require_some<T>(&mut self, field: &str, value: Option<&T>, message: &str) {
        if value.is_none() {
            self.insert(field, message);
        }
    }
}

pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}
