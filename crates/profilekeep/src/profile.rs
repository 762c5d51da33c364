//! Opaque profile documents.
//!
//! The guard never needs the host's schema. It reads two identity fields
//! (`info.id`, `info.username`) and otherwise treats the record as a JSON
//! document that hooks may reshape freely.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Host-owned map of session id to profile.
pub type ProfileMap = HashMap<String, Profile>;

const SESSION_ID_POINTER: &str = "/info/id";
const USERNAME_POINTER: &str = "/info/username";

/// A per-session profile record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Profile(Value);

impl Profile {
    pub fn new(doc: Value) -> Self {
        Self(doc)
    }

    /// Empty placeholder registered when a load finds no file.
    pub fn empty() -> Self {
        Self(Value::Object(Default::default()))
    }

    /// Session id from `info.id`, if the record carries one.
    pub fn session_id(&self) -> Option<&str> {
        self.0.pointer(SESSION_ID_POINTER).and_then(Value::as_str)
    }

    /// Account name from `info.username`, if the record carries one.
    pub fn username(&self) -> Option<&str> {
        self.0.pointer(USERNAME_POINTER).and_then(Value::as_str)
    }

    /// Look up any field by JSON pointer (e.g. `/characters/pmc/level`).
    pub fn field(&self, pointer: &str) -> Option<&Value> {
        self.0.pointer(pointer)
    }

    /// Mutable lookup by JSON pointer.
    pub fn field_mut(&mut self, pointer: &str) -> Option<&mut Value> {
        self.0.pointer_mut(pointer)
    }

    pub fn is_empty(&self) -> bool {
        match &self.0 {
            Value::Object(map) => map.is_empty(),
            Value::Null => true,
            _ => false,
        }
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn as_value_mut(&mut self) -> &mut Value {
        &mut self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for Profile {
    fn from(doc: Value) -> Self {
        Self(doc)
    }
}
