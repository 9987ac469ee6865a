//! Records handed to the indexing layer by the storage layer.
//!
//! A [`Record`] is an attribute bag tagged with its [`RecordType`] and primary
//! key. The pair forms the document identity used by every backend:
//! `"<app>.<model>.<pk>"`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::value::Value;

/// The kind of record an index covers, e.g. `core.note`.
///
/// The tag is split into an application label and a model name; both are
/// lower-cased so that `Core.Note` and `core.note` are the same type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordType {
    app: String,
    model: String,
}

impl RecordType {
    /// Create a record type from its application label and model name.
    pub fn new(app: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            app: app.into().to_lowercase(),
            model: model.into().to_lowercase(),
        }
    }

    /// Application label (`core` in `core.note`).
    pub fn app(&self) -> &str {
        &self.app
    }

    /// Model name (`note` in `core.note`).
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Full tag, `"<app>.<model>"`.
    pub fn tag(&self) -> String {
        format!("{}.{}", self.app, self.model)
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.app, self.model)
    }
}

impl FromStr for RecordType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('.') {
            Some((app, model)) if !app.is_empty() && !model.is_empty() && !model.contains('.') => {
                Ok(Self::new(app, model))
            }
            _ => Err(ConfigError::Invalid {
                message: format!("record type '{s}' must look like '<app>.<model>'"),
            }),
        }
    }
}

/// One persisted record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    record_type: RecordType,
    pk: String,
    attributes: BTreeMap<String, Value>,
}

impl Record {
    /// Create an empty record of the given type and primary key.
    pub fn new(record_type: RecordType, pk: impl Into<String>) -> Self {
        Self {
            record_type,
            pk: pk.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Set an attribute, builder style.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Set an attribute in place.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// Type of this record.
    pub fn record_type(&self) -> &RecordType {
        &self.record_type
    }

    /// Primary key.
    pub fn pk(&self) -> &str {
        &self.pk
    }

    /// Document identity, `"<app>.<model>.<pk>"`.
    pub fn identity(&self) -> String {
        format!("{}.{}", self.record_type, self.pk)
    }

    /// All top-level attributes.
    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }

    /// Resolve a possibly dotted attribute path.
    ///
    /// The first segment names a top-level attribute; remaining segments
    /// descend through nested [`Value::Map`]s. `pk` resolves to the primary
    /// key unless the record defines an attribute of that name.
    pub fn attribute(&self, path: &str) -> Option<Value> {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, rest),
            None => (path, ""),
        };
        match self.attributes.get(head) {
            Some(value) => value.lookup(rest).cloned(),
            None if head == "pk" && rest.is_empty() => Some(Value::Text(self.pk.clone())),
            None => None,
        }
    }

    /// The record as a single map value: its attributes plus `pk`.
    ///
    /// Used as the `object` context when rendering templates.
    pub fn to_value(&self) -> Value {
        let mut map = self.attributes.clone();
        map.entry("pk".to_string())
            .or_insert_with(|| Value::Text(self.pk.clone()));
        Value::Map(map)
    }
}

// ============================================================================
// Tests
// ============================================================================
