//! Dynamically-typed values shared by records and prepared documents.
//!
//! Records coming out of the storage layer and documents going into the
//! search backend both carry [`Value`]s. Nested records are represented with
//! [`Value::Map`], which is what dotted attribute paths traverse.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

/// Date format used when rendering [`Value::Date`] as text.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Date-time format used when rendering [`Value::DateTime`] as text.
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A single attribute or document value.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Absence of a value.
    #[default]
    Null,
    /// Free text.
    Text(String),
    /// Signed integer.
    Integer(i64),
    /// Floating-point number.
    Float(f64),
    /// Boolean flag.
    Boolean(bool),
    /// Calendar date.
    Date(NaiveDate),
    /// Date and time without zone.
    DateTime(NaiveDateTime),
    /// Ordered list of values (multi-value fields).
    List(Vec<Value>),
    /// Nested attribute map (related records, embedded structs).
    Map(BTreeMap<String, Value>),
    /// Geographic point.
    Location {
        /// Latitude in degrees.
        lat: f64,
        /// Longitude in degrees.
        lon: f64,
    },
}

impl Value {
    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Borrow the text of a [`Value::Text`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the entries of a [`Value::Map`].
    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Short name of the variant, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Text(_) => "text",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Boolean(_) => "boolean",
            Value::Date(_) => "date",
            Value::DateTime(_) => "datetime",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Location { .. } => "location",
        }
    }

    /// Resolve a dotted path (`"user.profile.name"`) through nested maps.
    ///
    /// Returns `None` when any segment is missing or an intermediate value is
    /// not a map. An empty path resolves to `self`.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        if path.is_empty() {
            return Some(self);
        }
        path.split('.')
            .try_fold(self, |current, segment| current.as_map()?.get(segment))
    }

    /// Render the value as plain text, the way it appears in a text field.
    pub fn to_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Text(s) => f.write_str(s),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            Value::DateTime(dt) => write!(f, "{}", dt.format(DATETIME_FORMAT)),
            Value::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
            Value::Map(map) => {
                let json = serde_json::to_string(map).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
            Value::Location { lat, lon } => write!(f, "{lat},{lon}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Value::DateTime(dt)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::Map(map)
    }
}

/// Convert loosely-typed JSON (fixtures, storage rows) into a [`Value`].
///
/// Strings stay text; dates are not sniffed. Integral numbers become
/// [`Value::Integer`], everything else numeric becomes [`Value::Float`].
impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(entries) => Value::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_nested() {
        let value = Value::from(json!({"user": {"profile": {"name": "daniel"}}}));
        assert_eq!(
            value.lookup("user.profile.name"),
            Some(&Value::Text("daniel".to_string()))
        );
        assert!(value.lookup("user.email").is_none());
        assert!(value.lookup("user.profile.name.first").is_none());
    }

    #[test]
    fn test_lookup_empty_path_is_self() {
        let value = Value::Integer(3);
        assert_eq!(value.lookup(""), Some(&Value::Integer(3)));
    }

    #[test]
    fn test_display_scalars() {
        assert_eq!(Value::Null.to_text(), "");
        assert_eq!(Value::from("hello").to_text(), "hello");
        assert_eq!(Value::from(42).to_text(), "42");
        assert_eq!(Value::from(true).to_text(), "true");
        let date = NaiveDate::from_ymd_opt(2009, 2, 24).unwrap();
        assert_eq!(Value::from(date).to_text(), "2009-02-24");
    }

    #[test]
    fn test_display_list() {
        let value = Value::from(vec!["a", "b", "c"]);
        assert_eq!(value.to_text(), "a, b, c");
    }

    #[test]
    fn test_from_json_numbers() {
        assert_eq!(Value::from(json!(7)), Value::Integer(7));
        assert_eq!(Value::from(json!(1.5)), Value::Float(1.5));
    }

    #[test]
    fn test_from_option() {
        assert_eq!(Value::from(None::<&str>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::Text("x".to_string()));
    }

    #[test]
    fn test_serialize_untagged() {
        let value = Value::from(vec![Value::from(1), Value::from("two")]);
        assert_eq!(serde_json::to_string(&value).unwrap(), r#"[1,"two"]"#);

        let date = NaiveDate::from_ymd_opt(2009, 2, 24).unwrap();
        assert_eq!(
            serde_json::to_string(&Value::from(date)).unwrap(),
            r#""2009-02-24""#
        );
    }
}
