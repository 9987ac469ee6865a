//! Field descriptors.
//!
//! A [`FieldDescriptor`] maps one record attribute (or one rendered template)
//! to one document field. Descriptors are declared unnamed and receive their
//! name from the declaration key when the schema is built:
//!
//! ```rust
//! use quarry_index::FieldDescriptor;
//!
//! let text = FieldDescriptor::text().document().use_template();
//! let author = FieldDescriptor::text().model_attr("user.name");
//! let pub_date = FieldDescriptor::datetime().model_attr("pub_date");
//! # let _ = (text, author, pub_date);
//! ```

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use quarry_core::{ExtractionError, LOCALE_SEPARATOR, Locale, Value};
use serde::Serialize;

/// Semantic type of a field; decides how extracted values are converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Free text.
    Text,
    /// Signed integer.
    Integer,
    /// Floating-point number.
    Float,
    /// Boolean flag.
    Boolean,
    /// Calendar date.
    Date,
    /// Date and time.
    DateTime,
    /// List of values.
    MultiValue,
    /// Geographic point.
    Location,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::Text => "text",
            FieldKind::Integer => "integer",
            FieldKind::Float => "float",
            FieldKind::Boolean => "boolean",
            FieldKind::Date => "date",
            FieldKind::DateTime => "datetime",
            FieldKind::MultiValue => "multi_value",
            FieldKind::Location => "location",
        };
        f.write_str(name)
    }
}

impl FieldKind {
    /// Convert an extracted value to this kind.
    ///
    /// `Null` passes through for every kind. Text is parsed where a textual
    /// form exists (numbers, booleans, ISO dates, `"lat,lon"`).
    pub fn convert(self, field: &str, value: Value) -> Result<Value, ExtractionError> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        let mismatch = |value: &Value| ExtractionError::Conversion {
            field: field.to_string(),
            expected: self.to_string(),
            found: format!("{} '{}'", value.type_name(), value),
        };

        match self {
            FieldKind::Text => Ok(match value {
                Value::Text(_) => value,
                other => Value::Text(other.to_text()),
            }),
            FieldKind::Integer => match value {
                Value::Integer(_) => Ok(value),
                Value::Float(x) if x.is_finite() => Ok(Value::Integer(x.trunc() as i64)),
                Value::Boolean(b) => Ok(Value::Integer(i64::from(b))),
                Value::Text(ref s) => s
                    .trim()
                    .parse::<i64>()
                    .map(Value::Integer)
                    .map_err(|_| mismatch(&value)),
                ref other => Err(mismatch(other)),
            },
            FieldKind::Float => match value {
                Value::Float(_) => Ok(value),
                Value::Integer(i) => Ok(Value::Float(i as f64)),
                Value::Text(ref s) => s
                    .trim()
                    .parse::<f64>()
                    .map(Value::Float)
                    .map_err(|_| mismatch(&value)),
                ref other => Err(mismatch(other)),
            },
            FieldKind::Boolean => match value {
                Value::Boolean(_) => Ok(value),
                Value::Integer(i) => Ok(Value::Boolean(i != 0)),
                Value::Text(ref s) => match s.trim().to_lowercase().as_str() {
                    "true" | "1" | "yes" => Ok(Value::Boolean(true)),
                    "false" | "0" | "no" => Ok(Value::Boolean(false)),
                    _ => Err(mismatch(&value)),
                },
                ref other => Err(mismatch(other)),
            },
            FieldKind::Date => match value {
                Value::Date(_) => Ok(value),
                Value::DateTime(dt) => Ok(Value::Date(dt.date())),
                Value::Text(ref s) => parse_date(s)
                    .or_else(|| parse_datetime(s).map(|dt| dt.date()))
                    .map(Value::Date)
                    .ok_or_else(|| mismatch(&value)),
                ref other => Err(mismatch(other)),
            },
            FieldKind::DateTime => match value {
                Value::DateTime(_) => Ok(value),
                Value::Date(d) => Ok(Value::DateTime(d.and_time(NaiveTime::MIN))),
                Value::Text(ref s) => parse_datetime(s)
                    .or_else(|| parse_date(s).map(|d| d.and_time(NaiveTime::MIN)))
                    .map(Value::DateTime)
                    .ok_or_else(|| mismatch(&value)),
                ref other => Err(mismatch(other)),
            },
            FieldKind::MultiValue => Ok(match value {
                Value::List(_) => value,
                scalar => Value::List(vec![scalar]),
            }),
            FieldKind::Location => match value {
                Value::Location { .. } => Ok(value),
                Value::Text(ref s) => parse_location(s).ok_or_else(|| mismatch(&value)),
                Value::Map(ref map) => match (map.get("lat"), map.get("lon")) {
                    (Some(lat), Some(lon)) => match (as_f64(lat), as_f64(lon)) {
                        (Some(lat), Some(lon)) => Ok(Value::Location { lat, lon }),
                        _ => Err(mismatch(&value)),
                    },
                    _ => Err(mismatch(&value)),
                },
                Value::List(ref items) => {
                    let coords: Vec<String> = items.iter().map(Value::to_text).collect();
                    parse_location(&coords.join(",")).ok_or_else(|| mismatch(&value))
                }
                ref other => Err(mismatch(other)),
            },
        }
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim().trim_end_matches('Z');
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

fn parse_location(s: &str) -> Option<Value> {
    let (lat, lon) = s.split_once(',')?;
    Some(Value::Location {
        lat: lat.trim().parse().ok()?,
        lon: lon.trim().parse().ok()?,
    })
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Float(x) => Some(*x),
        Value::Integer(i) => Some(*i as f64),
        Value::Text(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Where a field's value comes from when no override hook is registered.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldSource {
    /// No source; the field yields its default (or `Null`).
    None,
    /// A possibly dotted attribute path on the record.
    Attribute {
        /// Path such as `author` or `user.profile.name`.
        path: String,
    },
    /// A rendered template.
    Template {
        /// Explicit template name; derived from the record type when absent.
        name: Option<String>,
    },
}

/// Static description of one document field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDescriptor {
    name: String,
    kind: FieldKind,
    document: bool,
    source: FieldSource,
    indexed: bool,
    stored: bool,
    default: Option<Value>,
    locale: Option<Locale>,
}

impl FieldDescriptor {
    /// Declare a field of the given kind: indexed, stored, no source.
    pub fn new(kind: FieldKind) -> Self {
        Self {
            name: String::new(),
            kind,
            document: false,
            source: FieldSource::None,
            indexed: true,
            stored: true,
            default: None,
            locale: None,
        }
    }

    /// Declare a text field.
    pub fn text() -> Self {
        Self::new(FieldKind::Text)
    }

    /// Declare an integer field.
    pub fn integer() -> Self {
        Self::new(FieldKind::Integer)
    }

    /// Declare a float field.
    pub fn float() -> Self {
        Self::new(FieldKind::Float)
    }

    /// Declare a boolean field.
    pub fn boolean() -> Self {
        Self::new(FieldKind::Boolean)
    }

    /// Declare a date field.
    pub fn date() -> Self {
        Self::new(FieldKind::Date)
    }

    /// Declare a date-time field.
    pub fn datetime() -> Self {
        Self::new(FieldKind::DateTime)
    }

    /// Declare a multi-value field.
    pub fn multi_value() -> Self {
        Self::new(FieldKind::MultiValue)
    }

    /// Declare a location field.
    pub fn location() -> Self {
        Self::new(FieldKind::Location)
    }

    /// Read the value from a (possibly dotted) record attribute.
    pub fn model_attr(mut self, path: impl Into<String>) -> Self {
        self.source = FieldSource::Attribute { path: path.into() };
        self
    }

    /// Render the value from the default template for this field.
    pub fn use_template(mut self) -> Self {
        self.source = FieldSource::Template { name: None };
        self
    }

    /// Render the value from a named template.
    pub fn template_name(mut self, name: impl Into<String>) -> Self {
        self.source = FieldSource::Template {
            name: Some(name.into()),
        };
        self
    }

    /// Mark this field as the primary document field.
    pub fn document(mut self) -> Self {
        self.document = true;
        self
    }

    /// Set whether the backend should index this field.
    pub fn indexed(mut self, indexed: bool) -> Self {
        self.indexed = indexed;
        self
    }

    /// Set whether the backend should store this field.
    pub fn stored(mut self, stored: bool) -> Self {
        self.stored = stored;
        self
    }

    /// Fallback used when extraction yields nothing.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Field name (empty until the schema assigns it).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Semantic kind.
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Whether this is the primary document field.
    pub fn is_document(&self) -> bool {
        self.document
    }

    /// Value source.
    pub fn source(&self) -> &FieldSource {
        &self.source
    }

    /// Whether the backend indexes this field.
    pub fn is_indexed(&self) -> bool {
        self.indexed
    }

    /// Whether the backend stores this field.
    pub fn is_stored(&self) -> bool {
        self.stored
    }

    /// Configured default.
    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Locale of a derived per-locale field; `None` for declared fields.
    pub fn locale(&self) -> Option<&Locale> {
        self.locale.as_ref()
    }

    /// Name of the declared field this one derives from; its own name for
    /// declared fields.
    pub fn base_name(&self) -> &str {
        self.locale
            .as_ref()
            .and_then(|locale| {
                self.name
                    .strip_suffix(locale.code())
                    .and_then(|rest| rest.strip_suffix(LOCALE_SEPARATOR))
            })
            .unwrap_or(&self.name)
    }

    pub(crate) fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Derive the per-locale clone `<name>__<code>`; never a document field.
    pub(crate) fn localized(&self, locale: &Locale) -> Self {
        Self {
            name: localized_name(&self.name, locale),
            document: false,
            locale: Some(locale.clone()),
            ..self.clone()
        }
    }
}

/// Name of the per-locale clone of `base`.
pub fn localized_name(base: &str, locale: &Locale) -> String {
    format!("{base}{LOCALE_SEPARATOR}{locale}")
}

/// Split a field name on the last `__` into `(base, locale suffix)`.
///
/// ```rust
/// use quarry_index::field::split_field_name;
///
/// assert_eq!(split_field_name("text__fr"), ("text", Some("fr")));
/// assert_eq!(split_field_name("a__b__en"), ("a__b", Some("en")));
/// assert_eq!(split_field_name("author"), ("author", None));
/// ```
pub fn split_field_name(name: &str) -> (&str, Option<&str>) {
    match name.rsplit_once(LOCALE_SEPARATOR) {
        Some((base, suffix)) => (base, Some(suffix)),
        None => (name, None),
    }
}

// ============================================================================
// Tests
// ============================================================================
