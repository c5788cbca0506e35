//! Structural encoder: arbitrary serializable audit objects to [`PlainValue`].
//!
//! The object is serialized straight into an owned `serde_json::Value`, an
//! independent copy with no aliasing. Excluded fields (`profile`,
//! `credentials`, ...) are dropped from every mapping regardless of depth,
//! before their values are visited.
//!
//! `encode` never fails. Each struct field, mapping value and sequence
//! element is serialized on its own; one that cannot be represented becomes
//! a `"<unserializable TYPE>"` placeholder and its siblings are kept.
//! Placeholders never carry field contents.

use serde::Serialize;

use crate::config::{ReportConfig, DEFAULT_EXCLUDED_FIELDS};
use crate::PlainValue;

mod serializer;

use serializer::PlainSerializer;

#[derive(Debug, Clone)]
pub struct StructuralEncoder {
    excluded_fields: Vec<String>,
}

impl Default for StructuralEncoder {
    fn default() -> Self {
        Self {
            excluded_fields: DEFAULT_EXCLUDED_FIELDS
                .iter()
                .map(|f| f.to_string())
                .collect(),
        }
    }
}

impl StructuralEncoder {
    pub fn new(excluded_fields: Vec<String>) -> Self {
        Self { excluded_fields }
    }

    pub fn from_config(config: &ReportConfig) -> Self {
        Self::new(config.excluded_fields.clone())
    }

    pub fn excluded_fields(&self) -> &[String] {
        &self.excluded_fields
    }

    /// Convert `value` into a plain JSON value with excluded fields removed.
    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> PlainValue {
        PlainSerializer::new(&self.excluded_fields).isolate(value)
    }
}

/// Serde helpers rendering instants in a fixed, locale-independent form
/// (`2024-03-01 14:05:09.123+01:00`).
///
/// ```ignore
/// #[derive(Serialize)]
/// struct Resource {
///     #[serde(serialize_with = "audit_report::encoder::temporal::instant")]
///     created: DateTime<Utc>,
/// }
/// ```
pub mod temporal {
    use chrono::{DateTime, TimeZone};
    use serde::Serializer;

    pub const INSTANT_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f%:z";

    pub fn render<Tz: TimeZone>(dt: &DateTime<Tz>) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        dt.format(INSTANT_FORMAT).to_string()
    }

    pub fn instant<S, Tz>(dt: &DateTime<Tz>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        serializer.serialize_str(&render(dt))
    }

    pub fn optional_instant<S, Tz>(
        dt: &Option<DateTime<Tz>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        match dt {
            Some(dt) => serializer.serialize_str(&render(dt)),
            None => serializer.serialize_none(),
        }
    }
}
