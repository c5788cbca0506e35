//! Deterministic JSON text for report artifacts.
//!
//! Keys are sorted at every depth. Compact output separates items with `,`
//! and keys from values with `: `; pretty output indents by four spaces.

use std::io;

use serde::Serialize;
use serde_json::ser::{Formatter, PrettyFormatter, Serializer};
use serde_json::{Map, Value};

use crate::PlainValue;

/// Compact formatter writing `": "` between a key and its value.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportFormatter;

impl Formatter for ReportFormatter {
    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

/// Recursive copy of `value` with mapping keys in sorted order.
pub fn sorted(value: &PlainValue) -> PlainValue {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = Map::with_capacity(map.len());
            for key in keys {
                out.insert(key.clone(), sorted(&map[key]));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}

/// Render `value` with sorted keys; `pretty` switches to indented output.
pub fn to_report_string(value: &PlainValue, pretty: bool) -> serde_json::Result<String> {
    let value = sorted(value);
    let mut buf = Vec::with_capacity(128);
    if pretty {
        let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        value.serialize(&mut ser)?;
    } else {
        let mut ser = Serializer::with_formatter(&mut buf, ReportFormatter);
        value.serialize(&mut ser)?;
    }
    // serde_json only emits valid UTF-8
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
