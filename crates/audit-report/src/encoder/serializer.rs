//! `serde::Serializer` building a [`PlainValue`] one node at a time.
//!
//! Every struct field, map value, sequence element and variant payload is
//! serialized on its own. A child that fails is replaced by a redacted
//! placeholder naming its type; the error never reaches the parent. Excluded
//! field names are dropped before their values are visited.

use std::fmt;

use serde::ser::{self, Serialize, Serializer};
use serde_json::{Map, Number, Value};
use tracing::warn;

use crate::PlainValue;

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub(crate) struct EncodeError(String);

impl ser::Error for EncodeError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Self(msg.to_string())
    }
}

/// Stand-in for a node that could not be serialized. Carries the type name
/// only, never field contents.
pub(crate) fn placeholder<T: ?Sized>() -> PlainValue {
    Value::String(format!("<unserializable {}>", std::any::type_name::<T>()))
}

#[derive(Clone, Copy)]
pub(crate) struct PlainSerializer<'a> {
    excluded: &'a [String],
}

impl<'a> PlainSerializer<'a> {
    pub(crate) fn new(excluded: &'a [String]) -> Self {
        Self { excluded }
    }

    fn is_excluded(&self, key: &str) -> bool {
        self.excluded.iter().any(|f| f == key)
    }

    /// Serialize `value` as a separate node, falling back to the placeholder.
    pub(crate) fn isolate<T: Serialize + ?Sized>(self, value: &T) -> PlainValue {
        match value.serialize(self) {
            Ok(v) => v,
            Err(err) => {
                warn!(
                    node = std::any::type_name::<T>(),
                    error = %err,
                    "node not serializable, using placeholder"
                );
                placeholder::<T>()
            }
        }
    }

    fn tagged(variant: &'static str, value: PlainValue) -> PlainValue {
        let mut map = Map::new();
        map.insert(variant.to_string(), value);
        Value::Object(map)
    }

    fn seq(self, variant: Option<&'static str>, len: Option<usize>) -> SeqBuilder<'a> {
        SeqBuilder {
            ser: self,
            variant,
            items: Vec::with_capacity(len.unwrap_or(0)),
        }
    }

    fn map(self, variant: Option<&'static str>) -> MapBuilder<'a> {
        MapBuilder {
            ser: self,
            variant,
            map: Map::new(),
            pending: Pending::None,
        }
    }
}

impl<'a> Serializer for PlainSerializer<'a> {
    type Ok = PlainValue;
    type Error = EncodeError;

    type SerializeSeq = SeqBuilder<'a>;
    type SerializeTuple = SeqBuilder<'a>;
    type SerializeTupleStruct = SeqBuilder<'a>;
    type SerializeTupleVariant = SeqBuilder<'a>;
    type SerializeMap = MapBuilder<'a>;
    type SerializeStruct = MapBuilder<'a>;
    type SerializeStructVariant = MapBuilder<'a>;

    fn serialize_bool(self, v: bool) -> Result<PlainValue, EncodeError> {
        Ok(Value::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<PlainValue, EncodeError> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i16(self, v: i16) -> Result<PlainValue, EncodeError> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i32(self, v: i32) -> Result<PlainValue, EncodeError> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i64(self, v: i64) -> Result<PlainValue, EncodeError> {
        Ok(Value::Number(v.into()))
    }

    fn serialize_i128(self, v: i128) -> Result<PlainValue, EncodeError> {
        i64::try_from(v)
            .map(|n| Value::Number(n.into()))
            .map_err(|_| EncodeError(format!("integer {v} out of range")))
    }

    fn serialize_u8(self, v: u8) -> Result<PlainValue, EncodeError> {
        self.serialize_u64(u64::from(v))
    }

    fn serialize_u16(self, v: u16) -> Result<PlainValue, EncodeError> {
        self.serialize_u64(u64::from(v))
    }

    fn serialize_u32(self, v: u32) -> Result<PlainValue, EncodeError> {
        self.serialize_u64(u64::from(v))
    }

    fn serialize_u64(self, v: u64) -> Result<PlainValue, EncodeError> {
        Ok(Value::Number(v.into()))
    }

    fn serialize_u128(self, v: u128) -> Result<PlainValue, EncodeError> {
        u64::try_from(v)
            .map(|n| Value::Number(n.into()))
            .map_err(|_| EncodeError(format!("integer {v} out of range")))
    }

    fn serialize_f32(self, v: f32) -> Result<PlainValue, EncodeError> {
        self.serialize_f64(f64::from(v))
    }

    // NaN and infinities have no JSON form; they become null like in serde_json.
    fn serialize_f64(self, v: f64) -> Result<PlainValue, EncodeError> {
        Ok(Number::from_f64(v).map_or(Value::Null, Value::Number))
    }

    fn serialize_char(self, v: char) -> Result<PlainValue, EncodeError> {
        Ok(Value::String(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<PlainValue, EncodeError> {
        Ok(Value::String(v.to_owned()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<PlainValue, EncodeError> {
        Ok(Value::Array(v.iter().map(|b| Value::from(*b)).collect()))
    }

    fn serialize_none(self) -> Result<PlainValue, EncodeError> {
        Ok(Value::Null)
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<PlainValue, EncodeError> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<PlainValue, EncodeError> {
        Ok(Value::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<PlainValue, EncodeError> {
        Ok(Value::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<PlainValue, EncodeError> {
        Ok(Value::String(variant.to_owned()))
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<PlainValue, EncodeError> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<PlainValue, EncodeError> {
        Ok(Self::tagged(variant, self.isolate(value)))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SeqBuilder<'a>, EncodeError> {
        Ok(self.seq(None, len))
    }

    fn serialize_tuple(self, len: usize) -> Result<SeqBuilder<'a>, EncodeError> {
        Ok(self.seq(None, Some(len)))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<SeqBuilder<'a>, EncodeError> {
        Ok(self.seq(None, Some(len)))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<SeqBuilder<'a>, EncodeError> {
        Ok(self.seq(Some(variant), Some(len)))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<MapBuilder<'a>, EncodeError> {
        Ok(self.map(None))
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<MapBuilder<'a>, EncodeError> {
        Ok(self.map(None))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<MapBuilder<'a>, EncodeError> {
        Ok(self.map(Some(variant)))
    }
}

pub(crate) struct SeqBuilder<'a> {
    ser: PlainSerializer<'a>,
    variant: Option<&'static str>,
    items: Vec<PlainValue>,
}

impl SeqBuilder<'_> {
    fn push<T: Serialize + ?Sized>(&mut self, value: &T) {
        let item = self.ser.isolate(value);
        self.items.push(item);
    }

    fn finish(self) -> PlainValue {
        let items = Value::Array(self.items);
        match self.variant {
            Some(variant) => PlainSerializer::tagged(variant, items),
            None => items,
        }
    }
}

impl ser::SerializeSeq for SeqBuilder<'_> {
    type Ok = PlainValue;
    type Error = EncodeError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), EncodeError> {
        self.push(value);
        Ok(())
    }

    fn end(self) -> Result<PlainValue, EncodeError> {
        Ok(self.finish())
    }
}

impl ser::SerializeTuple for SeqBuilder<'_> {
    type Ok = PlainValue;
    type Error = EncodeError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), EncodeError> {
        self.push(value);
        Ok(())
    }

    fn end(self) -> Result<PlainValue, EncodeError> {
        Ok(self.finish())
    }
}

impl ser::SerializeTupleStruct for SeqBuilder<'_> {
    type Ok = PlainValue;
    type Error = EncodeError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), EncodeError> {
        self.push(value);
        Ok(())
    }

    fn end(self) -> Result<PlainValue, EncodeError> {
        Ok(self.finish())
    }
}

impl ser::SerializeTupleVariant for SeqBuilder<'_> {
    type Ok = PlainValue;
    type Error = EncodeError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), EncodeError> {
        self.push(value);
        Ok(())
    }

    fn end(self) -> Result<PlainValue, EncodeError> {
        Ok(self.finish())
    }
}

/// Key seen by `serialize_key`, waiting for its value.
enum Pending {
    None,
    Key(String),
    Excluded,
}

pub(crate) struct MapBuilder<'a> {
    ser: PlainSerializer<'a>,
    variant: Option<&'static str>,
    map: Map<String, PlainValue>,
    pending: Pending,
}

impl MapBuilder<'_> {
    fn insert<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) {
        if self.ser.is_excluded(key) {
            return;
        }
        let value = self.ser.isolate(value);
        self.map.insert(key.to_owned(), value);
    }

    fn finish(self) -> PlainValue {
        let map = Value::Object(self.map);
        match self.variant {
            Some(variant) => PlainSerializer::tagged(variant, map),
            None => map,
        }
    }
}

/// JSON object keys are strings; numbers and booleans are stringified.
/// Anything else fails the whole mapping, which the parent then replaces.
fn key_string(key: PlainValue) -> Result<String, EncodeError> {
    match key {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(EncodeError(format!(
            "mapping key must be a string, got {}",
            kind(&other)
        ))),
    }
}

fn kind(value: &PlainValue) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}

impl ser::SerializeMap for MapBuilder<'_> {
    type Ok = PlainValue;
    type Error = EncodeError;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), EncodeError> {
        let key = key_string(key.serialize(self.ser)?)?;
        self.pending = if self.ser.is_excluded(&key) {
            Pending::Excluded
        } else {
            Pending::Key(key)
        };
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), EncodeError> {
        match std::mem::replace(&mut self.pending, Pending::None) {
            Pending::Key(key) => {
                let value = self.ser.isolate(value);
                self.map.insert(key, value);
                Ok(())
            }
            Pending::Excluded => Ok(()),
            Pending::None => Err(EncodeError("mapping value without a key".into())),
        }
    }

    fn end(self) -> Result<PlainValue, EncodeError> {
        Ok(self.finish())
    }
}

impl ser::SerializeStruct for MapBuilder<'_> {
    type Ok = PlainValue;
    type Error = EncodeError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), EncodeError> {
        self.insert(key, value);
        Ok(())
    }

    fn end(self) -> Result<PlainValue, EncodeError> {
        Ok(self.finish())
    }
}

impl ser::SerializeStructVariant for MapBuilder<'_> {
    type Ok = PlainValue;
    type Error = EncodeError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), EncodeError> {
        self.insert(key, value);
        Ok(())
    }

    fn end(self) -> Result<PlainValue, EncodeError> {
        Ok(self.finish())
    }
}
