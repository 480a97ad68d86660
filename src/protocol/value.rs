//! The typed binary value codec: the closed set of `VK_*` server type tags
//! and the little-endian wire encoding for each.
//!
//! Dispatch is a `match` over [`ValueKind`], not dynamic method lookup on a
//! value object.

use crate::error::{FourDError, FourDResult};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};
use time::{Date, Month, PrimitiveDateTime, Time};

/// The closed enumeration of server type tags used on the wire.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ValueKind {
    Boolean,
    Word,
    Long,
    Long8,
    Real,
    Float,
    Timestamp,
    /// Alias of [`ValueKind::Timestamp`]; same wire format.
    Time,
    Duration,
    String,
    Blob,
    /// Decoded as raw bytes, exactly like [`ValueKind::Blob`].
    Image,
    Unknown,
}

impl ValueKind {
    /// The name used on the wire (in `PARAMETER-TYPES` and `Column-Types`).
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Boolean => "VK_BOOLEAN",
            Self::Word => "VK_WORD",
            Self::Long => "VK_LONG",
            Self::Long8 => "VK_LONG8",
            Self::Real => "VK_REAL",
            Self::Float => "VK_FLOAT",
            Self::Timestamp => "VK_TIMESTAMP",
            Self::Time => "VK_TIME",
            Self::Duration => "VK_DURATION",
            Self::String => "VK_STRING",
            Self::Blob => "VK_BLOB",
            Self::Image => "VK_IMAGE",
            Self::Unknown => "VK_UNKNOWN",
        }
    }

    /// Parses a tag name as it appears in `Column-Types` / `PARAMETER-TYPES`.
    pub fn parse(name: &str) -> FourDResult<Self> {
        match name {
            "VK_BOOLEAN" => Ok(Self::Boolean),
            "VK_WORD" => Ok(Self::Word),
            "VK_LONG" => Ok(Self::Long),
            "VK_LONG8" => Ok(Self::Long8),
            "VK_REAL" => Ok(Self::Real),
            "VK_FLOAT" => Ok(Self::Float),
            "VK_TIMESTAMP" => Ok(Self::Timestamp),
            "VK_TIME" => Ok(Self::Time),
            "VK_DURATION" => Ok(Self::Duration),
            "VK_STRING" => Ok(Self::String),
            "VK_BLOB" => Ok(Self::Blob),
            "VK_IMAGE" => Ok(Self::Image),
            "VK_UNKNOWN" | "VK_UNKNOW" => Ok(Self::Unknown),
            other => Err(FourDError::programming(format!(
                "unknown type tag on the wire: {other}"
            ))),
        }
    }

    /// The name of the host type this tag maps to, for `Cursor.description`.
    #[must_use]
    pub fn host_type_name(self) -> &'static str {
        match self {
            Self::Boolean => "bool",
            Self::Word | Self::Long | Self::Long8 => "int",
            Self::Real | Self::Float => "float",
            Self::Timestamp | Self::Time => "datetime",
            Self::Duration => "time",
            Self::String => "str",
            Self::Blob | Self::Image => "bytes",
            Self::Unknown => "NoneType",
        }
    }
}

/// A host-side scalar value, either bound as a parameter or decoded from a
/// result-set row.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    /// Any integral column or parameter value (`VK_WORD`, `VK_LONG` and
    /// `VK_LONG8` all widen to a single `i64` host type).
    Int(i64),
    Float(f64),
    Timestamp(PrimitiveDateTime),
    Time(Time),
    Text(String),
    Bytes(Vec<u8>),
}

impl Value {
    /// Infers the wire type tag for a bound parameter, per the host-to-tag
    /// table: booleans -> BOOLEAN, integers -> LONG8, floats -> REAL,
    /// date-times -> TIMESTAMP, times-of-day -> DURATION, text -> STRING,
    /// bytes -> BLOB, null -> UNKNOWN; anything else defaults to STRING.
    #[must_use]
    pub fn inferred_kind(&self) -> ValueKind {
        match self {
            Self::Null => ValueKind::Unknown,
            Self::Bool(_) => ValueKind::Boolean,
            Self::Int(_) => ValueKind::Long8,
            Self::Float(_) => ValueKind::Real,
            Self::Timestamp(_) => ValueKind::Timestamp,
            Self::Time(_) => ValueKind::Duration,
            Self::Text(_) => ValueKind::String,
            Self::Bytes(_) => ValueKind::Blob,
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}
impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}
impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}
impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}
impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}
impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}
impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}
impl From<PrimitiveDateTime> for Value {
    fn from(v: PrimitiveDateTime) -> Self {
        Self::Timestamp(v)
    }
}
impl From<Time> for Value {
    fn from(v: Time) -> Self {
        Self::Time(v)
    }
}
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

/// Encodes a present (non-null) parameter value for the given tag, per the
/// wire-format table for each `VK_*` kind.
pub fn encode(value: &Value, kind: ValueKind, w: &mut dyn Write) -> FourDResult<()> {
    match kind {
        ValueKind::Boolean => {
            let b = matches!(value, Value::Bool(true));
            w.write_u16::<LittleEndian>(u16::from(b))?;
        }
        ValueKind::Word => {
            w.write_i16::<LittleEndian>(as_i64(value)? as i16)?;
        }
        ValueKind::Long => {
            w.write_i32::<LittleEndian>(as_i64(value)? as i32)?;
        }
        ValueKind::Long8 => {
            w.write_i64::<LittleEndian>(as_i64(value)?)?;
        }
        ValueKind::Real | ValueKind::Float => {
            w.write_f64::<LittleEndian>(as_f64(value)?)?;
        }
        ValueKind::Timestamp | ValueKind::Time => {
            let ts = as_timestamp(value)?;
            let ms_of_day = (ts.time().hour() as u32 * 3600
                + ts.time().minute() as u32 * 60
                + ts.time().second() as u32)
                * 1000;
            w.write_u16::<LittleEndian>(ts.year() as u16)?;
            w.write_u8(u8::from(ts.month()))?;
            w.write_u8(ts.day())?;
            w.write_u32::<LittleEndian>(ms_of_day)?;
        }
        ValueKind::Duration => {
            let t = as_time(value)?;
            let total_ms = (t.hour() as u64 * 3600 + t.minute() as u64 * 60 + t.second() as u64)
                * 1000
                + u64::from(t.millisecond());
            w.write_u64::<LittleEndian>(total_ms)?;
        }
        ValueKind::String => {
            let s = as_text(value)?;
            let char_count: i32 = s.encode_utf16().count() as i32;
            w.write_i32::<LittleEndian>(-char_count)?;
            for unit in s.encode_utf16() {
                w.write_u16::<LittleEndian>(unit)?;
            }
        }
        ValueKind::Blob | ValueKind::Image => {
            let b = as_bytes(value)?;
            w.write_i32::<LittleEndian>(b.len() as i32)?;
            w.write_all(b)?;
        }
        ValueKind::Unknown => {}
    }
    Ok(())
}

/// Decodes a present (non-null) value of the given tag from the wire.
pub fn decode(kind: ValueKind, r: &mut dyn Read) -> FourDResult<Value> {
    Ok(match kind {
        ValueKind::Boolean => Value::Bool(r.read_u16::<LittleEndian>()? != 0),
        ValueKind::Word => Value::Int(i64::from(r.read_i16::<LittleEndian>()?)),
        ValueKind::Long => Value::Int(i64::from(r.read_i32::<LittleEndian>()?)),
        ValueKind::Long8 => Value::Int(r.read_i64::<LittleEndian>()?),
        ValueKind::Real | ValueKind::Float => Value::Float(r.read_f64::<LittleEndian>()?),
        ValueKind::Timestamp | ValueKind::Time => {
            let year = r.read_u16::<LittleEndian>()?;
            let month = r.read_u8()?;
            let day = r.read_u8()?;
            let ms_of_day = r.read_u32::<LittleEndian>()?;
            if year == 0 {
                Value::Null
            } else {
                let second = ms_of_day / 1000;
                let millisecond = ms_of_day - second * 1000;
                let microsecond = millisecond * 1000;
                let minute = second / 60;
                let second = second - minute * 60;
                let hour = minute / 60;
                let minute = minute - hour * 60;
                let month = Month::try_from(month)
                    .map_err(|_| FourDError::programming("invalid month in VK_TIMESTAMP"))?;
                let date = Date::from_calendar_date(i32::from(year), month, day)
                    .map_err(|e| FourDError::programming(format!("invalid VK_TIMESTAMP: {e}")))?;
                let time = Time::from_hms_micro(hour as u8, minute as u8, second as u8, microsecond)
                    .map_err(|e| FourDError::programming(format!("invalid VK_TIMESTAMP: {e}")))?;
                Value::Timestamp(PrimitiveDateTime::new(date, time))
            }
        }
        ValueKind::Duration => {
            let total_ms = r.read_u64::<LittleEndian>()?;
            let second = total_ms / 1000;
            let millisecond = (total_ms - second * 1000) as u32;
            let minute = second / 60;
            let second = second - minute * 60;
            let hour = minute / 60;
            let minute = minute - hour * 60;
            let time = Time::from_hms_milli(hour as u8, minute as u8, second as u8, millisecond as u16)
                .map_err(|e| FourDError::programming(format!("invalid VK_DURATION: {e}")))?;
            Value::Time(time)
        }
        ValueKind::String => {
            let neg_char_count = r.read_i32::<LittleEndian>()?;
            let char_count = (-neg_char_count) as usize;
            let mut units = vec![0_u16; char_count];
            for slot in &mut units {
                *slot = r.read_u16::<LittleEndian>()?;
            }
            let s = String::from_utf16(&units)
                .map_err(|e| FourDError::programming(format!("invalid VK_STRING: {e}")))?;
            Value::Text(s)
        }
        ValueKind::Blob | ValueKind::Image => {
            let len = r.read_i32::<LittleEndian>()? as usize;
            let mut buf = vec![0_u8; len];
            r.read_exact(&mut buf)?;
            Value::Bytes(buf)
        }
        ValueKind::Unknown => Value::Null,
    })
}

fn as_i64(v: &Value) -> FourDResult<i64> {
    match v {
        Value::Int(i) => Ok(*i),
        Value::Bool(b) => Ok(i64::from(*b)),
        other => Err(FourDError::programming(format!(
            "cannot encode {other:?} as an integer type"
        ))),
    }
}

fn as_f64(v: &Value) -> FourDResult<f64> {
    match v {
        Value::Float(f) => Ok(*f),
        Value::Int(i) => Ok(*i as f64),
        other => Err(FourDError::programming(format!(
            "cannot encode {other:?} as a float type"
        ))),
    }
}

fn as_timestamp(v: &Value) -> FourDResult<PrimitiveDateTime> {
    match v {
        Value::Timestamp(t) => Ok(*t),
        other => Err(FourDError::programming(format!(
            "cannot encode {other:?} as VK_TIMESTAMP"
        ))),
    }
}

fn as_time(v: &Value) -> FourDResult<Time> {
    match v {
        Value::Time(t) => Ok(*t),
        other => Err(FourDError::programming(format!(
            "cannot encode {other:?} as VK_DURATION"
        ))),
    }
}

fn as_text(v: &Value) -> FourDResult<&str> {
    match v {
        Value::Text(s) => Ok(s.as_str()),
        other => Err(FourDError::programming(format!(
            "cannot encode {other:?} as VK_STRING"
        ))),
    }
}

fn as_bytes(v: &Value) -> FourDResult<&[u8]> {
    match v {
        Value::Bytes(b) => Ok(b.as_slice()),
        other => Err(FourDError::programming(format!(
            "cannot encode {other:?} as VK_BLOB"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, time};

    fn roundtrip(value: Value, kind: ValueKind) -> Value {
        let mut buf = Vec::new();
        encode(&value, kind, &mut buf).unwrap();
        decode(kind, &mut &buf[..]).unwrap()
    }

    #[test]
    fn boolean_roundtrip() {
        assert_eq!(roundtrip(Value::Bool(true), ValueKind::Boolean), Value::Bool(true));
        assert_eq!(roundtrip(Value::Bool(false), ValueKind::Boolean), Value::Bool(false));
    }

    #[test]
    fn long8_roundtrip() {
        assert_eq!(roundtrip(Value::Int(-7), ValueKind::Long8), Value::Int(-7));
    }

    #[test]
    fn real_roundtrip() {
        assert_eq!(roundtrip(Value::Float(3.5), ValueKind::Real), Value::Float(3.5));
    }

    #[test]
    fn string_roundtrip_matches_scenario_1() {
        let mut buf = Vec::new();
        encode(&Value::Text("hi".to_string()), ValueKind::String, &mut buf).unwrap();
        assert_eq!(buf, vec![0xFE, 0xFF, 0xFF, 0xFF, b'h', 0x00, b'i', 0x00]);
        assert_eq!(
            decode(ValueKind::String, &mut &buf[..]).unwrap(),
            Value::Text("hi".to_string())
        );
    }

    #[test]
    fn blob_roundtrip() {
        let bytes = vec![1_u8, 2, 3, 4];
        assert_eq!(
            roundtrip(Value::Bytes(bytes.clone()), ValueKind::Blob),
            Value::Bytes(bytes)
        );
    }

    #[test]
    fn timestamp_roundtrip_to_millisecond() {
        let ts = PrimitiveDateTime::new(date!(2024 - 03 - 14), time!(09:08:07));
        assert_eq!(roundtrip(Value::Timestamp(ts), ValueKind::Timestamp), Value::Timestamp(ts));
    }

    #[test]
    fn zero_year_decodes_as_null() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&0_u16.to_le_bytes());
        buf.push(1);
        buf.push(1);
        buf.extend_from_slice(&0_u32.to_le_bytes());
        assert_eq!(decode(ValueKind::Timestamp, &mut &buf[..]).unwrap(), Value::Null);
    }

    #[test]
    fn duration_roundtrip() {
        let t = time!(13:45:02);
        assert_eq!(roundtrip(Value::Time(t), ValueKind::Duration), Value::Time(t));
    }

    #[test]
    fn inference_table() {
        assert_eq!(Value::Bool(true).inferred_kind(), ValueKind::Boolean);
        assert_eq!(Value::Int(1).inferred_kind(), ValueKind::Long8);
        assert_eq!(Value::Float(1.0).inferred_kind(), ValueKind::Real);
        assert_eq!(Value::Text("x".into()).inferred_kind(), ValueKind::String);
        assert_eq!(Value::Bytes(vec![]).inferred_kind(), ValueKind::Blob);
        assert_eq!(Value::Null.inferred_kind(), ValueKind::Unknown);
    }
}
