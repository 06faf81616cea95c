//! Type Conversion
//!
//! Bidirectional mapping between native values and the wire values MySQL
//! stores, covering the dialect's representation quirks: booleans as
//! `TINYINT(1)`, `TIME` values beyond a day, JSON documents, unsigned 64-bit
//! integers and enumerations stored as text or ordinals.

pub mod native;
pub mod storage_types;
pub mod time_text;


use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use thiserror::Error;
use uuid::Uuid;

pub use native::{
    EnumDescriptor, EnumStorage, EnumValue, FieldHints, FromNative, KeyValue, NativeType,
    NativeValue,
};

use crate::backends::DatabaseValue;

/// A value could not be converted to or from its storage representation
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("cannot convert to {target}: {message}")]
pub struct ConversionError {
    pub target: String,
    pub message: String,
}

impl ConversionError {
    pub fn new(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            message: message.into(),
        }
    }
}

/// Converter between native values and MySQL wire values
pub trait ValueConverter: Send + Sync {
    /// Every native type is accepted; failures surface from the conversion itself
    fn can_convert(&self, _target: NativeType) -> bool {
        true
    }

    /// Encode a native value for storage in a column of `target` type
    fn to_storage(
        &self,
        value: &NativeValue,
        target: NativeType,
        hints: &FieldHints,
    ) -> Result<DatabaseValue, ConversionError>;

    /// Decode a stored value into `target`
    fn from_storage(
        &self,
        value: &DatabaseValue,
        target: NativeType,
        hints: &FieldHints,
    ) -> Result<NativeValue, ConversionError>;

    /// Column type used by schema generation
    fn storage_type_string(&self, target: NativeType, hints: &FieldHints) -> String {
        storage_types::mysql_column_type(target, hints)
    }
}

/// Range of a MySQL `TIME` column, in seconds either side of zero
const MAX_TIME_SECONDS: i64 = 838 * 3600 + 59 * 60 + 59;

/// Default converter for the MySQL dialect
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlTypeConverter;

impl ValueConverter for MySqlTypeConverter {
    fn to_storage(
        &self,
        value: &NativeValue,
        target: NativeType,
        hints: &FieldHints,
    ) -> Result<DatabaseValue, ConversionError> {
        if value.is_null() {
            return Ok(DatabaseValue::Null);
        }

        match target {
            NativeType::Enum(descriptor) => return encode_enum(descriptor, value, hints),
            NativeType::Json => return encode_json(value),
            NativeType::Bool => return Ok(DatabaseValue::Int8(i8::from(native_truth(value)?))),
            NativeType::Uuid => {
                if let NativeValue::String(text) = value {
                    let uuid = parse_uuid(text)?;
                    return Ok(DatabaseValue::String(uuid.hyphenated().to_string()));
                }
            }
            _ => {}
        }

        let stored = match value {
            NativeValue::Null => DatabaseValue::Null,
            NativeValue::Bool(b) => DatabaseValue::Int8(i8::from(*b)),
            NativeValue::I8(v) => DatabaseValue::Int8(*v),
            NativeValue::I16(v) => DatabaseValue::Int16(*v),
            NativeValue::I32(v) => DatabaseValue::Int32(*v),
            NativeValue::I64(v) => DatabaseValue::Int64(*v),
            NativeValue::U8(v) => DatabaseValue::Int16(i16::from(*v)),
            NativeValue::U16(v) => DatabaseValue::Int32(i32::from(*v)),
            NativeValue::U32(v) => DatabaseValue::Int64(i64::from(*v)),
            NativeValue::U64(v) => DatabaseValue::UInt64(*v),
            NativeValue::F32(v) => DatabaseValue::Float32(*v),
            NativeValue::F64(v) => DatabaseValue::Float64(*v),
            NativeValue::String(s) => DatabaseValue::String(s.clone()),
            NativeValue::Bytes(b) => DatabaseValue::Bytes(b.clone()),
            NativeValue::Uuid(u) => DatabaseValue::String(u.hyphenated().to_string()),
            NativeValue::DateTime(dt) => DatabaseValue::DateTime(dt.naive_utc()),
            NativeValue::NaiveDateTime(n) => DatabaseValue::DateTime(*n),
            NativeValue::DateTimeOffset(dt) => DatabaseValue::DateTime(dt.naive_utc()),
            NativeValue::Date(d) => DatabaseValue::Date(*d),
            NativeValue::TimeOfDay(t) => DatabaseValue::Time(t.signed_duration_since(NaiveTime::MIN)),
            NativeValue::TimeSpan(span) => DatabaseValue::Time(checked_time_span(*span)?),
            NativeValue::Enum(e) => DatabaseValue::String(e.name.clone()),
            NativeValue::Json(j) => DatabaseValue::String(j.to_string()),
        };

        Ok(stored)
    }

    fn from_storage(
        &self,
        value: &DatabaseValue,
        target: NativeType,
        _hints: &FieldHints,
    ) -> Result<NativeValue, ConversionError> {
        if value.is_null() {
            return Ok(NativeValue::Null);
        }

        let decoded = match target {
            NativeType::Bool => NativeValue::Bool(decode_bool(value)?),
            NativeType::I8 => NativeValue::I8(decode_integer(value, "i8")?),
            NativeType::I16 => NativeValue::I16(decode_integer(value, "i16")?),
            NativeType::I32 => NativeValue::I32(decode_integer(value, "i32")?),
            NativeType::I64 => NativeValue::I64(decode_integer(value, "i64")?),
            NativeType::U8 => NativeValue::U8(decode_integer(value, "u8")?),
            NativeType::U16 => NativeValue::U16(decode_integer(value, "u16")?),
            NativeType::U32 => NativeValue::U32(decode_integer(value, "u32")?),
            NativeType::U64 => NativeValue::U64(decode_integer(value, "u64")?),
            NativeType::F32 => NativeValue::F32(decode_float(value, "f32")? as f32),
            NativeType::F64 => NativeValue::F64(decode_float(value, "f64")?),
            NativeType::String => NativeValue::String(decode_text(value)?),
            NativeType::Bytes => NativeValue::Bytes(decode_bytes(value)?),
            NativeType::Uuid => NativeValue::Uuid(decode_uuid(value)?),
            NativeType::DateTime => NativeValue::DateTime(decode_datetime(value)?.and_utc()),
            NativeType::NaiveDateTime => NativeValue::NaiveDateTime(decode_datetime(value)?),
            NativeType::DateTimeOffset => {
                NativeValue::DateTimeOffset(decode_datetime(value)?.and_utc().fixed_offset())
            }
            NativeType::Date => NativeValue::Date(decode_date(value)?),
            NativeType::TimeOfDay => NativeValue::TimeOfDay(decode_time_of_day(value)?),
            NativeType::TimeSpan => NativeValue::TimeSpan(decode_time_span(value)?),
            NativeType::Enum(descriptor) => NativeValue::Enum(decode_enum(descriptor, value)?),
            NativeType::Json => decode_json(value)?,
        };

        Ok(decoded)
    }
}

fn unsupported<T>(target: &str, value: &DatabaseValue) -> Result<T, ConversionError> {
    Err(ConversionError::new(
        target,
        format!("unsupported {} value", value.kind()),
    ))
}

fn parse_uuid(text: &str) -> Result<Uuid, ConversionError> {
    Uuid::parse_str(text.trim())
        .map_err(|e| ConversionError::new("uuid", format!("'{}': {}", text, e)))
}

fn native_truth(value: &NativeValue) -> Result<bool, ConversionError> {
    match value {
        NativeValue::Bool(b) => Ok(*b),
        NativeValue::String(s) => text_truth(s).ok_or_else(|| {
            ConversionError::new("bool", format!("'{}' is not a boolean", s))
        }),
        other => match other.as_integer() {
            Some(int) => Ok(int != 0),
            None => Err(ConversionError::new(
                "bool",
                format!("{:?} is not a boolean", other),
            )),
        },
    }
}

fn text_truth(text: &str) -> Option<bool> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("true") {
        return Some(true);
    }
    if text.eq_ignore_ascii_case("false") {
        return Some(false);
    }
    if let Ok(int) = text.parse::<i64>() {
        return Some(int != 0);
    }
    text.parse::<f64>().ok().map(|f| f != 0.0)
}

fn checked_time_span(span: Duration) -> Result<Duration, ConversionError> {
    let limit = Duration::seconds(MAX_TIME_SECONDS) + Duration::microseconds(999_999);
    if span > limit || span < -limit {
        return Err(ConversionError::new(
            "time span",
            format!(
                "{} is outside the TIME range",
                time_text::format_time_text(span)
            ),
        ));
    }
    Ok(span)
}

fn encode_enum(
    descriptor: &EnumDescriptor,
    value: &NativeValue,
    hints: &FieldHints,
) -> Result<DatabaseValue, ConversionError> {
    let (name, ordinal) = match value {
        NativeValue::Enum(e) => descriptor
            .by_name(&e.name)
            .or_else(|| descriptor.by_ordinal(e.ordinal)),
        NativeValue::String(s) => descriptor.by_name(s),
        other => other
            .as_integer()
            .and_then(|int| i64::try_from(int).ok())
            .and_then(|ordinal| descriptor.by_ordinal(ordinal)),
    }
    .ok_or_else(|| {
        ConversionError::new(
            descriptor.name,
            format!("{:?} is not a member of the enumeration", value),
        )
    })?;

    Ok(match hints.enum_storage {
        EnumStorage::Text => DatabaseValue::String(name.to_string()),
        EnumStorage::Number => DatabaseValue::Int64(ordinal),
    })
}

fn encode_json(value: &NativeValue) -> Result<DatabaseValue, ConversionError> {
    let document = value.to_json();
    serde_json::to_string(&document)
        .map(DatabaseValue::String)
        .map_err(|e| ConversionError::new("json", e.to_string()))
}

fn decode_bool(value: &DatabaseValue) -> Result<bool, ConversionError> {
    match value {
        DatabaseValue::Bool(b) => Ok(*b),
        DatabaseValue::Int8(v) => Ok(*v != 0),
        DatabaseValue::Int16(v) => Ok(*v != 0),
        DatabaseValue::Int32(v) => Ok(*v != 0),
        DatabaseValue::Int64(v) => Ok(*v != 0),
        DatabaseValue::UInt64(v) => Ok(*v != 0),
        DatabaseValue::Float32(v) => Ok(*v != 0.0),
        DatabaseValue::Float64(v) => Ok(*v != 0.0),
        DatabaseValue::String(s) => text_truth(s)
            .ok_or_else(|| ConversionError::new("bool", format!("'{}' is not a boolean", s))),
        DatabaseValue::Bytes(b) if b.len() == 1 => Ok(b[0] != 0),
        other => unsupported("bool", other),
    }
}

fn decode_integer<T>(value: &DatabaseValue, target: &str) -> Result<T, ConversionError>
where
    T: TryFrom<i64> + TryFrom<u64> + std::str::FromStr,
{
    let out_of_range = |shown: String| {
        ConversionError::new(target, format!("{} is out of range", shown))
    };
    match value {
        DatabaseValue::Bool(b) => T::try_from(i64::from(*b)).map_err(|_| out_of_range(b.to_string())),
        DatabaseValue::Int8(v) => T::try_from(i64::from(*v)).map_err(|_| out_of_range(v.to_string())),
        DatabaseValue::Int16(v) => T::try_from(i64::from(*v)).map_err(|_| out_of_range(v.to_string())),
        DatabaseValue::Int32(v) => T::try_from(i64::from(*v)).map_err(|_| out_of_range(v.to_string())),
        DatabaseValue::Int64(v) => T::try_from(*v).map_err(|_| out_of_range(v.to_string())),
        DatabaseValue::UInt64(v) => T::try_from(*v).map_err(|_| out_of_range(v.to_string())),
        DatabaseValue::Float32(f) if f.fract() == 0.0 => {
            T::try_from(*f as i64).map_err(|_| out_of_range(f.to_string()))
        }
        DatabaseValue::Float64(f) if f.fract() == 0.0 => {
            T::try_from(*f as i64).map_err(|_| out_of_range(f.to_string()))
        }
        DatabaseValue::String(s) => s
            .trim()
            .parse::<T>()
            .map_err(|_| ConversionError::new(target, format!("'{}' is not an integer", s))),
        other => unsupported(target, other),
    }
}

fn decode_float(value: &DatabaseValue, target: &str) -> Result<f64, ConversionError> {
    match value {
        DatabaseValue::Float32(f) => Ok(f64::from(*f)),
        DatabaseValue::Float64(f) => Ok(*f),
        DatabaseValue::Int8(v) => Ok(f64::from(*v)),
        DatabaseValue::Int16(v) => Ok(f64::from(*v)),
        DatabaseValue::Int32(v) => Ok(f64::from(*v)),
        DatabaseValue::Int64(v) => Ok(*v as f64),
        DatabaseValue::UInt64(v) => Ok(*v as f64),
        DatabaseValue::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| ConversionError::new(target, format!("'{}' is not a number", s))),
        other => unsupported(target, other),
    }
}

fn decode_text(value: &DatabaseValue) -> Result<String, ConversionError> {
    match value {
        DatabaseValue::String(s) => Ok(s.clone()),
        DatabaseValue::Bytes(b) => String::from_utf8(b.clone())
            .map_err(|e| ConversionError::new("string", e.to_string())),
        DatabaseValue::Bool(b) => Ok(b.to_string()),
        DatabaseValue::Int8(v) => Ok(v.to_string()),
        DatabaseValue::Int16(v) => Ok(v.to_string()),
        DatabaseValue::Int32(v) => Ok(v.to_string()),
        DatabaseValue::Int64(v) => Ok(v.to_string()),
        DatabaseValue::UInt64(v) => Ok(v.to_string()),
        DatabaseValue::Float32(v) => Ok(v.to_string()),
        DatabaseValue::Float64(v) => Ok(v.to_string()),
        DatabaseValue::Uuid(u) => Ok(u.hyphenated().to_string()),
        DatabaseValue::DateTime(n) => Ok(n.to_string()),
        DatabaseValue::Date(d) => Ok(d.to_string()),
        DatabaseValue::Time(t) => Ok(time_text::format_time_text(*t)),
        DatabaseValue::Json(j) => Ok(j.to_string()),
        DatabaseValue::Null => unsupported("string", value),
    }
}

fn decode_bytes(value: &DatabaseValue) -> Result<Vec<u8>, ConversionError> {
    match value {
        DatabaseValue::Bytes(b) => Ok(b.clone()),
        DatabaseValue::String(s) => Ok(s.clone().into_bytes()),
        DatabaseValue::Uuid(u) => Ok(u.as_bytes().to_vec()),
        other => unsupported("bytes", other),
    }
}

fn decode_uuid(value: &DatabaseValue) -> Result<Uuid, ConversionError> {
    match value {
        DatabaseValue::Uuid(u) => Ok(*u),
        DatabaseValue::String(s) => parse_uuid(s),
        DatabaseValue::Bytes(b) if b.len() == 16 => {
            Uuid::from_slice(b).map_err(|e| ConversionError::new("uuid", e.to_string()))
        }
        DatabaseValue::Bytes(b) => match std::str::from_utf8(b) {
            Ok(text) => parse_uuid(text),
            Err(_) => Err(ConversionError::new(
                "uuid",
                format!("{}-byte binary value is not a UUID", b.len()),
            )),
        },
        other => unsupported("uuid", other),
    }
}

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Decode to a naive UTC datetime; offsets in text are normalized away
fn decode_datetime(value: &DatabaseValue) -> Result<NaiveDateTime, ConversionError> {
    match value {
        DatabaseValue::DateTime(n) => Ok(*n),
        DatabaseValue::Date(d) => Ok(d.and_time(NaiveTime::MIN)),
        DatabaseValue::String(s) => {
            let text = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
                return Ok(dt.with_timezone(&Utc).naive_utc());
            }
            DATETIME_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
                .ok_or_else(|| {
                    ConversionError::new("datetime", format!("'{}' is not a datetime", s))
                })
        }
        other => unsupported("datetime", other),
    }
}

fn decode_date(value: &DatabaseValue) -> Result<NaiveDate, ConversionError> {
    match value {
        DatabaseValue::Date(d) => Ok(*d),
        DatabaseValue::DateTime(n) => Ok(n.date()),
        DatabaseValue::String(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .or_else(|_| decode_datetime(value).map(|n| n.date()))
            .map_err(|_| ConversionError::new("date", format!("'{}' is not a date", s))),
        other => unsupported("date", other),
    }
}

fn decode_time_span(value: &DatabaseValue) -> Result<Duration, ConversionError> {
    match value {
        DatabaseValue::Time(span) => Ok(*span),
        DatabaseValue::String(s) => time_text::parse_time_text(s),
        DatabaseValue::Bytes(b) => match std::str::from_utf8(b) {
            Ok(text) => time_text::parse_time_text(text),
            Err(e) => Err(ConversionError::new("time span", e.to_string())),
        },
        other => unsupported("time span", other),
    }
}

fn decode_time_of_day(value: &DatabaseValue) -> Result<NaiveTime, ConversionError> {
    if let DatabaseValue::DateTime(n) = value {
        return Ok(n.time());
    }
    let span = decode_time_span(value)?;
    if span < Duration::zero() || span >= Duration::days(1) {
        return Err(ConversionError::new(
            "time of day",
            format!(
                "{} is outside a single day",
                time_text::format_time_text(span)
            ),
        ));
    }
    Ok(NaiveTime::MIN + span)
}

fn decode_enum(
    descriptor: &EnumDescriptor,
    value: &DatabaseValue,
) -> Result<EnumValue, ConversionError> {
    let found = match value {
        DatabaseValue::String(s) => match descriptor.by_name(s.trim()) {
            Some(found) => Some(found),
            None => s
                .trim()
                .parse::<i64>()
                .ok()
                .and_then(|ordinal| descriptor.by_ordinal(ordinal)),
        },
        numeric => decode_integer::<i64>(numeric, descriptor.name)
            .ok()
            .and_then(|ordinal| descriptor.by_ordinal(ordinal)),
    };

    found
        .map(|(name, ordinal)| EnumValue::new(name, ordinal))
        .ok_or_else(|| {
            ConversionError::new(
                descriptor.name,
                format!("unknown {} value {:?}", descriptor.name, value),
            )
        })
}

fn decode_json(value: &DatabaseValue) -> Result<NativeValue, ConversionError> {
    let text = match value {
        DatabaseValue::Json(j) => return Ok(NativeValue::Json(j.clone())),
        DatabaseValue::String(s) => s.as_str(),
        DatabaseValue::Bytes(b) => std::str::from_utf8(b)
            .map_err(|e| ConversionError::new("json", e.to_string()))?,
        other => return unsupported("json", other),
    };

    if text.trim().is_empty() {
        return Ok(NativeValue::Null);
    }
    serde_json::from_str(text)
        .map(NativeValue::Json)
        .map_err(|e| ConversionError::new("json", e.to_string()))
}
