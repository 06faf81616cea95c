//! Native value model
//!
//! The typed side of the converter: the declared native type of a field, the
//! values entities hand to the ORM, and the helpers entities use to read them
//! back out of a materialized record.

use std::fmt;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use super::ConversionError;

/// Static description of an enumeration: symbolic names and their ordinals
#[derive(Debug, PartialEq, Eq)]
pub struct EnumDescriptor {
    pub name: &'static str,
    pub variants: &'static [(&'static str, i64)],
}

impl EnumDescriptor {
    /// Look a variant up by symbolic name, ignoring case
    pub fn by_name(&self, name: &str) -> Option<(&'static str, i64)> {
        self.variants
            .iter()
            .copied()
            .find(|(variant, _)| variant.eq_ignore_ascii_case(name))
    }

    /// Look a variant up by ordinal
    pub fn by_ordinal(&self, ordinal: i64) -> Option<(&'static str, i64)> {
        self.variants
            .iter()
            .copied()
            .find(|(_, value)| *value == ordinal)
    }
}

/// How an enumeration column is stored
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EnumStorage {
    /// Symbolic name in a text column
    #[default]
    Text,
    /// Ordinal in an integer column
    Number,
}

/// Per-field storage hints
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldHints {
    pub enum_storage: EnumStorage,
    /// Store in a `LONGTEXT` column regardless of the native type
    pub large_text: bool,
    /// Length of a `VARCHAR` column
    pub max_length: Option<u32>,
}

impl FieldHints {
    pub fn enum_as_number() -> Self {
        Self {
            enum_storage: EnumStorage::Number,
            ..Self::default()
        }
    }

    pub fn large_text() -> Self {
        Self {
            large_text: true,
            ..Self::default()
        }
    }

    pub fn max_length(length: u32) -> Self {
        Self {
            max_length: Some(length),
            ..Self::default()
        }
    }
}

/// Declared native type of a field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NativeType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    String,
    Bytes,
    Uuid,
    /// `DateTime<Utc>`
    DateTime,
    NaiveDateTime,
    /// `DateTime<FixedOffset>`, normalized to UTC in storage
    DateTimeOffset,
    Date,
    TimeOfDay,
    /// Signed duration, may exceed 24 hours
    TimeSpan,
    Enum(&'static EnumDescriptor),
    /// Arrays, sequences and structured values kept as a JSON document
    Json,
}

impl fmt::Display for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeType::Enum(descriptor) => write!(f, "enum {}", descriptor.name),
            other => write!(f, "{:?}", other),
        }
    }
}

/// A decoded enumeration value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    pub name: String,
    pub ordinal: i64,
}

impl EnumValue {
    pub fn new(name: &str, ordinal: i64) -> Self {
        Self {
            name: name.to_string(),
            ordinal,
        }
    }
}

/// A value on the typed side of the converter
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    Null,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    String(String),
    Bytes(Vec<u8>),
    Uuid(Uuid),
    DateTime(DateTime<Utc>),
    NaiveDateTime(NaiveDateTime),
    DateTimeOffset(DateTime<FixedOffset>),
    Date(NaiveDate),
    TimeOfDay(NaiveTime),
    TimeSpan(Duration),
    Enum(EnumValue),
    Json(JsonValue),
}

/// Hashable identity of a key value, used to match foreign keys to parents
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyValue {
    Int(i128),
    Text(String),
    Uuid(Uuid),
    Bytes(Vec<u8>),
}

impl NativeValue {
    pub fn is_null(&self) -> bool {
        matches!(self, NativeValue::Null)
    }

    /// Widen any integral value to i128
    pub fn as_integer(&self) -> Option<i128> {
        match self {
            NativeValue::Bool(b) => Some(i128::from(*b)),
            NativeValue::I8(v) => Some(i128::from(*v)),
            NativeValue::I16(v) => Some(i128::from(*v)),
            NativeValue::I32(v) => Some(i128::from(*v)),
            NativeValue::I64(v) => Some(i128::from(*v)),
            NativeValue::U8(v) => Some(i128::from(*v)),
            NativeValue::U16(v) => Some(i128::from(*v)),
            NativeValue::U32(v) => Some(i128::from(*v)),
            NativeValue::U64(v) => Some(i128::from(*v)),
            _ => None,
        }
    }

    /// Key identity; integers of different widths compare equal
    pub fn to_key(&self) -> Option<KeyValue> {
        if let Some(int) = self.as_integer() {
            return Some(KeyValue::Int(int));
        }
        match self {
            NativeValue::String(s) => Some(KeyValue::Text(s.clone())),
            NativeValue::Uuid(u) => Some(KeyValue::Uuid(*u)),
            NativeValue::Bytes(b) => Some(KeyValue::Bytes(b.clone())),
            NativeValue::Enum(e) => Some(KeyValue::Int(i128::from(e.ordinal))),
            NativeValue::Date(d) => Some(KeyValue::Text(d.to_string())),
            NativeValue::NaiveDateTime(n) => Some(KeyValue::Text(n.to_string())),
            NativeValue::DateTime(dt) => Some(KeyValue::Text(dt.naive_utc().to_string())),
            NativeValue::DateTimeOffset(dt) => Some(KeyValue::Text(dt.naive_utc().to_string())),
            _ => None,
        }
    }

    /// JSON representation used when a scalar lands in a JSON column
    pub fn to_json(&self) -> JsonValue {
        match self {
            NativeValue::Null => JsonValue::Null,
            NativeValue::Bool(b) => JsonValue::Bool(*b),
            NativeValue::F32(f) => serde_json::Number::from_f64(f64::from(*f))
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            NativeValue::F64(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            NativeValue::String(s) => JsonValue::String(s.clone()),
            NativeValue::Bytes(b) => JsonValue::Array(b.iter().map(|x| JsonValue::from(*x)).collect()),
            NativeValue::Uuid(u) => JsonValue::String(u.to_string()),
            NativeValue::DateTime(dt) => JsonValue::String(dt.to_rfc3339()),
            NativeValue::NaiveDateTime(n) => JsonValue::String(n.to_string()),
            NativeValue::DateTimeOffset(dt) => JsonValue::String(dt.to_rfc3339()),
            NativeValue::Date(d) => JsonValue::String(d.to_string()),
            NativeValue::TimeOfDay(t) => JsonValue::String(t.to_string()),
            NativeValue::TimeSpan(d) => JsonValue::String(super::time_text::format_time_text(*d)),
            NativeValue::Enum(e) => JsonValue::String(e.name.clone()),
            NativeValue::Json(j) => j.clone(),
            integral => match integral.as_integer() {
                Some(int) => i64::try_from(int)
                    .map(JsonValue::from)
                    .or_else(|_| u64::try_from(int).map(JsonValue::from))
                    .unwrap_or(JsonValue::Null),
                None => JsonValue::Null,
            },
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            NativeValue::Null => "null",
            NativeValue::Bool(_) => "bool",
            NativeValue::I8(_) | NativeValue::I16(_) | NativeValue::I32(_) | NativeValue::I64(_) => {
                "signed integer"
            }
            NativeValue::U8(_) | NativeValue::U16(_) | NativeValue::U32(_) | NativeValue::U64(_) => {
                "unsigned integer"
            }
            NativeValue::F32(_) | NativeValue::F64(_) => "float",
            NativeValue::String(_) => "string",
            NativeValue::Bytes(_) => "bytes",
            NativeValue::Uuid(_) => "uuid",
            NativeValue::DateTime(_) | NativeValue::NaiveDateTime(_) | NativeValue::DateTimeOffset(_) => {
                "datetime"
            }
            NativeValue::Date(_) => "date",
            NativeValue::TimeOfDay(_) => "time of day",
            NativeValue::TimeSpan(_) => "time span",
            NativeValue::Enum(_) => "enum",
            NativeValue::Json(_) => "json",
        }
    }
}

macro_rules! native_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for NativeValue {
                fn from(value: $ty) -> Self {
                    NativeValue::$variant(value)
                }
            }
        )*
    };
}

native_from! {
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    String => String,
    Vec<u8> => Bytes,
    Uuid => Uuid,
    DateTime<Utc> => DateTime,
    NaiveDateTime => NaiveDateTime,
    DateTime<FixedOffset> => DateTimeOffset,
    NaiveDate => Date,
    NaiveTime => TimeOfDay,
    Duration => TimeSpan,
    EnumValue => Enum,
    JsonValue => Json,
}

impl From<&str> for NativeValue {
    fn from(value: &str) -> Self {
        NativeValue::String(value.to_string())
    }
}

impl<T: Into<NativeValue>> From<Option<T>> for NativeValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(NativeValue::Null, Into::into)
    }
}

/// Extraction of a Rust value out of a [`NativeValue`]
pub trait FromNative: Sized {
    fn from_native(value: NativeValue) -> Result<Self, ConversionError>;
}

fn mismatch<T>(expected: &str, value: &NativeValue) -> Result<T, ConversionError> {
    Err(ConversionError::new(
        expected,
        format!("found {} value", value.kind()),
    ))
}

macro_rules! integer_from_native {
    ($($ty:ty),*) => {
        $(
            impl FromNative for $ty {
                fn from_native(value: NativeValue) -> Result<Self, ConversionError> {
                    match value.as_integer() {
                        Some(int) => <$ty>::try_from(int).map_err(|_| {
                            ConversionError::new(stringify!($ty), format!("{} is out of range", int))
                        }),
                        None => mismatch(stringify!($ty), &value),
                    }
                }
            }
        )*
    };
}

integer_from_native!(i8, i16, i32, i64, u8, u16, u32, u64);

macro_rules! exact_from_native {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl FromNative for $ty {
                fn from_native(value: NativeValue) -> Result<Self, ConversionError> {
                    match value {
                        NativeValue::$variant(inner) => Ok(inner),
                        other => mismatch(stringify!($ty), &other),
                    }
                }
            }
        )*
    };
}

exact_from_native! {
    bool => Bool,
    String => String,
    Vec<u8> => Bytes,
    Uuid => Uuid,
    NaiveDate => Date,
    NaiveTime => TimeOfDay,
    Duration => TimeSpan,
    EnumValue => Enum,
    JsonValue => Json,
}

impl FromNative for f64 {
    fn from_native(value: NativeValue) -> Result<Self, ConversionError> {
        match value {
            NativeValue::F64(f) => Ok(f),
            NativeValue::F32(f) => Ok(f64::from(f)),
            other => mismatch("f64", &other),
        }
    }
}

impl FromNative for f32 {
    fn from_native(value: NativeValue) -> Result<Self, ConversionError> {
        match value {
            NativeValue::F32(f) => Ok(f),
            NativeValue::F64(f) => Ok(f as f32),
            other => mismatch("f32", &other),
        }
    }
}

impl FromNative for DateTime<Utc> {
    fn from_native(value: NativeValue) -> Result<Self, ConversionError> {
        match value {
            NativeValue::DateTime(dt) => Ok(dt),
            NativeValue::DateTimeOffset(dt) => Ok(dt.with_timezone(&Utc)),
            NativeValue::NaiveDateTime(n) => Ok(n.and_utc()),
            other => mismatch("DateTime<Utc>", &other),
        }
    }
}

impl FromNative for DateTime<FixedOffset> {
    fn from_native(value: NativeValue) -> Result<Self, ConversionError> {
        match value {
            NativeValue::DateTimeOffset(dt) => Ok(dt),
            NativeValue::DateTime(dt) => Ok(dt.fixed_offset()),
            NativeValue::NaiveDateTime(n) => Ok(n.and_utc().fixed_offset()),
            other => mismatch("DateTime<FixedOffset>", &other),
        }
    }
}

impl FromNative for NaiveDateTime {
    fn from_native(value: NativeValue) -> Result<Self, ConversionError> {
        match value {
            NativeValue::NaiveDateTime(n) => Ok(n),
            NativeValue::DateTime(dt) => Ok(dt.naive_utc()),
            NativeValue::DateTimeOffset(dt) => Ok(dt.naive_utc()),
            other => mismatch("NaiveDateTime", &other),
        }
    }
}

impl<T: FromNative> FromNative for Option<T> {
    fn from_native(value: NativeValue) -> Result<Self, ConversionError> {
        match value {
            NativeValue::Null => Ok(None),
            other => T::from_native(other).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static COLOR: EnumDescriptor = EnumDescriptor {
        name: "Color",
        variants: &[("Red", 0), ("Green", 1), ("Blue", 2)],
    };

    #[test]
    fn test_keys_ignore_integer_width() {
        assert_eq!(NativeValue::I32(7).to_key(), NativeValue::U64(7).to_key());
        assert_eq!(NativeValue::I64(-1).to_key(), Some(KeyValue::Int(-1)));
        assert_eq!(NativeValue::Null.to_key(), None);
        assert_eq!(NativeValue::F64(1.0).to_key(), None);
    }

    #[test]
    fn test_enum_descriptor_lookup() {
        assert_eq!(COLOR.by_name("green"), Some(("Green", 1)));
        assert_eq!(COLOR.by_ordinal(2), Some(("Blue", 2)));
        assert_eq!(COLOR.by_name("purple"), None);
    }

    #[test]
    fn test_from_native_integers_check_range() {
        assert_eq!(i32::from_native(NativeValue::I64(42)).unwrap(), 42);
        assert!(u8::from_native(NativeValue::I32(300)).is_err());
        assert!(u64::from_native(NativeValue::I64(-3)).is_err());
        assert_eq!(Option::<i64>::from_native(NativeValue::Null).unwrap(), None);
        assert!(i64::from_native(NativeValue::Null).is_err());
    }

    #[test]
    fn test_u64_to_json_keeps_full_range() {
        assert_eq!(NativeValue::U64(u64::MAX).to_json(), JsonValue::from(u64::MAX));
    }
}
