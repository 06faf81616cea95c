//! Column types used by MySQL schema generation

use super::native::{EnumStorage, FieldHints, NativeType};

const DEFAULT_VARCHAR_LENGTH: u32 = 255;

/// MySQL column type for a native type
pub fn mysql_column_type(target: NativeType, hints: &FieldHints) -> String {
    if hints.large_text {
        return "LONGTEXT".to_string();
    }

    let column = match target {
        NativeType::Bool => "TINYINT(1)",
        NativeType::I8 => "TINYINT",
        NativeType::U8 => "TINYINT UNSIGNED",
        NativeType::I16 => "SMALLINT",
        NativeType::U16 => "SMALLINT UNSIGNED",
        NativeType::I32 => "INT",
        NativeType::U32 => "INT UNSIGNED",
        NativeType::I64 => "BIGINT",
        NativeType::U64 => "BIGINT UNSIGNED",
        NativeType::F32 => "FLOAT",
        NativeType::F64 => "DOUBLE",
        NativeType::String => {
            return format!(
                "VARCHAR({})",
                hints.max_length.unwrap_or(DEFAULT_VARCHAR_LENGTH)
            )
        }
        NativeType::Bytes => "LONGBLOB",
        NativeType::Uuid => "CHAR(36)",
        NativeType::DateTime | NativeType::NaiveDateTime | NativeType::DateTimeOffset => "DATETIME(6)",
        NativeType::Date => "DATE",
        NativeType::TimeOfDay | NativeType::TimeSpan => "TIME(6)",
        NativeType::Enum(_) => match hints.enum_storage {
            EnumStorage::Text => "VARCHAR(64)",
            EnumStorage::Number => "INT",
        },
        NativeType::Json => "JSON",
    };

    column.to_string()
}
