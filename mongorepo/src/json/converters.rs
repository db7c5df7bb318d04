use crate::common::{Value, ISO_DATE_WRAPPER, NUMBER_LONG_WRAPPER};
use crate::errors::{ErrorKind, RepoError, RepoResult};
use chrono::{DateTime, Utc};

/// Writes a value as a raw shell literal instead of standard JSON.
///
/// Converters are write-only: there is no way to read a literal back through
/// them. Decoding literals belongs to the backend, see
/// [`ShellJsonReader::with_driver_decoders`](crate::json::ShellJsonReader::with_driver_decoders).
pub trait LiteralConverter: Send + Sync {
    fn can_convert(&self, value: &Value) -> bool;

    /// Renders the literal token, unquoted at the JSON level.
    fn write_literal(&self, value: &Value) -> RepoResult<String>;
}

/// Writes instants as `ISODate("yyyy-MM-ddTHH:mm:ss[.fff]Z")`.
///
/// The fraction is truncated to milliseconds, trailing zeros are dropped and
/// the decimal point is left out when nothing remains.
#[derive(Debug, Default, Clone, Copy)]
pub struct IsoDateConverter;

impl LiteralConverter for IsoDateConverter {
    fn can_convert(&self, value: &Value) -> bool {
        value.is_date_time()
    }

    fn write_literal(&self, value: &Value) -> RepoResult<String> {
        match value {
            Value::DateTime(date) => Ok(format!("{}(\"{}\")", ISO_DATE_WRAPPER, format_iso_date(date))),
            _ => Err(unexpected(value, "date")),
        }
    }
}

/// Writes 64 bit integers as `NumberLong("<decimal>")`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NumberLongConverter;

impl LiteralConverter for NumberLongConverter {
    fn can_convert(&self, value: &Value) -> bool {
        matches!(value, Value::I64(_))
    }

    fn write_literal(&self, value: &Value) -> RepoResult<String> {
        match value {
            Value::I64(v) => Ok(format!("{}(\"{}\")", NUMBER_LONG_WRAPPER, v)),
            _ => Err(unexpected(value, "64 bit integer")),
        }
    }
}

fn unexpected(value: &Value, expected: &str) -> RepoError {
    log::error!("Literal converter expected a {} but got {:?}", expected, value);
    RepoError::new(
        &format!("Literal converter expected a {} but got {}", expected, value.type_name()),
        ErrorKind::InvalidDataType,
    )
}

/// Formats an instant in UTC with at most three fractional digits, trailing
/// zeros trimmed.
pub fn format_iso_date(date: &DateTime<Utc>) -> String {
    let mut text = date.format("%Y-%m-%dT%H:%M:%S").to_string();
    // leap seconds report 1000+ millis
    let millis = date.timestamp_subsec_millis().min(999);
    if millis > 0 {
        let fraction = format!("{:03}", millis);
        text.push('.');
        text.push_str(fraction.trim_end_matches('0'));
    }
    text.push('Z');
    text
}
