//! Log records and their rendering.
//!
//! A record is rendered at the call site so the timestamp reflects when the
//! event happened, not when the writer got around to it.

use std::fmt::{self, Write as _};
use std::net::SocketAddr;

use chrono::{DateTime, Local};

/// Sortable timestamp layout, e.g. `2025-03-01 14:07:09.042`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Maximum number of fields rendered per record.
pub const MAX_FIELDS: usize = 8;

/// A typed value attached to a log call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Str(String),
    U64(u64),
    I64(i64),
    Bool(bool),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Str(s) if needs_quoting(s) => write!(f, "{s:?}"),
            FieldValue::Str(s) => f.write_str(s),
            FieldValue::U64(v) => write!(f, "{v}"),
            FieldValue::I64(v) => write!(f, "{v}"),
            FieldValue::Bool(v) => write!(f, "{v}"),
        }
    }
}

fn needs_quoting(s: &str) -> bool {
    s.is_empty() || s.chars().any(|c| c.is_whitespace() || c == '=' || c == '"')
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Str(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Str(v)
    }
}

impl From<SocketAddr> for FieldValue {
    fn from(v: SocketAddr) -> Self {
        FieldValue::Str(v.to_string())
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

macro_rules! unsigned_field {
    ($($t:ty),*) => {
        $(impl From<$t> for FieldValue {
            fn from(v: $t) -> Self {
                FieldValue::U64(v as u64)
            }
        })*
    };
}

macro_rules! signed_field {
    ($($t:ty),*) => {
        $(impl From<$t> for FieldValue {
            fn from(v: $t) -> Self {
                FieldValue::I64(v as i64)
            }
        })*
    };
}

unsigned_field!(u16, u32, u64, usize);
signed_field!(i32, i64);

/// A key and its typed value.
pub type Field<'a> = (&'a str, FieldValue);

/// One rendered line waiting for the writer.
#[derive(Debug, Clone)]
pub struct LogRecord {
    /// `<timestamp> [<TAG>] <message> k=v...\n`
    line: String,
}

impl LogRecord {
    /// Capture the current time and render the record.
    pub fn new(tag: &str, message: &str, fields: &[Field<'_>]) -> Self {
        Self::at(Local::now(), tag, message, fields)
    }

    /// Render a record for an explicit timestamp.
    pub fn at(timestamp: DateTime<Local>, tag: &str, message: &str, fields: &[Field<'_>]) -> Self {
        let mut line = String::with_capacity(33 + message.len() + fields.len() * 16);
        // Writing to a String cannot fail.
        let _ = write!(
            line,
            "{} [{}] {}",
            timestamp.format(TIMESTAMP_FORMAT),
            tag,
            message
        );
        for (key, value) in fields.iter().take(MAX_FIELDS) {
            let _ = write!(line, " {key}={value}");
        }
        if fields.len() > MAX_FIELDS {
            let _ = write!(line, " dropped_fields={}", fields.len() - MAX_FIELDS);
        }
        line.push('\n');

        Self { line }
    }

    /// The record without its line terminator.
    pub fn as_str(&self) -> &str {
        self.line.trim_end_matches('\n')
    }

    /// The full line, terminator included, as handed to the sink.
    pub fn as_bytes(&self) -> &[u8] {
        self.line.as_bytes()
    }
}
