//! Runtime values held by consent-signal fields.

use crate::codec::{GppError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::json;

/// A single field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(u32),
    Long(u64),
    /// Fixed integer lists and id sets (ranges).
    IntList(Vec<u32>),
    Bitfield(Vec<bool>),
    Str(String),
    Char(char),
    Datetime(DateTime<Utc>),
    Ranges(Vec<RangeEntry>),
}

/// One entry of an array of ranges: a small key, a small type tag, and the ids it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeEntry {
    key: u32,
    kind: u32,
    ids: Vec<u32>,
}

impl RangeEntry {
    /// `ids` must not be empty.
    pub fn new(key: u32, kind: u32, ids: Vec<u32>) -> Result<Self> {
        if ids.is_empty() {
            return Err(GppError::Validation(format!(
                "range entry {}/{} has no ids",
                key, kind
            )));
        }
        Ok(RangeEntry { key, kind, ids })
    }

    pub fn key(&self) -> u32 {
        self.key
    }

    pub fn kind(&self) -> u32 {
        self.kind
    }

    pub fn ids(&self) -> &[u32] {
        &self.ids
    }
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::Int(x) => Some(*x),
            Value::Long(x) => u32::try_from(*x).ok(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Int(x) => Some(*x as u64),
            Value::Long(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[u32]> {
        match self {
            Value::IntList(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bitfield(&self) -> Option<&[bool]> {
        match self {
            Value::Bitfield(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_char(&self) -> Option<char> {
        match self {
            Value::Char(c) => Some(*c),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<&DateTime<Utc>> {
        match self {
            Value::Datetime(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_ranges(&self) -> Option<&[RangeEntry]> {
        match self {
            Value::Ranges(r) => Some(r),
            _ => None,
        }
    }

    /// Short name of the variant, used in type-mismatch messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::IntList(_) => "int list",
            Value::Bitfield(_) => "bitfield",
            Value::Str(_) => "string",
            Value::Char(_) => "char",
            Value::Datetime(_) => "datetime",
            Value::Ranges(_) => "ranges",
        }
    }

    /// JSON view used by `to_obj`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Bool(b) => json!(b),
            Value::Int(x) => json!(x),
            Value::Long(x) => json!(x),
            Value::IntList(v) => json!(v),
            Value::Bitfield(v) => json!(v),
            Value::Str(s) => json!(s),
            Value::Char(c) => json!(c.to_string()),
            Value::Datetime(d) => json!(d.to_rfc3339_opts(SecondsFormat::Millis, true)),
            Value::Ranges(r) => serde_json::Value::Array(
                r.iter()
                    .map(|e| json!({ "key": e.key, "type": e.kind, "ids": e.ids }))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<u32> for Value {
    fn from(x: u32) -> Self {
        Value::Int(x)
    }
}

impl From<u64> for Value {
    fn from(x: u64) -> Self {
        Value::Long(x)
    }
}

impl From<Vec<u32>> for Value {
    fn from(v: Vec<u32>) -> Self {
        Value::IntList(v)
    }
}

impl From<Vec<bool>> for Value {
    fn from(v: Vec<bool>) -> Self {
        Value::Bitfield(v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Char(c)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(d: DateTime<Utc>) -> Self {
        Value::Datetime(d)
    }
}

impl From<Vec<RangeEntry>> for Value {
    fn from(r: Vec<RangeEntry>) -> Self {
        Value::Ranges(r)
    }
}
