//! Typed field values that know how to encode themselves.
//!
//! A [`DataType`] pairs a [`FieldKind`] (the wire shape) with an optional [`Value`] and an
//! optional validator. Bit-encodable kinds delegate to the primitive encoders; `Character` and
//! `UnencodableBoolean` hold values that never appear in a bit-string (string-framed sections,
//! model-only flags).

use crate::codec::{GppError, Result};
use crate::primitive::*;
use crate::value::Value;

/// Wire shape of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Boolean,
    FixedInteger { width: usize },
    FixedLong { width: usize },
    FixedBitfield { width: usize },
    /// Bitfield whose width is the current value of an earlier integer field.
    FlexibleBitfield { length_field: &'static str },
    FixedIntegerList { element_width: usize, len: usize },
    FixedString { chars: usize },
    Datetime,
    FixedIntegerRange,
    FibonacciIntegerRange,
    OptimizedFixedRange,
    OptimizedFibonacciRange,
    ArrayOfRanges { key_width: usize, type_width: usize },
    Character,
    UnencodableBoolean,
}

impl FieldKind {
    pub fn is_encodable(&self) -> bool {
        !matches!(self, FieldKind::Character | FieldKind::UnencodableBoolean)
    }

    fn accepts(&self, v: &Value) -> bool {
        matches!(
            (self, v),
            (FieldKind::Boolean | FieldKind::UnencodableBoolean, Value::Bool(_))
                | (FieldKind::FixedInteger { .. }, Value::Int(_))
                | (FieldKind::FixedLong { .. }, Value::Long(_))
                | (FieldKind::FixedBitfield { .. } | FieldKind::FlexibleBitfield { .. }, Value::Bitfield(_))
                | (FieldKind::FixedIntegerList { .. }, Value::IntList(_))
                | (FieldKind::FixedString { .. }, Value::Str(_))
                | (FieldKind::Datetime, Value::Datetime(_))
                | (
                    FieldKind::FixedIntegerRange
                        | FieldKind::FibonacciIntegerRange
                        | FieldKind::OptimizedFixedRange
                        | FieldKind::OptimizedFibonacciRange,
                    Value::IntList(_)
                )
                | (FieldKind::ArrayOfRanges { .. }, Value::Ranges(_))
                | (FieldKind::Character, Value::Char(_))
        )
    }
}

/// Semantic predicate run on every `set_value`.
pub type Validator = fn(&Value) -> bool;

#[derive(Debug, Clone)]
pub struct DataType {
    kind: FieldKind,
    value: Option<Value>,
    validator: Option<Validator>,
}

fn mismatch(kind: &FieldKind, v: &Value) -> GppError {
    GppError::Encoding(format!("{:?} cannot hold a {} value", kind, v.type_name()))
}

impl DataType {
    pub fn new(kind: FieldKind) -> Self {
        DataType { kind, value: None, validator: None }
    }

    pub fn with_value(kind: FieldKind, value: Value) -> Self {
        DataType { kind, value: Some(value), validator: None }
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Type-check and validate, then store.
    pub fn set_value(&mut self, value: Value) -> Result<()> {
        if !self.kind.accepts(&value) {
            return Err(GppError::Validation(format!(
                "{:?} cannot hold a {} value",
                self.kind,
                value.type_name()
            )));
        }
        if let Some(valid) = self.validator {
            if !valid(&value) {
                return Err(GppError::Validation(format!("invalid value {:?}", value)));
            }
        }
        self.value = Some(value);
        Ok(())
    }

    pub fn encode(&self) -> Result<String> {
        self.encode_with_len(None)
    }

    /// Encode; `len` is the resolved width of a flexible bitfield (its own length if `None`).
    pub fn encode_with_len(&self, len: Option<usize>) -> Result<String> {
        let v = self
            .value
            .as_ref()
            .ok_or_else(|| GppError::Encoding("no value".to_string()))?;
        if !self.kind.accepts(v) {
            return Err(mismatch(&self.kind, v));
        }
        match (&self.kind, v) {
            (FieldKind::Boolean, Value::Bool(b)) => Ok(BooleanEncoder::encode(*b)),
            (FieldKind::FixedInteger { width }, Value::Int(x)) => FixedIntegerEncoder::encode(*x, *width),
            (FieldKind::FixedLong { width }, Value::Long(x)) => FixedLongEncoder::encode(*x, *width),
            (FieldKind::FixedBitfield { width }, Value::Bitfield(b)) => FixedBitfieldEncoder::encode(b, *width),
            (FieldKind::FlexibleBitfield { .. }, Value::Bitfield(b)) => {
                FixedBitfieldEncoder::encode(b, len.unwrap_or(b.len()))
            }
            (FieldKind::FixedIntegerList { element_width, len }, Value::IntList(l)) => {
                FixedIntegerListEncoder::encode(l, *element_width, *len)
            }
            (FieldKind::FixedString { chars }, Value::Str(s)) => FixedStringEncoder::encode(s, *chars),
            (FieldKind::Datetime, Value::Datetime(d)) => DatetimeEncoder::encode(d),
            (FieldKind::FixedIntegerRange, Value::IntList(l)) => FixedIntegerRangeEncoder::encode(l),
            (FieldKind::FibonacciIntegerRange, Value::IntList(l)) => FibonacciIntegerRangeEncoder::encode(l),
            (FieldKind::OptimizedFixedRange, Value::IntList(l)) => OptimizedFixedRangeEncoder::encode(l),
            (FieldKind::OptimizedFibonacciRange, Value::IntList(l)) => {
                OptimizedFibonacciRangeEncoder::encode(l)
            }
            (FieldKind::ArrayOfRanges { key_width, type_width }, Value::Ranges(r)) => {
                ArrayOfRangesEncoder::encode(r, *key_width, *type_width)
            }
            (kind, v) => Err(GppError::Encoding(format!(
                "{:?} is not bit-encodable ({} value)",
                kind,
                v.type_name()
            ))),
        }
    }

    pub fn decode(&mut self, bits: &str) -> Result<()> {
        self.decode_with_len(bits, None)
    }

    /// Replace the value with the one encoded by `bits`, which must be exactly this field's
    /// fragment.
    pub fn decode_with_len(&mut self, bits: &str, len: Option<usize>) -> Result<()> {
        let fixed = |n: usize| -> Result<()> {
            if bits.len() != n {
                return Err(GppError::Decoding(format!(
                    "expected {} bits, got {} ('{}')",
                    n,
                    bits.len(),
                    bits
                )));
            }
            Ok(())
        };
        let value = match &self.kind {
            FieldKind::Boolean => Value::Bool(BooleanEncoder::decode(bits)?),
            FieldKind::FixedInteger { width } => {
                fixed(*width)?;
                Value::Int(FixedIntegerEncoder::decode(bits)?)
            }
            FieldKind::FixedLong { width } => {
                fixed(*width)?;
                Value::Long(FixedLongEncoder::decode(bits)?)
            }
            FieldKind::FixedBitfield { width } => {
                fixed(*width)?;
                Value::Bitfield(FixedBitfieldEncoder::decode(bits))
            }
            FieldKind::FlexibleBitfield { .. } => {
                if let Some(n) = len {
                    fixed(n)?;
                }
                Value::Bitfield(FixedBitfieldEncoder::decode(bits))
            }
            FieldKind::FixedIntegerList { element_width, len } => {
                Value::IntList(FixedIntegerListEncoder::decode(bits, *element_width, *len)?)
            }
            FieldKind::FixedString { chars } => {
                fixed(chars * 6)?;
                Value::Str(FixedStringEncoder::decode(bits)?)
            }
            FieldKind::Datetime => Value::Datetime(DatetimeEncoder::decode(bits)?),
            FieldKind::FixedIntegerRange => Value::IntList(FixedIntegerRangeEncoder::decode(bits)?),
            FieldKind::FibonacciIntegerRange => Value::IntList(FibonacciIntegerRangeEncoder::decode(bits)?),
            FieldKind::OptimizedFixedRange => Value::IntList(OptimizedFixedRangeEncoder::decode(bits)?),
            FieldKind::OptimizedFibonacciRange => {
                Value::IntList(OptimizedFibonacciRangeEncoder::decode(bits)?)
            }
            FieldKind::ArrayOfRanges { key_width, type_width } => {
                Value::Ranges(ArrayOfRangesEncoder::decode(bits, *key_width, *type_width)?)
            }
            FieldKind::Character | FieldKind::UnencodableBoolean => {
                return Err(GppError::Decoding(format!("{:?} is not bit-encodable", self.kind)))
            }
        };
        self.value = Some(value);
        Ok(())
    }

    /// The fragment of `bits` this field occupies when it starts at `from`.
    pub fn substring<'a>(&self, bits: &'a str, from: usize, len: Option<usize>) -> Result<&'a str> {
        let end = match &self.kind {
            FieldKind::Boolean => from + 1,
            FieldKind::FixedInteger { width }
            | FieldKind::FixedLong { width }
            | FieldKind::FixedBitfield { width } => from + width,
            FieldKind::FlexibleBitfield { length_field } => {
                let n = len.ok_or_else(|| {
                    GppError::Decoding(format!("unresolved length field {}", length_field))
                })?;
                from + n
            }
            FieldKind::FixedIntegerList { element_width, len } => from + element_width * len,
            FieldKind::FixedString { chars } => from + chars * 6,
            FieldKind::Datetime => from + DatetimeEncoder::WIDTH,
            FieldKind::FixedIntegerRange => FixedIntegerRangeEncoder::read(bits, from)?.1,
            FieldKind::FibonacciIntegerRange => FibonacciIntegerRangeEncoder::read(bits, from)?.1,
            FieldKind::OptimizedFixedRange => OptimizedFixedRangeEncoder::read(bits, from)?.1,
            FieldKind::OptimizedFibonacciRange => OptimizedFibonacciRangeEncoder::read(bits, from)?.1,
            FieldKind::ArrayOfRanges { key_width, type_width } => {
                ArrayOfRangesEncoder::read(bits, from, *key_width, *type_width)?.1
            }
            FieldKind::Character | FieldKind::UnencodableBoolean => {
                return Err(GppError::Decoding(format!("{:?} is not bit-encodable", self.kind)))
            }
        };
        if end > bits.len() {
            return Err(GppError::Decoding(format!(
                "bit string too short: need {} bits at offset {}, have {}",
                end - from,
                from,
                bits.len()
            )));
        }
        Ok(&bits[from..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_value_rejects_wrong_type() {
        let mut d = DataType::new(FieldKind::FixedInteger { width: 6 });
        let err = d.set_value(Value::Bool(true)).unwrap_err();
        assert!(matches!(err, GppError::Validation(_)));
        assert!(!d.has_value());
    }

    #[test]
    fn validator_runs_on_set() {
        let mut d = DataType::with_value(FieldKind::FixedInteger { width: 2 }, Value::Int(0))
            .with_validator(|v| matches!(v.as_u32(), Some(0..=2)));
        assert!(d.set_value(Value::Int(2)).is_ok());
        assert!(d.set_value(Value::Int(3)).is_err());
        assert_eq!(d.value(), Some(&Value::Int(2)));
    }

    #[test]
    fn encode_without_value_fails() {
        let d = DataType::new(FieldKind::Boolean);
        assert!(matches!(d.encode(), Err(GppError::Encoding(_))));
    }

    #[test]
    fn substring_of_variable_range() {
        let d = DataType::with_value(FieldKind::FixedIntegerRange, Value::IntList(vec![3]));
        let bits = format!("xx{}111", d.encode().unwrap());
        let frag = d.substring(&bits, 2, None).unwrap();
        assert_eq!(frag.len(), 12 + 17);
    }

    #[test]
    fn unencodable_kinds_refuse_bits() {
        let d = DataType::with_value(FieldKind::Character, Value::Char('Y'));
        assert!(d.encode().is_err());
        assert!(!d.kind().is_encodable());
    }
}
