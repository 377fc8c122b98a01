//! Section-level bit-string orchestration and the crate error type.
//!
//! [`BitStringEncoder`] walks an ordered list of field names against a [`Fields`] container.
//! The list, not the container, decides the wire layout: each named field encodes itself and
//! the fragments are concatenated in list order. Decoding slices the input in the same order,
//! asking each field how many bits it consumes at the current cursor.

use crate::datatype::FieldKind;
use crate::fields::Fields;

/// Failure category, for callers that branch on kind rather than message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Encoding,
    Decoding,
    Validation,
    InvalidField,
    Gvl,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GppError {
    /// A value cannot be serialized (missing value, overflow, wrong arity).
    #[error("Encoding: {0}")]
    Encoding(String),
    /// Wire input cannot be parsed into the declared shape.
    #[error("Decoding: {0}")]
    Decoding(String),
    /// A value fails a semantic predicate.
    #[error("Validation: {0}")]
    Validation(String),
    /// A field or section name does not exist.
    #[error("Invalid field: {0}")]
    InvalidField(String),
    /// Vendor list reference data cannot be loaded or is malformed.
    #[error("GVL: {0}")]
    Gvl(String),
}

pub type Result<T> = std::result::Result<T, GppError>;

impl GppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GppError::Encoding(_) => ErrorKind::Encoding,
            GppError::Decoding(_) => ErrorKind::Decoding,
            GppError::Validation(_) => ErrorKind::Validation,
            GppError::InvalidField(_) => ErrorKind::InvalidField,
            GppError::Gvl(_) => ErrorKind::Gvl,
        }
    }

    /// Prefix the message with the field it happened in, keeping the kind.
    pub fn in_field(self, name: &str) -> Self {
        match self {
            GppError::Encoding(m) => GppError::Encoding(format!("field {}: {}", name, m)),
            GppError::Decoding(m) => GppError::Decoding(format!("field {}: {}", name, m)),
            GppError::Validation(m) => GppError::Validation(format!("field {}: {}", name, m)),
            other => other,
        }
    }
}

/// Encodes/decodes an ordered list of named fields to/from a raw bit-string.
pub struct BitStringEncoder;

impl BitStringEncoder {
    /// Concatenate the encodings of `field_names`, in that order.
    ///
    /// A name missing from `fields` is an [`GppError::InvalidField`]; a field without a value is
    /// an [`GppError::Encoding`].
    pub fn encode(fields: &Fields, field_names: &[&str]) -> Result<String> {
        let mut out = String::new();
        for &name in field_names {
            let field = fields.get(name)?;
            if !field.has_value() {
                return Err(GppError::Encoding(format!("field {} has no value", name)));
            }
            let len = Self::resolve_len(fields, field.kind(), name)?;
            let bits = field.encode_with_len(len).map_err(|e| e.in_field(name))?;
            out.push_str(&bits);
        }
        Ok(out)
    }

    /// Decode `bit_string` into `fields`, walking `field_names` in order.
    ///
    /// Decoding is not transactional: if field N fails, fields before N keep their newly
    /// decoded values. Bits left over after the last field are ignored.
    pub fn decode(bit_string: &str, field_names: &[&str], fields: &mut Fields) -> Result<()> {
        if !bit_string.is_ascii() {
            return Err(GppError::Decoding(format!("Undecodable bit string '{}'", bit_string)));
        }
        let mut cursor = 0usize;
        for &name in field_names {
            let kind = fields.get(name)?.kind().clone();
            let len = Self::resolve_len(fields, &kind, name)?;
            let field = fields.get_mut(name)?;
            let fragment = field
                .substring(bit_string, cursor, len)
                .map_err(|e| e.in_field(name))?;
            field.decode_with_len(fragment, len).map_err(|e| e.in_field(name))?;
            cursor += fragment.len();
        }
        Ok(())
    }

    /// Width of a flexible bitfield, read from the integer field it names.
    fn resolve_len(fields: &Fields, kind: &FieldKind, name: &str) -> Result<Option<usize>> {
        match kind {
            FieldKind::FlexibleBitfield { length_field } => {
                let n = fields
                    .get(length_field)?
                    .value()
                    .and_then(|v| v.as_u32())
                    .ok_or_else(|| {
                        GppError::Decoding(format!(
                            "field {}: length field {} has no integer value",
                            name, length_field
                        ))
                    })?;
                Ok(Some(n as usize))
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatype::DataType;
    use crate::value::Value;

    fn two_field() -> Fields {
        let mut f = Fields::new();
        f.insert("Version", DataType::with_value(FieldKind::FixedInteger { width: 2 }, Value::Int(1)));
        f.insert("OptOutSale", DataType::with_value(FieldKind::Boolean, Value::Bool(true)));
        f
    }

    #[test]
    fn encode_walks_given_order() {
        let f = two_field();
        assert_eq!(BitStringEncoder::encode(&f, &["Version", "OptOutSale"]).unwrap(), "011");
        assert_eq!(BitStringEncoder::encode(&f, &["OptOutSale", "Version"]).unwrap(), "101");
    }

    #[test]
    fn missing_value_is_encoding_error() {
        let mut f = Fields::new();
        f.insert("Gpc", DataType::new(FieldKind::Boolean));
        let err = BitStringEncoder::encode(&f, &["Gpc"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Encoding);
        assert!(err.to_string().contains("Gpc"));
    }

    #[test]
    fn short_input_is_decoding_error() {
        let mut f = two_field();
        let err = BitStringEncoder::decode("01", &["Version", "OptOutSale"], &mut f).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decoding);
    }

    #[test]
    fn partial_decode_keeps_earlier_fields() {
        let mut f = two_field();
        let _ = BitStringEncoder::decode("10", &["Version", "OptOutSale"], &mut f);
        assert_eq!(f.get("Version").unwrap().value(), Some(&Value::Int(2)));
    }

    #[test]
    fn flexible_bitfield_uses_length_field() {
        let mut f = Fields::new();
        f.insert("Num", DataType::with_value(FieldKind::FixedInteger { width: 6 }, Value::Int(3)));
        f.insert(
            "Custom",
            DataType::with_value(
                FieldKind::FlexibleBitfield { length_field: "Num" },
                Value::Bitfield(vec![true]),
            ),
        );
        let bits = BitStringEncoder::encode(&f, &["Num", "Custom"]).unwrap();
        assert_eq!(bits, "000011100");

        let mut g = f.clone();
        BitStringEncoder::decode("000010110", &["Num", "Custom"], &mut g).unwrap();
        assert_eq!(g.get("Num").unwrap().value(), Some(&Value::Int(2)));
        assert_eq!(g.get("Custom").unwrap().value(), Some(&Value::Bitfield(vec![true, true])));
    }
}
