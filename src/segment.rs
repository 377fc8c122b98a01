//! Encodable segments: one `Fields` group with a fixed wire order and a cached encoding.
//!
//! A segment remembers the last string it produced or decoded. `encode` returns that string
//! unchanged until a field is set (or the segment is explicitly marked dirty), at which point
//! the segment is validated and re-encoded.

use crate::base64url::Base64Variant;
use crate::codec::{BitStringEncoder, Result};
use crate::fields::Fields;
use crate::value::Value;

/// Cross-field check run before a dirty segment is re-encoded.
pub type SegmentValidator = fn(&Fields) -> Result<()>;

pub trait EncodableSegment: std::fmt::Debug {
    fn fields(&self) -> &Fields;

    fn field_value(&self, name: &str) -> Result<Option<&Value>> {
        self.fields().value(name)
    }

    /// Set a field and mark the segment dirty.
    fn set_field_value(&mut self, name: &str, value: Value) -> Result<()>;

    fn encode(&mut self) -> Result<String>;

    /// Decode eagerly. On failure, fields decoded before the failing one keep their new values.
    fn decode(&mut self, encoded: &str) -> Result<()>;

    fn set_is_dirty(&mut self, dirty: bool);

    fn is_dirty(&self) -> bool;

    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// Segment encoded as `base64url(bits of field_names in order)`.
#[derive(Debug, Clone)]
pub struct BitStringSegment {
    field_names: &'static [&'static str],
    fields: Fields,
    base64: Base64Variant,
    validator: Option<SegmentValidator>,
    encoded: Option<String>,
    dirty: bool,
}

impl BitStringSegment {
    pub fn new(field_names: &'static [&'static str], fields: Fields, base64: Base64Variant) -> Self {
        BitStringSegment { field_names, fields, base64, validator: None, encoded: None, dirty: true }
    }

    pub fn with_validator(mut self, validator: SegmentValidator) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn field_names(&self) -> &'static [&'static str] {
        self.field_names
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains(name)
    }

    /// Raw bits of the current field values, without base64 framing.
    pub fn encode_bits(&self) -> Result<String> {
        BitStringEncoder::encode(&self.fields, self.field_names)
    }
}

impl EncodableSegment for BitStringSegment {
    fn fields(&self) -> &Fields {
        &self.fields
    }

    fn set_field_value(&mut self, name: &str, value: Value) -> Result<()> {
        self.fields.get_mut(name)?.set_value(value)?;
        self.dirty = true;
        Ok(())
    }

    fn encode(&mut self) -> Result<String> {
        if !self.dirty {
            if let Some(s) = &self.encoded {
                return Ok(s.clone());
            }
        }
        self.validate()?;
        let bits = self.encode_bits()?;
        let s = self.base64.encoder().encode(&bits)?;
        self.encoded = Some(s.clone());
        self.dirty = false;
        Ok(s)
    }

    fn decode(&mut self, encoded: &str) -> Result<()> {
        self.encoded = None;
        self.dirty = true;
        let bits = self.base64.encoder().decode(encoded)?;
        BitStringEncoder::decode(&bits, self.field_names, &mut self.fields)?;
        self.encoded = Some(encoded.to_string());
        self.dirty = false;
        Ok(())
    }

    fn set_is_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn validate(&self) -> Result<()> {
        match self.validator {
            Some(v) => v(&self.fields),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::GppError;
    use crate::datatype::{DataType, FieldKind};

    const NAMES: &[&str] = &["Version", "OptOutSale"];

    fn segment() -> BitStringSegment {
        let mut f = Fields::new();
        f.insert("Version", DataType::with_value(FieldKind::FixedInteger { width: 2 }, Value::Int(1)));
        f.insert("OptOutSale", DataType::with_value(FieldKind::Boolean, Value::Bool(true)));
        BitStringSegment::new(NAMES, f, Base64Variant::Traditional)
    }

    #[test]
    fn encode_caches_until_dirty() {
        let mut s = segment();
        assert!(s.is_dirty());
        // 011 padded to 011000
        assert_eq!(s.encode().unwrap(), "Y");
        assert!(!s.is_dirty());
        s.set_field_value("OptOutSale", Value::Bool(false)).unwrap();
        assert!(s.is_dirty());
        assert_eq!(s.encode().unwrap(), "Q");
    }

    #[test]
    fn decoded_string_is_reused_verbatim() {
        let mut s = segment();
        // "p" = 101001: Version 2, OptOutSale true, and a stray padding bit.
        s.decode("p").unwrap();
        assert_eq!(s.encode().unwrap(), "p");
        s.set_is_dirty(true);
        assert_eq!(s.encode().unwrap(), "o");
    }

    #[test]
    fn validator_blocks_encode() {
        let mut s = segment().with_validator(|f| match f.value("OptOutSale")? {
            Some(Value::Bool(true)) => Err(GppError::Validation("no".to_string())),
            _ => Ok(()),
        });
        assert!(matches!(s.encode(), Err(GppError::Validation(_))));
    }
}
