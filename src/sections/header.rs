//! GPP header: lists the ids of the sections that follow it.

use crate::base64url::Base64Variant;
use crate::codec::{GppError, Result};
use crate::datatype::{DataType, FieldKind};
use crate::fields::Fields;
use crate::section::{int_value, EncodableSection};
use crate::segment::{BitStringSegment, EncodableSegment};
use crate::value::Value;

pub const HEADER_ID: &str = "Id";
pub const HEADER_VERSION: &str = "Version";
pub const SECTION_IDS: &str = "SectionIds";

const FIELD_NAMES: &[&str] = &[HEADER_ID, HEADER_VERSION, SECTION_IDS];

#[derive(Debug, Clone)]
pub struct HeaderV1 {
    segment: BitStringSegment,
}

impl HeaderV1 {
    pub const ID: u32 = 3;
    pub const NAME: &'static str = "header";
    pub const VERSION: u32 = 1;

    pub fn new() -> Self {
        let mut f = Fields::new();
        f.insert(HEADER_ID, DataType::with_value(FieldKind::FixedInteger { width: 6 }, Value::Int(Self::ID)));
        f.insert(
            HEADER_VERSION,
            DataType::with_value(FieldKind::FixedInteger { width: 6 }, Value::Int(Self::VERSION)),
        );
        f.insert(SECTION_IDS, DataType::with_value(FieldKind::FibonacciIntegerRange, Value::IntList(vec![])));
        HeaderV1 { segment: BitStringSegment::new(FIELD_NAMES, f, Base64Variant::Compressed) }
    }

    pub fn section_ids(&self) -> Vec<u32> {
        self.segment
            .field_value(SECTION_IDS)
            .ok()
            .flatten()
            .and_then(Value::as_list)
            .map(<[u32]>::to_vec)
            .unwrap_or_default()
    }

    /// Ids are written ascending regardless of input order.
    pub fn set_section_ids(&mut self, ids: &[u32]) -> Result<()> {
        let mut ids = ids.to_vec();
        ids.sort_unstable();
        ids.dedup();
        self.segment.set_field_value(SECTION_IDS, Value::IntList(ids))
    }
}

impl Default for HeaderV1 {
    fn default() -> Self {
        Self::new()
    }
}

impl EncodableSection for HeaderV1 {
    fn id(&self) -> u32 {
        Self::ID
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn version(&self) -> u32 {
        Self::VERSION
    }

    fn field_names(&self) -> Vec<&str> {
        FIELD_NAMES.to_vec()
    }

    fn get_field_value(&self, name: &str) -> Result<Option<&Value>> {
        self.segment.field_value(name)
    }

    fn set_field_value(&mut self, name: &str, value: Value) -> Result<()> {
        self.segment.set_field_value(name, value)
    }

    fn encode(&mut self) -> Result<String> {
        self.segment.encode()
    }

    fn decode(&mut self, encoded: &str) -> Result<()> {
        self.segment.decode(encoded)?;
        let id = int_value(&self.segment, HEADER_ID);
        let version = int_value(&self.segment, HEADER_VERSION);
        if id != Some(Self::ID) || version != Some(Self::VERSION) {
            return Err(GppError::Decoding(format!(
                "'{}' is not a GPP header: id {:?}, version {:?}",
                encoded, id, version
            )));
        }
        Ok(())
    }

    fn set_is_dirty(&mut self, dirty: bool) {
        self.segment.set_is_dirty(dirty);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_for_tcf_eu() {
        let mut h = HeaderV1::new();
        h.set_section_ids(&[2]).unwrap();
        assert_eq!(h.encode().unwrap(), "DBABMA");
    }

    #[test]
    fn canonical_headers() {
        let mut h = HeaderV1::new();
        h.set_section_ids(&[6]).unwrap();
        assert_eq!(h.encode().unwrap(), "DBABTA");
        h.set_section_ids(&[7]).unwrap();
        assert_eq!(h.encode().unwrap(), "DBABLA");
    }

    #[test]
    fn rejects_non_header() {
        let mut h = HeaderV1::new();
        h.set_field_value(HEADER_ID, Value::Int(2)).unwrap();
        let s = h.encode().unwrap();
        let mut back = HeaderV1::new();
        assert!(matches!(back.decode(&s), Err(GppError::Decoding(_))));
        // A TC string in header position.
        assert!(back.decode("CPXxRfAPXxRfAAfKABENB-CgAAAAAAAAAAYgAAAAAAAA").is_err());
    }

    #[test]
    fn decode_lists_sections() {
        let mut h = HeaderV1::new();
        h.set_section_ids(&[7, 2, 6]).unwrap();
        let s = h.encode().unwrap();
        let mut back = HeaderV1::new();
        back.decode(&s).unwrap();
        assert_eq!(back.section_ids(), vec![2, 6, 7]);
    }

    #[test]
    fn six_bit_aligned_header_also_decodes() {
        let mut h = HeaderV1::new();
        h.decode("DBABM").unwrap();
        assert_eq!(h.section_ids(), vec![2]);
    }
}
