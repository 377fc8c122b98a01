//! TCF EU v2 consent string.
//!
//! ```text
//! core[.vendorsDisclosed][.vendorsAllowed][.publisherPurposes]
//! ```
//!
//! The core segment has no type prefix. Every other segment starts with a 3-bit segment type
//! (1 disclosed, 2 allowed, 3 publisher purposes), which is how decoding tells them apart.
//! All segments are byte-aligned before base64url packing.

use crate::base64url::{Base64UrlEncoder, Base64Variant, CompressedBase64UrlEncoder};
use crate::codec::{GppError, Result};
use crate::datatype::{DataType, FieldKind};
use crate::fields::Fields;
use crate::gvl::Gvl;
use crate::primitive::FixedIntegerEncoder;
use crate::section::{segment_field_names, segment_of, EncodableSection};
use crate::segment::{BitStringSegment, EncodableSegment};
use crate::value::Value;
use chrono::Utc;

pub const VERSION: &str = "Version";
pub const CREATED: &str = "Created";
pub const LAST_UPDATED: &str = "LastUpdated";
pub const CMP_ID: &str = "CmpId";
pub const CMP_VERSION: &str = "CmpVersion";
pub const CONSENT_SCREEN: &str = "ConsentScreen";
pub const CONSENT_LANGUAGE: &str = "ConsentLanguage";
pub const VENDOR_LIST_VERSION: &str = "VendorListVersion";
pub const POLICY_VERSION: &str = "PolicyVersion";
pub const IS_SERVICE_SPECIFIC: &str = "IsServiceSpecific";
pub const USE_NON_STANDARD_STACKS: &str = "UseNonStandardStacks";
pub const SPECIAL_FEATURE_OPTINS: &str = "SpecialFeatureOptins";
pub const PURPOSE_CONSENTS: &str = "PurposeConsents";
pub const PURPOSE_LEGITIMATE_INTERESTS: &str = "PurposeLegitimateInterests";
pub const PURPOSE_ONE_TREATMENT: &str = "PurposeOneTreatment";
pub const PUBLISHER_COUNTRY_CODE: &str = "PublisherCountryCode";
pub const VENDOR_CONSENTS: &str = "VendorConsents";
pub const VENDOR_LEGITIMATE_INTERESTS: &str = "VendorLegitimateInterests";
pub const PUBLISHER_RESTRICTIONS: &str = "PublisherRestrictions";

pub const VENDORS_DISCLOSED_SEGMENT_TYPE: &str = "VendorsDisclosedSegmentType";
pub const VENDORS_DISCLOSED: &str = "VendorsDisclosed";
pub const VENDORS_ALLOWED_SEGMENT_TYPE: &str = "VendorsAllowedSegmentType";
pub const VENDORS_ALLOWED: &str = "VendorsAllowed";

pub const PUBLISHER_PURPOSES_SEGMENT_TYPE: &str = "PublisherPurposesSegmentType";
pub const PUBLISHER_CONSENTS: &str = "PublisherConsents";
pub const PUBLISHER_LEGITIMATE_INTERESTS: &str = "PublisherLegitimateInterests";
pub const NUM_CUSTOM_PURPOSES: &str = "NumCustomPurposes";
pub const PUBLISHER_CUSTOM_CONSENTS: &str = "PublisherCustomConsents";
pub const PUBLISHER_CUSTOM_LEGITIMATE_INTERESTS: &str = "PublisherCustomLegitimateInterests";

const CORE_FIELDS: &[&str] = &[
    VERSION,
    CREATED,
    LAST_UPDATED,
    CMP_ID,
    CMP_VERSION,
    CONSENT_SCREEN,
    CONSENT_LANGUAGE,
    VENDOR_LIST_VERSION,
    POLICY_VERSION,
    IS_SERVICE_SPECIFIC,
    USE_NON_STANDARD_STACKS,
    SPECIAL_FEATURE_OPTINS,
    PURPOSE_CONSENTS,
    PURPOSE_LEGITIMATE_INTERESTS,
    PURPOSE_ONE_TREATMENT,
    PUBLISHER_COUNTRY_CODE,
    VENDOR_CONSENTS,
    VENDOR_LEGITIMATE_INTERESTS,
    PUBLISHER_RESTRICTIONS,
];

const DISCLOSED_FIELDS: &[&str] = &[VENDORS_DISCLOSED_SEGMENT_TYPE, VENDORS_DISCLOSED];
const ALLOWED_FIELDS: &[&str] = &[VENDORS_ALLOWED_SEGMENT_TYPE, VENDORS_ALLOWED];
const PUBLISHER_FIELDS: &[&str] = &[
    PUBLISHER_PURPOSES_SEGMENT_TYPE,
    PUBLISHER_CONSENTS,
    PUBLISHER_LEGITIMATE_INTERESTS,
    NUM_CUSTOM_PURPOSES,
    PUBLISHER_CUSTOM_CONSENTS,
    PUBLISHER_CUSTOM_LEGITIMATE_INTERESTS,
];

// Segment index; for the optional segments it equals the wire segment type.
const CORE: usize = 0;
const DISCLOSED: usize = 1;
const ALLOWED: usize = 2;
const PUBLISHER: usize = 3;

fn int(width: usize, v: u32) -> DataType {
    DataType::with_value(FieldKind::FixedInteger { width }, Value::Int(v))
}

fn flag(v: bool) -> DataType {
    DataType::with_value(FieldKind::Boolean, Value::Bool(v))
}

fn bitfield(width: usize) -> DataType {
    DataType::with_value(FieldKind::FixedBitfield { width }, Value::Bitfield(vec![false; width]))
}

fn ids(kind: FieldKind) -> DataType {
    DataType::with_value(kind, Value::IntList(vec![]))
}

fn country(v: &str) -> DataType {
    DataType::with_value(FieldKind::FixedString { chars: 2 }, Value::Str(v.to_string()))
        .with_validator(|v| v.as_str().is_some_and(|s| s.len() == 2 && s.bytes().all(|b| b.is_ascii_uppercase())))
}

fn core_segment() -> BitStringSegment {
    let now = Utc::now();
    let mut f = Fields::new();
    f.insert(VERSION, int(6, TcfEuV2::VERSION));
    f.insert(CREATED, DataType::with_value(FieldKind::Datetime, Value::Datetime(now)));
    f.insert(LAST_UPDATED, DataType::with_value(FieldKind::Datetime, Value::Datetime(now)));
    f.insert(CMP_ID, int(12, 0));
    f.insert(CMP_VERSION, int(12, 0));
    f.insert(CONSENT_SCREEN, int(6, 0));
    f.insert(CONSENT_LANGUAGE, country("EN"));
    f.insert(VENDOR_LIST_VERSION, int(12, 0));
    f.insert(POLICY_VERSION, int(6, 4));
    f.insert(IS_SERVICE_SPECIFIC, flag(false));
    f.insert(USE_NON_STANDARD_STACKS, flag(false));
    f.insert(SPECIAL_FEATURE_OPTINS, bitfield(12));
    f.insert(PURPOSE_CONSENTS, bitfield(24));
    f.insert(PURPOSE_LEGITIMATE_INTERESTS, bitfield(24));
    f.insert(PURPOSE_ONE_TREATMENT, flag(false));
    f.insert(PUBLISHER_COUNTRY_CODE, country("AA"));
    f.insert(VENDOR_CONSENTS, ids(FieldKind::OptimizedFixedRange));
    f.insert(VENDOR_LEGITIMATE_INTERESTS, ids(FieldKind::OptimizedFixedRange));
    f.insert(
        PUBLISHER_RESTRICTIONS,
        DataType::with_value(FieldKind::ArrayOfRanges { key_width: 6, type_width: 2 }, Value::Ranges(vec![])),
    );
    BitStringSegment::new(CORE_FIELDS, f, Base64Variant::Compressed)
}

fn vendor_segment(names: &'static [&'static str], segment_type: u32) -> BitStringSegment {
    let mut f = Fields::new();
    f.insert(names[0], int(3, segment_type));
    f.insert(names[1], ids(FieldKind::OptimizedFixedRange));
    BitStringSegment::new(names, f, Base64Variant::Compressed)
}

fn publisher_segment() -> BitStringSegment {
    let mut f = Fields::new();
    f.insert(PUBLISHER_PURPOSES_SEGMENT_TYPE, int(3, PUBLISHER as u32));
    f.insert(PUBLISHER_CONSENTS, bitfield(24));
    f.insert(PUBLISHER_LEGITIMATE_INTERESTS, bitfield(24));
    f.insert(NUM_CUSTOM_PURPOSES, int(6, 0));
    let custom = |v: Vec<bool>| {
        DataType::with_value(FieldKind::FlexibleBitfield { length_field: NUM_CUSTOM_PURPOSES }, Value::Bitfield(v))
    };
    f.insert(PUBLISHER_CUSTOM_CONSENTS, custom(vec![]));
    f.insert(PUBLISHER_CUSTOM_LEGITIMATE_INTERESTS, custom(vec![]));
    BitStringSegment::new(PUBLISHER_FIELDS, f, Base64Variant::Compressed)
}

#[derive(Debug, Clone)]
pub struct TcfEuV2 {
    segments: Vec<BitStringSegment>,
    /// Whether each segment is emitted; the core always is.
    included: [bool; 4],
}

impl TcfEuV2 {
    pub const ID: u32 = 2;
    pub const NAME: &'static str = "tcfeuv2";
    pub const VERSION: u32 = 2;

    pub fn new() -> Self {
        TcfEuV2 {
            segments: vec![
                core_segment(),
                vendor_segment(DISCLOSED_FIELDS, DISCLOSED as u32),
                vendor_segment(ALLOWED_FIELDS, ALLOWED as u32),
                publisher_segment(),
            ],
            included: [true, false, false, false],
        }
    }

    /// Copy the vendor list and policy versions from `gvl`.
    pub fn apply_gvl(&mut self, gvl: &Gvl) -> Result<()> {
        self.set_field_value(VENDOR_LIST_VERSION, Value::Int(gvl.vendor_list_version))?;
        self.set_field_value(POLICY_VERSION, Value::Int(gvl.tcf_policy_version))
    }

    /// Fail if any vendor id in a consent, legitimate interest or disclosure list is absent from `gvl`.
    pub fn check_vendors(&self, gvl: &Gvl) -> Result<()> {
        for name in [VENDOR_CONSENTS, VENDOR_LEGITIMATE_INTERESTS, VENDORS_DISCLOSED, VENDORS_ALLOWED] {
            let listed = self.get_field_value(name)?.and_then(Value::as_list).unwrap_or(&[]);
            let unknown = gvl.unknown_vendor_ids(listed);
            if !unknown.is_empty() {
                return Err(GppError::Gvl(format!(
                    "{} lists vendors missing from vendor list {}: {:?}",
                    name, gvl.vendor_list_version, unknown
                )));
            }
        }
        Ok(())
    }

    fn sync_num_custom_purposes(&mut self) -> Result<()> {
        let seg = &self.segments[PUBLISHER];
        let len_of = |name| {
            seg.field_value(name)
                .ok()
                .flatten()
                .and_then(Value::as_bitfield)
                .map_or(0, <[bool]>::len)
        };
        let n = len_of(PUBLISHER_CUSTOM_CONSENTS).max(len_of(PUBLISHER_CUSTOM_LEGITIMATE_INTERESTS));
        self.segments[PUBLISHER].set_field_value(NUM_CUSTOM_PURPOSES, Value::Int(n as u32))
    }
}

impl Default for TcfEuV2 {
    fn default() -> Self {
        Self::new()
    }
}

impl EncodableSection for TcfEuV2 {
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
        segment_field_names(&self.segments)
    }

    fn get_field_value(&self, name: &str) -> Result<Option<&Value>> {
        let i = segment_of(&self.segments, name)?;
        self.segments[i].field_value(name)
    }

    fn set_field_value(&mut self, name: &str, value: Value) -> Result<()> {
        if name == NUM_CUSTOM_PURPOSES {
            return Err(GppError::Validation(format!(
                "{} follows the custom purpose bitfields and cannot be set directly",
                NUM_CUSTOM_PURPOSES
            )));
        }
        let i = segment_of(&self.segments, name)?;
        self.segments[i].set_field_value(name, value)?;
        self.included[i] = true;
        if name == PUBLISHER_CUSTOM_CONSENTS || name == PUBLISHER_CUSTOM_LEGITIMATE_INTERESTS {
            self.sync_num_custom_purposes()?;
        }
        Ok(())
    }

    fn encode(&mut self) -> Result<String> {
        let mut parts = Vec::new();
        for (i, seg) in self.segments.iter_mut().enumerate() {
            if self.included[i] {
                parts.push(seg.encode()?);
            }
        }
        Ok(parts.join("."))
    }

    fn decode(&mut self, encoded: &str) -> Result<()> {
        self.included = [true, false, false, false];
        self.segments[DISCLOSED] = vendor_segment(DISCLOSED_FIELDS, DISCLOSED as u32);
        self.segments[ALLOWED] = vendor_segment(ALLOWED_FIELDS, ALLOWED as u32);
        self.segments[PUBLISHER] = publisher_segment();
        let mut parts = encoded.split('.');
        let core = parts.next().unwrap_or("");
        self.segments[CORE].decode(core)?;
        for part in parts {
            let bits = CompressedBase64UrlEncoder.decode(part)?;
            let segment_type = match bits.get(..3) {
                Some(prefix) => FixedIntegerEncoder::decode(prefix)? as usize,
                None => return Err(GppError::Decoding(format!("TcfEuV2 segment '{}' too short", part))),
            };
            if !(DISCLOSED..=PUBLISHER).contains(&segment_type) {
                return Err(GppError::Decoding(format!(
                    "Unable to decode TcfEuV2 segment type {} in '{}'",
                    segment_type, part
                )));
            }
            self.segments[segment_type].decode(part)?;
            self.included[segment_type] = true;
        }
        Ok(())
    }

    fn set_is_dirty(&mut self, dirty: bool) {
        for seg in &mut self.segments {
            seg.set_is_dirty(dirty);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn optional_segments_follow_writes() {
        let mut t = TcfEuV2::new();
        let core_only = t.encode().unwrap();
        assert!(!core_only.contains('.'));
        t.set_field_value(VENDORS_DISCLOSED, Value::IntList(vec![1, 2, 3])).unwrap();
        let s = t.encode().unwrap();
        assert_eq!(s.split('.').count(), 2);
    }

    #[test]
    fn custom_purposes_set_their_count() {
        let mut t = TcfEuV2::new();
        t.set_field_value(PUBLISHER_CUSTOM_CONSENTS, Value::Bitfield(vec![true, false, true])).unwrap();
        assert_eq!(t.get_field_value(NUM_CUSTOM_PURPOSES).unwrap(), Some(&Value::Int(3)));
        let s = t.encode().unwrap();
        let mut back = TcfEuV2::new();
        back.decode(&s).unwrap();
        assert_eq!(
            back.get_field_value(PUBLISHER_CUSTOM_CONSENTS).unwrap(),
            Some(&Value::Bitfield(vec![true, false, true]))
        );
        assert_eq!(
            back.get_field_value(PUBLISHER_CUSTOM_LEGITIMATE_INTERESTS).unwrap(),
            Some(&Value::Bitfield(vec![false, false, false]))
        );
    }

    #[test]
    fn datetimes_keep_decisecond_precision() {
        let mut t = TcfEuV2::new();
        let when = Utc.with_ymd_and_hms(2022, 5, 1, 12, 0, 0).unwrap();
        t.set_field_value(CREATED, Value::Datetime(when)).unwrap();
        let s = t.encode().unwrap();
        let mut back = TcfEuV2::new();
        back.decode(&s).unwrap();
        assert_eq!(back.get_field_value(CREATED).unwrap(), Some(&Value::Datetime(when)));
    }

    #[test]
    fn unknown_segment_type_is_decoding_error() {
        let mut t = TcfEuV2::new();
        let core = t.encode().unwrap();
        // "4" = 111000: segment type 7.
        let err = t.decode(&format!("{}.4AAA", core)).unwrap_err();
        assert!(matches!(err, GppError::Decoding(_)));
    }

    #[test]
    fn redecode_drops_previous_optional_segments() {
        let mut t = TcfEuV2::new();
        t.set_field_value(VENDORS_ALLOWED, Value::IntList(vec![1, 2])).unwrap();
        t.set_field_value(PUBLISHER_CUSTOM_CONSENTS, Value::Bitfield(vec![true])).unwrap();
        let full = t.encode().unwrap();
        let core = full.split('.').next().unwrap().to_string();

        let mut back = TcfEuV2::new();
        back.decode(&full).unwrap();
        assert_eq!(back.get_field_value(VENDORS_ALLOWED).unwrap(), Some(&Value::IntList(vec![1, 2])));
        back.decode(&core).unwrap();
        assert_eq!(back.get_field_value(VENDORS_ALLOWED).unwrap(), Some(&Value::IntList(vec![])));
        assert_eq!(back.get_field_value(NUM_CUSTOM_PURPOSES).unwrap(), Some(&Value::Int(0)));
        assert_eq!(back.to_obj()[VENDORS_ALLOWED], serde_json::json!([]));
        assert_eq!(back.encode().unwrap(), core);
    }

    #[test]
    fn custom_purpose_count_is_derived() {
        let mut t = TcfEuV2::new();
        let err = t.set_field_value(NUM_CUSTOM_PURPOSES, Value::Int(5)).unwrap_err();
        assert!(matches!(err, GppError::Validation(_)));
        assert_eq!(t.get_field_value(NUM_CUSTOM_PURPOSES).unwrap(), Some(&Value::Int(0)));
    }

    /// A TC string produced by an external CMP.
    #[test]
    fn decodes_external_tc_string() {
        let wire = "CPXxRfAPXxRfAAfKABENB-CgAAAAAAAAAAYgAAAAAAAA";
        let mut t = TcfEuV2::new();
        t.decode(wire).unwrap();
        assert_eq!(t.get_field_value(VERSION).unwrap(), Some(&Value::Int(2)));
        assert_eq!(t.get_field_value(PUBLISHER_COUNTRY_CODE).unwrap(), Some(&Value::Str("DE".into())));
        assert_eq!(t.get_field_value(VENDOR_CONSENTS).unwrap(), Some(&Value::IntList(vec![])));
        assert_eq!(t.encode().unwrap(), wire);
        t.set_is_dirty(true);
        assert_eq!(t.encode().unwrap(), wire);
    }

    #[test]
    fn country_codes_are_validated() {
        let mut t = TcfEuV2::new();
        assert!(t.set_field_value(PUBLISHER_COUNTRY_CODE, Value::Str("DE".into())).is_ok());
        assert!(matches!(
            t.set_field_value(CONSENT_LANGUAGE, Value::Str("english".into())),
            Err(GppError::Validation(_))
        ));
    }
}
