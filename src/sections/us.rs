//! US state and national sections (MSPA family).
//!
//! Each section is a core segment followed by an optional GPC sub-segment:
//!
//! ```text
//! core[.gpc]
//! ```
//!
//! Sections differ only in which notice/opt-out fields the core carries and how long the
//! sensitive-data list is, so they share one implementation driven by a [`UsProfile`].
//! Two-bit fields use 0 = not applicable, 1 = yes, 2 = no.

use crate::base64url::Base64Variant;
use crate::codec::{GppError, Result};
use crate::datatype::{DataType, FieldKind};
use crate::fields::Fields;
use crate::section::{int_value, segment_field_names, segment_of, EncodableSection};
use crate::segment::{BitStringSegment, EncodableSegment};
use crate::value::Value;

pub const VERSION: &str = "Version";
pub const SHARING_NOTICE: &str = "SharingNotice";
pub const SALE_OPT_OUT_NOTICE: &str = "SaleOptOutNotice";
pub const SHARING_OPT_OUT_NOTICE: &str = "SharingOptOutNotice";
pub const TARGETED_ADVERTISING_OPT_OUT_NOTICE: &str = "TargetedAdvertisingOptOutNotice";
pub const SENSITIVE_DATA_PROCESSING_OPT_OUT_NOTICE: &str = "SensitiveDataProcessingOptOutNotice";
pub const SENSITIVE_DATA_LIMIT_USE_NOTICE: &str = "SensitiveDataLimitUseNotice";
pub const SALE_OPT_OUT: &str = "SaleOptOut";
pub const SHARING_OPT_OUT: &str = "SharingOptOut";
pub const TARGETED_ADVERTISING_OPT_OUT: &str = "TargetedAdvertisingOptOut";
pub const SENSITIVE_DATA_PROCESSING: &str = "SensitiveDataProcessing";
pub const KNOWN_CHILD_SENSITIVE_DATA_CONSENTS: &str = "KnownChildSensitiveDataConsents";
pub const PERSONAL_DATA_CONSENTS: &str = "PersonalDataConsents";
pub const MSPA_COVERED_TRANSACTION: &str = "MspaCoveredTransaction";
pub const MSPA_OPT_OUT_OPTION_MODE: &str = "MspaOptOutOptionMode";
pub const MSPA_SERVICE_PROVIDER_MODE: &str = "MspaServiceProviderMode";

pub const GPC_SEGMENT_TYPE: &str = "GpcSegmentType";
pub const GPC: &str = "Gpc";
pub const GPC_SEGMENT_INCLUDED: &str = "GpcSegmentIncluded";

const GPC_FIELDS: &[&str] = &[GPC_SEGMENT_TYPE, GPC];

/// Static description of one US section.
#[derive(Debug)]
pub struct UsProfile {
    pub id: u32,
    pub name: &'static str,
    pub version: u32,
    /// Core fields in wire order.
    pub core_fields: &'static [&'static str],
    pub sensitive_data_len: usize,
    pub known_child_len: usize,
}

pub static US_NAT: UsProfile = UsProfile {
    id: 7,
    name: "usnat",
    version: 1,
    core_fields: &[
        VERSION,
        SHARING_NOTICE,
        SALE_OPT_OUT_NOTICE,
        SHARING_OPT_OUT_NOTICE,
        TARGETED_ADVERTISING_OPT_OUT_NOTICE,
        SENSITIVE_DATA_PROCESSING_OPT_OUT_NOTICE,
        SENSITIVE_DATA_LIMIT_USE_NOTICE,
        SALE_OPT_OUT,
        SHARING_OPT_OUT,
        TARGETED_ADVERTISING_OPT_OUT,
        SENSITIVE_DATA_PROCESSING,
        KNOWN_CHILD_SENSITIVE_DATA_CONSENTS,
        PERSONAL_DATA_CONSENTS,
        MSPA_COVERED_TRANSACTION,
        MSPA_OPT_OUT_OPTION_MODE,
        MSPA_SERVICE_PROVIDER_MODE,
    ],
    sensitive_data_len: 12,
    known_child_len: 2,
};

pub static US_CA: UsProfile = UsProfile {
    id: 8,
    name: "usca",
    version: 1,
    core_fields: &[
        VERSION,
        SALE_OPT_OUT_NOTICE,
        SHARING_OPT_OUT_NOTICE,
        SENSITIVE_DATA_LIMIT_USE_NOTICE,
        SALE_OPT_OUT,
        SHARING_OPT_OUT,
        SENSITIVE_DATA_PROCESSING,
        KNOWN_CHILD_SENSITIVE_DATA_CONSENTS,
        PERSONAL_DATA_CONSENTS,
        MSPA_COVERED_TRANSACTION,
        MSPA_OPT_OUT_OPTION_MODE,
        MSPA_SERVICE_PROVIDER_MODE,
    ],
    sensitive_data_len: 9,
    known_child_len: 2,
};

fn is_two_bit(v: &Value) -> bool {
    matches!(v.as_u32(), Some(0..=2))
}

fn is_two_bit_list(v: &Value) -> bool {
    v.as_list().is_some_and(|l| l.iter().all(|&x| x <= 2))
}

fn two_bit(default: u32) -> DataType {
    DataType::with_value(FieldKind::FixedInteger { width: 2 }, Value::Int(default)).with_validator(is_two_bit)
}

fn two_bit_list(len: usize) -> DataType {
    DataType::with_value(FieldKind::FixedIntegerList { element_width: 2, len }, Value::IntList(vec![0; len]))
        .with_validator(is_two_bit_list)
}

fn core_segment(profile: &'static UsProfile) -> BitStringSegment {
    let mut f = Fields::new();
    for &name in profile.core_fields {
        let field = match name {
            VERSION => DataType::with_value(FieldKind::FixedInteger { width: 6 }, Value::Int(profile.version)),
            SENSITIVE_DATA_PROCESSING => two_bit_list(profile.sensitive_data_len),
            KNOWN_CHILD_SENSITIVE_DATA_CONSENTS => two_bit_list(profile.known_child_len),
            MSPA_COVERED_TRANSACTION => {
                DataType::with_value(FieldKind::FixedInteger { width: 2 }, Value::Int(1))
                    .with_validator(|v| matches!(v.as_u32(), Some(1..=2)))
            }
            _ => two_bit(0),
        };
        f.insert(name, field);
    }
    BitStringSegment::new(profile.core_fields, f, Base64Variant::Compressed).with_validator(validate_core)
}

fn gpc_segment() -> BitStringSegment {
    let mut f = Fields::new();
    f.insert(GPC_SEGMENT_TYPE, DataType::with_value(FieldKind::FixedInteger { width: 2 }, Value::Int(1)));
    f.insert(GPC, DataType::with_value(FieldKind::Boolean, Value::Bool(false)));
    f.insert(GPC_SEGMENT_INCLUDED, DataType::with_value(FieldKind::UnencodableBoolean, Value::Bool(true)));
    BitStringSegment::new(GPC_FIELDS, f, Base64Variant::Compressed)
}

fn field(fields: &Fields, name: &str) -> Option<u32> {
    fields.value(name).ok().flatten().and_then(Value::as_u32)
}

/// Notice/opt-out pairs must agree: no notice means no opt-out, a given notice allows either
/// answer, and a withheld notice forces an opt-out.
fn validate_notice(fields: &Fields, notice_name: &str, opt_out_name: &str) -> Result<()> {
    let (Some(notice), Some(opt_out)) = (field(fields, notice_name), field(fields, opt_out_name)) else {
        return Ok(());
    };
    let ok = match notice {
        0 => opt_out == 0,
        1 => opt_out == 1 || opt_out == 2,
        2 => opt_out == 1,
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(GppError::Validation(format!(
            "Invalid {} / {} combination: {{{} / {}}}",
            notice_name, opt_out_name, notice, opt_out
        )))
    }
}

fn validate_core(fields: &Fields) -> Result<()> {
    validate_notice(fields, SALE_OPT_OUT_NOTICE, SALE_OPT_OUT)?;
    validate_notice(fields, SHARING_OPT_OUT_NOTICE, SHARING_OPT_OUT)?;
    validate_notice(fields, TARGETED_ADVERTISING_OPT_OUT_NOTICE, TARGETED_ADVERTISING_OPT_OUT)?;

    let service_provider = field(fields, MSPA_SERVICE_PROVIDER_MODE).unwrap_or(0);
    let opt_out_option = field(fields, MSPA_OPT_OUT_OPTION_MODE).unwrap_or(0);
    if (service_provider == 1 && opt_out_option != 2) || (opt_out_option == 1 && service_provider != 2) {
        return Err(GppError::Validation(format!(
            "Invalid MSPA mode combination: service provider {} / opt-out option {}",
            service_provider, opt_out_option
        )));
    }
    Ok(())
}

const CORE: usize = 0;
const GPC_SEGMENT: usize = 1;

#[derive(Debug, Clone)]
pub struct UsSection {
    profile: &'static UsProfile,
    segments: Vec<BitStringSegment>,
}

impl UsSection {
    pub fn new(profile: &'static UsProfile) -> Self {
        UsSection { profile, segments: vec![core_segment(profile), gpc_segment()] }
    }

    pub fn us_nat() -> Self {
        Self::new(&US_NAT)
    }

    pub fn us_ca() -> Self {
        Self::new(&US_CA)
    }

    pub fn profile(&self) -> &'static UsProfile {
        self.profile
    }

    fn gpc_included(&self) -> bool {
        self.segments[GPC_SEGMENT]
            .field_value(GPC_SEGMENT_INCLUDED)
            .ok()
            .flatten()
            .and_then(Value::as_bool)
            .unwrap_or(true)
    }
}

impl EncodableSection for UsSection {
    fn id(&self) -> u32 {
        self.profile.id
    }

    fn name(&self) -> &'static str {
        self.profile.name
    }

    fn version(&self) -> u32 {
        int_value(&self.segments[CORE], VERSION).unwrap_or(self.profile.version)
    }

    fn field_names(&self) -> Vec<&str> {
        segment_field_names(&self.segments)
    }

    fn get_field_value(&self, name: &str) -> Result<Option<&Value>> {
        let i = segment_of(&self.segments, name)?;
        self.segments[i].field_value(name)
    }

    fn set_field_value(&mut self, name: &str, value: Value) -> Result<()> {
        let i = segment_of(&self.segments, name)?;
        self.segments[i].set_field_value(name, value)
    }

    fn encode(&mut self) -> Result<String> {
        let core = self.segments[CORE].encode()?;
        if self.gpc_included() {
            let gpc = self.segments[GPC_SEGMENT].encode()?;
            Ok(format!("{}.{}", core, gpc))
        } else {
            Ok(core)
        }
    }

    fn decode(&mut self, encoded: &str) -> Result<()> {
        self.segments[GPC_SEGMENT] = gpc_segment();
        let mut parts = encoded.split('.');
        self.segments[CORE].decode(parts.next().unwrap_or(""))?;
        let gpc = parts.next();
        if let Some(part) = gpc {
            self.segments[GPC_SEGMENT].decode(part)?;
        }
        self.segments[GPC_SEGMENT].set_field_value(GPC_SEGMENT_INCLUDED, Value::Bool(gpc.is_some()))?;
        // Recording inclusion is not an edit of the wire string.
        self.segments[GPC_SEGMENT].set_is_dirty(false);
        if parts.next().is_some() {
            return Err(GppError::Decoding(format!(
                "Undecodable {} '{}': too many segments",
                self.profile.name, encoded
            )));
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

    #[test]
    fn defaults_encode_with_gpc() {
        let mut s = UsSection::us_nat();
        let out = s.encode().unwrap();
        let (_, gpc) = out.split_once('.').unwrap();
        // 01 0 padded to a byte, then to 12 bits
        assert_eq!(gpc, "QA");
        assert_eq!(out, "BAAAAAAAAQA.QA");
    }

    #[test]
    fn gpc_can_be_dropped() {
        let mut s = UsSection::us_ca();
        s.set_field_value(GPC_SEGMENT_INCLUDED, Value::Bool(false)).unwrap();
        assert!(!s.encode().unwrap().contains('.'));
    }

    #[test]
    fn two_bit_domain_is_enforced() {
        let mut s = UsSection::us_nat();
        assert!(matches!(s.set_field_value(SHARING_NOTICE, Value::Int(3)), Err(GppError::Validation(_))));
        assert!(matches!(
            s.set_field_value(MSPA_COVERED_TRANSACTION, Value::Int(0)),
            Err(GppError::Validation(_))
        ));
        assert!(matches!(
            s.set_field_value(SENSITIVE_DATA_PROCESSING, Value::IntList(vec![0; 11])),
            Ok(())
        ));
        // Wrong arity surfaces on encode.
        assert!(matches!(s.encode(), Err(GppError::Encoding(_))));
    }

    #[test]
    fn notice_combination_checked_on_encode() {
        let mut s = UsSection::us_nat();
        s.set_field_value(SALE_OPT_OUT, Value::Int(1)).unwrap();
        assert!(matches!(s.encode(), Err(GppError::Validation(_))));
        s.set_field_value(SALE_OPT_OUT_NOTICE, Value::Int(1)).unwrap();
        assert!(s.encode().is_ok());
    }

    #[test]
    fn redecode_resets_gpc() {
        let mut s = UsSection::us_nat();
        s.decode("BVQqAAAAAgA.YA").unwrap();
        assert_eq!(s.get_field_value(GPC).unwrap(), Some(&Value::Bool(true)));
        s.decode("BVQqAAAAAgA").unwrap();
        assert_eq!(s.get_field_value(GPC).unwrap(), Some(&Value::Bool(false)));
        assert_eq!(s.get_field_value(GPC_SEGMENT_INCLUDED).unwrap(), Some(&Value::Bool(false)));
        assert_eq!(s.encode().unwrap(), "BVQqAAAAAgA");
    }

    /// A usnat string produced by an external CMP.
    #[test]
    fn decodes_external_usnat_string() {
        let wire = "BVQqAAAAAgA.QA";
        let mut s = UsSection::us_nat();
        s.decode(wire).unwrap();
        for name in [SHARING_NOTICE, SALE_OPT_OUT_NOTICE, SHARING_OPT_OUT_NOTICE, TARGETED_ADVERTISING_OPT_OUT_NOTICE] {
            assert_eq!(s.get_field_value(name).unwrap(), Some(&Value::Int(1)), "{}", name);
        }
        for name in [SALE_OPT_OUT, SHARING_OPT_OUT, TARGETED_ADVERTISING_OPT_OUT] {
            assert_eq!(s.get_field_value(name).unwrap(), Some(&Value::Int(2)), "{}", name);
        }
        assert_eq!(s.get_field_value(SENSITIVE_DATA_PROCESSING).unwrap(), Some(&Value::IntList(vec![0; 12])));
        assert_eq!(s.get_field_value(KNOWN_CHILD_SENSITIVE_DATA_CONSENTS).unwrap(), Some(&Value::IntList(vec![2, 0])));
        assert_eq!(s.get_field_value(GPC).unwrap(), Some(&Value::Bool(false)));
        s.set_is_dirty(true);
        assert_eq!(s.encode().unwrap(), wire);
    }

    #[test]
    fn usca_has_no_sharing_notice() {
        let s = UsSection::us_ca();
        assert!(!s.has_field(SHARING_NOTICE));
        assert!(s.has_field(SALE_OPT_OUT_NOTICE));
    }
}
