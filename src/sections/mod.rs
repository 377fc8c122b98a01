//! Concrete GPP sections.
//!
//! | id | name | module |
//! |----|------|--------|
//! | 2 | `tcfeuv2` | [`tcf_eu_v2`] |
//! | 3 | `header` | [`header`] |
//! | 6 | `uspv1` | [`usp_v1`] |
//! | 7 | `usnat` | [`us`] |
//! | 8 | `usca` | [`us`] |

pub mod header;
pub mod tcf_eu_v2;
pub mod us;
pub mod usp_v1;

pub use header::HeaderV1;
pub use tcf_eu_v2::TcfEuV2;
pub use us::{UsProfile, UsSection, US_CA, US_NAT};
pub use usp_v1::UspV1;

use crate::section::EncodableSection;

/// Names of the sections this crate can decode, by id.
pub fn section_name(id: u32) -> Option<&'static str> {
    match id {
        TcfEuV2::ID => Some(TcfEuV2::NAME),
        HeaderV1::ID => Some(HeaderV1::NAME),
        UspV1::ID => Some(UspV1::NAME),
        id if id == US_NAT.id => Some(US_NAT.name),
        id if id == US_CA.id => Some(US_CA.name),
        _ => None,
    }
}

pub fn section_id(name: &str) -> Option<u32> {
    [TcfEuV2::ID, UspV1::ID, US_NAT.id, US_CA.id]
        .into_iter()
        .find(|&id| section_name(id) == Some(name))
}

/// A fresh, default-valued section for `id`. The header is not a payload section.
pub fn new_section(id: u32) -> Option<Box<dyn EncodableSection>> {
    match id {
        TcfEuV2::ID => Some(Box::new(TcfEuV2::new())),
        UspV1::ID => Some(Box::new(UspV1::new())),
        id if id == US_NAT.id => Some(Box::new(UsSection::new(&US_NAT))),
        id if id == US_CA.id => Some(Box::new(UsSection::new(&US_CA))),
        _ => None,
    }
}
