//! Lenient frame handling: decode a GPP string section by section.
//!
//! Where [`GppModel::decode`](crate::model::GppModel::decode) stops at the first bad section,
//! [`decode_gpp_frame`] keeps going: a section that fails to decode is recorded as rejected and
//! the rest are still returned. Only an undecodable header is fatal, since without it the
//! section ids are unknown.

use crate::codec::{GppError, Result};
use crate::model::GppModel;
use crate::section::EncodableSection;
use crate::sections::{self, HeaderV1};

/// Result of decoding a frame: sections that decoded and sections that did not.
#[derive(Debug)]
pub struct FrameDecodeResult {
    pub header: HeaderV1,
    pub sections: Vec<DecodedSection>,
    pub rejected: Vec<RejectedSection>,
}

#[derive(Debug)]
pub struct DecodedSection {
    pub id: u32,
    /// Position after the header (0 = first section).
    pub index: usize,
    pub section: Box<dyn EncodableSection>,
}

#[derive(Debug)]
pub struct RejectedSection {
    pub id: u32,
    pub index: usize,
    pub encoded: String,
    pub reason: String,
}

pub fn decode_gpp_frame(encoded: &str) -> Result<FrameDecodeResult> {
    let parts: Vec<&str> = encoded.split('~').collect();
    let mut header = HeaderV1::new();
    header.decode(parts[0]).map_err(|e| e.in_field(HeaderV1::NAME))?;
    let ids = header.section_ids();
    if ids.len() != parts.len() - 1 {
        log::warn!(
            "header lists {} sections but {} were found; decoding the common prefix",
            ids.len(),
            parts.len() - 1
        );
    }

    let mut decoded = Vec::new();
    let mut rejected = Vec::new();
    for (index, (&id, &part)) in ids.iter().zip(&parts[1..]).enumerate() {
        let result = match sections::new_section(id) {
            Some(mut section) => section.decode(part).map(|()| section),
            None => Err(GppError::Decoding(format!("unsupported section id {}", id))),
        };
        match result {
            Ok(section) => decoded.push(DecodedSection { id, index, section }),
            Err(e) => {
                log::debug!("rejecting section {} at {}: {}", id, index, e);
                rejected.push(RejectedSection {
                    id,
                    index,
                    encoded: part.to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(FrameDecodeResult { header, sections: decoded, rejected })
}

/// Re-encode a frame keeping only the sections that decoded.
pub fn encode_frame_with_compliant_only(result: FrameDecodeResult) -> Result<String> {
    let mut model = GppModel::new();
    for d in result.sections {
        model.insert_section(d.section);
    }
    model.encode()
}
