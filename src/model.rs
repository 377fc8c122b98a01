//! A full GPP string: a header followed by one encoded section per listed id.
//!
//! ```text
//! header~section~section...
//! ```
//!
//! Sections are kept by id and always written in ascending id order, matching the header's
//! `SectionIds`. Sections this crate does not implement are kept as opaque strings so a
//! decode/encode cycle preserves them.

use crate::codec::{GppError, Result};
use crate::section::EncodableSection;
use crate::sections::{self, HeaderV1};
use crate::value::Value;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct GppModel {
    sections: BTreeMap<u32, Box<dyn EncodableSection>>,
    opaque: BTreeMap<u32, String>,
}

fn unknown_section(name: &str) -> GppError {
    GppError::InvalidField(format!("unknown section '{}'", name))
}

impl GppModel {
    pub fn new() -> Self {
        GppModel::default()
    }

    pub fn from_encoded(encoded: &str) -> Result<Self> {
        let mut model = GppModel::new();
        model.decode(encoded)?;
        Ok(model)
    }

    /// Set a field, creating the section with default values if it is not present yet.
    pub fn set_field_value(&mut self, section: &str, field: &str, value: Value) -> Result<()> {
        let id = sections::section_id(section).ok_or_else(|| unknown_section(section))?;
        if !self.sections.contains_key(&id) {
            let fresh = sections::new_section(id).ok_or_else(|| unknown_section(section))?;
            log::debug!("creating section {} ({})", section, id);
            self.opaque.remove(&id);
            self.sections.insert(id, fresh);
        }
        match self.sections.get_mut(&id) {
            Some(s) => s.set_field_value(field, value),
            None => Err(unknown_section(section)),
        }
    }

    /// `Ok(None)` when the section is known but absent or the field has no value.
    pub fn get_field_value(&self, section: &str, field: &str) -> Result<Option<&Value>> {
        let id = sections::section_id(section).ok_or_else(|| unknown_section(section))?;
        match self.sections.get(&id) {
            Some(s) => s.get_field_value(field),
            None => Ok(None),
        }
    }

    pub fn has_section(&self, name: &str) -> bool {
        sections::section_id(name).is_some_and(|id| self.sections.contains_key(&id))
    }

    pub fn section(&self, name: &str) -> Option<&dyn EncodableSection> {
        let id = sections::section_id(name)?;
        self.sections.get(&id).map(|s| s.as_ref())
    }

    pub fn section_mut(&mut self, name: &str) -> Option<&mut (dyn EncodableSection + 'static)> {
        let id = sections::section_id(name)?;
        self.sections.get_mut(&id).map(|s| s.as_mut())
    }

    /// Add or replace a decoded section.
    pub fn insert_section(&mut self, section: Box<dyn EncodableSection>) {
        self.opaque.remove(&section.id());
        self.sections.insert(section.id(), section);
    }

    pub fn delete_section(&mut self, name: &str) -> bool {
        match sections::section_id(name) {
            Some(id) => self.sections.remove(&id).is_some(),
            None => false,
        }
    }

    /// Keep an encoded section this crate cannot interpret.
    pub fn insert_opaque(&mut self, id: u32, encoded: &str) {
        self.sections.remove(&id);
        self.opaque.insert(id, encoded.to_string());
    }

    pub fn clear(&mut self) {
        self.sections.clear();
        self.opaque.clear();
    }

    /// All section ids present, ascending.
    pub fn section_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.sections.keys().chain(self.opaque.keys()).copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn sections(&self) -> impl Iterator<Item = &dyn EncodableSection> {
        self.sections.values().map(|s| s.as_ref())
    }

    pub fn encode(&mut self) -> Result<String> {
        let ids = self.section_ids();
        let mut header = HeaderV1::new();
        header.set_section_ids(&ids)?;
        let mut parts = vec![header.encode()?];
        for id in ids {
            let part = match (self.sections.get_mut(&id), self.opaque.get(&id)) {
                (Some(s), _) => s.encode()?,
                (None, Some(raw)) => raw.clone(),
                (None, None) => continue,
            };
            parts.push(part);
        }
        Ok(parts.join("~"))
    }

    /// Strict decode: any section failure aborts and leaves the model partially filled.
    pub fn decode(&mut self, encoded: &str) -> Result<()> {
        self.clear();
        if encoded.is_empty() {
            return Ok(());
        }
        let parts: Vec<&str> = encoded.split('~').collect();
        let mut header = HeaderV1::new();
        header.decode(parts[0]).map_err(|e| e.in_field(HeaderV1::NAME))?;
        let ids = header.section_ids();
        if ids.len() != parts.len() - 1 {
            return Err(GppError::Decoding(format!(
                "Header lists {} sections but {} were found",
                ids.len(),
                parts.len() - 1
            )));
        }
        for (id, part) in ids.into_iter().zip(&parts[1..]) {
            match sections::new_section(id) {
                Some(mut section) => {
                    section.decode(part).map_err(|e| e.in_field(section.name()))?;
                    self.sections.insert(id, section);
                }
                None => {
                    log::debug!("keeping unsupported section {} as an opaque string", id);
                    self.opaque.insert(id, part.to_string());
                }
            }
        }
        Ok(())
    }

    /// JSON object keyed by section name.
    pub fn to_obj(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for s in self.sections.values() {
            map.insert(s.name().to_string(), s.to_obj());
        }
        for (id, raw) in &self.opaque {
            map.insert(format!("section{}", id), serde_json::Value::String(raw.clone()));
        }
        serde_json::Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ErrorKind;

    #[test]
    fn empty_model_is_bare_header() {
        let mut m = GppModel::new();
        let s = m.encode().unwrap();
        assert!(!s.contains('~'));
        let back = GppModel::from_encoded(&s).unwrap();
        assert!(back.section_ids().is_empty());
    }

    #[test]
    fn unknown_section_name_is_invalid_field() {
        let mut m = GppModel::new();
        let err = m.set_field_value("uscz", "Version", Value::Int(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidField);
        assert_eq!(m.get_field_value("uscz", "Version").unwrap_err().kind(), ErrorKind::InvalidField);
    }

    #[test]
    fn missing_section_reads_as_none() {
        let m = GppModel::new();
        assert_eq!(m.get_field_value("uspv1", "Notice").unwrap(), None);
    }

    #[test]
    fn section_count_mismatch() {
        let mut h = HeaderV1::new();
        h.set_section_ids(&[6, 7]).unwrap();
        let s = format!("{}~1YNN", h.encode().unwrap());
        let err = GppModel::from_encoded(&s).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decoding);
    }

    #[test]
    fn opaque_sections_survive() {
        let mut h = HeaderV1::new();
        h.set_section_ids(&[6, 12]).unwrap();
        let s = format!("{}~1YNN~BAAAAAAA", h.encode().unwrap());
        let mut m = GppModel::from_encoded(&s).unwrap();
        assert_eq!(m.section_ids(), vec![6, 12]);
        assert_eq!(m.encode().unwrap(), s);
    }
}
