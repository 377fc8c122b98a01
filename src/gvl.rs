//! Global Vendor List: reference data describing registered vendors and purposes.
//!
//! The list is parsed from the IAB JSON document, where every map is keyed by the decimal
//! string of the entry's `id`. [`GvlCache`] holds one loaded list for callers that want a
//! load-once, reload-on-demand reference instead of re-parsing per use.

use crate::codec::{GppError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GvlPurpose {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GvlVendor {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub purposes: Vec<u32>,
    #[serde(default)]
    pub leg_int_purposes: Vec<u32>,
    #[serde(default)]
    pub flexible_purposes: Vec<u32>,
    #[serde(default)]
    pub special_purposes: Vec<u32>,
    #[serde(default)]
    pub features: Vec<u32>,
    #[serde(default)]
    pub special_features: Vec<u32>,
    #[serde(default)]
    pub policy_url: Option<String>,
    #[serde(default)]
    pub deleted_date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GvlStack {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub purposes: Vec<u32>,
    #[serde(default)]
    pub special_features: Vec<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gvl {
    #[serde(default)]
    pub gvl_specification_version: Option<u32>,
    pub vendor_list_version: u32,
    pub tcf_policy_version: u32,
    #[serde(default)]
    pub last_updated: Option<String>,
    pub purposes: HashMap<String, GvlPurpose>,
    #[serde(default)]
    pub special_purposes: HashMap<String, GvlPurpose>,
    #[serde(default)]
    pub features: HashMap<String, GvlPurpose>,
    #[serde(default)]
    pub special_features: HashMap<String, GvlPurpose>,
    pub vendors: HashMap<String, GvlVendor>,
    #[serde(default)]
    pub stacks: HashMap<String, GvlStack>,
}

/// Every key must be the decimal form of its entry's id.
fn check_keys<T>(section: &str, map: &HashMap<String, T>, id_of: impl Fn(&T) -> u32) -> Result<()> {
    for (key, entry) in map {
        let parsed: u32 = key
            .parse()
            .map_err(|_| GppError::Gvl(format!("{}: key '{}' is not an integer id", section, key)))?;
        if parsed != id_of(entry) {
            return Err(GppError::Gvl(format!(
                "{}: key '{}' does not match entry id {}",
                section,
                key,
                id_of(entry)
            )));
        }
    }
    Ok(())
}

impl Gvl {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let gvl: Gvl = serde_json::from_str(json).map_err(|e| GppError::Gvl(format!("invalid vendor list: {}", e)))?;
        gvl.validate()?;
        Ok(gvl)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| GppError::Gvl(format!("cannot read {}: {}", path.display(), e)))?;
        log::debug!("loading vendor list from {}", path.display());
        Self::from_json_str(&json)
    }

    fn validate(&self) -> Result<()> {
        check_keys("purposes", &self.purposes, |p| p.id)?;
        check_keys("specialPurposes", &self.special_purposes, |p| p.id)?;
        check_keys("features", &self.features, |p| p.id)?;
        check_keys("specialFeatures", &self.special_features, |p| p.id)?;
        check_keys("vendors", &self.vendors, |v| v.id)?;
        check_keys("stacks", &self.stacks, |s| s.id)
    }

    pub fn vendor(&self, id: u32) -> Option<&GvlVendor> {
        self.vendors.get(&id.to_string())
    }

    pub fn purpose(&self, id: u32) -> Option<&GvlPurpose> {
        self.purposes.get(&id.to_string())
    }

    /// Vendor ids, ascending.
    pub fn vendor_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.vendors.values().map(|v| v.id).collect();
        ids.sort_unstable();
        ids
    }

    /// Ids from `ids` with no vendor entry, in input order.
    pub fn unknown_vendor_ids(&self, ids: &[u32]) -> Vec<u32> {
        ids.iter().copied().filter(|&id| self.vendor(id).is_none()).collect()
    }
}

/// Lazily loaded, explicitly owned vendor list reference.
#[derive(Debug, Default)]
pub struct GvlCache {
    gvl: Option<Arc<Gvl>>,
}

impl GvlCache {
    pub fn new() -> Self {
        GvlCache { gvl: None }
    }

    pub fn get(&self) -> Option<Arc<Gvl>> {
        self.gvl.clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.gvl.is_some()
    }

    /// Return the cached list, running `load` only if nothing is cached yet.
    pub fn get_or_load<F>(&mut self, load: F) -> Result<Arc<Gvl>>
    where
        F: FnOnce() -> Result<Gvl>,
    {
        if let Some(gvl) = &self.gvl {
            return Ok(Arc::clone(gvl));
        }
        let gvl = Arc::new(load()?);
        log::debug!("vendor list {} loaded", gvl.vendor_list_version);
        self.gvl = Some(Arc::clone(&gvl));
        Ok(gvl)
    }

    /// Replace the cached list. On failure the previous list stays cached.
    pub fn reload<F>(&mut self, load: F) -> Result<Arc<Gvl>>
    where
        F: FnOnce() -> Result<Gvl>,
    {
        let gvl = Arc::new(load()?);
        if let Some(old) = &self.gvl {
            log::info!("vendor list reloaded: {} -> {}", old.vendor_list_version, gvl.vendor_list_version);
        }
        self.gvl = Some(Arc::clone(&gvl));
        Ok(gvl)
    }

    pub fn clear(&mut self) {
        self.gvl = None;
    }
}
