//! Vendor list loading, caching, and its use by the TCF section.

use gppcodec::sections::tcf_eu_v2::{self, TcfEuV2};
use gppcodec::{EncodableSection, ErrorKind, Gvl, GvlCache, Value};
use std::io::Write;

const GVL_V1: &str = r#"{
  "gvlSpecificationVersion": 3,
  "vendorListVersion": 41,
  "tcfPolicyVersion": 5,
  "lastUpdated": "2024-01-11T16:05:31Z",
  "purposes": {
    "1": {"id": 1, "name": "Store and/or access information on a device", "description": "..."},
    "2": {"id": 2, "name": "Use limited data to select advertising"}
  },
  "specialFeatures": {
    "1": {"id": 1, "name": "Use precise geolocation data"}
  },
  "vendors": {
    "2": {"id": 2, "name": "Captify Technologies Limited", "purposes": [1, 2], "legIntPurposes": []},
    "8": {"id": 8, "name": "Emerse Sverige AB", "purposes": [1], "specialFeatures": [1]}
  },
  "stacks": {
    "1": {"id": 1, "name": "Precise geolocation", "purposes": [], "specialFeatures": [1]}
  }
}"#;

const GVL_V2: &str = r#"{
  "vendorListVersion": 42,
  "tcfPolicyVersion": 5,
  "purposes": {},
  "vendors": {"2": {"id": 2, "name": "Captify Technologies Limited"}}
}"#;

fn write_temp(json: &str) -> tempfile::NamedTempFile {
    let mut f = tempfile::NamedTempFile::new().expect("temp file");
    f.write_all(json.as_bytes()).expect("write");
    f
}

#[test]
fn test_load_from_path() {
    let file = write_temp(GVL_V1);
    let gvl = Gvl::from_path(file.path()).expect("load");
    assert_eq!(gvl.vendor_list_version, 41);
    assert_eq!(gvl.tcf_policy_version, 5);
    assert_eq!(gvl.vendor_ids(), vec![2, 8]);
    assert_eq!(gvl.vendor(8).map(|v| v.name.as_str()), Some("Emerse Sverige AB"));
    assert_eq!(gvl.vendor(8).map(|v| v.special_features.clone()), Some(vec![1]));
    assert_eq!(gvl.purpose(2).map(|p| p.description.as_str()), Some(""));
    assert_eq!(gvl.unknown_vendor_ids(&[8, 9, 2, 10]), vec![9, 10]);
}

#[test]
fn test_missing_file_is_gvl_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Gvl::from_path(dir.path().join("absent.json")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Gvl);
    assert!(err.to_string().contains("absent.json"));
}

#[test]
fn test_malformed_lists_rejected() {
    assert_eq!(Gvl::from_json_str("{").unwrap_err().kind(), ErrorKind::Gvl);
    let mismatched = r#"{"vendorListVersion":1,"tcfPolicyVersion":4,"purposes":{},
        "vendors":{"3":{"id":4,"name":"x"}}}"#;
    let err = Gvl::from_json_str(mismatched).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Gvl);
    assert!(err.to_string().contains("vendors"));
}

#[test]
fn test_cache_loads_once() {
    let mut cache = GvlCache::new();
    assert!(!cache.is_loaded());
    let mut calls = 0;
    let first = cache
        .get_or_load(|| {
            calls += 1;
            Gvl::from_json_str(GVL_V1)
        })
        .unwrap();
    assert_eq!(first.vendor_list_version, 41);
    let again = cache
        .get_or_load(|| {
            calls += 1;
            Gvl::from_json_str(GVL_V2)
        })
        .unwrap();
    assert_eq!(again.vendor_list_version, 41);
    assert_eq!(calls, 1);
}

#[test]
fn test_cache_reload_and_clear() {
    let mut cache = GvlCache::new();
    cache.get_or_load(|| Gvl::from_json_str(GVL_V1)).unwrap();
    assert!(cache.reload(|| Gvl::from_json_str("not json")).is_err());
    assert_eq!(cache.get().map(|g| g.vendor_list_version), Some(41));
    let newer = cache.reload(|| Gvl::from_json_str(GVL_V2)).unwrap();
    assert_eq!(newer.vendor_list_version, 42);
    cache.clear();
    assert!(cache.get().is_none());
}

#[test]
fn test_tcf_takes_versions_from_gvl() {
    let gvl = Gvl::from_json_str(GVL_V1).unwrap();
    let mut tcf = TcfEuV2::new();
    tcf.apply_gvl(&gvl).unwrap();
    assert_eq!(tcf.get_field_value(tcf_eu_v2::VENDOR_LIST_VERSION).unwrap(), Some(&Value::Int(41)));
    assert_eq!(tcf.get_field_value(tcf_eu_v2::POLICY_VERSION).unwrap(), Some(&Value::Int(5)));
}

#[test]
fn test_tcf_vendor_check() {
    let gvl = Gvl::from_json_str(GVL_V1).unwrap();
    let mut tcf = TcfEuV2::new();
    tcf.set_field_value(tcf_eu_v2::VENDOR_CONSENTS, Value::IntList(vec![2, 8])).unwrap();
    assert!(tcf.check_vendors(&gvl).is_ok());
    tcf.set_field_value(tcf_eu_v2::VENDORS_DISCLOSED, Value::IntList(vec![8, 77])).unwrap();
    let err = tcf.check_vendors(&gvl).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Gvl);
    assert!(err.to_string().contains("77"));
}
