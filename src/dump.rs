//! Format decoded values for display (dump text). Vendor and purpose ids are named from a vendor list when one is given.

use crate::gvl::Gvl;
use crate::model::GppModel;
use crate::section::EncodableSection;
use crate::value::{RangeEntry, Value};

/// Field names whose integer lists hold vendor ids.
const VENDOR_LIST_FIELDS: &[&str] = &["VendorConsents", "VendorLegitimateInterests", "VendorsDisclosed", "VendorsAllowed"];

/// Bitfield as a compact `0`/`1` run, e.g. `101`.
fn bits_string(b: &[bool]) -> String {
    b.iter().map(|&x| if x { '1' } else { '0' }).collect()
}

/// 1-based positions of the set bits.
fn set_positions(b: &[bool]) -> Vec<usize> {
    b.iter().enumerate().filter(|&(_, &x)| x).map(|(i, _)| i + 1).collect()
}

fn range_entry(r: &RangeEntry) -> String {
    format!("key={} type={} ids={:?}", r.key(), r.kind(), r.ids())
}

/// Raw scalar string (no vendor names).
pub fn format_value(v: &Value) -> String {
    match v {
        Value::Bool(x) => format!("{}", x),
        Value::Int(x) => format!("{}", x),
        Value::Long(x) => format!("{}", x),
        Value::IntList(l) => format!("{:?}", l),
        Value::Bitfield(b) if b.is_empty() => "[]".to_string(),
        Value::Bitfield(b) => format!("{} (set: {:?})", bits_string(b), set_positions(b)),
        Value::Str(s) => format!("{:?}", s),
        Value::Char(c) => format!("'{}'", c),
        Value::Datetime(d) => d.to_rfc3339(),
        Value::Ranges(r) => format!("[{}]", r.iter().map(range_entry).collect::<Vec<_>>().join("; ")),
    }
}

/// Format a value for display, naming vendors when `gvl` has them.
pub fn value_to_dump(field_name: &str, v: &Value, gvl: Option<&Gvl>, indent: usize) -> String {
    let pad = "  ".repeat(indent);
    match (v, gvl) {
        (Value::IntList(ids), Some(gvl)) if VENDOR_LIST_FIELDS.contains(&field_name) && !ids.is_empty() => {
            let mut lines: Vec<String> = vec![format!("{}[", pad)];
            for id in ids {
                let name = gvl.vendor(*id).map_or("<unknown vendor>", |v| v.name.as_str());
                lines.push(format!("{}  {} {}", pad, id, name));
            }
            lines.push(format!("{}]", pad));
            lines.join("\n")
        }
        _ => format!("{}{}", pad, format_value(v)),
    }
}

/// One section as indented `name: value` lines under a heading.
pub fn dump_section(section: &dyn EncodableSection, gvl: Option<&Gvl>) -> String {
    let mut lines = vec![format!("{} (id {}, version {})", section.name(), section.id(), section.version())];
    for name in section.field_names() {
        let shown = match section.get_field_value(name) {
            Ok(Some(v)) => value_to_dump(name, v, gvl, 1).trim_start().to_string(),
            _ => "<unset>".to_string(),
        };
        lines.push(format!("  {}: {}", name, shown));
    }
    lines.join("\n")
}

/// Every section of `model`, then any opaque ids.
pub fn dump_model(model: &GppModel, gvl: Option<&Gvl>) -> String {
    let mut blocks: Vec<String> = model.sections().map(|s| dump_section(s, gvl)).collect();
    let known: Vec<u32> = model.sections().map(|s| s.id()).collect();
    for id in model.section_ids() {
        if !known.contains(&id) {
            blocks.push(format!("section {} (not decoded)", id));
        }
    }
    if blocks.is_empty() {
        return "(no sections)".to_string();
    }
    blocks.join("\n")
}

/// First line of value_to_dump (for one-line summaries).
pub fn value_summary_line(field_name: &str, v: &Value, gvl: Option<&Gvl>) -> String {
    let full = value_to_dump(field_name, v, gvl, 0);
    full.lines().next().map(|s| s.trim().to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sections::UspV1;

    #[test]
    fn bitfields_show_set_positions() {
        assert_eq!(format_value(&Value::Bitfield(vec![true, false, true])), "101 (set: [1, 3])");
        assert_eq!(format_value(&Value::Bitfield(vec![])), "[]");
    }

    #[test]
    fn vendor_lists_use_names() {
        let gvl = Gvl::from_json_str(
            r#"{"vendorListVersion":1,"tcfPolicyVersion":4,"purposes":{},
                "vendors":{"8":{"id":8,"name":"Acme"}}}"#,
        )
        .unwrap();
        let s = value_to_dump("VendorConsents", &Value::IntList(vec![8, 9]), Some(&gvl), 0);
        assert!(s.contains("8 Acme"));
        assert!(s.contains("9 <unknown vendor>"));
        assert_eq!(value_summary_line("VendorConsents", &Value::IntList(vec![8]), Some(&gvl)), "[");
        assert_eq!(value_to_dump("Other", &Value::IntList(vec![8]), Some(&gvl), 0), "[8]");
    }

    #[test]
    fn section_lists_every_field() {
        let u = UspV1::new();
        let s = dump_section(&u, None);
        assert!(s.starts_with("uspv1 (id 6, version 1)"));
        assert!(s.contains("  Notice: '-'"));
    }
}
