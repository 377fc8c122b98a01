//! Encodable sections: one consent signal, identified by a GPP section id and name.

use crate::codec::{GppError, Result};
use crate::segment::{BitStringSegment, EncodableSegment};
use crate::value::Value;

pub trait EncodableSection: std::fmt::Debug {
    fn id(&self) -> u32;

    fn name(&self) -> &'static str;

    fn version(&self) -> u32;

    /// Every field, in wire order of its segment.
    fn field_names(&self) -> Vec<&str>;

    fn has_field(&self, name: &str) -> bool {
        self.field_names().contains(&name)
    }

    fn get_field_value(&self, name: &str) -> Result<Option<&Value>>;

    fn set_field_value(&mut self, name: &str, value: Value) -> Result<()>;

    fn encode(&mut self) -> Result<String>;

    fn decode(&mut self, encoded: &str) -> Result<()>;

    fn set_is_dirty(&mut self, dirty: bool);

    /// JSON object of field name to value; fields without a value are `null`.
    fn to_obj(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for name in self.field_names() {
            let v = match self.get_field_value(name) {
                Ok(Some(v)) => v.to_json(),
                _ => serde_json::Value::Null,
            };
            map.insert(name.to_string(), v);
        }
        serde_json::Value::Object(map)
    }
}

/// Index of the segment owning `name`.
pub(crate) fn segment_of(segments: &[BitStringSegment], name: &str) -> Result<usize> {
    segments
        .iter()
        .position(|s| s.has_field(name))
        .ok_or_else(|| GppError::InvalidField(name.to_string()))
}

pub(crate) fn segment_field_names(segments: &[BitStringSegment]) -> Vec<&str> {
    segments.iter().flat_map(|s| s.fields().names()).collect()
}

/// Integer value of `name`, if set.
pub(crate) fn int_value(segment: &BitStringSegment, name: &str) -> Option<u32> {
    segment.field_value(name).ok().flatten().and_then(Value::as_u32)
}
