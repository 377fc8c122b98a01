//! US Privacy string (`1YNN`): a version digit and three `Y`/`N`/`-` flags.
//!
//! This section is framed as plain characters rather than bits, so its fields are held as
//! unencodable kinds and serialized here directly.

use crate::codec::{GppError, Result};
use crate::datatype::{DataType, FieldKind};
use crate::fields::Fields;
use crate::section::EncodableSection;
use crate::value::Value;

pub const VERSION: &str = "Version";
pub const NOTICE: &str = "Notice";
pub const OPT_OUT_SALE: &str = "OptOutSale";
pub const LSPA_COVERED: &str = "LspaCovered";

const FIELD_NAMES: &[&str] = &[VERSION, NOTICE, OPT_OUT_SALE, LSPA_COVERED];

fn is_flag(c: char) -> bool {
    matches!(c, 'Y' | 'N' | '-')
}

fn flag_field() -> DataType {
    DataType::with_value(FieldKind::Character, Value::Char('-'))
        .with_validator(|v| v.as_char().is_some_and(is_flag))
}

#[derive(Debug, Clone)]
pub struct UspV1 {
    fields: Fields,
    encoded: Option<String>,
    dirty: bool,
}

impl UspV1 {
    pub const ID: u32 = 6;
    pub const NAME: &'static str = "uspv1";
    pub const VERSION: u32 = 1;

    pub fn new() -> Self {
        let mut fields = Fields::new();
        fields.insert(
            VERSION,
            DataType::with_value(FieldKind::FixedInteger { width: 6 }, Value::Int(Self::VERSION))
                .with_validator(|v| matches!(v.as_u32(), Some(0..=9))),
        );
        for name in &FIELD_NAMES[1..] {
            fields.insert(name, flag_field());
        }
        UspV1 { fields, encoded: None, dirty: true }
    }

    fn char_of(&self, name: &str) -> Result<char> {
        self.fields
            .value(name)?
            .and_then(Value::as_char)
            .ok_or_else(|| GppError::Encoding(format!("field {} has no value", name)))
    }
}

impl Default for UspV1 {
    fn default() -> Self {
        Self::new()
    }
}

impl EncodableSection for UspV1 {
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
        self.fields.value(name)
    }

    fn set_field_value(&mut self, name: &str, value: Value) -> Result<()> {
        self.fields.get_mut(name)?.set_value(value)?;
        self.dirty = true;
        Ok(())
    }

    fn encode(&mut self) -> Result<String> {
        if !self.dirty {
            if let Some(s) = &self.encoded {
                return Ok(s.clone());
            }
        }
        let version = self
            .fields
            .value(VERSION)?
            .and_then(Value::as_u32)
            .ok_or_else(|| GppError::Encoding(format!("field {} has no value", VERSION)))?;
        let s = format!(
            "{}{}{}{}",
            version,
            self.char_of(NOTICE)?,
            self.char_of(OPT_OUT_SALE)?,
            self.char_of(LSPA_COVERED)?
        );
        self.encoded = Some(s.clone());
        self.dirty = false;
        Ok(s)
    }

    fn decode(&mut self, encoded: &str) -> Result<()> {
        self.encoded = None;
        self.dirty = true;
        let chars: Vec<char> = encoded.chars().collect();
        if chars.len() != 4 {
            return Err(GppError::Decoding(format!("Undecodable UspV1 '{}': expected 4 characters", encoded)));
        }
        let version = chars[0]
            .to_digit(10)
            .ok_or_else(|| GppError::Decoding(format!("Undecodable UspV1 version '{}'", chars[0])))?;
        self.fields.get_mut(VERSION)?.set_value(Value::Int(version))?;
        for (name, &c) in FIELD_NAMES[1..].iter().zip(&chars[1..]) {
            self.fields
                .get_mut(name)?
                .set_value(Value::Char(c))
                .map_err(|_| GppError::Decoding(format!("Undecodable UspV1 {} '{}'", name, c)))?;
        }
        self.encoded = Some(encoded.to_string());
        self.dirty = false;
        Ok(())
    }

    fn set_is_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }
}
