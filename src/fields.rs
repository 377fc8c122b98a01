//! Insertion-ordered, uniquely keyed field container.

use crate::codec::{GppError, Result};
use crate::datatype::DataType;
use crate::value::Value;

#[derive(Debug, Clone, Default)]
pub struct Fields {
    entries: Vec<(String, DataType)>,
}

impl Fields {
    pub fn new() -> Self {
        Fields { entries: Vec::new() }
    }

    /// Insert, or replace in place if `name` already exists (its position is kept).
    pub fn insert(&mut self, name: &str, field: DataType) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => *slot = field,
            None => self.entries.push((name.to_string(), field)),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    pub fn get(&self, name: &str) -> Result<&DataType> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, f)| f)
            .ok_or_else(|| GppError::InvalidField(name.to_string()))
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut DataType> {
        self.entries
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, f)| f)
            .ok_or_else(|| GppError::InvalidField(name.to_string()))
    }

    pub fn value(&self, name: &str) -> Result<Option<&Value>> {
        self.get(name).map(DataType::value)
    }

    /// Fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DataType)> {
        self.entries.iter().map(|(n, f)| (n.as_str(), f))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
