//! In-memory table store shared by every backend.

use std::collections::BTreeMap;

use super::DenseArray;
use crate::core::Attributes;
use crate::util::{Error, Extent, Result, ValueType};

/// Type and shape of a table whose cells are not loaded yet.
#[derive(Clone, Debug, PartialEq)]
pub struct TableHeader {
    pub value_type: ValueType,
    pub extent: Extent,
}

/// Named tables plus container attributes.
///
/// Tables may be *pending*: known by header only, with cells loaded on first
/// access by the owning backend.
#[derive(Debug, Default)]
pub struct TableStore {
    tables: BTreeMap<String, DenseArray>,
    pending: BTreeMap<String, TableHeader>,
    attributes: Attributes,
    dirty: bool,
}

impl TableStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Tables
    // ========================================================================

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name) || self.pending.contains_key(name)
    }

    /// Names of every table, sorted.
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .tables
            .keys()
            .chain(self.pending.keys())
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Type and extent of a table, loaded or not.
    pub fn header(&self, name: &str) -> Option<TableHeader> {
        if let Some(t) = self.tables.get(name) {
            return Some(TableHeader {
                value_type: t.value_type(),
                extent: t.extent().clone(),
            });
        }
        self.pending.get(name).cloned()
    }

    #[inline]
    pub fn is_pending(&self, name: &str) -> bool {
        self.pending.contains_key(name)
    }

    /// Names of tables not loaded yet.
    pub fn pending_names(&self) -> Vec<String> {
        self.pending.keys().cloned().collect()
    }

    /// Register a table known by header only.
    pub fn insert_pending(&mut self, name: impl Into<String>, header: TableHeader) {
        self.pending.insert(name.into(), header);
    }

    /// Insert or replace a loaded table.
    ///
    /// Loading a pending table does not make the store dirty.
    pub fn insert(&mut self, name: impl Into<String>, table: DenseArray) {
        let name = name.into();
        if self.pending.remove(&name).is_none() {
            self.dirty = true;
        }
        self.tables.insert(name, table);
    }

    /// Create an empty table.
    pub fn create(&mut self, name: &str, value_type: ValueType, rank: usize) -> Result<()> {
        if self.has_table(name) {
            return Err(Error::internal(format!("table {name} already exists")));
        }
        self.tables
            .insert(name.to_string(), DenseArray::new(value_type, rank));
        self.dirty = true;
        Ok(())
    }

    /// A loaded table.
    pub fn table(&self, name: &str) -> Result<&DenseArray> {
        self.tables.get(name).ok_or_else(|| missing(name, self))
    }

    /// A loaded table, for writing. Marks the store dirty.
    pub fn table_mut(&mut self, name: &str) -> Result<&mut DenseArray> {
        if !self.tables.contains_key(name) {
            return Err(missing(name, self));
        }
        self.dirty = true;
        self.tables.get_mut(name).ok_or_else(|| Error::internal(name))
    }

    /// Iterate over loaded tables.
    pub fn tables(&self) -> impl Iterator<Item = (&str, &DenseArray)> {
        self.tables.iter().map(|(k, v)| (k.as_str(), v))
    }

    // ========================================================================
    // Attributes and state
    // ========================================================================

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name)
    }

    pub fn set_attribute(&mut self, name: &str, value: &str) {
        if self.attributes.get(name) != Some(value) {
            self.attributes.set(name, value);
            self.dirty = true;
        }
    }

    /// Replace every attribute without marking the store dirty.
    pub fn load_attributes(&mut self, attributes: Attributes) {
        self.attributes = attributes;
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }
}

fn missing(name: &str, store: &TableStore) -> Error {
    if store.is_pending(name) {
        Error::internal(format!("table {name} is not loaded"))
    } else {
        Error::internal(format!("no table named {name}"))
    }
}
