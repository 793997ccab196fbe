//! Row allocation.
//!
//! Each (owner, category) pair gets a dense row in the category's data
//! tables, stored in the category's column of the owner's node-data table.
//! Nodes and each set arity have independent row spaces.

use std::collections::HashMap;

use super::SharedData;
use crate::core::names;
use crate::core::{Category, NodeId};
use crate::util::{Extent, Result};

#[derive(Default)]
pub(super) struct RowIndex {
    /// (arity, owner, category index) to row.
    rows: HashMap<(usize, u32, usize), usize>,
    /// (arity, category index) to the largest row allocated so far.
    column_max: HashMap<(usize, usize), i32>,
}

impl SharedData {
    /// Row of `node` in `category`, allocated on first request.
    pub fn get_index_set(&mut self, node: NodeId, category: Category) -> Result<usize> {
        self.check_node(node)?;
        self.check_writable()?;
        let index = self.category_index_create(category)?;
        self.allocate_row(1, node.0, index)
    }

    /// Row of `node` in `category` if one was allocated.
    pub fn get_row(&mut self, node: NodeId, category: Category) -> Result<Option<usize>> {
        self.check_node(node)?;
        match self.registry.category(category)?.index {
            Some(index) => Ok(self.lookup_row(1, node.0, index)),
            None => Ok(None),
        }
    }

    /// Row of an owner without allocating.
    pub(super) fn lookup_row(&mut self, arity: usize, owner: u32, category: usize) -> Option<usize> {
        if let Some(&row) = self.rows.rows.get(&(arity, owner, category)) {
            return Some(row);
        }
        let column = names::category_column(arity, category);
        let stored = self.node_data[arity - 1].get_value(&[owner as usize, column]);
        let row = usize::try_from(stored).ok()?;
        self.rows.rows.insert((arity, owner, category), row);
        Some(row)
    }

    /// Row of an owner, allocating `1 + column maximum` when it has none.
    pub(super) fn allocate_row(&mut self, arity: usize, owner: u32, category: usize) -> Result<usize> {
        if let Some(&row) = self.rows.rows.get(&(arity, owner, category)) {
            return Ok(row);
        }
        let column = names::category_column(arity, category);
        let table = &mut self.node_data[arity - 1];

        let width = table.get_size().size(1);
        if width <= column {
            let rows = table.get_size().size(0);
            table.set_size(&Extent::d2(rows, column + 1))?;
            self.rows.column_max.retain(|&(a, _), _| a != arity);
        }

        let stored = table.get_value(&[owner as usize, column]);
        let row = if stored >= 0 {
            stored
        } else {
            let max = match self.rows.column_max.get(&(arity, category)) {
                Some(&max) => max,
                None => (0..table.get_size().size(0))
                    .map(|r| table.get_value(&[r, column]))
                    .max()
                    .unwrap_or(-1),
            };
            let row = max + 1;
            table.set_value(&[owner as usize, column], row)?;
            self.rows.column_max.insert((arity, category), row);
            tracing::trace!(arity, owner, category, row, "allocated row");
            row
        };

        let row = row as usize;
        self.rows.rows.insert((arity, owner, category), row);
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::NodeType;

    #[test]
    fn test_rows_are_dense_and_stable() {
        let mut data = SharedData::create_in_buffer().unwrap();
        let a = data
            .add_child(NodeId::ROOT, "a", NodeType::Representation)
            .unwrap();
        let b = data
            .add_child(NodeId::ROOT, "b", NodeType::Representation)
            .unwrap();
        let physics = data.get_category("physics").unwrap();
        let shape = data.get_category("shape").unwrap();

        assert_eq!(data.get_row(b, physics).unwrap(), None);
        assert_eq!(data.get_index_set(b, physics).unwrap(), 0);
        assert_eq!(data.get_index_set(a, physics).unwrap(), 1);
        assert_eq!(data.get_index_set(b, physics).unwrap(), 0);
        assert_eq!(data.get_index_set(a, shape).unwrap(), 0);
        assert_eq!(data.get_row(a, physics).unwrap(), Some(1));

        data.reload().unwrap();
        let physics = data.get_category("physics").unwrap();
        assert_eq!(data.get_row(a, physics).unwrap(), Some(1));
        assert_eq!(data.get_index_set(b, physics).unwrap(), 0);
        assert_eq!(data.get_index_set(NodeId::ROOT, physics).unwrap(), 2);
    }
}
