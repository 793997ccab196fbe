//! Node sets.
//!
//! A set is an ordered tuple of 2 to 4 nodes stored as a row of the
//! node-data table of its arity (`node_data_pair` and up), with its member
//! ids after the type column. Sets carry attributes like nodes, in a row
//! space of their own.

use super::values::Owner;
use super::SharedData;
use crate::core::names::{self, MAX_ARITY, TYPE};
use crate::core::{Key, NodeId, NodeType, SetId};
use crate::util::{Error, Extent, Result, TypeTraits};

impl SharedData {
    /// Add a set of `members`, which must hold 2 to 4 nodes.
    pub fn add_node_set(&mut self, members: &[NodeId]) -> Result<SetId> {
        let arity = members.len();
        if !(2..=MAX_ARITY).contains(&arity) {
            return Err(Error::usage(format!(
                "node sets hold 2 to {MAX_ARITY} nodes, got {arity}"
            )));
        }
        self.check_writable()?;
        for &m in members {
            self.check_node(m)?;
        }

        let table = &mut self.node_data[arity - 1];
        let index = table.get_size().size(0);
        let width = table
            .get_size()
            .size(1)
            .max(names::first_category_column(arity));
        table.set_size(&Extent::d2(index + 1, width))?;
        table.set_value(&[index, TYPE], NodeType::Bond.to_i32())?;
        for (i, m) in members.iter().enumerate() {
            table.set_value(&[index, 1 + i], m.to_i32())?;
        }

        tracing::trace!(arity, index, ?members, "added node set");
        Ok(SetId {
            arity: arity as u8,
            index: index as u32,
        })
    }

    /// Number of sets of `arity`; 0 outside 2..=4.
    pub fn get_number_of_sets(&self, arity: usize) -> usize {
        if (2..=MAX_ARITY).contains(&arity) {
            self.node_data[arity - 1].get_size().size(0)
        } else {
            0
        }
    }

    pub fn get_set_members(&self, set: SetId) -> Result<Vec<NodeId>> {
        self.check_set(set)?;
        let table = &self.node_data[set.arity as usize - 1];
        Ok((1..=set.arity as usize)
            .map(|i| NodeId::from_i32(table.get_value(&[set.index as usize, i])))
            .collect())
    }

    /// Value of a set at the current frame, falling back to the static value.
    pub fn get_set_value<T: TypeTraits>(&mut self, set: SetId, key: Key<T>) -> Result<T::Type> {
        self.check_set(set)?;
        self.read_current(owner(set), key)
    }

    /// Write a set value at the current frame, or the static value when
    /// there is none.
    pub fn set_set_value<T: TypeTraits>(&mut self, set: SetId, key: Key<T>, value: T::Type) -> Result<()> {
        self.check_set(set)?;
        let target = self.current_target();
        self.write_value(owner(set), key, target, value)
    }

    fn check_set(&self, set: SetId) -> Result<()> {
        let arity = set.arity as usize;
        let valid = (2..=MAX_ARITY).contains(&arity)
            && (set.index as usize) < self.get_number_of_sets(arity)
            && self.node_data[arity - 1].get_value(&[set.index as usize, TYPE]) >= 0;
        if valid {
            Ok(())
        } else {
            Err(Error::usage(format!(
                "invalid node set {} of arity {arity}",
                set.index
            )))
        }
    }
}

fn owner(set: SetId) -> Owner {
    Owner {
        arity: set.arity as usize,
        index: set.index,
    }
}
