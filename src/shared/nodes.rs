//! Node table.
//!
//! Nodes form a tree stored as first-child / next-sibling pointers in the
//! node-data table. Children are prepended, so walking the pointers yields
//! them newest first. A link node is a child whose only payload is the
//! `link/linked` attribute naming the node it stands for.

use super::values::{Owner, Target};
use super::SharedData;
use crate::core::names::{self, CHILD, SIBLING, TYPE};
use crate::core::{Key, NodeId, NodeType};
use crate::util::{Error, Extent, NodeIdTraits, Result};

impl SharedData {
    /// Number of node slots, including unused ones.
    pub fn get_number_of_nodes(&self) -> usize {
        self.node_data[0].get_size().size(0)
    }

    /// Fail unless `node` names a node in use.
    pub(super) fn check_node(&self, node: NodeId) -> Result<()> {
        let count = self.get_number_of_nodes();
        if node.index() >= count || self.node_data[0].get_value(&[node.index(), TYPE]) < 0 {
            return Err(Error::InvalidNode {
                node: node.0,
                count,
            });
        }
        Ok(())
    }

    /// Add a node with no parent. Unused slots are filled first.
    pub fn add_node(&mut self, name: &str, node_type: NodeType) -> Result<NodeId> {
        names::audit_node_name(name)?;
        self.check_writable()?;

        let id = match self.free_nodes.pop() {
            Some(id) => id,
            None => self.get_number_of_nodes() as u32,
        };
        let i = id as usize;

        self.node_names.fit(&[i])?;
        self.node_names.set_value(&[i], name.to_string())?;

        let table = &mut self.node_data[0];
        let width = table
            .get_size()
            .size(1)
            .max(names::first_category_column(1));
        let rows = table.get_size().size(0).max(i + 1);
        table.set_size(&Extent::d2(rows, width))?;
        table.set_value(&[i, TYPE], node_type.to_i32())?;
        table.set_value(&[i, CHILD], -1)?;
        table.set_value(&[i, SIBLING], -1)?;

        tracing::trace!(node = id, name, %node_type, "added node");
        Ok(NodeId(id))
    }

    /// Add a node under `parent`; it appears last among the children.
    pub fn add_child(&mut self, parent: NodeId, name: &str, node_type: NodeType) -> Result<NodeId> {
        self.check_node(parent)?;
        let child = self.add_node(name, node_type)?;
        let table = &mut self.node_data[0];
        let first = table.get_value(&[parent.index(), CHILD]);
        table.set_value(&[child.index(), SIBLING], first)?;
        table.set_value(&[parent.index(), CHILD], child.to_i32())?;
        Ok(child)
    }

    /// Make `target` appear among the children of `parent` as well.
    pub fn add_child_link(&mut self, parent: NodeId, target: NodeId) -> Result<()> {
        self.check_node(target)?;
        let link = self.add_child(parent, names::LINK_NODE_NAME, NodeType::Link)?;
        let key = self.link_key()?;
        self.write_value(Owner::node(link), key, Target::Static, target)
    }

    /// Children of `node` in insertion order, with links replaced by their
    /// targets.
    pub fn get_children(&mut self, node: NodeId) -> Result<Vec<NodeId>> {
        self.check_node(node)?;
        let count = self.get_number_of_nodes();

        let mut raw = Vec::new();
        let mut next = self.node_data[0].get_value(&[node.index(), CHILD]);
        while next >= 0 {
            if raw.len() >= count {
                return Err(Error::corrupt(format!("child list of node {node} loops")));
            }
            let child = NodeId(next as u32);
            self.check_node(child)?;
            raw.push(child);
            next = self.node_data[0].get_value(&[child.index(), SIBLING]);
        }

        let mut children = Vec::with_capacity(raw.len());
        for child in raw.into_iter().rev() {
            if self.get_type(child)? == NodeType::Link {
                children.push(self.get_link_target(child)?);
            } else {
                children.push(child);
            }
        }
        Ok(children)
    }

    fn get_link_target(&mut self, link: NodeId) -> Result<NodeId> {
        let key = self.link_key()?;
        let target = self.read_value(Owner::node(link), key, Target::Static)?;
        if !target.is_valid() {
            return Err(Error::internal(format!("link node {link} has no target")));
        }
        Ok(target)
    }

    pub(super) fn link_key(&mut self) -> Result<Key<NodeIdTraits>> {
        let category = self.get_category(names::LINK_CATEGORY)?;
        self.get_key::<NodeIdTraits>(category, names::LINK_KEY)
    }

    pub fn get_name(&self, node: NodeId) -> Result<String> {
        self.check_node(node)?;
        Ok(self.node_names.get_value(&[node.index()]))
    }

    pub fn get_type(&self, node: NodeId) -> Result<NodeType> {
        self.check_node(node)?;
        let tag = self.node_data[0].get_value(&[node.index(), TYPE]);
        NodeType::from_i32(tag)
            .ok_or_else(|| Error::corrupt(format!("node {node} has type tag {tag}")))
    }
}
