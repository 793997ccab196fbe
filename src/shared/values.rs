//! Typed attribute values.
//!
//! A value lives in the data table of its (arity, category, type, per-frame)
//! at `[row][key index]` for static values and `[row][key index][frame]` for
//! per-frame values. Anything never written reads as the null sentinel.

use super::SharedData;
use crate::core::names;
use crate::core::{FrameId, Key, NodeId, NodeType};
use crate::util::{Error, NodeIdTraits, Result, TypeTraits};

/// Node or node set holding a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) struct Owner {
    pub arity: usize,
    pub index: u32,
}

impl Owner {
    pub fn node(node: NodeId) -> Self {
        Self {
            arity: 1,
            index: node.0,
        }
    }
}

/// Static table or one frame of the per-frame table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum Target {
    Static,
    Frame(usize),
}

impl Target {
    fn is_per_frame(self) -> bool {
        matches!(self, Target::Frame(_))
    }
}

impl SharedData {
    // ========================================================================
    // Node values
    // ========================================================================

    /// Value at the current frame, falling back to the static value.
    /// Without a current frame only the static value is read.
    pub fn get_value<T: TypeTraits>(&mut self, node: NodeId, key: Key<T>) -> Result<T::Type> {
        self.check_node(node)?;
        self.read_current(Owner::node(node), key)
    }

    /// Write at the current frame, or the static value when there is none.
    pub fn set_value<T: TypeTraits>(&mut self, node: NodeId, key: Key<T>, value: T::Type) -> Result<()> {
        self.check_node(node)?;
        let target = self.current_target();
        self.check_link_write(node, key)?;
        self.write_value(Owner::node(node), key, target, value)
    }

    pub fn get_static_value<T: TypeTraits>(&mut self, node: NodeId, key: Key<T>) -> Result<T::Type> {
        self.check_node(node)?;
        self.read_value(Owner::node(node), key, Target::Static)
    }

    pub fn set_static_value<T: TypeTraits>(
        &mut self,
        node: NodeId,
        key: Key<T>,
        value: T::Type,
    ) -> Result<()> {
        self.check_node(node)?;
        self.check_link_write(node, key)?;
        self.write_value(Owner::node(node), key, Target::Static, value)
    }

    /// Per-frame value at `frame` without moving the current frame.
    /// [`FrameId::ALL_FRAMES`] reads the static value.
    pub fn get_frame_value<T: TypeTraits>(
        &mut self,
        node: NodeId,
        key: Key<T>,
        frame: FrameId,
    ) -> Result<T::Type> {
        self.check_node(node)?;
        self.read_value(Owner::node(node), key, target_of(frame))
    }

    /// Per-frame write at `frame`, which must be the current frame.
    /// [`FrameId::ALL_FRAMES`] writes the static value.
    pub fn set_frame_value<T: TypeTraits>(
        &mut self,
        node: NodeId,
        key: Key<T>,
        frame: FrameId,
        value: T::Type,
    ) -> Result<()> {
        self.check_node(node)?;
        self.check_link_write(node, key)?;
        self.write_value(Owner::node(node), key, target_of(frame), value)
    }

    /// True if `node` has a per-frame value for `key` at the current frame.
    pub fn get_has_frame_value<T: TypeTraits>(&mut self, node: NodeId, key: Key<T>) -> Result<bool> {
        self.check_node(node)?;
        match self.current_frame.index() {
            Some(f) => Ok(!T::is_null(&self.read_value(
                Owner::node(node),
                key,
                Target::Frame(f),
            )?)),
            None => Ok(false),
        }
    }

    /// Per-frame values of every frame, in frame order.
    pub fn get_all_values<T: TypeTraits>(&mut self, node: NodeId, key: Key<T>) -> Result<Vec<T::Type>> {
        self.check_node(node)?;
        (0..self.get_number_of_frames())
            .map(|f| self.read_value(Owner::node(node), key, Target::Frame(f)))
            .collect()
    }

    // ========================================================================
    // Shared paths
    // ========================================================================

    pub(super) fn current_target(&self) -> Target {
        target_of(self.current_frame)
    }

    pub(super) fn read_current<T: TypeTraits>(&mut self, owner: Owner, key: Key<T>) -> Result<T::Type> {
        if let Some(f) = self.current_frame.index() {
            let value = self.read_value(owner, key, Target::Frame(f))?;
            if !T::is_null(&value) {
                return Ok(value);
            }
        }
        self.read_value(owner, key, Target::Static)
    }

    pub(super) fn read_value<T: TypeTraits>(
        &mut self,
        owner: Owner,
        key: Key<T>,
        target: Target,
    ) -> Result<T::Type> {
        let entry = self.registry.key(key.id)?;
        let Some(key_index) = entry.index(target.is_per_frame()) else {
            return Ok(T::null());
        };
        let category = self.registry.category(entry.category)?;
        let Some(category_index) = category.index else {
            return Ok(T::null());
        };
        let table = names::data_table(
            owner.arity,
            &category.name,
            T::VALUE_TYPE,
            target.is_per_frame(),
        );
        let Some(row) = self.lookup_row(owner.arity, owner.index, category_index) else {
            return Ok(T::null());
        };

        match target {
            Target::Static => Ok(self.caches.table::<T>(&table, 2)?.get_value(&[row, key_index])),
            Target::Frame(f) => self
                .caches
                .frame_table::<T>(&table)?
                .get_frame_value(row, key_index, f),
        }
    }

    pub(super) fn write_value<T: TypeTraits>(
        &mut self,
        owner: Owner,
        key: Key<T>,
        target: Target,
        value: T::Type,
    ) -> Result<()> {
        self.check_writable()?;
        if T::is_null(&value) {
            return Err(Error::NullValue(T::name()));
        }
        if let Target::Frame(f) = target {
            match self.current_frame.index() {
                None => return Err(Error::NoCurrentFrame),
                Some(current) if current != f => {
                    return Err(Error::WrongFrame {
                        requested: f,
                        loaded: Some(current),
                    })
                }
                Some(_) => {}
            }
        }

        let category = self.registry.key(key.id)?.category;
        let category_index = self.category_index_create(category)?;
        let key_index = self.key_index_create(key.id, target.is_per_frame())?;
        let row = self.allocate_row(owner.arity, owner.index, category_index)?;
        let table = names::data_table(
            owner.arity,
            &self.registry.category(category)?.name,
            T::VALUE_TYPE,
            target.is_per_frame(),
        );

        match target {
            Target::Static => {
                let cache = self.caches.table::<T>(&table, 2)?;
                cache.fit(&[row, key_index])?;
                cache.set_value(&[row, key_index], value)
            }
            Target::Frame(f) => {
                let cache = self.caches.frame_table::<T>(&table)?;
                cache.fit(row, key_index)?;
                cache.set_frame_value(row, key_index, f, value)
            }
        }
    }

    /// The target of a link node is written once, by `add_child_link`.
    fn check_link_write<T: TypeTraits>(&mut self, node: NodeId, key: Key<T>) -> Result<()> {
        if T::VALUE_TYPE != NodeIdTraits::VALUE_TYPE {
            return Ok(());
        }
        let entry = self.registry.key(key.id)?;
        if entry.name != names::LINK_KEY
            || self.registry.category(entry.category)?.name != names::LINK_CATEGORY
            || self.get_type(node)? != NodeType::Link
        {
            return Ok(());
        }
        let link = Key::<NodeIdTraits>::new(key.id);
        if self
            .read_value(Owner::node(node), link, Target::Static)?
            .is_valid()
        {
            return Err(Error::usage(format!("link node {node} already has a target")));
        }
        Ok(())
    }
}

fn target_of(frame: FrameId) -> Target {
    match frame.index() {
        Some(f) => Target::Frame(f),
        None => Target::Static,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::{FloatTraits, IntsTraits, StringTraits, Vector3Traits};
    use glam::Vec3;

    fn setup() -> (SharedData, NodeId) {
        let mut data = SharedData::create_in_buffer().unwrap();
        let atom = data
            .add_child(NodeId::ROOT, "atom0", NodeType::Representation)
            .unwrap();
        (data, atom)
    }

    #[test]
    fn test_static_values() {
        let (mut data, atom) = setup();
        let c = data.get_category("shape").unwrap();
        let name = data.get_key::<StringTraits>(c, "label").unwrap();
        let coords = data.get_key::<Vector3Traits>(c, "coordinates").unwrap();
        let ids = data.get_key::<IntsTraits>(c, "ids").unwrap();

        assert_eq!(data.get_value(atom, name).unwrap(), "");
        data.set_value(atom, name, "CA".to_string()).unwrap();
        data.set_value(atom, coords, Vec3::new(1.0, 2.0, 3.0)).unwrap();
        data.set_static_value(atom, ids, vec![4, 5]).unwrap();

        assert_eq!(data.get_value(atom, name).unwrap(), "CA");
        assert_eq!(data.get_value(atom, coords).unwrap(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(data.get_static_value(atom, ids).unwrap(), vec![4, 5]);
        assert_eq!(data.get_value(NodeId::ROOT, coords).unwrap(), Vec3::splat(f32::MAX));
    }

    #[test]
    fn test_per_frame_falls_back_to_static() {
        let (mut data, atom) = setup();
        let c = data.get_category("physics").unwrap();
        let x = data.get_key::<FloatTraits>(c, "x").unwrap();
        data.set_static_value(atom, x, 9.0).unwrap();

        data.set_current_frame(FrameId(0)).unwrap();
        assert_eq!(data.get_value(atom, x).unwrap(), 9.0);
        assert!(!data.get_has_frame_value(atom, x).unwrap());
        data.set_value(atom, x, 1.0).unwrap();
        assert!(data.get_has_frame_value(atom, x).unwrap());
        assert_eq!(data.get_value(atom, x).unwrap(), 1.0);
        assert_eq!(data.get_static_value(atom, x).unwrap(), 9.0);
        assert_eq!(data.get_frame_value(atom, x, FrameId::ALL_FRAMES).unwrap(), 9.0);
    }

    #[test]
    fn test_write_faults() {
        let (mut data, atom) = setup();
        let c = data.get_category("physics").unwrap();
        let x = data.get_key::<FloatTraits>(c, "x").unwrap();

        assert!(matches!(
            data.set_value(atom, x, f32::MAX),
            Err(Error::NullValue("float"))
        ));
        assert!(matches!(
            data.set_frame_value(atom, x, FrameId(0), 1.0),
            Err(Error::NoCurrentFrame)
        ));
        data.set_current_frame(FrameId(1)).unwrap();
        assert!(matches!(
            data.set_frame_value(atom, x, FrameId(0), 1.0),
            Err(Error::WrongFrame { requested: 0, loaded: Some(1) })
        ));
        assert!(matches!(
            data.set_value(NodeId(99), x, 1.0),
            Err(Error::InvalidNode { node: 99, .. })
        ));
    }

    #[test]
    fn test_links_are_write_once() {
        let (mut data, atom) = setup();
        let other = data
            .add_child(NodeId::ROOT, "other", NodeType::Representation)
            .unwrap();
        data.add_child_link(atom, other).unwrap();
        let link = NodeId(3);
        assert_eq!(data.get_type(link).unwrap(), NodeType::Link);

        let key = data.link_key().unwrap();
        let err = data.set_static_value(link, key, atom).unwrap_err();
        assert!(err.is_usage());
        assert_eq!(data.get_children(atom).unwrap(), vec![other]);
    }
}
