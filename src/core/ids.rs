//! Identifiers and handles: nodes, node types, categories, keys, frames, sets.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use crate::util::{
    FloatTraits, FloatsTraits, IndexTraits, IntTraits, IntsTraits, NodeIdTraits, StringTraits,
    StringsTraits, TypeTraits, ValueType, Vector3Traits, Vector3sTraits, Vector4Traits,
    Vector4sTraits,
};

// ============================================================================
// Nodes
// ============================================================================

/// Identifier of a node. Node 0 is the root.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    /// The root node.
    pub const ROOT: NodeId = NodeId(0);

    /// The null node reference.
    pub const INVALID: NodeId = NodeId(u32::MAX);

    /// Position in the node table.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Persisted representation (-1 for [`NodeId::INVALID`]).
    #[inline]
    pub fn to_i32(self) -> i32 {
        if self == Self::INVALID {
            -1
        } else {
            self.0 as i32
        }
    }

    /// Inverse of [`NodeId::to_i32`]. Negative values map to INVALID.
    #[inline]
    pub fn from_i32(v: i32) -> Self {
        if v < 0 {
            Self::INVALID
        } else {
            NodeId(v as u32)
        }
    }

    /// True unless this is the null reference.
    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}", self.0)
        } else {
            f.write_str("<invalid>")
        }
    }
}

/// Kind of a node. The discriminant is the persisted tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum NodeType {
    /// The root of the file
    Root = 0,
    /// Structural node (molecule, chain, residue, atom)
    Representation = 1,
    /// Geometric decoration
    Geometry = 2,
    /// Scoring or restraint information
    Feature = 3,
    /// Reference to another node
    Alias = 4,
    /// Application-defined
    Custom = 5,
    /// Grouped-node relation (node sets)
    Bond = 6,
    /// Pseudo-node aliasing another node in the child list
    Link = 7,
}

impl NodeType {
    /// Every node type, in tag order.
    pub const ALL: [NodeType; 8] = [
        Self::Root,
        Self::Representation,
        Self::Geometry,
        Self::Feature,
        Self::Alias,
        Self::Custom,
        Self::Bond,
        Self::Link,
    ];

    /// Convert from the persisted tag.
    pub fn from_i32(v: i32) -> Option<Self> {
        Self::ALL.get(usize::try_from(v).ok()?).copied()
    }

    /// Persisted tag.
    #[inline]
    pub fn to_i32(self) -> i32 {
        self as i32
    }

    /// Human readable name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Representation => "representation",
            Self::Geometry => "geometry",
            Self::Feature => "feature",
            Self::Alias => "alias",
            Self::Custom => "custom",
            Self::Bond => "bond",
            Self::Link => "link",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Categories and keys
// ============================================================================

/// Handle to a category within one open file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Category(pub(crate) u32);

impl Category {
    #[inline]
    pub(crate) fn slot(self) -> usize {
        self.0 as usize
    }
}

/// Handle to a typed attribute key within one open file.
///
/// The static and per-frame variants of a key share one handle; which table
/// is used depends on the operation.
pub struct Key<T: TypeTraits> {
    pub(crate) id: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T: TypeTraits> Key<T> {
    pub(crate) fn new(id: u32) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub(crate) fn slot(self) -> usize {
        self.id as usize
    }

    /// Value type of this key.
    #[inline]
    pub fn value_type(self) -> ValueType {
        T::VALUE_TYPE
    }
}

impl<T: TypeTraits> Clone for Key<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: TypeTraits> Copy for Key<T> {}

impl<T: TypeTraits> PartialEq for Key<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T: TypeTraits> Eq for Key<T> {}

impl<T: TypeTraits> Hash for Key<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T: TypeTraits> fmt::Debug for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key<{}>({})", T::name(), self.id)
    }
}

pub type IntKey = Key<IntTraits>;
pub type FloatKey = Key<FloatTraits>;
pub type IndexKey = Key<IndexTraits>;
pub type NodeIdKey = Key<NodeIdTraits>;
pub type StringKey = Key<StringTraits>;
pub type IntsKey = Key<IntsTraits>;
pub type FloatsKey = Key<FloatsTraits>;
pub type StringsKey = Key<StringsTraits>;
pub type Vector3Key = Key<Vector3Traits>;
pub type Vector4Key = Key<Vector4Traits>;
pub type Vector3sKey = Key<Vector3sTraits>;
pub type Vector4sKey = Key<Vector4sTraits>;

// ============================================================================
// Frames and node sets
// ============================================================================

/// A frame index, or [`FrameId::ALL_FRAMES`] for static mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub u32);

impl FrameId {
    /// Static mode: reads and writes go to the static tables.
    pub const ALL_FRAMES: FrameId = FrameId(u32::MAX);

    /// The frame index, or None in static mode.
    #[inline]
    pub fn index(self) -> Option<usize> {
        (self != Self::ALL_FRAMES).then_some(self.0 as usize)
    }

    #[inline]
    pub fn is_all_frames(self) -> bool {
        self == Self::ALL_FRAMES
    }
}

impl Default for FrameId {
    fn default() -> Self {
        Self::ALL_FRAMES
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index() {
            Some(i) => write!(f, "{i}"),
            None => f.write_str("ALL_FRAMES"),
        }
    }
}

/// Identifier of a node set (an ordered tuple of 2 to 4 nodes).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SetId {
    /// Number of members (2..=4).
    pub arity: u8,
    /// Row within the set table of that arity.
    pub index: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_persisted_form() {
        assert_eq!(NodeId(3).to_i32(), 3);
        assert_eq!(NodeId::INVALID.to_i32(), -1);
        assert_eq!(NodeId::from_i32(-1), NodeId::INVALID);
        assert_eq!(NodeId::from_i32(9), NodeId(9));
        assert!(!NodeId::INVALID.is_valid());
    }

    #[test]
    fn test_node_type_tags() {
        for t in NodeType::ALL {
            assert_eq!(NodeType::from_i32(t.to_i32()), Some(t));
        }
        assert_eq!(NodeType::from_i32(-1), None);
        assert_eq!(NodeType::from_i32(8), None);
        assert_eq!(NodeType::Link.to_i32(), 7);
    }

    #[test]
    fn test_frame_id() {
        assert_eq!(FrameId::default(), FrameId::ALL_FRAMES);
        assert_eq!(FrameId(2).index(), Some(2));
        assert_eq!(FrameId::ALL_FRAMES.index(), None);
        assert_eq!(FrameId::ALL_FRAMES.to_string(), "ALL_FRAMES");
    }

    #[test]
    fn test_key_is_copy() {
        let k = FloatKey::new(4);
        let k2 = k;
        assert_eq!(k, k2);
        assert_eq!(k.value_type(), ValueType::Float);
        assert_eq!(format!("{k:?}"), "Key<float>(4)");
    }
}
