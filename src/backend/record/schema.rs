//! Current record schema.
//!
//! A record container holds one [`Frame`] record carrying [`FileInfo`]
//! (whole-file metadata, every node, node sets, static keys and static
//! data) followed by one [`Frame`] record per frame carrying [`FrameInfo`]
//! and that frame's per-frame data.
//!
//! Value ids address nodes when non-negative; `-1 - n` addresses the node
//! set with global id `n`. The rows every owner holds in each category are
//! listed in [`FileInfo::rows`], so row numbers survive a round trip even
//! for owners that hold no values.

use serde::{Deserialize, Serialize};

use crate::util::ValueType;

/// Identifier written after the container magic.
pub const SCHEMA_ID: &str = "rmf_frame_2";

/// An (id, name) pair.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub id: i32,
    pub name: String,
}

/// A tuple of nodes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeSet {
    pub id: i32,
    pub nodes: Vec<i32>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    pub description: String,
    pub producer: String,
    pub categories: Vec<Label>,
    pub node_types: Vec<Label>,
    pub frame_types: Vec<Label>,
    pub node_sets: Vec<NodeSet>,
    pub rows: Vec<RowTable>,
}

/// Rows held in one category by the owners of one arity.
///
/// Each entry maps a value id to its row.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RowTable {
    pub arity: i32,
    pub category: i32,
    pub rows: Vec<NodeValue<i32>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameInfo {
    pub id: i32,
    pub name: String,
    pub frame_type: i32,
    pub parents: Vec<i32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Info {
    Frame(FrameInfo),
    File(FileInfo),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: i32,
    pub name: String,
    pub node_type: i32,
    pub parents: Vec<i32>,
}

/// Value type of a key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyType {
    Int,
    Float,
    String,
    Vector3,
    Vector4,
    Ints,
    Floats,
    Strings,
    Vector3s,
    Vector4s,
    Index,
    NodeId,
}

impl From<ValueType> for KeyType {
    fn from(t: ValueType) -> Self {
        match t {
            ValueType::Int => Self::Int,
            ValueType::Float => Self::Float,
            ValueType::Index => Self::Index,
            ValueType::NodeId => Self::NodeId,
            ValueType::String => Self::String,
            ValueType::Ints => Self::Ints,
            ValueType::Floats => Self::Floats,
            ValueType::Strings => Self::Strings,
            ValueType::Vector3 => Self::Vector3,
            ValueType::Vector4 => Self::Vector4,
            ValueType::Vector3s => Self::Vector3s,
            ValueType::Vector4s => Self::Vector4s,
        }
    }
}

impl From<KeyType> for ValueType {
    fn from(t: KeyType) -> Self {
        match t {
            KeyType::Int => Self::Int,
            KeyType::Float => Self::Float,
            KeyType::Index => Self::Index,
            KeyType::NodeId => Self::NodeId,
            KeyType::String => Self::String,
            KeyType::Ints => Self::Ints,
            KeyType::Floats => Self::Floats,
            KeyType::Strings => Self::Strings,
            KeyType::Vector3 => Self::Vector3,
            KeyType::Vector4 => Self::Vector4,
            KeyType::Vector3s => Self::Vector3s,
            KeyType::Vector4s => Self::Vector4s,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeyInfo {
    pub id: i32,
    pub name: String,
    pub category: i32,
    pub key_type: KeyType,
    pub per_frame: bool,
}

/// One value of one key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeValue<T> {
    pub id: i32,
    pub value: T,
}

/// Every value of one key within a record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeyData<T> {
    pub key: i32,
    pub values: Vec<NodeValue<T>>,
}

pub type Vector3 = [f32; 3];
pub type Vector4 = [f32; 4];

/// Values grouped by type.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeDatas {
    pub int_data: Vec<KeyData<i32>>,
    pub float_data: Vec<KeyData<f32>>,
    pub string_data: Vec<KeyData<String>>,
    pub vector3_data: Vec<KeyData<Vector3>>,
    pub vector4_data: Vec<KeyData<Vector4>>,
    pub ints_data: Vec<KeyData<Vec<i32>>>,
    pub floats_data: Vec<KeyData<Vec<f32>>>,
    pub strings_data: Vec<KeyData<Vec<String>>>,
    pub vector3s_data: Vec<KeyData<Vec<Vector3>>>,
    pub vector4s_data: Vec<KeyData<Vec<Vector4>>>,
    pub index_data: Vec<KeyData<i32>>,
    pub node_id_data: Vec<KeyData<i32>>,
}

/// One record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub info: Info,
    pub nodes: Vec<Node>,
    pub keys: Vec<KeyInfo>,
    pub data: TypeDatas,
}

/// Append a value, starting a new group when the key changes.
pub fn push_value<T>(list: &mut Vec<KeyData<T>>, key: i32, id: i32, value: T) {
    match list.last_mut() {
        Some(group) if group.key == key => group.values.push(NodeValue { id, value }),
        _ => list.push(KeyData {
            key,
            values: vec![NodeValue { id, value }],
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_type_mapping() {
        for t in ValueType::ALL {
            assert_eq!(ValueType::from(KeyType::from(t)), t);
        }
    }

    #[test]
    fn test_push_value_groups() {
        let mut list: Vec<KeyData<i32>> = Vec::new();
        push_value(&mut list, 0, 1, 10);
        push_value(&mut list, 0, 2, 20);
        push_value(&mut list, 3, 1, 30);
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].values.len(), 2);
        assert_eq!(list[1].key, 3);
    }
}
