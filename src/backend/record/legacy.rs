//! Historical record schema, frozen.
//!
//! Differences from the current schema: the `TypeDatas` groups are ordered
//! int, float, string, ints, floats, strings, vector3, vector4, vector3s;
//! there are no vector4s, index or node-id groups; the key type enumeration
//! stops at `Vector3s`; [`FileInfo`] carries no row tables.
//!
//! Every type here is a copy that must never follow changes to the current
//! schema, since it describes bytes already on disk.

use serde::{Deserialize, Serialize};

use super::container;
use super::schema::{self, KeyData, Vector3, Vector4};
use crate::util::{Error, Result};

/// Identifier written after the container magic.
pub const SCHEMA_ID: &str = "rmf_frame_1";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub id: i32,
    pub name: String,
}

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

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyType {
    Int,
    Float,
    String,
    Ints,
    Floats,
    Strings,
    Vector3,
    Vector4,
    Vector3s,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeyInfo {
    pub id: i32,
    pub name: String,
    pub category: i32,
    pub key_type: KeyType,
    pub per_frame: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeDatas {
    pub int_data: Vec<KeyData<i32>>,
    pub float_data: Vec<KeyData<f32>>,
    pub string_data: Vec<KeyData<String>>,
    pub ints_data: Vec<KeyData<Vec<i32>>>,
    pub floats_data: Vec<KeyData<Vec<f32>>>,
    pub strings_data: Vec<KeyData<Vec<String>>>,
    pub vector3_data: Vec<KeyData<Vector3>>,
    pub vector4_data: Vec<KeyData<Vector4>>,
    pub vector3s_data: Vec<KeyData<Vec<Vector3>>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub info: Info,
    pub nodes: Vec<Node>,
    pub keys: Vec<KeyInfo>,
    pub data: TypeDatas,
}

impl TryFrom<schema::KeyType> for KeyType {
    type Error = Error;

    fn try_from(t: schema::KeyType) -> Result<Self> {
        Ok(match t {
            schema::KeyType::Int => Self::Int,
            schema::KeyType::Float => Self::Float,
            schema::KeyType::String => Self::String,
            schema::KeyType::Ints => Self::Ints,
            schema::KeyType::Floats => Self::Floats,
            schema::KeyType::Strings => Self::Strings,
            schema::KeyType::Vector3 => Self::Vector3,
            schema::KeyType::Vector4 => Self::Vector4,
            schema::KeyType::Vector3s => Self::Vector3s,
            other => {
                return Err(Error::usage(format!(
                    "key type {other:?} cannot be written under {SCHEMA_ID}"
                )))
            }
        })
    }
}

impl From<KeyType> for schema::KeyType {
    fn from(t: KeyType) -> Self {
        match t {
            KeyType::Int => Self::Int,
            KeyType::Float => Self::Float,
            KeyType::String => Self::String,
            KeyType::Ints => Self::Ints,
            KeyType::Floats => Self::Floats,
            KeyType::Strings => Self::Strings,
            KeyType::Vector3 => Self::Vector3,
            KeyType::Vector4 => Self::Vector4,
            KeyType::Vector3s => Self::Vector3s,
        }
    }
}

// ============================================================================
// Mapping to and from the current schema
// ============================================================================

impl From<Label> for schema::Label {
    fn from(l: Label) -> Self {
        Self { id: l.id, name: l.name }
    }
}

impl From<schema::Label> for Label {
    fn from(l: schema::Label) -> Self {
        Self { id: l.id, name: l.name }
    }
}

impl From<NodeSet> for schema::NodeSet {
    fn from(s: NodeSet) -> Self {
        Self { id: s.id, nodes: s.nodes }
    }
}

impl From<schema::NodeSet> for NodeSet {
    fn from(s: schema::NodeSet) -> Self {
        Self { id: s.id, nodes: s.nodes }
    }
}

fn map_all<A, B: From<A>>(items: Vec<A>) -> Vec<B> {
    items.into_iter().map(B::from).collect()
}

/// Historical file info has no row tables; owners get rows in id order
/// when it is read.
impl From<FileInfo> for schema::FileInfo {
    fn from(f: FileInfo) -> Self {
        Self {
            description: f.description,
            producer: f.producer,
            categories: map_all(f.categories),
            node_types: map_all(f.node_types),
            frame_types: map_all(f.frame_types),
            node_sets: map_all(f.node_sets),
            rows: Vec::new(),
        }
    }
}

/// Drops the row tables.
impl From<schema::FileInfo> for FileInfo {
    fn from(f: schema::FileInfo) -> Self {
        Self {
            description: f.description,
            producer: f.producer,
            categories: map_all(f.categories),
            node_types: map_all(f.node_types),
            frame_types: map_all(f.frame_types),
            node_sets: map_all(f.node_sets),
        }
    }
}

impl From<FrameInfo> for schema::FrameInfo {
    fn from(f: FrameInfo) -> Self {
        Self {
            id: f.id,
            name: f.name,
            frame_type: f.frame_type,
            parents: f.parents,
        }
    }
}

impl From<schema::FrameInfo> for FrameInfo {
    fn from(f: schema::FrameInfo) -> Self {
        Self {
            id: f.id,
            name: f.name,
            frame_type: f.frame_type,
            parents: f.parents,
        }
    }
}

impl From<Info> for schema::Info {
    fn from(info: Info) -> Self {
        match info {
            Info::Frame(f) => Self::Frame(f.into()),
            Info::File(f) => Self::File(f.into()),
        }
    }
}

impl From<schema::Info> for Info {
    fn from(info: schema::Info) -> Self {
        match info {
            schema::Info::Frame(f) => Self::Frame(f.into()),
            schema::Info::File(f) => Self::File(f.into()),
        }
    }
}

impl From<Node> for schema::Node {
    fn from(n: Node) -> Self {
        Self {
            id: n.id,
            name: n.name,
            node_type: n.node_type,
            parents: n.parents,
        }
    }
}

impl From<schema::Node> for Node {
    fn from(n: schema::Node) -> Self {
        Self {
            id: n.id,
            name: n.name,
            node_type: n.node_type,
            parents: n.parents,
        }
    }
}

/// Express a current record under the historical schema.
///
/// Fails when the record uses a type the historical schema lacks.
pub fn downgrade_frame(frame: schema::Frame) -> Result<Frame> {
    let data = frame.data;
    if !data.vector4s_data.is_empty() || !data.index_data.is_empty() || !data.node_id_data.is_empty()
    {
        return Err(Error::usage(format!(
            "vector4s, index and node id values cannot be written under {SCHEMA_ID}"
        )));
    }
    let keys = frame
        .keys
        .into_iter()
        .map(|k| {
            Ok(KeyInfo {
                id: k.id,
                name: k.name,
                category: k.category,
                key_type: KeyType::try_from(k.key_type)?,
                per_frame: k.per_frame,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Frame {
        info: frame.info.into(),
        nodes: map_all(frame.nodes),
        keys,
        data: TypeDatas {
            int_data: data.int_data,
            float_data: data.float_data,
            string_data: data.string_data,
            ints_data: data.ints_data,
            floats_data: data.floats_data,
            strings_data: data.strings_data,
            vector3_data: data.vector3_data,
            vector4_data: data.vector4_data,
            vector3s_data: data.vector3s_data,
        },
    })
}

/// Write records in the historical container layout.
pub fn encode_container(frames: &[Frame]) -> Result<Vec<u8>> {
    container::write_container(SCHEMA_ID, frames)
}

/// Read a container written under the historical schema.
pub fn decode_container(bytes: &[u8]) -> Result<Vec<Frame>> {
    container::read_records(bytes, SCHEMA_ID)
}
