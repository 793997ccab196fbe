//! Dynamically typed cell value exchanged with backends.

use glam::{Vec3, Vec4};

use super::ValueType;

/// A single table cell.
///
/// Backends store and return `Value`s; the typed API converts through
/// [`TypeTraits`](super::TypeTraits).
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Int(i32),
    Float(f32),
    Index(i32),
    NodeId(i32),
    String(String),
    Ints(Vec<i32>),
    Floats(Vec<f32>),
    Strings(Vec<String>),
    Vector3(Vec3),
    Vector4(Vec4),
    Vector3s(Vec<Vec3>),
    Vector4s(Vec<Vec4>),
}

impl Value {
    /// The null sentinel of a type.
    pub fn null(value_type: ValueType) -> Self {
        match value_type {
            ValueType::Int => Self::Int(i32::MAX),
            ValueType::Float => Self::Float(f32::MAX),
            ValueType::Index => Self::Index(-1),
            ValueType::NodeId => Self::NodeId(-1),
            ValueType::String => Self::String(String::new()),
            ValueType::Ints => Self::Ints(Vec::new()),
            ValueType::Floats => Self::Floats(Vec::new()),
            ValueType::Strings => Self::Strings(Vec::new()),
            ValueType::Vector3 => Self::Vector3(Vec3::splat(f32::MAX)),
            ValueType::Vector4 => Self::Vector4(Vec4::splat(f32::MAX)),
            ValueType::Vector3s => Self::Vector3s(Vec::new()),
            ValueType::Vector4s => Self::Vector4s(Vec::new()),
        }
    }

    /// Type of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Int(_) => ValueType::Int,
            Self::Float(_) => ValueType::Float,
            Self::Index(_) => ValueType::Index,
            Self::NodeId(_) => ValueType::NodeId,
            Self::String(_) => ValueType::String,
            Self::Ints(_) => ValueType::Ints,
            Self::Floats(_) => ValueType::Floats,
            Self::Strings(_) => ValueType::Strings,
            Self::Vector3(_) => ValueType::Vector3,
            Self::Vector4(_) => ValueType::Vector4,
            Self::Vector3s(_) => ValueType::Vector3s,
            Self::Vector4s(_) => ValueType::Vector4s,
        }
    }

    /// True if this value is the null sentinel of its type.
    pub fn is_null(&self) -> bool {
        match self {
            Self::Int(v) => *v == i32::MAX,
            Self::Float(v) => *v == f32::MAX,
            Self::Index(v) | Self::NodeId(v) => *v < 0,
            Self::String(v) => v.is_empty(),
            Self::Ints(v) => v.is_empty(),
            Self::Floats(v) => v.is_empty(),
            Self::Strings(v) => v.is_empty(),
            Self::Vector3(v) => v.to_array().iter().all(|c| *c == f32::MAX),
            Self::Vector4(v) => v.to_array().iter().all(|c| *c == f32::MAX),
            Self::Vector3s(v) => v.is_empty(),
            Self::Vector4s(v) => v.is_empty(),
        }
    }

    /// Integer payload of Int, Index and NodeId cells.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::Int(v) | Self::Index(v) | Self::NodeId(v) => Some(*v),
            _ => None,
        }
    }

    /// String payload.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}
