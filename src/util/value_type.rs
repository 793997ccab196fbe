//! Primitive value types that can be stored as attributes.

use std::fmt;

/// Primitive attribute type.
///
/// The discriminant is the tag persisted by the dense container, so the
/// numbering must stay stable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ValueType {
    /// Signed 32-bit integer
    Int = 0,
    /// 32-bit float
    Float = 1,
    /// Non-negative index (null is -1)
    Index = 2,
    /// Reference to another node (null is -1)
    NodeId = 3,
    /// UTF-8 string
    String = 4,
    /// List of integers
    Ints = 5,
    /// List of floats
    Floats = 6,
    /// List of strings
    Strings = 7,
    /// Three floats
    Vector3 = 8,
    /// Four floats
    Vector4 = 9,
    /// List of Vector3
    Vector3s = 10,
    /// List of Vector4
    Vector4s = 11,
}

impl ValueType {
    /// Every type, in tag order.
    pub const ALL: [ValueType; 12] = [
        Self::Int,
        Self::Float,
        Self::Index,
        Self::NodeId,
        Self::String,
        Self::Ints,
        Self::Floats,
        Self::Strings,
        Self::Vector3,
        Self::Vector4,
        Self::Vector3s,
        Self::Vector4s,
    ];

    /// Name used in table names and diagnostics.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Index => "index",
            Self::NodeId => "node_id",
            Self::String => "string",
            Self::Ints => "ints",
            Self::Floats => "floats",
            Self::Strings => "strings",
            Self::Vector3 => "vector3",
            Self::Vector4 => "vector4",
            Self::Vector3s => "vector3s",
            Self::Vector4s => "vector4s",
        }
    }

    /// Parse a type from its name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.name() == name)
    }

    /// Convert from the persisted tag.
    pub const fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0 => Self::Int,
            1 => Self::Float,
            2 => Self::Index,
            3 => Self::NodeId,
            4 => Self::String,
            5 => Self::Ints,
            6 => Self::Floats,
            7 => Self::Strings,
            8 => Self::Vector3,
            9 => Self::Vector4,
            10 => Self::Vector3s,
            11 => Self::Vector4s,
            _ => return None,
        })
    }

    /// True for variable-length list types.
    #[inline]
    pub const fn is_list(self) -> bool {
        matches!(
            self,
            Self::Ints | Self::Floats | Self::Strings | Self::Vector3s | Self::Vector4s
        )
    }

    /// True for the integer-backed types.
    #[inline]
    pub const fn is_integer(self) -> bool {
        matches!(self, Self::Int | Self::Index | Self::NodeId)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_roundtrip() {
        for t in ValueType::ALL {
            assert_eq!(ValueType::from_name(t.name()), Some(t));
            assert_eq!(ValueType::from_u8(t as u8), Some(t));
        }
        assert_eq!(ValueType::from_name("double"), None);
        assert_eq!(ValueType::from_u8(200), None);
    }

    #[test]
    fn test_classification() {
        assert!(ValueType::Strings.is_list());
        assert!(!ValueType::Vector3.is_list());
        assert!(ValueType::NodeId.is_integer());
        assert!(!ValueType::Float.is_integer());
    }
}
