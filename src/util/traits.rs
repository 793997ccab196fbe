//! Compile-time type traits for attribute values.
//!
//! Each primitive [`ValueType`] has a zero-sized marker implementing
//! [`TypeTraits`]. The marker fixes the Rust representation of the values,
//! their null sentinel and the conversion to and from backend [`Value`]s.

use std::fmt;

use glam::{Vec3, Vec4};

use super::{Error, Result, Value, ValueType};
use crate::core::NodeId;

/// Behavior shared by every storable type.
pub trait TypeTraits: 'static {
    /// Rust representation of a value.
    type Type: Clone + PartialEq + fmt::Debug + 'static;

    /// Runtime tag of this type.
    const VALUE_TYPE: ValueType;

    /// The null sentinel.
    fn null() -> Self::Type;

    /// True if `v` is the null sentinel.
    fn is_null(v: &Self::Type) -> bool;

    /// Wrap into a backend cell.
    fn to_value(v: Self::Type) -> Value;

    /// Unwrap a backend cell.
    fn from_value(v: Value) -> Result<Self::Type>;

    /// Type name.
    #[inline]
    fn name() -> &'static str {
        Self::VALUE_TYPE.name()
    }
}

fn mismatch<T: TypeTraits>(found: &Value) -> Error {
    Error::internal(format!(
        "expected {} cell, backend returned {}",
        T::name(),
        found.value_type()
    ))
}

macro_rules! simple_traits {
    ($marker:ident, $ty:ty, $variant:ident, $null:expr, |$v:ident| $is_null:expr) => {
        #[doc = concat!("Traits of `", stringify!($variant), "` values.")]
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
        pub struct $marker;

        impl TypeTraits for $marker {
            type Type = $ty;
            const VALUE_TYPE: ValueType = ValueType::$variant;

            #[inline]
            fn null() -> $ty {
                $null
            }

            #[inline]
            fn is_null($v: &$ty) -> bool {
                $is_null
            }

            #[inline]
            fn to_value(v: $ty) -> Value {
                Value::$variant(v)
            }

            fn from_value(v: Value) -> Result<$ty> {
                match v {
                    Value::$variant(x) => Ok(x),
                    other => Err(mismatch::<Self>(&other)),
                }
            }
        }
    };
}

simple_traits!(IntTraits, i32, Int, i32::MAX, |v| *v == i32::MAX);
simple_traits!(FloatTraits, f32, Float, f32::MAX, |v| *v == f32::MAX);
simple_traits!(IndexTraits, i32, Index, -1, |v| *v < 0);
simple_traits!(StringTraits, String, String, String::new(), |v| v.is_empty());
simple_traits!(IntsTraits, Vec<i32>, Ints, Vec::new(), |v| v.is_empty());
simple_traits!(FloatsTraits, Vec<f32>, Floats, Vec::new(), |v| v.is_empty());
simple_traits!(StringsTraits, Vec<String>, Strings, Vec::new(), |v| v.is_empty());
simple_traits!(Vector3Traits, Vec3, Vector3, Vec3::splat(f32::MAX), |v| v
    .to_array()
    .iter()
    .all(|c| *c == f32::MAX));
simple_traits!(Vector4Traits, Vec4, Vector4, Vec4::splat(f32::MAX), |v| v
    .to_array()
    .iter()
    .all(|c| *c == f32::MAX));
simple_traits!(Vector3sTraits, Vec<Vec3>, Vector3s, Vec::new(), |v| v.is_empty());
simple_traits!(Vector4sTraits, Vec<Vec4>, Vector4s, Vec::new(), |v| v.is_empty());

/// Traits of node references. Stored as a signed index, null is -1.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct NodeIdTraits;

impl TypeTraits for NodeIdTraits {
    type Type = NodeId;
    const VALUE_TYPE: ValueType = ValueType::NodeId;

    #[inline]
    fn null() -> NodeId {
        NodeId::INVALID
    }

    #[inline]
    fn is_null(v: &NodeId) -> bool {
        *v == NodeId::INVALID
    }

    #[inline]
    fn to_value(v: NodeId) -> Value {
        Value::NodeId(v.to_i32())
    }

    fn from_value(v: Value) -> Result<NodeId> {
        match v {
            Value::NodeId(x) => Ok(NodeId::from_i32(x)),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}
