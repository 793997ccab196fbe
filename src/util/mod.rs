//! Utility types used throughout the store.
//!
//! - [`ValueType`] / [`Value`] - primitive types and dynamic cells
//! - [`TypeTraits`] - typed view of a primitive type (null sentinel, codec)
//! - [`Extent`] - table shapes
//! - [`Error`] / [`Result`] - error handling

mod error;
mod extent;
mod traits;
mod value;
mod value_type;

pub use error::*;
pub use extent::*;
pub use traits::*;
pub use value::*;
pub use value_type::*;
