//! # RMF
//!
//! Hierarchical frame-based attribute store.
//!
//! A file holds a tree of named nodes and typed attributes grouped into
//! categories. Each attribute is either static (one value per node) or
//! per-frame (one value per node and frame). Files live in one of two
//! containers: a dense array container (`.rmf`) or a compact record
//! container (`.rmfz`). Record containers written under the previous schema
//! are transcoded on open.
//!
//! ## Modules
//!
//! - [`util`] - Value types, type traits, extents, errors
//! - [`core`] - Identifiers, persisted names, attributes, compression
//! - [`backend`] - Physical containers (dense, record, in-memory)
//! - [`cache`] - Write-back table caches
//! - [`shared`] - The store engine ([`SharedData`])
//!
//! ## Example
//!
//! ```ignore
//! use rmf::prelude::*;
//!
//! let mut file = SharedData::create("trajectory.rmf")?;
//! let atom = file.add_child(NodeId::ROOT, "atom0", NodeType::Representation)?;
//! let physics = file.get_category("physics")?;
//! let x = file.get_key::<FloatTraits>(physics, "x")?;
//!
//! file.set_current_frame(FrameId(0))?;
//! file.set_value(atom, x, 1.5)?;
//! file.close()?;
//! ```

pub mod backend;
pub mod cache;
pub mod core;
pub mod shared;
pub mod util;

// Re-export commonly used types
pub use shared::{OpenOptions, SharedData};
pub use util::{Error, ErrorKind, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::backend::BackendKind;
    pub use crate::core::{Category, FrameId, Key, NodeId, NodeType, SetId};
    pub use crate::shared::{OpenOptions, SharedData};
    pub use crate::util::{
        Error, ErrorKind, FloatTraits, FloatsTraits, IndexTraits, IntTraits, IntsTraits,
        NodeIdTraits, Result, StringTraits, StringsTraits, TypeTraits, Value, ValueType,
        Vector3Traits, Vector3sTraits, Vector4Traits, Vector4sTraits,
    };
}
