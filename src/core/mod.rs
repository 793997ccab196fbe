//! Core layer - identifiers, persisted naming and shared codecs.
//!
//! This module provides:
//! - [`NodeId`], [`NodeType`], [`Category`], [`Key`], [`FrameId`], [`SetId`]
//! - [`names`] - table names, node-data column layout and name audits
//! - [`Attributes`] - container-level string attributes
//! - zlib block compression used by the dense container

mod attributes;
mod compression;
mod ids;
pub mod names;

pub use attributes::Attributes;
pub use compression::{compress, decompress};
pub use ids::*;
