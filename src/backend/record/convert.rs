//! Reading containers written under the historical schema.

use super::container;
use super::legacy;
use super::schema::{self, Frame, KeyInfo, TypeDatas};
use crate::util::{Error, Result};

/// Decode a record container, transcoding historical containers.
///
/// The container is first read under the current schema. Only when that
/// fails with a schema mismatch is it read again under the historical schema
/// and upgraded record by record.
pub fn read_frames(bytes: &[u8]) -> Result<Vec<Frame>> {
    match container::read_records::<Frame>(bytes, schema::SCHEMA_ID) {
        Err(Error::SchemaMismatch { expected, found }) => {
            let frames = legacy::decode_container(bytes).map_err(|e| {
                Error::corrupt(format!(
                    "not a {expected} container (found {found}), and reading it as {}: {e}",
                    legacy::SCHEMA_ID
                ))
            })?;
            tracing::info!(
                from = legacy::SCHEMA_ID,
                to = schema::SCHEMA_ID,
                records = frames.len(),
                "transcoding record container"
            );
            Ok(frames.into_iter().map(upgrade_frame).collect())
        }
        other => other,
    }
}

/// Map a historical record onto the current schema, field for field.
pub fn upgrade_frame(frame: legacy::Frame) -> Frame {
    let data = frame.data;
    Frame {
        info: frame.info.into(),
        nodes: frame.nodes.into_iter().map(Into::into).collect(),
        keys: frame
            .keys
            .into_iter()
            .map(|k| KeyInfo {
                id: k.id,
                name: k.name,
                category: k.category,
                key_type: k.key_type.into(),
                per_frame: k.per_frame,
            })
            .collect(),
        data: TypeDatas {
            int_data: data.int_data,
            float_data: data.float_data,
            string_data: data.string_data,
            vector3_data: data.vector3_data,
            vector4_data: data.vector4_data,
            ints_data: data.ints_data,
            floats_data: data.floats_data,
            strings_data: data.strings_data,
            vector3s_data: data.vector3s_data,
            vector4s_data: Vec::new(),
            index_data: Vec::new(),
            node_id_data: Vec::new(),
        },
    }
}
