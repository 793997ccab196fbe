//! Dense container writer.
//!
//! Blocks are written bottom-up: table payloads and headers first, then each
//! table group, then the root group. The root position is patched into the
//! header last and the container is marked frozen.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};

use super::codec;
use super::format::*;
use crate::backend::{DenseArray, TableHeader};
use crate::core::{compress, Attributes};
use crate::util::Result;

/// Output stream for writing containers.
pub struct DenseWriter {
    writer: BufWriter<File>,
    pos: u64,
    compression: u32,
}

impl DenseWriter {
    /// Create a container file and write a provisional header.
    pub fn create(path: &Path, compression: u32) -> Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        let mut w = Self {
            writer: BufWriter::with_capacity(1024 * 1024, file),
            pos: 0,
            compression,
        };
        w.write_bytes(MAGIC)?;
        w.write_u8(NOT_FROZEN_FLAG)?;
        w.write_u8(0)?;
        w.write_u16(CURRENT_VERSION)?;
        w.write_u64(0)?; // Root position placeholder
        Ok(w)
    }

    /// Get the current write position.
    #[inline]
    pub fn pos(&self) -> u64 {
        self.pos
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.writer.write_all(data)?;
        self.pos += data.len() as u64;
        Ok(())
    }

    fn write_u64(&mut self, value: u64) -> Result<()> {
        self.writer.write_u64::<LittleEndian>(value)?;
        self.pos += 8;
        Ok(())
    }

    fn write_u16(&mut self, value: u16) -> Result<()> {
        self.writer.write_u16::<LittleEndian>(value)?;
        self.pos += 2;
        Ok(())
    }

    fn write_u8(&mut self, value: u8) -> Result<()> {
        self.writer.write_u8(value)?;
        self.pos += 1;
        Ok(())
    }

    /// Write a data block and return its child offset.
    pub fn write_data(&mut self, data: &[u8]) -> Result<u64> {
        let pos = self.pos;
        self.write_u64(data.len() as u64)?;
        self.write_bytes(data)?;
        Ok(make_data_offset(pos))
    }

    /// Write a group and return its child offset.
    pub fn write_group(&mut self, children: &[u64]) -> Result<u64> {
        let pos = self.pos;
        self.write_u64(children.len() as u64)?;
        for child in children {
            self.write_u64(*child)?;
        }
        Ok(make_group_offset(pos))
    }

    /// Write one table as a (header, payload) group.
    pub fn write_table(&mut self, name: &str, table: &DenseArray) -> Result<u64> {
        let header = TableHeader {
            value_type: table.value_type(),
            extent: table.extent().clone(),
        };
        let payload = compress(&codec::encode_cells(table.cells())?, self.compression)?;
        let payload = self.write_data(&payload)?;
        let header = self.write_data(&codec::encode_header(name, &header)?)?;
        self.write_group(&[header, payload])
    }

    /// Write the root group, patch the header and flush to disk.
    pub fn finish(mut self, attributes: &Attributes, tables: &[u64]) -> Result<()> {
        let attrs = self.write_data(&codec::encode_attributes(attributes)?)?;
        let mut children = Vec::with_capacity(tables.len() + 1);
        children.push(attrs);
        children.extend_from_slice(tables);
        let root = self.write_group(&children)?;

        self.writer.flush()?;
        self.writer.seek(SeekFrom::Start(ROOT_POS_OFFSET as u64))?;
        self.writer.write_u64::<LittleEndian>(extract_offset(root))?;
        self.writer.seek(SeekFrom::Start(FROZEN_OFFSET as u64))?;
        self.writer.write_u8(FROZEN_FLAG)?;
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        Ok(())
    }
}
