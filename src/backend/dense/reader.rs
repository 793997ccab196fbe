//! Dense container reader.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

#[cfg(feature = "mmap")]
use memmap2::Mmap;
use parking_lot::Mutex;

use super::codec;
use super::format::*;
use crate::backend::TableHeader;
use crate::core::Attributes;
use crate::util::{Error, Result};

/// Location and shape of one table inside a container.
#[derive(Clone, Debug)]
pub struct TableEntry {
    pub name: String,
    pub header: TableHeader,
    /// Position of the payload data block.
    pub payload: u64,
}

/// Random-access view of a container file.
/// Supports both memory-mapped and buffered I/O modes.
pub struct DenseReader {
    inner: ReaderInner,
    version: u16,
    size: u64,
}

enum ReaderInner {
    /// Memory-mapped file
    #[cfg(feature = "mmap")]
    Mmap(Mmap),
    /// Buffered file access
    File(Mutex<File>),
}

impl DenseReader {
    /// Open a container, memory-mapping it when `use_mmap` is set.
    pub fn open(path: &Path, use_mmap: bool) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;
        let size = file.metadata()?.len();
        if size < HEADER_SIZE as u64 {
            return Err(Error::corrupt(format!("file of {size} bytes has no header")));
        }

        let inner = Self::make_inner(file, use_mmap)?;
        let mut reader = Self {
            inner,
            version: 0,
            size,
        };

        let mut header = [0u8; HEADER_SIZE];
        reader.read_into(0, &mut header)?;
        reader.version = Self::parse_header(&header)?;
        Ok(reader)
    }

    #[cfg(feature = "mmap")]
    fn make_inner(file: File, use_mmap: bool) -> Result<ReaderInner> {
        if use_mmap {
            // Safety: the file is opened read-only and never written through
            // this mapping; flushes replace the file by rename.
            let mmap = unsafe { Mmap::map(&file) }?;
            Ok(ReaderInner::Mmap(mmap))
        } else {
            Ok(ReaderInner::File(Mutex::new(file)))
        }
    }

    #[cfg(not(feature = "mmap"))]
    fn make_inner(file: File, _use_mmap: bool) -> Result<ReaderInner> {
        Ok(ReaderInner::File(Mutex::new(file)))
    }

    /// Validate the header and return the container version.
    fn parse_header(data: &[u8]) -> Result<u16> {
        if &data[..MAGIC.len()] != MAGIC {
            return Err(Error::InvalidMagic);
        }
        if data[FROZEN_OFFSET] != FROZEN_FLAG {
            return Err(Error::corrupt("container was not completely written"));
        }
        let version = u16::from_le_bytes([data[VERSION_OFFSET], data[VERSION_OFFSET + 1]]);
        if version != CURRENT_VERSION {
            return Err(Error::UnsupportedVersion {
                expected: CURRENT_VERSION.to_string(),
                found: version.to_string(),
            });
        }
        Ok(version)
    }

    #[inline]
    pub fn version(&self) -> u16 {
        self.version
    }

    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Read bytes into an existing buffer.
    pub fn read_into(&self, pos: u64, buf: &mut [u8]) -> Result<()> {
        if pos
            .checked_add(buf.len() as u64)
            .map_or(true, |end| end > self.size)
        {
            return Err(Error::corrupt(format!("read past end of file at {pos}")));
        }

        match &self.inner {
            #[cfg(feature = "mmap")]
            ReaderInner::Mmap(mmap) => {
                let start = pos as usize;
                buf.copy_from_slice(&mmap[start..start + buf.len()]);
                Ok(())
            }
            ReaderInner::File(file) => {
                let mut f = file.lock();
                f.seek(SeekFrom::Start(pos))?;
                f.read_exact(buf)?;
                Ok(())
            }
        }
    }

    pub fn read_u64(&self, pos: u64) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.read_into(pos, &mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    /// Child offsets of the group at `pos`.
    pub fn read_group(&self, pos: u64) -> Result<Vec<u64>> {
        let count = self.read_u64(pos)?;
        if count.saturating_mul(8) > self.size {
            return Err(Error::corrupt(format!("group at {pos} claims {count} children")));
        }
        (0..count).map(|i| self.read_u64(pos + 8 + i * 8)).collect()
    }

    /// Bytes of the data block at `pos`.
    pub fn read_data(&self, pos: u64) -> Result<Vec<u8>> {
        let len = self.read_u64(pos)?;
        if len > self.size {
            return Err(Error::corrupt(format!("data block at {pos} claims {len} bytes")));
        }
        let mut buf = vec![0u8; len as usize];
        self.read_into(pos + 8, &mut buf)?;
        Ok(buf)
    }

    fn expect_data(offset: u64) -> Result<u64> {
        if is_data_offset(offset) {
            Ok(extract_offset(offset))
        } else {
            Err(Error::corrupt("expected a data block, found a group"))
        }
    }

    fn expect_group(offset: u64) -> Result<u64> {
        if is_data_offset(offset) {
            Err(Error::corrupt("expected a group, found a data block"))
        } else {
            Ok(extract_offset(offset))
        }
    }

    /// Read the attribute block and every table header. Payloads stay on disk.
    pub fn read_index(&self) -> Result<(Attributes, Vec<TableEntry>)> {
        let root = self.read_group(self.read_u64(ROOT_POS_OFFSET as u64)?)?;
        let (attrs, tables) = root
            .split_first()
            .ok_or_else(|| Error::corrupt("root group is empty"))?;

        let attributes = codec::decode_attributes(&self.read_data(Self::expect_data(*attrs)?)?)?;

        let mut entries = Vec::with_capacity(tables.len());
        for table in tables {
            let children = self.read_group(Self::expect_group(*table)?)?;
            if children.len() != TABLE_GROUP_CHILDREN {
                return Err(Error::corrupt(format!(
                    "table group with {} children",
                    children.len()
                )));
            }
            let (name, header) =
                codec::decode_header(&self.read_data(Self::expect_data(children[0])?)?)?;
            entries.push(TableEntry {
                name,
                header,
                payload: Self::expect_data(children[1])?,
            });
        }
        Ok((attributes, entries))
    }
}
