//! Physical storage backends.
//!
//! Every backend presents the same model: named rectangular tables of one
//! value type and rank, plus string attributes on the container root. The
//! engine never learns which backend it talks to.
//!
//! - [`DenseBackend`] - group/data container with lazily loaded, zlib
//!   compressed tables
//! - [`RecordBackend`] - whole-frame records under a versioned schema
//! - [`BufferBackend`] - in-memory only

mod array;
mod buffer;
pub mod dense;
pub mod record;
mod store;

use std::cell::RefCell;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::rc::Rc;

pub use array::DenseArray;
pub use buffer::BufferBackend;
pub use dense::DenseBackend;
pub use record::RecordBackend;
pub use store::{TableHeader, TableStore};

use crate::util::{Error, Extent, Result, Value, ValueType};

/// Handle shared by the engine and its caches.
pub type SharedBackend = Rc<RefCell<Box<dyn Backend>>>;

/// Which container implementation backs a file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Dense,
    Record,
    Buffer,
}

impl BackendKind {
    /// Backend chosen for a new file: `.rmfz` selects records, anything
    /// else the dense container.
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("rmfz") => Self::Record,
            _ => Self::Dense,
        }
    }

    /// Backend that wrote a container, from its magic bytes.
    pub fn detect(magic: &[u8]) -> Result<Self> {
        if magic.starts_with(dense::format::MAGIC) {
            Ok(Self::Dense)
        } else if magic.starts_with(record::container::MAGIC) {
            Ok(Self::Record)
        } else {
            Err(Error::InvalidMagic)
        }
    }

    /// Read the magic bytes of an existing file.
    pub fn detect_file(path: &Path) -> Result<Self> {
        let mut file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;
        let mut magic = [0u8; 4];
        file.read_exact(&mut magic).map_err(|_| Error::InvalidMagic)?;
        Self::detect(&magic)
    }
}

/// A physical container of named tables.
///
/// Implementors supply the table store and persistence; table operations are
/// provided on top of the store. Reads take `&mut self` because tables may be
/// loaded lazily.
pub trait Backend {
    /// Which implementation this is.
    fn kind(&self) -> BackendKind;

    /// The in-memory tables.
    fn store(&self) -> &TableStore;

    /// The in-memory tables, for writing.
    fn store_mut(&mut self) -> &mut TableStore;

    /// True if writes are rejected.
    fn is_read_only(&self) -> bool;

    /// File behind this backend, if any.
    fn path(&self) -> Option<&Path> {
        None
    }

    /// Load the cells of a pending table.
    fn load_table(&mut self, _name: &str) -> Result<()> {
        Ok(())
    }

    /// Persist every change.
    fn flush(&mut self) -> Result<()>;

    // ========================================================================
    // Provided table operations
    // ========================================================================

    fn check_writable(&self) -> Result<()> {
        if self.is_read_only() {
            Err(Error::ReadOnly)
        } else {
            Ok(())
        }
    }

    fn has_table(&self, name: &str) -> bool {
        self.store().has_table(name)
    }

    /// Names of every table (the children of the container root).
    fn table_names(&self) -> Vec<String> {
        self.store().table_names()
    }

    /// Value type and rank of a table.
    fn table_type(&self, name: &str) -> Option<(ValueType, usize)> {
        self.store()
            .header(name)
            .map(|h| (h.value_type, h.extent.rank()))
    }

    fn create_table(&mut self, name: &str, value_type: ValueType, rank: usize) -> Result<()> {
        self.check_writable()?;
        self.store_mut().create(name, value_type, rank)
    }

    fn get_size(&mut self, name: &str) -> Result<Extent> {
        self.store()
            .header(name)
            .map(|h| h.extent)
            .ok_or_else(|| Error::internal(format!("no table named {name}")))
    }

    fn set_size(&mut self, name: &str, extent: &Extent) -> Result<()> {
        self.check_writable()?;
        self.load_table(name)?;
        self.store_mut().table_mut(name)?.resize(extent)
    }

    fn get_value(&mut self, name: &str, index: &[usize]) -> Result<Value> {
        self.load_table(name)?;
        Ok(self.store().table(name)?.get(index))
    }

    fn set_value(&mut self, name: &str, index: &[usize], value: Value) -> Result<()> {
        self.check_writable()?;
        self.load_table(name)?;
        self.store_mut().table_mut(name)?.set(index, value)
    }

    /// True if whole blocks can be transferred in one call.
    fn supports_blocks(&self) -> bool {
        true
    }

    fn get_block(&mut self, name: &str, offset: &[usize], size: &Extent) -> Result<Vec<Value>> {
        self.load_table(name)?;
        Ok(self.store().table(name)?.get_block(offset, size))
    }

    fn set_block(
        &mut self,
        name: &str,
        offset: &[usize],
        size: &Extent,
        values: Vec<Value>,
    ) -> Result<()> {
        self.check_writable()?;
        self.load_table(name)?;
        self.store_mut()
            .table_mut(name)?
            .set_block(offset, size, values)
    }

    fn get_attribute(&self, name: &str) -> Option<String> {
        self.store().get_attribute(name).map(str::to_string)
    }

    fn set_attribute(&mut self, name: &str, value: &str) -> Result<()> {
        self.check_writable()?;
        self.store_mut().set_attribute(name, value);
        Ok(())
    }
}

/// Wrap a backend for sharing with caches.
pub fn share(backend: Box<dyn Backend>) -> SharedBackend {
    Rc::new(RefCell::new(backend))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_kind_for_path() {
        assert_eq!(
            BackendKind::for_path(&PathBuf::from("a/b.rmfz")),
            BackendKind::Record
        );
        assert_eq!(
            BackendKind::for_path(&PathBuf::from("a/b.rmf")),
            BackendKind::Dense
        );
        assert_eq!(BackendKind::for_path(&PathBuf::from("noext")), BackendKind::Dense);
    }

    #[test]
    fn test_detect_magic() {
        assert_eq!(BackendKind::detect(b"RMFd\0\0").unwrap(), BackendKind::Dense);
        assert_eq!(BackendKind::detect(b"RMFr").unwrap(), BackendKind::Record);
        assert!(matches!(BackendKind::detect(b"HDF5"), Err(Error::InvalidMagic)));
    }

    #[test]
    fn test_provided_operations_over_buffer() {
        let mut b = BufferBackend::new();
        b.create_table("t", ValueType::Float, 2).unwrap();
        b.set_size("t", &Extent::d2(2, 3)).unwrap();
        b.set_value("t", &[1, 2], Value::Float(0.5)).unwrap();
        assert_eq!(b.get_value("t", &[1, 2]).unwrap(), Value::Float(0.5));
        assert_eq!(b.get_value("t", &[0, 0]).unwrap(), Value::Float(f32::MAX));
        assert_eq!(b.table_type("t"), Some((ValueType::Float, 2)));
        assert_eq!(b.get_size("t").unwrap(), Extent::d2(2, 3));
        assert!(b.get_value("missing", &[0]).is_err());
    }
}
