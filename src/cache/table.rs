//! Write-back mirror of a 1-D or 2-D table.

use super::mirror::Mirror;
use super::{load_block, write_block, ErasedCache};
use crate::backend::SharedBackend;
use crate::util::{Error, Extent, Result, TypeTraits};

/// Mirror of one backend table of rank 1 or 2.
///
/// Reads and writes go to memory; [`flush`](Self::flush) writes the dirty
/// bounding box back. 1-D tables grow the backend as soon as they grow, 2-D
/// tables only on flush.
pub struct TableCache<T: TypeTraits> {
    backend: SharedBackend,
    rank: usize,
    name: Option<String>,
    /// The backend table exists.
    exists: bool,
    /// Extent of the backend table as last written or read.
    backend_extent: Extent,
    mirror: Mirror<T>,
}

impl<T: TypeTraits> TableCache<T> {
    pub fn new(backend: SharedBackend, rank: usize) -> Self {
        Self {
            backend,
            rank,
            name: None,
            exists: false,
            backend_extent: Extent::zeros(rank),
            mirror: Mirror::new(rank),
        }
    }

    /// Bind to a backend table, loading its cells.
    ///
    /// A missing table is created on the first flush that has something to
    /// write.
    pub fn set(&mut self, name: &str) -> Result<()> {
        if self.name.as_deref() == Some(name) {
            return Ok(());
        }
        self.flush()?;

        let mut backend = self.backend.borrow_mut();
        if backend.has_table(name) {
            match backend.table_type(name) {
                Some((vt, rank)) if vt == T::VALUE_TYPE && rank == self.rank => {}
                other => {
                    return Err(Error::corrupt(format!(
                        "table {name} is {other:?}, expected rank {} {}",
                        self.rank,
                        T::name()
                    )))
                }
            }
            let extent = backend.get_size(name)?;
            let origin = vec![0; self.rank];
            let values = load_block(&mut **backend, name, &origin, &extent)?;
            self.mirror = Mirror::from_values(extent.clone(), values)?;
            self.backend_extent = extent;
            self.exists = true;
        } else {
            self.mirror = Mirror::new(self.rank);
            self.backend_extent = Extent::zeros(self.rank);
            self.exists = false;
        }
        self.name = Some(name.to_string());
        Ok(())
    }

    /// Bound table name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Extent of the mirror.
    pub fn get_size(&self) -> &Extent {
        self.mirror.extent()
    }

    pub fn get_value(&self, index: &[usize]) -> T::Type {
        self.mirror.get(index)
    }

    pub fn set_value(&mut self, index: &[usize], value: T::Type) -> Result<()> {
        self.mirror.set(index, value)
    }

    /// Grow to at least `extent`. Never shrinks.
    pub fn set_size(&mut self, extent: &Extent) -> Result<()> {
        self.mirror.grow(extent)?;
        if self.rank == 1 && *self.mirror.extent() != self.backend_extent {
            self.resize_backend()?;
        }
        Ok(())
    }

    /// Grow so that `index` lies inside the table.
    pub fn fit(&mut self, index: &[usize]) -> Result<()> {
        let needed: Vec<usize> = index.iter().map(|i| i + 1).collect();
        self.set_size(&Extent::from_slice(&needed))
    }

    /// Write the dirty box (and any pending growth) to the backend.
    pub fn flush(&mut self) -> Result<()> {
        let grown = *self.mirror.extent() != self.backend_extent;
        if !self.mirror.is_dirty() && !grown {
            return Ok(());
        }
        if grown {
            self.resize_backend()?;
        }
        if let Some(dirty) = self.mirror.take_dirty() {
            let name = self.bound_name()?;
            let size = dirty.size();
            let values = self.mirror.block(dirty.offset(), &size);
            tracing::trace!(table = name, offset = ?dirty.offset(), %size, "flush table cache");
            write_block(
                &mut **self.backend.borrow_mut(),
                name,
                dirty.offset(),
                &size,
                values,
            )?;
        }
        Ok(())
    }

    /// Flush, then forget the cells and the binding and move to `backend`.
    pub fn reset(&mut self, backend: SharedBackend) -> Result<()> {
        self.flush()?;
        self.backend = backend;
        self.name = None;
        self.exists = false;
        self.backend_extent = Extent::zeros(self.rank);
        self.mirror = Mirror::new(self.rank);
        Ok(())
    }

    fn bound_name(&self) -> Result<&str> {
        self.name
            .as_deref()
            .ok_or_else(|| Error::internal("table cache used before set()"))
    }

    fn resize_backend(&mut self) -> Result<()> {
        let name = self.bound_name()?.to_string();
        let mut backend = self.backend.borrow_mut();
        if !self.exists {
            backend.create_table(&name, T::VALUE_TYPE, self.rank)?;
            self.exists = true;
        }
        backend.set_size(&name, self.mirror.extent())?;
        self.backend_extent = self.mirror.extent().clone();
        Ok(())
    }
}

impl<T: TypeTraits> ErasedCache for TableCache<T> {
    fn flush(&mut self) -> Result<()> {
        TableCache::flush(self)
    }

    fn set_current_frame(&mut self, _frame: Option<usize>) -> Result<()> {
        Ok(())
    }

    fn number_of_frames(&self) -> usize {
        0
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

impl<T: TypeTraits> Drop for TableCache<T> {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            tracing::error!(table = ?self.name, error = %e, "failed to flush table cache");
        }
    }
}
