//! Write-back caches over backend tables.
//!
//! Every table the engine touches is mirrored in memory by exactly one
//! cache, so reads always observe earlier writes of the same process:
//!
//! - [`TableCache`] - 1-D and 2-D tables (name lists, node data, static data)
//! - [`FrameCache`] - 3-D per-frame tables, one frame slice resident
//!
//! [`Caches`] owns the data-table caches of one open file, keyed by table
//! name.

mod frame;
mod mirror;
mod table;

use std::any::Any;
use std::collections::HashMap;

pub use frame::FrameCache;
pub use table::TableCache;

use crate::backend::{Backend, SharedBackend};
use crate::util::{Error, Extent, Result, TypeTraits, Value};

/// Type-erased view of a cache, for flushing and frame changes.
pub trait ErasedCache: Any {
    fn flush(&mut self) -> Result<()>;

    /// Make `frame` the target of per-frame reads and writes.
    fn set_current_frame(&mut self, frame: Option<usize>) -> Result<()>;

    /// Frame extent including unflushed writes (0 for static tables).
    fn number_of_frames(&self) -> usize;

    /// Minimum frame extent used when a per-frame table grows.
    fn set_frames_hint(&mut self, _frames: usize) {}

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Read a block, cell by cell when the backend has no block transfer.
pub(crate) fn load_block(
    backend: &mut dyn Backend,
    name: &str,
    offset: &[usize],
    size: &Extent,
) -> Result<Vec<Value>> {
    if size.num_cells() == 0 {
        return Ok(Vec::new());
    }
    if backend.supports_blocks() {
        return backend.get_block(name, offset, size);
    }
    Extent::block_indices(offset, size)
        .map(|idx| backend.get_value(name, &idx))
        .collect()
}

/// Write a block, cell by cell when the backend has no block transfer.
pub(crate) fn write_block(
    backend: &mut dyn Backend,
    name: &str,
    offset: &[usize],
    size: &Extent,
    values: Vec<Value>,
) -> Result<()> {
    if backend.supports_blocks() {
        return backend.set_block(name, offset, size, values);
    }
    for (idx, value) in Extent::block_indices(offset, size).zip(values) {
        backend.set_value(name, &idx, value)?;
    }
    Ok(())
}

/// Data-table caches of one open file.
pub struct Caches {
    backend: SharedBackend,
    frame: Option<usize>,
    frames_hint: usize,
    tables: HashMap<String, Box<dyn ErasedCache>>,
}

impl Caches {
    pub fn new(backend: SharedBackend) -> Self {
        Self {
            backend,
            frame: None,
            frames_hint: 0,
            tables: HashMap::new(),
        }
    }

    /// Cache of a static table, created on first use.
    pub fn table<T: TypeTraits>(&mut self, name: &str, rank: usize) -> Result<&mut TableCache<T>> {
        if !self.tables.contains_key(name) {
            let mut cache = TableCache::<T>::new(self.backend.clone(), rank);
            cache.set(name)?;
            self.tables.insert(name.to_string(), Box::new(cache));
        }
        self.tables
            .get_mut(name)
            .and_then(|c| c.as_any_mut().downcast_mut::<TableCache<T>>())
            .ok_or_else(|| Error::internal(format!("table {name} cached as another type")))
    }

    /// Cache of a per-frame table, created on first use and positioned on
    /// the current frame.
    pub fn frame_table<T: TypeTraits>(&mut self, name: &str) -> Result<&mut FrameCache<T>> {
        if !self.tables.contains_key(name) {
            let mut cache = FrameCache::<T>::new(self.backend.clone());
            cache.set_frames_hint(self.frames_hint);
            cache.set(name)?;
            cache.set_current_frame(self.frame)?;
            self.tables.insert(name.to_string(), Box::new(cache));
        }
        self.tables
            .get_mut(name)
            .and_then(|c| c.as_any_mut().downcast_mut::<FrameCache<T>>())
            .ok_or_else(|| Error::internal(format!("table {name} cached as another type")))
    }

    /// Move every per-frame cache to `frame`, flushing the old slices.
    pub fn set_current_frame(&mut self, frame: Option<usize>) -> Result<()> {
        for cache in self.tables.values_mut() {
            cache.set_current_frame(frame)?;
        }
        self.frame = frame;
        Ok(())
    }

    /// Pre-size the frame axis of per-frame tables when they grow.
    pub fn set_frames_hint(&mut self, frames: usize) {
        self.frames_hint = frames;
        for cache in self.tables.values_mut() {
            cache.set_frames_hint(frames);
        }
    }

    /// Largest frame extent over the cached per-frame tables.
    pub fn number_of_frames(&self) -> usize {
        self.tables
            .values()
            .map(|c| c.number_of_frames())
            .max()
            .unwrap_or(0)
    }

    pub fn flush(&mut self) -> Result<()> {
        for cache in self.tables.values_mut() {
            cache.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::backend::{share, BackendKind, BufferBackend, TableStore};
    use crate::util::FloatTraits;

    /// Tables in memory, moved one cell at a time.
    struct CellBackend {
        inner: BufferBackend,
        cells: Rc<Cell<usize>>,
    }

    impl Backend for CellBackend {
        fn kind(&self) -> BackendKind {
            BackendKind::Buffer
        }

        fn store(&self) -> &TableStore {
            self.inner.store()
        }

        fn store_mut(&mut self) -> &mut TableStore {
            self.inner.store_mut()
        }

        fn is_read_only(&self) -> bool {
            false
        }

        fn flush(&mut self) -> Result<()> {
            self.inner.flush()
        }

        fn get_value(&mut self, name: &str, index: &[usize]) -> Result<Value> {
            self.cells.set(self.cells.get() + 1);
            self.inner.get_value(name, index)
        }

        fn set_value(&mut self, name: &str, index: &[usize], value: Value) -> Result<()> {
            self.cells.set(self.cells.get() + 1);
            self.inner.set_value(name, index, value)
        }

        fn supports_blocks(&self) -> bool {
            false
        }

        fn get_block(&mut self, _: &str, _: &[usize], _: &Extent) -> Result<Vec<Value>> {
            Err(Error::internal("block read on a cell backend"))
        }

        fn set_block(&mut self, _: &str, _: &[usize], _: &Extent, _: Vec<Value>) -> Result<()> {
            Err(Error::internal("block write on a cell backend"))
        }
    }

    fn cell_backend() -> (SharedBackend, Rc<Cell<usize>>) {
        let cells = Rc::new(Cell::new(0));
        let backend = CellBackend {
            inner: BufferBackend::new(),
            cells: cells.clone(),
        };
        (share(Box::new(backend)), cells)
    }

    #[test]
    fn test_table_cache_without_blocks() {
        let (backend, cells) = cell_backend();
        {
            let mut cache = TableCache::<FloatTraits>::new(backend.clone(), 2);
            cache.set("t").unwrap();
            cache.fit(&[1, 2]).unwrap();
            cache.set_value(&[0, 1], 1.5).unwrap();
            cache.set_value(&[1, 2], 2.5).unwrap();
            cache.flush().unwrap();
        }
        // Dirty box [0..2) x [1..3).
        assert_eq!(cells.get(), 4);
        assert_eq!(
            backend.borrow_mut().get_value("t", &[1, 2]).unwrap(),
            Value::Float(2.5)
        );

        cells.set(0);
        let mut cache = TableCache::<FloatTraits>::new(backend.clone(), 2);
        cache.set("t").unwrap();
        assert_eq!(cells.get(), 6);
        assert_eq!(cache.get_value(&[0, 1]), 1.5);
        assert_eq!(cache.get_value(&[1, 2]), 2.5);
        assert_eq!(cache.get_value(&[0, 0]), f32::MAX);
    }

    #[test]
    fn test_frame_cache_without_blocks() {
        let (backend, cells) = cell_backend();
        let mut cache = FrameCache::<FloatTraits>::new(backend.clone());
        cache.set("t_per_frame").unwrap();
        cache.set_current_frame(Some(0)).unwrap();
        cache.fit(1, 0).unwrap();
        cache.set_value(&[1, 0], 3.0).unwrap();
        cache.set_current_frame(Some(1)).unwrap();
        cache.fit(0, 0).unwrap();
        cache.set_value(&[0, 0], 4.0).unwrap();
        cache.flush().unwrap();
        assert!(cells.get() > 0);

        cache.set_current_frame(Some(0)).unwrap();
        assert_eq!(cache.get_value(&[1, 0]), 3.0);
        assert_eq!(cache.get_value(&[0, 0]), f32::MAX);
        assert_eq!(cache.get_frame_value(0, 0, 1).unwrap(), 4.0);
        assert_eq!(
            backend.borrow_mut().get_value("t_per_frame", &[1, 0, 0]).unwrap(),
            Value::Float(3.0)
        );
    }
}
