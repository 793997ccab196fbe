//! Backend with no file behind it.

use super::{Backend, BackendKind, TableStore};
use crate::util::Result;

/// Tables kept in memory only. Buffers are serialized explicitly with the
/// record encoding.
#[derive(Debug, Default)]
pub struct BufferBackend {
    store: TableStore,
    read_only: bool,
}

impl BufferBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an already populated store.
    pub fn from_store(store: TableStore, read_only: bool) -> Self {
        Self { store, read_only }
    }
}

impl Backend for BufferBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Buffer
    }

    fn store(&self) -> &TableStore {
        &self.store
    }

    fn store_mut(&mut self) -> &mut TableStore {
        &mut self.store
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn flush(&mut self) -> Result<()> {
        self.store.mark_clean();
        Ok(())
    }
}
