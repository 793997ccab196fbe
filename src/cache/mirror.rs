//! In-memory copy of a rectangular table with a dirty bounding box.

use smallvec::SmallVec;

use crate::util::{Error, Extent, Result, TypeTraits, Value};

type Index = SmallVec<[usize; 3]>;

/// Half-open box `[lo, hi)` of cells written since the last flush.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct DirtyBox {
    lo: Index,
    hi: Index,
}

impl DirtyBox {
    fn at(index: &[usize]) -> Self {
        Self {
            lo: SmallVec::from_slice(index),
            hi: index.iter().map(|i| i + 1).collect(),
        }
    }

    fn include(&mut self, index: &[usize]) {
        for (d, &i) in index.iter().enumerate() {
            self.lo[d] = self.lo[d].min(i);
            self.hi[d] = self.hi[d].max(i + 1);
        }
    }

    /// Origin of the box.
    pub fn offset(&self) -> &[usize] {
        &self.lo
    }

    /// Size of the box.
    pub fn size(&self) -> Extent {
        Extent::from_slice(
            &self
                .lo
                .iter()
                .zip(&self.hi)
                .map(|(lo, hi)| hi - lo)
                .collect::<Index>(),
        )
    }
}

/// Cells of one table (or one frame slice of a table), row-major.
pub(crate) struct Mirror<T: TypeTraits> {
    extent: Extent,
    cells: Vec<T::Type>,
    dirty: Option<DirtyBox>,
}

impl<T: TypeTraits> Mirror<T> {
    pub fn new(rank: usize) -> Self {
        Self {
            extent: Extent::zeros(rank),
            cells: Vec::new(),
            dirty: None,
        }
    }

    /// Wrap cells read from a backend.
    pub fn from_values(extent: Extent, values: Vec<Value>) -> Result<Self> {
        if values.len() != extent.num_cells() {
            return Err(Error::internal(format!(
                "block of extent {extent} returned {} cells",
                values.len()
            )));
        }
        let cells = values
            .into_iter()
            .map(T::from_value)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            extent,
            cells,
            dirty: None,
        })
    }

    #[inline]
    pub fn extent(&self) -> &Extent {
        &self.extent
    }

    /// Read one cell; outside the extent reads null.
    pub fn get(&self, index: &[usize]) -> T::Type {
        match self.extent.linear(index) {
            Some(i) => self.cells[i].clone(),
            None => T::null(),
        }
    }

    /// Write one cell inside the extent.
    pub fn set(&mut self, index: &[usize], value: T::Type) -> Result<()> {
        let i = self.extent.linear(index).ok_or_else(|| {
            Error::internal(format!(
                "cache write at {index:?} outside extent {}",
                self.extent
            ))
        })?;
        self.cells[i] = value;
        match &mut self.dirty {
            Some(d) => d.include(index),
            None => self.dirty = Some(DirtyBox::at(index)),
        }
        Ok(())
    }

    /// Grow every axis to at least `extent`, null-filling new cells.
    pub fn grow(&mut self, extent: &Extent) -> Result<()> {
        if extent.rank() != self.extent.rank() {
            return Err(Error::internal(format!(
                "cannot grow rank {} mirror to {extent}",
                self.extent.rank()
            )));
        }
        let target = self.extent.max(extent);
        if target == self.extent {
            return Ok(());
        }

        let mut cells = vec![T::null(); target.num_cells()];
        let origin = vec![0; target.rank()];
        let mut old = std::mem::take(&mut self.cells);
        for idx in Extent::block_indices(&origin, &self.extent) {
            if let (Some(from), Some(to)) = (self.extent.linear(&idx), target.linear(&idx)) {
                cells[to] = std::mem::replace(&mut old[from], T::null());
            }
        }
        self.cells = cells;
        self.extent = target;
        Ok(())
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty.is_some()
    }

    /// Take the dirty box, leaving the mirror clean.
    pub fn take_dirty(&mut self) -> Option<DirtyBox> {
        self.dirty.take()
    }

    /// Cells of a block as backend values, row-major.
    pub fn block(&self, offset: &[usize], size: &Extent) -> Vec<Value> {
        Extent::block_indices(offset, size)
            .map(|idx| T::to_value(self.get(&idx)))
            .collect()
    }
}
