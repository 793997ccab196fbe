//! Growable dense rectangular array of cells.

use crate::util::{Error, Extent, Result, Value, ValueType};

/// A rectangular table of one value type, stored row-major.
///
/// Cells never written hold the null sentinel of the type. Growth preserves
/// existing cells; shrinking is supported only so backends can mirror an
/// explicit `set_size`.
#[derive(Clone, Debug, PartialEq)]
pub struct DenseArray {
    value_type: ValueType,
    extent: Extent,
    cells: Vec<Value>,
}

impl DenseArray {
    /// An empty array of the given rank.
    pub fn new(value_type: ValueType, rank: usize) -> Self {
        Self {
            value_type,
            extent: Extent::zeros(rank),
            cells: Vec::new(),
        }
    }

    /// Build from cells laid out row-major over `extent`.
    pub fn from_cells(value_type: ValueType, extent: Extent, cells: Vec<Value>) -> Result<Self> {
        if cells.len() != extent.num_cells() {
            return Err(Error::corrupt(format!(
                "table of extent {extent} holds {} cells",
                cells.len()
            )));
        }
        if let Some(bad) = cells.iter().find(|c| c.value_type() != value_type) {
            return Err(Error::corrupt(format!(
                "{} cell in a {value_type} table",
                bad.value_type()
            )));
        }
        Ok(Self {
            value_type,
            extent,
            cells,
        })
    }

    #[inline]
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    #[inline]
    pub fn extent(&self) -> &Extent {
        &self.extent
    }

    #[inline]
    pub fn rank(&self) -> usize {
        self.extent.rank()
    }

    /// All cells, row-major.
    #[inline]
    pub fn cells(&self) -> &[Value] {
        &self.cells
    }

    /// Read one cell; outside the extent reads null.
    pub fn get(&self, index: &[usize]) -> Value {
        match self.extent.linear(index) {
            Some(i) => self.cells[i].clone(),
            None => Value::null(self.value_type),
        }
    }

    /// Write one cell inside the extent.
    pub fn set(&mut self, index: &[usize], value: Value) -> Result<()> {
        self.check_type(&value)?;
        let i = self.extent.linear(index).ok_or_else(|| {
            Error::internal(format!("index {index:?} outside extent {}", self.extent))
        })?;
        self.cells[i] = value;
        Ok(())
    }

    /// Change the extent, keeping the overlapping region and null-filling the rest.
    pub fn resize(&mut self, extent: &Extent) -> Result<()> {
        if extent.rank() != self.rank() {
            return Err(Error::internal(format!(
                "cannot resize rank {} table to {extent}",
                self.rank()
            )));
        }
        if *extent == self.extent {
            return Ok(());
        }

        let null = Value::null(self.value_type);
        let mut cells = vec![null; extent.num_cells()];
        let overlap = Extent::from_slice(
            &self
                .extent
                .sizes()
                .iter()
                .zip(extent.sizes())
                .map(|(a, b)| *a.min(b))
                .collect::<Vec<_>>(),
        );
        let origin = vec![0; extent.rank()];
        let mut old = std::mem::take(&mut self.cells);
        for idx in Extent::block_indices(&origin, &overlap) {
            if let (Some(from), Some(to)) = (self.extent.linear(&idx), extent.linear(&idx)) {
                cells[to] = std::mem::replace(&mut old[from], Value::Int(0));
            }
        }

        self.cells = cells;
        self.extent = extent.clone();
        Ok(())
    }

    /// Read the block of `size` cells starting at `offset`, row-major.
    pub fn get_block(&self, offset: &[usize], size: &Extent) -> Vec<Value> {
        Extent::block_indices(offset, size)
            .map(|idx| self.get(&idx))
            .collect()
    }

    /// Write a block of cells. The block must lie inside the extent.
    pub fn set_block(&mut self, offset: &[usize], size: &Extent, values: Vec<Value>) -> Result<()> {
        if values.len() != size.num_cells() {
            return Err(Error::internal(format!(
                "block of extent {size} given {} values",
                values.len()
            )));
        }
        for (idx, value) in Extent::block_indices(offset, size).zip(values) {
            self.set(&idx, value)?;
        }
        Ok(())
    }

    fn check_type(&self, value: &Value) -> Result<()> {
        if value.value_type() == self.value_type {
            Ok(())
        } else {
            Err(Error::internal(format!(
                "writing {} into a {} table",
                value.value_type(),
                self.value_type
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_outside_is_null() {
        let a = DenseArray::new(ValueType::Float, 2);
        assert_eq!(a.get(&[3, 4]), Value::Float(f32::MAX));
    }

    #[test]
    fn test_resize_preserves() {
        let mut a = DenseArray::new(ValueType::Int, 2);
        a.resize(&Extent::d2(2, 2)).unwrap();
        a.set(&[0, 1], Value::Int(5)).unwrap();
        a.set(&[1, 0], Value::Int(7)).unwrap();
        a.resize(&Extent::d2(3, 4)).unwrap();
        assert_eq!(a.get(&[0, 1]), Value::Int(5));
        assert_eq!(a.get(&[1, 0]), Value::Int(7));
        assert_eq!(a.get(&[2, 3]), Value::Int(i32::MAX));
        assert_eq!(a.cells().len(), 12);
    }

    #[test]
    fn test_set_outside_fails() {
        let mut a = DenseArray::new(ValueType::Int, 1);
        assert!(a.set(&[0], Value::Int(1)).is_err());
        a.resize(&Extent::d1(1)).unwrap();
        assert!(a.set(&[0], Value::Float(1.0)).is_err());
        a.set(&[0], Value::Int(1)).unwrap();
    }

    #[test]
    fn test_blocks() {
        let mut a = DenseArray::new(ValueType::Index, 3);
        a.resize(&Extent::d3(2, 2, 3)).unwrap();
        let values = vec![Value::Index(1), Value::Index(2), Value::Index(3), Value::Index(4)];
        a.set_block(&[0, 0, 2], &Extent::d3(2, 2, 1), values.clone())
            .unwrap();
        assert_eq!(a.get(&[1, 0, 2]), Value::Index(3));
        assert_eq!(a.get_block(&[0, 0, 2], &Extent::d3(2, 2, 1)), values);
        assert_eq!(a.get(&[1, 0, 1]), Value::Index(-1));
    }
}
