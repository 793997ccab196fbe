//! Shape of dense tables.
//!
//! Tables are rectangular with rank 1 (lists), 2 (static data, node data)
//! or 3 (per-frame data). Cells are laid out row-major.

use std::fmt;

use smallvec::SmallVec;

/// Extent of a rectangular table.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Extent {
    /// Size of each dimension.
    dims: SmallVec<[usize; 3]>,
}

impl Extent {
    /// An all-zero extent of the given rank.
    pub fn zeros(rank: usize) -> Self {
        Self {
            dims: smallvec::smallvec![0; rank],
        }
    }

    /// 1D extent.
    pub fn d1(size: usize) -> Self {
        Self {
            dims: smallvec::smallvec![size],
        }
    }

    /// 2D extent.
    pub fn d2(rows: usize, cols: usize) -> Self {
        Self {
            dims: smallvec::smallvec![rows, cols],
        }
    }

    /// 3D extent.
    pub fn d3(rows: usize, cols: usize, frames: usize) -> Self {
        Self {
            dims: smallvec::smallvec![rows, cols, frames],
        }
    }

    /// Create from a slice of sizes.
    pub fn from_slice(sizes: &[usize]) -> Self {
        Self {
            dims: SmallVec::from_slice(sizes),
        }
    }

    /// Number of dimensions.
    #[inline]
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Size of one dimension, 0 when out of range.
    #[inline]
    pub fn size(&self, dim: usize) -> usize {
        self.dims.get(dim).copied().unwrap_or(0)
    }

    /// All sizes.
    #[inline]
    pub fn sizes(&self) -> &[usize] {
        &self.dims
    }

    /// Total number of cells.
    pub fn num_cells(&self) -> usize {
        self.dims.iter().product()
    }

    /// Set the size of one dimension.
    pub fn set_size(&mut self, dim: usize, size: usize) {
        if dim < self.dims.len() {
            self.dims[dim] = size;
        }
    }

    /// True if `index` lies inside this extent.
    pub fn contains(&self, index: &[usize]) -> bool {
        index.len() == self.dims.len() && index.iter().zip(&self.dims).all(|(i, d)| i < d)
    }

    /// Row-major linear offset of `index`, or None when outside.
    pub fn linear(&self, index: &[usize]) -> Option<usize> {
        if !self.contains(index) {
            return None;
        }
        Some(
            index
                .iter()
                .zip(&self.dims)
                .fold(0usize, |acc, (i, d)| acc * d + i),
        )
    }

    /// Component-wise maximum of two extents of equal rank.
    pub fn max(&self, other: &Extent) -> Extent {
        Self {
            dims: self
                .dims
                .iter()
                .zip(&other.dims)
                .map(|(a, b)| *a.max(b))
                .collect(),
        }
    }

    /// Iterate over every index inside `size` shifted by `offset`, row-major.
    pub fn block_indices<'a>(
        offset: &'a [usize],
        size: &'a Extent,
    ) -> impl Iterator<Item = SmallVec<[usize; 3]>> + 'a {
        (0..size.num_cells()).map(move |mut n| {
            let mut idx: SmallVec<[usize; 3]> = smallvec::smallvec![0; size.rank()];
            for d in (0..size.rank()).rev() {
                let s = size.size(d);
                idx[d] = offset.get(d).copied().unwrap_or(0) + n % s;
                n /= s;
            }
            idx
        })
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, "x")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extent_basics() {
        let e = Extent::d3(2, 3, 4);
        assert_eq!(e.rank(), 3);
        assert_eq!(e.num_cells(), 24);
        assert_eq!(e.size(1), 3);
        assert_eq!(e.size(7), 0);
        assert_eq!(e.to_string(), "[2x3x4]");
        assert_eq!(Extent::zeros(2), Extent::d2(0, 0));
    }

    #[test]
    fn test_linear() {
        let e = Extent::d2(3, 4);
        assert_eq!(e.linear(&[0, 0]), Some(0));
        assert_eq!(e.linear(&[1, 2]), Some(6));
        assert_eq!(e.linear(&[2, 3]), Some(11));
        assert_eq!(e.linear(&[3, 0]), None);
        assert_eq!(e.linear(&[0]), None);
    }

    #[test]
    fn test_block_indices() {
        let size = Extent::d2(2, 2);
        let idx: Vec<Vec<usize>> = Extent::block_indices(&[1, 3], &size)
            .map(|i| i.to_vec())
            .collect();
        assert_eq!(idx, vec![vec![1, 3], vec![1, 4], vec![2, 3], vec![2, 4]]);
    }

    #[test]
    fn test_max() {
        let a = Extent::d2(5, 1);
        let b = Extent::d2(2, 3);
        assert_eq!(a.max(&b), Extent::d2(5, 3));
    }
}
