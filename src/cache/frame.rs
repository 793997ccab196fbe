//! Write-back cache of a per-frame table with one frame resident.

use super::mirror::Mirror;
use super::{load_block, write_block, ErasedCache};
use crate::backend::SharedBackend;
use crate::util::{Error, Extent, Result, TypeTraits};

/// Mirror of a 3-D `[row][key][frame]` table.
///
/// Only the slice of the current frame is kept in memory. Changing the
/// frame flushes the slice and loads the next one; reads of other frames go
/// straight to the backend. Writes are only accepted for the current frame.
pub struct FrameCache<T: TypeTraits> {
    backend: SharedBackend,
    name: Option<String>,
    exists: bool,
    /// Extent of the backend table as last written or read.
    backend_extent: Extent,
    frame: Option<usize>,
    slice: Mirror<T>,
    frames_hint: usize,
}

impl<T: TypeTraits> FrameCache<T> {
    pub fn new(backend: SharedBackend) -> Self {
        Self {
            backend,
            name: None,
            exists: false,
            backend_extent: Extent::zeros(3),
            frame: None,
            slice: Mirror::new(2),
            frames_hint: 0,
        }
    }

    /// Bind to a backend table. The current frame, if any, is reloaded from it.
    pub fn set(&mut self, name: &str) -> Result<()> {
        if self.name.as_deref() == Some(name) {
            return Ok(());
        }
        self.flush()?;

        {
            let mut backend = self.backend.borrow_mut();
            if backend.has_table(name) {
                match backend.table_type(name) {
                    Some((vt, 3)) if vt == T::VALUE_TYPE => {}
                    other => {
                        return Err(Error::corrupt(format!(
                            "table {name} is {other:?}, expected rank 3 {}",
                            T::name()
                        )))
                    }
                }
                self.backend_extent = backend.get_size(name)?;
                self.exists = true;
            } else {
                self.backend_extent = Extent::zeros(3);
                self.exists = false;
            }
        }
        self.name = Some(name.to_string());
        self.load_slice()
    }

    /// Loaded frame.
    pub fn current_frame(&self) -> Option<usize> {
        self.frame
    }

    /// Flush the loaded slice and load `frame`.
    pub fn set_current_frame(&mut self, frame: Option<usize>) -> Result<()> {
        if frame == self.frame {
            return Ok(());
        }
        self.flush()?;
        self.frame = frame;
        self.load_slice()
    }

    pub fn set_frames_hint(&mut self, frames: usize) {
        self.frames_hint = frames;
    }

    /// Extent including unflushed growth.
    pub fn get_size(&self) -> Extent {
        let slice = self.slice.extent();
        let written = match self.frame {
            Some(f) if self.slice.is_dirty() => f + 1,
            _ => 0,
        };
        Extent::d3(
            self.backend_extent.size(0).max(slice.size(0)),
            self.backend_extent.size(1).max(slice.size(1)),
            self.backend_extent.size(2).max(written),
        )
    }

    /// Read `[row, key]` of the loaded frame.
    pub fn get_value(&self, index: &[usize]) -> T::Type {
        self.slice.get(index)
    }

    /// Read `[row, key]` of any frame.
    pub fn get_frame_value(&self, row: usize, key: usize, frame: usize) -> Result<T::Type> {
        if self.frame == Some(frame) {
            return Ok(self.slice.get(&[row, key]));
        }
        if !self.exists || !self.backend_extent.contains(&[row, key, frame]) {
            return Ok(T::null());
        }
        let name = self.bound_name()?;
        tracing::trace!(table = name, row, key, frame, "read through frame cache");
        let value = self
            .backend
            .borrow_mut()
            .get_value(name, &[row, key, frame])?;
        T::from_value(value)
    }

    /// Write `[row, key]` of the loaded frame.
    pub fn set_value(&mut self, index: &[usize], value: T::Type) -> Result<()> {
        if self.frame.is_none() {
            return Err(Error::NoCurrentFrame);
        }
        self.slice.set(index, value)
    }

    /// Write `[row, key]` of `frame`, which must be the loaded frame.
    pub fn set_frame_value(&mut self, row: usize, key: usize, frame: usize, value: T::Type) -> Result<()> {
        match self.frame {
            None => Err(Error::NoCurrentFrame),
            Some(f) if f != frame => Err(Error::WrongFrame {
                requested: frame,
                loaded: self.frame,
            }),
            Some(_) => self.slice.set(&[row, key], value),
        }
    }

    /// Grow the `[row, key]` axes to at least `extent`.
    pub fn set_size(&mut self, extent: &Extent) -> Result<()> {
        self.slice.grow(extent)
    }

    /// Grow so that `[row, key]` lies inside the slice.
    pub fn fit(&mut self, row: usize, key: usize) -> Result<()> {
        self.set_size(&Extent::d2(row + 1, key + 1))
    }

    /// Write the dirty part of the loaded slice to the backend.
    pub fn flush(&mut self) -> Result<()> {
        let Some(frame) = self.frame else {
            return Ok(());
        };
        let Some(dirty) = self.slice.take_dirty() else {
            return Ok(());
        };
        let name = self.bound_name()?.to_string();
        let slice = self.slice.extent();
        let target = self.backend_extent.max(&Extent::d3(
            slice.size(0),
            slice.size(1),
            (frame + 1).max(self.frames_hint),
        ));

        let mut backend = self.backend.borrow_mut();
        if !self.exists {
            backend.create_table(&name, T::VALUE_TYPE, 3)?;
            self.exists = true;
        }
        if target != self.backend_extent {
            backend.set_size(&name, &target)?;
            self.backend_extent = target;
        }

        let size = dirty.size();
        let values = self.slice.block(dirty.offset(), &size);
        let offset = [dirty.offset()[0], dirty.offset()[1], frame];
        let size = Extent::d3(size.size(0), size.size(1), 1);
        tracing::trace!(table = %name, frame, %size, "flush frame cache");
        write_block(&mut **backend, &name, &offset, &size, values)
    }

    /// Flush, then forget the slice and the binding and move to `backend`.
    /// The current frame is kept.
    pub fn reset(&mut self, backend: SharedBackend) -> Result<()> {
        self.flush()?;
        self.backend = backend;
        self.name = None;
        self.exists = false;
        self.backend_extent = Extent::zeros(3);
        self.slice = Mirror::new(2);
        Ok(())
    }

    fn bound_name(&self) -> Result<&str> {
        self.name
            .as_deref()
            .ok_or_else(|| Error::internal("frame cache used before set()"))
    }

    fn load_slice(&mut self) -> Result<()> {
        self.slice = Mirror::new(2);
        let Some(frame) = self.frame else {
            return Ok(());
        };
        if !self.exists || frame >= self.backend_extent.size(2) {
            return Ok(());
        }
        let rows = self.backend_extent.size(0);
        let keys = self.backend_extent.size(1);
        let name = self.bound_name()?.to_string();
        tracing::trace!(table = %name, frame, rows, keys, "load frame slice");
        let values = load_block(
            &mut **self.backend.borrow_mut(),
            &name,
            &[0, 0, frame],
            &Extent::d3(rows, keys, 1),
        )?;
        self.slice = Mirror::from_values(Extent::d2(rows, keys), values)?;
        Ok(())
    }
}

impl<T: TypeTraits> ErasedCache for FrameCache<T> {
    fn flush(&mut self) -> Result<()> {
        FrameCache::flush(self)
    }

    fn set_current_frame(&mut self, frame: Option<usize>) -> Result<()> {
        FrameCache::set_current_frame(self, frame)
    }

    fn number_of_frames(&self) -> usize {
        self.get_size().size(2)
    }

    fn set_frames_hint(&mut self, frames: usize) {
        FrameCache::set_frames_hint(self, frames)
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

impl<T: TypeTraits> Drop for FrameCache<T> {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            tracing::error!(table = ?self.name, error = %e, "failed to flush frame cache");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{share, Backend, BufferBackend};
    use crate::util::{FloatTraits, Value};

    fn cache() -> (SharedBackend, FrameCache<FloatTraits>) {
        let backend = share(Box::new(BufferBackend::new()));
        let mut c = FrameCache::new(backend.clone());
        c.set("x_per_frame").unwrap();
        (backend, c)
    }

    #[test]
    fn test_frames_are_isolated() {
        let (backend, mut c) = cache();
        c.set_current_frame(Some(0)).unwrap();
        c.fit(0, 0).unwrap();
        c.set_value(&[0, 0], 1.5).unwrap();
        c.set_current_frame(Some(1)).unwrap();
        assert_eq!(c.get_value(&[0, 0]), f32::MAX);
        c.fit(0, 0).unwrap();
        c.set_value(&[0, 0], 2.5).unwrap();

        assert_eq!(c.get_frame_value(0, 0, 0).unwrap(), 1.5);
        assert_eq!(c.get_frame_value(0, 0, 1).unwrap(), 2.5);
        assert_eq!(c.get_frame_value(0, 0, 2).unwrap(), f32::MAX);
        assert_eq!(c.get_size(), Extent::d3(1, 1, 2));

        c.flush().unwrap();
        assert_eq!(
            backend.borrow_mut().get_value("x_per_frame", &[0, 0, 1]).unwrap(),
            Value::Float(2.5)
        );
        c.set_current_frame(Some(0)).unwrap();
        assert_eq!(c.get_value(&[0, 0]), 1.5);
    }

    #[test]
    fn test_writes_need_the_loaded_frame() {
        let (_backend, mut c) = cache();
        c.fit(0, 0).unwrap();
        assert!(matches!(c.set_value(&[0, 0], 1.0), Err(Error::NoCurrentFrame)));
        c.set_current_frame(Some(3)).unwrap();
        c.fit(0, 0).unwrap();
        assert!(matches!(
            c.set_frame_value(0, 0, 2, 1.0),
            Err(Error::WrongFrame { requested: 2, loaded: Some(3) })
        ));
        c.set_frame_value(0, 0, 3, 1.0).unwrap();
    }

    #[test]
    fn test_reset_flushes_and_rebinds() {
        let (first, mut c) = cache();
        c.set_current_frame(Some(1)).unwrap();
        c.fit(0, 0).unwrap();
        c.set_value(&[0, 0], 6.0).unwrap();

        let second = share(Box::new(BufferBackend::new()));
        c.reset(second.clone()).unwrap();
        assert_eq!(c.current_frame(), Some(1));
        assert_eq!(
            first.borrow_mut().get_value("x_per_frame", &[0, 0, 1]).unwrap(),
            Value::Float(6.0)
        );

        c.set("x_per_frame").unwrap();
        assert_eq!(c.get_value(&[0, 0]), f32::MAX);
        assert_eq!(c.get_size(), Extent::d3(0, 0, 0));
        assert!(!second.borrow().has_table("x_per_frame"));
    }

    #[test]
    fn test_frames_hint_presizes() {
        let (backend, mut c) = cache();
        c.set_frames_hint(10);
        c.set_current_frame(Some(0)).unwrap();
        c.fit(1, 0).unwrap();
        c.set_value(&[1, 0], 0.0).unwrap();
        drop(c);
        assert_eq!(
            backend.borrow_mut().get_size("x_per_frame").unwrap(),
            Extent::d3(2, 1, 10)
        );
    }
}
