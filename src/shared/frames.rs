//! Frames.
//!
//! Frames are not counted centrally: the number of frames is the largest of
//! the frame-name table length and the frame extent of any per-frame table.

use super::SharedData;
use crate::backend::Backend;
use crate::core::FrameId;
use crate::util::{Error, Result};

impl SharedData {
    pub fn get_current_frame(&self) -> FrameId {
        self.current_frame
    }

    /// Make `frame` the target of per-frame reads and writes.
    /// [`FrameId::ALL_FRAMES`] switches to static values only.
    pub fn set_current_frame(&mut self, frame: FrameId) -> Result<()> {
        if frame == self.current_frame {
            return Ok(());
        }
        tracing::trace!(%frame, "set current frame");
        self.caches.set_current_frame(frame.index())?;
        self.current_frame = frame;
        Ok(())
    }

    /// Append a frame named `name` and make it current.
    pub fn add_frame(&mut self, name: &str) -> Result<FrameId> {
        self.check_writable()?;
        let frame = FrameId(self.get_number_of_frames() as u32);
        self.set_frame_name(frame, name)?;
        self.set_current_frame(frame)?;
        Ok(frame)
    }

    pub fn get_number_of_frames(&self) -> usize {
        let named = self.frame_names.get_size().size(0);
        let stored = {
            let backend = self.backend.borrow();
            let store = backend.store();
            store
                .table_names()
                .iter()
                .filter_map(|name| store.header(name))
                .filter(|h| h.extent.rank() == 3)
                .map(|h| h.extent.size(2))
                .max()
                .unwrap_or(0)
        };
        named.max(stored).max(self.caches.number_of_frames())
    }

    /// Name of `frame`; empty for frames never named.
    pub fn get_frame_name(&self, frame: FrameId) -> Result<String> {
        let f = frame_index(frame)?;
        Ok(self.frame_names.get_value(&[f]))
    }

    pub fn set_frame_name(&mut self, frame: FrameId, name: &str) -> Result<()> {
        self.check_writable()?;
        let f = frame_index(frame)?;
        self.frame_names.fit(&[f])?;
        self.frame_names.set_value(&[f], name.to_string())
    }

    /// Frames that follow `frame`: frames form a single chain.
    pub fn get_frame_children(&self, frame: FrameId) -> Result<Vec<FrameId>> {
        let f = frame_index(frame)?;
        if f + 1 < self.get_number_of_frames() {
            Ok(vec![FrameId(f as u32 + 1)])
        } else {
            Ok(Vec::new())
        }
    }

    /// Size the frame axis of per-frame tables for `frames` frames as they
    /// grow, instead of one frame at a time.
    pub fn save_frames_hint(&mut self, frames: usize) {
        self.caches.set_frames_hint(frames);
    }
}

fn frame_index(frame: FrameId) -> Result<usize> {
    frame
        .index()
        .ok_or_else(|| Error::usage("ALL_FRAMES is not a frame"))
}
