use std::io::{BufRead, Seek, Write};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::canvas::{DrawingSession, PixelRect, PixelSurface, Size};
use crate::components::history::{HistoryRing, SlotHandle};
use crate::error::{IoError, SurfaceError};
use crate::io;

/// The ring as shared between the edit path and the presenter.
pub type SharedRing = Arc<Mutex<HistoryRing>>;

pub type SizeListener = Box<dyn Fn(Size) + Send>;

/// Lock a shared ring. A panic on another thread while holding the lock
/// leaves the ring in a consistent state (the head only moves between
/// complete states), so poisoning is ignored.
pub fn lock_ring(ring: &SharedRing) -> MutexGuard<'_, HistoryRing> {
    ring.lock().unwrap_or_else(|e| e.into_inner())
}

/// The one canvas the application edits.
///
/// Every read or write of pixel content and every history transition goes
/// through the ring lock, which the presenter takes once per frame.
pub struct Document {
    ring: SharedRing,
    listeners: Vec<SizeListener>,
}

impl Document {
    pub fn new(size: Size) -> Result<Self, SurfaceError> {
        Ok(Self::from_ring(HistoryRing::new(size)?))
    }

    pub fn from_surface(surface: PixelSurface) -> Self {
        Self::from_ring(HistoryRing::from_surface(surface))
    }

    fn from_ring(ring: HistoryRing) -> Self {
        Self {
            ring: Arc::new(Mutex::new(ring)),
            listeners: Vec::new(),
        }
    }

    /// Handle for the presenter. It observes replacements made by
    /// [`Document::new_image`] and the load paths.
    pub fn shared_ring(&self) -> SharedRing {
        Arc::clone(&self.ring)
    }

    pub fn lock(&self) -> MutexGuard<'_, HistoryRing> {
        lock_ring(&self.ring)
    }

    /// Called with the new logical size whenever a command changes it.
    pub fn on_size_changed(&mut self, listener: impl Fn(Size) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn size(&self) -> Size {
        self.lock().canvas_size()
    }

    pub fn can_undo(&self) -> bool {
        self.lock().can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.lock().can_redo()
    }

    pub fn acquire_mutation_slot(&self) -> Result<SlotHandle, SurfaceError> {
        self.lock().acquire_mutation_slot()
    }

    /// Run `f` against the acquired slot while holding the lock.
    /// Returns `None` if the handle is stale.
    pub fn with_surface_mut<R>(
        &self,
        handle: SlotHandle,
        f: impl FnOnce(&mut PixelSurface) -> R,
    ) -> Option<R> {
        let mut ring = self.lock();
        ring.surface_mut(handle).map(f)
    }

    /// Draw into the acquired slot. Returns `None` if the handle is stale.
    pub fn draw<R>(
        &self,
        handle: SlotHandle,
        f: impl FnOnce(&mut DrawingSession<'_>) -> R,
    ) -> Option<R> {
        self.with_surface_mut(handle, |surface| {
            let mut session = surface.session();
            f(&mut session)
        })
    }

    /// Read the committed state while holding the lock.
    pub fn with_current<R>(&self, f: impl FnOnce(&PixelSurface) -> R) -> R {
        f(self.lock().current_surface())
    }

    pub fn snapshot_copy(&self, rect: Option<PixelRect>) -> Result<PixelSurface, SurfaceError> {
        self.lock().snapshot_copy(rect)
    }

    pub fn undo(&self) -> bool {
        let step = self.lock().undo();
        if let Some(size) = step.resized_to {
            self.notify(size);
        }
        step.applied
    }

    pub fn redo(&self) -> bool {
        let step = self.lock().redo();
        if let Some(size) = step.resized_to {
            self.notify(size);
        }
        step.applied
    }

    pub fn clear(&self) -> Result<(), SurfaceError> {
        self.lock().clear()?;
        Ok(())
    }

    /// Undoable resize that keeps existing pixels at their coordinates.
    /// Returns `false` if `size` equals the current size.
    pub fn resize(&self, size: Size) -> Result<bool, SurfaceError> {
        let changed = self.lock().resize(size)?.is_some();
        if changed {
            log::info!("canvas resized to {size}");
            self.notify(size);
        }
        Ok(changed)
    }

    /// Paste `incoming` at the origin, growing the canvas first if it does not
    /// fit. Growing and pasting are separate undo steps.
    pub fn paste(&self, incoming: &PixelSurface) -> Result<(), SurfaceError> {
        let current = self.size();
        let target = current.max(incoming.size());
        let mut ring = self.lock();
        if target != current {
            let snapshot = ring.snapshot_copy(None)?;
            ring.resize(target)?;
            let handle = ring.acquire_mutation_slot()?;
            if let Some(surface) = ring.surface_mut(handle) {
                let mut session = surface.session();
                session.copy_region_from(&snapshot, snapshot.bounds());
                session.draw_image(incoming, 0, 0);
            }
            drop(ring);
            log::info!("canvas grown to {target} to fit pasted {}", incoming.size());
            self.notify(target);
        } else {
            let handle = ring.acquire_mutation_slot()?;
            if let Some(surface) = ring.surface_mut(handle) {
                surface.session().draw_image(incoming, 0, 0);
            }
        }
        Ok(())
    }

    /// Discard all history and start over with a blank canvas of `size`.
    pub fn new_image(&self, size: Size) -> Result<(), SurfaceError> {
        let ring = HistoryRing::new(size)?;
        self.replace(ring);
        Ok(())
    }

    /// Discard all history and adopt `surface` as the only state.
    pub fn replace_with(&self, surface: PixelSurface) {
        self.replace(HistoryRing::from_surface(surface));
    }

    pub fn save_png<W: Write>(&self, writer: W) -> Result<(), IoError> {
        // Encode from a copy so the presenter is not held off for the encode.
        let snapshot = self.lock().current_surface().clone();
        io::encode_png(&snapshot, writer)
    }

    pub fn load_png<R: BufRead + Seek>(&self, reader: R) -> Result<(), IoError> {
        let surface = io::decode_png(reader)?;
        self.replace_with(surface);
        Ok(())
    }

    fn replace(&self, ring: HistoryRing) {
        let size = ring.canvas_size();
        let previous = std::mem::replace(&mut *self.lock(), ring);
        if previous.canvas_size() != size {
            self.notify(size);
        }
    }

    fn notify(&self, size: Size) {
        for listener in &self.listeners {
            listener(size);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Color;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn stale_handle_draws_nothing() {
        let doc = Document::new(Size::new(4, 4)).unwrap();
        let handle = doc.acquire_mutation_slot().unwrap();
        assert!(doc.undo());
        let drawn = doc.draw(handle, |s| s.clear(Color::RED));
        assert!(drawn.is_none());
        assert_eq!(doc.with_current(|s| s.pixel(0, 0)), Some(Color::TRANSPARENT));
    }

    #[test]
    fn paste_that_fits_keeps_size() {
        let doc = Document::new(Size::new(10, 10)).unwrap();
        let red = PixelSurface::filled(Size::new(3, 3), Color::RED).unwrap();
        doc.paste(&red).unwrap();
        assert_eq!(doc.size(), Size::new(10, 10));
        assert_eq!(doc.with_current(|s| s.pixel(2, 2)), Some(Color::RED));
        assert_eq!(doc.with_current(|s| s.pixel(3, 3)), Some(Color::TRANSPARENT));
    }

    #[test]
    fn oversized_paste_grows_canvas_and_keeps_content() {
        let doc = Document::new(Size::new(10, 10)).unwrap();
        let handle = doc.acquire_mutation_slot().unwrap();
        doc.draw(handle, |s| s.fill_rect(PixelRect::new(8, 8, 2, 2), Color::BLUE));

        let wide = PixelSurface::filled(Size::new(20, 4), Color::RED).unwrap();
        doc.paste(&wide).unwrap();

        assert_eq!(doc.size(), Size::new(20, 10));
        assert_eq!(doc.with_current(|s| s.pixel(19, 0)), Some(Color::RED));
        assert_eq!(doc.with_current(|s| s.pixel(9, 9)), Some(Color::BLUE));

        // Undo the paste, then the growth.
        assert!(doc.undo());
        assert_eq!(doc.size(), Size::new(20, 10));
        assert!(doc.undo());
        assert_eq!(doc.size(), Size::new(10, 10));
    }

    #[test]
    fn size_listeners_fire_on_resize_undo_and_new_image() {
        let mut doc = Document::new(Size::new(4, 4)).unwrap();
        let last = Arc::new(AtomicU32::new(0));
        let seen = Arc::clone(&last);
        doc.on_size_changed(move |size| seen.store(size.width, Ordering::SeqCst));

        doc.resize(Size::new(6, 4)).unwrap();
        assert_eq!(last.load(Ordering::SeqCst), 6);
        doc.undo();
        assert_eq!(last.load(Ordering::SeqCst), 4);
        doc.new_image(Size::new(9, 9)).unwrap();
        assert_eq!(last.load(Ordering::SeqCst), 9);
        assert!(!doc.can_undo());
    }

    #[test]
    fn load_replaces_history_and_shared_ring_sees_it() {
        let doc = Document::new(Size::new(4, 4)).unwrap();
        let shared = doc.shared_ring();
        doc.clear().unwrap();
        assert!(doc.can_undo());

        let mut png = Vec::new();
        let source = PixelSurface::filled(Size::new(5, 3), Color::GREEN).unwrap();
        io::encode_png(&source, &mut png).unwrap();
        doc.load_png(Cursor::new(png)).unwrap();

        assert!(!doc.can_undo());
        let ring = lock_ring(&shared);
        assert_eq!(ring.canvas_size(), Size::new(5, 3));
        assert_eq!(ring.current_surface().pixel(4, 2), Some(Color::GREEN));
    }

    #[test]
    fn failed_load_keeps_existing_canvas() {
        let doc = Document::new(Size::new(4, 4)).unwrap();
        doc.clear().unwrap();
        assert!(doc.load_png(Cursor::new(b"nope".to_vec())).is_err());
        assert_eq!(doc.size(), Size::new(4, 4));
        assert!(doc.can_undo());
    }
}
