use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use rayon::prelude::*;

use crate::canvas::{Color, PixelSurface, Size};
use crate::document::{lock_ring, SharedRing};
use crate::error::PresentError;
use crate::gpu::chain::{FrameBuffer, PresentationChain};

/// Two-color checkerboard drawn behind the canvas so transparency is visible.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Checkerboard {
    pub cell: u32,
    pub light: Color,
    pub dark: Color,
}

impl Default for Checkerboard {
    fn default() -> Self {
        Self {
            cell: 8,
            light: Color::GRAY,
            dark: Color::DARK_GRAY,
        }
    }
}

impl Checkerboard {
    pub fn with_cell(cell: u32) -> Self {
        Self {
            cell: cell.max(1),
            ..Self::default()
        }
    }

    #[inline]
    pub fn at(&self, x: u32, y: u32) -> Color {
        let cell = self.cell.max(1);
        if (x / cell + y / cell) % 2 == 1 {
            self.dark
        } else {
            self.light
        }
    }
}

/// Compose one frame: checkerboard under the canvas, transparent outside it.
pub fn compose_frame(surface: &PixelSurface, pattern: &Checkerboard, frame: &mut FrameBuffer) {
    let width = frame.size().width as usize;
    if width == 0 {
        return;
    }
    let canvas = surface.size();
    let src = surface.pixels();
    let src_stride = canvas.width as usize;
    let visible_w = canvas.width.min(frame.size().width) as usize;

    frame
        .pixels_mut()
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            if y as u32 >= canvas.height {
                row.fill(Color::TRANSPARENT);
                return;
            }
            let src_row = &src[y * src_stride..y * src_stride + visible_w];
            for (x, (dst, px)) in row.iter_mut().zip(src_row).enumerate() {
                *dst = px.over(pattern.at(x as u32, y as u32));
            }
            row[visible_w..].fill(Color::TRANSPARENT);
        });
}

// ============================================================================
// PRESENTER - background compose/present loop
// ============================================================================

enum LoopExit {
    Stopped(Box<dyn PresentationChain>),
    Failed(PresentError),
}

struct Worker {
    cancel: Arc<AtomicBool>,
    handle: JoinHandle<LoopExit>,
}

/// Owns the presentation chain and the thread that feeds it.
///
/// Lifecycle: `start` moves the chain onto a new thread; `stop` signals the
/// loop, waits for it, and takes the chain back. A lost device ends the loop
/// and the error is reported by the next `stop` or `take_error`. The chain
/// is never recreated automatically.
pub struct Presenter {
    ring: SharedRing,
    pattern: Checkerboard,
    chain: Option<Box<dyn PresentationChain>>,
    worker: Option<Worker>,
    error: Option<PresentError>,
    frames: Arc<AtomicU64>,
}

impl Presenter {
    pub fn new(ring: SharedRing, chain: Box<dyn PresentationChain>, pattern: Checkerboard) -> Self {
        Self {
            ring,
            pattern,
            chain: Some(chain),
            worker: None,
            error: None,
            frames: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|w| !w.handle.is_finished())
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }

    pub fn has_chain(&self) -> bool {
        self.chain.is_some()
    }

    /// Launch the loop. A no-op if it is already running.
    pub fn start(&mut self) -> Result<(), PresentError> {
        if self.worker.is_some() {
            if self.is_running() {
                return Ok(());
            }
            // Loop ended on its own (device lost); collect it first.
            self.reap();
        }
        let chain = self.chain.take().ok_or(PresentError::NoChain)?;
        let cancel = Arc::new(AtomicBool::new(false));
        let ring = Arc::clone(&self.ring);
        let frames = Arc::clone(&self.frames);
        let pattern = self.pattern;
        let flag = Arc::clone(&cancel);

        let handle = thread::Builder::new()
            .name("presenter".into())
            .spawn(move || run_loop(ring, chain, pattern, flag, frames))
            .map_err(|e| PresentError::Spawn(e.to_string()))?;

        log::debug!("presenter started");
        self.worker = Some(Worker { cancel, handle });
        Ok(())
    }

    /// Signal the loop, wait for it to exit, and take back the chain.
    ///
    /// Returns the error that ended the loop, if it ended on its own.
    pub fn stop(&mut self) -> Result<(), PresentError> {
        if let Some(worker) = &self.worker {
            worker.cancel.store(true, Ordering::Release);
        }
        self.reap();
        match self.error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// The error that ended the loop, once the loop has actually ended.
    pub fn take_error(&mut self) -> Option<PresentError> {
        if self.worker.as_ref().is_some_and(|w| w.handle.is_finished()) {
            self.reap();
        }
        self.error.take()
    }

    /// Keep an error returned by `stop` so a later `take_error` still sees it.
    pub fn hold_error(&mut self, error: PresentError) {
        self.error = Some(error);
    }

    /// Reallocate the chain's buffers. Only valid while stopped.
    pub fn resize(&mut self, size: Size) -> Result<(), PresentError> {
        if self.worker.is_some() {
            return Err(PresentError::StillRunning);
        }
        let chain = self.chain.as_mut().ok_or(PresentError::NoChain)?;
        chain.resize_buffers(size)?;
        log::debug!("presenter resized to {size}");
        Ok(())
    }

    /// Install a fresh chain after a device loss. Only valid while stopped.
    pub fn replace_chain(&mut self, chain: Box<dyn PresentationChain>) -> Result<(), PresentError> {
        if self.worker.is_some() {
            return Err(PresentError::StillRunning);
        }
        self.chain = Some(chain);
        self.error = None;
        Ok(())
    }

    fn reap(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        match worker.handle.join() {
            Ok(LoopExit::Stopped(chain)) => {
                log::debug!("presenter stopped");
                self.chain = Some(chain);
            }
            Ok(LoopExit::Failed(e)) => self.error = Some(e),
            Err(_) => self.error = Some(PresentError::Panicked),
        }
    }
}

impl Drop for Presenter {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::warn!("presenter ended with error: {e}");
        }
    }
}

fn run_loop(
    ring: SharedRing,
    mut chain: Box<dyn PresentationChain>,
    pattern: Checkerboard,
    cancel: Arc<AtomicBool>,
    frames: Arc<AtomicU64>,
) -> LoopExit {
    while !cancel.load(Ordering::Acquire) {
        {
            let ring = lock_ring(&ring);
            compose_frame(ring.current_surface(), &pattern, chain.back_buffer());
        }
        if let Err(e) = chain.present() {
            log::error!("presenter stopping: {e}");
            return LoopExit::Failed(e);
        }
        frames.fetch_add(1, Ordering::AcqRel);
        chain.wait_for_vblank();
    }
    LoopExit::Stopped(chain)
}
