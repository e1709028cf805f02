use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::canvas::{Color, Size};
use crate::error::{PresentError, SurfaceError};

// ============================================================================
// FRAME BUFFER
// ============================================================================

/// One back (or front) buffer of a presentation chain.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameBuffer {
    size: Size,
    pixels: Vec<Color>,
}

impl FrameBuffer {
    pub fn new(size: Size) -> Result<Self, SurfaceError> {
        let count = size.pixel_count();
        let mut pixels = Vec::new();
        pixels.try_reserve_exact(count).map_err(|_| SurfaceError::Allocation {
            size,
            bytes: count * 4,
        })?;
        pixels.resize(count, Color::TRANSPARENT);
        Ok(Self { size, pixels })
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [Color] {
        &mut self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        Some(self.pixels[y as usize * self.size.width as usize + x as usize])
    }

    /// Raw RGBA bytes (straight alpha), row-major.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.pixels.as_slice())
    }
}

// ============================================================================
// PRESENTATION CHAIN
// ============================================================================

/// A double-buffered display target driven by the presenter thread.
///
/// The chain is moved onto the presenter thread while running and handed
/// back when the loop stops, so it is only ever touched by one thread.
pub trait PresentationChain: Send {
    fn size(&self) -> Size;

    /// Buffer the next frame is composed into.
    fn back_buffer(&mut self) -> &mut FrameBuffer;

    /// Make the back buffer visible. `DeviceLost` is terminal for this chain.
    fn present(&mut self) -> Result<(), PresentError>;

    /// Block until the next display refresh.
    fn wait_for_vblank(&mut self);

    /// Reallocate buffers for a new canvas size. Only called while stopped.
    fn resize_buffers(&mut self, size: Size) -> Result<(), PresentError>;
}

/// Deadline-based frame pacing for chains without a hardware vblank.
#[derive(Debug)]
pub struct VsyncTimer {
    interval: Duration,
    next: Instant,
}

impl VsyncTimer {
    pub fn new(refresh_rate_hz: u32) -> Self {
        let hz = refresh_rate_hz.max(1);
        let interval = Duration::from_nanos(1_000_000_000 / u64::from(hz));
        Self {
            interval,
            next: Instant::now() + interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Sleep until the next tick. A loop that falls behind skips the missed
    /// ticks instead of bursting to catch up.
    pub fn wait(&mut self) {
        let now = Instant::now();
        if self.next > now {
            thread::sleep(self.next - now);
            self.next += self.interval;
        } else {
            self.next = now + self.interval;
        }
    }
}

// ============================================================================
// HEADLESS CHAIN - in-memory target for batch mode and tests
// ============================================================================

#[derive(Debug, Default)]
struct ProbeState {
    presented: AtomicU64,
    device_lost: AtomicBool,
    front: Mutex<Option<FrameBuffer>>,
}

/// Observer/controller for a [`HeadlessChain`] that survives the chain
/// moving onto the presenter thread.
#[derive(Clone, Debug, Default)]
pub struct HeadlessProbe {
    state: Arc<ProbeState>,
}

impl HeadlessProbe {
    pub fn frames_presented(&self) -> u64 {
        self.state.presented.load(Ordering::Acquire)
    }

    /// Copy of the most recently presented frame.
    pub fn last_frame(&self) -> Option<FrameBuffer> {
        self.state
            .front
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Make the next `present` fail with `DeviceLost`.
    pub fn lose_device(&self) {
        self.state.device_lost.store(true, Ordering::Release);
    }

    /// Spin until at least `count` frames have been presented or `timeout`
    /// passes. Returns whether the count was reached.
    pub fn wait_for_frames(&self, count: u64, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.frames_presented() < count {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
        true
    }
}

pub struct HeadlessChain {
    back: FrameBuffer,
    vsync: VsyncTimer,
    probe: HeadlessProbe,
}

impl HeadlessChain {
    pub fn new(size: Size, refresh_rate_hz: u32) -> Result<Self, SurfaceError> {
        Ok(Self {
            back: FrameBuffer::new(size)?,
            vsync: VsyncTimer::new(refresh_rate_hz),
            probe: HeadlessProbe::default(),
        })
    }

    pub fn probe(&self) -> HeadlessProbe {
        self.probe.clone()
    }
}

impl PresentationChain for HeadlessChain {
    fn size(&self) -> Size {
        self.back.size()
    }

    fn back_buffer(&mut self) -> &mut FrameBuffer {
        &mut self.back
    }

    fn present(&mut self) -> Result<(), PresentError> {
        let state = &self.probe.state;
        if state.device_lost.load(Ordering::Acquire) {
            return Err(PresentError::DeviceLost("headless device removed".into()));
        }
        let mut front = state.front.lock().unwrap_or_else(|e| e.into_inner());
        match front.as_mut() {
            Some(frame) if frame.size == self.back.size => {
                frame.pixels.copy_from_slice(&self.back.pixels);
            }
            Some(_) | None => {
                *front = Some(self.back.clone());
            }
        }
        drop(front);
        state.presented.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn wait_for_vblank(&mut self) {
        self.vsync.wait();
    }

    fn resize_buffers(&mut self, size: Size) -> Result<(), PresentError> {
        if size == self.back.size() {
            return Ok(());
        }
        self.back = FrameBuffer::new(size)
            .map_err(|e| PresentError::DeviceLost(format!("buffer reallocation failed: {e}")))?;
        Ok(())
    }
}
