use crate::canvas::{Color, PixelRect, PixelSurface, Size};
use crate::error::SurfaceError;

// ============================================================================
// HISTORY RING - fixed-depth circular buffer of full canvas states
// ============================================================================

/// Number of slots in the ring. At most this many states are retained, so at
/// most `HISTORY_DEPTH - 1` undo steps are available at once.
pub const HISTORY_DEPTH: usize = 5;

/// Identifies the slot handed out by [`HistoryRing::acquire_mutation_slot`].
///
/// A handle stays live while its slot is the committed head and has not been
/// re-acquired. Undo, redo, or a newer acquisition make it stale.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotHandle {
    index: usize,
    epoch: u64,
}

impl SlotHandle {
    pub fn index(&self) -> usize {
        self.index
    }
}

/// Outcome of an undo or redo request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HistoryStep {
    /// `false` when there was nothing to undo/redo.
    pub applied: bool,
    /// New logical canvas size, when the step changed it.
    pub resized_to: Option<Size>,
}

/// Undo/redo history as a ring of owned pixel surfaces.
///
/// Slots are allocated lazily and reallocated only when their size no longer
/// matches the canvas. `head` is always allocated.
pub struct HistoryRing {
    slots: [Option<PixelSurface>; HISTORY_DEPTH],
    epochs: [u64; HISTORY_DEPTH],
    next_epoch: u64,
    head: usize,
    tail: usize,
    undone: usize,
    canvas_size: Size,
}

impl HistoryRing {
    /// Ring with a single transparent state of `size`.
    pub fn new(size: Size) -> Result<Self, SurfaceError> {
        Ok(Self::from_surface(PixelSurface::new(size)?))
    }

    /// Ring whose only state is `surface` (used for loading an image).
    pub fn from_surface(surface: PixelSurface) -> Self {
        let canvas_size = surface.size();
        let mut slots: [Option<PixelSurface>; HISTORY_DEPTH] = Default::default();
        slots[0] = Some(surface);
        Self {
            slots,
            epochs: [0; HISTORY_DEPTH],
            next_epoch: 1,
            head: 0,
            tail: 0,
            undone: 0,
            canvas_size,
        }
    }

    pub fn head(&self) -> usize {
        self.head
    }

    pub fn tail(&self) -> usize {
        self.tail
    }

    pub fn undone_count(&self) -> usize {
        self.undone
    }

    pub fn can_undo(&self) -> bool {
        self.head != self.tail
    }

    pub fn can_redo(&self) -> bool {
        self.undone > 0
    }

    pub fn canvas_size(&self) -> Size {
        self.canvas_size
    }

    /// Number of states between tail and head, inclusive.
    pub fn retained_states(&self) -> usize {
        (self.head + HISTORY_DEPTH - self.tail) % HISTORY_DEPTH + 1
    }

    /// Number of slots that currently own a surface.
    pub fn allocated_slots(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// The committed state. This is all the presenter ever reads.
    pub fn current_surface(&self) -> &PixelSurface {
        match &self.slots[self.head] {
            Some(surface) => surface,
            None => unreachable!("history head slot {} is unallocated", self.head),
        }
    }

    /// Prepare the next state for editing and make it current.
    ///
    /// The new slot starts as an exact copy of the current state, so the
    /// head only ever moves between fully-formed states. Acquiring while the
    /// ring is full evicts the oldest state; acquiring after an undo discards
    /// the redo chain. On allocation failure nothing changes.
    pub fn acquire_mutation_slot(&mut self) -> Result<SlotHandle, SurfaceError> {
        let old_head = self.head;
        let new_head = (self.head + 1) % HISTORY_DEPTH;
        let new_tail = if new_head == self.tail {
            (self.tail + 1) % HISTORY_DEPTH
        } else {
            self.tail
        };

        let mut target = match self.slots[new_head].take() {
            Some(surface) if surface.size() == self.canvas_size => surface,
            previous => match PixelSurface::new(self.canvas_size) {
                Ok(fresh) => {
                    log::debug!(
                        "history slot {} (re)allocated at {}",
                        new_head,
                        self.canvas_size
                    );
                    fresh
                }
                Err(e) => {
                    self.slots[new_head] = previous;
                    return Err(e);
                }
            },
        };

        {
            let current = self.current_surface();
            let mut session = target.session();
            session.clear(Color::TRANSPARENT);
            session.copy_region_from(current, current.bounds());
        }

        if new_tail != self.tail {
            log::debug!("history full, evicting slot {}", self.tail);
        }

        let epoch = self.next_epoch;
        self.next_epoch += 1;
        self.slots[new_head] = Some(target);
        self.epochs[new_head] = epoch;
        self.head = new_head;
        self.tail = new_tail;
        self.undone = 0;
        debug_assert_ne!(old_head, self.head);

        Ok(SlotHandle {
            index: new_head,
            epoch,
        })
    }

    /// Mutable access to an acquired slot, or `None` if the handle is stale.
    pub fn surface_mut(&mut self, handle: SlotHandle) -> Option<&mut PixelSurface> {
        if handle.index != self.head || self.epochs[handle.index] != handle.epoch {
            return None;
        }
        self.slots[handle.index].as_mut()
    }

    pub fn undo(&mut self) -> HistoryStep {
        if self.head == self.tail {
            return HistoryStep::default();
        }
        let before = self.current_surface().size();
        self.head = (self.head + HISTORY_DEPTH - 1) % HISTORY_DEPTH;
        self.undone += 1;
        self.finish_step(before)
    }

    pub fn redo(&mut self) -> HistoryStep {
        if self.undone == 0 {
            return HistoryStep::default();
        }
        let before = self.current_surface().size();
        self.head = (self.head + 1) % HISTORY_DEPTH;
        self.undone -= 1;
        self.finish_step(before)
    }

    /// New undoable state cleared to transparent.
    pub fn clear(&mut self) -> Result<SlotHandle, SurfaceError> {
        let handle = self.acquire_mutation_slot()?;
        if let Some(surface) = self.surface_mut(handle) {
            surface.session().clear(Color::TRANSPARENT);
        }
        Ok(handle)
    }

    /// New undoable state at `size`, keeping existing pixels at their
    /// coordinates (anything past the new bounds is dropped).
    ///
    /// Returns `Ok(None)` if the size is unchanged. On failure the canvas size
    /// is restored, so the ring never disagrees with its head.
    pub fn resize(&mut self, size: Size) -> Result<Option<SlotHandle>, SurfaceError> {
        if size == self.canvas_size {
            return Ok(None);
        }
        let previous = self.canvas_size;
        self.canvas_size = size;
        match self.acquire_mutation_slot() {
            Ok(handle) => Ok(Some(handle)),
            Err(e) => {
                self.canvas_size = previous;
                Err(e)
            }
        }
    }

    /// Detached copy of the current state, optionally limited to `rect`.
    pub fn snapshot_copy(&self, rect: Option<PixelRect>) -> Result<PixelSurface, SurfaceError> {
        let current = self.current_surface();
        current.copy_region(rect.unwrap_or_else(|| current.bounds()))
    }

    fn finish_step(&mut self, before: Size) -> HistoryStep {
        let after = self.current_surface().size();
        self.canvas_size = after;
        HistoryStep {
            applied: true,
            resized_to: (after != before).then_some(after),
        }
    }
}
