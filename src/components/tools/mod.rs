// ============================================================================
// TOOLS - pointer-driven editing behaviors
// ============================================================================
//
// Every tool follows the same two-state machine:
//   Idle --press--> Active --release/exit--> Idle
// Moves only do work while Active and the pointer reports contact. Each tool
// keeps its own state; nothing is shared between tools.
// ============================================================================

mod fill;
mod pencil;
mod selection;

pub use fill::{flood_fill, Fill, FillReport};
pub use pencil::Pencil;
pub use selection::{Selection, INITIAL_SELECTION_SIZE};

use crate::canvas::{Color, PixelRect, Point, Size};
use crate::document::Document;
use crate::error::SurfaceError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ToolKind {
    #[default]
    Pencil,
    Fill,
    Selection,
}

impl ToolKind {
    pub const ALL: [ToolKind; 3] = [ToolKind::Pencil, ToolKind::Fill, ToolKind::Selection];

    pub fn label(&self) -> &'static str {
        match self {
            ToolKind::Pencil => "Pencil",
            ToolKind::Fill => "Fill",
            ToolKind::Selection => "Select",
        }
    }
}

/// A press, release, or exit, in canvas pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerEvent {
    pub position: Point,
    pub in_contact: bool,
}

impl PointerEvent {
    pub fn new(x: f32, y: f32, in_contact: bool) -> Self {
        Self {
            position: Point::new(x, y),
            in_contact,
        }
    }

    pub fn pressed(x: f32, y: f32) -> Self {
        Self::new(x, y, true)
    }

    pub fn released(x: f32, y: f32) -> Self {
        Self::new(x, y, false)
    }
}

/// A move, with every intermediate position reported since the previous move
/// (oldest first) so fast strokes are not sampled down to one point per frame.
#[derive(Clone, Debug, PartialEq)]
pub struct PointerMove {
    pub intermediate: Vec<Point>,
    pub current: Point,
    pub in_contact: bool,
}

impl PointerMove {
    pub fn to(x: f32, y: f32, in_contact: bool) -> Self {
        Self {
            intermediate: Vec::new(),
            current: Point::new(x, y),
            in_contact,
        }
    }

    pub fn with_intermediate(intermediate: Vec<Point>, current: Point, in_contact: bool) -> Self {
        Self {
            intermediate,
            current,
            in_contact,
        }
    }

    /// Intermediate points followed by the current one.
    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        self.intermediate
            .iter()
            .copied()
            .chain(std::iter::once(self.current))
    }
}

pub trait Tool: Send {
    fn kind(&self) -> ToolKind;

    /// Idle -> Active. May take a history slot.
    fn on_pointer_down(&mut self, doc: &Document, event: PointerEvent) -> Result<(), SurfaceError>;

    /// Ignored unless Active and `event.in_contact`.
    fn on_pointer_move(&mut self, doc: &Document, event: &PointerMove);

    /// Active -> Idle.
    fn on_pointer_up(&mut self, doc: &Document, event: PointerEvent);

    /// Active -> Idle. Pointer left the canvas.
    fn on_pointer_exit(&mut self, doc: &Document);

    fn set_color(&mut self, color: Color);

    fn is_active(&self) -> bool;

    /// Visible selection, clipped to `canvas`. Only the selection tool has one.
    fn selection_rect(&self, _canvas: Size) -> Option<PixelRect> {
        None
    }

    /// Limit edits to `clip`. Only the fill tool honours one.
    fn set_clip(&mut self, _clip: Option<PixelRect>) {}

    fn clip(&self) -> Option<PixelRect> {
        None
    }

    /// Release any per-tool state before the tool is replaced.
    fn dispose(&mut self) {}
}

/// Build a tool in its Idle state.
pub fn create_tool(
    kind: ToolKind,
    color: Color,
    brush_size: u32,
    clip: Option<PixelRect>,
) -> Result<Box<dyn Tool>, SurfaceError> {
    Ok(match kind {
        ToolKind::Pencil => Box::new(Pencil::new(brush_size, color)?),
        ToolKind::Fill => {
            let mut fill = Fill::new(color);
            fill.set_clip(clip);
            Box::new(fill)
        }
        ToolKind::Selection => Box::new(Selection::new()),
    })
}
