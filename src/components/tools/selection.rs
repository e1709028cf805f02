use crate::canvas::{Color, PixelRect, Size};
use crate::document::Document;
use crate::error::SurfaceError;

use super::{PointerEvent, PointerMove, Tool, ToolKind};

/// Size of the rectangle shown on press, before any drag.
pub const INITIAL_SELECTION_SIZE: u32 = 20;

/// Rubber-band rectangle selection. Never touches pixels.
#[derive(Debug, Default)]
pub struct Selection {
    anchor: Option<(i32, i32)>,
    rect: Option<PixelRect>,
    dragging: bool,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unclipped selection rectangle.
    pub fn rect(&self) -> Option<PixelRect> {
        self.rect
    }

    pub fn clear(&mut self) {
        self.anchor = None;
        self.rect = None;
        self.dragging = false;
    }
}

impl Tool for Selection {
    fn kind(&self) -> ToolKind {
        ToolKind::Selection
    }

    fn on_pointer_down(&mut self, _doc: &Document, event: PointerEvent) -> Result<(), SurfaceError> {
        let (x, y) = event.position.floor();
        self.anchor = Some((x, y));
        self.rect = Some(PixelRect::new(
            x,
            y,
            INITIAL_SELECTION_SIZE,
            INITIAL_SELECTION_SIZE,
        ));
        self.dragging = true;
        Ok(())
    }

    fn on_pointer_move(&mut self, _doc: &Document, event: &PointerMove) {
        if !event.in_contact || !self.dragging {
            return;
        }
        let Some((ax, ay)) = self.anchor else {
            return;
        };
        let (cx, cy) = event.current.floor();
        // The anchor stays fixed; dragging left/up moves the origin instead.
        self.rect = Some(PixelRect::new(
            ax.min(cx),
            ay.min(cy),
            ax.abs_diff(cx),
            ay.abs_diff(cy),
        ));
    }

    fn on_pointer_up(&mut self, _doc: &Document, _event: PointerEvent) {
        self.dragging = false;
    }

    fn on_pointer_exit(&mut self, _doc: &Document) {
        self.dragging = false;
    }

    fn set_color(&mut self, _color: Color) {}

    fn is_active(&self) -> bool {
        self.dragging
    }

    fn selection_rect(&self, canvas: Size) -> Option<PixelRect> {
        self.rect?.intersect(&PixelRect::from_size(canvas))
    }

    fn dispose(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drag(sel: &mut Selection, doc: &Document, from: (f32, f32), to: (f32, f32)) {
        sel.on_pointer_down(doc, PointerEvent::pressed(from.0, from.1)).unwrap();
        sel.on_pointer_move(doc, &PointerMove::to(to.0, to.1, true));
        sel.on_pointer_up(doc, PointerEvent::released(to.0, to.1));
    }

    #[test]
    fn press_shows_initial_rect() {
        let doc = Document::new(Size::new(100, 100)).unwrap();
        let mut sel = Selection::new();
        sel.on_pointer_down(&doc, PointerEvent::pressed(10.0, 10.0)).unwrap();
        assert_eq!(sel.rect(), Some(PixelRect::new(10, 10, 20, 20)));
        assert!(sel.is_active());
    }

    #[test]
    fn drag_in_every_direction_normalizes() {
        let doc = Document::new(Size::new(100, 100)).unwrap();
        let mut sel = Selection::new();
        let expected = Some(PixelRect::new(20, 30, 20, 10));

        drag(&mut sel, &doc, (20.0, 30.0), (40.0, 40.0));
        assert_eq!(sel.rect(), expected);
        drag(&mut sel, &doc, (40.0, 40.0), (20.0, 30.0));
        assert_eq!(sel.rect(), expected);
        drag(&mut sel, &doc, (40.0, 30.0), (20.0, 40.0));
        assert_eq!(sel.rect(), expected);
        drag(&mut sel, &doc, (20.0, 40.0), (40.0, 30.0));
        assert_eq!(sel.rect(), expected);
    }

    #[test]
    fn selection_is_clipped_to_canvas_and_never_edits() {
        let doc = Document::new(Size::new(50, 50)).unwrap();
        let mut sel = Selection::new();
        drag(&mut sel, &doc, (40.0, 40.0), (80.0, 90.0));
        assert_eq!(
            sel.selection_rect(Size::new(50, 50)),
            Some(PixelRect::new(40, 40, 10, 10))
        );
        assert!(!doc.can_undo());
    }

    #[test]
    fn moves_after_release_do_not_resize() {
        let doc = Document::new(Size::new(50, 50)).unwrap();
        let mut sel = Selection::new();
        drag(&mut sel, &doc, (0.0, 0.0), (10.0, 10.0));
        sel.on_pointer_move(&doc, &PointerMove::to(30.0, 30.0, true));
        assert_eq!(sel.rect(), Some(PixelRect::new(0, 0, 10, 10)));
    }

    #[test]
    fn dispose_clears_selection() {
        let doc = Document::new(Size::new(50, 50)).unwrap();
        let mut sel = Selection::new();
        drag(&mut sel, &doc, (0.0, 0.0), (10.0, 10.0));
        sel.dispose();
        assert_eq!(sel.selection_rect(Size::new(50, 50)), None);
    }
}
