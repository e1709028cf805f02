use crate::canvas::{Color, PixelSurface, Point, Size};
use crate::components::history::SlotHandle;
use crate::document::Document;
use crate::error::SurfaceError;

use super::{PointerEvent, PointerMove, Tool, ToolKind};

/// Freehand stroke tool: stamps a solid square brush along the pointer path.
///
/// One history slot is taken per stroke, on press, and drawn into until
/// release. Consecutive stamp positions are joined with a line of stamps so
/// fast movement leaves no gaps.
pub struct Pencil {
    brush: PixelSurface,
    brush_size: u32,
    previous: Option<(i32, i32)>,
    stroke: Option<SlotHandle>,
}

impl Pencil {
    pub fn new(brush_size: u32, color: Color) -> Result<Self, SurfaceError> {
        let brush = PixelSurface::filled(Size::new(brush_size, brush_size), color)?;
        Ok(Self {
            brush,
            brush_size,
            previous: None,
            stroke: None,
        })
    }

    pub fn brush_size(&self) -> u32 {
        self.brush_size
    }

    /// Top-left of the stamp for a pointer position: the stamp is centered on
    /// the pixel under the pointer.
    fn stamp_origin(&self, position: Point) -> (i32, i32) {
        let (x, y) = position.floor();
        let half = (self.brush_size / 2) as i32;
        (x - half, y - half)
    }

    fn stamp(&mut self, doc: &Document, position: Point) {
        let Some(handle) = self.stroke else {
            return;
        };
        let origin = self.stamp_origin(position);
        let previous = self.previous;
        let brush = &self.brush;
        let drawn = doc.draw(handle, |session| match previous {
            Some(from) => session.draw_line(from, origin, brush),
            None => session.draw_image(brush, origin.0, origin.1),
        });
        if drawn.is_some() {
            self.previous = Some(origin);
        } else {
            // The slot was undone or superseded mid-stroke.
            log::debug!("pencil stroke abandoned: history moved");
            self.end_stroke();
        }
    }

    fn end_stroke(&mut self) {
        self.previous = None;
        self.stroke = None;
    }
}

impl Tool for Pencil {
    fn kind(&self) -> ToolKind {
        ToolKind::Pencil
    }

    fn on_pointer_down(&mut self, doc: &Document, event: PointerEvent) -> Result<(), SurfaceError> {
        self.previous = None;
        self.stroke = Some(doc.acquire_mutation_slot()?);
        self.stamp(doc, event.position);
        Ok(())
    }

    fn on_pointer_move(&mut self, doc: &Document, event: &PointerMove) {
        if !event.in_contact || self.stroke.is_none() {
            return;
        }
        for point in event.points() {
            self.stamp(doc, point);
        }
    }

    fn on_pointer_up(&mut self, _doc: &Document, _event: PointerEvent) {
        self.end_stroke();
    }

    fn on_pointer_exit(&mut self, _doc: &Document) {
        self.end_stroke();
    }

    fn set_color(&mut self, color: Color) {
        self.brush.session().clear(color);
    }

    fn is_active(&self) -> bool {
        self.stroke.is_some()
    }

    fn dispose(&mut self) {
        self.end_stroke();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Document {
        Document::new(Size::new(400, 400)).unwrap()
    }

    fn black_pixels(doc: &Document) -> usize {
        doc.with_current(|s| s.pixels().iter().filter(|c| **c == Color::BLACK).count())
    }

    #[test]
    fn vertical_stroke_paints_column_and_undo_redo_round_trip() {
        let doc = doc();
        let mut pencil = Pencil::new(1, Color::BLACK).unwrap();
        pencil.on_pointer_down(&doc, PointerEvent::pressed(50.0, 50.0)).unwrap();
        pencil.on_pointer_move(&doc, &PointerMove::to(50.0, 150.0, true));
        pencil.on_pointer_up(&doc, PointerEvent::released(50.0, 150.0));

        doc.with_current(|s| {
            for y in 0..400 {
                let expected = if (50..=150).contains(&y) {
                    Color::BLACK
                } else {
                    Color::TRANSPARENT
                };
                assert_eq!(s.pixel(50, y), Some(expected), "row {y}");
            }
        });
        assert_eq!(black_pixels(&doc), 101);

        assert!(doc.undo());
        assert_eq!(black_pixels(&doc), 0);
        assert!(doc.redo());
        assert_eq!(black_pixels(&doc), 101);
    }

    #[test]
    fn single_click_stamps_once() {
        let doc = doc();
        let mut pencil = Pencil::new(3, Color::RED).unwrap();
        pencil.on_pointer_down(&doc, PointerEvent::pressed(10.0, 10.0)).unwrap();
        pencil.on_pointer_up(&doc, PointerEvent::released(10.0, 10.0));
        let red = doc.with_current(|s| s.pixels().iter().filter(|c| **c == Color::RED).count());
        assert_eq!(red, 9);
        assert_eq!(doc.with_current(|s| s.pixel(9, 9)), Some(Color::RED));
        assert_eq!(doc.with_current(|s| s.pixel(11, 11)), Some(Color::RED));
    }

    #[test]
    fn diagonal_drag_is_gap_free() {
        let doc = doc();
        let mut pencil = Pencil::new(1, Color::BLACK).unwrap();
        pencil.on_pointer_down(&doc, PointerEvent::pressed(0.0, 0.0)).unwrap();
        pencil.on_pointer_move(&doc, &PointerMove::to(99.0, 99.0, true));
        pencil.on_pointer_up(&doc, PointerEvent::released(99.0, 99.0));
        doc.with_current(|s| {
            for i in 0..100 {
                assert_eq!(s.pixel(i, i), Some(Color::BLACK), "pixel {i}");
            }
        });
        assert_eq!(black_pixels(&doc), 100);
    }

    #[test]
    fn intermediate_points_are_all_painted() {
        let doc = doc();
        let mut pencil = Pencil::new(1, Color::BLACK).unwrap();
        pencil.on_pointer_down(&doc, PointerEvent::pressed(10.0, 10.0)).unwrap();
        // Out-and-back: with only the final point the excursion would be lost.
        let m = PointerMove::with_intermediate(
            vec![Point::new(30.0, 10.0)],
            Point::new(10.0, 10.0),
            true,
        );
        pencil.on_pointer_move(&doc, &m);
        assert_eq!(doc.with_current(|s| s.pixel(30, 10)), Some(Color::BLACK));
    }

    #[test]
    fn moves_without_contact_or_press_do_nothing() {
        let doc = doc();
        let mut pencil = Pencil::new(1, Color::BLACK).unwrap();
        pencil.on_pointer_move(&doc, &PointerMove::to(5.0, 5.0, true));
        assert!(!doc.can_undo());

        pencil.on_pointer_down(&doc, PointerEvent::pressed(0.0, 0.0)).unwrap();
        pencil.on_pointer_move(&doc, &PointerMove::to(20.0, 0.0, false));
        assert_eq!(black_pixels(&doc), 1);
    }

    #[test]
    fn exit_ends_stroke_and_next_press_is_new_step() {
        let doc = doc();
        let mut pencil = Pencil::new(1, Color::BLACK).unwrap();
        pencil.on_pointer_down(&doc, PointerEvent::pressed(0.0, 0.0)).unwrap();
        pencil.on_pointer_exit(&doc);
        assert!(!pencil.is_active());
        pencil.on_pointer_move(&doc, &PointerMove::to(9.0, 0.0, true));
        assert_eq!(black_pixels(&doc), 1);

        pencil.on_pointer_down(&doc, PointerEvent::pressed(5.0, 5.0)).unwrap();
        pencil.on_pointer_up(&doc, PointerEvent::released(5.0, 5.0));
        assert_eq!(black_pixels(&doc), 2);
        doc.undo();
        assert_eq!(black_pixels(&doc), 1);
    }

    #[test]
    fn undo_mid_stroke_abandons_stroke() {
        let doc = doc();
        let mut pencil = Pencil::new(1, Color::BLACK).unwrap();
        pencil.on_pointer_down(&doc, PointerEvent::pressed(0.0, 0.0)).unwrap();
        doc.undo();
        pencil.on_pointer_move(&doc, &PointerMove::to(10.0, 0.0, true));
        assert!(!pencil.is_active());
        assert_eq!(black_pixels(&doc), 0);
    }

    #[test]
    fn translucent_stamps_blend_over_existing_pixels() {
        let doc = doc();
        let handle = doc.acquire_mutation_slot().unwrap();
        doc.draw(handle, |s| s.clear(Color::WHITE));

        let mut pencil = Pencil::new(1, Color::rgba(0, 0, 0, 128)).unwrap();
        pencil.on_pointer_down(&doc, PointerEvent::pressed(4.0, 4.0)).unwrap();
        let px = doc.with_current(|s| s.pixel(4, 4)).unwrap();
        assert_eq!(px.a, 255);
        assert!(px.r > 100 && px.r < 150, "got {px:?}");
    }
}
