use std::collections::VecDeque;

use crate::canvas::{Color, PixelRect, PixelSurface, Size};
use crate::document::Document;
use crate::error::SurfaceError;

use super::{PointerEvent, PointerMove, Tool, ToolKind};

/// Result of one flood fill.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FillReport {
    pub pixels_changed: usize,
    /// Bounding box of the changed pixels.
    pub bounds: Option<PixelRect>,
}

/// 4-connected scanline flood fill over a row-major pixel array.
///
/// Replaces the contiguous region of pixels exactly equal to the seed pixel.
/// Work stays inside `clip` (intersected with the canvas). A seed outside
/// that area, or a region already in `fill`, changes nothing.
pub fn flood_fill(
    pixels: &mut [Color],
    size: Size,
    seed: (i32, i32),
    fill: Color,
    clip: Option<PixelRect>,
) -> FillReport {
    let canvas = PixelRect::from_size(size);
    let area = match clip {
        Some(clip) => match clip.intersect(&canvas) {
            Some(area) => area,
            None => return FillReport::default(),
        },
        None => canvas,
    };
    let (sx, sy) = seed;
    if size.is_empty() || !area.contains(sx, sy) || pixels.len() != size.pixel_count() {
        return FillReport::default();
    }

    let stride = size.width as usize;
    let index = |x: i32, y: i32| y as usize * stride + x as usize;
    let target = pixels[index(sx, sy)];
    if target == fill {
        return FillReport::default();
    }

    let mut report = FillReport::default();
    let mut queue = VecDeque::new();
    queue.push_back((sx, sy));

    while let Some((x, y)) = queue.pop_front() {
        if pixels[index(x, y)] != target {
            continue;
        }
        let mut west = x;
        while west > area.x && pixels[index(west - 1, y)] == target {
            west -= 1;
        }
        let mut east = x;
        while east + 1 < area.right() && pixels[index(east + 1, y)] == target {
            east += 1;
        }

        for cx in west..=east {
            pixels[index(cx, y)] = fill;
            if y > area.y && pixels[index(cx, y - 1)] == target {
                queue.push_back((cx, y - 1));
            }
            if y + 1 < area.bottom() && pixels[index(cx, y + 1)] == target {
                queue.push_back((cx, y + 1));
            }
        }

        report.pixels_changed += (east - west + 1) as usize;
        let span = PixelRect::new(west, y, (east - west + 1) as u32, 1);
        report.bounds = Some(match report.bounds {
            Some(b) => b.union(&span),
            None => span,
        });
    }
    report
}

/// Bucket fill: replaces the contiguous same-color region under the press.
pub struct Fill {
    color: Color,
    clip: Option<PixelRect>,
    active: bool,
    last_report: Option<FillReport>,
}

impl Fill {
    pub fn new(color: Color) -> Self {
        Self {
            color,
            clip: None,
            active: false,
            last_report: None,
        }
    }

    pub fn last_report(&self) -> Option<FillReport> {
        self.last_report
    }

    fn fill_at(&mut self, doc: &Document, seed: (i32, i32)) -> Result<FillReport, SurfaceError> {
        // Look before taking a slot: a no-op fill must not cost a history step.
        let seed_color = doc.with_current(|s| s.pixel(seed.0, seed.1));
        let Some(seed_color) = seed_color else {
            return Ok(FillReport::default());
        };
        if seed_color == self.color || self.clip.is_some_and(|c| !c.contains(seed.0, seed.1)) {
            return Ok(FillReport::default());
        }

        let handle = doc.acquire_mutation_slot()?;
        let color = self.color;
        let clip = self.clip;
        let result = doc.with_surface_mut(handle, |surface| {
            let size = surface.size();
            let mut pixels = surface.read_pixels();
            let report = flood_fill(&mut pixels, size, seed, color, clip);
            if let Some(bounds) = report.bounds {
                let staging = PixelSurface::from_pixels(size, &pixels)?;
                surface.session().copy_region_from(&staging, bounds);
            }
            Ok::<_, SurfaceError>(report)
        });
        result.unwrap_or(Ok(FillReport::default()))
    }
}

impl Tool for Fill {
    fn kind(&self) -> ToolKind {
        ToolKind::Fill
    }

    /// Restrict fills to `clip` (usually the last selection).
    fn set_clip(&mut self, clip: Option<PixelRect>) {
        self.clip = clip;
    }

    fn clip(&self) -> Option<PixelRect> {
        self.clip
    }

    fn on_pointer_down(&mut self, doc: &Document, event: PointerEvent) -> Result<(), SurfaceError> {
        self.active = true;
        let report = self.fill_at(doc, event.position.floor())?;
        log::debug!("fill changed {} pixels", report.pixels_changed);
        self.last_report = Some(report);
        Ok(())
    }

    fn on_pointer_move(&mut self, _doc: &Document, _event: &PointerMove) {}

    fn on_pointer_up(&mut self, _doc: &Document, _event: PointerEvent) {
        self.active = false;
    }

    fn on_pointer_exit(&mut self, _doc: &Document) {
        self.active = false;
    }

    fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn dispose(&mut self) {
        self.active = false;
        self.last_report = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn click(fill: &mut Fill, doc: &Document, x: f32, y: f32) -> FillReport {
        fill.on_pointer_down(doc, PointerEvent::pressed(x, y)).unwrap();
        fill.on_pointer_up(doc, PointerEvent::released(x, y));
        fill.last_report().unwrap()
    }

    #[test]
    fn fills_whole_transparent_canvas_then_is_idempotent() {
        let doc = Document::new(Size::new(10, 10)).unwrap();
        let mut fill = Fill::new(Color::RED);

        let first = click(&mut fill, &doc, 0.0, 0.0);
        assert_eq!(first.pixels_changed, 100);
        assert_eq!(first.bounds, Some(PixelRect::new(0, 0, 10, 10)));
        assert!(doc.with_current(|s| s.pixels().iter().all(|c| *c == Color::RED)));

        let second = click(&mut fill, &doc, 0.0, 0.0);
        assert_eq!(second.pixels_changed, 0);
        // Only the first fill is a history step.
        assert!(doc.undo());
        assert!(!doc.undo());
    }

    #[test]
    fn fill_stops_at_boundaries() {
        let size = Size::new(7, 5);
        let mut pixels = vec![Color::WHITE; size.pixel_count()];
        // Vertical wall at x == 3.
        for y in 0..5 {
            pixels[y * 7 + 3] = Color::BLACK;
        }
        let report = flood_fill(&mut pixels, size, (0, 0), Color::BLUE, None);
        assert_eq!(report.pixels_changed, 15);
        assert_eq!(report.bounds, Some(PixelRect::new(0, 0, 3, 5)));
        assert_eq!(pixels[4], Color::WHITE);
        assert_eq!(pixels[3], Color::BLACK);
    }

    #[test]
    fn fill_follows_concave_regions() {
        // U-shaped region: seed in one arm must reach the other.
        let size = Size::new(5, 4);
        let w = Color::WHITE;
        let k = Color::BLACK;
        #[rustfmt::skip]
        let mut pixels = vec![
            w, k, k, k, w,
            w, k, k, k, w,
            w, k, k, k, w,
            w, w, w, w, w,
        ];
        let report = flood_fill(&mut pixels, size, (4, 0), Color::RED, None);
        assert_eq!(report.pixels_changed, 11);
        assert_eq!(pixels[0], Color::RED);
    }

    #[test]
    fn walled_in_pixel_changes_alone() {
        let size = Size::new(3, 3);
        let mut pixels = vec![Color::BLACK; 9];
        pixels[4] = Color::WHITE;
        let report = flood_fill(&mut pixels, size, (1, 1), Color::RED, None);
        assert_eq!(report.pixels_changed, 1);
        assert_eq!(report.bounds, Some(PixelRect::new(1, 1, 1, 1)));
        assert_eq!(pixels.iter().filter(|c| **c == Color::BLACK).count(), 8);
    }

    #[test]
    fn diagonal_neighbors_are_not_connected() {
        let size = Size::new(4, 4);
        let mut pixels = vec![Color::BLACK; 16];
        for i in 0..4 {
            pixels[i * 4 + i] = Color::WHITE;
        }
        let report = flood_fill(&mut pixels, size, (0, 0), Color::RED, None);
        assert_eq!(report.pixels_changed, 1);
        assert_eq!(pixels[0], Color::RED);
        for i in 1..4 {
            assert_eq!(pixels[i * 4 + i], Color::WHITE, "diagonal ({i},{i}) was filled");
        }
    }

    #[test]
    fn clip_limits_fill() {
        let size = Size::new(10, 10);
        let mut pixels = vec![Color::TRANSPARENT; 100];
        let clip = Some(PixelRect::new(2, 2, 3, 3));
        let report = flood_fill(&mut pixels, size, (3, 3), Color::RED, clip);
        assert_eq!(report.pixels_changed, 9);
        assert_eq!(pixels[0], Color::TRANSPARENT);

        let outside = flood_fill(&mut pixels, size, (8, 8), Color::BLUE, clip);
        assert_eq!(outside.pixels_changed, 0);
    }

    #[test]
    fn seeds_outside_canvas_are_ignored() {
        let doc = Document::new(Size::new(4, 4)).unwrap();
        let mut fill = Fill::new(Color::RED);
        assert_eq!(click(&mut fill, &doc, -1.0, 2.0).pixels_changed, 0);
        assert_eq!(click(&mut fill, &doc, 2.0, 4.0).pixels_changed, 0);
        assert!(!doc.can_undo());
    }

    #[test]
    fn fill_only_touches_region_pixels() {
        let doc = Document::new(Size::new(6, 6)).unwrap();
        let h = doc.acquire_mutation_slot().unwrap();
        doc.draw(h, |s| s.fill_rect(PixelRect::new(0, 3, 6, 1), Color::BLACK));

        let mut fill = Fill::new(Color::GREEN);
        let report = click(&mut fill, &doc, 1.0, 1.0);
        assert_eq!(report.pixels_changed, 18);
        doc.with_current(|s| {
            assert_eq!(s.pixel(5, 2), Some(Color::GREEN));
            assert_eq!(s.pixel(5, 3), Some(Color::BLACK));
            assert_eq!(s.pixel(0, 5), Some(Color::TRANSPARENT));
        });
    }
}
