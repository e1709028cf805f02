use std::io::{BufReader, Cursor};
use std::time::Duration;

use paintring::canvas::{Color, PixelRect, PixelSurface, Size};
use paintring::components::tools::{PointerEvent, PointerMove, ToolKind};
use paintring::components::HISTORY_DEPTH;
use paintring::gpu::{Checkerboard, HeadlessChain};
use paintring::settings::PaintSettings;
use paintring::PaintController;

fn controller(width: u32, height: u32) -> PaintController {
    PaintController::headless(PaintSettings {
        canvas_width: width,
        canvas_height: height,
        refresh_rate: 500,
        ..PaintSettings::default()
    })
    .unwrap()
}

fn count(c: &PaintController, color: Color) -> usize {
    c.document()
        .with_current(|s| s.pixels().iter().filter(|p| **p == color).count())
}

fn stroke(c: &mut PaintController, from: (f32, f32), to: (f32, f32)) {
    c.pointer_down(PointerEvent::pressed(from.0, from.1)).unwrap();
    c.pointer_move(&PointerMove::to(to.0, to.1, true));
    c.pointer_up(PointerEvent::released(to.0, to.1));
}

fn click(c: &mut PaintController, x: f32, y: f32) {
    c.pointer_down(PointerEvent::pressed(x, y)).unwrap();
    c.pointer_up(PointerEvent::released(x, y));
}

#[test]
fn pencil_stroke_undo_redo_on_default_canvas() {
    let mut c = controller(400, 400);
    stroke(&mut c, (50.0, 50.0), (50.0, 150.0));

    c.document().with_current(|s| {
        for y in 50..=150 {
            assert_eq!(s.pixel(50, y), Some(Color::BLACK));
        }
        assert_eq!(s.pixel(50, 49), Some(Color::TRANSPARENT));
        assert_eq!(s.pixel(50, 151), Some(Color::TRANSPARENT));
        assert_eq!(s.pixel(51, 100), Some(Color::TRANSPARENT));
    });
    let painted = c.document().with_current(|s| s.read_pixels());

    assert!(c.undo().unwrap());
    assert_eq!(count(&c, Color::TRANSPARENT), 400 * 400);

    assert!(c.redo().unwrap());
    assert_eq!(c.document().with_current(|s| s.read_pixels()), painted);
}

#[test]
fn fill_whole_canvas_then_refill_is_noop() {
    let mut c = controller(10, 10);
    c.select_tool(ToolKind::Fill).unwrap();
    c.set_color(Color::RED);

    click(&mut c, 0.0, 0.0);
    assert_eq!(count(&c, Color::RED), 100);

    let before = c.document().with_current(|s| s.read_pixels());
    click(&mut c, 0.0, 0.0);
    assert_eq!(c.document().with_current(|s| s.read_pixels()), before);
    assert!(c.undo().unwrap());
    assert!(!c.undo().unwrap());
}

#[test]
fn fill_inside_drawn_outline_stays_inside() {
    let mut c = controller(40, 40);
    // Closed square outline from (10,10) to (30,30).
    stroke(&mut c, (10.0, 10.0), (30.0, 10.0));
    stroke(&mut c, (30.0, 10.0), (30.0, 30.0));
    stroke(&mut c, (30.0, 30.0), (10.0, 30.0));
    stroke(&mut c, (10.0, 30.0), (10.0, 10.0));

    c.select_tool(ToolKind::Fill).unwrap();
    c.set_color(Color::GREEN);
    click(&mut c, 20.0, 20.0);

    assert_eq!(count(&c, Color::GREEN), 19 * 19);
    c.document().with_current(|s| {
        assert_eq!(s.pixel(5, 5), Some(Color::TRANSPARENT));
        assert_eq!(s.pixel(10, 20), Some(Color::BLACK));
    });
}

#[test]
fn history_retains_at_most_ring_capacity() {
    let mut c = controller(32, 32);
    for i in 0..(HISTORY_DEPTH as i32 + 3) {
        let x = i as f32;
        click(&mut c, x, 0.0);
    }
    let mut undos = 0;
    while c.undo().unwrap() {
        undos += 1;
    }
    assert_eq!(undos, HISTORY_DEPTH - 1);
    // Oldest retained state still holds the stamps made before it.
    assert_eq!(count(&c, Color::BLACK), 4);
}

#[test]
fn resize_grow_keeps_pixels_and_shrink_crops() {
    let mut c = controller(20, 20);
    stroke(&mut c, (0.0, 0.0), (19.0, 19.0));

    assert!(c.resize(Size::new(50, 30)).unwrap());
    assert_eq!(c.size(), Size::new(50, 30));
    c.document().with_current(|s| {
        for i in 0..20 {
            assert_eq!(s.pixel(i, i), Some(Color::BLACK));
        }
        assert_eq!(s.pixel(40, 25), Some(Color::TRANSPARENT));
    });

    assert!(c.resize(Size::new(10, 10)).unwrap());
    assert_eq!(count(&c, Color::BLACK), 10);

    assert!(!c.resize(Size::new(10, 10)).unwrap());
    assert!(c.undo().unwrap());
    assert_eq!(c.size(), Size::new(50, 30));
    assert!(c.undo().unwrap());
    assert_eq!(c.size(), Size::new(20, 20));
    assert_eq!(count(&c, Color::BLACK), 20);
}

#[test]
fn paste_larger_image_grows_canvas() {
    let mut c = controller(10, 10);
    click(&mut c, 9.0, 9.0);
    let incoming = PixelSurface::filled(Size::new(4, 25), Color::BLUE).unwrap();
    c.paste(&incoming).unwrap();

    assert_eq!(c.size(), Size::new(10, 25));
    c.document().with_current(|s| {
        assert_eq!(s.pixel(9, 9), Some(Color::BLACK));
        assert_eq!(s.pixel(3, 24), Some(Color::BLUE));
        assert_eq!(s.pixel(4, 24), Some(Color::TRANSPARENT));
    });
}

#[test]
fn copy_selection_then_paste_round_trips_content() {
    let mut c = controller(30, 30);
    c.set_color(Color::PURPLE);
    stroke(&mut c, (2.0, 2.0), (6.0, 2.0));

    c.select_tool(ToolKind::Selection).unwrap();
    stroke(&mut c, (0.0, 0.0), (8.0, 4.0));
    let copied = c.copy_selection().unwrap().unwrap();
    assert_eq!(copied.size(), Size::new(8, 4));
    assert_eq!(copied.pixel(2, 2), Some(Color::PURPLE));

    c.clear().unwrap();
    assert_eq!(count(&c, Color::PURPLE), 0);
    c.paste(&copied).unwrap();
    assert_eq!(count(&c, Color::PURPLE), 5);
}

#[test]
fn png_file_round_trip_through_tempdir() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("canvas.png");

    let mut c = controller(16, 12);
    c.set_color(Color::rgba(200, 10, 10, 90));
    stroke(&mut c, (1.0, 1.0), (14.0, 10.0));
    let original = c.document().with_current(|s| s.read_pixels());
    c.save_png(std::fs::File::create(&path).unwrap()).unwrap();

    let mut other = controller(4, 4);
    let file = std::fs::File::open(&path).unwrap();
    other.load_png(BufReader::new(file)).unwrap();
    assert_eq!(other.size(), Size::new(16, 12));
    assert_eq!(other.document().with_current(|s| s.read_pixels()), original);
    assert!(!other.document().can_undo());
}

#[test]
fn corrupt_png_leaves_canvas_alone() {
    let mut c = controller(8, 8);
    click(&mut c, 1.0, 1.0);
    assert!(c.load_png(Cursor::new(vec![0u8; 64])).is_err());
    assert_eq!(c.size(), Size::new(8, 8));
    assert_eq!(count(&c, Color::BLACK), 1);
}

#[test]
fn presenter_shows_edits_over_checkerboard() {
    let settings = PaintSettings {
        canvas_width: 24,
        canvas_height: 24,
        refresh_rate: 500,
        ..PaintSettings::default()
    };
    let chain = HeadlessChain::new(settings.canvas_size(), settings.refresh_rate).unwrap();
    let probe = chain.probe();
    let mut c = PaintController::new(settings, Box::new(chain)).unwrap();

    c.select_tool(ToolKind::Fill).unwrap();
    c.set_color(Color::RED);
    c.document()
        .draw(c.document().acquire_mutation_slot().unwrap(), |s| {
            s.fill_rect(PixelRect::new(0, 0, 24, 12), Color::WHITE)
        })
        .unwrap();
    click(&mut c, 0.0, 0.0);

    let seen = probe.frames_presented();
    assert!(probe.wait_for_frames(seen + 2, Duration::from_secs(5)));
    let frame = probe.last_frame().unwrap();
    let pattern = Checkerboard::default();
    assert_eq!(frame.pixel(0, 0), Some(Color::RED));
    assert_eq!(frame.pixel(8, 20), Some(pattern.at(8, 20)));
    assert_eq!(frame.pixel(0, 20), Some(pattern.at(0, 20)));

    // Growing the canvas restarts the presenter at the new size.
    c.resize(Size::new(40, 24)).unwrap();
    let seen = probe.frames_presented();
    assert!(probe.wait_for_frames(seen + 2, Duration::from_secs(5)));
    assert_eq!(probe.last_frame().unwrap().size(), Size::new(40, 24));
    c.shutdown().unwrap();
}
