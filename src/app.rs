use std::sync::{Arc, Mutex, MutexGuard};

use eframe::egui;
use egui::{Color32, Pos2, Rect, Stroke};

use paintring::canvas::{Color, Point, Size};
use paintring::components::tools::{PointerEvent, PointerMove, ToolKind};
use paintring::controller::{HostRequest, Shortcut, PALETTE};
use paintring::error::{ControllerError, PresentError, SurfaceError};
use paintring::gpu::chain::{FrameBuffer, PresentationChain, VsyncTimer};
use paintring::settings::PaintSettings;
use paintring::{io, PaintController};

use crate::ops::clipboard;

// ============================================================================
// EGUI CHAIN - presents frames into a mailbox the UI thread uploads from
// ============================================================================

type Mailbox = Arc<Mutex<Option<FrameBuffer>>>;

fn lock_mailbox(mailbox: &Mailbox) -> MutexGuard<'_, Option<FrameBuffer>> {
    mailbox.lock().unwrap_or_else(|e| e.into_inner())
}

struct EguiChain {
    back: FrameBuffer,
    mailbox: Mailbox,
    ctx: egui::Context,
    vsync: VsyncTimer,
}

impl EguiChain {
    fn new(
        ctx: egui::Context,
        mailbox: Mailbox,
        size: Size,
        refresh_rate: u32,
    ) -> Result<Self, SurfaceError> {
        Ok(Self {
            back: FrameBuffer::new(size)?,
            mailbox,
            ctx,
            vsync: VsyncTimer::new(refresh_rate),
        })
    }
}

impl PresentationChain for EguiChain {
    fn size(&self) -> Size {
        self.back.size()
    }

    fn back_buffer(&mut self) -> &mut FrameBuffer {
        &mut self.back
    }

    fn present(&mut self) -> Result<(), PresentError> {
        // The window owns the other end; once it is gone there is no display.
        if Arc::strong_count(&self.mailbox) < 2 {
            return Err(PresentError::DeviceLost("window closed".into()));
        }
        let mut slot = lock_mailbox(&self.mailbox);
        match slot.as_mut() {
            Some(frame) if frame.size() == self.back.size() => {
                frame.pixels_mut().copy_from_slice(self.back.pixels());
            }
            Some(_) | None => {
                *slot = Some(self.back.clone());
            }
        }
        drop(slot);
        self.ctx.request_repaint();
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

// ============================================================================
// APP
// ============================================================================

enum UiAction {
    Tool(ToolKind),
    Color(Color),
    Shortcut(Shortcut),
    New,
    Open,
}

pub struct PaintRingApp {
    controller: Option<PaintController>,
    ctx: egui::Context,
    mailbox: Mailbox,
    texture: Option<egui::TextureHandle>,
    status: String,
    pointer_inside: bool,
}

impl PaintRingApp {
    pub fn new(cc: &eframe::CreationContext<'_>, settings: PaintSettings) -> Self {
        let ctx = cc.egui_ctx.clone();
        let mailbox: Mailbox = Arc::new(Mutex::new(None));
        let controller = EguiChain::new(
            ctx.clone(),
            Arc::clone(&mailbox),
            settings.canvas_size(),
            settings.refresh_rate,
        )
        .map_err(ControllerError::from)
        .and_then(|chain| PaintController::new(settings, Box::new(chain)));

        let (controller, status) = match controller {
            Ok(c) => (Some(c), String::from("Ready")),
            Err(e) => {
                log::error!("could not create paint surface: {e}");
                (None, format!("Could not create paint surface: {e}"))
            }
        };
        Self {
            controller,
            ctx,
            mailbox,
            texture: None,
            status,
            pointer_inside: false,
        }
    }

    fn report(&mut self, result: Result<(), ControllerError>) {
        if let Err(e) = result {
            log::error!("{e}");
            self.status = e.to_string();
        }
    }

    /// Rebuild the display chain after the presenter lost its device.
    fn recover_presenter(&mut self, cause: PresentError) {
        log::warn!("presenter stopped: {cause}");
        let Some(controller) = self.controller.as_mut() else {
            return;
        };
        let chain = EguiChain::new(
            self.ctx.clone(),
            Arc::clone(&self.mailbox),
            controller.size(),
            controller.settings().refresh_rate,
        );
        let result = chain
            .map_err(ControllerError::from)
            .and_then(|chain| controller.recover_presenter(Box::new(chain)));
        self.report(result);
    }

    fn apply(&mut self, action: UiAction) {
        let Some(controller) = self.controller.as_mut() else {
            return;
        };
        let result = match action {
            UiAction::Tool(kind) => controller.select_tool(kind),
            UiAction::Color(color) => {
                controller.set_color(color);
                Ok(())
            }
            UiAction::New => {
                let size = controller.settings().canvas_size();
                controller.new_image(size)
            }
            UiAction::Open => open_dialog(controller),
            UiAction::Shortcut(shortcut) => match controller.handle_shortcut(shortcut) {
                Ok(Some(request)) => fulfil(controller, request),
                Ok(None) => Ok(()),
                Err(e) => Err(e),
            },
        };
        self.report(result);
    }

    fn upload_frame(&mut self, ctx: &egui::Context) {
        let Some(frame) = lock_mailbox(&self.mailbox).take() else {
            return;
        };
        let size = frame.size();
        let image = egui::ColorImage::from_rgba_unmultiplied(
            [size.width as usize, size.height as usize],
            frame.as_bytes(),
        );
        match self.texture.as_mut() {
            Some(texture) => texture.set(image, egui::TextureOptions::NEAREST),
            None => {
                self.texture =
                    Some(ctx.load_texture("canvas", image, egui::TextureOptions::NEAREST));
            }
        }
    }

    fn toolbar(&self, ui: &mut egui::Ui, actions: &mut Vec<UiAction>) {
        let Some(controller) = self.controller.as_ref() else {
            return;
        };
        ui.horizontal(|ui| {
            if ui.button("New").clicked() {
                actions.push(UiAction::New);
            }
            if ui.button("Open…").clicked() {
                actions.push(UiAction::Open);
            }
            if ui.button("Save…").clicked() {
                actions.push(UiAction::Shortcut(Shortcut::Save));
            }
            ui.separator();

            for kind in ToolKind::ALL {
                if ui
                    .selectable_label(controller.tool_kind() == kind, kind.label())
                    .clicked()
                {
                    actions.push(UiAction::Tool(kind));
                }
            }
            ui.separator();

            for color in PALETTE {
                let (rect, response) =
                    ui.allocate_exact_size(egui::vec2(18.0, 18.0), egui::Sense::click());
                ui.painter().rect_filled(rect, 2.0, to_color32(color));
                if controller.color() == color {
                    ui.painter()
                        .rect_stroke(rect.expand(2.0), 2.0, Stroke::new(2.0, Color32::WHITE));
                }
                if response.clicked() {
                    actions.push(UiAction::Color(color));
                }
            }
            ui.separator();

            let doc = controller.document();
            if ui.add_enabled(doc.can_undo(), egui::Button::new("Undo")).clicked() {
                actions.push(UiAction::Shortcut(Shortcut::Undo));
            }
            if ui.add_enabled(doc.can_redo(), egui::Button::new("Redo")).clicked() {
                actions.push(UiAction::Shortcut(Shortcut::Redo));
            }
            if ui.button("Clear").clicked() {
                actions.push(UiAction::Shortcut(Shortcut::Clear));
            }
        });
    }

    fn canvas(&mut self, ui: &mut egui::Ui) {
        let Some(controller) = self.controller.as_mut() else {
            return;
        };
        let size = controller.size();
        let desired = egui::vec2(size.width as f32, size.height as f32);
        let (rect, _response) = ui.allocate_exact_size(desired, egui::Sense::click_and_drag());

        if let Some(texture) = &self.texture {
            let uv = Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0));
            ui.painter().image(texture.id(), rect, uv, Color32::WHITE);
        }

        // Points -> canvas pixels, independent of display scaling.
        let to_canvas = |p: Pos2| {
            Point::new(
                (p.x - rect.min.x) * size.width as f32 / rect.width(),
                (p.y - rect.min.y) * size.height as f32 / rect.height(),
            )
        };

        let (moves, pressed, released, down, latest) = ui.input(|i| {
            let moves: Vec<Pos2> = i
                .events
                .iter()
                .filter_map(|e| match e {
                    egui::Event::PointerMoved(p) => Some(*p),
                    _ => None,
                })
                .collect();
            (
                moves,
                i.pointer.primary_pressed(),
                i.pointer.primary_released(),
                i.pointer.primary_down(),
                i.pointer.latest_pos(),
            )
        });
        let hovered = latest.is_some_and(|p| rect.contains(p));

        let mut result = Ok(());
        if pressed && hovered {
            if let Some(p) = latest {
                let p = to_canvas(p);
                result = controller.pointer_down(PointerEvent::pressed(p.x, p.y));
            }
        }
        if let Some((last, earlier)) = moves.split_last() {
            if hovered || self.pointer_inside {
                let event = PointerMove::with_intermediate(
                    earlier.iter().map(|p| to_canvas(*p)).collect(),
                    to_canvas(*last),
                    down,
                );
                controller.pointer_move(&event);
            }
        }
        if released {
            let p = to_canvas(latest.unwrap_or(rect.min));
            controller.pointer_up(PointerEvent::released(p.x, p.y));
        }
        if self.pointer_inside && !hovered {
            controller.pointer_exit();
        }
        self.pointer_inside = hovered;

        // Live selection in blue; a remembered fill clip in amber.
        let outline = controller
            .selection_rect()
            .map(|r| (r, Color32::from_rgb(0, 120, 215)))
            .or_else(|| controller.fill_clip().map(|r| (r, Color32::from_rgb(230, 160, 0))));
        if let Some((sel, color)) = outline {
            let sx = rect.width() / size.width as f32;
            let sy = rect.height() / size.height as f32;
            let min = rect.min + egui::vec2(sel.x as f32 * sx, sel.y as f32 * sy);
            let max = min + egui::vec2(sel.width as f32 * sx, sel.height as f32 * sy);
            ui.painter()
                .rect_stroke(Rect::from_min_max(min, max), 0.0, Stroke::new(1.0, color));
        }

        self.report(result);
    }
}

impl eframe::App for PaintRingApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if let Some(err) = self.controller.as_mut().and_then(|c| c.take_present_error()) {
            self.recover_presenter(err);
        }

        let mut actions = Vec::new();
        ctx.input(|i| {
            let ctrl = i.modifiers.command;
            let bindings = [
                (egui::Key::Z, Shortcut::Undo),
                (egui::Key::Y, Shortcut::Redo),
                (egui::Key::N, Shortcut::Clear),
                (egui::Key::R, Shortcut::ResizePreset),
                (egui::Key::S, Shortcut::Save),
            ];
            for (key, shortcut) in bindings {
                if ctrl && i.key_pressed(key) {
                    actions.push(UiAction::Shortcut(shortcut));
                }
            }
            // Copy/paste arrive as clipboard events rather than key presses.
            for event in &i.events {
                match event {
                    egui::Event::Copy => actions.push(UiAction::Shortcut(Shortcut::Copy)),
                    egui::Event::Paste(_) => actions.push(UiAction::Shortcut(Shortcut::Paste)),
                    _ => {}
                }
            }
        });

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            self.toolbar(ui, &mut actions);
        });

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if let Some(c) = &self.controller {
                    ui.label(format!("{}  |  {}", c.size(), c.tool_kind().label()));
                    ui.separator();
                }
                ui.label(self.status.as_str());
            });
        });

        self.upload_frame(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::both().show(ui, |ui| {
                self.canvas(ui);
            });
        });

        for action in actions {
            self.apply(action);
        }
    }
}

fn fulfil(controller: &mut PaintController, request: HostRequest) -> Result<(), ControllerError> {
    match request {
        HostRequest::Save => save_dialog(controller),
        HostRequest::CopyToClipboard(image) => {
            clipboard::copy_to_system_clipboard(&image);
            Ok(())
        }
        HostRequest::PasteFromClipboard => match clipboard::get_from_system_clipboard() {
            Some(image) => controller.paste(&image),
            None => Ok(()),
        },
    }
}

fn save_dialog(controller: &PaintController) -> Result<(), ControllerError> {
    let Some(path) = rfd::FileDialog::new()
        .add_filter("PNG image", &["png"])
        .set_file_name("untitled.png")
        .save_file()
    else {
        return Ok(());
    };
    let snapshot = controller.document().snapshot_copy(None)?;
    io::save_png_file(&snapshot, &path)?;
    Ok(())
}

fn open_dialog(controller: &mut PaintController) -> Result<(), ControllerError> {
    let Some(path) = rfd::FileDialog::new()
        .add_filter("PNG image", &["png"])
        .pick_file()
    else {
        return Ok(());
    };
    let surface = io::load_png_file(&path)?;
    controller.load_surface(surface)
}

fn to_color32(c: Color) -> Color32 {
    Color32::from_rgba_unmultiplied(c.r, c.g, c.b, c.a)
}
