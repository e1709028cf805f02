use std::io::{BufRead, Seek, Write};

use crate::canvas::{Color, PixelRect, PixelSurface, Size};
use crate::components::tools::{
    create_tool, PointerEvent, PointerMove, Tool, ToolKind,
};
use crate::document::Document;
use crate::error::{ControllerError, PresentError};
use crate::gpu::chain::{HeadlessChain, PresentationChain};
use crate::gpu::presenter::{Checkerboard, Presenter};
use crate::settings::PaintSettings;

/// Swatches offered by the host, in display order.
pub const PALETTE: [Color; 9] = [
    Color::BLACK,
    Color::RED,
    Color::BLUE,
    Color::GREEN,
    Color::YELLOW,
    Color::WHITE,
    Color::BROWN,
    Color::ORANGE,
    Color::PURPLE,
];

/// Semantic keyboard commands. The host maps physical keys onto these.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Shortcut {
    Undo,
    Redo,
    Clear,
    ResizePreset,
    Save,
    Copy,
    Paste,
}

/// Work a shortcut hands back to the host because it needs OS services.
#[derive(Debug)]
pub enum HostRequest {
    /// Ask for a destination and call [`PaintController::save_png`].
    Save,
    /// Put this image on the system clipboard.
    CopyToClipboard(PixelSurface),
    /// Read an image from the system clipboard and call
    /// [`PaintController::paste`].
    PasteFromClipboard,
}

/// Routes pointer input and commands to the document and the active tool,
/// and keeps the presenter sized to the canvas.
///
/// Owns the single edit path: every mutation happens on the caller's thread.
pub struct PaintController {
    document: Document,
    presenter: Presenter,
    tool: Box<dyn Tool>,
    color: Color,
    /// Last selection, kept as the fill clip after leaving the selection tool.
    selection: Option<PixelRect>,
    settings: PaintSettings,
}

impl PaintController {
    /// Build the document at the configured size and start presenting to
    /// `chain`.
    pub fn new(
        settings: PaintSettings,
        chain: Box<dyn PresentationChain>,
    ) -> Result<Self, ControllerError> {
        let document = Document::new(settings.canvas_size())?;
        let color = Color::BLACK;
        let tool = create_tool(ToolKind::Pencil, color, settings.brush_size, None)?;
        let presenter = Presenter::new(
            document.shared_ring(),
            chain,
            Checkerboard::with_cell(settings.checker_cell),
        );
        let mut controller = Self {
            document,
            presenter,
            tool,
            color,
            selection: None,
            settings,
        };
        let size = controller.document.size();
        controller.presenter.resize(size)?;
        controller.presenter.start()?;
        log::info!("paint surface ready at {size}");
        Ok(controller)
    }

    /// Controller presenting into an in-memory chain.
    pub fn headless(settings: PaintSettings) -> Result<Self, ControllerError> {
        let chain = HeadlessChain::new(settings.canvas_size(), settings.refresh_rate)?;
        Self::new(settings, Box::new(chain))
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn presenter(&mut self) -> &mut Presenter {
        &mut self.presenter
    }

    pub fn settings(&self) -> &PaintSettings {
        &self.settings
    }

    pub fn size(&self) -> Size {
        self.document.size()
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn tool_kind(&self) -> ToolKind {
        self.tool.kind()
    }

    pub fn selection_rect(&self) -> Option<PixelRect> {
        self.tool.selection_rect(self.size())
    }

    /// Remembered selection limiting the fill tool, while it applies.
    pub fn fill_clip(&self) -> Option<PixelRect> {
        self.tool.clip()
    }

    // ---- Input ---------------------------------------------------------

    pub fn pointer_down(&mut self, event: PointerEvent) -> Result<(), ControllerError> {
        self.tool.on_pointer_down(&self.document, event)?;
        Ok(())
    }

    pub fn pointer_move(&mut self, event: &PointerMove) {
        self.tool.on_pointer_move(&self.document, event);
    }

    pub fn pointer_up(&mut self, event: PointerEvent) {
        self.tool.on_pointer_up(&self.document, event);
    }

    pub fn pointer_exit(&mut self) {
        self.tool.on_pointer_exit(&self.document);
    }

    // ---- Tool and color ------------------------------------------------

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
        self.tool.set_color(color);
    }

    /// Replace the active tool. The outgoing tool is disposed first.
    pub fn select_tool(&mut self, kind: ToolKind) -> Result<(), ControllerError> {
        if kind == self.tool.kind() {
            return Ok(());
        }
        if self.tool.kind() == ToolKind::Selection {
            self.selection = self.tool.selection_rect(self.size());
        }
        let next = create_tool(kind, self.color, self.settings.brush_size, self.selection)?;
        self.tool.dispose();
        self.tool = next;
        log::debug!("tool switched to {}", kind.label());
        Ok(())
    }

    // ---- Commands ------------------------------------------------------

    pub fn undo(&mut self) -> Result<bool, ControllerError> {
        self.track_size(|doc| Ok(doc.undo()))
    }

    pub fn redo(&mut self) -> Result<bool, ControllerError> {
        self.track_size(|doc| Ok(doc.redo()))
    }

    pub fn clear(&mut self) -> Result<(), ControllerError> {
        self.forget_selection();
        self.document.clear()?;
        Ok(())
    }

    pub fn resize(&mut self, size: Size) -> Result<bool, ControllerError> {
        self.forget_selection();
        self.track_size(|doc| Ok(doc.resize(size)?))
    }

    pub fn new_image(&mut self, size: Size) -> Result<(), ControllerError> {
        self.forget_selection();
        self.track_size(|doc| Ok(doc.new_image(size)?))
    }

    pub fn paste(&mut self, incoming: &PixelSurface) -> Result<(), ControllerError> {
        self.track_size(|doc| Ok(doc.paste(incoming)?))
    }

    pub fn save_png<W: Write>(&self, writer: W) -> Result<(), ControllerError> {
        self.document.save_png(writer)?;
        Ok(())
    }

    pub fn load_png<R: BufRead + Seek>(&mut self, reader: R) -> Result<(), ControllerError> {
        self.forget_selection();
        self.track_size(|doc| Ok(doc.load_png(reader)?))
    }

    /// Adopt an already decoded image as the only history state.
    pub fn load_surface(&mut self, surface: PixelSurface) -> Result<(), ControllerError> {
        self.forget_selection();
        self.track_size(|doc| {
            doc.replace_with(surface);
            Ok(())
        })
    }

    /// Detached copy of the selection, when the selection tool has one.
    pub fn copy_selection(&self) -> Result<Option<PixelSurface>, ControllerError> {
        let Some(rect) = self.selection_rect() else {
            return Ok(None);
        };
        Ok(Some(self.document.snapshot_copy(Some(rect))?))
    }

    pub fn handle_shortcut(
        &mut self,
        shortcut: Shortcut,
    ) -> Result<Option<HostRequest>, ControllerError> {
        match shortcut {
            Shortcut::Undo => {
                self.undo()?;
            }
            Shortcut::Redo => {
                self.redo()?;
            }
            Shortcut::Clear => self.clear()?,
            Shortcut::ResizePreset => {
                let preset = self.settings.resize_preset();
                self.resize(preset)?;
            }
            Shortcut::Save => return Ok(Some(HostRequest::Save)),
            Shortcut::Copy => {
                return Ok(self.copy_selection()?.map(HostRequest::CopyToClipboard));
            }
            Shortcut::Paste => return Ok(Some(HostRequest::PasteFromClipboard)),
        }
        Ok(None)
    }

    // ---- Presentation --------------------------------------------------

    /// Error that stopped the presenter, if it stopped on its own.
    pub fn take_present_error(&mut self) -> Option<PresentError> {
        self.presenter.take_error()
    }

    /// Resume presenting into a freshly created chain after a device loss.
    pub fn recover_presenter(
        &mut self,
        chain: Box<dyn PresentationChain>,
    ) -> Result<(), ControllerError> {
        // The dead loop may not have been reaped yet.
        if let Err(e) = self.presenter.stop() {
            log::warn!("discarding presenter error before recovery: {e}");
        }
        self.presenter.replace_chain(chain)?;
        self.presenter.resize(self.size())?;
        self.presenter.start()?;
        log::info!("presenter recovered");
        Ok(())
    }

    pub fn shutdown(&mut self) -> Result<(), ControllerError> {
        self.tool.dispose();
        self.presenter.stop()?;
        Ok(())
    }

    /// Run a command and, if it changed the canvas size, restart the
    /// presenter at the new size.
    fn track_size<T>(
        &mut self,
        command: impl FnOnce(&Document) -> Result<T, ControllerError>,
    ) -> Result<T, ControllerError> {
        let before = self.document.size();
        let result = command(&self.document)?;
        let after = self.document.size();
        if after != before {
            // The remembered clip belongs to the old geometry.
            self.forget_selection();
            if let Err(e) = self.presenter.stop() {
                // Chain lost before the command ran. The command stands and
                // the loss stays queued for `take_present_error`.
                log::warn!("presenter down during resize to {after}: {e}");
                self.presenter.hold_error(e);
                return Ok(result);
            }
            self.presenter.resize(after)?;
            self.presenter.start()?;
        }
        Ok(result)
    }

    fn forget_selection(&mut self) {
        self.selection = None;
        self.tool.set_clip(None);
        if self.tool.kind() == ToolKind::Selection {
            self.tool.dispose();
        }
    }
}

impl Drop for PaintController {
    fn drop(&mut self) {
        self.tool.dispose();
    }
}
