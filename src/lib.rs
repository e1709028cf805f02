// ============================================================================
// PAINTRING - single-canvas raster paint surface with ring-buffer history
// ============================================================================
//
// Architecture:
//   canvas.rs      - Color, geometry, PixelSurface + scoped DrawingSession
//   components/    - history ring and the pointer-driven tools
//   document.rs    - shared, lock-guarded canvas state and its commands
//   gpu/           - presentation chain abstraction + background presenter
//   controller.rs  - routes input/commands, owns tool and presenter lifetimes
//   io.rs          - PNG encode/decode
//   settings.rs    - persisted key=value preferences
//   logger.rs      - session log backend for the `log` facade
// ============================================================================

#![allow(clippy::type_complexity)]

pub mod canvas;
pub mod components;
pub mod controller;
pub mod document;
pub mod error;
pub mod gpu;
pub mod io;
pub mod logger;
pub mod settings;

pub use canvas::{Color, DrawingSession, PixelRect, PixelSurface, Point, Size};
pub use controller::PaintController;
pub use document::Document;
pub use error::{ControllerError, IoError, PresentError, SurfaceError};
