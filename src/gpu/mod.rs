// ============================================================================
// PRESENTATION - frame composition and display pacing
// ============================================================================
//
//   chain.rs     - PresentationChain trait, frame buffers, vsync pacing,
//                  and an in-memory chain for headless runs
//   presenter.rs - background loop that composes the current canvas over a
//                  checkerboard and presents it once per refresh
// ============================================================================

pub mod chain;
pub mod presenter;

pub use chain::{FrameBuffer, HeadlessChain, HeadlessProbe, PresentationChain, VsyncTimer};
pub use presenter::{Checkerboard, Presenter};
