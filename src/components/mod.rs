pub mod history;
pub mod tools;

pub use history::{HistoryRing, HistoryStep, SlotHandle, HISTORY_DEPTH};
