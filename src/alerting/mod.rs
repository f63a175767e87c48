//! Decides, per target and per cycle, what changed and who gets told.
pub mod change_detector;
