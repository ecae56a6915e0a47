pub mod analyzer;
pub mod beat_phase;
pub mod tempo;
pub mod window;
