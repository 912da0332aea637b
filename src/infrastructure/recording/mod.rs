//! Recording infrastructure module
//!
//! Cross-platform capture using cpal, with FLAC encoding and sample-rate
//! conversion shared with the engine adapter's upload path.

mod capture;
pub mod flac;

pub use capture::CpalCapture;
pub use flac::{encode_to_flac, TARGET_SAMPLE_RATE};
