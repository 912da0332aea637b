//! Local media infrastructure module

mod probe;

pub use probe::FileProbe;
