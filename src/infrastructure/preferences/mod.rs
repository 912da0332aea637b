//! Preference persistence infrastructure module

mod xdg;

pub use xdg::XdgPreferenceStore;
