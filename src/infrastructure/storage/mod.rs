//! Document storage infrastructure module

mod documents;

pub use documents::DocumentsStore;
