//! Device enumeration infrastructure module

mod cpal_enumerator;

pub use cpal_enumerator::CpalEnumerator;
