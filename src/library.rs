//! Track model and directory scanning.
//!
//! A scanned directory becomes a fresh playlist when nothing was restored
//! from the session store.

mod model;
mod scan;

pub use model::Track;
pub use scan::scan;
