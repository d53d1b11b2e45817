//! Systems - logic that advances components

mod fleet;
mod jobs;
mod lifecycle;

pub use fleet::*;
pub use jobs::*;
pub use lifecycle::*;
