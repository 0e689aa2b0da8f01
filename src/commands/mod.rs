//! Command implementations for suppscore CLI

mod batch;
mod misc;
mod scrape;

pub use batch::*;
pub use misc::*;
pub use scrape::*;
