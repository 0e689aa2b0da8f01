pub mod batch;
pub mod cascade;
pub mod categorize;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod extract;
pub mod fetch;
pub mod images;
pub mod keywords;
pub mod normalize;
pub mod record;
pub mod retailer;
pub mod score;

pub use error::{Result, ScrapeError};
