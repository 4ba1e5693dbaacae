//! # nutri-scraper
//!
//! Walks the product catalogue on a live [`Session`](nutri_browser::Session):
//!
//! - [`collector`]: paginates category listings into product URLs
//! - [`extractor`]: reads one product page's nutrition table into a record
//! - [`nutrients`]: maps table row labels to record fields
//! - [`batch`]: runs the extractor over many URLs
//! - [`storage`]: URL JSON file, nutrition CSV, output listing and cleanup
//! - [`pipeline`]: the end-to-end operations, each on its own browser

pub mod batch;
pub mod collector;
pub mod extractor;
pub mod nutrients;
pub mod pipeline;
pub mod storage;

pub use batch::{BatchItem, BatchReport, BatchRunner};
pub use collector::{analyze_duplicates, CategoryHarvest, DuplicateReport, UrlCollector};
pub use extractor::{Extraction, NutritionExtractor};
pub use nutrients::NutrientMatcher;
pub use pipeline::{NutritionRun, Pipeline, UrlCollection};
