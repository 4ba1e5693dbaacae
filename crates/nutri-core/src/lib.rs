//! # nutri-core
//!
//! Core types for the nutrition-facts scraper.
//!
//! The scraper drives a real browser through a product catalogue, collects
//! product URLs per category and turns each product's "Nutrition Information"
//! table into a typed [`NutritionRecord`].
//!
//! ## Contents
//!
//! - [`NutriError`] / [`Result`]: the unified error type
//! - Domain types: [`BrowserKind`], [`BrowserDescriptor`], [`ProductUrl`],
//!   [`UrlCollectionRecord`], [`NutritionRecord`], [`NutrientField`]
//! - [`config`]: TOML configuration, including the site tables
//! - [`numbers`]: locale-formatted number parsing
//! - [`wait`]: bounded polling against a predicate
//! - [`fail_open`]: graceful degradation for non-critical page steps

mod error;
mod types;

pub mod config;
pub mod fail_open;
pub mod numbers;
pub mod wait;

pub use config::NutriConfig;
pub use error::{NutriError, Result};
pub use numbers::parse_locale_number;
pub use types::*;
