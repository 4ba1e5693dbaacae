//! Sequential extraction over a list of product URLs

use std::time::Duration;

use nutri_core::{NutritionRecord, ProductUrl};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::extractor::NutritionExtractor;

/// One URL to extract, optionally tagged with its category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItem {
    pub url: String,
    pub category: Option<String>,
}

impl BatchItem {
    pub fn new(url: impl Into<String>, category: Option<String>) -> Self {
        Self {
            url: url.into(),
            category,
        }
    }
}

impl From<ProductUrl> for BatchItem {
    fn from(url: ProductUrl) -> Self {
        Self::new(url.into_string(), None)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    pub url: String,
    pub error: String,
}

/// Outcome of a batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    /// Complete and partial records, in input order
    pub records: Vec<NutritionRecord>,
    /// URLs that produced no record
    pub failures: Vec<BatchFailure>,
    /// How many of `records` are partial
    pub partial: usize,
}

pub struct BatchRunner<'a> {
    extractor: NutritionExtractor<'a>,
    delay: Duration,
}

impl<'a> BatchRunner<'a> {
    /// `delay` is the pause between consecutive URLs
    pub fn new(extractor: NutritionExtractor<'a>, delay: Duration) -> Self {
        Self { extractor, delay }
    }

    /// Extract every item in order; a failing URL is logged and skipped
    pub async fn run(&self, items: &[BatchItem]) -> BatchReport {
        let mut report = BatchReport::default();
        let total = items.len();

        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                sleep(self.delay).await;
            }
            info!("[{}/{}] {}", i + 1, total, item.url);

            match self.extractor.extract(&item.url, item.category.as_deref()).await {
                Ok(extraction) => {
                    if extraction.is_partial() {
                        warn!("Partial record for {}", item.url);
                        report.partial += 1;
                    }
                    report.records.push(extraction.record);
                }
                Err(e) => {
                    warn!("Skipping {}: {}", item.url, e);
                    report.failures.push(BatchFailure {
                        url: item.url.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Batch done: {} records ({} partial), {} failures",
            report.records.len(),
            report.partial,
            report.failures.len()
        );
        report
    }
}
