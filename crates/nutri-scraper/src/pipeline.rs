//! End-to-end runs
//!
//! Each [`Pipeline`] operation opens one browser session, runs under
//! [`run_guarded`] so the browser is always shut down, and writes its output
//! files. The `*_on` functions do the same work on a session the caller owns.

use std::collections::HashSet;
use std::path::PathBuf;

use chrono::Local;
use nutri_browser::{run_guarded, DriverFactory, Session};
use nutri_core::{BrowserKind, NutriConfig, ProductUrl, Result, UrlCollectionRecord};
use tracing::info;

use crate::batch::{BatchItem, BatchReport, BatchRunner};
use crate::collector::{analyze_duplicates, merge_harvests, DuplicateReport, UrlCollector};
use crate::extractor::NutritionExtractor;
use crate::storage::{read_url_record, write_nutrition_csv, write_url_record};

/// Result of a URL collection pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlCollection {
    pub record: UrlCollectionRecord,
    pub duplicates: DuplicateReport,
    pub path: PathBuf,
}

/// Result of a nutrition pass
#[derive(Debug, Clone, PartialEq)]
pub struct NutritionRun {
    pub report: BatchReport,
    /// Where the CSV went; `None` when no record was collected
    pub csv: Option<PathBuf>,
}

/// Collect every configured category and write the URL file
pub async fn collect_urls_on(session: &dyn Session, config: &NutriConfig) -> Result<UrlCollection> {
    let collector = UrlCollector::new(session, &config.site, &config.timing);
    let harvests = collector.collect_all(&config.site.categories).await;

    let duplicates = analyze_duplicates(&harvests);
    info!(
        "{} unique URLs, {} listed in more than one category",
        duplicates.unique,
        duplicates.duplicated.len()
    );
    for (url, categories) in &duplicates.duplicated {
        info!("{} appears in {}", url, categories.join(", "));
    }

    let record = UrlCollectionRecord::new(merge_harvests(&harvests), Local::now().naive_local());
    let path = config.paths.urls_file.clone();
    write_url_record(&path, &record).await?;
    info!("Saved {} URLs to {}", record.total, path.display());

    Ok(UrlCollection {
        record,
        duplicates,
        path,
    })
}

/// Extract `items` and write the records to `csv_path`
pub async fn collect_nutrition_on(
    session: &dyn Session,
    config: &NutriConfig,
    items: &[BatchItem],
    csv_path: PathBuf,
) -> Result<NutritionRun> {
    let extractor = NutritionExtractor::new(session, &config.site, &config.timing);
    let runner = BatchRunner::new(extractor, config.timing.inter_request_delay());
    let report = runner.run(items).await;

    let csv = write_nutrition_csv(&csv_path, &report.records)
        .await?
        .map(|_| csv_path);

    Ok(NutritionRun { report, csv })
}

/// Bounded run: a few URLs from the quick-test categories, then their
/// nutrition facts with the category column filled
pub async fn quick_test_on(session: &dyn Session, config: &NutriConfig) -> Result<NutritionRun> {
    let quick = &config.site.quick_test;
    let collector = UrlCollector::new(session, &config.site, &config.timing);

    let mut items: Vec<BatchItem> = Vec::new();
    let mut seen = HashSet::new();
    for category in config.site.quick_test_categories() {
        let room = quick.max_products.saturating_sub(items.len());
        if room == 0 {
            break;
        }

        let harvest = collector
            .collect_category(category, Some(quick.per_category.min(room)))
            .await;
        for url in harvest.urls {
            if items.len() < quick.max_products && seen.insert(url.clone()) {
                items.push(BatchItem::new(url.into_string(), Some(category.name.clone())));
            }
        }
    }
    info!("Quick test over {} URLs", items.len());

    let record = UrlCollectionRecord::new(
        items.iter().filter_map(|item| ProductUrl::parse(&item.url).ok()),
        Local::now().naive_local(),
    );
    write_url_record(&config.paths.test_urls_file, &record).await?;

    collect_nutrition_on(session, config, &items, config.paths.test_csv_file.clone()).await
}

/// Runs the scraper operations on freshly launched browsers
pub struct Pipeline {
    config: NutriConfig,
    factory: DriverFactory,
    browser: Option<BrowserKind>,
    headless: bool,
}

impl Pipeline {
    pub fn new(config: NutriConfig, browser: Option<BrowserKind>, headless: bool) -> Self {
        let factory = DriverFactory::new(config.browser.clone(), config.timing.clone());
        Self {
            config,
            factory,
            browser,
            headless,
        }
    }

    pub fn with_factory(mut self, factory: DriverFactory) -> Self {
        self.factory = factory;
        self
    }

    pub fn config(&self) -> &NutriConfig {
        &self.config
    }

    pub fn factory(&self) -> &DriverFactory {
        &self.factory
    }

    async fn session(&self) -> Result<Box<dyn Session>> {
        self.factory.create_session(self.browser, self.headless).await
    }

    pub async fn collect_urls(&self) -> Result<UrlCollection> {
        let session = self.session().await?;
        run_guarded(session.as_ref(), collect_urls_on(session.as_ref(), &self.config)).await
    }

    /// Extract every URL in the URL file; fails before launching a browser
    /// when the file is missing
    pub async fn collect_nutrition(&self) -> Result<NutritionRun> {
        let record = read_url_record(&self.config.paths.urls_file).await?;
        let items: Vec<BatchItem> = record.product_urls().into_iter().map(BatchItem::from).collect();
        info!("Loaded {} URLs collected at {}", items.len(), record.collected_at);

        let session = self.session().await?;
        run_guarded(
            session.as_ref(),
            collect_nutrition_on(
                session.as_ref(),
                &self.config,
                &items,
                self.config.paths.csv_file.clone(),
            ),
        )
        .await
    }

    /// URL collection followed by extraction, on one browser
    pub async fn full_pipeline(&self) -> Result<NutritionRun> {
        let session = self.session().await?;
        let session = session.as_ref();
        run_guarded(session, async {
            let collection = collect_urls_on(session, &self.config).await?;
            let items: Vec<BatchItem> = collection
                .record
                .product_urls()
                .into_iter()
                .map(BatchItem::from)
                .collect();
            collect_nutrition_on(session, &self.config, &items, self.config.paths.csv_file.clone()).await
        })
        .await
    }

    pub async fn quick_test(&self) -> Result<NutritionRun> {
        let session = self.session().await?;
        run_guarded(session.as_ref(), quick_test_on(session.as_ref(), &self.config)).await
    }
}
