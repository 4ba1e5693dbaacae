//! URL collection against the in-memory site

mod common;

use common::{category_url, product_url, test_config, FakePage, FakeSite};
use nutri_core::config::{Category, TimingConfig};
use nutri_core::ProductUrl;
use nutri_scraper::collector::UrlCollector;
use nutri_scraper::pipeline::collect_urls_on;
use nutri_scraper::storage::read_url_record;
use tempfile::TempDir;

fn urls(harvest: &[ProductUrl]) -> Vec<&str> {
    harvest.iter().map(ProductUrl::as_str).collect()
}

#[tokio::test]
async fn test_pagination_stops_at_empty_sentinel() {
    let base = category_url("proteinas");
    let site = FakeSite::new()
        .page(
            base.clone(),
            FakePage::listing(&[
                &product_url("whey-pro?utm_source=menu"),
                &product_url("protein-bar"),
                &category_url("snacks"),
            ]),
        )
        .page(
            format!("{}?p=2", base),
            FakePage::listing(&[&product_url("protein-bar"), &product_url("vegan-protein#reviews")]),
        )
        .page(format!("{}?p=3", base), FakePage::empty_listing())
        .page(format!("{}?p=4", base), FakePage::listing(&[&product_url("never-reached")]));

    let config = test_config(std::path::Path::new("unused"));
    let collector = UrlCollector::new(&site, &config.site, &config.timing);
    let harvest = collector
        .collect_category(&Category::new("PROTEINAS", base.clone()), None)
        .await;

    assert_eq!(harvest.pages, 3);
    assert_eq!(
        urls(&harvest.urls),
        vec![
            product_url("whey-pro"),
            product_url("protein-bar"),
            product_url("vegan-protein"),
        ]
    );
    assert_eq!(
        site.visited(),
        vec![base.clone(), format!("{}?p=2", base), format!("{}?p=3", base)]
    );
}

#[tokio::test]
async fn test_two_empty_reads_end_category() {
    let base = category_url("fibras");
    let site = FakeSite::new()
        .page(base.clone(), FakePage::listing(&[&product_url("fiber-mix")]))
        .page(format!("{}?p=2", base), FakePage::listing::<&str>(&[]));

    let config = test_config(std::path::Path::new("unused"));
    let collector = UrlCollector::new(&site, &config.site, &config.timing);
    let harvest = collector
        .collect_category(&Category::new("FIBRAS", base.clone()), None)
        .await;

    assert_eq!(harvest.pages, 2);
    assert_eq!(urls(&harvest.urls), vec![product_url("fiber-mix")]);
    assert_eq!(site.visited().len(), 2);
}

#[tokio::test]
async fn test_unreachable_category_yields_nothing() {
    let site = FakeSite::new();
    let config = test_config(std::path::Path::new("unused"));
    let collector = UrlCollector::new(&site, &config.site, &config.timing);

    let harvest = collector
        .collect_category(&Category::new("SHAKES", category_url("shakes")), None)
        .await;

    assert!(harvest.urls.is_empty());
    assert_eq!(harvest.pages, 0);
}

#[tokio::test]
async fn test_limit_and_page_cap() {
    let base = category_url("treino");
    let site = FakeSite::new()
        .page(
            base.clone(),
            FakePage::listing(&[&product_url("a"), &product_url("b"), &product_url("c")]),
        )
        .page(format!("{}?p=2", base), FakePage::listing(&[&product_url("d")]));

    let mut config = test_config(std::path::Path::new("unused"));
    let category = Category::new("TREINO", base.clone());

    let limited = UrlCollector::new(&site, &config.site, &config.timing)
        .collect_category(&category, Some(2))
        .await;
    assert_eq!(urls(&limited.urls), vec![product_url("a"), product_url("b")]);

    config.site.max_pages = Some(2);
    let timing = TimingConfig::instant();
    let capped = UrlCollector::new(&site, &config.site, &timing)
        .collect_category(&category, None)
        .await;
    assert_eq!(capped.pages, 2);
    assert_eq!(capped.urls.len(), 4);
}

#[tokio::test]
async fn test_collect_urls_dedupes_across_categories() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path());
    let proteins = category_url("proteinas");
    let training = category_url("treino");
    config.site.categories = vec![
        Category::new("PROTEINAS", proteins.clone()),
        Category::new("TREINO", training.clone()),
    ];

    let site = FakeSite::new()
        .page(
            proteins.clone(),
            FakePage::listing(&[&product_url("whey-pro"), &product_url("protein-bar")]),
        )
        .page(format!("{}?p=2", proteins), FakePage::empty_listing())
        .page(
            training.clone(),
            FakePage::listing(&[&product_url("creatine"), &product_url("whey-pro")]),
        )
        .page(format!("{}?p=2", training), FakePage::empty_listing());

    let collection = collect_urls_on(&site, &config).await.unwrap();

    assert_eq!(collection.record.total, 3);
    assert_eq!(
        collection.record.urls,
        vec![
            product_url("whey-pro"),
            product_url("protein-bar"),
            product_url("creatine"),
        ]
    );
    assert_eq!(collection.duplicates.unique, 3);
    assert_eq!(
        collection.duplicates.duplicated[&product_url("whey-pro")],
        vec!["PROTEINAS", "TREINO"]
    );

    let stored = read_url_record(&config.paths.urls_file).await.unwrap();
    assert_eq!(stored, collection.record);
}
