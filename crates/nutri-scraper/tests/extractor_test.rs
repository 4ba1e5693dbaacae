//! Product page extraction against the in-memory site

mod common;

use common::{product_url, test_config, FakePage, FakeSite};
use nutri_core::{NutriConfig, NutriError, NutrientField};
use nutri_scraper::extractor::NutritionExtractor;

fn whey_rows() -> Vec<(&'static str, &'static str)> {
    vec![
        ("Valor energético (kcal)", "118"),
        ("Carboidratos (g)", "2,1"),
        ("Proteínas (g)", "24"),
        ("Gorduras totais (g)", "1,5"),
        ("Gorduras trans (g)", "0"),
        ("Sódio (mg)", "1.020,5"),
    ]
}

#[tokio::test]
async fn test_full_extraction() {
    let url = product_url("whey-pro");
    let site = FakeSite::new().page(url.clone(), FakePage::product("Whey Pro Baunilha", &whey_rows()));
    let config = test_config(std::path::Path::new("unused"));
    let extractor = NutritionExtractor::new(&site, &config.site, &config.timing);

    let extraction = extractor.extract(&url, Some("PROTEINAS")).await.unwrap();
    let record = &extraction.record;

    assert!(extraction.toggle_found);
    assert!(extraction.table_found);
    assert!(!extraction.is_partial());
    assert_eq!(record.name, "Whey Pro Baunilha");
    assert_eq!(record.category.as_deref(), Some("PROTEINAS"));
    assert_eq!(record.url, url);
    assert_eq!(record.portion, "Porção de 30 g (1 dosador)");
    assert_eq!(record.calories, 118.0);
    assert_eq!(record.carbohydrates, 2.1);
    assert_eq!(record.protein, 24.0);
    assert_eq!(record.sodium, 1020.5);
}

#[tokio::test]
async fn test_total_fat_row_only_sets_total_fat() {
    let url = product_url("whey-pro");
    let site = FakeSite::new().page(url.clone(), FakePage::product("Whey Pro", &whey_rows()));
    let config = test_config(std::path::Path::new("unused"));
    let extractor = NutritionExtractor::new(&site, &config.site, &config.timing);

    let extraction = extractor.extract(&url, None).await.unwrap();

    assert_eq!(extraction.record.total_fat, 1.5);
    assert_eq!(extraction.record.saturated_fat, 0.0);
    assert_eq!(extraction.record.fiber, 0.0);
    assert!(extraction.matched.contains(&NutrientField::TotalFat));
    assert!(!extraction.matched.contains(&NutrientField::SaturatedFat));
    assert!(!extraction.matched.contains(&NutrientField::Fiber));
}

#[tokio::test]
async fn test_missing_toggle_gives_zeroed_record() {
    let url = product_url("gift-card");
    let site = FakeSite::new().page(url.clone(), FakePage::product_without_toggle("Cartão Presente"));
    let config = test_config(std::path::Path::new("unused"));
    let extractor = NutritionExtractor::new(&site, &config.site, &config.timing);

    let extraction = extractor.extract(&url, None).await.unwrap();

    assert!(!extraction.toggle_found);
    assert!(!extraction.table_found);
    assert!(extraction.is_partial());
    assert_eq!(extraction.record.name, "Cartão Presente");
    assert_eq!(extraction.record.url, url);
    assert!(extraction.record.nutrients_are_zero());
    assert_eq!(extraction.record.portion, "");
}

#[tokio::test]
async fn test_alternate_toggle_is_used() {
    let url = product_url("omega-3");
    let mut page = FakePage::product("Omega 3", &[("Gorduras totais (g)", "2")]);
    let alternate = nutri_core::config::Locator::css("a[href='#information']");
    page.elements.retain(|(l, _)| l.to_string().contains("h1"));
    page.elements.push((alternate.clone(), "Informação Nutricional".to_string()));
    page.toggle = Some(alternate);

    let site = FakeSite::new().page(url.clone(), page);
    let config = test_config(std::path::Path::new("unused"));
    let extractor = NutritionExtractor::new(&site, &config.site, &config.timing);

    let extraction = extractor.extract(&url, None).await.unwrap();
    assert!(extraction.table_found);
    assert_eq!(extraction.record.total_fat, 2.0);
}

#[tokio::test]
async fn test_navigation_failure_is_an_error() {
    let site = FakeSite::new();
    let config = test_config(std::path::Path::new("unused"));
    let extractor = NutritionExtractor::new(&site, &config.site, &config.timing);

    let err = extractor.extract(&product_url("gone"), None).await.unwrap_err();
    assert!(matches!(err, NutriError::Navigation { .. }));
}

#[tokio::test]
async fn test_exact_policy_from_config_file() {
    let url = product_url("whey-pro");
    let site = FakeSite::new().page(url.clone(), FakePage::product("Whey Pro", &whey_rows()));
    let parsed = NutriConfig::from_toml_str("[site]\nmatch_policy = \"exact\"\n").unwrap();
    let mut config = test_config(std::path::Path::new("unused"));
    config.site = parsed.site;
    let extractor = NutritionExtractor::new(&site, &config.site, &config.timing);

    let extraction = extractor.extract(&url, None).await.unwrap();

    assert_eq!(extraction.record.protein, 24.0);
    assert_eq!(extraction.record.total_fat, 1.5);
    assert_eq!(extraction.record.sodium, 1020.5);
    assert_eq!(extraction.record.saturated_fat, 0.0);
    assert!(!extraction.is_partial());
}
