//! Configuration management for the scraper
//!
//! Everything site-specific lives here: the category table, CSS selectors,
//! the nutrient label table and the matching policy. Components receive these
//! tables from the loaded [`NutriConfig`] instead of reaching for constants,
//! which keeps extraction logic testable against synthetic tables.
//!
//! Timing values mirror the fixed sleeps of the first version of the scraper.
//! They are used as upper bounds for polls, not as unconditional delays,
//! except for the politeness delays between pages and requests.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::wait::PollPolicy;
use crate::{BrowserKind, NutrientField, NutriError, Result};

/// Default configuration file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "nutri.toml";

/// Top-level scraper configuration
///
/// Loaded from `nutri.toml`; every section falls back to defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NutriConfig {
    /// Browser selection and launch settings
    #[serde(default)]
    pub browser: BrowserSettings,

    /// Wait bounds and politeness delays
    #[serde(default)]
    pub timing: TimingConfig,

    /// Input and output file locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Site tables: categories, selectors, nutrient labels
    #[serde(default)]
    pub site: SiteConfig,
}

/// Browser selection and launch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserSettings {
    /// Browser to use; `None` picks the first available
    #[serde(default)]
    pub preferred: Option<BrowserKind>,

    /// Run without a visible window
    #[serde(default = "default_headless")]
    pub headless: bool,

    #[serde(default = "default_window_width")]
    pub window_width: u32,

    #[serde(default = "default_window_height")]
    pub window_height: u32,

    /// Extra command-line flags passed to the browser
    #[serde(default)]
    pub extra_args: Vec<String>,

    /// Where downloaded driver binaries are cached
    #[serde(default)]
    pub driver_cache_dir: Option<PathBuf>,

    /// Seconds without a command before the browser is considered idle
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
}

/// Wait bounds and politeness delays, in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Bound for `document.readyState == "complete"`
    pub page_ready_timeout_ms: u64,
    /// Bound for waits on primary selectors
    pub element_timeout_ms: u64,
    /// Bound for each alternate toggle selector
    pub alternate_timeout_ms: u64,
    /// Probe interval for every bounded wait
    pub poll_interval_ms: u64,
    /// Bound for client-side rendering to produce the product title
    pub settle_timeout_ms: u64,
    /// Bound for lazy-loaded listings to stop growing after a scroll
    pub scroll_settle_ms: u64,
    /// Bound for the nutrition table to appear after the reveal click
    pub reveal_timeout_ms: u64,
    /// Pause before re-reading a listing page that showed no products
    pub empty_retry_delay_ms: u64,
    /// Pause between listing pages
    pub inter_page_delay_ms: u64,
    /// Pause between product pages in a batch
    pub inter_request_delay_ms: u64,
}

/// Input and output file locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub data_dir: PathBuf,
    pub urls_file: PathBuf,
    pub csv_file: PathBuf,
    pub test_urls_file: PathBuf,
    pub test_csv_file: PathBuf,
}

/// Target-site tables
///
/// Scalar fields come before tables so the struct serializes to valid TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Product hrefs must contain this host
    #[serde(default = "default_product_host")]
    pub product_host: String,

    /// Hrefs containing this path fragment are listings, not products
    #[serde(default = "default_listing_path_marker")]
    pub listing_path_marker: String,

    /// Query parameter carrying the listing page number
    #[serde(default = "default_page_param")]
    pub page_param: String,

    /// Optional cap on listing pages per category
    #[serde(default)]
    pub max_pages: Option<u32>,

    /// Body zoom applied on product pages (cosmetic)
    #[serde(default = "default_zoom_percent")]
    pub zoom_percent: u32,

    #[serde(default)]
    pub match_policy: MatchPolicy,

    /// Category listing pages, in collection order
    #[serde(default = "default_categories")]
    pub categories: Vec<Category>,

    /// Label fragments for [`MatchPolicy::Substring`]
    #[serde(default = "default_nutrient_labels")]
    pub nutrients: Vec<NutrientLabel>,

    /// Full row labels for [`MatchPolicy::Exact`]
    #[serde(default = "NutrientLabel::exact_defaults")]
    pub exact_nutrients: Vec<NutrientLabel>,

    #[serde(default)]
    pub selectors: Selectors,

    #[serde(default)]
    pub quick_test: QuickTestConfig,
}

/// A named category listing page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub url: String,
}

impl Category {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// How an element is found on the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Locator {
    /// First element matching a CSS selector
    Css { css: String },
    /// First element matching `scope` whose trimmed text equals `text`
    Text { scope: String, text: String },
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css {
            css: selector.into(),
        }
    }

    pub fn text(scope: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Text {
            scope: scope.into(),
            text: text.into(),
        }
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Css { css } => write!(f, "`{}`", css),
            Self::Text { scope, text } => write!(f, "`{}` with text '{}'", scope, text),
        }
    }
}

/// CSS selectors for the target site
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Selectors {
    pub product_link: String,
    pub empty_page: String,
    /// Banner text marking a listing page past the last product
    pub empty_page_text: String,
    pub cookie_overlay: String,
    pub cookie_accept: String,
    /// Section scrolled into view when no click strategy works
    pub information_section: String,
    pub nutrition_table: String,
    /// Header cell holding the serving size, relative to the table
    pub portion_cell: String,
    /// Data rows, relative to the table
    pub nutrient_rows: String,
    /// Elements removed before the reveal click because they intercept it
    pub blocking_overlays: Vec<String>,
    /// Product title candidates, in order
    pub title: Vec<Locator>,
    /// Nutrition Information toggle candidates; the first is primary
    pub nutrition_toggle: Vec<Locator>,
}

/// Maps a nutrition-table label to a record field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NutrientLabel {
    pub label: String,
    pub field: NutrientField,
}

impl NutrientLabel {
    pub fn new(label: impl Into<String>, field: NutrientField) -> Self {
        Self {
            label: label.into(),
            field,
        }
    }

    /// Full row labels as printed on the site, for [`MatchPolicy::Exact`]
    pub fn exact_defaults() -> Vec<Self> {
        vec![
            Self::new("Valor energético (kcal)", NutrientField::Calories),
            Self::new("Carboidratos (g)", NutrientField::Carbohydrates),
            Self::new("Proteínas (g)", NutrientField::Protein),
            Self::new("Gorduras totais (g)", NutrientField::TotalFat),
            Self::new("Gorduras saturadas (g)", NutrientField::SaturatedFat),
            Self::new("Fibras alimentares (g)", NutrientField::Fiber),
            Self::new("Açúcares totais (g)", NutrientField::Sugars),
            Self::new("Sódio (mg)", NutrientField::Sodium),
        ]
    }
}

/// How row labels are compared with the nutrient label table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicy {
    /// Case-insensitive containment; the longest matching label wins
    #[default]
    Substring,
    /// Trimmed, case-sensitive equality
    Exact,
}

/// Bounded smoke run over a couple of categories
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuickTestConfig {
    /// Category names, looked up in the category table
    pub categories: Vec<String>,
    pub per_category: usize,
    pub max_products: usize,
}

// Default value providers
fn default_headless() -> bool {
    true
}

fn default_window_width() -> u32 {
    1920
}

fn default_window_height() -> u32 {
    1080
}

fn default_idle_timeout_secs() -> u64 {
    300
}

fn default_product_host() -> String {
    "essentialnutrition.com.br".to_string()
}

fn default_listing_path_marker() -> String {
    "/produtos/".to_string()
}

fn default_page_param() -> String {
    "p".to_string()
}

fn default_zoom_percent() -> u32 {
    50
}

fn default_categories() -> Vec<Category> {
    const BASE: &str = "https://www.essentialnutrition.com.br/produtos";
    [
        ("ADOCANTES NATURAIS", "adocantes-naturais"),
        ("AMINOACIDOS", "aminoacidos"),
        ("BEBIDAS", "bebidas"),
        ("CHOCOLATES", "chocolates"),
        ("COLAGENOS", "colagenos"),
        ("FIBRAS", "fibras"),
        ("INFANCIA SAUDAVEL", "infancia-saudavel"),
        ("LINHA CLINICA", "linha-clinica"),
        ("OMEGA3", "omega-3"),
        ("PROTEINAS", "proteinas"),
        ("SAUDE INTESTINAL", "saude-intestinal"),
        ("SHAKES", "shakes"),
        ("SNACKS", "snacks"),
        ("TREINO", "treino"),
        ("VITAMINAS", "vitaminas"),
    ]
    .into_iter()
    .map(|(name, slug)| Category::new(name, format!("{}/{}", BASE, slug)))
    .collect()
}

fn default_nutrient_labels() -> Vec<NutrientLabel> {
    vec![
        NutrientLabel::new("valor energético", NutrientField::Calories),
        NutrientLabel::new("carboidratos", NutrientField::Carbohydrates),
        NutrientLabel::new("proteínas", NutrientField::Protein),
        NutrientLabel::new("gorduras totais", NutrientField::TotalFat),
        NutrientLabel::new("gorduras saturadas", NutrientField::SaturatedFat),
        NutrientLabel::new("fibras alimentares", NutrientField::Fiber),
        NutrientLabel::new("açúcares totais", NutrientField::Sugars),
        NutrientLabel::new("sódio", NutrientField::Sodium),
    ]
}

impl NutriConfig {
    /// Load configuration from `path` or use defaults when it does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml_str(&content)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| NutriError::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Write the default configuration to `path`
    pub fn write_default(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(&Self::default())
            .map_err(|e| NutriError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl TimingConfig {
    fn policy(&self, timeout_ms: u64) -> PollPolicy {
        PollPolicy::new(
            Duration::from_millis(timeout_ms),
            Duration::from_millis(self.poll_interval_ms.max(1)),
        )
    }

    pub fn page_ready(&self) -> PollPolicy {
        self.policy(self.page_ready_timeout_ms)
    }

    pub fn element(&self) -> PollPolicy {
        self.policy(self.element_timeout_ms)
    }

    pub fn alternate(&self) -> PollPolicy {
        self.policy(self.alternate_timeout_ms)
    }

    pub fn settle(&self) -> PollPolicy {
        self.policy(self.settle_timeout_ms)
    }

    pub fn scroll_settle(&self) -> PollPolicy {
        self.policy(self.scroll_settle_ms)
    }

    pub fn reveal(&self) -> PollPolicy {
        self.policy(self.reveal_timeout_ms)
    }

    pub fn empty_retry_delay(&self) -> Duration {
        Duration::from_millis(self.empty_retry_delay_ms)
    }

    pub fn inter_page_delay(&self) -> Duration {
        Duration::from_millis(self.inter_page_delay_ms)
    }

    pub fn inter_request_delay(&self) -> Duration {
        Duration::from_millis(self.inter_request_delay_ms)
    }

    /// Near-zero bounds and delays, for tests against in-memory pages
    pub fn instant() -> Self {
        Self {
            page_ready_timeout_ms: 50,
            element_timeout_ms: 50,
            alternate_timeout_ms: 10,
            poll_interval_ms: 1,
            settle_timeout_ms: 20,
            scroll_settle_ms: 10,
            reveal_timeout_ms: 20,
            empty_retry_delay_ms: 0,
            inter_page_delay_ms: 0,
            inter_request_delay_ms: 0,
        }
    }
}

impl SiteConfig {
    pub fn category(&self, name: &str) -> Option<&Category> {
        self.categories
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Label table the configured match policy reads
    pub fn nutrient_labels(&self) -> &[NutrientLabel] {
        match self.match_policy {
            MatchPolicy::Substring => &self.nutrients,
            MatchPolicy::Exact => &self.exact_nutrients,
        }
    }

    /// Categories named by the quick-test settings, in that order
    pub fn quick_test_categories(&self) -> Vec<&Category> {
        self.quick_test
            .categories
            .iter()
            .filter_map(|name| self.category(name))
            .collect()
    }
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            preferred: None,
            headless: default_headless(),
            window_width: default_window_width(),
            window_height: default_window_height(),
            extra_args: Vec::new(),
            driver_cache_dir: None,
            idle_timeout_secs: default_idle_timeout_secs(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            page_ready_timeout_ms: 20_000,
            element_timeout_ms: 10_000,
            alternate_timeout_ms: 2_000,
            poll_interval_ms: 250,
            settle_timeout_ms: 5_000,
            scroll_settle_ms: 2_000,
            reveal_timeout_ms: 4_000,
            empty_retry_delay_ms: 3_000,
            inter_page_delay_ms: 1_000,
            inter_request_delay_ms: 1_000,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("dados"),
            urls_file: PathBuf::from("dados/urls_produtos.json"),
            csv_file: PathBuf::from("dados/csv/dados_nutricionais.csv"),
            test_urls_file: PathBuf::from("dados/urls_produtos_teste.json"),
            test_csv_file: PathBuf::from("dados/csv/dados_nutricionais_teste.csv"),
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            product_host: default_product_host(),
            listing_path_marker: default_listing_path_marker(),
            page_param: default_page_param(),
            max_pages: None,
            zoom_percent: default_zoom_percent(),
            match_policy: MatchPolicy::default(),
            categories: default_categories(),
            nutrients: default_nutrient_labels(),
            exact_nutrients: NutrientLabel::exact_defaults(),
            selectors: Selectors::default(),
            quick_test: QuickTestConfig::default(),
        }
    }
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            product_link: "a.product.photo.product-item-photo".to_string(),
            empty_page: "div.message.info.empty".to_string(),
            empty_page_text: "Não encontramos produtos correspondentes".to_string(),
            cookie_overlay: ".cookie-notice".to_string(),
            cookie_accept: ".cookie-notice__accept".to_string(),
            blocking_overlays: vec![".modalchuvas".to_string()],
            title: vec![Locator::css("h1.page-title span"), Locator::css("h1")],
            nutrition_toggle: vec![
                Locator::text("#menu-top-int a", "Informação Nutricional"),
                Locator::css("a[href='#information']"),
                Locator::css("a.data.switch[href='#information']"),
                Locator::css("div.data.item.title a[href='#information']"),
                Locator::css("a.switch[data-toggle='switch']"),
            ],
            information_section: "#information".to_string(),
            nutrition_table: "div.tabela-nutri table.table".to_string(),
            portion_cell: "thead tr th:first-child".to_string(),
            nutrient_rows: "tbody tr".to_string(),
        }
    }
}

impl Default for QuickTestConfig {
    fn default() -> Self {
        Self {
            categories: vec!["PROTEINAS".to_string(), "AMINOACIDOS".to_string()],
            per_category: 2,
            max_products: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = NutriConfig::default();
        assert!(config.browser.headless);
        assert_eq!(config.site.categories.len(), 15);
        assert_eq!(config.site.categories[0].name, "ADOCANTES NATURAIS");
        assert_eq!(config.site.nutrients.len(), 8);
        assert_eq!(config.site.match_policy, MatchPolicy::Substring);
        assert_eq!(config.timing.element().timeout, Duration::from_secs(10));
        assert_eq!(
            config.paths.urls_file,
            PathBuf::from("dados/urls_produtos.json")
        );
    }

    #[test]
    fn test_quick_test_categories_resolve() {
        let site = SiteConfig::default();
        let names: Vec<_> = site
            .quick_test_categories()
            .into_iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["PROTEINAS", "AMINOACIDOS"]);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = NutriConfig::from_toml_str(
            r#"
            [browser]
            preferred = "firefox"
            headless = false

            [timing]
            element_timeout_ms = 3000

            [site]
            match_policy = "exact"
            "#,
        )
        .unwrap();

        assert_eq!(config.browser.preferred, Some(BrowserKind::Firefox));
        assert!(!config.browser.headless);
        assert_eq!(config.browser.window_width, 1920);
        assert_eq!(config.timing.element_timeout_ms, 3000);
        assert_eq!(config.timing.poll_interval_ms, 250);
        assert_eq!(config.site.match_policy, MatchPolicy::Exact);
        assert_eq!(config.site.categories.len(), 15);
        assert_eq!(config.site.nutrient_labels(), NutrientLabel::exact_defaults().as_slice());
    }

    #[test]
    fn test_label_table_follows_policy() {
        let mut site = SiteConfig::default();
        assert_eq!(site.nutrient_labels()[2].label, "proteínas");

        site.match_policy = MatchPolicy::Exact;
        assert_eq!(site.nutrient_labels()[2].label, "Proteínas (g)");
    }

    #[test]
    fn test_locator_forms() {
        let config = NutriConfig::from_toml_str(
            r##"
            [site.selectors]
            nutrition_toggle = [
                { scope = "nav a", text = "Nutrition" },
                { css = "a[href='#info']" },
            ]
            "##,
        )
        .unwrap();

        assert_eq!(
            config.site.selectors.nutrition_toggle,
            vec![
                Locator::text("nav a", "Nutrition"),
                Locator::css("a[href='#info']")
            ]
        );
        assert_eq!(config.site.selectors.nutrient_rows, "tbody tr");
    }

    #[test]
    fn test_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("nutri.toml");

        NutriConfig::write_default(&path).unwrap();
        let loaded = NutriConfig::load_or_default(&path).unwrap();

        assert_eq!(loaded.site.categories, SiteConfig::default().categories);
        assert_eq!(
            loaded.site.selectors.nutrition_toggle,
            Selectors::default().nutrition_toggle
        );
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = NutriConfig::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.site.zoom_percent, 50);
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let err = NutriConfig::from_toml_str("[browser\nheadless = ").unwrap_err();
        assert!(matches!(err, NutriError::Config(_)));
    }
}
