//! In-memory product site for driving the scraper without a browser

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use nutri_browser::{ClickMode, Session, TableSnapshot};
use nutri_core::config::{Locator, NutriConfig, Selectors, TimingConfig};
use nutri_core::{BrowserKind, NutriError, Result};
use serde_json::Value;

pub const HOST: &str = "https://www.essentialnutrition.com.br";

/// One page of the fake site
#[derive(Debug, Clone, Default)]
pub struct FakePage {
    /// Elements present on the page, with their text
    pub elements: Vec<(Locator, String)>,
    /// `href`s of product anchors
    pub links: Vec<String>,
    /// Element whose click reveals `table`
    pub toggle: Option<Locator>,
    pub table: Option<TableSnapshot>,
}

impl FakePage {
    pub fn listing<S: AsRef<str>>(links: &[S]) -> Self {
        Self {
            links: links.iter().map(|l| l.as_ref().to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn empty_listing() -> Self {
        let selectors = Selectors::default();
        Self {
            elements: vec![(
                Locator::css(selectors.empty_page),
                "Não encontramos produtos correspondentes.".to_string(),
            )],
            ..Self::default()
        }
    }

    pub fn product(title: &str, rows: &[(&str, &str)]) -> Self {
        let toggle = Locator::text("#menu-top-int a", "Informação Nutricional");
        Self {
            elements: vec![
                (Locator::css("h1.page-title span"), title.to_string()),
                (Locator::css("h1"), title.to_string()),
                (toggle.clone(), "Informação Nutricional".to_string()),
            ],
            links: Vec::new(),
            toggle: Some(toggle),
            table: Some(TableSnapshot {
                header: Some("Porção de 30 g (1 dosador)".to_string()),
                rows: rows
                    .iter()
                    .map(|(label, value)| vec![label.to_string(), value.to_string()])
                    .collect(),
            }),
        }
    }

    /// Product page whose nutrition toggle is missing
    pub fn product_without_toggle(title: &str) -> Self {
        Self {
            elements: vec![(Locator::css("h1"), title.to_string())],
            ..Self::default()
        }
    }
}

/// Scripted [`Session`] serving [`FakePage`]s by URL
#[derive(Default)]
pub struct FakeSite {
    pages: HashMap<String, FakePage>,
    current: Mutex<Option<String>>,
    revealed: Mutex<bool>,
    pub visits: Mutex<Vec<String>>,
    pub closes: AtomicUsize,
}

impl FakeSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: impl Into<String>, page: FakePage) -> Self {
        self.pages.insert(url.into(), page);
        self
    }

    pub fn visited(&self) -> Vec<String> {
        self.visits.lock().unwrap().clone()
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    fn with_page<T>(&self, f: impl FnOnce(&FakePage) -> T) -> Result<T> {
        let current = self.current.lock().unwrap();
        let url = current
            .as_ref()
            .ok_or_else(|| NutriError::Browser("no page loaded".to_string()))?;
        let page = self
            .pages
            .get(url)
            .ok_or_else(|| NutriError::Browser(format!("unknown page {}", url)))?;
        Ok(f(page))
    }
}

#[async_trait]
impl Session for FakeSite {
    fn browser(&self) -> BrowserKind {
        BrowserKind::Chrome
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        self.visits.lock().unwrap().push(url.to_string());
        if !self.pages.contains_key(url) {
            return Err(NutriError::Navigation {
                url: url.to_string(),
                message: "net::ERR_NAME_NOT_RESOLVED".to_string(),
            });
        }
        *self.current.lock().unwrap() = Some(url.to_string());
        *self.revealed.lock().unwrap() = false;
        Ok(())
    }

    async fn evaluate(&self, _body: &str) -> Result<Value> {
        Ok(Value::Null)
    }

    async fn close(&self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn ready_state(&self) -> Result<String> {
        Ok("complete".to_string())
    }

    async fn count(&self, selector: &str) -> Result<usize> {
        let product_link = Selectors::default().product_link;
        self.with_page(|page| if selector == product_link { page.links.len() } else { 0 })
    }

    async fn exists(&self, locator: &Locator) -> Result<bool> {
        self.with_page(|page| page.elements.iter().any(|(l, _)| l == locator))
    }

    async fn text_of(&self, locator: &Locator) -> Result<Option<String>> {
        self.with_page(|page| {
            page.elements
                .iter()
                .find(|(l, _)| l == locator)
                .map(|(_, text)| text.clone())
        })
    }

    async fn link_targets(&self, _selector: &str) -> Result<Vec<String>> {
        self.with_page(|page| page.links.clone())
    }

    async fn table(&self, _table: &str, _header_cell: &str, _rows: &str) -> Result<Option<TableSnapshot>> {
        let revealed = *self.revealed.lock().unwrap();
        self.with_page(|page| if revealed { page.table.clone() } else { None })
    }

    async fn click(&self, locator: &Locator, _mode: ClickMode) -> Result<bool> {
        let hits_toggle = self.with_page(|page| page.toggle.as_ref() == Some(locator))?;
        if hits_toggle {
            *self.revealed.lock().unwrap() = true;
        }
        Ok(hits_toggle)
    }

    async fn scroll_into_view(&self, _locator: &Locator) -> Result<bool> {
        Ok(false)
    }

    async fn scroll_to_bottom(&self) -> Result<()> {
        Ok(())
    }

    async fn set_zoom(&self, _percent: u32) -> Result<bool> {
        Ok(true)
    }

    async fn remove_all(&self, _selector: &str) -> Result<usize> {
        Ok(0)
    }
}

/// Default configuration with near-zero waits and paths under `data_dir`
pub fn test_config(data_dir: &std::path::Path) -> NutriConfig {
    let mut config = NutriConfig::default();
    config.timing = TimingConfig::instant();
    config.paths.data_dir = data_dir.to_path_buf();
    config.paths.urls_file = data_dir.join("urls_produtos.json");
    config.paths.csv_file = data_dir.join("csv").join("dados_nutricionais.csv");
    config.paths.test_urls_file = data_dir.join("urls_produtos_teste.json");
    config.paths.test_csv_file = data_dir.join("csv").join("dados_nutricionais_teste.csv");
    config
}

pub fn product_url(slug: &str) -> String {
    format!("{}/{}", HOST, slug)
}

pub fn category_url(slug: &str) -> String {
    format!("{}/produtos/{}", HOST, slug)
}
