//! Category URL collection
//!
//! Each category listing is paginated with a page-number query parameter
//! until the "no matching products" banner shows up, or until a page yields
//! no product links twice in a row.

use std::collections::{BTreeMap, HashSet};

use nutri_browser::{wait_until_ready, Session};
use nutri_core::config::{Category, Locator, SiteConfig, TimingConfig};
use nutri_core::wait::{poll_until, poll_until_stable};
use nutri_core::{ProductUrl, Result};
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// URL of listing page `page` for a category base URL
pub fn page_url(base: &str, param: &str, page: u32) -> String {
    if page <= 1 {
        return base.to_string();
    }
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{}{}{}={}", base, separator, param, page)
}

/// Product links point at the product host and never at another listing
pub fn is_product_href(href: &str, product_host: &str, listing_marker: &str) -> bool {
    href.contains(product_host) && !href.contains(listing_marker)
}

/// URLs gathered from one category, in discovery order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryHarvest {
    pub category: String,
    pub urls: Vec<ProductUrl>,
    /// Listing pages loaded, including the terminating one
    pub pages: u32,
}

/// URLs listed under more than one category
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DuplicateReport {
    pub unique: usize,
    /// URL → categories it appeared in, in collection order
    pub duplicated: BTreeMap<String, Vec<String>>,
}

pub fn analyze_duplicates(harvests: &[CategoryHarvest]) -> DuplicateReport {
    let mut seen: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for harvest in harvests {
        for url in &harvest.urls {
            let categories = seen.entry(url.to_string()).or_default();
            if !categories.contains(&harvest.category) {
                categories.push(harvest.category.clone());
            }
        }
    }

    let unique = seen.len();
    seen.retain(|_, categories| categories.len() > 1);
    DuplicateReport {
        unique,
        duplicated: seen,
    }
}

/// Union of all harvests, first occurrence wins
pub fn merge_harvests(harvests: &[CategoryHarvest]) -> Vec<ProductUrl> {
    let mut seen = HashSet::new();
    harvests
        .iter()
        .flat_map(|h| h.urls.iter())
        .filter(|url| seen.insert((*url).clone()))
        .cloned()
        .collect()
}

/// Walks category listings on one session
pub struct UrlCollector<'a> {
    session: &'a dyn Session,
    site: &'a SiteConfig,
    timing: &'a TimingConfig,
}

impl<'a> UrlCollector<'a> {
    pub fn new(session: &'a dyn Session, site: &'a SiteConfig, timing: &'a TimingConfig) -> Self {
        Self {
            session,
            site,
            timing,
        }
    }

    /// Every category in order; a category that fails to load is logged and
    /// contributes what it gathered so far
    pub async fn collect_all(&self, categories: &[Category]) -> Vec<CategoryHarvest> {
        let mut harvests = Vec::with_capacity(categories.len());
        for (i, category) in categories.iter().enumerate() {
            info!("[{}/{}] Collecting {}", i + 1, categories.len(), category.name);
            let harvest = self.collect_category(category, None).await;
            info!("{}: {} products", category.name, harvest.urls.len());
            harvests.push(harvest);
        }
        harvests
    }

    /// Paginate one category; `limit` stops early once that many URLs are in
    pub async fn collect_category(&self, category: &Category, limit: Option<usize>) -> CategoryHarvest {
        let mut harvest = CategoryHarvest {
            category: category.name.clone(),
            urls: Vec::new(),
            pages: 0,
        };
        let mut seen = HashSet::new();
        let mut page = 1;

        loop {
            if self.site.max_pages.map_or(false, |max| page > max) {
                debug!("{}: page limit reached", category.name);
                break;
            }

            let url = page_url(&category.url, &self.site.page_param, page);
            debug!("{}: page {} ({})", category.name, page, url);
            if let Err(e) = self.load(&url).await {
                warn!("{}: failed to load page {}: {}", category.name, page, e);
                break;
            }
            harvest.pages = page;

            if self.is_empty_page().await {
                info!("{}: page {} is empty, category done", category.name, page);
                break;
            }

            let mut found = self.harvest_page().await;
            if found.is_empty() && !self.is_empty_page().await {
                warn!(
                    "{}: no products on page {} but it is not marked empty, retrying",
                    category.name, page
                );
                sleep(self.timing.empty_retry_delay()).await;
                found = self.harvest_page().await;
                if found.is_empty() {
                    warn!("{}: still no products, category done", category.name);
                    break;
                }
            }

            debug!("{}: {} products on page {}", category.name, found.len(), page);
            for url in found {
                if seen.insert(url.clone()) {
                    harvest.urls.push(url);
                }
            }

            if let Some(limit) = limit {
                if harvest.urls.len() >= limit {
                    harvest.urls.truncate(limit);
                    break;
                }
            }

            page += 1;
            sleep(self.timing.inter_page_delay()).await;
        }

        harvest
    }

    async fn load(&self, url: &str) -> Result<()> {
        self.session.navigate(url).await?;
        if let Err(e) = wait_until_ready(self.session, self.timing.page_ready()).await {
            debug!("{}", e);
        }
        Ok(())
    }

    async fn is_empty_page(&self) -> bool {
        let banner = Locator::css(self.site.selectors.empty_page.as_str());
        match self.session.text_of(&banner).await {
            Ok(Some(text)) => text.contains(&self.site.selectors.empty_page_text),
            Ok(None) => false,
            Err(e) => {
                debug!("Empty-page check failed: {}", e);
                false
            }
        }
    }

    /// Product URLs on the loaded page; empty when none appear in time
    async fn harvest_page(&self) -> Vec<ProductUrl> {
        if self.is_empty_page().await {
            return Vec::new();
        }

        let selector = self.site.selectors.product_link.as_str();
        let session = self.session;

        let appeared = poll_until("product links", self.timing.element(), || async move {
            Ok((session.count(selector).await? > 0).then_some(()))
        })
        .await;
        if let Err(e) = appeared {
            debug!("{}", e);
            return Vec::new();
        }

        // Lazy-loaded listings grow after scrolling; wait for the count to settle
        let settled = poll_until_stable("product links after scroll", self.timing.scroll_settle(), || async move {
            session.scroll_to_bottom().await?;
            session.count(selector).await
        })
        .await;
        if let Err(e) = settled {
            debug!("{}", e);
        }

        let hrefs = match session.link_targets(selector).await {
            Ok(hrefs) => hrefs,
            Err(e) => {
                warn!("Failed to read product links: {}", e);
                return Vec::new();
            }
        };

        let mut seen = HashSet::new();
        hrefs
            .iter()
            .filter(|href| {
                is_product_href(href, &self.site.product_host, &self.site.listing_path_marker)
            })
            .filter_map(|href| ProductUrl::parse(href).ok())
            .filter(|url| seen.insert(url.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn harvest(category: &str, urls: &[&str]) -> CategoryHarvest {
        CategoryHarvest {
            category: category.to_string(),
            urls: urls.iter().map(|u| ProductUrl::parse(u).unwrap()).collect(),
            pages: 1,
        }
    }

    #[test]
    fn test_page_url() {
        let base = "https://www.essentialnutrition.com.br/produtos/proteinas";
        assert_eq!(page_url(base, "p", 1), base);
        assert_eq!(page_url(base, "p", 3), format!("{}?p=3", base));
        assert_eq!(page_url("https://x.com/c?sort=name", "p", 2), "https://x.com/c?sort=name&p=2");
    }

    #[test]
    fn test_product_href_filter() {
        let host = "essentialnutrition.com.br";
        assert!(is_product_href("https://www.essentialnutrition.com.br/whey-pro", host, "/produtos/"));
        assert!(!is_product_href(
            "https://www.essentialnutrition.com.br/produtos/proteinas",
            host,
            "/produtos/"
        ));
        assert!(!is_product_href("https://other.com/whey-pro", host, "/produtos/"));
    }

    #[test]
    fn test_analyze_duplicates() {
        let harvests = vec![
            harvest("PROTEINAS", &["https://s.com/a", "https://s.com/b"]),
            harvest("TREINO", &["https://s.com/b", "https://s.com/c"]),
            harvest("SHAKES", &["https://s.com/b"]),
        ];

        let report = analyze_duplicates(&harvests);
        assert_eq!(report.unique, 3);
        assert_eq!(report.duplicated.len(), 1);
        assert_eq!(
            report.duplicated["https://s.com/b"],
            vec!["PROTEINAS", "TREINO", "SHAKES"]
        );
    }

    #[test]
    fn test_merge_keeps_first_seen_order() {
        let harvests = vec![
            harvest("A", &["https://s.com/2", "https://s.com/1"]),
            harvest("B", &["https://s.com/1", "https://s.com/3"]),
        ];

        let merged: Vec<String> = merge_harvests(&harvests)
            .into_iter()
            .map(ProductUrl::into_string)
            .collect();
        assert_eq!(merged, vec!["https://s.com/2", "https://s.com/1", "https://s.com/3"]);
    }
}
