//! Nutrition-table extraction from one product page
//!
//! Steps, in order: load and wait for readiness, let client-side rendering
//! produce a title, dismiss the cookie banner, zoom out, read the title,
//! remove blocking overlays, reveal the "Nutrition Information" panel, then
//! read the serving size and map table rows to record fields.
//!
//! Nothing is retried. Only a failed navigation is an error; every later
//! miss leaves a partial record.

use nutri_browser::{first_present, wait_until_ready, ClickMode, InteractionChain, Session, TableSnapshot};
use nutri_core::config::{Locator, SiteConfig, TimingConfig};
use nutri_core::fail_open::fail_open;
use nutri_core::wait::poll_until;
use nutri_core::{NutrientField, NutritionRecord, Result};
use tracing::{debug, info, warn};

use crate::nutrients::NutrientMatcher;

/// Record plus what the page actually offered
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub record: NutritionRecord,
    pub toggle_found: bool,
    pub table_found: bool,
    /// Fields read from the table, in row order
    pub matched: Vec<NutrientField>,
}

impl Extraction {
    /// No table, or a table with no recognised row
    pub fn is_partial(&self) -> bool {
        !self.table_found || self.matched.is_empty()
    }
}

pub struct NutritionExtractor<'a> {
    session: &'a dyn Session,
    site: &'a SiteConfig,
    timing: &'a TimingConfig,
    matcher: NutrientMatcher,
    reveal: InteractionChain,
}

impl<'a> NutritionExtractor<'a> {
    pub fn new(session: &'a dyn Session, site: &'a SiteConfig, timing: &'a TimingConfig) -> Self {
        let section = Locator::css(site.selectors.information_section.as_str());
        Self {
            session,
            site,
            timing,
            matcher: NutrientMatcher::from_site(site),
            reveal: InteractionChain::reveal(section),
        }
    }

    pub async fn extract(&self, url: &str, category: Option<&str>) -> Result<Extraction> {
        let mut extraction = Extraction {
            record: NutritionRecord::for_url(url, category.map(str::to_string)),
            toggle_found: false,
            table_found: false,
            matched: Vec::new(),
        };

        info!("Extracting {}", url);
        self.session.navigate(url).await?;
        if let Err(e) = wait_until_ready(self.session, self.timing.page_ready()).await {
            warn!("{} did not finish loading: {}", url, e);
        }
        self.wait_for_render().await;

        fail_open("cookie banner", || self.dismiss_cookie_banner()).await;
        fail_open("zoom", || self.session.set_zoom(self.site.zoom_percent)).await;

        extraction.record.name = self.read_title().await.unwrap_or_default();
        debug!("Title: {:?}", extraction.record.name);

        for overlay in &self.site.selectors.blocking_overlays {
            fail_open("overlay removal", || self.session.remove_all(overlay)).await;
        }

        let toggles = &self.site.selectors.nutrition_toggle;
        let Some(toggle) =
            first_present(self.session, toggles, self.timing.element(), self.timing.alternate()).await
        else {
            warn!("No nutrition toggle on {}", url);
            return Ok(extraction);
        };
        extraction.toggle_found = true;

        match self.reveal.run(self.session, toggle).await {
            Some(strategy) => debug!("Revealed nutrition panel with {}", strategy),
            None => warn!("Could not activate nutrition toggle {}", toggle),
        }

        let Some(table) = self.wait_for_table().await else {
            warn!("No nutrition table on {}", url);
            return Ok(extraction);
        };
        extraction.table_found = true;

        extraction.record.portion = table.header.unwrap_or_default().trim().to_string();
        extraction.matched = self.matcher.apply_rows(&table.rows, &mut extraction.record);
        debug!("Matched {:?}", extraction.matched);

        Ok(extraction)
    }

    /// Bounded wait for any title candidate to render
    async fn wait_for_render(&self) {
        let session = self.session;
        let titles = &self.site.selectors.title;
        let rendered = poll_until("product title", self.timing.settle(), || async move {
            for locator in titles {
                if session.exists(locator).await? {
                    return Ok(Some(()));
                }
            }
            Ok(None)
        })
        .await;

        if let Err(e) = rendered {
            debug!("{}", e);
        }
    }

    async fn dismiss_cookie_banner(&self) -> Result<bool> {
        let selectors = &self.site.selectors;
        if !self.session.exists(&Locator::css(selectors.cookie_overlay.as_str())).await? {
            return Ok(false);
        }
        let accept = Locator::css(selectors.cookie_accept.as_str());
        self.session.click(&accept, ClickMode::Element).await
    }

    /// First non-empty title candidate
    async fn read_title(&self) -> Option<String> {
        for locator in &self.site.selectors.title {
            match self.session.text_of(locator).await {
                Ok(Some(text)) if !text.trim().is_empty() => return Some(text.trim().to_string()),
                Ok(_) => {}
                Err(e) => debug!("Title lookup {} failed: {}", locator, e),
            }
        }
        None
    }

    async fn wait_for_table(&self) -> Option<TableSnapshot> {
        let session = self.session;
        let selectors = &self.site.selectors;
        poll_until("nutrition table", self.timing.reveal(), || async move {
            session
                .table(
                    &selectors.nutrition_table,
                    &selectors.portion_cell,
                    &selectors.nutrient_rows,
                )
                .await
        })
        .await
        .map_err(|e| debug!("{}", e))
        .ok()
    }
}
