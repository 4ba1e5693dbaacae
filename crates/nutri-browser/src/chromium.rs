//! Chromium-family sessions over the DevTools protocol

use std::ffi::OsStr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use nutri_core::{BrowserKind, NutriError, Result};
use serde_json::Value;
use tracing::{debug, info};

use crate::launch::LaunchPlan;
use crate::scripts;
use crate::session::Session;

/// Chrome, Edge or Opera driven through headless_chrome
pub struct ChromiumSession {
    kind: BrowserKind,
    /// Dropping the browser kills the process
    browser: Mutex<Option<Browser>>,
    tab: Arc<Tab>,
}

impl ChromiumSession {
    /// Launch the planned browser with one tab
    ///
    /// `navigation_timeout` bounds every DevTools wait on the tab.
    pub async fn launch(plan: &LaunchPlan, navigation_timeout: Duration) -> Result<Self> {
        let kind = plan.kind();
        info!(
            "Launching {} (headless: {}, size: {}x{})",
            kind, plan.headless, plan.window.0, plan.window.1
        );

        let args: Vec<&OsStr> = plan.args.iter().map(OsStr::new).collect();
        let launch_options = LaunchOptions::default_builder()
            .path(Some(plan.descriptor.executable_path.clone()))
            .headless(plan.headless)
            .window_size(Some(plan.window))
            .idle_browser_timeout(plan.idle_timeout)
            .args(args)
            .build()
            .map_err(|e| NutriError::session_start(kind, format!("Invalid launch options: {}", e)))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| NutriError::session_start(kind, format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| NutriError::session_start(kind, format!("Failed to create tab: {}", e)))?;
        tab.set_default_timeout(navigation_timeout);

        info!("{} launched", kind);

        Ok(Self {
            kind,
            browser: Mutex::new(Some(browser)),
            tab,
        })
    }

    fn ensure_open(&self) -> Result<()> {
        let browser = self.browser.lock().unwrap_or_else(PoisonError::into_inner);
        if browser.is_none() {
            return Err(NutriError::Browser("Session already closed".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Session for ChromiumSession {
    fn browser(&self) -> BrowserKind {
        self.kind
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        self.ensure_open()?;
        debug!("Navigating to {}", url);

        self.tab.navigate_to(url).map_err(|e| NutriError::Navigation {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        self.tab
            .wait_until_navigated()
            .map_err(|e| NutriError::Navigation {
                url: url.to_string(),
                message: format!("navigation did not finish: {}", e),
            })?;

        Ok(())
    }

    async fn evaluate(&self, body: &str) -> Result<Value> {
        self.ensure_open()?;

        let result = self
            .tab
            .evaluate(&scripts::wrap(body), false)
            .map_err(|e| NutriError::Script(e.to_string()))?;

        scripts::decode(result.value)
    }

    async fn close(&self) -> Result<()> {
        let browser = self
            .browser
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(browser) = browser {
            info!("Closing {} session", self.kind);
            drop(browser);
        }
        Ok(())
    }
}
