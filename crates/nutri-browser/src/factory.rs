//! Session creation: pick a browser, resolve its driver, launch it

use nutri_core::config::{BrowserSettings, TimingConfig};
use nutri_core::{BrowserDescriptor, BrowserKind, NutriError, Result};
use tracing::{info, warn};

use crate::chromium::ChromiumSession;
use crate::driver::{DriverBinary, DriverResolver};
use crate::gecko::GeckoSession;
use crate::launch::LaunchPlan;
use crate::locator::{browser_version, BrowserLocator};
use crate::session::Session;

/// Opens page sessions on installed browsers
pub struct DriverFactory {
    locator: BrowserLocator,
    resolver: DriverResolver,
    settings: BrowserSettings,
    timing: TimingConfig,
}

impl DriverFactory {
    pub fn new(settings: BrowserSettings, timing: TimingConfig) -> Self {
        Self {
            locator: BrowserLocator::for_host(),
            resolver: DriverResolver::from_settings(&settings),
            settings,
            timing,
        }
    }

    pub fn with_locator(mut self, locator: BrowserLocator) -> Self {
        self.locator = locator;
        self
    }

    pub fn with_resolver(mut self, resolver: DriverResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn available(&self) -> Vec<BrowserDescriptor> {
        self.locator.list_available()
    }

    /// The requested browser, or the first available one
    pub fn select(&self, requested: Option<BrowserKind>) -> Result<BrowserDescriptor> {
        match requested {
            Some(kind) => self
                .locator
                .locate(kind)
                .map(|path| BrowserDescriptor::new(kind, path))
                .ok_or_else(|| NutriError::BrowserNotFound(kind.to_string())),
            None => self
                .available()
                .into_iter()
                .next()
                .ok_or(NutriError::NoCompatibleBrowser),
        }
    }

    /// Launch a session; `requested = None` uses the configured preference
    /// and then the first available browser
    pub async fn create_session(
        &self,
        requested: Option<BrowserKind>,
        headless: bool,
    ) -> Result<Box<dyn Session>> {
        let descriptor = self.select(requested.or(self.settings.preferred))?;
        let plan = LaunchPlan::for_browser(&descriptor, headless, &self.settings);

        match browser_version(&descriptor.executable_path) {
            Some(version) => info!(
                "Using {} {} at {}",
                descriptor.kind,
                version,
                descriptor.executable_path.display()
            ),
            None => info!(
                "Using {} at {}",
                descriptor.kind,
                descriptor.executable_path.display()
            ),
        }

        self.start(&plan).await.map_err(|e| match e {
            e @ NutriError::SessionStart { .. } => e,
            other => NutriError::session_start(descriptor.kind, other),
        })
    }

    async fn start(&self, plan: &LaunchPlan) -> Result<Box<dyn Session>> {
        match self.resolver.resolve(&plan.descriptor).await? {
            DriverBinary::DevTools => {
                let session = ChromiumSession::launch(plan, self.timing.page_ready().timeout).await?;
                Ok(Box::new(session))
            }
            DriverBinary::WebDriver(geckodriver) => {
                if plan.kind() != BrowserKind::Firefox {
                    warn!("{} requested a WebDriver server", plan.kind());
                }
                let session = GeckoSession::launch(plan, &geckodriver, self.timing.page_ready()).await?;
                Ok(Box::new(session))
            }
        }
    }
}
