//! The page-session seam
//!
//! Collection and extraction talk to a [`Session`], never to a concrete
//! driver. Backends implement navigation, raw script evaluation and
//! teardown; the DOM helpers are provided on top of [`Session::evaluate`]
//! and can be overridden by in-memory sessions in tests.

use std::future::Future;

use async_trait::async_trait;
use nutri_core::config::Locator;
use nutri_core::wait::{poll_until, PollPolicy};
use nutri_core::{BrowserKind, NutriError, Result};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::scripts;

/// Snapshot of the nutrition table: header cell and the cell texts of each row
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TableSnapshot {
    pub header: Option<String>,
    pub rows: Vec<Vec<String>>,
}

/// How a click is delivered to an element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickMode {
    /// `element.click()`
    Element,
    /// A bubbling `MouseEvent("click")` dispatched on the element
    MouseEvent,
}

/// An open browser page
#[async_trait]
pub trait Session: Send + Sync {
    /// Which browser backs this session
    fn browser(&self) -> BrowserKind;

    /// Load `url` and wait for the driver to report navigation done
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Run a function body (see [`scripts`]) and return its decoded result
    async fn evaluate(&self, body: &str) -> Result<Value>;

    /// Release the browser and any driver process; calling twice is a no-op
    async fn close(&self) -> Result<()>;

    async fn ready_state(&self) -> Result<String> {
        let value = self.evaluate(scripts::READY_STATE).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn count(&self, selector: &str) -> Result<usize> {
        let value = self.evaluate(&scripts::count(selector)).await?;
        Ok(value.as_u64().unwrap_or(0) as usize)
    }

    async fn exists(&self, locator: &Locator) -> Result<bool> {
        let value = self.evaluate(&scripts::exists(locator)).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    /// Trimmed rendered text of the located element
    async fn text_of(&self, locator: &Locator) -> Result<Option<String>> {
        let value = self.evaluate(&scripts::text_of(locator)).await?;
        Ok(value.as_str().map(str::to_string))
    }

    /// Absolute `href` of every anchor matching `selector`, in document order
    async fn link_targets(&self, selector: &str) -> Result<Vec<String>> {
        let value = self.evaluate(&scripts::link_targets(selector)).await?;
        if value.is_null() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_value(value)?)
    }

    async fn table(
        &self,
        table: &str,
        header_cell: &str,
        rows: &str,
    ) -> Result<Option<TableSnapshot>> {
        let value = self
            .evaluate(&scripts::table(table, header_cell, rows))
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Returns `false` when nothing matched the locator
    async fn click(&self, locator: &Locator, mode: ClickMode) -> Result<bool> {
        let script = match mode {
            ClickMode::Element => scripts::element_click(locator),
            ClickMode::MouseEvent => scripts::mouse_event_click(locator),
        };
        let value = self.evaluate(&script).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn scroll_into_view(&self, locator: &Locator) -> Result<bool> {
        let value = self.evaluate(&scripts::scroll_into_view(locator)).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn scroll_to_bottom(&self) -> Result<()> {
        self.evaluate(scripts::SCROLL_TO_BOTTOM).await?;
        Ok(())
    }

    async fn set_zoom(&self, percent: u32) -> Result<bool> {
        let value = self.evaluate(&scripts::set_zoom(percent)).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    /// Remove every element matching `selector`; returns how many went
    async fn remove_all(&self, selector: &str) -> Result<usize> {
        let value = self.evaluate(&scripts::remove_all(selector)).await?;
        Ok(value.as_u64().unwrap_or(0) as usize)
    }
}

/// Poll until `document.readyState` is `"complete"`
pub async fn wait_until_ready(session: &dyn Session, policy: PollPolicy) -> Result<()> {
    poll_until("document ready", policy, || async move {
        Ok((session.ready_state().await? == "complete").then_some(()))
    })
    .await
}

/// Run `work` against `session`, then close the session whatever happened.
///
/// Ctrl-C aborts `work` and yields [`NutriError::Interrupted`]. A failure to
/// close is logged but never masks the result of `work`.
pub async fn run_guarded<T, Fut>(session: &dyn Session, work: Fut) -> Result<T>
where
    Fut: Future<Output = Result<T>>,
{
    let outcome = tokio::select! {
        result = work => result,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, shutting down the browser");
            Err(NutriError::Interrupted)
        }
    };

    match session.close().await {
        Ok(()) => info!("Closed {} session", session.browser()),
        Err(e) => warn!("Failed to close {} session: {}", session.browser(), e),
    }

    outcome
}
