//! Fail-open utilities for non-critical page steps
//!
//! Dismissing a cookie banner, removing a modal or zooming the page may fail
//! on some product pages without affecting the data being extracted. Those
//! steps run through [`fail_open`], which logs the failure and moves on.
//!
//! DO NOT use fail-open for:
//! - Navigation (the record depends on it)
//! - Reading the nutrition table
//! - Writing output files

use std::future::Future;
use tracing::warn;

use crate::Result;

/// Execute an operation that should fail open
///
/// Logs the error via `tracing::warn!` on failure and returns `None`.
///
/// # Usage
///
/// ```no_run
/// use nutri_core::fail_open::fail_open;
/// use nutri_core::Result;
///
/// async fn dismiss_cookie_banner() -> Result<bool> {
///     Ok(true)
/// }
///
/// async fn example() {
///     let dismissed = fail_open("cookie_banner", || dismiss_cookie_banner()).await;
///     // dismissed is None if the step failed, otherwise Some(bool)
/// }
/// ```
pub async fn fail_open<F, Fut, T>(operation_name: &str, f: F) -> Option<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match f().await {
        Ok(val) => Some(val),
        Err(e) => {
            warn!("{} failed (fail-open): {}", operation_name, e);
            None
        }
    }
}
