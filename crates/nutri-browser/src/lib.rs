//! Browser discovery and page sessions for the nutrition-facts scraper
//!
//! Chrome, Edge and Opera are driven over the Chrome DevTools Protocol with
//! `headless_chrome`. Firefox is driven over WebDriver with `fantoccini`
//! through a private `geckodriver`, fetched on first use when it is not
//! installed.
//!
//! # Example
//!
//! ```no_run
//! use nutri_browser::{run_guarded, DriverFactory};
//! use nutri_core::config::{BrowserSettings, Locator, TimingConfig};
//!
//! #[tokio::main]
//! async fn main() -> nutri_core::Result<()> {
//!     let factory = DriverFactory::new(BrowserSettings::default(), TimingConfig::default());
//!     let session = factory.create_session(None, true).await?;
//!
//!     let title = run_guarded(session.as_ref(), async {
//!         session.navigate("https://www.essentialnutrition.com.br").await?;
//!         session.text_of(&Locator::css("h1")).await
//!     })
//!     .await?;
//!
//!     println!("{:?}", title);
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`locator`]: installed-browser discovery
//! - [`launch`]: per-browser launch flags
//! - [`driver`]: driver binaries, including the geckodriver download
//! - [`factory`]: turns a browser choice into a live [`Session`]
//! - [`session`]: the [`Session`] seam and its DOM helpers
//! - [`interaction`]: ordered click strategies
//! - [`scripts`]: the JavaScript evaluated in the page

pub mod chromium;
pub mod driver;
pub mod factory;
pub mod gecko;
pub mod interaction;
pub mod launch;
pub mod locator;
pub mod scripts;
pub mod session;

pub use factory::DriverFactory;
pub use interaction::{first_present, InteractionChain};
pub use launch::LaunchPlan;
pub use locator::BrowserLocator;
pub use session::{run_guarded, wait_until_ready, ClickMode, Session, TableSnapshot};
