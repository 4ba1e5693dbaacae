//! Per-browser launch options

use std::time::Duration;

use nutri_core::config::BrowserSettings;
use nutri_core::{BrowserDescriptor, BrowserKind};

/// Everything needed to start one browser
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchPlan {
    pub descriptor: BrowserDescriptor,
    pub headless: bool,
    pub window: (u32, u32),
    /// Browser command-line flags, engine-specific defaults first
    pub args: Vec<String>,
    pub idle_timeout: Duration,
}

impl LaunchPlan {
    /// Chromium-family browsers get `--no-sandbox` and
    /// `--disable-dev-shm-usage`; Firefox takes headless mode and window size
    /// as flags. Configured extra flags are appended.
    pub fn for_browser(descriptor: &BrowserDescriptor, headless: bool, settings: &BrowserSettings) -> Self {
        let window = (settings.window_width, settings.window_height);
        let mut args: Vec<String> = Vec::new();

        match descriptor.kind {
            BrowserKind::Chrome | BrowserKind::Edge | BrowserKind::Opera => {
                args.push("--no-sandbox".to_string());
                args.push("--disable-dev-shm-usage".to_string());
            }
            BrowserKind::Firefox => {
                if headless {
                    args.push("-headless".to_string());
                }
                args.push(format!("--width={}", window.0));
                args.push(format!("--height={}", window.1));
            }
        }
        args.extend(settings.extra_args.iter().cloned());

        Self {
            descriptor: descriptor.clone(),
            headless,
            window,
            args,
            idle_timeout: Duration::from_secs(settings.idle_timeout_secs),
        }
    }

    pub fn kind(&self) -> BrowserKind {
        self.descriptor.kind
    }
}
