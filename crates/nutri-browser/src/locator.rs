//! Installed-browser discovery
//!
//! Each browser has a list of well-known install paths for the host OS. When
//! none of them exists the command names are looked up on `PATH`.

use std::path::{Path, PathBuf};
use std::process::Command;

use nutri_core::{BrowserDescriptor, BrowserKind};
use regex::Regex;
use tracing::debug;

/// Finds browser executables on this machine
#[derive(Debug, Clone)]
pub struct BrowserLocator {
    candidates: Vec<(BrowserKind, Vec<PathBuf>)>,
    path_lookup: bool,
}

impl BrowserLocator {
    /// Well-known install locations for the running OS, with `PATH` fallback
    pub fn for_host() -> Self {
        Self {
            candidates: host_candidates(),
            path_lookup: true,
        }
    }

    /// Explicit candidate paths; `path_lookup` enables the `PATH` fallback
    pub fn with_candidates(candidates: Vec<(BrowserKind, Vec<PathBuf>)>, path_lookup: bool) -> Self {
        Self {
            candidates,
            path_lookup,
        }
    }

    /// First existing executable for `kind`
    pub fn locate(&self, kind: BrowserKind) -> Option<PathBuf> {
        let fixed = self
            .candidates
            .iter()
            .filter(|(k, _)| *k == kind)
            .flat_map(|(_, paths)| paths.iter())
            .find(|p| p.is_file())
            .cloned();

        if let Some(path) = fixed {
            debug!("Found {} at {}", kind, path.display());
            return Some(path);
        }

        if !self.path_lookup {
            return None;
        }

        lookup_commands(kind).iter().find_map(|cmd| {
            let found = which::which(cmd).ok();
            if let Some(ref path) = found {
                debug!("Found {} on PATH as {}", kind, path.display());
            }
            found
        })
    }

    /// Every installed browser, in [`BrowserKind::ALL`] order
    pub fn list_available(&self) -> Vec<BrowserDescriptor> {
        BrowserKind::ALL
            .iter()
            .filter_map(|kind| {
                self.locate(*kind)
                    .map(|path| BrowserDescriptor::new(*kind, path))
            })
            .collect()
    }
}

impl Default for BrowserLocator {
    fn default() -> Self {
        Self::for_host()
    }
}

/// Command names tried on `PATH` for each browser
pub fn lookup_commands(kind: BrowserKind) -> &'static [&'static str] {
    match kind {
        BrowserKind::Chrome => &["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"],
        BrowserKind::Firefox => &["firefox"],
        BrowserKind::Edge => &["microsoft-edge", "microsoft-edge-stable", "msedge"],
        BrowserKind::Opera => &["opera"],
    }
}

/// Version string reported by `<executable> --version`, if any
pub fn browser_version(executable: &Path) -> Option<String> {
    let output = Command::new(executable).arg("--version").output().ok()?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    let pattern = Regex::new(r"\d+(?:\.\d+)+").ok()?;
    pattern.find(&stdout).map(|m| m.as_str().to_string())
}

fn host_candidates() -> Vec<(BrowserKind, Vec<PathBuf>)> {
    if cfg!(windows) {
        windows_candidates()
    } else if cfg!(target_os = "macos") {
        macos_candidates()
    } else {
        linux_candidates()
    }
}

fn paths(list: &[&str]) -> Vec<PathBuf> {
    list.iter().map(PathBuf::from).collect()
}

fn windows_candidates() -> Vec<(BrowserKind, Vec<PathBuf>)> {
    let mut opera = Vec::new();
    if let Some(home) = dirs::home_dir() {
        opera.push(home.join(r"AppData\Local\Programs\Opera\launcher.exe"));
    }
    opera.push(PathBuf::from(r"C:\Program Files\Opera\launcher.exe"));

    vec![
        (
            BrowserKind::Chrome,
            paths(&[
                r"C:\Program Files\Google\Chrome\Application\chrome.exe",
                r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
            ]),
        ),
        (
            BrowserKind::Firefox,
            paths(&[
                r"C:\Program Files\Mozilla Firefox\firefox.exe",
                r"C:\Program Files (x86)\Mozilla Firefox\firefox.exe",
            ]),
        ),
        (
            BrowserKind::Edge,
            paths(&[
                r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
                r"C:\Program Files\Microsoft\Edge\Application\msedge.exe",
            ]),
        ),
        (BrowserKind::Opera, opera),
    ]
}

fn linux_candidates() -> Vec<(BrowserKind, Vec<PathBuf>)> {
    vec![
        (
            BrowserKind::Chrome,
            paths(&[
                "/usr/bin/google-chrome",
                "/usr/bin/google-chrome-stable",
                "/usr/bin/chromium",
                "/usr/bin/chromium-browser",
                "/snap/bin/chromium",
            ]),
        ),
        (
            BrowserKind::Firefox,
            paths(&["/usr/bin/firefox", "/usr/lib/firefox/firefox", "/snap/bin/firefox"]),
        ),
        (
            BrowserKind::Edge,
            paths(&["/usr/bin/microsoft-edge", "/usr/bin/microsoft-edge-stable"]),
        ),
        (BrowserKind::Opera, paths(&["/usr/bin/opera", "/snap/bin/opera"])),
    ]
}

fn macos_candidates() -> Vec<(BrowserKind, Vec<PathBuf>)> {
    vec![
        (
            BrowserKind::Chrome,
            paths(&[
                "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
                "/Applications/Chromium.app/Contents/MacOS/Chromium",
            ]),
        ),
        (
            BrowserKind::Firefox,
            paths(&["/Applications/Firefox.app/Contents/MacOS/firefox"]),
        ),
        (
            BrowserKind::Edge,
            paths(&["/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge"]),
        ),
        (
            BrowserKind::Opera,
            paths(&["/Applications/Opera.app/Contents/MacOS/Opera"]),
        ),
    ]
}
