//! Driver binaries
//!
//! Chromium-family browsers speak the DevTools protocol directly and need no
//! separate driver. Firefox is driven over WebDriver through `geckodriver`,
//! which is taken from the cache directory, then from `PATH`, and downloaded
//! from the latest GitHub release as a last resort.

use std::fs::{self, File};
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use nutri_core::config::BrowserSettings;
use nutri_core::{BrowserDescriptor, NutriError, Result};
use serde::Deserialize;
use tar::Archive;
use tracing::{debug, info};

const GECKODRIVER_RELEASES: &str = "https://api.github.com/repos/mozilla/geckodriver/releases/latest";

#[cfg(windows)]
pub const GECKODRIVER_BIN: &str = "geckodriver.exe";
#[cfg(not(windows))]
pub const GECKODRIVER_BIN: &str = "geckodriver";

/// How a session reaches its browser
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverBinary {
    /// DevTools protocol, spoken directly to the browser
    DevTools,
    /// WebDriver server executable
    WebDriver(PathBuf),
}

#[derive(Debug, Deserialize)]
struct GithubRelease {
    tag_name: String,
    assets: Vec<GithubAsset>,
}

#[derive(Debug, Deserialize)]
struct GithubAsset {
    name: String,
    browser_download_url: String,
}

/// Locates or fetches the driver a browser needs
#[derive(Debug, Clone)]
pub struct DriverResolver {
    cache_dir: PathBuf,
    path_lookup: bool,
}

impl DriverResolver {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            path_lookup: true,
        }
    }

    /// Cache under the configured directory, or the user cache dir
    pub fn from_settings(settings: &BrowserSettings) -> Self {
        let cache_dir = settings
            .driver_cache_dir
            .clone()
            .unwrap_or_else(default_cache_dir);
        Self::new(cache_dir)
    }

    /// Skip the `PATH` lookup
    pub fn without_path_lookup(mut self) -> Self {
        self.path_lookup = false;
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub async fn resolve(&self, browser: &BrowserDescriptor) -> Result<DriverBinary> {
        if browser.kind.is_chromium() {
            return Ok(DriverBinary::DevTools);
        }
        self.geckodriver().await.map(DriverBinary::WebDriver)
    }

    pub async fn geckodriver(&self) -> Result<PathBuf> {
        let cached = self.cache_dir.join(GECKODRIVER_BIN);
        if cached.is_file() {
            debug!("Using cached geckodriver at {}", cached.display());
            return Ok(cached);
        }

        if self.path_lookup {
            if let Ok(path) = which::which("geckodriver") {
                debug!("Using geckodriver from PATH at {}", path.display());
                return Ok(path);
            }
        }

        self.download_geckodriver().await
    }

    async fn download_geckodriver(&self) -> Result<PathBuf> {
        let platform = geckodriver_platform().ok_or_else(|| {
            NutriError::DriverResolution(format!(
                "No geckodriver build for {}/{}",
                std::env::consts::OS,
                std::env::consts::ARCH
            ))
        })?;

        info!("Downloading geckodriver for {}", platform);

        let client = reqwest::Client::builder()
            .user_agent(concat!("nutri/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| NutriError::DriverResolution(format!("HTTP client build failed: {}", e)))?;

        let release: GithubRelease = client
            .get(GECKODRIVER_RELEASES)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| NutriError::DriverResolution(format!("Release lookup failed: {}", e)))?
            .json()
            .await
            .map_err(|e| NutriError::DriverResolution(format!("Release parse failed: {}", e)))?;

        let asset = release
            .assets
            .iter()
            .find(|a| is_platform_archive(&a.name, platform))
            .ok_or_else(|| {
                NutriError::DriverResolution(format!(
                    "No geckodriver asset for {} in {}",
                    platform, release.tag_name
                ))
            })?;

        let archive = client
            .get(&asset.browser_download_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| NutriError::DriverResolution(format!("Download failed: {}", e)))?
            .bytes()
            .await
            .map_err(|e| NutriError::DriverResolution(format!("Download read failed: {}", e)))?;

        fs::create_dir_all(&self.cache_dir)?;
        let target = self.cache_dir.join(GECKODRIVER_BIN);
        unpack_driver(&archive, &asset.name, &target)?;

        info!(
            "Installed geckodriver {} at {}",
            release.tag_name,
            target.display()
        );
        Ok(target)
    }
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("nutri")
        .join("drivers")
}

/// Release asset infix for the running OS and architecture
pub fn geckodriver_platform() -> Option<&'static str> {
    match (std::env::consts::OS, std::env::consts::ARCH) {
        ("linux", "x86_64") => Some("linux64"),
        ("linux", "aarch64") => Some("linux-aarch64"),
        ("macos", "x86_64") => Some("macos"),
        ("macos", "aarch64") => Some("macos-aarch64"),
        ("windows", "x86_64") => Some("win64"),
        ("windows", "x86") => Some("win32"),
        ("windows", "aarch64") => Some("win-aarch64"),
        _ => None,
    }
}

/// `geckodriver-v0.35.0-linux64.tar.gz` matches `linux64` but not `linux-aarch64`
fn is_platform_archive(name: &str, platform: &str) -> bool {
    [".tar.gz", ".zip"].iter().any(|ext| {
        name.strip_suffix(ext)
            .map(|stem| stem.ends_with(&format!("-{}", platform)))
            .unwrap_or(false)
    })
}

/// Extract the driver executable from a `.zip` or `.tar.gz` archive to `target`
///
/// The driver is written next to `target` first and renamed into place only
/// once complete, so a failed unpack never leaves a cached partial binary.
pub fn unpack_driver(archive: &[u8], archive_name: &str, target: &Path) -> Result<()> {
    let staging = target.with_extension("part");
    let unpacked = unpack_to(archive, archive_name, &staging)
        .and_then(|()| set_executable(&staging))
        .and_then(|()| fs::rename(&staging, target).map_err(NutriError::from));

    if unpacked.is_err() && staging.exists() {
        if let Err(e) = fs::remove_file(&staging) {
            debug!("Failed to remove {}: {}", staging.display(), e);
        }
    }
    unpacked
}

fn unpack_to(archive: &[u8], archive_name: &str, out: &Path) -> Result<()> {
    if archive_name.ends_with(".zip") {
        unpack_zip(archive, out)
    } else if archive_name.ends_with(".tar.gz") {
        unpack_tar_gz(archive, out)
    } else {
        Err(NutriError::DriverResolution(format!(
            "Unsupported archive format: {}",
            archive_name
        )))
    }
}

/// Copy `entry` to `out`, failing unless exactly `expected` bytes arrive
fn write_entry(entry: &mut impl Read, expected: u64, out: &Path) -> Result<()> {
    let mut file = File::create(out)?;
    let written = std::io::copy(entry, &mut file)?;
    if written != expected {
        return Err(NutriError::DriverResolution(format!(
            "Truncated archive: {} of {} bytes",
            written, expected
        )));
    }
    Ok(())
}

fn unpack_zip(archive: &[u8], out: &Path) -> Result<()> {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive))
        .map_err(|e| NutriError::DriverResolution(format!("Zip open failed: {}", e)))?;

    for i in 0..zip.len() {
        let mut entry = zip
            .by_index(i)
            .map_err(|e| NutriError::DriverResolution(format!("Zip entry failed: {}", e)))?;
        let is_driver = Path::new(entry.name())
            .file_name()
            .map_or(false, |n| n == GECKODRIVER_BIN);
        if is_driver {
            let expected = entry.size();
            return write_entry(&mut entry, expected, out);
        }
    }

    Err(NutriError::DriverResolution(format!(
        "{} not found in archive",
        GECKODRIVER_BIN
    )))
}

fn unpack_tar_gz(archive: &[u8], out: &Path) -> Result<()> {
    let mut tar = Archive::new(GzDecoder::new(Cursor::new(archive)));

    for entry in tar.entries()? {
        let mut entry = entry?;
        let is_driver = entry
            .path()?
            .file_name()
            .map_or(false, |n| n == GECKODRIVER_BIN);
        if is_driver {
            let expected = entry.header().size()?;
            return write_entry(&mut entry, expected, out);
        }
    }

    Err(NutriError::DriverResolution(format!(
        "{} not found in archive",
        GECKODRIVER_BIN
    )))
}

#[cfg(unix)]
fn set_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> Result<()> {
    Ok(())
}
