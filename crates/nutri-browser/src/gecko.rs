//! Firefox sessions over WebDriver
//!
//! A private `geckodriver` is spawned on a free local port and a fantoccini
//! client connects to it. The driver process is killed when the session
//! closes or is dropped.

use std::net::TcpListener;
use std::path::Path;
use std::process::Stdio;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder};
use nutri_core::wait::{poll_until, PollPolicy};
use nutri_core::{BrowserKind, NutriError, Result};
use serde_json::{json, Map, Value};
use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::launch::LaunchPlan;
use crate::scripts;
use crate::session::Session;

pub struct GeckoSession {
    client: Mutex<Option<Client>>,
    driver: Mutex<Option<Child>>,
}

impl GeckoSession {
    /// Start `geckodriver` and open a Firefox session through it
    ///
    /// `startup` bounds how long the driver may take to accept connections.
    pub async fn launch(plan: &LaunchPlan, geckodriver: &Path, startup: PollPolicy) -> Result<Self> {
        let kind = plan.kind();
        let port = free_port().map_err(|e| NutriError::session_start(kind, e))?;

        info!(
            "Starting geckodriver on port {} (headless: {}, size: {}x{})",
            port, plan.headless, plan.window.0, plan.window.1
        );

        let mut driver = Command::new(geckodriver)
            .arg("--port")
            .arg(port.to_string())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| NutriError::session_start(kind, format!("Failed to start geckodriver: {}", e)))?;

        let address = format!("127.0.0.1:{}", port);
        let reachable = poll_until("geckodriver port", startup, || {
            let address = address.clone();
            async move { Ok(TcpStream::connect(address).await.ok().map(|_| ())) }
        })
        .await;

        if let Err(e) = reachable {
            let _ = driver.kill().await;
            return Err(NutriError::session_start(kind, e));
        }

        let client = match ClientBuilder::native()
            .capabilities(capabilities(plan))
            .connect(&format!("http://{}", address))
            .await
        {
            Ok(client) => client,
            Err(e) => {
                let _ = driver.kill().await;
                return Err(NutriError::session_start(
                    kind,
                    format!("WebDriver session failed: {}", e),
                ));
            }
        };

        info!("{} launched", kind);

        Ok(Self {
            client: Mutex::new(Some(client)),
            driver: Mutex::new(Some(driver)),
        })
    }

    fn client(&self) -> Result<Client> {
        self.client
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| NutriError::Browser("Session already closed".to_string()))
    }
}

/// `moz:firefoxOptions` for the planned binary and flags
fn capabilities(plan: &LaunchPlan) -> Map<String, Value> {
    let mut caps = Map::new();
    caps.insert("browserName".to_string(), json!("firefox"));
    caps.insert(
        "moz:firefoxOptions".to_string(),
        json!({
            "binary": plan.descriptor.executable_path.to_string_lossy(),
            "args": plan.args,
        }),
    );
    caps
}

fn free_port() -> std::io::Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

#[async_trait]
impl Session for GeckoSession {
    fn browser(&self) -> BrowserKind {
        BrowserKind::Firefox
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        debug!("Navigating to {}", url);
        self.client()?
            .goto(url)
            .await
            .map_err(|e| NutriError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })
    }

    async fn evaluate(&self, body: &str) -> Result<Value> {
        let script = format!("return {};", scripts::wrap(body));
        let value = self
            .client()?
            .execute(&script, Vec::new())
            .await
            .map_err(|e| NutriError::Script(e.to_string()))?;

        scripts::decode(Some(value))
    }

    async fn close(&self) -> Result<()> {
        let client = self
            .client
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let driver = self
            .driver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let mut result = Ok(());
        if let Some(client) = client {
            info!("Closing firefox session");
            if let Err(e) = client.close().await {
                result = Err(NutriError::Browser(format!("Failed to end WebDriver session: {}", e)));
            }
        }
        if let Some(mut driver) = driver {
            if let Err(e) = driver.kill().await {
                warn!("Failed to stop geckodriver: {}", e);
            }
        }
        result
    }
}
