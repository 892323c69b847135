//! Configuration loading and management

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

const DEFAULT_GENERATOR_TIMEOUT_SECS: u64 = 30;

/// Where a capability comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Terminal-backed stand-in (stdin / stdout)
    Console,
    /// Capability absent
    None,
}

impl Backend {
    fn parse(key: &str, value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "console" => Ok(Backend::Console),
            "none" | "off" => Ok(Backend::None),
            other => bail!("{key}: unknown backend {other:?} (expected console or none)"),
        }
    }

    pub fn is_enabled(self) -> bool {
        self == Backend::Console
    }
}

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory for runtime data
    pub data_dir: PathBuf,

    /// Path to the Unix domain socket for IPC
    pub socket_path: PathBuf,

    /// Persisted voice settings
    pub settings_path: PathBuf,

    /// HTTP response generator; commands get the apology without one
    pub generator_url: Option<String>,

    pub generator_timeout: Duration,

    pub recognition: Backend,
    pub synthesis: Backend,

    /// Turn listening on as soon as the daemon is up
    pub listen_on_start: bool,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let data_dir = match lookup("AURA_DATA_DIR").filter(|d| !d.trim().is_empty()) {
            Some(dir) => PathBuf::from(dir),
            None => {
                let home = lookup("HOME").context("HOME is not set and AURA_DATA_DIR is missing")?;
                PathBuf::from(home)
                    .join(".local")
                    .join("share")
                    .join("aura-voice")
            }
        };

        let generator_timeout = match lookup("AURA_GENERATOR_TIMEOUT_SECS") {
            Some(secs) => {
                let secs: u64 = secs
                    .trim()
                    .parse()
                    .with_context(|| format!("AURA_GENERATOR_TIMEOUT_SECS: invalid value {secs:?}"))?;
                Duration::from_secs(secs.max(1))
            }
            None => Duration::from_secs(DEFAULT_GENERATOR_TIMEOUT_SECS),
        };

        let backend = |key: &str| match lookup(key) {
            Some(value) => Backend::parse(key, &value),
            None => Ok(Backend::Console),
        };

        let listen_on_start = match lookup("AURA_LISTEN_ON_START") {
            Some(value) => matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            ),
            None => true,
        };

        Ok(Self {
            socket_path: data_dir.join("daemon.sock"),
            settings_path: data_dir.join("settings.json"),
            data_dir,
            generator_url: lookup("AURA_GENERATOR_URL").filter(|url| !url.trim().is_empty()),
            generator_timeout,
            recognition: backend("AURA_RECOGNITION")?,
            synthesis: backend("AURA_SYNTHESIS")?,
            listen_on_start,
        })
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("failed to create {}", self.data_dir.display()))?;
        Ok(())
    }
}
