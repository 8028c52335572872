//! Startup settings for a plugin process.
//!
//! Settings are resolved once, when the [`Plugin`](crate::Plugin) is built,
//! and decide where diagnostic output goes. When the host launches the
//! plugin, stdout carries the protocol, so log lines must never reach it.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::error::PluginError;

/// Environment variable set by the host on plugins it launches.
pub const HOST_MARKER_ENV: &str = "LIGHTNINGD_PLUGIN";
/// Log file used when the host manages the plugin.
pub const DEFAULT_LOG_FILE: &str = "lightning-plugin.log";

fn default_log_filter() -> String {
    "info".to_string()
}

/// Destination of the plugin's own log output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogSink {
    /// Standard error; stdout is left to the protocol.
    #[default]
    Stderr,
    /// A file opened in append mode before any protocol bytes are written.
    File(PathBuf),
}

impl LogSink {
    /// Picks the sink for a plugin talking over stdout.
    pub fn resolve(host_managed: bool, log_file: impl Into<PathBuf>) -> Self {
        if host_managed {
            LogSink::File(log_file.into())
        } else {
            LogSink::Stderr
        }
    }

    /// Resolves the sink from [`HOST_MARKER_ENV`].
    pub fn from_env() -> Self {
        Self::resolve(
            std::env::var_os(HOST_MARKER_ENV).is_some(),
            DEFAULT_LOG_FILE,
        )
    }

    /// Opens the log file for [`LogSink::File`].
    ///
    /// # Errors
    ///
    /// [`PluginError::StartupIo`] if the file cannot be opened.
    pub fn open(&self) -> Result<Option<File>, PluginError> {
        match self {
            LogSink::Stderr => Ok(None),
            LogSink::File(path) => OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map(Some)
                .map_err(|source| PluginError::StartupIo {
                    path: path.clone(),
                    source,
                }),
        }
    }
}

/// Settings applied when a plugin starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginSettings {
    #[serde(default)]
    pub log_sink: LogSink,
    /// `tracing` filter directive, overridden by `RUST_LOG`.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            log_sink: LogSink::default(),
            log_filter: default_log_filter(),
        }
    }
}

impl PluginSettings {
    pub fn from_env() -> Self {
        Self {
            log_sink: LogSink::from_env(),
            ..Self::default()
        }
    }

    /// Reads settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings: {}", path.display()))?;
        toml::from_str(&data)
            .with_context(|| format!("failed to parse settings: {}", path.display()))
    }

    pub fn with_log_sink(mut self, sink: LogSink) -> Self {
        self.log_sink = sink;
        self
    }

    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// Opens the sink and installs a global `tracing` subscriber writing to it.
    ///
    /// An already installed subscriber is kept; the sink is still opened so
    /// an unusable log file always aborts startup.
    pub(crate) fn install_logging(&self) -> Result<(), PluginError> {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.log_filter));
        let installed = match self.log_sink.open()? {
            Some(file) => tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(false)
                .try_init(),
            None => tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .try_init(),
        };
        if installed.is_err() {
            debug!("tracing subscriber already installed, keeping it");
        }
        Ok(())
    }
}
