// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Configuration file support for gqrx-client.
//!
//! The `[gqrx-client]` section of `gqrx-rs.toml` is loaded from, in order:
//! 1. Path specified via `--config` CLI argument
//! 2. `./gqrx-rs.toml` (current directory)
//! 3. `~/.config/gqrx-rs/gqrx-rs.toml` (XDG config)
//! 4. `/etc/gqrx-rs/gqrx-rs.toml` (system-wide)

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use gqrx_app::{ConfigError, ConfigFile};
use gqrx_client::ConnectionOptions;
use gqrx_core::is_valid_mode;

/// Top-level client configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// General settings
    pub general: GeneralConfig,
    /// Receiver connection settings
    pub remote: RemoteConfig,
    /// Per-mode presets
    pub presets: PresetsConfig,
    /// Named receiver settings, recalled with `bookmark tune <name>`
    pub bookmarks: BTreeMap<String, Bookmark>,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: Option<String>,
}

/// Receiver connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Receiver URL (host, host:port or tcp://host:port).
    pub url: Option<String>,
    /// Dial timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Per-reply timeout in milliseconds (0 = wait forever).
    pub io_timeout_ms: u64,
    /// Poll interval for `monitor` in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: None,
            connect_timeout_ms: 5_000,
            io_timeout_ms: 10_000,
            poll_interval_ms: 1_000,
        }
    }
}

impl RemoteConfig {
    pub fn connection_options(&self) -> ConnectionOptions {
        ConnectionOptions {
            connect_timeout: Some(Duration::from_millis(self.connect_timeout_ms)),
            io_timeout: (self.io_timeout_ms > 0)
                .then(|| Duration::from_millis(self.io_timeout_ms)),
        }
    }
}

/// Default bandwidth (Hz) used when a mode is set without one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PresetsConfig {
    pub bandwidths: BTreeMap<String, i64>,
}

impl Default for PresetsConfig {
    fn default() -> Self {
        let bandwidths = [
            ("OFF", 0),
            ("RAW", 10_000),
            ("AM", 10_000),
            ("AMS", 10_000),
            ("LSB", 2_800),
            ("USB", 2_800),
            ("CWL", 500),
            ("CWR", 500),
            ("CWU", 500),
            ("CW", 500),
            ("FM", 10_000),
            ("WFM", 160_000),
            ("WFM_ST", 160_000),
            ("WFM_ST_OIRT", 160_000),
        ]
        .into_iter()
        .map(|(mode, bw)| (mode.to_string(), bw))
        .collect();
        Self { bandwidths }
    }
}

impl PresetsConfig {
    pub fn bandwidth_for(&self, mode: &str) -> Option<i64> {
        self.bandwidths.get(mode).copied()
    }
}

/// A stored frequency and demodulator setting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    pub frequency_hz: i64,
    pub mode: String,
    /// Falls back to the mode preset when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bandwidth: Option<i64>,
}

impl Bookmark {
    /// Bandwidth to tune with: the bookmark's own, else the mode preset.
    pub fn resolved_bandwidth(&self, presets: &PresetsConfig) -> Option<i64> {
        self.bandwidth.or_else(|| presets.bandwidth_for(&self.mode))
    }

    /// Render as a `[gqrx-client.bookmarks.<name>]` table for pasting into
    /// the config file.
    pub fn to_toml(&self, name: &str) -> String {
        let mut bookmarks = toml::Table::new();
        let mut section = toml::Table::new();
        let mut doc = toml::Table::new();
        if let Ok(entry) = toml::Value::try_from(self) {
            bookmarks.insert(name.to_string(), entry);
        }
        section.insert("bookmarks".to_string(), toml::Value::Table(bookmarks));
        doc.insert(
            ClientConfig::section_key().to_string(),
            toml::Value::Table(section),
        );
        toml::to_string(&doc).unwrap_or_default()
    }
}

impl ClientConfig {
    pub fn bookmark(&self, name: &str) -> Option<&Bookmark> {
        self.bookmarks.get(name)
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_log_level(self.general.log_level.as_deref())?;

        if let Some(url) = &self.remote.url {
            if url.trim().is_empty() {
                return Err("[remote].url must not be empty when set".to_string());
            }
        }
        if self.remote.connect_timeout_ms == 0 {
            return Err("[remote].connect_timeout_ms must be > 0".to_string());
        }
        if self.remote.poll_interval_ms == 0 {
            return Err("[remote].poll_interval_ms must be > 0".to_string());
        }
        for (mode, bandwidth) in &self.presets.bandwidths {
            if !is_valid_mode(mode) {
                return Err(format!("[presets.bandwidths] unknown mode '{mode}'"));
            }
            if *bandwidth < 0 {
                return Err(format!(
                    "[presets.bandwidths].{mode} must not be negative"
                ));
            }
        }
        for (name, bookmark) in &self.bookmarks {
            if name.trim().is_empty() {
                return Err("[bookmarks] names must not be empty".to_string());
            }
            if bookmark.frequency_hz <= 0 {
                return Err(format!("[bookmarks.{name}].frequency_hz must be > 0"));
            }
            if !is_valid_mode(&bookmark.mode) {
                return Err(format!(
                    "[bookmarks.{name}].mode '{}' is not a known mode",
                    bookmark.mode
                ));
            }
            match bookmark.resolved_bandwidth(&self.presets) {
                Some(bw) if bw < 0 => {
                    return Err(format!("[bookmarks.{name}].bandwidth must not be negative"))
                }
                Some(_) => {}
                None => {
                    return Err(format!(
                        "[bookmarks.{name}] has no bandwidth and mode {} has no preset",
                        bookmark.mode
                    ))
                }
            }
        }

        Ok(())
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        <Self as ConfigFile>::load_from_file(path)
    }

    /// Load configuration from the default search paths.
    /// Returns default config if no config file is found.
    pub fn load_from_default_paths() -> Result<(Self, Option<PathBuf>), ConfigError> {
        <Self as ConfigFile>::load_from_default_paths()
    }

    /// Generate an example configuration as a TOML string.
    pub fn example_toml() -> String {
        let example = ClientConfig {
            general: GeneralConfig {
                log_level: Some("info".to_string()),
            },
            remote: RemoteConfig {
                url: Some("127.0.0.1:7356".to_string()),
                ..RemoteConfig::default()
            },
            presets: PresetsConfig::default(),
            bookmarks: [(
                "noaa-1".to_string(),
                Bookmark {
                    frequency_hz: 162_550_000,
                    mode: "FM".to_string(),
                    bandwidth: Some(12_500),
                },
            )]
            .into_iter()
            .collect(),
        };

        let mut doc = toml::Table::new();
        match toml::Value::try_from(&example) {
            Ok(section) => {
                doc.insert(Self::section_key().to_string(), section);
            }
            Err(_) => return String::new(),
        }
        toml::to_string_pretty(&doc).unwrap_or_default()
    }
}

fn validate_log_level(level: Option<&str>) -> Result<(), String> {
    if let Some(level) = level {
        match level {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(format!(
                    "[general].log_level '{}' is invalid (expected one of: trace, debug, info, warn, error)",
                    level
                ))
            }
        }
    }
    Ok(())
}

impl ConfigFile for ClientConfig {
    fn section_key() -> &'static str {
        "gqrx-client"
    }
}
