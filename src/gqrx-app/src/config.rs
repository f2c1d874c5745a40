// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Shared `gqrx-rs.toml` loader.
//!
//! One file can hold settings for several gqrx-rs programs, each under its
//! own top-level table (`[gqrx-client]` for the CLI). A program implements
//! [`ConfigFile`] with its table name and gets file, string and search-path
//! loading for free. Tables belonging to other programs are ignored.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;

/// File name looked up in each search directory.
pub const CONFIG_FILE_NAME: &str = "gqrx-rs.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    ReadError(PathBuf, String),

    #[error("Failed to parse config file {0}: {1}")]
    ParseError(PathBuf, String),

    #[error("Config file {0} has no [{1}] table")]
    MissingSection(PathBuf, &'static str),
}

/// Where `gqrx-rs.toml` is looked for, most specific first: the working
/// directory, the user's config directory, then `/etc/gqrx-rs`.
fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(user_dir) = dirs::config_dir() {
        paths.push(user_dir.join("gqrx-rs").join(CONFIG_FILE_NAME));
    }
    paths.push(Path::new("/etc/gqrx-rs").join(CONFIG_FILE_NAME));
    paths
}

/// Pull one program's table out of a whole `gqrx-rs.toml` document.
///
/// `origin` only labels errors. An absent table is `Ok(None)` so the search
/// can move on to the next file.
fn parse_section<T: DeserializeOwned>(
    document: &str,
    origin: &Path,
    section: &str,
) -> Result<Option<T>, ConfigError> {
    let parse_error =
        |e: toml::de::Error| ConfigError::ParseError(origin.to_path_buf(), e.to_string());

    let mut root: toml::Table = toml::from_str(document).map_err(parse_error)?;
    match root.remove(section) {
        Some(table) => table.try_into::<T>().map(Some).map_err(parse_error),
        None => Ok(None),
    }
}

fn read_section<T: DeserializeOwned>(
    path: &Path,
    section: &str,
) -> Result<Option<T>, ConfigError> {
    let document = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::ReadError(path.to_path_buf(), e.to_string()))?;
    parse_section(&document, path, section)
}

/// A program's settings table in `gqrx-rs.toml`.
///
/// Implementors name their table and derive `Deserialize` with
/// `#[serde(default)]` so a partial table fills in from `Default`.
pub trait ConfigFile: Sized + Default + DeserializeOwned {
    /// Top-level table name, e.g. `"gqrx-client"`.
    fn section_key() -> &'static str;

    /// Load from an explicitly named file. The table must be present.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        read_section(path, Self::section_key())?
            .ok_or_else(|| ConfigError::MissingSection(path.to_path_buf(), Self::section_key()))
    }

    /// Load from TOML text already in memory. The table must be present.
    fn load_from_str(document: &str) -> Result<Self, ConfigError> {
        let origin = Path::new("<inline>");
        parse_section(document, origin, Self::section_key())?
            .ok_or_else(|| ConfigError::MissingSection(origin.to_path_buf(), Self::section_key()))
    }

    /// Walk the search paths and load the first file carrying this table.
    ///
    /// Files without the table are skipped. With nothing found the result is
    /// `(Self::default(), None)`.
    fn load_from_default_paths() -> Result<(Self, Option<PathBuf>), ConfigError> {
        for path in config_search_paths().into_iter().filter(|p| p.is_file()) {
            if let Some(cfg) = read_section(&path, Self::section_key())? {
                return Ok((cfg, Some(path)));
            }
        }
        Ok((Self::default(), None))
    }
}
