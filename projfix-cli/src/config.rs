//! Configuration file loading for projfix.
//!
//! Discovers and loads `projfix.toml` from the target directory.
//! Merges config file settings with CLI arguments (CLI takes precedence).

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use projfix_core::settings::DEFAULT_PATTERN;
use serde::Deserialize;
use tracing::debug;

/// The config file name to search for.
pub const CONFIG_FILE_NAME: &str = "projfix.toml";

/// Top-level configuration from projfix.toml.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjfixConfig {
    pub fix: FixConfig,
}

/// `[fix]` section of the config.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FixConfig {
    /// Sort item declarations by `Include` and property entries by name.
    pub sort: bool,

    /// Drop repeated declarations of the same file.
    pub delete_duplicates: bool,

    /// Descend into subdirectories when discovering projects.
    pub recursive: bool,

    /// File-name glob for project discovery.
    pub pattern: Option<String>,
}

impl Default for FixConfig {
    fn default() -> Self {
        Self {
            sort: false,
            delete_duplicates: true,
            recursive: false,
            pattern: None,
        }
    }
}

/// Discover the projfix.toml config file in `target`.
pub fn discover_config(target: &Utf8Path) -> Option<Utf8PathBuf> {
    let config_path = target.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        debug!("found config file at {}", config_path);
        Some(config_path)
    } else {
        debug!("no config file found at {}", config_path);
        None
    }
}

/// Load and parse a projfix.toml config file.
pub fn load_config(path: &Utf8Path) -> anyhow::Result<ProjfixConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config file {}", path))?;
    parse_config(&contents).with_context(|| format!("parse config file {}", path))
}

pub fn parse_config(contents: &str) -> anyhow::Result<ProjfixConfig> {
    let config: ProjfixConfig = toml::from_str(contents).context("invalid TOML")?;
    Ok(config)
}

/// Load config from the target directory, or return default if not found.
pub fn load_or_default(target: &Utf8Path) -> anyhow::Result<ProjfixConfig> {
    match discover_config(target) {
        Some(path) => load_config(&path),
        None => Ok(ProjfixConfig::default()),
    }
}

/// Discovery and normalization switches after merging file and CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedConfig {
    pub pattern: String,
    pub recursive: bool,
    pub sort: bool,
    pub delete_duplicates: bool,
}

/// Builder for merging config file with CLI arguments.
pub struct ConfigMerger {
    config: ProjfixConfig,
}

impl ConfigMerger {
    pub fn new(config: ProjfixConfig) -> Self {
        Self { config }
    }

    /// Merge with discovery arguments shared by `fix` and `list`.
    ///
    /// An explicit `--pattern` replaces the configured one; `--recursive` turns recursion on.
    pub fn merge_discovery_args(
        self,
        cli_pattern: Option<&str>,
        cli_recursive: bool,
    ) -> MergedConfig {
        let fix = self.config.fix;
        MergedConfig {
            pattern: cli_pattern
                .map(str::to_string)
                .or(fix.pattern)
                .unwrap_or_else(|| DEFAULT_PATTERN.to_string()),
            recursive: cli_recursive || fix.recursive,
            sort: fix.sort,
            delete_duplicates: fix.delete_duplicates,
        }
    }

    /// Merge with `fix` command arguments.
    ///
    /// `--sort` turns sorting on; `--no-dedupe` turns deduplication off whatever the file says.
    pub fn merge_fix_args(
        self,
        cli_pattern: Option<&str>,
        cli_recursive: bool,
        cli_sort: bool,
        cli_no_dedupe: bool,
    ) -> MergedConfig {
        let mut merged = self.merge_discovery_args(cli_pattern, cli_recursive);
        merged.sort |= cli_sort;
        merged.delete_duplicates &= !cli_no_dedupe;
        merged
    }
}
