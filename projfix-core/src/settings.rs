//! Clap-free settings for the fix pipeline.

use camino::Utf8PathBuf;
use projfix_domain::NormalizeOptions;

/// File-name pattern used when none is configured.
pub const DEFAULT_PATTERN: &str = "*.csproj";

/// Settings for the fix pipeline.
#[derive(Debug, Clone)]
pub struct FixSettings {
    /// Directory searched for project files.
    pub target: Utf8PathBuf,
    /// Glob matched against file names.
    pub pattern: String,
    /// Descend into subdirectories.
    pub recursive: bool,

    // Normalization
    pub sort: bool,
    pub delete_duplicates: bool,

    /// Write results back; otherwise the run is a dry run.
    pub apply: bool,
}

impl Default for FixSettings {
    fn default() -> Self {
        Self {
            target: Utf8PathBuf::from("."),
            pattern: DEFAULT_PATTERN.to_string(),
            recursive: false,
            sort: false,
            delete_duplicates: true,
            apply: false,
        }
    }
}

impl FixSettings {
    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            sort: self.sort,
            delete_duplicates: self.delete_duplicates,
        }
    }
}
