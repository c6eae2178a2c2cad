//! Port traits abstracting all I/O away from the pipeline.

use camino::{Utf8Path, Utf8PathBuf};

/// Where project files come from.
pub trait ProjectSource {
    /// Project files to process, in a deterministic order.
    fn project_files(&self) -> anyhow::Result<Vec<Utf8PathBuf>>;

    fn read_project(&self, path: &Utf8Path) -> anyhow::Result<String>;
}

/// File-system write operations.
pub trait WritePort {
    fn write_file(&self, path: &Utf8Path, contents: &[u8]) -> anyhow::Result<()>;
    fn create_dir_all(&self, path: &Utf8Path) -> anyhow::Result<()>;
}
