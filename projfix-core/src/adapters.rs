//! Default filesystem-backed port implementations.

use crate::ports::{ProjectSource, WritePort};
use crate::settings::FixSettings;
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use glob::{Pattern, glob};
use projfix_domain::schema::PROJECT_EXTENSIONS;
use projfix_xml::query::ends_with_any_of;
use std::collections::BTreeMap;
use tracing::debug;

/// Discovers project files under a directory with a file-name glob.
#[derive(Debug, Clone)]
pub struct FsProjectSource {
    pub root: Utf8PathBuf,
    pub pattern: String,
    pub recursive: bool,
}

impl FsProjectSource {
    pub fn new(root: Utf8PathBuf, pattern: impl Into<String>, recursive: bool) -> Self {
        Self {
            root,
            pattern: pattern.into(),
            recursive,
        }
    }

    pub fn from_settings(settings: &FixSettings) -> Self {
        Self::new(
            settings.target.clone(),
            settings.pattern.clone(),
            settings.recursive,
        )
    }

    fn glob_pattern(&self) -> String {
        let root = Pattern::escape(self.root.as_str());
        if self.recursive {
            format!("{}/**/{}", root, self.pattern)
        } else {
            format!("{}/{}", root, self.pattern)
        }
    }
}

impl ProjectSource for FsProjectSource {
    fn project_files(&self) -> anyhow::Result<Vec<Utf8PathBuf>> {
        let pattern = self.glob_pattern();
        debug!(pattern = %pattern, "scanning for project files");

        let mut out = Vec::new();
        for entry in glob(&pattern).with_context(|| format!("invalid pattern {}", pattern))? {
            let path = entry.map_err(|e| anyhow::anyhow!("glob error: {e}"))?;
            let path = Utf8PathBuf::from_path_buf(path)
                .map_err(|p| anyhow::anyhow!("non UTF-8 path: {}", p.display()))?;

            if !path.is_file() {
                continue;
            }
            if !ends_with_any_of(path.as_str(), PROJECT_EXTENSIONS) {
                debug!(path = %path, "skipping file without a project extension");
                continue;
            }
            out.push(path);
        }

        // Deterministic order matters.
        out.sort();
        Ok(out)
    }

    fn read_project(&self, path: &Utf8Path) -> anyhow::Result<String> {
        fs::read_to_string(path).with_context(|| format!("read {}", path))
    }
}

/// In-memory project source for embedding and testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProjectSource {
    files: BTreeMap<Utf8PathBuf, String>,
}

impl InMemoryProjectSource {
    pub fn new(files: impl IntoIterator<Item = (Utf8PathBuf, String)>) -> Self {
        Self {
            files: files.into_iter().collect(),
        }
    }
}

impl ProjectSource for InMemoryProjectSource {
    fn project_files(&self) -> anyhow::Result<Vec<Utf8PathBuf>> {
        Ok(self.files.keys().cloned().collect())
    }

    fn read_project(&self, path: &Utf8Path) -> anyhow::Result<String> {
        self.files
            .get(path)
            .cloned()
            .with_context(|| format!("no in-memory project at {}", path))
    }
}

/// Filesystem write operations.
#[derive(Debug, Clone, Default)]
pub struct FsWritePort;

impl WritePort for FsWritePort {
    fn write_file(&self, path: &Utf8Path, contents: &[u8]) -> anyhow::Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("create parent dir for {}", path))?;
        }
        fs::write(path, contents).with_context(|| format!("write {}", path))
    }

    fn create_dir_all(&self, path: &Utf8Path) -> anyhow::Result<()> {
        fs::create_dir_all(path).with_context(|| format!("create_dir_all {}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn temp_root() -> (TempDir, Utf8PathBuf) {
        let temp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8 path");
        (temp, root)
    }

    fn touch(root: &Utf8Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(&path, "<Project />").expect("write");
    }

    fn relative(root: &Utf8Path, files: Vec<Utf8PathBuf>) -> Vec<String> {
        files
            .iter()
            .map(|p| {
                p.strip_prefix(root)
                    .expect("under root")
                    .as_str()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn discovery_is_flat_unless_recursive() {
        let (_temp, root) = temp_root();
        touch(&root, "b.csproj");
        touch(&root, "a.csproj");
        touch(&root, "nested/c.csproj");
        touch(&root, "notes.txt");

        let flat = FsProjectSource::new(root.clone(), "*.csproj", false);
        assert_eq!(
            relative(&root, flat.project_files().expect("flat")),
            vec!["a.csproj", "b.csproj"]
        );

        let deep = FsProjectSource::new(root.clone(), "*.csproj", true);
        assert_eq!(
            relative(&root, deep.project_files().expect("deep")),
            vec!["a.csproj", "b.csproj", "nested/c.csproj"]
        );
    }

    #[test]
    fn discovery_requires_a_project_extension() {
        let (_temp, root) = temp_root();
        touch(&root, "App.vbproj");
        touch(&root, "App.csproj.user");
        touch(&root, "App.sln");

        let source = FsProjectSource::new(root.clone(), "App.*", false);
        assert_eq!(
            relative(&root, source.project_files().expect("files")),
            vec!["App.vbproj"]
        );
    }

    #[test]
    fn directories_matching_the_pattern_are_skipped() {
        let (_temp, root) = temp_root();
        fs::create_dir_all(root.join("weird.csproj")).expect("mkdir");
        touch(&root, "real.csproj");

        let source = FsProjectSource::new(root.clone(), "*.csproj", false);
        assert_eq!(
            relative(&root, source.project_files().expect("files")),
            vec!["real.csproj"]
        );
    }

    #[test]
    fn in_memory_source_reads_back_contents() {
        let source = InMemoryProjectSource::new([(
            Utf8PathBuf::from("b/B.csproj"),
            "<Project />".to_string(),
        )]);
        assert_eq!(
            source.project_files().expect("files"),
            vec![Utf8PathBuf::from("b/B.csproj")]
        );
        assert_eq!(
            source
                .read_project(Utf8Path::new("b/B.csproj"))
                .expect("read"),
            "<Project />"
        );
        assert!(source.read_project(Utf8Path::new("missing.csproj")).is_err());
    }

    #[test]
    fn write_port_creates_parent_directories() {
        let (_temp, root) = temp_root();
        let path = root.join("out").join("report.json");
        FsWritePort.write_file(&path, b"{}").expect("write");
        assert_eq!(fs::read_to_string(&path).expect("read"), "{}");
    }
}
