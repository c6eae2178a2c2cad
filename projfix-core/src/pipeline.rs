//! Core fix pipeline, extracted from the CLI.
//!
//! These entry points are I/O-agnostic: all filesystem operations are performed through the
//! port traits.

use crate::ports::{ProjectSource, WritePort};
use crate::settings::FixSettings;
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use diffy::PatchFormatter;
use projfix_domain::{ChangeLog, NormalizeError, NormalizeOptions, SdkNormalizer};
use projfix_render::render_report_md;
use projfix_types::report::{FileReport, ProjfixReport, ReportOptions, RunInfo, ToolInfo};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Error type for pipeline results. Every variant maps to exit code 1.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("{path}: {source}")]
    Project {
        path: Utf8PathBuf,
        source: NormalizeError,
    },
    #[error("{0:#}")]
    Internal(#[from] anyhow::Error),
}

/// One project after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub text: String,
    pub changes: Vec<String>,
}

impl Normalized {
    pub fn changed_from(&self, original: &str) -> bool {
        self.text != original
    }
}

/// Outcome of `run_fix`.
pub struct FixOutcome {
    pub report: ProjfixReport,
    /// Unified diff of every changed file, paths relative to the target.
    pub patch: String,
}

/// Normalize one project file held in memory.
pub fn normalize_text(
    text: &str,
    options: &NormalizeOptions,
) -> Result<Normalized, NormalizeError> {
    let mut engine = SdkNormalizer::parse(text)?;
    let mut changes = ChangeLog::new();
    engine.run(options, &mut changes)?;
    Ok(Normalized {
        text: engine.document().to_xml_string(),
        changes: changes.into_entries(),
    })
}

/// Run the fix pipeline over every project the source yields.
///
/// Files are written through `writer` only when `settings.apply` is set. A project that fails to
/// parse aborts the run.
pub fn run_fix(
    settings: &FixSettings,
    source: &dyn ProjectSource,
    writer: &dyn WritePort,
    tool: ToolInfo,
) -> Result<FixOutcome, ToolError> {
    let started_at = Utc::now();
    let options = settings.normalize_options();
    let mut report = ProjfixReport::new(
        tool,
        RunInfo {
            started_at,
            ended_at: None,
            duration_ms: None,
        },
        ReportOptions {
            sort: options.sort,
            delete_duplicates: options.delete_duplicates,
            apply: settings.apply,
        },
    );

    let mut before = BTreeMap::new();
    let mut after = BTreeMap::new();

    for path in source.project_files().context("discover project files")? {
        let original = source.read_project(&path)?;
        let normalized = normalize_text(&original, &options).map_err(|source| {
            ToolError::Project {
                path: path.clone(),
                source,
            }
        })?;

        let changed = normalized.changed_from(&original);
        if changed && settings.apply {
            writer.write_file(&path, normalized.text.as_bytes())?;
            info!(path = %path, changes = normalized.changes.len(), "wrote normalized project");
        } else {
            debug!(path = %path, changed, "normalized project");
        }

        let display = display_path(&settings.target, &path);
        report.push(FileReport {
            path: display.clone(),
            changes: normalized.changes,
            changed,
            written: changed && settings.apply,
            sha256_before: sha256_hex(original.as_bytes()),
            sha256_after: sha256_hex(normalized.text.as_bytes()),
        });
        before.insert(display.clone(), original);
        after.insert(display, normalized.text);
    }

    let ended_at = Utc::now();
    report.run.ended_at = Some(ended_at);
    report.run.duration_ms = u64::try_from((ended_at - started_at).num_milliseconds()).ok();

    let patch = render_patch(&before, &after);
    Ok(FixOutcome { report, patch })
}

/// Write `report.json`, `report.md` and (when non-empty) `patch.diff` into `out_dir`.
pub fn write_fix_artifacts(
    outcome: &FixOutcome,
    out_dir: &Utf8Path,
    writer: &dyn WritePort,
) -> anyhow::Result<()> {
    writer.create_dir_all(out_dir)?;

    let report_json =
        serde_json::to_string_pretty(&outcome.report).context("serialize report")?;
    writer.write_file(&out_dir.join("report.json"), report_json.as_bytes())?;

    let report_md = render_report_md(&outcome.report);
    writer.write_file(&out_dir.join("report.md"), report_md.as_bytes())?;

    if !outcome.patch.is_empty() {
        writer.write_file(&out_dir.join("patch.diff"), outcome.patch.as_bytes())?;
    }
    Ok(())
}

fn display_path(target: &Utf8Path, path: &Utf8Path) -> String {
    path.strip_prefix(target)
        .unwrap_or(path)
        .as_str()
        .replace('\\', "/")
}

fn render_patch(before: &BTreeMap<String, String>, after: &BTreeMap<String, String>) -> String {
    let mut out = String::new();
    let formatter = PatchFormatter::new();

    for (path, old) in before {
        let new = after.get(path).unwrap_or(old);
        if old == new {
            continue;
        }

        out.push_str(&format!("diff --git a/{0} b/{0}\n", path));
        out.push_str(&format!("--- a/{0}\n+++ b/{0}\n", path));

        let patch = diffy::create_patch(old, new);
        let body = formatter.fmt_patch(&patch).to_string();
        // diffy writes its own file header; ours above carries the real path.
        for line in body.lines().skip_while(|l| l.starts_with("---") || l.starts_with("+++")) {
            out.push_str(line);
            out.push('\n');
        }
    }

    out
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryProjectSource;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemWritePort {
        files: Mutex<HashMap<String, Vec<u8>>>,
        dirs: Mutex<Vec<String>>,
    }

    impl WritePort for MemWritePort {
        fn write_file(&self, path: &Utf8Path, contents: &[u8]) -> anyhow::Result<()> {
            let key = path.as_str().replace('\\', "/");
            self.files
                .lock()
                .expect("lock files")
                .insert(key, contents.to_vec());
            Ok(())
        }

        fn create_dir_all(&self, path: &Utf8Path) -> anyhow::Result<()> {
            let key = path.as_str().replace('\\', "/");
            self.dirs.lock().expect("lock dirs").push(key);
            Ok(())
        }
    }

    const LEGACY: &str = concat!(
        "<Project>\n",
        "  <ItemGroup>\n",
        "    <Compile Include=\"Program.cs\" />\n",
        "    <Reference Include=\"System\" />\n",
        "  </ItemGroup>\n",
        "</Project>\n",
    );

    const CLEAN: &str = concat!(
        "<Project>\n",
        "  <ItemGroup>\n",
        "    <Reference Include=\"System\" />\n",
        "  </ItemGroup>\n",
        "</Project>\n",
    );

    fn tool() -> ToolInfo {
        ToolInfo {
            name: "projfix".into(),
            version: Some("0.0.0-test".into()),
            commit: None,
        }
    }

    fn settings(apply: bool) -> FixSettings {
        FixSettings {
            target: Utf8PathBuf::from("repo"),
            apply,
            ..FixSettings::default()
        }
    }

    fn source() -> InMemoryProjectSource {
        InMemoryProjectSource::new([
            (Utf8PathBuf::from("repo/App/App.csproj"), LEGACY.to_string()),
            (Utf8PathBuf::from("repo/Lib/Lib.csproj"), CLEAN.to_string()),
        ])
    }

    #[test]
    fn normalize_text_reports_changes() {
        let normalized = normalize_text(LEGACY, &NormalizeOptions::default()).expect("normalize");
        assert_eq!(normalized.text, CLEAN);
        assert_eq!(
            normalized.changes,
            vec!["Compile: removing Program.cs, covered by default globbing"]
        );
        assert!(normalized.changed_from(LEGACY));
    }

    #[test]
    fn regrouped_files_are_never_changed_without_entries() {
        let split = concat!(
            "<Project>\n",
            "  <ItemGroup />\n",
            "  <ItemGroup>\n",
            "    <Reference Include=\"System\" />\n",
            "    <Folder Include=\"docs\" />\n",
            "  </ItemGroup>\n",
            "  <ItemGroup>\n",
            "    <Reference Include=\"System.Xml\" />\n",
            "  </ItemGroup>\n",
            "</Project>\n",
        );
        let source =
            InMemoryProjectSource::new([(Utf8PathBuf::from("repo/Split.csproj"), split.into())]);
        let outcome =
            run_fix(&settings(false), &source, &MemWritePort::default(), tool()).expect("run");

        let file = &outcome.report.files[0];
        assert!(file.changed);
        assert_eq!(
            file.changes,
            vec![
                "ItemGroup: removing empty group",
                "Reference: merging 2 declarations from 2 groups",
                "ItemGroup: moving Reference into its own group",
            ]
        );
        assert_eq!(outcome.report.summary.changes, 3);
    }

    #[test]
    fn dry_run_writes_nothing() {
        let writer = MemWritePort::default();
        let outcome = run_fix(&settings(false), &source(), &writer, tool()).expect("run");

        assert!(writer.files.lock().expect("files").is_empty());
        assert_eq!(outcome.report.summary.files_scanned, 2);
        assert_eq!(outcome.report.summary.files_changed, 1);
        assert_eq!(outcome.report.summary.files_written, 0);
        assert_eq!(outcome.report.files[0].path, "App/App.csproj");
        assert!(outcome.report.run.ended_at.is_some());
    }

    #[test]
    fn apply_writes_only_changed_files() {
        let writer = MemWritePort::default();
        let outcome = run_fix(&settings(true), &source(), &writer, tool()).expect("run");

        let files = writer.files.lock().expect("files");
        assert_eq!(files.len(), 1);
        assert_eq!(files["repo/App/App.csproj"], CLEAN.as_bytes());
        assert_eq!(outcome.report.summary.files_written, 1);
        assert!(outcome.report.files[0].written);
        assert!(!outcome.report.files[1].written);
    }

    #[test]
    fn digests_track_before_and_after() {
        let writer = MemWritePort::default();
        let outcome = run_fix(&settings(false), &source(), &writer, tool()).expect("run");

        let app = &outcome.report.files[0];
        assert_eq!(app.sha256_before, sha256_hex(LEGACY.as_bytes()));
        assert_eq!(app.sha256_after, sha256_hex(CLEAN.as_bytes()));

        let lib = &outcome.report.files[1];
        assert_eq!(lib.sha256_before, lib.sha256_after);
    }

    #[test]
    fn patch_covers_changed_files_only() {
        let writer = MemWritePort::default();
        let outcome = run_fix(&settings(false), &source(), &writer, tool()).expect("run");

        assert!(
            outcome
                .patch
                .starts_with("diff --git a/App/App.csproj b/App/App.csproj\n--- a/App/App.csproj\n+++ b/App/App.csproj\n@@")
        );
        assert!(outcome.patch.contains("-    <Compile Include=\"Program.cs\" />\n"));
        assert!(!outcome.patch.contains("Lib.csproj"));
    }

    #[test]
    fn malformed_project_names_the_file() {
        let source = InMemoryProjectSource::new([(
            Utf8PathBuf::from("repo/Broken.csproj"),
            "<Project><ItemGroup></Project>".to_string(),
        )]);
        let writer = MemWritePort::default();
        let err = run_fix(&settings(true), &source, &writer, tool())
            .err()
            .expect("malformed input fails");
        assert!(matches!(err, ToolError::Project { .. }));
        assert!(err.to_string().starts_with("repo/Broken.csproj: "));
    }

    #[test]
    fn write_fix_artifacts_writes_expected_files() {
        let writer = MemWritePort::default();
        let outcome = run_fix(&settings(false), &source(), &writer, tool()).expect("run");

        let out_dir = Utf8PathBuf::from("out");
        write_fix_artifacts(&outcome, &out_dir, &writer).expect("write artifacts");

        let files = writer.files.lock().expect("files");
        assert!(files.contains_key("out/report.json"));
        assert!(files.contains_key("out/report.md"));
        assert!(files.contains_key("out/patch.diff"));
        assert_eq!(
            writer.dirs.lock().expect("dirs").as_slice(),
            ["out".to_string()]
        );

        let report: serde_json::Value =
            serde_json::from_slice(&files["out/report.json"]).expect("report json");
        assert_eq!(report["schema"], "projfix.report.v1");
        assert_eq!(report["summary"]["changes"], 1);
    }
}
