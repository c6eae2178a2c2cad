use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one `projfix fix` run over a set of project files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjfixReport {
    pub schema: String,
    pub tool: ToolInfo,
    pub run: RunInfo,
    pub options: ReportOptions,

    #[serde(default)]
    pub files: Vec<FileReport>,

    #[serde(default)]
    pub summary: ReportSummary,
}

impl ProjfixReport {
    pub fn new(tool: ToolInfo, run: RunInfo, options: ReportOptions) -> Self {
        Self {
            schema: crate::schema::PROJFIX_REPORT_V1.to_string(),
            tool,
            run,
            options,
            files: vec![],
            summary: ReportSummary::default(),
        }
    }

    /// Append a file result and fold it into the summary.
    pub fn push(&mut self, file: FileReport) {
        self.summary.files_scanned += 1;
        if file.changed {
            self.summary.files_changed += 1;
        }
        if file.written {
            self.summary.files_written += 1;
        }
        self.summary.changes += file.changes.len() as u64;
        self.files.push(file);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunInfo {
    pub started_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

/// The switches a run was made with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportOptions {
    pub sort: bool,
    pub delete_duplicates: bool,
    /// False for dry runs.
    pub apply: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    /// Path relative to the run's target directory, `/`-separated.
    pub path: String,

    #[serde(default)]
    pub changes: Vec<String>,

    /// The normalized text differs from what is on disk.
    pub changed: bool,

    /// The normalized text was written back.
    #[serde(default)]
    pub written: bool,

    pub sha256_before: String,
    pub sha256_after: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub files_scanned: u64,
    pub files_changed: u64,
    pub files_written: u64,
    pub changes: u64,
}
