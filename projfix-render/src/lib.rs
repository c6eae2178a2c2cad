//! Rendering helpers (console text and markdown) for run reports.

use projfix_types::report::{FileReport, ProjfixReport};

/// Console listing: one block per file that changed, then a one-line summary.
pub fn render_report_text(report: &ProjfixReport) -> String {
    let mut out = String::new();
    for file in report.files.iter().filter(|f| f.changed) {
        out.push_str(&format!("{} ({})\n", file.path, file_state(file, report)));
        for change in &file.changes {
            out.push_str(&format!("  {}\n", change));
        }
    }

    let s = &report.summary;
    out.push_str(&format!(
        "{} file(s) scanned, {} changed, {} written, {} change(s)\n",
        s.files_scanned, s.files_changed, s.files_written, s.changes
    ));
    if !report.options.apply && s.files_changed > 0 {
        out.push_str("dry run: re-run with --apply to write changes\n");
    }
    out
}

pub fn render_report_md(report: &ProjfixReport) -> String {
    let mut out = String::new();
    out.push_str("# projfix report\n\n");
    out.push_str(&format!(
        "- Files scanned: {}\n- Files changed: {}\n- Files written: {}\n- Changes: {}\n",
        report.summary.files_scanned,
        report.summary.files_changed,
        report.summary.files_written,
        report.summary.changes
    ));
    out.push_str(&format!(
        "- Options: sort `{}`, delete duplicates `{}`, apply `{}`\n\n",
        report.options.sort, report.options.delete_duplicates, report.options.apply
    ));

    out.push_str("## Files\n\n");
    if report.files.is_empty() {
        out.push_str("_No project files found._\n");
        return out;
    }

    for (i, file) in report.files.iter().enumerate() {
        out.push_str(&format!("### {}. `{}`\n\n", i + 1, file.path));
        out.push_str(&format!("- State: `{}`\n", file_state(file, report)));
        out.push_str(&format!(
            "- sha256: {} → {}\n",
            short(&file.sha256_before),
            short(&file.sha256_after)
        ));
        if !file.changes.is_empty() {
            out.push_str("\n**Changes**\n\n");
            for change in &file.changes {
                out.push_str(&format!("- {}\n", change));
            }
        }
        out.push('\n');
    }

    out
}

fn file_state(file: &FileReport, report: &ProjfixReport) -> &'static str {
    match (file.changed, file.written) {
        (false, _) => "unchanged",
        (true, true) => "written",
        (true, false) if report.options.apply => "not written",
        (true, false) => "would change",
    }
}

fn short(digest: &str) -> &str {
    digest.get(..12).unwrap_or(digest)
}
