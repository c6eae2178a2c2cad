mod config;

use anyhow::Context;
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use config::{ConfigMerger, MergedConfig};
use projfix_core::adapters::{FsProjectSource, FsWritePort};
use projfix_core::pipeline::{run_fix, write_fix_artifacts};
use projfix_core::ports::ProjectSource;
use projfix_core::settings::FixSettings;
use projfix_render::render_report_text;
use projfix_types::report::ToolInfo;
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "projfix",
    version,
    about = "Normalize legacy MSBuild project files toward SDK-style conventions."
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Normalize project files (default: dry-run).
    Fix(FixArgs),
    /// List the project files a run would visit.
    List(ListArgs),
}

#[derive(Debug, Parser)]
struct DiscoveryArgs {
    /// Directory searched for project files (default: current directory).
    #[arg(long, default_value = ".")]
    target: Utf8PathBuf,

    /// File-name glob for project files (default: *.csproj, or the projfix.toml value).
    #[arg(long)]
    pattern: Option<String>,

    /// Search subdirectories too.
    #[arg(long, default_value_t = false)]
    recursive: bool,
}

#[derive(Debug, Parser)]
struct FixArgs {
    #[command(flatten)]
    discovery: DiscoveryArgs,

    /// Sort item declarations by Include and unconditioned properties by name.
    #[arg(long, default_value_t = false)]
    sort: bool,

    /// Keep repeated declarations of the same file.
    #[arg(long, default_value_t = false)]
    no_dedupe: bool,

    /// Write normalized files to disk. If omitted, only reports what would change.
    #[arg(long, default_value_t = false)]
    apply: bool,

    /// Directory for report.json, report.md and patch.diff.
    #[arg(long)]
    out_dir: Option<Utf8PathBuf>,

    /// Print the unified diff of every changed file.
    #[arg(long, default_value_t = false)]
    diff: bool,
}

#[derive(Debug, Parser)]
struct ListArgs {
    #[command(flatten)]
    discovery: DiscoveryArgs,

    /// Output format (text, json).
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    if let Err(e) = real_main() {
        error!("{:?}", e);
        return ExitCode::from(1);
    }
    ExitCode::from(0)
}

fn real_main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Fix(args) => cmd_fix(args),
        Command::List(args) => cmd_list(args),
    }
}

fn cmd_fix(args: FixArgs) -> anyhow::Result<()> {
    let target = args.discovery.target;

    // Load config file and merge with CLI arguments
    let file_config = config::load_or_default(&target).context("load projfix.toml config")?;
    let merged = ConfigMerger::new(file_config).merge_fix_args(
        args.discovery.pattern.as_deref(),
        args.discovery.recursive,
        args.sort,
        args.no_dedupe,
    );
    debug!("merged config: {:?}", merged);

    let settings = settings_from(target, merged, args.apply);
    let source = FsProjectSource::from_settings(&settings);
    let outcome = run_fix(&settings, &source, &FsWritePort, tool_info())?;

    print!("{}", render_report_text(&outcome.report));
    if args.diff {
        print!("{}", outcome.patch);
    }

    if let Some(out_dir) = args.out_dir {
        write_fix_artifacts(&outcome, &out_dir, &FsWritePort)
            .with_context(|| format!("write artifacts to {}", out_dir))?;
        info!("wrote report to {}", out_dir);
    }
    Ok(())
}

fn cmd_list(args: ListArgs) -> anyhow::Result<()> {
    let target = args.discovery.target;
    let file_config = config::load_or_default(&target).context("load projfix.toml config")?;
    let merged = ConfigMerger::new(file_config)
        .merge_discovery_args(args.discovery.pattern.as_deref(), args.discovery.recursive);

    let settings = settings_from(target, merged, false);
    let files = FsProjectSource::from_settings(&settings).project_files()?;

    match args.format {
        OutputFormat::Text => {
            for file in &files {
                println!("{}", file);
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&files)?);
        }
    }
    Ok(())
}

fn settings_from(target: Utf8PathBuf, merged: MergedConfig, apply: bool) -> FixSettings {
    FixSettings {
        target,
        pattern: merged.pattern,
        recursive: merged.recursive,
        sort: merged.sort,
        delete_duplicates: merged.delete_duplicates,
        apply,
    }
}

fn tool_info() -> ToolInfo {
    ToolInfo {
        name: "projfix".to_string(),
        version: Some(env!("CARGO_PKG_VERSION").to_string()),
        commit: None,
    }
}
