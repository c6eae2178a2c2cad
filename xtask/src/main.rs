use anyhow::Context;
use clap::{Parser, Subcommand};
use fs_err as fs;
use projfix_core::settings::{DEFAULT_PATTERN, FixSettings};
use std::path::Path;
use std::process::Command as ProcessCommand;

#[derive(Debug, Parser)]
#[command(name = "xtask", about = "Workspace helper tasks")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print schema identifiers used by projfix.
    PrintSchemas,
    /// Write a projfix.toml holding the default settings.
    InitConfig {
        #[arg(long, default_value = ".")]
        dir: String,
    },
    /// Bless golden fixtures (overwrite expected outputs).
    BlessFixtures,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::PrintSchemas => {
            println!("{}", projfix_types::schema::PROJFIX_REPORT_V1);
        }
        Command::InitConfig { dir } => {
            let path = Path::new(&dir).join("projfix.toml");
            if path.exists() {
                anyhow::bail!("{} already exists", path.display());
            }
            fs::create_dir_all(&dir).with_context(|| format!("create {dir}"))?;
            fs::write(&path, default_config())?;
            println!("wrote {}", path.display());
        }
        Command::BlessFixtures => {
            let status = ProcessCommand::new("cargo")
                .args(["test", "-p", "projfix-core", "--test", "golden_fixtures"])
                .env("PROJFIX_BLESS", "1")
                .status()
                .context("run golden fixture blessing")?;
            if !status.success() {
                anyhow::bail!("bless-fixtures failed");
            }
        }
    }
    Ok(())
}

fn default_config() -> String {
    let defaults = FixSettings::default();
    format!(
        "[fix]\nsort = {}\ndelete_duplicates = {}\nrecursive = {}\npattern = \"{}\"\n",
        defaults.sort, defaults.delete_duplicates, defaults.recursive, DEFAULT_PATTERN
    )
}
