//! `mend` — repair broken source fragments from the command line.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mend_repair::{FragmentMeta, RepairEngine};
use mend_store::FragmentStore;
use mend_syntax::Language;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "mend", version, about = "Structural repair for broken source fragments")]
struct Cli {
    /// Fragment store location
    #[arg(long, global = true, default_value = ".mend/fragments.json")]
    store: PathBuf,

    /// Override language detection (javascript, jsx, typescript, tsx, ...)
    #[arg(long, global = true)]
    language: Option<Language>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record a known-good fragment into the store
    Analyze {
        file: PathBuf,

        /// Provenance function name
        #[arg(long)]
        function: Option<String>,
    },
    /// Attempt to repair a broken fragment
    Repair {
        file: PathBuf,

        /// Overwrite the input file with the repaired code
        #[arg(long)]
        write: bool,

        /// Print the structured outcome as JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Show the recorded history for a file
    History { file: PathBuf },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let store = Arc::new(load_store(&cli.store)?);
    let engine = RepairEngine::new(Arc::clone(&store));

    match cli.command {
        Command::Analyze { file, function } => {
            let code = read_input(&file)?;
            let meta = FragmentMeta {
                filename: file.to_string_lossy().into_owned(),
                function_name: function,
                parent_id: None,
                language: cli.language,
            };
            let fragment = engine.analyze_code(&code, &meta)?;
            println!(
                "recorded {} ({} bytes, fingerprint {:?})",
                fragment.id,
                fragment.code.len(),
                fragment.fingerprint
            );
            store.save(&cli.store)?;
        }
        Command::Repair { file, write, json } => {
            let code = read_input(&file)?;
            let meta = FragmentMeta {
                filename: file.to_string_lossy().into_owned(),
                language: cli.language,
                ..FragmentMeta::default()
            };
            let outcome = engine.repair_code(&code, &meta)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else if outcome.fixed {
                println!("repaired {}", file.display());
                if let Some(diff) = outcome.diff.as_deref().filter(|d| !d.is_empty()) {
                    println!("{diff}");
                }
            } else {
                println!("no repair applied to {}", file.display());
            }

            if write && outcome.fixed {
                if let Some(repaired) = &outcome.repaired_code {
                    fs::write(&file, repaired)
                        .with_context(|| format!("failed to write {}", file.display()))?;
                }
            }
            store.save(&cli.store)?;
        }
        Command::History { file } => {
            let filename = file.to_string_lossy();
            let fragments = engine.fragments_for_file(&filename);
            if fragments.is_empty() {
                println!("no fragments recorded for {filename}");
            }
            for fragment in fragments {
                println!(
                    "{}  {}  {}  {}  {}",
                    fragment.id,
                    fragment.created_at,
                    fragment.validator_status.as_str(),
                    &fragment.content_hash[..12],
                    fragment
                        .parent_id
                        .map(|p| format!("parent {p}"))
                        .unwrap_or_else(|| "root".to_string()),
                );
            }
        }
    }

    Ok(())
}

fn load_store(path: &Path) -> Result<FragmentStore> {
    if path.exists() {
        FragmentStore::load(path)
            .with_context(|| format!("failed to load fragment store {}", path.display()))
    } else {
        Ok(FragmentStore::new())
    }
}

fn read_input(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}
