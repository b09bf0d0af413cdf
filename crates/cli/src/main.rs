#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use toc_core::strategy::DeleteStrategy;
use toc_core::{RawSectionItem, normalize_items};
use toc_storage::{
    CreateSectionRequest, DeleteSectionRequest, MoveSectionRequest, RenameSectionRequest,
    SectionNode, SqliteStore,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "toc", version, about = "Ordered section outline store")]
struct Cli {
    /// Directory holding the section database.
    #[arg(long, env = "TOC_STORAGE_DIR", default_value = ".toc", global = true)]
    storage_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replace the whole tree from a JSON template file.
    Import {
        /// Path to a JSON array of section descriptors.
        #[arg(env = "TOC_JSON_PATH", default_value = "study_template.json")]
        file: PathBuf,
    },
    /// Print the ordered forest.
    Tree {
        /// Emit JSON instead of a rendered tree.
        #[arg(long)]
        json: bool,
    },
    /// Create a section at the end of its sibling group.
    Create {
        name: String,
        #[arg(long)]
        parent: Option<i64>,
    },
    /// Rename a section.
    Rename { id: i64, name: String },
    /// Move a section to a new parent and/or position.
    Move {
        id: i64,
        order: i64,
        #[arg(long)]
        parent: Option<i64>,
    },
    /// Delete a section, lifting or cascading its children.
    Delete {
        id: i64,
        #[arg(long, default_value = "lift_children")]
        strategy: String,
    },
    /// Show node, root, and leaf counts.
    Counts,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = SqliteStore::open(&cli.storage_dir)?;

    match cli.command {
        Command::Import { file } => {
            let payload = std::fs::read_to_string(&file)
                .map_err(|err| format!("template file {}: {err}", file.display()))?;
            let raw_items: Vec<RawSectionItem> = serde_json::from_str(&payload).map_err(|err| {
                format!("invalid JSON in template file {}: {err}", file.display())
            })?;
            let items = normalize_items(&raw_items)?;
            let summary = store.import_items(&items)?;
            println!(
                "{}",
                serde_json::json!({
                    "ok": true,
                    "inserted": summary.inserted,
                    "roots": summary.roots,
                    "leaves": summary.leaves,
                    "source": file.display().to_string(),
                })
            );
        }
        Command::Tree { json } => {
            let forest = store.tree()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&forest)?);
            } else {
                for root in &forest {
                    print!("{}", render(root));
                }
            }
        }
        Command::Create { name, parent } => {
            let id = store.create_section(CreateSectionRequest {
                name,
                parent_id: parent,
            })?;
            println!("{id}");
        }
        Command::Rename { id, name } => {
            store.rename_section(RenameSectionRequest { id, name })?;
            println!("{id}");
        }
        Command::Move { id, order, parent } => {
            store.move_section(MoveSectionRequest {
                id,
                new_parent_id: parent,
                new_order: order,
            })?;
        }
        Command::Delete { id, strategy } => {
            let strategy: DeleteStrategy = strategy.parse()?;
            store.delete_section(DeleteSectionRequest { id, strategy })?;
        }
        Command::Counts => {
            let counts = store.counts()?;
            println!(
                "{}",
                serde_json::json!({
                    "total": counts.total,
                    "roots": counts.roots,
                    "leaves": counts.leaves,
                })
            );
        }
    }

    Ok(())
}

fn render(node: &SectionNode) -> termtree::Tree<String> {
    let label = format!("[{}] {} (#{})", node.section_key, node.name, node.id);
    let mut tree = termtree::Tree::new(label);
    for child in &node.children {
        tree.leaves.push(render(child));
    }
    tree
}
