#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{CommandFactory, Parser, Subcommand};
use cmd::Context;
use hexmap_core::ErrorCode;
use hexmap_core::config;
use output::{CliError, OutputMode, render_error};
use std::env;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "hx: hexagonal map trees with atomic subtree moves",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging (debug level unless `HEXMAP_LOG` is set).
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Lifecycle",
        about = "Initialize a hexmap project",
        long_about = "Create .hexmap/ with a migrated store and a default config.",
        after_help = "EXAMPLES:\n    # Initialize in the current directory\n    hx init\n\n    # Emit machine-readable output\n    hx init --json"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        next_help_heading = "Lifecycle",
        about = "Create the root of a tree",
        after_help = "EXAMPLES:\n    # Root of space 1, group 0\n    hx create-root --space 1 --title \"Roadmap\""
    )]
    CreateRoot(cmd::create::CreateRootArgs),

    #[command(
        next_help_heading = "Lifecycle",
        about = "Create a child node",
        long_about = "Create a node one step from PARENT in DIRECTION (1-6 or nw, ne, e, se, sw, w).",
        after_help = "EXAMPLES:\n    # North-west child of the root\n    hx create 1,0 nw --title \"Research\"\n\n    # Emit machine-readable output\n    hx create 1,0:1 3 --title \"Notes\" --json"
    )]
    Create(cmd::create::CreateArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show one node",
        after_help = "EXAMPLES:\n    # Show a node with its child slots\n    hx show 1,0:1\n\n    # Emit machine-readable output\n    hx show 1,0:1 --json"
    )]
    Show(cmd::show::ShowArgs),

    #[command(
        next_help_heading = "Read",
        about = "Print a tree outline",
        after_help = "EXAMPLES:\n    # Whole tree of space 1\n    hx tree --space 1\n\n    # Two levels below an address\n    hx tree --under 1,0:2 --depth 3"
    )]
    Tree(cmd::tree::TreeArgs),

    #[command(
        next_help_heading = "Edit",
        about = "Move or swap a subtree",
        long_about = "Relocate the subtree at FROM to TO. If TO is occupied the two subtrees trade places. All rows change in one transaction.",
        after_help = "EXAMPLES:\n    # Move into an empty slot\n    hx move 1,0:1 1,0:5\n\n    # Swap two siblings\n    hx move 1,0:1 1,0:2 --json"
    )]
    Move(cmd::move_cmd::MoveArgs),

    #[command(
        next_help_heading = "Edit",
        about = "Copy a subtree",
        after_help = "EXAMPLES:\n    # Duplicate a branch next to itself\n    hx copy 1,0:1 1,0:4"
    )]
    Copy(cmd::copy::CopyArgs),

    #[command(
        next_help_heading = "Edit",
        about = "Remove a subtree",
        after_help = "EXAMPLES:\n    # Delete a node and everything below it\n    hx remove 1,0:1,3"
    )]
    Remove(cmd::remove::RemoveArgs),

    #[command(
        next_help_heading = "Edit",
        about = "Edit node content",
        after_help = "EXAMPLES:\n    # Rename a node\n    hx edit 1,0:1 --title \"Research (done)\""
    )]
    Edit(cmd::edit::EditArgs),

    #[command(
        next_help_heading = "Project Maintenance",
        about = "Collect parked rows",
        long_about = "Restore or discard rows left parked by an interrupted swap.",
        after_help = "EXAMPLES:\n    # Every tree\n    hx gc\n\n    # One tree\n    hx gc --space 1 --group 0"
    )]
    Gc(cmd::gc::GcArgs),

    #[command(
        next_help_heading = "Project Maintenance",
        about = "Generate shell completion scripts",
        after_help = "EXAMPLES:\n    # Generate bash completions\n    hx completions bash"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

/// Filter used when `HEXMAP_LOG` is unset.
const fn default_filter(verbose: bool, debug: bool) -> &'static str {
    if verbose || debug {
        "hexmap=debug,hx=debug,info"
    } else {
        "hexmap=info,warn"
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("HEXMAP_LOG").unwrap_or_else(|_| {
        EnvFilter::new(default_filter(verbose, env::var("DEBUG").is_ok()))
    });

    let format = env::var("HEXMAP_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if cli.verbose {
        debug!("verbose logging enabled");
    }

    let project_root = env::current_dir()?;
    let effective = match config::resolve_config(&project_root, cli.json) {
        Ok(effective) => effective,
        Err(err) => {
            let mode = if cli.json {
                OutputMode::Json
            } else {
                OutputMode::Text
            };
            render_error(
                mode,
                &CliError::from_code(ErrorCode::ConfigParseError, format!("{err:#}")),
            )?;
            return Err(err);
        }
    };
    let ctx = Context::new(project_root, effective);

    match &cli.command {
        Commands::Init(args) => cmd::init::run_init(args, &ctx),
        Commands::CreateRoot(args) => cmd::create::run_create_root(args, &ctx),
        Commands::Create(args) => cmd::create::run_create(args, &ctx),
        Commands::Show(args) => cmd::show::run_show(args, &ctx),
        Commands::Tree(args) => cmd::tree::run_tree(args, &ctx),
        Commands::Move(args) => cmd::move_cmd::run_move(args, &ctx),
        Commands::Copy(args) => cmd::copy::run_copy(args, &ctx),
        Commands::Remove(args) => cmd::remove::run_remove(args, &ctx),
        Commands::Edit(args) => cmd::edit::run_edit(args, &ctx),
        Commands::Gc(args) => cmd::gc::run_gc(args, &ctx),
        Commands::Completions(args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command)
        }
    }
}
