use anyhow::{Context as _, Result};
use clap::Args;
use hexmap_core::config::PROJECT_DIR;
use hexmap_core::db::{self, migrations};
use serde::Serialize;
use std::io::Write;

use super::{Context, is_initialized};
use crate::output::{pretty_kv, render_mode};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Re-run initialization even if `.hexmap/` already exists.
    #[arg(long)]
    pub force: bool,
}

const CONFIG_TOML: &str = "[store]\n\
    busy_timeout_ms = 5000\n\
    \n\
    [relocation]\n\
    max_parking_slots = 32\n\
    sweep_on_open = false\n";

const GITIGNORE: &str = "hexmap.db\nhexmap.db-wal\nhexmap.db-shm\n";

#[derive(Debug, Serialize)]
struct InitReport {
    store: String,
    schema_version: u32,
    created_config: bool,
}

/// Execute `hx init`. Creates the project skeleton:
///
/// ```text
/// .hexmap/
///   hexmap.db     (migrated map store)
///   config.toml   (default project config, kept if present)
///   .gitignore
/// ```
///
/// # Errors
///
/// Returns an error if `.hexmap/` already exists and `--force` is not set,
/// or if any filesystem or store operation fails.
pub fn run_init(args: &InitArgs, ctx: &Context) -> Result<()> {
    let dir = ctx.project_root.join(PROJECT_DIR);
    if is_initialized(&ctx.project_root) && !args.force {
        anyhow::bail!("{PROJECT_DIR}/ already exists. Use `hx init --force` to reinitialize.");
    }

    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let config_path = dir.join("config.toml");
    let created_config = !config_path.exists();
    if created_config {
        std::fs::write(&config_path, CONFIG_TOML)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
    }
    let gitignore = dir.join(".gitignore");
    std::fs::write(&gitignore, GITIGNORE)
        .with_context(|| format!("Failed to write {}", gitignore.display()))?;

    let store = ctx.store_path();
    let conn = db::open_store(&store, ctx.config.project.store.busy_timeout())?;
    let schema_version =
        migrations::current_schema_version(&conn).context("read store schema version")?;

    let report = InitReport {
        store: store.display().to_string(),
        schema_version,
        created_config,
    };
    render_mode(
        ctx.output,
        &report,
        |r, w| writeln!(w, "initialized {} (schema v{})", r.store, r.schema_version),
        |r, w| {
            writeln!(w, "Initialized hexmap project")?;
            pretty_kv(w, "store", &r.store)?;
            pretty_kv(w, "schema", format!("v{}", r.schema_version))?;
            if r.created_config {
                pretty_kv(w, "config", format!("{PROJECT_DIR}/config.toml"))?;
            }
            Ok(())
        },
    )
}
