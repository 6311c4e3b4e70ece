pub mod completions;
pub mod copy;
pub mod create;
pub mod edit;
pub mod gc;
pub mod init;
pub mod move_cmd;
pub mod remove;
pub mod show;
pub mod tree;

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use hexmap_core::config::{self, EffectiveConfig};
use hexmap_core::db;
use hexmap_core::{
    Coord, ErrorCode, MapService, Node, SqliteTransactionManager, TreeError, parse_id,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::output::{CliError, OutputMode, render_error};

pub type Service = MapService<SqliteTransactionManager>;

/// Everything a handler needs besides its own arguments.
#[derive(Debug)]
pub struct Context {
    pub project_root: PathBuf,
    pub output: OutputMode,
    pub config: EffectiveConfig,
}

impl Context {
    pub fn new(project_root: PathBuf, config: EffectiveConfig) -> Self {
        let output = OutputMode::from_resolved(&config.resolved_output);
        Self {
            project_root,
            output,
            config,
        }
    }

    pub fn store_path(&self) -> PathBuf {
        config::store_path(&self.project_root)
    }

    /// Open the initialized store with the project's relocation policy.
    ///
    /// When `sweep_on_open` is configured, parked rows left by an interrupted
    /// writer are collected before the command runs.
    pub fn open_service(&self) -> anyhow::Result<Service> {
        let project = &self.config.project;
        let path = self.store_path();
        let Some(conn) = db::try_open_store(&path, project.store.busy_timeout())? else {
            let code = ErrorCode::NotInitialized;
            let message = format!("no map store at {}", path.display());
            render_error(self.output, &CliError::from_code(code, &message))?;
            anyhow::bail!("{}: {message}", code.message());
        };
        debug!(store = %path.display(), "opened map store");

        let mut service = MapService::new(SqliteTransactionManager::new(conn))
            .with_policy(project.relocation.policy());
        if project.relocation.sweep_on_open {
            let report = service.sweep_all().context("sweep parked rows on open")?;
            if !report.is_clean() {
                info!(
                    restored = report.restored.len(),
                    discarded = report.discarded.len(),
                    "swept parked rows on open"
                );
            }
        }
        Ok(service)
    }

    /// Parse a coordinate argument, rendering a coded error when it is bad.
    pub fn coord(&self, raw: &str) -> anyhow::Result<Coord> {
        parse_id(raw).or_else(|err| self.fail(err.into()))
    }

    /// Render `err` in the active mode and hand it back for the exit status.
    pub fn fail<T>(&self, err: TreeError) -> anyhow::Result<T> {
        render_error(self.output, &CliError::from(&err))?;
        Err(err.into())
    }

    /// Unwrap a service result, rendering the error on failure.
    pub fn check<T>(&self, result: hexmap_core::Result<T>) -> anyhow::Result<T> {
        result.or_else(|err| self.fail(err))
    }
}

/// A node together with its content title, as listed by `tree` and friends.
#[derive(Debug, Serialize)]
pub struct NodeLine {
    #[serde(flatten)]
    pub node: Node,
    pub title: String,
}

impl NodeLine {
    /// Attach titles to `nodes`, preserving order.
    pub fn load(service: &Service, nodes: Vec<Node>) -> hexmap_core::Result<Vec<Self>> {
        nodes
            .into_iter()
            .map(|node| {
                let title = service
                    .content(node.content_id())?
                    .map(|content| content.title)
                    .unwrap_or_default();
                Ok(Self { node, title })
            })
            .collect()
    }

    /// `coord  title`, indented two spaces per level below `base_depth`.
    pub fn outline(&self, base_depth: usize) -> String {
        let indent = "  ".repeat(self.node.coord().depth().saturating_sub(base_depth));
        format!("{indent}{}  {}", self.node.coord(), self.title)
    }
}

/// Whether `.hexmap/` exists under `root`.
pub fn is_initialized(root: &Path) -> bool {
    root.join(config::PROJECT_DIR).is_dir()
}
