//! `hx remove`: delete a node and everything below it.

use anyhow::Result;
use clap::Args;
use hexmap_core::NodeId;
use serde::Serialize;
use std::io::Write;

use super::Context;
use crate::output::render;

#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Address of the subtree top. Removing a root deletes the whole tree.
    pub coord: String,
}

#[derive(Debug, Serialize)]
struct RemoveReport {
    coord: String,
    removed: Vec<NodeId>,
}

pub fn run_remove(args: &RemoveArgs, ctx: &Context) -> Result<()> {
    let coord = ctx.coord(&args.coord)?;
    let mut service = ctx.open_service()?;
    let removed = ctx.check(service.remove(&coord))?;

    let report = RemoveReport {
        coord: coord.to_string(),
        removed,
    };
    render(ctx.output, &report, |r, w| {
        writeln!(w, "removed {} ({} nodes)", r.coord, r.removed.len())
    })
}
