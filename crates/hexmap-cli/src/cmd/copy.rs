//! `hx copy`: deep-copy a subtree onto a vacant address.

use anyhow::Result;
use clap::Args;
use std::io::Write;

use super::Context;
use crate::output::{pretty_kv, render_mode};

#[derive(Args, Debug)]
pub struct CopyArgs {
    /// Address of the subtree to copy.
    pub from: String,

    /// Vacant address the copy's top lands on.
    pub to: String,
}

pub fn run_copy(args: &CopyArgs, ctx: &Context) -> Result<()> {
    let from = ctx.coord(&args.from)?;
    let to = ctx.coord(&args.to)?;
    let mut service = ctx.open_service()?;
    let copies = ctx.check(service.copy(&from, &to))?;

    render_mode(
        ctx.output,
        copies.as_slice(),
        |nodes, w| {
            for node in nodes {
                writeln!(w, "{}", node.coord())?;
            }
            Ok(())
        },
        |nodes, w| {
            writeln!(w, "Copied {from} to {to}")?;
            pretty_kv(w, "nodes", nodes.len().to_string())
        },
    )
}
