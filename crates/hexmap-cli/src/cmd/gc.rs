//! `hx gc`: restore or discard rows left parked by an interrupted swap.

use anyhow::Result;
use clap::Args;
use std::io::Write;

use super::Context;
use crate::output::render;

#[derive(Args, Debug)]
pub struct GcArgs {
    /// Only collect the tree in this space (defaults to every tree).
    #[arg(long)]
    pub space: Option<i64>,

    /// Group within `--space`.
    #[arg(long, default_value_t = 0)]
    pub group: i64,
}

pub fn run_gc(args: &GcArgs, ctx: &Context) -> Result<()> {
    let mut service = ctx.open_service()?;
    let report = match args.space {
        Some(space) => ctx.check(service.sweep(space, args.group))?,
        None => ctx.check(service.sweep_all())?,
    };

    render(ctx.output, &report, |r, w| {
        if r.is_clean() {
            writeln!(w, "no parked rows")
        } else {
            writeln!(
                w,
                "restored {} rows, discarded {} rows",
                r.restored.len(),
                r.discarded.len()
            )
        }
    })
}
