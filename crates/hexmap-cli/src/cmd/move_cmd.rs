//! `hx move`: relocate a subtree, swapping with whatever sits at the target.

use anyhow::Result;
use clap::Args;
use hexmap_core::tree::RelocationOutcome;
use std::io::Write;

use super::Context;
use crate::output::{pretty_kv, render_mode};

#[derive(Args, Debug)]
pub struct MoveArgs {
    /// Current address of the subtree top.
    pub from: String,

    /// Destination address. An occupied destination is swapped with `from`.
    pub to: String,
}

pub fn run_move(args: &MoveArgs, ctx: &Context) -> Result<()> {
    let mut service = ctx.open_service()?;
    let outcome = ctx.check(service.move_item(&args.from, &args.to))?;

    render_mode(
        ctx.output,
        &outcome,
        |o, w| {
            writeln!(w, "moved {} -> {}", args.from, args.to)?;
            if o.swapped() {
                writeln!(w, "swapped {} -> {}", args.to, args.from)?;
            }
            writeln!(w, "rows: {}", o.changed.len())
        },
        |o, w| render_pretty(args, o, w),
    )
}

fn render_pretty(
    args: &MoveArgs,
    outcome: &RelocationOutcome,
    w: &mut dyn Write,
) -> std::io::Result<()> {
    if outcome.swapped() {
        writeln!(w, "Swapped {} with {}", args.from, args.to)?;
    } else {
        writeln!(w, "Moved {} to {}", args.from, args.to)?;
    }
    pretty_kv(w, "node", format!("#{}", outcome.moved_id))?;
    if let Some(displaced) = outcome.displaced_id {
        pretty_kv(w, "displaced", format!("#{displaced}"))?;
    }
    pretty_kv(w, "rewritten", format!("{} rows", outcome.changed.len()))
}
