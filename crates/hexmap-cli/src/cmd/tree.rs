//! `hx tree`: outline of one tree, or of the subtree under an address.

use anyhow::Result;
use clap::Args;
use std::io::Write;

use super::{Context, NodeLine};
use crate::output::{pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct TreeArgs {
    /// Space of the tree to list.
    #[arg(long, required_unless_present = "under")]
    pub space: Option<i64>,

    #[arg(long, default_value_t = 0)]
    pub group: i64,

    /// List only the subtree below this address instead of a whole tree.
    #[arg(long, conflicts_with = "space")]
    pub under: Option<String>,

    /// Deepest level to include, counted from the root.
    #[arg(long)]
    pub depth: Option<usize>,
}

pub fn run_tree(args: &TreeArgs, ctx: &Context) -> Result<()> {
    let service = ctx.open_service()?;

    let (heading, base_depth, nodes) = if let Some(raw) = &args.under {
        let top = ctx.coord(raw)?;
        let mut nodes = vec![ctx.check(service.get_with_content(&top))?.0];
        nodes.extend(ctx.check(service.descendants(&top))?);
        if let Some(max) = args.depth {
            nodes.retain(|node| node.coord().depth() <= max);
        }
        (top.to_string(), top.depth(), nodes)
    } else {
        let space = args.space.unwrap_or_default();
        let nodes = ctx.check(service.tree(space, args.group, args.depth))?;
        (format!("{space},{}", args.group), 0, nodes)
    };

    let lines = ctx.check(NodeLine::load(&service, nodes))?;
    render_mode(
        ctx.output,
        lines.as_slice(),
        |lines, w| {
            for line in lines {
                writeln!(w, "{}", line.outline(base_depth))?;
            }
            Ok(())
        },
        |lines, w| {
            pretty_section(w, &format!("Tree {heading} ({} nodes)", lines.len()))?;
            for line in lines {
                writeln!(w, "{}", line.outline(base_depth))?;
            }
            Ok(())
        },
    )
}
