//! `hx create-root` and `hx create`: add a tree or a node to one.

use anyhow::Result;
use clap::Args;
use hexmap_core::{Direction, NewContent, Node};
use std::io::Write;

use super::{Context, NodeLine};
use crate::output::{pretty_kv, render_mode};

/// Payload fields shared by both create commands.
#[derive(Args, Debug)]
pub struct ContentArgs {
    /// Node title (must not be blank).
    #[arg(long)]
    pub title: String,

    #[arg(long, default_value = "")]
    pub description: String,

    #[arg(long, default_value = "")]
    pub link: String,
}

#[derive(Args, Debug)]
pub struct CreateRootArgs {
    /// Space the new tree belongs to.
    #[arg(long)]
    pub space: i64,

    /// Group within the space.
    #[arg(long, default_value_t = 0)]
    pub group: i64,

    #[command(flatten)]
    pub content: ContentArgs,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Address of the parent node, e.g. `1,0:2`.
    pub parent: String,

    /// Direction of the new child: 1-6 or nw, ne, e, se, sw, w.
    pub direction: Direction,

    #[command(flatten)]
    pub content: ContentArgs,
}

impl ContentArgs {
    fn to_new_content(&self, ctx: &Context) -> Result<NewContent> {
        let content = NewContent::new(&self.title, &self.description, &self.link);
        ctx.check(content.map_err(Into::into))
    }
}

pub fn run_create_root(args: &CreateRootArgs, ctx: &Context) -> Result<()> {
    let content = args.content.to_new_content(ctx)?;
    let mut service = ctx.open_service()?;
    let root = ctx.check(service.create_root(args.space, args.group, &content))?;
    print_created(ctx, root, &args.content.title)
}

pub fn run_create(args: &CreateArgs, ctx: &Context) -> Result<()> {
    let parent = ctx.coord(&args.parent)?;
    let content = args.content.to_new_content(ctx)?;
    let mut service = ctx.open_service()?;
    let child = ctx.check(service.create_child(&parent, args.direction, &content))?;
    print_created(ctx, child, &args.content.title)
}

fn print_created(ctx: &Context, node: Node, title: &str) -> Result<()> {
    let line = NodeLine {
        node,
        title: title.to_string(),
    };
    render_mode(
        ctx.output,
        &line,
        |l, w| writeln!(w, "{}", l.outline(l.node.coord().depth())),
        |l, w| {
            writeln!(w, "Created {}", l.node.kind())?;
            pretty_kv(w, "coord", l.node.coord().to_string())?;
            pretty_kv(w, "id", l.node.id().to_string())?;
            pretty_kv(w, "title", &l.title)
        },
    )
}
