//! `hx show`: one node, its content, its ancestry and its six child slots.

use anyhow::Result;
use clap::Args;
use hexmap_core::{Content, Direction, Node, NodeId};
use serde::Serialize;
use std::io::Write;

use super::Context;
use crate::output::{pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Address of the node, e.g. `1,0:2,1`.
    pub coord: String,
}

#[derive(Debug, Serialize)]
struct ChildSlot {
    direction: Direction,
    label: &'static str,
    node_id: Option<NodeId>,
}

#[derive(Debug, Serialize)]
struct ShowView {
    node: Node,
    content: Content,
    ancestors: Vec<String>,
    children: Vec<ChildSlot>,
    adjacent: Option<String>,
}

pub fn run_show(args: &ShowArgs, ctx: &Context) -> Result<()> {
    let coord = ctx.coord(&args.coord)?;
    let service = ctx.open_service()?;

    let (node, content) = ctx.check(service.get_with_content(&coord))?;
    let ancestors = ctx
        .check(service.ancestors(&coord))?
        .iter()
        .map(|ancestor| ancestor.coord().to_string())
        .collect();
    let children = ctx
        .check(service.child_slots(&coord))?
        .into_iter()
        .map(|(direction, child)| ChildSlot {
            direction,
            label: direction.label(),
            node_id: child.map(|child| child.id()),
        })
        .collect();
    let adjacent = ctx
        .check(service.adjacent(&coord))?
        .map(|node| node.coord().to_string());

    let view = ShowView {
        node,
        content,
        ancestors,
        children,
        adjacent,
    };
    render_mode(ctx.output, &view, render_text, render_pretty)
}

fn render_text(view: &ShowView, w: &mut dyn Write) -> std::io::Result<()> {
    writeln!(w, "{}  {}", view.node.coord(), view.content.title)?;
    let occupied: Vec<&str> = view
        .children
        .iter()
        .filter(|slot| slot.node_id.is_some())
        .map(|slot| slot.label)
        .collect();
    writeln!(w, "children: {}", occupied.join(","))
}

fn render_pretty(view: &ShowView, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(w, &view.content.title)?;
    pretty_kv(w, "coord", view.node.coord().to_string())?;
    pretty_kv(w, "id", view.node.id().to_string())?;
    pretty_kv(w, "kind", view.node.kind().as_str())?;
    if !view.content.description.is_empty() {
        pretty_kv(w, "description", &view.content.description)?;
    }
    if !view.content.link.is_empty() {
        pretty_kv(w, "link", &view.content.link)?;
    }
    if let Some(origin) = view.node.origin_id() {
        pretty_kv(w, "copied from", origin.to_string())?;
    }
    if !view.ancestors.is_empty() {
        pretty_kv(w, "ancestors", view.ancestors.join(" > "))?;
    }
    if let Some(adjacent) = &view.adjacent {
        pretty_kv(w, "adjacent", adjacent)?;
    }
    writeln!(w)?;
    for slot in &view.children {
        let state = slot
            .node_id
            .map_or_else(|| "-".to_string(), |id| format!("#{id}"));
        writeln!(w, "  {:<3} {state}", slot.label)?;
    }
    Ok(())
}
