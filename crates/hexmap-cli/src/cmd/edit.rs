//! `hx edit`: change the content shown at an address.

use anyhow::Result;
use clap::Args;
use hexmap_core::ContentPatch;
use std::io::Write;

use super::Context;
use crate::output::{pretty_kv, render_mode};

#[derive(Args, Debug)]
pub struct EditArgs {
    /// Address of the node to edit.
    pub coord: String,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub link: Option<String>,
}

impl EditArgs {
    fn patch(&self) -> ContentPatch {
        ContentPatch {
            title: self.title.clone(),
            description: self.description.clone(),
            link: self.link.clone(),
        }
    }
}

pub fn run_edit(args: &EditArgs, ctx: &Context) -> Result<()> {
    let coord = ctx.coord(&args.coord)?;
    let mut service = ctx.open_service()?;
    let content = ctx.check(service.update_content(&coord, &args.patch()))?;

    render_mode(
        ctx.output,
        &content,
        |c, w| writeln!(w, "{coord}  {}", c.title),
        |c, w| {
            writeln!(w, "Updated {coord}")?;
            pretty_kv(w, "title", &c.title)?;
            pretty_kv(w, "description", &c.description)?;
            pretty_kv(w, "link", &c.link)
        },
    )
}
