pub mod edit;
pub mod tree;

pub use edit::{delete, edit_attr, rename, DeleteArgs, EditAttrArgs, RenameArgs};
pub use tree::{tree, TreeArgs};

use anyhow::{anyhow, Result};
use colored::Colorize;
use markup_common::{MemoryDocument, NodeHandle, RemoteWalker};
use markup_view::{MarkupView, Row};

/// Node whose `id` attribute is `id`
pub fn find_node(doc: &MemoryDocument, id: &str) -> Result<NodeHandle> {
    doc.find_by_id(id)
        .ok_or_else(|| anyhow!("No node with id {:?}", id))
}

/// One row of the tree, without colors
pub fn format_row(row: &Row) -> String {
    let indent = "  ".repeat(row.depth());
    match row {
        Row::Node {
            text,
            expandable,
            expanded,
            hidden,
            ..
        } => {
            let twisty = match (expandable, expanded) {
                (false, _) => " ",
                (true, true) => "▾",
                (true, false) => "▸",
            };
            let suffix = if *hidden { " (hidden)" } else { "" };
            format!("{indent}{twisty} {text}{suffix}")
        }
        Row::ShowMore { more, .. } => {
            format!("{indent}… {} of {} children shown", more.shown, more.total)
        }
    }
}

pub fn print_tree<W: RemoteWalker>(view: &MarkupView<W>) {
    for row in view.rows() {
        let line = format_row(&row);
        match row {
            Row::Node { selected: true, .. } => println!("{}", line.black().on_cyan()),
            Row::Node { hidden: true, .. } | Row::ShowMore { .. } => {
                println!("{}", line.dimmed())
            }
            Row::Node { .. } => println!("{line}"),
        }
    }
}
