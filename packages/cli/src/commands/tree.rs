use super::{find_node, print_tree};
use anyhow::Result;
use clap::Args;
use markup_common::MemoryDocument;
use markup_view::MarkupView;

#[derive(Debug, Args)]
pub struct TreeArgs {
    /// Expand every node
    #[arg(long)]
    pub expand_all: bool,

    /// Select (and reveal) the node with this id attribute
    #[arg(long)]
    pub select: Option<String>,
}

pub async fn tree(
    view: &mut MarkupView<MemoryDocument>,
    doc: &MemoryDocument,
    args: TreeArgs,
) -> Result<()> {
    if args.expand_all {
        view.expand_all(None).await?;
    }
    if let Some(id) = &args.select {
        let node = find_node(doc, id)?;
        view.select(node, false).await?;
    }

    print_tree(view);
    Ok(())
}
