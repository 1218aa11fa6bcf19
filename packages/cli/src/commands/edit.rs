use super::{find_node, print_tree};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use markup_common::MemoryDocument;
use markup_editor::EditField;
use markup_view::MarkupView;

#[derive(Debug, Args)]
pub struct EditAttrArgs {
    /// id attribute of the element to edit
    #[arg(long)]
    pub node: String,

    /// Attribute to replace; without it the text adds attributes
    #[arg(long)]
    pub attr: Option<String>,

    /// Attribute text as it would be typed, e.g. `class="a b" title=x`
    #[arg(long)]
    pub text: String,

    /// Undo the edit afterwards
    #[arg(long)]
    pub undo: bool,
}

#[derive(Debug, Args)]
pub struct RenameArgs {
    /// id attribute of the element to rename
    #[arg(long)]
    pub node: String,

    /// New tag name
    #[arg(long)]
    pub tag: String,

    /// Undo the rename afterwards
    #[arg(long)]
    pub undo: bool,
}

#[derive(Debug, Args)]
pub struct DeleteArgs {
    /// id attribute of the node to delete
    #[arg(long)]
    pub node: String,

    /// Undo the deletion afterwards
    #[arg(long)]
    pub undo: bool,
}

pub async fn edit_attr(
    view: &mut MarkupView<MemoryDocument>,
    doc: &MemoryDocument,
    args: EditAttrArgs,
) -> Result<()> {
    let field = match args.attr {
        Some(name) => EditField::Attribute(name),
        None => EditField::NewAttribute,
    };
    commit(view, doc, &args.node, field, &args.text, args.undo).await
}

pub async fn rename(
    view: &mut MarkupView<MemoryDocument>,
    doc: &MemoryDocument,
    args: RenameArgs,
) -> Result<()> {
    commit(view, doc, &args.node, EditField::TagName, &args.tag, args.undo).await
}

pub async fn delete(
    view: &mut MarkupView<MemoryDocument>,
    doc: &MemoryDocument,
    args: DeleteArgs,
) -> Result<()> {
    let node = find_node(doc, &args.node)?;
    view.select(node, false).await?;

    if !view.delete_node(node).await? {
        println!("{} {} cannot be deleted", "⚠️".yellow(), args.node);
        print_tree(view);
        return Ok(());
    }
    println!("{} Deleted {}", "✓".green(), args.node);
    print_tree(view);

    if args.undo {
        undo(view).await?;
    }
    Ok(())
}

async fn commit(
    view: &mut MarkupView<MemoryDocument>,
    doc: &MemoryDocument,
    id: &str,
    field: EditField,
    text: &str,
    then_undo: bool,
) -> Result<()> {
    let node = find_node(doc, id)?;
    view.select(node, false).await?;
    view.begin_edit(node, field.clone())?;

    if !view.commit_edit(node, field, text, true).await? {
        println!("{} Edit of {} was rejected or changed nothing", "⚠️".yellow(), id);
        print_tree(view);
        return Ok(());
    }
    let description = view.undo_stack().undo_description().unwrap_or("Edit");
    println!("{} {}", "✓".green(), description);
    print_tree(view);

    if then_undo {
        undo(view).await?;
    }
    Ok(())
}

async fn undo(view: &mut MarkupView<MemoryDocument>) -> Result<()> {
    if view.undo().await? {
        println!();
        println!("{} Undone", "↶".cyan());
        print_tree(view);
    }
    Ok(())
}
