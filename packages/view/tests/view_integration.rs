//! End-to-end behaviour of the markup view against the in-memory document

use markup_common::{
    Attribute, DoctypeSpec, DocumentSpec, MemoryDocument, NodeHandle, NodeSpec, RemoteWalker,
};
use markup_editor::EditField;
use markup_view::{MarkupConfig, MarkupEvent, MarkupView, NavKey, RefreshOptions, TreeMirror};
use std::sync::Arc;

fn li(i: usize) -> NodeSpec {
    NodeSpec::element("li", &[("id", &format!("item-{i}"))], vec![])
}

/// ```text
/// <!DOCTYPE html>
/// <html id="root">
///   <body id="body">
///     <ul id="list"> li#item-0 … </ul>
///     <p id="para">hello</p>
/// ```
fn page(items: usize) -> DocumentSpec {
    DocumentSpec {
        doctype: Some(DoctypeSpec {
            name: "html".into(),
            public_id: None,
            system_id: None,
        }),
        root: NodeSpec::element(
            "html",
            &[("id", "root")],
            vec![NodeSpec::element(
                "body",
                &[("id", "body")],
                vec![
                    NodeSpec::element("ul", &[("id", "list")], (0..items).map(li).collect()),
                    NodeSpec::element("p", &[("id", "para")], vec![NodeSpec::text("hello")]),
                ],
            )],
        ),
    }
}

async fn open(
    spec: &DocumentSpec,
    config: MarkupConfig,
) -> (Arc<MemoryDocument>, MarkupView<MemoryDocument>) {
    let doc = Arc::new(MemoryDocument::from_spec(spec));
    let view = MarkupView::new(doc.clone(), config).await.unwrap();
    (doc, view)
}

fn node(doc: &MemoryDocument, id: &str) -> NodeHandle {
    doc.find_by_id(id).unwrap()
}

async fn expand_path(view: &mut MarkupView<MemoryDocument>, doc: &MemoryDocument, ids: &[&str]) {
    for id in ids {
        view.expand(node(doc, id)).await.unwrap();
    }
}

#[tokio::test]
async fn test_import_is_idempotent() {
    let (doc, mut view) = open(&page(3), MarkupConfig::default()).await;
    let body = doc.front(node(&doc, "body")).unwrap();
    let before = view.mirror().len();

    let first = view.import_node(body.clone());
    let second = view.import_node(body);

    assert_eq!(first, second);
    assert_eq!(view.mirror().len(), before + 1);
}

#[tokio::test]
async fn test_overlapping_refreshes_issue_one_fetch() {
    let doc = MemoryDocument::from_spec(&page(3));
    let mut mirror = TreeMirror::new(10);
    let root = mirror.import_node(doc.document().await.unwrap());

    let first = mirror.refresh_children(root, RefreshOptions::default()).unwrap();
    let second = mirror.refresh_children(root, RefreshOptions::expand()).unwrap();
    assert_eq!(first, second);

    let requests = mirror.take_requests();
    assert_eq!(requests.len(), 1);
    for request in requests {
        let result = doc.children(request.node, request.options).await;
        mirror.complete_fetch(request.ticket, result).unwrap();
    }

    assert_eq!(doc.children_fetch_count(), 1);
    assert!(mirror.is_idle());
    assert_eq!(mirror.get(root).unwrap().children.len(), 2);
}

#[tokio::test]
async fn test_change_during_fetch_renders_second_result() {
    let (doc, mut view) = open(&page(3), MarkupConfig::default()).await;
    expand_path(&mut view, &doc, &["root", "body"]).await;

    let ul = node(&doc, "list");
    doc.during_next_fetch(move |tree| {
        tree.append_child(ul, &li(3)).unwrap();
    });
    let fetches = doc.children_fetch_count();

    view.expand(ul).await.unwrap();

    assert_eq!(doc.children_fetch_count(), fetches + 2);
    let container = view.container(ul).unwrap();
    assert!(container.expanded);
    assert_eq!(container.children.len(), 4);
    assert!(view.mirror().is_idle());
}

#[tokio::test]
async fn test_paging_window_and_show_all() {
    let config = MarkupConfig::default().with_page_size(5);
    let (doc, mut view) = open(&page(12), config).await;
    expand_path(&mut view, &doc, &["root", "body", "list"]).await;

    let ul = node(&doc, "list");
    let container = view.container(ul).unwrap();
    assert_eq!(container.children.len(), 5);
    assert!(container.has_first_child);
    assert!(!container.has_last_child);
    assert!(view.render().contains("… 5 of 12 children shown"));

    view.show_all(ul).await.unwrap();
    let container = view.container(ul).unwrap();
    assert_eq!(container.children.len(), 12);
    assert!(container.has_first_child && container.has_last_child);
    assert!(container.show_more().is_none());
}

#[tokio::test]
async fn test_attribute_edits_undo_and_redo() {
    let (doc, mut view) = open(&page(3), MarkupConfig::default()).await;
    expand_path(&mut view, &doc, &["root", "body", "list"]).await;
    let item = node(&doc, "item-0");

    let edited = view
        .commit_edit(
            item,
            EditField::Attribute("id".into()),
            r#"id="first" data-x="1""#,
            true,
        )
        .await
        .unwrap();
    assert!(edited);
    assert!(view
        .commit_edit(item, EditField::NewAttribute, r#"title="t""#, true)
        .await
        .unwrap());
    assert_eq!(view.undo_stack().undo_levels(), 2);

    let after = doc.front(item).unwrap().attributes;
    assert_eq!(
        after,
        vec![
            Attribute::new("id", "first"),
            Attribute::new("data-x", "1"),
            Attribute::new("title", "t"),
        ]
    );

    assert!(view.undo().await.unwrap());
    assert!(view.undo().await.unwrap());
    assert!(!view.undo().await.unwrap());
    assert_eq!(doc.front(item).unwrap().attributes, vec![Attribute::new("id", "item-0")]);

    assert!(view.redo().await.unwrap());
    assert!(view.redo().await.unwrap());
    assert!(!view.redo().await.unwrap());
    assert_eq!(doc.front(item).unwrap().attributes, after);
}

#[tokio::test]
async fn test_attribute_input_is_parsed_tolerantly() {
    let (doc, mut view) = open(&page(1), MarkupConfig::default()).await;
    expand_path(&mut view, &doc, &["root", "body"]).await;
    let para = node(&doc, "para");

    view.commit_edit(para, EditField::NewAttribute, r#"class="a"#, true)
        .await
        .unwrap();
    assert_eq!(doc.attribute(para, "class").as_deref(), Some("a"));

    view.commit_edit(
        para,
        EditField::NewAttribute,
        r#"onclick="x" bad<name="y""#,
        true,
    )
    .await
    .unwrap();
    let front = doc.front(para).unwrap();
    assert_eq!(front.get_attribute("onclick"), Some("x"));
    assert!(front.attributes.iter().all(|a| a.name != "bad<name"));
}

#[tokio::test]
async fn test_cancelled_and_unchanged_edits_do_nothing() {
    let (doc, mut view) = open(&page(1), MarkupConfig::default()).await;
    expand_path(&mut view, &doc, &["root", "body"]).await;
    let para = node(&doc, "para");

    let text = view.begin_edit(para, EditField::Attribute("id".into())).unwrap();
    assert_eq!(text, r#"id="para""#);
    assert!(!view
        .commit_edit(para, EditField::Attribute("id".into()), &text, true)
        .await
        .unwrap());
    assert!(!view
        .commit_edit(para, EditField::NewAttribute, "lang=en", false)
        .await
        .unwrap());
    assert!(!view.undo_stack().can_undo());
}

#[tokio::test]
async fn test_select_reveals_deep_node() {
    let config = MarkupConfig::default().with_page_size(5);
    let (doc, mut view) = open(&page(12), config).await;
    let target = node(&doc, "item-10");
    assert!(view.container(target).is_none());

    assert!(view.select(target, false).await.unwrap());

    let mirror = view.mirror();
    let id = mirror.id_for(target).unwrap();
    assert!(mirror.is_path_visible(id));
    assert!(mirror.visible_order().contains(&id));
    for ancestor in ["root", "body", "list"] {
        assert!(view.container(node(&doc, ancestor)).unwrap().expanded);
    }

    // Window of five around the target, clamped to the end
    let ul = view.container(node(&doc, "list")).unwrap();
    assert!(!ul.has_first_child);
    assert!(ul.has_last_child);
    assert_eq!(doc.selected(), Some(target));
    assert!(view
        .take_events()
        .contains(&MarkupEvent::SelectionChanged { node: Some(target) }));
}

#[tokio::test]
async fn test_selecting_document_terminates() {
    let (doc, mut view) = open(&page(1), MarkupConfig::default()).await;
    let document = doc.document_handle();

    view.select(document, false).await.unwrap();
    view.show_node(document).await.unwrap();
    assert_eq!(view.selected(), Some(document));
    assert!(view.mirror().is_idle());
}

#[tokio::test]
async fn test_tag_rename_round_trip() {
    let spec = DocumentSpec {
        doctype: None,
        root: NodeSpec::element(
            "html",
            &[],
            vec![NodeSpec::element(
                "body",
                &[("id", "body")],
                vec![
                    NodeSpec::element("h1", &[], vec![]),
                    NodeSpec::element(
                        "div",
                        &[("id", "x"), ("class", "y")],
                        vec![NodeSpec::text("hello"), NodeSpec::element("em", &[], vec![])],
                    ),
                    NodeSpec::element("footer", &[], vec![]),
                ],
            )],
        ),
    };
    let (doc, mut view) = open(&spec, MarkupConfig::default()).await;
    let body = node(&doc, "body");
    let div = node(&doc, "x");
    let siblings = doc.child_handles(body);
    let children = doc.child_handles(div);

    view.select(div, true).await.unwrap();
    assert!(view
        .commit_edit(div, EditField::TagName, "span", true)
        .await
        .unwrap());

    let span = node(&doc, "x");
    assert_ne!(span, div);
    let front = doc.front(span).unwrap();
    assert_eq!(front.name, "span");
    assert_eq!(front.attributes, vec![Attribute::new("id", "x"), Attribute::new("class", "y")]);
    assert_eq!(doc.child_handles(span), children);
    assert_eq!(doc.child_handles(body)[1], span);
    assert_eq!(view.selected(), Some(span));
    assert!(doc.is_retained(div));

    assert!(view.undo().await.unwrap());

    let front = doc.front(div).unwrap();
    assert_eq!(front.name, "div");
    assert_eq!(front.attributes, vec![Attribute::new("id", "x"), Attribute::new("class", "y")]);
    assert_eq!(doc.child_handles(div), children);
    assert_eq!(doc.child_handles(body), siblings);
    assert_eq!(view.selected(), Some(div));
    assert!(doc.front(span).unwrap().parent.is_none());
}

#[tokio::test]
async fn test_rejected_tag_edits() {
    let (doc, mut view) = open(&page(1), MarkupConfig::default()).await;
    expand_path(&mut view, &doc, &["root", "body"]).await;
    let html = node(&doc, "root");
    let para = node(&doc, "para");

    assert!(!view
        .commit_edit(html, EditField::TagName, "main", true)
        .await
        .unwrap());
    assert!(!view
        .commit_edit(para, EditField::TagName, "1bad", true)
        .await
        .unwrap());
    assert!(!view
        .commit_edit(para, EditField::TagName, "P", true)
        .await
        .unwrap());

    assert_eq!(doc.front(html).unwrap().name, "html");
    assert_eq!(doc.front(para).unwrap().name, "p");
    assert!(!view.undo_stack().can_undo());
}

#[tokio::test]
async fn test_failed_fetch_keeps_view_usable() {
    let (doc, mut view) = open(&page(3), MarkupConfig::default()).await;
    expand_path(&mut view, &doc, &["root"]).await;
    let body = node(&doc, "body");

    doc.fail_next_children(1);
    view.expand(body).await.unwrap();

    let container = view.container(body).unwrap();
    assert!(!container.expanded);
    assert!(container.fetch.is_dirty());
    assert!(view.mirror().is_idle());
    assert!(view.render().contains("<body id=\"body\">"));

    view.expand(body).await.unwrap();
    let container = view.container(body).unwrap();
    assert!(container.expanded);
    assert_eq!(container.children.len(), 2);
}

#[tokio::test]
async fn test_delete_and_undo_restore_sibling_position() {
    let (doc, mut view) = open(&page(3), MarkupConfig::default()).await;
    let ul = node(&doc, "list");
    let items = doc.child_handles(ul);

    view.select(items[1], false).await.unwrap();
    assert!(view.delete_node(items[1]).await.unwrap());

    assert_eq!(doc.child_handles(ul), vec![items[0], items[2]]);
    assert!(doc.is_retained(items[1]));
    assert_eq!(view.selected(), Some(ul));
    assert_eq!(view.container(ul).unwrap().children.len(), 2);

    assert!(view.undo().await.unwrap());
    assert_eq!(doc.child_handles(ul), items);
    assert_eq!(view.container(ul).unwrap().children.len(), 3);

    assert!(view.redo().await.unwrap());
    assert_eq!(doc.child_handles(ul), vec![items[0], items[2]]);
}

#[tokio::test]
async fn test_structural_nodes_cannot_be_deleted() {
    let (doc, mut view) = open(&page(1), MarkupConfig::default()).await;
    let document = doc.document_handle();
    let doctype = doc.child_handles(document)[0];

    for handle in [document, doctype, node(&doc, "root")] {
        assert!(!view.delete_node(handle).await.unwrap());
    }
    assert_eq!(doc.child_handles(document).len(), 2);
    assert!(!view.undo_stack().can_undo());
}

#[tokio::test]
async fn test_text_edit_undo_restores_long_value() {
    let long = "x".repeat(80);
    let spec = DocumentSpec {
        doctype: None,
        root: NodeSpec::element(
            "html",
            &[],
            vec![NodeSpec::element(
                "p",
                &[("id", "para")],
                vec![NodeSpec::text(&long)],
            )],
        ),
    };
    let (doc, mut view) = open(&spec, MarkupConfig::default()).await;
    let text = doc.child_handles(node(&doc, "para"))[0];

    view.select(text, false).await.unwrap();
    assert!(view.render().contains(&long));
    assert_eq!(doc.live_long_strings(), 0);

    assert_eq!(view.begin_edit(text, EditField::Value).unwrap(), long);
    assert!(view
        .commit_edit(text, EditField::Value, "short", true)
        .await
        .unwrap());
    assert_eq!(doc.value(text).as_deref(), Some("short"));
    assert!(!view.render().contains("xxxx"));

    assert!(view.undo().await.unwrap());
    assert_eq!(doc.value(text), Some(long.clone()));
    assert!(view.render().contains(&long));
    assert_eq!(doc.live_long_strings(), 0);
}

#[tokio::test]
async fn test_keyboard_navigation() {
    let (doc, mut view) = open(&page(2), MarkupConfig::default()).await;
    let doctype = doc.child_handles(doc.document_handle())[0];
    let html = node(&doc, "root");
    let body = node(&doc, "body");

    assert!(view.on_key(NavKey::Down).await.unwrap());
    assert_eq!(view.selected(), Some(doctype));
    assert!(view.on_key(NavKey::Down).await.unwrap());
    assert_eq!(view.selected(), Some(html));

    // Expand first, then step into the children
    assert!(view.on_key(NavKey::Right).await.unwrap());
    assert!(view.container(html).unwrap().expanded);
    assert_eq!(view.selected(), Some(html));
    assert!(view.on_key(NavKey::Right).await.unwrap());
    assert_eq!(view.selected(), Some(body));

    assert!(view.on_key(NavKey::Left).await.unwrap());
    assert_eq!(view.selected(), Some(html));
    assert!(view.on_key(NavKey::Left).await.unwrap());
    assert!(!view.container(html).unwrap().expanded);

    assert!(!view.on_key(NavKey::Down).await.unwrap());
    assert!(view.on_key(NavKey::Home).await.unwrap());
    assert_eq!(view.selected(), Some(doctype));
    assert!(view.on_key(NavKey::PageDown).await.unwrap());
    assert_eq!(view.selected(), Some(html));
    assert!(view.on_key(NavKey::PageUp).await.unwrap());
    assert_eq!(view.selected(), Some(doctype));
}

#[tokio::test]
async fn test_page_mutations_reach_the_tree() {
    let (doc, mut view) = open(&page(3), MarkupConfig::default()).await;
    expand_path(&mut view, &doc, &["root", "body", "list"]).await;
    let ul = node(&doc, "list");
    let item = node(&doc, "item-0");
    view.take_events();

    doc.edit(|tree| tree.append_child(ul, &li(3))).unwrap();
    let outcome = view.pump_mutations().await.unwrap();
    let ul_id = view.mirror().id_for(ul).unwrap();
    assert_eq!(outcome.invalidated, vec![ul_id]);
    assert_eq!(view.container(ul).unwrap().children.len(), 4);

    doc.edit(|tree| tree.set_attribute(item, "class", "hot")).unwrap();
    let outcome = view.pump_mutations().await.unwrap();
    assert_eq!(outcome.updated, vec![view.mirror().id_for(item).unwrap()]);
    assert!(view.render().contains(r#"<li id="item-0" class="hot">"#));

    // Nodes the view never imported are ignored
    let hello = doc.child_handles(node(&doc, "para"))[0];
    doc.edit(|tree| tree.set_value(hello, "bye")).unwrap();
    let outcome = view.pump_mutations().await.unwrap();
    assert_eq!(outcome.ignored, 1);
    assert!(view.pump_mutations().await.is_none());

    let events = view.take_events();
    assert!(events.contains(&MarkupEvent::NodeChanged { node: item }));
    assert!(events.contains(&MarkupEvent::MutationsSettled { records: 1 }));
}

#[tokio::test]
async fn test_removed_selection_moves_to_parent() {
    let (doc, mut view) = open(&page(3), MarkupConfig::default()).await;
    let ul = node(&doc, "list");
    let item = node(&doc, "item-1");
    view.select(item, false).await.unwrap();

    doc.edit(|tree| tree.remove(item)).unwrap();
    view.pump_mutations().await.unwrap();

    assert_eq!(view.selected(), Some(ul));
    assert_eq!(view.container(ul).unwrap().children.len(), 2);
}

#[tokio::test]
async fn test_removed_ancestor_moves_selection_to_surviving_parent() {
    let spec = DocumentSpec {
        doctype: None,
        root: NodeSpec::element(
            "html",
            &[],
            vec![NodeSpec::element(
                "ul",
                &[("id", "list")],
                vec![
                    NodeSpec::element(
                        "li",
                        &[("id", "a")],
                        vec![NodeSpec::element(
                            "span",
                            &[],
                            vec![NodeSpec::element("em", &[("id", "deep")], vec![])],
                        )],
                    ),
                    NodeSpec::element("li", &[("id", "b")], vec![]),
                ],
            )],
        ),
    };
    let (doc, mut view) = open(&spec, MarkupConfig::default()).await;
    let ul = node(&doc, "list");
    let a = node(&doc, "a");
    view.select(node(&doc, "deep"), false).await.unwrap();

    doc.edit(|tree| tree.remove(a)).unwrap();
    view.pump_mutations().await.unwrap();

    assert_eq!(view.selected(), Some(ul));
    let ul_id = view.mirror().id_for(ul).unwrap();
    assert!(view.mirror().is_path_visible(ul_id));
    assert!(!view.render().contains("deep"));
    assert_eq!(doc.selected(), Some(ul));
}

#[tokio::test]
async fn test_selection_removed_while_fetching_moves_to_parent() {
    let config = MarkupConfig::default().with_page_size(2);
    let (doc, mut view) = open(&page(3), config).await;
    let ul = node(&doc, "list");
    let item = node(&doc, "item-0");
    view.select(item, false).await.unwrap();
    view.take_events();

    doc.during_next_fetch(move |tree| {
        tree.remove(item).unwrap();
    });
    view.show_all(ul).await.unwrap();

    assert_eq!(view.selected(), Some(ul));
    assert_eq!(view.container(ul).unwrap().children.len(), 2);
    let events = view.take_events();
    assert!(events.contains(&MarkupEvent::MutationsSettled { records: 1 }));
    assert!(events.contains(&MarkupEvent::SelectionChanged { node: Some(ul) }));

    // Already handled, nothing left on the feed
    assert!(view.pump_mutations().await.is_none());
}

#[tokio::test]
async fn test_failed_attribute_edit_restores_display() {
    let (doc, mut view) = open(&page(3), MarkupConfig::default()).await;
    let item = node(&doc, "item-1");
    view.select(item, false).await.unwrap();
    let before = view.render();

    doc.fail_next_attribute_edits(2);
    view.begin_edit(item, EditField::NewAttribute).unwrap();
    let applied = view
        .commit_edit(item, EditField::NewAttribute, r#"title="t""#, true)
        .await
        .unwrap();
    assert!(!applied);
    assert_eq!(doc.attribute(item, "title"), None);
    assert_eq!(view.render(), before);

    let id = EditField::Attribute("id".into());
    view.begin_edit(item, id.clone()).unwrap();
    let applied = view
        .commit_edit(item, id, r#"id="moved" lang="en""#, true)
        .await
        .unwrap();
    assert!(!applied);
    assert_eq!(doc.attribute(item, "id").as_deref(), Some("item-1"));
    assert_eq!(view.render(), before);
    assert!(!view.undo_stack().can_undo());

    // The remote side is back
    view.begin_edit(item, EditField::NewAttribute).unwrap();
    assert!(view
        .commit_edit(item, EditField::NewAttribute, r#"title="t""#, true)
        .await
        .unwrap());
    assert!(view.render().contains(r#"<li id="item-1" title="t">"#));
    assert!(view.undo_stack().can_undo());
}

#[tokio::test]
async fn test_toggle_hidden() {
    let (doc, mut view) = open(&page(1), MarkupConfig::default()).await;
    expand_path(&mut view, &doc, &["root", "body"]).await;
    let para = node(&doc, "para");

    view.toggle_hidden(para).await.unwrap();
    assert!(doc.front(para).unwrap().hidden);
    assert!(view.render().contains("<p id=\"para\"> (hidden)"));

    view.toggle_hidden(para).await.unwrap();
    assert!(!view.render().contains("(hidden)"));
}

#[tokio::test]
async fn test_expand_all_shows_every_node() {
    let (doc, mut view) = open(&page(2), MarkupConfig::default()).await;
    view.expand_all(None).await.unwrap();

    // doctype, html, body, ul, two items, p and its text
    assert_eq!(view.rows().len(), 8);
    assert!(view.container(node(&doc, "para")).unwrap().expanded);
}

#[tokio::test]
async fn test_teardown_drops_everything() {
    let (doc, mut view) = open(&page(2), MarkupConfig::default()).await;
    let para = node(&doc, "para");
    view.select(para, false).await.unwrap();
    view.toggle_hidden(para).await.unwrap();

    view.teardown();

    assert!(view.mirror().is_empty());
    assert_eq!(view.render(), "");
    assert_eq!(view.selected(), None);
    assert!(!view.undo_stack().can_undo());
    assert!(view.take_events().is_empty());
}
