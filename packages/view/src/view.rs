//! # Markup View
//!
//! Async driver around the [`TreeMirror`]: runs the fetches the mirror
//! queues, feeds it the mutation stream, keeps the selection visible and
//! executes edits with undo support.
//!
//! ## Settle loop
//!
//! ```text
//! take_requests ──▶ run fetches together ──▶ absorb queued mutations
//!       ▲                                              │
//!       └──────────── complete_fetch each result ◀─────┘
//! ```
//!
//! Mutations are absorbed before results land, so a change that raced a
//! fetch marks the container dirty and the stale window is never rendered.

use crate::config::MarkupConfig;
use crate::container::MirrorNode;
use crate::errors::{MarkupResult, MirrorError};
use crate::mirror::{MirrorId, MutationOutcome, Row, TreeMirror};
use crate::selection::SelectionController;
use futures::future::join_all;
use markup_common::{
    AttributeOp, ChildrenOptions, MutationKind, MutationRecord, NodeFront, NodeHandle, NodeKind,
    RemoteError, RemoteWalker,
};
use markup_editor::{EditAction, EditField, EditIntent, NodeEditor, UndoStack};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

/// Each round renders every ancestor level at once, so a reachable node is
/// visible after one round; the rest absorb concurrent changes.
const SHOW_NODE_ROUNDS: usize = 3;

/// Keys the tree reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NavKey {
    Up,
    Down,
    /// Collapse, or move to the parent
    Left,
    /// Expand, or move to the first child
    Right,
    Home,
    PageUp,
    PageDown,
    Delete,
    ToggleHidden,
}

/// Notifications for the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MarkupEvent {
    SelectionChanged { node: Option<NodeHandle> },
    /// Attributes or value of a node changed
    NodeChanged { node: NodeHandle },
    /// Every fetch caused by a mutation batch has settled
    MutationsSettled { records: usize },
}

pub struct MarkupView<W: RemoteWalker> {
    walker: Arc<W>,
    config: MarkupConfig,
    mirror: TreeMirror,
    selection: SelectionController,
    undo: UndoStack<EditAction>,
    mutations: mpsc::UnboundedReceiver<Vec<MutationRecord>>,

    /// Records absorbed but not yet followed up by a selection check
    unsettled: usize,

    events: Vec<MarkupEvent>,
}

impl<W: RemoteWalker> MarkupView<W> {
    /// Subscribe to `walker`, import its document and wait for the first
    /// render
    #[instrument(skip(walker, config), fields(page_size = config.page_size))]
    pub async fn new(walker: Arc<W>, config: MarkupConfig) -> MarkupResult<Self> {
        let mutations = walker.subscribe();
        let document = walker.document().await?;

        let mut view = Self {
            mirror: TreeMirror::new(config.page_size),
            undo: UndoStack::with_max_levels(config.undo_depth),
            selection: SelectionController::new(),
            walker,
            config,
            mutations,
            unsettled: 0,
            events: Vec::new(),
        };
        view.mirror.import_node(document);
        view.wait_for_idle().await;

        info!(containers = view.mirror.len(), "Markup view ready");
        Ok(view)
    }

    pub fn walker(&self) -> &Arc<W> {
        &self.walker
    }

    pub fn config(&self) -> &MarkupConfig {
        &self.config
    }

    pub fn mirror(&self) -> &TreeMirror {
        &self.mirror
    }

    pub fn undo_stack(&self) -> &UndoStack<EditAction> {
        &self.undo
    }

    pub fn selected(&self) -> Option<NodeHandle> {
        let id = self.selection.selected()?;
        self.mirror.get(id).map(|node| node.front.handle)
    }

    pub fn import_node(&mut self, front: NodeFront) -> MirrorId {
        self.mirror.import_node(front)
    }

    pub fn container(&self, handle: NodeHandle) -> Option<&MirrorNode> {
        self.mirror.container(handle)
    }

    fn id(&self, handle: NodeHandle) -> Result<MirrorId, MirrorError> {
        self.mirror
            .id_for(handle)
            .ok_or(MirrorError::NotImported(handle))
    }

    #[instrument(skip(self))]
    pub async fn expand(&mut self, handle: NodeHandle) -> MarkupResult<()> {
        let id = self.id(handle)?;
        self.mirror.expand(id)?;
        self.wait_for_idle().await;
        Ok(())
    }

    pub fn collapse(&mut self, handle: NodeHandle) -> MarkupResult<()> {
        let id = self.id(handle)?;
        self.mirror.collapse(id)?;
        Ok(())
    }

    /// Expand `handle` (the document when `None`) and every descendant.
    /// Paged containers stay paged.
    #[instrument(skip(self))]
    pub async fn expand_all(&mut self, handle: Option<NodeHandle>) -> MarkupResult<()> {
        let start = match handle {
            Some(handle) => self.id(handle)?,
            None => match self.mirror.root() {
                Some(root) => root,
                None => return Ok(()),
            },
        };

        let mut queue = vec![start];
        while let Some(id) = queue.pop() {
            self.mirror.expand(id)?;
            self.wait_for_idle().await;
            if let Some(node) = self.mirror.get(id) {
                queue.extend(node.children.iter().rev().copied());
            }
        }
        Ok(())
    }

    /// Fetch every child of `handle` instead of one page
    #[instrument(skip(self))]
    pub async fn show_all(&mut self, handle: NodeHandle) -> MarkupResult<()> {
        let id = self.id(handle)?;
        self.mirror.show_all(id)?;
        self.wait_for_idle().await;
        Ok(())
    }

    pub fn highlight(&mut self, handle: Option<NodeHandle>) {
        let id = handle.and_then(|handle| self.mirror.id_for(handle));
        self.mirror.set_highlighted(id);
    }

    /// Select `handle`, importing and revealing it as needed. Returns
    /// whether the selection changed.
    #[instrument(skip(self))]
    pub async fn select(&mut self, handle: NodeHandle, focus: bool) -> MarkupResult<bool> {
        let result = self.select_node(handle, focus).await;
        self.finish_mutations().await;
        result
    }

    async fn select_node(&mut self, handle: NodeHandle, focus: bool) -> MarkupResult<bool> {
        self.reveal(handle).await?;
        let id = self.id(handle)?;

        let changed = self.selection.select(&mut self.mirror, id, focus);
        if changed {
            self.sync_selection(Some(handle)).await;
            self.load_full_value(id).await;
        }
        Ok(changed)
    }

    pub async fn clear_selection(&mut self) -> bool {
        let changed = self.selection.clear(&mut self.mirror);
        if changed {
            self.sync_selection(None).await;
        }
        changed
    }

    async fn sync_selection(&mut self, node: Option<NodeHandle>) {
        self.events.push(MarkupEvent::SelectionChanged { node });
        if let Err(err) = self.walker.sync_selection(node).await {
            warn!(error = %err, "Failed to sync selection");
        }
    }

    /// Import the ancestors of `handle` and render the path down to it
    #[instrument(skip(self))]
    pub async fn show_node(&mut self, handle: NodeHandle) -> MarkupResult<()> {
        let result = self.reveal(handle).await;
        self.finish_mutations().await;
        result
    }

    async fn reveal(&mut self, handle: NodeHandle) -> MarkupResult<()> {
        if self.mirror.id_for(handle).is_none() {
            let mut fronts = vec![self.walker.describe(handle).await?];
            let mut current = handle;
            while self.mirror.id_for(current).is_none() {
                let Some(parent) = self.walker.parent(current).await? else {
                    break;
                };
                current = parent.handle;
                fronts.push(parent);
            }
            for front in fronts.into_iter().rev() {
                self.mirror.import_node(front);
            }
        }

        for _ in 0..SHOW_NODE_ROUNDS {
            let tickets = self.mirror.ensure_visible(handle);
            if tickets.is_empty() {
                break;
            }
            if self.settle().await > 0 {
                warn!(node = %handle, "Could not reveal node");
                break;
            }
        }
        Ok(())
    }

    /// Handle a key press on the tree. Returns whether the key did anything.
    #[instrument(skip(self))]
    pub async fn on_key(&mut self, key: NavKey) -> MarkupResult<bool> {
        let page = self.config.navigation_page;
        let selected = self.selection.selected().and_then(|id| {
            self.mirror
                .get(id)
                .map(|node| (id, node.front.handle, node.expanded, node.has_children()))
        });

        let target = match key {
            NavKey::Delete => {
                return match selected {
                    Some((_, handle, ..)) => self.delete_node(handle).await,
                    None => Ok(false),
                };
            }
            NavKey::ToggleHidden => {
                return match selected {
                    Some((_, handle, ..)) => self.toggle_hidden(handle).await.map(|_| true),
                    None => Ok(false),
                };
            }
            NavKey::Home => self.selection.home(&self.mirror),
            NavKey::Up => self.selection.previous(&self.mirror),
            NavKey::Down => self.selection.next(&self.mirror),
            NavKey::PageUp => self.selection.page_back(&self.mirror, page),
            NavKey::PageDown => self.selection.page_forward(&self.mirror, page),
            NavKey::Left => match selected {
                Some((id, _, true, true)) => {
                    self.mirror.collapse(id)?;
                    return Ok(true);
                }
                Some(_) => self.selection.parent(&self.mirror),
                None => None,
            },
            NavKey::Right => match selected {
                Some((_, handle, false, true)) => {
                    self.expand(handle).await?;
                    return Ok(true);
                }
                Some(_) => self
                    .selection
                    .first_child(&self.mirror)
                    .or_else(|| self.selection.next(&self.mirror)),
                None => None,
            },
        };

        let Some(handle) = target.and_then(|id| self.mirror.get(id)).map(|n| n.front.handle) else {
            return Ok(false);
        };
        self.select(handle, true).await
    }

    /// Absorb whatever the mutation feed has queued
    pub async fn pump_mutations(&mut self) -> Option<MutationOutcome> {
        let records = self.drain_feed();
        if records.is_empty() {
            return None;
        }
        Some(self.on_mutations(records).await)
    }

    /// Apply a mutation batch and wait for the tree to settle
    #[instrument(skip(self, records), fields(records = records.len()))]
    pub async fn on_mutations(&mut self, records: Vec<MutationRecord>) -> MutationOutcome {
        let outcome = self.absorb(&records).await;
        self.unsettled += records.len();
        self.settle().await;
        self.finish_mutations().await;
        outcome
    }

    /// Resolves once no children fetch is in flight, including the
    /// re-fetches that stale results cause
    pub async fn wait_for_idle(&mut self) {
        self.settle().await;
        self.finish_mutations().await;
    }

    /// Once nothing is in flight, check the selection against every record
    /// absorbed so far and report the batch as settled
    async fn finish_mutations(&mut self) {
        while self.unsettled > 0 {
            let records = std::mem::take(&mut self.unsettled);
            self.revalidate_selection().await;
            self.events.push(MarkupEvent::MutationsSettled { records });
        }
    }

    /// Returns the number of fetches that failed
    async fn settle(&mut self) -> usize {
        let mut failures = 0;

        loop {
            let requests = self.mirror.take_requests();
            if requests.is_empty() {
                break;
            }

            let walker = &*self.walker;
            let results = join_all(requests.into_iter().map(|request| async move {
                let result = walker.children(request.node, request.options).await;
                (request.ticket, result)
            }))
            .await;

            let records = self.drain_feed();
            if !records.is_empty() {
                self.absorb(&records).await;
                self.unsettled += records.len();
            }

            for (ticket, result) in results {
                if let Err(err) = self.mirror.complete_fetch(ticket, result) {
                    failures += 1;
                    warn!(ticket = ticket.0, error = %err, "Children refresh failed");
                }
            }
        }

        debug_assert!(self.mirror.is_idle());
        failures
    }

    fn drain_feed(&mut self) -> Vec<MutationRecord> {
        let mut records = Vec::new();
        while let Ok(batch) = self.mutations.try_recv() {
            records.extend(batch);
        }
        records
    }

    /// Refresh the metadata of every mapped target, then let the mirror
    /// classify the records
    async fn absorb(&mut self, records: &[MutationRecord]) -> MutationOutcome {
        let mut targets = Vec::new();
        for record in records {
            let target = match record.kind {
                MutationKind::DocumentUnload => record.target_parent,
                _ => Some(record.target),
            };
            if let Some(target) = target {
                if self.mirror.id_for(target).is_some() && !targets.contains(&target) {
                    targets.push(target);
                }
            }
        }

        let walker = &*self.walker;
        let fronts = join_all(targets.iter().map(|target| walker.describe(*target))).await;
        for (target, front) in targets.iter().zip(fronts) {
            match front {
                Ok(front) => {
                    self.mirror.update_front(front);
                }
                Err(err) => warn!(node = %target, error = %err, "Failed to refresh node"),
            }
        }

        let outcome = self.mirror.on_mutations(records);
        for &id in &outcome.updated {
            if let Some(node) = self.mirror.get(id) {
                self.events.push(MarkupEvent::NodeChanged {
                    node: node.front.handle,
                });
            }
            self.load_full_value(id).await;
        }
        outcome
    }

    /// Keep the selection rendered. A selection that left the document,
    /// on its own or with an ancestor, moves to the closest former ancestor
    /// still in it.
    async fn revalidate_selection(&mut self) {
        let Some(id) = self.selection.selected() else {
            return;
        };
        if self.mirror.is_path_visible(id) {
            return;
        }
        let Some(handle) = self.mirror.get(id).map(|node| node.front.handle) else {
            return;
        };

        let result = match self.is_attached(handle).await {
            Ok(true) => self.reveal(handle).await,
            Ok(false) => match self.attached_ancestor(handle).await {
                Some(ancestor) if !self.mirror.container(ancestor).is_some_and(|n| n.is_root) => {
                    self.select_node(ancestor, false).await.map(|_| ())
                }
                _ => {
                    self.clear_selection().await;
                    Ok(())
                }
            },
            Err(err) => Err(err.into()),
        };
        if let Err(err) = result {
            warn!(node = %handle, error = %err, "Failed to reveal selection");
        }
    }

    /// Whether the parent chain of `handle` ends at the document
    async fn is_attached(&self, handle: NodeHandle) -> Result<bool, RemoteError> {
        let mut current = self.walker.describe(handle).await?;
        let mut seen = HashSet::new();

        while seen.insert(current.handle) {
            if current.kind == NodeKind::Document {
                return Ok(true);
            }
            match self.walker.parent(current.handle).await? {
                Some(parent) => current = parent,
                None => return Ok(false),
            }
        }
        Ok(false)
    }

    /// Closest ancestor of a detached node, as the mirror last saw it, that
    /// is still in the document
    async fn attached_ancestor(&self, handle: NodeHandle) -> Option<NodeHandle> {
        let mut seen = HashSet::from([handle]);
        let mut current = handle;

        loop {
            let parent = match self.mirror.container(current) {
                Some(node) => node.front.parent,
                None => match self.walker.parent(current).await {
                    Ok(parent) => parent.map(|front| front.handle),
                    Err(err) => {
                        warn!(node = %current, error = %err, "Failed to read parent");
                        None
                    }
                },
            }?;
            if !seen.insert(parent) {
                return None;
            }

            match self.is_attached(parent).await {
                Ok(true) => return Some(parent),
                Ok(false) => current = parent,
                Err(err) => {
                    warn!(node = %parent, error = %err, "Failed to check ancestor");
                    return None;
                }
            }
        }
    }

    /// Fetch the whole value of a selected text node shown cut short
    async fn load_full_value(&mut self, id: MirrorId) {
        let Some(node) = self.mirror.get(id) else {
            return;
        };
        let needed = node
            .editor
            .as_text()
            .is_some_and(|text| text.needs_full_value());
        if !needed {
            return;
        }
        let handle = node.front.handle;

        match self.read_value(handle).await {
            Ok(value) => {
                if let Some(text) = self.mirror.get_mut(id).and_then(|n| n.editor.as_text_mut()) {
                    text.set_full_value(value);
                }
            }
            Err(err) => warn!(node = %handle, error = %err, "Failed to load node value"),
        }
    }

    async fn read_value(&self, handle: NodeHandle) -> Result<String, RemoteError> {
        let string = self.walker.node_value(handle).await?;
        let text = self.walker.long_string_text(&string).await;
        if let Err(err) = self.walker.release_long_string(string).await {
            warn!(node = %handle, error = %err, "Failed to release long string");
        }
        text
    }

    /// Text an in-place editor for `field` starts with
    pub fn begin_edit(&mut self, handle: NodeHandle, field: EditField) -> MarkupResult<String> {
        let id = self.id(handle)?;
        let node = self.mirror.get_mut(id).ok_or(MirrorError::StaleContainer(id))?;
        Ok(node.editor.begin_edit(field)?)
    }

    /// Finish an in-place edit. Rejected, empty and failed edits return
    /// false and the node goes back to showing its remote state.
    #[instrument(skip(self, text))]
    pub async fn commit_edit(
        &mut self,
        handle: NodeHandle,
        field: EditField,
        text: &str,
        committed: bool,
    ) -> MarkupResult<bool> {
        let id = self.id(handle)?;
        let walker = &self.walker;
        let node = self.mirror.get_mut(id).ok_or(MirrorError::StaleContainer(id))?;
        let displayed = node.editor.snapshot();

        let intent = match node.editor.on_commit(field, text, committed, |name| {
            walker.is_valid_attribute_name(name)
        }) {
            Ok(Some(intent)) => intent,
            Ok(None) => return Ok(false),
            Err(err) => {
                info!(node = %handle, error = %err, "Edit rejected");
                return Ok(false);
            }
        };

        match self.apply_intent(handle, intent).await {
            Ok(()) => Ok(true),
            Err(err) => {
                warn!(node = %handle, error = %err, "Edit failed");
                self.restore_editor(id, displayed).await;
                Ok(false)
            }
        }
    }

    /// Run the edit on the remote side and record it for undo
    async fn apply_intent(&mut self, handle: NodeHandle, intent: EditIntent) -> Result<(), RemoteError> {
        let (forward, reverse, description) = match intent {
            EditIntent::ModifyAttributes { forward, reverse } => (
                EditAction::ModifyAttributes {
                    node: handle,
                    batch: forward,
                },
                EditAction::ModifyAttributes {
                    node: handle,
                    batch: reverse,
                },
                "Edit attributes",
            ),
            EditIntent::SetValue { value } => {
                let previous = self.read_value(handle).await?;
                (
                    EditAction::SetNodeValue {
                        node: handle,
                        value,
                    },
                    EditAction::SetNodeValue {
                        node: handle,
                        value: previous,
                    },
                    "Edit text",
                )
            }
            EditIntent::RenameTag { tag } => {
                let new = self.prepare_rename(handle, &tag).await?;
                (
                    EditAction::ReplaceElement { old: handle, new },
                    EditAction::ReplaceElement {
                        old: new,
                        new: handle,
                    },
                    "Rename tag",
                )
            }
        };

        let result = self.execute(&forward).await;
        // A failed attribute batch may have partially applied
        self.pump_mutations().await;
        result?;

        info!(action = forward.name(), node = %forward.target(), "{description}");
        self.undo.push_described(forward, reverse, description);
        Ok(())
    }

    /// Show `editor` again and catch up with whatever part of a failed edit
    /// reached the node
    async fn restore_editor(&mut self, id: MirrorId, editor: NodeEditor) {
        let Some(node) = self.mirror.get_mut(id) else {
            return;
        };
        node.editor = editor;
        let handle = node.front.handle;

        match self.walker.describe(handle).await {
            Ok(front) => {
                self.mirror.update_front(front);
            }
            Err(err) => warn!(node = %handle, error = %err, "Failed to refresh node"),
        }
        self.events.push(MarkupEvent::NodeChanged { node: handle });
    }

    /// Detached copy of `old` with tag `tag` and the same attributes
    async fn prepare_rename(&mut self, old: NodeHandle, tag: &str) -> Result<NodeHandle, RemoteError> {
        let old_front = self.walker.describe(old).await?;
        let new = self.walker.create_element(tag).await?.handle;

        let ops: Vec<AttributeOp> = old_front
            .attributes
            .iter()
            .map(|attr| AttributeOp::Set {
                name: attr.name.clone(),
                value: attr.value.clone(),
            })
            .collect();
        if !ops.is_empty() {
            self.walker.modify_attributes(new, &ops).await?;
        }

        self.walker.retain_node(old).await?;
        self.walker.retain_node(new).await?;

        let new_front = self.walker.describe(new).await?;
        self.mirror.import_node(new_front);
        Ok(new)
    }

    /// Remove `handle` from the document. The document, its root element
    /// and the doctype are never removed.
    #[instrument(skip(self))]
    pub async fn delete_node(&mut self, handle: NodeHandle) -> MarkupResult<bool> {
        let front = self.walker.describe(handle).await?;
        let Some(parent) = front.parent.filter(|_| !front.is_structural_root()) else {
            info!(node = %handle, "Refusing to delete structural node");
            return Ok(false);
        };

        self.walker.retain_node(handle).await?;
        let before = self.walker.remove_node(handle).await?;
        self.undo.push_described(
            EditAction::RemoveNode { node: handle },
            EditAction::InsertNode {
                node: handle,
                parent,
                before,
            },
            "Delete node",
        );

        if self.selected() == Some(handle) {
            let parent_is_root = self
                .mirror
                .container(parent)
                .map_or(true, |node| node.is_root);
            if parent_is_root {
                self.clear_selection().await;
            } else {
                self.select(parent, false).await?;
            }
        }

        self.pump_mutations().await;
        Ok(true)
    }

    #[instrument(skip(self))]
    pub async fn toggle_hidden(&mut self, handle: NodeHandle) -> MarkupResult<()> {
        let front = self.walker.describe(handle).await?;
        if front.hidden {
            self.walker.unhide_node(handle).await?;
        } else {
            self.walker.hide_node(handle).await?;
        }
        self.pump_mutations().await;
        Ok(())
    }

    /// Revert the most recent edit. Returns false when there is nothing to
    /// undo.
    #[instrument(skip(self))]
    pub async fn undo(&mut self) -> MarkupResult<bool> {
        let Some(entry) = self.undo.undo_entry() else {
            return Ok(false);
        };
        let action = entry.revert.clone();
        self.run_history_action(&action).await?;
        Ok(true)
    }

    #[instrument(skip(self))]
    pub async fn redo(&mut self) -> MarkupResult<bool> {
        let Some(entry) = self.undo.redo_entry() else {
            return Ok(false);
        };
        let action = entry.apply.clone();
        self.run_history_action(&action).await?;
        Ok(true)
    }

    async fn run_history_action(&mut self, action: &EditAction) -> MarkupResult<()> {
        let result = self.execute(action).await;
        self.pump_mutations().await;
        Ok(result?)
    }

    async fn execute(&mut self, action: &EditAction) -> Result<(), RemoteError> {
        debug!(action = action.name(), node = %action.target(), "Executing edit");
        match action {
            EditAction::ModifyAttributes { node, batch } => {
                self.walker.modify_attributes(*node, batch.ops()).await
            }
            EditAction::SetNodeValue { node, value } => {
                self.walker.set_node_value(*node, value).await
            }
            EditAction::ReplaceElement { old, new } => self.replace_element(*old, *new).await,
            EditAction::RemoveNode { node } => self.walker.remove_node(*node).await.map(|_| ()),
            EditAction::InsertNode {
                node,
                parent,
                before,
            } => self.walker.insert_before(*node, *parent, *before).await,
        }
    }

    /// Put `new` where `old` is, move `old`'s children into it and carry
    /// the expanded and selected state over
    async fn replace_element(&mut self, old: NodeHandle, new: NodeHandle) -> Result<(), RemoteError> {
        let Some(parent) = self.walker.parent(old).await? else {
            return Err(RemoteError::HierarchyRequest(format!("{old} is not attached")));
        };
        self.walker.insert_before(new, parent.handle, Some(old)).await?;

        let children = self.walker.children(old, ChildrenOptions::default()).await?;
        for child in children.nodes {
            self.walker.insert_before(child.handle, new, None).await?;
        }
        self.walker.remove_node(old).await?;

        let new_id = match self.mirror.id_for(new) {
            Some(id) => id,
            None => {
                let front = self.walker.describe(new).await?;
                self.mirror.import_node(front)
            }
        };
        let expanded = self.mirror.container(old).is_some_and(|node| node.expanded);
        if expanded {
            if let Err(err) = self.mirror.expand(new_id) {
                debug!(error = %err, "Cannot expand replacement");
            }
        }
        if self.selected() == Some(old) && self.selection.select(&mut self.mirror, new_id, false) {
            self.sync_selection(Some(new)).await;
        }
        Ok(())
    }

    pub fn rows(&self) -> Vec<Row> {
        self.mirror.rows()
    }

    pub fn render(&self) -> String {
        self.mirror.render()
    }

    pub fn take_events(&mut self) -> Vec<MarkupEvent> {
        std::mem::take(&mut self.events)
    }

    /// Drop the whole mirror, selection and history
    pub fn teardown(&mut self) {
        self.mirror.teardown();
        self.selection.reset();
        self.undo.clear();
        self.unsettled = 0;
        self.events.clear();
        self.mutations.close();
    }
}
