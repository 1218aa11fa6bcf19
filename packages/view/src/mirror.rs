//! # Tree Mirror
//!
//! A local, partial, lazily populated copy of the remote document tree.
//!
//! ## Design
//!
//! - One container per remote node, kept in a generation-checked arena and
//!   found through a handle → id map. Containers are only dropped on
//!   teardown.
//! - A container renders a window of at most `page_size` children around
//!   the start, the end or a centered child.
//! - Collapsed containers are never fetched; they stay dirty until they
//!   are expanded.
//! - The mirror never awaits. A refresh that needs the remote side queues a
//!   [`FetchRequest`]; the driver runs it and hands the result back through
//!   [`TreeMirror::complete_fetch`].
//! - At most one fetch per container is in flight. A change reported while
//!   it is in flight makes the result stale: it is dropped and the children
//!   are fetched again.

use crate::container::{MirrorNode, PageLimit, ShowMore};
use crate::errors::MirrorError;
use crate::fetch_state::{FetchEffect, FetchEvent, FetchTicket};
use markup_common::{
    ChildrenOptions, ChildrenWindow, MutationKind, MutationRecord, NodeFront, NodeHandle,
    NodeKind, RemoteError,
};
use slotmap::{new_key_type, SlotMap};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, trace};

new_key_type! {
    /// Id of a container in the mirror
    pub struct MirrorId;
}

/// A children fetch the driver has to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub ticket: FetchTicket,
    pub node: NodeHandle,
    pub options: ChildrenOptions,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshOptions {
    /// Expand the container once its children are rendered
    pub expand: bool,

    /// Child the window should be centered on. Defaults to the child on the
    /// path to the current selection.
    pub center_on: Option<NodeHandle>,
}

impl RefreshOptions {
    pub fn expand() -> Self {
        Self {
            expand: true,
            center_on: None,
        }
    }
}

/// Result of [`TreeMirror::refresh_children`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresh {
    /// Rendered children are up to date
    Ready,
    /// Collapsed; the container stays dirty until it is expanded
    Deferred,
    /// Waiting on a fetch
    Pending(FetchTicket),
}

impl Refresh {
    pub fn ticket(self) -> Option<FetchTicket> {
        match self {
            Refresh::Pending(ticket) => Some(ticket),
            Refresh::Ready | Refresh::Deferred => None,
        }
    }
}

/// Result of [`TreeMirror::complete_fetch`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Rendered,
    /// The result was stale and the children are being fetched again
    Refetched(Refresh),
    /// Nobody was waiting on this ticket
    Discarded,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationOutcome {
    /// Containers whose attributes or value changed
    pub updated: Vec<MirrorId>,
    /// Containers whose children changed
    pub invalidated: Vec<MirrorId>,
    /// Fetches the invalidated containers are waiting on
    pub tickets: Vec<FetchTicket>,
    /// Records about nodes that were never imported
    pub ignored: usize,
}

/// One line of the rendered tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Row {
    Node {
        id: MirrorId,
        depth: usize,
        text: String,
        expandable: bool,
        expanded: bool,
        selected: bool,
        hidden: bool,
    },
    ShowMore {
        container: MirrorId,
        depth: usize,
        more: ShowMore,
    },
}

impl Row {
    pub fn depth(&self) -> usize {
        match self {
            Row::Node { depth, .. } | Row::ShowMore { depth, .. } => *depth,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingFetch {
    container: MirrorId,
    expand: bool,
    center: Option<NodeHandle>,
}

#[derive(Debug)]
pub struct TreeMirror {
    nodes: SlotMap<MirrorId, MirrorNode>,
    by_handle: HashMap<NodeHandle, MirrorId>,
    pending: HashMap<FetchTicket, PendingFetch>,
    outbox: VecDeque<FetchRequest>,
    next_ticket: u64,
    page_size: usize,
    root: Option<MirrorId>,

    /// Node windows are centered on when no center is requested
    anchor: Option<NodeHandle>,

    highlighted: Option<MirrorId>,
}

impl TreeMirror {
    pub fn new(page_size: usize) -> Self {
        Self {
            nodes: SlotMap::with_key(),
            by_handle: HashMap::new(),
            pending: HashMap::new(),
            outbox: VecDeque::new(),
            next_ticket: 0,
            page_size: page_size.max(1),
            root: None,
            anchor: None,
            highlighted: None,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// The document container
    pub fn root(&self) -> Option<MirrorId> {
        self.root
    }

    pub fn get(&self, id: MirrorId) -> Option<&MirrorNode> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: MirrorId) -> Option<&mut MirrorNode> {
        self.nodes.get_mut(id)
    }

    pub fn id_for(&self, handle: NodeHandle) -> Option<MirrorId> {
        self.by_handle.get(&handle).copied()
    }

    pub fn container(&self, handle: NodeHandle) -> Option<&MirrorNode> {
        self.id_for(handle).and_then(|id| self.nodes.get(id))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn anchor(&self) -> Option<NodeHandle> {
        self.anchor
    }

    pub fn set_anchor(&mut self, anchor: Option<NodeHandle>) {
        self.anchor = anchor;
    }

    /// Container of `id`'s remote parent, if that was imported
    pub fn parent_of(&self, id: MirrorId) -> Option<MirrorId> {
        let parent = self.nodes.get(id)?.front.parent?;
        self.id_for(parent)
    }

    /// Container for `front`, created on first use. A new container starts
    /// dirty and immediately refreshes its children.
    pub fn import_node(&mut self, front: NodeFront) -> MirrorId {
        if let Some(&id) = self.by_handle.get(&front.handle) {
            return id;
        }

        let handle = front.handle;
        let is_root = front.kind == NodeKind::Document && self.root.is_none();
        let id = self.nodes.insert(MirrorNode::new(front, is_root));
        self.by_handle.insert(handle, id);
        if is_root {
            self.root = Some(id);
        }
        trace!(node = %handle, is_root, "Imported node");

        if let Err(err) = self.refresh_children(id, RefreshOptions::default()) {
            debug!(node = %handle, error = %err, "Initial refresh failed");
        }
        id
    }

    /// Bring `id`'s rendered children up to date
    pub fn refresh_children(
        &mut self,
        id: MirrorId,
        options: RefreshOptions,
    ) -> Result<Refresh, MirrorError> {
        let fallback_center = match options.center_on {
            Some(_) => None,
            None => self.path_child(id),
        };
        let page_size = self.page_size;
        let node = self.nodes.get_mut(id).ok_or(MirrorError::StaleContainer(id))?;

        if let Some(ticket) = node.fetch.pending() {
            if options.expand {
                if let Some(pending) = self.pending.get_mut(&ticket) {
                    pending.expand = true;
                }
            }
            return Ok(Refresh::Pending(ticket));
        }

        if !node.fetch.is_dirty() {
            if options.expand {
                node.expanded = true;
            }
            return Ok(Refresh::Ready);
        }

        if !node.has_children() {
            let stale = std::mem::take(&mut node.children);
            node.has_first_child = true;
            node.has_last_child = true;
            node.fetch = node.fetch.transition(FetchEvent::Settle).0;
            self.release_children(id, stale);
            return Ok(Refresh::Ready);
        }

        if !node.expanded && !options.expand {
            return Ok(Refresh::Deferred);
        }

        self.next_ticket += 1;
        let ticket = FetchTicket(self.next_ticket);
        node.fetch = node.fetch.transition(FetchEvent::Issue(ticket)).0;

        let center = options.center_on.or(fallback_center);
        let request = FetchRequest {
            ticket,
            node: node.front.handle,
            options: ChildrenOptions {
                max_nodes: node.max_children.max_nodes(page_size),
                center,
            },
        };
        debug!(
            node = %request.node,
            ticket = ticket.0,
            max_nodes = ?request.options.max_nodes,
            "Fetching children"
        );

        self.pending.insert(
            ticket,
            PendingFetch {
                container: id,
                expand: options.expand,
                center,
            },
        );
        self.outbox.push_back(request);
        Ok(Refresh::Pending(ticket))
    }

    /// Fetches queued since the last call
    pub fn take_requests(&mut self) -> Vec<FetchRequest> {
        self.outbox.drain(..).collect()
    }

    /// Hand back the result of a fetch. A failure leaves the rendered
    /// children as they were and is returned for the caller to log.
    pub fn complete_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<ChildrenWindow, RemoteError>,
    ) -> Result<Completion, MirrorError> {
        let Some(pending) = self.pending.remove(&ticket) else {
            trace!(ticket = ticket.0, "Completion for unknown fetch");
            return Ok(Completion::Discarded);
        };
        let id = pending.container;
        let node = self.nodes.get_mut(id).ok_or(MirrorError::StaleContainer(id))?;

        let event = match &result {
            Ok(_) => FetchEvent::Complete(ticket),
            Err(_) => FetchEvent::Fail(ticket),
        };
        let (state, effect) = node.fetch.transition(event);
        node.fetch = state;
        let handle = node.front.handle;

        match (effect, result) {
            (FetchEffect::Render, Ok(window)) => {
                self.render_window(id, window, pending.expand);
                Ok(Completion::Rendered)
            }
            (FetchEffect::Refetch, _) => {
                debug!(node = %handle, ticket = ticket.0, "Children changed during fetch");
                let refresh = self.refresh_children(
                    id,
                    RefreshOptions {
                        expand: pending.expand,
                        center_on: pending.center,
                    },
                )?;
                Ok(Completion::Refetched(refresh))
            }
            (FetchEffect::Abandon, Err(source)) => {
                debug!(node = %handle, ticket = ticket.0, "Children fetch abandoned");
                Err(MirrorError::Remote {
                    node: handle,
                    source,
                })
            }
            _ => Ok(Completion::Discarded),
        }
    }

    fn render_window(&mut self, id: MirrorId, window: ChildrenWindow, expand: bool) {
        let mut children = Vec::with_capacity(window.nodes.len());
        for front in window.nodes {
            let child = match self.by_handle.get(&front.handle) {
                Some(&child) => {
                    self.update_front(front);
                    child
                }
                None => self.import_node(front),
            };
            children.push(child);
        }

        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        let stale = std::mem::replace(&mut node.children, children.clone());
        node.has_first_child = window.has_first;
        node.has_last_child = window.has_last;
        if expand {
            node.expanded = true;
        }
        trace!(
            node = %node.front.handle,
            children = children.len(),
            complete = node.is_complete(),
            "Rendered children"
        );

        let stale = stale.into_iter().filter(|c| !children.contains(c)).collect();
        self.release_children(id, stale);
        for child in children {
            if let Some(node) = self.nodes.get_mut(child) {
                node.attached_to = Some(id);
            }
        }
    }

    /// Forget that `children` are rendered under `parent`, unless they have
    /// been rendered somewhere else since
    fn release_children(&mut self, parent: MirrorId, children: Vec<MirrorId>) {
        for child in children {
            if let Some(node) = self.nodes.get_mut(child) {
                if node.attached_to == Some(parent) {
                    node.attached_to = None;
                }
            }
        }
    }

    pub fn invalidate(&mut self, id: MirrorId) -> Result<(), MirrorError> {
        let node = self.nodes.get_mut(id).ok_or(MirrorError::StaleContainer(id))?;
        node.fetch = node.fetch.transition(FetchEvent::Invalidate).0;
        Ok(())
    }

    pub fn show_more(&self, id: MirrorId) -> Option<ShowMore> {
        self.nodes.get(id)?.show_more()
    }

    /// Drop the paging cap of `id` and fetch every child
    pub fn show_all(&mut self, id: MirrorId) -> Result<Refresh, MirrorError> {
        self.set_page_limit(id, PageLimit::Unbounded)?;
        self.refresh_children(id, RefreshOptions::default())
    }

    /// Change how many children `id` fetches; the container is re-dirtied
    pub fn set_page_limit(&mut self, id: MirrorId, limit: PageLimit) -> Result<(), MirrorError> {
        let node = self.nodes.get_mut(id).ok_or(MirrorError::StaleContainer(id))?;
        node.max_children = limit;
        node.fetch = node.fetch.transition(FetchEvent::Invalidate).0;
        Ok(())
    }

    /// Classify a batch from the mutation feed. Callers refresh the fronts
    /// of the targets first so child counts are current.
    pub fn on_mutations(&mut self, records: &[MutationRecord]) -> MutationOutcome {
        let mut outcome = MutationOutcome::default();

        for record in records {
            let target = match record.kind {
                MutationKind::DocumentUnload => match record.target_parent {
                    Some(parent) => parent,
                    None => {
                        outcome.ignored += 1;
                        continue;
                    }
                },
                _ => record.target,
            };
            let Some(&id) = self.by_handle.get(&target) else {
                outcome.ignored += 1;
                continue;
            };

            match record.kind {
                MutationKind::Attributes | MutationKind::CharacterData => {
                    push_unique(&mut outcome.updated, id);
                }
                MutationKind::ChildList | MutationKind::DocumentUnload => {
                    if let Some(node) = self.nodes.get_mut(id) {
                        node.fetch = node.fetch.transition(FetchEvent::Invalidate).0;
                    }
                    push_unique(&mut outcome.invalidated, id);
                }
            }
        }

        for id in outcome.invalidated.clone() {
            match self.refresh_children(id, RefreshOptions::default()) {
                Ok(Refresh::Pending(ticket)) => push_unique(&mut outcome.tickets, ticket),
                Ok(_) => {}
                Err(err) => debug!(error = %err, "Skipping refresh"),
            }
        }

        debug!(
            records = records.len(),
            updated = outcome.updated.len(),
            invalidated = outcome.invalidated.len(),
            ignored = outcome.ignored,
            "Classified mutations"
        );
        outcome
    }

    /// Replace the cached metadata of a mapped node
    pub fn update_front(&mut self, front: NodeFront) -> Option<MirrorId> {
        let id = self.id_for(front.handle)?;
        let node = self.nodes.get_mut(id)?;
        node.editor.update(&front);
        node.front = front;
        Some(id)
    }

    /// No fetch is in flight
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Make sure every ancestor of `handle` is expanded and renders the
    /// path down to it. Returns the fetches this started.
    ///
    /// Ancestors that were never imported stop the walk; import them first.
    pub fn ensure_visible(&mut self, handle: NodeHandle) -> Vec<FetchTicket> {
        let mut tickets = Vec::new();
        let mut seen = HashSet::new();
        let mut current = handle;

        while seen.insert(current) {
            let Some(id) = self.id_for(current) else {
                break;
            };
            let Some(node) = self.nodes.get(id) else {
                break;
            };
            if node.is_root {
                break;
            }
            let attached_to = node.attached_to;
            let Some(parent_handle) = node.front.parent else {
                break;
            };
            let Some(parent_id) = self.id_for(parent_handle) else {
                break;
            };
            let Some(parent) = self.nodes.get(parent_id) else {
                break;
            };

            let in_window = attached_to == Some(parent_id) && parent.children.contains(&id);
            if !in_window || !parent.expanded {
                if !in_window {
                    if let Err(err) = self.invalidate(parent_id) {
                        debug!(error = %err, "Cannot invalidate ancestor");
                        break;
                    }
                }
                let options = RefreshOptions {
                    expand: true,
                    center_on: Some(current),
                };
                match self.refresh_children(parent_id, options) {
                    Ok(refresh) => tickets.extend(refresh.ticket()),
                    Err(err) => {
                        debug!(error = %err, "Cannot refresh ancestor");
                        break;
                    }
                }
            }

            current = parent_handle;
        }

        tickets
    }

    /// Every ancestor of `id` is expanded and renders the path to it
    pub fn is_path_visible(&self, id: MirrorId) -> bool {
        let mut current = id;
        for _ in 0..=self.nodes.len() {
            let Some(node) = self.nodes.get(current) else {
                return false;
            };
            if node.is_root {
                return true;
            }
            let Some(parent_id) = node.attached_to else {
                return false;
            };
            match self.nodes.get(parent_id) {
                Some(parent) if parent.expanded && parent.children.contains(&current) => {
                    current = parent_id;
                }
                _ => return false,
            }
        }
        false
    }

    pub fn expand(&mut self, id: MirrorId) -> Result<Refresh, MirrorError> {
        self.refresh_children(id, RefreshOptions::expand())
    }

    /// Collapse `id`. The root cannot be collapsed.
    pub fn collapse(&mut self, id: MirrorId) -> Result<(), MirrorError> {
        let node = self.nodes.get_mut(id).ok_or(MirrorError::StaleContainer(id))?;
        if !node.is_root {
            node.expanded = false;
        }
        Ok(())
    }

    pub fn set_selected(&mut self, id: MirrorId, selected: bool) -> bool {
        match self.nodes.get_mut(id) {
            Some(node) => {
                node.selected = selected;
                node.editor.set_selected(selected);
                true
            }
            None => false,
        }
    }

    pub fn set_highlighted(&mut self, id: Option<MirrorId>) {
        if let Some(previous) = self.highlighted.take() {
            if let Some(node) = self.nodes.get_mut(previous) {
                node.highlighted = false;
            }
        }
        if let Some(node) = id.and_then(|id| self.nodes.get_mut(id)) {
            node.highlighted = true;
            self.highlighted = id;
        }
    }

    pub fn highlighted(&self) -> Option<MirrorId> {
        self.highlighted
    }

    /// The displayed tree, one row per visible node plus "show more" rows
    pub fn rows(&self) -> Vec<Row> {
        let mut rows = Vec::new();
        if let Some(root) = self.root {
            let mut visited = HashSet::from([root]);
            self.collect_rows(root, 0, &mut visited, &mut rows);
        }
        rows
    }

    fn collect_rows(
        &self,
        id: MirrorId,
        depth: usize,
        visited: &mut HashSet<MirrorId>,
        rows: &mut Vec<Row>,
    ) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        let more = node.show_more();

        if let Some(more) = more.filter(|m| m.before) {
            rows.push(Row::ShowMore {
                container: id,
                depth,
                more,
            });
        }

        for &child_id in &node.children {
            let Some(child) = self.nodes.get(child_id) else {
                continue;
            };
            if child.attached_to != Some(id) || !visited.insert(child_id) {
                continue;
            }
            rows.push(Row::Node {
                id: child_id,
                depth,
                text: child.editor.render(),
                expandable: child.has_children(),
                expanded: child.expanded,
                selected: child.selected,
                hidden: child.front.hidden,
            });
            if child.expanded {
                self.collect_rows(child_id, depth + 1, visited, rows);
            }
        }

        if let Some(more) = more.filter(|m| m.after) {
            rows.push(Row::ShowMore {
                container: id,
                depth,
                more,
            });
        }
    }

    /// Visible containers in display order
    pub fn visible_order(&self) -> Vec<MirrorId> {
        self.rows()
            .into_iter()
            .filter_map(|row| match row {
                Row::Node { id, .. } => Some(id),
                Row::ShowMore { .. } => None,
            })
            .collect()
    }

    /// Indented text rendering of the visible tree
    pub fn render(&self) -> String {
        let mut out = String::new();
        for row in self.rows() {
            out.push_str(&"  ".repeat(row.depth()));
            match row {
                Row::Node {
                    text,
                    expandable,
                    expanded,
                    hidden,
                    ..
                } => {
                    let twisty = match (expandable, expanded) {
                        (false, _) => ' ',
                        (true, true) => '▾',
                        (true, false) => '▸',
                    };
                    out.push(twisty);
                    out.push(' ');
                    out.push_str(&text);
                    if hidden {
                        out.push_str(" (hidden)");
                    }
                }
                Row::ShowMore { more, .. } => {
                    out.push_str(&format!(
                        "… {} of {} children shown",
                        more.shown, more.total
                    ));
                }
            }
            out.push('\n');
        }
        out
    }

    /// Drop every container and forget all pending fetches
    pub fn teardown(&mut self) {
        debug!(containers = self.nodes.len(), "Tearing down mirror");
        self.nodes.clear();
        self.by_handle.clear();
        self.pending.clear();
        self.outbox.clear();
        self.root = None;
        self.anchor = None;
        self.highlighted = None;
    }

    /// Child of `id` on the path to the anchor node
    fn path_child(&self, id: MirrorId) -> Option<NodeHandle> {
        let target = self.nodes.get(id)?.front.handle;
        let mut current = self.anchor?;
        let mut seen = HashSet::new();

        while seen.insert(current) {
            let parent = self.container(current)?.front.parent?;
            if parent == target {
                return Some(current);
            }
            current = parent;
        }
        None
    }
}

fn push_unique<T: PartialEq>(items: &mut Vec<T>, item: T) {
    if !items.contains(&item) {
        items.push(item);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch_state::FetchState;

    fn node(handle: u64, kind: NodeKind, name: &str, parent: Option<u64>, children: usize) -> NodeFront {
        NodeFront {
            handle: NodeHandle(handle),
            kind,
            name: name.into(),
            attributes: vec![],
            short_value: String::new(),
            incomplete_value: false,
            num_children: children,
            parent: parent.map(NodeHandle),
            is_document_element: false,
            hidden: false,
            public_id: None,
            system_id: None,
        }
    }

    fn document(children: usize) -> NodeFront {
        node(1, NodeKind::Document, "#document", None, children)
    }

    fn element(handle: u64, parent: u64, children: usize) -> NodeFront {
        node(handle, NodeKind::Element, "div", Some(parent), children)
    }

    fn window(nodes: Vec<NodeFront>, has_first: bool, has_last: bool) -> ChildrenWindow {
        ChildrenWindow {
            nodes,
            has_first,
            has_last,
        }
    }

    /// Mirror with the document imported and its single child rendered
    fn mirror_with_body(body_children: usize) -> (TreeMirror, MirrorId, MirrorId) {
        let mut mirror = TreeMirror::new(10);
        let root = mirror.import_node(document(1));
        let request = mirror.take_requests().remove(0);
        mirror
            .complete_fetch(request.ticket, Ok(window(vec![element(2, 1, body_children)], true, true)))
            .unwrap();
        let body = mirror.id_for(NodeHandle(2)).unwrap();
        (mirror, root, body)
    }

    #[test]
    fn test_import_is_idempotent() {
        let mut mirror = TreeMirror::new(10);
        let first = mirror.import_node(document(0));
        let second = mirror.import_node(document(0));

        assert_eq!(first, second);
        assert_eq!(mirror.len(), 1);
        assert_eq!(mirror.root(), Some(first));
    }

    #[test]
    fn test_root_fetches_immediately() {
        let mut mirror = TreeMirror::new(10);
        let root = mirror.import_node(document(2));

        let requests = mirror.take_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].node, NodeHandle(1));
        assert_eq!(requests[0].options.max_nodes, Some(10));
        assert!(mirror.get(root).unwrap().expanded);
        assert!(!mirror.is_idle());
    }

    #[test]
    fn test_overlapping_refreshes_share_one_fetch() {
        let mut mirror = TreeMirror::new(10);
        let root = mirror.import_node(document(2));

        mirror.invalidate(root).unwrap();
        let a = mirror.refresh_children(root, RefreshOptions::default()).unwrap();
        let b = mirror.refresh_children(root, RefreshOptions::expand()).unwrap();

        assert_eq!(a, b);
        assert_eq!(mirror.take_requests().len(), 1);
        assert_eq!(mirror.pending_count(), 1);
    }

    #[test]
    fn test_collapsed_container_defers() {
        let (mut mirror, _, body) = mirror_with_body(3);

        assert!(mirror.take_requests().is_empty());
        assert!(mirror.get(body).unwrap().fetch.is_dirty());
        assert_eq!(
            mirror.refresh_children(body, RefreshOptions::default()).unwrap(),
            Refresh::Deferred
        );

        let ticket = mirror.expand(body).unwrap().ticket().unwrap();
        assert!(!mirror.get(body).unwrap().expanded);
        let kids = (3..6).map(|h| element(h, 2, 0)).collect();
        mirror.complete_fetch(ticket, Ok(window(kids, true, true))).unwrap();

        let body_node = mirror.get(body).unwrap();
        assert!(body_node.expanded);
        assert_eq!(body_node.children.len(), 3);
        assert_eq!(body_node.fetch, FetchState::Clean);
        assert!(mirror.is_idle());
    }

    #[test]
    fn test_childless_container_settles_without_fetch() {
        let (mut mirror, _, body) = mirror_with_body(0);

        assert_eq!(mirror.get(body).unwrap().fetch, FetchState::Clean);
        assert_eq!(mirror.expand(body).unwrap(), Refresh::Ready);
        assert!(mirror.take_requests().is_empty());
    }

    #[test]
    fn test_stale_result_is_refetched() {
        let (mut mirror, _, body) = mirror_with_body(2);
        let first = mirror.expand(body).unwrap().ticket().unwrap();
        mirror.take_requests();

        mirror.on_mutations(&[MutationRecord::child_list(NodeHandle(2))]);
        let completion = mirror
            .complete_fetch(first, Ok(window(vec![element(3, 2, 0), element(4, 2, 0)], true, true)))
            .unwrap();

        let Completion::Refetched(Refresh::Pending(second)) = completion else {
            panic!("expected a second fetch, got {completion:?}");
        };
        assert!(mirror.get(body).unwrap().children.is_empty());

        let requests = mirror.take_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].ticket, second);

        mirror
            .complete_fetch(second, Ok(window(vec![element(5, 2, 0)], true, true)))
            .unwrap();
        let body_node = mirror.get(body).unwrap();
        assert_eq!(body_node.children, vec![mirror.id_for(NodeHandle(5)).unwrap()]);
        assert!(body_node.expanded);
    }

    #[test]
    fn test_paging_and_show_all() {
        let (mut mirror, _, body) = mirror_with_body(25);
        let ticket = mirror.expand(body).unwrap().ticket().unwrap();
        let first_page = (100..110).map(|h| element(h, 2, 0)).collect();
        mirror.complete_fetch(ticket, Ok(window(first_page, true, false))).unwrap();

        let more = mirror.show_more(body).unwrap();
        assert!(!more.before);
        assert!(more.after);
        assert_eq!(more.total, 25);

        mirror.take_requests();
        let ticket = mirror.show_all(body).unwrap().ticket().unwrap();
        let request = mirror.take_requests().remove(0);
        assert_eq!(request.options.max_nodes, None);

        let all = (100..125).map(|h| element(h, 2, 0)).collect();
        mirror.complete_fetch(ticket, Ok(window(all, true, true))).unwrap();
        assert!(mirror.show_more(body).is_none());
        assert_eq!(mirror.get(body).unwrap().children.len(), 25);
    }

    #[test]
    fn test_failed_fetch_keeps_last_children() {
        let (mut mirror, root, body) = mirror_with_body(0);
        mirror.on_mutations(&[MutationRecord::child_list(NodeHandle(1))]);
        let request = mirror.take_requests().remove(0);

        let err = mirror
            .complete_fetch(request.ticket, Err(RemoteError::Disconnected))
            .unwrap_err();
        assert!(matches!(err, MirrorError::Remote { .. }));

        let root_node = mirror.get(root).unwrap();
        assert_eq!(root_node.children, vec![body]);
        assert!(root_node.fetch.is_dirty());
        assert!(mirror.is_idle());

        assert!(mirror.refresh_children(root, RefreshOptions::default()).unwrap().ticket().is_some());
    }

    #[test]
    fn test_mutations_for_unknown_nodes_are_ignored() {
        let (mut mirror, _, body) = mirror_with_body(0);
        let outcome = mirror.on_mutations(&[
            MutationRecord::attributes(NodeHandle(2), "class"),
            MutationRecord::attributes(NodeHandle(2), "id"),
            MutationRecord::child_list(NodeHandle(99)),
            MutationRecord::document_unload(NodeHandle(98), None),
        ]);

        assert_eq!(outcome.updated, vec![body]);
        assert!(outcome.invalidated.is_empty());
        assert_eq!(outcome.ignored, 2);
    }

    #[test]
    fn test_document_unload_invalidates_parent() {
        let (mut mirror, root, _) = mirror_with_body(0);
        let outcome =
            mirror.on_mutations(&[MutationRecord::document_unload(NodeHandle(50), Some(NodeHandle(1)))]);

        assert_eq!(outcome.invalidated, vec![root]);
        assert_eq!(outcome.tickets.len(), 1);
    }

    #[test]
    fn test_ensure_visible_centers_on_path() {
        let (mut mirror, _, body) = mirror_with_body(30);
        let ticket = mirror.expand(body).unwrap().ticket().unwrap();
        let first_page = (100..110).map(|h| element(h, 2, 0)).collect();
        mirror.complete_fetch(ticket, Ok(window(first_page, true, false))).unwrap();
        mirror.take_requests();

        // Known through another route but outside the rendered window
        mirror.import_node(element(125, 2, 0));
        let tickets = mirror.ensure_visible(NodeHandle(125));

        assert_eq!(tickets.len(), 1);
        let request = mirror.take_requests().remove(0);
        assert_eq!(request.node, NodeHandle(2));
        assert_eq!(request.options.center, Some(NodeHandle(125)));
    }

    #[test]
    fn test_ensure_visible_terminates_at_root() {
        let (mut mirror, _, _) = mirror_with_body(0);
        assert!(mirror.ensure_visible(NodeHandle(1)).is_empty());
        assert!(mirror.ensure_visible(NodeHandle(2)).is_empty());
        assert!(mirror.ensure_visible(NodeHandle(404)).is_empty());
    }

    #[test]
    fn test_window_centers_on_anchor_by_default() {
        let (mut mirror, _, body) = mirror_with_body(30);
        mirror.import_node(element(120, 2, 0));
        mirror.set_anchor(Some(NodeHandle(120)));

        mirror.expand(body).unwrap();
        let request = mirror.take_requests().remove(0);
        assert_eq!(request.options.center, Some(NodeHandle(120)));
    }

    #[test]
    fn test_root_cannot_collapse() {
        let (mut mirror, root, body) = mirror_with_body(0);
        mirror.collapse(root).unwrap();
        assert!(mirror.get(root).unwrap().expanded);
        assert!(mirror.is_path_visible(body));
    }

    #[test]
    fn test_moved_child_stays_attached_to_new_parent() {
        let (mut mirror, root, body) = mirror_with_body(1);
        let ticket = mirror.expand(body).unwrap().ticket().unwrap();
        mirror.complete_fetch(ticket, Ok(window(vec![element(3, 2, 0)], true, true))).unwrap();
        let child = mirror.id_for(NodeHandle(3)).unwrap();

        // Moved up to the document, then the old parent re-renders empty
        mirror.invalidate(root).unwrap();
        let ticket = mirror.refresh_children(root, RefreshOptions::default()).unwrap().ticket().unwrap();
        mirror
            .complete_fetch(ticket, Ok(window(vec![element(2, 1, 0), element(3, 1, 0)], true, true)))
            .unwrap();
        mirror.on_mutations(&[MutationRecord::child_list(NodeHandle(2))]);

        assert_eq!(mirror.get(child).unwrap().attached_to, Some(root));
        assert!(mirror.get(body).unwrap().children.is_empty());
        assert_eq!(mirror.visible_order().len(), 2);
    }

    #[test]
    fn test_render_rows() {
        let (mut mirror, _, body) = mirror_with_body(12);
        let ticket = mirror.expand(body).unwrap().ticket().unwrap();
        let page = (100..110).map(|h| element(h, 2, 0)).collect();
        mirror.complete_fetch(ticket, Ok(window(page, true, false))).unwrap();

        let rendered = mirror.render();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "▾ <div>");
        assert_eq!(lines[1], "    <div>");
        assert_eq!(lines.len(), 12);
        assert_eq!(lines[11], "  … 10 of 12 children shown");
    }

    #[test]
    fn test_highlight_moves() {
        let (mut mirror, root, body) = mirror_with_body(0);
        mirror.set_highlighted(Some(body));
        mirror.set_highlighted(Some(root));

        assert!(!mirror.get(body).unwrap().highlighted);
        assert!(mirror.get(root).unwrap().highlighted);
        mirror.set_highlighted(None);
        assert_eq!(mirror.highlighted(), None);
    }

    #[test]
    fn test_teardown_invalidates_ids() {
        let (mut mirror, root, _) = mirror_with_body(0);
        mirror.teardown();

        assert!(mirror.get(root).is_none());
        assert!(mirror.is_empty());
        assert_eq!(
            mirror.complete_fetch(FetchTicket(1), Ok(ChildrenWindow::default())),
            Ok(Completion::Discarded)
        );
    }
}
