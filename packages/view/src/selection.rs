//! # Selection
//!
//! Which container is current, and keyboard navigation over the visible
//! rows. Navigation only computes the target; the view selects it and then
//! makes sure the path to it is rendered.

use crate::mirror::{MirrorId, TreeMirror};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    None,
    Selected(MirrorId),
}

#[derive(Debug, Default)]
pub struct SelectionController {
    state: Selection,

    /// Container whose editor has input focus
    focused: Option<MirrorId>,
}

impl SelectionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> Selection {
        self.state
    }

    pub fn selected(&self) -> Option<MirrorId> {
        match self.state {
            Selection::Selected(id) => Some(id),
            Selection::None => None,
        }
    }

    pub fn focused(&self) -> Option<MirrorId> {
        self.focused
    }

    /// Select `id`, deselecting the previous container. Returns whether
    /// the selection changed.
    pub fn select(&mut self, mirror: &mut TreeMirror, id: MirrorId, focus: bool) -> bool {
        let Some(handle) = mirror.get(id).map(|node| node.front.handle) else {
            return false;
        };
        if focus {
            self.focused = Some(id);
        }
        if self.state == Selection::Selected(id) {
            return false;
        }

        if let Selection::Selected(previous) = self.state {
            mirror.set_selected(previous, false);
        }
        mirror.set_selected(id, true);
        mirror.set_anchor(Some(handle));
        self.state = Selection::Selected(id);
        trace!(node = %handle, focus, "Selected");
        true
    }

    /// Back to no selection. Returns whether anything was selected.
    pub fn clear(&mut self, mirror: &mut TreeMirror) -> bool {
        self.focused = None;
        let Selection::Selected(previous) = std::mem::take(&mut self.state) else {
            return false;
        };
        mirror.set_selected(previous, false);
        mirror.set_anchor(None);
        true
    }

    /// Forget containers dropped by a teardown
    pub fn reset(&mut self) {
        self.state = Selection::None;
        self.focused = None;
    }

    pub fn next(&self, mirror: &TreeMirror) -> Option<MirrorId> {
        self.step(mirror, 1)
    }

    pub fn previous(&self, mirror: &TreeMirror) -> Option<MirrorId> {
        self.step(mirror, -1)
    }

    pub fn page_forward(&self, mirror: &TreeMirror, rows: usize) -> Option<MirrorId> {
        self.step(mirror, isize::try_from(rows).unwrap_or(isize::MAX))
    }

    pub fn page_back(&self, mirror: &TreeMirror, rows: usize) -> Option<MirrorId> {
        self.step(mirror, -isize::try_from(rows).unwrap_or(isize::MAX))
    }

    /// First visible row
    pub fn home(&self, mirror: &TreeMirror) -> Option<MirrorId> {
        mirror.visible_order().first().copied()
    }

    /// Visible container the selected one is rendered under
    pub fn parent(&self, mirror: &TreeMirror) -> Option<MirrorId> {
        let parent = mirror.get(self.selected()?)?.attached_to?;
        match mirror.get(parent) {
            Some(node) if !node.is_root => Some(parent),
            _ => None,
        }
    }

    pub fn first_child(&self, mirror: &TreeMirror) -> Option<MirrorId> {
        let id = self.selected()?;
        let node = mirror.get(id)?;
        if !node.expanded {
            return None;
        }
        node.children
            .iter()
            .copied()
            .find(|child| mirror.get(*child).and_then(|c| c.attached_to) == Some(id))
    }

    /// Row `offset` away from the selection, clamped to the visible rows.
    /// Without a selection, moving forward starts at the first row.
    ///
    /// A selection inside a collapsed subtree moves as if from its place
    /// in the document: back lands on the closest visible ancestor, forward
    /// goes past that ancestor's subtree.
    fn step(&self, mirror: &TreeMirror, offset: isize) -> Option<MirrorId> {
        let order = mirror.visible_order();
        let last = order.len().checked_sub(1)?;

        let Some(selected) = self.selected() else {
            return if offset > 0 { order.first().copied() } else { None };
        };
        let (index, hidden) = match order.iter().position(|row| *row == selected) {
            Some(index) => (index, false),
            None => (visible_ancestor(mirror, &order, selected)?, true),
        };

        let target = match (offset.is_negative(), hidden) {
            (true, false) => index.saturating_sub(offset.unsigned_abs()),
            (true, true) => index.saturating_sub(offset.unsigned_abs() - 1),
            (false, _) => index.saturating_add(offset.unsigned_abs()).min(last),
        };

        (hidden || target != index).then(|| order[target])
    }
}

/// Position in `order` of the closest rendered ancestor of `id`
fn visible_ancestor(mirror: &TreeMirror, order: &[MirrorId], id: MirrorId) -> Option<usize> {
    let mut current = id;
    for _ in 0..mirror.len() {
        current = mirror.parent_of(current)?;
        if let Some(index) = order.iter().position(|row| *row == current) {
            return Some(index);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mirror::RefreshOptions;
    use markup_common::{ChildrenWindow, NodeFront, NodeHandle, NodeKind};

    fn front(handle: u64, kind: NodeKind, parent: Option<u64>, children: usize) -> NodeFront {
        NodeFront {
            handle: NodeHandle(handle),
            kind,
            name: "div".into(),
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

    fn render(mirror: &mut TreeMirror, id: MirrorId, kids: Vec<NodeFront>) {
        let ticket = mirror
            .refresh_children(id, RefreshOptions::expand())
            .unwrap()
            .ticket()
            .unwrap();
        mirror
            .complete_fetch(
                ticket,
                Ok(ChildrenWindow {
                    nodes: kids,
                    has_first: true,
                    has_last: true,
                }),
            )
            .unwrap();
    }

    /// document
    /// └─ 2
    ///    ├─ 3
    ///    │  └─ 5
    ///    └─ 4
    fn tree() -> (TreeMirror, Vec<MirrorId>) {
        let mut mirror = TreeMirror::new(10);
        let root = mirror.import_node(front(1, NodeKind::Document, None, 1));
        render(&mut mirror, root, vec![front(2, NodeKind::Element, Some(1), 2)]);
        let two = mirror.id_for(NodeHandle(2)).unwrap();
        render(
            &mut mirror,
            two,
            vec![
                front(3, NodeKind::Element, Some(2), 1),
                front(4, NodeKind::Element, Some(2), 0),
            ],
        );
        let three = mirror.id_for(NodeHandle(3)).unwrap();
        render(&mut mirror, three, vec![front(5, NodeKind::Element, Some(3), 0)]);

        let ids = [2, 3, 5, 4]
            .iter()
            .map(|h| mirror.id_for(NodeHandle(*h)).unwrap())
            .collect();
        (mirror, ids)
    }

    #[test]
    fn test_select_marks_container_and_anchor() {
        let (mut mirror, ids) = tree();
        let mut selection = SelectionController::new();

        assert!(selection.select(&mut mirror, ids[0], false));
        assert!(!selection.select(&mut mirror, ids[0], true));
        assert_eq!(selection.focused(), Some(ids[0]));

        assert!(selection.select(&mut mirror, ids[1], false));
        assert!(!mirror.get(ids[0]).unwrap().selected);
        assert!(mirror.get(ids[1]).unwrap().selected);
        assert_eq!(mirror.anchor(), Some(NodeHandle(3)));

        assert!(selection.clear(&mut mirror));
        assert!(!mirror.get(ids[1]).unwrap().selected);
        assert_eq!(selection.state(), Selection::None);
        assert!(!selection.clear(&mut mirror));
    }

    #[test]
    fn test_next_and_previous_follow_preorder() {
        let (mut mirror, ids) = tree();
        let mut selection = SelectionController::new();

        assert_eq!(selection.next(&mirror), Some(ids[0]));
        assert_eq!(selection.previous(&mirror), None);

        selection.select(&mut mirror, ids[1], false);
        assert_eq!(selection.next(&mirror), Some(ids[2]));
        assert_eq!(selection.previous(&mirror), Some(ids[0]));

        selection.select(&mut mirror, ids[3], false);
        assert_eq!(selection.next(&mirror), None);
    }

    #[test]
    fn test_collapsed_subtrees_are_skipped() {
        let (mut mirror, ids) = tree();
        let mut selection = SelectionController::new();
        mirror.collapse(ids[1]).unwrap();

        selection.select(&mut mirror, ids[1], false);
        assert_eq!(selection.next(&mirror), Some(ids[3]));
        assert_eq!(selection.first_child(&mirror), None);
    }

    #[test]
    fn test_stepping_out_of_a_collapsed_subtree() {
        let (mut mirror, ids) = tree();
        let mut selection = SelectionController::new();
        selection.select(&mut mirror, ids[2], false);
        mirror.collapse(ids[1]).unwrap();

        assert_eq!(selection.next(&mirror), Some(ids[3]));
        assert_eq!(selection.previous(&mirror), Some(ids[1]));
        assert_eq!(selection.page_back(&mirror, 2), Some(ids[0]));
    }

    #[test]
    fn test_huge_pages_do_not_overflow() {
        let (mut mirror, ids) = tree();
        let mut selection = SelectionController::new();
        selection.select(&mut mirror, ids[1], false);

        assert_eq!(selection.page_forward(&mirror, usize::MAX), Some(ids[3]));
        assert_eq!(selection.page_back(&mirror, usize::MAX), Some(ids[0]));
    }

    #[test]
    fn test_paging_clamps_to_ends() {
        let (mut mirror, ids) = tree();
        let mut selection = SelectionController::new();
        selection.select(&mut mirror, ids[1], false);

        assert_eq!(selection.page_forward(&mirror, 10), Some(ids[3]));
        assert_eq!(selection.page_back(&mirror, 10), Some(ids[0]));
        assert_eq!(selection.page_forward(&mirror, 2), Some(ids[3]));
    }

    #[test]
    fn test_parent_first_child_and_home() {
        let (mut mirror, ids) = tree();
        let mut selection = SelectionController::new();

        selection.select(&mut mirror, ids[2], false);
        assert_eq!(selection.parent(&mirror), Some(ids[1]));
        assert_eq!(selection.home(&mirror), Some(ids[0]));

        selection.select(&mut mirror, ids[1], false);
        assert_eq!(selection.first_child(&mirror), Some(ids[2]));

        // Top-level rows have no visible parent
        selection.select(&mut mirror, ids[0], false);
        assert_eq!(selection.parent(&mirror), None);
    }
}
