use crate::fetch_state::FetchState;
use crate::mirror::MirrorId;
use markup_common::NodeFront;
use markup_editor::NodeEditor;

/// How many children a container fetches at once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageLimit {
    /// The mirror's page size
    #[default]
    Default,
    Limit(usize),
    /// Every child ("show all")
    Unbounded,
}

impl PageLimit {
    pub fn max_nodes(self, page_size: usize) -> Option<usize> {
        match self {
            PageLimit::Default => Some(page_size),
            PageLimit::Limit(n) => Some(n),
            PageLimit::Unbounded => None,
        }
    }
}

/// Local record of one remote node
#[derive(Debug, Clone)]
pub struct MirrorNode {
    pub front: NodeFront,
    pub editor: NodeEditor,

    /// Rendered children, a contiguous window of the real ones
    pub children: Vec<MirrorId>,

    pub expanded: bool,
    pub fetch: FetchState,
    pub max_children: PageLimit,
    pub selected: bool,
    pub highlighted: bool,

    /// The window starts at the first real child
    pub has_first_child: bool,
    /// The window ends at the last real child
    pub has_last_child: bool,

    /// Container whose rendered children include this one
    pub attached_to: Option<MirrorId>,

    pub is_root: bool,
}

impl MirrorNode {
    pub fn new(front: NodeFront, is_root: bool) -> Self {
        Self {
            editor: NodeEditor::for_node(&front),
            front,
            children: Vec::new(),
            expanded: is_root,
            fetch: FetchState::Dirty,
            max_children: PageLimit::Default,
            selected: false,
            highlighted: false,
            has_first_child: true,
            has_last_child: true,
            attached_to: None,
            is_root,
        }
    }

    pub fn has_children(&self) -> bool {
        self.front.has_children()
    }

    /// Rendered children cover every real child
    pub fn is_complete(&self) -> bool {
        self.has_first_child && self.has_last_child
    }

    pub fn show_more(&self) -> Option<ShowMore> {
        if self.is_complete() || !self.has_children() {
            return None;
        }
        Some(ShowMore {
            before: !self.has_first_child,
            after: !self.has_last_child,
            shown: self.children.len(),
            total: self.front.num_children,
        })
    }
}

/// "Show more" affordance of a paged container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShowMore {
    /// Children are missing before the window
    pub before: bool,
    /// Children are missing after the window
    pub after: bool,
    pub shown: usize,
    pub total: usize,
}
