//! In-process remote document.
//!
//! [`MemoryDocument`] implements [`RemoteWalker`] over a plain node tree.
//! It is the test double for the mirror and the backing store of the
//! command-line inspector. Every change it makes is reported through the
//! mutation feed, exactly like a live remote document would.

use crate::error::RemoteError;
use crate::names;
use crate::node::{
    Attribute, AttributeOp, ChildrenOptions, ChildrenWindow, LongString, MutationKind,
    MutationRecord, NodeFront, NodeHandle, NodeKind,
};
use crate::result::RemoteResult;
use crate::walker::RemoteWalker;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Number of characters of a node value sent inline with its metadata
pub const SHORT_VALUE_LENGTH: usize = 50;

/// Serializable description of a document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSpec {
    #[serde(default)]
    pub doctype: Option<DoctypeSpec>,
    pub root: NodeSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctypeSpec {
    pub name: String,
    #[serde(default)]
    pub public_id: Option<String>,
    #[serde(default)]
    pub system_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NodeSpec {
    Element {
        tag: String,
        #[serde(default)]
        attributes: Vec<(String, String)>,
        #[serde(default)]
        children: Vec<NodeSpec>,
    },
    Text {
        value: String,
    },
    Comment {
        value: String,
    },
}

impl NodeSpec {
    pub fn element(tag: &str, attributes: &[(&str, &str)], children: Vec<NodeSpec>) -> Self {
        NodeSpec::Element {
            tag: tag.to_string(),
            attributes: attributes
                .iter()
                .map(|(n, v)| (n.to_string(), v.to_string()))
                .collect(),
            children,
        }
    }

    pub fn text(value: &str) -> Self {
        NodeSpec::Text {
            value: value.to_string(),
        }
    }

    pub fn comment(value: &str) -> Self {
        NodeSpec::Comment {
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct MemNode {
    kind: NodeKind,
    name: String,
    attributes: Vec<Attribute>,
    value: String,
    children: Vec<NodeHandle>,
    parent: Option<NodeHandle>,
    hidden: bool,
    public_id: Option<String>,
    system_id: Option<String>,
}

impl MemNode {
    fn new(kind: NodeKind, name: &str) -> Self {
        Self {
            kind,
            name: name.to_string(),
            attributes: Vec::new(),
            value: String::new(),
            children: Vec::new(),
            parent: None,
            hidden: false,
            public_id: None,
            system_id: None,
        }
    }
}

/// The node tree behind a [`MemoryDocument`]
///
/// Changes made through these methods are queued as mutation records and
/// delivered to subscribers when the enclosing document call returns.
#[derive(Debug)]
pub struct DocumentTree {
    nodes: HashMap<NodeHandle, MemNode>,
    next_id: u64,
    document: NodeHandle,
    records: Vec<MutationRecord>,
}

impl DocumentTree {
    fn new() -> Self {
        let document = NodeHandle(1);
        let mut nodes = HashMap::new();
        nodes.insert(document, MemNode::new(NodeKind::Document, "#document"));
        Self {
            nodes,
            next_id: 2,
            document,
            records: Vec::new(),
        }
    }

    fn alloc(&mut self, node: MemNode) -> NodeHandle {
        let handle = NodeHandle(self.next_id);
        self.next_id += 1;
        self.nodes.insert(handle, node);
        handle
    }

    fn node(&self, handle: NodeHandle) -> RemoteResult<&MemNode> {
        self.nodes
            .get(&handle)
            .ok_or(RemoteError::NodeNotFound(handle))
    }

    fn node_mut(&mut self, handle: NodeHandle) -> RemoteResult<&mut MemNode> {
        self.nodes
            .get_mut(&handle)
            .ok_or(RemoteError::NodeNotFound(handle))
    }

    fn build(&mut self, spec: &NodeSpec) -> NodeHandle {
        match spec {
            NodeSpec::Element {
                tag,
                attributes,
                children,
            } => {
                let mut node = MemNode::new(NodeKind::Element, &tag.to_ascii_lowercase());
                for (name, value) in attributes {
                    if !node.attributes.iter().any(|a| &a.name == name) {
                        node.attributes.push(Attribute::new(name.clone(), value.clone()));
                    }
                }
                let handle = self.alloc(node);
                for child in children {
                    let child = self.build(child);
                    self.attach(handle, child, None);
                }
                handle
            }
            NodeSpec::Text { value } => {
                let mut node = MemNode::new(NodeKind::Text, "#text");
                node.value = value.clone();
                self.alloc(node)
            }
            NodeSpec::Comment { value } => {
                let mut node = MemNode::new(NodeKind::Comment, "#comment");
                node.value = value.clone();
                self.alloc(node)
            }
        }
    }

    fn attach(&mut self, parent: NodeHandle, child: NodeHandle, before: Option<usize>) {
        if let Some(p) = self.nodes.get_mut(&parent) {
            match before {
                Some(index) => p.children.insert(index.min(p.children.len()), child),
                None => p.children.push(child),
            }
        }
        if let Some(c) = self.nodes.get_mut(&child) {
            c.parent = Some(parent);
        }
    }

    fn detach(&mut self, child: NodeHandle) -> Option<NodeHandle> {
        let parent = self.nodes.get(&child)?.parent?;
        let siblings = &mut self.nodes.get_mut(&parent)?.children;
        let index = siblings.iter().position(|c| *c == child)?;
        siblings.remove(index);
        let next = siblings.get(index).copied();
        if let Some(c) = self.nodes.get_mut(&child) {
            c.parent = None;
        }
        self.records.push(MutationRecord::child_list(parent));
        next
    }

    fn is_ancestor_or_self(&self, ancestor: NodeHandle, mut node: NodeHandle) -> bool {
        loop {
            if node == ancestor {
                return true;
            }
            match self.nodes.get(&node).and_then(|n| n.parent) {
                Some(parent) => node = parent,
                None => return false,
            }
        }
    }

    pub fn document(&self) -> NodeHandle {
        self.document
    }

    pub fn front(&self, handle: NodeHandle) -> RemoteResult<NodeFront> {
        let node = self.node(handle)?;
        let has_value = matches!(node.kind, NodeKind::Text | NodeKind::Comment);
        let (short_value, incomplete_value) = if has_value {
            let count = node.value.chars().count();
            if count > SHORT_VALUE_LENGTH {
                (node.value.chars().take(SHORT_VALUE_LENGTH).collect(), true)
            } else {
                (node.value.clone(), false)
            }
        } else {
            (String::new(), false)
        };
        let is_document_element = node.kind == NodeKind::Element
            && node.parent == Some(self.document);

        Ok(NodeFront {
            handle,
            kind: node.kind,
            name: node.name.clone(),
            attributes: node.attributes.clone(),
            short_value,
            incomplete_value,
            num_children: node.children.len(),
            parent: node.parent,
            is_document_element,
            hidden: node.hidden,
            public_id: node.public_id.clone(),
            system_id: node.system_id.clone(),
        })
    }

    pub fn children_of(&self, handle: NodeHandle) -> Vec<NodeHandle> {
        self.nodes
            .get(&handle)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    pub fn find_by_id(&self, id: &str) -> Option<NodeHandle> {
        let mut stack = vec![self.document];
        while let Some(handle) = stack.pop() {
            let node = self.nodes.get(&handle)?;
            if node.attributes.iter().any(|a| a.name == "id" && a.value == id) {
                return Some(handle);
            }
            stack.extend(node.children.iter().rev());
        }
        None
    }

    /// Build `spec` and append it to `parent`
    pub fn append_child(&mut self, parent: NodeHandle, spec: &NodeSpec) -> RemoteResult<NodeHandle> {
        self.node(parent)?;
        let child = self.build(spec);
        self.attach(parent, child, None);
        self.records.push(MutationRecord::child_list(parent));
        Ok(child)
    }

    pub fn set_attribute(&mut self, node: NodeHandle, name: &str, value: &str) -> RemoteResult<()> {
        if !names::is_valid_attribute_name(name) {
            return Err(RemoteError::InvalidCharacter(name.to_string()));
        }
        let target = self.node_mut(node)?;
        match target.attributes.iter_mut().find(|a| a.name == name) {
            Some(attr) => attr.value = value.to_string(),
            None => target.attributes.push(Attribute::new(name, value)),
        }
        self.records.push(MutationRecord::attributes(node, name));
        Ok(())
    }

    pub fn remove_attribute(&mut self, node: NodeHandle, name: &str) -> RemoteResult<()> {
        let target = self.node_mut(node)?;
        let before = target.attributes.len();
        target.attributes.retain(|a| a.name != name);
        if target.attributes.len() != before {
            self.records.push(MutationRecord::attributes(node, name));
        }
        Ok(())
    }

    pub fn set_value(&mut self, node: NodeHandle, value: &str) -> RemoteResult<()> {
        let target = self.node_mut(node)?;
        if !matches!(target.kind, NodeKind::Text | NodeKind::Comment) {
            return Err(RemoteError::Failed(format!("{node} has no value")));
        }
        target.value = value.to_string();
        self.records.push(MutationRecord::character_data(node));
        Ok(())
    }

    pub fn remove(&mut self, node: NodeHandle) -> RemoteResult<Option<NodeHandle>> {
        self.node(node)?;
        Ok(self.detach(node))
    }

    pub fn insert_before(
        &mut self,
        node: NodeHandle,
        parent: NodeHandle,
        before: Option<NodeHandle>,
    ) -> RemoteResult<()> {
        self.node(node)?;
        self.node(parent)?;
        if self.is_ancestor_or_self(node, parent) {
            return Err(RemoteError::HierarchyRequest(format!(
                "{node} is an ancestor of {parent}"
            )));
        }
        if self.nodes.get(&node).and_then(|n| n.parent).is_some() {
            self.detach(node);
        }
        let index = match before {
            Some(sibling) => {
                let siblings = &self.node(parent)?.children;
                Some(
                    siblings
                        .iter()
                        .position(|c| *c == sibling)
                        .ok_or(RemoteError::NodeNotFound(sibling))?,
                )
            }
            None => None,
        };
        self.attach(parent, node, index);
        self.records.push(MutationRecord::child_list(parent));
        Ok(())
    }

    fn set_hidden(&mut self, node: NodeHandle, hidden: bool) -> RemoteResult<()> {
        self.node_mut(node)?.hidden = hidden;
        self.records.push(MutationRecord {
            kind: MutationKind::Attributes,
            target: node,
            target_parent: None,
            attribute_name: None,
        });
        Ok(())
    }

    fn window(&self, handle: NodeHandle, options: &ChildrenOptions) -> RemoteResult<ChildrenWindow> {
        let kids = &self.node(handle)?.children;
        let total = kids.len();
        let max = options.max_nodes.unwrap_or(total).max(1).min(total.max(1));
        let start = match options.center.and_then(|c| kids.iter().position(|k| *k == c)) {
            Some(center) => center.saturating_sub(max / 2).min(total.saturating_sub(max)),
            None => 0,
        };
        let end = (start + max).min(total);
        let nodes = kids[start..end]
            .iter()
            .map(|k| self.front(*k))
            .collect::<RemoteResult<Vec<_>>>()?;

        Ok(ChildrenWindow {
            nodes,
            has_first: start == 0,
            has_last: end == total,
        })
    }
}

type FetchHook = Box<dyn FnOnce(&mut DocumentTree) + Send>;

#[derive(Default)]
struct Bookkeeping {
    long_strings: HashMap<u64, String>,
    next_string: u64,
    retained: HashSet<NodeHandle>,
    selected: Option<NodeHandle>,
    children_fetches: usize,
    failing_fetches: usize,
    failing_edits: usize,
    during_fetch: Option<FetchHook>,
}

/// In-memory [`RemoteWalker`]
pub struct MemoryDocument {
    tree: Mutex<DocumentTree>,
    books: Mutex<Bookkeeping>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<Vec<MutationRecord>>>>,
}

impl MemoryDocument {
    pub fn from_spec(spec: &DocumentSpec) -> Self {
        let mut tree = DocumentTree::new();
        let document = tree.document;
        if let Some(doctype) = &spec.doctype {
            let mut node = MemNode::new(NodeKind::Doctype, &doctype.name);
            node.public_id = doctype.public_id.clone();
            node.system_id = doctype.system_id.clone();
            let handle = tree.alloc(node);
            tree.attach(document, handle, None);
        }
        let root = tree.build(&spec.root);
        tree.attach(document, root, None);

        Self {
            tree: Mutex::new(tree),
            books: Mutex::new(Bookkeeping::default()),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let spec: DocumentSpec = serde_json::from_str(json)?;
        Ok(Self::from_spec(&spec))
    }

    fn tree(&self) -> MutexGuard<'_, DocumentTree> {
        self.tree.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn books(&self) -> MutexGuard<'_, Bookkeeping> {
        self.books.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn flush(&self, records: Vec<MutationRecord>) {
        if records.is_empty() {
            return;
        }
        trace!(records = records.len(), "Publishing mutations");
        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        subscribers.retain(|tx| tx.send(records.clone()).is_ok());
    }

    /// Run `f` against the tree and publish the resulting mutation records
    pub fn edit<R>(&self, f: impl FnOnce(&mut DocumentTree) -> R) -> R {
        let (result, records) = {
            let mut tree = self.tree();
            let result = f(&mut tree);
            (result, std::mem::take(&mut tree.records))
        };
        self.flush(records);
        result
    }

    pub fn document_handle(&self) -> NodeHandle {
        self.tree().document
    }

    pub fn document_element(&self) -> Option<NodeHandle> {
        let tree = self.tree();
        tree.children_of(tree.document)
            .into_iter()
            .find(|c| tree.nodes.get(c).map(|n| n.kind) == Some(NodeKind::Element))
    }

    pub fn find_by_id(&self, id: &str) -> Option<NodeHandle> {
        self.tree().find_by_id(id)
    }

    pub fn front(&self, handle: NodeHandle) -> Option<NodeFront> {
        self.tree().front(handle).ok()
    }

    pub fn child_handles(&self, handle: NodeHandle) -> Vec<NodeHandle> {
        self.tree().children_of(handle)
    }

    pub fn attribute(&self, handle: NodeHandle, name: &str) -> Option<String> {
        self.front(handle)
            .and_then(|f| f.get_attribute(name).map(str::to_string))
    }

    pub fn value(&self, handle: NodeHandle) -> Option<String> {
        self.tree().nodes.get(&handle).map(|n| n.value.clone())
    }

    pub fn children_fetch_count(&self) -> usize {
        self.books().children_fetches
    }

    /// Make the next `count` children fetches fail
    pub fn fail_next_children(&self, count: usize) {
        self.books().failing_fetches = count;
    }

    /// Make the next `count` attribute batches fail before touching the node
    pub fn fail_next_attribute_edits(&self, count: usize) {
        self.books().failing_edits = count;
    }

    /// Run `f` while the next children fetch is in flight: the fetch
    /// answers with the tree as it was before `f`
    pub fn during_next_fetch(&self, f: impl FnOnce(&mut DocumentTree) + Send + 'static) {
        self.books().during_fetch = Some(Box::new(f));
    }

    pub fn selected(&self) -> Option<NodeHandle> {
        self.books().selected
    }

    pub fn is_retained(&self, handle: NodeHandle) -> bool {
        self.books().retained.contains(&handle)
    }

    /// Long strings handed out and not yet released
    pub fn live_long_strings(&self) -> usize {
        self.books().long_strings.len()
    }
}

#[async_trait]
impl RemoteWalker for MemoryDocument {
    async fn document(&self) -> RemoteResult<NodeFront> {
        let tree = self.tree();
        tree.front(tree.document)
    }

    async fn describe(&self, node: NodeHandle) -> RemoteResult<NodeFront> {
        self.tree().front(node)
    }

    async fn children(
        &self,
        node: NodeHandle,
        options: ChildrenOptions,
    ) -> RemoteResult<ChildrenWindow> {
        let hook = {
            let mut books = self.books();
            books.children_fetches += 1;
            if books.failing_fetches > 0 {
                books.failing_fetches -= 1;
                debug!(node = %node, "Injected children fetch failure");
                return Err(RemoteError::Disconnected);
            }
            books.during_fetch.take()
        };
        let window = self.tree().window(node, &options)?;
        if let Some(hook) = hook {
            self.edit(hook);
        }
        Ok(window)
    }

    async fn parent(&self, node: NodeHandle) -> RemoteResult<Option<NodeFront>> {
        let tree = self.tree();
        match tree.node(node)?.parent {
            Some(parent) => tree.front(parent).map(Some),
            None => Ok(None),
        }
    }

    async fn node_value(&self, node: NodeHandle) -> RemoteResult<LongString> {
        let value = self.tree().node(node)?.value.clone();
        let mut books = self.books();
        books.next_string += 1;
        let id = books.next_string;
        let length = value.chars().count();
        books.long_strings.insert(id, value);
        Ok(LongString { id, length })
    }

    async fn long_string_text(&self, string: &LongString) -> RemoteResult<String> {
        self.books()
            .long_strings
            .get(&string.id)
            .cloned()
            .ok_or(RemoteError::LongStringReleased(string.id))
    }

    async fn release_long_string(&self, string: LongString) -> RemoteResult<()> {
        self.books()
            .long_strings
            .remove(&string.id)
            .map(|_| ())
            .ok_or(RemoteError::LongStringReleased(string.id))
    }

    async fn set_node_value(&self, node: NodeHandle, value: &str) -> RemoteResult<()> {
        self.edit(|tree| tree.set_value(node, value))
    }

    async fn modify_attributes(&self, node: NodeHandle, ops: &[AttributeOp]) -> RemoteResult<()> {
        {
            let mut books = self.books();
            if books.failing_edits > 0 {
                books.failing_edits -= 1;
                debug!(node = %node, "Injected attribute edit failure");
                return Err(RemoteError::Disconnected);
            }
        }
        self.edit(|tree| {
            for op in ops {
                match op {
                    AttributeOp::Set { name, value } => tree.set_attribute(node, name, value)?,
                    AttributeOp::Remove { name } => tree.remove_attribute(node, name)?,
                }
            }
            Ok(())
        })
    }

    async fn create_element(&self, tag: &str) -> RemoteResult<NodeFront> {
        if !names::is_valid_element_name(tag) {
            return Err(RemoteError::InvalidCharacter(tag.to_string()));
        }
        let mut tree = self.tree();
        let handle = tree.alloc(MemNode::new(NodeKind::Element, &tag.to_ascii_lowercase()));
        tree.front(handle)
    }

    async fn retain_node(&self, node: NodeHandle) -> RemoteResult<()> {
        self.tree().node(node)?;
        self.books().retained.insert(node);
        Ok(())
    }

    async fn insert_before(
        &self,
        node: NodeHandle,
        parent: NodeHandle,
        before: Option<NodeHandle>,
    ) -> RemoteResult<()> {
        self.edit(|tree| tree.insert_before(node, parent, before))
    }

    async fn remove_node(&self, node: NodeHandle) -> RemoteResult<Option<NodeHandle>> {
        self.edit(|tree| tree.remove(node))
    }

    async fn hide_node(&self, node: NodeHandle) -> RemoteResult<()> {
        self.edit(|tree| tree.set_hidden(node, true))
    }

    async fn unhide_node(&self, node: NodeHandle) -> RemoteResult<()> {
        self.edit(|tree| tree.set_hidden(node, false))
    }

    async fn sync_selection(&self, node: Option<NodeHandle>) -> RemoteResult<()> {
        self.books().selected = node;
        Ok(())
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<Vec<MutationRecord>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(tx);
        rx
    }
}
