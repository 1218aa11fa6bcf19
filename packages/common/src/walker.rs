use crate::names;
use crate::node::{
    AttributeOp, ChildrenOptions, ChildrenWindow, LongString, MutationRecord, NodeFront,
    NodeHandle,
};
use crate::result::RemoteResult;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Capability interface to a document living on the remote side
///
/// The mirror treats the remote document as the source of truth: every
/// edit goes through this trait and comes back through the mutation feed.
#[async_trait]
pub trait RemoteWalker: Send + Sync {
    /// The document node
    async fn document(&self) -> RemoteResult<NodeFront>;

    /// Fresh metadata for a node
    async fn describe(&self, node: NodeHandle) -> RemoteResult<NodeFront>;

    /// A window of `node`'s children, see [`ChildrenOptions`]
    async fn children(
        &self,
        node: NodeHandle,
        options: ChildrenOptions,
    ) -> RemoteResult<ChildrenWindow>;

    async fn parent(&self, node: NodeHandle) -> RemoteResult<Option<NodeFront>>;

    /// Full value of a text or comment node; must be released after reading
    async fn node_value(&self, node: NodeHandle) -> RemoteResult<LongString>;

    async fn long_string_text(&self, string: &LongString) -> RemoteResult<String>;

    async fn release_long_string(&self, string: LongString) -> RemoteResult<()>;

    async fn set_node_value(&self, node: NodeHandle, value: &str) -> RemoteResult<()>;

    /// Apply attribute changes in order. Changes are independent: an
    /// error leaves the earlier ones applied.
    async fn modify_attributes(&self, node: NodeHandle, ops: &[AttributeOp]) -> RemoteResult<()>;

    /// Create a detached element owned by the document
    async fn create_element(&self, tag: &str) -> RemoteResult<NodeFront>;

    /// Keep a node alive while it is detached so an edit can be undone
    async fn retain_node(&self, node: NodeHandle) -> RemoteResult<()>;

    async fn insert_before(
        &self,
        node: NodeHandle,
        parent: NodeHandle,
        before: Option<NodeHandle>,
    ) -> RemoteResult<()>;

    /// Detach a node, returning the sibling that followed it
    async fn remove_node(&self, node: NodeHandle) -> RemoteResult<Option<NodeHandle>>;

    async fn hide_node(&self, node: NodeHandle) -> RemoteResult<()>;

    async fn unhide_node(&self, node: NodeHandle) -> RemoteResult<()>;

    /// Tell the remote side which node the inspector has selected
    async fn sync_selection(&self, _node: Option<NodeHandle>) -> RemoteResult<()> {
        Ok(())
    }

    /// Whether the target document accepts `name` as an attribute name
    fn is_valid_attribute_name(&self, name: &str) -> bool {
        names::is_valid_attribute_name(name)
    }

    /// Ordered mutation feed. Batches are not deduplicated.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<Vec<MutationRecord>>;
}
