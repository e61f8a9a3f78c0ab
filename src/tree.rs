// Element tree built by the parser, and the lookup contract the flattener needs
use crate::{model::QName, Result};
use ahash::AHashMap;
use compact_str::CompactString;

/// Read-only element tree queried by qualified name.
///
/// Lookups compare the lowercase `prefix:local` form and walk every descendant
/// of `scope` in document order; `scope` itself is never a match. Failures are
/// reported as [`crate::Error::TreeAccess`] and reach the caller unchanged.
pub trait ElementTree {
    type Node: Copy;

    /// The parse root, one level above the document element.
    fn root(&self) -> Self::Node;

    fn find_first(&self, scope: Self::Node, name: &QName) -> Result<Option<Self::Node>>;

    fn find_all(&self, scope: Self::Node, name: &QName) -> Result<Vec<Self::Node>>;

    /// All character data below `node`, concatenated in document order.
    fn text(&self, node: Self::Node) -> Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

#[derive(Debug, Clone)]
pub(crate) enum Content {
    Text(String),
    Child(NodeId),
}

#[derive(Debug, Clone)]
pub(crate) struct Element {
    pub(crate) name: CompactString,
    /// One past the last node of this element's subtree.
    pub(crate) end: usize,
    pub(crate) content: Vec<Content>,
}

/// Arena of elements in pre-order.
///
/// Because ids follow pre-order, the descendants of a node are exactly the ids
/// in `(node, end)`, and the per-name index turns every lookup into a range
/// search over a sorted id list.
#[derive(Debug, Clone)]
pub struct Document {
    pub(crate) nodes: Vec<Element>,
    pub(crate) index: AHashMap<CompactString, Vec<NodeId>>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![Element {
                name: CompactString::default(),
                end: 1,
                content: Vec::new(),
            }],
            index: AHashMap::new(),
        }
    }

    /// Number of elements, not counting the parse root.
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Tag name as written in the source, prefix included.
    pub fn name(&self, node: NodeId) -> &str {
        &self.nodes[node.0].name
    }

    /// The outermost element, if the document has one.
    pub fn document_element(&self) -> Option<NodeId> {
        self.nodes[0].content.iter().find_map(|c| match c {
            Content::Child(id) => Some(*id),
            Content::Text(_) => None,
        })
    }

    fn descendants_named(&self, scope: NodeId, name: &QName) -> &[NodeId] {
        let Some(ids) = self.index.get(name.key()) else {
            return &[];
        };
        let end = self.nodes[scope.0].end;
        let lo = ids.partition_point(|id| id.0 <= scope.0);
        let hi = ids.partition_point(|id| id.0 < end);
        &ids[lo..hi]
    }

    /// Depth-first walk with an explicit stack of (element, next content slot),
    /// so nesting depth is bounded by the heap rather than the call stack.
    fn collect_text(&self, node: NodeId, out: &mut String) {
        let mut stack = vec![(node, 0usize)];
        while let Some((current, slot)) = stack.pop() {
            let Some(content) = self.nodes[current.0].content.get(slot) else {
                continue;
            };
            stack.push((current, slot + 1));
            match content {
                Content::Text(text) => out.push_str(text),
                Content::Child(child) => stack.push((*child, 0)),
            }
        }
    }
}

impl ElementTree for Document {
    type Node = NodeId;

    fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn find_first(&self, scope: NodeId, name: &QName) -> Result<Option<NodeId>> {
        Ok(self.descendants_named(scope, name).first().copied())
    }

    fn find_all(&self, scope: NodeId, name: &QName) -> Result<Vec<NodeId>> {
        Ok(self.descendants_named(scope, name).to_vec())
    }

    fn text(&self, node: NodeId) -> Result<String> {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        Ok(out)
    }
}
