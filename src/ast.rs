use crate::utils::cell_ref;
use std::fmt;

/// The six node kinds of the schema DSL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A bare literal without any `$` marker: a leaf keyed by its own text.
    Property,
    /// `name$key`: supplies a key taken from data cells.
    Key,
    /// `$value`: the cell consumed by a preceding `Key`.
    Value,
    /// `name${}`
    Map,
    /// `name$[]`
    Array,
    /// `$^`
    Ignore,
}

impl NodeKind {
    /// Map, Array and Key nodes own a span of cells on the following schema row.
    pub fn is_container(self) -> bool {
        matches!(self, NodeKind::Map | NodeKind::Array | NodeKind::Key)
    }

    pub fn is_key_providable(self) -> bool {
        matches!(self, NodeKind::Key | NodeKind::Property)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Property => "property",
            NodeKind::Key => "key",
            NodeKind::Value => "value",
            NodeKind::Map => "map",
            NodeKind::Array => "array",
            NodeKind::Ignore => "ignore",
        };
        f.write_str(name)
    }
}

/// A 1-based cell position in the sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub row: u32,
    pub column: u32,
}

impl Position {
    pub fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&cell_ref(self.row, self.column))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SchemeNode {
    pub key: String,
    pub kind: NodeKind,
    pub position: Position,
    pub children: Vec<NodeId>,
}

impl SchemeNode {
    /// Builds a node, blanking the key of map and array nodes that sit in the first column.
    pub fn new(key: impl Into<String>, kind: NodeKind, position: Position) -> Self {
        let mut key = key.into();
        if matches!(kind, NodeKind::Map | NodeKind::Array) && position.column == 1 {
            key.clear();
        }
        Self {
            key,
            kind,
            position,
            children: Vec::new(),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.key.is_empty()
    }
}

/// Why an `attach` call was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Property and key nodes cannot own other property or key nodes.
    KeyUnderKeyProvider,
    /// Ignore nodes never own children.
    IgnoreParent,
}

/// Arena used while the parser is assembling the tree.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    nodes: Vec<SchemeNode>,
    parents: Vec<Option<NodeId>>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: SchemeNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        self.parents.push(None);
        id
    }

    pub fn node(&self, id: NodeId) -> &SchemeNode {
        &self.nodes[id.0]
    }

    /// Appends `child` to `parent`, enforcing the ownership rules of the DSL.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) -> Result<(), Rejection> {
        let parent_kind = self.nodes[parent.0].kind;
        let child_kind = self.nodes[child.0].kind;
        match parent_kind {
            NodeKind::Key | NodeKind::Property if child_kind.is_key_providable() => {
                return Err(Rejection::KeyUnderKeyProvider);
            }
            NodeKind::Ignore => return Err(Rejection::IgnoreParent),
            _ => {}
        }
        self.parents[child.0] = Some(parent);
        self.nodes[parent.0].children.push(child);
        Ok(())
    }

    pub fn finish(self, root: NodeId) -> SchemeTree {
        SchemeTree {
            nodes: self.nodes,
            parents: self.parents,
            root,
        }
    }
}

/// The parsed schema. Parent links live in a side table and are only used for lookups.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemeTree {
    nodes: Vec<SchemeNode>,
    parents: Vec<Option<NodeId>>,
    root: NodeId,
}

impl SchemeTree {
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn root_node(&self) -> &SchemeNode {
        self.node(self.root)
    }

    pub fn node(&self, id: NodeId) -> &SchemeNode {
        &self.nodes[id.0]
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parents[id.0]
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = (NodeId, &SchemeNode)> + '_ {
        self.nodes[id.0]
            .children
            .iter()
            .map(move |&child| (child, &self.nodes[child.0]))
    }

    /// All nodes reachable from the root, in pre-order.
    pub fn linear(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.nodes[id.0].children.iter().rev().copied());
        }
        out
    }

    fn fmt_node(&self, f: &mut fmt::Formatter<'_>, id: NodeId, depth: usize) -> fmt::Result {
        let node = self.node(id);
        writeln!(
            f,
            "{:indent$}{}:{}@{}",
            "",
            node.key,
            node.kind,
            node.position,
            indent = depth * 2
        )?;
        for &child in &node.children {
            self.fmt_node(f, child, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for SchemeTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_node(f, self.root, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(key: &str, kind: NodeKind, row: u32, column: u32) -> SchemeNode {
        SchemeNode::new(key, kind, Position::new(row, column))
    }

    #[test]
    fn test_first_column_containers_are_anonymous() {
        assert_eq!(node("items", NodeKind::Array, 2, 1).key, "");
        assert_eq!(node("items", NodeKind::Map, 2, 1).key, "");
        assert_eq!(node("items", NodeKind::Array, 2, 2).key, "items");
        // Only containers lose their key.
        assert_eq!(node("id", NodeKind::Property, 3, 1).key, "id");
    }

    #[test]
    fn test_attach_rejects_key_providers_under_key_providers() {
        let mut b = TreeBuilder::new();
        let root = b.push(node("", NodeKind::Map, 2, 1));
        let prop = b.push(node("name", NodeKind::Property, 3, 1));
        let key = b.push(node("", NodeKind::Key, 3, 2));
        let nested = b.push(node("other", NodeKind::Property, 3, 3));
        let value = b.push(node("", NodeKind::Value, 3, 4));

        assert!(b.attach(root, prop).is_ok());
        assert!(b.attach(root, key).is_ok());
        assert_eq!(b.attach(prop, nested), Err(Rejection::KeyUnderKeyProvider));
        assert_eq!(b.attach(key, nested), Err(Rejection::KeyUnderKeyProvider));
        assert!(b.attach(key, value).is_ok());

        let tree = b.finish(root);
        assert_eq!(tree.node(root).children, vec![prop, key]);
        assert_eq!(tree.node(key).children, vec![value]);
        assert_eq!(tree.parent(value), Some(key));
        assert_eq!(tree.parent(nested), None);
    }

    #[test]
    fn test_ignore_nodes_never_own_children() {
        let mut b = TreeBuilder::new();
        let ignore = b.push(node("", NodeKind::Ignore, 2, 2));
        let map = b.push(node("m", NodeKind::Map, 3, 2));
        assert_eq!(b.attach(ignore, map), Err(Rejection::IgnoreParent));
        let tree = b.finish(ignore);
        assert!(tree.node(ignore).children.is_empty());
    }

    #[test]
    fn test_linear_is_pre_order() {
        let mut b = TreeBuilder::new();
        let root = b.push(node("", NodeKind::Array, 2, 1));
        let map = b.push(node("", NodeKind::Map, 3, 1));
        let a = b.push(node("a", NodeKind::Property, 4, 1));
        let c = b.push(node("c", NodeKind::Property, 4, 2));
        let tail = b.push(node("tail", NodeKind::Property, 3, 3));
        b.attach(root, map).unwrap();
        b.attach(map, a).unwrap();
        b.attach(map, c).unwrap();
        b.attach(root, tail).unwrap();
        let tree = b.finish(root);

        assert_eq!(tree.linear(), vec![root, map, a, c, tail]);
        assert_eq!(
            tree.to_string(),
            ":array@A2\n  :map@A3\n    a:property@A4\n    c:property@B4\n  tail:property@C3\n"
        );
    }
}
