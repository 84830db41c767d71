use super::TreeFloat;
use slotmap::new_key_type;
use std::{fmt::Display, sync::Arc};

new_key_type! { pub struct NodeId; }

#[derive(Debug, Default, Clone, Copy, PartialEq, PartialOrd, Ord, Eq)]
pub enum NodeType {
    #[default]
    Unset,
    Tip,
    Internal,
    FirstNode,
    Root,
}

/// The value carried by the edge above a node. Re-rooting moves these
/// between nodes as edges change direction.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Branch {
    pub length: Option<TreeFloat>,
    pub support: Option<Arc<str>>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Node {
    node_id: Option<NodeId>,
    parent_id: Option<NodeId>,
    child_ids: Vec<NodeId>,
    branch_length: Option<TreeFloat>,
    name: Option<Arc<str>>,
    support: Option<Arc<str>>,
    node_type: NodeType,
    layout_id: Option<usize>,
    x: TreeFloat,
    y: TreeFloat,
}

impl Node {
    pub fn new() -> Self { Self::default() }
    pub fn is_tip(&self) -> bool { self.child_ids.is_empty() }
    pub fn child_ids(&self) -> &[NodeId] { &self.child_ids }
    pub(crate) fn set_child_ids(&mut self, child_ids: Vec<NodeId>) { self.child_ids = child_ids }
    pub fn child_node_count(&self) -> usize { self.child_ids.len() }
    pub(crate) fn add_child_id(&mut self, node_id: NodeId) { self.child_ids.push(node_id) }

    /// Removes `node_id` from the children, keeping the order of the rest.
    pub(crate) fn remove_child_id(&mut self, node_id: &NodeId) {
        if let Some(idx) = self.child_ids.iter().position(|id| id == node_id) {
            _ = self.child_ids.remove(idx);
        }
    }

    pub(crate) fn take_child_ids(&mut self) -> Vec<NodeId> { std::mem::take(&mut self.child_ids) }

    pub fn node_id(&self) -> Option<&NodeId> { self.node_id.as_ref() }
    pub(crate) fn set_node_id(&mut self, node_id: NodeId) { self.node_id = Some(node_id); }
    pub fn parent_id(&self) -> Option<&NodeId> { self.parent_id.as_ref() }
    pub(crate) fn set_parent_id(&mut self, node_id: Option<NodeId>) { self.parent_id = node_id; }
    pub fn branch_length(&self) -> Option<TreeFloat> { self.branch_length }
    pub fn set_branch_length(&mut self, branch_length: Option<TreeFloat>) { self.branch_length = branch_length; }
    pub fn name(&self) -> Option<Arc<str>> { self.name.clone() }

    pub fn set_name<'a>(&mut self, name: Option<impl Into<&'a str>>) {
        self.name = name.map(|name| name.into().into());
    }

    pub fn support(&self) -> Option<Arc<str>> { self.support.clone() }
    pub fn set_support(&mut self, support: Option<Arc<str>>) { self.support = support; }

    /// Numeric reading of the support annotation, if it is a number.
    pub fn support_value(&self) -> Option<TreeFloat> {
        self.support.as_deref().and_then(|s| s.trim().parse::<TreeFloat>().ok())
    }

    pub(crate) fn branch(&self) -> Branch {
        Branch { length: self.branch_length, support: self.support.clone() }
    }

    pub(crate) fn set_branch(&mut self, branch: Branch) {
        self.branch_length = branch.length;
        self.support = branch.support;
    }

    pub fn layout_id(&self) -> Option<usize> { self.layout_id }
    pub fn x(&self) -> TreeFloat { self.x }
    pub fn y(&self) -> TreeFloat { self.y }

    pub(crate) fn set_position(&mut self, layout_id: usize, x: TreeFloat, y: TreeFloat) {
        self.layout_id = Some(layout_id);
        self.x = x;
        self.y = y;
    }

    pub fn node_type(&self) -> NodeType { self.node_type }

    pub(crate) fn set_node_type(&mut self) -> NodeType {
        self.node_type = match (self.parent_id.is_some(), self.child_ids.len()) {
            (true, 0) => NodeType::Tip,
            (true, _) => NodeType::Internal,
            (false, 2) => NodeType::Root,
            (false, _) => NodeType::FirstNode,
        };
        self.node_type
    }
}

impl<'a> From<&'a str> for Node {
    fn from(value: &'a str) -> Self {
        let mut node = Node::default();
        let name = match value {
            "" => None,
            v => Some(v),
        };
        node.set_name(name);
        node
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let disp = format!("{self:?}");
        write!(f, "{}", &disp[7..disp.len() - 1])
    }
}

impl Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                NodeType::Unset => "Unset",
                NodeType::Tip => "Tip",
                NodeType::Internal => "Internal",
                NodeType::Root => "Root",
                NodeType::FirstNode => "FirstNode",
            }
        )
    }
}
