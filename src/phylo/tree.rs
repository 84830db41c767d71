use super::TreeFloat;
use super::node::{Node, NodeId, NodeType};
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use slotmap::{SecondaryMap, SlotMap};
use std::cmp::Ordering;
use std::fmt::Display;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Default, Clone)]
pub struct Tree {
    nodes: SlotMap<NodeId, Node>,
    first_node_id: Option<NodeId>,
    tip_count_all: usize,
    internal_node_count_all: usize,
    node_count_all: usize,
    has_branch_lengths: bool,
}

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("Parent node with NodeId: {0} does not exist.")]
    ParentNodeDoesNotExist(NodeId),
    #[error("Tree validation failed: {0}.")]
    InvalidTree(String),
}

/// Misuse of the mutation API. The UI layer should never be able to
/// trigger these; they indicate a bug in the caller.
#[derive(Debug, Error, PartialEq)]
pub enum PreconditionError {
    #[error("Node {0} is not part of the active tree.")]
    DetachedNode(NodeId),
    #[error("No node has layout id {0} in the current layout.")]
    UnknownLayoutId(usize),
    #[error("The root has no children left to collapse.")]
    SingleChildRoot,
    #[error("Making {parent} the parent of {child} would create a cycle.")]
    WouldCreateCycle { child: NodeId, parent: NodeId },
    #[error("New child order for node {0} is not a permutation of its children.")]
    NotAPermutation(NodeId),
    #[error("The tree is empty.")]
    EmptyTree,
    #[error("Tree structure corrupted: {0}")]
    Corrupted(String),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortCriterion {
    /// Number of edges on the longest path down to a tip.
    #[default]
    Height,
    BranchLength,
    HeightThenBranchLength,
    TipCountThenBranchLength,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Default, Clone, Copy)]
struct SubtreeStats {
    height: usize,
    tip_count: usize,
}

impl Tree {
    // =========================================================================
    // Construction & Validation
    // =========================================================================

    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_new_node<'a>(
        &mut self,
        name: Option<impl Into<&'a str>>,
        branch_length: Option<TreeFloat>,
        parent_node_id: Option<NodeId>,
    ) -> Result<NodeId, TreeError> {
        let mut node: Node = Node::default();
        node.set_name(name);
        node.set_branch_length(branch_length);
        self.add_node(node, parent_node_id)
    }

    pub fn add_node(
        &mut self,
        node: Node,
        parent_node_id: Option<NodeId>,
    ) -> Result<NodeId, TreeError> {
        let node_ids = self.add_nodes(vec![node], parent_node_id)?;
        Ok(node_ids[0])
    }

    pub fn add_nodes(
        &mut self,
        nodes: impl Into<Vec<Node>>,
        parent_node_id: Option<NodeId>,
    ) -> Result<Vec<NodeId>, TreeError> {
        let mut nodes: Vec<Node> = nodes.into();

        if let Some(parent_node_id_value) = parent_node_id {
            if self.node_exists(parent_node_id) {
                for node in &mut nodes {
                    node.set_parent_id(parent_node_id);
                }
            } else {
                return Err(TreeError::ParentNodeDoesNotExist(
                    parent_node_id_value,
                ));
            }
        }

        let mut node_ids: Vec<NodeId> = Vec::new();

        for mut node in nodes {
            let node_id = self.nodes.insert_with_key(|node_id| {
                node.set_node_id(node_id);
                node
            });

            node_ids.push(node_id);

            if let Some(parent_node) = self.node_mut(parent_node_id) {
                parent_node.add_child_id(node_id);
            }
        }

        Ok(node_ids)
    }

    /// Recomputes node types and counts, and checks that the arena holds
    /// exactly one tree: a single parentless node from which every other
    /// node is reachable, with parent and child links agreeing.
    pub fn validate(&mut self) -> Result<NodeId, TreeError> {
        let mut count_of_tip: usize = 0;
        let mut count_of_internal: usize = 0;
        let mut count_of_first: usize = 0;
        let mut first_node_id: Option<NodeId> = None;
        let mut has_branch_lengths: bool = false;

        for node in self.nodes.values_mut() {
            match node.set_node_type() {
                NodeType::Unset => (),
                NodeType::Tip => count_of_tip += 1,
                NodeType::Internal => count_of_internal += 1,
                NodeType::FirstNode | NodeType::Root => {
                    count_of_first += 1;
                    first_node_id = node.node_id().copied();
                }
            };

            if node.parent_id().is_some() && node.branch_length().is_some() {
                has_branch_lengths = true;
            }
        }

        if count_of_first != 1 {
            return Err(TreeError::InvalidTree(format!(
                "expected exactly one parentless node, found {count_of_first}"
            )));
        }

        let Some(first_node_id) = first_node_id else {
            return Err(TreeError::InvalidTree("no root node".to_string()));
        };

        let reachable = self.count_reachable(first_node_id)?;
        if reachable != self.nodes.len() {
            return Err(TreeError::InvalidTree(format!(
                "{} of {} nodes are not reachable from the root",
                self.nodes.len() - reachable,
                self.nodes.len()
            )));
        }

        self.first_node_id = Some(first_node_id);
        self.tip_count_all = count_of_tip;
        self.internal_node_count_all = count_of_internal + count_of_first;
        self.node_count_all = self.tip_count_all + self.internal_node_count_all;
        self.has_branch_lengths = has_branch_lengths;

        if let Some(node) = self.node_mut(Some(first_node_id)) {
            node.set_branch_length(None);
        }

        Ok(first_node_id)
    }

    fn count_reachable(&self, first_node_id: NodeId) -> Result<usize, TreeError> {
        let mut visited: SecondaryMap<NodeId, ()> = SecondaryMap::new();
        let mut stack = vec![first_node_id];
        while let Some(node_id) = stack.pop() {
            if visited.insert(node_id, ()).is_some() {
                return Err(TreeError::InvalidTree(format!(
                    "node {node_id} is reachable along more than one path"
                )));
            }
            for &child_id in self.nodes[node_id].child_ids() {
                match self.nodes.get(child_id) {
                    Some(child) if child.parent_id() == Some(&node_id) => {
                        stack.push(child_id)
                    }
                    _ => {
                        return Err(TreeError::InvalidTree(format!(
                            "child {child_id} of node {node_id} does not point back to it"
                        )));
                    }
                }
            }
        }
        Ok(visited.len())
    }

    /// Copies each internal node's label into its support annotation.
    pub(crate) fn init_support_from_labels(&mut self) {
        for node in self.nodes.values_mut() {
            if !node.is_tip() {
                node.set_support(node.name());
            }
        }
    }

    // =========================================================================
    // Tree Properties
    // =========================================================================

    pub fn is_rooted(&self) -> bool {
        if let Some(node) = self.node(self.first_node_id()) {
            return node.node_type() == NodeType::Root;
        }
        false
    }

    pub fn has_branch_lengths(&self) -> bool {
        self.has_branch_lengths
    }

    /// Longest root-to-tip path, summing branch lengths.
    pub fn height(&self) -> TreeFloat {
        if let Some(id) = &self.first_node_id {
            let tip_ids = self.tip_node_ids_all();

            if tip_ids.len() > 100 {
                tip_ids
                    .par_iter()
                    .map(|right| self.distance(id, right))
                    .reduce(|| 0.0, TreeFloat::max)
            } else {
                tip_ids
                    .iter()
                    .map(|right| self.distance(id, right))
                    .fold(0.0, TreeFloat::max)
            }
        } else {
            0.0
        }
    }

    /// Sum of branch lengths from `left_node_id` down to `right_node_id`.
    /// `left_node_id` must be an ancestor of `right_node_id`.
    pub fn distance(
        &self,
        left_node_id: &NodeId,
        right_node_id: &NodeId,
    ) -> TreeFloat {
        let mut total_distance: TreeFloat = 0.0;
        let mut current_node_id = right_node_id;
        while current_node_id != left_node_id {
            total_distance += self.branch_length(*current_node_id);
            match self.parent_id(current_node_id) {
                Some(parent_node_id) => current_node_id = parent_node_id,
                None => break,
            }
        }
        total_distance
    }

    /// Sum of branch lengths on the path between two nodes through their
    /// most recent common ancestor.
    pub fn path_length(&self, u: NodeId, v: NodeId) -> Option<TreeFloat> {
        let mrca = self.mrca(u, v)?;
        Some(self.distance(&mrca, &u) + self.distance(&mrca, &v))
    }

    pub fn mrca(&self, u: NodeId, v: NodeId) -> Option<NodeId> {
        if !self.contains(u) || !self.contains(v) {
            return None;
        }
        let ancestors_u: FxHashSet<NodeId> =
            self.ancestors(u).into_iter().collect();
        self.ancestors(v).into_iter().find(|id| ancestors_u.contains(id))
    }

    /// Number of nodes typed [NodeType::Tip]. The first node is never
    /// counted, so a single-node tree such as `A;` has no tips even though
    /// [Node::is_tip] is true for its childless root.
    pub fn tip_count_all(&self) -> usize {
        self.tip_count_all
    }

    pub fn internal_node_count_all(&self) -> usize {
        self.internal_node_count_all
    }

    pub fn node_count_all(&self) -> usize {
        self.node_count_all
    }

    // =========================================================================
    // Node Access
    // =========================================================================

    pub fn node(&self, node_id: Option<NodeId>) -> Option<&Node> {
        if let Some(node_id) = node_id { self.nodes.get(node_id) } else { None }
    }

    pub(crate) fn node_mut(
        &mut self,
        node_id: Option<NodeId>,
    ) -> Option<&mut Node> {
        if let Some(node_id) = node_id {
            self.nodes.get_mut(node_id)
        } else {
            None
        }
    }

    pub fn node_exists(&self, node_id: Option<NodeId>) -> bool {
        self.node(node_id).is_some()
    }

    pub fn contains(&self, node_id: NodeId) -> bool {
        self.nodes.contains_key(node_id)
    }

    /// True when the node is in the arena and its ancestor chain ends at
    /// the current root.
    pub fn is_attached(&self, node_id: NodeId) -> bool {
        self.contains(node_id)
            && self.ancestors(node_id).last().copied() == self.first_node_id
    }

    pub fn first_node_id(&self) -> Option<NodeId> {
        self.first_node_id
    }

    pub fn node_ids_all(&self) -> Vec<NodeId> {
        self.nodes.keys().collect()
    }

    pub fn node_id_by_name<'a>(
        &self,
        name: impl Into<&'a str>,
    ) -> Option<NodeId> {
        let name: &str = name.into();
        self.nodes.iter().find_map(|(node_id, node)| {
            match node.name() {
                Some(node_name) if &*node_name == name => Some(node_id),
                _ => None,
            }
        })
    }

    pub fn name(&self, node_id: &NodeId) -> Option<Arc<str>> {
        self.nodes[*node_id].name()
    }

    pub fn support(&self, node_id: &NodeId) -> Option<Arc<str>> {
        self.nodes[*node_id].support()
    }

    /// Branch length above the node; absent lengths and the root count as
    /// zero.
    pub fn branch_length(&self, node_id: NodeId) -> TreeFloat {
        if Some(node_id) == self.first_node_id {
            return 0.0;
        }
        self.nodes[node_id].branch_length().unwrap_or(0.0)
    }

    // =========================================================================
    // Tree Traversal
    // =========================================================================

    pub fn parent_id(&self, node_id: &NodeId) -> Option<&NodeId> {
        self.nodes[*node_id].parent_id()
    }

    pub fn child_ids(&self, node_id: &NodeId) -> &[NodeId] {
        self.nodes[*node_id].child_ids()
    }

    /// Child nodes in display order.
    pub fn children(&self, node_id: &NodeId) -> Vec<&Node> {
        self.child_ids(node_id)
            .iter()
            .map(|&child_id| &self.nodes[child_id])
            .collect()
    }

    pub fn child_count(&self, node_id: &NodeId) -> usize {
        self.nodes[*node_id].child_node_count()
    }

    pub fn is_tip(&self, node_id: &NodeId) -> bool {
        self.nodes[*node_id].is_tip()
    }

    /// The node itself followed by each ancestor up to the root.
    pub fn ancestors(&self, node_id: NodeId) -> Vec<NodeId> {
        let mut result = vec![node_id];
        let mut current_node_id = node_id;
        while let Some(&parent_node_id) =
            self.node(Some(current_node_id)).and_then(|n| n.parent_id())
        {
            if result.len() > self.nodes.len() {
                break;
            }
            result.push(parent_node_id);
            current_node_id = parent_node_id;
        }
        result
    }

    /// Pre-order walk of the subtree rooted at `node_id`, the node first.
    pub fn descendants(&self, node_id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        if !self.contains(node_id) {
            return result;
        }
        let mut stack = vec![node_id];
        while let Some(current_node_id) = stack.pop() {
            result.push(current_node_id);
            stack.extend(
                self.nodes[current_node_id].child_ids().iter().rev().copied(),
            );
        }
        result
    }

    pub fn descendants_all(&self) -> Vec<NodeId> {
        match self.first_node_id {
            Some(id) => self.descendants(id),
            None => Vec::new(),
        }
    }

    /// Tips below `node_id`, left to right.
    pub fn tip_node_ids(&self, node_id: &NodeId) -> Vec<NodeId> {
        self.descendants(*node_id)
            .into_iter()
            .filter(|id| self.is_tip(id))
            .collect()
    }

    pub fn tip_node_ids_all(&self) -> Vec<NodeId> {
        if let Some(id) = self.first_node_id {
            self.tip_node_ids(&id)
        } else {
            Vec::new()
        }
    }

    pub fn tip_names(&self, node_id: &NodeId) -> Vec<Arc<str>> {
        self.tip_node_ids(node_id)
            .iter()
            .filter_map(|id| self.name(id))
            .collect()
    }

    fn subtree_stats(&self) -> SecondaryMap<NodeId, SubtreeStats> {
        let mut stats: SecondaryMap<NodeId, SubtreeStats> = SecondaryMap::new();
        for node_id in self.descendants_all().into_iter().rev() {
            let mut node_stats = SubtreeStats::default();
            if self.is_tip(&node_id) {
                node_stats.tip_count = 1;
            }
            for child_id in self.child_ids(&node_id) {
                let child_stats = stats[*child_id];
                node_stats.height = node_stats.height.max(child_stats.height + 1);
                node_stats.tip_count += child_stats.tip_count;
            }
            _ = stats.insert(node_id, node_stats);
        }
        stats
    }

    // =========================================================================
    // Tree Manipulation
    // =========================================================================

    /// Moves `child_id` under `parent_id`, appending it to the new parent's
    /// children. Refuses moves that would make a node its own ancestor.
    pub(crate) fn set_parent(
        &mut self,
        child_id: NodeId,
        parent_id: NodeId,
    ) -> Result<(), PreconditionError> {
        if !self.contains(child_id) {
            return Err(PreconditionError::DetachedNode(child_id));
        }
        if !self.contains(parent_id) {
            return Err(PreconditionError::DetachedNode(parent_id));
        }
        if self.ancestors(parent_id).contains(&child_id) {
            return Err(PreconditionError::WouldCreateCycle {
                child: child_id,
                parent: parent_id,
            });
        }

        if let Some(old_parent_id) = self.nodes[child_id].parent_id().copied() {
            self.nodes[old_parent_id].remove_child_id(&child_id);
        }
        self.nodes[parent_id].add_child_id(child_id);
        self.nodes[child_id].set_parent_id(Some(parent_id));
        Ok(())
    }

    /// Drops a node from the arena. The caller unlinks it first.
    pub(crate) fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
        self.nodes.remove(node_id)
    }

    /// Replaces the child order of `node_id`. `child_ids` must contain
    /// exactly the node's current children.
    pub(crate) fn splice_children(
        &mut self,
        node_id: NodeId,
        child_ids: Vec<NodeId>,
    ) -> Result<(), PreconditionError> {
        if !self.contains(node_id) {
            return Err(PreconditionError::DetachedNode(node_id));
        }
        let current: FxHashSet<NodeId> =
            self.child_ids(&node_id).iter().copied().collect();
        let proposed: FxHashSet<NodeId> = child_ids.iter().copied().collect();
        if child_ids.len() != self.child_count(&node_id) || current != proposed
        {
            return Err(PreconditionError::NotAPermutation(node_id));
        }
        self.nodes[node_id].set_child_ids(child_ids);
        Ok(())
    }

    /// Reverses the child order of a node. Purely cosmetic.
    pub fn swap_children(
        &mut self,
        node_id: NodeId,
    ) -> Result<(), PreconditionError> {
        if !self.is_attached(node_id) {
            return Err(PreconditionError::DetachedNode(node_id));
        }
        let mut child_ids = self.child_ids(&node_id).to_vec();
        child_ids.reverse();
        self.splice_children(node_id, child_ids)?;
        debug!(%node_id, "swapped children");
        Ok(())
    }

    /// Reorders the children of every node. The sort is stable; descending
    /// order reverses the comparison, so ties keep their current order.
    pub fn sort_by(&mut self, criterion: SortCriterion, direction: SortDirection) {
        if self.first_node_id.is_none() {
            return;
        }
        let stats = self.subtree_stats();
        let mut reordered: Vec<(NodeId, Vec<NodeId>)> = Vec::new();
        for node_id in self.descendants_all() {
            let mut sorted_ids: Vec<NodeId> = self.child_ids(&node_id).to_vec();
            if sorted_ids.len() < 2 {
                continue;
            }
            sorted_ids.par_sort_by(|a, b| {
                let ordering = self.compare_siblings(a, b, criterion, &stats);
                match direction {
                    SortDirection::Ascending => ordering,
                    SortDirection::Descending => ordering.reverse(),
                }
            });
            reordered.push((node_id, sorted_ids));
        }
        for (node_id, sorted_ids) in reordered {
            self.nodes[node_id].set_child_ids(sorted_ids);
        }
        debug!(?criterion, ?direction, "sorted children");
    }

    fn compare_siblings(
        &self,
        a: &NodeId,
        b: &NodeId,
        criterion: SortCriterion,
        stats: &SecondaryMap<NodeId, SubtreeStats>,
    ) -> Ordering {
        let by_length =
            || self.branch_length(*a).total_cmp(&self.branch_length(*b));
        match criterion {
            SortCriterion::Height => stats[*a].height.cmp(&stats[*b].height),
            SortCriterion::BranchLength => by_length(),
            SortCriterion::HeightThenBranchLength => stats[*a]
                .height
                .cmp(&stats[*b].height)
                .then_with(by_length),
            SortCriterion::TipCountThenBranchLength => stats[*a]
                .tip_count
                .cmp(&stats[*b].tip_count)
                .then_with(by_length),
        }
    }

    // =========================================================================
    // Display
    // =========================================================================

    fn print_tree(&self) -> String {
        let mut result: String = String::new();
        result.push_str(&format!(
            "Internal Nodes: {}\nTips: {}\nAll Nodes: {}\n{}\nHeight: {:7.5}\nBranch lengths: {}\n\n",
            self.internal_node_count_all,
            self.tip_count_all,
            self.node_count_all,
            match self.is_rooted() {
                true => "Rooted",
                false => "Unrooted",
            },
            self.height(),
            self.has_branch_lengths()
        ));

        if let Some(node) = self.node(self.first_node_id) {
            result.push_str(&self.print_node(node, 0));
        }

        result
    }

    fn print_node(&self, node: &Node, level: usize) -> String {
        let mut result: String = String::new();
        result.push_str(&format!(
            "{}- {} | {} | {:<5.3} | {} | {}\n",
            " ".repeat(level * 4),
            if let Some(node_id) = node.node_id() {
                node_id.to_string()
            } else {
                "None".to_string()
            },
            if let Some(name) = &node.name() {
                name.to_string()
            } else {
                "None".to_string()
            },
            node.branch_length().unwrap_or(TreeFloat::NAN),
            node.node_type(),
            node.support().as_deref().unwrap_or("-"),
        ));

        for &child_node_id in node.child_ids() {
            result
                .push_str(&self.print_node(&self.nodes[child_node_id], level + 1));
        }

        result
    }
}

impl Display for Tree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.print_tree())
    }
}
