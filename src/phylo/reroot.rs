//! Outgroup re-rooting.
//!
//! The unrooted topology is kept; only the position of the root changes.
//! The root node keeps its [NodeId] and ends up with exactly two children:
//! the outgroup and the node that used to be the outgroup's parent (or, if
//! the outgroup already hung from the root, the collapsed remainder of the
//! root). The edge joining them is split at its midpoint.
//!
//! A root with a single child is first folded: the child is replaced by its
//! own children and the stem above it, which joins no two tips, is dropped.

use super::TreeFloat;
use super::node::{Branch, Node, NodeId};
use super::tree::{PreconditionError, Tree};
use tracing::{debug, instrument};

impl Tree {
    /// Re-roots the tree so that `node_id` becomes one of the root's two
    /// children. Re-rooting on the root itself does nothing, nor does
    /// re-rooting on the only child of the root once any chain of single
    /// children above it has been folded away.
    #[instrument(level = "trace", skip(self))]
    pub fn reroot(&mut self, node_id: NodeId) -> Result<(), PreconditionError> {
        let root_id =
            self.first_node_id().ok_or(PreconditionError::EmptyTree)?;

        if !self.is_attached(node_id) {
            return Err(PreconditionError::DetachedNode(node_id));
        }

        if node_id == root_id {
            debug!(%node_id, "re-root on current root ignored");
            return Ok(());
        }

        while let &[only_child_id] = self.child_ids(&root_id) {
            if only_child_id == node_id {
                debug!(%node_id, "re-root on the only child of the root ignored");
                return self.revalidate();
            }
            self.fold_into_root(root_id, only_child_id)?;
        }

        let ancestors = self.ancestors(node_id);
        let sub_root_id = ancestors[ancestors.len() - 2];
        let parent_outgroup_id = ancestors[1];

        self.node_mut(Some(root_id))
            .ok_or(PreconditionError::DetachedNode(root_id))?
            .remove_child_id(&sub_root_id);

        let down_branch_id = self.collapse_root_children(root_id)?;

        let node2_id = if parent_outgroup_id != root_id {
            self.reverse_ancestor_chain(
                node_id,
                parent_outgroup_id,
                root_id,
                down_branch_id,
            )
        } else {
            down_branch_id
        };

        self.join_at_midpoint(root_id, node_id, node2_id);

        self.revalidate()?;

        debug!(
            %node_id,
            tips = self.tip_count_all(),
            "re-rooted tree"
        );
        Ok(())
    }

    /// Replaces the only child of the root with that child's own children,
    /// keeping their order and branches. The folded node leaves the arena.
    fn fold_into_root(
        &mut self,
        root_id: NodeId,
        child_id: NodeId,
    ) -> Result<(), PreconditionError> {
        for grandchild_id in self.child_ids(&child_id).to_vec() {
            self.set_parent(grandchild_id, root_id)?;
        }
        self.with_node(root_id, |n| n.remove_child_id(&child_id));
        _ = self.remove_node(child_id);
        debug!(%child_id, "folded the only child of the root");
        Ok(())
    }

    /// Detaches all remaining children of the root and returns the single
    /// node that stands for them: the only child itself, or a new unnamed
    /// node with a zero-length branch that adopts them in order.
    pub(crate) fn collapse_root_children(
        &mut self,
        root_id: NodeId,
    ) -> Result<NodeId, PreconditionError> {
        let remaining: Vec<NodeId> = self.child_ids(&root_id).to_vec();
        match remaining.len() {
            0 => Err(PreconditionError::SingleChildRoot),
            1 => {
                self.with_node(root_id, |n| {
                    _ = n.take_child_ids();
                });
                Ok(remaining[0])
            }
            _ => {
                let length = self.has_branch_lengths().then_some(0.0);
                let down_branch_id = self
                    .add_new_node(<Option<&str>>::None, length, None)
                    .map_err(|err| PreconditionError::Corrupted(err.to_string()))?;
                for child_id in remaining {
                    self.set_parent(child_id, down_branch_id)?;
                }
                Ok(down_branch_id)
            }
        }
    }

    /// Walks from the outgroup's parent up to the child of the root,
    /// turning every parent into a child of its former child. Each node on
    /// the way takes the branch of the node below it. Returns the outgroup's
    /// former parent, which will hang directly from the root.
    fn reverse_ancestor_chain(
        &mut self,
        node_id: NodeId,
        parent_outgroup_id: NodeId,
        root_id: NodeId,
        down_branch_id: NodeId,
    ) -> NodeId {
        let has_branch_lengths = self.has_branch_lengths();

        let mut next_parent_id = parent_outgroup_id;
        let mut next_child_id = self.nodes_parent(next_parent_id);
        let mut prev_parent_id: Option<NodeId> = None;
        let mut buffer: Branch = self.branch_of(next_parent_id);

        while let Some(child_id) = next_child_id
            && child_id != root_id
        {
            self.with_node(next_parent_id, |n| n.add_child_id(child_id));
            self.with_node(child_id, |n| n.remove_child_id(&next_parent_id));

            let taken = self.branch_of(child_id);
            self.with_node(child_id, |n| n.set_branch(buffer));
            buffer = taken;

            self.with_node(next_parent_id, |n| n.set_parent_id(prev_parent_id));
            prev_parent_id = Some(next_parent_id);

            next_parent_id = child_id;
            next_child_id = self.nodes_parent(next_parent_id);
        }

        // `next_parent_id` is now the former child of the root.
        self.with_node(next_parent_id, |n| {
            n.add_child_id(down_branch_id);
            n.set_parent_id(prev_parent_id);
        });

        let down_branch_length = self.branch_of(down_branch_id).length;
        self.with_node(down_branch_id, |n| {
            n.set_parent_id(Some(next_parent_id));
            n.set_branch(Branch {
                length: sum_lengths(
                    has_branch_lengths,
                    down_branch_length,
                    buffer.length,
                ),
                support: buffer.support,
            });
        });

        self.with_node(parent_outgroup_id, |n| {
            n.set_branch_length(has_branch_lengths.then_some(0.0));
            n.remove_child_id(&node_id);
        });

        parent_outgroup_id
    }

    /// Makes `node_id` and `node2_id` the two children of the root and
    /// splits the length between them evenly.
    fn join_at_midpoint(
        &mut self,
        root_id: NodeId,
        node_id: NodeId,
        node2_id: NodeId,
    ) {
        let has_branch_lengths = self.has_branch_lengths();
        let node_branch = self.branch_of(node_id);
        let node2_length = self.branch_of(node2_id).length;

        let midpoint = sum_lengths(has_branch_lengths, node_branch.length, node2_length)
            .map(|total| total / 2.0);

        self.with_node(node_id, |n| {
            n.set_parent_id(Some(root_id));
            n.set_branch_length(midpoint);
        });
        self.with_node(node2_id, |n| {
            n.set_parent_id(Some(root_id));
            n.set_branch(Branch { length: midpoint, support: node_branch.support });
        });
        self.with_node(root_id, |n| n.set_child_ids(vec![node_id, node2_id]));
    }

    fn revalidate(&mut self) -> Result<(), PreconditionError> {
        self.validate()
            .map(|_| ())
            .map_err(|err| PreconditionError::Corrupted(err.to_string()))
    }

    fn nodes_parent(&self, node_id: NodeId) -> Option<NodeId> {
        self.node(Some(node_id)).and_then(|n| n.parent_id().copied())
    }

    fn branch_of(&self, node_id: NodeId) -> Branch {
        self.node(Some(node_id)).map(|n| n.branch()).unwrap_or_default()
    }

    fn with_node(&mut self, node_id: NodeId, f: impl FnOnce(&mut Node)) {
        if let Some(node) = self.node_mut(Some(node_id)) {
            f(node);
        }
    }
}

fn sum_lengths(
    has_branch_lengths: bool,
    a: Option<TreeFloat>,
    b: Option<TreeFloat>,
) -> Option<TreeFloat> {
    has_branch_lengths.then(|| a.unwrap_or(0.0) + b.unwrap_or(0.0))
}
