//! Mutation façade for an interactive tree view.
//!
//! Every operation leaves the tree freshly laid out, so a renderer can read
//! [TreeMutator::snapshot] straight after any call. Nodes are addressed by
//! their layout id from the most recent pass.

use crate::{
    Error, Layout, LayoutConfig, LayoutError, LookupError, NodeId,
    PreconditionError, ScaleBar, SortCriterion, SortDirection, StrainCatalog,
    StrainRecord, Tree, TreeFloat, compute_layout, write_newick,
};
use serde::Serialize;
use tracing::{debug, warn};

/// Scale bar length, in branch-length units, shown until the caller sets
/// another one.
pub const DEFAULT_SCALE_BAR_LENGTH: TreeFloat = 0.05;

/// Child order applied by [TreeMutator::new] before the first layout:
/// smaller clades first, shorter branches breaking ties.
pub const DEFAULT_INITIAL_SORT: (SortCriterion, SortDirection) =
    (SortCriterion::TipCountThenBranchLength, SortDirection::Ascending);

#[derive(Debug, Clone)]
pub struct TreeMutator {
    tree: Tree,
    catalog: StrainCatalog,
    config: LayoutConfig,
    layout: Layout,
    scale_bar: ScaleBar,
}

/// One node as the renderer sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeView {
    pub id: usize,
    pub x: TreeFloat,
    pub y: TreeFloat,
    pub length: TreeFloat,
    /// Internal non-root nodes only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub support: Option<String>,
    /// Any childless node, including the root of a single-node tree.
    pub is_leaf: bool,
    pub children: Vec<usize>,
    #[serde(flatten)]
    pub leaf: Option<LeafView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeafView {
    pub name: String,
    #[serde(flatten)]
    pub record: StrainRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// In layout id order.
    pub nodes: Vec<NodeView>,
    pub scale_bar: ScaleBar,
    /// Leaves rendered with placeholder metadata.
    #[serde(skip)]
    pub lookup_errors: Vec<LookupError>,
}

impl TreeMutator {
    /// Sorts the tree with [DEFAULT_INITIAL_SORT] and lays it out.
    pub fn new(
        tree: Tree,
        catalog: StrainCatalog,
        config: LayoutConfig,
    ) -> Result<Self, Error> {
        Self::with_initial_sort(tree, catalog, config, Some(DEFAULT_INITIAL_SORT))
    }

    /// Like [TreeMutator::new]; `None` keeps the children in parse order.
    pub fn with_initial_sort(
        mut tree: Tree,
        catalog: StrainCatalog,
        config: LayoutConfig,
        initial_sort: Option<(SortCriterion, SortDirection)>,
    ) -> Result<Self, Error> {
        if let Some((criterion, direction)) = initial_sort {
            tree.sort_by(criterion, direction);
        }
        let layout = compute_layout(&mut tree, &config)?;
        let scale_bar = layout.scale().scale_bar(DEFAULT_SCALE_BAR_LENGTH)?;
        Ok(Self { tree, catalog, config, layout, scale_bar })
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn catalog(&self) -> &StrainCatalog {
        &self.catalog
    }

    pub fn scale_bar(&self) -> ScaleBar {
        self.scale_bar
    }

    fn resolve(&self, layout_id: usize) -> Result<NodeId, PreconditionError> {
        self.layout
            .node_id(layout_id)
            .ok_or(PreconditionError::UnknownLayoutId(layout_id))
    }

    pub fn reroot(&mut self, layout_id: usize) -> Result<(), Error> {
        let node_id = self.resolve(layout_id)?;
        self.tree.reroot(node_id)?;
        self.compute_layout()
    }

    pub fn swap_children(&mut self, layout_id: usize) -> Result<(), Error> {
        let node_id = self.resolve(layout_id)?;
        self.tree.swap_children(node_id)?;
        self.compute_layout()
    }

    pub fn sort_by(
        &mut self,
        criterion: SortCriterion,
        direction: SortDirection,
    ) -> Result<(), Error> {
        self.tree.sort_by(criterion, direction);
        self.compute_layout()
    }

    /// Changes only the scale bar; the tree and its layout are untouched.
    pub fn set_scale_bar_length(
        &mut self,
        length: TreeFloat,
    ) -> Result<ScaleBar, LayoutError> {
        self.scale_bar = self.layout.scale().scale_bar(length)?;
        debug!(length, width = self.scale_bar.width, "scale bar updated");
        Ok(self.scale_bar)
    }

    pub fn compute_layout(&mut self) -> Result<(), Error> {
        self.layout = compute_layout(&mut self.tree, &self.config)?;
        self.scale_bar = self.layout.scale().scale_bar(self.scale_bar.length)?;
        Ok(())
    }

    pub fn snapshot(&self) -> Snapshot {
        let root_id = self.tree.first_node_id();
        let mut lookup_errors: Vec<LookupError> = Vec::new();
        let mut nodes: Vec<NodeView> = Vec::with_capacity(self.layout.len());

        for (id, node_id) in self.layout.node_ids().iter().enumerate() {
            let Some(node) = self.tree.node(Some(*node_id)) else {
                continue;
            };
            let is_leaf = node.is_tip();
            let is_root = Some(*node_id) == root_id;

            let leaf = if is_leaf {
                let name = node.name().as_deref().unwrap_or_default().to_string();
                let record = match self.catalog.lookup(&name) {
                    Ok(record) => record.clone(),
                    Err(err) => {
                        warn!(leaf = %name, "no strain record for leaf");
                        lookup_errors.push(err);
                        StrainRecord::placeholder(&name)
                    }
                };
                Some(LeafView { name, record })
            } else {
                None
            };

            nodes.push(NodeView {
                id,
                x: node.x(),
                y: node.y(),
                length: self.tree.branch_length(*node_id),
                support: if is_leaf || is_root {
                    None
                } else {
                    node.support().map(|s| s.to_string())
                },
                is_leaf,
                children: self
                    .tree
                    .children(node_id)
                    .iter()
                    .filter_map(|child| child.layout_id())
                    .collect(),
                leaf,
            });
        }

        Snapshot { nodes, scale_bar: self.scale_bar, lookup_errors }
    }

    pub fn to_newick(&self) -> String {
        write_newick(&self.tree)
    }
}
