use super::{NodeId, Tree, TreeFloat};
use serde::{Deserialize, Serialize};
use slotmap::SecondaryMap;
use thiserror::Error;
use tracing::{instrument, trace};

#[derive(Debug, Error, PartialEq)]
pub enum LayoutError {
    #[error("Invalid layout configuration: {0}.")]
    InvalidConfig(String),
    #[error("Scale bar length must be finite and non-negative, got {0}.")]
    InvalidScaleBarLength(TreeFloat),
    #[error("Cannot lay out an empty tree.")]
    EmptyTree,
}

/// Gap between neighbouring tips, in units that are later normalised to
/// the configured span.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Separation {
    /// Tips that share a parent.
    pub siblings: TreeFloat,
    /// Tips in different clades.
    pub cousins: TreeFloat,
}

impl Default for Separation {
    fn default() -> Self {
        Self { siblings: 1.0, cousins: 1.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    /// Extent of the axis along which tips are stacked.
    pub span: TreeFloat,
    /// Extent of the branch-length axis.
    pub display_width: TreeFloat,
    pub separation: Separation,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self { span: 300.0, display_width: 500.0, separation: Separation::default() }
    }
}

impl LayoutConfig {
    pub fn validate(&self) -> Result<(), LayoutError> {
        let fields = [
            ("span", self.span),
            ("displayWidth", self.display_width),
            ("separation.siblings", self.separation.siblings),
            ("separation.cousins", self.separation.cousins),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value <= 0.0 {
                return Err(LayoutError::InvalidConfig(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Linear map from `[0, max_length]` onto `[0, display_width]`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchScale {
    max_length: TreeFloat,
    display_width: TreeFloat,
}

impl BranchScale {
    pub fn new(max_length: TreeFloat, display_width: TreeFloat) -> Self {
        Self { max_length, display_width }
    }

    pub fn max_length(&self) -> TreeFloat {
        self.max_length
    }

    pub fn display_width(&self) -> TreeFloat {
        self.display_width
    }

    /// A zero domain maps everything to zero.
    pub fn apply(&self, length: TreeFloat) -> TreeFloat {
        if self.max_length > 0.0 {
            length / self.max_length * self.display_width
        } else {
            0.0
        }
    }

    pub fn scale_bar(&self, length: TreeFloat) -> Result<ScaleBar, LayoutError> {
        if !length.is_finite() || length < 0.0 {
            return Err(LayoutError::InvalidScaleBarLength(length));
        }
        let width = self.apply(length);
        Ok(ScaleBar { length, width, label_x: width / 2.0 })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleBar {
    pub length: TreeFloat,
    pub width: TreeFloat,
    pub label_x: TreeFloat,
}

/// Result of one layout pass. Layout ids index into `node_ids` and are
/// only meaningful until the next pass.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    scale: BranchScale,
    node_ids: Vec<NodeId>,
}

impl Layout {
    pub fn scale(&self) -> BranchScale {
        self.scale
    }

    pub fn node_id(&self, layout_id: usize) -> Option<NodeId> {
        self.node_ids.get(layout_id).copied()
    }

    pub fn node_ids(&self) -> &[NodeId] {
        &self.node_ids
    }

    pub fn len(&self) -> usize {
        self.node_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_ids.is_empty()
    }
}

/// Assigns layout ids in pre-order, `x` from a cluster layout of the tips
/// and `y` from cumulative branch lengths. Writes only position fields, so
/// running it twice on an unchanged tree gives the same result.
#[instrument(level = "trace", skip(tree, config))]
pub fn compute_layout(
    tree: &mut Tree,
    config: &LayoutConfig,
) -> Result<Layout, LayoutError> {
    config.validate()?;
    let first_node_id = tree.first_node_id().ok_or(LayoutError::EmptyTree)?;
    let order = tree.descendants(first_node_id);

    let xs = cluster_positions(tree, &order, config);
    let scale = BranchScale::new(tree.height(), config.display_width);
    trace!(max_length = scale.max_length(), nodes = order.len(), "branch scale");

    let mut ys: SecondaryMap<NodeId, TreeFloat> = SecondaryMap::new();
    for (layout_id, &node_id) in order.iter().enumerate() {
        let y = match tree.parent_id(&node_id) {
            Some(parent_id) => {
                ys[*parent_id] + scale.apply(tree.branch_length(node_id))
            }
            None => 0.0,
        };
        _ = ys.insert(node_id, y);
        if let Some(node) = tree.node_mut(Some(node_id)) {
            node.set_position(layout_id, xs[node_id], y);
        }
    }

    Ok(Layout { scale, node_ids: order })
}

fn separation(
    tree: &Tree,
    a: &NodeId,
    b: &NodeId,
    config: &LayoutConfig,
) -> TreeFloat {
    if tree.parent_id(a) == tree.parent_id(b) {
        config.separation.siblings
    } else {
        config.separation.cousins
    }
}

/// Tips are placed left to right with the configured separation; internal
/// nodes sit at the mean of their children. The stretch from half a gap
/// before the first tip to half a gap after the last maps onto the span.
fn cluster_positions(
    tree: &Tree,
    order: &[NodeId],
    config: &LayoutConfig,
) -> SecondaryMap<NodeId, TreeFloat> {
    let mut xs: SecondaryMap<NodeId, TreeFloat> = SecondaryMap::new();

    let mut cursor: TreeFloat = 0.0;
    let mut first_tip: Option<NodeId> = None;
    let mut previous_tip: Option<NodeId> = None;
    for &node_id in order.iter().filter(|id| tree.is_tip(id)) {
        if let Some(previous) = previous_tip {
            cursor += separation(tree, &previous, &node_id, config);
        }
        _ = xs.insert(node_id, cursor);
        if first_tip.is_none() {
            first_tip = Some(node_id);
        }
        previous_tip = Some(node_id);
    }

    for &node_id in order.iter().rev() {
        let child_ids = tree.child_ids(&node_id);
        if child_ids.is_empty() {
            continue;
        }
        let sum: TreeFloat = child_ids.iter().map(|id| xs[*id]).sum();
        _ = xs.insert(node_id, sum / child_ids.len() as TreeFloat);
    }

    if let (Some(left), Some(right)) = (first_tip, previous_tip) {
        let gap = separation(tree, &left, &right, config);
        let x0 = xs[left] - gap / 2.0;
        let x1 = xs[right] + gap / 2.0;
        for x in xs.values_mut() {
            *x = (*x - x0) / (x1 - x0) * config.span;
        }
    }

    xs
}
