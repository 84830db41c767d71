pub(crate) mod layout;
pub(crate) mod node;
mod reroot;
pub(crate) mod support;
pub(crate) mod tree;

pub type TreeFloat = f64;

pub use layout::{
    BranchScale, Layout, LayoutConfig, LayoutError, ScaleBar, Separation,
    compute_layout,
};
pub use node::{Node, NodeId, NodeType};
pub use support::merge_support_values;
pub use tree::{
    PreconditionError, SortCriterion, SortDirection, Tree, TreeError,
};
