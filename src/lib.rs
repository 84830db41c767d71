mod error;
mod metadata;
mod mutator;
mod parsers;
mod phylo;

pub use error::Error;
pub use metadata::{LookupError, StrainCatalog, StrainRecord};
pub use mutator::{
    DEFAULT_INITIAL_SORT, DEFAULT_SCALE_BAR_LENGTH, LeafView, NodeView, Snapshot, TreeMutator,
};
pub use parsers::newick::parse_newick;
pub use parsers::newick::write_newick;
pub use parsers::{MalformedKind, ParseError};
pub use phylo::TreeFloat;
pub use phylo::{
    BranchScale, Layout, LayoutConfig, LayoutError, ScaleBar, Separation,
    compute_layout,
};
pub use phylo::{Node, NodeId, NodeType};
pub use phylo::{PreconditionError, SortCriterion, SortDirection, Tree, TreeError};
pub use phylo::merge_support_values;
