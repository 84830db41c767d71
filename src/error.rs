use crate::{LayoutError, LookupError, ParseError, PreconditionError, TreeError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Precondition(#[from] PreconditionError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error("Could not read strain catalog: {0}")]
    Catalog(#[from] serde_json::Error),
}
