pub(crate) mod newick;

use crate::TreeError;
use std::fmt::Display;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Malformed Newick string ({kind}) at byte {position}: \"{fragment}\".")]
    Malformed {
        kind: MalformedKind,
        position: usize,
        fragment: String,
    },
    #[error(transparent)]
    Tree(#[from] TreeError),
}

impl ParseError {
    pub fn kind(&self) -> Option<MalformedKind> {
        match self {
            ParseError::Malformed { kind, .. } => Some(*kind),
            ParseError::Tree(_) => None,
        }
    }

    pub fn position(&self) -> Option<usize> {
        match self {
            ParseError::Malformed { position, .. } => Some(*position),
            ParseError::Tree(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedKind {
    Empty,
    UnbalancedParentheses,
    InvalidLength,
    MissingTerminator,
    TrailingInput,
    UnexpectedToken,
}

impl Display for MalformedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                MalformedKind::Empty => "empty input",
                MalformedKind::UnbalancedParentheses => "unbalanced parentheses",
                MalformedKind::InvalidLength => "invalid branch length",
                MalformedKind::MissingTerminator => "missing ';'",
                MalformedKind::TrailingInput => "input after ';'",
                MalformedKind::UnexpectedToken => "unexpected token",
            }
        )
    }
}
