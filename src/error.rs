use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

use crate::variables::VarId;

/// The result type used in the entire crate.
pub type Result<T> = std::result::Result<T, LookaheadErr>;

/// The crate's error type.
#[derive(Debug)]
pub enum LookaheadErr {
    /// A configuration value is out of its domain, caught at construction.
    InvalidConfig(String),
    /// An optimizer name or spec that doesn't resolve to a known optimizer.
    UnknownOptimizer(String),
    ShapeMismatch {
        what: &'static str,
        got: Vec<usize>,
        expected: Vec<usize>,
    },
    UnknownVariable(VarId),
    MissingGradient(VarId),
    /// The persisted state doesn't belong to the optimizer it's being loaded into.
    StateMismatch(String),
    Deserialization(serde_json::Error),
    Io(io::Error),
}

impl Display for LookaheadErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Self::UnknownOptimizer(name) => write!(f, "unknown optimizer: {name}"),
            Self::ShapeMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "There's a shape mismatch in {what}, got {got:?} and expected {expected:?}"
            ),
            Self::UnknownVariable(id) => write!(f, "variable {id} is not in the store"),
            Self::MissingGradient(id) => write!(f, "no gradient was provided for variable {id}"),
            Self::StateMismatch(msg) => write!(f, "state mismatch: {msg}"),
            Self::Deserialization(e) => write!(f, "deserialization error: {e}"),
            Self::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl Error for LookaheadErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Deserialization(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for LookaheadErr {
    fn from(e: serde_json::Error) -> Self {
        Self::Deserialization(e)
    }
}

impl From<io::Error> for LookaheadErr {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
