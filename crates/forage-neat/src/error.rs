//! Error types for the evolution engine

use std::path::PathBuf;

use thiserror::Error;

use crate::genome::NodeId;

/// Errors surfaced by the engine
#[derive(Debug, Error)]
pub enum NeatError {
    /// A gene with this ordered endpoint pair is already part of the genome
    #[error("connection {from} -> {to} already exists")]
    DuplicateConnection { from: NodeId, to: NodeId },

    /// A gene referenced a node id the genome does not own
    #[error("node {0} does not exist in this genome")]
    UnknownNode(NodeId),

    /// Writing a generation dump or fitness log failed
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl NeatError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, NeatError>;
