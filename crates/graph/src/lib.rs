//! Partitioned CSR graphs for distributed strongly-connected-component
//! computation.
//!
//! A directed graph with `n` vertices and `m` edges is stored as a pair of
//! Compressed-Sparse-Row adjacency structures, one per direction. The
//! backward CSR is always the exact transpose of the forward CSR.
//!
//! For a distributed run the vertex set is split over `W` ranks by a
//! [partition scheme](partition). Every rank owns a disjoint vertex slice and
//! holds two local CSRs keyed by local index: the forward CSR over its
//! outgoing edges and the backward CSR over its incoming edges. Neighbor
//! entries are global vertex ids.
//!
//! # Example
//!
//! ```
//! use scc_graph::prelude::*;
//!
//! let graph: Graph<u32, usize> = Graph::from_edges(4, vec![(0, 1), (1, 2), (2, 0), (3, 3)]);
//!
//! assert_eq!(graph.node_count(), 4);
//! assert_eq!(graph.fw().targets(1), &[2]);
//! assert_eq!(graph.bw().targets(0), &[2]);
//! ```
//!
//! The on-disk format is a four-file packed CSR (forward and backward, head
//! and targets each) plus a plain-text manifest; see [`input`] and [`output`].

pub mod graph;
pub mod index;
pub mod input;
pub mod output;
pub mod partition;
pub mod prelude;

pub use crate::graph::{Csr, Graph, GraphPart};
pub use crate::index::Idx;
pub use crate::input::manifest::Manifest;
pub use crate::partition::{
    BalancedSlicePart, BlockCyclicPart, ContinuousPartition, CyclicPart, Partition, SinglePart,
    TrivialSlicePart,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("error while loading graph")]
    IoError {
        #[from]
        source: std::io::Error,
    },
    #[error("malformed manifest: {reason}")]
    ManifestError { reason: String },
    #[error("malformed graph data: {reason}")]
    DeserializeError { reason: String },
    #[error("violated assumption: {reason}")]
    AssumptionError { reason: String },
}

impl Error {
    pub(crate) fn manifest(reason: impl Into<String>) -> Self {
        Error::ManifestError {
            reason: reason.into(),
        }
    }

    pub(crate) fn deserialize(reason: impl Into<String>) -> Self {
        Error::DeserializeError {
            reason: reason.into(),
        }
    }

    pub(crate) fn assumption(reason: impl Into<String>) -> Self {
        Error::AssumptionError {
            reason: reason.into(),
        }
    }
}
