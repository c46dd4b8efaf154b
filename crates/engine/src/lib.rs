//! Distributed strongly connected components over partitioned CSR graphs.
//!
//! The engine runs bulk-synchronously on a world of single-threaded ranks,
//! each owning a disjoint vertex slice of the input graph. All cross-rank
//! traffic goes through a handful of collectives ([`comm::Communicator`])
//! and one typed [frontier exchange](frontier::Frontier).
//!
//! The decomposition pipeline follows the forward-backward family of
//! distributed SCC algorithms: trimming of trivially dead vertices, a
//! forward/backward reachability pair around a heavy pivot for the giant
//! component, min-label coloring rounds for the medium tier, and a
//! replicated serial Tarjan for the residual tail.
//!
//! # Example
//!
//! ```
//! use scc_engine::prelude::*;
//! use scc_graph::prelude::*;
//!
//! let edges = vec![(0, 1), (1, 2), (2, 0), (3, 3)];
//! let results = spmd(2, |world| {
//!     let part = BalancedSlicePart::new(4u32, world.world_rank(), 2);
//!     let graph: GraphPart<_, u32, usize> = GraphPart::from_global_edges(part, &edges);
//!     scc(&graph, &world, &SccConfig::default())
//! });
//!
//! assert_eq!(results[0], vec![0, 0]);
//! assert_eq!(results[1], vec![0, 3]);
//! ```

pub mod bits;
pub mod color;
pub mod comm;
pub mod complement;
pub mod frontier;
pub mod pivot;
pub mod prelude;
pub mod reach;
pub mod scc;
pub mod subgraph;
pub mod tarjan;
pub mod trim;

pub use crate::comm::{spmd, Communicator, SingleRank, ThreadWorld};
pub use crate::scc::{scc, SccConfig};
