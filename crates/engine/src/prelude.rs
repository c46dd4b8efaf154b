pub use crate::bits::GlobalBits;
pub use crate::comm::{spmd, CommValue, Communicator, SingleRank, ThreadWorld};
pub use crate::complement::backward_complement;
pub use crate::frontier::{Edge, Frontier, LabeledEdge, Payload};
pub use crate::scc::{scc, SccConfig};
pub use crate::subgraph::{allgather_sub_graph, SubGraph};
pub use crate::tarjan::tarjan;
