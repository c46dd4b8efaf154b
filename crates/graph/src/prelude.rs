pub use crate::graph::{Csr, Graph, GraphPart};
pub use crate::index::Idx;
pub use crate::input::binary::Endian;
pub use crate::input::edgelist::EdgeList;
pub use crate::input::manifest::Manifest;
pub use crate::input::{load_graph, load_graph_part};
pub use crate::output::write_graph;
pub use crate::partition::{
    BalancedSlicePart, BlockCyclicPart, ContinuousPartition, CyclicPart, Partition, SinglePart,
    TrivialSlicePart,
};
pub use crate::Error;
