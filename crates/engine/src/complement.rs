//! Materializes the backward CSR of a graph partition from its forward CSR.
//!
//! On one rank this is the local three-pass transpose. Across ranks every
//! forward edge `(u, v)` is shipped as `(v, u)` to the owner of `v` in one
//! exchange; afterwards each rank holds exactly its incoming edges and
//! builds the local CSR from the received list.

use std::time::Instant;

use log::info;

use crate::comm::Communicator;
use crate::frontier::{Edge, Frontier};
use scc_graph::{Csr, Idx, Partition};

pub fn backward_complement<P, NI, EI, C>(part: &P, fw: &Csr<EI, NI>, comm: &C) -> Csr<EI, NI>
where
    P: Partition<NI>,
    NI: Idx,
    EI: Idx,
    C: Communicator,
{
    if comm.world_size() == 1 {
        return fw.transpose();
    }

    let start = Instant::now();
    let local_n = part.local_n().index();

    let mut frontier: Frontier<NI, Edge<NI>> =
        Frontier::new(comm.world_size(), comm.world_rank());
    for k in 0..local_n {
        let u = part.to_global(NI::new(k));
        for &v in fw.targets(NI::new(k)) {
            frontier.relaxed_push(part, Edge { u: v, v: u });
        }
    }

    let mut incoming = Vec::new();
    frontier.exchange(comm, part);
    while frontier.has_next() {
        let edge = frontier.next();
        debug_assert!(part.has_local(edge.u));
        incoming.push((edge.u, edge.v));
    }

    let bw: Csr<EI, NI> = Csr::from_part_edges(part, incoming);
    info!(
        "rank {}: complemented {} backward edges in {:?}",
        part.world_rank(),
        bw.edge_count().index(),
        start.elapsed()
    );
    bw
}
