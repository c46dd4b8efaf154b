//! Replicates the induced sub-graph over the undecided vertices on every
//! rank, relabelled to a dense id space.

use std::time::Instant;

use log::info;

use crate::bits::GlobalBits;
use crate::comm::Communicator;
use scc_graph::{Csr, GraphPart, Idx, Partition};

/// A self-contained replicated sub-graph.
///
/// `ids[new]` is the global vertex id of sub-vertex `new`; the list is
/// sorted, so relabeling is a binary search and the minimum position in a
/// component maps to the minimum global id.
#[derive(Debug)]
pub struct SubGraph<NI: Idx, EI: Idx> {
    pub ids: Vec<NI>,
    pub fw: Csr<EI, NI>,
    pub bw: Csr<EI, NI>,
}

impl<NI: Idx, EI: Idx> SubGraph<NI, EI> {
    pub fn node_count(&self) -> usize {
        self.ids.len()
    }
}

/// Collectively builds the induced sub-graph over all undecided vertices.
///
/// Every rank contributes its undecided ids in local order, the
/// concatenation is sorted (a no-op for ordered schemes, where rank blocks
/// already ascend), and per-rank degree and neighbor blocks are gathered and
/// permuted into the sorted order. The result is identical on every rank.
pub fn allgather_sub_graph<P, NI, EI, C>(
    graph: &GraphPart<P, NI, EI>,
    comm: &C,
    scc_id: &[NI],
    decided: &GlobalBits,
) -> SubGraph<NI, EI>
where
    P: Partition<NI>,
    NI: Idx,
    EI: Idx,
    C: Communicator,
{
    let part = graph.part();
    let start = Instant::now();

    let local_ids = (0..graph.local_n())
        .filter(|&k| scc_id[k] == NI::max_value())
        .map(|k| part.to_global(NI::new(k)))
        .collect::<Vec<_>>();

    // Rank-order concatenation; `ids` additionally sorted for relabeling.
    let concat = comm.all_gatherv(&local_ids);
    let mut ids = concat.clone();
    ids.sort_unstable();

    let position = |v: NI| -> usize { ids.binary_search(&v).expect("vertex not in sub-graph") };

    let fw = gather_direction(graph, comm, decided, &local_ids, &concat, &ids, true, &position);
    let bw = gather_direction(graph, comm, decided, &local_ids, &concat, &ids, false, &position);

    info!(
        "rank {}: replicated residual with {} vertices and {} edges in {:?}",
        part.world_rank(),
        ids.len(),
        fw.edge_count().index(),
        start.elapsed()
    );

    SubGraph { ids, fw, bw }
}

#[allow(clippy::too_many_arguments)]
fn gather_direction<P, NI, EI, C>(
    graph: &GraphPart<P, NI, EI>,
    comm: &C,
    decided: &GlobalBits,
    local_ids: &[NI],
    concat: &[NI],
    ids: &[NI],
    forward: bool,
    position: &dyn Fn(NI) -> usize,
) -> Csr<EI, NI>
where
    P: Partition<NI>,
    NI: Idx,
    EI: Idx,
    C: Communicator,
{
    let part = graph.part();

    // Degrees and relabelled neighbor lists of the local sub-vertices, in
    // local id order (matching this rank's block of `concat`).
    let mut local_degrees: Vec<NI> = Vec::with_capacity(local_ids.len());
    let mut local_csr: Vec<NI> = Vec::new();
    for &u in local_ids {
        let k = part.to_local(u);
        let neighbors = if forward {
            graph.out_neighbors(k)
        } else {
            graph.in_neighbors(k)
        };

        let mut degree = 0;
        for &v in neighbors {
            if !decided.get(v) {
                local_csr.push(NI::new(position(v)));
                degree += 1;
            }
        }
        local_degrees.push(NI::new(degree));
    }

    let degrees = comm.all_gatherv(&local_degrees);
    let targets = comm.all_gatherv(&local_csr);

    // Permute the rank-ordered rows into sorted-id order. The permutation is
    // the identity for ordered partition schemes.
    let sub_n = ids.len();
    let mut head = vec![EI::zero(); sub_n + 1];
    for (row, &u) in concat.iter().enumerate() {
        head[position(u) + 1] = EI::new(degrees[row].index());
    }
    for i in 0..sub_n {
        head[i + 1] = EI::new(head[i].index() + head[i + 1].index());
    }

    let mut csr = vec![NI::zero(); targets.len()];
    let mut source = 0;
    for (row, &u) in concat.iter().enumerate() {
        let degree = degrees[row].index();
        let dest = head[position(u)].index();
        csr[dest..dest + degree].copy_from_slice(&targets[source..source + degree]);
        source += degree;
    }

    Csr::new(head.into_boxed_slice(), csr.into_boxed_slice())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::{spmd, SingleRank};
    use scc_graph::{BalancedSlicePart, CyclicPart, GraphPart, SinglePart};

    const UNDECIDED: u32 = u32::MAX;

    fn edges() -> Vec<(u32, u32)> {
        vec![(0, 1), (1, 2), (2, 0), (2, 3), (3, 4), (4, 3), (1, 4)]
    }

    /// Vertices 0 and 3 decided; residual is {1, 2, 4} with edges 1 -> 2
    /// and 1 -> 4.
    fn decide_some(part: &impl scc_graph::Partition<u32>) -> (Vec<u32>, GlobalBits) {
        let mut decided = GlobalBits::new(5);
        decided.set(0u32);
        decided.set(3u32);
        let scc_id = (0..part.local_n())
            .map(|k| {
                let u = part.to_global(k);
                if u == 0 || u == 3 {
                    u
                } else {
                    UNDECIDED
                }
            })
            .collect();
        (scc_id, decided)
    }

    fn check(sub: &SubGraph<u32, usize>) {
        assert_eq!(sub.ids, vec![1, 2, 4]);
        // Positions: 1 -> 0, 2 -> 1, 4 -> 2. Surviving edges: 1 -> 2, 1 -> 4.
        assert_eq!(sub.fw.edge_count(), 2);
        assert_eq!(sub.bw.edge_count(), 2);
        assert_eq!(sub.fw.targets(0u32), &[1, 2]);
        assert_eq!(sub.fw.targets(1u32), &[] as &[u32]);
        assert_eq!(sub.fw.targets(2u32), &[] as &[u32]);
        assert_eq!(sub.bw.targets(0u32), &[] as &[u32]);
        assert_eq!(sub.bw.targets(1u32), &[0]);
        assert_eq!(sub.bw.targets(2u32), &[0]);
    }

    #[test]
    fn single_rank_residual() {
        let part = SinglePart::new(5u32);
        let graph: GraphPart<_, u32, usize> = GraphPart::from_global_edges(part, &edges());
        let (scc_id, decided) = decide_some(&part);

        let sub = allgather_sub_graph(&graph, &SingleRank, &scc_id, &decided);
        check(&sub);
    }

    #[test]
    fn replicated_residual_is_identical_on_all_ranks() {
        for world_size in [2, 3] {
            let subs = spmd(world_size, |world| {
                let part = BalancedSlicePart::new(5u32, world.world_rank(), world_size);
                let graph: GraphPart<_, u32, usize> = GraphPart::from_global_edges(part, &edges());
                let (scc_id, decided) = decide_some(&part);
                allgather_sub_graph(&graph, &world, &scc_id, &decided)
            });

            for sub in &subs {
                check(sub);
                assert_eq!(sub.ids, subs[0].ids);
                assert_eq!(sub.fw, subs[0].fw);
                assert_eq!(sub.bw, subs[0].bw);
            }
        }
    }

    #[test]
    fn cyclic_scheme_needs_the_sort() {
        let subs = spmd(2, |world| {
            let part = CyclicPart::new(5u32, world.world_rank(), 2);
            let graph: GraphPart<_, u32, usize> = GraphPart::from_global_edges(part, &edges());
            let (scc_id, decided) = decide_some(&part);
            allgather_sub_graph(&graph, &world, &scc_id, &decided)
        });

        for sub in &subs {
            check(sub);
        }
    }

    #[test]
    fn empty_residual() {
        let part = SinglePart::new(2u32);
        let graph: GraphPart<_, u32, usize> = GraphPart::from_global_edges(part, &[(0, 1)]);
        let mut decided = GlobalBits::new(2);
        decided.set(0u32);
        decided.set(1u32);

        let sub = allgather_sub_graph(&graph, &SingleRank, &[0, 1], &decided);
        assert_eq!(sub.node_count(), 0);
        assert_eq!(sub.fw.edge_count(), 0);
    }
}
