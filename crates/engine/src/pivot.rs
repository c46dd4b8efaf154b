//! Pivot selection: the live vertex maximizing indegree times outdegree.
//!
//! Real-world graphs almost always have the heaviest-product vertex inside
//! the largest SCC, so the following forward-backward search decides a big
//! chunk of the graph in one pass.

use log::debug;

use crate::bits::GlobalBits;
use crate::comm::Communicator;
use scc_graph::{GraphPart, Idx, Partition};

/// Picks the undecided vertex with the globally maximal product of live
/// degrees; ties break to the smallest vertex id. Returns `None` when no
/// rank has an undecided vertex left.
pub fn select_pivot<P, NI, EI, C>(
    graph: &GraphPart<P, NI, EI>,
    comm: &C,
    scc_id: &[NI],
    decided: &GlobalBits,
) -> Option<NI>
where
    P: Partition<NI>,
    NI: Idx,
    EI: Idx,
    C: Communicator,
{
    let part = graph.part();

    let mut best: Option<(u64, NI)> = None;
    for k in 0..graph.local_n() {
        let k = NI::new(k);
        if scc_id[k.index()] != NI::max_value() {
            continue;
        }
        let u = part.to_global(k);

        let out = live_degree(graph.out_neighbors(k), u, decided);
        let product = if out == 0 {
            0
        } else {
            out * live_degree(graph.in_neighbors(k), u, decided)
        };

        let better = match best {
            None => true,
            Some((best_product, best_u)) => {
                product > best_product || (product == best_product && u < best_u)
            }
        };
        if better {
            best = Some((product, u));
        }
    }

    // Lexicographic max over (product, inverted id): the inversion makes the
    // smallest id win among equal products.
    let local = match best {
        Some((product, u)) => (product + 1, u64::MAX - u.index() as u64),
        None => (0, 0),
    };
    let (product, inverted) = comm.all_reduce_max_pair(local);
    if product == 0 {
        return None;
    }

    let pivot = NI::new((u64::MAX - inverted) as usize);
    debug!(
        "rank {}: pivot {:?} with live degree product {}",
        part.world_rank(),
        pivot,
        product - 1
    );
    Some(pivot)
}

fn live_degree<NI: Idx>(neighbors: &[NI], u: NI, decided: &GlobalBits) -> u64 {
    neighbors
        .iter()
        .filter(|&&v| v != u && !decided.get(v))
        .count() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::{spmd, SingleRank};
    use scc_graph::{BalancedSlicePart, GraphPart, SinglePart};

    #[test]
    fn picks_heaviest_product_vertex() {
        // Vertex 1 has 2 in- and 2 out-neighbors, everything else less.
        let edges = vec![(0, 1), (2, 1), (1, 3), (1, 4), (3, 0), (4, 2)];
        let part = SinglePart::new(5u32);
        let graph: GraphPart<_, u32, usize> = GraphPart::from_global_edges(part, &edges);
        let scc_id = vec![u32::MAX; 5];
        let decided = GlobalBits::new(5);

        let pivot = select_pivot(&graph, &SingleRank, &scc_id, &decided);
        assert_eq!(pivot, Some(1));
    }

    #[test]
    fn ties_break_to_smallest_id() {
        // A clean ring: every vertex has product 1.
        let edges = vec![(0, 1), (1, 2), (2, 0)];
        let part = SinglePart::new(3u32);
        let graph: GraphPart<_, u32, usize> = GraphPart::from_global_edges(part, &edges);
        let scc_id = vec![u32::MAX; 3];
        let decided = GlobalBits::new(3);

        let pivot = select_pivot(&graph, &SingleRank, &scc_id, &decided);
        assert_eq!(pivot, Some(0));
    }

    #[test]
    fn decided_vertices_do_not_count() {
        let edges = vec![(0, 1), (1, 0), (1, 2), (2, 1)];
        let part = SinglePart::new(3u32);
        let graph: GraphPart<_, u32, usize> = GraphPart::from_global_edges(part, &edges);
        let mut scc_id = vec![u32::MAX; 3];
        let mut decided = GlobalBits::new(3);
        scc_id[0] = 0;
        decided.set(0u32);

        // With 0 gone, vertices 1 and 2 both have live product 1.
        let pivot = select_pivot(&graph, &SingleRank, &scc_id, &decided);
        assert_eq!(pivot, Some(1));
    }

    #[test]
    fn all_ranks_agree_on_the_pivot() {
        let edges = vec![(0, 1), (2, 1), (1, 3), (1, 4), (3, 0), (4, 2)];
        let pivots = spmd(3, |world| {
            let part = BalancedSlicePart::new(5u32, world.world_rank(), 3);
            let graph: GraphPart<_, u32, usize> = GraphPart::from_global_edges(part, &edges);
            let scc_id = vec![u32::MAX; graph.local_n()];
            let decided = GlobalBits::new(5);
            select_pivot(&graph, &world, &scc_id, &decided)
        });
        assert_eq!(pivots, vec![Some(1); 3]);
    }

    #[test]
    fn no_live_vertex_yields_none() {
        let part = SinglePart::new(2u32);
        let graph: GraphPart<_, u32, usize> = GraphPart::from_global_edges(part, &[(0, 1)]);
        let scc_id = vec![0u32, 1];
        let mut decided = GlobalBits::new(2);
        decided.set(0u32);
        decided.set(1u32);

        assert_eq!(select_pivot(&graph, &SingleRank, &scc_id, &decided), None);
    }
}
