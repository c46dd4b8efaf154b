//! The coloring pass for the medium tier of SCCs.
//!
//! Phase one floods minimum labels forward: every live vertex starts with
//! its own global id and repeatedly adopts any smaller label arriving over
//! an in-edge, until a full round changes nothing anywhere. At the fixpoint
//! `label[v]` is the smallest id among live vertices that reach `v`, so a
//! color class is a superset of every SCC it contains.
//!
//! Phase two walks backward from each color root (a vertex that kept its own
//! id), restricted to its color; everything reached shares an SCC with the
//! root. Each call decides at least the minimum-id live vertex, so the
//! driver's loop always makes progress.

use bitvec::prelude::*;
use log::debug;

use crate::bits::GlobalBits;
use crate::comm::Communicator;
use crate::frontier::{Edge, Frontier};
use scc_graph::{GraphPart, Idx, Partition};

/// One full coloring round: label propagation plus the backward sweep.
/// Returns the number of local decisions.
pub fn color_step<P, NI, EI, C>(
    graph: &GraphPart<P, NI, EI>,
    comm: &C,
    scc_id: &mut [NI],
    decided: &mut GlobalBits,
    frontier: &mut Frontier<NI, Edge<NI>>,
) -> u64
where
    P: Partition<NI>,
    NI: Idx,
    EI: Idx,
    C: Communicator,
{
    let part = graph.part();
    let local_n = graph.local_n();

    let mut colors: Vec<NI> = (0..local_n)
        .map(|k| part.to_global(NI::new(k)))
        .collect();

    let mut active: BitVec<u64, Lsb0> = BitVec::repeat(false, local_n);
    let mut changed: BitVec<u64, Lsb0> = BitVec::repeat(false, local_n);
    let mut stack: Vec<NI> = Vec::new();

    let undecided = |scc_id: &[NI], k: NI| scc_id[k.index()] == NI::max_value();

    // Phase 1: forward propagation of minimum labels.
    for k in 0..local_n {
        if undecided(scc_id, NI::new(k)) {
            active.set(k, true);
            changed.set(k, true);
            stack.push(NI::new(k));
        }
    }

    loop {
        while let Some(k) = stack.pop() {
            active.set(k.index(), false);
            let label = colors[k.index()];
            for &v in graph.out_neighbors(k) {
                if !part.has_local(v) {
                    continue;
                }
                let l = part.to_local(v);
                if undecided(scc_id, l) && label < colors[l.index()] {
                    colors[l.index()] = label;
                    changed.set(l.index(), true);
                    if !active[l.index()] {
                        active.set(l.index(), true);
                        stack.push(l);
                    }
                }
            }
        }

        for k in changed.iter_ones() {
            let label = colors[k];
            for &v in graph.out_neighbors(NI::new(k)) {
                // Only a label below the target id can still improve it.
                if label < v && !part.has_local(v) {
                    frontier.push(part, Edge { u: v, v: label });
                }
            }
        }
        changed.fill(false);

        if !frontier.exchange(comm, part) {
            break;
        }

        while frontier.has_next() {
            let Edge { u, v: label } = frontier.next();
            let k = part.to_local(u);
            if undecided(scc_id, k) && label < colors[k.index()] {
                colors[k.index()] = label;
                changed.set(k.index(), true);
                if !active[k.index()] {
                    active.set(k.index(), true);
                    stack.push(k);
                }
            }
        }
    }

    // Phase 2: backward sweep from the color roots, restricted to the color.
    let mut count = 0u64;
    debug_assert!(stack.is_empty());
    changed.fill(false);

    for k in 0..local_n {
        let l = NI::new(k);
        if undecided(scc_id, l) && colors[k] == part.to_global(l) {
            scc_id[k] = colors[k];
            decided.set(colors[k]);
            count += 1;
            changed.set(k, true);
            active.set(k, true);
            stack.push(l);
        }
    }

    loop {
        while let Some(k) = stack.pop() {
            active.set(k.index(), false);
            let color = colors[k.index()];
            for &v in graph.in_neighbors(k) {
                if !part.has_local(v) {
                    continue;
                }
                let l = part.to_local(v);
                if undecided(scc_id, l) && colors[l.index()] == color {
                    scc_id[l.index()] = color;
                    decided.set(v);
                    count += 1;
                    changed.set(l.index(), true);
                    if !active[l.index()] {
                        active.set(l.index(), true);
                        stack.push(l);
                    }
                }
            }
        }

        for k in changed.iter_ones() {
            let color = colors[k];
            for &v in graph.in_neighbors(NI::new(k)) {
                if !part.has_local(v) {
                    frontier.push(part, Edge { u: v, v: color });
                }
            }
        }
        changed.fill(false);

        if !frontier.exchange(comm, part) {
            break;
        }

        while frontier.has_next() {
            let Edge { u, v: color } = frontier.next();
            let k = part.to_local(u);
            if undecided(scc_id, k) && colors[k.index()] == color {
                scc_id[k.index()] = color;
                decided.set(u);
                count += 1;
                changed.set(k.index(), true);
                if !active[k.index()] {
                    active.set(k.index(), true);
                    stack.push(k);
                }
            }
        }
    }

    debug!(
        "rank {}: coloring decided {} vertices",
        part.world_rank(),
        count
    );
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::{spmd, SingleRank};
    use scc_graph::{BalancedSlicePart, GraphPart, SinglePart};

    const UNDECIDED: u32 = u32::MAX;

    fn run_single(n: u32, edges: &[(u32, u32)]) -> Vec<u32> {
        let part = SinglePart::new(n);
        let graph: GraphPart<_, u32, usize> = GraphPart::from_global_edges(part, edges);
        let mut scc_id = vec![UNDECIDED; n as usize];
        let mut decided = GlobalBits::new(n as usize);
        let mut frontier = Frontier::new(1, 0);
        let mut total = 0;
        while scc_id.iter().any(|&id| id == UNDECIDED) {
            total += color_step(&graph, &SingleRank, &mut scc_id, &mut decided, &mut frontier);
        }
        assert_eq!(total, n as u64);
        scc_id
    }

    #[test]
    fn two_cycles_get_their_minimum_ids() {
        let edges = vec![(0, 1), (1, 2), (2, 0), (3, 4), (4, 5), (5, 3), (2, 3)];
        assert_eq!(run_single(6, &edges), vec![0, 0, 0, 3, 3, 3]);
    }

    #[test]
    fn chain_becomes_singletons() {
        let edges = vec![(0, 1), (1, 2), (2, 3)];
        assert_eq!(run_single(4, &edges), vec![0, 1, 2, 3]);
    }

    #[test]
    fn distributed_coloring_matches_single_rank() {
        let edges = vec![
            (0, 1),
            (1, 2),
            (2, 0),
            (3, 4),
            (4, 5),
            (5, 3),
            (2, 3),
            (5, 6),
        ];
        let results = spmd(3, |world| {
            let part = BalancedSlicePart::new(7u32, world.world_rank(), 3);
            let graph: GraphPart<_, u32, usize> = GraphPart::from_global_edges(part, &edges);
            let mut scc_id = vec![UNDECIDED; graph.local_n()];
            let mut decided = GlobalBits::new(7);
            let mut frontier = Frontier::new(3, world.world_rank());

            loop {
                let local = color_step(&graph, &world, &mut scc_id, &mut decided, &mut frontier);
                decided.merge(&world);
                let undecided = scc_id.iter().filter(|&&id| id == UNDECIDED).count() as u64;
                let _ = local;
                if world.all_reduce_sum(undecided) == 0 {
                    break;
                }
            }
            scc_id
        });

        assert_eq!(results.concat(), vec![0, 0, 0, 3, 3, 3, 6]);
    }
}
