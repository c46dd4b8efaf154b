//! Distributed forward/backward reachability from a pivot.
//!
//! Both sweeps run the same level-synchronous search, the backward one
//! restricted to the forward reachable set. Three traversal modes:
//!
//! * **top-down**: expand the frontier along primary edges; remote
//!   candidates travel through the frontier primitive and are accepted by
//!   their owner.
//! * **bottom-up**: every unvisited live vertex scans its reverse
//!   neighbors for any visited one; pays off once the frontier covers a
//!   large fraction of the graph.
//! * **bitmap-exchange**: frontier vertices mark their primary neighbors
//!   directly in the global visited bitmap, ranks merge with a bitwise-OR
//!   all-reduce and discover their newly visited vertices by scanning; for
//!   searches that have become shallow but wide.
//!
//! Mode switches are driven by globally reduced values, so every rank takes
//! them in the same round.

use bitvec::prelude::*;
use log::{debug, info};
use std::time::Instant;

use crate::bits::GlobalBits;
use crate::comm::Communicator;
use crate::frontier::Frontier;
use crate::scc::SccConfig;
use scc_graph::{Csr, GraphPart, Idx, Partition};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    TopDown,
    BottomUp,
    Bitmap,
}

/// Runs the forward and the backward sweep and decides the pivot's SCC.
///
/// Every owned vertex reachable both from and to the pivot gets the pivot's
/// global id. Returns the number of local decisions.
pub fn forward_backward<P, NI, EI, C>(
    graph: &GraphPart<P, NI, EI>,
    comm: &C,
    scc_id: &mut [NI],
    decided: &mut GlobalBits,
    pivot: NI,
    m_total: u64,
    config: &SccConfig,
) -> u64
where
    P: Partition<NI>,
    NI: Idx,
    EI: Idx,
    C: Communicator,
{
    let part = graph.part();

    let start = Instant::now();
    let fw_set = reach_set(
        graph,
        comm,
        graph.fw(),
        graph.bw(),
        decided,
        None,
        pivot,
        m_total,
        config,
    );
    info!(
        "rank {}: forward sweep reached {} vertices in {:?}",
        part.world_rank(),
        fw_set.count_ones(),
        start.elapsed()
    );

    let start = Instant::now();
    let bw_set = reach_set(
        graph,
        comm,
        graph.bw(),
        graph.fw(),
        decided,
        Some(&fw_set),
        pivot,
        m_total,
        config,
    );
    info!(
        "rank {}: backward sweep reached {} vertices in {:?}",
        part.world_rank(),
        bw_set.count_ones(),
        start.elapsed()
    );

    // F ∩ B is the pivot's SCC; each rank commits its owned share.
    let mut count = 0;
    for k in 0..graph.local_n() {
        let k = NI::new(k);
        if scc_id[k.index()] != NI::max_value() {
            continue;
        }
        let u = part.to_global(k);
        if fw_set.get(u) && bw_set.get(u) {
            scc_id[k.index()] = pivot;
            decided.set(u);
            count += 1;
        }
    }
    decided.merge(comm);

    count
}

/// One reachability sweep over `primary` edges; `reverse` drives the
/// bottom-up mode. Returns the fully merged visited set.
#[allow(clippy::too_many_arguments)]
fn reach_set<P, NI, EI, C>(
    graph: &GraphPart<P, NI, EI>,
    comm: &C,
    primary: &Csr<EI, NI>,
    reverse: &Csr<EI, NI>,
    decided: &GlobalBits,
    restrict: Option<&GlobalBits>,
    pivot: NI,
    m_total: u64,
    config: &SccConfig,
) -> GlobalBits
where
    P: Partition<NI>,
    NI: Idx,
    EI: Idx,
    C: Communicator,
{
    let part = graph.part();
    let n = part.node_count().index();
    let local_n = graph.local_n();

    let mut visited = GlobalBits::new(n);
    // Owned vertices that already joined a frontier; keeps the bitmap-mode
    // discovery from re-emitting old vertices.
    let mut local_seen: BitVec<u64, Lsb0> = BitVec::repeat(false, local_n);
    let mut frontier: Vec<NI> = Vec::new();
    let mut channel: Frontier<NI, NI> = Frontier::new(comm.world_size(), comm.world_rank());

    // The pivot is visited everywhere; only its owner expands it.
    visited.set(pivot);
    if part.has_local(pivot) {
        let k = part.to_local(pivot);
        local_seen.set(k.index(), true);
        frontier.push(k);
    }

    let admits = |v: NI| !decided.get(v) && restrict.map_or(true, |set| set.get(v));

    let mut mode = Mode::TopDown;
    let mut level = 0i64;

    loop {
        let mut next: Vec<NI> = Vec::new();

        match mode {
            Mode::TopDown => {
                let mut work_next = 0u64;

                for &k in &frontier {
                    for &v in primary.targets(k) {
                        if visited.get(v) || !admits(v) {
                            continue;
                        }
                        if part.has_local(v) {
                            let l = part.to_local(v);
                            visited.set(v);
                            local_seen.set(l.index(), true);
                            next.push(l);
                            work_next += primary.degree(l).index() as u64;
                        } else {
                            channel.push(part, v);
                        }
                    }
                }

                if channel.exchange(comm, part) {
                    while channel.has_next() {
                        let v = channel.next();
                        if visited.get(v) || !admits(v) {
                            continue;
                        }
                        let l = part.to_local(v);
                        visited.set(v);
                        local_seen.set(l.index(), true);
                        next.push(l);
                        work_next += primary.degree(l).index() as u64;
                    }
                }

                let work_total = comm.all_reduce_sum(work_next);
                let front_total = comm.all_reduce_sum(next.len() as u64);
                if front_total == 0 {
                    visited.merge(comm);
                    break;
                }

                if work_total as f64 * config.alpha > m_total as f64 {
                    debug!("switch to bottom-up at level {level}");
                    visited.merge(comm);
                    mode = Mode::BottomUp;
                } else if level + 1 > config.level_threshold {
                    debug!("switch to bitmap exchange at level {level}");
                    visited.merge(comm);
                    mode = Mode::Bitmap;
                }
            }

            Mode::BottomUp => {
                for k in 0..local_n {
                    if local_seen[k] {
                        continue;
                    }
                    let k = NI::new(k);
                    let u = part.to_global(k);
                    if !admits(u) {
                        continue;
                    }
                    if reverse.targets(k).iter().any(|&w| visited.get(w)) {
                        next.push(k);
                    }
                }

                let front_total = comm.all_reduce_sum(next.len() as u64);
                if front_total == 0 {
                    break;
                }

                for &k in &next {
                    visited.set(part.to_global(k));
                    local_seen.set(k.index(), true);
                }

                // Wide frontiers merge cheaper as a bitmap; narrow ones as
                // explicit id lists.
                if front_total > config.bitmap_frontier_threshold {
                    visited.merge(comm);
                } else {
                    let newly = next.iter().map(|&k| part.to_global(k)).collect::<Vec<_>>();
                    for v in comm.all_gatherv(&newly) {
                        visited.set(v);
                    }
                }

                if level + 1 > config.level_threshold {
                    debug!("switch to bitmap exchange at level {level}");
                    mode = Mode::Bitmap;
                }
            }

            Mode::Bitmap => {
                for &k in &frontier {
                    for &v in primary.targets(k) {
                        if !visited.get(v) && admits(v) {
                            visited.set(v);
                        }
                    }
                }
                visited.merge(comm);

                for k in 0..local_n {
                    if local_seen[k] {
                        continue;
                    }
                    let l = NI::new(k);
                    if visited.get(part.to_global(l)) {
                        local_seen.set(k, true);
                        next.push(l);
                    }
                }

                let front_total = comm.all_reduce_sum(next.len() as u64);
                if front_total == 0 {
                    break;
                }
            }
        }

        frontier = next;
        level += 1;
    }

    visited
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::{spmd, SingleRank};
    use crate::scc::SccConfig;
    use scc_graph::{BalancedSlicePart, CyclicPart, GraphPart, SinglePart};

    const UNDECIDED: u32 = u32::MAX;

    fn two_cycles() -> Vec<(u32, u32)> {
        // 0 -> 1 -> 2 -> 0 and 3 -> 4 -> 5 -> 3, bridged by 2 -> 3.
        vec![(0, 1), (1, 2), (2, 0), (3, 4), (4, 5), (5, 3), (2, 3)]
    }

    #[test]
    fn single_rank_decides_the_pivot_scc() {
        let part = SinglePart::new(6u32);
        let graph: GraphPart<_, u32, usize> = GraphPart::from_global_edges(part, &two_cycles());
        let mut scc_id = vec![UNDECIDED; 6];
        let mut decided = GlobalBits::new(6);

        let count = forward_backward(
            &graph,
            &SingleRank,
            &mut scc_id,
            &mut decided,
            0,
            7,
            &SccConfig::default(),
        );

        assert_eq!(count, 3);
        assert_eq!(&scc_id[..3], &[0, 0, 0]);
        assert_eq!(&scc_id[3..], &[UNDECIDED; 3]);
    }

    #[test]
    fn pivot_without_out_edges_is_a_singleton() {
        let part = SinglePart::new(3u32);
        let graph: GraphPart<_, u32, usize> =
            GraphPart::from_global_edges(part, &[(0, 2), (1, 2)]);
        let mut scc_id = vec![UNDECIDED; 3];
        let mut decided = GlobalBits::new(3);

        let count = forward_backward(
            &graph,
            &SingleRank,
            &mut scc_id,
            &mut decided,
            2,
            2,
            &SccConfig::default(),
        );

        assert_eq!(count, 1);
        assert_eq!(scc_id, vec![UNDECIDED, UNDECIDED, 2]);
    }

    fn run_distributed(
        world_size: usize,
        alpha: f64,
        level_threshold: i64,
    ) -> Vec<Vec<u32>> {
        let edges = two_cycles();
        spmd(world_size, |world| {
            let part = BalancedSlicePart::new(6u32, world.world_rank(), world_size);
            let graph: GraphPart<_, u32, usize> = GraphPart::from_global_edges(part, &edges);
            let mut scc_id = vec![UNDECIDED; graph.local_n()];
            let mut decided = GlobalBits::new(6);
            let config = SccConfig {
                alpha,
                level_threshold,
                ..SccConfig::default()
            };
            forward_backward(&graph, &world, &mut scc_id, &mut decided, 0, 7, &config);
            scc_id
        })
    }

    #[test]
    fn distributed_top_down_matches_single_rank() {
        // alpha = 0 never satisfies the work estimate, keeping the whole
        // search in top-down mode.
        let results = run_distributed(3, 0.0, SccConfig::DEFAULT_LEVEL_THRESHOLD);
        let merged = results.concat();
        assert_eq!(merged, vec![0, 0, 0, UNDECIDED, UNDECIDED, UNDECIDED]);
    }

    #[test]
    fn bottom_up_mode_reaches_the_same_set() {
        // A huge alpha trips the work estimate after the first level.
        let results = run_distributed(2, 1e9, SccConfig::DEFAULT_LEVEL_THRESHOLD);
        let merged = results.concat();
        assert_eq!(merged, vec![0, 0, 0, UNDECIDED, UNDECIDED, UNDECIDED]);
    }

    #[test]
    fn bitmap_mode_reaches_the_same_set() {
        // A level threshold of zero pushes the search into bitmap exchange
        // right after the first level.
        let results = run_distributed(2, 0.0, 0);
        let merged = results.concat();
        assert_eq!(merged, vec![0, 0, 0, UNDECIDED, UNDECIDED, UNDECIDED]);
    }

    #[test]
    fn long_chain_crosses_many_levels_and_ranks() {
        // A directed ring of 64 vertices is one SCC; the search needs many
        // levels and, with the tiny threshold, ends in bitmap mode.
        let n = 64u32;
        let mut edges = (0..n).map(|u| (u, (u + 1) % n)).collect::<Vec<_>>();
        edges.push((0, 32)); // a chord, keeps it interesting

        let results = spmd(4, |world| {
            let part = CyclicPart::new(n, world.world_rank(), 4);
            let graph: GraphPart<_, u32, usize> = GraphPart::from_global_edges(part, &edges);
            let mut scc_id = vec![UNDECIDED; graph.local_n()];
            let mut decided = GlobalBits::new(n as usize);
            let config = SccConfig {
                level_threshold: 5,
                ..SccConfig::default()
            };
            let count = forward_backward(
                &graph,
                &world,
                &mut scc_id,
                &mut decided,
                0,
                edges.len() as u64,
                &config,
            );
            (count, scc_id)
        });

        let total: u64 = results.iter().map(|(count, _)| count).sum();
        assert_eq!(total, n as u64);
        for (_, scc_id) in results {
            assert!(scc_id.iter().all(|&id| id == 0));
        }
    }
}
