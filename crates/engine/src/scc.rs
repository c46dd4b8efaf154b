//! The SCC pipeline driver.
//!
//! Phase order: first-pass trim, pivot + forward/backward search, iterative
//! trim, coloring rounds, then the replicated residual under serial Tarjan.
//! Every phase writes the same `scc_id` array monotonically (UNDECIDED to a
//! representative, never back), so the decided count is plain increment
//! arithmetic and the all-reduced total drives the phase switches.
//!
//! On a world of size one everything after the first trim collapses into a
//! single Tarjan run over the local graph.

use log::info;
use std::time::Instant;

use crate::bits::GlobalBits;
use crate::color::color_step;
use crate::comm::Communicator;
use crate::frontier::Frontier;
use crate::pivot::select_pivot;
use crate::reach::forward_backward;
use crate::subgraph::allgather_sub_graph;
use crate::tarjan::tarjan;
use crate::trim::{trim_first, trim_iterative};
use scc_graph::{GraphPart, Idx, Partition};

#[derive(Clone, Copy, Debug)]
pub struct SccConfig {
    /// Work-estimate factor for the top-down to bottom-up switch: the
    /// search leaves top-down once `next_work * alpha` exceeds the total
    /// edge count.
    pub alpha: f64,

    /// BFS level after which the search switches to bitmap exchange.
    pub level_threshold: i64,

    /// Global frontier size above which visited sets merge as bitmaps
    /// instead of explicit id lists.
    pub bitmap_frontier_threshold: u64,

    /// Sweep cap for the iterative trim fixpoint.
    pub trim_sweeps: usize,
}

impl SccConfig {
    pub const DEFAULT_ALPHA: f64 = 14.0;
    pub const DEFAULT_LEVEL_THRESHOLD: i64 = 50;
    pub const DEFAULT_BITMAP_FRONTIER_THRESHOLD: u64 = 10_000;
    pub const DEFAULT_TRIM_SWEEPS: usize = 3;
}

impl Default for SccConfig {
    fn default() -> Self {
        Self {
            alpha: Self::DEFAULT_ALPHA,
            level_threshold: Self::DEFAULT_LEVEL_THRESHOLD,
            bitmap_frontier_threshold: Self::DEFAULT_BITMAP_FRONTIER_THRESHOLD,
            trim_sweeps: Self::DEFAULT_TRIM_SWEEPS,
        }
    }
}

/// Computes the SCC labeling of a partitioned graph.
///
/// Collective: every rank of the world must call this with its own slice of
/// the same graph and matching configuration. Returns the `scc_id` array
/// for the locally owned vertices; two vertices end up with the same id
/// exactly when they lie on a common directed cycle, and the shared id is
/// the smallest global vertex id of the component for trimmed, colored and
/// residual components, or the pivot's id for the pivot component.
pub fn scc<P, NI, EI, C>(graph: &GraphPart<P, NI, EI>, comm: &C, config: &SccConfig) -> Vec<NI>
where
    P: Partition<NI>,
    NI: Idx,
    EI: Idx,
    C: Communicator,
{
    let part = graph.part();
    let n = part.node_count().index();
    let local_n = graph.local_n();
    let world_size = comm.world_size();

    let mut scc_id = vec![NI::max_value(); local_n];
    if n == 0 {
        return scc_id;
    }

    let total = Instant::now();
    let mut decided = GlobalBits::new(n);
    let mut local_decided;

    let start = Instant::now();
    local_decided = trim_first(graph, &mut scc_id, &mut decided);
    decided.merge(comm);
    info!(
        "rank {}: first trim decided {} in {:?}",
        part.world_rank(),
        local_decided,
        start.elapsed()
    );

    if world_size == 1 {
        let start = Instant::now();
        run_local_tarjan(graph, &mut scc_id);
        info!(
            "rank 0: serial fallback finished in {:?} (total {:?})",
            start.elapsed(),
            total.elapsed()
        );
        return scc_id;
    }

    let m_total = comm.all_reduce_sum(graph.local_fw_m() as u64);

    // Replicating the residual costs two gathered graphs, so the residual
    // must fit in roughly twice a rank's share of the vertex space.
    let decided_threshold = (n - 2 * n / world_size) as u64;
    let mut global_decided = comm.all_reduce_sum(local_decided);

    if global_decided < decided_threshold {
        let start = Instant::now();
        if let Some(pivot) = select_pivot(graph, comm, &scc_id, &decided) {
            local_decided += forward_backward(
                graph,
                comm,
                &mut scc_id,
                &mut decided,
                pivot,
                m_total,
                config,
            );
        }
        local_decided += trim_iterative(graph, comm, &mut scc_id, &mut decided, config.trim_sweeps);
        global_decided = comm.all_reduce_sum(local_decided);
        info!(
            "rank {}: pivot search + trim decided {} of {} in {:?}",
            part.world_rank(),
            global_decided,
            n,
            start.elapsed()
        );
    }

    if global_decided < decided_threshold {
        let start = Instant::now();
        let mut frontier: Frontier<NI, crate::frontier::Edge<NI>> =
            Frontier::new(world_size, comm.world_rank());
        let mut rounds = 0;
        while global_decided < decided_threshold {
            local_decided += color_step(graph, comm, &mut scc_id, &mut decided, &mut frontier);
            decided.merge(comm);
            global_decided = comm.all_reduce_sum(local_decided);
            rounds += 1;
        }
        info!(
            "rank {}: {} coloring rounds reached {} of {} in {:?}",
            part.world_rank(),
            rounds,
            global_decided,
            n,
            start.elapsed()
        );
    }

    let start = Instant::now();
    let sub = allgather_sub_graph(graph, comm, &scc_id, &decided);
    if sub.node_count() > 0 {
        tarjan(&sub.fw, |_| true, |component| {
            let representative = component
                .iter()
                .map(|&position| sub.ids[position])
                .min()
                .expect("empty component");
            for &position in component {
                let u = sub.ids[position];
                if part.has_local(u) {
                    scc_id[part.to_local(u).index()] = representative;
                }
            }
        });
    }
    info!(
        "rank {}: residual solve over {} vertices in {:?} (total {:?})",
        part.world_rank(),
        sub.node_count(),
        start.elapsed(),
        total.elapsed()
    );

    debug_assert!(scc_id.iter().all(|&id| id != NI::max_value()));
    scc_id
}

fn run_local_tarjan<P, NI, EI>(graph: &GraphPart<P, NI, EI>, scc_id: &mut [NI])
where
    P: Partition<NI>,
    NI: Idx,
    EI: Idx,
{
    let part = graph.part();
    let live: Vec<bool> = scc_id.iter().map(|&id| id == NI::max_value()).collect();
    tarjan(
        graph.fw(),
        |k| live[k],
        |component| {
            let representative = component
                .iter()
                .map(|&k| part.to_global(NI::new(k)))
                .min()
                .expect("empty component");
            for &k in component {
                scc_id[k] = representative;
            }
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::SingleRank;
    use scc_graph::{GraphPart, SinglePart};

    #[test]
    fn empty_graph() {
        let part = SinglePart::new(0u32);
        let graph: GraphPart<_, u32, usize> = GraphPart::from_global_edges(part, &[]);
        let scc_id = scc(&graph, &SingleRank, &SccConfig::default());
        assert!(scc_id.is_empty());
    }

    #[test]
    fn no_edges_all_singletons() {
        let part = SinglePart::new(5u32);
        let graph: GraphPart<_, u32, usize> = GraphPart::from_global_edges(part, &[]);
        let scc_id = scc(&graph, &SingleRank, &SccConfig::default());
        assert_eq!(scc_id, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn single_rank_two_components() {
        let part = SinglePart::new(4u32);
        let graph: GraphPart<_, u32, usize> =
            GraphPart::from_global_edges(part, &[(0, 1), (1, 2), (2, 0), (3, 3)]);
        let scc_id = scc(&graph, &SingleRank, &SccConfig::default());
        assert_eq!(scc_id, vec![0, 0, 0, 3]);
    }
}
