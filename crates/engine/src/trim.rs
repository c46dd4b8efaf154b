//! Trimming: vertices without live in- or out-edges are singleton SCCs.

use log::debug;

use crate::bits::GlobalBits;
use crate::comm::Communicator;
use scc_graph::{GraphPart, Idx, Partition};

/// First-pass trim over the static CSR degrees.
///
/// Runs before any decision exists and needs no communication; the caller
/// merges the decided view afterwards so remote trims become visible.
/// Returns the number of local decisions.
pub fn trim_first<P, NI, EI>(
    graph: &GraphPart<P, NI, EI>,
    scc_id: &mut [NI],
    decided: &mut GlobalBits,
) -> u64
where
    P: Partition<NI>,
    NI: Idx,
    EI: Idx,
{
    let part = graph.part();
    let mut count = 0;

    for k in 0..graph.local_n() {
        let k = NI::new(k);
        if graph.out_degree(k) == NI::zero() || graph.in_degree(k) == NI::zero() {
            let u = part.to_global(k);
            scc_id[k.index()] = u;
            decided.set(u);
            count += 1;
        }
    }

    debug!("rank {}: trim_first decided {}", part.world_rank(), count);
    count
}

/// Iterative trim against the live subgraph.
///
/// A vertex whose every live neighbor edge has disappeared (self-loops never
/// count) becomes a singleton. Sweeps to a fixpoint, capped at
/// `max_sweeps`; each sweep ends in a collective merge of the decided view
/// so chains crossing rank boundaries resolve.
pub fn trim_iterative<P, NI, EI, C>(
    graph: &GraphPart<P, NI, EI>,
    comm: &C,
    scc_id: &mut [NI],
    decided: &mut GlobalBits,
    max_sweeps: usize,
) -> u64
where
    P: Partition<NI>,
    NI: Idx,
    EI: Idx,
    C: Communicator,
{
    let part = graph.part();
    let mut count = 0;

    for sweep in 0..max_sweeps {
        let mut changes = 0;

        for k in 0..graph.local_n() {
            let k = NI::new(k);
            if scc_id[k.index()] != NI::max_value() {
                continue;
            }
            let u = part.to_global(k);

            let live_out = graph
                .out_neighbors(k)
                .iter()
                .any(|&v| v != u && !decided.get(v));
            let live_in = live_out
                && graph
                    .in_neighbors(k)
                    .iter()
                    .any(|&v| v != u && !decided.get(v));

            if !(live_out && live_in) {
                scc_id[k.index()] = u;
                decided.set(u);
                changes += 1;
            }
        }

        decided.merge(comm);
        count += changes;

        let global_changes = comm.all_reduce_sum(changes);
        debug!(
            "rank {}: trim sweep {} decided {} ({} globally)",
            part.world_rank(),
            sweep,
            changes,
            global_changes
        );
        if global_changes == 0 {
            break;
        }
    }

    count
}
