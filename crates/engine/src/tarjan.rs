//! Iterative Tarjan SCC with a per-component callback.
//!
//! The classical algorithm with an explicit work stack instead of
//! recursion, so residual graphs with long paths cannot overflow the call
//! stack. Components are emitted in reverse topological order; the member
//! order within a component is arbitrary.

use bitvec::prelude::*;

use scc_graph::{Csr, Idx};

const UNSET: usize = usize::MAX;

struct Frame {
    vertex: usize,
    neighbor: usize,
}

/// Runs Tarjan over all rows of `graph` for which `active` holds, skipping
/// inactive neighbors, and calls `on_component` with each component's
/// vertex rows.
pub fn tarjan<EI, NI, A, F>(graph: &Csr<EI, NI>, mut active: A, mut on_component: F)
where
    EI: Idx,
    NI: Idx,
    A: FnMut(usize) -> bool,
    F: FnMut(&[usize]),
{
    let n = graph.row_count();

    let mut disc = vec![UNSET; n];
    let mut low = vec![0usize; n];
    let mut on_stack: BitVec<u64, Lsb0> = BitVec::repeat(false, n);
    let mut stack: Vec<usize> = Vec::new();
    let mut frames: Vec<Frame> = Vec::new();
    let mut component: Vec<usize> = Vec::new();
    let mut next_index = 0usize;

    for root in 0..n {
        if disc[root] != UNSET || !active(root) {
            continue;
        }

        frames.push(Frame {
            vertex: root,
            neighbor: 0,
        });

        while !frames.is_empty() {
            let top = frames.len() - 1;
            let v = frames[top].vertex;

            if frames[top].neighbor == 0 {
                disc[v] = next_index;
                low[v] = next_index;
                next_index += 1;
                stack.push(v);
                on_stack.set(v, true);
            }

            let row = graph.targets(NI::new(v));
            if frames[top].neighbor < row.len() {
                let w = row[frames[top].neighbor].index();
                frames[top].neighbor += 1;

                if !active(w) {
                    continue;
                }
                if disc[w] == UNSET {
                    frames.push(Frame {
                        vertex: w,
                        neighbor: 0,
                    });
                } else if on_stack[w] {
                    low[v] = low[v].min(disc[w]);
                }
                continue;
            }

            frames.pop();
            if let Some(parent) = frames.last() {
                low[parent.vertex] = low[parent.vertex].min(low[v]);
            }

            if low[v] == disc[v] {
                component.clear();
                loop {
                    let w = stack.pop().expect("tarjan stack underflow");
                    on_stack.set(w, false);
                    component.push(w);
                    if w == v {
                        break;
                    }
                }
                on_component(&component);
            }
        }
    }
}
