//! CSR adjacency storage for full and partitioned graphs.

use log::debug;
use rayon::prelude::*;

use crate::index::Idx;
use crate::partition::{Partition, SinglePart};

/// A Compressed-Sparse-Row adjacency structure.
///
/// `offsets` has one entry per row plus one; the neighbor list of row `k` is
/// `targets[offsets[k]..offsets[k + 1]]`. For a full graph rows are global
/// vertex ids; for a graph partition rows are local indices and targets stay
/// global.
///
/// `EI` is the edge offset type, `NI` the vertex id type. They are separate
/// because the edge count may exceed the vertex id range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Csr<EI: Idx, NI: Idx> {
    offsets: Box<[EI]>,
    targets: Box<[NI]>,
}

impl<EI: Idx, NI: Idx> Csr<EI, NI> {
    pub fn new(offsets: Box<[EI]>, targets: Box<[NI]>) -> Self {
        let csr = Self { offsets, targets };
        csr.debug_validate();
        csr
    }

    /// An empty CSR with `rows` empty neighbor lists.
    pub fn empty(rows: usize) -> Self {
        Self {
            offsets: vec![EI::zero(); rows + 1].into_boxed_slice(),
            targets: Box::new([]),
        }
    }

    #[inline]
    pub fn row_count(&self) -> usize {
        self.offsets.len() - 1
    }

    #[inline]
    pub fn edge_count(&self) -> EI {
        EI::new(self.targets.len())
    }

    #[inline]
    pub fn degree(&self, k: NI) -> NI {
        let from = self.offsets[k.index()];
        let to = self.offsets[k.index() + 1];
        NI::new(to.index() - from.index())
    }

    #[inline]
    pub fn targets(&self, k: NI) -> &[NI] {
        let from = self.offsets[k.index()];
        let to = self.offsets[k.index() + 1];
        &self.targets[from.index()..to.index()]
    }

    #[inline]
    pub fn offsets(&self) -> &[EI] {
        &self.offsets
    }

    #[inline]
    pub fn raw_targets(&self) -> &[NI] {
        &self.targets
    }

    /// Builds the CSR of a full graph from an unsorted edge list.
    ///
    /// Sorts by `(u, v)` and fills rows in one scan. Self-loops and parallel
    /// edges are kept.
    pub fn from_edges(n: NI, mut edges: Vec<(NI, NI)>) -> Self {
        edges.par_sort_unstable();
        Self::from_sorted_edges(n, &edges)
    }

    /// Builds the CSR of a full graph from an edge list sorted by `(u, v)`.
    pub fn from_sorted_edges(n: NI, edges: &[(NI, NI)]) -> Self {
        debug_assert!(edges.windows(2).all(|w| w[0] <= w[1]));

        let mut offsets = Vec::with_capacity(n.index() + 1);
        let mut targets = Vec::with_capacity(edges.len());

        offsets.push(EI::zero());
        let mut end = 0;
        for u in 0..n.index() {
            while end < edges.len() && edges[end].0.index() == u {
                targets.push(edges[end].1);
                end += 1;
            }
            offsets.push(EI::new(end));
        }
        assert_eq!(end, edges.len(), "edge source out of range");

        Self::new(offsets.into_boxed_slice(), targets.into_boxed_slice())
    }

    /// Builds the local CSR of a graph partition from an edge list whose
    /// sources are all owned by `part`.
    ///
    /// Sorts by `(u, v)` globally; `to_global` is strictly increasing in the
    /// local index for every scheme, so sorted edges fill local rows in
    /// order. Ranks are single-threaded, so the sort is serial here.
    pub fn from_part_edges<P: Partition<NI>>(part: &P, mut edges: Vec<(NI, NI)>) -> Self {
        edges.sort_unstable();

        let local_n = part.local_n().index();
        let mut offsets = Vec::with_capacity(local_n + 1);
        let mut targets = Vec::with_capacity(edges.len());

        offsets.push(EI::zero());
        let mut end = 0;
        for k in 0..local_n {
            let u = part.to_global(NI::new(k));
            while end < edges.len() && edges[end].0 == u {
                targets.push(edges[end].1);
                end += 1;
            }
            offsets.push(EI::new(end));
        }
        assert_eq!(end, edges.len(), "edge source not owned by this rank");

        Self::new(offsets.into_boxed_slice(), targets.into_boxed_slice())
    }

    /// The exact transpose of a full graph CSR.
    ///
    /// Three linear passes: count indegrees into `offsets[v + 1]`, convert to
    /// exclusive prefix sums, then fill each row using `offsets[v + 1]` as
    /// the per-row write cursor. After the fill every cursor has advanced by
    /// the row's degree, completing the scan. No auxiliary memory beyond the
    /// output.
    pub fn transpose(&self) -> Self {
        let n = self.row_count();
        let m = self.targets.len();

        let mut offsets = vec![EI::zero(); n + 1];
        for &v in self.targets.iter() {
            offsets[v.index() + 1] += EI::new(1);
        }

        let mut acc = 0;
        for v in 0..n {
            let indegree = offsets[v + 1].index();
            offsets[v + 1] = EI::new(acc);
            acc += indegree;
        }

        let mut targets = vec![NI::zero(); m];
        for u in 0..n {
            let from = self.offsets[u].index();
            let to = self.offsets[u + 1].index();
            for &v in &self.targets[from..to] {
                let cursor = offsets[v.index() + 1].index();
                targets[cursor] = NI::new(u);
                offsets[v.index() + 1] = EI::new(cursor + 1);
            }
        }

        Self::new(offsets.into_boxed_slice(), targets.into_boxed_slice())
    }

    /// Structural invariant sweep; a no-op in release builds.
    pub fn debug_validate(&self) {
        if cfg!(debug_assertions) {
            assert!(!self.offsets.is_empty());
            assert_eq!(self.offsets[0], EI::zero());
            assert_eq!(
                self.offsets[self.offsets.len() - 1].index(),
                self.targets.len()
            );
            assert!(self.offsets.windows(2).all(|w| w[0] <= w[1]));
        }
    }
}

/// A full directed graph: forward CSR plus its exact transpose.
#[derive(Debug, Clone)]
pub struct Graph<NI: Idx, EI: Idx> {
    n: NI,
    fw: Csr<EI, NI>,
    bw: Csr<EI, NI>,
}

impl<NI: Idx, EI: Idx> Graph<NI, EI> {
    pub fn new(n: NI, fw: Csr<EI, NI>, bw: Csr<EI, NI>) -> Self {
        debug_assert_eq!(fw.row_count(), n.index());
        debug_assert_eq!(bw.row_count(), n.index());
        debug_assert_eq!(fw.edge_count(), bw.edge_count());
        Self { n, fw, bw }
    }

    pub fn from_edges(n: NI, edges: Vec<(NI, NI)>) -> Self {
        let fw: Csr<EI, NI> = Csr::from_edges(n, edges);
        let bw = fw.transpose();
        Self { n, fw, bw }
    }

    #[inline]
    pub fn node_count(&self) -> NI {
        self.n
    }

    #[inline]
    pub fn edge_count(&self) -> EI {
        self.fw.edge_count()
    }

    #[inline]
    pub fn fw(&self) -> &Csr<EI, NI> {
        &self.fw
    }

    #[inline]
    pub fn bw(&self) -> &Csr<EI, NI> {
        &self.bw
    }

    /// Reinterprets the full graph as the one-rank partition instance.
    pub fn into_part(self) -> GraphPart<SinglePart<NI>, NI, EI> {
        let part = SinglePart::new(self.n);
        GraphPart::new(part, self.fw, self.bw)
    }
}

/// The per-rank slice of a partitioned graph.
///
/// Both CSRs are keyed by local index `k`; `fw` holds the outgoing edges of
/// owned vertices, `bw` the incoming edges (edges whose destination is
/// owned). Neighbor entries are global vertex ids.
#[derive(Debug, Clone)]
pub struct GraphPart<P, NI: Idx, EI: Idx> {
    part: P,
    fw: Csr<EI, NI>,
    bw: Csr<EI, NI>,
}

impl<P: Partition<NI>, NI: Idx, EI: Idx> GraphPart<P, NI, EI> {
    pub fn new(part: P, fw: Csr<EI, NI>, bw: Csr<EI, NI>) -> Self {
        debug_assert_eq!(fw.row_count(), part.local_n().index());
        debug_assert_eq!(bw.row_count(), part.local_n().index());
        Self { part, fw, bw }
    }

    /// Materializes the rank-local slice from a globally visible edge list.
    ///
    /// This is the in-memory equivalent of the manifest loader and the main
    /// entry point for tests: forward rows come from edges with an owned
    /// source, backward rows from edges with an owned destination.
    pub fn from_global_edges(part: P, edges: &[(NI, NI)]) -> Self {
        let fw_edges = edges
            .iter()
            .filter(|(u, _)| part.has_local(*u))
            .copied()
            .collect::<Vec<_>>();
        let bw_edges = edges
            .iter()
            .filter(|(_, v)| part.has_local(*v))
            .map(|&(u, v)| (v, u))
            .collect::<Vec<_>>();

        debug!(
            "rank {}: {} forward and {} backward local edges",
            part.world_rank(),
            fw_edges.len(),
            bw_edges.len()
        );

        let fw = Csr::from_part_edges(&part, fw_edges);
        let bw = Csr::from_part_edges(&part, bw_edges);
        Self::new(part, fw, bw)
    }

    #[inline]
    pub fn part(&self) -> &P {
        &self.part
    }

    #[inline]
    pub fn local_n(&self) -> usize {
        self.part.local_n().index()
    }

    #[inline]
    pub fn out_degree(&self, k: NI) -> NI {
        self.fw.degree(k)
    }

    #[inline]
    pub fn in_degree(&self, k: NI) -> NI {
        self.bw.degree(k)
    }

    #[inline]
    pub fn out_neighbors(&self, k: NI) -> &[NI] {
        self.fw.targets(k)
    }

    #[inline]
    pub fn in_neighbors(&self, k: NI) -> &[NI] {
        self.bw.targets(k)
    }

    #[inline]
    pub fn fw(&self) -> &Csr<EI, NI> {
        &self.fw
    }

    #[inline]
    pub fn bw(&self) -> &Csr<EI, NI> {
        &self.bw
    }

    pub fn local_fw_m(&self) -> usize {
        self.fw.edge_count().index()
    }

    pub fn local_bw_m(&self) -> usize {
        self.bw.edge_count().index()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::{BalancedSlicePart, CyclicPart};

    fn edges() -> Vec<(u32, u32)> {
        vec![(0, 1), (1, 2), (2, 0), (2, 3), (3, 3)]
    }

    #[test]
    fn csr_from_edges() {
        let csr: Csr<usize, u32> = Csr::from_edges(4, edges());

        assert_eq!(csr.row_count(), 4);
        assert_eq!(csr.edge_count(), 5);
        assert_eq!(csr.targets(0), &[1]);
        assert_eq!(csr.targets(2), &[0, 3]);
        assert_eq!(csr.targets(3), &[3]);
        assert_eq!(csr.degree(2), 2);
    }

    #[test]
    fn transpose_is_exact() {
        let csr: Csr<usize, u32> = Csr::from_edges(4, edges());
        let bw = csr.transpose();

        assert_eq!(bw.targets(0), &[2]);
        assert_eq!(bw.targets(1), &[0]);
        assert_eq!(bw.targets(2), &[1]);
        assert_eq!(bw.targets(3), &[2, 3]);

        // Transposing twice restores the original edge set.
        let fw_again = bw.transpose();
        assert_eq!(fw_again, csr);
    }

    #[test]
    fn transpose_empty() {
        let csr: Csr<usize, u32> = Csr::from_edges(3, vec![]);
        let bw = csr.transpose();
        assert_eq!(bw.row_count(), 3);
        assert_eq!(bw.edge_count(), 0);
    }

    #[test]
    fn graph_keeps_both_directions() {
        let graph: Graph<u32, usize> = Graph::from_edges(4, edges());
        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 5);
        assert_eq!(graph.fw().targets(2), &[0, 3]);
        assert_eq!(graph.bw().targets(3), &[2, 3]);
    }

    #[test]
    fn graph_part_from_global_edges() {
        let part = BalancedSlicePart::new(4u32, 0, 2);
        let gp: GraphPart<_, u32, usize> = GraphPart::from_global_edges(part, &edges());

        // Rank 0 owns vertices 0 and 1.
        assert_eq!(gp.local_n(), 2);
        assert_eq!(gp.out_neighbors(0), &[1]);
        assert_eq!(gp.out_neighbors(1), &[2]);
        assert_eq!(gp.in_neighbors(0), &[2]);
        assert_eq!(gp.in_neighbors(1), &[0]);
    }

    #[test]
    fn graph_part_cyclic_rows_follow_local_order() {
        let part = CyclicPart::new(4u32, 1, 2);
        let gp: GraphPart<_, u32, usize> = GraphPart::from_global_edges(part, &edges());

        // Rank 1 owns vertices 1 and 3, local order [1, 3].
        assert_eq!(gp.local_n(), 2);
        assert_eq!(gp.out_neighbors(0), &[2]);
        assert_eq!(gp.out_neighbors(1), &[3]);
        assert_eq!(gp.in_neighbors(0), &[0]);
        assert_eq!(gp.in_neighbors(1), &[2, 3]);
    }

    #[test]
    fn partition_slices_cover_full_graph() {
        let full: Csr<usize, u32> = Csr::from_edges(4, edges());
        let mut covered = 0;
        for rank in 0..3 {
            let part = BalancedSlicePart::new(4u32, rank, 3);
            let gp: GraphPart<_, u32, usize> = GraphPart::from_global_edges(part, &edges());
            for k in 0..gp.local_n() {
                let u = part.to_global(k as u32);
                assert_eq!(gp.out_neighbors(k as u32), full.targets(u));
                covered += gp.out_degree(k as u32);
            }
        }
        assert_eq!(covered as usize, full.edge_count());
    }
}
