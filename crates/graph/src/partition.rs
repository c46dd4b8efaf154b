//! Partition schemes mapping global vertex ids to owning ranks.
//!
//! A scheme is a small `Copy` value that can be replicated freely; every
//! method is `O(1)` and allocation-free. `to_global` is strictly increasing
//! in the local index for all schemes, which the CSR fill relies on.

use crate::index::Idx;

/// Assigns each global vertex to exactly one rank and converts between
/// global ids and local indices.
///
/// Laws, for every scheme:
///
/// * `to_local(to_global(k)) == k` for `k < local_n()`
/// * `to_global(to_local(u)) == u` whenever `has_local(u)`
/// * `has_local(u)` iff `world_rank_of(u) == world_rank()`
/// * the local vertex counts of all ranks sum to `n`
pub trait Partition<NI: Idx>: Copy + Send + Sync {
    /// Locally owned vertices form a contiguous global interval.
    const CONTINUOUS: bool;
    /// Rank intervals are contiguous and ascend with the rank. Implies
    /// `CONTINUOUS`.
    const ORDERED: bool;

    fn node_count(&self) -> NI;

    fn world_size(&self) -> usize;

    fn world_rank(&self) -> usize;

    fn local_n(&self) -> NI;

    fn has_local(&self, u: NI) -> bool {
        self.world_rank_of(u) == self.world_rank()
    }

    fn to_local(&self, u: NI) -> NI;

    fn to_global(&self, k: NI) -> NI;

    fn world_rank_of(&self, u: NI) -> usize;

    /// The same scheme as seen by another rank.
    fn part_of(&self, rank: usize) -> Self;
}

/// A partition whose locally owned set is the interval `begin..end`.
pub trait ContinuousPartition<NI: Idx>: Partition<NI> {
    fn begin(&self) -> NI;

    fn end(&self) -> NI;
}

/// The one-rank identity partition.
#[derive(Clone, Copy, Debug)]
pub struct SinglePart<NI> {
    n: NI,
}

impl<NI: Idx> SinglePart<NI> {
    pub fn new(n: NI) -> Self {
        Self { n }
    }
}

impl<NI: Idx> Partition<NI> for SinglePart<NI> {
    const CONTINUOUS: bool = true;
    const ORDERED: bool = true;

    fn node_count(&self) -> NI {
        self.n
    }

    fn world_size(&self) -> usize {
        1
    }

    fn world_rank(&self) -> usize {
        0
    }

    fn local_n(&self) -> NI {
        self.n
    }

    fn has_local(&self, _u: NI) -> bool {
        true
    }

    fn to_local(&self, u: NI) -> NI {
        u
    }

    fn to_global(&self, k: NI) -> NI {
        k
    }

    fn world_rank_of(&self, _u: NI) -> usize {
        0
    }

    fn part_of(&self, rank: usize) -> Self {
        debug_assert_eq!(rank, 0);
        *self
    }
}

impl<NI: Idx> ContinuousPartition<NI> for SinglePart<NI> {
    fn begin(&self) -> NI {
        NI::zero()
    }

    fn end(&self) -> NI {
        self.n
    }
}

/// Round-robin distribution: vertex `u` lives on rank `u mod W`.
#[derive(Clone, Copy, Debug)]
pub struct CyclicPart<NI> {
    n: NI,
    world_rank: usize,
    world_size: usize,
}

impl<NI: Idx> CyclicPart<NI> {
    pub fn new(n: NI, world_rank: usize, world_size: usize) -> Self {
        debug_assert!(world_rank < world_size);
        Self {
            n,
            world_rank,
            world_size,
        }
    }
}

impl<NI: Idx> Partition<NI> for CyclicPart<NI> {
    const CONTINUOUS: bool = false;
    const ORDERED: bool = false;

    fn node_count(&self) -> NI {
        self.n
    }

    fn world_size(&self) -> usize {
        self.world_size
    }

    fn world_rank(&self) -> usize {
        self.world_rank
    }

    fn local_n(&self) -> NI {
        let n = self.n.index();
        if self.world_size == 1 {
            return self.n;
        }
        if n <= self.world_rank {
            return NI::zero();
        }
        NI::new((n - 1 - self.world_rank) / self.world_size + 1)
    }

    fn to_local(&self, u: NI) -> NI {
        if self.world_size == 1 {
            return u;
        }
        NI::new((u.index() - self.world_rank) / self.world_size)
    }

    fn to_global(&self, k: NI) -> NI {
        if self.world_size == 1 {
            return k;
        }
        NI::new(self.world_rank + k.index() * self.world_size)
    }

    fn world_rank_of(&self, u: NI) -> usize {
        if self.world_size == 1 {
            0
        } else {
            u.index() % self.world_size
        }
    }

    fn part_of(&self, rank: usize) -> Self {
        Self::new(self.n, rank, self.world_size)
    }
}

/// Round-robin distribution of fixed-size blocks: vertex `u` lives on rank
/// `(u / block_size) mod W`.
#[derive(Clone, Copy, Debug)]
pub struct BlockCyclicPart<NI> {
    n: NI,
    world_rank: usize,
    world_size: usize,
    block_size: usize,
}

impl<NI: Idx> BlockCyclicPart<NI> {
    pub const DEFAULT_BLOCK_SIZE: usize = 512;

    pub fn new(n: NI, world_rank: usize, world_size: usize) -> Self {
        Self::with_block_size(n, world_rank, world_size, Self::DEFAULT_BLOCK_SIZE)
    }

    pub fn with_block_size(
        n: NI,
        world_rank: usize,
        world_size: usize,
        block_size: usize,
    ) -> Self {
        debug_assert!(world_rank < world_size);
        debug_assert!(block_size > 0);
        Self {
            n,
            world_rank,
            world_size,
            block_size,
        }
    }
}

impl<NI: Idx> Partition<NI> for BlockCyclicPart<NI> {
    const CONTINUOUS: bool = false;
    const ORDERED: bool = false;

    fn node_count(&self) -> NI {
        self.n
    }

    fn world_size(&self) -> usize {
        self.world_size
    }

    fn world_rank(&self) -> usize {
        self.world_rank
    }

    fn local_n(&self) -> NI {
        let n = self.n.index();
        if self.world_size == 1 {
            return self.n;
        }
        if n == 0 {
            return NI::zero();
        }

        let num_blocks = (n + self.block_size - 1) / self.block_size;
        if num_blocks <= self.world_rank {
            return NI::zero();
        }
        let owned_blocks = (num_blocks - 1 - self.world_rank) / self.world_size + 1;

        // All owned blocks are full except possibly the globally last block.
        let last_owned_block = self.world_rank + (owned_blocks - 1) * self.world_size;
        let last_block_size = if last_owned_block == num_blocks - 1 {
            n - last_owned_block * self.block_size
        } else {
            self.block_size
        };

        NI::new((owned_blocks - 1) * self.block_size + last_block_size)
    }

    fn to_local(&self, u: NI) -> NI {
        if self.world_size == 1 {
            return u;
        }
        let block = u.index() / self.block_size;
        let offset_in_block = u.index() % self.block_size;
        let full_owned_blocks_before = block / self.world_size;
        NI::new(full_owned_blocks_before * self.block_size + offset_in_block)
    }

    fn to_global(&self, k: NI) -> NI {
        if self.world_size == 1 {
            return k;
        }
        let local_block = k.index() / self.block_size;
        let offset = k.index() % self.block_size;
        let global_block = local_block * self.world_size + self.world_rank;
        NI::new(global_block * self.block_size + offset)
    }

    fn world_rank_of(&self, u: NI) -> usize {
        if self.world_size == 1 {
            0
        } else {
            (u.index() / self.block_size) % self.world_size
        }
    }

    fn part_of(&self, rank: usize) -> Self {
        Self::with_block_size(self.n, rank, self.world_size, self.block_size)
    }
}

/// Contiguous slices of `n / W` vertices; the last rank absorbs the
/// remainder.
#[derive(Clone, Copy, Debug)]
pub struct TrivialSlicePart<NI> {
    n: NI,
    world_rank: usize,
    world_size: usize,
    begin: NI,
    end: NI,
}

impl<NI: Idx> TrivialSlicePart<NI> {
    pub fn new(n: NI, world_rank: usize, world_size: usize) -> Self {
        debug_assert!(world_rank < world_size);
        let base = n.index() / world_size;
        let begin = world_rank * base;
        let end = if world_rank + 1 == world_size {
            n.index()
        } else {
            begin + base
        };
        Self {
            n,
            world_rank,
            world_size,
            begin: NI::new(begin),
            end: NI::new(end),
        }
    }
}

impl<NI: Idx> Partition<NI> for TrivialSlicePart<NI> {
    const CONTINUOUS: bool = true;
    const ORDERED: bool = true;

    fn node_count(&self) -> NI {
        self.n
    }

    fn world_size(&self) -> usize {
        self.world_size
    }

    fn world_rank(&self) -> usize {
        self.world_rank
    }

    fn local_n(&self) -> NI {
        self.end - self.begin
    }

    fn has_local(&self, u: NI) -> bool {
        self.begin <= u && u < self.end
    }

    fn to_local(&self, u: NI) -> NI {
        u - self.begin
    }

    fn to_global(&self, k: NI) -> NI {
        self.begin + k
    }

    fn world_rank_of(&self, u: NI) -> usize {
        let base = self.n.index() / self.world_size;
        if base == 0 {
            return self.world_size - 1;
        }
        usize::min(u.index() / base, self.world_size - 1)
    }

    fn part_of(&self, rank: usize) -> Self {
        Self::new(self.n, rank, self.world_size)
    }
}

impl<NI: Idx> ContinuousPartition<NI> for TrivialSlicePart<NI> {
    fn begin(&self) -> NI {
        self.begin
    }

    fn end(&self) -> NI {
        self.end
    }
}

/// Contiguous slices where the first `n mod W` ranks own one extra vertex.
#[derive(Clone, Copy, Debug)]
pub struct BalancedSlicePart<NI> {
    n: NI,
    world_rank: usize,
    world_size: usize,
    begin: NI,
    end: NI,
}

impl<NI: Idx> BalancedSlicePart<NI> {
    pub fn new(n: NI, world_rank: usize, world_size: usize) -> Self {
        debug_assert!(world_rank < world_size);
        let base = n.index() / world_size;
        let rem = n.index() % world_size;

        let (begin, end) = if world_rank < rem {
            let begin = world_rank * (base + 1);
            (begin, begin + base + 1)
        } else {
            let begin = rem * (base + 1) + (world_rank - rem) * base;
            (begin, begin + base)
        };
        Self {
            n,
            world_rank,
            world_size,
            begin: NI::new(begin),
            end: NI::new(end),
        }
    }
}

impl<NI: Idx> Partition<NI> for BalancedSlicePart<NI> {
    const CONTINUOUS: bool = true;
    const ORDERED: bool = true;

    fn node_count(&self) -> NI {
        self.n
    }

    fn world_size(&self) -> usize {
        self.world_size
    }

    fn world_rank(&self) -> usize {
        self.world_rank
    }

    fn local_n(&self) -> NI {
        self.end - self.begin
    }

    fn has_local(&self, u: NI) -> bool {
        self.begin <= u && u < self.end
    }

    fn to_local(&self, u: NI) -> NI {
        u - self.begin
    }

    fn to_global(&self, k: NI) -> NI {
        self.begin + k
    }

    fn world_rank_of(&self, u: NI) -> usize {
        let base = self.n.index() / self.world_size;
        let rem = self.n.index() % self.world_size;

        if rem == 0 {
            return if base == 0 { 0 } else { u.index() / base };
        }

        let split = (base + 1) * rem;
        if u.index() < split {
            u.index() / (base + 1)
        } else {
            rem + (u.index() - split) / base
        }
    }

    fn part_of(&self, rank: usize) -> Self {
        Self::new(self.n, rank, self.world_size)
    }
}

impl<NI: Idx> ContinuousPartition<NI> for BalancedSlicePart<NI> {
    fn begin(&self) -> NI {
        self.begin
    }

    fn end(&self) -> NI {
        self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_laws<P: Partition<u32>>(parts: &[P], n: u32) {
        let mut owners = vec![usize::MAX; n as usize];
        let mut total = 0;

        for part in parts {
            let rank = part.world_rank();
            let local_n = part.local_n();
            total += local_n.index();

            for k in 0..local_n {
                let u = part.to_global(k);
                assert!(u < n, "to_global out of range");
                assert_eq!(part.to_local(u), k, "round trip failed for k = {k}");
                assert!(part.has_local(u));
                assert_eq!(part.world_rank_of(u), rank);
                assert_eq!(owners[u as usize], usize::MAX, "vertex {u} owned twice");
                owners[u as usize] = rank;
            }

            for u in 0..n {
                assert_eq!(part.has_local(u), part.world_rank_of(u) == rank);
            }
        }

        assert_eq!(total, n as usize);
        assert!(owners.iter().all(|&r| r != usize::MAX));

        // Owner assignment must agree between all replicas of the scheme.
        for part in parts {
            for u in 0..n {
                assert_eq!(part.world_rank_of(u), owners[u as usize]);
            }
        }
    }

    fn check_ordered<P: ContinuousPartition<u32>>(parts: &[P], n: u32) {
        let mut expected_begin = 0;
        for part in parts {
            assert_eq!(part.begin(), expected_begin);
            assert!(part.begin() <= part.end());
            expected_begin = part.end();
        }
        assert_eq!(expected_begin, n);
    }

    fn world<P, F: Fn(u32, usize, usize) -> P>(n: u32, size: usize, new: F) -> Vec<P> {
        (0..size).map(|rank| new(n, rank, size)).collect()
    }

    const SIZES: [u32; 6] = [0, 1, 2, 5, 16, 100];
    const WORLDS: [usize; 5] = [1, 2, 3, 4, 7];

    #[test]
    fn single() {
        for n in SIZES {
            let parts = vec![SinglePart::new(n)];
            check_laws(&parts, n);
            check_ordered(&parts, n);
        }
    }

    #[test]
    fn cyclic() {
        for n in SIZES {
            for w in WORLDS {
                check_laws(&world(n, w, CyclicPart::new), n);
            }
        }
    }

    #[test]
    fn block_cyclic() {
        for n in SIZES {
            for w in WORLDS {
                for block_size in [1, 3, 512] {
                    let parts = world(n, w, |n, r, s| {
                        BlockCyclicPart::with_block_size(n, r, s, block_size)
                    });
                    check_laws(&parts, n);
                }
            }
        }
    }

    #[test]
    fn trivial_slice() {
        for n in SIZES {
            for w in WORLDS {
                let parts = world(n, w, TrivialSlicePart::new);
                check_laws(&parts, n);
                check_ordered(&parts, n);
            }
        }
    }

    #[test]
    fn balanced_slice() {
        for n in SIZES {
            for w in WORLDS {
                let parts = world(n, w, BalancedSlicePart::new);
                check_laws(&parts, n);
                check_ordered(&parts, n);
            }
        }
    }

    #[test]
    fn balanced_slice_extra_on_first_ranks() {
        let parts = world(10, 3, BalancedSlicePart::new);
        assert_eq!(parts[0].local_n(), 4);
        assert_eq!(parts[1].local_n(), 3);
        assert_eq!(parts[2].local_n(), 3);
    }

    #[test]
    fn trivial_slice_remainder_on_last_rank() {
        let parts = world(10, 3, TrivialSlicePart::new);
        assert_eq!(parts[0].local_n(), 3);
        assert_eq!(parts[1].local_n(), 3);
        assert_eq!(parts[2].local_n(), 4);
    }

    #[test]
    fn peer_views_agree() {
        let part = BalancedSlicePart::new(17u32, 2, 4);
        for rank in 0..4 {
            let peer = part.part_of(rank);
            assert_eq!(peer.world_rank(), rank);
            assert_eq!(peer.node_count(), 17);
            for k in 0..peer.local_n() {
                assert_eq!(peer.world_rank_of(peer.to_global(k)), rank);
            }
        }
    }
}
