//! An in-process fabric: one rank per thread, collectives through shared
//! memory.
//!
//! Each collective is a deposit / read rendezvous: every rank publishes its
//! contribution into its own slot, a barrier separates publishing from
//! reading, every rank combines all contributions locally (deterministically,
//! in rank order, so reduced values agree bit-for-bit), and a second barrier
//! keeps a fast rank from publishing into the next round while a slow one is
//! still reading.

use std::any::Any;
use std::sync::{Arc, Barrier};

use parking_lot::Mutex;

use crate::comm::{CommValue, Communicator};

struct Shared {
    size: usize,
    barrier: Barrier,
    slots: Mutex<Vec<Option<Box<dyn Any + Send>>>>,
}

/// One rank's handle to an in-process world.
pub struct ThreadWorld {
    shared: Arc<Shared>,
    rank: usize,
}

impl ThreadWorld {
    /// Creates the handles of a world with `size` ranks.
    pub fn world(size: usize) -> Vec<ThreadWorld> {
        assert!(size > 0);
        let shared = Arc::new(Shared {
            size,
            barrier: Barrier::new(size),
            slots: Mutex::new((0..size).map(|_| None).collect()),
        });
        (0..size)
            .map(|rank| ThreadWorld {
                shared: Arc::clone(&shared),
                rank,
            })
            .collect()
    }

    /// Publishes `payload`, lets `read` observe every rank's payload, and
    /// returns its result after the round completed on all ranks.
    fn round<P, R>(&self, payload: P, read: impl FnOnce(RoundView<'_, P>) -> R) -> R
    where
        P: Any + Send,
    {
        {
            let mut slots = self.shared.slots.lock();
            slots[self.rank] = Some(Box::new(payload));
        }
        self.shared.barrier.wait();

        let result = {
            let slots = self.shared.slots.lock();
            read(RoundView {
                slots: slots.as_slice(),
                _payload: std::marker::PhantomData,
            })
        };
        self.shared.barrier.wait();
        result
    }
}

struct RoundView<'a, P> {
    slots: &'a [Option<Box<dyn Any + Send>>],
    _payload: std::marker::PhantomData<P>,
}

impl<'a, P: Any> RoundView<'a, P> {
    fn get(&self, rank: usize) -> &'a P {
        self.slots[rank]
            .as_ref()
            .expect("rank missed the collective")
            .downcast_ref::<P>()
            .expect("collective element type mismatch between ranks")
    }

    fn iter(&self) -> impl Iterator<Item = &'a P> + '_ {
        (0..self.slots.len()).map(|rank| self.get(rank))
    }
}

impl Communicator for ThreadWorld {
    fn world_size(&self) -> usize {
        self.shared.size
    }

    fn world_rank(&self) -> usize {
        self.rank
    }

    fn barrier(&self) {
        self.shared.barrier.wait();
    }

    fn all_reduce_sum(&self, value: u64) -> u64 {
        self.round(value, |view| view.iter().sum())
    }

    fn all_reduce_max(&self, value: u64) -> u64 {
        self.round(value, |view| view.iter().copied().max().unwrap())
    }

    fn all_reduce_max_pair(&self, value: (u64, u64)) -> (u64, u64) {
        self.round(value, |view| view.iter().copied().max().unwrap())
    }

    fn all_reduce_or_bits(&self, bits: &mut [u64]) {
        let merged = self.round(bits.to_vec(), |view| {
            let mut merged = vec![0u64; view.get(0).len()];
            for contribution in view.iter() {
                for (word, other) in merged.iter_mut().zip(contribution) {
                    *word |= other;
                }
            }
            merged
        });
        bits.copy_from_slice(&merged);
    }

    fn all_gather<T: CommValue>(&self, local: &[T]) -> Vec<T> {
        self.all_gatherv(local)
    }

    fn all_gatherv<T: CommValue>(&self, local: &[T]) -> Vec<T> {
        self.round(local.to_vec(), |view| {
            let mut out = Vec::new();
            for contribution in view.iter() {
                out.extend_from_slice(contribution);
            }
            out
        })
    }

    fn all_to_allv<T: CommValue>(&self, data: &[T], send_counts: &[usize]) -> Vec<T> {
        debug_assert_eq!(send_counts.len(), self.shared.size);
        debug_assert_eq!(send_counts.iter().sum::<usize>(), data.len());

        let me = self.rank;
        let payload = (data.to_vec(), send_counts.to_vec());
        self.round(payload, |view| {
            let mut out = Vec::new();
            for source in 0..view.slots.len() {
                let (data, counts) = view.get(source);
                let offset = counts[..me].iter().sum::<usize>();
                out.extend_from_slice(&data[offset..offset + counts[me]]);
            }
            out
        })
    }
}

/// Runs `f` as an SPMD program on `world_size` rank threads and returns the
/// per-rank results in rank order.
pub fn spmd<R, F>(world_size: usize, f: F) -> Vec<R>
where
    R: Send,
    F: Fn(ThreadWorld) -> R + Sync,
{
    let mut worlds = ThreadWorld::world(world_size);
    std::thread::scope(|s| {
        let handles = worlds
            .drain(..)
            .map(|world| {
                let f = &f;
                s.spawn(move || f(world))
            })
            .collect::<Vec<_>>();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("rank panicked"))
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reductions_agree_on_all_ranks() {
        let sums = spmd(4, |world| world.all_reduce_sum(world.world_rank() as u64));
        assert_eq!(sums, vec![6, 6, 6, 6]);

        let maxima = spmd(3, |world| {
            world.all_reduce_max_pair((world.world_rank() as u64 % 2, world.world_rank() as u64))
        });
        assert_eq!(maxima, vec![(1, 1); 3]);
    }

    #[test]
    fn all_gatherv_concatenates_in_rank_order() {
        let gathered = spmd(3, |world| {
            let rank = world.world_rank() as u32;
            let local = vec![rank; rank as usize];
            world.all_gatherv(&local)
        });
        assert_eq!(gathered[0], vec![1, 2, 2]);
        assert_eq!(gathered, vec![gathered[0].clone(); 3]);
    }

    #[test]
    fn all_to_allv_routes_by_destination() {
        // Rank r sends one value 10 * r + d to every destination d.
        let received = spmd(3, |world| {
            let rank = world.world_rank() as u32;
            let data = (0..3).map(|d| 10 * rank + d).collect::<Vec<_>>();
            world.all_to_allv(&data, &[1, 1, 1])
        });
        assert_eq!(received[0], vec![0, 10, 20]);
        assert_eq!(received[1], vec![1, 11, 21]);
        assert_eq!(received[2], vec![2, 12, 22]);
    }

    #[test]
    fn or_bits_builds_the_union() {
        let merged = spmd(2, |world| {
            let mut bits = [0u64; 2];
            bits[world.world_rank()] = 1 << world.world_rank();
            world.all_reduce_or_bits(&mut bits);
            bits
        });
        assert_eq!(merged, vec![[1, 2], [1, 2]]);
    }

    #[test]
    fn consecutive_collectives_do_not_interleave() {
        let results = spmd(4, |world| {
            let mut acc = Vec::new();
            for round in 0..10u64 {
                acc.push(world.all_reduce_sum(round + world.world_rank() as u64));
            }
            acc
        });
        for result in results {
            let expected = (0..10u64).map(|round| 4 * round + 6).collect::<Vec<_>>();
            assert_eq!(result, expected);
        }
    }
}
