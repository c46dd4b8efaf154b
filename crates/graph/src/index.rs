use std::fmt::Debug;
use std::hash::Hash;
use std::iter::Sum;

use atoi::FromRadix10;

/// An unsigned-behaving integer used to index vertices and edges.
///
/// Vertex ids and edge offsets are separate `Idx` parameters throughout the
/// crate: edge counts may exceed the vertex id range, so a graph is typically
/// instantiated as `Graph<u32, usize>` or `Graph<u64, u64>`.
///
/// The reserved maximum value doubles as the `UNDECIDED` sentinel of SCC id
/// arrays and must never appear as a valid vertex id.
pub trait Idx:
    Copy
    + std::ops::Add<Output = Self>
    + std::ops::AddAssign
    + std::ops::Sub<Output = Self>
    + std::ops::Div<Output = Self>
    + std::ops::Mul<Output = Self>
    + Ord
    + Debug
    + Hash
    + Send
    + Sum
    + Sync
    + Sized
    + 'static
{
    fn new(idx: usize) -> Self;

    fn zero() -> Self;

    fn max_value() -> Self;

    fn index(self) -> usize;

    fn parse(bytes: &[u8]) -> (Self, usize);
}

macro_rules! impl_idx {
    ($TYPE:ty) => {
        impl Idx for $TYPE {
            #[inline]
            fn new(idx: usize) -> Self {
                assert!(idx <= <$TYPE>::MAX as usize);
                idx as $TYPE
            }

            #[inline]
            fn zero() -> Self {
                0
            }

            #[inline]
            fn max_value() -> Self {
                <$TYPE>::MAX
            }

            #[inline]
            fn index(self) -> usize {
                self as usize
            }

            #[inline]
            fn parse(bytes: &[u8]) -> (Self, usize) {
                FromRadix10::from_radix_10(bytes)
            }
        }
    };
}

impl_idx!(u16);
impl_idx!(u32);
impl_idx!(u64);
impl_idx!(usize);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        assert_eq!(u32::new(42).index(), 42);
        assert_eq!(usize::new(0), usize::zero());
        assert_eq!(u64::max_value(), u64::MAX);
    }

    #[test]
    fn parse_radix_10() {
        let (value, used) = u32::parse(b"1337 42");
        assert_eq!(value, 1337);
        assert_eq!(used, 4);
    }
}
