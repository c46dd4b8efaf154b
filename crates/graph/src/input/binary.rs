//! Dense packed unsigned integer arrays with a fixed byte width.
//!
//! A file holds `len` integers of `width` bytes each, little- or big-endian.
//! Widths from 1 to 8 are supported so head and target files shrink to the
//! smallest width that represents their value range.

use std::fs::File;
use std::path::Path;

use byte_slice_cast::AsSliceOf;
use memmap2::Mmap;

use crate::index::Idx;
use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    pub fn as_str(self) -> &'static str {
        match self {
            Endian::Little => "little",
            Endian::Big => "big",
        }
    }
}

/// A memory-mapped packed integer file.
pub struct PackedInput {
    mmap: Mmap,
    width: usize,
    endian: Endian,
    len: usize,
}

impl PackedInput {
    pub fn open(path: &Path, width: usize, endian: Endian, len: usize) -> Result<Self, Error> {
        debug_assert!((1..=8).contains(&width));

        let file = File::open(path)?;
        let expected = len * width;
        let actual = file.metadata()?.len();
        if actual != expected as u64 {
            return Err(Error::deserialize(format!(
                "{}: expected {} bytes, found {}",
                path.display(),
                expected,
                actual
            )));
        }

        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self {
            mmap,
            width,
            endian,
            len,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The integer at position `i`.
    #[inline]
    pub fn get(&self, i: usize) -> u64 {
        debug_assert!(i < self.len);
        let bytes = &self.mmap[i * self.width..(i + 1) * self.width];
        decode(bytes, self.endian)
    }

    /// Decodes the whole file into an index vector.
    ///
    /// When the on-disk layout matches the in-memory layout of a native
    /// word the mmap is cast directly (alignment permitting); otherwise each
    /// value is decoded on its own.
    pub fn decode_all<T: Idx>(&self) -> Vec<T> {
        if self.endian == Endian::Little && cfg!(target_endian = "little") {
            if self.width == 8 {
                if let Ok(words) = self.mmap[..].as_slice_of::<u64>() {
                    return words.iter().map(|&w| T::new(w as usize)).collect();
                }
            }
            if self.width == 4 {
                if let Ok(words) = self.mmap[..].as_slice_of::<u32>() {
                    return words.iter().map(|&w| T::new(w as usize)).collect();
                }
            }
        }

        (0..self.len).map(|i| T::new(self.get(i) as usize)).collect()
    }
}

#[inline]
fn decode(bytes: &[u8], endian: Endian) -> u64 {
    let mut value = 0u64;
    match endian {
        Endian::Little => {
            for &b in bytes.iter().rev() {
                value = (value << 8) | u64::from(b);
            }
        }
        Endian::Big => {
            for &b in bytes {
                value = (value << 8) | u64::from(b);
            }
        }
    }
    value
}

/// Appends `value` to `out` as `width` bytes in the given byte order.
///
/// The value must fit the width; the converter picks widths from the actual
/// maxima before encoding.
pub fn encode(value: u64, width: usize, endian: Endian, out: &mut Vec<u8>) {
    debug_assert!(width == 8 || value < 1u64 << (8 * width));
    let le = value.to_le_bytes();
    match endian {
        Endian::Little => out.extend_from_slice(&le[..width]),
        Endian::Big => out.extend(le[..width].iter().rev()),
    }
}

/// The smallest byte width that represents `value`.
pub fn min_width(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    usize::max(1, (bits + 7) / 8)
}
