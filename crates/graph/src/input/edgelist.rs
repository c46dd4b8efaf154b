//! Edge-list text input.
//!
//! One edge per line as `u v`, separated by whitespace. Lines starting with
//! `%`, `#` or `//` are comments; blank lines are skipped. The vertex range
//! is resolved by scanning for the maximum id, so the node count of the
//! resulting graph is `max_id + 1`.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use log::info;
use parking_lot::Mutex;
use rayon::prelude::*;

use crate::index::Idx;
use crate::Error;

#[derive(Debug)]
pub struct EdgeList<NI: Idx> {
    list: Box<[(NI, NI)]>,
}

impl<NI: Idx> EdgeList<NI> {
    pub fn new(edges: Vec<(NI, NI)>) -> Self {
        Self {
            list: edges.into_boxed_slice(),
        }
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn edges(&self) -> &[(NI, NI)] {
        &self.list
    }

    pub fn into_vec(self) -> Vec<(NI, NI)> {
        self.list.into_vec()
    }

    pub fn max_node_id(&self) -> Option<NI> {
        self.list
            .par_iter()
            .map(|&(s, t)| NI::max(s, t))
            .max()
    }

    pub fn load(path: &Path) -> Result<Self, Error> {
        let file = File::open(path)?;
        let mmap = unsafe { memmap2::MmapOptions::new().populate().map(&file)? };
        Self::parse(mmap.as_ref())
    }

    /// Parses edge-list bytes on all physical cores.
    ///
    /// The input is cut into page-aligned chunks, each chunk is extended to
    /// the next newline so no line spans two chunks, and the per-chunk edge
    /// vectors are appended under a shared lock.
    pub fn parse(bytes: &[u8]) -> Result<Self, Error> {
        let start = Instant::now();

        let page_size = page_size::get();
        let cpu_count = num_cpus::get_physical();
        let chunk_size =
            (usize::max(1, bytes.len() / cpu_count) + (page_size - 1)) & !(page_size - 1);

        let all_edges = Arc::new(Mutex::new(Vec::new()));
        let error = Arc::new(Mutex::new(None));

        std::thread::scope(|s| {
            for chunk_start in (0..bytes.len()).step_by(chunk_size) {
                let all_edges = Arc::clone(&all_edges);
                let error = Arc::clone(&error);
                s.spawn(move || {
                    let mut end = usize::min(chunk_start + chunk_size, bytes.len());
                    while end < bytes.len() && bytes[end - 1] != b'\n' {
                        end += 1;
                    }

                    let mut begin = chunk_start;
                    if begin != 0 {
                        while begin < end && bytes[begin - 1] != b'\n' {
                            begin += 1;
                        }
                    }

                    match parse_chunk::<NI>(&bytes[begin..end]) {
                        Ok(mut edges) => all_edges.lock().append(&mut edges),
                        Err(e) => *error.lock() = Some(e),
                    }
                });
            }
        });

        if let Some(e) = error.lock().take() {
            return Err(e);
        }

        let edges = Arc::try_unwrap(all_edges).unwrap().into_inner();

        info!(
            "Read {} edges ({} bytes) in {:?}",
            edges.len(),
            bytes.len(),
            start.elapsed()
        );

        Ok(Self::new(edges))
    }
}

fn is_comment(line: &[u8]) -> bool {
    line.first() == Some(&b'%') || line.first() == Some(&b'#') || line.starts_with(b"//")
}

fn parse_chunk<NI: Idx>(chunk: &[u8]) -> Result<Vec<(NI, NI)>, Error> {
    let mut edges = Vec::new();

    for line in chunk.split(|&b| b == b'\n') {
        let line = trim_ascii(line);
        if line.is_empty() || is_comment(line) {
            continue;
        }

        let (source, used) = NI::parse(line);
        if used == 0 {
            return Err(Error::deserialize(format!(
                "malformed edge line: '{}'",
                String::from_utf8_lossy(line)
            )));
        }
        let rest = trim_ascii(&line[used..]);
        let (target, used) = NI::parse(rest);
        if used == 0 {
            return Err(Error::deserialize(format!(
                "malformed edge line: '{}'",
                String::from_utf8_lossy(line)
            )));
        }

        edges.push((source, target));
    }

    Ok(edges)
}

fn trim_ascii(mut bytes: &[u8]) -> &[u8] {
    while let [first, rest @ ..] = bytes {
        if first.is_ascii_whitespace() {
            bytes = rest;
        } else {
            break;
        }
    }
    while let [rest @ .., last] = bytes {
        if last.is_ascii_whitespace() {
            bytes = rest;
        } else {
            break;
        }
    }
    bytes
}
