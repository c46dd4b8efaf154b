//! On-disk input formats: the manifest, packed CSR files, and edge-list
//! text.

pub mod binary;
pub mod edgelist;
pub mod manifest;

use std::path::Path;

use log::info;
use std::time::Instant;

use crate::graph::{Csr, Graph, GraphPart};
use crate::index::Idx;
use crate::input::binary::PackedInput;
use crate::input::manifest::Manifest;
use crate::partition::Partition;
use crate::Error;

fn check_counts<NI: Idx, EI: Idx>(manifest: &Manifest) -> Result<(NI, EI), Error> {
    // The sentinel NI::MAX must stay unused by real vertex ids.
    if manifest.node_count >= NI::max_value().index() as u64 {
        return Err(Error::assumption(format!(
            "node count {} does not fit the vertex id type",
            manifest.node_count
        )));
    }
    if manifest.edge_count >= EI::max_value().index() as u64 {
        return Err(Error::assumption(format!(
            "edge count {} does not fit the edge index type",
            manifest.edge_count
        )));
    }
    Ok((
        NI::new(manifest.node_count as usize),
        EI::new(manifest.edge_count as usize),
    ))
}

/// Materializes the full graph described by a manifest.
///
/// All four CSR files are decoded and the structural invariants are
/// validated: monotone heads with `head[0] = 0` and `head[n] = m`, targets in
/// `[0, n)`, and matching file sizes.
pub fn load_graph<NI: Idx, EI: Idx>(manifest: &Manifest) -> Result<Graph<NI, EI>, Error> {
    let (n, m) = check_counts::<NI, EI>(manifest)?;
    let start = Instant::now();

    let fw = load_full_csr(
        manifest,
        &manifest.fw_head_path(),
        &manifest.fw_csr_path(),
        n,
        m,
    )?;
    let bw = load_full_csr(
        manifest,
        &manifest.bw_head_path(),
        &manifest.bw_csr_path(),
        n,
        m,
    )?;

    info!(
        "Loaded graph '{}' (n = {}, m = {}) in {:?}",
        manifest.name,
        manifest.node_count,
        manifest.edge_count,
        start.elapsed()
    );

    Ok(Graph::new(n, fw, bw))
}

fn load_full_csr<NI: Idx, EI: Idx>(
    manifest: &Manifest,
    head_path: &Path,
    csr_path: &Path,
    n: NI,
    m: EI,
) -> Result<Csr<EI, NI>, Error> {
    let head_input = PackedInput::open(
        head_path,
        manifest.head_bytes,
        manifest.endian,
        n.index() + 1,
    )?;
    let csr_input = PackedInput::open(csr_path, manifest.csr_bytes, manifest.endian, m.index())?;

    let offsets = head_input.decode_all::<EI>();
    if offsets[0] != EI::zero() || offsets[n.index()] != m {
        return Err(Error::deserialize(format!(
            "head array of {} is not anchored at [0, m]",
            head_path.display()
        )));
    }
    if offsets.windows(2).any(|w| w[0] > w[1]) {
        return Err(Error::deserialize(format!(
            "head array of {} is not monotone",
            head_path.display()
        )));
    }

    let targets = csr_input.decode_all::<NI>();
    if targets.iter().any(|&v| v >= n) {
        return Err(Error::deserialize(format!(
            "target array of {} contains a vertex id >= n",
            csr_path.display()
        )));
    }

    Ok(Csr::new(
        offsets.into_boxed_slice(),
        targets.into_boxed_slice(),
    ))
}

/// Materializes one rank's slice of the graph described by a manifest.
///
/// Only the head entries and neighbor rows of owned vertices are read. The
/// backward files already hold incoming edges keyed by destination, so no
/// exchange is needed at load time.
pub fn load_graph_part<P, NI, EI>(
    manifest: &Manifest,
    part: P,
) -> Result<GraphPart<P, NI, EI>, Error>
where
    P: Partition<NI>,
    NI: Idx,
    EI: Idx,
{
    let (n, m) = check_counts::<NI, EI>(manifest)?;
    let start = Instant::now();

    let fw = load_part_csr(
        manifest,
        &manifest.fw_head_path(),
        &manifest.fw_csr_path(),
        &part,
        n,
        m,
    )?;
    let bw = load_part_csr(
        manifest,
        &manifest.bw_head_path(),
        &manifest.bw_csr_path(),
        &part,
        n,
        m,
    )?;

    info!(
        "rank {}: loaded {} vertices, {} forward and {} backward edges in {:?}",
        part.world_rank(),
        part.local_n().index(),
        fw.edge_count().index(),
        bw.edge_count().index(),
        start.elapsed()
    );

    Ok(GraphPart::new(part, fw, bw))
}

fn load_part_csr<P, NI, EI>(
    manifest: &Manifest,
    head_path: &Path,
    csr_path: &Path,
    part: &P,
    n: NI,
    m: EI,
) -> Result<Csr<EI, NI>, Error>
where
    P: Partition<NI>,
    NI: Idx,
    EI: Idx,
{
    let head_input = PackedInput::open(
        head_path,
        manifest.head_bytes,
        manifest.endian,
        n.index() + 1,
    )?;
    let csr_input = PackedInput::open(csr_path, manifest.csr_bytes, manifest.endian, m.index())?;

    let local_n = part.local_n().index();
    let mut offsets = Vec::with_capacity(local_n + 1);
    let mut targets = Vec::new();

    offsets.push(EI::zero());
    for k in 0..local_n {
        let u = part.to_global(NI::new(k)).index();
        let row_begin = head_input.get(u) as usize;
        let row_end = head_input.get(u + 1) as usize;
        if row_begin > row_end || row_end > m.index() {
            return Err(Error::deserialize(format!(
                "head array of {} is not monotone at vertex {}",
                head_path.display(),
                u
            )));
        }
        for it in row_begin..row_end {
            let v = csr_input.get(it);
            if v >= n.index() as u64 {
                return Err(Error::deserialize(format!(
                    "target array of {} contains a vertex id >= n",
                    csr_path.display()
                )));
            }
            targets.push(NI::new(v as usize));
        }
        offsets.push(EI::new(targets.len()));
    }

    Ok(Csr::new(
        offsets.into_boxed_slice(),
        targets.into_boxed_slice(),
    ))
}
