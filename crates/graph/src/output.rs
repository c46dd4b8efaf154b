//! On-disk CSR serialization: the four packed files plus the manifest.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use log::info;

use crate::graph::{Csr, Graph};
use crate::index::Idx;
use crate::input::binary::{encode, min_width, Endian};
use crate::input::manifest::{Manifest, SCHEMA_VERSION};
use crate::Error;

/// Writes `graph` into `dir` as `<code>.{fw,bw}.{head,csr}.bin` plus
/// `<code>.manifest`, and returns the manifest.
///
/// Byte widths are the minimum that represent the edge count (head entries)
/// and the largest vertex id (target entries). Files are little-endian.
pub fn write_graph<NI: Idx, EI: Idx>(
    dir: &Path,
    code: &str,
    name: &str,
    graph: &Graph<NI, EI>,
) -> Result<Manifest, Error> {
    let start = Instant::now();

    let n = graph.node_count().index() as u64;
    let m = graph.edge_count().index() as u64;
    let endian = Endian::Little;
    let head_bytes = min_width(m);
    let csr_bytes = min_width(n.saturating_sub(1));

    let manifest = Manifest {
        schema_version: SCHEMA_VERSION,
        code: code.to_string(),
        name: name.to_string(),
        endian,
        node_count: n,
        edge_count: m,
        contains_self_loops: contains_self_loops(graph.fw()),
        contains_duplicate_edges: contains_duplicate_edges(graph.fw()),
        head_bytes,
        csr_bytes,
        base_dir: dir.to_path_buf(),
        fw_head: format!("{code}.fw.head.bin").into(),
        fw_csr: format!("{code}.fw.csr.bin").into(),
        bw_head: format!("{code}.bw.head.bin").into(),
        bw_csr: format!("{code}.bw.csr.bin").into(),
    };

    write_csr(&manifest.fw_head_path(), &manifest.fw_csr_path(), graph.fw(), head_bytes, csr_bytes, endian)?;
    write_csr(&manifest.bw_head_path(), &manifest.bw_csr_path(), graph.bw(), head_bytes, csr_bytes, endian)?;
    write_manifest(&manifest)?;

    info!(
        "Wrote graph '{}' (n = {}, m = {}, head {}B, csr {}B) in {:?}",
        name,
        n,
        m,
        head_bytes,
        csr_bytes,
        start.elapsed()
    );

    Ok(manifest)
}

fn write_csr<NI: Idx, EI: Idx>(
    head_path: &Path,
    csr_path: &Path,
    csr: &Csr<EI, NI>,
    head_bytes: usize,
    csr_bytes: usize,
    endian: Endian,
) -> Result<(), Error> {
    let mut buf = Vec::with_capacity(csr.offsets().len() * head_bytes);
    for &offset in csr.offsets() {
        encode(offset.index() as u64, head_bytes, endian, &mut buf);
    }
    let mut head = BufWriter::new(File::create(head_path)?);
    head.write_all(&buf)?;
    head.flush()?;

    buf.clear();
    buf.reserve(csr.raw_targets().len() * csr_bytes);
    for &target in csr.raw_targets() {
        encode(target.index() as u64, csr_bytes, endian, &mut buf);
    }
    let mut targets = BufWriter::new(File::create(csr_path)?);
    targets.write_all(&buf)?;
    targets.flush()?;

    Ok(())
}

fn write_manifest(manifest: &Manifest) -> Result<(), Error> {
    let path = manifest.base_dir.join(format!("{}.manifest", manifest.code));
    let mut out = BufWriter::new(File::create(path)?);

    writeln!(out, "schema.version {}", manifest.schema_version)?;
    writeln!(out, "graph.code {}", manifest.code)?;
    writeln!(out, "graph.name {}", manifest.name)?;
    writeln!(out, "graph.endian {}", manifest.endian.as_str())?;
    writeln!(out, "graph.node_count {}", manifest.node_count)?;
    writeln!(out, "graph.edge_count {}", manifest.edge_count)?;
    writeln!(out, "graph.contains_self_loops {}", manifest.contains_self_loops)?;
    writeln!(
        out,
        "graph.contains_duplicate_edges {}",
        manifest.contains_duplicate_edges
    )?;
    writeln!(out, "graph.head.bytes {}", manifest.head_bytes)?;
    writeln!(out, "graph.csr.bytes {}", manifest.csr_bytes)?;
    writeln!(out, "fw.head.path {}", manifest.fw_head.display())?;
    writeln!(out, "fw.csr.path {}", manifest.fw_csr.display())?;
    writeln!(out, "bw.head.path {}", manifest.bw_head.display())?;
    writeln!(out, "bw.csr.path {}", manifest.bw_csr.display())?;
    out.flush()?;

    Ok(())
}

fn contains_self_loops<NI: Idx, EI: Idx>(csr: &Csr<EI, NI>) -> bool {
    (0..csr.row_count()).any(|u| csr.targets(NI::new(u)).contains(&NI::new(u)))
}

fn contains_duplicate_edges<NI: Idx, EI: Idx>(csr: &Csr<EI, NI>) -> bool {
    // Rows are sorted after construction from a sorted edge list, so
    // duplicates are adjacent.
    (0..csr.row_count()).any(|u| {
        csr.targets(NI::new(u))
            .windows(2)
            .any(|w| w[0] == w[1])
    })
}
