//! The plain-text manifest describing an on-disk graph.
//!
//! One `key value` pair per line; blank lines and lines starting with `%`
//! are ignored. All keys listed in [`Manifest::load`] are required.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use fxhash::FxHashMap;
use log::warn;

use crate::input::binary::Endian;
use crate::Error;

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub schema_version: u32,
    pub code: String,
    pub name: String,
    pub endian: Endian,
    pub node_count: u64,
    pub edge_count: u64,
    pub contains_self_loops: bool,
    pub contains_duplicate_edges: bool,
    pub head_bytes: usize,
    pub csr_bytes: usize,

    /// Directory the relative file paths below resolve against.
    pub base_dir: PathBuf,
    pub fw_head: PathBuf,
    pub fw_csr: PathBuf,
    pub bw_head: PathBuf,
    pub bw_csr: PathBuf,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self, Error> {
        let kv = parse_kv_map(path)?;
        let get = |key: &str| -> Result<&str, Error> {
            kv.get(key)
                .map(String::as_str)
                .ok_or_else(|| Error::manifest(format!("missing key '{key}'")))
        };

        let schema_version = parse_int(get("schema.version")?)? as u32;
        if schema_version != SCHEMA_VERSION {
            return Err(Error::manifest(format!(
                "unsupported schema version {schema_version}"
            )));
        }

        let head_bytes = parse_int(get("graph.head.bytes")?)? as usize;
        let csr_bytes = parse_int(get("graph.csr.bytes")?)? as usize;
        for (key, bytes) in [("graph.head.bytes", head_bytes), ("graph.csr.bytes", csr_bytes)] {
            if !(1..=8).contains(&bytes) {
                return Err(Error::manifest(format!("{key} out of range: {bytes}")));
            }
        }

        let manifest = Manifest {
            schema_version,
            code: get("graph.code")?.to_string(),
            name: get("graph.name")?.to_string(),
            endian: parse_endian(get("graph.endian")?)?,
            node_count: parse_int(get("graph.node_count")?)?,
            edge_count: parse_int(get("graph.edge_count")?)?,
            contains_self_loops: parse_bool(get("graph.contains_self_loops")?)?,
            contains_duplicate_edges: parse_bool(get("graph.contains_duplicate_edges")?)?,
            head_bytes,
            csr_bytes,
            base_dir: path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf(),
            fw_head: PathBuf::from(get("fw.head.path")?),
            fw_csr: PathBuf::from(get("fw.csr.path")?),
            bw_head: PathBuf::from(get("bw.head.path")?),
            bw_csr: PathBuf::from(get("bw.csr.path")?),
        };

        if manifest.contains_self_loops {
            warn!("graph '{}' contains self loops", manifest.name);
        }
        if manifest.contains_duplicate_edges {
            warn!("graph '{}' contains duplicate edges", manifest.name);
        }

        Ok(manifest)
    }

    pub fn fw_head_path(&self) -> PathBuf {
        self.base_dir.join(&self.fw_head)
    }

    pub fn fw_csr_path(&self) -> PathBuf {
        self.base_dir.join(&self.fw_csr)
    }

    pub fn bw_head_path(&self) -> PathBuf {
        self.base_dir.join(&self.bw_head)
    }

    pub fn bw_csr_path(&self) -> PathBuf {
        self.base_dir.join(&self.bw_csr)
    }
}

fn parse_kv_map(path: &Path) -> Result<FxHashMap<String, String>, Error> {
    let file = File::open(path)?;
    let mut map = FxHashMap::default();

    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.is_empty() || line.starts_with('%') {
            continue;
        }

        let (key, value) = line
            .split_once(' ')
            .ok_or_else(|| Error::manifest(format!("line without value: '{line}'")))?;
        let value = value.trim_start_matches(' ');

        if map.insert(key.to_string(), value.to_string()).is_some() {
            return Err(Error::manifest(format!("duplicate key '{key}'")));
        }
    }

    Ok(map)
}

fn parse_int(value: &str) -> Result<u64, Error> {
    value
        .parse::<u64>()
        .map_err(|_| Error::manifest(format!("expected an integer, got '{value}'")))
}

fn parse_bool(value: &str) -> Result<bool, Error> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(Error::manifest(format!(
            "expected 'true' or 'false', got '{other}'"
        ))),
    }
}

fn parse_endian(value: &str) -> Result<Endian, Error> {
    match value {
        "little" => Ok(Endian::Little),
        "big" => Ok(Endian::Big),
        other => Err(Error::manifest(format!(
            "expected 'little' or 'big', got '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_manifest(content: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let mut file = File::create(dir.path().join("g.manifest")).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        dir
    }

    const VALID: &str = "\
% generated for tests
schema.version 1
graph.code g
graph.name test graph
graph.endian little
graph.node_count 4
graph.edge_count 5
graph.contains_self_loops true
graph.contains_duplicate_edges false
graph.head.bytes 2
graph.csr.bytes 1
fw.head.path g.fw.head.bin
fw.csr.path g.fw.csr.bin
bw.head.path g.bw.head.bin
bw.csr.path g.bw.csr.bin
";

    #[test]
    fn parses_valid_manifest() {
        let dir = write_manifest(VALID);
        let manifest = Manifest::load(&dir.path().join("g.manifest")).unwrap();

        assert_eq!(manifest.schema_version, 1);
        assert_eq!(manifest.code, "g");
        assert_eq!(manifest.name, "test graph");
        assert_eq!(manifest.endian, Endian::Little);
        assert_eq!(manifest.node_count, 4);
        assert_eq!(manifest.edge_count, 5);
        assert!(manifest.contains_self_loops);
        assert!(!manifest.contains_duplicate_edges);
        assert_eq!(manifest.head_bytes, 2);
        assert_eq!(manifest.csr_bytes, 1);
        assert_eq!(manifest.fw_head_path(), dir.path().join("g.fw.head.bin"));
    }

    #[test]
    fn rejects_missing_key() {
        let dir = write_manifest(&VALID.replace("graph.node_count 4\n", ""));
        let err = Manifest::load(&dir.path().join("g.manifest")).unwrap_err();
        assert!(matches!(err, Error::ManifestError { .. }));
    }

    #[test]
    fn rejects_bad_width() {
        let dir = write_manifest(&VALID.replace("graph.head.bytes 2", "graph.head.bytes 9"));
        let err = Manifest::load(&dir.path().join("g.manifest")).unwrap_err();
        assert!(matches!(err, Error::ManifestError { .. }));
    }

    #[test]
    fn rejects_wrong_schema() {
        let dir = write_manifest(&VALID.replace("schema.version 1", "schema.version 2"));
        assert!(Manifest::load(&dir.path().join("g.manifest")).is_err());
    }

    #[test]
    fn rejects_non_integer_count() {
        let dir = write_manifest(&VALID.replace("graph.edge_count 5", "graph.edge_count five"));
        assert!(Manifest::load(&dir.path().join("g.manifest")).is_err());
    }
}
