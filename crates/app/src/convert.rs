//! Edge-list to CSR converter.
//!
//! Reads a text file of `u v` lines (comments: `%`, `#`, `//`), resolves
//! the vertex range from the maximum id, and writes the four packed CSR
//! files plus the manifest into the output directory.
//!
//! Usage: convert <edge-list> <out-dir> [--code NAME] [--name TITLE]

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use log::info;

use scc_graph::prelude::*;

const HELP: &str = "\
Usage: convert <edge-list> <out-dir> [--code NAME] [--name TITLE]

Converts an edge-list text file into the packed CSR on-disk format.

Options:
  --code NAME    file prefix of the CSR files (default: input file stem)
  --name TITLE   human readable graph name (default: the code)
  -h, --help     print this help
";

struct Args {
    input: PathBuf,
    out_dir: PathBuf,
    code: Option<String>,
    name: Option<String>,
}

fn parse_args() -> Result<Args, pico_args::Error> {
    let mut args = pico_args::Arguments::from_env();
    if args.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let parsed = Args {
        code: args.opt_value_from_str("--code")?,
        name: args.opt_value_from_str("--name")?,
        input: args.free_from_str()?,
        out_dir: args.free_from_str()?,
    };
    let _ = args.finish();
    Ok(parsed)
}

fn run(args: Args) -> Result<(), Error> {
    let start = Instant::now();

    let code = args.code.unwrap_or_else(|| {
        args.input
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "graph".to_string())
    });
    let name = args.name.unwrap_or_else(|| code.clone());

    let list = EdgeList::<u64>::load(&args.input)?;
    let n = list.max_node_id().map_or(0, |max| max + 1);
    info!("{}: {} edges over {} vertices", code, list.len(), n);

    let graph: Graph<u64, u64> = Graph::from_edges(n, list.into_vec());

    std::fs::create_dir_all(&args.out_dir)?;
    let manifest = write_graph(&args.out_dir, &code, &name, &graph)?;

    info!(
        "converted '{}' to {} in {:?}",
        args.input.display(),
        args.out_dir.join(format!("{}.manifest", manifest.code)).display(),
        start.elapsed()
    );
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(error) => {
            eprintln!("convert: {error}");
            eprint!("{HELP}");
            return ExitCode::from(2);
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(
            error @ (Error::IoError { .. }
            | Error::ManifestError { .. }
            | Error::DeserializeError { .. }),
        ) => {
            eprintln!("convert: graph error: {error}");
            ExitCode::from(1)
        }
        Err(Error::AssumptionError { reason }) => {
            eprintln!("convert: assertion failure: {reason}");
            ExitCode::from(3)
        }
        Err(error) => {
            eprintln!("convert: {error}");
            ExitCode::from(2)
        }
    }
}
