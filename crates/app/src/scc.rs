//! SCC runner: loads a manifest, runs the engine, reports the components.
//!
//! Usage: scc <manifest> [--ranks W] [--partition SCHEME] [--alpha A]
//!            [--output FILE]
//!
//! With `--ranks 1` the graph is loaded whole and solved serially; larger
//! worlds run one rank per thread over the in-process fabric, each rank
//! loading only its slice of the CSR files.

use std::io::Write;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use std::time::Instant;

use log::info;

use scc_engine::prelude::*;
use scc_graph::prelude::*;

type NI = u64;
type EI = u64;

const HELP: &str = "\
Usage: scc <manifest> [options]

Computes strongly connected components of the graph behind a manifest.

Options:
  --ranks W           number of ranks, run as threads (default: 1)
  --partition SCHEME  cyclic | block-cyclic | trivial | balanced
                      (default: balanced)
  --alpha A           top-down to bottom-up switch factor (default: 14)
  --output FILE       write one 'vertex scc_id' line per vertex
  -h, --help          print this help
";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Scheme {
    Cyclic,
    BlockCyclic,
    Trivial,
    Balanced,
}

impl std::str::FromStr for Scheme {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "cyclic" => Ok(Scheme::Cyclic),
            "block-cyclic" => Ok(Scheme::BlockCyclic),
            "trivial" => Ok(Scheme::Trivial),
            "balanced" => Ok(Scheme::Balanced),
            other => Err(format!("unknown partition scheme '{other}'")),
        }
    }
}

struct Args {
    manifest: PathBuf,
    ranks: usize,
    scheme: Scheme,
    alpha: f64,
    output: Option<PathBuf>,
}

fn parse_args() -> Result<Args, pico_args::Error> {
    let mut args = pico_args::Arguments::from_env();
    if args.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let parsed = Args {
        ranks: args.opt_value_from_str("--ranks")?.unwrap_or(1),
        scheme: args
            .opt_value_from_fn("--partition", Scheme::from_str)?
            .unwrap_or(Scheme::Balanced),
        alpha: args
            .opt_value_from_str("--alpha")?
            .unwrap_or(SccConfig::DEFAULT_ALPHA),
        output: args.opt_value_from_str("--output")?,
        manifest: args.free_from_str()?,
    };
    let _ = args.finish();
    Ok(parsed)
}

/// Solves one rank's slice: agrees with the peers that every slice loaded,
/// then runs the collective engine.
///
/// The agreement keeps the collective schedule uniform; a rank that bailed
/// out while others enter the engine would deadlock the fabric.
fn run_rank<P>(
    loaded: Result<GraphPart<P, NI, EI>, Error>,
    world: &ThreadWorld,
    config: &SccConfig,
) -> Result<Vec<(NI, NI)>, Error>
where
    P: Partition<NI>,
{
    let failures = world.all_reduce_sum(u64::from(loaded.is_err()));
    match loaded {
        Ok(graph) if failures == 0 => {
            let part = *graph.part();
            let slice = scc(&graph, world, config);
            Ok(slice
                .into_iter()
                .enumerate()
                .map(|(k, label)| (part.to_global(k as NI), label))
                .collect())
        }
        Ok(_) => Err(Error::AssumptionError {
            reason: "a peer rank failed to load its slice".to_string(),
        }),
        Err(error) => Err(error),
    }
}

/// Runs the SPMD program and reassembles the global labeling.
fn solve(manifest: &Manifest, args: &Args, config: &SccConfig) -> Result<Vec<NI>, Error> {
    let n = manifest.node_count;

    if args.ranks == 1 {
        let graph = load_graph::<NI, EI>(manifest)?.into_part();
        return Ok(scc(&graph, &SingleRank, config));
    }

    let slices: Vec<Result<Vec<(NI, NI)>, Error>> = spmd(args.ranks, |world| {
        let rank = world.world_rank();
        match args.scheme {
            Scheme::Cyclic => {
                let part = CyclicPart::new(n, rank, args.ranks);
                run_rank(load_graph_part(manifest, part), &world, config)
            }
            Scheme::BlockCyclic => {
                let part = BlockCyclicPart::new(n, rank, args.ranks);
                run_rank(load_graph_part(manifest, part), &world, config)
            }
            Scheme::Trivial => {
                let part = TrivialSlicePart::new(n, rank, args.ranks);
                run_rank(load_graph_part(manifest, part), &world, config)
            }
            Scheme::Balanced => {
                let part = BalancedSlicePart::new(n, rank, args.ranks);
                run_rank(load_graph_part(manifest, part), &world, config)
            }
        }
    });

    let mut labels = vec![0; n as usize];
    for slice in slices {
        for (u, label) in slice? {
            labels[u as usize] = label;
        }
    }
    Ok(labels)
}

fn report(labels: &[NI], output: Option<&PathBuf>) -> Result<(), Error> {
    let mut counts = std::collections::HashMap::new();
    for &label in labels {
        *counts.entry(label).or_insert(0u64) += 1;
    }
    let largest = counts.values().max().copied().unwrap_or(0);
    println!(
        "vertices {} components {} largest {}",
        labels.len(),
        counts.len(),
        largest
    );

    if let Some(path) = output {
        let mut out = std::io::BufWriter::new(std::fs::File::create(path)?);
        for (u, label) in labels.iter().enumerate() {
            writeln!(out, "{u} {label}")?;
        }
        out.flush()?;
    }
    Ok(())
}

fn run(args: Args) -> Result<(), Error> {
    let start = Instant::now();
    let manifest = Manifest::load(&args.manifest)?;
    let config = SccConfig {
        alpha: args.alpha,
        ..SccConfig::default()
    };

    let labels = solve(&manifest, &args, &config)?;
    info!(
        "solved '{}' on {} ranks in {:?}",
        manifest.name,
        args.ranks,
        start.elapsed()
    );

    report(&labels, args.output.as_ref())
}

fn main() -> ExitCode {
    env_logger::init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(error) => {
            eprintln!("scc: {error}");
            eprint!("{HELP}");
            return ExitCode::from(2);
        }
    };
    if args.ranks == 0 {
        eprintln!("scc: --ranks must be at least 1");
        return ExitCode::from(2);
    }

    let outcome = catch_unwind(AssertUnwindSafe(|| run(args)));
    match outcome {
        Ok(Ok(())) => ExitCode::SUCCESS,
        Ok(Err(
            error @ (Error::IoError { .. }
            | Error::ManifestError { .. }
            | Error::DeserializeError { .. }),
        )) => {
            eprintln!("scc: graph error: {error}");
            ExitCode::from(1)
        }
        Ok(Err(Error::AssumptionError { reason })) => {
            eprintln!("scc: assertion failure: {reason}");
            ExitCode::from(3)
        }
        Err(_) => {
            eprintln!("scc: assertion failure in a rank");
            ExitCode::from(3)
        }
    }
}
