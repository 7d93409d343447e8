// A representative run of symbol tree simplification, to use for profiling.
// Builds random relations between symbols, then simplifies them repeatedly.
//
// To profile using samply:
//
//   cargo build --bin=profile_simplify --profile=fastdev
//   samply record target/fastdev/profile_simplify --symbols 200000

use std::time::Instant;

use clap::Parser;
use mimalloc::MiMalloc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use moment_symbols::symbolic::{SymbolBasis, SymbolPair, SymbolSet, SymbolTree};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[clap(
    name = "profile_simplify",
    about = "Simplifies random symbol relations, for profiling."
)]
struct Args {
    /// How many symbols to relate, not counting zero
    #[clap(long, default_value_t = 100_000)]
    symbols: usize,

    /// How many relations to generate
    #[clap(long, default_value_t = 80_000)]
    relations: usize,

    /// Seed for the random relations
    #[clap(long, default_value_t = 0)]
    seed: u64,

    /// How many times to rebuild and simplify the tree
    #[clap(long, default_value_t = 10)]
    iterations: usize,
}

// Most relations are plain equalities, as they are in practice.
fn random_pairs(args: &Args) -> Vec<SymbolPair> {
    let mut rng = StdRng::seed_from_u64(args.seed);
    (0..args.relations)
        .map(|_| {
            SymbolPair::with(
                rng.gen_range(1..=args.symbols),
                rng.gen_range(1..=args.symbols),
                rng.gen_bool(0.1),
                rng.gen_bool(0.05),
            )
        })
        .collect()
}

fn main() {
    // Use RUST_LOG to see more, e.g.:
    //   RUST_LOG=moment_symbols=debug cargo run --bin=profile_simplify
    tracing_subscriber::registry()
        .with(fmt::layer().with_ansi(false).without_time())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();
    if args.symbols == 0 {
        eprintln!("--symbols must be positive");
        std::process::exit(1);
    }

    let mut set = SymbolSet::from_pairs(random_pairs(&args));
    set.pack();
    info!(
        symbols = set.symbol_count(),
        links = set.link_count(),
        "generated relations"
    );

    let start = Instant::now();
    let mut last = None;
    for _ in 0..args.iterations {
        let mut tree = SymbolTree::new(&set);
        tree.simplify();
        last = Some(tree);
    }
    let elapsed = start.elapsed();

    let Some(tree) = last else {
        println!("no iterations run.");
        return;
    };
    let basis = SymbolBasis::new(&tree);
    println!(
        "{} symbols, {} relations, {} aliases, {} canonical nonzero ({} real, {} imaginary parts)",
        tree.count_nodes(),
        set.link_count(),
        tree.alias_count(),
        basis.canonical_count(),
        basis.real_count(),
        basis.imaginary_count()
    );
    println!(
        "{} iterations in {:.3}s ({:.3}ms each)",
        args.iterations,
        elapsed.as_secs_f64(),
        elapsed.as_secs_f64() * 1000.0 / args.iterations as f64
    );
}
