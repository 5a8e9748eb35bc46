//! CLI entrypoint: maps a set of signal files against an index and
//! writes PAF to stdout, or (with `--performance-benchmark`) times the
//! DTW kernels the way `check_dtw.cpp`'s benchmark mode does.

use std::time::Instant;

use clap::Parser;
use parking_lot::RwLock;
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use tracing::info;

use ravelmap::config::MapOpt;
use ravelmap::dtw::{dtw_global, dtw_global_diagonalbanded, dtw_global_slantedbanded, dtw_global_slantedbanded_antidiag};
use ravelmap::events::ThresholdEventDetector;
use ravelmap::index::InMemoryIndex;
use ravelmap::orchestrator::{run_batch, SequenceUntilController};
use ravelmap::signal::InMemorySignalSource;

/// Nanopore raw-signal read mapper.
#[derive(Parser, Debug)]
#[command(name = "ravelmap", about = "Map nanopore raw-signal reads without basecalling")]
struct Cli {
    /// Signal file(s) or directories to map. Ignored in
    /// `--performance-benchmark` mode.
    #[arg(default_value = "")]
    input: String,

    /// Path to a TOML config file overriding default `MapOpt` fields.
    #[arg(long)]
    config: Option<String>,

    /// Run DTW kernel timing instead of mapping:
    /// `--performance-benchmark ITERATIONS A_LEN B_LEN BAND_RADIUS_FRAC`.
    #[arg(long, num_args = 4, value_names = ["ITERATIONS", "A_LEN", "B_LEN", "BAND_RADIUS_FRAC"])]
    performance_benchmark: Option<Vec<String>>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    if let Some(args) = cli.performance_benchmark {
        let (iterations, a_len, b_len, band_radius_frac) =
            parse_benchmark_args(&args).map_err(|e| anyhow::anyhow!("invalid --performance-benchmark arguments: {e}"))?;
        performance_benchmark(iterations, a_len, b_len, band_radius_frac);
        return Ok(());
    }

    let opt = load_opt(cli.config.as_deref())?;

    // Real file-backed SignalSource/Index construction is out of scope
    // (spec.md §1); this binary demonstrates the pipeline end to end
    // against an empty in-memory index so the exit-code contract
    // (spec.md §6) and PAF formatting are exercised even with no
    // signal files supplied.
    let index = InMemoryIndex::new();
    let detector = ThresholdEventDetector;
    let controller = RwLock::new(SequenceUntilController::new(&opt));
    let mut source = InMemorySignalSource::new(Vec::new());

    use std::io::Write;
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    run_batch(&mut source, &index, &detector, &opt, &controller, |state| {
        let line = ravelmap::paf::format_paf_line(&state, &index);
        let _ = handle.write_all(line.as_bytes());
        let _ = handle.write_all(b"\n");
    });

    info!("mapping run complete");
    Ok(())
}

fn load_opt(config_path: Option<&str>) -> Result<MapOpt, ravelmap::MapError> {
    let opt = match config_path {
        Some(path) => {
            let contents = std::fs::read_to_string(path).map_err(|source| ravelmap::MapError::Io {
                path: path.to_string(),
                source,
            })?;
            MapOpt::from_toml_str(&contents)?
        }
        None => MapOpt::default(),
    };
    opt.validate()?;
    Ok(opt)
}

fn parse_benchmark_args(args: &[String]) -> Result<(u32, usize, usize, f32), String> {
    if args.len() != 4 {
        return Err("expected 4 arguments".to_string());
    }
    let iterations: u32 = args[0].parse().map_err(|_| "ITERATIONS must be an integer")?;
    let a_len: usize = args[1].parse().map_err(|_| "A_LEN must be an integer")?;
    let b_len: usize = args[2].parse().map_err(|_| "B_LEN must be an integer")?;
    let band_radius_frac: f32 = args[3].parse().map_err(|_| "BAND_RADIUS_FRAC must be a float")?;
    Ok((iterations, a_len, b_len, band_radius_frac))
}

fn generate_random_vector(len: usize, seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen_range(-4.0..4.0)).collect()
}

/// Times each DTW variant over `iterations` runs, mirroring
/// `check_dtw.cpp::performance_benchmark`.
fn performance_benchmark(iterations: u32, a_len: usize, b_len: usize, band_radius_frac: f32) {
    let a = generate_random_vector(a_len, 42);
    let b = generate_random_vector(b_len, 43);
    let band_radius = ((a.len() as f32) * band_radius_frac).round() as u32;

    let variants: [(&str, Box<dyn Fn() -> f32>); 4] = [
        ("dtw_global", Box::new(|| dtw_global(&a, &b, false))),
        ("dtw_global_diagonalbanded", Box::new(|| dtw_global_diagonalbanded(&a, &b, band_radius, false))),
        ("dtw_global_slantedbanded", Box::new(|| dtw_global_slantedbanded(&a, &b, band_radius, false))),
        (
            "dtw_global_slantedbanded_antidiag",
            Box::new(|| dtw_global_slantedbanded_antidiag(&a, &b, band_radius, false)),
        ),
    ];

    for (name, run) in variants {
        let start = Instant::now();
        let mut checksum = 0.0f32;
        for _ in 0..iterations {
            checksum += run();
        }
        let elapsed = start.elapsed();
        println!("{name}: {iterations} iters in {elapsed:?} (checksum {checksum:.3})");
    }
}
