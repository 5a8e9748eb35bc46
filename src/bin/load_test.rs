//! ```bash
//! cargo run --release --bin load_test
//! ```

use parking_lot::RwLock;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::time::Instant;

use ravelmap::config::{MapOpt, SketchParams};
use ravelmap::events::ThresholdEventDetector;
use ravelmap::index::InMemoryIndex;
use ravelmap::orchestrator::{run_batch, SequenceUntilController};
use ravelmap::signal::InMemorySignalSource;

/// Number of synthetic reference sequences to index.
const N_REFS: usize = 20;
/// Event-vector length per reference.
const REF_LEN: usize = 2_000;
/// Number of synthetic reads to map.
const N_READS: usize = 2_000;
/// Deterministic seed for reproducibility.
const SEED: u64 = 42;

fn random_events(rng: &mut StdRng, len: usize) -> Vec<f32> {
    (0..len).map(|_| rng.gen::<f32>() * 8.0 - 4.0).collect()
}

fn divider() {
    println!("{}", "─".repeat(60));
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("╔══════════════════════════════════════════════════════════╗");
    println!("║        ravelmap Load Test & Pipeline Verifier             ║");
    println!("╚══════════════════════════════════════════════════════════╝");
    println!();

    // ── Phase 1: Reference generation ─────────────────────────────────
    divider();
    println!("Phase 1 — Generating {N_REFS} synthetic references ({REF_LEN} events each)");

    let t0 = Instant::now();
    let mut rng = StdRng::seed_from_u64(SEED);
    let sketch_params = SketchParams::default();
    let mut index = InMemoryIndex::new();
    let mut references = Vec::with_capacity(N_REFS);
    for i in 0..N_REFS {
        let forward = random_events(&mut rng, REF_LEN);
        let reverse: Vec<f32> = forward.iter().rev().copied().collect();
        index.add_reference(format!("ref{i}"), forward.clone(), reverse, sketch_params);
        references.push(forward);
    }
    println!("  Indexed in {:?}", t0.elapsed());

    // ── Phase 2: Read generation ───────────────────────────────────────
    divider();
    println!("Phase 2 — Generating {N_READS} synthetic reads");
    println!("  Half sampled from indexed references (expected to map),");
    println!("  half pure noise (expected to stay unmapped).");

    let t0 = Instant::now();
    let mut read_rng = StdRng::seed_from_u64(SEED + 1);
    let mut reads: Vec<(u32, String, Vec<Vec<f32>>)> = Vec::with_capacity(N_READS);
    for i in 0..N_READS {
        let samples = if i % 2 == 0 {
            let r = &references[i % references.len()];
            let start = read_rng.gen_range(0..r.len().saturating_sub(200).max(1));
            r[start..(start + 200).min(r.len())].to_vec()
        } else {
            random_events(&mut read_rng, 200)
        };
        reads.push((i as u32, format!("read{i}"), vec![samples]));
    }
    println!("  Generated in {:?}", t0.elapsed());

    // ── Phase 3: Mapping throughput ─────────────────────────────────────
    divider();
    println!("Phase 3 — Mapping {N_READS} reads through the orchestrator");

    let opt = MapOpt::default();
    let detector = ThresholdEventDetector;
    let controller = RwLock::new(SequenceUntilController::new(&opt));
    let mut source = InMemorySignalSource::new(reads);

    let t0 = Instant::now();
    let mut mapped = 0usize;
    let mut total = 0usize;
    run_batch(&mut source, &index, &detector, &opt, &controller, |state| {
        total += 1;
        if state.mapped {
            mapped += 1;
        }
    });
    let map_duration = t0.elapsed();

    println!("  Mapped {total} reads in {map_duration:?}");
    println!("  Throughput: {:.0} reads/sec", total as f64 / map_duration.as_secs_f64());
    println!("  Mapped: {mapped}/{total} ({:.1}%)", 100.0 * mapped as f64 / total.max(1) as f64);

    // ── Phase 4: Config round-trip ───────────────────────────────────────
    divider();
    println!("Phase 4 — Verifying TOML config round-trip");

    let serialized = toml::to_string(&opt)?;
    let reloaded = MapOpt::from_toml_str(&serialized)?;
    let config_roundtrip_ok = reloaded == opt;
    println!("  Round-trip: {}", if config_roundtrip_ok { "PASSED" } else { "FAILED" });

    // ── Phase 5: Summary ─────────────────────────────────────────────────
    divider();
    println!("Performance Summary");
    println!("──────────────────────────────────────────────────");
    println!("  Mapping throughput: {:.0} reads/sec", total as f64 / map_duration.as_secs_f64());
    println!("  Mapped fraction:    {:.1}%", 100.0 * mapped as f64 / total.max(1) as f64);
    println!("  Config round-trip:  {}", if config_roundtrip_ok { "ok" } else { "MISMATCH" });
    println!("──────────────────────────────────────────────────");

    if !config_roundtrip_ok {
        return Err("config round-trip produced a different MapOpt".into());
    }

    Ok(())
}
