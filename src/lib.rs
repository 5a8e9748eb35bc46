//! # ravelmap — nanopore raw-signal read mapping
//!
//! Maps nanopore raw-current reads against a reference genome without
//! basecalling: reads arrive as streamed current-sample chunks, each
//! chunk is converted to events, seeded against a pre-built hash index
//! of expected event-value sequences, chained into colinear anchor
//! sets, and optionally rescored by Dynamic Time Warping. Output is a
//! PAF-like record per read.
//!
//! ## Module map
//!
//! - [`dtw`] — the four numerically equivalent DTW kernels (C1).
//! - [`seed`] — sketching and seeding (C2).
//! - [`chain`] — colinear chaining DP (C3).
//! - [`evaluate`] — DTW rescoring, primary selection, MAPQ (C4).
//! - [`pipeline`] — per-read chunk loop (C5).
//! - [`orchestrator`] — the four-stage streaming pipeline and
//!   Sequence-Until controller (C6).
//! - [`index`], [`events`], [`signal`] — collaborator traits plus
//!   in-memory implementations for testing.
//! - [`config`], [`error`], [`paf`] — ambient configuration, error
//!   types, and output formatting.

// Global allocator: mimalloc. Declared at the crate root so it applies
// to every allocation in this process, including rayon's worker pools.
use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

pub mod chain;
pub mod config;
pub mod dtw;
pub mod error;
pub mod evaluate;
pub mod events;
pub mod index;
pub mod orchestrator;
pub mod paf;
pub mod pipeline;
pub mod seed;
pub mod signal;
pub mod types;

pub use config::MapOpt;
pub use error::{MapError, MapResult};
