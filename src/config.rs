//! Mapping configuration.
//!
//! Field-for-field port of `ri_mapopt_t` (`roptions.h`) with defaults from
//! `ri_mapopt_init` (`roptions.c`). Grouped into the same logical sections
//! the original used (device, chaining, mapping, DTW, event detection,
//! sequence-until) purely for readability; the wire/API shape is one flat
//! struct, same as the original.

use serde::{Deserialize, Serialize};

/// DTW rectangle border policy used when rescoring a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DtwBorderConstraint {
    /// One DTW over the whole chain's bounding rectangle.
    Global,
    /// DTW over each consecutive anchor pair, summed (default).
    Sparse,
    /// Reserved; not implemented by the chain evaluator (see spec C4).
    Local,
}

/// DTW DP fill strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DtwFillMethod {
    Full,
    Banded,
}

/// Mirrors the `RI_M_*` bit flags in `roptions.h`.
///
/// A hand-rolled bitset rather than a `bitflags!`-generated type: the flag
/// set is small and fixed, and a plain `u32` newtype keeps TOML/CLI
/// round-tripping (`#[serde(transparent)]`) simple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MapFlags(u32);

impl MapFlags {
    pub const SEQUENCE_UNTIL: MapFlags = MapFlags(0x1);
    pub const DTW_EVALUATE_CHAINS: MapFlags = MapFlags(0x2);
    pub const DTW_OUTPUT_CIGAR: MapFlags = MapFlags(0x4);
    pub const DTW_LOG_SCORES: MapFlags = MapFlags(0x8);
    pub const DISABLE_CHAININGSCORE_FILTERING: MapFlags = MapFlags(0x10);
    pub const OUTPUT_CHAINS: MapFlags = MapFlags(0x20);
    pub const LOG_ANCHORS: MapFlags = MapFlags(0x40);
    pub const LOG_NUM_ANCHORS: MapFlags = MapFlags(0x80);

    pub fn empty() -> Self {
        MapFlags(0)
    }

    pub fn contains(self, other: MapFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for MapFlags {
    type Output = MapFlags;
    fn bitor(self, rhs: MapFlags) -> MapFlags {
        MapFlags(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for MapFlags {
    fn bitor_assign(&mut self, rhs: MapFlags) {
        self.0 |= rhs.0;
    }
}

/// Sketcher/seeder parameters, `{w, e, q, lq, k}` from spec.md §4.2.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SketchParams {
    /// Minimizer window length; 0 disables minimizer-based seeding.
    pub w: u32,
    /// Number of events concatenated into one hash value.
    pub e: u32,
    /// Number of items combined via the BLEND mechanism (currently unused
    /// by the seeder but retained for index-format compatibility).
    pub n: u32,
    /// Most-significant bits kept by quantization.
    pub q: u32,
    /// Least-significant bits, within `q`, kept by quantization.
    pub lq: u32,
    /// k-mer size one event represents.
    pub k: u32,
}

impl Default for SketchParams {
    fn default() -> Self {
        Self {
            w: 0,
            e: 6,
            n: 0,
            q: 9,
            lq: 3,
            k: 6,
        }
    }
}

/// All tunable mapping parameters. Field-for-field port of `ri_mapopt_t`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapOpt {
    // ONT device-specific parameters.
    pub bp_per_sec: u32,
    pub sample_rate: u32,
    pub chunk_size: u32,

    // Chaining parameters.
    pub min_events: u32,
    pub max_gap_length: u32,
    pub max_target_gap_length: u32,
    pub chaining_band_length: u32,
    pub max_num_skips: u32,
    pub min_num_anchors: u32,
    pub num_best_chains: u32,
    pub min_chaining_score: f32,

    // Mapping parameters.
    pub step_size: u32,
    pub max_num_chunk: u32,
    pub min_chain_anchor: u32,
    pub min_chain_anchor_out: u32,
    pub dtw_border_constraint: DtwBorderConstraint,
    pub dtw_fill_method: DtwFillMethod,
    pub dtw_band_radius_frac: f32,
    pub dtw_match_bonus: f32,
    pub dtw_min_score: f32,

    pub min_bestmap_ratio: f32,
    pub min_bestmap_ratio_out: f32,
    pub min_meanmap_ratio: f32,
    pub min_meanmap_ratio_out: f32,

    // Sequence-Until controller.
    pub t_threshold: f32,
    pub tn_samples: u32,
    pub ttest_freq: u32,
    pub tmin_reads: u32,

    pub flag: MapFlags,
    pub mini_batch_size: i64,

    // Event detector parameters.
    pub window_length1: u32,
    pub window_length2: u32,
    pub threshold1: f32,
    pub threshold2: f32,
    pub peak_height: f32,

    pub sketch: SketchParams,
}

impl Default for MapOpt {
    /// Matches `ri_mapopt_init` in `roptions.c` exactly.
    fn default() -> Self {
        Self {
            bp_per_sec: 450,
            sample_rate: 4000,
            chunk_size: 4000,

            max_gap_length: 2000,
            max_target_gap_length: 5000,
            chaining_band_length: 5000,
            max_num_skips: 25,
            min_num_anchors: 2,
            num_best_chains: 3,
            min_chaining_score: 10.0,

            step_size: 1,
            min_events: 50,
            max_num_chunk: 30,
            min_chain_anchor: 2,
            min_chain_anchor_out: 2,

            min_bestmap_ratio: 1.2,
            min_bestmap_ratio_out: 1.2,
            min_meanmap_ratio: 5.0,
            min_meanmap_ratio_out: 5.0,

            mini_batch_size: 500_000_000,

            window_length1: 3,
            window_length2: 6,
            threshold1: 4.30265,
            threshold2: 2.57058,
            peak_height: 1.0,

            t_threshold: 1.5,
            tn_samples: 5,
            ttest_freq: 500,
            tmin_reads: 500,

            dtw_border_constraint: DtwBorderConstraint::Sparse,
            dtw_fill_method: DtwFillMethod::Banded,
            dtw_band_radius_frac: 0.10,
            dtw_match_bonus: 0.4,
            dtw_min_score: 20.0,

            flag: MapFlags::empty(),
            sketch: SketchParams::default(),
        }
    }
}

impl MapOpt {
    /// Load options from a TOML file, falling back to defaults for any
    /// field not present (`#[serde(default)]` fills the rest from `Default`).
    pub fn from_toml_str(s: &str) -> Result<Self, crate::error::MapError> {
        toml::from_str(s).map_err(|e| crate::error::MapError::Config(e.to_string()))
    }

    /// Validate cross-field invariants not expressible in the type system
    /// alone. Returns a `ConfigError`-flavored message on failure.
    pub fn validate(&self) -> Result<(), crate::error::MapError> {
        if self.chunk_size == 0 {
            return Err(crate::error::MapError::Config(
                "chunk_size must be > 0".into(),
            ));
        }
        if self.num_best_chains == 0 {
            return Err(crate::error::MapError::Config(
                "num_best_chains must be > 0".into(),
            ));
        }
        if self.dtw_band_radius_frac <= 0.0 {
            return Err(crate::error::MapError::Config(
                "dtw_band_radius_frac must be > 0".into(),
            ));
        }
        Ok(())
    }
}
