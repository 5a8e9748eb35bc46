//! The Sketcher/Seeder (C2, spec.md §4.2).
//!
//! Converts an event vector into seeds via quantization + hashing, then
//! queries the `Index` to turn seed hits into anchors bucketed by
//! `(strand, reference_id)`. The quantization/hash scheme itself is an
//! external decision shared with whatever built the `Index` (spec.md
//! §4.2): the scheme below is this crate's own choice of scheme, fixed
//! and used consistently by both `InMemoryIndex::add_reference` and
//! `sketch` so the two sides agree.

use std::collections::HashMap;

use crate::config::SketchParams;
use crate::index::Index;
use crate::types::Anchor;

/// One sketch: a hash key and the local (chunk-relative) event position
/// it was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Seed {
    pub hash: u64,
    pub local_position: u32,
}

/// Quantize a raw event value to a `q`-bit code, keeping only the
/// `lq` least-significant bits of precision within that range (coarser
/// `lq` means more event values collide onto the same code, which is
/// the intended tradeoff between seed sensitivity and specificity).
fn quantize(value: f32, q: u32, lq: u32) -> u32 {
    debug_assert!(lq <= q);
    // Map the expected event-value range onto [0, 2^q) via a fixed
    // affine scale, then drop precision below `lq`.
    const SCALE: f32 = 8.0;
    const OFFSET: f32 = 4.0;
    let normalized = ((value + OFFSET) / (2.0 * OFFSET)).clamp(0.0, 1.0);
    let max_code = (1u32 << q) - 1;
    let code = (normalized * max_code as f32).round() as u32;
    let drop = q.saturating_sub(lq);
    (code >> drop) << drop
}

/// Roll `e` consecutive quantized codes into one 64-bit hash via a
/// polynomial rolling hash (same shape as minimizer k-mer hashing).
fn roll_hash(codes: &[u32]) -> u64 {
    const MULT: u64 = 0x9E3779B97F4A7C15;
    let mut h: u64 = 0;
    for &c in codes {
        h = h.wrapping_mul(MULT).wrapping_add(c as u64);
    }
    // Final mix (splitmix64 finalizer) so adjacent codes don't produce
    // adjacent hashes.
    h ^= h >> 33;
    h = h.wrapping_mul(0xff51afd7ed558ccd);
    h ^= h >> 33;
    h
}

/// Produce seeds for an event vector. `events` is the chunk (or whole
/// reference) being sketched; `params.e` consecutive quantized events
/// form one seed, stepping by one event at a time, except when
/// `params.w > 0`, in which case only the minimum-hash seed within each
/// sliding window of `w` consecutive candidate seeds is kept
/// (minimizer selection).
pub fn sketch(events: &[f32], params: SketchParams) -> Vec<Seed> {
    let e = params.e.max(1) as usize;
    if events.len() < e {
        return Vec::new();
    }

    let codes: Vec<u32> = events
        .iter()
        .map(|&v| quantize(v, params.q, params.lq))
        .collect();

    let mut candidates: Vec<Seed> = Vec::with_capacity(codes.len().saturating_sub(e) + 1);
    for start in 0..=(codes.len() - e) {
        candidates.push(Seed {
            hash: roll_hash(&codes[start..start + e]),
            local_position: start as u32,
        });
    }

    let w = params.w as usize;
    if w <= 1 {
        return candidates;
    }

    let mut seeds = Vec::new();
    let mut last_min_pos: Option<u32> = None;
    for window in candidates.windows(w) {
        let min = window.iter().min_by_key(|s| (s.hash, s.local_position)).unwrap();
        if last_min_pos != Some(min.local_position) {
            seeds.push(*min);
            last_min_pos = Some(min.local_position);
        }
    }
    seeds
}

/// Anchors bucketed by `(strand, reference_id)`, sorted per spec.md
/// §4.2: `(target_position, query_position)` ascending, with
/// previous-round anchors folded in before sorting.
pub type AnchorBuckets = HashMap<(u8, u32), Vec<Anchor>>;

/// Seed `events` (interpreted as starting at query coordinate
/// `chunk_start`), query `index` for hits, and bucket the resulting
/// anchors by `(strand, reference_id)`. `carry_over` supplies anchors
/// surviving from the previous chunk's chains, which are prepended
/// before the final sort so they participate as ordinary anchors.
pub fn seed_chunk(
    events: &[f32],
    chunk_start: u32,
    params: SketchParams,
    index: &dyn Index,
    carry_over: &AnchorBuckets,
) -> AnchorBuckets {
    let mut buckets: AnchorBuckets = carry_over.clone();

    for seed in sketch(events, params) {
        for &value in index.lookup(seed.hash) {
            let (reference_id, strand, target_position) = crate::index::unpack_value(value);
            buckets.entry((strand, reference_id)).or_default().push(Anchor {
                query_position: chunk_start + seed.local_position,
                target_position,
            });
        }
    }

    for anchors in buckets.values_mut() {
        anchors.sort_unstable_by_key(|a| (a.target_position, a.query_position));
    }

    buckets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sketch_without_minimizer_emits_one_per_window() {
        let events = vec![0.0_f32, 1.0, 2.0, 3.0, 4.0, 5.0];
        let params = SketchParams {
            w: 0,
            e: 3,
            n: 0,
            q: 9,
            lq: 3,
            k: 6,
        };
        let seeds = sketch(&events, params);
        assert_eq!(seeds.len(), events.len() - 3 + 1);
        assert_eq!(seeds[0].local_position, 0);
    }

    #[test]
    fn sketch_with_minimizer_deduplicates_adjacent_minima() {
        let events = vec![0.0_f32; 20];
        let params = SketchParams {
            w: 4,
            e: 3,
            n: 0,
            q: 9,
            lq: 3,
            k: 6,
        };
        let seeds = sketch(&events, params);
        // Flat input: every window's minimum is the same hash at
        // position 0, so minimizer selection collapses it to one seed.
        assert_eq!(seeds.len(), 1);
    }

    #[test]
    fn quantize_is_monotonic_in_buckets() {
        let a = quantize(-4.0, 9, 3);
        let b = quantize(4.0, 9, 3);
        assert!(a < b);
    }

    #[test]
    fn seed_chunk_emits_anchor_for_exact_match() {
        let mut index = crate::index::InMemoryIndex::new();
        let reference = vec![0.0_f32, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        let params = SketchParams {
            w: 0,
            e: 3,
            n: 0,
            q: 9,
            lq: 3,
            k: 6,
        };
        index.add_reference("ref0", reference.clone(), reference.iter().rev().cloned().collect(), params);

        let buckets = seed_chunk(&reference, 0, params, &index, &AnchorBuckets::new());
        let forward = buckets.get(&(0u8, 0u32)).expect("forward bucket present");
        assert!(!forward.is_empty());
        // Sorted by (target_position, query_position).
        assert!(forward.windows(2).all(|w| (w[0].target_position, w[0].query_position) <= (w[1].target_position, w[1].query_position)));
    }
}
