//! The Chain Evaluator (C4, spec.md §4.4): DTW rescoring, early exit,
//! primary-chain selection, and MAPQ.
//!
//! Grounded on `rmap.cpp`'s chain-evaluation loop and `check_dtw.cpp`'s
//! band-radius helper; the DTW kernels themselves live in [`crate::dtw`].

use crate::config::{DtwBorderConstraint, DtwFillMethod, MapFlags, MapOpt};
use crate::dtw::{dtw_global, dtw_global_slantedbanded_antidiag, dtw_global_tb};
use crate::types::Chain;

fn band_radius(segment_query_length: u32, band_radius_frac: f32) -> u32 {
    ((segment_query_length as f32 * band_radius_frac).round() as u32).max(1)
}

/// Run one DTW segment with the variant `fill_method` selects.
fn dtw_segment(query: &[f32], target: &[f32], band_radius_frac: f32, exclude_last: bool) -> f32 {
    let radius = band_radius(query.len() as u32, band_radius_frac);
    dtw_global_slantedbanded_antidiag(query, target, radius, exclude_last)
}

fn dtw_segment_full(query: &[f32], target: &[f32], exclude_last: bool) -> f32 {
    dtw_global(query, target, exclude_last)
}

/// Compute `alignment_score` for one chain against its reference signal,
/// following the border-constraint policy in `opt`.
fn align_chain(chain: &Chain, query_events: &[f32], target_events: &[f32], opt: &MapOpt) -> f32 {
    let start = chain.anchors.start();
    let end = chain.anchors.end();

    let use_banded = matches!(opt.dtw_fill_method, DtwFillMethod::Banded);
    let cost = match opt.dtw_border_constraint {
        DtwBorderConstraint::Global | DtwBorderConstraint::Local => {
            let q = &query_events[start.query_position as usize..=end.query_position as usize];
            let t = &target_events[start.target_position as usize..=end.target_position as usize];
            if use_banded {
                dtw_segment(q, t, opt.dtw_band_radius_frac, false)
            } else {
                dtw_segment_full(q, t, false)
            }
        }
        DtwBorderConstraint::Sparse => {
            // Walk consecutive anchor pairs in left-to-right (target
            // ascending) order; exclude_last on every segment but the
            // final one so shared anchor cells aren't double-counted.
            let pairs: Vec<_> = chain.anchors.iter_left_to_right().collect();
            let mut total = 0.0f32;
            for (idx, w) in pairs.windows(2).enumerate() {
                let (a, b) = (w[0], w[1]);
                let q = &query_events[a.query_position as usize..=b.query_position as usize];
                let t = &target_events[a.target_position as usize..=b.target_position as usize];
                let exclude_last = idx + 2 < pairs.len();
                total += if use_banded {
                    dtw_segment(q, t, opt.dtw_band_radius_frac, exclude_last)
                } else {
                    dtw_segment_full(q, t, exclude_last)
                };
            }
            total
        }
    };

    let aligned_event_count = (end.query_position - start.query_position + 1) as f32;
    aligned_event_count * opt.dtw_match_bonus - cost
}

/// Rescore, filter, and rank chains for one read against its mapped
/// reference's expected event vector. Returns the surviving chains,
/// sorted descending by the score the `evaluate_chains` flag selects,
/// already reduced to primaries with MAPQ assigned.
pub fn evaluate_chains(mut chains: Vec<Chain>, query_events: &[f32], target_events: &[f32], opt: &MapOpt) -> Vec<Chain> {
    if chains.is_empty() {
        return chains;
    }

    let evaluate = opt.flag.contains(MapFlags::DTW_EVALUATE_CHAINS);
    if evaluate {
        chains.sort_unstable_by(|a, b| b.chaining_score.partial_cmp(&a.chaining_score).unwrap());

        let total_query_length = query_events.len() as u32;
        let mut best_found_alignment = f32::MIN;

        for chain in &mut chains {
            let remaining_query_length = total_query_length.saturating_sub(chain.anchors.start().query_position);
            let max_attainable = remaining_query_length as f32 * opt.dtw_match_bonus;
            if best_found_alignment > max_attainable {
                chain.alignment_score = f32::NEG_INFINITY;
                continue;
            }
            chain.alignment_score = align_chain(chain, query_events, target_events, opt);
            if chain.alignment_score > best_found_alignment {
                best_found_alignment = chain.alignment_score;
            }

            if opt.flag.contains(MapFlags::DTW_OUTPUT_CIGAR) {
                let start = chain.anchors.start();
                let end = chain.anchors.end();
                let q = &query_events[start.query_position as usize..=end.query_position as usize];
                let t = &target_events[start.target_position as usize..=end.target_position as usize];
                chain.dtw_result = Some(dtw_global_tb(q, t, false));
            }
        }

        chains.retain(|c| c.alignment_score >= opt.dtw_min_score);
    }

    let use_alignment = evaluate;
    chains.sort_unstable_by(|a, b| b.score(use_alignment).partial_cmp(&a.score(use_alignment)).unwrap());

    select_primaries(chains, use_alignment)
}

/// spec.md §4.4 primary selection: first chain is primary; a later chain
/// is dropped if its score is below `best/3` or its `[start, end]`
/// interval overlaps an already-chosen primary's on the same reference.
fn select_primaries(chains: Vec<Chain>, use_alignment: bool) -> Vec<Chain> {
    if chains.is_empty() {
        return chains;
    }
    let best = chains[0].score(use_alignment);
    let mut primaries: Vec<Chain> = Vec::new();

    for chain in chains {
        if chain.score(use_alignment) < best / 3.0 {
            continue;
        }
        let overlaps = primaries.iter().any(|p| {
            p.reference_sequence_index == chain.reference_sequence_index
                && chain.start_position <= p.end_position
                && p.start_position <= chain.end_position
        });
        if overlaps {
            continue;
        }
        primaries.push(chain);
    }

    assign_mapq(&mut primaries, use_alignment);
    primaries
}

/// spec.md §4.4: single primary -> 60; else `clamp(0, 60, round(40 *
/// (1 - second/best)))`.
fn assign_mapq(primaries: &mut [Chain], use_alignment: bool) {
    if primaries.is_empty() {
        return;
    }
    if primaries.len() == 1 {
        primaries[0].mapq = 60;
        return;
    }
    let best = primaries[0].score(use_alignment);
    let second = primaries[1].score(use_alignment);
    let ratio = if best > 0.0 { second / best } else { 1.0 };
    let mapq = (40.0 * (1.0 - ratio)).round().clamp(0.0, 60.0) as u8;
    primaries[0].mapq = mapq;
    for p in primaries.iter_mut().skip(1) {
        p.mapq = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Anchor, Chain};

    fn opt_with_eval() -> MapOpt {
        let mut opt = MapOpt::default();
        opt.flag |= MapFlags::DTW_EVALUATE_CHAINS;
        opt
    }

    fn diag_chain(score: f32, n: usize) -> Chain {
        let anchors: Vec<Anchor> = (0..n)
            .rev()
            .map(|i| Anchor {
                query_position: (i * 3) as u32,
                target_position: (i * 3) as u32,
            })
            .collect();
        Chain::new(score, 0, 0, anchors)
    }

    #[test]
    fn single_chain_gets_mapq_60() {
        let chains = vec![diag_chain(30.0, 5)];
        let query: Vec<f32> = (0..20).map(|i| i as f32).collect();
        let target = query.clone();
        let out = evaluate_chains(chains, &query, &target, &MapOpt::default());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].mapq, 60);
    }

    #[test]
    fn overlapping_chains_collapse_to_one_primary() {
        let a = diag_chain(30.0, 5);
        let b = diag_chain(20.0, 4);
        let query: Vec<f32> = (0..20).map(|i| i as f32).collect();
        let target = query.clone();
        let out = evaluate_chains(vec![a, b], &query, &target, &MapOpt::default());
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn low_score_chain_dropped_below_best_third() {
        let a = diag_chain(30.0, 5);
        let mut b = diag_chain(5.0, 3);
        b.reference_sequence_index = 1;
        b.start_position = 1000;
        b.end_position = 1006;
        let query: Vec<f32> = (0..20).map(|i| i as f32).collect();
        let target = query.clone();
        let out = evaluate_chains(vec![a, b], &query, &target, &MapOpt::default());
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn dtw_evaluation_path_runs_without_panicking() {
        let chain = diag_chain(15.0, 3);
        let query: Vec<f32> = (0..9).map(|i| i as f32).collect();
        let target = query.clone();
        let out = evaluate_chains(vec![chain], &query, &target, &opt_with_eval());
        assert!(out.len() <= 1);
    }
}
