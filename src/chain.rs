//! The Chainer (C3, spec.md §4.3): dynamic-program colinear chaining
//! over a sorted anchor list, with traceback into up to `num_best_chains`
//! `Chain`s per `(strand, reference_id)` bucket.
//!
//! Grounded on `rmap.cpp`'s chaining loop (predecessor sliding window,
//! skip counter, gap/scale admissibility) and the collision-truncation
//! behavior spec.md §9 REDESIGN FLAGS calls out as worth double-checking.

use crate::config::MapFlags;
use crate::config::MapOpt;
use crate::types::{Anchor, Chain};

/// Per-anchor DP bookkeeping, discarded once traceback has run.
#[derive(Debug, Clone, Copy)]
struct DpCell {
    score: f32,
    pred: usize,
}

fn match_bonus(a: Anchor, b: Anchor, e: u32) -> f32 {
    let dt = a.target_position.saturating_sub(b.target_position);
    let dq = a.query_position.saturating_sub(b.query_position);
    dt.min(dq).min(e) as f32
}

/// Is anchor `j` (predecessor candidate, earlier in the sorted list)
/// admissible as a predecessor of anchor `i`?
fn admissible(anchors: &[Anchor], i: usize, j: usize, opt: &MapOpt) -> bool {
    let a = anchors[i];
    let b = anchors[j];
    if a.target_position <= b.target_position || a.query_position < b.query_position {
        return false;
    }
    let gap_t = a.target_position - b.target_position;
    let gap_q = a.query_position - b.query_position;
    if gap_t > opt.max_target_gap_length {
        return false;
    }
    let gap = gap_t.abs_diff(gap_q);
    if gap >= opt.max_gap_length {
        return false;
    }
    if gap_q > 0 {
        let scale = gap_t as f32 / gap_q as f32;
        if !(scale > 0.75 && scale < 5.0) {
            return false;
        }
    }
    true
}

/// Run the chaining DP over a sorted anchor list and return up to
/// `opt.num_best_chains` chains, each with `n_anchors >=
/// opt.min_num_anchors`.
pub fn chain_anchors(anchors: &[Anchor], reference_sequence_index: u32, strand: u8, opt: &MapOpt) -> Vec<Chain> {
    let n = anchors.len();
    if n == 0 {
        return Vec::new();
    }

    let e = opt.sketch.e;
    let mut dp: Vec<DpCell> = (0..n).map(|i| DpCell { score: e as f32, pred: i }).collect();

    for i in 0..n {
        // Predecessor sliding window: only look back `chaining_band_length`
        // anchors, matching rmap.cpp's bounded inner loop.
        let window_start = i.saturating_sub(opt.chaining_band_length as usize);
        let mut skips = 0i64;
        for j in (window_start..i).rev() {
            if !admissible(anchors, i, j, opt) {
                continue;
            }
            let candidate = dp[j].score + match_bonus(anchors[i], anchors[j], e);
            if candidate > dp[i].score {
                dp[i].score = candidate;
                dp[i].pred = j;
                skips -= 1;
            } else {
                skips += 1;
                if skips > opt.max_num_skips as i64 {
                    break;
                }
            }
        }
    }

    let best = dp.iter().map(|c| c.score).fold(f32::MIN, f32::max);
    let score_floor = if opt.flag.contains(MapFlags::DISABLE_CHAININGSCORE_FILTERING) {
        f32::MIN
    } else {
        opt.min_chaining_score.max(best / 2.0)
    };

    // Candidate end-anchors sorted by (score desc, anchor_index desc).
    let mut candidates: Vec<usize> = (0..n).filter(|&i| dp[i].score >= score_floor).collect();
    candidates.sort_unstable_by(|&a, &b| dp[b].score.partial_cmp(&dp[a].score).unwrap().then(b.cmp(&a)));

    let mut used = vec![false; n];
    let mut chains = Vec::new();

    for end in candidates {
        if used[end] {
            continue;
        }
        if chains.len() >= opt.num_best_chains as usize {
            break;
        }
        if dp[end].score < score_floor {
            break;
        }

        let mut path = Vec::new();
        let mut cur = end;
        let mut collided_score = 0.0f32;
        loop {
            if used[cur] {
                // Traceback hit an already-used anchor: truncate here and
                // subtract its score so it isn't double-counted.
                collided_score = dp[cur].score;
                break;
            }
            used[cur] = true;
            path.push(anchors[cur]);
            let pred = dp[cur].pred;
            if pred == cur {
                break;
            }
            cur = pred;
        }

        let n_anchors = path.len() as u32;
        if n_anchors < opt.min_num_anchors {
            continue;
        }

        let chain_score = dp[end].score - collided_score;
        chains.push(Chain::new(chain_score, reference_sequence_index, strand, path));
    }

    chains
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opt() -> MapOpt {
        MapOpt::default()
    }

    #[test]
    fn chains_a_perfect_diagonal() {
        let anchors: Vec<Anchor> = (0..10)
            .map(|i| Anchor {
                query_position: i * 10,
                target_position: i * 10,
            })
            .collect();
        let chains = chain_anchors(&anchors, 0, 0, &opt());
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].n_anchors, 10);
        // Right-to-left: anchors[0] is the END (highest target position).
        assert_eq!(chains[0].anchors.end().target_position, 90);
        assert_eq!(chains[0].anchors.start().target_position, 0);
    }

    #[test]
    fn empty_input_yields_no_chains() {
        assert!(chain_anchors(&[], 0, 0, &opt()).is_empty());
    }

    #[test]
    fn chain_monotonicity_left_to_right() {
        let anchors: Vec<Anchor> = (0..6)
            .map(|i| Anchor {
                query_position: i * 5,
                target_position: i * 7,
            })
            .collect();
        let mut opt = opt();
        opt.min_num_anchors = 2;
        let chains = chain_anchors(&anchors, 0, 0, &opt);
        for chain in &chains {
            let targets: Vec<u32> = chain.anchors.iter_left_to_right().map(|a| a.target_position).collect();
            assert!(targets.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn two_disjoint_diagonals_yield_two_chains() {
        let mut anchors: Vec<Anchor> = (0..5)
            .map(|i| Anchor {
                query_position: i * 10,
                target_position: i * 10,
            })
            .collect();
        anchors.extend((0..5).map(|i| Anchor {
            query_position: 1000 + i * 10,
            target_position: 5000 + i * 10,
        }));
        anchors.sort_unstable_by_key(|a| (a.target_position, a.query_position));

        let mut opt = opt();
        opt.num_best_chains = 5;
        let chains = chain_anchors(&anchors, 0, 0, &opt);
        assert_eq!(chains.len(), 2);
    }
}
