//! The Read Pipeline (C5, spec.md §4.5): per-read chunk loop wiring
//! together `EventDetector` -> `seed` -> `chain` -> `evaluate`, deciding
//! when a read is confidently mapped, and finalizing its
//! `ReadMappingState` for PAF emission.

use crate::config::MapFlags;
use crate::config::MapOpt;
use crate::events::EventDetector;
use crate::index::Index;
use crate::seed::{seed_chunk, AnchorBuckets};
use crate::signal::SignalChunk;
use crate::types::{Chain, ReadMappingState};

/// Accumulated per-read state the chunk loop owns and mutates in place:
/// the event vector (grows monotonically, invariant 4) and carry-over
/// anchors from the previous chunk's surviving chains.
pub struct ReadContext {
    pub events: Vec<f32>,
    pub chunks_seen: u32,
    carry_over: AnchorBuckets,
}

impl ReadContext {
    pub fn new() -> Self {
        ReadContext {
            events: Vec::new(),
            chunks_seen: 0,
            carry_over: AnchorBuckets::new(),
        }
    }
}

impl Default for ReadContext {
    fn default() -> Self {
        Self::new()
    }
}

/// spec.md §4.5 step 5: is this read confidently mapped given its
/// current best chains in one `(strand, reference_id)` bucket?
fn is_mapped_with_high_confidence(chains: &[Chain], opt: &MapOpt) -> bool {
    let use_alignment = opt.flag.contains(MapFlags::DTW_EVALUATE_CHAINS);
    if chains.is_empty() {
        return false;
    }
    if chains.len() == 1 {
        return chains[0].n_anchors >= opt.min_chain_anchor;
    }

    let best = chains[0].score(use_alignment);
    let second = chains[1].score(use_alignment);
    let mean = chains.iter().map(|c| c.score(use_alignment)).sum::<f32>() / chains.len() as f32;

    (second > 0.0 && best / second >= opt.min_bestmap_ratio) || (mean > 0.0 && best >= opt.min_meanmap_ratio * mean)
}

/// Run one read to completion against `index`, feeding it chunks from
/// `chunks` (already split per spec.md chunking, in arrival order).
/// Returns the finalized `ReadMappingState`, mapped or not.
pub fn run_read(
    read_id: u32,
    read_name: String,
    chunks: impl IntoIterator<Item = SignalChunk>,
    index: &dyn Index,
    detector: &dyn EventDetector,
    opt: &MapOpt,
) -> ReadMappingState {
    let started_at = std::time::Instant::now();
    let mut state = ReadMappingState::new(read_id, read_name);
    let mut ctx = ReadContext::new();
    let mut best_chains: Vec<Chain> = Vec::new();

    for chunk in chunks {
        if ctx.chunks_seen >= opt.max_num_chunk {
            break;
        }
        ctx.chunks_seen += 1;

        let new_events = detector.detect(&chunk.samples, opt);
        let chunk_start = ctx.events.len() as u32;
        ctx.events.extend_from_slice(&new_events);
        state.offset = ctx.events.len() as u32;

        if ctx.events.len() < opt.min_events as usize {
            continue;
        }

        let buckets = seed_chunk(&new_events, chunk_start, opt.sketch, index, &ctx.carry_over);

        let mut round_best: Vec<Chain> = Vec::new();
        for (&(strand, reference_id), anchors) in &buckets {
            let chains = crate::chain::chain_anchors(anchors, reference_id, strand, opt);
            let target_events = match strand {
                0 => index.forward_signals(reference_id as usize),
                _ => index.reverse_signals(reference_id as usize),
            };
            let evaluated = crate::evaluate::evaluate_chains(chains, &ctx.events, target_events, opt);
            round_best.extend(evaluated);
        }

        let use_alignment = opt.flag.contains(MapFlags::DTW_EVALUATE_CHAINS);
        round_best.sort_unstable_by(|a, b| b.score(use_alignment).partial_cmp(&a.score(use_alignment)).unwrap());

        ctx.carry_over.clear();
        for chain in &round_best {
            ctx.carry_over
                .entry((chain.strand, chain.reference_sequence_index))
                .or_default()
                .extend(chain.anchors.as_slice_right_to_left().iter().copied());
        }

        best_chains = round_best;

        if is_mapped_with_high_confidence(&best_chains, opt) {
            state.mapped = true;
            break;
        }

        if chunk.is_final {
            break;
        }
    }

    finalize(&mut state, best_chains, &ctx, opt);
    state.mapping_time_ms = started_at.elapsed().as_secs_f32() * 1000.0;
    state
}

/// spec.md §4.5: on termination compute `read_position_scale` and
/// populate the read's finalized fields for PAF emission.
fn finalize(state: &mut ReadMappingState, chains: Vec<Chain>, ctx: &ReadContext, opt: &MapOpt) {
    state.read_length = ctx.events.len() as u32;
    state.chunks_seen = ctx.chunks_seen;

    if chains.is_empty() {
        state.mapped = false;
        state.mapq = 0;
        state.chains = chains;
        return;
    }

    let events = ctx.events.len().max(1) as f32;
    let read_position_scale =
        (ctx.chunks_seen as f32 * opt.chunk_size as f32 / events) / (opt.sample_rate as f32 / opt.bp_per_sec as f32);

    let primary = &chains[0];
    state.mapped = true;
    state.ref_id = primary.reference_sequence_index;
    state.mapq = primary.mapq;
    state.rev = primary.strand == 1;
    state.read_start_position = (primary.anchors.start().query_position as f32 * read_position_scale) as u32;
    state.read_end_position = (primary.anchors.end().query_position as f32 * read_position_scale) as u32;
    state.fragment_start_position = primary.start_position;
    state.fragment_length = primary.end_position.saturating_sub(primary.start_position);
    state.chains = chains;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SketchParams;
    use crate::events::ThresholdEventDetector;
    use crate::index::InMemoryIndex;

    #[test]
    fn read_with_no_seed_hits_is_unmapped() {
        let index = InMemoryIndex::new();
        let opt = MapOpt::default();
        let detector = ThresholdEventDetector;
        let chunk = SignalChunk {
            read_id: 0,
            read_name: "r0".into(),
            samples: vec![0.1; 200],
            is_final: true,
        };
        let state = run_read(0, "r0".into(), vec![chunk], &index, &detector, &opt);
        assert!(!state.mapped);
        assert_eq!(state.mapq, 0);
    }

    #[test]
    fn read_matching_reference_maps_confidently() {
        let mut index = InMemoryIndex::new();
        let params = SketchParams::default();
        let reference: Vec<f32> = (0..300).map(|i| ((i as f32) * 0.1).sin() * 2.0).collect();
        index.add_reference("chr1", reference.clone(), reference.iter().rev().cloned().collect(), params);

        let mut opt = MapOpt::default();
        opt.min_events = 10;
        opt.min_chain_anchor = 2;

        let detector = ThresholdEventDetector;
        // Feed the reference's own values as samples so event detection
        // (mostly) reproduces them and seeding finds exact matches.
        let chunk = SignalChunk {
            read_id: 1,
            read_name: "r1".into(),
            samples: reference.clone(),
            is_final: true,
        };
        let state = run_read(1, "r1".into(), vec![chunk], &index, &detector, &opt);
        assert!(state.mapped || !state.chains.is_empty());
    }
}
