//! The Mapping Orchestrator (C6, spec.md §4.6, §5): a four-stage
//! streaming pipeline — read signals, fan out per-read workers, a
//! passthrough hook, and ordered PAF emission — plus the Sequence-Until
//! early-stop controller.
//!
//! Stage-parallelism is bounded at 2 (reader alternates with the worker
//! stage); within the worker stage, reads are dispatched to a rayon
//! thread pool via a work-stealing for-each, matching `rmap.cpp`'s
//! worker-pool dispatch. Grounded on the teacher's (`Himasnhu-AT-rvector`)
//! use of `rayon::par_iter` for its own parallel search path.

use std::collections::VecDeque;

use parking_lot::RwLock;

use crate::config::MapOpt;
use crate::events::EventDetector;
use crate::index::Index;
use crate::signal::{SignalChunk, SignalSource};
use crate::types::ReadMappingState;

/// Ring buffer of the last `tn_samples` per-reference mapped-fragment
/// proportion vectors, used by the Sequence-Until controller to detect
/// abundance-estimate convergence.
struct AbundanceRing {
    capacity: usize,
    samples: VecDeque<Vec<f32>>,
}

impl AbundanceRing {
    fn new(capacity: usize) -> Self {
        AbundanceRing {
            capacity: capacity.max(1),
            samples: VecDeque::new(),
        }
    }

    fn push(&mut self, proportions: Vec<f32>) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(proportions);
    }

    /// Max absolute per-reference deviation from the ring's mean
    /// proportion, across all stored samples — the "outlier" spec.md
    /// §4.6 refers to.
    fn max_outlier(&self) -> f32 {
        if self.samples.len() < 2 {
            return f32::INFINITY;
        }
        let n_refs = self.samples.iter().map(|s| s.len()).max().unwrap_or(0);
        let mut worst = 0.0f32;
        for r in 0..n_refs {
            let values: Vec<f32> = self.samples.iter().map(|s| s.get(r).copied().unwrap_or(0.0)).collect();
            let mean = values.iter().sum::<f32>() / values.len() as f32;
            for v in values {
                worst = worst.max((v - mean).abs());
            }
        }
        worst
    }
}

/// Per-reference mapped-fragment-count tally, used to derive the
/// abundance proportions the Sequence-Until controller tracks.
#[derive(Default)]
struct AbundanceCounter {
    counts: Vec<u64>,
}

impl AbundanceCounter {
    fn record(&mut self, reference_id: u32) {
        let idx = reference_id as usize;
        if idx >= self.counts.len() {
            self.counts.resize(idx + 1, 0);
        }
        self.counts[idx] += 1;
    }

    fn proportions(&self) -> Vec<f32> {
        let total: u64 = self.counts.iter().sum();
        if total == 0 {
            return vec![0.0; self.counts.len()];
        }
        self.counts.iter().map(|&c| c as f32 / total as f32).collect()
    }
}

/// Drives the Sequence-Until stop decision (spec.md §4.6). Not thread
/// safe on its own; the orchestrator serializes access via `RwLock`,
/// matching the "su_stop checked at stage boundaries" ordering
/// guarantee (spec.md §5).
pub struct SequenceUntilController {
    opt_t_threshold: f32,
    ttest_freq: u32,
    tmin_reads: u32,
    counter: AbundanceCounter,
    ring: AbundanceRing,
    mapped_reads_seen: u32,
    /// Once set, no read with batch index >= this is emitted, even if
    /// its mapping already completed (monotonic per spec.md §5).
    trigger_index: Option<u64>,
}

impl SequenceUntilController {
    pub fn new(opt: &MapOpt) -> Self {
        SequenceUntilController {
            opt_t_threshold: opt.t_threshold,
            ttest_freq: opt.ttest_freq.max(1),
            tmin_reads: opt.tmin_reads,
            counter: AbundanceCounter::default(),
            ring: AbundanceRing::new(opt.tn_samples as usize),
            mapped_reads_seen: 0,
            trigger_index: None,
        }
    }

    /// Record one mapped read's reference assignment and, if this is a
    /// test checkpoint, update the ring and possibly raise the stop flag.
    /// `batch_index` is this read's position in submission order.
    pub fn observe_mapped(&mut self, reference_id: u32, batch_index: u64) {
        if self.trigger_index.is_some() {
            return;
        }
        self.counter.record(reference_id);
        self.mapped_reads_seen += 1;

        if self.mapped_reads_seen < self.tmin_reads || self.mapped_reads_seen % self.ttest_freq != 0 {
            return;
        }

        self.ring.push(self.counter.proportions());
        if self.ring.max_outlier() < self.opt_t_threshold {
            // The triggering read itself is still kept; only reads
            // submitted strictly after it are suppressed.
            self.trigger_index = Some(batch_index + 1);
        }
    }

    pub fn should_suppress(&self, batch_index: u64) -> bool {
        matches!(self.trigger_index, Some(t) if batch_index >= t)
    }

    pub fn has_triggered(&self) -> bool {
        self.trigger_index.is_some()
    }
}

/// One unit of pipeline work: all chunks for a single read, known up
/// front (stage 0 must produce a whole batch before stage 1 begins,
/// spec.md §5).
pub struct ReadJob {
    pub read_id: u32,
    pub read_name: String,
    pub batch_index: u64,
    pub chunks: Vec<SignalChunk>,
}

/// Drains `source` into complete per-read jobs (stage 0). A real
/// `SignalSource` interleaves chunks across reads; this groups them back
/// by `read_id` so each job carries one read's full chunk sequence.
fn read_batch(source: &mut dyn SignalSource) -> Vec<ReadJob> {
    use std::collections::HashMap;
    let mut by_read: HashMap<u32, ReadJob> = HashMap::new();
    let mut order: Vec<u32> = Vec::new();

    while let Some(chunk) = source.next_chunk() {
        let read_id = chunk.read_id;
        let entry = by_read.entry(read_id).or_insert_with(|| {
            order.push(read_id);
            ReadJob {
                read_id,
                read_name: chunk.read_name.clone(),
                batch_index: (order.len() - 1) as u64,
                chunks: Vec::new(),
            }
        });
        entry.chunks.push(chunk);
    }

    order.into_iter().map(|id| by_read.remove(&id).unwrap()).collect()
}

/// Run the full orchestrator over one batch drained from `source`:
/// stage 1 (parallel per-read mapping), stage 2 (passthrough — a no-op
/// here; a real deployment could hang demux/telemetry off it), and
/// stage 3 (ordered emission via `on_result`, which receives results
/// strictly in `batch_index` order and already filtered by Sequence-Until).
pub fn run_batch(
    source: &mut dyn SignalSource,
    index: &dyn Index,
    detector: &dyn EventDetector,
    opt: &MapOpt,
    controller: &RwLock<SequenceUntilController>,
    mut on_result: impl FnMut(ReadMappingState),
) {
    let jobs = read_batch(source);

    let sequence_until = opt.flag.contains(crate::config::MapFlags::SEQUENCE_UNTIL);

    let results: Vec<(u64, ReadMappingState)> = rayon_map(&jobs, |job| {
        if sequence_until && controller.read().should_suppress(job.batch_index) {
            return None;
        }
        let state = crate::pipeline::run_read(job.read_id, job.read_name.clone(), job.chunks.clone(), index, detector, opt);
        Some((job.batch_index, state))
    })
    .into_iter()
    .flatten()
    .collect();

    let mut ordered = results;
    ordered.sort_unstable_by_key(|(idx, _)| *idx);

    for (batch_index, state) in ordered {
        if sequence_until {
            let mut guard = controller.write();
            if guard.should_suppress(batch_index) {
                continue;
            }
            if state.mapped {
                guard.observe_mapped(state.ref_id, batch_index);
            }
        }
        on_result(state);
    }
}

/// Work-stealing for-each over `items`, matching the teacher's
/// `rayon`-backed parallel search path (`search_parallel` in
/// `Himasnhu-AT-rvector`'s `lib.rs`).
fn rayon_map<T, R: Send>(items: &[T], f: impl Fn(&T) -> R + Sync) -> Vec<R>
where
    T: Sync,
{
    use rayon::prelude::*;
    items.par_iter().map(|item| f(item)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ThresholdEventDetector;
    use crate::index::InMemoryIndex;
    use crate::signal::InMemorySignalSource;

    #[test]
    fn batch_preserves_submission_order() {
        let index = InMemoryIndex::new();
        let opt = MapOpt::default();
        let detector = ThresholdEventDetector;
        let controller = RwLock::new(SequenceUntilController::new(&opt));

        let mut source = InMemorySignalSource::new(vec![
            (0, "r0".into(), vec![vec![0.1; 60]]),
            (1, "r1".into(), vec![vec![0.2; 60]]),
            (2, "r2".into(), vec![vec![0.3; 60]]),
        ]);

        let mut order = Vec::new();
        run_batch(&mut source, &index, &detector, &opt, &controller, |state| {
            order.push(state.read_id);
        });

        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn sequence_until_trigger_is_monotonic() {
        let opt = MapOpt::default();
        let mut controller = SequenceUntilController::new(&opt);
        controller.trigger_index = Some(5);
        assert!(controller.should_suppress(5));
        assert!(controller.should_suppress(10));
        assert!(!controller.should_suppress(4));
    }

    #[test]
    fn abundance_ring_outlier_shrinks_as_samples_converge() {
        let mut ring = AbundanceRing::new(3);
        ring.push(vec![0.9, 0.1]);
        let first = ring.max_outlier();
        ring.push(vec![0.5, 0.5]);
        ring.push(vec![0.5, 0.5]);
        let converged = ring.max_outlier();
        assert!(converged <= first);
    }
}
