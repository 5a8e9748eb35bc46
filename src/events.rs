//! The `EventDetector` collaborator (spec.md §1, §6): converting raw
//! current samples into events is out of scope for real replication
//! (the production algorithm is a segmentation/peak-detection pass
//! tuned against real device noise characteristics). This module
//! defines the trait the read pipeline depends on plus a minimal
//! default implementation grounded on the two-window threshold
//! parameters `roptions.h` carries (`window_length1/2`,
//! `threshold1/2`, `peak_height`), good enough to drive tests and the
//! CLI's demo path end to end.

use crate::config::MapOpt;

/// Converts a chunk of raw samples into events (summary values —
/// typically per-segment means — one per detected state transition).
pub trait EventDetector: Send + Sync {
    fn detect(&self, samples: &[f32], opt: &MapOpt) -> Vec<f32>;
}

/// Two-window running-mean difference detector: flags a new event
/// boundary wherever the short-window mean diverges from the
/// long-window mean by more than a threshold, analogous to the
/// two-threshold peak detector `roptions.h`'s fields describe.
pub struct ThresholdEventDetector;

impl EventDetector for ThresholdEventDetector {
    fn detect(&self, samples: &[f32], opt: &MapOpt) -> Vec<f32> {
        let w1 = opt.window_length1.max(1) as usize;
        let w2 = opt.window_length2.max(1) as usize;
        if samples.len() < w1 + w2 {
            return if samples.is_empty() {
                Vec::new()
            } else {
                vec![mean(samples)]
            };
        }

        let mut events = Vec::new();
        let mut segment_start = 0usize;
        let mut i = w2;
        while i + w1 <= samples.len() {
            let short = mean(&samples[i..i + w1]);
            let long = mean(&samples[i - w2..i]);
            let diff = (short - long).abs();
            if diff > opt.threshold1 || (diff > opt.threshold2 && short.abs() > opt.peak_height) {
                events.push(mean(&samples[segment_start..i]));
                segment_start = i;
            }
            i += 1;
        }
        if segment_start < samples.len() {
            events.push(mean(&samples[segment_start..]));
        }
        events
    }
}

fn mean(xs: &[f32]) -> f32 {
    xs.iter().sum::<f32>() / xs.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_signal_collapses_to_one_event() {
        let samples = vec![1.0_f32; 50];
        let detector = ThresholdEventDetector;
        let events = detector.detect(&samples, &MapOpt::default());
        assert_eq!(events.len(), 1);
        assert!((events[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn empty_input_yields_no_events() {
        let detector = ThresholdEventDetector;
        assert!(detector.detect(&[], &MapOpt::default()).is_empty());
    }

    #[test]
    fn short_input_yields_single_mean_event() {
        let samples = vec![1.0, 2.0, 3.0];
        let detector = ThresholdEventDetector;
        let events = detector.detect(&samples, &MapOpt::default());
        assert_eq!(events.len(), 1);
    }
}
