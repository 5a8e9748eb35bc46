//! The `Index` collaborator (spec.md §6).
//!
//! Building the real hash-indexed seed table over a reference genome is
//! out of scope (spec.md §1); this module defines the trait the mapping
//! pipeline depends on, the packed-value bit layout it must agree with,
//! and a minimal in-memory implementation used by integration tests and
//! the CLI's benchmark/self-test paths. Grounded on `rawindex.h`'s
//! `ri_idx_get`/`ri_idx_t` shapes.

use std::collections::HashMap;

/// `target_position` occupies bits `[1, 31]`; `strand` is the LSB;
/// `reference_id` occupies the bits above that. Matches spec.md §6:
/// "reference_id in high bits, target_position in middle bits (masked by
/// (1<<31)-1), strand in LSB".
const POS_SHIFT: u32 = 1;
const ID_SHIFT: u32 = 32;
const POS_MASK: u64 = (1u64 << 31) - 1;

/// Pack `(reference_id, strand, target_position)` into the 64-bit value
/// the index stores per seed hit.
pub fn pack_value(reference_id: u32, strand: u8, target_position: u32) -> u64 {
    debug_assert!(strand == 0 || strand == 1);
    ((reference_id as u64) << ID_SHIFT) | (((target_position as u64) & POS_MASK) << POS_SHIFT) | strand as u64
}

/// Inverse of [`pack_value`].
pub fn unpack_value(v: u64) -> (u32, u8, u32) {
    let reference_id = (v >> ID_SHIFT) as u32;
    let target_position = ((v >> POS_SHIFT) & POS_MASK) as u32;
    let strand = (v & 1) as u8;
    (reference_id, strand, target_position)
}

/// Reference sequence metadata, as `ri_idx_seq_t` in `rawindex.h`.
#[derive(Debug, Clone)]
pub struct SeqInfo {
    pub name: String,
    pub len: u32,
}

/// Read-only interface to the pre-built hash-indexed seed table and the
/// reference event vectors used by DTW rescoring.
pub trait Index: Send + Sync {
    /// All packed `(reference_id, strand, target_position)` values
    /// sharing the given hash.
    fn lookup(&self, hash: u64) -> &[u64];

    fn n_seq(&self) -> usize;
    fn seq(&self, i: usize) -> &SeqInfo;

    fn forward_signals(&self, i: usize) -> &[f32];
    fn reverse_signals(&self, i: usize) -> &[f32];
}

/// A simple, fully in-memory `Index`, built directly from reference
/// event vectors by re-running the same sketching scheme the seeder
/// uses at query time. Not the real index-build pipeline (out of
/// scope), but bit-layout- and interface-compatible with it, which is
/// what lets integration tests (spec.md §8 S5/S6) exercise the full
/// pipeline end to end.
pub struct InMemoryIndex {
    table: HashMap<u64, Vec<u64>>,
    seqs: Vec<SeqInfo>,
    forward: Vec<Vec<f32>>,
    reverse: Vec<Vec<f32>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        InMemoryIndex {
            table: HashMap::new(),
            seqs: Vec::new(),
            forward: Vec::new(),
            reverse: Vec::new(),
        }
    }

    /// Add a reference sequence's expected event vector (forward strand)
    /// and its reverse-complement equivalent, sketching both with
    /// `params` to populate the hash table.
    pub fn add_reference(
        &mut self,
        name: impl Into<String>,
        forward_events: Vec<f32>,
        reverse_events: Vec<f32>,
        params: crate::config::SketchParams,
    ) {
        let reference_id = self.seqs.len() as u32;
        self.seqs.push(SeqInfo {
            name: name.into(),
            len: forward_events.len() as u32,
        });

        for (strand, events) in [(0u8, &forward_events), (1u8, &reverse_events)] {
            let seeds = crate::seed::sketch(events, params);
            for s in seeds {
                let v = pack_value(reference_id, strand, s.local_position);
                self.table.entry(s.hash).or_default().push(v);
            }
        }

        self.forward.push(forward_events);
        self.reverse.push(reverse_events);
    }
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl Index for InMemoryIndex {
    fn lookup(&self, hash: u64) -> &[u64] {
        self.table.get(&hash).map(|v| v.as_slice()).unwrap_or(&[])
    }

    fn n_seq(&self) -> usize {
        self.seqs.len()
    }

    fn seq(&self, i: usize) -> &SeqInfo {
        &self.seqs[i]
    }

    fn forward_signals(&self, i: usize) -> &[f32] {
        &self.forward[i]
    }

    fn reverse_signals(&self, i: usize) -> &[f32] {
        &self.reverse[i]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_unpack_roundtrip() {
        for &(rid, strand, pos) in &[(0u32, 0u8, 0u32), (5, 1, 123456), (u16::MAX as u32, 0, (1 << 31) - 1)] {
            let packed = pack_value(rid, strand, pos);
            assert_eq!(unpack_value(packed), (rid, strand, pos));
        }
    }
}
