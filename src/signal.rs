//! The `SignalSource` collaborator (spec.md §1, §6): out of scope to
//! implement for real (device/file I/O to an ONT instrument or a
//! fast5/pod5 store), but the read pipeline and orchestrator depend on
//! its shape. This module defines the trait plus a minimal in-memory
//! implementation that replays pre-chunked raw samples, used by tests
//! and the CLI's benchmark/demo paths.

/// One chunk of raw current samples for one read, as delivered by the
/// acquisition device in real time.
#[derive(Debug, Clone)]
pub struct SignalChunk {
    pub read_id: u32,
    pub read_name: String,
    pub samples: Vec<f32>,
    /// True when this is the last chunk the source will ever produce for
    /// this read (end of read, or device disconnect).
    pub is_final: bool,
}

/// Streams signal chunks for a batch of reads. A real implementation
/// would read from a device API or a fast5/pod5 file; out of scope here
/// (spec.md §1).
pub trait SignalSource: Send {
    /// Pull the next available chunk, or `None` once the source is
    /// exhausted (all reads have produced their final chunk).
    fn next_chunk(&mut self) -> Option<SignalChunk>;
}

/// Replays a fixed set of pre-chunked reads, in the order given. Used by
/// integration tests and the CLI's self-test/benchmark modes.
pub struct InMemorySignalSource {
    chunks: std::collections::VecDeque<SignalChunk>,
}

impl InMemorySignalSource {
    /// `reads` is `(read_id, read_name, chunks_of_samples)`; the last
    /// chunk of each read is marked `is_final`. Chunks across different
    /// reads are interleaved round-robin, matching how a real device
    /// delivers chunks from many active pores concurrently.
    pub fn new(reads: Vec<(u32, String, Vec<Vec<f32>>)>) -> Self {
        let mut per_read: Vec<_> = reads
            .into_iter()
            .map(|(id, name, chunks)| (id, name, chunks.into_iter()))
            .collect();

        let mut chunks = std::collections::VecDeque::new();
        loop {
            let mut produced_any = false;
            for (id, name, iter) in per_read.iter_mut() {
                if let Some(samples) = iter.next() {
                    produced_any = true;
                    let is_final = iter.len() == 0;
                    chunks.push_back(SignalChunk {
                        read_id: *id,
                        read_name: name.clone(),
                        samples,
                        is_final,
                    });
                }
            }
            if !produced_any {
                break;
            }
        }

        InMemorySignalSource { chunks }
    }
}

impl SignalSource for InMemorySignalSource {
    fn next_chunk(&mut self) -> Option<SignalChunk> {
        self.chunks.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn final_chunk_is_marked() {
        let mut source = InMemorySignalSource::new(vec![(0, "read0".into(), vec![vec![1.0], vec![2.0]])]);
        let first = source.next_chunk().unwrap();
        assert!(!first.is_final);
        let second = source.next_chunk().unwrap();
        assert!(second.is_final);
        assert!(source.next_chunk().is_none());
    }
}
