//! Bounded rolling FIFOs: HLS playlist entries and raw segment bytes.

use std::collections::VecDeque;

use bytes::Bytes;

/// One entry in the HLS playlist FIFO, carrying the bytes of its segment
/// alongside the metadata (the Python original aliased the `segment` field
/// to the sequence number instead of the actual bytes — spec.md's Open
/// Questions call that a bug; this stores the bytes directly).
#[derive(Debug, Clone)]
pub struct HlsEntry {
    pub sequence: u64,
    pub name: String,
    pub duration_s: f64,
    pub bytes: Bytes,
}

/// The two bounded FIFOs a [`crate::segment::SegmentPublisher`] feeds:
/// HLS entries (capacity `hls_list_size`) and raw segment bytes (capacity
/// `buffer_list_size`). Both evict from the head on overflow.
#[derive(Debug, Default)]
pub struct RollingBuffers {
    hls_entries: VecDeque<HlsEntry>,
    hls_capacity: usize,
    buffer: VecDeque<Bytes>,
    buffer_capacity: usize,
}

impl RollingBuffers {
    pub fn new(hls_capacity: usize, buffer_capacity: usize) -> Self {
        Self {
            hls_entries: VecDeque::new(),
            hls_capacity,
            buffer: VecDeque::new(),
            buffer_capacity,
        }
    }

    pub fn push_hls_entry(&mut self, entry: HlsEntry) {
        self.hls_entries.push_back(entry);
        while self.hls_entries.len() > self.hls_capacity {
            self.hls_entries.pop_front();
        }
    }

    pub fn push_segment_bytes(&mut self, bytes: Bytes) {
        self.buffer.push_back(bytes);
        while self.buffer.len() > self.buffer_capacity {
            self.buffer.pop_front();
        }
    }

    pub fn hls_entries(&self) -> impl DoubleEndedIterator<Item = &HlsEntry> {
        self.hls_entries.iter()
    }

    pub fn hls_entry_by_sequence(&self, sequence: u64) -> Option<&HlsEntry> {
        self.hls_entries.iter().find(|e| e.sequence == sequence)
    }

    pub fn hls_entry_by_name(&self, name: &str) -> Option<&HlsEntry> {
        self.hls_entries.iter().find(|e| e.name == name)
    }

    pub fn buffer_list(&self) -> Vec<Bytes> {
        self.buffer.iter().cloned().collect()
    }

    pub fn buffer_concat(&self) -> Bytes {
        let parts: Vec<Bytes> = self.buffer.iter().cloned().collect();
        crate::accumulator::concat_bytes(&parts)
    }

    pub fn is_buffer_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
