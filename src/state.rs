//! The mutex-guarded published state a [`crate::Fmp4Stream`] hands out
//! read-only snapshots of.
//!
//! Per spec §5, the FIFOs and the latest-segment slot are guarded by a
//! single lock; the worker (driver task) holds it only across the brief
//! update at segment publication. Every accessor on [`crate::Fmp4Stream`]
//! takes the same lock for the length of one read.

use bytes::Bytes;

use crate::buffers::{HlsEntry, RollingBuffers};
use crate::config::Configuration;
use crate::playlist;
use crate::segment::MediaSegment;

pub struct PublishedState {
    hls_base: Option<String>,
    hls_list_init: bool,
    initialization: Option<(Bytes, Option<String>)>,
    latest_segment: Option<MediaSegment>,
    playlist: Option<String>,
    buffers: RollingBuffers,
}

impl PublishedState {
    pub fn new(config: &Configuration) -> Self {
        Self {
            hls_base: config.hls_base.clone(),
            hls_list_init: config.hls_list_init,
            initialization: None,
            latest_segment: None,
            playlist: None,
            buffers: RollingBuffers::new(config.hls_list_size(), config.buffer_list_size()),
        }
    }

    fn hls_enabled(&self) -> bool {
        self.hls_base.is_some()
    }

    /// Records the initialization fragment and, if configured, renders the
    /// init-mode playlist immediately.
    pub fn set_initialization(&mut self, init: Bytes, mime: Option<String>) {
        self.initialization = Some((init, mime));
        if self.hls_enabled() && self.hls_list_init {
            if let Some(hls_base) = &self.hls_base {
                self.playlist = Some(playlist::render_init_mode(hls_base));
            }
        }
    }

    /// Appends the segment to both FIFOs, regenerates the playlist if HLS
    /// is enabled, and keeps it as the latest segment.
    pub fn publish_segment(&mut self, segment: MediaSegment) {
        if let (Some(hls_base), Some(sequence)) = (&self.hls_base, segment.sequence) {
            self.buffers.push_hls_entry(HlsEntry {
                sequence,
                name: format!("{hls_base}{sequence}"),
                duration_s: segment.duration_s,
                bytes: segment.bytes.clone(),
            });
        }
        self.buffers.push_segment_bytes(segment.bytes.clone());

        if self.hls_enabled() {
            if let Some(hls_base) = self.hls_base.clone() {
                let entries: Vec<HlsEntry> = self.buffers.hls_entries().cloned().collect();
                self.playlist = Some(playlist::render_live_mode(
                    &hls_base,
                    &entries,
                    segment.duration_s,
                ));
            }
        }

        self.latest_segment = Some(segment);
    }

    pub fn initialization(&self) -> Option<Bytes> {
        self.initialization.as_ref().map(|(bytes, _)| bytes.clone())
    }

    pub fn mime(&self) -> Option<String> {
        self.initialization
            .as_ref()
            .and_then(|(_, mime)| mime.clone())
    }

    pub fn segment(&self) -> Option<Bytes> {
        self.latest_segment.as_ref().map(|s| s.bytes.clone())
    }

    pub fn timestamp_ms(&self) -> i64 {
        self.latest_segment.as_ref().map(|s| s.timestamp_ms).unwrap_or(-1)
    }

    pub fn duration_s(&self) -> f64 {
        self.latest_segment.as_ref().map(|s| s.duration_s).unwrap_or(-1.0)
    }

    pub fn m3u8(&self) -> Option<String> {
        self.playlist.clone()
    }

    pub fn sequence(&self) -> i64 {
        self.latest_segment
            .as_ref()
            .and_then(|s| s.sequence)
            .map(|s| s as i64)
            .unwrap_or(-1)
    }

    pub fn buffer_list(&self) -> Option<Vec<Bytes>> {
        if self.buffers.is_buffer_empty() {
            None
        } else {
            Some(self.buffers.buffer_list())
        }
    }

    pub fn buffer_list_concat(&self) -> Option<Bytes> {
        if self.buffers.is_buffer_empty() {
            None
        } else {
            Some(self.buffers.buffer_concat())
        }
    }

    pub fn buffer_concat(&self) -> Option<Bytes> {
        let init = self.initialization()?;
        let mut parts = vec![init];
        parts.extend(self.buffers.buffer_list());
        Some(crate::accumulator::concat_bytes(&parts))
    }

    pub fn get_hls_segment(&self, sequence: u64) -> Option<Bytes> {
        self.buffers
            .hls_entry_by_sequence(sequence)
            .map(|e| e.bytes.clone())
    }

    pub fn get_hls_named_segment(&self, name: &str) -> Option<Bytes> {
        self.buffers.hls_entry_by_name(name).map(|e| e.bytes.clone())
    }
}
