//! HLS v7 playlist (m3u8) rendering.
//!
//! Two render modes, both re-derived in full from the HLS entry FIFO rather
//! than patched incrementally: init mode (emitted once, right after the
//! moov is parsed, if `hls_list_init` is set) and live mode (after every
//! segment publish).

use std::fmt::Write as _;

use crate::buffers::HlsEntry;

/// `#EXT-X-MAP` + a zero-entry playlist, used before any segment exists.
pub fn render_init_mode(hls_base: &str) -> String {
    format!(
        "#EXTM3U\n\
         #EXT-X-VERSION:7\n\
         #EXT-X-TARGETDURATION:1\n\
         #EXT-X-MEDIA-SEQUENCE:0\n\
         #EXT-X-MAP:URI=\"init-{hls_base}.mp4\"\n"
    )
}

/// Renders the playlist from the current HLS entry FIFO, oldest entry
/// first. `last_duration_s` is the most recently published segment's
/// duration, rounded to the nearest integer for `#EXT-X-TARGETDURATION`.
pub fn render_live_mode(hls_base: &str, entries: &[HlsEntry], last_duration_s: f64) -> String {
    let media_sequence = entries.first().map(|e| e.sequence).unwrap_or(0);
    let target_duration = last_duration_s.round() as i64;

    let mut out = format!(
        "#EXTM3U\n\
         #EXT-X-VERSION:7\n\
         #EXT-X-TARGETDURATION:{target_duration}\n\
         #EXT-X-MEDIA-SEQUENCE:{media_sequence}\n\
         #EXT-X-MAP:URI=\"init-{hls_base}.mp4\"\n"
    );
    for entry in entries {
        let _ = writeln!(out, "#EXTINF:{}", entry.duration_s);
        let _ = writeln!(out, "{}", entry.name);
    }
    out
}
