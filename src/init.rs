//! Initialization-fragment assembly and codec MIME synthesis.

use bytes::Bytes;

use crate::box_scanner::{find_tag, AVCC, MP4A};

/// Derives the codec MIME string from the concatenated `ftyp`+`moov` bytes.
///
/// The AVC profile/compatibility/level triplet is the 3 bytes starting 5
/// bytes after the first `avcC` tag match. Returns `None` if `avcC` is
/// absent (the init fragment is malformed per spec); the caller is
/// responsible for logging that case.
pub fn derive_mime(init: &[u8]) -> Option<String> {
    let avcc_idx = find_tag(AVCC, init)?;
    let hex_start = avcc_idx + 5;
    let hex_bytes = init.get(hex_start..hex_start + 3)?;
    let hex = hex_bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<String>();

    let mut mime = format!("video/mp4; codecs='avc1.{hex}");
    if find_tag(MP4A, init).is_some() {
        mime.push_str(", mp4a.40.2");
    }
    mime.push('\'');
    Some(mime)
}

/// Builds the initialization fragment from the saved `ftyp` and `moov`
/// bytes, returning the concatenated bytes alongside the derived MIME (if
/// any).
pub fn build_initialization(ftyp: Bytes, moov: Bytes) -> (Bytes, Option<String>) {
    let init = crate::accumulator::concat_bytes(&[ftyp, moov]);
    let mime = derive_mime(&init);
    (init, mime)
}
