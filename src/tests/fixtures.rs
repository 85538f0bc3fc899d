//! Byte-level fMP4 fixtures shared by the end-to-end tests.

use bytes::Bytes;

fn box_header(tag: &[u8; 4], total_len: u32) -> Vec<u8> {
    let mut out = total_len.to_be_bytes().to_vec();
    out.extend_from_slice(tag);
    out
}

pub fn ftyp_box() -> Vec<u8> {
    let mut out = box_header(b"ftyp", 24);
    out.resize(24, 0);
    out
}

/// A `moov` box carrying an `avcC` profile triplet and, optionally, an
/// `mp4a` marker, at the byte offsets [`crate::init::derive_mime`] expects.
pub fn moov_box(profile: [u8; 3], with_audio: bool) -> Vec<u8> {
    let mut payload = vec![0u8; 8];
    if with_audio {
        payload.extend_from_slice(b"mp4a");
        payload.extend_from_slice(&[0u8; 4]);
    }
    payload.extend_from_slice(b"avcC");
    payload.push(0); // configurationVersion filler byte
    payload.extend_from_slice(&profile);

    let total = 8 + payload.len() as u32;
    let mut out = box_header(b"moov", total);
    out.extend_from_slice(&payload);
    out
}

pub fn moof_box(total_len: u32) -> Vec<u8> {
    let mut out = box_header(b"moof", total_len);
    out.resize(total_len as usize, 0);
    out
}

pub fn mdat_box(total_len: u32) -> Vec<u8> {
    let mut out = box_header(b"mdat", total_len);
    out.resize(total_len as usize, 0);
    out
}

pub fn mfra_box(total_len: u32) -> Vec<u8> {
    let mut out = box_header(b"mfra", total_len);
    out.resize(total_len as usize, 0);
    out
}

/// An initialization fragment followed by `segment_count` moof/mdat pairs,
/// each `moof_len`/`mdat_len` bytes.
pub fn stream_with_segments(segment_count: u32, moof_len: u32, mdat_len: u32) -> Bytes {
    let mut out = ftyp_box();
    out.extend_from_slice(&moov_box([0x42, 0xC0, 0x1E], false));
    for _ in 0..segment_count {
        out.extend_from_slice(&moof_box(moof_len));
        out.extend_from_slice(&mdat_box(mdat_len));
    }
    Bytes::from(out)
}
