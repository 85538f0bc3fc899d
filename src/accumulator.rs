//! Per-phase byte accumulator for boxes that span multiple input chunks.

use bytes::{Bytes, BytesMut};

/// Holds the bytes seen so far for a box whose declared length exceeded the
/// chunk it first appeared in.
#[derive(Debug)]
pub struct Accumulator {
    parts: Vec<Bytes>,
    accumulated: usize,
    expected: usize,
}

impl Accumulator {
    /// Starts a new accumulator with the first (partial) slice of the box.
    pub fn new(first: Bytes, expected: usize) -> Self {
        let accumulated = first.len();
        Self {
            parts: vec![first],
            accumulated,
            expected,
        }
    }

    /// Appends another slice of the box.
    pub fn push(&mut self, part: Bytes) {
        self.accumulated += part.len();
        self.parts.push(part);
    }

    pub fn accumulated(&self) -> usize {
        self.accumulated
    }

    pub fn expected(&self) -> usize {
        self.expected
    }

    pub fn is_complete(&self) -> bool {
        self.accumulated >= self.expected
    }

    /// Consumes the accumulator once complete, returning the box bytes
    /// sliced to exactly `expected` length and any overflow tail that
    /// belongs to the next box.
    pub fn finish(self) -> (Bytes, Bytes) {
        debug_assert!(self.is_complete());
        let whole = concat_bytes(&self.parts);
        let boxed = whole.slice(0..self.expected);
        let tail = whole.slice(self.expected..);
        (boxed, tail)
    }
}

/// Concatenates a sequence of `Bytes` into one contiguous buffer. A single
/// part is returned as-is (no copy); more than one part is copied into a
/// fresh buffer since `Bytes` cannot represent a join of non-adjacent
/// allocations without one.
pub fn concat_bytes(parts: &[Bytes]) -> Bytes {
    if parts.len() == 1 {
        return parts[0].clone();
    }
    let total: usize = parts.iter().map(|p| p.len()).sum();
    let mut buf = BytesMut::with_capacity(total);
    for part in parts {
        buf.extend_from_slice(part);
    }
    buf.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_push_completes_immediately() {
        let acc = Accumulator::new(Bytes::from_static(b"12345678"), 8);
        assert!(acc.is_complete());
        let (boxed, tail) = acc.finish();
        assert_eq!(&boxed[..], b"12345678");
        assert!(tail.is_empty());
    }

    #[test]
    fn three_way_split_reassembles_in_order() {
        let mut acc = Accumulator::new(Bytes::from_static(b"abc"), 9);
        assert!(!acc.is_complete());
        acc.push(Bytes::from_static(b"def"));
        assert!(!acc.is_complete());
        acc.push(Bytes::from_static(b"ghiXYZ"));
        assert!(acc.is_complete());
        let (boxed, tail) = acc.finish();
        assert_eq!(&boxed[..], b"abcdefghi");
        assert_eq!(&tail[..], b"XYZ");
    }

    #[test]
    fn concat_bytes_single_part_is_zero_copy_clone() {
        let part = Bytes::from_static(b"hello");
        let joined = concat_bytes(&[part.clone()]);
        assert_eq!(joined, part);
    }
}
