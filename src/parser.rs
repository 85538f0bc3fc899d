//! The box-parser state machine: `FindFtyp -> FindMoov -> FindMoof -> FindMdat
//! -> (FindMoof | MoofHunt)`.
//!
//! Driven iteratively rather than recursively (see Design Note 9): a single
//! call to [`ParserState::process`] loops over a `(phase, pending slice)`
//! work item until the slice is exhausted, so a hostile input packing many
//! tiny boxes into one chunk cannot grow the call stack.

use bytes::Bytes;

use crate::accumulator::{concat_bytes, Accumulator};
use crate::box_scanner::{find_tag, length_at, starts_with, FTYP, MDAT, MFRA, MOOF, MOOV};
use crate::init::build_initialization;

const DEFAULT_MOOF_HUNT_LIMIT: u32 = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    FindFtyp,
    FindMoov,
    FindMoof,
    FindMdat,
    MoofHunt,
}

/// Accumulates the results of one or more [`ParserState::process`] calls.
/// The driver drains this after each chunk.
#[derive(Debug, Default)]
pub struct ParseOutputs {
    pub initialization: Option<(Bytes, Option<String>)>,
    pub segments: Vec<Bytes>,
}

/// The parser's mutable state: current phase, any saved box bytes awaiting
/// their pair, and an in-progress accumulator for a box split across
/// chunks.
pub struct ParserState {
    phase: Phase,
    saved_ftyp: Option<Bytes>,
    saved_moof: Option<Bytes>,
    accumulator: Option<Accumulator>,
    moof_hunt_attempts: u32,
    moof_hunt_limit: u32,
    moof_hunt_exhausted: bool,
}

impl Default for ParserState {
    fn default() -> Self {
        Self::with_moof_hunt_limit(DEFAULT_MOOF_HUNT_LIMIT)
    }
}

impl ParserState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a parser with a non-default `MoofHunt` attempt limit, for
    /// exercising recovery behavior in tests without waiting 40 chunks.
    pub fn with_moof_hunt_limit(limit: u32) -> Self {
        Self {
            phase: Phase::FindFtyp,
            saved_ftyp: None,
            saved_moof: None,
            accumulator: None,
            moof_hunt_attempts: 0,
            moof_hunt_limit: limit,
            moof_hunt_exhausted: false,
        }
    }

    /// Feeds one input chunk through the state machine, appending any
    /// produced outputs (initialization, segments) to `outputs`.
    pub fn process(&mut self, chunk: Bytes, outputs: &mut ParseOutputs) {
        let mut pending = Some(chunk);
        while let Some(slice) = pending.take() {
            if slice.is_empty() {
                break;
            }
            pending = match self.phase {
                Phase::FindFtyp => self.handle_find_ftyp(slice),
                Phase::FindMoov => self.handle_find_moov(slice, outputs),
                Phase::FindMoof => self.handle_find_moof(slice),
                Phase::FindMdat => self.handle_find_mdat(slice, outputs),
                Phase::MoofHunt => self.handle_moof_hunt(slice),
            };
        }
    }

    fn handle_find_ftyp(&mut self, chunk: Bytes) -> Option<Bytes> {
        if chunk.len() < 8 {
            tracing::warn!(len = chunk.len(), "chunk too short while finding ftyp");
            return None;
        }
        if !starts_with(FTYP, &chunk) {
            tracing::warn!("expected ftyp box, dropping chunk");
            return None;
        }
        let len = length_at(&chunk) as usize;
        if len == 0 {
            tracing::warn!("zero-length ftyp box, dropping chunk");
            return None;
        }
        if len > chunk.len() {
            tracing::warn!(len, chunk_len = chunk.len(), "ftyp does not fit in first chunk");
            return None;
        }
        let has_tail = len < chunk.len();
        self.saved_ftyp = Some(chunk.slice(0..len));
        self.phase = Phase::FindMoov;
        if has_tail {
            Some(chunk.slice(len..))
        } else {
            None
        }
    }

    fn handle_find_moov(&mut self, chunk: Bytes, outputs: &mut ParseOutputs) -> Option<Bytes> {
        if chunk.len() < 8 {
            tracing::warn!(len = chunk.len(), "chunk too short while finding moov");
            return None;
        }
        if !starts_with(MOOV, &chunk) {
            tracing::warn!("expected moov box, dropping chunk");
            return None;
        }
        let len = length_at(&chunk) as usize;
        if len == 0 {
            tracing::warn!("zero-length moov box, dropping chunk");
            return None;
        }
        if len > chunk.len() {
            tracing::warn!(len, chunk_len = chunk.len(), "moov does not fit in first chunk");
            return None;
        }
        let moov = chunk.slice(0..len);
        let tail = if len < chunk.len() {
            Some(chunk.slice(len..))
        } else {
            None
        };
        let ftyp = self
            .saved_ftyp
            .take()
            .expect("FindMoov reached without a saved ftyp");
        let (init, mime) = build_initialization(ftyp, moov);
        outputs.initialization = Some((init, mime));
        self.phase = Phase::FindMoof;
        tail
    }

    fn handle_find_moof(&mut self, chunk: Bytes) -> Option<Bytes> {
        if let Some(mut acc) = self.accumulator.take() {
            acc.push(chunk);
            if acc.is_complete() {
                let (moof, tail) = acc.finish();
                self.saved_moof = Some(moof);
                self.phase = Phase::FindMdat;
                return if tail.is_empty() { None } else { Some(tail) };
            }
            self.accumulator = Some(acc);
            return None;
        }

        if chunk.len() < 8 {
            tracing::warn!(len = chunk.len(), "chunk too short while finding moof");
            return None;
        }
        if !starts_with(MOOF, &chunk) {
            if find_tag(MFRA, &chunk).is_some() {
                tracing::info!("mfra end marker encountered, staying in FindMoof");
                return None;
            }
            tracing::warn!("moof not found, entering corruption recovery");
            self.phase = Phase::MoofHunt;
            self.moof_hunt_attempts = 0;
            self.moof_hunt_exhausted = false;
            return Some(chunk);
        }
        let len = length_at(&chunk) as usize;
        if len == 0 {
            tracing::warn!("zero-length moof box, dropping chunk");
            return None;
        }
        if len < chunk.len() {
            self.saved_moof = Some(chunk.slice(0..len));
            self.phase = Phase::FindMdat;
            return Some(chunk.slice(len..));
        }
        if len == chunk.len() {
            self.saved_moof = Some(chunk);
            self.phase = Phase::FindMdat;
            return None;
        }
        self.accumulator = Some(Accumulator::new(chunk, len));
        None
    }

    fn handle_find_mdat(&mut self, chunk: Bytes, outputs: &mut ParseOutputs) -> Option<Bytes> {
        if let Some(mut acc) = self.accumulator.take() {
            acc.push(chunk);
            if acc.is_complete() {
                let (mdat, tail) = acc.finish();
                self.complete_segment(mdat, outputs);
                return if tail.is_empty() { None } else { Some(tail) };
            }
            self.accumulator = Some(acc);
            return None;
        }

        if chunk.len() < 8 {
            tracing::warn!(len = chunk.len(), "chunk too short while finding mdat");
            return None;
        }
        if !starts_with(MDAT, &chunk) {
            if find_tag(MFRA, &chunk).is_some() {
                tracing::info!("mfra end marker encountered while expecting mdat");
                self.saved_moof = None;
                self.phase = Phase::FindMoof;
                return None;
            }
            tracing::warn!("mdat not found, entering corruption recovery");
            self.saved_moof = None;
            self.phase = Phase::MoofHunt;
            self.moof_hunt_attempts = 0;
            self.moof_hunt_exhausted = false;
            return Some(chunk);
        }
        let len = length_at(&chunk) as usize;
        if len == 0 {
            tracing::warn!("zero-length mdat box, dropping chunk");
            return None;
        }
        if len < chunk.len() {
            let mdat = chunk.slice(0..len);
            self.complete_segment(mdat, outputs);
            return Some(chunk.slice(len..));
        }
        if len == chunk.len() {
            self.complete_segment(chunk, outputs);
            return None;
        }
        self.accumulator = Some(Accumulator::new(chunk, len));
        None
    }

    fn complete_segment(&mut self, mdat: Bytes, outputs: &mut ParseOutputs) {
        let moof = self
            .saved_moof
            .take()
            .expect("FindMdat reached without a saved moof");
        outputs.segments.push(concat_bytes(&[moof, mdat]));
        self.phase = Phase::FindMoof;
    }

    fn handle_moof_hunt(&mut self, chunk: Bytes) -> Option<Bytes> {
        if self.moof_hunt_exhausted {
            return None;
        }
        if self.moof_hunt_attempts >= self.moof_hunt_limit {
            tracing::error!(
                attempts = self.moof_hunt_attempts,
                "moof hunt failed to re-synchronize stream; giving up"
            );
            self.moof_hunt_exhausted = true;
            return None;
        }
        self.moof_hunt_attempts += 1;
        if let Some(idx) = find_tag(MOOF, &chunk) {
            if idx >= 4 {
                self.phase = Phase::FindMoof;
                return Some(chunk.slice(idx - 4..));
            }
        }
        None
    }
}
