//! Caller-supplied options for an [`crate::Fmp4Stream`].

const LIST_SIZE_MIN: usize = 2;
const LIST_SIZE_MAX: usize = 10;

/// Immutable options fixed at construction time.
///
/// `hls_list_size` and `buffer_list_size` are clamped into `[2, 10]` rather
/// than rejected: a caller-supplied 1 or 11 is a configuration nuisance, not
/// a reason to fail construction.
#[derive(Debug, Clone)]
pub struct Configuration {
    /// Base name HLS segment/playlist URIs are built from. HLS features
    /// (sequence tracking, the HLS FIFO, playlist rendering) are disabled
    /// entirely when this is `None`.
    pub hls_base: Option<String>,

    /// Capacity of the HLS entry FIFO, clamped to `[2, 10]`.
    hls_list_size: usize,

    /// Whether to emit an init-mode playlist immediately after the moov is
    /// parsed, before any segment exists.
    pub hls_list_init: bool,

    /// Capacity of the raw-segment byte FIFO, clamped to `[2, 10]`.
    buffer_list_size: usize,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            hls_base: None,
            hls_list_size: 4,
            hls_list_init: false,
            buffer_list_size: 4,
        }
    }
}

impl Configuration {
    /// Builds a `Configuration`, clamping both list sizes into `[2, 10]`.
    pub fn new(
        hls_base: Option<String>,
        hls_list_size: usize,
        hls_list_init: bool,
        buffer_list_size: usize,
    ) -> Self {
        Self {
            hls_base,
            hls_list_size: clamp_list_size(hls_list_size),
            hls_list_init,
            buffer_list_size: clamp_list_size(buffer_list_size),
        }
    }

    /// Whether HLS playlist/segment-naming features are active.
    pub fn hls_enabled(&self) -> bool {
        self.hls_base.is_some()
    }

    pub fn hls_list_size(&self) -> usize {
        self.hls_list_size
    }

    pub fn buffer_list_size(&self) -> usize {
        self.buffer_list_size
    }
}

fn clamp_list_size(size: usize) -> usize {
    size.clamp(LIST_SIZE_MIN, LIST_SIZE_MAX)
}
