//! Per-context tuning knobs.

/// Default bound on concurrently open struct/list/map regions.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Default limit on decode-side preallocation, in bytes.
///
/// A safety precaution against malicious input declaring enormous element
/// counts and causing OOM before any element is validated. Callers are free
/// to raise or lower it.
pub const DEFAULT_MAX_PREALLOCATION: usize = 4 << 20; // 4 MiB

/// Limits applied to every encode/decode context.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum nesting depth; opening one more region than this fails the
    /// operation with [`Error::DepthExceeded`](crate::Error::DepthExceeded).
    pub max_depth: usize,
    /// Maximum number of bytes a single declared sequence length may
    /// preallocate during decode.
    pub max_preallocation: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_preallocation: DEFAULT_MAX_PREALLOCATION,
        }
    }
}
