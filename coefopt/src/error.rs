use thiserror::Error;

/// Rejections raised while assembling a transform block for optimization.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TxbError {
    #[error("{buffer} buffer holds {len} coefficients, transform needs {needed}")]
    BufferTooSmall {
        buffer: &'static str,
        len: usize,
        needed: usize,
    },

    #[error("scan order covers {len} positions, transform has {area}")]
    ScanSizeMismatch { len: usize, area: usize },

    #[error("scan order is not a permutation: scan index {scan_idx} maps to raster {pos}")]
    InvalidScan { scan_idx: usize, pos: usize },

    #[error("eob {eob} exceeds the maximum of {max_eob}")]
    EobOutOfRange { eob: usize, max_eob: usize },

    #[error("eob {eob} does not match the coefficients, which end at {expected}")]
    EobMismatch { eob: usize, expected: usize },

    #[error("dequantizer must be positive, got dc={dc} ac={ac}")]
    InvalidDequant { dc: i32, ac: i32 },

    #[error("{name} context {ctx} out of range (limit {limit})")]
    ContextOutOfRange {
        name: &'static str,
        ctx: usize,
        limit: usize,
    },
}
