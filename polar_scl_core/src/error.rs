use thiserror::Error;

/// Every failure surfaced by the codec, the list decoder and the extractor.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolarError {
    #[error("invalid parameters: {reason}")]
    InvalidParams { reason: &'static str },

    #[error("{context} too short: expected at least {expected} bytes, found {found}")]
    BufferTooShort {
        context: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("frozen bit mask length mismatch: expected {expected} bytes, found {found}")]
    MaskLengthMismatch { expected: usize, found: usize },

    #[error("frozen bit mask weight mismatch: expected {expected} information bits, found {found}")]
    MaskWeightMismatch { expected: usize, found: usize },

    #[error("helper data was enrolled for different code parameters")]
    ParamsMismatch,

    #[error("invalid helper data: {reason}")]
    InvalidHelperData { reason: &'static str },

    #[error("unable to reserve {bytes} bytes of decoder path state")]
    ResourceExhausted { bytes: usize },

    #[error("path pool exhausted: no free slot among {capacity}")]
    PoolExhausted { capacity: usize },

    #[error("path pool overflow: {active} active paths exceed capacity {capacity}")]
    PoolOverflow { active: usize, capacity: usize },

    #[error("no decoded candidate matches the validation hash")]
    NoMatchingCandidate,
}

impl PolarError {
    /// True for the pool-invariant failures that correct pruning never produces.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            PolarError::PoolExhausted { .. } | PolarError::PoolOverflow { .. }
        )
    }
}
