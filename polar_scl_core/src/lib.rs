//! Binary polar codes with successive cancellation list (SCL) decoding, and a
//! fuzzy extractor built on top of them.
//!
//! [`encode`] applies the polar transform to an information word under a
//! frozen bit mask. [`decode`] walks the decoding tree iteratively while a
//! bounded [`PathPool`] keeps at most L hypotheses alive, and returns one
//! candidate word per list slot. [`FuzzyExtractor`] turns the pair into a
//! key-reconstruction scheme for noisy fingerprints such as SRAM start-up
//! values.
//!
//! Frozen mask construction (reliability ordering) is left to the caller.

pub mod belief;
pub mod bits;
pub mod digest;
pub mod encoder;
pub mod error;
pub mod extractor;
pub mod helper;
pub mod mask;
pub mod params;
pub mod pool;
pub mod rng;
pub mod session;
pub mod traversal;
pub mod versioning;

pub use crate::belief::{BeliefTree, Llr};
pub use crate::digest::{Blake3Digest, DIGEST_BYTES, KeyDigest};
pub use crate::encoder::encode;
pub use crate::error::PolarError;
pub use crate::extractor::{ExtractedKey, FuzzyExtractor, Reproduction};
pub use crate::helper::HelperData;
pub use crate::mask::FrozenMask;
pub use crate::params::{
    ParamProfile, PolarParams, profile_by_name, profile_sram, profile_tiny, profiles,
};
pub use crate::pool::{Candidate, DecodedPath, PathMetric, PathPool, PoolStats, select_survivors};
pub use crate::rng::{SecureRng, derive_rng, secure_rng};
pub use crate::session::PolarSession;
pub use crate::traversal::{DecodeReport, decode, decode_with_report};
pub use crate::versioning::*;
