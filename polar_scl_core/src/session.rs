use crate::encoder::encode;
use crate::error::PolarError;
use crate::mask::FrozenMask;
use crate::params::{PolarParams, profile_by_name};
use crate::traversal::{DecodeReport, decode, decode_with_report};

/// Code parameters bound once and reused for every encode/decode call.
///
/// Sessions are plain values; any number of them with different parameters
/// can coexist.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PolarSession {
    params: PolarParams,
}

impl PolarSession {
    pub fn new(params: PolarParams) -> Self {
        Self { params }
    }

    pub fn from_profile(name: &str) -> Result<Self, PolarError> {
        profile_by_name(name)
            .map(|profile| Self::new(profile.params))
            .ok_or(PolarError::InvalidParams {
                reason: "unknown parameter profile",
            })
    }

    pub fn params(&self) -> &PolarParams {
        &self.params
    }

    pub fn encode(&self, info_word: &[u8], mask: &[u8]) -> Result<Vec<u8>, PolarError> {
        encode(&self.params, info_word, mask)
    }

    /// Embeds a K-bit message at the information positions of `mask`, then
    /// encodes.
    pub fn encode_message(&self, message: &[u8], mask: &FrozenMask) -> Result<Vec<u8>, PolarError> {
        let needed = self.params.info_bytes();
        if message.len() < needed {
            return Err(PolarError::BufferTooShort {
                context: "message",
                expected: needed,
                found: message.len(),
            });
        }
        self.encode(&mask.embed(message), mask.as_bytes())
    }

    pub fn decode(&self, received: &[u8], mask: &[u8]) -> Result<Vec<Option<Vec<u8>>>, PolarError> {
        decode(&self.params, received, mask)
    }

    pub fn decode_with_report(&self, received: &[u8], mask: &[u8]) -> Result<DecodeReport, PolarError> {
        decode_with_report(&self.params, received, mask)
    }
}
