//! Frozen bit masks.
//!
//! A mask holds one bit per codeword position: `1` marks an information
//! position, `0` a frozen position whose value is fixed to zero. Choosing the
//! positions (the reliability sequence) is the caller's business; this type
//! only validates and indexes a given mask.

use rand::Rng;
use rand::seq::index::sample;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::bits::{count_ones, get_bit, set_bit};
use crate::error::PolarError;
use crate::params::PolarParams;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FrozenMask {
    bits: Vec<u8>,
    code_length: usize,
}

impl FrozenMask {
    /// Validates length (N/8 bytes) and weight (exactly K information bits).
    pub fn from_bytes(params: &PolarParams, bytes: &[u8]) -> Result<Self, PolarError> {
        if bytes.len() != params.code_bytes() {
            return Err(PolarError::MaskLengthMismatch {
                expected: params.code_bytes(),
                found: bytes.len(),
            });
        }
        let weight = count_ones(bytes, params.code_length());
        if weight != params.info_length() {
            return Err(PolarError::MaskWeightMismatch {
                expected: params.info_length(),
                found: weight,
            });
        }
        Ok(Self {
            bits: bytes.to_vec(),
            code_length: params.code_length(),
        })
    }

    pub fn from_hex(params: &PolarParams, text: &str) -> Result<Self, PolarError> {
        let bytes = hex::decode(text.trim()).map_err(|_| PolarError::InvalidParams {
            reason: "frozen bit mask is not valid hex",
        })?;
        Self::from_bytes(params, &bytes)
    }

    /// Marks K distinct, uniformly chosen positions as information bits.
    pub fn random<R: Rng + ?Sized>(params: &PolarParams, rng: &mut R) -> Self {
        let mut bits = vec![0u8; params.code_bytes()];
        for index in sample(rng, params.code_length(), params.info_length()).into_vec() {
            set_bit(&mut bits, index, 1);
        }
        Self {
            bits,
            code_length: params.code_length(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.bits)
    }

    pub fn code_length(&self) -> usize {
        self.code_length
    }

    pub fn weight(&self) -> usize {
        count_ones(&self.bits, self.code_length)
    }

    pub fn is_information(&self, index: usize) -> bool {
        get_bit(&self.bits, index) == 1
    }

    pub fn information_positions(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.code_length).filter(|&i| self.is_information(i))
    }

    pub fn frozen_positions(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.code_length).filter(|&i| !self.is_information(i))
    }

    /// Places message bit `k` at the `k`-th information position.
    ///
    /// Only the first K bits of `message` are read; frozen positions stay zero.
    pub fn embed(&self, message: &[u8]) -> Vec<u8> {
        let mut word = vec![0u8; self.bits.len()];
        for (k, position) in self.information_positions().enumerate() {
            set_bit(&mut word, position, get_bit(message, k));
        }
        word
    }

    /// Gathers the information bits of `word` into a dense K-bit buffer.
    pub fn extract(&self, word: &[u8]) -> Vec<u8> {
        let mut message = vec![0u8; self.weight().div_ceil(8)];
        for (k, position) in self.information_positions().enumerate() {
            set_bit(&mut message, k, get_bit(word, position));
        }
        message
    }

    /// Copy of `word` with every frozen position cleared.
    pub fn restrict(&self, word: &[u8]) -> Vec<u8> {
        self.bits
            .iter()
            .zip(word.iter())
            .map(|(mask, value)| mask & value)
            .collect()
    }
}

impl Serialize for FrozenMask {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for FrozenMask {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        let bits = hex::decode(text.trim()).map_err(D::Error::custom)?;
        if bits.is_empty() {
            return Err(D::Error::custom("frozen bit mask is empty"));
        }
        let code_length = bits.len() * 8;
        Ok(Self { bits, code_length })
    }
}
