use serde::de::Error as DeError;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::bits::bytes_for_bits;
use crate::digest::DIGEST_BYTES;
use crate::error::PolarError;
use crate::mask::FrozenMask;
use crate::params::PolarParams;
use crate::versioning::{HELPER_DATA_VERSION, expect_version};

/// Public enrollment record: everything reproduction needs besides a fresh
/// fingerprint reading. Contains no key material.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HelperData {
    pub version: u16,
    pub params: PolarParams,
    pub frozen_mask: FrozenMask,
    /// Codeword values at the frozen positions, in index order (N - K bits).
    pub helper_bits: Vec<u8>,
    /// Digest of the enrolled fingerprint restricted to information positions.
    pub validation_hash: [u8; DIGEST_BYTES],
}

impl HelperData {
    /// Checks the record against the parameters of the reproducing session.
    pub fn validate(&self, params: &PolarParams) -> Result<(), PolarError> {
        if self.params != *params {
            return Err(PolarError::ParamsMismatch);
        }
        if self.frozen_mask.code_length() != params.code_length() {
            return Err(PolarError::MaskLengthMismatch {
                expected: params.code_bytes(),
                found: self.frozen_mask.as_bytes().len(),
            });
        }
        if self.frozen_mask.weight() != params.info_length() {
            return Err(PolarError::MaskWeightMismatch {
                expected: params.info_length(),
                found: self.frozen_mask.weight(),
            });
        }
        if self.helper_bits.len() != bytes_for_bits(params.frozen_length()) {
            return Err(PolarError::InvalidHelperData {
                reason: "helper bit count does not match N - K",
            });
        }
        Ok(())
    }
}

impl Serialize for HelperData {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("HelperData", 5)?;
        state.serialize_field("version", &self.version)?;
        state.serialize_field("params", &self.params)?;
        state.serialize_field("frozen_mask", &self.frozen_mask)?;
        state.serialize_field("helper_bits", &hex::encode(&self.helper_bits))?;
        state.serialize_field("validation_hash", &hex::encode(self.validation_hash))?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for HelperData {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Helper {
            version: u16,
            params: PolarParams,
            frozen_mask: String,
            helper_bits: String,
            validation_hash: String,
        }
        let helper = Helper::deserialize(deserializer)?;
        expect_version::<D::Error>(helper.version, HELPER_DATA_VERSION, "HelperData")?;
        let frozen_mask = FrozenMask::from_hex(&helper.params, &helper.frozen_mask)
            .map_err(D::Error::custom)?;
        let helper_bits = hex::decode(helper.helper_bits.trim()).map_err(D::Error::custom)?;
        let validation_hash: [u8; DIGEST_BYTES] = hex::decode(helper.validation_hash.trim())
            .map_err(D::Error::custom)?
            .try_into()
            .map_err(|_| D::Error::custom("validation hash must be 32 bytes"))?;
        let record = Self {
            version: helper.version,
            params: helper.params,
            frozen_mask,
            helper_bits,
            validation_hash,
        };
        record.validate(&record.params).map_err(D::Error::custom)?;
        Ok(record)
    }
}
